/// Browser tab access
use serde::{Deserialize, Serialize};
#[cfg(test)]
use std::cell::{Cell, RefCell};
#[cfg(test)]
use std::collections::HashSet;

use crate::bridge;
use crate::error::{ExtensionError, Result};

/// The subset of a `chrome.tabs.Tab` the blocker needs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TabInfo {
    #[serde(default)]
    pub id: i32,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub active: bool,
}

impl TabInfo {
    pub fn new(id: i32, url: &str) -> TabInfo {
        TabInfo {
            id,
            url: Some(url.to_string()),
            active: false,
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait TabApi {
    /// Every open tab across all windows
    async fn query_all(&self) -> Result<Vec<TabInfo>>;

    /// The active tab of the current window
    async fn active_tab(&self) -> Result<Option<TabInfo>>;

    async fn update_url(&self, tab_id: i32, url: &str) -> Result<()>;
}

/// `chrome.tabs` through the JS bridge
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeTabs;

impl TabApi for ChromeTabs {
    async fn query_all(&self) -> Result<Vec<TabInfo>> {
        let tabs_js = bridge::queryTabs().await.map_err(ExtensionError::tabs)?;
        Ok(serde_wasm_bindgen::from_value(tabs_js)?)
    }

    async fn active_tab(&self) -> Result<Option<TabInfo>> {
        let tab_js = bridge::getActiveTab().await.map_err(ExtensionError::tabs)?;
        if tab_js.is_null() || tab_js.is_undefined() {
            return Ok(None);
        }
        Ok(Some(serde_wasm_bindgen::from_value(tab_js)?))
    }

    async fn update_url(&self, tab_id: i32, url: &str) -> Result<()> {
        bridge::updateTab(tab_id, url).await.map_err(ExtensionError::tabs)
    }
}

/// In-memory tab strip. Updates rewrite the stored tab URL and are
/// recorded in order.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryTabs {
    tabs: RefCell<Vec<TabInfo>>,
    updates: RefCell<Vec<(i32, String)>>,
    failing: RefCell<HashSet<i32>>,
    fail_query: Cell<bool>,
}

#[cfg(test)]
impl MemoryTabs {
    pub fn new(tabs: Vec<TabInfo>) -> Self {
        MemoryTabs {
            tabs: RefCell::new(tabs),
            ..Self::default()
        }
    }

    pub fn set_active(&self, tab_id: i32) {
        for tab in self.tabs.borrow_mut().iter_mut() {
            tab.active = tab.id == tab_id;
        }
    }

    /// Updates to this tab will fail
    pub fn fail_updates_for(&self, tab_id: i32) {
        self.failing.borrow_mut().insert(tab_id);
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_query.set(fail);
    }

    pub fn url_of(&self, tab_id: i32) -> Option<String> {
        self.tabs
            .borrow()
            .iter()
            .find(|t| t.id == tab_id)
            .and_then(|t| t.url.clone())
    }

    pub fn updates(&self) -> Vec<(i32, String)> {
        self.updates.borrow().clone()
    }
}

#[cfg(test)]
impl TabApi for MemoryTabs {
    async fn query_all(&self) -> Result<Vec<TabInfo>> {
        if self.fail_query.get() {
            return Err(ExtensionError::Tabs("query rejected".to_string()));
        }
        Ok(self.tabs.borrow().clone())
    }

    async fn active_tab(&self) -> Result<Option<TabInfo>> {
        Ok(self.tabs.borrow().iter().find(|t| t.active).cloned())
    }

    async fn update_url(&self, tab_id: i32, url: &str) -> Result<()> {
        if self.failing.borrow().contains(&tab_id) {
            return Err(ExtensionError::Tabs(format!("no tab with id {}", tab_id)));
        }

        let mut tabs = self.tabs.borrow_mut();
        let tab = tabs
            .iter_mut()
            .find(|t| t.id == tab_id)
            .ok_or_else(|| ExtensionError::Tabs(format!("no tab with id {}", tab_id)))?;
        tab.url = Some(url.to_string());
        self.updates.borrow_mut().push((tab_id, url.to_string()));
        Ok(())
    }
}
