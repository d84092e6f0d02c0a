/// Persistent state: the block list, the enabled flag and the settings
///
/// The controller holds no copy of this state between operations; every
/// operation reads, mutates and writes back through a [`StateStore`].
use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::JsValue;

use crate::block_list::BlockList;
use crate::bridge;
use crate::config::{BLOCKED_SITES_KEY, IS_ENABLED_KEY, SETTINGS_KEY, Settings};
use crate::error::{ExtensionError, Result};

#[allow(async_fn_in_trait)]
pub trait StateStore {
    /// `None` when nothing has been stored yet
    async fn load_block_list(&self) -> Result<Option<BlockList>>;

    async fn save_block_list(&self, list: &BlockList) -> Result<()>;

    /// `None` when nothing has been stored yet
    async fn load_enabled(&self) -> Result<Option<bool>>;

    async fn save_enabled(&self, enabled: bool) -> Result<()>;

    /// `None` when nothing has been stored yet
    async fn load_settings(&self) -> Result<Option<Settings>>;

    async fn save_settings(&self, settings: &Settings) -> Result<()>;
}

/// Convert a value for `chrome.storage`. Maps must land as plain objects,
/// not JS `Map`s, or storage drops them.
pub fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue> {
    Ok(value.serialize(&serde_wasm_bindgen::Serializer::json_compatible())?)
}

/// `chrome.storage.local` through the JS bridge
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeStore;

impl ChromeStore {
    async fn get<T: DeserializeOwned>(key: &str) -> Result<Option<T>> {
        let value = bridge::getStorage(key).await.map_err(ExtensionError::storage)?;
        if value.is_null() || value.is_undefined() {
            Ok(None)
        } else {
            Ok(Some(serde_wasm_bindgen::from_value(value)?))
        }
    }

    async fn set<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<()> {
        bridge::setStorage(key, to_js(value)?).await.map_err(ExtensionError::storage)
    }
}

impl StateStore for ChromeStore {
    async fn load_block_list(&self) -> Result<Option<BlockList>> {
        Self::get(BLOCKED_SITES_KEY).await
    }

    async fn save_block_list(&self, list: &BlockList) -> Result<()> {
        Self::set(BLOCKED_SITES_KEY, list).await
    }

    async fn load_enabled(&self) -> Result<Option<bool>> {
        Self::get(IS_ENABLED_KEY).await
    }

    async fn save_enabled(&self, enabled: bool) -> Result<()> {
        Self::set(IS_ENABLED_KEY, &enabled).await
    }

    async fn load_settings(&self) -> Result<Option<Settings>> {
        Self::get(SETTINGS_KEY).await
    }

    async fn save_settings(&self, settings: &Settings) -> Result<()> {
        Self::set(SETTINGS_KEY, settings).await
    }
}

#[cfg(test)]
pub use memory::MemoryStore;
