/// Command surface between the popup and the background worker
use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::block_list::BlockList;
use crate::config::Settings;
use crate::controller::{BlockingController, BlockingState, CurrentTab};
use crate::store::StateStore;
use crate::tabs::TabApi;

/// A command sent with `chrome.runtime.sendMessage`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    GetCurrentTab,
    AddSite { hostname: String },
    RemoveSite { hostname: String },
    ToggleEnabled,
    GetBlockedSites,
    ResetAttempts { hostname: String },
    GetSettings,
    UpdateSettings { settings: Settings },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitesResponse {
    pub success: bool,
    pub sites: BlockList,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub is_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    CurrentTab(CurrentTab),
    Sites(SitesResponse),
    Toggle(ToggleResponse),
    State(BlockingState),
    Success(SuccessResponse),
    Settings(Settings),
}

/// `chrome.tabs.onUpdated` payload, flattened by the bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabUpdate {
    pub tab_id: i32,
    pub status: Option<String>,
    pub url: Option<String>,
}

impl TabUpdate {
    /// Only the start of a load is checked
    pub fn navigation_url(&self) -> Option<&str> {
        match self.status.as_deref() {
            Some("loading") => self.url.as_deref(),
            _ => None,
        }
    }
}

pub async fn handle_tab_update<S: StateStore, T: TabApi>(controller: &BlockingController<S, T>, update: &TabUpdate) {
    let Some(url) = update.navigation_url() else {
        return;
    };

    if let Err(e) = controller.on_navigation(update.tab_id, url).await {
        error!("Error checking block status for tab {}: {}", update.tab_id, e);
    }
}

/// Run one command. Failures are logged and answered with a degraded
/// response; the popup never sees an error.
pub async fn dispatch<S: StateStore, T: TabApi>(controller: &BlockingController<S, T>, request: Request) -> Response {
    debug!("Handling {:?}", request);

    match request {
        Request::GetCurrentTab => match controller.current_tab().await {
            Ok(tab) => Response::CurrentTab(tab),
            Err(e) => {
                error!("Failed to read the active tab: {}", e);
                Response::CurrentTab(CurrentTab { url: None, hostname: None })
            }
        },
        Request::AddSite { hostname } => sites_response(controller, controller.add_site(&hostname).await).await,
        Request::RemoveSite { hostname } => sites_response(controller, controller.remove_site(&hostname).await).await,
        Request::ToggleEnabled => match controller.toggle_enabled().await {
            Ok(is_enabled) => Response::Toggle(ToggleResponse { is_enabled }),
            Err(e) => {
                error!("Failed to toggle blocking: {}", e);
                let is_enabled = fallback_state(controller).await.is_enabled;
                Response::Toggle(ToggleResponse { is_enabled })
            }
        },
        Request::GetBlockedSites => Response::State(fallback_state(controller).await),
        Request::ResetAttempts { hostname } => {
            let success = match controller.reset_attempts(&hostname).await {
                Ok(()) => true,
                Err(e) => {
                    error!("Failed to reset attempts for {}: {}", hostname, e);
                    false
                }
            };
            Response::Success(SuccessResponse { success })
        }
        Request::GetSettings => Response::Settings(fallback_settings(controller).await),
        Request::UpdateSettings { settings } => match controller.update_settings(settings).await {
            Ok(saved) => Response::Settings(saved),
            Err(e) => {
                error!("Failed to update settings: {}", e);
                Response::Settings(fallback_settings(controller).await)
            }
        },
    }
}

async fn fallback_settings<S: StateStore, T: TabApi>(controller: &BlockingController<S, T>) -> Settings {
    controller.settings().await.unwrap_or_else(|e| {
        error!("Failed to read settings: {}", e);
        Settings::default()
    })
}

async fn sites_response<S: StateStore, T: TabApi>(
    controller: &BlockingController<S, T>,
    result: crate::error::Result<BlockList>,
) -> Response {
    match result {
        Ok(sites) => Response::Sites(SitesResponse { success: true, sites }),
        Err(e) => {
            error!("Failed to update the block list: {}", e);
            Response::Sites(SitesResponse {
                success: false,
                sites: fallback_state(controller).await.blocked_sites,
            })
        }
    }
}

/// Current state, or first-run defaults if the store cannot be read
async fn fallback_state<S: StateStore, T: TabApi>(controller: &BlockingController<S, T>) -> BlockingState {
    controller.blocking_state().await.unwrap_or_else(|e| {
        error!("Failed to read blocking state: {}", e);
        BlockingState {
            blocked_sites: BlockList::new(),
            is_enabled: true,
        }
    })
}
