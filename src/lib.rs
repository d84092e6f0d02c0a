/// Site Block - Chrome Extension that blocks distracting sites
/// Built with Rust + WASM + Yew

pub mod block_list;
mod bridge;
pub mod config;
pub mod controller;
pub mod error;
pub mod hostname;
pub mod interstitial;
pub mod messages;
pub mod store;
pub mod sync;
pub mod tabs;
pub mod ui;

use wasm_bindgen::prelude::*;

use crate::controller::BlockingController;
use crate::interstitial::Interstitial;
use crate::messages::{Request, TabUpdate};
use crate::store::{ChromeStore, StateStore};
use crate::tabs::ChromeTabs;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

async fn background_controller() -> Result<BlockingController<ChromeStore, ChromeTabs>, JsValue> {
    let settings = ChromeStore.load_settings().await?.unwrap_or_default();
    let interstitial = Interstitial::new(&bridge::getExtensionUrl(&settings.interstitial_page))?;
    Ok(BlockingController::new(
        ChromeStore,
        ChromeTabs,
        interstitial,
        js_sys::Date::now,
    ))
}

// Re-export hostname extraction for JavaScript access
#[wasm_bindgen]
pub fn extract_hostname(url: &str) -> Option<String> {
    hostname::extract_hostname(url)
}

// chrome.runtime.onInstalled
#[wasm_bindgen]
pub async fn on_installed() -> Result<(), JsValue> {
    background_controller().await?.initialize().await?;
    Ok(())
}

// chrome.tabs.onUpdated
#[wasm_bindgen]
pub async fn on_tab_updated(tab_id: i32, status: Option<String>, url: Option<String>) -> Result<(), JsValue> {
    let controller = background_controller().await?;
    messages::handle_tab_update(&controller, &TabUpdate { tab_id, status, url }).await;
    Ok(())
}

// chrome.runtime.onMessage
#[wasm_bindgen]
pub async fn handle_message(request: JsValue) -> Result<JsValue, JsValue> {
    let request: Request = serde_wasm_bindgen::from_value(request)
        .map_err(|e| JsValue::from_str(&format!("Unknown request: {:?}", e)))?;

    let controller = background_controller().await?;
    let response = messages::dispatch(&controller, request).await;

    Ok(store::to_js(&response)?)
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    yew::Renderer::<ui::popup::App>::new().render();
}

// Start the Yew app for the page shown in place of a blocked site
#[wasm_bindgen]
pub fn start_blocked_page() {
    yew::Renderer::<ui::blocked::BlockedPage>::new().render();
}
