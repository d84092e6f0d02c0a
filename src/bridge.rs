/// Imports from the `extension.js` bridge module
use wasm_bindgen::prelude::*;

#[wasm_bindgen(module = "/extension.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    pub async fn getStorage(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    pub async fn setStorage(key: &str, value: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    pub async fn queryTabs() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    pub async fn getActiveTab() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    pub async fn updateTab(tab_id: i32, url: &str) -> Result<(), JsValue>;

    pub fn getExtensionUrl(path: &str) -> String;

    #[wasm_bindgen(catch)]
    pub async fn sendMessage(message: JsValue) -> Result<JsValue, JsValue>;

    pub fn onStorageChanged(callback: &js_sys::Function);

    pub fn goBackOrClose();
}
