/// Error type shared by the store, tab and controller layers
use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtensionError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("tab error: {0}")]
    Tabs(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("invalid hostname: {0:?}")]
    InvalidHostname(String),

    #[error("invalid setting: {0}")]
    InvalidSetting(String),
}

impl ExtensionError {
    pub fn storage(e: JsValue) -> Self {
        ExtensionError::Storage(format!("{:?}", e))
    }

    pub fn tabs(e: JsValue) -> Self {
        ExtensionError::Tabs(format!("{:?}", e))
    }
}

impl From<serde_json::Error> for ExtensionError {
    fn from(e: serde_json::Error) -> Self {
        ExtensionError::Serialization(e.to_string())
    }
}

impl From<serde_wasm_bindgen::Error> for ExtensionError {
    fn from(e: serde_wasm_bindgen::Error) -> Self {
        ExtensionError::Serialization(e.to_string())
    }
}

impl From<ExtensionError> for JsValue {
    fn from(e: ExtensionError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ExtensionError>;
