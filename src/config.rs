/// Extension settings and storage keys
///
/// `Settings` is persisted under `settings` next to the block list; a
/// missing key or missing fields fall back to the defaults below.
use serde::{Deserialize, Serialize};

use crate::hostname::MatchPolicy;

pub const BLOCKED_SITES_KEY: &str = "blockedSites";
pub const IS_ENABLED_KEY: &str = "isEnabled";
pub const SETTINGS_KEY: &str = "settings";

pub const DEFAULT_INTERSTITIAL_PAGE: &str = "blocked.html";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Extension-relative path of the page shown in place of blocked sites
    pub interstitial_page: String,
    pub match_policy: MatchPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            interstitial_page: DEFAULT_INTERSTITIAL_PAGE.to_string(),
            match_policy: MatchPolicy::default(),
        }
    }
}
