/// Hostname extraction and block-list matching
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use url::Url;

use crate::error::ExtensionError;

/// Schemes whose pages can be blocked. Everything else (chrome://, about:,
/// chrome-extension://, file://) is an internal page.
const WEB_SCHEMES: [&str; 2] = ["http", "https"];

/// Policy deciding whether a visited hostname hits a blocked hostname.
///
/// Every policy is symmetric: `matches(a, b) == matches(b, a)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum MatchPolicy {
    /// Either hostname contains the other as a substring. Loose: blocking
    /// `example.com` also hits `myexample.community`.
    Substring,
    /// Equal, or one is a dot-separated label suffix of the other
    /// (`news.com` hits `m.news.com`).
    #[default]
    DomainLabels,
    /// Equal hostnames only.
    Exact,
}

impl MatchPolicy {
    pub const ALL: [MatchPolicy; 3] = [
        MatchPolicy::DomainLabels,
        MatchPolicy::Substring,
        MatchPolicy::Exact,
    ];

    /// Name used in storage and in the popup's select element
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchPolicy::Substring => "substring",
            MatchPolicy::DomainLabels => "domainLabels",
            MatchPolicy::Exact => "exact",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MatchPolicy::Substring => "Loose (substring)",
            MatchPolicy::DomainLabels => "Domain and subdomains",
            MatchPolicy::Exact => "Exact hostname",
        }
    }

    pub fn matches(&self, candidate: &str, blocked: &str) -> bool {
        if candidate.is_empty() || blocked.is_empty() {
            return false;
        }

        let candidate = candidate.to_ascii_lowercase();
        let blocked = blocked.to_ascii_lowercase();

        match self {
            MatchPolicy::Substring => candidate.contains(&blocked) || blocked.contains(&candidate),
            MatchPolicy::DomainLabels => {
                candidate == blocked
                    || is_label_suffix(&candidate, &blocked)
                    || is_label_suffix(&blocked, &candidate)
            }
            MatchPolicy::Exact => candidate == blocked,
        }
    }
}

impl FromStr for MatchPolicy {
    type Err = ExtensionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MatchPolicy::ALL
            .into_iter()
            .find(|policy| policy.as_str() == s)
            .ok_or_else(|| ExtensionError::InvalidSetting(format!("match policy {:?}", s)))
    }
}

/// True if `suffix` is a whole-label suffix of `host` (`a.b.com` / `b.com`).
fn is_label_suffix(host: &str, suffix: &str) -> bool {
    host.strip_suffix(suffix)
        .is_some_and(|rest| rest.ends_with('.'))
}

/// Extract the normalized hostname of a web URL.
///
/// Returns `None` for internal browser pages and anything that does not
/// parse. A single leading `www.` and any trailing FQDN dots are stripped.
///
/// Examples:
/// - https://www.example.com/path → example.com
/// - https://news.com:8080/a → news.com
/// - https://news.com./a → news.com
/// - chrome://settings → None
pub fn extract_hostname(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;

    if !WEB_SCHEMES.contains(&parsed.scheme()) {
        return None;
    }

    let host = parsed.host_str()?.trim_end_matches('.');
    let host = host.strip_prefix("www.").unwrap_or(host);

    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// Convenience wrapper over [`MatchPolicy::matches`].
pub fn is_match(candidate: &str, blocked: &str, policy: MatchPolicy) -> bool {
    policy.matches(candidate, blocked)
}

/// Clean up a hostname typed by hand into the popup.
pub fn normalize_manual_input(input: &str) -> Result<String, ExtensionError> {
    let lowered = input.trim().to_lowercase();

    let without_scheme = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);
    let without_www = without_scheme.strip_prefix("www.").unwrap_or(without_scheme);
    let hostname = without_www.split('/').next().unwrap_or_default();

    if hostname.len() < 3 {
        return Err(ExtensionError::InvalidHostname(input.trim().to_string()));
    }

    Ok(hostname.to_string())
}
