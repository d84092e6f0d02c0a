/// Interstitial page URLs: `blocked.html?site=<host>&url=<original>`
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use url::Url;

use crate::error::{ExtensionError, Result};

const SITE_PARAM: &str = "site";
const URL_PARAM: &str = "url";

/// Characters `encodeURIComponent` leaves alone: `A-Z a-z 0-9 - _ . ! ~ * ' ( )`
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Parameters recovered from an interstitial URL
#[derive(Debug, Clone, PartialEq)]
pub struct BlockedPage {
    pub site: Option<String>,
    pub original_url: Option<String>,
}

impl BlockedPage {
    /// The original URL, if present and well-formed
    pub fn restorable_url(&self) -> Option<&str> {
        self.original_url
            .as_deref()
            .filter(|url| Url::parse(url).is_ok())
    }
}

/// Builds and recognizes interstitial URLs under one extension page
#[derive(Debug, Clone, PartialEq)]
pub struct Interstitial {
    base: Url,
}

impl Interstitial {
    /// `base` is the absolute URL of the extension page, e.g.
    /// `chrome-extension://<id>/blocked.html`.
    pub fn new(base: &str) -> Result<Self> {
        let mut base = Url::parse(base).map_err(|e| ExtensionError::InvalidUrl(format!("{}: {}", base, e)))?;
        base.set_query(None);
        base.set_fragment(None);
        Ok(Interstitial { base })
    }

    pub fn base(&self) -> &str {
        self.base.as_str()
    }

    /// Parameters are percent-encoded (spaces as `%20`, never `+`).
    pub fn url_for(&self, site: &str, original_url: &str) -> String {
        format!(
            "{}?{}={}&{}={}",
            self.base,
            SITE_PARAM,
            utf8_percent_encode(site, COMPONENT),
            URL_PARAM,
            utf8_percent_encode(original_url, COMPONENT),
        )
    }

    pub fn is_interstitial(&self, url: &str) -> bool {
        url.starts_with(self.base.as_str())
    }

    /// Parse an interstitial URL. Returns `None` for any other page.
    pub fn parse(&self, url: &str) -> Option<BlockedPage> {
        if !self.is_interstitial(url) {
            return None;
        }

        let parsed = Url::parse(url).ok()?;
        let mut page = BlockedPage {
            site: None,
            original_url: None,
        };

        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                SITE_PARAM if page.site.is_none() => page.site = Some(value.into_owned()),
                URL_PARAM if page.original_url.is_none() => page.original_url = Some(value.into_owned()),
                _ => {}
            }
        }

        Some(page)
    }
}
