/// Brings open tabs in line with the block list after a state change
///
/// Each tab is handled on its own: a failed query aborts the pass, a failed
/// update is logged and the loop moves on to the next tab.
use log::{debug, info, warn};

use crate::block_list::BlockList;
use crate::hostname::{MatchPolicy, extract_hostname};
use crate::interstitial::Interstitial;
use crate::tabs::{TabApi, TabInfo};

pub struct TabSynchronizer<'a, T: TabApi> {
    tabs: &'a T,
    interstitial: &'a Interstitial,
    policy: MatchPolicy,
}

impl<'a, T: TabApi> TabSynchronizer<'a, T> {
    pub fn new(tabs: &'a T, interstitial: &'a Interstitial, policy: MatchPolicy) -> Self {
        TabSynchronizer {
            tabs,
            interstitial,
            policy,
        }
    }

    /// Redirect every open tab that hits `hostname`. Returns the number of
    /// tabs redirected.
    pub async fn block_tabs_matching(&self, hostname: &str) -> usize {
        let mut redirected = 0;

        for (tab, url, tab_host) in self.blockable_tabs().await {
            if self.policy.matches(&tab_host, hostname) && self.redirect(&tab, hostname, &url).await {
                redirected += 1;
            }
        }

        redirected
    }

    /// Redirect every open tab that hits any blocked site. The most specific
    /// matching site is the one recorded on the interstitial.
    pub async fn block_all_matching_tabs(&self, list: &BlockList) -> usize {
        if list.is_empty() {
            return 0;
        }

        let mut redirected = 0;

        for (tab, url, tab_host) in self.blockable_tabs().await {
            if let Some(site) = list.find_match(&tab_host, self.policy) {
                if self.redirect(&tab, site, &url).await {
                    redirected += 1;
                }
            }
        }

        redirected
    }

    /// Send interstitial tabs back to their original URL. With
    /// `specific_site`, only tabs blocked for exactly that site are touched.
    pub async fn restore_tabs(&self, specific_site: Option<&str>) -> usize {
        let mut restored = 0;

        for tab in self.all_tabs().await {
            let Some(page) = tab.url.as_deref().and_then(|url| self.interstitial.parse(url)) else {
                continue;
            };

            if let Some(site) = specific_site {
                if page.site.as_deref() != Some(site) {
                    continue;
                }
            }

            let Some(original) = page.restorable_url() else {
                debug!("Tab {} has no restorable url, leaving it", tab.id);
                continue;
            };

            match self.tabs.update_url(tab.id, original).await {
                Ok(()) => {
                    info!("Restored tab {} to {}", tab.id, original);
                    restored += 1;
                }
                Err(e) => warn!("Failed to restore tab {}: {}", tab.id, e),
            }
        }

        restored
    }

    async fn all_tabs(&self) -> Vec<TabInfo> {
        match self.tabs.query_all().await {
            Ok(tabs) => tabs,
            Err(e) => {
                warn!("Failed to query tabs: {}", e);
                Vec::new()
            }
        }
    }

    /// Open tabs with a web URL that are not already on the interstitial,
    /// paired with their URL and hostname.
    async fn blockable_tabs(&self) -> Vec<(TabInfo, String, String)> {
        self.all_tabs()
            .await
            .into_iter()
            .filter_map(|tab| {
                let url = tab.url.clone()?;
                if self.interstitial.is_interstitial(&url) {
                    return None;
                }
                let host = extract_hostname(&url)?;
                Some((tab, url, host))
            })
            .collect()
    }

    async fn redirect(&self, tab: &TabInfo, site: &str, url: &str) -> bool {
        let target = self.interstitial.url_for(site, url);
        match self.tabs.update_url(tab.id, &target).await {
            Ok(()) => {
                info!("Blocked tab {} ({})", tab.id, site);
                true
            }
            Err(e) => {
                warn!("Failed to block tab {}: {}", tab.id, e);
                false
            }
        }
    }
}
