/// Blocking controller: navigation checks and user commands
///
/// Every operation re-reads state from the store, applies its change and
/// writes it back. Two operations interleaving on the same key can lose an
/// update (last writer wins); nothing here serializes them.
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::block_list::BlockList;
use crate::config::Settings;
use crate::error::{ExtensionError, Result};
use crate::hostname::{MatchPolicy, extract_hostname};
use crate::interstitial::Interstitial;
use crate::store::StateStore;
use crate::sync::TabSynchronizer;
use crate::tabs::TabApi;

/// Snapshot of persisted state returned to the popup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockingState {
    pub blocked_sites: BlockList,
    pub is_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentTab {
    pub url: Option<String>,
    pub hostname: Option<String>,
}

pub struct BlockingController<S: StateStore, T: TabApi> {
    store: S,
    tabs: T,
    interstitial: Interstitial,
    now: fn() -> f64,
}

impl<S: StateStore, T: TabApi> BlockingController<S, T> {
    pub fn new(store: S, tabs: T, interstitial: Interstitial, now: fn() -> f64) -> Self {
        BlockingController {
            store,
            tabs,
            interstitial,
            now,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tabs(&self) -> &T {
        &self.tabs
    }

    pub fn interstitial(&self) -> &Interstitial {
        &self.interstitial
    }

    /// Write first-run defaults for any key that is still missing
    pub async fn initialize(&self) -> Result<()> {
        if self.store.load_block_list().await?.is_none() {
            self.store.save_block_list(&BlockList::new()).await?;
        }
        if self.store.load_enabled().await?.is_none() {
            self.store.save_enabled(true).await?;
        }
        if self.store.load_settings().await?.is_none() {
            self.store.save_settings(&Settings::default()).await?;
        }
        Ok(())
    }

    /// Check a tab that started loading `url`. Returns the blocked site it
    /// hit, if any.
    pub async fn on_navigation(&self, tab_id: i32, url: &str) -> Result<Option<String>> {
        if !self.is_enabled().await? {
            return Ok(None);
        }

        let Some(hostname) = extract_hostname(url) else {
            return Ok(None);
        };

        let policy = self.match_policy().await?;
        let mut list = self.block_list().await?;
        let Some(site) = list
            .find_match(&hostname, policy)
            .map(str::to_string)
        else {
            debug!("{} is not blocked", hostname);
            return Ok(None);
        };

        list.record_attempt(&site, (self.now)());
        self.store.save_block_list(&list).await?;

        let target = self.interstitial.url_for(&site, url);
        match self.tabs.update_url(tab_id, &target).await {
            Ok(()) => info!("Blocked tab {} visiting {} ({})", tab_id, hostname, site),
            Err(e) => warn!("Failed to redirect tab {}: {}", tab_id, e),
        }

        Ok(Some(site))
    }

    /// Block a hostname. Adding one that is already present changes nothing.
    pub async fn add_site(&self, hostname: &str) -> Result<BlockList> {
        let hostname = clean_hostname(hostname)?;
        let mut list = self.block_list().await?;

        if list.add(&hostname, (self.now)()) {
            self.store.save_block_list(&list).await?;
            info!("Added {} to the block list", hostname);

            if self.is_enabled().await? {
                let policy = self.match_policy().await?;
                self.synchronizer(policy).block_tabs_matching(&hostname).await;
            }
        }

        Ok(list)
    }

    /// Unblock a hostname and restore tabs that were blocked for it
    pub async fn remove_site(&self, hostname: &str) -> Result<BlockList> {
        let hostname = normalize_key(hostname);
        let mut list = self.block_list().await?;

        if list.remove(&hostname) {
            self.store.save_block_list(&list).await?;
            info!("Removed {} from the block list", hostname);
        }

        let policy = self.match_policy().await?;
        self.synchronizer(policy).restore_tabs(Some(&hostname)).await;

        Ok(list)
    }

    /// Flip the enabled flag and block or restore open tabs to match
    pub async fn toggle_enabled(&self) -> Result<bool> {
        let enabled = !self.is_enabled().await?;
        self.store.save_enabled(enabled).await?;
        info!("Blocking {}", if enabled { "enabled" } else { "disabled" });

        let sync = self.synchronizer(self.match_policy().await?);
        if enabled {
            let list = self.block_list().await?;
            sync.block_all_matching_tabs(&list).await;
        } else {
            sync.restore_tabs(None).await;
        }

        Ok(enabled)
    }

    pub async fn reset_attempts(&self, hostname: &str) -> Result<()> {
        let mut list = self.block_list().await?;

        if list.reset_attempts(&normalize_key(hostname)) {
            self.store.save_block_list(&list).await?;
        }

        Ok(())
    }

    pub async fn blocking_state(&self) -> Result<BlockingState> {
        Ok(BlockingState {
            blocked_sites: self.block_list().await?,
            is_enabled: self.is_enabled().await?,
        })
    }

    pub async fn settings(&self) -> Result<Settings> {
        Ok(self.store.load_settings().await?.unwrap_or_default())
    }

    /// Persist new settings. While blocking is on, open tabs that the new
    /// match policy catches are blocked straight away.
    pub async fn update_settings(&self, settings: Settings) -> Result<Settings> {
        self.store.save_settings(&settings).await?;
        info!("Match policy set to {}", settings.match_policy.as_str());

        if self.is_enabled().await? {
            let list = self.block_list().await?;
            self.synchronizer(settings.match_policy)
                .block_all_matching_tabs(&list)
                .await;
        }

        Ok(settings)
    }

    pub async fn current_tab(&self) -> Result<CurrentTab> {
        let url = self.tabs.active_tab().await?.and_then(|tab| tab.url);
        let hostname = url.as_deref().and_then(extract_hostname);
        Ok(CurrentTab { url, hostname })
    }

    async fn block_list(&self) -> Result<BlockList> {
        Ok(self.store.load_block_list().await?.unwrap_or_default())
    }

    async fn is_enabled(&self) -> Result<bool> {
        Ok(self.store.load_enabled().await?.unwrap_or(true))
    }

    async fn match_policy(&self) -> Result<MatchPolicy> {
        Ok(self.settings().await?.match_policy)
    }

    fn synchronizer(&self, policy: MatchPolicy) -> TabSynchronizer<'_, T> {
        TabSynchronizer::new(&self.tabs, &self.interstitial, policy)
    }
}

/// Block-list keys are stored trimmed and lowercased
fn normalize_key(hostname: &str) -> String {
    hostname.trim().to_ascii_lowercase()
}

fn clean_hostname(hostname: &str) -> Result<String> {
    let hostname = normalize_key(hostname);
    if hostname.is_empty() {
        return Err(ExtensionError::InvalidHostname(hostname));
    }
    Ok(hostname)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::tabs::{MemoryTabs, TabInfo};
    use futures::executor::block_on;

    const BASE: &str = "chrome-extension://abcdef/blocked.html";
    const NOW: f64 = 1_700_000_000_000.0;

    fn fixed_now() -> f64 {
        NOW
    }

    fn controller(store: MemoryStore, tabs: Vec<TabInfo>) -> BlockingController<MemoryStore, MemoryTabs> {
        BlockingController::new(
            store,
            MemoryTabs::new(tabs),
            Interstitial::new(BASE).unwrap(),
            fixed_now,
        )
    }

    fn store_with(hosts: &[(&str, u32)], enabled: bool) -> MemoryStore {
        let mut list = BlockList::new();
        for (host, attempts) in hosts {
            list.add(host, 0.0);
            for _ in 0..*attempts {
                list.record_attempt(host, 0.0);
            }
        }
        MemoryStore::with_state(list, enabled)
    }

    #[test]
    fn test_initialize_writes_defaults() {
        let c = controller(MemoryStore::new(), vec![]);

        block_on(c.initialize()).unwrap();

        assert_eq!(c.store().block_list(), Some(BlockList::new()));
        assert_eq!(c.store().enabled(), Some(true));
        assert_eq!(c.store().settings(), Some(Settings::default()));
    }

    #[test]
    fn test_initialize_keeps_existing_state() {
        let c = controller(store_with(&[("news.com", 2)], false), vec![]);

        block_on(c.initialize()).unwrap();

        assert_eq!(c.store().enabled(), Some(false));
        assert_eq!(c.store().block_list().unwrap().get("news.com").unwrap().attempts, 2);
    }

    #[test]
    fn test_navigation_to_blocked_site() {
        let c = controller(store_with(&[("news.com", 3)], true), vec![TabInfo::new(5, "https://news.com/a")]);

        let site = block_on(c.on_navigation(5, "https://news.com/a")).unwrap();

        assert_eq!(site.as_deref(), Some("news.com"));
        let entry = c.store().block_list().unwrap().get("news.com").cloned().unwrap();
        assert_eq!(entry.attempts, 4);
        assert_eq!(entry.last_attempt, Some(NOW));

        let url = c.tabs().url_of(5).unwrap();
        let page = c.interstitial().parse(&url).unwrap();
        assert_eq!(page.site.as_deref(), Some("news.com"));
        assert_eq!(page.original_url.as_deref(), Some("https://news.com/a"));
    }

    #[test]
    fn test_navigation_to_trailing_dot_host() {
        let c = controller(store_with(&[("news.com", 0)], true), vec![TabInfo::new(5, "https://news.com./a")]);

        let site = block_on(c.on_navigation(5, "https://news.com./a")).unwrap();

        assert_eq!(site.as_deref(), Some("news.com"));
        let page = c.interstitial().parse(&c.tabs().url_of(5).unwrap()).unwrap();
        assert_eq!(page.site.as_deref(), Some("news.com"));
        assert_eq!(page.original_url.as_deref(), Some("https://news.com./a"));
    }

    #[test]
    fn test_navigation_credits_most_specific_site() {
        let c = controller(store_with(&[("news.com", 0), ("video.news.com", 0)], true), vec![]);

        let site = block_on(c.on_navigation(5, "https://clip.video.news.com/")).unwrap();

        assert_eq!(site.as_deref(), Some("video.news.com"));
        let list = c.store().block_list().unwrap();
        assert_eq!(list.get("video.news.com").unwrap().attempts, 1);
        assert_eq!(list.get("news.com").unwrap().attempts, 0);
    }

    #[test]
    fn test_navigation_when_disabled() {
        let c = controller(store_with(&[("news.com", 0)], false), vec![TabInfo::new(5, "https://news.com/a")]);

        assert_eq!(block_on(c.on_navigation(5, "https://news.com/a")).unwrap(), None);
        assert_eq!(c.store().block_list().unwrap().get("news.com").unwrap().attempts, 0);
        assert!(c.tabs().updates().is_empty());
    }

    #[test]
    fn test_navigation_unblocked_or_internal() {
        let c = controller(store_with(&[("news.com", 0)], true), vec![TabInfo::new(5, "https://github.com")]);

        assert_eq!(block_on(c.on_navigation(5, "https://github.com")).unwrap(), None);
        assert_eq!(block_on(c.on_navigation(5, "chrome://settings")).unwrap(), None);
        assert!(c.tabs().updates().is_empty());
    }

    #[test]
    fn test_navigation_redirect_failure_still_counts() {
        let c = controller(store_with(&[("news.com", 0)], true), vec![]);

        let site = block_on(c.on_navigation(42, "https://news.com")).unwrap();

        assert_eq!(site.as_deref(), Some("news.com"));
        assert_eq!(c.store().block_list().unwrap().get("news.com").unwrap().attempts, 1);
    }

    #[test]
    fn test_navigation_store_failure_propagates() {
        let store = store_with(&[("news.com", 0)], true);
        store.fail_writes(true);
        let c = controller(store, vec![TabInfo::new(5, "https://news.com/a")]);

        assert!(block_on(c.on_navigation(5, "https://news.com/a")).is_err());
        assert!(c.tabs().updates().is_empty());
    }

    #[test]
    fn test_add_site_then_blocking_state() {
        let c = controller(MemoryStore::new(), vec![]);

        block_on(c.add_site("example.com")).unwrap();
        let state = block_on(c.blocking_state()).unwrap();

        let entry = state.blocked_sites.get("example.com").unwrap();
        assert_eq!(entry.attempts, 0);
        assert_eq!(entry.last_attempt, None);
        assert_eq!(entry.added_at, NOW);
        assert!(state.is_enabled);
    }

    #[test]
    fn test_add_site_blocks_open_tabs_when_enabled() {
        let c = controller(
            store_with(&[], true),
            vec![TabInfo::new(1, "https://www.news.com/a"), TabInfo::new(2, "https://github.com")],
        );

        block_on(c.add_site("news.com")).unwrap();

        assert!(c.interstitial().is_interstitial(&c.tabs().url_of(1).unwrap()));
        assert_eq!(c.tabs().url_of(2).as_deref(), Some("https://github.com"));
    }

    #[test]
    fn test_add_site_leaves_tabs_when_disabled() {
        let c = controller(store_with(&[], false), vec![TabInfo::new(1, "https://news.com/a")]);

        block_on(c.add_site("news.com")).unwrap();

        assert!(c.store().block_list().unwrap().contains("news.com"));
        assert!(c.tabs().updates().is_empty());
    }

    #[test]
    fn test_add_existing_site_is_a_no_op() {
        let c = controller(store_with(&[("news.com", 3)], true), vec![TabInfo::new(1, "https://news.com/a")]);

        let list = block_on(c.add_site("news.com")).unwrap();

        assert_eq!(list.get("news.com").unwrap().attempts, 3);
        assert!(c.tabs().updates().is_empty());
    }

    #[test]
    fn test_add_empty_site_is_rejected() {
        let c = controller(MemoryStore::new(), vec![]);
        assert!(matches!(block_on(c.add_site("  ")), Err(ExtensionError::InvalidHostname(_))));
    }

    #[test]
    fn test_remove_site_restores_its_tabs_only() {
        let i = Interstitial::new(BASE).unwrap();
        let c = controller(
            store_with(&[("news.com", 1), ("video.org", 1)], true),
            vec![
                TabInfo::new(1, &i.url_for("news.com", "https://news.com/a")),
                TabInfo::new(2, &i.url_for("video.org", "https://video.org/")),
            ],
        );

        let list = block_on(c.remove_site("news.com")).unwrap();

        assert!(!list.contains("news.com"));
        assert!(list.contains("video.org"));
        assert_eq!(c.tabs().url_of(1).as_deref(), Some("https://news.com/a"));
        assert!(i.is_interstitial(&c.tabs().url_of(2).unwrap()));
    }

    #[test]
    fn test_remove_and_reset_ignore_case() {
        let c = controller(MemoryStore::new(), vec![]);
        block_on(c.add_site("News.com")).unwrap();
        block_on(c.on_navigation(1, "https://news.com/")).unwrap();

        block_on(c.reset_attempts(" NEWS.com")).unwrap();
        assert_eq!(c.store().block_list().unwrap().get("news.com").unwrap().attempts, 0);

        let list = block_on(c.remove_site("News.COM ")).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_remove_missing_site() {
        let c = controller(store_with(&[("news.com", 1)], true), vec![]);

        let list = block_on(c.remove_site("missing.com")).unwrap();

        assert_eq!(list.len(), 1);
        assert_eq!(c.store().block_list().unwrap().len(), 1);
    }

    #[test]
    fn test_toggle_disable_restores_tabs() {
        let i = Interstitial::new(BASE).unwrap();
        let c = controller(
            store_with(&[("news.com", 0)], true),
            vec![TabInfo::new(1, &i.url_for("news.com", "https://news.com/a"))],
        );

        assert!(!block_on(c.toggle_enabled()).unwrap());

        assert_eq!(c.store().enabled(), Some(false));
        assert_eq!(c.tabs().url_of(1).as_deref(), Some("https://news.com/a"));
    }

    #[test]
    fn test_toggle_twice_is_symmetric() {
        let c = controller(
            store_with(&[("news.com", 0)], true),
            vec![TabInfo::new(1, "https://news.com/a"), TabInfo::new(2, "https://github.com")],
        );

        // Enable -> disable: nothing to restore yet
        assert!(!block_on(c.toggle_enabled()).unwrap());
        assert_eq!(c.tabs().url_of(1).as_deref(), Some("https://news.com/a"));

        // Disable -> enable: matching tab is blocked
        assert!(block_on(c.toggle_enabled()).unwrap());
        assert!(c.interstitial().is_interstitial(&c.tabs().url_of(1).unwrap()));

        // And back again: it is restored
        assert!(!block_on(c.toggle_enabled()).unwrap());
        assert_eq!(c.tabs().url_of(1).as_deref(), Some("https://news.com/a"));
        assert_eq!(c.tabs().url_of(2).as_deref(), Some("https://github.com"));
    }

    #[test]
    fn test_toggle_on_fresh_store() {
        let c = controller(MemoryStore::new(), vec![]);
        assert!(!block_on(c.toggle_enabled()).unwrap());
    }

    #[test]
    fn test_reset_attempts() {
        let c = controller(store_with(&[("news.com", 5)], true), vec![]);
        block_on(c.on_navigation(1, "https://news.com")).unwrap();

        block_on(c.reset_attempts("news.com")).unwrap();
        block_on(c.reset_attempts("missing.com")).unwrap();

        let list = c.store().block_list().unwrap();
        assert_eq!(list.get("news.com").unwrap().attempts, 0);
        assert_eq!(list.get("news.com").unwrap().last_attempt, Some(NOW));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_current_tab() {
        let c = controller(
            MemoryStore::new(),
            vec![TabInfo::new(1, "https://github.com"), TabInfo::new(2, "https://www.news.com/x")],
        );
        assert_eq!(block_on(c.current_tab()).unwrap(), CurrentTab { url: None, hostname: None });

        c.tabs().set_active(2);

        let current = block_on(c.current_tab()).unwrap();
        assert_eq!(current.url.as_deref(), Some("https://www.news.com/x"));
        assert_eq!(current.hostname.as_deref(), Some("news.com"));
    }

    #[test]
    fn test_stored_policy_is_used() {
        let store = store_with(&[("example.com", 0)], true);
        block_on(store_policy(&store, MatchPolicy::Substring));
        let c = controller(store, vec![]);

        let site = block_on(c.on_navigation(1, "https://myexample.community")).unwrap();

        assert_eq!(site.as_deref(), Some("example.com"));
    }

    async fn store_policy(store: &MemoryStore, policy: MatchPolicy) {
        let settings = Settings {
            match_policy: policy,
            ..Settings::default()
        };
        store.save_settings(&settings).await.unwrap();
    }

    #[test]
    fn test_default_policy_skips_lookalikes() {
        let c = controller(store_with(&[("example.com", 0)], true), vec![]);

        assert_eq!(block_on(c.on_navigation(1, "https://myexample.community")).unwrap(), None);
    }

    #[test]
    fn test_update_settings_blocks_newly_matching_tabs() {
        let c = controller(
            store_with(&[("example.com", 0)], true),
            vec![TabInfo::new(1, "https://myexample.community/"), TabInfo::new(2, "https://github.com")],
        );
        assert_eq!(block_on(c.settings()).unwrap(), Settings::default());

        let settings = Settings {
            match_policy: MatchPolicy::Substring,
            ..Settings::default()
        };
        let saved = block_on(c.update_settings(settings.clone())).unwrap();

        assert_eq!(saved, settings);
        assert_eq!(c.store().settings(), Some(settings));
        assert!(c.interstitial().is_interstitial(&c.tabs().url_of(1).unwrap()));
        assert_eq!(c.tabs().url_of(2).as_deref(), Some("https://github.com"));
    }

    #[test]
    fn test_update_settings_while_disabled_leaves_tabs() {
        let c = controller(store_with(&[("example.com", 0)], false), vec![TabInfo::new(1, "https://myexample.community/")]);

        let settings = Settings {
            match_policy: MatchPolicy::Substring,
            ..Settings::default()
        };
        block_on(c.update_settings(settings)).unwrap();

        assert!(c.tabs().updates().is_empty());
    }

    #[test]
    fn test_concurrent_navigations_can_lose_an_update() {
        let store = store_with(&[("news.com", 0)], true);
        // Both handlers read the list before either writes it back
        store.yield_after_read(true);
        let c = controller(store, vec![TabInfo::new(1, "https://news.com/a"), TabInfo::new(2, "https://news.com/b")]);

        let (first, second) = block_on(async {
            futures::join!(
                c.on_navigation(1, "https://news.com/a"),
                c.on_navigation(2, "https://news.com/b"),
            )
        });

        assert_eq!(first.unwrap().as_deref(), Some("news.com"));
        assert_eq!(second.unwrap().as_deref(), Some("news.com"));
        // Two visits, one recorded: last writer wins
        assert_eq!(c.store().block_list().unwrap().get("news.com").unwrap().attempts, 1);
        assert_eq!(c.tabs().updates().len(), 2);
    }
}
