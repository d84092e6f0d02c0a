/// Blocked sites and their attempt bookkeeping
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::hostname::MatchPolicy;

/// Metadata kept for one blocked hostname. Timestamps are epoch millis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlockEntry {
    #[serde(default)]
    pub added_at: f64,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_attempt: Option<f64>,
}

impl BlockEntry {
    pub fn new(added_at: f64) -> BlockEntry {
        BlockEntry {
            added_at,
            attempts: 0,
            last_attempt: None,
        }
    }

    pub fn record_attempt(&mut self, now: f64) {
        self.attempts = self.attempts.saturating_add(1);
        self.last_attempt = Some(now);
    }
}

/// Hostname → entry map, persisted under `blockedSites` as a plain object.
///
/// Lookups pick the most specific matching entry, so the result does not
/// depend on the order sites were added.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct BlockList {
    sites: BTreeMap<String, BlockEntry>,
}

impl BlockList {
    pub fn new() -> Self {
        BlockList {
            sites: BTreeMap::new(),
        }
    }

    /// Insert a fresh entry. Returns false (and leaves counters alone) if
    /// the hostname is already present.
    pub fn add(&mut self, hostname: &str, now: f64) -> bool {
        if self.sites.contains_key(hostname) {
            return false;
        }
        self.sites.insert(hostname.to_string(), BlockEntry::new(now));
        true
    }

    pub fn remove(&mut self, hostname: &str) -> bool {
        self.sites.remove(hostname).is_some()
    }

    pub fn get(&self, hostname: &str) -> Option<&BlockEntry> {
        self.sites.get(hostname)
    }

    pub fn contains(&self, hostname: &str) -> bool {
        self.sites.contains_key(hostname)
    }

    pub fn record_attempt(&mut self, hostname: &str, now: f64) -> bool {
        self.sites
            .get_mut(hostname)
            .map(|entry| entry.record_attempt(now))
            .is_some()
    }

    /// Zero the counter; `last_attempt` is kept.
    pub fn reset_attempts(&mut self, hostname: &str) -> bool {
        self.sites
            .get_mut(hostname)
            .map(|entry| {
                entry.attempts = 0;
            })
            .is_some()
    }

    /// The most specific blocked hostname that `hostname` hits: the longest
    /// matching key, ties going to the alphabetically first.
    pub fn find_match(&self, hostname: &str, policy: MatchPolicy) -> Option<&str> {
        self.sites
            .keys()
            .filter(|blocked| policy.matches(hostname, blocked))
            .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| b.cmp(a)))
            .map(String::as_str)
    }

    pub fn is_blocked(&self, hostname: &str, policy: MatchPolicy) -> bool {
        self.find_match(hostname, policy).is_some()
    }

    pub fn hostnames(&self) -> impl Iterator<Item = &str> {
        self.sites.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BlockEntry)> {
        self.sites.iter().map(|(host, entry)| (host.as_str(), entry))
    }

    /// Entries by attempts descending, then hostname ascending
    pub fn sorted_by_attempts(&self) -> Vec<(String, BlockEntry)> {
        let mut entries: Vec<(String, BlockEntry)> = self
            .sites
            .iter()
            .map(|(host, entry)| (host.clone(), entry.clone()))
            .collect();

        entries.sort_by(|a, b| b.1.attempts.cmp(&a.1.attempts).then_with(|| a.0.cmp(&b.0)));
        entries
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}
