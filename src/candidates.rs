//! Candidate hostname sets and the aggregation step that merges them.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;

use crate::domain_utils;

/// Unvalidated hostnames from one or more sources.
///
/// Entries are trimmed and lowercased on insertion so names that differ only
/// in case or surrounding whitespace collapse into one entry. A source that
/// already resolved a name during this run (brute force) records the address
/// alongside it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    hosts: HashSet<String>,
    addresses: HashMap<String, IpAddr>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a hostname. Returns true if it was not already present.
    /// Empty names are ignored.
    pub fn insert(&mut self, hostname: &str) -> bool {
        match domain_utils::normalize_hostname(hostname) {
            Some(normalized) => self.hosts.insert(normalized),
            None => false,
        }
    }

    /// Insert a hostname together with an address it resolved to. When two
    /// addresses are recorded for one name the lower one is kept, so merging
    /// stays independent of source order.
    pub fn insert_resolved(&mut self, hostname: &str, ip: IpAddr) -> bool {
        let Some(normalized) = domain_utils::normalize_hostname(hostname) else {
            return false;
        };
        self.addresses
            .entry(normalized.clone())
            .and_modify(|known| *known = (*known).min(ip))
            .or_insert(ip);
        self.hosts.insert(normalized)
    }

    /// Address recorded for `hostname` by the source that found it, if any
    pub fn known_address(&self, hostname: &str) -> Option<IpAddr> {
        domain_utils::normalize_hostname(hostname).and_then(|h| self.addresses.get(&h).copied())
    }

    /// Hostnames that already resolved during collection, with their addresses
    pub fn known_addresses(&self) -> impl Iterator<Item = (&str, IpAddr)> {
        self.addresses.iter().map(|(host, ip)| (host.as_str(), *ip))
    }

    pub fn contains(&self, hostname: &str) -> bool {
        domain_utils::normalize_hostname(hostname)
            .map(|h| self.hosts.contains(&h))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(String::as_str)
    }

    /// Hostnames in ascending order, the order validation walks them in.
    pub fn sorted(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self.hosts.iter().cloned().collect();
        hosts.sort();
        hosts
    }

    pub fn extend_from(&mut self, other: &CandidateSet) {
        for host in other.iter() {
            match other.addresses.get(host) {
                Some(ip) => self.insert_resolved(host, *ip),
                None => self.insert(host),
            };
        }
    }
}

impl<S: AsRef<str>> FromIterator<S> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = CandidateSet::new();
        for host in iter {
            set.insert(host.as_ref());
        }
        set
    }
}

impl IntoIterator for CandidateSet {
    type Item = String;
    type IntoIter = std::collections::hash_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.hosts.into_iter()
    }
}

/// Union of all candidate sets. Pure: no I/O, no validation, and the result
/// does not depend on the order of `sets`.
pub fn merge<'a, I>(sets: I) -> CandidateSet
where
    I: IntoIterator<Item = &'a CandidateSet>,
{
    let mut merged = CandidateSet::new();
    for set in sets {
        merged.extend_from(set);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_normalizes_case_and_whitespace() {
        let mut set = CandidateSet::new();
        assert!(set.insert("Www.example.com"));
        assert!(!set.insert("www.example.com"));
        assert!(!set.insert("  WWW.EXAMPLE.COM\n"));
        assert!(!set.insert(""));
        assert_eq!(set.len(), 1);
        assert!(set.contains("www.EXAMPLE.com"));
    }

    #[test]
    fn test_merge_with_itself_is_idempotent() {
        let set: CandidateSet = ["a.example.com", "b.example.com"].into_iter().collect();
        let merged = merge([&set, &set]);
        assert_eq!(merged, set);
        assert_eq!(merge([&merged, &set]), set);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let a: CandidateSet = ["www.example.com", "api.example.com"].into_iter().collect();
        let b: CandidateSet = ["API.example.com", "mail.example.com"].into_iter().collect();
        let c = CandidateSet::new();

        let forward = merge([&a, &b, &c]);
        let backward = merge([&c, &b, &a]);

        assert_eq!(forward, backward);
        assert_eq!(
            forward.sorted(),
            vec!["api.example.com", "mail.example.com", "www.example.com"]
        );
    }

    #[test]
    fn test_merge_keeps_known_addresses() {
        let mut brute = CandidateSet::new();
        brute.insert_resolved("WWW.example.com", "10.0.0.2".parse().unwrap());
        let mut other = CandidateSet::new();
        other.insert_resolved("www.example.com", "10.0.0.1".parse().unwrap());
        let passive: CandidateSet = ["www.example.com", "mail.example.com"].into_iter().collect();

        let forward = merge([&brute, &passive, &other]);
        let backward = merge([&other, &passive, &brute]);

        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 2);
        assert_eq!(
            forward.known_address("www.example.com"),
            Some("10.0.0.1".parse().unwrap())
        );
        assert_eq!(forward.known_address("mail.example.com"), None);
    }

    #[test]
    fn test_merge_of_nothing_is_empty() {
        let merged = merge(std::iter::empty());
        assert!(merged.is_empty());
    }
}
