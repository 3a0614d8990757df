use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use subrecon::{HostResolver, LookupError};

/// In-memory resolver: hosts in the table resolve, everything else is NXDOMAIN.
/// Records every query so tests can assert on what was looked up.
#[derive(Default)]
pub struct StaticResolver {
    table: HashMap<String, IpAddr>,
    queries: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl StaticResolver {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            table: entries
                .iter()
                .map(|(host, ip)| (host.to_string(), ip.parse().expect("valid test IP")))
                .collect(),
            ..Default::default()
        }
    }

    pub fn queries(&self) -> Vec<String> {
        let mut queries = self.queries.lock().unwrap().clone();
        queries.sort();
        queries
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostResolver for StaticResolver {
    async fn lookup(&self, host: &str) -> Result<IpAddr, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(host.to_string());
        self.table
            .get(host)
            .copied()
            .ok_or_else(|| LookupError::NotFound(host.to_string()))
    }
}
