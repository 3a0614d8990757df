//! Passive host search via the hackertarget hostsearch API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use super::{Source, SourceError};
use crate::candidates::CandidateSet;
use crate::domain_utils::TargetDomain;

const SOURCE_NAME: &str = "hackertarget";

pub struct HostSearchDiscovery {
    client: Client,
    base_url: String,
}

impl HostSearchDiscovery {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn query_url(&self, domain: &TargetDomain) -> String {
        format!("{}?q={}", self.base_url, urlencoding::encode(domain.as_str()))
    }
}

#[async_trait]
impl Source for HostSearchDiscovery {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn collect(&self, domain: &TargetDomain) -> Result<CandidateSet, SourceError> {
        info!("Querying hackertarget hostsearch for {}", domain);

        let url = self.query_url(domain);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::unavailable(SOURCE_NAME, e))?;

        if response.status() != StatusCode::OK {
            warn!("hackertarget returned status {} for {}", response.status(), domain);
            return Err(SourceError::unavailable(
                SOURCE_NAME,
                format!("HTTP {}", response.status()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::unavailable(SOURCE_NAME, e))?;

        let candidates = parse_hostsearch_response(&body, domain);
        if candidates.is_empty() && !body.trim().is_empty() {
            // Quota and error notices come back as 200 with a single free-text line
            debug!("hackertarget returned no host records: {}", body.trim());
        }

        info!("hackertarget found {} candidate hostnames for {}", candidates.len(), domain);
        Ok(candidates)
    }
}

/// Keep the first field of every `hostname,address` line that has exactly
/// two comma-separated fields and whose hostname contains `domain`.
pub fn parse_hostsearch_response(body: &str, domain: &TargetDomain) -> CandidateSet {
    body.trim()
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split(',').collect();
            if parts.len() != 2 {
                return None;
            }
            let host = parts[0].trim().to_lowercase();
            if host.contains(domain.as_str()) {
                Some(host)
            } else {
                debug!("Skipping out-of-scope host from hackertarget: {}", host);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> TargetDomain {
        TargetDomain::parse("example.com").unwrap()
    }

    #[test]
    fn test_parse_hostsearch_lines() {
        let body = "www.example.com,93.184.216.34\nMail.Example.com,93.184.216.35\r\n";
        let set = parse_hostsearch_response(body, &example());
        assert_eq!(set.sorted(), vec!["mail.example.com", "www.example.com"]);
    }

    #[test]
    fn test_parse_hostsearch_skips_malformed_lines() {
        let body = "API count exceeded - Increase Quota with Membership\n\
                    a.example.com,1.2.3.4,extra\n\
                    b.example.com\n\
                    c.example.com,1.2.3.5";
        let set = parse_hostsearch_response(body, &example());
        assert_eq!(set.sorted(), vec!["c.example.com"]);
    }

    #[test]
    fn test_parse_hostsearch_drops_hosts_outside_domain() {
        let body = "www.example.com,1.1.1.1\nevil.org,6.6.6.6";
        let set = parse_hostsearch_response(body, &example());
        assert!(set.iter().all(|h| h.contains("example.com")));
        assert!(!set.contains("evil.org"));
        assert!(set.contains("www.example.com"));
    }

    #[test]
    fn test_parse_hostsearch_empty() {
        assert!(parse_hostsearch_response("", &example()).is_empty());
        assert!(parse_hostsearch_response("\n\n", &example()).is_empty());
    }

    #[test]
    fn test_query_url() {
        let source =
            HostSearchDiscovery::new(Client::new(), "https://api.hackertarget.com/hostsearch/");
        assert_eq!(
            source.query_url(&example()),
            "https://api.hackertarget.com/hostsearch/?q=example.com"
        );
    }
}
