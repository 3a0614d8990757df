//! DNS brute force over a wordlist.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::{Source, SourceError};
use crate::candidates::CandidateSet;
use crate::dns::{self, HostResolver, ResolveSettings};
use crate::domain_utils::{self, TargetDomain};
use crate::logger::ScanLogger;
use crate::rate_limit::RateLimitContext;

pub struct BruteForceDiscovery {
    wordlist: Vec<String>,
    resolver: Arc<dyn HostResolver>,
    settings: ResolveSettings,
    rate_limit: RateLimitContext,
    logger: Option<ScanLogger>,
}

impl BruteForceDiscovery {
    pub fn new(
        wordlist: Vec<String>,
        resolver: Arc<dyn HostResolver>,
        settings: ResolveSettings,
        rate_limit: RateLimitContext,
    ) -> Self {
        Self {
            wordlist,
            resolver,
            settings,
            rate_limit,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: ScanLogger) -> Self {
        self.logger = Some(logger);
        self
    }
}

#[async_trait]
impl Source for BruteForceDiscovery {
    fn name(&self) -> &str {
        "bruteforce"
    }

    /// Any lookup error counts as "not found"; this source never fails.
    async fn collect(&self, domain: &TargetDomain) -> Result<CandidateSet, SourceError> {
        info!("Running DNS brute-force with {} words against {}", self.wordlist.len(), domain);

        let hosts: Vec<String> = self
            .wordlist
            .iter()
            .filter(|word| !word.trim().is_empty())
            .map(|word| domain_utils::join_label(word, domain))
            .collect();

        let settings = &self.settings;
        let rate_limit = &self.rate_limit;
        let hits: Vec<(String, IpAddr)> = stream::iter(hosts)
            .map(|host| {
                let resolver = Arc::clone(&self.resolver);
                async move {
                    let result =
                        dns::lookup_host(resolver.as_ref(), &host, settings, rate_limit).await;
                    match result {
                        Ok(ip) => {
                            info!("Found via brute-force: {} -> {}", host, ip);
                            if let Some(logger) = &self.logger {
                                logger.log_bruteforce_hit(&host, &ip);
                            }
                            Some((host, ip))
                        }
                        Err(e) => {
                            debug!("Brute-force miss {}: {}", host, e);
                            None
                        }
                    }
                }
            })
            .buffer_unordered(self.settings.concurrency.max(1))
            .filter_map(futures::future::ready)
            .collect()
            .await;

        let mut found = CandidateSet::new();
        for (host, ip) in hits {
            found.insert_resolved(&host, ip);
        }
        Ok(found)
    }
}

/// Read a wordlist file: one word per line, blank lines and `#` comments skipped.
pub fn load_wordlist(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read wordlist: {}", path.display()))?;
    Ok(parse_wordlist(&content))
}

pub fn parse_wordlist(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::LookupError;

    struct OnlyWww;

    #[async_trait]
    impl HostResolver for OnlyWww {
        async fn lookup(&self, host: &str) -> Result<IpAddr, LookupError> {
            match host {
                "www.example.com" => Ok("93.184.216.34".parse().unwrap()),
                "ftp.example.com" => Err(LookupError::Resolver {
                    host: host.to_string(),
                    reason: "SERVFAIL".to_string(),
                }),
                _ => Err(LookupError::NotFound(host.to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_only_resolving_words_are_kept() {
        let source = BruteForceDiscovery::new(
            vec!["www".into(), "mail".into(), "ftp".into(), "".into()],
            Arc::new(OnlyWww),
            ResolveSettings::default(),
            RateLimitContext::default(),
        );
        let domain = TargetDomain::parse("example.com").unwrap();

        let found = source.collect(&domain).await.unwrap();
        assert_eq!(found.sorted(), vec!["www.example.com"]);
        assert_eq!(
            found.known_address("www.example.com"),
            Some("93.184.216.34".parse().unwrap())
        );
    }

    #[test]
    fn test_parse_wordlist() {
        let words = parse_wordlist("www\n# comment\n\n  API \r\nmail\n");
        assert_eq!(words, vec!["www", "api", "mail"]);
    }

    #[test]
    fn test_load_wordlist_missing_file() {
        assert!(load_wordlist(Path::new("/nonexistent/words.txt")).is_err());
    }
}
