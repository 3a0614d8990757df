//! The collect -> aggregate -> resolve pipeline.

use anyhow::{Context, Result};
use futures::future::join_all;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::candidates::{self, CandidateSet};
use crate::config::AppConfig;
use crate::discovery::{
    BruteForceDiscovery, CtLogDiscovery, HostSearchDiscovery, Source, SourceError,
};
use crate::dns::{self, HostResolver, ResolveSettings, ResolvedEntry, SystemResolver};
use crate::domain_utils::TargetDomain;
use crate::logger::ScanLogger;
use crate::rate_limit::RateLimitContext;

/// What one source contributed to a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceOutcome {
    pub source: String,
    pub candidates: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of one discovery run
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryReport {
    pub target: TargetDomain,
    /// Sorted by hostname
    pub subdomains: Vec<ResolvedEntry>,
    pub total_candidates: usize,
    pub total_resolved: usize,
    pub sources: Vec<SourceOutcome>,
    pub cancelled: bool,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64((d.as_secs_f64() * 100.0).round() / 100.0)
}

/// Runs every configured source, merges their candidates and validates them.
pub struct SubdomainScanner {
    sources: Vec<Box<dyn Source>>,
    resolver: Arc<dyn HostResolver>,
    settings: ResolveSettings,
    rate_limit: RateLimitContext,
    collector_timeout: Duration,
    logger: Option<ScanLogger>,
}

impl SubdomainScanner {
    pub fn new(
        sources: Vec<Box<dyn Source>>,
        resolver: Arc<dyn HostResolver>,
        settings: ResolveSettings,
    ) -> Self {
        Self {
            sources,
            resolver,
            settings,
            rate_limit: RateLimitContext::default(),
            collector_timeout: Duration::from_secs(120),
            logger: None,
        }
    }

    /// Build the production scanner: hickory resolver plus every source the
    /// configuration enables.
    pub fn from_config(config: &AppConfig, logger: Option<ScanLogger>) -> Result<Self> {
        let resolver = SystemResolver::from_config(&config.dns)
            .context("Failed to create DNS resolver")?;
        let resolver: Arc<dyn HostResolver> = Arc::new(resolver);
        Self::from_config_with_resolver(config, resolver, logger)
    }

    /// Same as `from_config` with a caller-supplied resolver
    pub fn from_config_with_resolver(
        config: &AppConfig,
        resolver: Arc<dyn HostResolver>,
        logger: Option<ScanLogger>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.http.request_timeout())
            .user_agent(&config.http.user_agent)
            .build()
            .context("Failed to create HTTP client")?;

        let settings = ResolveSettings::from_config(&config.dns);
        let rate_limit = RateLimitContext::from_config(&config.rate_limit);
        rate_limit.log_config();

        let mut sources: Vec<Box<dyn Source>> = Vec::new();
        if config.discovery.bruteforce_enabled {
            let mut bruteforce = BruteForceDiscovery::new(
                config.discovery.wordlist.clone(),
                Arc::clone(&resolver),
                settings.clone(),
                rate_limit.clone(),
            );
            if let Some(logger) = &logger {
                bruteforce = bruteforce.with_logger(logger.clone());
            }
            sources.push(Box::new(bruteforce));
        }
        if config.discovery.ct_enabled {
            sources.push(Box::new(
                CtLogDiscovery::new(client.clone(), config.discovery.crtsh_url.clone())
                    .with_strip_wildcards(config.discovery.strip_wildcards),
            ));
        }
        if config.discovery.passive_enabled {
            sources.push(Box::new(HostSearchDiscovery::new(
                client,
                config.discovery.hostsearch_url.clone(),
            )));
        }

        Ok(Self {
            sources,
            resolver,
            settings,
            rate_limit,
            collector_timeout: config.discovery.collector_timeout(),
            logger,
        })
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitContext) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_collector_timeout(mut self, timeout: Duration) -> Self {
        self.collector_timeout = timeout;
        self
    }

    pub fn with_logger(mut self, logger: ScanLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Run every source concurrently and join. A source that errors, exceeds
    /// the collector timeout or is cut short by cancellation contributes an
    /// empty set.
    pub async fn collect(
        &self,
        target: &TargetDomain,
        cancel: &CancellationToken,
    ) -> Vec<(SourceOutcome, CandidateSet)> {
        let runs = self.sources.iter().map(|source| async move {
            if let Some(logger) = &self.logger {
                logger.log_source_start(source.name());
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => Err(SourceError::unavailable(source.name(), "cancelled")),
                timed = tokio::time::timeout(self.collector_timeout, source.collect(target)) => {
                    timed.unwrap_or_else(|_| {
                        Err(SourceError::unavailable(
                            source.name(),
                            format!("timed out after {:?}", self.collector_timeout),
                        ))
                    })
                }
            };

            match result {
                Ok(set) => {
                    debug!("{} produced {} candidates", source.name(), set.len());
                    if let Some(logger) = &self.logger {
                        logger.log_source_complete(source.name(), set.len());
                    }
                    let outcome = SourceOutcome {
                        source: source.name().to_string(),
                        candidates: set.len(),
                        error: None,
                    };
                    (outcome, set)
                }
                Err(e) => {
                    warn!("{}", e);
                    if let Some(logger) = &self.logger {
                        logger.log_source_failed(source.name(), &e.to_string());
                    }
                    let outcome = SourceOutcome {
                        source: source.name().to_string(),
                        candidates: 0,
                        error: Some(e.to_string()),
                    };
                    (outcome, CandidateSet::new())
                }
            }
        });

        join_all(runs).await
    }

    /// Collect, aggregate and resolve. Never fails: source and lookup errors
    /// only shrink the result, and an empty report is a valid outcome.
    pub async fn scan(&self, target: &TargetDomain, cancel: &CancellationToken) -> DiscoveryReport {
        let started = Instant::now();
        if let Some(logger) = &self.logger {
            logger.log_scan_start(target.as_str());
        }
        info!("Enumerating subdomains for {} with sources: {:?}", target, self.source_names());

        let collected = self.collect(target, cancel).await;
        let merged = candidates::merge(collected.iter().map(|(_, set)| set));
        let sources: Vec<SourceOutcome> =
            collected.into_iter().map(|(outcome, _)| outcome).collect();

        if let Some(logger) = &self.logger {
            logger.log_candidates_merged(merged.len());
        }
        info!("Merged {} unique candidates for {}", merged.len(), target);

        let validation = dns::resolve_candidates(
            &merged,
            Arc::clone(&self.resolver),
            &self.settings,
            &self.rate_limit,
            cancel,
            self.logger.as_ref(),
        )
        .await;

        let total_resolved = validation.entries.len();
        if let Some(logger) = &self.logger {
            logger.log_scan_complete(total_resolved, validation.cancelled);
        }
        info!(
            "Resolved {} of {} candidates for {}",
            total_resolved,
            merged.len(),
            target
        );

        DiscoveryReport {
            target: target.clone(),
            subdomains: validation.entries,
            total_candidates: merged.len(),
            total_resolved,
            sources,
            cancelled: validation.cancelled,
            elapsed: started.elapsed(),
        }
    }
}

/// Discover and validate subdomains of `target` using the sources and
/// resolver described by `config`.
pub async fn discover_subdomains(
    target: &TargetDomain,
    config: &AppConfig,
    cancel: &CancellationToken,
) -> Result<DiscoveryReport> {
    let scanner = SubdomainScanner::from_config(config, None)?;
    Ok(scanner.scan(target, cancel).await)
}
