//! Forward DNS resolution and the validation pass over merged candidates.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use hickory_resolver::config::{
    LookupIpStrategy, NameServerConfigGroup, ResolverConfig, ResolverOpts,
};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::TokioAsyncResolver;
use serde::Serialize;
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::candidates::CandidateSet;
use crate::config::DnsConfig;
use crate::logger::ScanLogger;
use crate::rate_limit::RateLimitContext;

/// Why a single lookup produced no address
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("no such host: {0}")]
    NotFound(String),

    #[error("lookup for {0} timed out")]
    Timeout(String),

    #[error("resolver error for {host}: {reason}")]
    Resolver { host: String, reason: String },
}

impl LookupError {
    /// Timeouts and resolver errors may succeed on a second try; NXDOMAIN won't.
    pub fn is_transient(&self) -> bool {
        !matches!(self, LookupError::NotFound(_))
    }
}

/// A hostname that resolved during this run, paired with its first address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ResolvedEntry {
    pub subdomain: String,
    pub ip: IpAddr,
}

/// Forward resolution capability. The production implementation wraps
/// hickory; tests substitute a static table.
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// Resolve `host` and return the first A record address.
    async fn lookup(&self, host: &str) -> Result<IpAddr, LookupError>;
}

/// hickory-backed resolver using the system configuration or explicit nameservers
pub struct SystemResolver {
    resolver: TokioAsyncResolver,
}

impl SystemResolver {
    pub fn from_config(config: &DnsConfig) -> anyhow::Result<Self> {
        let mut opts = ResolverOpts::default();
        opts.timeout = config.timeout();
        opts.attempts = 1;
        opts.ip_strategy = LookupIpStrategy::Ipv4Only;
        opts.validate = false;

        let resolver = if config.nameservers.is_empty() {
            let system = hickory_resolver::system_conf::read_system_conf();
            let (system_config, mut system_opts) = match system {
                Ok(system) => system,
                Err(e) => {
                    warn!(
                        "Failed to read system DNS configuration ({}), using built-in defaults",
                        e
                    );
                    (ResolverConfig::default(), ResolverOpts::default())
                }
            };
            system_opts.timeout = opts.timeout;
            system_opts.attempts = opts.attempts;
            system_opts.ip_strategy = opts.ip_strategy;
            system_opts.validate = opts.validate;
            TokioAsyncResolver::tokio(system_config, system_opts)
        } else {
            let ips = config
                .nameservers
                .iter()
                .map(|s| {
                    s.parse::<IpAddr>()
                        .map_err(|e| anyhow::anyhow!("Invalid nameserver address '{}': {}", s, e))
                })
                .collect::<anyhow::Result<Vec<IpAddr>>>()?;
            let group = NameServerConfigGroup::from_ips_clear(&ips, 53, true);
            TokioAsyncResolver::tokio(ResolverConfig::from_parts(None, vec![], group), opts)
        };

        Ok(Self { resolver })
    }
}

#[async_trait]
impl HostResolver for SystemResolver {
    async fn lookup(&self, host: &str) -> Result<IpAddr, LookupError> {
        match self.resolver.lookup_ip(host).await {
            Ok(lookup) => lookup
                .iter()
                .next()
                .ok_or_else(|| LookupError::NotFound(host.to_string())),
            Err(e) => Err(classify_resolve_error(host, &e)),
        }
    }
}

fn classify_resolve_error(host: &str, error: &ResolveError) -> LookupError {
    match error.kind() {
        ResolveErrorKind::NoRecordsFound { .. } => LookupError::NotFound(host.to_string()),
        ResolveErrorKind::Timeout => LookupError::Timeout(host.to_string()),
        _ => LookupError::Resolver {
            host: host.to_string(),
            reason: error.to_string(),
        },
    }
}

/// Tunables for a batch of lookups
#[derive(Debug, Clone)]
pub struct ResolveSettings {
    /// Upper bound on one lookup, retries excluded
    pub timeout: Duration,
    pub concurrency: usize,
}

impl ResolveSettings {
    pub fn from_config(config: &DnsConfig) -> Self {
        Self {
            timeout: config.timeout(),
            concurrency: config.concurrency.max(1),
        }
    }
}

impl Default for ResolveSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
            concurrency: 16,
        }
    }
}

/// One rate-limited, time-bounded lookup with optional retry of transient failures.
pub async fn lookup_host(
    resolver: &dyn HostResolver,
    host: &str,
    settings: &ResolveSettings,
    rate_limit: &RateLimitContext,
) -> Result<IpAddr, LookupError> {
    rate_limit
        .retry_helper()
        .with_retry_if(
            || async {
                rate_limit.dns_limiter.acquire().await;
                match tokio::time::timeout(settings.timeout, resolver.lookup(host)).await {
                    Ok(result) => result,
                    Err(_) => Err(LookupError::Timeout(host.to_string())),
                }
            },
            LookupError::is_transient,
        )
        .await
}

/// Outcome of the validation pass
#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    /// Sorted by hostname
    pub entries: Vec<ResolvedEntry>,
    pub attempted: usize,
    pub cancelled: bool,
}

/// Resolve every candidate, keeping only hostnames that resolve.
///
/// Lookups run `settings.concurrency` at a time in sorted hostname order. A
/// failed lookup drops the hostname. If `cancel` fires (before or during the
/// pass), in-flight lookups are abandoned and the result holds the entries
/// gathered so far plus every candidate a source already resolved.
pub async fn resolve_candidates(
    candidates: &CandidateSet,
    resolver: Arc<dyn HostResolver>,
    settings: &ResolveSettings,
    rate_limit: &RateLimitContext,
    cancel: &CancellationToken,
    logger: Option<&ScanLogger>,
) -> ValidationOutcome {
    let hosts = candidates.sorted();
    let mut outcome = ValidationOutcome::default();

    if cancel.is_cancelled() {
        outcome.cancelled = true;
    } else if !hosts.is_empty() {
        info!("Resolving {} candidate hostnames", hosts.len());
        if let Some(logger) = logger {
            logger.start_progress(hosts.len() as u64).await;
        }

        let mut lookups = stream::iter(hosts)
            .map(|host| {
                let resolver = Arc::clone(&resolver);
                async move {
                    let result = lookup_host(resolver.as_ref(), &host, settings, rate_limit).await;
                    (host, result)
                }
            })
            .buffer_unordered(settings.concurrency.max(1));

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Resolution cancelled after {} lookups", outcome.attempted);
                    outcome.cancelled = true;
                    break;
                }
                next = lookups.next() => {
                    let Some((host, result)) = next else { break };
                    outcome.attempted += 1;
                    match result {
                        Ok(ip) => {
                            if let Some(logger) = logger {
                                logger.log_resolved(&host, &ip);
                            }
                            outcome.entries.push(ResolvedEntry { subdomain: host, ip });
                        }
                        Err(e) => debug!("Dropping {}: {}", host, e),
                    }
                    if let Some(logger) = logger {
                        logger.advance_progress(1).await;
                    }
                }
            }
        }

        if let Some(logger) = logger {
            logger.finish_progress().await;
        }
    }

    if outcome.cancelled {
        let validated: HashSet<String> =
            outcome.entries.iter().map(|entry| entry.subdomain.clone()).collect();
        let carried: Vec<ResolvedEntry> = candidates
            .known_addresses()
            .filter(|(host, _)| !validated.contains(*host))
            .map(|(host, ip)| ResolvedEntry { subdomain: host.to_string(), ip })
            .collect();
        if !carried.is_empty() {
            info!("Keeping {} hosts resolved during collection", carried.len());
        }
        outcome.entries.extend(carried);
    }

    outcome.entries.sort();
    outcome
}
