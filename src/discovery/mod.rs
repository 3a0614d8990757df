//! Source collectors: independent, best-effort producers of candidate hostnames.

pub mod bruteforce;
pub mod ct_logs;
pub mod hostsearch;

use async_trait::async_trait;
use thiserror::Error;

use crate::candidates::CandidateSet;
use crate::domain_utils::TargetDomain;

pub use bruteforce::{load_wordlist, BruteForceDiscovery};
pub use ct_logs::CtLogDiscovery;
pub use hostsearch::HostSearchDiscovery;

/// A collector-level failure. Never fatal: the scanner logs it and the source
/// contributes nothing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Transport failure, timeout or a non-200 response
    #[error("{source_name} unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },

    /// The response could not be interpreted
    #[error("{source_name} returned a malformed response: {reason}")]
    Parse { source_name: String, reason: String },
}

impl SourceError {
    pub fn unavailable(source_name: &str, reason: impl ToString) -> Self {
        SourceError::Unavailable {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(source_name: &str, reason: impl ToString) -> Self {
        SourceError::Parse {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// One external source of candidate hostnames.
#[async_trait]
pub trait Source: Send + Sync {
    /// Short name used in logs and the report
    fn name(&self) -> &str;

    async fn collect(&self, domain: &TargetDomain) -> Result<CandidateSet, SourceError>;
}
