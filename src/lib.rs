pub mod candidates;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod dns;
pub mod domain_utils;
pub mod export;
pub mod logger;
pub mod rate_limit;
pub mod scanner;

pub use candidates::{merge, CandidateSet};
pub use dns::{HostResolver, LookupError, ResolvedEntry};
pub use domain_utils::{InvalidDomain, TargetDomain};
pub use scanner::{discover_subdomains, DiscoveryReport, SourceOutcome, SubdomainScanner};
