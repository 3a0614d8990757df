//! Certificate Transparency (CT) log discovery.
//!
//! Queries crt.sh for certificates issued under a domain and extracts the
//! hostnames listed in each certificate's `name_value` field.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{Source, SourceError};
use crate::candidates::CandidateSet;
use crate::domain_utils::{self, TargetDomain};

const SOURCE_NAME: &str = "crt.sh";

/// One record of the crt.sh JSON output. Only the SAN list is read; the
/// remaining certificate fields are ignored.
#[derive(Debug, Deserialize)]
pub struct CrtShEntry {
    /// Subject Alternative Names (newline separated)
    #[serde(default)]
    pub name_value: Option<String>,
}

/// Certificate Transparency log discovery
pub struct CtLogDiscovery {
    client: Client,
    base_url: String,
    strip_wildcards: bool,
}

impl CtLogDiscovery {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            strip_wildcards: false,
        }
    }

    /// Strip a leading `*.` from certificate names before they become candidates
    pub fn with_strip_wildcards(mut self, strip: bool) -> Self {
        self.strip_wildcards = strip;
        self
    }

    fn query_url(&self, domain: &TargetDomain) -> String {
        // %25 is the escaped '%' wildcard crt.sh expects in front of the domain
        format!(
            "{}?q=%25.{}&output=json",
            self.base_url,
            urlencoding::encode(domain.as_str())
        )
    }

    /// Query crt.sh and return the raw response body
    async fn query_crt_sh(&self, domain: &TargetDomain) -> Result<String, SourceError> {
        let url = self.query_url(domain);
        debug!("Querying crt.sh: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::unavailable(SOURCE_NAME, e))?;

        if response.status() != StatusCode::OK {
            warn!("crt.sh returned status {} for {}", response.status(), domain);
            return Err(SourceError::unavailable(
                SOURCE_NAME,
                format!("HTTP {}", response.status()),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| SourceError::unavailable(SOURCE_NAME, e))
    }
}

#[async_trait]
impl Source for CtLogDiscovery {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn collect(&self, domain: &TargetDomain) -> Result<CandidateSet, SourceError> {
        info!("Querying CT logs for certificates related to {}", domain);

        let body = self.query_crt_sh(domain).await?;
        let candidates = parse_crtsh_response(&body, domain, self.strip_wildcards)?;

        info!("CT log discovery found {} candidate hostnames for {}", candidates.len(), domain);
        Ok(candidates)
    }
}

/// Extract candidate hostnames from a crt.sh JSON body.
///
/// Each `name_value` is split on newlines; names containing the target domain
/// are kept. An empty body or `[]` yields an empty set.
pub fn parse_crtsh_response(
    body: &str,
    domain: &TargetDomain,
    strip_wildcards: bool,
) -> Result<CandidateSet, SourceError> {
    let body = body.trim();

    // crt.sh returns empty array as "[]" or sometimes just empty
    if body.is_empty() || body == "[]" {
        return Ok(CandidateSet::new());
    }

    let entries: Vec<CrtShEntry> =
        serde_json::from_str(body).map_err(|e| SourceError::parse(SOURCE_NAME, e))?;
    debug!("Found {} certificate entries for {}", entries.len(), domain);

    let mut candidates = CandidateSet::new();
    for entry in entries {
        let Some(name_value) = entry.name_value.as_deref() else {
            continue;
        };

        for name in name_value.lines() {
            let name = name.trim().to_lowercase();
            if !name.contains(domain.as_str()) {
                continue;
            }

            let name = if strip_wildcards {
                domain_utils::strip_wildcard(&name)
            } else {
                name.as_str()
            };
            candidates.insert(name);
        }
    }

    Ok(candidates)
}
