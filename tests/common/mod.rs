#![allow(dead_code)]

pub mod static_resolver;
pub mod wiremock_helpers;

use std::time::Duration;

use subrecon::dns::ResolveSettings;
use subrecon::TargetDomain;

pub fn example_domain() -> TargetDomain {
    TargetDomain::parse("example.com").expect("example.com is a valid domain")
}

pub fn fast_settings() -> ResolveSettings {
    ResolveSettings {
        timeout: Duration::from_millis(500),
        concurrency: 4,
    }
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .user_agent("subrecon-test/1.0")
        .build()
        .expect("test HTTP client")
}
