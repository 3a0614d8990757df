//! Collector behaviour against mocked crt.sh / hackertarget endpoints and a
//! stub resolver.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::static_resolver::StaticResolver;
use common::wiremock_helpers::*;
use common::{example_domain, fast_settings, http_client};
use subrecon::discovery::{
    BruteForceDiscovery, CtLogDiscovery, HostSearchDiscovery, Source, SourceError,
};
use subrecon::rate_limit::RateLimitContext;
use wiremock::MockServer;

#[tokio::test]
async fn test_bruteforce_www_mail_example() {
    let resolver = Arc::new(StaticResolver::new(&[("www.example.com", "93.184.216.34")]));
    let source = BruteForceDiscovery::new(
        vec!["www".to_string(), "mail".to_string()],
        resolver.clone(),
        fast_settings(),
        RateLimitContext::default(),
    );

    let found = source.collect(&example_domain()).await.expect("brute force never fails");

    assert_eq!(found.sorted(), vec!["www.example.com"]);
    assert_eq!(resolver.queries(), vec!["mail.example.com", "www.example.com"]);
}

#[tokio::test]
async fn test_ct_collects_names_containing_domain() {
    let server = MockServer::start().await;
    mount_crtsh(
        &server,
        "example.com",
        200,
        &crtsh_body(&[
            "www.example.com\nmail.example.com",
            "API.example.com",
            "cdn.other-company.net",
        ]),
    )
    .await;

    let source = CtLogDiscovery::new(http_client(), crtsh_url(&server));
    let found = source.collect(&example_domain()).await.unwrap();

    assert_eq!(found.sorted(), vec!["api.example.com", "mail.example.com", "www.example.com"]);
}

#[tokio::test]
async fn test_ct_empty_array_is_empty_set() {
    let server = MockServer::start().await;
    mount_crtsh(&server, "example.com", 200, "[]").await;

    let source = CtLogDiscovery::new(http_client(), crtsh_url(&server));
    assert!(source.collect(&example_domain()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ct_non_200_is_unavailable() {
    let server = MockServer::start().await;
    mount_crtsh(&server, "example.com", 503, "Service Unavailable").await;

    let source = CtLogDiscovery::new(http_client(), crtsh_url(&server));
    let err = source.collect(&example_domain()).await.unwrap_err();

    assert!(matches!(err, SourceError::Unavailable { .. }), "got {:?}", err);
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_ct_malformed_json_is_parse_error() {
    let server = MockServer::start().await;
    mount_crtsh(&server, "example.com", 200, "[{\"name_value\": \"www.example.com\"").await;

    let source = CtLogDiscovery::new(http_client(), crtsh_url(&server));
    let err = source.collect(&example_domain()).await.unwrap_err();

    assert!(matches!(err, SourceError::Parse { .. }), "got {:?}", err);
}

#[tokio::test]
async fn test_ct_connection_refused_is_unavailable() {
    // Nothing listens on port 9 (discard) in the test environment
    let source = CtLogDiscovery::new(http_client(), "http://127.0.0.1:9/");
    let err = source.collect(&example_domain()).await.unwrap_err();
    assert!(matches!(err, SourceError::Unavailable { .. }));
}

#[tokio::test]
async fn test_ct_slow_server_times_out() {
    let server = MockServer::start().await;
    mount_slow(&server, 2_000).await;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let source = CtLogDiscovery::new(client, crtsh_url(&server));
    let err = source.collect(&example_domain()).await.unwrap_err();

    assert!(matches!(err, SourceError::Unavailable { .. }));
}

#[tokio::test]
async fn test_hostsearch_keeps_first_field_of_two_field_lines() {
    let server = MockServer::start().await;
    let body = "www.example.com,93.184.216.34\n\
                vpn.example.com,10.1.1.1\n\
                broken line\n\
                x.example.com,1.1.1.1,extra\n";
    mount_hostsearch(&server, "example.com", 200, body).await;

    let source = HostSearchDiscovery::new(http_client(), hostsearch_url(&server));
    let found = source.collect(&example_domain()).await.unwrap();

    assert_eq!(found.sorted(), vec!["vpn.example.com", "www.example.com"]);
}

#[tokio::test]
async fn test_hostsearch_quota_notice_is_empty_set() {
    let server = MockServer::start().await;
    let notice = "API count exceeded - Increase Quota with Membership";
    mount_hostsearch(&server, "example.com", 200, notice).await;

    let source = HostSearchDiscovery::new(http_client(), hostsearch_url(&server));
    assert!(source.collect(&example_domain()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_hostsearch_rate_limited_is_unavailable() {
    let server = MockServer::start().await;
    mount_hostsearch(&server, "example.com", 429, "Too Many Requests").await;

    let source = HostSearchDiscovery::new(http_client(), hostsearch_url(&server));
    let err = source.collect(&example_domain()).await.unwrap_err();

    assert!(matches!(err, SourceError::Unavailable { .. }));
    assert!(err.to_string().contains("429"));
}

#[tokio::test]
async fn test_hostsearch_drops_hosts_outside_target() {
    let server = MockServer::start().await;
    let body = "www.example.com,1.1.1.1\nevil.org,6.6.6.6\n";
    mount_hostsearch(&server, "example.com", 200, body).await;

    let source = HostSearchDiscovery::new(http_client(), hostsearch_url(&server));
    let found = source.collect(&example_domain()).await.unwrap();

    assert_eq!(found.sorted(), vec!["www.example.com"]);
    assert!(found.iter().all(|h| h.contains("example.com")));
}
