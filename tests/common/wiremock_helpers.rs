use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the mock serves crt.sh queries on
pub const CRTSH_PATH: &str = "/crtsh/";
/// Path the mock serves hostsearch queries on
pub const HOSTSEARCH_PATH: &str = "/hostsearch/";

/// Base URL to hand to `CtLogDiscovery` for a mock server
pub fn crtsh_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), CRTSH_PATH)
}

/// Base URL to hand to `HostSearchDiscovery` for a mock server
pub fn hostsearch_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), HOSTSEARCH_PATH)
}

/// Build a crt.sh-style JSON body, one record per `name_value`.
pub fn crtsh_body(name_values: &[&str]) -> String {
    let records: Vec<serde_json::Value> = name_values
        .iter()
        .enumerate()
        .map(|(i, names)| {
            serde_json::json!({
                "issuer_ca_id": 16418,
                "issuer_name": "C=US, O=Let's Encrypt, CN=R3",
                "common_name": names.lines().next().unwrap_or_default(),
                "name_value": names,
                "id": 1000 + i as i64,
                "entry_timestamp": "2024-01-01T00:00:00.000",
                "not_before": "2024-01-01T00:00:00",
                "not_after": "2024-04-01T00:00:00"
            })
        })
        .collect();
    serde_json::Value::Array(records).to_string()
}

/// Mount a crt.sh responder for `%.<domain>` returning `body` with `status`.
pub async fn mount_crtsh(server: &MockServer, domain: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(CRTSH_PATH))
        .and(query_param("q", format!("%.{}", domain)))
        .and(query_param("output", "json"))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_string(body.to_string())
                .insert_header("content-type", "application/json"),
        )
        .mount(server)
        .await;
}

/// Mount a hostsearch responder for `domain` returning plaintext `body` with `status`.
pub async fn mount_hostsearch(server: &MockServer, domain: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(HOSTSEARCH_PATH))
        .and(query_param("q", domain))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_string(body.to_string())
                .insert_header("content-type", "text/plain"),
        )
        .mount(server)
        .await;
}

/// Mount a responder on every path that answers after `delay_ms`.
pub async fn mount_slow(server: &MockServer, delay_ms: u64) {
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("[]")
                .set_delay(Duration::from_millis(delay_ms)),
        )
        .mount(server)
        .await;
}
