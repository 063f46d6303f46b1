//! Integration tests for the Alidns provider against a mocked endpoint.

use aliddns_core::config::{ProviderConfig, RecordConfig, RecordType};
use aliddns_core::traits::DnsProvider;
use aliddns_core::Error;
use aliddns_provider_aliyun::sign::FixedStampSource;
use aliddns_provider_aliyun::AliyunProvider;
use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config() -> ProviderConfig {
    ProviderConfig {
        endpoint: "alidns.cn-hangzhou.aliyuncs.com".to_string(),
        access_key_id: "testid".to_string(),
        access_key_secret: "testsecret".to_string(),
        signature_algorithm: "ACS3-HMAC-SHA256".to_string(),
        timeout_secs: 5,
    }
}

fn provider(server: &MockServer) -> AliyunProvider {
    AliyunProvider::new(&config())
        .expect("provider builds")
        .with_base_url(server.uri())
        .with_stamp_source(FixedStampSource::new(
            "2024-05-28T14:01:00Z",
            "3b1f0c1e-5d0a-4a52-9c6e-2f8a7d4e9b10",
        ))
}

fn record() -> RecordConfig {
    RecordConfig::new("example.com", "www", RecordType::A)
}

#[tokio::test]
async fn describe_sends_signed_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(query_param("DomainName", "example.com"))
        .and(query_param("RRKeyWord", "www"))
        .and(query_param("TypeKeyWord", "A"))
        .and(header("x-acs-action", "DescribeDomainRecords"))
        .and(header("x-acs-version", "2015-01-09"))
        .and(header("x-acs-date", "2024-05-28T14:01:00Z"))
        .and(header("x-acs-signature-nonce", "3b1f0c1e-5d0a-4a52-9c6e-2f8a7d4e9b10"))
        .and(header(
            "x-acs-content-sha256",
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        ))
        .and(header("accept", "application/json"))
        .and(header_exists("user-agent"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "TotalCount": 1,
            "RequestId": "req-describe",
            "DomainRecords": {
                "Record": [
                    {"RecordId": "rid1", "Value": "9.9.9.9", "RR": "www", "Type": "A"}
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let found = provider(&server).describe_record(&record()).await.unwrap();
    assert_eq!(found.record_id, "rid1");
    assert_eq!(found.value, "9.9.9.9");
}

#[tokio::test]
async fn authorization_names_algorithm_and_credential() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "DomainRecords": {"Record": [{"RecordId": "rid1", "Value": "9.9.9.9", "RR": "www", "Type": "A"}]}
        })))
        .mount(&server)
        .await;

    provider(&server).describe_record(&record()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let auth = requests[0]
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();

    let signed_headers = "accept;host;user-agent;x-acs-action;x-acs-content-sha256;\
                          x-acs-date;x-acs-signature-nonce;x-acs-version";
    let expected_prefix = format!(
        "ACS3-HMAC-SHA256 Credential=testid,SignedHeaders={},Signature=",
        signed_headers
    );
    assert!(auth.starts_with(&expected_prefix), "got {}", auth);
    assert!(!auth.contains("testsecret"));
}

#[tokio::test]
async fn describe_prefers_exact_match() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "TotalCount": 3,
            "DomainRecords": {
                "Record": [
                    {"RecordId": "rid-www2", "Value": "1.1.1.1", "RR": "www2", "Type": "A"},
                    {"RecordId": "rid-aaaa", "Value": "2001:db8::1", "RR": "www", "Type": "AAAA"},
                    {"RecordId": "rid-exact", "Value": "2.2.2.2", "RR": "www", "Type": "A"}
                ]
            }
        })))
        .mount(&server)
        .await;

    let found = provider(&server).describe_record(&record()).await.unwrap();
    assert_eq!(found.record_id, "rid-exact");
    assert_eq!(found.value, "2.2.2.2");
}

#[tokio::test]
async fn describe_rejects_fuzzy_only_match() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "TotalCount": 2,
            "DomainRecords": {
                "Record": [
                    {"RecordId": "rid-www2", "Value": "1.1.1.1", "RR": "www2", "Type": "A"},
                    {"RecordId": "rid-www-aaaa", "Value": "2001:db8::1", "RR": "www", "Type": "AAAA"}
                ]
            }
        })))
        .mount(&server)
        .await;

    let err = provider(&server).describe_record(&record()).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "got {:?}", err);
    assert!(!err.to_string().contains("rid-www2"));
}

#[tokio::test]
async fn describe_without_records_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "TotalCount": 0,
            "DomainRecords": {"Record": []}
        })))
        .mount(&server)
        .await;

    let err = provider(&server).describe_record(&record()).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "got {:?}", err);
}

#[tokio::test]
async fn update_sends_record_parameters() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(query_param("RR", "www"))
        .and(query_param("RecordId", "rid1"))
        .and(query_param("Type", "A"))
        .and(query_param("Value", "5.6.7.8"))
        .and(header("x-acs-action", "UpdateDomainRecord"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "RequestId": "req-update",
            "RecordId": "rid1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = provider(&server)
        .update_record("rid1", &record(), "5.6.7.8")
        .await
        .unwrap();
    assert_eq!(result.record_id, "rid1");
    assert_eq!(result.request_id.as_deref(), Some("req-update"));
}

#[tokio::test]
async fn signature_error_maps_to_authentication() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "Code": "SignatureDoesNotMatch",
            "Message": "Specified signature is not matched with our calculation.",
            "RequestId": "req-err"
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .update_record("rid1", &record(), "5.6.7.8")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Authentication(_)), "got {:?}", err);
}

#[tokio::test]
async fn throttling_maps_to_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "Code": "Throttling.User",
            "Message": "Request was denied due to user flow control.",
            "RequestId": "req-err"
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .update_record("rid1", &record(), "5.6.7.8")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RateLimited(_)), "got {:?}", err);
}

#[tokio::test]
async fn unknown_code_maps_to_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "Code": "DomainRecordDuplicate",
            "Message": "The DNS record already exists.",
            "RequestId": "req-err"
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .update_record("rid1", &record(), "5.6.7.8")
        .await
        .unwrap_err();
    match err {
        Error::Provider { provider, message } => {
            assert_eq!(provider, "aliyun");
            assert!(message.contains("DomainRecordDuplicate"));
        }
        other => panic!("expected provider error, got {:?}", other),
    }
}

#[tokio::test]
async fn bare_server_error_maps_by_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = provider(&server).describe_record(&record()).await.unwrap_err();
    assert!(matches!(err, Error::Provider { .. }), "got {:?}", err);
}

#[tokio::test]
async fn forbidden_status_maps_to_authentication() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = provider(&server).describe_record(&record()).await.unwrap_err();
    assert!(matches!(err, Error::Authentication(_)), "got {:?}", err);
}

#[tokio::test]
async fn malformed_success_body_is_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>captive portal</html>"))
        .mount(&server)
        .await;

    let err = provider(&server).describe_record(&record()).await.unwrap_err();
    assert!(matches!(err, Error::Provider { .. }), "got {:?}", err);
}

#[tokio::test]
async fn unreachable_endpoint_is_http_error() {
    let provider = AliyunProvider::new(&config())
        .unwrap()
        .with_base_url("http://127.0.0.1:9");

    let err = provider.describe_record(&record()).await.unwrap_err();
    assert!(matches!(err, Error::Http(_)), "got {:?}", err);
}
