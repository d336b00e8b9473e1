//! Unit tests for the papi_client crate.

use super::*; // Import items from lib.rs
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> PapiClient {
    PapiClient::new(&ClientConfig {
        base_url: server.uri(),
        ..Default::default()
    })
    .unwrap()
}

fn version_body(version: u64, staging: &str, production: &str) -> Value {
    json!({
        "propertyId": "prp_411089",
        "versions": {
            "items": [{
                "propertyVersion": version,
                "stagingStatus": staging,
                "productionStatus": production,
                "etag": "etag-1",
                "ruleFormat": "v2018-02-27"
            }]
        }
    })
}

#[tokio::test]
async fn test_create_property_posts_request_with_contract_and_group() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/papi/v0/properties"))
        .and(query_param("contractId", "1-1TJZH5"))
        .and(query_param("groupId", "61726"))
        .and(body_json(json!({
            "productId": "SPM",
            "propertyName": "qa.example.com"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "propertyLink": "/papi/v0/properties/prp_411089?contractId=1-1TJZH5&groupId=61726"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let link = client
        .create_property(
            "1-1TJZH5",
            "61726",
            &CreatePropertyRequest {
                product_id: "SPM".to_string(),
                property_name: "qa.example.com".to_string(),
                rule_format: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(link.property_id().unwrap(), 411089);
}

#[tokio::test]
async fn test_account_switch_key_is_appended() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/papi/v0/properties/411089/versions/latest"))
        .and(query_param("accountSwitchKey", "1-ABC:1-DEF"))
        .respond_with(ResponseTemplate::new(200).set_body_json(version_body(
            3, "ACTIVE", "INACTIVE",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = PapiClient::new(&ClientConfig {
        base_url: mock_server.uri(),
        account_switch_key: Some("1-ABC:1-DEF".to_string()),
        ..Default::default()
    })
    .unwrap();

    let version = client.get_latest_version(411089).await.unwrap();

    assert_eq!(version.property_version, 3);
    assert_eq!(version.staging_status, ActivationStatus::Active);
    assert_eq!(version.etag.as_deref(), Some("etag-1"));
}

#[test]
fn test_account_switch_key_with_query_delimiters_is_rejected() {
    let result = PapiClient::new(&ClientConfig {
        base_url: "https://example.luna.akamaiapis.net".to_string(),
        account_switch_key: Some("1-ABC&foo=bar".to_string()),
        ..Default::default()
    });
    assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
}

#[test]
fn test_invalid_base_url_is_rejected() {
    let result = PapiClient::new(&ClientConfig {
        base_url: "not a url".to_string(),
        ..Default::default()
    });
    assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
}

#[tokio::test]
async fn test_configured_headers_are_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/papi/v0/properties/411089/versions/2"))
        .and(header("x-pipeline-auth", "token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(version_body(
            2, "INACTIVE", "INACTIVE",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut headers = BTreeMap::new();
    headers.insert("x-pipeline-auth".to_string(), "token".to_string());
    let client = PapiClient::new(&ClientConfig {
        base_url: mock_server.uri(),
        account_switch_key: None,
        headers,
    })
    .unwrap();

    let version = client.get_version(411089, 2).await.unwrap();
    assert_eq!(version.property_version, 2);
}

#[tokio::test]
async fn test_create_property_version_sends_etag() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/papi/v0/properties/411089/versions/"))
        .and(body_json(json!({
            "createFromVersion": 1,
            "createFromVersionEtag": "etag-1"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "versionLink": "/papi/v0/properties/prp_411089/versions/2?contractId=1-1TJZH5"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let link = client
        .create_property_version(411089, 1, Some("etag-1"))
        .await
        .unwrap();

    assert_eq!(link.version().unwrap(), 2);
}

#[tokio::test]
async fn test_validate_rules_is_a_dry_run_with_rule_format() {
    let mock_server = MockServer::start().await;
    let rules = json!({"rules": {"name": "default"}});

    Mock::given(method("PUT"))
        .and(path("/papi/v0/properties/411089/versions/2/rules"))
        .and(query_param("dryRun", "true"))
        .and(header(
            "content-type",
            "application/vnd.akamai.papirules.v2018-02-27+json",
        ))
        .and(body_json(rules.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rules": {"name": "default"},
            "warnings": [{"type": "incompatible_condition"}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let feedback = client
        .validate_rules(411089, 2, &rules, Some("v2018-02-27"))
        .await
        .unwrap();

    assert!(feedback.errors.is_empty());
    assert_eq!(feedback.warnings.len(), 1);
}

#[tokio::test]
async fn test_schema_invalid_response_is_reported_as_validation_feedback() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/papi/v0/properties/411089/versions/2/rules"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "type": "https://problems.luna.akamaiapis.net/papi/v0/json-schema-invalid",
            "errors": [{"type": "required", "location": "/rules/behaviors/0/options"}]
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let error = client
        .validate_rules(411089, 2, &json!({"rules": {}}), None)
        .await
        .unwrap_err();

    assert!(error.is_validation_feedback());
    assert_eq!(error.validation_feedback().unwrap().errors.len(), 1);
}

#[tokio::test]
async fn test_store_rules_returns_feedback_and_etag() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/papi/v0/properties/411089/versions/2/rules"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "etag": "etag-2",
            "ruleFormat": "v2018-02-27",
            "rules": {"name": "default"},
            "errors": [{"type": "missing_origin", "errorLocation": "#/rules/behaviors/0"}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let feedback = client
        .store_rules(411089, 2, &json!({"rules": {"name": "default"}}), None)
        .await
        .unwrap();

    assert_eq!(feedback.etag.as_deref(), Some("etag-2"));
    assert_eq!(feedback.rule_format.as_deref(), Some("v2018-02-27"));
    assert_eq!(feedback.errors.len(), 1);
}

#[tokio::test]
async fn test_store_hostnames_puts_hostname_list() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/papi/v0/properties/411089/versions/2/hostnames"))
        .and(body_json(json!([{
            "cnameFrom": "qa.example.com",
            "cnameTo": "qa.example.com.edgesuite.net",
            "cnameType": "EDGE_HOSTNAME",
            "edgeHostnameId": null
        }])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hostnames": {"items": []}})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let hostnames = vec![PropertyHostname::new(
        "qa.example.com",
        "qa.example.com.edgesuite.net",
    )];
    client.store_hostnames(411089, 2, &hostnames).await.unwrap();
}

#[tokio::test]
async fn test_activate_and_poll_activation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/papi/v0/properties/411089/activations"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "activationLink": "/papi/v0/properties/prp_411089/activations/atv_5964934?contractId=1-1TJZH5"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/papi/v0/properties/411089/activations/5964934"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "activations": {
                "items": [{
                    "activationId": "atv_5964934",
                    "propertyVersion": 2,
                    "network": "STAGING",
                    "activationType": "ACTIVATE",
                    "status": "ACTIVE"
                }]
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let request = ActivationRequest::new(
        2,
        Network::Staging,
        ActivationType::Activate,
        vec!["a@b.com".to_string()],
        "Pipeline activation",
    );
    let link = client.activate(411089, &request).await.unwrap();
    let activation_id = link.activation_id().unwrap();
    let activation = client.get_activation(411089, activation_id).await.unwrap();

    assert_eq!(activation_id, 5964934);
    assert_eq!(activation.network, Network::Staging);
    assert_eq!(activation.status, ActivationStatus::Active);
    assert_eq!(activation.property_version, 2);
}

#[tokio::test]
async fn test_list_and_create_edge_hostnames() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/papi/v0/edgehostnames"))
        .and(query_param("contractId", "1-1TJZH5"))
        .and(query_param("groupId", "61726"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "edgeHostnames": {
                "items": [{
                    "edgeHostnameId": "ehn_895822",
                    "edgeHostnameDomain": "example.com.edgesuite.net",
                    "ipVersionBehavior": "IPV4"
                }]
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/papi/v0/edgehostnames"))
        .and(body_json(json!({
            "productId": "SPM",
            "ipVersionBehavior": "IPV6_COMPLIANCE",
            "domainPrefix": "qa.example.com",
            "domainSuffix": "edgesuite.net"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "edgeHostnameLink": "/papi/v0/edgehostnames/ehn_2922843?contractId=1-1TJZH5&groupId=61726"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let existing = client
        .list_edge_hostnames("1-1TJZH5", "61726")
        .await
        .unwrap();
    assert_eq!(existing.len(), 1);
    assert_eq!(existing[0].id().unwrap(), 895822);

    let link = client
        .create_edge_hostname(
            "1-1TJZH5",
            "61726",
            &CreateEdgeHostnameRequest {
                product_id: "SPM".to_string(),
                ip_version_behavior: "IPV6_COMPLIANCE".to_string(),
                domain_prefix: "qa.example.com".to_string(),
                domain_suffix: "edgesuite.net".to_string(),
                secure: None,
                cert_enrollment_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(link.edge_hostname_id().unwrap(), 2922843);
}

#[tokio::test]
async fn test_non_json_error_body_is_kept_as_text() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/papi/v0/properties/411089/versions/latest"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let error = client.get_latest_version(411089).await.unwrap_err();

    match error {
        Error::Api { status, body } => {
            assert_eq!(status, 502);
            assert_eq!(body, json!("Bad Gateway"));
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_version_list_is_invalid_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/papi/v0/properties/411089/versions/latest"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"versions": {"items": []}})),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let error = client.get_latest_version(411089).await.unwrap_err();

    assert!(matches!(error, Error::InvalidResponse(_)));
}
