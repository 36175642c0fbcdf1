use anyhow::{Result, anyhow};
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;

use certmaster_lib::DeliveryError;
use certmaster_lib::distribution::hetzner::{
    HetznerClient, LoadBalancerDestination, ReconcileOutcome,
};

use super::test_utils::{generate_certificate, request_json};

const TOKEN: &str = "hetzner-test-token";

fn destination(port: u16) -> LoadBalancerDestination {
    LoadBalancerDestination {
        api_token: TOKEN.to_string(),
        load_balancer_name: "edge".to_string(),
        port,
        reject_multi_domain: false,
    }
}

fn client(server: &ServerGuard) -> Result<HetznerClient> {
    Ok(HetznerClient::new(TOKEN)?.with_base_url(&server.url()))
}

fn mock_create_certificate(server: &mut ServerGuard, id: u64) -> Mock {
    server
        .mock("POST", "/certificates")
        .match_header("authorization", format!("Bearer {TOKEN}").as_str())
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({"type": "uploaded"})),
            Matcher::Regex(r#""name":"example\.com-\d{14}""#.to_string()),
            Matcher::Regex("BEGIN CERTIFICATE".to_string()),
            Matcher::Regex("PRIVATE KEY".to_string()),
        ]))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(json!({"certificate": {"id": id, "domain_names": ["example.com"]}}).to_string())
        .create()
}

fn mock_load_balancers(server: &mut ServerGuard, body: serde_json::Value) -> Mock {
    server
        .mock("GET", "/load_balancers")
        .match_query(Matcher::UrlEncoded("name".to_string(), "edge".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create()
}

fn mock_certificate(server: &mut ServerGuard, id: u64, domains: &[&str]) -> Mock {
    server
        .mock("GET", format!("/certificates/{id}").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"certificate": {"id": id, "domain_names": domains}}).to_string())
        .create()
}

fn edge(services: serde_json::Value) -> serde_json::Value {
    json!({"load_balancers": [{"id": 7, "name": "edge", "services": services}]})
}

#[test]
fn replaces_certificate_on_existing_service() -> Result<()> {
    let mut server = Server::new();
    let create = mock_create_certificate(&mut server, 901);
    let list = mock_load_balancers(
        &mut server,
        edge(json!([{
            "protocol": "https",
            "listen_port": 443,
            "destination_port": 80,
            "proxyprotocol": false,
            "http": {"certificates": [101, 102]}
        }])),
    );
    let first = mock_certificate(&mut server, 101, &["other.org"]);
    let second = mock_certificate(&mut server, 102, &["example.com"]);
    let update = server
        .mock("POST", "/load_balancers/7/actions/update_service")
        .match_body(Matcher::Json(json!({
            "listen_port": 443,
            "http": {"certificates": [101, 901]}
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(json!({"action": {"id": 1, "status": "running"}}).to_string())
        .create();

    let request = request_json(json!([]), false)?;
    let certificate = generate_certificate("example.com")?;
    let outcome = destination(443).upload_with(&client(&server)?, &request, &certificate)?;

    if outcome
        != (ReconcileOutcome::Replaced {
            certificate_id: 901,
            previous_id: 102,
            position: 1,
        })
    {
        return Err(anyhow!("unexpected outcome {outcome:?}"));
    }
    for mock in [create, list, first, second, update] {
        mock.assert();
    }
    Ok(())
}

#[test]
fn adds_https_service_for_unused_port() -> Result<()> {
    let mut server = Server::new();
    let create = mock_create_certificate(&mut server, 901);
    let list = mock_load_balancers(&mut server, edge(json!([])));
    let add = server
        .mock("POST", "/load_balancers/7/actions/add_service")
        .match_body(Matcher::Json(json!({
            "protocol": "https",
            "listen_port": 8443,
            "destination_port": 80,
            "proxyprotocol": false,
            "http": {"certificates": [901]}
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(json!({"action": {"id": 2, "status": "running"}}).to_string())
        .create();
    let update = server
        .mock("POST", "/load_balancers/7/actions/update_service")
        .expect(0)
        .create();

    let request = request_json(json!([]), false)?;
    let certificate = generate_certificate("example.com")?;
    let outcome = destination(8443).upload_with(&client(&server)?, &request, &certificate)?;

    assert_eq!(outcome, ReconcileOutcome::ServiceCreated { certificate_id: 901 });
    create.assert();
    list.assert();
    add.assert();
    update.assert();
    Ok(())
}

#[test]
fn unknown_load_balancer_is_not_found() -> Result<()> {
    let mut server = Server::new();
    let create = mock_create_certificate(&mut server, 901);
    let list = mock_load_balancers(&mut server, json!({"load_balancers": []}));

    let request = request_json(json!([]), false)?;
    let certificate = generate_certificate("example.com")?;
    let err = destination(443)
        .upload_with(&client(&server)?, &request, &certificate)
        .expect_err("load balancer is missing");

    match err {
        DeliveryError::NotFound { name, .. } => assert_eq!(name, "edge"),
        other => return Err(anyhow!("expected NotFound, got {other}")),
    }
    create.assert();
    list.assert();
    Ok(())
}

#[test]
fn rejected_token_surfaces_as_provider_error() -> Result<()> {
    let mut server = Server::new();
    let create = server
        .mock("POST", "/certificates")
        .with_status(401)
        .with_body(r#"{"error": {"code": "unauthorized", "message": "unable to authenticate"}}"#)
        .create();
    let list = server
        .mock("GET", "/load_balancers")
        .match_query(Matcher::Any)
        .expect(0)
        .create();

    let request = request_json(json!([]), false)?;
    let certificate = generate_certificate("example.com")?;
    let err = destination(443)
        .upload_with(&client(&server)?, &request, &certificate)
        .expect_err("token is rejected");

    match &err {
        DeliveryError::Provider { message, .. } => {
            assert!(message.contains("authentication failed"), "{message}")
        }
        other => return Err(anyhow!("expected provider error, got {other}")),
    }
    create.assert();
    list.assert();
    Ok(())
}

#[test]
fn unreachable_api_is_a_transport_error() -> Result<()> {
    let request = request_json(json!([]), false)?;
    let certificate = generate_certificate("example.com")?;
    let api = HetznerClient::new(TOKEN)?.with_base_url("http://127.0.0.1:1");
    let err = destination(443)
        .upload_with(&api, &request, &certificate)
        .expect_err("nothing listens on port 1");
    assert!(matches!(err, DeliveryError::Transport { .. }), "{err}");
    Ok(())
}
