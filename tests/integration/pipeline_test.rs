use anyhow::{Result, anyhow};
use serde_json::json;

use certmaster_lib::distribution::FanoutError;
use certmaster_lib::issuance::issuer::LETS_ENCRYPT_STAGING;
use certmaster_lib::{
    DeliveryError, IssuerSet, Registry, ResponseStatus, create_certificate, deliver, handle_request,
};

use super::test_utils::{
    CapturingResolver, FailingIssuer, LocalIssuer, generate_certificate, raw_config, request_json,
};

#[test]
fn dummy_request_is_issued_locally_and_delivered() -> Result<()> {
    let request = request_json(json!([{"provider": "capture"}]), true)?;
    let dummy = LocalIssuer::default();
    let resolver = CapturingResolver::default();
    let issuers = IssuerSet {
        acme: &FailingIssuer,
        dummy: Some(&dummy),
    };

    let report = create_certificate(&request, issuers, &resolver)?;

    assert_eq!(report.attempted(), 1);
    let delivered = resolver.delivered.borrow();
    let (domain, pem) = delivered
        .first()
        .ok_or_else(|| anyhow!("expected one delivery"))?;
    assert_eq!(domain, "example.com");
    assert!(String::from_utf8_lossy(pem).contains("BEGIN CERTIFICATE"));

    let orders = dummy.orders.borrow();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].dns_provider.as_deref(), Some("cloudflare"));
    assert!(!orders[0].dns_credentials.contains_key("provider"));
    assert_eq!(orders[0].directory_url, LETS_ENCRYPT_STAGING);
    Ok(())
}

#[test]
fn failing_destination_does_not_stop_later_ones() -> Result<()> {
    let request = request_json(
        json!([
            {"provider": "capture"},
            {"provider": "carrier-pigeon"},
            {"provider": "capture"}
        ]),
        true,
    )?;
    let dummy = LocalIssuer::default();
    let resolver = CapturingResolver::default();
    let issuers = IssuerSet {
        acme: &FailingIssuer,
        dummy: Some(&dummy),
    };

    let err = create_certificate(&request, issuers, &resolver).expect_err("one destination fails");

    assert_eq!(
        err.downcast_ref::<FanoutError>(),
        Some(&FanoutError::PartialFailure {
            failed: 1,
            attempted: 3
        })
    );
    assert_eq!(resolver.delivered.borrow().len(), 2);
    Ok(())
}

#[test]
fn unreachable_sftp_host_is_reported_per_destination() -> Result<()> {
    let request = request_json(json!([]), false)?;
    let certificate = generate_certificate("example.com")?;
    let destinations = vec![
        raw_config(json!({
            "provider": "sftp",
            "user": "deploy",
            "host": "127.0.0.1",
            "port": 1,
            "certificate_destination": "/etc/ssl/example.crt",
            "private_key_destination": "/etc/ssl/private/example.key"
        }))?,
        raw_config(json!({"provider": "sftp", "port": "not-a-port"}))?,
    ];

    let report = deliver(&Registry, &request, &certificate, &destinations);

    assert_eq!(report.attempted(), 2);
    assert!(matches!(
        report.outcomes[0].error,
        Some(DeliveryError::Transport { .. })
    ));
    assert!(matches!(
        &report.outcomes[1].error,
        Some(DeliveryError::ConfigDecode { field, .. }) if field == "port"
    ));
    Ok(())
}

#[test]
fn issuer_failure_becomes_failed_response() -> Result<()> {
    let request = request_json(json!([{"provider": "capture"}]), false)?;
    let resolver = CapturingResolver::default();
    let issuers = IssuerSet {
        acme: &FailingIssuer,
        dummy: None,
    };

    let response = handle_request(&request, issuers, &resolver);

    assert_eq!(response.status, ResponseStatus::Failed);
    assert!(response.message.contains("acme directory unreachable"), "{}", response.message);
    assert!(resolver.delivered.borrow().is_empty());
    Ok(())
}

#[test]
fn dummy_request_without_dummy_issuer_fails() -> Result<()> {
    let request = request_json(json!([{"provider": "capture"}]), true)?;
    let resolver = CapturingResolver::default();
    let issuers = IssuerSet {
        acme: &FailingIssuer,
        dummy: None,
    };

    let response = handle_request(&request, issuers, &resolver);

    assert_eq!(response.status, ResponseStatus::Failed);
    assert!(response.message.contains("dummy"), "{}", response.message);
    Ok(())
}

#[test]
fn successful_run_serializes_as_success() -> Result<()> {
    let request = request_json(json!([]), true)?;
    let dummy = LocalIssuer::default();
    let issuers = IssuerSet {
        acme: &FailingIssuer,
        dummy: Some(&dummy),
    };

    let response = handle_request(&request, issuers, &Registry);

    assert_eq!(serde_json::to_value(&response)?["status"], json!("Success"));
    Ok(())
}
