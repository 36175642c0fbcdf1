//! Locates, replaces or appends the certificate slot for one domain on a
//! live load balancer.
//!
//! The procedure is a plain read-modify-write: the service is read, its
//! certificate list is edited locally and written back as a whole. Nothing
//! guards against a concurrent edit of the same service between the read and
//! the write; callers that need that must serialise their runs. Certificate
//! objects created here are never deleted, so a failed run can be retried.

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::core::types::IssuedCertificate;
use crate::distribution::errors::DeliveryError;
use crate::domain::same_domain;

use super::api::{LoadBalancerApi, NewService, RemoteCertificate};

/// Backend port for services created on a port that had none.
pub const BACKEND_PORT: u16 = 80;

#[derive(Debug, Clone)]
pub struct ReconcileTarget<'a> {
    pub load_balancer_name: &'a str,
    pub listen_port: u16,
    pub domain: &'a str,
    /// Fail instead of skipping when a multi-domain certificate covers `domain`.
    pub reject_multi_domain: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No service listened on the port; a new HTTPS service was added.
    ServiceCreated { certificate_id: u64 },
    /// The certificate at `position` was swapped for the new one.
    Replaced {
        certificate_id: u64,
        previous_id: u64,
        position: usize,
    },
    /// No replaceable certificate was attached; the new one went to the end.
    Appended { certificate_id: u64 },
}

pub fn certificate_name(domain: &str, issued_at: DateTime<Utc>) -> String {
    format!("{}-{}", domain, issued_at.format("%Y%m%d%H%M%S"))
}

pub fn reconcile(
    api: &dyn LoadBalancerApi,
    target: &ReconcileTarget<'_>,
    certificate: &IssuedCertificate,
    issued_at: DateTime<Utc>,
) -> Result<ReconcileOutcome, DeliveryError> {
    let name = certificate_name(target.domain, issued_at);
    let created = api.create_certificate(
        &name,
        &String::from_utf8_lossy(&certificate.certificate_pem),
        &String::from_utf8_lossy(&certificate.private_key_pem),
    )?;
    info!("[hetzner] created certificate {} ({})", created.id, name);

    let load_balancer = api
        .find_load_balancer(target.load_balancer_name)?
        .ok_or_else(|| DeliveryError::NotFound {
            kind: "load balancer",
            name: target.load_balancer_name.to_string(),
        })?;

    let Some(service) = load_balancer
        .services
        .iter()
        .find(|service| service.listen_port == target.listen_port)
    else {
        api.add_service(
            load_balancer.id,
            &NewService::https(target.listen_port, BACKEND_PORT, created.id),
        )?;
        info!(
            "[hetzner] added https service on port {} to {}",
            target.listen_port, load_balancer.name
        );
        return Ok(ReconcileOutcome::ServiceCreated {
            certificate_id: created.id,
        });
    };

    let current = service.certificate_ids();
    let replace_at = find_replacement(api, &current, target)?;
    let updated = updated_certificate_ids(&current, replace_at, created.id);
    api.update_service_certificates(load_balancer.id, target.listen_port, &updated)?;

    let outcome = match replace_at {
        Some(position) => ReconcileOutcome::Replaced {
            certificate_id: created.id,
            previous_id: current[position],
            position,
        },
        None => ReconcileOutcome::Appended {
            certificate_id: created.id,
        },
    };
    info!(
        "[hetzner] updated service on port {} of {}: {:?}",
        target.listen_port, load_balancer.name, outcome
    );
    Ok(outcome)
}

/// Position of the first attached single-domain certificate for the target
/// domain. Multi-domain certificates are never chosen.
fn find_replacement(
    api: &dyn LoadBalancerApi,
    attached: &[u64],
    target: &ReconcileTarget<'_>,
) -> Result<Option<usize>, DeliveryError> {
    for (position, id) in attached.iter().enumerate() {
        let candidate = api.get_certificate(*id)?;
        if candidate.domain_names.len() > 1 {
            if target.reject_multi_domain && covers(&candidate, target.domain) {
                return Err(DeliveryError::UnsupportedCertificate {
                    id: candidate.id,
                    domains: candidate.domain_names,
                });
            }
            debug!(
                "[hetzner] skipping multi-domain certificate {} {:?}",
                candidate.id, candidate.domain_names
            );
            continue;
        }
        if covers(&candidate, target.domain) {
            return Ok(Some(position));
        }
    }
    Ok(None)
}

fn covers(candidate: &RemoteCertificate, domain: &str) -> bool {
    candidate
        .domain_names
        .iter()
        .any(|name| same_domain(name, domain))
}

pub fn updated_certificate_ids(
    current: &[u64],
    replace_at: Option<usize>,
    new_id: u64,
) -> Vec<u64> {
    let mut updated = current.to_vec();
    match replace_at {
        Some(position) if position < updated.len() => updated[position] = new_id,
        _ => updated.push(new_id),
    }
    updated
}
