use chrono::Utc;
use log::info;

use crate::core::types::{CertificateRequest, IssuedCertificate};

use super::config::{ConfigFields, ConfigReader, FieldSpec};
use super::errors::DeliveryError;

pub mod api;
pub mod reconcile;

pub use api::{
    HetznerClient, LoadBalancer, LoadBalancerApi, LoadBalancerService, NewService,
    RemoteCertificate,
};
pub use reconcile::{ReconcileOutcome, ReconcileTarget, reconcile};

/// Attaches the certificate to a Hetzner load balancer service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadBalancerDestination {
    pub api_token: String,
    pub load_balancer_name: String,
    pub port: u16,
    pub reject_multi_domain: bool,
}

impl ConfigFields for LoadBalancerDestination {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("api_token", "Hetzner read/write API token").secret(),
        FieldSpec::text("load_balancer_name", "Name of load balancer to attach certificate to"),
        FieldSpec::integer("port", "Listen port of the HTTPS service"),
        FieldSpec::boolean(
            "reject_multi_domain",
            "Fail instead of skipping when a multi-domain certificate covers the domain",
        ),
    ];

    fn apply(&mut self, reader: &ConfigReader<'_>) -> Result<(), DeliveryError> {
        reader.text("api_token", &mut self.api_token)?;
        reader.text("load_balancer_name", &mut self.load_balancer_name)?;
        reader.integer("port", &mut self.port)?;
        reader.flag("reject_multi_domain", &mut self.reject_multi_domain)?;
        Ok(())
    }
}

impl LoadBalancerDestination {
    pub const DESCRIPTION: &'static str =
        "Adds or replaces the certificate on a Hetzner load balancer service";

    pub fn upload(
        &self,
        request: &CertificateRequest,
        certificate: &IssuedCertificate,
    ) -> Result<(), DeliveryError> {
        let client = HetznerClient::new(&self.api_token)?;
        self.upload_with(&client, request, certificate).map(|_| ())
    }

    pub fn upload_with(
        &self,
        api: &dyn LoadBalancerApi,
        request: &CertificateRequest,
        certificate: &IssuedCertificate,
    ) -> Result<ReconcileOutcome, DeliveryError> {
        let target = ReconcileTarget {
            load_balancer_name: &self.load_balancer_name,
            listen_port: self.port,
            domain: &request.domain,
            reject_multi_domain: self.reject_multi_domain,
        };
        let outcome = reconcile(api, &target, certificate, Utc::now())?;
        info!(
            "[hetzner] certificate for {} attached to {}:{}",
            request.domain, self.load_balancer_name, self.port
        );
        Ok(outcome)
    }
}
