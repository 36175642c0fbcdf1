use log::debug;
use reqwest::Method;
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::distribution::errors::DeliveryError;
use crate::distribution::http;

const PROVIDER: &str = "Hetzner";
pub const DEFAULT_BASE_URL: &str = "https://api.hetzner.cloud/v1";

/// Certificate object stored on the cloud account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteCertificate {
    pub id: u64,
    #[serde(default)]
    pub domain_names: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadBalancer {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub services: Vec<LoadBalancerService>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadBalancerService {
    pub protocol: String,
    pub listen_port: u16,
    #[serde(default)]
    pub destination_port: Option<u16>,
    #[serde(default)]
    pub http: Option<ServiceHttp>,
}

impl LoadBalancerService {
    pub fn certificate_ids(&self) -> Vec<u64> {
        self.http
            .as_ref()
            .map(|http| http.certificates.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServiceHttp {
    #[serde(default)]
    pub certificates: Vec<u64>,
}

/// Body of an `add_service` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewService {
    pub protocol: String,
    pub listen_port: u16,
    pub destination_port: u16,
    pub proxyprotocol: bool,
    pub http: NewServiceHttp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewServiceHttp {
    pub certificates: Vec<u64>,
}

impl NewService {
    pub fn https(listen_port: u16, destination_port: u16, certificate_id: u64) -> Self {
        Self {
            protocol: "https".to_string(),
            listen_port,
            destination_port,
            proxyprotocol: false,
            http: NewServiceHttp {
                certificates: vec![certificate_id],
            },
        }
    }
}

/// Operations the reconciliation engine needs from the load balancer provider.
pub trait LoadBalancerApi {
    fn create_certificate(
        &self,
        name: &str,
        certificate_pem: &str,
        private_key_pem: &str,
    ) -> Result<RemoteCertificate, DeliveryError>;

    fn find_load_balancer(&self, name: &str) -> Result<Option<LoadBalancer>, DeliveryError>;

    fn get_certificate(&self, id: u64) -> Result<RemoteCertificate, DeliveryError>;

    fn add_service(&self, load_balancer_id: u64, service: &NewService) -> Result<(), DeliveryError>;

    /// Replaces the whole certificate list of the service listening on `listen_port`.
    fn update_service_certificates(
        &self,
        load_balancer_id: u64,
        listen_port: u16,
        certificate_ids: &[u64],
    ) -> Result<(), DeliveryError>;
}

#[derive(Serialize)]
struct CreateCertificateBody<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    certificate: &'a str,
    private_key: &'a str,
}

#[derive(Deserialize)]
struct CertificateEnvelope {
    certificate: RemoteCertificate,
}

#[derive(Deserialize)]
struct LoadBalancerList {
    #[serde(default)]
    load_balancers: Vec<LoadBalancer>,
}

#[derive(Serialize)]
struct UpdateServiceBody<'a> {
    listen_port: u16,
    http: UpdateServiceHttp<'a>,
}

#[derive(Serialize)]
struct UpdateServiceHttp<'a> {
    certificates: &'a [u64],
}

/// Blocking client for the Hetzner Cloud API. One instance per upload.
pub struct HetznerClient {
    client: Client,
    api_token: String,
    base_url: String,
}

impl HetznerClient {
    pub fn new(api_token: &str) -> Result<Self, DeliveryError> {
        Ok(Self {
            client: http::build_client()?,
            api_token: api_token.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_token)
    }

    fn send(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> Result<reqwest::blocking::Response, DeliveryError> {
        debug!("[hetzner] {what}");
        let response = builder
            .send()
            .map_err(|err| DeliveryError::transport("hetzner", format!("{what}: {err}")))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().ok();
            return Err(http::status_error(PROVIDER, status, body));
        }
        Ok(response)
    }

    fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> Result<T, DeliveryError> {
        self.send(builder, what)?
            .json()
            .map_err(|err| DeliveryError::Provider {
                provider: PROVIDER,
                message: format!("failed to parse response to {what}: {err}"),
            })
    }
}

impl LoadBalancerApi for HetznerClient {
    fn create_certificate(
        &self,
        name: &str,
        certificate_pem: &str,
        private_key_pem: &str,
    ) -> Result<RemoteCertificate, DeliveryError> {
        let body = CreateCertificateBody {
            name,
            kind: "uploaded",
            certificate: certificate_pem,
            private_key: private_key_pem,
        };
        let envelope: CertificateEnvelope = self.send_json(
            self.request(Method::POST, "/certificates").json(&body),
            "create certificate",
        )?;
        Ok(envelope.certificate)
    }

    fn find_load_balancer(&self, name: &str) -> Result<Option<LoadBalancer>, DeliveryError> {
        let list: LoadBalancerList = self.send_json(
            self.request(Method::GET, "/load_balancers")
                .query(&[("name", name)]),
            "list load balancers",
        )?;
        Ok(list
            .load_balancers
            .into_iter()
            .find(|load_balancer| load_balancer.name == name))
    }

    fn get_certificate(&self, id: u64) -> Result<RemoteCertificate, DeliveryError> {
        let envelope: CertificateEnvelope = self.send_json(
            self.request(Method::GET, &format!("/certificates/{id}")),
            "get certificate",
        )?;
        Ok(envelope.certificate)
    }

    fn add_service(
        &self,
        load_balancer_id: u64,
        service: &NewService,
    ) -> Result<(), DeliveryError> {
        self.send(
            self.request(
                Method::POST,
                &format!("/load_balancers/{load_balancer_id}/actions/add_service"),
            )
            .json(service),
            "add load balancer service",
        )?;
        Ok(())
    }

    fn update_service_certificates(
        &self,
        load_balancer_id: u64,
        listen_port: u16,
        certificate_ids: &[u64],
    ) -> Result<(), DeliveryError> {
        let body = UpdateServiceBody {
            listen_port,
            http: UpdateServiceHttp {
                certificates: certificate_ids,
            },
        };
        self.send(
            self.request(
                Method::POST,
                &format!("/load_balancers/{load_balancer_id}/actions/update_service"),
            )
            .json(&body),
            "update load balancer service",
        )?;
        Ok(())
    }
}
