use crate::core::types::{
    CertificateRequest, DestinationConfig, DestinationDescriptor, DestinationFieldDescriptor,
    IssuedCertificate, provider_name,
};

pub mod config;
pub mod email;
pub mod errors;
pub mod fanout;
pub mod hetzner;
pub(crate) mod http;
pub mod sftp;

pub use config::{ConfigFields, ConfigReader, FieldKind, FieldSpec};
pub use email::EmailDestination;
pub use errors::{DeliveryError, FanoutError};
pub use fanout::{DeliveryOutcome, DeliveryReport, deliver};
pub use hetzner::LoadBalancerDestination;
pub use sftp::SftpDestination;

/// Capability every destination variant provides.
pub trait CertificateDestination {
    fn describe(&self) -> &'static str;
    fn upload(
        &self,
        request: &CertificateRequest,
        certificate: &IssuedCertificate,
    ) -> Result<(), DeliveryError>;
}

/// Closed set of destination variants. Adding a provider means adding a
/// variant here and to [`Destination::PROVIDERS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Email(EmailDestination),
    Sftp(SftpDestination),
    LoadBalancer(LoadBalancerDestination),
}

impl Destination {
    pub const PROVIDERS: &'static [&'static str] = &["email", "sftp", "hetzner"];

    pub fn provider(&self) -> &'static str {
        match self {
            Destination::Email(_) => "email",
            Destination::Sftp(_) => "sftp",
            Destination::LoadBalancer(_) => "hetzner",
        }
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            Destination::Email(_) => EmailDestination::FIELDS,
            Destination::Sftp(_) => SftpDestination::FIELDS,
            Destination::LoadBalancer(_) => LoadBalancerDestination::FIELDS,
        }
    }
}

impl CertificateDestination for Destination {
    fn describe(&self) -> &'static str {
        match self {
            Destination::Email(_) => EmailDestination::DESCRIPTION,
            Destination::Sftp(_) => SftpDestination::DESCRIPTION,
            Destination::LoadBalancer(_) => LoadBalancerDestination::DESCRIPTION,
        }
    }

    fn upload(
        &self,
        request: &CertificateRequest,
        certificate: &IssuedCertificate,
    ) -> Result<(), DeliveryError> {
        match self {
            Destination::Email(destination) => destination.upload(request, certificate),
            Destination::Sftp(destination) => destination.upload(request, certificate),
            Destination::LoadBalancer(destination) => destination.upload(request, certificate),
        }
    }
}

/// Returns a fresh, zero-valued variant for `provider`.
pub fn resolve(provider: &str) -> Result<Destination, DeliveryError> {
    match provider {
        "email" => Ok(Destination::Email(EmailDestination::default())),
        "sftp" => Ok(Destination::Sftp(SftpDestination::default())),
        "hetzner" => Ok(Destination::LoadBalancer(LoadBalancerDestination::default())),
        other => Err(DeliveryError::UnknownProvider(other.to_string())),
    }
}

pub fn describe_all() -> Vec<DestinationDescriptor> {
    Destination::PROVIDERS
        .iter()
        .filter_map(|provider| resolve(provider).ok())
        .map(|destination| DestinationDescriptor {
            provider: destination.provider().to_string(),
            description: destination.describe().to_string(),
        })
        .collect()
}

/// Declared fields of `provider` in declaration order; empty when unknown.
pub fn list_fields(provider: &str) -> Vec<DestinationFieldDescriptor> {
    resolve(provider)
        .map(|destination| {
            destination
                .fields()
                .iter()
                .map(FieldSpec::descriptor)
                .collect()
        })
        .unwrap_or_default()
}

/// Applies the values in `raw` to `destination`'s declared fields.
pub fn decode(
    raw: &DestinationConfig,
    destination: Destination,
) -> Result<Destination, DeliveryError> {
    let reader = ConfigReader::new(raw);
    Ok(match destination {
        Destination::Email(mut inner) => {
            inner.apply(&reader)?;
            Destination::Email(inner)
        }
        Destination::Sftp(mut inner) => {
            inner.apply(&reader)?;
            Destination::Sftp(inner)
        }
        Destination::LoadBalancer(mut inner) => {
            inner.apply(&reader)?;
            Destination::LoadBalancer(inner)
        }
    })
}

/// Turns one raw destination config into something that can be uploaded to.
pub trait DestinationResolver {
    fn resolve(
        &self,
        config: &DestinationConfig,
    ) -> Result<Box<dyn CertificateDestination + '_>, DeliveryError>;
}

/// Resolver backed by the built-in destination variants.
#[derive(Debug, Clone, Copy, Default)]
pub struct Registry;

impl DestinationResolver for Registry {
    fn resolve(
        &self,
        config: &DestinationConfig,
    ) -> Result<Box<dyn CertificateDestination + '_>, DeliveryError> {
        let provider = provider_name(config).ok_or(DeliveryError::MissingProvider)?;
        let destination = decode(config, resolve(provider)?)?;
        Ok(Box::new(destination))
    }
}
