pub mod core;
pub mod distribution;
pub mod domain;
pub mod issuance;

pub use crate::core::types::{
    CertResponse, CertificateRequest, DestinationConfig, DestinationDescriptor,
    DestinationFieldDescriptor, IssuedCertificate, ResponseStatus,
};
pub use distribution::{
    CertificateDestination, DeliveryError, DeliveryReport, Destination, DestinationResolver,
    Registry, decode, deliver, describe_all, list_fields, resolve,
};
pub use issuance::{
    CertificateIssuer, IssuanceOrder, IssuerError, IssuerSet, create_certificate, handle_request,
};

/// Installs the `env_logger` backend. Defaults to `info`, overridable with
/// `RUST_LOG`. Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
