pub mod flow;
pub mod issuer;

pub use flow::{create_certificate, handle_request};
pub use issuer::{CertificateIssuer, IssuanceOrder, IssuerError, IssuerSet};
