use anyhow::{Context, Result};
use log::{error, info};

use crate::core::types::{CertResponse, CertificateRequest};
use crate::distribution::{DeliveryReport, DestinationResolver, deliver};

use super::issuer::{IssuanceOrder, IssuerSet};

/// Issues the certificate for `request` and delivers it to every destination.
/// Fails if issuance fails or if any destination failed.
pub fn create_certificate(
    request: &CertificateRequest,
    issuers: IssuerSet<'_>,
    resolver: &dyn DestinationResolver,
) -> Result<DeliveryReport> {
    info!("[pipeline] creating certificate for {}", request.domain);

    let issuer = issuers.select(request)?;
    let order = IssuanceOrder::from_request(request);
    let certificate = issuer
        .issue(&order)
        .with_context(|| format!("failed to issue certificate for {}", request.domain))?;

    let report = deliver(resolver, request, &certificate, &request.destinations);
    report.check()?;
    info!(
        "[pipeline] delivered certificate for {} to {} destinations",
        request.domain,
        report.attempted()
    );
    Ok(report)
}

/// Runs the whole pipeline and folds the outcome into a response envelope.
pub fn handle_request(
    request: &CertificateRequest,
    issuers: IssuerSet<'_>,
    resolver: &dyn DestinationResolver,
) -> CertResponse {
    match create_certificate(request, issuers, resolver) {
        Ok(_) => CertResponse::success(),
        Err(err) => {
            error!("[pipeline] certificate request for {} failed: {err:#}", request.domain);
            CertResponse::failed(format!("{err:#}"))
        }
    }
}
