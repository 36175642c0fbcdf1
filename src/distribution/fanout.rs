use log::{error, info};

use crate::core::types::{CertificateRequest, DestinationConfig, IssuedCertificate, provider_name};

use super::DestinationResolver;
use super::errors::{DeliveryError, FanoutError};

/// Result of one destination attempt.
#[derive(Debug)]
pub struct DeliveryOutcome {
    pub index: usize,
    pub provider: String,
    pub error: Option<DeliveryError>,
}

impl DeliveryOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-destination outcomes of one fan-out run, in input order.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DeliveryReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|outcome| !outcome.succeeded()).count()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn check(&self) -> Result<(), FanoutError> {
        if self.is_success() {
            return Ok(());
        }
        Err(FanoutError::PartialFailure {
            failed: self.failed(),
            attempted: self.attempted(),
        })
    }
}

/// Uploads `certificate` to every destination in order. A failing
/// destination never stops the ones after it, and earlier successes stay.
pub fn deliver(
    resolver: &dyn DestinationResolver,
    request: &CertificateRequest,
    certificate: &IssuedCertificate,
    destinations: &[DestinationConfig],
) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    for (index, config) in destinations.iter().enumerate() {
        let provider = provider_name(config).unwrap_or("<missing>").to_string();
        info!("[fanout] uploading certificate destination={provider} index={index}");

        let result = resolver
            .resolve(config)
            .and_then(|destination| destination.upload(request, certificate));

        match &result {
            Ok(()) => info!(
                "[fanout] completed uploading certificate destination={provider} index={index}"
            ),
            Err(err) => error!(
                "[fanout] upload failed destination={provider} index={index} error={err}"
            ),
        }
        report.outcomes.push(DeliveryOutcome {
            index,
            provider,
            error: result.err(),
        });
    }
    report
}
