use lettre::message::header::{ContentTransferEncoding, ContentType};
use lettre::message::{Attachment, Body, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use log::info;

use crate::core::types::{CertificateRequest, IssuedCertificate};

use super::config::{ConfigFields, ConfigReader, FieldSpec};
use super::errors::DeliveryError;

const DESTINATION: &str = "email";
const CERT_ATTACHMENT: &str = "cert.txt";
const KEY_ATTACHMENT: &str = "private.txt";

/// Mails the certificate and private key as two attachments to one recipient.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailDestination {
    pub to: String,
    pub from: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    /// Connect with a TLS wrapper instead of upgrading with STARTTLS.
    pub implicit_tls: bool,
}

impl ConfigFields for EmailDestination {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("to", "Email address of where to send certificates"),
        FieldSpec::text("from", "Email of from address").secret(),
        FieldSpec::text("host", "SMTP Host").secret(),
        FieldSpec::integer("port", "SMTP Port").secret(),
        FieldSpec::text("username", "SMTP Username").secret(),
        FieldSpec::text("password", "SMTP Password").secret(),
        FieldSpec::boolean("implicit_tls", "Use implicit TLS instead of STARTTLS"),
    ];

    fn apply(&mut self, reader: &ConfigReader<'_>) -> Result<(), DeliveryError> {
        reader.text("to", &mut self.to)?;
        reader.text("from", &mut self.from)?;
        reader.text("host", &mut self.smtp_host)?;
        reader.integer("port", &mut self.smtp_port)?;
        reader.text("username", &mut self.smtp_username)?;
        reader.text("password", &mut self.smtp_password)?;
        reader.flag("implicit_tls", &mut self.implicit_tls)?;
        Ok(())
    }
}

impl EmailDestination {
    pub const DESCRIPTION: &'static str = "Sends certificate and private key as email attachments";

    pub fn upload(
        &self,
        request: &CertificateRequest,
        certificate: &IssuedCertificate,
    ) -> Result<(), DeliveryError> {
        let message = self.build_message(&request.domain, certificate)?;
        let mailer = self.transport()?;
        mailer
            .send(&message)
            .map_err(|err| DeliveryError::transport(DESTINATION, err))?;
        info!("[email] sent certificate for {} to {}", request.domain, self.to);
        Ok(())
    }

    pub fn build_message(
        &self,
        domain: &str,
        certificate: &IssuedCertificate,
    ) -> Result<Message, DeliveryError> {
        let from: Mailbox = self
            .from
            .parse()
            .map_err(|err| {
                DeliveryError::transport(DESTINATION, format!("invalid from address: {err}"))
            })?;
        let to: Mailbox = self
            .to
            .parse()
            .map_err(|err| {
                DeliveryError::transport(DESTINATION, format!("invalid to address: {err}"))
            })?;

        let body = format!("Attached is your certificate for {domain}\n");
        let parts = MultiPart::mixed()
            .singlepart(SinglePart::plain(body))
            .singlepart(attachment(CERT_ATTACHMENT, &certificate.certificate_pem)?)
            .singlepart(attachment(KEY_ATTACHMENT, &certificate.private_key_pem)?);

        Message::builder()
            .from(from)
            .to(to)
            .subject(format!("Certificate for {domain}"))
            .multipart(parts)
            .map_err(|err| DeliveryError::transport(DESTINATION, err))
    }

    fn transport(&self) -> Result<SmtpTransport, DeliveryError> {
        let builder = if self.implicit_tls {
            SmtpTransport::relay(&self.smtp_host)
        } else {
            SmtpTransport::starttls_relay(&self.smtp_host)
        }
        .map_err(|err| DeliveryError::transport(DESTINATION, err))?;

        Ok(builder
            .port(self.smtp_port)
            .credentials(Credentials::new(
                self.smtp_username.clone(),
                self.smtp_password.clone(),
            ))
            .build())
    }
}

fn attachment(filename: &str, content: &[u8]) -> Result<SinglePart, DeliveryError> {
    let body = Body::new_with_encoding(content.to_vec(), ContentTransferEncoding::Base64)
        .map_err(|_| DeliveryError::transport(DESTINATION, "failed to encode attachment"))?;
    Ok(Attachment::new(filename.to_string()).body(body, ContentType::TEXT_PLAIN))
}
