use std::io::Write;
use std::net::TcpStream;
use std::path::Path;

use log::{debug, info, warn};
use ssh2::{Session, Sftp};

use crate::core::types::{CertificateRequest, IssuedCertificate};

use super::config::{ConfigFields, ConfigReader, FieldSpec};
use super::errors::DeliveryError;

const DESTINATION: &str = "sftp";
const DIRECTORY_MODE: i32 = 0o755;

/// Uploads certificate and private key over SFTP, each to its own remote path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SftpDestination {
    pub private_key: String,
    pub user: String,
    pub host: String,
    pub port: u16,
    pub certificate_destination: String,
    pub private_key_destination: String,
}

impl ConfigFields for SftpDestination {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("private_key", "SSH Private Key").secret(),
        FieldSpec::text("user", "Username"),
        FieldSpec::text("host", "Hostname"),
        FieldSpec::integer("port", "Port"),
        FieldSpec::text(
            "certificate_destination",
            "Full path, including file name, for certificate",
        ),
        FieldSpec::text(
            "private_key_destination",
            "Full path, including file name, for private key",
        ),
    ];

    fn apply(&mut self, reader: &ConfigReader<'_>) -> Result<(), DeliveryError> {
        reader.text("private_key", &mut self.private_key)?;
        reader.text("user", &mut self.user)?;
        reader.text("host", &mut self.host)?;
        reader.integer("port", &mut self.port)?;
        reader.text("certificate_destination", &mut self.certificate_destination)?;
        reader.text("private_key_destination", &mut self.private_key_destination)?;
        Ok(())
    }
}

/// Minimal remote filesystem surface used by the upload.
pub trait RemoteFs {
    fn is_dir(&self, path: &str) -> bool;
    fn mkdir(&self, path: &str) -> Result<(), DeliveryError>;
    fn write_file(&self, path: &str, content: &[u8]) -> Result<(), DeliveryError>;
}

impl RemoteFs for Sftp {
    fn is_dir(&self, path: &str) -> bool {
        self.stat(Path::new(path))
            .map(|stat| stat.is_dir())
            .unwrap_or(false)
    }

    fn mkdir(&self, path: &str) -> Result<(), DeliveryError> {
        Sftp::mkdir(self, Path::new(path), DIRECTORY_MODE)
            .map_err(|err| DeliveryError::transport(DESTINATION, format!("mkdir {path}: {err}")))
    }

    fn write_file(&self, path: &str, content: &[u8]) -> Result<(), DeliveryError> {
        let mut file = self
            .create(Path::new(path))
            .map_err(|err| DeliveryError::transport(DESTINATION, format!("create {path}: {err}")))?;
        file.write_all(content)
            .and_then(|_| file.flush())
            .map_err(|err| DeliveryError::transport(DESTINATION, format!("write {path}: {err}")))
    }
}

/// Creates `dir` and every missing parent. Existing directories are left alone.
pub fn ensure_dir(fs: &dyn RemoteFs, dir: &str) -> Result<(), DeliveryError> {
    let mut prefix = String::new();
    if dir.starts_with('/') {
        prefix.push('/');
    }
    for segment in dir.split('/').filter(|segment| !segment.is_empty()) {
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push('/');
        }
        prefix.push_str(segment);
        if segment == "." || fs.is_dir(&prefix) {
            continue;
        }
        debug!("[sftp] creating remote directory {prefix}");
        if let Err(err) = fs.mkdir(&prefix) {
            // Another writer may have created it in between.
            if !fs.is_dir(&prefix) {
                return Err(err);
            }
        }
    }
    Ok(())
}

/// Directory part of a remote path, or `None` for a bare file name.
fn parent_dir(path: &str) -> Option<&str> {
    let (dir, _) = path.rsplit_once('/')?;
    if dir.is_empty() { Some("/") } else { Some(dir) }
}

/// Writes one file after making sure its directory exists.
pub fn put_file(fs: &dyn RemoteFs, path: &str, content: &[u8]) -> Result<(), DeliveryError> {
    if let Some(dir) = parent_dir(path) {
        ensure_dir(fs, dir)?;
    }
    fs.write_file(path, content)
}

impl SftpDestination {
    pub const DESCRIPTION: &'static str = "Uploads certificate via SFTP to a remote directory";

    pub fn upload(
        &self,
        request: &CertificateRequest,
        certificate: &IssuedCertificate,
    ) -> Result<(), DeliveryError> {
        let (_session, sftp) = self.connect()?;
        self.write_files(&sftp, certificate)?;
        info!(
            "[sftp] uploaded certificate for {} to {}:{}",
            request.domain, self.host, self.port
        );
        Ok(())
    }

    /// Certificate first, then key. A failed key write leaves the certificate
    /// in place.
    pub fn write_files(
        &self,
        fs: &dyn RemoteFs,
        certificate: &IssuedCertificate,
    ) -> Result<(), DeliveryError> {
        put_file(fs, &self.certificate_destination, &certificate.certificate_pem)?;
        put_file(fs, &self.private_key_destination, &certificate.private_key_pem).map_err(
            |err| {
                warn!(
                    "[sftp] certificate written to {} but private key upload failed",
                    self.certificate_destination
                );
                err
            },
        )
    }

    fn connect(&self) -> Result<(Session, Sftp), DeliveryError> {
        let tcp = TcpStream::connect((self.host.as_str(), self.port))
            .map_err(|err| DeliveryError::transport(DESTINATION, err))?;
        let mut session =
            Session::new().map_err(|err| DeliveryError::transport(DESTINATION, err))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|err| DeliveryError::transport(DESTINATION, err))?;
        warn!("[sftp] host key for {} is not verified", self.host);
        session
            .userauth_pubkey_memory(&self.user, None, &self.private_key, None)
            .map_err(|err| DeliveryError::transport(DESTINATION, err))?;
        let sftp = session
            .sftp()
            .map_err(|err| DeliveryError::transport(DESTINATION, err))?;
        Ok((session, sftp))
    }
}
