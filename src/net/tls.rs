//! PEM certificate and key loading for the HTTPS listener.

use std::io;
use std::path::{Path, PathBuf};

use axum_server::tls_rustls::RustlsConfig;

/// Locations of the PEM files served by an HTTPS listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl TlsFiles {
    pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
        }
    }

    /// Read both files into a rustls server config.
    ///
    /// Missing files are reported as `NotFound` naming the path.
    pub async fn load(&self) -> io::Result<RustlsConfig> {
        require_file(&self.cert_path, "certificate")?;
        require_file(&self.key_path, "private key")?;
        RustlsConfig::from_pem_file(&self.cert_path, &self.key_path).await
    }
}

fn require_file(path: &Path, what: &str) -> io::Result<()> {
    if path.is_file() {
        return Ok(());
    }
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("{what} file not found: {}", path.display()),
    ))
}
