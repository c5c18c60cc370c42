//! PostgreSQL TLS Support
//!
//! Maps libpq-style `sslmode`/`sslrootcert`/`sslcert`/`sslkey` settings onto a
//! native-tls connector for tokio-postgres.

use native_tls::{Certificate, Identity, TlsConnector as NativeTlsConnector, TlsConnectorBuilder};
use postgres_native_tls::MakeTlsConnector;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;
use vbatch_core::{ConnectionConfig, VbatchError};

/// Error types for TLS operations
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("Failed to load CA certificate from {path}: {source}")]
    CaCertLoadFailed {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid CA certificate format: {0}")]
    InvalidCaCert(String),

    #[error("Failed to load client certificate from {path}: {source}")]
    ClientCertLoadFailed {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to load client key from {path}: {source}")]
    ClientKeyLoadFailed {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid client identity (cert + key): {0}")]
    InvalidClientIdentity(String),

    #[error("Unknown sslmode '{0}'")]
    UnknownMode(String),

    #[error("TLS configuration error: {0}")]
    ConfigurationError(String),
}

impl From<TlsError> for VbatchError {
    fn from(error: TlsError) -> Self {
        match error {
            TlsError::UnknownMode(_) => VbatchError::Configuration(error.to_string()),
            other => VbatchError::Connection(other.to_string()),
        }
    }
}

/// libpq `sslmode`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    Disable,
    Allow,
    #[default]
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

impl SslMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SslMode::Disable => "disable",
            SslMode::Allow => "allow",
            SslMode::Prefer => "prefer",
            SslMode::Require => "require",
            SslMode::VerifyCa => "verify-ca",
            SslMode::VerifyFull => "verify-full",
        }
    }

    /// The closest mode tokio-postgres understands
    pub fn to_tokio_postgres(self) -> tokio_postgres::config::SslMode {
        use tokio_postgres::config::SslMode as Pg;
        match self {
            SslMode::Disable => Pg::Disable,
            SslMode::Allow | SslMode::Prefer => Pg::Prefer,
            SslMode::Require | SslMode::VerifyCa | SslMode::VerifyFull => Pg::Require,
        }
    }
}

impl FromStr for SslMode {
    type Err = TlsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "disable" => Ok(SslMode::Disable),
            "allow" => Ok(SslMode::Allow),
            "prefer" | "" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            "verify-ca" | "verify_ca" => Ok(SslMode::VerifyCa),
            "verify-full" | "verify_full" => Ok(SslMode::VerifyFull),
            other => Err(TlsError::UnknownMode(other.to_string())),
        }
    }
}

/// TLS settings for one connection
#[derive(Debug, Clone, Default)]
pub struct TlsSettings {
    pub mode: SslMode,
    pub ca_cert: Option<PathBuf>,
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
}

impl TlsSettings {
    /// Read TLS settings from connection parameters.
    ///
    /// Accepts libpq names (`sslmode`, `sslrootcert`, `sslcert`, `sslkey`) as
    /// well as `ssl_mode`, `ssl_ca_cert`, `ssl_client_cert`, `ssl_client_key`.
    pub fn from_config(config: &ConnectionConfig) -> Result<Self, TlsError> {
        let lookup = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| config.get_string(name))
                .filter(|value| !value.trim().is_empty())
        };

        let mode = match lookup(&["sslmode", "ssl_mode"]) {
            Some(mode) => mode.parse()?,
            None => SslMode::default(),
        };

        Ok(Self {
            mode,
            ca_cert: lookup(&["sslrootcert", "ssl_ca_cert"]).map(PathBuf::from),
            client_cert: lookup(&["sslcert", "ssl_client_cert"]).map(PathBuf::from),
            client_key: lookup(&["sslkey", "ssl_client_key"]).map(PathBuf::from),
        })
    }

    pub fn is_disabled(&self) -> bool {
        self.mode == SslMode::Disable
    }

    /// Build a connector for tokio-postgres. Only valid when TLS is enabled.
    pub fn build_connector(&self) -> Result<MakeTlsConnector, TlsError> {
        if self.is_disabled() {
            return Err(TlsError::ConfigurationError(
                "TLS connector requested with sslmode=disable".into(),
            ));
        }

        debug!(mode = self.mode.as_str(), "building PostgreSQL TLS connector");
        let mut builder = NativeTlsConnector::builder();
        configure_verification(&mut builder, self);

        if let Some(ca_cert_path) = &self.ca_cert {
            apply_ca_cert(&mut builder, ca_cert_path)?;
        }

        if let (Some(cert_path), Some(key_path)) = (&self.client_cert, &self.client_key) {
            apply_client_cert(&mut builder, cert_path, key_path)?;
        }

        let connector = builder
            .build()
            .map_err(|e| TlsError::ConfigurationError(e.to_string()))?;
        Ok(MakeTlsConnector::new(connector))
    }
}

/// libpq semantics: below verify-ca the certificate is not checked at all
fn configure_verification(builder: &mut TlsConnectorBuilder, settings: &TlsSettings) {
    match settings.mode {
        SslMode::Disable | SslMode::Allow | SslMode::Prefer | SslMode::Require => {
            builder.danger_accept_invalid_certs(settings.ca_cert.is_none());
            builder.danger_accept_invalid_hostnames(true);
        }
        SslMode::VerifyCa => {
            builder.danger_accept_invalid_hostnames(true);
        }
        SslMode::VerifyFull => {}
    }
}

fn apply_ca_cert(builder: &mut TlsConnectorBuilder, path: &Path) -> Result<(), TlsError> {
    debug!(path = %path.display(), "loading CA certificate");

    let pem_data = fs::read(path).map_err(|e| TlsError::CaCertLoadFailed {
        path: path.display().to_string(),
        source: e,
    })?;
    let cert =
        Certificate::from_pem(&pem_data).map_err(|e| TlsError::InvalidCaCert(e.to_string()))?;

    builder.add_root_certificate(cert);
    Ok(())
}

fn apply_client_cert(
    builder: &mut TlsConnectorBuilder,
    cert_path: &Path,
    key_path: &Path,
) -> Result<(), TlsError> {
    debug!(
        cert_path = %cert_path.display(),
        key_path = %key_path.display(),
        "loading client certificate and key"
    );

    let cert_pem = fs::read(cert_path).map_err(|e| TlsError::ClientCertLoadFailed {
        path: cert_path.display().to_string(),
        source: e,
    })?;
    let key_pem = fs::read(key_path).map_err(|e| TlsError::ClientKeyLoadFailed {
        path: key_path.display().to_string(),
        source: e,
    })?;

    // native-tls Identity::from_pkcs8 expects PEM cert and PEM key
    let identity = Identity::from_pkcs8(&cert_pem, &key_pem)
        .map_err(|e| TlsError::InvalidClientIdentity(e.to_string()))?;
    builder.identity(identity);
    Ok(())
}
