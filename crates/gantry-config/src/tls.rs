//! TLS listener settings.
//!
//! Only the shape of the configuration lives here; turning it into a rustls
//! server configuration is the daemon's job.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::defaults::DEFAULT_TLS_PARAMETERS;

/// Client certificate policy applied by a TLS listener.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ClientAuth {
    /// Clients are never asked for a certificate.
    #[default]
    None,
    /// Clients may present a certificate; anonymous clients are accepted.
    Optional,
    /// Clients must present a certificate signed by a configured root.
    Required,
}

/// Errors encountered while parsing a [`ClientAuth`] from text.
pub type ClientAuthParseError = strum::ParseError;

/// Settings consulted when the listener runs in TLS mode.
///
/// Every field except `enabled` is ignored for plain listeners.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TlsSettings {
    /// Whether the listener wraps connections in TLS.
    pub enabled: bool,
    /// Client certificate policy.
    pub client_auth: ClientAuth,
    /// Name of the registered parameter set (protocol versions and suites).
    pub parameters: String,
    /// PEM encoded certificate chain presented to clients.
    pub certificate: Option<Utf8PathBuf>,
    /// PEM encoded private key matching `certificate`.
    pub private_key: Option<Utf8PathBuf>,
    /// PEM encoded roots used to verify client certificates.
    pub client_ca: Option<Utf8PathBuf>,
}

impl TlsSettings {
    /// Settings for a plain, unencrypted listener.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            client_auth: ClientAuth::None,
            parameters: DEFAULT_TLS_PARAMETERS.to_owned(),
            certificate: None,
            private_key: None,
            client_ca: None,
        }
    }

    /// Settings for a TLS listener presenting the given certificate and key.
    #[must_use]
    pub fn with_identity(
        certificate: impl Into<Utf8PathBuf>,
        private_key: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            enabled: true,
            certificate: Some(certificate.into()),
            private_key: Some(private_key.into()),
            ..Self::disabled()
        }
    }
}

impl Default for TlsSettings {
    fn default() -> Self {
        Self::disabled()
    }
}
