//! TLS parameter sets and server configuration assembly.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use camino::Utf8Path;
use gantry_config::{ClientAuth, TlsSettings};
use rustls::crypto::{CryptoProvider, ring};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig, SupportedCipherSuite, SupportedProtocolVersion};

use super::TlsError;

/// Protocol versions and cipher suites offered by a TLS listener.
#[derive(Debug, Clone)]
pub struct TlsParameters {
    versions: Vec<&'static SupportedProtocolVersion>,
    provider: CryptoProvider,
}

impl TlsParameters {
    /// Creates a parameter set from explicit versions and a provider.
    #[must_use]
    pub fn new(versions: Vec<&'static SupportedProtocolVersion>, provider: CryptoProvider) -> Self {
        Self { versions, provider }
    }

    /// TLS 1.3 and 1.2 with every suite of the ring provider.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(
            vec![&rustls::version::TLS13, &rustls::version::TLS12],
            ring::default_provider(),
        )
    }

    /// TLS 1.3 only.
    #[must_use]
    pub fn modern() -> Self {
        Self::new(
            vec![&rustls::version::TLS13],
            restrict_suites(|suite| matches!(suite, SupportedCipherSuite::Tls13(_))),
        )
    }

    /// TLS 1.2 only, restricted to its ECDHE suites.
    #[must_use]
    pub fn compatible() -> Self {
        Self::new(
            vec![&rustls::version::TLS12],
            restrict_suites(|suite| matches!(suite, SupportedCipherSuite::Tls12(_))),
        )
    }

    /// Protocol versions offered.
    #[must_use]
    pub fn versions(&self) -> &[&'static SupportedProtocolVersion] {
        &self.versions
    }

    /// Cipher suites offered.
    #[must_use]
    pub fn cipher_suites(&self) -> &[SupportedCipherSuite] {
        &self.provider.cipher_suites
    }
}

fn restrict_suites(keep: impl Fn(&SupportedCipherSuite) -> bool) -> CryptoProvider {
    let mut provider = ring::default_provider();
    provider.cipher_suites.retain(|suite| keep(suite));
    provider
}

/// Builds a parameter set on demand.
pub type TlsParameterBuilder = fn() -> TlsParameters;

/// Named TLS parameter sets.
///
/// Listeners look their parameter set up by name at start-up; an unknown
/// name is a configuration error rather than a silent fallback.
#[derive(Debug, Clone)]
pub struct TlsParameterRegistry {
    builders: BTreeMap<String, TlsParameterBuilder>,
}

impl TlsParameterRegistry {
    /// Registry without any parameter sets.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            builders: BTreeMap::new(),
        }
    }

    /// Registry holding the `default`, `modern` and `compatible` sets.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(gantry_config::DEFAULT_TLS_PARAMETERS, TlsParameters::standard);
        registry.register("modern", TlsParameters::modern);
        registry.register("compatible", TlsParameters::compatible);
        registry
    }

    /// Registers `builder` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, builder: TlsParameterBuilder) {
        self.builders.insert(name.into(), builder);
    }

    /// Builds the parameter set registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<TlsParameters, TlsError> {
        self.builders
            .get(name)
            .map(|builder| builder())
            .ok_or_else(|| TlsError::UnknownParameters {
                name: name.to_owned(),
            })
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.builders.keys().map(String::as_str)
    }
}

impl Default for TlsParameterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Assembles a rustls server configuration from `settings`.
pub(crate) fn build_server_config(
    settings: &TlsSettings,
    registry: &TlsParameterRegistry,
) -> Result<Arc<ServerConfig>, TlsError> {
    let parameters = registry.resolve(&settings.parameters)?;
    let certificate = settings
        .certificate
        .as_deref()
        .ok_or(TlsError::MissingCertificate)?;
    let private_key = settings
        .private_key
        .as_deref()
        .ok_or(TlsError::MissingPrivateKey)?;
    let certs = load_certs(certificate)?;
    let key = load_private_key(private_key)?;

    let provider = Arc::new(parameters.provider);
    let builder = ServerConfig::builder_with_provider(Arc::clone(&provider))
        .with_protocol_versions(&parameters.versions)?;
    let builder = match settings.client_auth {
        ClientAuth::None => builder.with_no_client_auth(),
        mode @ (ClientAuth::Optional | ClientAuth::Required) => {
            let roots_path = settings
                .client_ca
                .as_deref()
                .ok_or(TlsError::MissingClientRoots { mode })?;
            let roots = load_roots(roots_path)?;
            let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider);
            let verifier = if mode == ClientAuth::Optional {
                verifier.allow_unauthenticated().build()?
            } else {
                verifier.build()?
            };
            builder.with_client_cert_verifier(verifier)
        }
    };
    let config = builder.with_single_cert(certs, key)?;
    Ok(Arc::new(config))
}

fn open_pem(path: &Utf8Path) -> Result<BufReader<File>, TlsError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| TlsError::ReadPem {
            path: path.to_owned(),
            source,
        })
}

fn load_certs(path: &Utf8Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let mut reader = open_pem(path)?;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::ReadPem {
            path: path.to_owned(),
            source,
        })?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificates {
            path: path.to_owned(),
        });
    }
    Ok(certs)
}

fn load_private_key(path: &Utf8Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    let mut reader = open_pem(path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|source| TlsError::ReadPem {
            path: path.to_owned(),
            source,
        })?
        .ok_or_else(|| TlsError::NoPrivateKey {
            path: path.to_owned(),
        })
}

fn load_roots(path: &Utf8Path) -> Result<RootCertStore, TlsError> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(path)? {
        roots.add(cert)?;
    }
    Ok(roots)
}
