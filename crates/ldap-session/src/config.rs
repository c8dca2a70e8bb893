//! Connection configuration.
//!
//! Transport trust anchors are explicit per-connection configuration, never
//! process-global state. Environment discovery of the OpenLDAP trust-anchor
//! variables is available but strictly opt-in via
//! [`TransportSecurity::discover_from_env`].

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default minimum protocol version.
pub const PROTO_MIN_VERSION: i32 = 3;

/// TLS trust-anchor configuration for one connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportSecurity {
    /// PEM file with trusted CA certificates.
    pub ca_cert_file: Option<PathBuf>,
    /// Directory of PEM files with trusted CA certificates.
    pub ca_cert_dir: Option<PathBuf>,
    /// Whether to verify server certificates. Should stay `true` outside of
    /// test setups.
    pub verify_certificates: bool,
}

impl Default for TransportSecurity {
    fn default() -> Self {
        Self {
            ca_cert_file: None,
            ca_cert_dir: None,
            verify_certificates: true,
        }
    }
}

impl TransportSecurity {
    /// Platform trust anchors, verification on.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads trust-anchor paths from the standard OpenLDAP client
    /// environment variables `LDAPTLS_CACERT` and `LDAPTLS_CACERTDIR`.
    ///
    /// Host applications that want the classic environment-driven behavior
    /// call this explicitly; nothing in this crate consults the environment
    /// on its own.
    #[must_use]
    pub fn discover_from_env() -> Self {
        Self {
            ca_cert_file: env::var_os("LDAPTLS_CACERT").map(PathBuf::from),
            ca_cert_dir: env::var_os("LDAPTLS_CACERTDIR").map(PathBuf::from),
            verify_certificates: true,
        }
    }

    /// Sets the CA certificate file.
    #[must_use]
    pub fn ca_cert_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert_file = Some(path.into());
        self
    }

    /// Sets the CA certificate directory.
    #[must_use]
    pub fn ca_cert_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert_dir = Some(path.into());
        self
    }

    /// Toggles server certificate verification.
    #[must_use]
    pub const fn verify_certificates(mut self, verify: bool) -> Self {
        self.verify_certificates = verify;
        self
    }
}

/// Configuration for establishing one connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Directory server URI (`ldap://`, `ldaps://` or `ldapi://`).
    pub uri: String,
    /// Minimum acceptable protocol version; the negotiated version is raised
    /// to this when the server reports less.
    pub min_version: i32,
    /// Native library debug/trace level, applied before connecting.
    pub debug_level: u32,
    /// Timeout applied to individual protocol round trips.
    pub network_timeout: Option<Duration>,
    /// Transport trust-anchor configuration.
    pub transport: TransportSecurity,
}

impl ConnectionConfig {
    /// Creates a configuration with the default protocol minimum and no
    /// debug output.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            min_version: PROTO_MIN_VERSION,
            debug_level: 0,
            network_timeout: None,
            transport: TransportSecurity::default(),
        }
    }

    /// Sets the minimum acceptable protocol version.
    #[must_use]
    pub const fn min_version(mut self, version: i32) -> Self {
        self.min_version = version;
        self
    }

    /// Sets the native debug/trace level.
    #[must_use]
    pub const fn debug_level(mut self, level: u32) -> Self {
        self.debug_level = level;
        self
    }

    /// Sets the network timeout for protocol round trips.
    #[must_use]
    pub const fn network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = Some(timeout);
        self
    }

    /// Sets the transport trust-anchor configuration.
    #[must_use]
    pub fn transport(mut self, transport: TransportSecurity) -> Self {
        self.transport = transport;
        self
    }
}
