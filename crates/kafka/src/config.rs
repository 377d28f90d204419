//! Connection configuration shared by the producer and consumer engines.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rdkafka::ClientConfig;
use thiserror::Error;
use tracing::info;

use crate::error::{Error, Result};

/// Errors from parsing configuration values out of strings (flags, env vars).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseConfigError {
    #[error("unsupported SASL mechanism {0:?}, expected SCRAM-SHA-256 or SCRAM-SHA-512")]
    InvalidMechanism(String),

    #[error("unknown debug context {0:?}, expected generic, broker, security, conf or all")]
    InvalidDebugContext(String),
}

/// SASL SCRAM mechanism used to authenticate against the brokers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScramMechanism {
    Sha256,
    Sha512,
}

impl ScramMechanism {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScramMechanism::Sha256 => "SCRAM-SHA-256",
            ScramMechanism::Sha512 => "SCRAM-SHA-512",
        }
    }
}

impl fmt::Display for ScramMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScramMechanism {
    type Err = ParseConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SCRAM-SHA-256" => Ok(ScramMechanism::Sha256),
            "SCRAM-SHA-512" => Ok(ScramMechanism::Sha512),
            _ => Err(ParseConfigError::InvalidMechanism(s.to_string())),
        }
    }
}

/// A librdkafka debug context this crate knows how to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DebugContext {
    Generic,
    Broker,
    Security,
    Conf,
}

impl DebugContext {
    pub const ALL: [DebugContext; 4] = [
        DebugContext::Generic,
        DebugContext::Broker,
        DebugContext::Security,
        DebugContext::Conf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DebugContext::Generic => "generic",
            DebugContext::Broker => "broker",
            DebugContext::Security => "security",
            DebugContext::Conf => "conf",
        }
    }
}

/// Set of debug contexts forwarded as the `debug` client property.
///
/// Parsed from a comma-separated list such as `broker,security`; `all`
/// expands to every known context. The empty set disables the property.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugContexts(Vec<DebugContext>);

impl DebugContexts {
    pub fn all() -> Self {
        Self(DebugContext::ALL.to_vec())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, context: DebugContext) -> bool {
        self.0.contains(&context)
    }
}

impl FromIterator<DebugContext> for DebugContexts {
    fn from_iter<I: IntoIterator<Item = DebugContext>>(iter: I) -> Self {
        let mut contexts: Vec<DebugContext> = iter.into_iter().collect();
        contexts.sort();
        contexts.dedup();
        Self(contexts)
    }
}

impl fmt::Display for DebugContexts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(DebugContext::as_str).collect();
        f.write_str(&names.join(","))
    }
}

impl FromStr for DebugContexts {
    type Err = ParseConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut contexts = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.to_ascii_lowercase().as_str() {
                "generic" => contexts.push(DebugContext::Generic),
                "broker" => contexts.push(DebugContext::Broker),
                "security" => contexts.push(DebugContext::Security),
                "conf" => contexts.push(DebugContext::Conf),
                "all" => contexts.extend(DebugContext::ALL),
                _ => return Err(ParseConfigError::InvalidDebugContext(part.to_string())),
            }
        }
        Ok(contexts.into_iter().collect())
    }
}

/// How to reach and authenticate against the broker cluster.
///
/// Connections always use SASL over TLS. The config is handed by value to
/// exactly one engine, which validates it before opening a connection.
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Client identifier reported to the brokers (`client.id`)
    pub identity: Option<String>,
    /// Kafka brokers (comma-separated `host:port` list)
    pub brokers: String,
    /// SASL username
    pub username: String,
    /// SASL password
    pub password: String,
    /// SASL SCRAM mechanism
    pub mechanism: ScramMechanism,
    /// CA certificate used to verify the brokers (`ssl.ca.location`)
    ///
    /// When unset, librdkafka falls back to the system trust store.
    pub ca_location: Option<PathBuf>,
    /// librdkafka debug contexts
    pub debug: DebugContexts,
}

impl ConnectionConfig {
    pub fn new(
        brokers: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        mechanism: ScramMechanism,
    ) -> Self {
        Self {
            identity: None,
            brokers: brokers.into(),
            username: username.into(),
            password: password.into(),
            mechanism,
            ca_location: None,
            debug: DebugContexts::default(),
        }
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn with_ca_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_location = Some(path.into());
        self
    }

    pub fn with_debug(mut self, debug: DebugContexts) -> Self {
        self.debug = debug;
        self
    }

    /// The CA certificate path, treating an empty path as unset.
    pub fn ca_path(&self) -> Option<&Path> {
        self.ca_location
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }

    /// Broker endpoints with surrounding whitespace and empty entries removed.
    pub fn broker_list(&self) -> Vec<&str> {
        self.brokers
            .split(',')
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .collect()
    }

    /// Check the config, in order: brokers, username, password, certificate.
    ///
    /// The mechanism needs no runtime check here: it is typed, and invalid
    /// names are rejected when parsed.
    pub fn validate(&self) -> Result<()> {
        if self.broker_list().is_empty() {
            return Err(Error::EmptyBrokers);
        }
        if self.username.is_empty() {
            return Err(Error::EmptyUsername);
        }
        if self.password.is_empty() {
            return Err(Error::EmptyPassword);
        }
        if let Some(path) = self.ca_path() {
            check_certificate(path)?;
        }
        Ok(())
    }

    /// Client properties common to producers and consumers.
    pub(crate) fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", self.broker_list().join(","))
            .set("security.protocol", "SASL_SSL")
            .set("sasl.mechanisms", self.mechanism.as_str())
            .set("sasl.username", &self.username)
            .set("sasl.password", &self.password);

        if let Some(identity) = self.identity.as_deref().filter(|id| !id.is_empty()) {
            config.set("client.id", identity);
        }
        if let Some(path) = self.ca_path() {
            config.set("ssl.ca.location", path.to_string_lossy());
        }
        if !self.debug.is_empty() {
            config.set("debug", self.debug.to_string());
        }
        config
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("identity", &self.identity)
            .field("brokers", &self.brokers)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("mechanism", &self.mechanism)
            .field("ca_location", &self.ca_location)
            .field("debug", &self.debug)
            .finish()
    }
}

fn check_certificate(path: &Path) -> Result<()> {
    match std::fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => {
            let name = path.file_name().unwrap_or(path.as_os_str());
            info!("found certificate file: {}", name.to_string_lossy());
            Ok(())
        }
        Ok(_) => Err(Error::CertificateNotFound(path.to_path_buf())),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(Error::CertificateNotFound(path.to_path_buf()))
        }
        Err(e) => Err(Error::Filesystem {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
