use std::path::PathBuf;

use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use thiserror::Error;

use crate::config::ParseConfigError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("at least one broker is required")]
    EmptyBrokers,

    #[error("SASL username is required")]
    EmptyUsername,

    #[error("SASL password is required")]
    EmptyPassword,

    #[error("consumer group id is required")]
    EmptyGroupId,

    #[error("producer timeout must be at least one millisecond")]
    ZeroTimeout,

    #[error(transparent)]
    Parse(#[from] ParseConfigError),

    #[error("certificate file does not exist: {}", .0.display())]
    CertificateNotFound(PathBuf),

    #[error("failed to inspect certificate file {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),

    /// A broker condition after which polling is presumed futile.
    #[error("fatal broker error {code}: {reason}")]
    Fatal {
        code: RDKafkaErrorCode,
        reason: String,
    },
}

impl Error {
    /// True for errors detected while validating configuration, before any
    /// connection is attempted.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Error::EmptyBrokers
                | Error::EmptyUsername
                | Error::EmptyPassword
                | Error::EmptyGroupId
                | Error::ZeroTimeout
                | Error::Parse(_)
                | Error::CertificateNotFound(_)
                | Error::Filesystem { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
