//! Error types shared by the record stores, codec and persistence layer.

use std::{fmt, io, path::PathBuf};

use crate::models::TrainId;

/// Result alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Entity family a persisted line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// `username,password,role`
    User,
    /// `id,name,source,destination,seats`
    Train,
    /// `id,source,destination`
    Route,
    /// `username:train;train;...`
    Booking,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::User => "user",
            Self::Train => "train",
            Self::Route => "route",
            Self::Booking => "booking",
        };
        f.write_str(label)
    }
}

/// A persisted line that does not match the shape of its entity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed {kind} record {line:?}: {reason}")]
pub struct ParseError {
    /// Entity the line was decoded as.
    pub kind: EntityKind,
    /// Offending text.
    pub line: String,
    /// Human readable cause.
    pub reason: String,
}

impl ParseError {
    pub(crate) fn new(kind: EntityKind, line: &str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors reported by domain operations and bulk persistence.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A persisted line failed to decode.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Registration or add with a key that is already present.
    #[error("{entity} {key} already exists")]
    DuplicateKey {
        /// Entity family.
        entity: EntityKind,
        /// Rendered key.
        key: String,
    },

    /// Edit, remove or book referencing an absent key.
    #[error("{entity} {key} not found")]
    NotFound {
        /// Entity family.
        entity: EntityKind,
        /// Rendered key.
        key: String,
    },

    /// Unknown user or password mismatch.
    #[error("invalid username or password")]
    Authentication,

    /// Booking attempted on a train without free seats.
    #[error("train {train_id} has no seats available")]
    CapacityExhausted {
        /// Train that is full.
        train_id: TrainId,
    },

    /// A free-text field that cannot be stored losslessly.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Configuration sources could not be merged or deserialized.
    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    /// Backing file could not be read or written.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        /// File involved in the failed operation.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn not_found(entity: EntityKind, key: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub(crate) fn duplicate(entity: EntityKind, key: impl fmt::Display) -> Self {
        Self::DuplicateKey {
            entity,
            key: key.to_string(),
        }
    }
}
