//! # Medshare
//!
//! Patient registration and time-limited sharing of medical history.
//!
//! This crate provides:
//! - Self-validating patient, medical record and share token entities
//! - Use cases for registering patients, issuing share tokens and reading or
//!   appending history through a token
//! - SQLite and in-memory persistence
//! - A command-line boundary printing JSON responses
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Entities and the validation rule engine
//! - `ports`: Gateway and clock traits
//! - `adapters`: Concrete implementations (SQLite, in-memory, clocks, log sanitizing)
//! - `application`: Use cases orchestrating domain and ports
//! - `presenter`: JSON response bodies
//! - `cli`: Argument parsing and dispatch

pub mod adapters;
pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod ports;
pub mod presenter;

pub use application::BusinessError;
pub use domain::{DomainError, MedicalRecord, Patient, ShareToken};

/// Result type for Medshare operations
pub type Result<T> = std::result::Result<T, MedshareError>;

/// Main error type for Medshare
#[derive(Debug, thiserror::Error)]
pub enum MedshareError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Business(#[from] BusinessError),

    #[error(transparent)]
    Storage(#[from] adapters::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MedshareError {
    /// Stable machine-readable code reported at the boundary.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Domain(_) => "domain_exception",
            Self::Business(e) => e.code(),
            Self::Storage(_) => "storage_failure",
            Self::Io(_) => "io_failure",
            Self::Serialization(_) => "serialization_failure",
        }
    }

    /// HTTP-style status class for the failure.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Domain(_) => 400,
            Self::Business(e) => e.status(),
            Self::Storage(_) | Self::Io(_) | Self::Serialization(_) => 500,
        }
    }
}
