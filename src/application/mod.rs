//! Application layer: Use cases.
//!
//! Each use case holds `Arc` handles to the gateways (and clock) it needs and
//! is stateless per call. Gateway errors are lifted into
//! [`crate::adapters::StorageError`]; rule failures surface as
//! [`BusinessError`] or [`crate::DomainError`].

mod create_patient;
mod error;
mod generate_token;
mod search_history;
mod token_access;

#[cfg(test)]
pub(crate) mod test_support;

pub use create_patient::CreatePatient;
pub use error::BusinessError;
pub use generate_token::GenerateToken;
pub use search_history::SearchPatientHistory;
pub use token_access::{AccessHistoryByToken, RegisterMedicalRecordByToken};
