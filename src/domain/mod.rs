//! Domain layer: Core business types and logic.
//!
//! Entities are built through smart constructors that run their whole rule
//! table and return every violation at once. Nothing here touches storage,
//! the clock or the transport.

mod medical_record;
mod patient;
mod share_token;
pub mod validation;

pub use medical_record::{MedicalRecord, MedicalRecordId, RecordFields};
pub use patient::{Patient, PatientId};
pub use share_token::{generate_access_token, ShareToken, ShareTokenId};
pub use validation::DomainError;
