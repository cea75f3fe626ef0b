//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the use cases and external systems (storage, wall clock).

mod clock;
mod storage;

pub use clock::Clock;
pub use storage::{MedicalRecordGateway, PatientGateway, ShareTokenGateway};
