//! Adapters layer: Concrete implementations of ports.
//!
//! - `sqlite`: SQLite persistence for patients, records and tokens
//! - `memory`: process-local persistence for tests and throwaway runs
//! - `clock`: wall clock and a controllable clock for tests
//! - `sanitize`: CPF/token filtering for logs

pub mod clock;
pub mod memory;
pub mod sanitize;
pub mod sqlite;

pub use clock::{FixedClock, SystemClock};
pub use memory::InMemoryStorage;
pub use sqlite::{SqliteStorage, StorageError};
