//! SQLite adapter: Implementation of the storage gateways.
//!
//! Provides local persistence for patients, medical records and share tokens.
//! CPF and access-token uniqueness are enforced by `UNIQUE` constraints, which
//! closes the race between "check absent" and "insert" in the use cases.
//!
//! SQLite failures surface as [`StorageError::Database`]: the display text
//! names the operation, the driver error is kept as `source` and logged.
//!
//! # Mutex Behavior
//!
//! Database connection is protected by `Mutex`. A poisoned mutex (from panic
//! in another thread) will cause panic. This fail-fast behavior is intentional
//! for data integrity in healthcare applications.
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{ffi, params, Connection, OptionalExtension};

use crate::domain::{
    MedicalRecord, MedicalRecordId, Patient, PatientId, RecordFields, ShareToken, ShareTokenId,
};
use crate::ports::{MedicalRecordGateway, PatientGateway, ShareTokenGateway};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{context}")]
    Database {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid stored data: {0}")]
    InvalidRow(String),
}

/// Attach an operation description to a driver error.
trait DbContext<T> {
    fn context<F>(self, describe: F) -> Result<T, StorageError>
    where
        F: FnOnce() -> String;
}

impl<T> DbContext<T> for rusqlite::Result<T> {
    fn context<F>(self, describe: F) -> Result<T, StorageError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|source| {
            let context = describe();
            tracing::error!(error = %source, "{}", context);
            StorageError::Database { context, source }
        })
    }
}

/// SQLite storage adapter.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

struct PatientRow {
    id: i64,
    name: String,
    cpf: String,
    birth_date: String,
}

struct RecordRow {
    id: i64,
    date: String,
    unit: String,
    professional_name: String,
    diagnosis: String,
    treatment: String,
    notes: String,
}

struct TokenRow {
    id: i64,
    access_token: String,
    expires_in_minutes: i64,
    created_at: String,
    patient_id: i64,
}

impl SqliteStorage {
    /// Create a new SQLite storage with the given database path.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path).context(|| "Error opening database.".to_string())?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Create an in-memory SQLite database (for testing).
    ///
    /// # Errors
    /// Returns error if database cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn =
            Connection::open_in_memory().context(|| "Error opening database.".to_string())?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.conn.lock().expect("Lock failed");

        conn.execute_batch(
            r"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS patients (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                cpf TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                birth_date TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS medical_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                patient_id INTEGER NOT NULL REFERENCES patients(id),
                date TEXT NOT NULL,
                unit TEXT NOT NULL,
                professional_name TEXT NOT NULL,
                diagnosis TEXT NOT NULL,
                treatment TEXT NOT NULL,
                notes TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_medical_records_patient
                ON medical_records(patient_id);

            CREATE TABLE IF NOT EXISTS share_tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                access_token TEXT NOT NULL UNIQUE,
                expires_in_minutes INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                patient_id INTEGER NOT NULL REFERENCES patients(id)
            );
            ",
        )
        .context(|| "Error initializing database schema.".to_string())?;

        Ok(())
    }

    fn require_patient(conn: &Connection, patient_id: PatientId) -> Result<(), StorageError> {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM patients WHERE id = ?1",
                params![patient_id.0],
                |row| row.get(0),
            )
            .context(|| format!("Error finding patient with id=[{patient_id}]."))?;

        if count == 0 {
            return Err(StorageError::NotFound(format!(
                "Patient with id=[{patient_id}] not found."
            )));
        }
        Ok(())
    }

    fn load_records(
        conn: &Connection,
        filter: &str,
        param: &dyn rusqlite::ToSql,
        context: &str,
    ) -> Result<Vec<MedicalRecord>, StorageError> {
        let sql = format!(
            r"
            SELECT r.id, r.date, r.unit, r.professional_name, r.diagnosis, r.treatment, r.notes
            FROM medical_records r
            JOIN patients p ON p.id = r.patient_id
            WHERE {filter}
            ORDER BY r.id ASC
            "
        );

        let rows = conn
            .prepare(&sql)
            .and_then(|mut stmt| {
                let rows = stmt
                    .query_map([param], |row| {
                        Ok(RecordRow {
                            id: row.get(0)?,
                            date: row.get(1)?,
                            unit: row.get(2)?,
                            professional_name: row.get(3)?,
                            diagnosis: row.get(4)?,
                            treatment: row.get(5)?,
                            notes: row.get(6)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>();
                rows
            })
            .context(|| context.to_string())?;

        rows.into_iter().map(RecordRow::into_domain).collect()
    }

    /// Only `UNIQUE` violations are conflicts; NOT NULL and FOREIGN KEY
    /// failures are plain database errors.
    fn is_unique_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _) if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }
}

impl PatientRow {
    fn into_domain(self, records: Vec<MedicalRecord>) -> Result<Patient, StorageError> {
        let birth_date = NaiveDate::parse_from_str(&self.birth_date, DATE_FORMAT)
            .map_err(|e| StorageError::InvalidRow(format!("patient {}: {e}", self.id)))?;

        Patient::restore(
            Some(PatientId(self.id)),
            Some(self.name.as_str()),
            Some(self.cpf.as_str()),
            Some(birth_date),
            records,
        )
        .map_err(|e| StorageError::InvalidRow(format!("patient {}: {e}", self.id)))
    }
}

impl RecordRow {
    fn into_domain(self) -> Result<MedicalRecord, StorageError> {
        let date = parse_timestamp(&self.date)
            .map_err(|e| StorageError::InvalidRow(format!("medical record {}: {e}", self.id)))?;
        let fields = RecordFields {
            unit: Some(self.unit),
            professional_name: Some(self.professional_name),
            diagnosis: Some(self.diagnosis),
            treatment: Some(self.treatment),
            notes: Some(self.notes),
        };

        // Stored dates were checked against the clock when written.
        MedicalRecord::restore(
            Some(MedicalRecordId(self.id)),
            Some(date),
            &fields,
            DateTime::<Utc>::MAX_UTC,
        )
        .map_err(|e| StorageError::InvalidRow(format!("medical record {}: {e}", self.id)))
    }
}

impl TokenRow {
    fn into_domain(self) -> Result<ShareToken, StorageError> {
        let created_at = parse_timestamp(&self.created_at)
            .map_err(|e| StorageError::InvalidRow(format!("share token {}: {e}", self.id)))?;

        ShareToken::restore(
            Some(ShareTokenId(self.id)),
            Some(self.access_token.as_str()),
            Some(self.expires_in_minutes),
            Some(created_at),
            Some(PatientId(self.patient_id)),
        )
        .map_err(|e| StorageError::InvalidRow(format!("share token {}: {e}", self.id)))
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}

impl PatientGateway for SqliteStorage {
    type Error = StorageError;

    fn save(&self, patient: &Patient) -> Result<Patient, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");

        let inserted = conn.execute(
            "INSERT INTO patients (cpf, name, birth_date) VALUES (?1, ?2, ?3)",
            params![
                patient.cpf(),
                patient.name(),
                patient.birth_date().format(DATE_FORMAT).to_string(),
            ],
        );

        if let Err(e) = &inserted {
            if Self::is_unique_violation(e) {
                return Err(StorageError::Conflict(format!(
                    "Patient with cpf=[{}] already registered.",
                    patient.cpf()
                )));
            }
        }
        inserted.context(|| format!("Error saving patient with CPF=[{}].", patient.cpf()))?;

        let id = PatientId(conn.last_insert_rowid());
        tracing::debug!("Saved patient {} to storage", id);
        Ok(patient.clone().with_id(id))
    }

    fn find_by_cpf(&self, cpf: &str) -> Result<Option<Patient>, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");

        let row = conn
            .query_row(
                "SELECT id, name, cpf, birth_date FROM patients WHERE cpf = ?1",
                params![cpf],
                |row| {
                    Ok(PatientRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        cpf: row.get(2)?,
                        birth_date: row.get(3)?,
                    })
                },
            )
            .optional()
            .context(|| format!("Error finding patient with CPF=[{cpf}]."))?;

        match row {
            Some(row) => {
                let context = format!("Error finding medical records for cpf=[{cpf}].");
                let records = Self::load_records(&conn, "p.id = ?1", &row.id, &context)?;
                row.into_domain(records).map(Some)
            }
            None => Ok(None),
        }
    }
}

impl MedicalRecordGateway for SqliteStorage {
    type Error = StorageError;

    fn save(
        &self,
        record: &MedicalRecord,
        patient_id: PatientId,
    ) -> Result<MedicalRecord, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");
        Self::require_patient(&conn, patient_id)?;

        conn.execute(
            r"
            INSERT INTO medical_records (
                patient_id, date, unit, professional_name, diagnosis, treatment, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![
                patient_id.0,
                record.date().to_rfc3339(),
                record.unit(),
                record.professional_name(),
                record.diagnosis(),
                record.treatment(),
                record.notes(),
            ],
        )
        .context(|| format!("Error saving medical record for patientId=[{patient_id}]."))?;

        let id = MedicalRecordId(conn.last_insert_rowid());
        tracing::debug!("Saved medical record {} for patient {}", id.0, patient_id);
        Ok(record.clone().with_id(id))
    }

    fn find_by_patient_cpf(&self, cpf: &str) -> Result<Vec<MedicalRecord>, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");
        let context = format!("Error finding medical records for cpf=[{cpf}].");
        Self::load_records(&conn, "p.cpf = ?1", &cpf, &context)
    }

    fn find_by_patient_id(&self, patient_id: PatientId) -> Result<Vec<MedicalRecord>, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");
        let context = format!("Error finding medical records for patientId=[{patient_id}].");
        Self::load_records(&conn, "p.id = ?1", &patient_id.0, &context)
    }
}

impl ShareTokenGateway for SqliteStorage {
    type Error = StorageError;

    fn save(&self, token: &ShareToken, patient_id: PatientId) -> Result<ShareToken, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");
        Self::require_patient(&conn, patient_id)?;

        let inserted = conn.execute(
            r"
            INSERT INTO share_tokens (access_token, expires_in_minutes, created_at, patient_id)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![
                token.access_token(),
                token.expires_in_minutes(),
                token.created_at().to_rfc3339(),
                patient_id.0,
            ],
        );

        if let Err(e) = &inserted {
            if Self::is_unique_violation(e) {
                return Err(StorageError::Conflict(format!(
                    "Share token [{}] already registered.",
                    token.access_token()
                )));
            }
        }
        inserted.context(|| format!("Error saving token for patient_id=[{patient_id}]."))?;

        let id = ShareTokenId(conn.last_insert_rowid());
        tracing::debug!("Saved share token {} for patient {}", id.0, patient_id);

        // The stored row belongs to `patient_id`, whatever the token carried.
        ShareToken::restore(
            Some(id),
            Some(token.access_token()),
            Some(token.expires_in_minutes()),
            Some(token.created_at()),
            Some(patient_id),
        )
        .map_err(|e| StorageError::InvalidRow(format!("share token {}: {e}", id.0)))
    }

    fn find_by_access_token(&self, access_token: &str) -> Result<Option<ShareToken>, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");

        let row = conn
            .query_row(
                r"
                SELECT id, access_token, expires_in_minutes, created_at, patient_id
                FROM share_tokens
                WHERE access_token = ?1
                ",
                params![access_token],
                |row| {
                    Ok(TokenRow {
                        id: row.get(0)?,
                        access_token: row.get(1)?,
                        expires_in_minutes: row.get(2)?,
                        created_at: row.get(3)?,
                        patient_id: row.get(4)?,
                    })
                },
            )
            .optional()
            .context(|| format!("Error finding token=[{access_token}]."))?;

        row.map(TokenRow::into_domain).transpose()
    }
}
