//! Patient registration data.
//!
//! A patient is identified by its CPF (Brazilian taxpayer number, 11 digits).
//! CPF uniqueness is a storage concern; the entity only checks its format.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::medical_record::MedicalRecord;
use super::validation::{
    ensure, is_absent, is_blank, is_invalid_cpf, DomainError, Rule, BLANK_MESSAGE,
    PATTERN_MESSAGE,
};

const DOMAIN_LABEL: &str = "by domain client";

/// Storage-assigned patient identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(pub i64);

impl std::fmt::Display for PatientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered (or about to be registered) patient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patient {
    id: Option<PatientId>,
    name: String,
    cpf: String,
    birth_date: NaiveDate,
    medical_records: Vec<MedicalRecord>,
}

impl Patient {
    /// Build a new, unsaved patient.
    ///
    /// # Errors
    /// Returns `DomainError` listing every violated field rule.
    pub fn create(
        name: Option<&str>,
        cpf: Option<&str>,
        birth_date: Option<NaiveDate>,
    ) -> Result<Self, DomainError> {
        Self::restore(None, name, cpf, birth_date, Vec::new())
    }

    /// Rehydrate a persisted patient, re-checking the same rules as [`Patient::create`].
    ///
    /// # Errors
    /// Returns `DomainError` listing every violated field rule.
    pub fn restore(
        id: Option<PatientId>,
        name: Option<&str>,
        cpf: Option<&str>,
        birth_date: Option<NaiveDate>,
        medical_records: Vec<MedicalRecord>,
    ) -> Result<Self, DomainError> {
        validate_domain(name, cpf, birth_date.as_ref())?;

        let (Some(name), Some(cpf), Some(birth_date)) = (name, cpf, birth_date) else {
            unreachable!("rule table rejects absent patient fields");
        };

        Ok(Self {
            id,
            name: name.to_string(),
            cpf: cpf.to_string(),
            birth_date,
            medical_records,
        })
    }

    /// Attach the storage-assigned id.
    #[must_use]
    pub fn with_id(mut self, id: PatientId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn with_medical_records(mut self, medical_records: Vec<MedicalRecord>) -> Self {
        self.medical_records = medical_records;
        self
    }

    #[must_use]
    pub fn id(&self) -> Option<PatientId> {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn cpf(&self) -> &str {
        &self.cpf
    }

    #[must_use]
    pub fn birth_date(&self) -> NaiveDate {
        self.birth_date
    }

    /// Records loaded alongside the patient, in storage order.
    #[must_use]
    pub fn medical_records(&self) -> &[MedicalRecord] {
        &self.medical_records
    }
}

fn validate_domain(
    name: Option<&str>,
    cpf: Option<&str>,
    birth_date: Option<&NaiveDate>,
) -> Result<(), DomainError> {
    let name_rule = Rule::new(name, BLANK_MESSAGE, "name").when(is_blank);
    let cpf_blank = Rule::new(cpf, BLANK_MESSAGE, "cpf").when(is_blank);
    let cpf_pattern = Rule::new(cpf, PATTERN_MESSAGE, "cpf").when(is_invalid_cpf);
    let birth_rule =
        Rule::new(birth_date, BLANK_MESSAGE, "birthDate").when(is_absent::<NaiveDate>);

    ensure(&[&name_rule, &cpf_blank, &cpf_pattern, &birth_rule], DOMAIN_LABEL)
}
