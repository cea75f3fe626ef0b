//! Command-line boundary.
//!
//! One subcommand per use case. Arguments are `--flag value` pairs; entity
//! fields that are omitted reach the core as `None` so the domain rules
//! report them. Responses are printed as JSON.
//!
//! Exit codes: `0` success, `1` rejected request (4xx), `2` internal failure
//! (5xx), `64` usage error.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::adapters::StorageError;
use crate::application::{
    AccessHistoryByToken, CreatePatient, GenerateToken, RegisterMedicalRecordByToken,
    SearchPatientHistory,
};
use crate::domain::RecordFields;
use crate::ports::{Clock, MedicalRecordGateway, PatientGateway, ShareTokenGateway};
use crate::presenter::{
    self, ErrorResponse, MedicalRecordResponse, PatientResponse, ShareTokenResponse,
};

pub const EXIT_OK: u8 = 0;
pub const EXIT_REJECTED: u8 = 1;
pub const EXIT_FAILURE: u8 = 2;
pub const EXIT_USAGE: u8 = 64;

/// Longest `--notes` value accepted by `register-record`, in characters.
pub const MAX_NOTES_CHARS: usize = 500;

pub const USAGE: &str = "\
Usage: medshare <command> [--flag value]...

Commands:
  create-patient    --name <name> --cpf <11 digits> --birth-date <YYYY-MM-DD>
  generate-token    --cpf <cpf> --expires-in-minutes <minutes>
  history           --cpf <cpf>
  history-by-token  --token <access token>
  register-record   --token <access token> --unit <unit> --professional-name <name>
                    --diagnosis <text> --treatment <text> --notes <text>
  help";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("missing command")]
    MissingCommand,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("unknown flag {flag} for {command}")]
    UnknownFlag { command: &'static str, flag: String },

    #[error("flag {0} expects a value")]
    MissingValue(String),

    #[error("missing required flag --{0}")]
    MissingFlag(&'static str),

    #[error("invalid value for --{flag}: {value}")]
    InvalidValue { flag: &'static str, value: String },

    #[error("--{flag} must be at most {max} characters")]
    TooLong { flag: &'static str, max: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreatePatient {
        name: Option<String>,
        cpf: Option<String>,
        birth_date: Option<NaiveDate>,
    },
    GenerateToken {
        cpf: String,
        expires_in_minutes: i64,
    },
    History {
        cpf: String,
    },
    HistoryByToken {
        token: String,
    },
    RegisterRecord {
        token: String,
        fields: RecordFields,
    },
    Help,
}

struct Flags {
    values: HashMap<String, String>,
}

impl Flags {
    fn parse<I>(command: &'static str, allowed: &[&str], args: I) -> Result<Self, UsageError>
    where
        I: Iterator<Item = String>,
    {
        let mut args = args;
        let mut values = HashMap::new();

        while let Some(arg) = args.next() {
            let Some(name) = arg.strip_prefix("--") else {
                return Err(UsageError::UnknownFlag {
                    command,
                    flag: arg.clone(),
                });
            };
            if !allowed.contains(&name) {
                return Err(UsageError::UnknownFlag {
                    command,
                    flag: arg.clone(),
                });
            }
            let value = args.next().ok_or_else(|| UsageError::MissingValue(arg.clone()))?;
            values.insert(name.to_string(), value);
        }

        Ok(Self { values })
    }

    fn optional(&mut self, name: &str) -> Option<String> {
        self.values.remove(name)
    }

    fn required(&mut self, name: &'static str) -> Result<String, UsageError> {
        self.optional(name).ok_or(UsageError::MissingFlag(name))
    }
}

/// Parse the arguments that follow the program name.
///
/// # Errors
/// Returns `UsageError` for unknown commands or flags, flags without a value,
/// missing lookup keys and values that cannot be parsed.
pub fn parse_args<I>(args: I) -> Result<Command, UsageError>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let command = args.next().ok_or(UsageError::MissingCommand)?;

    match command.as_str() {
        "create-patient" => {
            let mut flags = Flags::parse("create-patient", &["name", "cpf", "birth-date"], args)?;
            let birth_date = flags
                .optional("birth-date")
                .map(|value| {
                    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| {
                        UsageError::InvalidValue {
                            flag: "birth-date",
                            value,
                        }
                    })
                })
                .transpose()?;
            Ok(Command::CreatePatient {
                name: flags.optional("name"),
                cpf: flags.optional("cpf"),
                birth_date,
            })
        }
        "generate-token" => {
            let mut flags =
                Flags::parse("generate-token", &["cpf", "expires-in-minutes"], args)?;
            let cpf = flags.required("cpf")?;
            let raw = flags.required("expires-in-minutes")?;
            let expires_in_minutes = raw.trim().parse::<i64>().map_err(|_| {
                UsageError::InvalidValue {
                    flag: "expires-in-minutes",
                    value: raw.clone(),
                }
            })?;
            Ok(Command::GenerateToken {
                cpf,
                expires_in_minutes,
            })
        }
        "history" => {
            let mut flags = Flags::parse("history", &["cpf"], args)?;
            Ok(Command::History {
                cpf: flags.required("cpf")?,
            })
        }
        "history-by-token" => {
            let mut flags = Flags::parse("history-by-token", &["token"], args)?;
            Ok(Command::HistoryByToken {
                token: flags.required("token")?,
            })
        }
        "register-record" => {
            let mut flags = Flags::parse(
                "register-record",
                &[
                    "token",
                    "unit",
                    "professional-name",
                    "diagnosis",
                    "treatment",
                    "notes",
                ],
                args,
            )?;
            let token = flags.required("token")?;
            let notes = flags.optional("notes");
            if notes
                .as_ref()
                .is_some_and(|notes| notes.chars().count() > MAX_NOTES_CHARS)
            {
                return Err(UsageError::TooLong {
                    flag: "notes",
                    max: MAX_NOTES_CHARS,
                });
            }
            let fields = RecordFields {
                unit: flags.optional("unit"),
                professional_name: flags.optional("professional-name"),
                diagnosis: flags.optional("diagnosis"),
                treatment: flags.optional("treatment"),
                notes,
            };
            Ok(Command::RegisterRecord { token, fields })
        }
        "help" | "-h" | "--help" => Ok(Command::Help),
        _ => Err(UsageError::UnknownCommand(command.clone())),
    }
}

/// Composition root: every use case wired to one storage and one clock.
pub struct App<S, C>
where
    S: PatientGateway + MedicalRecordGateway + ShareTokenGateway,
    C: Clock,
{
    create_patient: CreatePatient<S>,
    generate_token: GenerateToken<S, S, C>,
    search_history: SearchPatientHistory<S, S>,
    access_history: AccessHistoryByToken<S, S, C>,
    register_record: RegisterMedicalRecordByToken<S, S, C>,
}

impl<S, C> App<S, C>
where
    S: PatientGateway<Error = StorageError>
        + MedicalRecordGateway<Error = StorageError>
        + ShareTokenGateway<Error = StorageError>,
    C: Clock,
{
    pub fn new(storage: Arc<S>, clock: Arc<C>) -> Self {
        Self {
            create_patient: CreatePatient::new(Arc::clone(&storage)),
            generate_token: GenerateToken::new(
                Arc::clone(&storage),
                Arc::clone(&storage),
                Arc::clone(&clock),
            ),
            search_history: SearchPatientHistory::new(Arc::clone(&storage), Arc::clone(&storage)),
            access_history: AccessHistoryByToken::new(
                Arc::clone(&storage),
                Arc::clone(&storage),
                Arc::clone(&clock),
            ),
            register_record: RegisterMedicalRecordByToken::new(
                Arc::clone(&storage),
                storage,
                clock,
            ),
        }
    }

    /// Run one command and render its response body.
    ///
    /// # Errors
    /// Propagates the use case failure unchanged.
    pub fn dispatch(&self, command: &Command) -> crate::Result<String> {
        match command {
            Command::CreatePatient {
                name,
                cpf,
                birth_date,
            } => {
                let patient =
                    self.create_patient
                        .execute(name.as_deref(), cpf.as_deref(), *birth_date)?;
                render(&PatientResponse::from(&patient))
            }
            Command::GenerateToken {
                cpf,
                expires_in_minutes,
            } => {
                let token = self.generate_token.execute(cpf, *expires_in_minutes)?;
                render(&ShareTokenResponse::from(&token))
            }
            Command::History { cpf } => {
                let records = self.search_history.execute(cpf)?;
                render(&presenter::history(&records))
            }
            Command::HistoryByToken { token } => {
                let records = self.access_history.execute(token)?;
                render(&presenter::history(&records))
            }
            Command::RegisterRecord { token, fields } => {
                let record = self.register_record.execute(token, fields)?;
                render(&MedicalRecordResponse::from(&record))
            }
            Command::Help => Ok(USAGE.to_string()),
        }
    }

    /// Dispatch `command`, write the outcome and return the process exit code.
    pub fn run(&self, command: &Command, out: &mut impl Write, err: &mut impl Write) -> u8 {
        match self.dispatch(command) {
            Ok(body) => {
                if writeln!(out, "{body}").is_err() {
                    return EXIT_FAILURE;
                }
                EXIT_OK
            }
            Err(e) => {
                let response = ErrorResponse::from(&e);
                if response.status >= 500 {
                    tracing::error!("Command failed: {}", e);
                } else {
                    tracing::info!(code = response.error, "Command rejected");
                }
                let body = render(&response).unwrap_or_else(|_| response.message.clone());
                let _ = writeln!(err, "{body}");
                if response.status >= 500 {
                    EXIT_FAILURE
                } else {
                    EXIT_REJECTED
                }
            }
        }
    }
}

fn render<T: Serialize + ?Sized>(body: &T) -> crate::Result<String> {
    Ok(serde_json::to_string_pretty(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{FixedClock, InMemoryStorage};
    use chrono::{Duration, TimeZone, Utc};

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    fn app() -> (App<InMemoryStorage, FixedClock>, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 5, 10, 14, 0, 0).unwrap(),
        ));
        (App::new(Arc::new(InMemoryStorage::new()), Arc::clone(&clock)), clock)
    }

    fn run(app: &App<InMemoryStorage, FixedClock>, list: &[&str]) -> (u8, String, String) {
        let command = parse_args(args(list)).expect("Should parse");
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = app.run(&command, &mut out, &mut err);
        (
            code,
            String::from_utf8(out).expect("Should be utf8"),
            String::from_utf8(err).expect("Should be utf8"),
        )
    }

    fn json(text: &str) -> serde_json::Value {
        serde_json::from_str(text).expect("Should be json")
    }

    #[test]
    fn test_parse_create_patient() {
        let command = parse_args(args(&[
            "create-patient",
            "--name",
            "John Doe",
            "--cpf",
            "12345678900",
            "--birth-date",
            "1990-01-01",
        ]))
        .expect("Should parse");
        assert_eq!(
            command,
            Command::CreatePatient {
                name: Some("John Doe".to_string()),
                cpf: Some("12345678900".to_string()),
                birth_date: NaiveDate::from_ymd_opt(1990, 1, 1),
            }
        );
    }

    #[test]
    fn test_parse_omitted_entity_flags_are_none() {
        let command = parse_args(args(&["register-record", "--token", "t"])).expect("Should parse");
        assert_eq!(
            command,
            Command::RegisterRecord {
                token: "t".to_string(),
                fields: RecordFields::default(),
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_args(args(&[])), Err(UsageError::MissingCommand));
        assert_eq!(
            parse_args(args(&["delete-patient"])),
            Err(UsageError::UnknownCommand("delete-patient".to_string()))
        );
        assert_eq!(
            parse_args(args(&["history"])),
            Err(UsageError::MissingFlag("cpf"))
        );
        assert_eq!(
            parse_args(args(&["history", "--cpf"])),
            Err(UsageError::MissingValue("--cpf".to_string()))
        );
        assert!(matches!(
            parse_args(args(&["history", "--token", "x"])),
            Err(UsageError::UnknownFlag { .. })
        ));
        assert!(matches!(
            parse_args(args(&["generate-token", "--cpf", "1", "--expires-in-minutes", "soon"])),
            Err(UsageError::InvalidValue { flag: "expires-in-minutes", .. })
        ));
        assert!(matches!(
            parse_args(args(&["create-patient", "--birth-date", "01/01/1990"])),
            Err(UsageError::InvalidValue { flag: "birth-date", .. })
        ));
    }

    #[test]
    fn test_parse_notes_length_cap() {
        let register = |notes: &str| {
            parse_args(args(&["register-record", "--token", "t", "--notes", notes]))
        };

        let at_limit = "ç".repeat(MAX_NOTES_CHARS);
        match register(&at_limit).expect("Should parse") {
            Command::RegisterRecord { fields, .. } => {
                assert_eq!(fields.notes.as_deref(), Some(at_limit.as_str()));
            }
            other => panic!("unexpected command {other:?}"),
        }

        let err = register(&"n".repeat(MAX_NOTES_CHARS + 1)).expect_err("Should fail");
        assert_eq!(
            err,
            UsageError::TooLong {
                flag: "notes",
                max: MAX_NOTES_CHARS
            }
        );
        assert_eq!(err.to_string(), "--notes must be at most 500 characters");
    }

    #[test]
    fn test_full_sharing_flow() {
        let (app, clock) = app();

        let (code, out, _) = run(
            &app,
            &[
                "create-patient",
                "--name",
                "Maria",
                "--cpf",
                "12345678900",
                "--birth-date",
                "1980-02-03",
            ],
        );
        assert_eq!(code, EXIT_OK);
        assert_eq!(json(&out)["birthDate"], "1980-02-03");

        let (code, out, _) = run(
            &app,
            &["generate-token", "--cpf", "12345678900", "--expires-in-minutes", "30"],
        );
        assert_eq!(code, EXIT_OK);
        let token_body = json(&out);
        assert_eq!(token_body["expiresAt"], "2024-05-10T14:30:00Z");
        let token = token_body["accessToken"]
            .as_str()
            .expect("Should carry token")
            .to_string();

        let (code, out, _) = run(
            &app,
            &[
                "register-record",
                "--token",
                token.as_str(),
                "--unit",
                "UBS",
                "--professional-name",
                "Dr. A",
                "--diagnosis",
                "Gripe",
                "--treatment",
                "Repouso",
                "--notes",
                "Nada",
            ],
        );
        assert_eq!(code, EXIT_OK);
        assert_eq!(json(&out)["date"], "2024-05-10T14:00:00Z");

        let (code, out, _) = run(&app, &["history", "--cpf", "12345678900"]);
        assert_eq!(code, EXIT_OK);
        assert_eq!(json(&out).as_array().map(Vec::len), Some(1));

        clock.advance(Duration::minutes(30));
        let (code, out, err) = run(&app, &["history-by-token", "--token", token.as_str()]);
        assert_eq!(code, EXIT_REJECTED);
        assert!(out.is_empty());
        assert_eq!(json(&err)["error"], "share_token_expired");
        assert_eq!(json(&err)["status"], 400);
    }

    #[test]
    fn test_rejections_map_to_error_body() {
        let (app, _) = app();

        let (code, _, err) = run(&app, &["create-patient", "--cpf", "abc"]);
        assert_eq!(code, EXIT_REJECTED);
        let body = json(&err);
        assert_eq!(body["error"], "domain_exception");
        assert_eq!(
            body["message"],
            "Field=[name] should not be empty or null by domain client, \
             The field=[cpf] has an invalid pattern by domain client, \
             Field=[birthDate] should not be empty or null by domain client"
        );

        let (code, _, err) = run(&app, &["history", "--cpf", "00000000000"]);
        assert_eq!(code, EXIT_REJECTED);
        assert_eq!(json(&err)["status"], 404);
    }

    #[test]
    fn test_help() {
        let (app, _) = app();
        let (code, out, _) = run(&app, &["help"]);
        assert_eq!(code, EXIT_OK);
        assert!(out.starts_with("Usage: medshare"));
    }
}
