use std::{
    fmt,
    str::FromStr,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Placeholder stored in every text field that has no real content.
pub const UNKNOWN: &str = "unknown";

/// Lower-cased spellings accepted for each kind at ingestion.
const CANDIDATE_SYNONYMS: &[&str] =
    &["candidate", "kandidate", "программист", "кандидат"];
const PROJECT_SYNONYMS: &[&str] = &["project", "проект"];

/// The collection a record belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum RecordKind {
    Candidate,
    Project,
}

impl RecordKind {
    pub const ALL: [RecordKind; 2] = [RecordKind::Candidate, RecordKind::Project];

    /// Resolve a type string, accepting the known synonyms.
    ///
    /// # Examples
    ///
    /// ```
    /// use staffmatch::RecordKind;
    ///
    /// assert_eq!(RecordKind::parse(" Проект ").unwrap(), RecordKind::Project);
    /// assert!(RecordKind::parse("manager").is_err());
    /// ```
    pub fn parse(value: &str) -> Result<Self> {
        let normalized = value.trim().to_lowercase();
        if CANDIDATE_SYNONYMS.contains(&normalized.as_str()) {
            Ok(RecordKind::Candidate)
        } else if PROJECT_SYNONYMS.contains(&normalized.as_str()) {
            Ok(RecordKind::Project)
        } else {
            Err(Error::InvalidType(value.to_string()))
        }
    }

    /// The kind searched when matching a record of this kind.
    pub fn reverse(self) -> Self {
        match self {
            RecordKind::Candidate => RecordKind::Project,
            RecordKind::Project => RecordKind::Candidate,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Candidate => "candidate",
            RecordKind::Project => "project",
        }
    }

    pub fn collection_name(self) -> &'static str {
        match self {
            RecordKind::Candidate => "candidates",
            RecordKind::Project => "projects",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RecordKind {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

/// A candidate or project.
///
/// An `id` of 0 means "not assigned yet"; the store assigns one on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    #[serde(default = "unknown")]
    pub name: String,
    #[serde(default = "unknown")]
    pub description: String,
    #[serde(default = "unknown")]
    pub stack: String,
    #[serde(default = "unknown", alias = "skils")]
    pub skills: String,
    #[serde(default = "unknown")]
    pub telephone: String,
    #[serde(default = "unknown")]
    pub email: String,
    #[serde(default = "unknown")]
    pub telegram: String,
}

impl Record {
    /// A record of the given kind with every text field set to [`UNKNOWN`].
    pub fn new(kind: RecordKind) -> Self {
        Self {
            id: 0,
            kind,
            name: unknown(),
            description: unknown(),
            stack: unknown(),
            skills: unknown(),
            telephone: unknown(),
            email: unknown(),
            telegram: unknown(),
        }
    }

    /// Build a record from loosely structured JSON, such as a language
    /// model's reply or a hand-written file.
    ///
    /// Keys are matched case-insensitively (the first non-empty value wins
    /// when several spellings collapse to one key), `skils` is read as
    /// `skills`, and absent or empty fields become [`UNKNOWN`]. When `kind`
    /// is given it overrides any `type` field in the value.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::json;
    /// use staffmatch::{Record, RecordKind};
    ///
    /// let value = json!({"Type": "kandidate", "Name": "Ann", "skils": "SQL"});
    /// let record = Record::from_value(&value, None).unwrap();
    /// assert_eq!(record.kind, RecordKind::Candidate);
    /// assert_eq!(record.skills, "SQL");
    /// assert_eq!(record.email, "unknown");
    /// ```
    pub fn from_value(
        value: &Value,
        kind: Option<RecordKind>,
    ) -> Result<Self> {
        let Value::Object(object) = value else {
            return Err(Error::Extraction(
                "expected a JSON object".to_string(),
            ));
        };
        let fields = lowercase_fields(object);
        let text = |key: &str| {
            fields
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(unknown)
        };

        let kind = match kind {
            Some(kind) => kind,
            None => RecordKind::parse(
                fields
                    .iter()
                    .find(|(k, _)| k == "type")
                    .map_or("", |(_, v)| v.as_str()),
            )?,
        };

        let id = fields
            .iter()
            .find(|(k, _)| k == "id")
            .and_then(|(_, v)| v.parse::<u64>().ok())
            .unwrap_or(0);

        Ok(Self {
            id,
            kind,
            name: text("name"),
            description: text("description"),
            stack: text("stack"),
            skills: text("skills"),
            telephone: text("telephone"),
            email: text("email"),
            telegram: text("telegram"),
        })
    }

    /// Replace blank text fields with [`UNKNOWN`].
    pub fn normalize(&mut self) {
        for field in [
            &mut self.name,
            &mut self.description,
            &mut self.stack,
            &mut self.skills,
            &mut self.telephone,
            &mut self.email,
            &mut self.telegram,
        ] {
            if field.trim().is_empty() {
                *field = unknown();
            }
        }
    }
}

/// True when a field carries no real content.
pub fn is_unknown(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(UNKNOWN)
}

/// Milliseconds since the Unix epoch, used as the id of new records.
///
/// Two records created within the same millisecond receive the same id.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Flatten an object into `(lower-cased key, text)` pairs in first-seen
/// key order, keeping the first non-empty text per key.
fn lowercase_fields(object: &Map<String, Value>) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = Vec::new();
    for (key, value) in object {
        let mut key = key.trim().to_lowercase();
        if key == "skils" {
            key = "skills".to_string();
        }
        let text = value_text(value);
        match fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => {
                if existing.is_empty() && !text.is_empty() {
                    *existing = text;
                }
            }
            None => fields.push((key, text)),
        }
    }
    fields
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null | Value::Object(_) => String::new(),
    }
}
