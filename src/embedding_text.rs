use crate::record::{Record, RecordKind, is_unknown};

/// The fields that make up a record's searchable text.
pub trait Searchable {
    fn stack(&self) -> &str;
    fn skills(&self) -> &str;
    fn description(&self) -> &str;
}

impl Searchable for Record {
    fn stack(&self) -> &str {
        &self.stack
    }

    fn skills(&self) -> &str {
        &self.skills
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// A search request against one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// The collection to search.
    pub kind: RecordKind,
    pub stack: String,
    pub skills: String,
    pub description: String,
}

impl Query {
    /// A query for records of the opposite kind, built from `record`'s
    /// searchable fields.
    pub fn reverse_of(record: &Record) -> Self {
        Self {
            kind: record.kind.reverse(),
            stack: record.stack.clone(),
            skills: record.skills.clone(),
            description: record.description.clone(),
        }
    }
}

impl Searchable for Query {
    fn stack(&self) -> &str {
        &self.stack
    }

    fn skills(&self) -> &str {
        &self.skills
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Project the searchable fields into the text that gets embedded.
///
/// `stack`, `skills` and `description` are joined by single spaces in that
/// order and the result is trimmed. A blank or `unknown` field contributes
/// an empty segment. Records with identical fields always produce the same
/// text, so rebuilding an index reproduces their vectors.
///
/// # Examples
///
/// ```
/// use staffmatch::{Record, RecordKind, embedding_text::build_text};
///
/// let mut record = Record::new(RecordKind::Candidate);
/// record.stack = "Rust".to_string();
/// record.description = "Backend developer".to_string();
/// assert_eq!(build_text(&record), "Rust  Backend developer");
/// ```
pub fn build_text(item: &impl Searchable) -> String {
    let segment = |value: &str| {
        if is_unknown(value) {
            String::new()
        } else {
            value.trim().to_string()
        }
    };

    format!(
        "{} {} {}",
        segment(item.stack()),
        segment(item.skills()),
        segment(item.description())
    )
    .trim()
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(stack: &str, skills: &str, description: &str) -> Record {
        let mut record = Record::new(RecordKind::Candidate);
        record.stack = stack.to_string();
        record.skills = skills.to_string();
        record.description = description.to_string();
        record
    }

    #[test]
    fn fields_joined_in_fixed_order() {
        let record = candidate("Python, FastAPI", "backend APIs", "5 years");
        assert_eq!(build_text(&record), "Python, FastAPI backend APIs 5 years");
    }

    #[test]
    fn unknown_fields_are_empty_segments() {
        let record = candidate("unknown", "SQL", "unknown");
        assert_eq!(build_text(&record), "SQL");
    }

    #[test]
    fn all_unknown_is_empty() {
        let record = Record::new(RecordKind::Project);
        assert!(build_text(&record).is_empty());
    }

    #[test]
    fn deterministic_for_equal_content() {
        let a = candidate("Go", "gRPC", "infra");
        let mut b = a.clone();
        b.name = "Someone else".to_string();
        b.id = 99;
        assert_eq!(build_text(&a), build_text(&b));
    }

    #[test]
    fn reverse_query_targets_opposite_kind() {
        let record = candidate("Go", "gRPC", "infra");
        let query = Query::reverse_of(&record);
        assert_eq!(query.kind, RecordKind::Project);
        assert_eq!(build_text(&query), build_text(&record));
    }
}
