use serde_json::Value;

use crate::{
    embedding::Embedder,
    error::{Error, Result},
    llm::LanguageModel,
    record::{Record, RecordKind},
    store::{Applied, Repository},
    walker::{SourceFile, SourceFormat},
};

/// Prompt asking the model to turn free text into one JSON record.
pub fn build_extraction_prompt(text: &str) -> String {
    format!(
        "Analyse the text below.\n\
         Extract the information and return strictly one JSON object with \
         exactly these lower-case keys:\n  \
         \"name\", \"description\", \"stack\", \"skills\", \"telephone\", \
         \"email\", \"telegram\".\n\n\
         Rules:\n\
         1. \"stack\", \"skills\" and \"description\" hold dry technical \
         information only.\n   \
         - \"description\": a short but complete summary of the project or \
         of the person's experience, focused on technology, including \
         years, main duties and goals.\n   \
         - \"stack\": every technology and tool used by the project or \
         known by the candidate.\n   \
         - \"skills\": the technical skills and competences relevant to the \
         project or candidate.\n\
         2. \"name\" is the project's title when the text describes a \
         project, and the person's name when it describes a candidate.\n\
         3. \"telephone\", \"email\" and \"telegram\" hold the given contact \
         details, or null when there are none.\n\
         4. Return the JSON only, without explanations or any other text.\n\n\
         Text to analyse:\n{text}"
    )
}

/// Parse a model reply as JSON.
///
/// Replies often wrap the object in prose or code fences; when the whole
/// reply is not valid JSON, the span from the first `{` to the last `}` is
/// tried instead.
pub fn parse_response(response: &str) -> Result<Value> {
    if let Ok(value) = serde_json::from_str(response.trim()) {
        return Ok(value);
    }

    let (Some(start), Some(end)) = (response.find('{'), response.rfind('}'))
    else {
        return Err(Error::Extraction(
            "reply contains no JSON object".to_string(),
        ));
    };
    if end <= start {
        return Err(Error::Extraction(
            "reply contains no JSON object".to_string(),
        ));
    }

    serde_json::from_str(&response[start..=end]).map_err(|e| {
        Error::Extraction(format!("reply contains malformed JSON: {e}"))
    })
}

/// Turn unstructured text into a record of `kind` with the language model.
pub fn extract_record(
    text: &str,
    kind: RecordKind,
    llm: &dyn LanguageModel,
) -> Result<Record> {
    if text.trim().is_empty() {
        return Err(Error::Extraction("source text is empty".to_string()));
    }

    let response = llm.complete(&build_extraction_prompt(text))?;
    let value = parse_response(&response)?;
    let record = Record::from_value(&value, Some(kind))?;
    tracing::debug!(?record, "extracted record");
    Ok(record)
}

/// Read records from JSON text holding one object or an array of objects.
///
/// `kind` overrides the `type` of every record when given.
pub fn records_from_json(
    text: &str,
    kind: Option<RecordKind>,
) -> Result<Vec<Record>> {
    let value: Value = serde_json::from_str(text)?;
    match &value {
        Value::Array(items) => items
            .iter()
            .map(|item| Record::from_value(item, kind))
            .collect(),
        _ => Ok(vec![Record::from_value(&value, kind)?]),
    }
}

/// Ingest one file into the collection of `kind`.
///
/// Text files go through [`extract_record`]; JSON files are read with
/// [`records_from_json`]. Records are added one at a time, so a failure
/// part-way through a JSON array keeps the records added before it.
pub fn ingest_file(
    repo: &mut Repository,
    source: &SourceFile,
    kind: RecordKind,
    embedder: &mut dyn Embedder,
    llm: &dyn LanguageModel,
) -> Result<Vec<Applied<u64>>> {
    let text = std::fs::read_to_string(&source.absolute_path)?;
    let records = match source.format {
        SourceFormat::Text => vec![extract_record(&text, kind, llm)?],
        SourceFormat::Json => records_from_json(&text, Some(kind))?,
    };

    let mut applied = Vec::with_capacity(records.len());
    for record in records {
        applied.push(repo.add(record, embedder)?);
    }
    tracing::info!(
        path = %source.relative_path.display(),
        %kind,
        added = applied.len(),
        "ingested file"
    );
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;
    use crate::{
        storage::Storage,
        testing::{FailingModel, ScriptedModel, VocabEmbedder},
    };

    const REPLY: &str = r#"{"Name": "Ann", "stack": "Python, FastAPI",
        "skils": "REST APIs", "description": "", "telephone": null,
        "email": "ann@example.com", "telegram": "@ann"}"#;

    fn tick() -> u64 {
        static NEXT: AtomicU64 = AtomicU64::new(9_000);
        NEXT.fetch_add(1, Ordering::Relaxed)
    }

    fn open_repo(tmp: &tempfile::TempDir) -> Repository {
        let dir = tmp.path().join("data");
        std::fs::create_dir_all(&dir).unwrap();
        Repository::open(Storage::new(dir)).unwrap().with_clock(tick)
    }

    #[test]
    fn prompt_embeds_source_text() {
        let prompt = build_extraction_prompt("Ann knows Rust.");
        assert!(prompt.ends_with("Ann knows Rust."));
        assert!(prompt.contains("\"telegram\""));
    }

    #[test]
    fn parses_plain_json() {
        let value = parse_response(r#"{"name": "Ann"}"#).unwrap();
        assert_eq!(value["name"], "Ann");
    }

    #[test]
    fn parses_json_wrapped_in_prose() {
        let reply = "Sure! Here it is:\n```json\n{\"name\": \"Ann\", \
                     \"meta\": {\"x\": 1}}\n```\nAnything else?";
        let value = parse_response(reply).unwrap();
        assert_eq!(value["name"], "Ann");
        assert_eq!(value["meta"]["x"], 1);
    }

    #[test]
    fn rejects_replies_without_json() {
        for reply in ["no json here", "} backwards {", "{broken"] {
            assert!(
                matches!(parse_response(reply), Err(Error::Extraction(_))),
                "{reply:?} should be rejected"
            );
        }
    }

    #[test]
    fn extracts_and_normalises_record() {
        let llm = ScriptedModel(REPLY.to_string());
        let record =
            extract_record("Ann, Python dev", RecordKind::Candidate, &llm)
                .unwrap();

        assert_eq!(record.kind, RecordKind::Candidate);
        assert_eq!(record.id, 0);
        assert_eq!(record.name, "Ann");
        assert_eq!(record.skills, "REST APIs");
        assert_eq!(record.description, "unknown");
        assert_eq!(record.telephone, "unknown");
        assert_eq!(record.telegram, "@ann");
    }

    #[test]
    fn empty_text_is_not_sent() {
        let err = extract_record("  \n", RecordKind::Project, &FailingModel)
            .unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }

    #[test]
    fn model_failure_propagates() {
        let err = extract_record("text", RecordKind::Project, &FailingModel)
            .unwrap_err();
        assert!(matches!(err, Error::Collaborator(_)));
    }

    #[test]
    fn json_object_or_array() {
        let one = records_from_json(
            r#"{"type": "проект", "name": "Shop", "stack": "Go"}"#,
            None,
        )
        .unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].kind, RecordKind::Project);

        let many = records_from_json(
            r#"[{"name": "A", "stack": "Rust"}, {"name": "B", "stack": "Go"}]"#,
            Some(RecordKind::Candidate),
        )
        .unwrap();
        assert_eq!(many.len(), 2);
        assert!(many.iter().all(|r| r.kind == RecordKind::Candidate));

        assert!(records_from_json("[1, 2]", None).is_err());
        assert!(records_from_json(r#"{"name": "no type"}"#, None).is_err());
    }

    #[test]
    fn ingest_text_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("ann.md");
        std::fs::write(&path, "Ann is a Python developer.").unwrap();
        let source = SourceFile::from_path(&path).unwrap();
        let mut repo = open_repo(&tmp);

        let applied = ingest_file(
            &mut repo,
            &source,
            RecordKind::Candidate,
            &mut VocabEmbedder::default(),
            &ScriptedModel(REPLY.to_string()),
        )
        .unwrap();

        assert_eq!(applied.len(), 1);
        assert!(applied[0].is_persisted());
        let stored = repo
            .get_by_id(RecordKind::Candidate, applied[0].value)
            .unwrap();
        assert_eq!(stored.name, "Ann");
    }

    #[test]
    fn ingest_json_file_uses_given_kind() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("projects.json");
        std::fs::write(
            &path,
            r#"[{"id": 11, "type": "candidate", "name": "P1", "stack": "Go"},
                {"id": 12, "name": "P2", "stack": "Rust"}]"#,
        )
        .unwrap();
        let source = SourceFile::from_path(&path).unwrap();
        let mut repo = open_repo(&tmp);

        let applied = ingest_file(
            &mut repo,
            &source,
            RecordKind::Project,
            &mut VocabEmbedder::default(),
            &FailingModel,
        )
        .unwrap();

        let ids: Vec<u64> = applied.iter().map(|a| a.value).collect();
        assert_eq!(ids, vec![11, 12]);
        assert_eq!(repo.list_all(RecordKind::Project).len(), 2);
        assert!(repo.list_all(RecordKind::Candidate).is_empty());
    }
}
