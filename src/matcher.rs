use std::fmt::Write as _;

use serde::Serialize;

use crate::{
    embedding::Embedder,
    embedding_text::Query,
    error::{Error, Result},
    llm::LanguageModel,
    record::{Record, RecordKind},
    search::{SearchHit, SearchParams, execute_search},
    store::Repository,
};

/// Counterparts found for one record, with the model's write-up of them.
#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub source: Record,
    pub hits: Vec<SearchHit>,
    pub narrative: String,
}

/// Find the records of the opposite kind that best fit record `id`.
///
/// The source's stack, skills and description become a query against the
/// other collection. The hits, even when there are none, are handed to the
/// language model for a narrative. A failing model call fails the whole
/// match.
pub fn match_record(
    repo: &Repository,
    kind: RecordKind,
    id: u64,
    embedder: &mut dyn Embedder,
    llm: &dyn LanguageModel,
    params: &SearchParams,
) -> Result<MatchReport> {
    let source = repo.get_by_id(kind, id).ok_or_else(|| Error::NotFound {
        kind: kind.as_str(),
        name: id.to_string(),
    })?;

    let query = Query::reverse_of(source);
    let hits = execute_search(
        repo.collection(query.kind),
        &query,
        embedder,
        params,
    )?;
    tracing::info!(
        %kind,
        id,
        target = %query.kind,
        hits = hits.len(),
        "matched record"
    );

    let prompt = build_match_prompt(source, &hits);
    let narrative = llm.complete(&prompt)?;

    Ok(MatchReport {
        source: source.clone(),
        hits,
        narrative,
    })
}

/// Recruiter-style prompt describing the source and every hit.
pub fn build_match_prompt(source: &Record, hits: &[SearchHit]) -> String {
    let (source_label, result_label) = match source.kind {
        RecordKind::Candidate => ("candidate", "projects"),
        RecordKind::Project => ("project", "candidates"),
    };

    let mut prompt = format!(
        "You are an expert at finding suitable {result_label}. The \
         {source_label} \"{}\" has the stack: {}; and the skills: {}.\n\n",
        source.name, source.stack, source.skills
    );

    if hits.is_empty() {
        let _ = writeln!(
            prompt,
            "No suitable {result_label} were found. Say so briefly and \
             suggest what the {source_label} could add to their profile.",
        );
        return prompt;
    }

    let _ = writeln!(prompt, "Here are the matching {result_label}:");
    for hit in hits {
        let r = &hit.record;
        let _ = writeln!(prompt, "   {}. {}", hit.rank, r.name);
        let _ = writeln!(prompt, "   Stack: {}", r.stack);
        let _ = writeln!(prompt, "   Skills: {}", r.skills);
        let _ = writeln!(prompt, "   Description: {}", r.description);
        let _ = writeln!(prompt, "   Telephone: {}", r.telephone);
        let _ = writeln!(prompt, "   Email: {}", r.email);
        let _ = writeln!(prompt, "   Telegram: {}", r.telegram);
        let _ = writeln!(prompt, "   Similarity: {:.3}", hit.similarity);
    }

    let _ = write!(
        prompt,
        "\nWrite a short, friendly answer in this shape: \"For the \
         {source_label} {name} the following {result_label} fit:\n\
         1. [name] with the stack [stack]. [One or two sentences on why it \
         fits.]\nContacts: [contacts].\"\n\
         Continue the same way for every other entry in the list. Mention \
         the name, stack and skills of each entry and keep the explanation \
         brief. The reader is a neutral recruiter.",
        name = source.name,
    );
    prompt
}
