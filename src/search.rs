use serde::Serialize;

use crate::{
    embedding::Embedder,
    embedding_text::{Query, build_text},
    error::{Error, Result},
    record::Record,
    settings::{DEFAULT_THRESHOLD, DEFAULT_TOP_K},
    store::Collection,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    /// Maximum number of neighbours requested from the index.
    pub top_k: usize,
    /// Minimum cosine similarity a hit must reach to be kept.
    pub threshold: f32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// A record that passed the similarity threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// 1-based rank, best first.
    pub rank: usize,
    pub similarity: f32,
    pub record: Record,
}

/// Find the records of `collection` most similar to `query`.
///
/// 1. An empty collection yields no hits
/// 2. The query text is embedded
/// 3. The index returns up to `top_k` neighbours
/// 4. Neighbours below `threshold`, or pointing past the end of the records
///    (a stale index), are dropped
/// 5. The rest are ranked by similarity, highest first
pub fn execute_search(
    collection: &Collection,
    query: &Query,
    embedder: &mut dyn Embedder,
    params: &SearchParams,
) -> Result<Vec<SearchHit>> {
    if collection.is_empty() {
        return Ok(Vec::new());
    }

    let text = build_text(query);
    if text.is_empty() {
        return Err(Error::EmptyQuery);
    }

    let index = collection.index().ok_or(Error::IndexUnavailable {
        kind: collection.kind().collection_name(),
    })?;

    let vector = embedder.embed(&text)?;
    let neighbors = index.nearest(&vector, params.top_k)?;
    let returned = neighbors.len();

    let records = collection.records();
    let hits: Vec<SearchHit> = neighbors
        .into_iter()
        .filter(|n| n.similarity >= params.threshold)
        .filter_map(|n| {
            let record = records.get(n.position);
            if record.is_none() {
                tracing::warn!(
                    kind = %collection.kind(),
                    position = n.position,
                    "index points past the stored records; skipping"
                );
            }
            record.map(|r| (n.similarity, r.clone()))
        })
        .enumerate()
        .map(|(i, (similarity, record))| SearchHit {
            rank: i + 1,
            similarity,
            record,
        })
        .collect();

    tracing::debug!(
        kind = %collection.kind(),
        returned,
        kept = hits.len(),
        threshold = params.threshold,
        "search finished"
    );
    Ok(hits)
}

/// Format hits for human-readable terminal output.
pub fn format_human(hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("No results found.");
        return;
    }

    for hit in hits {
        println!(
            "{:>3}. [{:.3}] {} (#{})",
            hit.rank, hit.similarity, hit.record.name, hit.record.id
        );
        println!("     Stack: {}", hit.record.stack);
        println!("     Skills: {}", hit.record.skills);
    }
    println!("\n{} result(s)", hits.len());
}

/// Format hits as JSON output.
pub fn format_json(hits: &[SearchHit], query: &Query) -> Result<()> {
    let out = serde_json::json!({
        "kind": query.kind,
        "query": build_text(query),
        "result_count": hits.len(),
        "results": hits,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        record::RecordKind,
        testing::{VocabEmbedder, record},
        vector_index::VectorIndex,
    };

    fn query(kind: RecordKind, stack: &str, skills: &str) -> Query {
        Query {
            kind,
            stack: stack.to_string(),
            skills: skills.to_string(),
            description: String::new(),
        }
    }

    fn projects(embedder: &mut VocabEmbedder) -> Collection {
        let mut records = vec![
            record(RecordKind::Project, "Shop", "python django", "web"),
            record(RecordKind::Project, "Engine", "rust tokio", "async io"),
            record(RecordKind::Project, "Portal", "python flask", "web"),
        ];
        for (i, r) in records.iter_mut().enumerate() {
            r.id = i as u64 + 1;
        }
        let index = VectorIndex::build(&records, embedder).unwrap();
        Collection::from_parts(RecordKind::Project, records, Some(index))
    }

    #[test]
    fn empty_collection_returns_no_hits() {
        let collection =
            Collection::from_parts(RecordKind::Project, Vec::new(), None);
        let hits = execute_search(
            &collection,
            &query(RecordKind::Project, "rust", ""),
            &mut VocabEmbedder::default(),
            &SearchParams::default(),
        )
        .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn record_finds_itself_first() {
        let mut embedder = VocabEmbedder::default();
        let collection = projects(&mut embedder);

        for record in collection.records() {
            let q = Query {
                kind: RecordKind::Project,
                stack: record.stack.clone(),
                skills: record.skills.clone(),
                description: record.description.clone(),
            };
            let hits = execute_search(
                &collection,
                &q,
                &mut embedder,
                &SearchParams::default(),
            )
            .unwrap();
            assert_eq!(hits[0].record.id, record.id);
            assert!((hits[0].similarity - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn threshold_drops_weak_hits() {
        let mut embedder = VocabEmbedder::default();
        let collection = projects(&mut embedder);
        let q = query(RecordKind::Project, "python django", "web");

        let loose = SearchParams {
            top_k: 10,
            threshold: -1.0,
        };
        assert_eq!(
            execute_search(&collection, &q, &mut embedder, &loose)
                .unwrap()
                .len(),
            3
        );

        let strict = SearchParams {
            top_k: 10,
            threshold: 0.6,
        };
        let hits =
            execute_search(&collection, &q, &mut embedder, &strict).unwrap();
        assert!(hits.iter().all(|h| h.similarity >= 0.6));
        let names: Vec<_> = hits.iter().map(|h| h.record.name.as_str()).collect();
        assert_eq!(names, vec!["Shop", "Portal"]);
        assert_eq!(hits[0].rank, 1);
        assert_eq!(hits[1].rank, 2);
    }

    #[test]
    fn top_k_limits_hits() {
        let mut embedder = VocabEmbedder::default();
        let collection = projects(&mut embedder);
        let params = SearchParams {
            top_k: 1,
            threshold: -1.0,
        };

        let hits = execute_search(
            &collection,
            &query(RecordKind::Project, "python", "web"),
            &mut embedder,
            &params,
        )
        .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn stale_positions_are_skipped() {
        let mut embedder = VocabEmbedder::default();
        let full = projects(&mut embedder);
        // Index still holds three vectors but only two records remain.
        let records = full.records()[..2].to_vec();
        let collection = Collection::from_parts(
            RecordKind::Project,
            records,
            full.index().cloned(),
        );
        let params = SearchParams {
            top_k: 10,
            threshold: -1.0,
        };

        let hits = execute_search(
            &collection,
            &query(RecordKind::Project, "python flask", "web"),
            &mut embedder,
            &params,
        )
        .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.record.name != "Portal"));
    }

    #[test]
    fn empty_query_is_rejected() {
        let mut embedder = VocabEmbedder::default();
        let collection = projects(&mut embedder);
        let q = query(RecordKind::Project, "unknown", " ");

        assert!(matches!(
            execute_search(&collection, &q, &mut embedder, &SearchParams::default()),
            Err(Error::EmptyQuery)
        ));
    }

    #[test]
    fn missing_index_is_reported() {
        let records = vec![record(RecordKind::Project, "P", "rust", "cli")];
        let collection =
            Collection::from_parts(RecordKind::Project, records, None);

        assert!(matches!(
            execute_search(
                &collection,
                &query(RecordKind::Project, "rust", ""),
                &mut VocabEmbedder::default(),
                &SearchParams::default(),
            ),
            Err(Error::IndexUnavailable { kind: "projects" })
        ));
    }
}
