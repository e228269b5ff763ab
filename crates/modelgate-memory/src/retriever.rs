// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sanitized full-text retrieval over stored memories.
//!
//! Arbitrary query strings never reach FTS5 raw: the sanitizer strips
//! markup and reserved punctuation, escapes embedded quotes, and wraps
//! the residue as a phrase match unless the caller spelled out FTS
//! boolean operators. Decay factors are recomputed on read.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use modelgate_core::GatewayError;

use crate::store::{MemoryFilter, MemoryStore};
use crate::types::{decay_factor, MemoryRecord};

/// Retrieves memories for prompt augmentation.
pub struct MemoryRetriever {
    store: Arc<MemoryStore>,
    half_life_days: f64,
}

impl MemoryRetriever {
    /// Create a retriever over the given store.
    pub fn new(store: Arc<MemoryStore>, half_life_days: f64) -> Self {
        Self {
            store,
            half_life_days,
        }
    }

    /// Retrieve memories matching a free-form query.
    ///
    /// A failed retrieval yields an empty list at the call site; this
    /// method still reports errors so the caller can log them.
    pub async fn retrieve(
        &self,
        query: &str,
        filter: &MemoryFilter,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, GatewayError> {
        let sanitized = sanitize_fts_query(query);
        if sanitized.is_empty() {
            return Ok(vec![]);
        }

        let mut records = self.store.search(&sanitized, filter, limit).await?;

        // Decay is recomputed on read from last access age.
        let now = Utc::now();
        for record in &mut records {
            if let Some(age_days) = age_in_days(&record.last_accessed_at, now) {
                record.decay_factor = record
                    .decay_factor
                    .min(decay_factor(age_days, self.half_life_days));
            }
        }

        Ok(records)
    }
}

/// Days elapsed since an ISO 8601 timestamp; `None` if unparseable.
fn age_in_days(timestamp: &str, now: DateTime<Utc>) -> Option<f64> {
    let parsed = DateTime::parse_from_rfc3339(timestamp).ok()?;
    let seconds = (now - parsed.with_timezone(&Utc)).num_seconds();
    if seconds < 0 {
        warn!(timestamp, "memory timestamp is in the future");
        return Some(0.0);
    }
    Some(seconds as f64 / 86_400.0)
}

/// Sanitize a free-form query for FTS5.
///
/// Strips XML/HTML tags and FTS-reserved punctuation, escapes embedded
/// quotes by doubling them, and phrase-wraps the residue unless explicit
/// boolean operators (AND/OR/NOT) are present. The result either is
/// empty or parses cleanly in the FTS5 query grammar.
pub fn sanitize_fts_query(raw: &str) -> String {
    // Drop markup before touching punctuation so "<b>rust</b>" -> "rust".
    let mut without_tags = String::with_capacity(raw.len());
    let mut in_tag = false;
    for c in raw.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => without_tags.push(c),
            _ => {}
        }
    }

    // Remove everything the FTS5 grammar assigns meaning to.
    let cleaned: String = without_tags
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    let terms: Vec<&str> = cleaned.split_whitespace().collect();
    if terms.is_empty() {
        return String::new();
    }

    // Callers who spell out boolean operators keep raw term queries;
    // everything else becomes a single phrase.
    let has_operators = terms.iter().any(|t| matches!(*t, "AND" | "OR" | "NOT"));
    if has_operators {
        terms
            .iter()
            .map(|t| {
                if matches!(*t, "AND" | "OR" | "NOT") {
                    (*t).to_string()
                } else {
                    format!("\"{}\"", t.replace('"', "\"\""))
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        format!("\"{}\"", terms.join(" ").replace('"', "\"\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MemoryType;

    fn record(id: &str, content: &str) -> MemoryRecord {
        MemoryRecord {
            id: id.to_string(),
            session_id: Some("s1".to_string()),
            content: content.to_string(),
            memory_type: MemoryType::Fact,
            category: "general".to_string(),
            importance: 0.6,
            surprise_score: 0.5,
            access_count: 0,
            decay_factor: 1.0,
            source_turn_id: None,
            created_at: "2026-07-01T00:00:00.000Z".to_string(),
            updated_at: "2026-07-01T00:00:00.000Z".to_string(),
            last_accessed_at: "2026-07-01T00:00:00.000Z".to_string(),
            metadata: None,
        }
    }

    #[test]
    fn plain_query_is_phrase_wrapped() {
        assert_eq!(sanitize_fts_query("typescript api"), "\"typescript api\"");
    }

    #[test]
    fn markup_is_stripped() {
        assert_eq!(
            sanitize_fts_query("<script>alert('x')</script> rust memory"),
            "\"alert x rust memory\""
        );
    }

    #[test]
    fn reserved_punctuation_is_removed() {
        let sanitized = sanitize_fts_query("col:value (a OR b) \"quoted\" -minus ^caret *star");
        // "OR" survives as an operator; punctuation is gone.
        assert!(!sanitized.contains('('));
        assert!(!sanitized.contains(':'));
        assert!(!sanitized.contains('^'));
        assert!(!sanitized.contains('*'));
        assert!(!sanitized.contains('-'));
    }

    #[test]
    fn boolean_operators_are_preserved() {
        let sanitized = sanitize_fts_query("typescript AND postgres");
        assert_eq!(sanitized, "\"typescript\" AND \"postgres\"");
    }

    #[test]
    fn empty_and_punctuation_only_queries_yield_empty() {
        assert_eq!(sanitize_fts_query(""), "");
        assert_eq!(sanitize_fts_query("(((:::***)))"), "");
        assert_eq!(sanitize_fts_query("<div></div>"), "");
    }

    /// The sanitizer must never produce a query the FTS engine rejects,
    /// including inputs made entirely of reserved punctuation.
    #[tokio::test]
    async fn sanitized_queries_never_error_fts() {
        let store = Arc::new(MemoryStore::open_in_memory().await.unwrap());
        store
            .save(&record("mem-1", "the gateway speaks many dialects"))
            .await
            .unwrap();

        let hostile_inputs = [
            "gateway",
            "\"unbalanced quote",
            "paren ( open",
            "colon:injection",
            "star* NEAR/3 thing",
            "NOT",
            "AND OR NOT",
            "-^*():\"",
            "<b>gateway</b>",
            "emoji 🦀 and punctuation!!!",
            "a AND b OR c NOT d",
        ];

        for input in hostile_inputs {
            let sanitized = sanitize_fts_query(input);
            if sanitized.is_empty() {
                continue;
            }
            // Must not return Err from the FTS engine.
            let result = store
                .search(&sanitized, &MemoryFilter::default(), 10)
                .await;
            assert!(result.is_ok(), "query {input:?} -> {sanitized:?} errored");
        }
    }

    #[tokio::test]
    async fn retrieve_recomputes_decay_on_read() {
        let store = Arc::new(MemoryStore::open_in_memory().await.unwrap());
        let mut old = record("mem-1", "an old architectural decision");
        // Last accessed 30 days before "now": one half-life.
        let thirty_days_ago = (Utc::now() - chrono::Duration::days(30))
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string();
        old.last_accessed_at = thirty_days_ago;
        store.save(&old).await.unwrap();

        let retriever = MemoryRetriever::new(Arc::clone(&store), 30.0);
        let results = retriever
            .retrieve("architectural decision", &MemoryFilter::default(), 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(
            (results[0].decay_factor - 0.5).abs() < 0.01,
            "one half-life should halve decay, got {}",
            results[0].decay_factor
        );
    }

    #[tokio::test]
    async fn failed_match_returns_empty_not_error() {
        let store = Arc::new(MemoryStore::open_in_memory().await.unwrap());
        let retriever = MemoryRetriever::new(store, 30.0);
        let results = retriever
            .retrieve("nothing stored", &MemoryFilter::default(), 10)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn future_timestamps_clamp_to_zero_age() {
        let now = Utc::now();
        let future = (now + chrono::Duration::days(2))
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string();
        assert_eq!(age_in_days(&future, now), Some(0.0));
    }
}
