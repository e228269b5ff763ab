// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pattern-based memory extraction with surprise filtering.
//!
//! After a response is assembled, the assistant's text is scanned with a
//! fixed set of per-type regular expressions. Each candidate fragment is
//! scored for surprise against the session's recent memories of the same
//! type; unsurprising candidates are discarded, near-duplicates of the
//! last few stored memories are dropped, and the rest are stored with an
//! importance derived from type base plus surprise.
//!
//! Extraction never fails a request: callers log and swallow errors.

use std::sync::Arc;

use chrono::Utc;
use regex::Regex;
use tracing::debug;
use uuid::Uuid;

use modelgate_core::GatewayError;

use crate::store::MemoryStore;
use crate::types::{clamp01, lexical_similarity, normalize_text, MemoryRecord, MemoryType};

/// Weight of the surprise contribution to importance.
const SURPRISE_WEIGHT: f64 = 0.3;

/// A candidate fragment matched by one of the type patterns.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub memory_type: MemoryType,
    pub content: String,
}

/// Extraction pipeline configuration.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Candidates below this surprise score are discarded.
    pub surprise_threshold: f64,
    /// Recent same-type memories surprise is computed against.
    pub recent_window: usize,
    /// Recent memories consulted for duplicate suppression.
    pub dedup_lookback: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            surprise_threshold: 0.3,
            recent_window: 100,
            dedup_lookback: 5,
        }
    }
}

/// Extracts and stores long-term memories from assistant responses.
pub struct MemoryExtractor {
    store: Arc<MemoryStore>,
    config: ExtractorConfig,
    patterns: Vec<(MemoryType, Regex)>,
}

impl MemoryExtractor {
    /// Create an extractor over the given store.
    pub fn new(store: Arc<MemoryStore>, config: ExtractorConfig) -> Self {
        Self {
            store,
            config,
            patterns: type_patterns(),
        }
    }

    /// Scan assistant text, filter by surprise, dedup, and store.
    ///
    /// Returns the newly stored records. Zero pattern matches mean zero
    /// stored memories.
    pub async fn extract_and_store(
        &self,
        session_id: Option<&str>,
        source_turn_id: Option<&str>,
        assistant_text: &str,
    ) -> Result<Vec<MemoryRecord>, GatewayError> {
        let candidates = self.scan(assistant_text);
        if candidates.is_empty() {
            return Ok(vec![]);
        }

        let dedup_window = self
            .store
            .recent_for_session(session_id, None, self.config.dedup_lookback)
            .await?;

        let mut stored = Vec::new();
        for candidate in candidates {
            // Duplicate suppression against the last K stored memories.
            let normalized = normalize_text(&candidate.content);
            let duplicate = dedup_window
                .iter()
                .chain(stored.iter())
                .any(|m: &MemoryRecord| normalize_text(&m.content) == normalized);
            if duplicate {
                debug!(content = %candidate.content, "skipping duplicate memory candidate");
                continue;
            }

            let recent_same_type = self
                .store
                .recent_for_session(
                    session_id,
                    Some(candidate.memory_type),
                    self.config.recent_window,
                )
                .await?;

            let surprise = surprise_score(&candidate.content, &recent_same_type);
            if surprise < self.config.surprise_threshold {
                debug!(
                    content = %candidate.content,
                    surprise,
                    "discarding unsurprising memory candidate"
                );
                continue;
            }

            let importance = clamp01(
                candidate.memory_type.base_importance() + SURPRISE_WEIGHT * surprise,
            );
            let now = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
            let record = MemoryRecord {
                id: Uuid::new_v4().to_string(),
                session_id: session_id.map(str::to_string),
                content: candidate.content,
                memory_type: candidate.memory_type,
                category: "general".to_string(),
                importance,
                surprise_score: clamp01(surprise),
                access_count: 0,
                decay_factor: 1.0,
                source_turn_id: source_turn_id.map(str::to_string),
                created_at: now.clone(),
                updated_at: now.clone(),
                last_accessed_at: now,
                metadata: None,
            };
            self.store.save(&record).await?;
            stored.push(record);
        }

        Ok(stored)
    }

    /// Run the per-type patterns over the text, one candidate per sentence
    /// per first-matching type.
    pub fn scan(&self, text: &str) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for sentence in split_sentences(text) {
            for (memory_type, pattern) in &self.patterns {
                if pattern.is_match(sentence) {
                    candidates.push(Candidate {
                        memory_type: *memory_type,
                        content: sentence.trim().to_string(),
                    });
                    break;
                }
            }
        }
        candidates
    }
}

/// Surprise = 1 − max lexical similarity to any recent same-type memory.
pub fn surprise_score(content: &str, recent_same_type: &[MemoryRecord]) -> f64 {
    let max_similarity = recent_same_type
        .iter()
        .map(|m| lexical_similarity(content, &m.content))
        .fold(0.0_f64, f64::max);
    1.0 - max_similarity
}

/// The fixed per-type extraction patterns, checked in priority order.
fn type_patterns() -> Vec<(MemoryType, Regex)> {
    let patterns = [
        (
            MemoryType::Decision,
            r"(?i)\b(?:let's use|let's go with|we(?:'ll| will) use|decided (?:to|on)|going with|we chose|settled on)\b",
        ),
        (
            MemoryType::Preference,
            r"(?i)\b(?:i prefer|you prefer|we prefer|i'd rather|prefers|favorite|always use|never use)\b",
        ),
        (
            MemoryType::Relationship,
            r"(?i)\b(?:depends on|belongs to|is part of|connects to|talks to|is owned by|inherits from)\b",
        ),
        (
            MemoryType::Entity,
            r"(?i)\b(?:the (?:api|service|database|server|repo|project|module|crate) (?:is named|is called|lives (?:in|at)|runs on))\b",
        ),
        (
            MemoryType::Fact,
            r"(?i)\b(?:note that|keep in mind|remember that|it turns out|importantly)\b",
        ),
    ];

    patterns
        .into_iter()
        .map(|(t, p)| (t, Regex::new(p).expect("static pattern compiles")))
        .collect()
}

/// Split text into sentences on terminal punctuation and newlines.
fn split_sentences(text: &str) -> Vec<&str> {
    text.split(|c| matches!(c, '.' | '!' | '?' | '\n'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn extractor() -> MemoryExtractor {
        let store = Arc::new(MemoryStore::open_in_memory().await.unwrap());
        MemoryExtractor::new(store, ExtractorConfig::default())
    }

    #[tokio::test]
    async fn decision_phrase_is_extracted() {
        let e = extractor().await;
        let stored = e
            .extract_and_store(
                Some("s1"),
                None,
                "Let's use TypeScript for the API layer.",
            )
            .await
            .unwrap();

        assert_eq!(stored.len(), 1);
        let record = &stored[0];
        assert_eq!(record.memory_type, MemoryType::Decision);
        assert!(record.content.contains("TypeScript for the API layer"));
        // With no prior memories, surprise is 1.0: importance = 0.8 + 0.3.
        assert!((record.surprise_score - 1.0).abs() < 1e-9);
        assert!((record.importance - 1.0).abs() < 1e-9, "clamped to 1.0");
    }

    #[tokio::test]
    async fn no_pattern_match_stores_nothing() {
        let e = extractor().await;
        let stored = e
            .extract_and_store(Some("s1"), None, "The weather is nice today. Compiling now.")
            .await
            .unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn identical_text_within_lookback_is_deduped() {
        let e = extractor().await;
        let first = e
            .extract_and_store(Some("s1"), None, "Let's use TypeScript for the API layer.")
            .await
            .unwrap();
        assert_eq!(first.len(), 1);

        let second = e
            .extract_and_store(Some("s1"), None, "Let's use TypeScript for the API layer.")
            .await
            .unwrap();
        assert!(second.is_empty(), "identical candidate must be deduped");
    }

    #[tokio::test]
    async fn similar_text_is_discarded_by_surprise() {
        let e = extractor().await;
        e.extract_and_store(Some("s1"), None, "Let's use TypeScript for the API layer.")
            .await
            .unwrap();

        // Same decision modulo one word: similarity well above 0.7, so
        // surprise falls below the 0.3 threshold.
        let stored = e
            .extract_and_store(Some("s1"), None, "Let's use TypeScript for the API tier.")
            .await
            .unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn unrelated_decision_survives_surprise_filter() {
        let e = extractor().await;
        e.extract_and_store(Some("s1"), None, "Let's use TypeScript for the API layer.")
            .await
            .unwrap();

        let stored = e
            .extract_and_store(Some("s1"), None, "We chose Postgres over Mongo as our datastore.")
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].surprise_score >= 0.3);
    }

    #[tokio::test]
    async fn multiple_types_in_one_response() {
        let e = extractor().await;
        let stored = e
            .extract_and_store(
                Some("s1"),
                None,
                "Let's go with Axum for routing. Note that the staging cluster only has 2GB of RAM. \
                 The billing service depends on the ledger queue.",
            )
            .await
            .unwrap();

        let types: Vec<MemoryType> = stored.iter().map(|r| r.memory_type).collect();
        assert!(types.contains(&MemoryType::Decision));
        assert!(types.contains(&MemoryType::Fact));
        assert!(types.contains(&MemoryType::Relationship));
    }

    #[tokio::test]
    async fn preference_phrase_is_extracted() {
        let e = extractor().await;
        let stored = e
            .extract_and_store(Some("s1"), None, "I prefer explicit error types over anyhow here.")
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].memory_type, MemoryType::Preference);
        assert!((stored[0].importance - 1.0).abs() < 1e-9);
    }

    #[test]
    fn surprise_is_one_with_no_history() {
        assert!((surprise_score("anything", &[]) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn sentences_split_on_punctuation_and_newlines() {
        let sentences = split_sentences("First one. Second!\nThird?  ");
        assert_eq!(sentences, vec!["First one", "Second", "Third"]);
    }
}
