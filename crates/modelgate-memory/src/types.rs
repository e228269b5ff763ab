// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory domain types and the scoring math shared across the subsystem.

use serde::{Deserialize, Serialize};

/// What kind of information a memory captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    Preference,
    Decision,
    Fact,
    Entity,
    Relationship,
}

impl MemoryType {
    /// Convert to string for SQLite storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::Preference => "preference",
            MemoryType::Decision => "decision",
            MemoryType::Fact => "fact",
            MemoryType::Entity => "entity",
            MemoryType::Relationship => "relationship",
        }
    }

    /// Parse from SQLite string.
    pub fn from_str_value(s: &str) -> Self {
        match s {
            "preference" => MemoryType::Preference,
            "decision" => MemoryType::Decision,
            "entity" => MemoryType::Entity,
            "relationship" => MemoryType::Relationship,
            _ => MemoryType::Fact,
        }
    }

    /// Base importance before the surprise contribution.
    pub fn base_importance(&self) -> f64 {
        match self {
            MemoryType::Preference => 0.7,
            MemoryType::Decision => 0.8,
            MemoryType::Fact => 0.6,
            MemoryType::Entity => 0.4,
            MemoryType::Relationship => 0.5,
        }
    }
}

/// A single stored memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique identifier.
    pub id: String,
    /// Session where this memory was created.
    pub session_id: Option<String>,
    /// The memory content as a standalone statement.
    pub content: String,
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    /// Free-form category label.
    pub category: String,
    /// Importance in [0, 1]: base-by-type + 0.3 × surprise.
    pub importance: f64,
    /// Surprise at extraction time, in [0, 1].
    pub surprise_score: f64,
    /// Number of retrievals that returned this record.
    pub access_count: i64,
    /// Exponential time decay, monotone non-increasing between accesses.
    pub decay_factor: f64,
    /// Turn that produced this memory, if known.
    pub source_turn_id: Option<String>,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 last-update timestamp.
    pub updated_at: String,
    /// ISO 8601 last-access timestamp.
    pub last_accessed_at: String,
    /// Optional JSON metadata blob.
    pub metadata: Option<String>,
}

impl MemoryRecord {
    /// Effective ranking score: importance × decay × (1 + ln(1 + accesses)).
    pub fn effective_score(&self) -> f64 {
        effective_score(self.importance, self.decay_factor, self.access_count)
    }
}

/// Clamp a score into [0, 1].
pub fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Exponential decay: 0.5^(age_days / half_life).
pub fn decay_factor(age_days: f64, half_life_days: f64) -> f64 {
    if half_life_days <= 0.0 {
        return 1.0;
    }
    0.5_f64.powf(age_days.max(0.0) / half_life_days)
}

/// Effective ranking score for eviction and ordering.
pub fn effective_score(importance: f64, decay: f64, access_count: i64) -> f64 {
    importance * decay * (1.0 + (1.0 + access_count as f64).ln())
}

/// Lexical cosine similarity over token sets: |A∩B| / sqrt(|A|·|B|).
///
/// Stands in for embedding cosine; both inputs are lowercased and split
/// on non-alphanumeric boundaries.
pub fn lexical_similarity(a: &str, b: &str) -> f64 {
    let set_a = token_set(a);
    let set_b = token_set(b);
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count() as f64;
    intersection / ((set_a.len() as f64) * (set_b.len() as f64)).sqrt()
}

/// Normalized form for duplicate suppression: lowercased, punctuation
/// stripped, whitespace collapsed.
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn token_set(text: &str) -> std::collections::HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_round_trip() {
        for t in [
            MemoryType::Preference,
            MemoryType::Decision,
            MemoryType::Fact,
            MemoryType::Entity,
            MemoryType::Relationship,
        ] {
            assert_eq!(MemoryType::from_str_value(t.as_str()), t);
        }
    }

    #[test]
    fn base_importance_values() {
        assert!((MemoryType::Preference.base_importance() - 0.7).abs() < f64::EPSILON);
        assert!((MemoryType::Decision.base_importance() - 0.8).abs() < f64::EPSILON);
        assert!((MemoryType::Fact.base_importance() - 0.6).abs() < f64::EPSILON);
        assert!((MemoryType::Entity.base_importance() - 0.4).abs() < f64::EPSILON);
        assert!((MemoryType::Relationship.base_importance() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn decay_halves_per_half_life() {
        assert!((decay_factor(0.0, 30.0) - 1.0).abs() < 1e-9);
        assert!((decay_factor(30.0, 30.0) - 0.5).abs() < 1e-9);
        assert!((decay_factor(60.0, 30.0) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn decay_is_monotone_non_increasing() {
        let mut prev = decay_factor(0.0, 30.0);
        for days in 1..120 {
            let d = decay_factor(days as f64, 30.0);
            assert!(d <= prev, "decay must not increase with age");
            prev = d;
        }
    }

    #[test]
    fn effective_score_grows_with_access() {
        let base = effective_score(0.8, 1.0, 0);
        let accessed = effective_score(0.8, 1.0, 10);
        assert!(accessed > base);
        assert!((base - 0.8).abs() < 1e-9, "zero accesses leaves importance × decay");
    }

    #[test]
    fn identical_text_has_similarity_one() {
        let sim = lexical_similarity("use TypeScript for the API", "use TypeScript for the API");
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_text_has_similarity_zero() {
        assert_eq!(lexical_similarity("alpha beta", "gamma delta"), 0.0);
        assert_eq!(lexical_similarity("", "anything"), 0.0);
    }

    #[test]
    fn overlapping_text_scores_between() {
        let sim = lexical_similarity(
            "use TypeScript for the API layer",
            "use Go for the API layer",
        );
        assert!(sim > 0.3 && sim < 1.0, "got {sim}");
    }

    #[test]
    fn normalize_collapses_case_punctuation_whitespace() {
        assert_eq!(
            normalize_text("Let's   use TypeScript, for the API-layer!"),
            "let s use typescript for the api layer"
        );
    }

    #[test]
    fn clamp_bounds() {
        assert_eq!(clamp01(1.5), 1.0);
        assert_eq!(clamp01(-0.2), 0.0);
        assert_eq!(clamp01(0.4), 0.4);
    }
}
