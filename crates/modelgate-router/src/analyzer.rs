// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic request complexity analysis.
//!
//! Scores each request on five additive subscores (tokens, tools, task
//! type, code vocabulary, reasoning phrasing) plus a small
//! conversation-length bonus, clamped to 0-100. Zero-cost heuristic rules:
//! no LLM pre-call, no network, no latency. Two pattern sets short-circuit
//! the score entirely: force-local for trivialities and force-cloud for
//! high-stakes work.

use modelgate_core::{CanonicalRequest, RoutingMode};

/// Where the analyzer recommends the request should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    Local,
    Cloud,
}

/// Force override triggered by a pattern set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceClass {
    Local,
    Cloud,
}

/// Coarse task classification consumed by smart tool selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskClass {
    /// Greetings, yes/no, chit-chat: no tools needed.
    Conversational,
    /// Inspecting existing code or files.
    FileReading,
    /// Writing or modifying code.
    CodeWriting,
    /// Multi-step work that may need the full tool surface.
    ComplexTask,
    /// Anything else.
    General,
}

/// Result of analyzing a request's complexity.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Total score, clamped to 0-100.
    pub total: u8,
    pub token_score: u8,
    pub tool_score: u8,
    pub task_type_score: u8,
    pub code_score: u8,
    pub reasoning_score: u8,
    pub length_bonus: u8,
    pub mode: RoutingMode,
    pub threshold: u8,
    pub recommendation: Recommendation,
    /// Set when a force pattern short-circuited the recommendation.
    pub force: Option<ForceClass>,
    pub class: TaskClass,
}

/// Greeting and triviality patterns forcing a local recommendation
/// (exact match, case-insensitive).
const FORCE_LOCAL_EXACT: &[&str] = &[
    "hi", "hello", "hey", "thanks", "thank you", "bye", "ok", "okay", "yes", "no", "sure",
    "good", "great", "cool", "nice", "yep", "nope", "yeah", "nah",
];

/// Triviality phrasings forcing a local recommendation (contains).
const FORCE_LOCAL_CONTAINS: &[&str] = &[
    "what time", "what day", "what date", "how are you", "what's up", "who are you",
];

/// High-stakes phrasings forcing a cloud recommendation (contains).
const FORCE_CLOUD_CONTAINS: &[&str] = &[
    "security audit",
    "security review",
    "architecture review",
    "production incident",
    "production outage",
    "post-mortem",
    "postmortem",
    "penetration test",
    "vulnerability assessment",
];

/// Task-type pattern families, highest score first; first match wins.
const TASK_TYPES: &[(&[&str], u8, TaskClass)] = &[
    (
        &["entire codebase", "whole codebase", "across the codebase", "all files"],
        25,
        TaskClass::ComplexTask,
    ),
    (
        &["from scratch", "greenfield", "new project", "bootstrap a"],
        22,
        TaskClass::ComplexTask,
    ),
    (
        &["implement", "build a", "create a", "write a", "add a feature", "add support"],
        20,
        TaskClass::CodeWriting,
    ),
    (
        &["refactor", "restructure", "rewrite", "migrate", "clean up"],
        18,
        TaskClass::CodeWriting,
    ),
    (
        &["debug", "fix", "error", "explain", "how does", "why does", "what does"],
        12,
        TaskClass::FileReading,
    ),
    (
        &["help", "show me", "find", "search", "look at", "read"],
        8,
        TaskClass::FileReading,
    ),
    (&["is it", "can i", "should i", "does it"], 3, TaskClass::Conversational),
    (&["what is", "what are", "when is"], 2, TaskClass::Conversational),
];

/// Code-complexity vocabulary: +4 per family matched, capped at 20.
const CODE_VOCAB: &[&[&str]] = &[
    &["multiple files", "multi-file", "several modules", "cross-module"],
    &["architecture", "microservice", "monolith", "design pattern", "system design"],
    &["concurrency", "thread", "async", "race condition", "deadlock", "mutex"],
    &["security", "authentication", "authorization", "encryption", "injection"],
    &["test", "unit test", "integration test", "coverage", "mocking"],
    &["performance", "optimize", "latency", "throughput", "profiling", "benchmark"],
    &["database", "schema", "migration", "index", "query plan", "transaction"],
];

/// Reasoning phrasings: +3 per family matched, capped at 15.
const REASONING_VOCAB: &[&[&str]] = &[
    &["step by step", "step-by-step", "walk me through"],
    &["trade-off", "tradeoff", "pros and cons", "compare"],
    &["analyze", "analysis", "evaluate", "assess"],
    &["plan", "roadmap", "strategy", "approach"],
    &["edge case", "corner case", "what could go wrong", "failure mode"],
];

/// Heuristic complexity analyzer.
pub struct ComplexityAnalyzer {
    mode: RoutingMode,
}

impl ComplexityAnalyzer {
    /// Create an analyzer for the given routing mode.
    pub fn new(mode: RoutingMode) -> Self {
        Self { mode }
    }

    /// Analyze a canonical request.
    pub fn analyze(&self, request: &CanonicalRequest) -> Analysis {
        let last_user = request.last_user_text();
        let lower = last_user.to_lowercase();
        let trimmed = lower.trim();

        let force = detect_force(trimmed);

        let token_score = token_score(estimate_tokens(request));
        let tool_score = tool_score(request.tool_count());
        let (task_type_score, mut class) = task_type(trimmed);
        let code_score = vocab_score(trimmed, CODE_VOCAB, 4, 20);
        let reasoning_score = vocab_score(trimmed, REASONING_VOCAB, 3, 15);
        let length_bonus = (request.messages.len() / 4).min(5) as u8;

        let mut total = (token_score as u32
            + tool_score as u32
            + task_type_score as u32
            + code_score as u32
            + reasoning_score as u32
            + length_bonus as u32)
            .min(100) as u8;

        // Whole-codebase and greenfield work is complex no matter how
        // short the prompt; floor it into the upper tier buckets.
        if task_type_score >= 22 {
            total = total.max(75);
        }

        if total >= 60 {
            class = TaskClass::ComplexTask;
        } else if force == Some(ForceClass::Local) {
            class = TaskClass::Conversational;
        }

        let threshold = self.mode.threshold();
        let recommendation = match force {
            Some(ForceClass::Local) => Recommendation::Local,
            Some(ForceClass::Cloud) => Recommendation::Cloud,
            None => {
                if total >= threshold {
                    Recommendation::Cloud
                } else {
                    Recommendation::Local
                }
            }
        };

        Analysis {
            total,
            token_score,
            tool_score,
            task_type_score,
            code_score,
            reasoning_score,
            length_bonus,
            mode: self.mode,
            threshold,
            recommendation,
            force,
            class,
        }
    }
}

/// Estimate token count over the whole conversation: 4 chars ≈ 1 token.
fn estimate_tokens(request: &CanonicalRequest) -> usize {
    let mut chars = request.system.as_deref().map(str::len).unwrap_or(0);
    for msg in &request.messages {
        chars += msg.content.text().len();
    }
    chars / 4
}

/// Bucket the estimated token count into 0-20.
fn token_score(tokens: usize) -> u8 {
    match tokens {
        0..=500 => 0,
        501..=1000 => 4,
        1001..=2000 => 8,
        2001..=4000 => 12,
        4001..=8000 => 16,
        _ => 20,
    }
}

/// Bucket the declared tool count into 0-20.
fn tool_score(count: usize) -> u8 {
    match count {
        0 => 0,
        1..=3 => 4,
        4..=6 => 8,
        7..=10 => 12,
        11..=15 => 16,
        _ => 20,
    }
}

/// Match the task-type pattern families; first match wins.
fn task_type(text: &str) -> (u8, TaskClass) {
    for (patterns, score, class) in TASK_TYPES {
        if patterns.iter().any(|p| text.contains(p)) {
            return (*score, *class);
        }
    }
    (8, TaskClass::General)
}

/// Additive vocabulary score: `points` per family with any match, capped.
fn vocab_score(text: &str, families: &[&[&str]], points: u8, cap: u8) -> u8 {
    let mut score = 0u8;
    for family in families {
        if family.iter().any(|p| text.contains(p)) {
            score = score.saturating_add(points);
        }
    }
    score.min(cap)
}

/// Detect force-local / force-cloud pattern matches.
fn detect_force(text: &str) -> Option<ForceClass> {
    if FORCE_CLOUD_CONTAINS.iter().any(|p| text.contains(p)) {
        return Some(ForceClass::Cloud);
    }
    if FORCE_LOCAL_EXACT.iter().any(|p| text == *p)
        || FORCE_LOCAL_CONTAINS.iter().any(|p| text.contains(p))
    {
        return Some(ForceClass::Local);
    }
    None
}
