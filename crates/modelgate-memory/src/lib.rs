// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-term memory for the modelgate gateway.
//!
//! Pattern-based extraction from assistant responses, surprise-filtered
//! storage in SQLite with an FTS5 mirror, sanitized full-text retrieval
//! for prompt augmentation, and periodic decay maintenance. The memory
//! subsystem never fails a request: extraction and storage errors are
//! logged and swallowed by callers, and a failed retrieval yields an
//! empty list.

pub mod extractor;
pub mod maintenance;
pub mod retriever;
pub mod store;
pub mod types;

pub use extractor::{ExtractorConfig, MemoryExtractor};
pub use maintenance::{run_maintenance, spawn_maintenance_task};
pub use retriever::{sanitize_fts_query, MemoryRetriever};
pub use store::{MemoryFilter, MemoryStats, MemoryStore};
pub use types::{MemoryRecord, MemoryType};
