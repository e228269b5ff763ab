// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background decay maintenance.
//!
//! Runs on an interval: recomputes decay factors bulk-style from last
//! access age, then evicts records whose effective score fell below the
//! floor, records past the maximum age, and the lowest-scored overflow
//! beyond the record cap.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use modelgate_config::MemoryConfig;
use modelgate_core::GatewayError;

use crate::store::MemoryStore;
use crate::types::{decay_factor, effective_score};

/// Records whose importance × decay falls below this are evicted.
const EVICTION_FLOOR: f64 = 0.05;

/// Outcome of one maintenance pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaintenanceReport {
    pub updated: usize,
    pub evicted: usize,
}

/// Run one maintenance pass over the store.
pub async fn run_maintenance(
    store: &MemoryStore,
    config: &MemoryConfig,
) -> Result<MaintenanceReport, GatewayError> {
    let now = Utc::now();
    let records = store.all_for_maintenance().await?;

    let mut report = MaintenanceReport::default();
    let mut evict: Vec<String> = Vec::new();
    let mut survivors: Vec<(String, f64)> = Vec::new();

    for record in &records {
        let access_age = parse_age_days(&record.last_accessed_at, now).unwrap_or(0.0);
        let create_age = parse_age_days(&record.created_at, now).unwrap_or(0.0);

        let decay = decay_factor(access_age, config.decay_half_life_days);
        if (decay - record.decay_factor).abs() > 1e-6 {
            store.update_decay(&record.id, decay).await?;
            report.updated += 1;
        }

        let effective = record.importance * decay;
        if effective < EVICTION_FLOOR || create_age > config.max_age_days as f64 {
            evict.push(record.id.clone());
        } else {
            survivors.push((
                record.id.clone(),
                effective_score(record.importance, decay, record.access_count),
            ));
        }
    }

    // Enforce the record cap by shedding the lowest effective scores.
    if survivors.len() > config.max_count {
        survivors.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        let overflow = survivors.len() - config.max_count;
        evict.extend(survivors.drain(..overflow).map(|(id, _)| id));
    }

    if !evict.is_empty() {
        report.evicted = evict.len();
        store.delete(&evict).await?;
        info!(evicted = report.evicted, "memory maintenance evicted records");
    } else {
        debug!(updated = report.updated, "memory maintenance pass complete");
    }

    Ok(report)
}

/// Spawn the periodic maintenance task. Errors are logged, never fatal.
pub fn spawn_maintenance_task(
    store: Arc<MemoryStore>,
    config: MemoryConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let period = std::time::Duration::from_secs(config.decay_interval_mins * 60);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so startup stays quick.
        interval.tick().await;

        loop {
            interval.tick().await;
            if let Err(e) = run_maintenance(&store, &config).await {
                warn!(error = %e, "memory maintenance pass failed");
            }
        }
    })
}

fn parse_age_days(timestamp: &str, now: DateTime<Utc>) -> Option<f64> {
    let parsed = DateTime::parse_from_rfc3339(timestamp).ok()?;
    let seconds = (now - parsed.with_timezone(&Utc)).num_seconds();
    Some((seconds.max(0)) as f64 / 86_400.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MemoryRecord, MemoryType};

    fn days_ago(days: i64) -> String {
        (Utc::now() - chrono::Duration::days(days))
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string()
    }

    fn record(id: &str, importance: f64, accessed_days_ago: i64, created_days_ago: i64) -> MemoryRecord {
        MemoryRecord {
            id: id.to_string(),
            session_id: Some("s1".to_string()),
            content: format!("memory {id}"),
            memory_type: MemoryType::Fact,
            category: "general".to_string(),
            importance,
            surprise_score: 0.5,
            access_count: 0,
            decay_factor: 1.0,
            source_turn_id: None,
            created_at: days_ago(created_days_ago),
            updated_at: days_ago(created_days_ago),
            last_accessed_at: days_ago(accessed_days_ago),
            metadata: None,
        }
    }

    fn config() -> MemoryConfig {
        MemoryConfig::default()
    }

    #[tokio::test]
    async fn decay_is_recomputed_for_stale_records() {
        let store = MemoryStore::open_in_memory().await.unwrap();
        store.save(&record("mem-1", 0.9, 30, 30)).await.unwrap();

        let report = run_maintenance(&store, &config()).await.unwrap();
        assert_eq!(report.updated, 1);

        let records = store.all_for_maintenance().await.unwrap();
        assert!((records[0].decay_factor - 0.5).abs() < 0.01);
    }

    #[tokio::test]
    async fn decayed_below_floor_is_evicted() {
        let store = MemoryStore::open_in_memory().await.unwrap();
        // importance 0.4 at ~4 half-lives: 0.4 × 0.0625 = 0.025 < 0.05.
        store.save(&record("mem-old", 0.4, 120, 120)).await.unwrap();
        store.save(&record("mem-fresh", 0.8, 0, 0)).await.unwrap();

        let report = run_maintenance(&store, &config()).await.unwrap();
        assert_eq!(report.evicted, 1);

        let remaining = store.all_for_maintenance().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "mem-fresh");
    }

    #[tokio::test]
    async fn over_age_records_are_evicted() {
        let store = MemoryStore::open_in_memory().await.unwrap();
        let mut cfg = config();
        cfg.max_age_days = 10;
        // Recently accessed (decay 1.0) but created long ago.
        store.save(&record("mem-ancient", 0.9, 0, 30)).await.unwrap();

        let report = run_maintenance(&store, &cfg).await.unwrap();
        assert_eq!(report.evicted, 1);
    }

    #[tokio::test]
    async fn record_cap_sheds_lowest_scores() {
        let store = MemoryStore::open_in_memory().await.unwrap();
        let mut cfg = config();
        cfg.max_count = 2;

        store.save(&record("mem-a", 0.9, 0, 0)).await.unwrap();
        store.save(&record("mem-b", 0.7, 0, 0)).await.unwrap();
        store.save(&record("mem-c", 0.3, 0, 0)).await.unwrap();

        let report = run_maintenance(&store, &cfg).await.unwrap();
        assert_eq!(report.evicted, 1);

        let remaining = store.all_for_maintenance().await.unwrap();
        assert!(remaining.iter().all(|r| r.id != "mem-c"));
    }

    #[tokio::test]
    async fn fresh_store_needs_no_work() {
        let store = MemoryStore::open_in_memory().await.unwrap();
        store.save(&record("mem-1", 0.8, 0, 0)).await.unwrap();
        let report = run_maintenance(&store, &config()).await.unwrap();
        assert_eq!(report, MaintenanceReport { updated: 0, evicted: 0 });
    }
}
