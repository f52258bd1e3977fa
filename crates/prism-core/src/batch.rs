//! Chunked batch recomputation with partial-failure semantics.
//!
//! The runner iterates session ids in bounded chunks with a deliberate pause
//! between chunks so downstream rate limits are respected. One failing
//! session never aborts the batch: its error is captured and the remaining
//! sessions proceed independently. Per-item results live in the report —
//! there is no shared mutable accumulator for callers to race on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::time::Duration;
use uuid::Uuid;

/// Batch tuning knobs.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Sessions per chunk.
    pub chunk_size: usize,
    /// Pause between chunks. Zero disables the pause (tests).
    pub chunk_delay: Duration,
    /// Echoed into the report; the per-session operation decides what a dry
    /// run skips.
    pub dry_run: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            chunk_delay: Duration::from_millis(250),
            dry_run: false,
        }
    }
}

/// One captured failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionFailure {
    pub session_id: String,
    pub error: String,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub scanned: usize,
    pub ok: usize,
    pub fail: usize,
    pub failed_sessions: Vec<SessionFailure>,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Run `op` over every session id, chunked and throttled.
///
/// `op` typically scores a session and upserts the result; its error type
/// only needs to render into the report.
pub fn run_batch<T, E, F>(session_ids: &[String], opts: &BatchOptions, mut op: F) -> BatchReport
where
    E: Display,
    F: FnMut(&str) -> Result<T, E>,
{
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let chunk_size = opts.chunk_size.max(1);
    tracing::info!(
        %run_id,
        scanned = session_ids.len(),
        chunk_size,
        dry_run = opts.dry_run,
        "recompute batch start"
    );

    let mut ok = 0usize;
    let mut failed: Vec<SessionFailure> = Vec::new();

    for (chunk_idx, chunk) in session_ids.chunks(chunk_size).enumerate() {
        if chunk_idx > 0 && !opts.chunk_delay.is_zero() {
            std::thread::sleep(opts.chunk_delay);
        }
        for session_id in chunk {
            match op(session_id) {
                Ok(_) => {
                    ok += 1;
                    if ok % 10 == 0 {
                        tracing::info!(
                            %run_id,
                            processed = ok + failed.len(),
                            total = session_ids.len(),
                            ok,
                            fail = failed.len(),
                            "recompute batch progress"
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(%run_id, session_id = %session_id, error = %e, "session recompute failed");
                    failed.push(SessionFailure {
                        session_id: session_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    let report = BatchReport {
        run_id,
        scanned: session_ids.len(),
        ok,
        fail: failed.len(),
        failed_sessions: failed,
        dry_run: opts.dry_run,
        started_at,
        finished_at: Utc::now(),
    };
    tracing::info!(
        %run_id,
        scanned = report.scanned,
        ok = report.ok,
        fail = report.fail,
        "recompute batch complete"
    );
    report
}
