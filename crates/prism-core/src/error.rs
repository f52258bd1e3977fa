//! Error taxonomy for scoring runs.
//!
//! Only genuinely failed computations are errors. A Low confidence, a `fail`
//! validity status, or zero forced-choice blocks are completed outcomes and
//! never surface here. Malformed configuration payloads (weight maps,
//! metadata blobs) are caught at the parse boundary and replaced with safe
//! defaults; they only reach this enum when a whole configuration document
//! is unreadable.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoreError {
    /// A configuration document could not be read or deserialized at all.
    #[error("configuration error: {0}")]
    Config(String),

    /// The assembled profile failed required-field or enum validation.
    /// Fatal for the run; the payload must not be persisted.
    #[error("profile schema violation: {0}")]
    SchemaViolation(String),
}
