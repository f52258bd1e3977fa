//! prism-core: the PRISM psychometric scoring engine.
//!
//! Turns one session's raw answers — Likert items plus forced-choice blocks
//! — into a calibrated personality classification: a best-fit type among 16
//! candidates, confidence and validity diagnostics, per-function strength
//! and dimensionality estimates, and a blended block composition.
//!
//! | Stage                  | Module        |
//! |------------------------|---------------|
//! | Response aggregation   | `aggregate`   |
//! | Forced-choice scoring  | `fc`          |
//! | Dimensionality bands   | `dimensions`  |
//! | Type-fit distances     | `typefit`     |
//! | Confidence calibration | `calibration` |
//! | Overlay / state        | `overlay`     |
//! | Validity checks        | `validity`    |
//! | Block composition      | `blocks`      |
//! | Profile assembly       | `engine` + `profile` |
//! | Batch recompute        | `batch`       |
//!
//! Data flows strictly upward through the table; nothing downstream mutates
//! an upstream component's inputs. Each scoring run is stateless and safe to
//! invoke concurrently for different sessions.

pub mod aggregate;
pub mod batch;
pub mod blocks;
pub mod calibration;
pub mod config;
pub mod dimensions;
pub mod engine;
pub mod error;
pub mod fc;
pub mod overlay;
pub mod profile;
pub mod response;
pub mod typefit;
pub mod types;
pub mod validity;

pub use batch::{run_batch, BatchOptions, BatchReport, SessionFailure};
pub use blocks::{BlockDistribution, BlocksNorm};
pub use calibration::{
    Band, CalibrationCurve, CalibrationMethod, CalibrationPoint,
};
pub use config::{FitWeights, ScoringConfig};
pub use engine::{ScoringEngine, SessionInput};
pub use error::ScoreError;
pub use fc::{score_fc_session, FcBasis, FcBlock, FcOption, FcResponse, FcScoreRequest, FcScores, WeightMap};
pub use overlay::OverlaySign;
pub use profile::{normalize_top_types, ProfilePayload, TopType};
pub use response::{AnswerValue, KeyRecord, ResponseRow, ScaleType, ScoringKey};
pub use typefit::{DimsHighlights, DistanceMetric};
pub use types::{BlockKind, Func, Seat, TypeCode, FUNCS, TYPE_CODES};
pub use validity::{ValidityReport, ValidityStatus};
