//! # Drift Detection
//!
//! Baseline distributions per feature, and mean-shift / variance-ratio / PSI
//! checks of live samples against them.

pub mod detector;
pub mod report;
pub mod statistics;

pub use detector::{DriftDetector, DriftError, DriftHandler};
pub use report::{BaselineDistribution, DriftReport, DriftSignal, PsiSeverity};
pub use statistics::{PSI_PROPORTION_FLOOR, STDDEV_EPSILON};
