//! HR Copilot Quality Gates
//!
//! Post-processing for model answers:
//!
//! - `models` - Policy tables (`QualityPolicy`, `SanitizerPolicy`)
//! - `gate` - `QualityGate::is_low_quality`, the fallback trigger
//! - `sanitizer` - `ResponseSanitizer::sanitize`, the idempotent markup stripper

pub mod gate;
pub mod models;
pub mod sanitizer;

pub use gate::QualityGate;
pub use models::{QualityPolicy, SanitizerPolicy};
pub use sanitizer::ResponseSanitizer;
