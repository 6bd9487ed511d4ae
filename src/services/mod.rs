//! Services
//!
//! The question pipeline. `Orchestrator::answer` is the single entry point;
//! the other services are its stages.

pub mod cache;
pub mod classifier;
pub mod direct;
pub mod orchestrator;
pub mod synthesizer;

pub use cache::{AnswerCache, BoundedCache, ClassificationCache};
pub use classifier::{classify_by_rules, QuestionClassifier};
pub use direct::{DataAvailability, DirectResponder};
pub use orchestrator::{Orchestrator, ERROR_MESSAGE, GREETING_MESSAGE, TIMEOUT_MESSAGE};
pub use synthesizer::{
    QueryOutcome, QuerySource, QuerySynthesizer, SynthesisResult, SynthesizedAnswer,
    SynthesizedQuery,
};
