//! Data Models

pub mod answer;
pub mod settings;

pub use answer::{Answer, Strategy};
pub use settings::AppConfig;
