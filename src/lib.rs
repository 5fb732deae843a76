//! Stock newsletter - a three-agent research crew behind a one-field web page
//!
//! A price analyst and a news analyst gather data through their tools, a
//! writer turns both reports into a markdown newsletter, and a manager
//! decides the order within a bounded number of iterations.

pub mod agents;
pub mod api;
pub mod config;
pub mod constants;
pub mod contract;
pub mod crew;
pub mod data;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod tools;

// Re-export commonly used types
pub use config::AppConfig;
pub use contract::Trend;
pub use crew::task::{PipelineResult, TaskOutput};
pub use data::models::Ticket;
pub use error::{DataError, PipelineError};
pub use pipeline::NewsletterPipeline;
