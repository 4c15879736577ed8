pub mod agents;
mod error;
pub mod http;
pub mod llm;
pub mod media;
pub mod news;
pub mod notify;
mod processor;
pub mod report;
pub mod tracing;
pub mod types;

pub use agents::{
    debriefer::Debriefer,
    satirist::Satirist,
    scout::{NewsScout, ScoutOptions},
    Backoff,
};
pub use error::Error;
pub use llm::{CompletionRequest, LanguageModel, LlmError};
pub use processor::{builder::ContentFarmBuilder, BriefOutcome, ContentFarm, ProducedVideo};
