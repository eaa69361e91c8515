//! The BlindSpot description pipeline.
//!
//! Renders a context-aware prompt, calls the vision model, validates the
//! structured reply, retries on failure, and keeps a bounded per-session
//! history of what was already described.

pub mod history;
pub mod pipeline;
pub mod prompt;
pub mod retry;
pub mod schema;
pub mod session;
pub mod source;

pub use history::{HistoryHandle, HistoryStore};
pub use pipeline::{
    DescriptionPipeline, PipelineSettings, PipelineState, SequenceReport, SequenceResult,
};
pub use prompt::{PromptBuilder, PromptSpec};
pub use retry::{RetryOrchestrator, RetryPolicy};
pub use schema::OutputSchema;
pub use session::{SessionId, SessionRegistry};
pub use source::{sanitize_source_id, ImageInput};
