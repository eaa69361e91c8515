pub mod error;
pub mod traits;
pub mod types;

pub use error::{BlindSpotError, ValidationError};
pub use traits::{InlineImage, VisionModel, VisionRequest, VisionResponse};
pub use types::{
    DescribeResponse, DescriptionResult, ErrorKind, FailureRecord, HistoryEntry, ImportanceRange,
    PipelineOutcome, FALLBACK_DESCRIPTION,
};
