//! Codec errors

use thiserror::Error;
use vroom_core::VroomError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("payload is not valid JSON for this topic: {0}")]
    Malformed(String),

    #[error("blendshape {category} has score {score} outside [0, 1]")]
    ScoreOutOfRange { category: String, score: f32 },

    #[error("duplicate blendshape category {0}")]
    DuplicateCategory(String),

    #[error("{0} is not a finite number")]
    NonFinite(&'static str),

    #[error("empty field: {0}")]
    EmptyField(&'static str),
}

impl From<serde_json::Error> for CodecError {
    fn from(e: serde_json::Error) -> Self {
        CodecError::Malformed(e.to_string())
    }
}

impl From<CodecError> for VroomError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::NonFinite(_) => VroomError::Encode(e.to_string()),
            other => VroomError::Decode(other.to_string()),
        }
    }
}

pub type CodecResult<T> = Result<T, CodecError>;
