use thiserror::Error;

/// Input rejected before it reaches either backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Price must be a non-negative number")]
    InvalidPrice,

    #[error("A listing can have at most {max} images (got {got})")]
    TooManyImages { got: usize, max: usize },
}
