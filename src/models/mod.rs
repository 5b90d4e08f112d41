pub mod alert;
pub mod analytics;
pub mod document;
pub mod enums;

pub use alert::*;
pub use analytics::*;
pub use document::*;
pub use enums::*;

/// Errors from model parsing.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Invalid {field} value: {value}")]
    InvalidEnum { field: String, value: String },
}
