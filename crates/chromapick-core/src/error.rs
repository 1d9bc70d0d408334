//! Error types for chromapick.

use thiserror::Error;

/// The main error type for chromapick operations.
#[derive(Error, Debug)]
pub enum PickError {
    /// A shader or pipeline lacks something the identity pass depends on.
    ///
    /// Raised during setup; never retried.
    #[error("picking configuration error: {what}")]
    Configuration {
        /// Description of the missing or invalid item.
        what: String,
    },

    /// The pick coordinate lies outside the framebuffer.
    #[error("pick coordinate ({x}, {y}) outside {width}x{height} framebuffer")]
    OutOfRangeCoordinate {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
    },

    /// A sampled colour decoded to a value that is not a live object.
    #[error("decoded value {value} is not a valid handle for {object_count} objects")]
    DecodeMismatch { value: u32, object_count: u32 },

    /// Error reported by the rendering backend.
    #[error("render error: {0}")]
    Render(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl PickError {
    /// Shorthand for a [`PickError::Configuration`] error.
    pub fn configuration(what: impl Into<String>) -> Self {
        Self::Configuration { what: what.into() }
    }

    /// Returns whether this error resolves locally to "no selection".
    ///
    /// Everything else is fatal and propagates to the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::OutOfRangeCoordinate { .. } | Self::DecodeMismatch { .. }
        )
    }
}

/// A specialized Result type for chromapick operations.
pub type Result<T> = std::result::Result<T, PickError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        let out_of_range = PickError::OutOfRangeCoordinate {
            x: -1,
            y: 0,
            width: 10,
            height: 10,
        };
        assert!(out_of_range.is_recoverable());
        assert!(PickError::DecodeMismatch {
            value: 12,
            object_count: 10
        }
        .is_recoverable());
        assert!(!PickError::configuration("missing uniform 'color'").is_recoverable());
        assert!(!PickError::Render("device lost".into()).is_recoverable());
    }

    #[test]
    fn test_display_messages() {
        let err = PickError::configuration("missing vertex attribute @location(0)");
        assert_eq!(
            err.to_string(),
            "picking configuration error: missing vertex attribute @location(0)"
        );
        let err = PickError::DecodeMismatch {
            value: 42,
            object_count: 10,
        };
        assert_eq!(
            err.to_string(),
            "decoded value 42 is not a valid handle for 10 objects"
        );
    }
}
