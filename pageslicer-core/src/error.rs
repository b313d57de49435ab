use std::path::PathBuf;
use thiserror::Error;

use crate::geometry::BoundingBox;

#[derive(Error, Debug)]
pub enum SliceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid annotation file{}: {message}", display_path(.path))]
    InvalidAnnotations {
        path: Option<PathBuf>,
        message: String,
    },

    #[error("Page index {page} out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("Invalid aspect ratio '{0}': use formats like '3:4', '16/9' or '0.75'")]
    InvalidAspectRatio(String),

    #[error("Aspect ratio {ratio} is too small (minimum is {minimum})")]
    AspectRatioTooSmall { ratio: f64, minimum: f64 },

    #[error("Annotations contain no regions to extract")]
    NoRegions,

    #[error("Invalid bounding box {bbox}: {reason}")]
    InvalidGeometry { bbox: BoundingBox, reason: String },

    #[error("{tool} failed: {message}")]
    ToolInvocation { tool: String, message: String },

    #[error("Operation cancelled")]
    Cancelled,
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" {}", path.display()),
        None => String::new(),
    }
}

/// Coarse classification of a [`SliceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad annotations, page index, or aspect ratio supplied by the caller
    Input,
    /// A page operation backend failed
    ToolInvocation,
    /// A degenerate bounding box reached the tiling engine
    Geometry,
    /// The run was cancelled before it finished
    Cancelled,
    /// Local filesystem failure (scratch space, output staging)
    Io,
}

impl SliceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SliceError::InvalidAnnotations { .. }
            | SliceError::PageOutOfRange { .. }
            | SliceError::InvalidAspectRatio(_)
            | SliceError::AspectRatioTooSmall { .. }
            | SliceError::NoRegions => ErrorKind::Input,
            SliceError::ToolInvocation { .. } => ErrorKind::ToolInvocation,
            SliceError::InvalidGeometry { .. } => ErrorKind::Geometry,
            SliceError::Cancelled => ErrorKind::Cancelled,
            SliceError::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        SliceError::ToolInvocation {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub(crate) fn annotations(path: Option<PathBuf>, message: impl Into<String>) -> Self {
        SliceError::InvalidAnnotations {
            path,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SliceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind as IoErrorKind};

    #[test]
    fn test_slice_error_display() {
        let error = SliceError::PageOutOfRange {
            page: 7,
            page_count: 3,
        };
        assert_eq!(
            error.to_string(),
            "Page index 7 out of range (document has 3 pages)"
        );
    }

    #[test]
    fn test_invalid_annotations_display_with_and_without_path() {
        let error = SliceError::annotations(Some(PathBuf::from("boxes.json")), "expected object");
        assert_eq!(
            error.to_string(),
            "Invalid annotation file boxes.json: expected object"
        );

        let error = SliceError::annotations(None, "expected object");
        assert_eq!(error.to_string(), "Invalid annotation file: expected object");
    }

    #[test]
    fn test_tool_invocation_display() {
        let error = SliceError::tool("pdfcrop", "exit status 1");
        assert_eq!(error.to_string(), "pdfcrop failed: exit status 1");
    }

    #[test]
    fn test_slice_error_from_io_error() {
        let io_error = IoError::new(IoErrorKind::NotFound, "file not found");
        let error = SliceError::from(io_error);

        match error {
            SliceError::Io(ref err) => assert_eq!(err.kind(), IoErrorKind::NotFound),
            _ => panic!("Expected IO error variant"),
        }
        assert_eq!(error.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_error_kinds() {
        let cases = vec![
            (SliceError::annotations(None, "bad"), ErrorKind::Input),
            (
                SliceError::PageOutOfRange {
                    page: 1,
                    page_count: 1,
                },
                ErrorKind::Input,
            ),
            (SliceError::InvalidAspectRatio("x".to_string()), ErrorKind::Input),
            (
                SliceError::AspectRatioTooSmall {
                    ratio: 0.001,
                    minimum: 0.01,
                },
                ErrorKind::Input,
            ),
            (SliceError::NoRegions, ErrorKind::Input),
            (
                SliceError::InvalidGeometry {
                    bbox: BoundingBox::new(0.0, 0.0, 0.0, 10.0),
                    reason: "zero width".to_string(),
                },
                ErrorKind::Geometry,
            ),
            (SliceError::tool("pdftk", "boom"), ErrorKind::ToolInvocation),
            (SliceError::Cancelled, ErrorKind::Cancelled),
        ];

        for (error, expected) in cases {
            assert!(!error.to_string().is_empty());
            assert_eq!(error.kind(), expected, "{error}");
        }
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SliceError>();
    }
}
