//! Error types for the continuous manager.

use core::fmt;

/// Failure to render one section into its view.
///
/// Render failures are isolated to the view that produced them: the manager
/// hides the view and keeps going.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderError {
    /// Spine index of the section that failed.
    pub section_index: usize,
    /// Human-readable reason reported by the view.
    pub message: String,
}

impl RenderError {
    /// Build a render error for `section_index`.
    pub fn new(section_index: usize, message: impl Into<String>) -> Self {
        Self {
            section_index,
            message: message.into(),
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "render failed for section {}: {}",
            self.section_index, self.message
        )
    }
}

impl std::error::Error for RenderError {}

/// Errors surfaced by [`crate::ContinuousManager`] operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ManagerError {
    /// The manager was built outside a tokio runtime.
    NoRuntime,
    /// The task queue worker stopped before the task settled.
    QueueClosed,
    /// A section was added twice to the view window.
    DuplicateSection { section_index: usize },
    /// Settings could not be parsed.
    Config(String),
}

impl fmt::Display for ManagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRuntime => write!(f, "continuous manager requires a tokio runtime"),
            Self::QueueClosed => write!(f, "task queue closed before the task settled"),
            Self::DuplicateSection { section_index } => write!(
                f,
                "section {} is already mounted in the view window",
                section_index
            ),
            Self::Config(msg) => write!(f, "invalid manager settings: {}", msg),
        }
    }
}

impl std::error::Error for ManagerError {}

impl From<serde_json::Error> for ManagerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_error_display_names_section() {
        let err = RenderError::new(4, "iframe detached");
        assert_eq!(
            err.to_string(),
            "render failed for section 4: iframe detached"
        );
    }

    #[test]
    fn duplicate_section_display_names_section() {
        let err = ManagerError::DuplicateSection { section_index: 2 };
        assert!(err.to_string().contains("section 2"));
    }
}
