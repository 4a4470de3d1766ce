//! Terminal status of a result set.

use std::fmt;

/// Outcome reported by the `DataSetCompletion` frame.
///
/// This is the authoritative result of the query. Delivered tables do not
/// make a query successful on their own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionStatus {
    pub has_errors: bool,
    pub cancelled: bool,
    pub exception: Option<String>,
}

/// Classification of a [`CompletionStatus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Succeeded,
    /// The query was cancelled; a normal terminal outcome.
    Cancelled,
    /// The service reported errors. Carries the exception text, if any.
    Failed(String),
}

impl CompletionStatus {
    /// Exception text, or empty when there is none.
    pub fn exception_text(&self) -> &str {
        self.exception.as_deref().unwrap_or("")
    }

    /// Check if the query failed (errors flagged or a non-empty exception).
    pub fn is_failure(&self) -> bool {
        self.has_errors || !self.exception_text().is_empty()
    }

    pub fn outcome(&self) -> QueryOutcome {
        if self.is_failure() {
            QueryOutcome::Failed(self.exception_text().to_string())
        } else if self.cancelled {
            QueryOutcome::Cancelled
        } else {
            QueryOutcome::Succeeded
        }
    }

    /// The completion line as written to the rendered output.
    pub fn line(&self, frame_index: usize) -> String {
        format!(
            "[{}] DataSetCompletion(CompletionFrame): HasErrors={}, Cancelled={}, Exception={}",
            frame_index,
            self.has_errors,
            self.cancelled,
            self.exception_text()
        )
    }
}

impl fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOutcome::Succeeded => f.write_str("query succeeded"),
            QueryOutcome::Cancelled => f.write_str("query cancelled"),
            QueryOutcome::Failed(message) if message.is_empty() => {
                f.write_str("query failed")
            }
            QueryOutcome::Failed(message) => write!(f, "query failed: {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_completion_succeeds() {
        let status = CompletionStatus::default();
        assert!(!status.is_failure());
        assert_eq!(status.outcome(), QueryOutcome::Succeeded);
    }

    #[test]
    fn test_errors_win_over_cancellation() {
        let status = CompletionStatus {
            has_errors: true,
            cancelled: true,
            exception: Some("X".to_string()),
        };
        assert_eq!(status.outcome(), QueryOutcome::Failed("X".to_string()));
        assert_eq!(status.outcome().to_string(), "query failed: X");
    }

    #[test]
    fn test_exception_alone_is_failure() {
        let status = CompletionStatus {
            exception: Some("Semantic error".to_string()),
            ..Default::default()
        };
        assert!(status.is_failure());
    }

    #[test]
    fn test_cancelled_is_not_failure() {
        let status = CompletionStatus {
            cancelled: true,
            ..Default::default()
        };
        assert!(!status.is_failure());
        assert_eq!(status.outcome(), QueryOutcome::Cancelled);
    }

    #[test]
    fn test_completion_line() {
        let status = CompletionStatus::default();
        assert_eq!(
            status.line(3),
            "[3] DataSetCompletion(CompletionFrame): HasErrors=false, Cancelled=false, Exception="
        );
    }
}
