//! Pipeline failure taxonomy.
//!
//! Both variants are deterministic given the same inputs: the pipeline
//! never retries internally, and no caller-visible state is mutated on
//! the failure path.

/// Errors surfaced by the stack counting pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// No usable stack in the scene: either no detection cleared the
    /// confidence threshold, or the derived region of interest was
    /// degenerate. Recovery (e.g. re-capturing the image) belongs to
    /// the caller.
    NoPileDetected {
        /// Raw detections handed to the pipeline.
        n_detections: usize,
        /// Detections that cleared the confidence threshold.
        n_confident: usize,
    },
    /// No template is configured for the requested pile type. This is a
    /// configuration error, not a transient condition.
    TemplateNotFound {
        /// The pile type that was requested.
        pile_id: u32,
    },
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoPileDetected {
                n_detections,
                n_confident,
            } => write!(
                f,
                "no pile detected: {} of {} detections cleared the confidence threshold",
                n_confident, n_detections
            ),
            Self::TemplateNotFound { pile_id } => {
                write!(f, "no template configured for pile type {}", pile_id)
            }
        }
    }
}

impl std::error::Error for PipelineError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_pile_type() {
        let err = PipelineError::TemplateNotFound { pile_id: 7 };
        assert!(err.to_string().contains("pile type 7"));
    }

    #[test]
    fn display_reports_detection_counts() {
        let err = PipelineError::NoPileDetected {
            n_detections: 5,
            n_confident: 0,
        };
        assert!(err.to_string().contains("0 of 5"));
    }
}
