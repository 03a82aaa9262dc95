//! Error hierarchy surfaced to the pipeline driver (see design notes on the
//! analysis pipeline for the full kind list).

use std::fmt;

/// Errors that are fatal to the whole batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// No non-forward dispatch-table type was found in the CodeDB.
    DispatchKindMissing,
    /// A pass ran without one of its predecessors having filled a required field.
    PrerequisiteMissing { pass: &'static str, handler: String },
    /// A pass raised an unexpected failure.
    ///
    /// Every pass in this crate is a total function over a `HandlerRecord`:
    /// a condition the original tooling treats as fatal elsewhere (a missing
    /// dispatch kind, a prerequisite stage that never ran) already has its
    /// own dedicated variant above, and everything else a pass can observe
    /// (an unresolved type id, a dangling call target, an empty switch) is
    /// modeled as "found nothing" rather than an error, exactly as
    /// `passes.py`'s own `except Exception: return <empty>` guards do. No
    /// pass constructs this variant as a result; it exists so a future pass
    /// that legitimately needs to abort the batch (rather than discard or
    /// skip one handler) has a variant to report through instead of growing
    /// a fifth `PipelineError` case.
    PassFailure {
        pass: &'static str,
        handler: String,
        message: String,
    },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::DispatchKindMissing => {
                write!(f, "no non-forward dispatch-table type found in CodeDB")
            }
            PipelineError::PrerequisiteMissing { pass, handler } => write!(
                f,
                "pass {pass} ran for handler {handler} without its prerequisite stage"
            ),
            PipelineError::PassFailure {
                pass,
                handler,
                message,
            } => write!(f, "pass {pass} failed for handler {handler}: {message}"),
        }
    }
}

impl std::error::Error for PipelineError {}

/// Non-fatal outcome of running one handler through the pipeline: either it
/// survived (possibly with some optional passes skipped) or it was discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    Emitted,
    Discarded { pass: &'static str },
}
