//! The pass trait and the driver that runs a batch of handlers through it.

use tracing::{debug, error, info, warn};

use crate::bounds::PointerBoundsAnalyzer;
use crate::codedb::CodeDb;
use crate::cycles::PointerCycleAnalyzer;
use crate::dispatch::{self, SupportedSyscall};
use crate::error::{HandlerOutcome, PipelineError};
use crate::handler::HandlerRecord;
use crate::ioctl::IoctlAnalyzer;
use crate::typegraph::TypeGraphAnalyzer;

/// One stage of the analysis pipeline, run once per surviving handler.
///
/// `process` returns `Ok(true)` when the pass produced something useful,
/// `Ok(false)` when it ran cleanly but found nothing (the caller decides,
/// via [`FailPolicy`], whether that discards the handler or just skips the
/// pass), and `Err` for an unexpected failure that aborts the whole batch.
pub trait Pass {
    fn name(&self) -> &'static str;
    fn process(&self, db: &dyn CodeDb, handler: &mut HandlerRecord) -> Result<bool, PipelineError>;
}

/// What to do with a handler when a pass returns `Ok(false)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FailPolicy {
    /// Drop the handler from the batch; it will not be emitted.
    Discard,
    /// Keep the handler going; the pass simply found nothing to record.
    Skip,
}

/// Runs the dispatch scan followed by the four analysis passes over every
/// handler: log, apply, route on outcome.
pub struct Pipeline {
    supported: Vec<SupportedSyscall>,
    passes: Vec<(Box<dyn Pass>, FailPolicy)>,
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline {
            supported: dispatch::default_supported_syscalls(),
            passes: vec![
                (Box::new(IoctlAnalyzer::new()), FailPolicy::Discard),
                (Box::new(TypeGraphAnalyzer::new()), FailPolicy::Discard),
                (Box::new(PointerCycleAnalyzer::new()), FailPolicy::Skip),
                (Box::new(PointerBoundsAnalyzer::new()), FailPolicy::Skip),
            ],
        }
    }

    pub fn with_supported_syscalls(mut self, supported: Vec<SupportedSyscall>) -> Self {
        self.supported = supported;
        self
    }

    /// Scans `db` for handlers, runs every handler through every pass, and
    /// returns the survivors alongside a report of what happened to the rest.
    pub fn run(&self, db: &dyn CodeDb) -> Result<(Vec<HandlerRecord>, Vec<(String, HandlerOutcome)>), PipelineError> {
        let handlers = dispatch::collect_handlers(db, &self.supported)?;
        info!(count = handlers.len(), "collected dispatch handlers");

        let mut survivors = Vec::new();
        let mut report = Vec::new();

        for handler in handlers {
            let name = handler.name.clone();
            match self.run_handler(db, handler)? {
                Some(handler) => {
                    report.push((name, HandlerOutcome::Emitted));
                    survivors.push(handler);
                }
                None => {
                    // run_handler already logged which pass discarded it;
                    // the report entry just needs a representative tag.
                    report.push((name, HandlerOutcome::Discarded { pass: "pipeline" }));
                }
            }
        }

        Ok((survivors, report))
    }

    fn run_handler(&self, db: &dyn CodeDb, mut handler: HandlerRecord) -> Result<Option<HandlerRecord>, PipelineError> {
        for (pass, policy) in &self.passes {
            let pass_name = pass.name();
            debug!(handler = %handler.name, pass = pass_name, "running pass");
            match pass.process(db, &mut handler) {
                Ok(true) => {}
                Ok(false) => match policy {
                    FailPolicy::Discard => {
                        warn!(handler = %handler.name, pass = pass_name, "discarding handler");
                        return Ok(None);
                    }
                    FailPolicy::Skip => {
                        debug!(handler = %handler.name, pass = pass_name, "pass found nothing, continuing");
                    }
                },
                Err(err) => {
                    error!(handler = %handler.name, pass = pass_name, %err, "pass failed");
                    return Err(err);
                }
            }
        }
        Ok(Some(handler))
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Pipeline::new()
    }
}
