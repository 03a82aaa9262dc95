//! Analysis pipeline that mines fuzzer ioctl interface descriptions out of a
//! pre-built code-fact database (CodeDB).
//!
//! The crate is organized as one module per pipeline stage:
//!
//! - [`codedb`]: the read-only fact-store object model this crate consumes.
//! - [`dispatch`]: finds dispatch-table instances and their ioctl slot.
//! - [`ioctl`]: mines `(label, value, root_type)` command tuples.
//! - [`typegraph`]: computes the acyclic type-dependency closure.
//! - [`cycles`]: marks pointer fields that loop back into an ancestor type.
//! - [`bounds`]: detects pointer/length field pairings at user-copy callsites.
//! - [`namebook`] and [`emitter`]: render the analysis into the description
//!   language.
//! - [`pipeline`]: wires the stages together and isolates per-handler failure.

pub mod bounds;
pub mod codedb;
pub mod cycles;
pub mod dispatch;
pub mod emitter;
pub mod error;
pub mod handler;
pub mod ioctl;
pub mod namebook;
pub mod pipeline;
pub mod typegraph;

pub use codedb::{CodeDb, MemoryCodeDb};
pub use dispatch::SupportedSyscall;
pub use emitter::{EmittedHandler, Emitter};
pub use error::{HandlerOutcome, PipelineError};
pub use handler::HandlerRecord;
pub use pipeline::Pipeline;
