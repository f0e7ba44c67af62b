//! Glas Runtime: program evaluation over the core value model
//!
//! Programs are values (`program`), analyzed for their static stack effect
//! (`arity`) and evaluated with backtracking and transactional effects
//! (`interp`). The only boundary to the outside world is the effect sink
//! (`effects`); `host` provides the minimal log/load implementation.
//!
//! Key design principles:
//! - failure is boolean and total: a failed sub-program leaves no trace on
//!   the data stack, the handler stack, or the effect sink
//! - handlers are plain programs with a state register, not closures
//! - the evaluator owns no rollback log; persistence of values plus the
//!   sink's transaction frames carry all of it

pub mod arity;
pub mod effects;
pub mod host;
pub mod interp;
pub mod program;

// Re-export key types and functions
pub use arity::static_arity;
pub use effects::{EffectSink, NullSink, TxnBuffer};
pub use host::{HostSink, LogLevel, LogMessage, log_request};
pub use interp::{HandlerFrame, RunEnv, interpret};
pub use program::{Op, ParseError, Prog, parse, print, try_parse};
