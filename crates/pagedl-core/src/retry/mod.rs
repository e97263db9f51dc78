//! Recovery from host-reported submission errors.
//!
//! The host rejects some requests with messages that point at a fixable
//! problem (bad filename characters, unsupported options). This module
//! recognises those messages and rewrites the request for another attempt;
//! [`RetryPolicy`] bounds how many attempts a submission chain may make.

mod classify;
mod policy;
mod resolve;

pub use classify::{classify, ErrorSignals};
pub use policy::RetryPolicy;
pub use resolve::{replace_non_ascii_runs, resolve, Resolution};
