//! Binary-side orchestration: output layout, progress and the archive run.

mod naming;
mod progress;
mod runtime;

pub(crate) use runtime::run;
