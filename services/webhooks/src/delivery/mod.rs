//! Delivery engine: retry policy, attempt recording, the per-pair pipeline
//! and the bounded queue drained by worker tasks.

pub mod pipeline;
pub mod queue;
pub mod recorder;
pub mod retry;
