//! Test utilities for Hookline services.
//!
//! Provides `TestDestination`, a local webhook receiver with scripted answers.
//! Import in tests only, never in production code.

pub mod destination;

pub use destination::{ReceivedDelivery, TestDestination, unreachable_url};
