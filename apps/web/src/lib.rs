//! HowdyHire page behaviors: reveal-on-scroll and the resume classification form.

pub mod bootstrap;
pub mod classify;
pub mod config;
pub mod dom;
pub mod errors;
pub mod reveal;
pub mod schedule;
