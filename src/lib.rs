//! SeeFood: hot dog or not hot dog.
//!
//! Photos are classified in the browser. This crate serves the detector page
//! and keeps results in a short-lived, in-memory share store so they can be
//! passed around as links.

pub mod config;
pub mod detect;
pub mod logging;
pub mod server;
pub mod share;
