//! Capture-side plumbing between an audio callback and the analyzer.

pub mod capture;
pub mod ring_buffer;
