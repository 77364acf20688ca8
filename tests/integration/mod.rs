//! Integration tests for the simfit-rs library
//!
//! These tests exercise persistence, synthetic data and fitting together.

// Saved model documents
pub mod persistence;

// Fitting synthetic observations end to end
pub mod synthetic_fit;
