//! Integration tests for the parameter system
//!
//! These tests verify that parameters, registries and the flattening layer
//! behave correctly together.

// Tests for the Parameter struct
mod parameter_tests;

// Tests for registries and their persisted form
mod registry_tests;
