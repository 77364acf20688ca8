//! Tests for the minimizers

// Grid search against a running worker
mod grid_search_tests;
