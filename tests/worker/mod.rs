//! Tests for the operation queue and the device worker

// Priority queue behaviour
mod queue_tests;

// Worker lifecycle, cascades and failure handling
mod worker_tests;

// Concurrent callers
mod concurrency_tests;
