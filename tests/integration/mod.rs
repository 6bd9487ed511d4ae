//! Integration Tests Module
//!
//! End-to-end tests of the question pipeline against a scripted model
//! provider and an in-memory record snapshot.

// Shared fixtures
mod support;

// Classification rules, model fallback and cache behavior
mod classifier_test;

// Query synthesis, validation and the repair loop
mod synthesizer_test;

// Strategy plans, fallback, timeouts and answer caching
mod orchestrator_test;

// Tool selection and dispatch through the orchestrator
mod tool_calling_test;

// Answer sanitizing and the quality gate
mod quality_gates_test;
