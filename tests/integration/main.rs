//! Integration tests for relsync.
//!
//! Reconciliation and workflow runs go through the in-memory
//! `MockReleaseBackend`; provider wire behavior goes through `httpmock`.

mod github_flow_tests;
mod properties;
mod reconcile_tests;
mod workflow_tests;
