//! Shared test utilities for relsync.

pub mod mock_backend;
