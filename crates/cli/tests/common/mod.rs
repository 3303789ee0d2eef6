//! Common utilities for integration tests


pub use fixtures::TestVault;
