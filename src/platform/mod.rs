//! Platform-specific module for Windows utilities.
//!
//! Holds the registry-backed preferences store.

pub mod preferences;

pub use preferences::{PreferencesError, RegistryPreferences};
