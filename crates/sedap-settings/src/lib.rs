//! # sedap-settings
//!
//! Configuration for the bridge host, loaded from three layers (in priority
//! order):
//! 1. **Compiled defaults**: [`SedapSettings::default()`]
//! 2. **User file**: `~/.sedap/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `SEDAP_*` overrides (highest priority)
//!
//! The bridge itself reads nothing from here; the host passes the relevant
//! values (such as `bridge.logEnabled`) into each bridge it creates.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
