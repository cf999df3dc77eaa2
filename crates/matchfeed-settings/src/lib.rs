//! # matchfeed-settings
//!
//! Configuration for the matchfeed hub, loaded from three layers
//! (lowest to highest priority):
//! 1. **Compiled defaults**: [`MatchfeedSettings::default()`]
//! 2. **Settings file**: `~/.matchfeed/settings.json`, deep-merged over defaults
//! 3. **Environment variables**: `MATCHFEED_*` overrides
//!
//! Settings are loaded once at startup and passed down explicitly.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings_from_path, settings_path};
pub use types::{HubSettings, LoggingSettings, MatchfeedSettings, ServerSettings};
