//! Configuration module for Kino.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    CacheSettings, GeneralSettings, LlmSettings, OmdbSettings, SearchSettings, Settings,
    YoutubeSettings,
};
