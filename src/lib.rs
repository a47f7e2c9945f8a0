//! Sectioned configuration files with context overrides and `${key}` references.
//!
//! A document groups `key = value` lines under `[Section]` headers. Loading
//! merges the `[Default]` section with one optionally selected context,
//! resolves whole-value `${key}` references, and hands the result to a
//! [`Configuration`] store with typed accessors.

pub mod config;
mod error;
pub mod store;

pub use config::{Config, ConfigError, ConfigSource, FileSource, Properties, StreamSource};
pub use error::Error;
pub use store::{Configuration, ConfigurationBuilder, FromValue};
