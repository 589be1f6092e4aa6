//! Configuration model and YAML loading.

pub mod loader;
pub mod model;

pub use loader::{load_settings, LoadError};
pub use model::{Config, Global, SiteConfig};
