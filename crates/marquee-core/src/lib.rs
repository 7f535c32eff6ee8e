//! Configuration and persistence for Marquee.
//!
//! - [`config`]: layered TOML configuration (`~/.marquee/config.toml`, `./.marqueerc`)
//! - [`store`]: the key-value snapshot store behind saved work
//! - [`project`]: project snapshots holding a business profile and saved results

pub mod config;
pub mod error;
pub mod project;
pub mod store;

pub use config::{MarqueeConfig, PacingSettings, RetrySettings};
pub use error::{ConfigError, ConfigResult, StoreError, StoreResult};
pub use project::{Project, ProjectSummary};
pub use store::{FileStore, MemoryStore, SnapshotStore, load_json, save_json};
