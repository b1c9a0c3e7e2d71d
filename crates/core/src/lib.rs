//! # gymdash
//!
//! Client-side interaction layer of a reinforcement-learning training
//! dashboard: start and stop a training job, poll its status, manage named
//! configurations, and keep the per-game environment settings in step with
//! the backend.
//!
//! The state is typed and host-agnostic. The same components drive the
//! browser front end (`gymdash_web`) and the native command-line client.
//!
//! ## Quick Start
//!
//! ```
//! use gymdash::batch::{choice_for, BatchSizeChoice};
//!
//! // 128 steps on 4 environments: every divisor of 512, second-largest preselected
//! let BatchSizeChoice::Sizes { sizes, default } = choice_for(128, 4) else {
//!     unreachable!()
//! };
//! assert_eq!(sizes.first(), Some(&1));
//! assert_eq!(default, 256);
//! ```
//!
//! ## Feature Flags
//!
//! - `http` (default): reqwest implementation of [`api::Backend`]
//! - `native` (default): tokio-backed [`runtime::Runtime`]
//! - `cli` (default): the `gymdash-cli` binary and its settings file
//!
//! ## Modules
//!
//! - [`shell`]: page navigation and input routing
//! - [`status`]: training and render status polling
//! - [`config_sync`]: named configurations
//! - [`environment`]: per-game settings, with [`batch`] and [`characters`]
//! - [`form`]: the typed form every component reads and writes

pub mod api;
pub mod batch;
pub mod characters;
pub mod config;
pub mod config_sync;
pub mod environment;
pub mod error;
pub mod form;
pub mod logs;
#[cfg(feature = "cli")]
pub mod paths;
pub mod runtime;
pub mod session;
pub mod settings;
pub mod shaders;
pub mod shell;
pub mod status;
pub mod tooltips;
pub mod ui_model;

#[cfg(test)]
mod testing;

/// Prelude module for convenient imports.
///
/// ```
/// use gymdash::prelude::*;
/// ```
pub mod prelude {
    pub use crate::api::Backend;
    pub use crate::config::{StoredConfig, TrainingConfig};
    pub use crate::error::{ApiError, ConfigError, DashError};
    pub use crate::form::{Field, FieldName, Form, Section};
    pub use crate::runtime::Runtime;
    pub use crate::session::{Input, Notice, NoticeLevel, Session};
    pub use crate::shell::{Dashboard, FragmentHost};
    pub use crate::ui_model::Page;
}
