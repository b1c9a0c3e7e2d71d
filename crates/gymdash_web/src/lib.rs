//! Leptos front end for the gym training dashboard.
//!
//! Page fragments are fetched from the server and mounted into the content
//! pane as HTML. [`scan`] reads their controls into a [`gymdash::form::Form`],
//! [`events`] turns change and click targets into [`gymdash::session::Input`]s,
//! and [`snapshot`] is what the header, modals and log pane render from.
//! Those three have no DOM dependency and run in native tests.
//!
//! `start` (wasm32 with `--features web`) mounts the app and wires it to the
//! server the page was loaded from.

pub mod events;
pub mod scan;
pub mod snapshot;

#[cfg(all(feature = "web", target_arch = "wasm32"))]
mod web;

#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub use web::start;
