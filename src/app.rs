//! Application module: exposes the app model used by the TUI and runtime.
//!
//! The `App` model lives in `app::model` and holds the catalog, the browsing
//! context, the selection and the last playback snapshot.

mod model;

pub use model::*;
