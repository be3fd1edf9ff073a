//! Settings for the player, catalog, UI and logging.
//!
//! Values come from defaults, an optional TOML file and `ENCORE__*`
//! environment variables, in increasing order of precedence.

mod load;
mod schema;

pub use schema::*;
