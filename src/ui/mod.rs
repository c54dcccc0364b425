//! Terminal user interface.
//!
//! - `loop_runner` - main event loop and terminal management
//! - `input` - keyboard input handling
//! - `render` - screen layout and the facet header
//! - `grid` - the card grid
//! - `picker` - collection facet overlay
//! - `status` - status bar

mod grid;
mod input;
mod loop_runner;
mod picker;
mod render;
mod status;

pub use loop_runner::{run, Action};
