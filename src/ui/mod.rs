//! Terminal front end split across logical submodules.

mod app;
mod forms;
mod helpers;
pub mod label;
mod screens;
mod terminal;

pub use app::App;
pub use label::{elide, ElideMode, ElidedLabel};
pub use terminal::run_app;
