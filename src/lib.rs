//! Songbook library manager: song metadata, chord diagrams, new-song
//! templates and imports between songbooks, with a Ratatui front end.
//!
//! The binary wires these modules together; everything is public so other
//! tooling can reuse the parsing and import pieces without the TUI.
pub mod chord;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod library;
pub mod logging;
pub mod models;
pub mod newsong;
pub mod ui;

pub use chord::{Chord, Instrument};
pub use config::AppConfig;
pub use db::{data_dir, ensure_schema, home_dir};
pub use error::{ChordError, NewSongError};
pub use import::{FileCopier, ImportPlan, ResolveMode};
pub use library::Library;
pub use models::Song;
pub use newsong::NewSong;
pub use ui::{run_app, App};
