//! Persistence module split across logical submodules.

mod connection;
mod settings;
mod songs;

pub use connection::{data_dir, ensure_schema, home_dir, init_schema};
pub use settings::{get_setting, set_setting, IMPORT_DIR_KEY, LIBRARY_DIR_KEY};
pub use songs::{fetch_library_songs, replace_library_songs};
