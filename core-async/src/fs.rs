//! Async filesystem helpers re-exported from Tokio.

pub use tokio::fs::{
    create_dir_all, metadata, read, remove_dir_all, remove_file, try_exists, write, File,
    OpenOptions,
};
