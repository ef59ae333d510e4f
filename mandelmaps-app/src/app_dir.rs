//! Directory where the executable lives. Used for the config file and exported
//! images so that data is stored next to the binary when run standalone.

use std::path::PathBuf;

/// Directory containing the running executable. Falls back to current directory if unavailable.
pub fn exe_directory() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Default location of `mandelmaps.json`.
pub fn config_path() -> PathBuf {
    exe_directory().join("mandelmaps.json")
}

/// Directory for exported images.
pub fn images_directory() -> PathBuf {
    exe_directory().join("images")
}
