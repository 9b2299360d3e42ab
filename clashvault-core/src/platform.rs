//! Platform-specific paths for application data.

use std::path::{Path, PathBuf};

/// Get the platform-specific data directory for storing application data
pub fn get_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(dirs::data_dir)
        .or_else(|| dirs::home_dir().map(|h| h.join(".data")))
        .unwrap_or_else(|| PathBuf::from("."));

    base.join("clashvault")
}

/// Ensure the data directory exists, creating it if necessary
pub fn ensure_data_dir() -> std::io::Result<PathBuf> {
    let dir = get_data_dir();
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Root directory holding one subdirectory per imported profile.
pub fn profiles_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("profiles")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_is_namespaced() {
        assert!(get_data_dir().to_string_lossy().ends_with("clashvault"));
    }

    #[test]
    fn profiles_dir_is_under_data_dir() {
        let data = PathBuf::from("/tmp/data");
        assert_eq!(profiles_dir(&data), PathBuf::from("/tmp/data/profiles"));
    }
}
