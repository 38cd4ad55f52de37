use std::path::PathBuf;

use directories::ProjectDirs;

const PROJECT_ROOT: &str = env!("CARGO_MANIFEST_DIR");
pub const ASSET_DIR_ENV: &str = "TIMETRACK_ASSET_DIR";

/// Directory holding `config.json` and the sqlite file.
///
/// `TIMETRACK_ASSET_DIR` wins when set. Debug builds fall back to `dev_assets`
/// in the workspace, release builds to the platform data dir.
pub fn asset_dir() -> PathBuf {
    let path = match std::env::var(ASSET_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir.trim()),
        _ => default_asset_dir(),
    };

    if !path.exists()
        && let Err(err) = std::fs::create_dir_all(&path)
    {
        tracing::warn!("Failed to create asset directory {}: {err}", path.display());
    }
    path
}

fn default_asset_dir() -> PathBuf {
    if cfg!(debug_assertions) {
        return PathBuf::from(PROJECT_ROOT).join("../../dev_assets");
    }
    // macOS ~/Library/Application Support, Linux ~/.local/share, Windows %APPDATA%
    ProjectDirs::from("dev", "timetrack", "timetrack")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".timetrack"))
}

pub fn config_path() -> PathBuf {
    asset_dir().join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_lives_in_asset_dir() {
        let path = config_path();
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("config.json"));
        assert_eq!(path.parent(), Some(asset_dir().as_path()));
    }
}
