use crate::domain::models::ConfigFile;
use std::path::PathBuf;

fn config_path() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")?;
    Ok(PathBuf::from(home).join(".config/apkvault/config.toml"))
}

/// Loads the optional user config. A missing file means defaults; a present
/// but malformed file is a hard error rather than silently ignored settings.
pub fn load_config() -> anyhow::Result<ConfigFile> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(ConfigFile::default());
    }
    let raw = std::fs::read_to_string(&path)?;
    Ok(toml::from_str(&raw)?)
}
