use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::model::config::{CaptureConfig, ConfigError};
use crate::model::format::CaptureMode;

/// Config file looked up in the working directory when no path is given
pub const CONFIG_FILE: &str = "quickcap.toml";

/// `explicit` if given, otherwise `quickcap.toml` in `dir`
pub fn config_path(explicit: Option<&Path>, dir: &Path) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| dir.join(CONFIG_FILE))
}

/// Read the config, returning both the parsed config and the raw
/// toml_edit document for round-trip-safe editing. A missing file yields
/// the defaults and an empty document.
pub fn read_config(path: &Path) -> Result<(CaptureConfig, toml_edit::DocumentMut), ConfigError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            String::new()
        }
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    let config: CaptureConfig = toml::from_str(&text)?;
    let doc: toml_edit::DocumentMut = text.parse()?;
    Ok((config, doc))
}

/// Read just the parsed config
pub fn load_config(path: &Path) -> Result<CaptureConfig, ConfigError> {
    read_config(path).map(|(config, _)| config)
}

/// Write the config document back to disk, preserving formatting.
pub fn write_config(path: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ConfigError> {
    atomic_write(path, doc.to_string().as_bytes()).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Update `capture.default_mode` in the config document
pub fn set_default_mode(doc: &mut toml_edit::DocumentMut, mode: CaptureMode) {
    if !doc.contains_key("capture") {
        doc["capture"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    doc["capture"]["default_mode"] = toml_edit::value(mode.as_str());
}

/// Write `content` to `path` atomically using a temp file + rename.
fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
