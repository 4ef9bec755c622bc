use std::fs;
use std::path::{Path, PathBuf};

use crate::io::recovery::atomic_write;
use crate::model::config::Settings;

/// Error type for the settings file
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid settings: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("invalid settings document: {0}")]
    DocumentError(#[from] toml_edit::TomlError),
}

/// Read settings from `path`. A missing file yields the defaults.
pub fn read_settings(path: &Path) -> Result<Settings, SettingsError> {
    match read_text(path)? {
        Some(text) => Ok(toml::from_str(&text)?),
        None => Ok(Settings::default()),
    }
}

/// Set or clear `default_note_id`, keeping the rest of the file as written.
pub fn set_default_note_id(path: &Path, note_id: Option<&str>) -> Result<(), SettingsError> {
    let text = read_text(path)?.unwrap_or_default();
    let mut doc: toml_edit::DocumentMut = text.parse()?;
    match note_id {
        Some(id) => doc["default_note_id"] = toml_edit::value(id),
        None => {
            doc.remove("default_note_id");
        }
    }
    atomic_write(path, doc.to_string().as_bytes()).map_err(|e| SettingsError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn read_text(path: &Path) -> Result<Option<String>, SettingsError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SettingsError::ReadError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::LogSortOrder;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let settings = read_settings(&tmp.path().join("timeslip.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn reads_partial_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("timeslip.toml");
        fs::write(&path, "log_sort_order = \"descending\"\ndefault_date_range_days = 30\n").unwrap();
        let settings = read_settings(&path).unwrap();
        assert_eq!(settings.log_sort_order, LogSortOrder::Descending);
        assert_eq!(settings.default_date_range_days, 30);
        assert_eq!(settings.log_note_tag, "time-slip");
    }

    #[test]
    fn invalid_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("timeslip.toml");
        fs::write(&path, "enforce_sorting = \"sometimes\"\n").unwrap();
        assert!(matches!(read_settings(&path), Err(SettingsError::ParseError(_))));
    }

    #[test]
    fn default_note_id_edit_preserves_comments() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("timeslip.toml");
        let original = "# my settings\nlog_note_tag = \"hours\" # custom tag\n";
        fs::write(&path, original).unwrap();

        set_default_note_id(&path, Some("abc123")).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with(original));
        assert!(written.contains("default_note_id = \"abc123\""));
        assert_eq!(
            read_settings(&path).unwrap().default_note_id.as_deref(),
            Some("abc123")
        );

        set_default_note_id(&path, None).unwrap();
        let cleared = fs::read_to_string(&path).unwrap();
        assert!(cleared.starts_with(original));
        assert!(!cleared.contains("default_note_id"));
    }

    #[test]
    fn default_note_id_creates_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("timeslip.toml");
        set_default_note_id(&path, Some("n1")).unwrap();
        assert_eq!(read_settings(&path).unwrap().default_note_id.as_deref(), Some("n1"));
    }
}
