use crate::config::schema::{Settings, ValidationError};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming a settings file.
pub const CONFIG_ENV: &str = "LINKAGE_PATCHER_CONFIG";

/// Settings file looked up under the home directory when nothing else is given.
pub const DEFAULT_CONFIG_PATH: &str = ".config/linkage-patcher.toml";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Io { .. } => self,
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read settings from {}: {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse settings TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse settings TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid settings ({}): {}", path.display(), source),
                None => write!(f, "invalid settings: {}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

pub fn load_from_str(input: &str) -> Result<Settings, ConfigError> {
    let settings: Settings = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    settings
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(settings)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// Load settings using the usual lookup order.
///
/// 1. `explicit` (the `--config` flag); must exist
/// 2. the file named by `LINKAGE_PATCHER_CONFIG`; must exist
/// 3. `~/.config/linkage-patcher.toml`, if present
/// 4. built-in defaults
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings, ConfigError> {
    if let Some(path) = explicit {
        return load_from_path(path);
    }

    if let Some(path) = env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return load_from_path(PathBuf::from(path));
    }

    if let Some(path) = home::home_dir().map(|home| home.join(DEFAULT_CONFIG_PATH)) {
        if path.is_file() {
            return load_from_path(&path);
        }
    }

    Ok(Settings::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FailurePolicy;

    #[test]
    fn test_empty_document_uses_defaults() {
        let settings = load_from_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.patcher.program, "patchelf");
        assert_eq!(settings.policy.on_direct_failure, FailurePolicy::Abort);
    }

    #[test]
    fn test_full_document() {
        let settings = load_from_str(
            r#"
[patcher]
program = "/opt/bin/patchelf"

[policy]
on_direct_failure = "continue"
"#,
        )
        .unwrap();

        assert_eq!(settings.patcher.program, "/opt/bin/patchelf");
        assert_eq!(settings.policy.on_direct_failure, FailurePolicy::Continue);
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let err = load_from_str("[policy]\non_direct_failure = \"retry\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml { path: None, .. }));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = load_from_str("[patcher]\nprogramme = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
    }

    #[test]
    fn test_empty_program_fails_validation() {
        let err = load_from_str("[patcher]\nprogram = \"  \"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
        assert!(err.to_string().contains("patcher.program"));
    }

    #[test]
    fn test_load_from_path_attaches_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.toml");
        fs::write(&path, "[patcher]\nprogram = \"\"\n").unwrap();

        let err = load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { path: Some(_), .. }));
        assert!(err.to_string().contains("settings.toml"));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = load_settings(Some(&temp_dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
