use std::env;
use std::path::PathBuf;

/// Overrides the full default data file path.
pub const PATH_ENV: &str = "SOVRAN_DATASTORE_PATH";
/// Overrides the directory the default data file lives in.
pub const DIR_ENV: &str = "SOVRAN_DATASTORE_DIR";

pub const DEFAULT_FILE_NAME: &str = "state.json";

/// Where the process-wide container persists by default.
///
/// The default path is `<data dir>/<app identity>/<file name>`, where the data
/// dir is the platform's per-user data directory (falling back to the working
/// directory when the platform has none).
///
/// # Examples
///
/// ```
/// use sovran_datastore::DataConfig;
/// use std::path::PathBuf;
///
/// let config = DataConfig::new("my-game").with_data_dir("/tmp/saves");
/// assert_eq!(config.default_path(), PathBuf::from("/tmp/saves/my-game/state.json"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataConfig {
    pub app_identity: String,
    pub data_dir: Option<PathBuf>,
    pub file_name: String,
    /// Used verbatim instead of the derived path when set
    pub path_override: Option<PathBuf>,
}

impl DataConfig {
    pub fn new(app_identity: impl Into<String>) -> Self {
        Self {
            app_identity: app_identity.into(),
            data_dir: None,
            file_name: DEFAULT_FILE_NAME.to_string(),
            path_override: None,
        }
    }

    /// Like [`DataConfig::new`], then applies `SOVRAN_DATASTORE_DIR` and
    /// `SOVRAN_DATASTORE_PATH` from the environment.
    pub fn from_env(app_identity: impl Into<String>) -> Self {
        let mut config = Self::new(app_identity);
        if let Some(dir) = env::var_os(DIR_ENV).filter(|v| !v.is_empty()) {
            config.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = env::var_os(PATH_ENV).filter(|v| !v.is_empty()) {
            config.path_override = Some(PathBuf::from(path));
        }
        config
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path_override = Some(path.into());
        self
    }

    pub fn default_path(&self) -> PathBuf {
        if let Some(path) = &self.path_override {
            return path.clone();
        }
        let base = self
            .data_dir
            .clone()
            .or_else(dirs::data_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        base.join(&self.app_identity).join(&self.file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_path() {
        let config = DataConfig::new("game").with_data_dir("/data");
        assert_eq!(config.default_path(), PathBuf::from("/data/game/state.json"));

        let config = config.with_file_name("slot1.json");
        assert_eq!(config.default_path(), PathBuf::from("/data/game/slot1.json"));
    }

    #[test]
    fn test_override_wins() {
        let config = DataConfig::new("game")
            .with_data_dir("/data")
            .with_path("/elsewhere/custom.json");
        assert_eq!(config.default_path(), PathBuf::from("/elsewhere/custom.json"));
    }

    #[test]
    fn test_environment_overrides() {
        env::set_var(DIR_ENV, "/env/data");
        env::remove_var(PATH_ENV);
        let config = DataConfig::from_env("game");
        assert_eq!(config.data_dir, Some(PathBuf::from("/env/data")));
        assert_eq!(config.default_path(), PathBuf::from("/env/data/game/state.json"));

        env::set_var(PATH_ENV, "/env/exact.json");
        let config = DataConfig::from_env("game");
        assert_eq!(config.default_path(), PathBuf::from("/env/exact.json"));

        // Empty variables are ignored
        env::set_var(DIR_ENV, "");
        env::set_var(PATH_ENV, "");
        let config = DataConfig::from_env("game");
        assert_eq!(config, DataConfig::new("game"));

        env::remove_var(DIR_ENV);
        env::remove_var(PATH_ENV);
    }

    #[test]
    fn test_platform_dir_includes_identity() {
        let path = DataConfig::new("identity-check").default_path();
        assert!(path.ends_with("identity-check/state.json"));
    }
}
