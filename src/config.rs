use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let project_root = discover_project_root();
        let user_data_dir = discover_user_data_dir(&project_root);
        let log_dir = user_data_dir.join("logs");

        for dir in [&user_data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            project_root,
            user_data_dir,
            log_dir,
        }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("DOCENT_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.project_root.join("config.yml")
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_project_root() -> PathBuf {
    if let Ok(root) = env::var("DOCENT_ROOT") {
        return PathBuf::from(root);
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join("config.yml").exists() {
        return manifest_dir;
    }

    env::current_dir().unwrap_or(manifest_dir)
}

fn discover_user_data_dir(project_root: &Path) -> PathBuf {
    if let Ok(dir) = env::var("DOCENT_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if cfg!(debug_assertions) {
        return project_root.to_path_buf();
    }

    let xdg = env::var("XDG_DATA_HOME").unwrap_or_else(|_| {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{home}/.local/share")
    });
    PathBuf::from(xdg).join("docent")
}

/// Process-wide settings, loaded once at startup and injected into every
/// component through `AppState`. Sources, in increasing precedence:
/// built-in defaults, `config.yml`, environment variables.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub index: IndexSettings,
    pub model: ModelSettings,
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub endpoint: String,
    pub username: String,
    pub password: String,
    pub index_name: String,
    /// Analyzer language for `title`/`content` text fields.
    pub language: String,
    pub embedding_dims: usize,
    pub timeout_secs: u64,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://localhost:9200".to_string(),
            username: "admin".to_string(),
            password: "password".to_string(),
            index_name: "chatbot-documents".to_string(),
            language: "spanish".to_string(),
            embedding_dims: 1536,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Base URL of an OpenAI-compatible model gateway.
    pub base_url: String,
    pub api_key: Option<String>,
    pub embedding_model: String,
    pub generation_model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1234".to_string(),
            api_key: None,
            embedding_model: "text-embedding-default".to_string(),
            generation_model: "chat-default".to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Base URL of an S3-compatible HTTP gateway serving document buckets.
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Settings {
    pub fn load(paths: &AppPaths) -> anyhow::Result<Self> {
        let mut settings = load_yaml(&paths.config_path())?;
        settings.apply_env_overrides();
        settings.validate()?;
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = env::var("DOCENT_INDEX_ENDPOINT") {
            self.index.endpoint = val;
        }
        if let Ok(val) = env::var("DOCENT_INDEX_USERNAME") {
            self.index.username = val;
        }
        if let Ok(val) = env::var("DOCENT_INDEX_PASSWORD") {
            self.index.password = val;
        }
        if let Ok(val) = env::var("DOCENT_MODEL_BASE_URL") {
            self.model.base_url = val;
        }
        if let Ok(val) = env::var("DOCENT_MODEL_API_KEY") {
            self.model.api_key = Some(val);
        }
        if let Ok(val) = env::var("DOCENT_STORAGE_BASE_URL") {
            self.storage.base_url = val;
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.index.endpoint.trim().is_empty() {
            anyhow::bail!("index.endpoint must not be empty");
        }
        if self.index.index_name.trim().is_empty() {
            anyhow::bail!("index.index_name must not be empty");
        }
        if self.index.language.trim().is_empty() {
            anyhow::bail!("index.language must not be empty");
        }
        if self.index.embedding_dims == 0 {
            anyhow::bail!("index.embedding_dims must be greater than zero");
        }
        if self.model.base_url.trim().is_empty() {
            anyhow::bail!("model.base_url must not be empty");
        }
        Ok(())
    }
}

fn load_yaml(path: &Path) -> anyhow::Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        Settings::default().validate().unwrap();
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "index:\n  endpoint: https://search.example.com\n  embedding_dims: 1024"
        )
        .unwrap();

        let settings = load_yaml(file.path()).unwrap();
        assert_eq!(settings.index.endpoint, "https://search.example.com");
        assert_eq!(settings.index.embedding_dims, 1024);
        assert_eq!(settings.index.index_name, "chatbot-documents");
        assert_eq!(settings.server.port, 8000);
    }

    #[test]
    fn zero_dims_rejected() {
        let mut settings = Settings::default();
        settings.index.embedding_dims = 0;
        assert!(settings.validate().is_err());
    }
}
