use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use peershuffle::gradebook::CanvasConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub log_level: Option<String>,
    pub gradebook: GradebookConfig,
    pub shuffle: ShuffleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GradebookConfig {
    pub host: String,
    pub course_id: u64,
    pub token_env: String,
    pub mail_domain: String,
    pub timeout_ms: u64,
}

impl Default for GradebookConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            course_id: 0,
            token_env: "CANVAS_TOKEN".to_string(),
            mail_domain: String::new(),
            timeout_ms: 30000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ShuffleConfig {
    pub questions_file: PathBuf,
    pub students_file: PathBuf,
    pub log_file: PathBuf,
}

impl Default for ShuffleConfig {
    fn default() -> Self {
        Self {
            questions_file: PathBuf::from("problems.txt"),
            students_file: PathBuf::from("students.txt"),
            log_file: PathBuf::from("assignments.log"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            gradebook: GradebookConfig::default(),
            shuffle: ShuffleConfig::default(),
        }
    }
}

impl Config {
    /// Candidate config files, most specific first: the per-user file, then
    /// one in the course checkout next to the student and question lists.
    fn search_path() -> Vec<PathBuf> {
        let file_name = format!("{}.yml", env!("CARGO_PKG_NAME"));
        let mut candidates = Vec::with_capacity(2);
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join(env!("CARGO_PKG_NAME")).join(&file_name));
        }
        candidates.push(PathBuf::from(file_name));
        candidates
    }

    /// Load `--config` if given, otherwise the first readable file on the search path.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).wrap_err_with(|| format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::search_path().iter().filter(|p| p.exists()) {
            match Self::load_from_file(candidate) {
                Ok(config) => return Ok(config),
                Err(e) => log::warn!("Skipping config {}: {:#}", candidate.display(), e),
            }
        }

        log::info!("No peershuffle.yml found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Validate the gradebook section before any network call.
    pub fn validate(&self) -> Result<()> {
        if self.gradebook.host.trim().is_empty() {
            eyre::bail!("gradebook.host must be set");
        }
        if self.gradebook.course_id == 0 {
            eyre::bail!("gradebook.course-id must be set");
        }
        if self.gradebook.timeout_ms == 0 {
            eyre::bail!("gradebook.timeout-ms must be > 0");
        }
        Ok(())
    }

    /// Build the Canvas client settings, reading the token from the environment.
    pub fn canvas(&self, dry_run: bool) -> Result<CanvasConfig> {
        self.validate()?;
        let token = std::env::var(&self.gradebook.token_env)
            .wrap_err_with(|| format!("{} not set", self.gradebook.token_env))?;
        Ok(CanvasConfig {
            host: self.gradebook.host.clone(),
            course_id: self.gradebook.course_id,
            token,
            mail_domain: self.gradebook.mail_domain.clone(),
            timeout: Duration::from_millis(self.gradebook.timeout_ms),
            dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.gradebook.token_env, "CANVAS_TOKEN");
        assert_eq!(config.shuffle.questions_file, PathBuf::from("problems.txt"));
        assert_eq!(config.shuffle.log_file, PathBuf::from("assignments.log"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
gradebook:
  host: https://canvas.example.edu
  course-id: 4242
  mail-domain: "@andrew.cmu.edu"
shuffle:
  questions-file: bank.txt
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.gradebook.course_id, 4242);
        assert_eq!(config.gradebook.mail_domain, "@andrew.cmu.edu");
        assert_eq!(config.gradebook.timeout_ms, 30000);
        assert_eq!(config.shuffle.questions_file, PathBuf::from("bank.txt"));
        assert_eq!(config.shuffle.students_file, PathBuf::from("students.txt"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("peershuffle.yml");
        fs::write(&path, "log-level: debug\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let path = PathBuf::from("/nonexistent/peershuffle.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_search_path_ends_in_working_directory() {
        let candidates = Config::search_path();
        assert_eq!(candidates.last(), Some(&PathBuf::from("peershuffle.yml")));
    }
}
