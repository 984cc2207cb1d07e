use crate::core::classifier::{ClassificationRule, RuleMatcher};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Whether placed files are copied (source left intact) or moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    Copy,
    Move,
}

impl FromStr for TransferMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "copy" => Ok(Self::Copy),
            "move" => Ok(Self::Move),
            other => Err(format!("unknown mode '{}', expected copy or move", other)),
        }
    }
}

/// What happens when a file of the same name already exists at the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    Skip,
    Overwrite,
    Rename,
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "overwrite" => Ok(Self::Overwrite),
            "rename" => Ok(Self::Rename),
            other => Err(format!(
                "unknown conflict policy '{}', expected skip, overwrite or rename",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Placement settings
    pub mode: TransferMode,
    pub conflict_policy: ConflictPolicy,

    // Identifier extraction: a regex matched against each path segment,
    // plus an optional case-insensitive prefix list. The matched segment
    // is kept verbatim unless normalization is enabled.
    pub identifier_pattern: String,
    pub identifier_prefixes: Vec<String>,
    pub normalize_identifiers: bool,

    // Ordered classification rules; first match wins
    pub rules: Vec<ClassificationRule>,

    // Error handling
    pub fatal_write_threshold: usize,

    // Scan settings
    pub max_scan_depth: usize,
    pub extract_archives: bool,

    // Output settings
    pub session_folder: bool,
    pub log_file_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: TransferMode::Copy,
            conflict_policy: ConflictPolicy::Rename,
            identifier_pattern: r"(?i)^(?:vm|sut)[0-9]+$".to_string(),
            identifier_prefixes: vec![],
            normalize_identifiers: false,
            rules: vec![
                ClassificationRule::new(
                    RuleMatcher::Substring("platform".to_string()),
                    "PlatformProfile",
                ),
                ClassificationRule::new(
                    RuleMatcher::Substring("wp-".to_string()),
                    "WorkloadProfile",
                ),
                ClassificationRule::new(RuleMatcher::Extension("log".to_string()), "Logs"),
                ClassificationRule::new(RuleMatcher::Extension("csv".to_string()), "Results"),
                ClassificationRule::new(
                    RuleMatcher::Extension("json".to_string()),
                    "WorkloadProfile",
                ),
            ],
            fatal_write_threshold: 5,
            max_scan_depth: 32,
            extract_archives: false,
            session_folder: false,
            log_file_name: "restructure.log".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, then apply environment variable
    /// overrides and validate.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AppError::ConfigError {
            message: format!("Failed to read config {}: {}", path.display(), e),
        })?;
        let mut config: Self = serde_json::from_str(&content)?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Default configuration with environment overrides applied.
    pub fn load_default() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(mode) = std::env::var("RESTRUCTURE_MODE") {
            match mode.parse::<TransferMode>() {
                Ok(value) => self.mode = value,
                Err(e) => {
                    tracing::warn!("Invalid RESTRUCTURE_MODE value '{}': {}. Using default.", mode, e);
                }
            }
        }
        if let Ok(policy) = std::env::var("RESTRUCTURE_CONFLICT_POLICY") {
            match policy.parse::<ConflictPolicy>() {
                Ok(value) => self.conflict_policy = value,
                Err(e) => {
                    tracing::warn!(
                        "Invalid RESTRUCTURE_CONFLICT_POLICY value '{}': {}. Using default.",
                        policy,
                        e
                    );
                }
            }
        }
        if let Ok(threshold) = std::env::var("RESTRUCTURE_FATAL_WRITE_THRESHOLD") {
            match threshold.parse::<usize>() {
                Ok(value) => self.fatal_write_threshold = value,
                Err(e) => {
                    tracing::warn!(
                        "Invalid RESTRUCTURE_FATAL_WRITE_THRESHOLD value '{}': {}. Using default.",
                        threshold,
                        e
                    );
                }
            }
        }
        if let Ok(depth) = std::env::var("RESTRUCTURE_MAX_SCAN_DEPTH") {
            match depth.parse::<usize>() {
                Ok(value) => self.max_scan_depth = value,
                Err(e) => {
                    tracing::warn!(
                        "Invalid RESTRUCTURE_MAX_SCAN_DEPTH value '{}': {}. Using default.",
                        depth,
                        e
                    );
                }
            }
        }

        tracing::debug!("Applied environment variable overrides to configuration");
    }

    /// Save configuration to disk as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::info!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Validate configuration, collecting every problem into one error
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if let Err(e) = regex::Regex::new(&self.identifier_pattern) {
            errors.push(format!(
                "Invalid identifier_pattern '{}': {}",
                self.identifier_pattern, e
            ));
        }

        for prefix in &self.identifier_prefixes {
            if prefix.is_empty() {
                errors.push("Identifier prefix cannot be empty".to_string());
            }
        }

        if self.rules.is_empty() {
            errors.push("At least one classification rule is required".to_string());
        }

        for (idx, rule) in self.rules.iter().enumerate() {
            if rule.category.is_empty() {
                errors.push(format!("Rule {} has an empty category", idx));
            } else if let Err(e) = crate::utils::paths::validate_component(&rule.category) {
                errors.push(format!("Rule {} category: {}", idx, e));
            }

            match &rule.matcher {
                RuleMatcher::Extension(ext) if ext.is_empty() => {
                    errors.push(format!("Rule {} has an empty extension matcher", idx));
                }
                RuleMatcher::Substring(sub) if sub.is_empty() => {
                    errors.push(format!("Rule {} has an empty substring matcher", idx));
                }
                RuleMatcher::Regex(pattern) => {
                    if let Err(e) = regex::Regex::new(pattern) {
                        errors.push(format!("Rule {} has an invalid regex '{}': {}", idx, pattern, e));
                    }
                }
                _ => {}
            }
        }

        if self.fatal_write_threshold == 0 {
            errors.push("Fatal write threshold must be at least 1".to_string());
        }

        if self.max_scan_depth == 0 {
            errors.push("Max scan depth must be at least 1".to_string());
        }

        if self.max_scan_depth > 128 {
            errors.push("Max scan depth is too large (>128)".to_string());
        }

        if let Err(e) = crate::utils::paths::validate_component(&self.log_file_name) {
            errors.push(format!("Log file name: {}", e));
        }

        if !errors.is_empty() {
            return Err(AppError::ConfigError {
                message: errors.join(", "),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mode, TransferMode::Copy);
        assert_eq!(config.conflict_policy, ConflictPolicy::Rename);
        assert_eq!(config.fatal_write_threshold, 5);
    }

    #[test]
    fn config_roundtrips_through_json() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.rules.len(), config.rules.len());
        assert_eq!(parsed.identifier_pattern, config.identifier_pattern);
    }

    #[test]
    fn validate_rejects_bad_pattern_and_empty_rules() {
        let config = Config {
            identifier_pattern: "(unclosed".to_string(),
            rules: vec![],
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("identifier_pattern"));
        assert!(message.contains("classification rule"));
    }

    #[test]
    fn validate_rejects_unsafe_category() {
        let mut config = Config::default();
        config.rules.push(ClassificationRule::new(
            RuleMatcher::Extension("bin".to_string()),
            "../escape",
        ));
        assert!(config.validate().is_err());
    }

    #[test]
    fn mode_and_policy_parse_from_str() {
        assert_eq!("Move".parse::<TransferMode>().unwrap(), TransferMode::Move);
        assert!("teleport".parse::<TransferMode>().is_err());
        assert_eq!(
            "overwrite".parse::<ConflictPolicy>().unwrap(),
            ConflictPolicy::Overwrite
        );
        assert!("explode".parse::<ConflictPolicy>().is_err());
    }
}
