use crate::config::Config;
use crate::error::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Bucket for files whose path carries no recognizable VM/SUT segment.
pub const UNASSIGNED: &str = "unassigned";
/// Bucket for files no rule matched.
pub const UNCLASSIFIED: &str = "unclassified";

/// How a rule matches against a filename
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RuleMatcher {
    /// Case-insensitive comparison against the file extension (without dot)
    Extension(String),
    /// Case-insensitive substring search in the filename
    Substring(String),
    /// Regular expression over the filename
    Regex(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRule {
    pub matcher: RuleMatcher,
    pub category: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ClassificationRule {
    pub fn new(matcher: RuleMatcher, category: &str) -> Self {
        Self {
            matcher,
            category: category.to_string(),
            enabled: true,
        }
    }
}

/// The resolved routing for one source file
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub identifier: String,
    pub category: String,
}

/// Evaluates identifier extraction and classification rules.
///
/// Rules are evaluated in configuration order and the first enabled match
/// wins. Identifier extraction walks the path segments from the root; the
/// segment nearest the root that matches the configured pattern (or prefix
/// list) becomes the identifier, kept verbatim unless normalization maps
/// `VM<n>` onto `SUT<n>`.
pub struct Classifier {
    identifier_pattern: Regex,
    identifier_prefixes: Vec<String>,
    normalize_identifiers: bool,
    rules: Vec<CompiledRule>,
}

struct CompiledRule {
    rule: ClassificationRule,
    regex: Option<Regex>,
}

impl Classifier {
    pub fn new(config: &Config) -> Result<Self> {
        let identifier_pattern = Regex::new(&config.identifier_pattern)?;

        let mut rules = Vec::with_capacity(config.rules.len());
        for rule in &config.rules {
            let regex = match &rule.matcher {
                RuleMatcher::Regex(pattern) => Some(Regex::new(pattern)?),
                _ => None,
            };
            rules.push(CompiledRule {
                rule: rule.clone(),
                regex,
            });
        }

        Ok(Self {
            identifier_pattern,
            identifier_prefixes: config
                .identifier_prefixes
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
            normalize_identifiers: config.normalize_identifiers,
            rules,
        })
    }

    /// Resolve identifier and category for a path relative to the scan root.
    pub fn classify(&self, rel_path: &Path) -> Decision {
        let file_name = rel_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("");

        Decision {
            identifier: self.identifier_for(rel_path),
            category: self.category_for(file_name, rel_path),
        }
    }

    /// Extract the VM/SUT identifier from the directory segments of a path.
    pub fn identifier_for(&self, rel_path: &Path) -> String {
        let parent = match rel_path.parent() {
            Some(p) => p,
            None => return UNASSIGNED.to_string(),
        };

        for component in parent.components() {
            let segment = match component.as_os_str().to_str() {
                Some(s) => s,
                None => continue,
            };

            if self.segment_is_identifier(segment) {
                return self.normalize(segment);
            }
        }

        UNASSIGNED.to_string()
    }

    fn segment_is_identifier(&self, segment: &str) -> bool {
        if self.identifier_pattern.is_match(segment) {
            return true;
        }

        let lower = segment.to_lowercase();
        self.identifier_prefixes
            .iter()
            .any(|prefix| lower.starts_with(prefix.as_str()))
    }

    /// `VM3` becomes `SUT3` when normalization is on; everything else is
    /// kept verbatim.
    fn normalize(&self, segment: &str) -> String {
        if !self.normalize_identifiers {
            return segment.to_string();
        }

        let lower = segment.to_lowercase();
        if let Some(rest) = lower.strip_prefix("vm") {
            if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
                return format!("SUT{}", rest);
            }
        }
        if let Some(rest) = lower.strip_prefix("sut") {
            if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
                return format!("SUT{}", rest);
            }
        }

        segment.to_string()
    }

    /// First enabled matching rule wins; no match routes to `unclassified`.
    pub fn category_for(&self, file_name: &str, rel_path: &Path) -> String {
        let extension = rel_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        for compiled in &self.rules {
            if !compiled.rule.enabled {
                continue;
            }

            let matches = match &compiled.rule.matcher {
                RuleMatcher::Extension(ext) => extension.eq_ignore_ascii_case(ext),
                RuleMatcher::Substring(sub) => {
                    file_name.to_lowercase().contains(&sub.to_lowercase())
                }
                RuleMatcher::Regex(_) => compiled
                    .regex
                    .as_ref()
                    .map(|re| re.is_match(file_name))
                    .unwrap_or(false),
            };

            if matches {
                return compiled.rule.category.clone();
            }
        }

        UNCLASSIFIED.to_string()
    }
}
