//! Project configuration.
//!
//! A project file names the repositories taking part, the editors available
//! to expressions, the translators between project spaces and the
//! migrations to run. JSON is the native format; files ending in `.yaml` or
//! `.yml` are read as YAML.
//!
//! Loading parses and then [`validate`](ProjectConfig::validate)s, so a
//! returned config is internally consistent.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConfigError;

pub const DEFAULT_PROJECT_SPACE: &str = "public";
pub const DEFAULT_LOG_FORMAT: &str = "{description}\n\tChange on {date} by {author}";

// ---------------------------------------------------------------------------
// 1. Document types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProjectConfig {
    #[serde(default)]
    pub name: String,
    /// Path of the equivalence store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_uri: Option<String>,
    #[serde(default)]
    pub repositories: BTreeMap<String, RepositoryConfig>,
    #[serde(default)]
    pub editors: BTreeMap<String, EditorConfig>,
    #[serde(default)]
    pub translators: Vec<TranslatorConfig>,
    #[serde(default)]
    pub migrations: Vec<MigrationConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(rename = "type")]
    pub repository_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default = "default_project_space")]
    pub project_space: String,
    /// Regexes over relative paths; matching files are left out of codebases.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_file_patterns: Vec<String>,
}

fn default_project_space() -> String {
    DEFAULT_PROJECT_SPACE.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorType {
    Identity,
    Patcher,
    Renamer,
    Shell,
}

impl fmt::Display for EditorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditorType::Identity => write!(f, "identity"),
            EditorType::Patcher => write!(f, "patcher"),
            EditorType::Renamer => write!(f, "renamer"),
            EditorType::Shell => write!(f, "shell"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(rename = "type")]
    pub editor_type: EditorType,
    /// Renamer rules in declaration order.
    #[serde(default, with = "ordered_pairs", skip_serializing_if = "Vec::is_empty")]
    pub mappings: Vec<(String, String)>,
    #[serde(default, rename = "regex", alias = "use_regex")]
    pub use_regex: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_string: Option<String>,
}

impl EditorConfig {
    pub fn of_type(editor_type: EditorType) -> Self {
        Self {
            editor_type,
            mappings: Vec::new(),
            use_regex: false,
            command_string: None,
        }
    }
}

/// A translator step either names an editor from `editors` or defines one inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepEditor {
    Named(String),
    Inline(EditorConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepConfig {
    pub name: String,
    pub editor: StepEditor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatorConfig {
    pub from_project_space: String,
    pub to_project_space: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepConfig>,
    /// Derive this translator by inverting the opposite-direction one.
    #[serde(default)]
    pub inverse: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub from_repository: String,
    #[serde(default)]
    pub to_repository: String,
    #[serde(default)]
    pub separate_revisions: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_scrubber_config: Option<MetadataScrubberConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataScrubberConfig {
    /// Usernames whose mentions are stripped from ids, authors and descriptions.
    #[serde(default)]
    pub usernames_to_scrub: Vec<String>,
    /// Usernames allowed through when `scrub_unknown_users` is set.
    #[serde(default)]
    pub usernames_to_publish: Vec<String>,
    #[serde(default = "default_true")]
    pub scrub_authors: bool,
    #[serde(default)]
    pub scrub_unknown_users: bool,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default)]
    pub restore_original_author: bool,
}

fn default_true() -> bool {
    true
}

fn default_log_format() -> String {
    DEFAULT_LOG_FORMAT.to_string()
}

impl Default for MetadataScrubberConfig {
    fn default() -> Self {
        Self {
            usernames_to_scrub: Vec::new(),
            usernames_to_publish: Vec::new(),
            scrub_authors: true,
            scrub_unknown_users: false,
            log_format: default_log_format(),
            restore_original_author: false,
        }
    }
}

impl MetadataScrubberConfig {
    /// Whether the author of a migrated revision should be redacted.
    pub fn should_scrub_author(&self, author: &str) -> bool {
        if !self.scrub_authors {
            return false;
        }
        if self.scrub_unknown_users {
            return !matches_username(author, &self.usernames_to_publish);
        }
        matches_username(author, &self.usernames_to_scrub)
    }
}

/// `author` looks like `Name <user@host>` for one of `usernames`.
fn matches_username(author: &str, usernames: &[String]) -> bool {
    usernames.iter().any(|username| {
        Regex::new(&format!("^.*<{}@.*$", regex::escape(username)))
            .map(|re| re.is_match(author))
            .unwrap_or(false)
    })
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

impl ProjectConfig {
    /// Read and validate the project file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let config: ProjectConfig = if is_yaml {
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?
        };
        config.validate()?;
        tracing::debug!(path = %path.display(), project = %config.name, "loaded project config");
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: ProjectConfig = serde_json::from_str(json).map_err(|source| ConfigError::Json {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    // -----------------------------------------------------------------------
    // 3. Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.name.trim().is_empty() {
            return invalid("Must specify a name".into());
        }
        if self.repositories.is_empty() {
            return invalid("Must specify repositories".into());
        }
        for (name, repo) in &self.repositories {
            if repo.repository_type.trim().is_empty() {
                return invalid(format!("Repository '{name}' must specify a type"));
            }
            for pattern in &repo.ignore_file_patterns {
                if let Err(e) = Regex::new(pattern) {
                    return invalid(format!(
                        "Repository '{name}' has an invalid ignore_file_pattern '{pattern}': {e}"
                    ));
                }
            }
        }
        for translator in &self.translators {
            if translator.inverse && !translator.steps.is_empty() {
                return invalid(format!(
                    "Inverse translator from '{}' to '{}' must not specify steps",
                    translator.from_project_space, translator.to_project_space
                ));
            }
            if !translator.inverse && translator.steps.is_empty() {
                return invalid("Translator requires steps".into());
            }
            for step in &translator.steps {
                if let StepEditor::Named(editor) = &step.editor {
                    if !self.editors.contains_key(editor) {
                        return invalid(format!(
                            "Translator step '{}' refers to unknown editor '{editor}'",
                            step.name
                        ));
                    }
                }
            }
        }
        for migration in &self.migrations {
            if migration.name.is_empty() {
                return invalid("Missing name in migration".into());
            }
            if migration.from_repository.is_empty() {
                return invalid(format!(
                    "Missing from_repository in migration '{}'",
                    migration.name
                ));
            }
            if migration.to_repository.is_empty() {
                return invalid(format!(
                    "Missing to_repository in migration '{}'",
                    migration.name
                ));
            }
            for repo in [&migration.from_repository, &migration.to_repository] {
                if !self.repositories.contains_key(repo) {
                    return invalid(format!(
                        "Migration '{}' refers to unknown repository '{repo}'",
                        migration.name
                    ));
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // 4. Lookups
    // -----------------------------------------------------------------------

    pub fn repository_config(&self, name: &str) -> Option<&RepositoryConfig> {
        self.repositories.get(name)
    }

    pub fn migration(&self, name: &str) -> Option<&MigrationConfig> {
        self.migrations.iter().find(|m| m.name == name)
    }

    /// Translator between the project spaces of two repositories.
    pub fn find_translator_from(
        &self,
        from_repository: &str,
        to_repository: &str,
    ) -> Option<&TranslatorConfig> {
        let from_space = &self.repository_config(from_repository)?.project_space;
        let to_space = &self.repository_config(to_repository)?.project_space;
        self.translators.iter().find(|t| {
            &t.from_project_space == from_space && &t.to_project_space == to_space
        })
    }
}

// ---------------------------------------------------------------------------
// 5. Ordered map <-> Vec of pairs
// ---------------------------------------------------------------------------

/// Renamer mappings are a JSON object whose key order is significant.
mod ordered_pairs {
    use super::*;

    pub fn serialize<S: Serializer>(pairs: &[(String, String)], s: S) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(pairs.len()))?;
        for (k, v) in pairs {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<(String, String)>, D::Error> {
        struct PairsVisitor;

        impl<'de> Visitor<'de> for PairsVisitor {
            type Value = Vec<(String, String)>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of string to string")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut pairs = Vec::new();
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    pairs.push((k, v));
                }
                Ok(pairs)
            }
        }

        d.deserialize_map(PairsVisitor)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
