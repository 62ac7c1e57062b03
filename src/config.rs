use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use toml::{Table, Value};

use crate::error::SyncError;

pub const APP_NAME: &str = "versionone-to-jira-reflector";
pub const CONFIG_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_CODE_REVIEW_LABEL: &str = "Code Review Url";
pub const DEFAULT_FEATURE_BRANCH_LABEL: &str = "Feature Branch";
pub const DEFAULT_LABELS_LABEL: &str = "Labels";

pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".versionone-to-jira-reflector")
}

pub fn fields_section(type_name: &str) -> String {
    format!("versionone_{type_name}_fields")
}

pub fn static_section(type_name: &str) -> String {
    format!("versionone_{type_name}_static")
}

/// The configuration file as a section/key document.
///
/// Held as a raw table so sections this tool does not know about survive
/// a rewrite untouched.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    path: PathBuf,
    table: Table,
}

impl ConfigFile {
    pub fn new(path: PathBuf, table: Table) -> Self {
        Self { path, table }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new(path.to_path_buf(), Table::new()));
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let table: Table = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Self::new(path.to_path_buf(), table))
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let contents = toml::to_string_pretty(&self.table)?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write config to {}", self.path.display()))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> Option<&str> {
        self.table.get("version").and_then(Value::as_str)
    }

    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        match self.table.get(section)?.get(key)? {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// All keys of a section rendered as strings. `None` if the section is absent.
    pub fn section(&self, name: &str) -> Option<BTreeMap<String, String>> {
        let Some(Value::Table(table)) = self.table.get(name) else {
            return None;
        };
        Some(
            table
                .iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (key.clone(), value)
                })
                .collect(),
        )
    }

    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        let entry = self
            .table
            .entry(section.to_string())
            .or_insert(Value::Table(Table::new()));
        if !entry.is_table() {
            *entry = Value::Table(Table::new());
        }
        if let Value::Table(table) = entry {
            table.insert(key.to_string(), Value::String(value.to_string()));
        }
    }

    fn set_if_absent(&mut self, section: &str, key: &str, value: &str) {
        if self.get(section, key).is_none() {
            self.set(section, key, value);
        }
    }

    /// Fill in every default that is missing when the file was written by a
    /// different version. Returns true if anything was applied.
    pub fn ensure_defaults(&mut self) -> bool {
        if self.version() == Some(CONFIG_VERSION) {
            return false;
        }

        if self.get("versionone", "story_types").is_none() {
            self.set("versionone", "story_types", "Story,Defect");
        }
        for (type_name, fields, statics) in default_schemas() {
            for (key, value) in fields {
                self.set_if_absent(&fields_section(type_name), key, value);
            }
            for (key, value) in statics {
                self.set_if_absent(&static_section(type_name), key, value);
            }
        }
        self.set_if_absent("jira", "code_review_field_label", DEFAULT_CODE_REVIEW_LABEL);
        self.set_if_absent("jira", "feature_branch_field_label", DEFAULT_FEATURE_BRANCH_LABEL);
        self.set_if_absent("jira", "labels_field_label", DEFAULT_LABELS_LABEL);

        self.table
            .insert("version".into(), Value::String(CONFIG_VERSION.into()));
        true
    }

    pub fn apply(&mut self, diff: &SettingsDiff) {
        for (section, key, value) in &diff.entries {
            self.set(section, key, value);
        }
    }
}

type DefaultSchema = (
    &'static str,
    &'static [(&'static str, &'static str)],
    &'static [(&'static str, &'static str)],
);

fn default_schemas() -> [DefaultSchema; 2] {
    [
        (
            "Story",
            &[
                ("name", "Name"),
                ("number", "Number"),
                ("description", "Description"),
                ("jira_issue", "Custom_JIRATicketNumber"),
                ("code_review_url", "Custom_UserStoryCodeReview"),
            ],
            &[("issue_type", "Story")],
        ),
        (
            "Defect",
            &[
                ("name", "Name"),
                ("number", "Number"),
                ("description", "Description"),
                ("jira_issue", "Custom_JiraTicketNumber"),
                ("code_review_url", "Custom_DefectCodeReview"),
            ],
            &[("issue_type", "Bug")],
        ),
    ]
}

/// Settings the operator agreed to persist during this run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsDiff {
    entries: Vec<(String, String, String)>,
}

impl SettingsDiff {
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.entries
            .push((section.to_string(), key.to_string(), value.to_string()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct VersionOneSettings {
    pub username: Option<String>,
    pub instance_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct JiraSettings {
    pub username: Option<String>,
    pub domain: Option<String>,
    pub project: Option<String>,
    pub code_review_field_label: String,
    pub feature_branch_field_label: String,
    pub labels_field_label: String,
}

impl Default for JiraSettings {
    fn default() -> Self {
        Self {
            username: None,
            domain: None,
            project: None,
            code_review_field_label: DEFAULT_CODE_REVIEW_LABEL.into(),
            feature_branch_field_label: DEFAULT_FEATURE_BRANCH_LABEL.into(),
            labels_field_label: DEFAULT_LABELS_LABEL.into(),
        }
    }
}

/// Immutable view of the configuration, taken once at startup.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub versionone: VersionOneSettings,
    pub jira: JiraSettings,
}

impl Settings {
    pub fn from_config(config: &ConfigFile) -> Result<Self, SyncError> {
        if let Some(url) = non_empty(config.get("versionone", "instance_url")) {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(SyncError::Configuration(format!(
                    "VersionOne instance URL '{url}' must start with http:// or https://"
                )));
            }
        }

        let defaults = JiraSettings::default();
        Ok(Self {
            versionone: VersionOneSettings {
                username: non_empty(config.get("versionone", "username")),
                instance_url: non_empty(config.get("versionone", "instance_url")),
            },
            jira: JiraSettings {
                username: non_empty(config.get("jira", "username")),
                domain: non_empty(config.get("jira", "domain")),
                project: non_empty(config.get("jira", "project")),
                code_review_field_label: non_empty(config.get("jira", "code_review_field_label"))
                    .unwrap_or(defaults.code_review_field_label),
                feature_branch_field_label: non_empty(
                    config.get("jira", "feature_branch_field_label"),
                )
                .unwrap_or(defaults.feature_branch_field_label),
                labels_field_label: non_empty(config.get("jira", "labels_field_label"))
                    .unwrap_or(defaults.labels_field_label),
            },
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(contents: &str) -> ConfigFile {
        ConfigFile::new(PathBuf::from("unused"), toml::from_str(contents).unwrap())
    }

    #[test]
    fn defaults_fill_an_empty_file() {
        let mut config = ConfigFile::default();
        assert!(config.ensure_defaults());
        assert_eq!(config.version(), Some(CONFIG_VERSION));
        assert_eq!(
            config.get("versionone", "story_types").as_deref(),
            Some("Story,Defect")
        );
        assert_eq!(
            config.get("versionone_Defect_fields", "jira_issue").as_deref(),
            Some("Custom_JiraTicketNumber")
        );
        assert_eq!(
            config.get("versionone_Defect_static", "issue_type").as_deref(),
            Some("Bug")
        );
    }

    #[test]
    fn defaults_never_overwrite_user_values() {
        let mut config = parse(
            r#"
version = "0.0.1"

[versionone_Story_fields]
jira_issue = "Custom_Mine"
"#,
        );
        assert!(config.ensure_defaults());
        assert_eq!(
            config.get("versionone_Story_fields", "jira_issue").as_deref(),
            Some("Custom_Mine")
        );
        assert_eq!(
            config.get("versionone_Story_fields", "name").as_deref(),
            Some("Name")
        );
    }

    #[test]
    fn defaults_skipped_when_version_matches() {
        let mut config = parse(&format!("version = \"{CONFIG_VERSION}\"\n"));
        assert!(!config.ensure_defaults());
        assert!(config.section("versionone").is_none());
    }

    #[test]
    fn diff_is_applied_in_order() {
        let mut config = ConfigFile::default();
        let mut diff = SettingsDiff::default();
        diff.set("jira", "project", "OLD");
        diff.set("jira", "project", "NEW");
        config.apply(&diff);
        assert_eq!(config.get("jira", "project").as_deref(), Some("NEW"));
    }

    #[test]
    fn settings_snapshot_treats_blank_as_missing() {
        let config = parse(
            r#"
[jira]
username = "  "
domain = "https://jira.example.com/"
"#,
        );
        let settings = Settings::from_config(&config).unwrap();
        assert_eq!(settings.jira.username, None);
        assert_eq!(settings.jira.domain.as_deref(), Some("https://jira.example.com/"));
        assert_eq!(settings.jira.code_review_field_label, DEFAULT_CODE_REVIEW_LABEL);
    }

    #[test]
    fn settings_reject_non_http_instance_url() {
        let config = parse(
            r#"
[versionone]
instance_url = "ftp://v1.example.com/Instance"
"#,
        );
        let err = Settings::from_config(&config).unwrap_err();
        assert!(matches!(err, SyncError::Configuration(_)));
    }

    #[test]
    fn save_and_reload_preserves_unknown_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        std::fs::write(&path, "[custom]\nkeep = \"me\"\n").unwrap();

        let mut config = ConfigFile::load(&path).unwrap();
        config.ensure_defaults();
        config.save().unwrap();

        let reloaded = ConfigFile::load(&path).unwrap();
        assert_eq!(reloaded.get("custom", "keep").as_deref(), Some("me"));
        assert_eq!(reloaded.version(), Some(CONFIG_VERSION));
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigFile::load(&dir.path().join("absent")).unwrap();
        assert!(config.version().is_none());
        assert_eq!(config.path(), dir.path().join("absent"));
    }
}
