use std::collections::BTreeMap;

use crate::config::{fields_section, static_section, ConfigFile};
use crate::error::SyncError;

/// Normalized fields every story type has to map.
pub const REQUIRED_FIELDS: [&str; 4] = ["name", "number", "jira_issue", "description"];

/// How one VersionOne asset type maps onto the normalized record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorySchema {
    pub type_name: String,
    /// normalized name -> VersionOne attribute name
    pub field_map: BTreeMap<String, String>,
    /// normalized name -> constant value
    pub static_fields: BTreeMap<String, String>,
}

impl StorySchema {
    pub fn source_field(&self, normalized: &str) -> Option<&str> {
        self.field_map.get(normalized).map(String::as_str)
    }

    /// VersionOne attribute names to select for this type.
    pub fn source_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = self.field_map.values().cloned().collect();
        fields.sort();
        fields.dedup();
        fields
    }
}

/// Schemas in the order `story_types` lists them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaMap {
    entries: Vec<StorySchema>,
}

impl SchemaMap {
    pub fn get(&self, type_name: &str) -> Option<&StorySchema> {
        self.entries.iter().find(|s| s.type_name == type_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StorySchema> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl FromIterator<StorySchema> for SchemaMap {
    fn from_iter<I: IntoIterator<Item = StorySchema>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

pub fn resolve(config: &ConfigFile) -> Result<SchemaMap, SyncError> {
    let types = config.get("versionone", "story_types").ok_or_else(|| {
        SyncError::Configuration("[versionone] story_types is not set".to_string())
    })?;

    let mut entries: Vec<StorySchema> = Vec::new();
    for type_name in types.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if entries.iter().any(|e| e.type_name == type_name) {
            continue;
        }

        let fields_name = fields_section(type_name);
        let static_name = static_section(type_name);
        let (Some(field_map), Some(static_fields)) =
            (config.section(&fields_name), config.section(&static_name))
        else {
            return Err(SyncError::Configuration(format!(
                "story type '{type_name}' needs both [{fields_name}] and [{static_name}] sections"
            )));
        };

        if let Some(missing) = REQUIRED_FIELDS
            .iter()
            .find(|f| !field_map.contains_key(**f))
        {
            return Err(SyncError::Configuration(format!(
                "[{fields_name}] does not map required field '{missing}'"
            )));
        }
        if !static_fields.contains_key("issue_type") {
            return Err(SyncError::Configuration(format!(
                "[{static_name}] does not set issue_type"
            )));
        }

        entries.push(StorySchema {
            type_name: type_name.to_string(),
            field_map,
            static_fields,
        });
    }

    if entries.is_empty() {
        return Err(SyncError::Configuration(
            "[versionone] story_types lists no story types".to_string(),
        ));
    }
    Ok(SchemaMap { entries })
}
