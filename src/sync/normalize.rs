use serde_json::Value;

use super::schema::SchemaMap;
use crate::error::SyncError;
use crate::model::story::{NormalizedRecord, StorySource};

/// Read a story through its type's field map and overlay the type's
/// static fields. Attributes the story lacks become null.
pub fn normalize(story: &dyn StorySource, schemas: &SchemaMap) -> Result<NormalizedRecord, SyncError> {
    let schema = schemas.get(story.type_name()).ok_or_else(|| {
        SyncError::NotFound(format!(
            "no schema for VersionOne type '{}'",
            story.type_name()
        ))
    })?;

    let mut record = NormalizedRecord::default();
    for (normalized, source) in &schema.field_map {
        let value = story.get_field(source).cloned().unwrap_or(Value::Null);
        record.insert(normalized.clone(), value);
    }
    for (normalized, value) in &schema.static_fields {
        record.insert(normalized.clone(), Value::String(value.clone()));
    }
    Ok(record)
}
