use anyhow::{bail, Result};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::config::JiraSettings;
use crate::model::story::NormalizedRecord;
use crate::model::ticket::{JiraField, Ticket};
use crate::operator::Operator;
use crate::providers::JiraClient;
use crate::util::html::html_to_text;

pub const EMPTY_DESCRIPTION: &str = "No description provided.";

/// Display names of the JIRA fields the writer fills in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLabels {
    pub code_review: String,
    pub feature_branch: String,
    pub labels: String,
}

impl FieldLabels {
    pub fn from_settings(settings: &JiraSettings) -> Self {
        Self {
            code_review: settings.code_review_field_label.clone(),
            feature_branch: settings.feature_branch_field_label.clone(),
            labels: settings.labels_field_label.clone(),
        }
    }
}

/// Values new issues are created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDefaults {
    pub assignee: String,
    pub project: Option<String>,
}

/// Find the id of the first field whose display name contains `label`,
/// ignoring case.
pub fn resolve_field_id(fields: &[JiraField], label: &str) -> Option<String> {
    let needle = label.to_lowercase();
    fields
        .iter()
        .find(|f| f.name.to_lowercase().contains(&needle))
        .map(|f| f.id.clone())
}

pub fn summary(record: &NormalizedRecord) -> String {
    format!(
        "[{}] {}",
        record.text("number").unwrap_or_default(),
        record.text("name").unwrap_or_default()
    )
}

pub fn description(record: &NormalizedRecord) -> String {
    let text = record
        .text("description")
        .map(|html| html_to_text(&html))
        .unwrap_or_default();
    if text.is_empty() {
        EMPTY_DESCRIPTION.to_string()
    } else {
        text
    }
}

pub struct IssueWriter<'a> {
    jira: &'a dyn JiraClient,
    operator: &'a dyn Operator,
    defaults: &'a IssueDefaults,
    field_labels: &'a FieldLabels,
}

impl<'a> IssueWriter<'a> {
    pub fn new(
        jira: &'a dyn JiraClient,
        operator: &'a dyn Operator,
        defaults: &'a IssueDefaults,
        field_labels: &'a FieldLabels,
    ) -> Self {
        Self {
            jira,
            operator,
            defaults,
            field_labels,
        }
    }

    /// Update `existing`, or create a new issue when there is none.
    pub async fn write(
        &self,
        record: &NormalizedRecord,
        existing: Option<Ticket>,
        labels: &[String],
    ) -> Result<Ticket> {
        match existing {
            Some(ticket) => {
                let mut fields = Map::new();
                fields.insert("summary".into(), json!(summary(record)));
                fields.insert("description".into(), json!(description(record)));
                fields.extend(self.custom_fields(record, labels).await?);

                info!(key = %ticket.key, "Updating Jira issue");
                self.jira.update_issue(&ticket, fields).await?;
                Ok(ticket)
            }
            None => {
                let ticket = self.create(record).await?;
                // Custom fields are often missing from the create screen, so
                // they only go out in a follow-up update.
                let custom = self.custom_fields(record, labels).await?;
                if !custom.is_empty() {
                    self.jira.update_issue(&ticket, custom).await?;
                }
                Ok(ticket)
            }
        }
    }

    async fn create(&self, record: &NormalizedRecord) -> Result<Ticket> {
        let project = self
            .operator
            .prompt("JIRA project for new issue", self.defaults.project.as_deref())?;
        let project = project.trim();
        if project.is_empty() {
            bail!("No JIRA project given for new issue");
        }

        let mut fields = Map::new();
        fields.insert("project".into(), json!({ "key": project }));
        fields.insert("summary".into(), json!(summary(record)));
        fields.insert("description".into(), json!(description(record)));
        fields.insert(
            "issuetype".into(),
            json!({ "name": record.text("issue_type").unwrap_or_default() }),
        );
        fields.insert("assignee".into(), json!({ "name": self.defaults.assignee }));

        let ticket = self.jira.create_issue(fields).await?;
        info!(key = %ticket.key, id = %ticket.id, project, "Created Jira issue");
        Ok(ticket)
    }

    async fn custom_fields(
        &self,
        record: &NormalizedRecord,
        labels: &[String],
    ) -> Result<Map<String, Value>> {
        let catalogue = self.jira.fields().await?;
        let mut fields = Map::new();

        let mut put = |label: &str, value: Value| match resolve_field_id(&catalogue, label) {
            Some(id) => {
                fields.insert(id, value);
            }
            None => warn!(label, "No Jira field matches; skipping"),
        };

        put(
            &self.field_labels.code_review,
            record.get("code_review_url").cloned().unwrap_or(Value::Null),
        );
        put(
            &self.field_labels.feature_branch,
            record.text("number").map(Value::String).unwrap_or(Value::Null),
        );
        if !labels.is_empty() {
            put(&self.field_labels.labels, json!(labels));
        }

        Ok(fields)
    }
}
