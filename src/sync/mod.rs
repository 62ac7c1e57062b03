pub mod links;
pub mod locate;
pub mod normalize;
pub mod schema;
pub mod writer;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{error, info};

use crate::error::SyncError;
use crate::model::story::V1Story;
use crate::model::ticket::Ticket;
use crate::operator::Operator;
use crate::providers::{JiraClient, VersionOneClient};
use links::reconcile;
use locate::locate;
use normalize::normalize;
use schema::SchemaMap;
use writer::{FieldLabels, IssueDefaults, IssueWriter};

/// Find the story numbered `number`, trying each story type in turn.
pub async fn find_story(
    v1: &dyn VersionOneClient,
    schemas: &SchemaMap,
    number: &str,
) -> Result<V1Story> {
    for schema in schemas.iter() {
        let found = v1
            .select(&schema.type_name, &schema.source_fields(), number)
            .await?;
        if let Some(story) = found.into_iter().next() {
            return Ok(story);
        }
    }
    Err(SyncError::NotFound(format!("No story found matching {number}")).into())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synced {
    pub number: String,
    pub key: String,
    pub permalink: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failed {
    pub number: String,
    pub reason: String,
}

/// Outcome of a batch: every identifier lands in exactly one list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub synced: Vec<Synced>,
    pub failed: Vec<Failed>,
}

impl SyncReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn log_summary(&self) {
        for s in &self.synced {
            info!(story = %s.number, key = %s.key, url = %s.permalink, "Synced");
        }
        for f in &self.failed {
            error!(story = %f.number, reason = %f.reason, "Failed");
        }
        info!(
            synced = self.synced.len(),
            failed = self.failed.len(),
            "Finished"
        );
    }
}

/// Mirrors VersionOne stories into JIRA, one story at a time.
pub struct Reflector<'a> {
    v1: &'a dyn VersionOneClient,
    jira: &'a dyn JiraClient,
    operator: &'a dyn Operator,
    schemas: &'a SchemaMap,
    defaults: &'a IssueDefaults,
    field_labels: &'a FieldLabels,
}

impl<'a> Reflector<'a> {
    pub fn new(
        v1: &'a dyn VersionOneClient,
        jira: &'a dyn JiraClient,
        operator: &'a dyn Operator,
        schemas: &'a SchemaMap,
        defaults: &'a IssueDefaults,
        field_labels: &'a FieldLabels,
    ) -> Self {
        Self {
            v1,
            jira,
            operator,
            schemas,
            defaults,
            field_labels,
        }
    }

    /// Sync every story in order. A failing story is recorded and the
    /// batch moves on.
    pub async fn run(&self, numbers: &[String], labels: &[String]) -> SyncReport {
        let mut report = SyncReport::default();
        for number in numbers {
            info!(story = %number, "Processing story");
            match self.sync_story(number, labels).await {
                Ok(ticket) => report.synced.push(Synced {
                    number: number.clone(),
                    permalink: self.jira.permalink(&ticket),
                    key: ticket.key,
                }),
                Err(e) => {
                    let reason = format!("{e:#}");
                    error!(story = %number, reason = %reason, "Story failed");
                    report.failed.push(Failed {
                        number: number.clone(),
                        reason,
                    });
                }
            }
        }
        report
    }

    pub async fn sync_story(&self, number: &str, labels: &[String]) -> Result<Ticket> {
        let mut story = find_story(self.v1, self.schemas, number).await?;
        let schema = self.schemas.get(&story.type_name).ok_or_else(|| {
            SyncError::NotFound(format!("no schema for VersionOne type '{}'", story.type_name))
        })?;
        let record = normalize(&story, self.schemas)?;

        let existing = locate(self.jira, &record).await?;
        let writer = IssueWriter::new(self.jira, self.operator, self.defaults, self.field_labels);
        let ticket = writer.write(&record, existing, labels).await?;

        reconcile(self.jira, &ticket, &story.links, &story.url)
            .await
            .with_context(|| format!("Failed to sync links of {}", ticket.key))?;

        let jira_issue_field = schema
            .source_field("jira_issue")
            .context("schema has no jira_issue mapping")?;
        story.set(jira_issue_field, Value::String(ticket.key.clone()));
        self.v1
            .commit(&mut story)
            .await
            .with_context(|| format!("Failed to record {} on {}", ticket.key, story.oid))?;

        info!(story = %number, key = %ticket.key, "Story mirrored");
        Ok(ticket)
    }
}
