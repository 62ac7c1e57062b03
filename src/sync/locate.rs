use anyhow::Result;
use tracing::debug;

use crate::error::SyncError;
use crate::model::story::NormalizedRecord;
use crate::model::ticket::Ticket;
use crate::providers::JiraClient;

/// Find the JIRA issue a story already points at.
///
/// A story with no stored key has never been mirrored, so no request is
/// made. A stored key JIRA does not know is a dangling reference and
/// fails with [`SyncError::NotFound`].
pub async fn locate(jira: &dyn JiraClient, record: &NormalizedRecord) -> Result<Option<Ticket>> {
    let Some(key) = record.text("jira_issue") else {
        return Ok(None);
    };
    let key = key.trim();

    debug!(key, "Looking up existing Jira issue");
    match jira.issue(key).await? {
        Some(ticket) => Ok(Some(ticket)),
        None => Err(SyncError::NotFound(format!("Jira issue {key} does not exist")).into()),
    }
}
