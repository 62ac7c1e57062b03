pub mod jira;
pub mod versionone;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::model::link::RemoteLink;
use crate::model::story::V1Story;
use crate::model::ticket::{JiraField, JiraRemoteLink, Ticket};

#[async_trait]
pub trait JiraClient: Send + Sync {
    /// Look up an issue by key. `Ok(None)` when JIRA has no such issue.
    async fn issue(&self, key: &str) -> Result<Option<Ticket>>;
    async fn create_issue(&self, fields: Map<String, Value>) -> Result<Ticket>;
    async fn update_issue(&self, ticket: &Ticket, fields: Map<String, Value>) -> Result<()>;
    async fn fields(&self) -> Result<Vec<JiraField>>;
    async fn remote_links(&self, ticket: &Ticket) -> Result<Vec<JiraRemoteLink>>;
    /// Create a web link on the issue and return it with the id JIRA assigned.
    async fn add_remote_link(&self, ticket: &Ticket, link: &RemoteLink)
        -> Result<JiraRemoteLink>;
    async fn delete_remote_link(&self, ticket: &Ticket, link: &JiraRemoteLink) -> Result<()>;
    fn permalink(&self, ticket: &Ticket) -> String;
}

#[async_trait]
pub trait VersionOneClient: Send + Sync {
    /// Select `fields` and the asset's links from every `type_name` asset
    /// whose `Number` equals `number`.
    async fn select(&self, type_name: &str, fields: &[String], number: &str)
        -> Result<Vec<V1Story>>;
    /// Flush the story's pending attribute writes.
    async fn commit(&self, story: &mut V1Story) -> Result<()>;
}

#[cfg(test)]
pub mod tests;
