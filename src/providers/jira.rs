use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::JiraClient;
use crate::model::link::RemoteLink;
use crate::model::ticket::{JiraField, JiraRemoteLink, Ticket};

/// JIRA REST API v2 client using basic authentication.
pub struct JiraRestClient {
    base_url: String,
    auth_header: String,
    client: reqwest::Client,
}

impl JiraRestClient {
    pub fn new(domain: &str, username: &str, password: &str) -> Self {
        let creds = format!("{username}:{password}");
        let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
        Self {
            base_url: base_url_from_domain(domain),
            auth_header: format!("Basic {encoded}"),
            client: reqwest::Client::new(),
        }
    }

    fn issue_url(&self, key: &str) -> String {
        format!(
            "{}/rest/api/2/issue/{}",
            self.base_url,
            urlencoding::encode(key)
        )
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
    }
}

/// Accepts `jira.example.com`, `https://jira.example.com/` and the like.
pub fn base_url_from_domain(domain: &str) -> String {
    let trimmed = domain.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

async fn ensure_success(resp: reqwest::Response, action: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    anyhow::bail!("Jira {action} failed ({status}): {body}")
}

#[derive(Deserialize)]
struct IssueRef {
    id: String,
    key: String,
}

#[derive(Deserialize)]
struct RemoteLinkEntry {
    id: Value,
    object: RemoteObject,
}

#[derive(Deserialize)]
struct RemoteObject {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
}

/// Body of a successful remote link POST.
#[derive(Deserialize)]
struct CreatedLink {
    id: Value,
}

/// JIRA sends link ids as numbers or strings depending on version.
fn link_id(id: Value) -> String {
    match id {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn into_remote_links(entries: Vec<RemoteLinkEntry>) -> Vec<JiraRemoteLink> {
    entries
        .into_iter()
        .map(|entry| JiraRemoteLink {
            id: link_id(entry.id),
            link: RemoteLink::new(entry.object.title, entry.object.url),
        })
        .collect()
}

#[async_trait]
impl JiraClient for JiraRestClient {
    async fn issue(&self, key: &str) -> Result<Option<Ticket>> {
        let resp = self
            .get(&format!("{}?fields=summary", self.issue_url(key)))
            .send()
            .await
            .context("Jira API request failed")?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let issue: IssueRef = ensure_success(resp, "issue lookup")
            .await?
            .json()
            .await
            .context("Failed to parse Jira issue")?;
        Ok(Some(Ticket {
            id: issue.id,
            key: issue.key,
        }))
    }

    async fn create_issue(&self, fields: Map<String, Value>) -> Result<Ticket> {
        debug!(?fields, "Creating Jira issue");
        let resp = self
            .client
            .post(format!("{}/rest/api/2/issue", self.base_url))
            .header("Authorization", &self.auth_header)
            .json(&json!({ "fields": fields }))
            .send()
            .await
            .context("Jira API request failed")?;
        let created: IssueRef = ensure_success(resp, "issue creation")
            .await?
            .json()
            .await
            .context("Failed to parse Jira create response")?;
        Ok(Ticket {
            id: created.id,
            key: created.key,
        })
    }

    async fn update_issue(&self, ticket: &Ticket, fields: Map<String, Value>) -> Result<()> {
        debug!(key = %ticket.key, ?fields, "Updating Jira issue");
        let resp = self
            .client
            .put(self.issue_url(&ticket.key))
            .header("Authorization", &self.auth_header)
            .json(&json!({ "fields": fields }))
            .send()
            .await
            .context("Jira API request failed")?;
        ensure_success(resp, "issue update").await?;
        Ok(())
    }

    async fn fields(&self) -> Result<Vec<JiraField>> {
        let resp = self
            .get(&format!("{}/rest/api/2/field", self.base_url))
            .send()
            .await
            .context("Jira API request failed")?;
        ensure_success(resp, "field listing")
            .await?
            .json()
            .await
            .context("Failed to parse Jira field list")
    }

    async fn remote_links(&self, ticket: &Ticket) -> Result<Vec<JiraRemoteLink>> {
        let resp = self
            .get(&format!("{}/remotelink", self.issue_url(&ticket.key)))
            .send()
            .await
            .context("Jira API request failed")?;
        let entries: Vec<RemoteLinkEntry> = ensure_success(resp, "remote link listing")
            .await?
            .json()
            .await
            .context("Failed to parse Jira remote links")?;
        Ok(into_remote_links(entries))
    }

    async fn add_remote_link(
        &self,
        ticket: &Ticket,
        link: &RemoteLink,
    ) -> Result<JiraRemoteLink> {
        // Plain web link; application links are never consulted.
        let body = json!({ "object": { "url": link.url, "title": link.title } });
        let resp = self
            .client
            .post(format!("{}/remotelink", self.issue_url(&ticket.key)))
            .header("Authorization", &self.auth_header)
            .json(&body)
            .send()
            .await
            .context("Jira API request failed")?;
        let created: CreatedLink = ensure_success(resp, "remote link creation")
            .await?
            .json()
            .await
            .context("Failed to parse Jira remote link response")?;
        Ok(JiraRemoteLink {
            id: link_id(created.id),
            link: link.clone(),
        })
    }

    async fn delete_remote_link(&self, ticket: &Ticket, link: &JiraRemoteLink) -> Result<()> {
        let resp = self
            .client
            .delete(format!(
                "{}/remotelink/{}",
                self.issue_url(&ticket.key),
                urlencoding::encode(&link.id)
            ))
            .header("Authorization", &self.auth_header)
            .send()
            .await
            .context("Jira API request failed")?;
        ensure_success(resp, "remote link deletion").await?;
        Ok(())
    }

    fn permalink(&self, ticket: &Ticket) -> String {
        format!("{}/browse/{}", self.base_url, ticket.key)
    }
}
