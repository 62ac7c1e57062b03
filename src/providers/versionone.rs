use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Url;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::VersionOneClient;
use crate::error::SyncError;
use crate::model::link::RemoteLink;
use crate::model::story::V1Story;

/// VersionOne client over `query.v1` (reads) and `rest-1.v1` (writes).
pub struct VersionOneRestClient {
    base_url: String,
    auth_header: String,
    client: reqwest::Client,
}

impl VersionOneRestClient {
    pub fn new(instance_url: &str, username: &str, password: &str) -> Result<Self, SyncError> {
        let base_url = instance_base_url(instance_url)?;
        let creds = format!("{username}:{password}");
        let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
        Ok(Self {
            base_url,
            auth_header: format!("Basic {encoded}"),
            client: reqwest::Client::new(),
        })
    }
}

/// Reduce an instance URL such as `https://www.v1host.com/MyInstance100/`
/// to `https://www.v1host.com/MyInstance100`.
pub fn instance_base_url(url: &str) -> Result<String, SyncError> {
    let parsed = Url::parse(url.trim()).map_err(|e| {
        SyncError::Configuration(format!("'{url}' is not a valid VersionOne URL: {e}"))
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SyncError::Configuration(format!(
            "VersionOne URL '{url}' must use http or https"
        )));
    }
    let host = parsed.host_str().ok_or_else(|| {
        SyncError::Configuration(format!("VersionOne URL '{url}' has no host"))
    })?;
    let instance = parsed
        .path_segments()
        .and_then(|mut segments| segments.find(|s| !s.is_empty()))
        .ok_or_else(|| {
            SyncError::Configuration(format!(
                "Could not identify a VersionOne instance name from '{url}'."
            ))
        })?;

    let port = parsed.port().map(|p| format!(":{p}")).unwrap_or_default();
    debug!(host, instance, "Resolved VersionOne instance");
    Ok(format!("{}://{host}{port}/{instance}", parsed.scheme()))
}

pub fn story_url(base_url: &str, oid: &str) -> String {
    format!("{base_url}/assetdetail.v1?Oid={oid}")
}

fn query_body(type_name: &str, fields: &[String], number: &str) -> Value {
    let mut select: Vec<Value> = fields.iter().map(|f| Value::String(f.clone())).collect();
    select.push(json!({ "from": "Links", "select": ["Name", "URL"] }));
    json!({
        "from": type_name,
        "select": select,
        "where": { "Number": number },
    })
}

fn parse_assets(base_url: &str, type_name: &str, body: Value) -> Result<Vec<V1Story>> {
    let results: Vec<Vec<Map<String, Value>>> =
        serde_json::from_value(body).context("Unexpected VersionOne query response")?;

    let mut stories = Vec::new();
    for mut asset in results.into_iter().flatten() {
        let oid = asset
            .remove("_oid")
            .and_then(|v| v.as_str().map(String::from))
            .context("VersionOne asset without _oid")?;
        let links = match asset.remove("Links") {
            Some(Value::Array(entries)) => entries
                .iter()
                .map(|entry| {
                    RemoteLink::new(
                        entry.get("Name").and_then(Value::as_str).unwrap_or_default(),
                        entry.get("URL").and_then(Value::as_str).unwrap_or_default(),
                    )
                })
                .collect(),
            _ => Vec::new(),
        };

        let mut story = V1Story::new(oid.clone(), type_name, story_url(base_url, &oid));
        story.attributes = asset;
        story.links = links;
        stories.push(story);
    }
    Ok(stories)
}

fn commit_body(story: &V1Story) -> Value {
    let attributes: Map<String, Value> = story
        .pending()
        .iter()
        .map(|(name, value)| (name.clone(), json!({ "value": value, "act": "set" })))
        .collect();
    json!({ "Attributes": attributes })
}

#[async_trait]
impl VersionOneClient for VersionOneRestClient {
    async fn select(
        &self,
        type_name: &str,
        fields: &[String],
        number: &str,
    ) -> Result<Vec<V1Story>> {
        let resp = self
            .client
            .post(format!("{}/query.v1", self.base_url))
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .json(&query_body(type_name, fields, number))
            .send()
            .await
            .context("VersionOne API request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("VersionOne query for {type_name} failed ({status}): {body}");
        }

        let body: Value = resp
            .json()
            .await
            .context("Failed to parse VersionOne response")?;
        parse_assets(&self.base_url, type_name, body)
    }

    async fn commit(&self, story: &mut V1Story) -> Result<()> {
        if story.pending().is_empty() {
            return Ok(());
        }

        let url = format!(
            "{}/rest-1.v1/Data/{}/{}",
            self.base_url,
            story.type_name,
            story.id()
        );
        let resp = self
            .client
            .post(url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .json(&commit_body(story))
            .send()
            .await
            .context("VersionOne API request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("VersionOne update of {} failed ({status}): {body}", story.oid);
        }

        story.clear_pending();
        Ok(())
    }
}
