use anyhow::Result;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::model::link::RemoteLink;
use crate::model::ticket::{JiraRemoteLink, Ticket};
use crate::providers::JiraClient;

/// Title of the link every mirrored issue carries back to its story.
pub const BACKREFERENCE_TITLE: &str = "VersionOne Story";

/// Make the ticket's remote links match the story's links, plus the
/// backreference to `story_url`. Links are identified by title. Any failed
/// call aborts the pass.
///
/// Titles JIRA already holds more than once are not collapsed; only the
/// last link listed under a title is compared and replaced.
pub async fn reconcile(
    jira: &dyn JiraClient,
    ticket: &Ticket,
    story_links: &[RemoteLink],
    story_url: &str,
) -> Result<()> {
    let mut existing: HashMap<String, JiraRemoteLink> = jira
        .remote_links(ticket)
        .await?
        .into_iter()
        .map(|link| (link.link.title.clone(), link))
        .collect();

    for wanted in story_links {
        if let Some(current) = existing.get(&wanted.title) {
            if current.link.url != wanted.url {
                debug!(key = %ticket.key, title = %wanted.title, "Replacing stale remote link");
                jira.delete_remote_link(ticket, current).await?;
                existing.remove(&wanted.title);
            }
        }
        // Not an else branch: a link deleted above is recreated here.
        if !existing.contains_key(&wanted.title) {
            info!(key = %ticket.key, title = %wanted.title, url = %wanted.url, "Adding remote link");
            let created = jira.add_remote_link(ticket, wanted).await?;
            existing.insert(wanted.title.clone(), created);
        }
    }

    if !existing.contains_key(BACKREFERENCE_TITLE) {
        info!(key = %ticket.key, url = story_url, "Adding VersionOne backreference");
        jira.add_remote_link(ticket, &RemoteLink::new(BACKREFERENCE_TITLE, story_url))
            .await?;
    }
    Ok(())
}
