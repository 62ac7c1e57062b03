use serde::{Deserialize, Serialize};

use super::link::RemoteLink;

/// Handle on a JIRA issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub key: String,
}

/// Entry of the JIRA field catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JiraField {
    pub id: String,
    pub name: String,
}

/// A remote link already attached to a JIRA issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JiraRemoteLink {
    pub id: String,
    pub link: RemoteLink,
}
