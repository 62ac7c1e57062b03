use serde::{Deserialize, Serialize};

/// A named external URL, on either side of the sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteLink {
    pub title: String,
    pub url: String,
}

impl RemoteLink {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}
