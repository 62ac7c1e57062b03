use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{JiraClient, VersionOneClient};
use crate::model::link::RemoteLink;
use crate::model::story::V1Story;
use crate::model::ticket::{JiraField, JiraRemoteLink, Ticket};

/// Every call made against [`MockJira`], in order.
#[derive(Debug, Clone, PartialEq)]
pub enum JiraCall {
    Issue(String),
    Create(Map<String, Value>),
    Update(String, Map<String, Value>),
    Fields,
    RemoteLinks(String),
    AddLink(String, RemoteLink),
    DeleteLink(String, RemoteLink),
}

impl JiraCall {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            JiraCall::Create(_) | JiraCall::Update(..) | JiraCall::AddLink(..) | JiraCall::DeleteLink(..)
        )
    }
}

#[derive(Default)]
struct JiraState {
    issues: HashMap<String, Ticket>,
    links: HashMap<String, Vec<JiraRemoteLink>>,
    next_issue: u32,
    next_link: u32,
}

/// In-memory JIRA that records its calls.
pub struct MockJira {
    state: Mutex<JiraState>,
    field_catalogue: Vec<JiraField>,
    pub calls: Arc<Mutex<Vec<JiraCall>>>,
    fail_on_add_link: Option<String>,
}

impl MockJira {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(JiraState {
                next_issue: 1,
                ..Default::default()
            }),
            field_catalogue: Vec::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_on_add_link: None,
        }
    }

    pub fn with_fields(mut self, fields: &[(&str, &str)]) -> Self {
        self.field_catalogue = fields
            .iter()
            .map(|(id, name)| JiraField {
                id: id.to_string(),
                name: name.to_string(),
            })
            .collect();
        self
    }

    pub fn with_issue(self, key: &str) -> Self {
        self.state.lock().unwrap().issues.insert(
            key.to_string(),
            Ticket {
                id: format!("id-{key}"),
                key: key.to_string(),
            },
        );
        self
    }

    pub fn with_link(self, key: &str, title: &str, url: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.next_link += 1;
            let id = state.next_link.to_string();
            state
                .links
                .entry(key.to_string())
                .or_default()
                .push(JiraRemoteLink {
                    id,
                    link: RemoteLink::new(title, url),
                });
        }
        self
    }

    pub fn failing_on_add_link(mut self, title: &str) -> Self {
        self.fail_on_add_link = Some(title.to_string());
        self
    }

    pub fn calls(&self) -> Vec<JiraCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn links_of(&self, key: &str) -> Vec<RemoteLink> {
        self.state
            .lock()
            .unwrap()
            .links
            .get(key)
            .map(|links| links.iter().map(|l| l.link.clone()).collect())
            .unwrap_or_default()
    }

    fn record(&self, call: JiraCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl JiraClient for MockJira {
    async fn issue(&self, key: &str) -> Result<Option<Ticket>> {
        self.record(JiraCall::Issue(key.to_string()));
        Ok(self.state.lock().unwrap().issues.get(key).cloned())
    }

    async fn create_issue(&self, fields: Map<String, Value>) -> Result<Ticket> {
        self.record(JiraCall::Create(fields.clone()));
        let project = fields
            .get("project")
            .and_then(|p| p.get("key"))
            .and_then(Value::as_str)
            .unwrap_or("MOCK")
            .to_string();
        let mut state = self.state.lock().unwrap();
        let key = format!("{project}-{}", state.next_issue);
        state.next_issue += 1;
        let ticket = Ticket {
            id: format!("id-{key}"),
            key: key.clone(),
        };
        state.issues.insert(key, ticket.clone());
        Ok(ticket)
    }

    async fn update_issue(&self, ticket: &Ticket, fields: Map<String, Value>) -> Result<()> {
        self.record(JiraCall::Update(ticket.key.clone(), fields));
        Ok(())
    }

    async fn fields(&self) -> Result<Vec<JiraField>> {
        self.record(JiraCall::Fields);
        Ok(self.field_catalogue.clone())
    }

    async fn remote_links(&self, ticket: &Ticket) -> Result<Vec<JiraRemoteLink>> {
        self.record(JiraCall::RemoteLinks(ticket.key.clone()));
        Ok(self
            .state
            .lock()
            .unwrap()
            .links
            .get(&ticket.key)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_remote_link(
        &self,
        ticket: &Ticket,
        link: &RemoteLink,
    ) -> Result<JiraRemoteLink> {
        self.record(JiraCall::AddLink(ticket.key.clone(), link.clone()));
        if self.fail_on_add_link.as_deref() == Some(link.title.as_str()) {
            anyhow::bail!("Mock failure adding {}", link.title);
        }
        let mut state = self.state.lock().unwrap();
        state.next_link += 1;
        let created = JiraRemoteLink {
            id: state.next_link.to_string(),
            link: link.clone(),
        };
        state
            .links
            .entry(ticket.key.clone())
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn delete_remote_link(&self, ticket: &Ticket, link: &JiraRemoteLink) -> Result<()> {
        self.record(JiraCall::DeleteLink(ticket.key.clone(), link.link.clone()));
        if let Some(links) = self.state.lock().unwrap().links.get_mut(&ticket.key) {
            links.retain(|l| l.id != link.id);
        }
        Ok(())
    }

    fn permalink(&self, ticket: &Ticket) -> String {
        format!("https://jira.example.com/browse/{}", ticket.key)
    }
}

/// In-memory VersionOne keyed by story number.
pub struct MockVersionOne {
    stories: Mutex<HashMap<String, V1Story>>,
    pub commits: Arc<Mutex<Vec<(String, Map<String, Value>)>>>,
    pub selects: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockVersionOne {
    pub fn new() -> Self {
        Self {
            stories: Mutex::new(HashMap::new()),
            commits: Arc::new(Mutex::new(Vec::new())),
            selects: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_story(self, number: &str, story: V1Story) -> Self {
        self.stories
            .lock()
            .unwrap()
            .insert(number.to_string(), story);
        self
    }

    pub fn commits(&self) -> Vec<(String, Map<String, Value>)> {
        self.commits.lock().unwrap().clone()
    }
}

#[async_trait]
impl VersionOneClient for MockVersionOne {
    async fn select(
        &self,
        type_name: &str,
        fields: &[String],
        number: &str,
    ) -> Result<Vec<V1Story>> {
        self.selects
            .lock()
            .unwrap()
            .push((type_name.to_string(), number.to_string()));
        let stories = self.stories.lock().unwrap();
        let Some(story) = stories.get(number) else {
            return Ok(vec![]);
        };
        if story.type_name != type_name {
            return Ok(vec![]);
        }
        // Only selected attributes come back, like the real query.
        let mut selected = story.clone();
        selected.attributes.retain(|name, _| fields.contains(name));
        Ok(vec![selected])
    }

    async fn commit(&self, story: &mut V1Story) -> Result<()> {
        if story.pending().is_empty() {
            return Ok(());
        }
        let written: Map<String, Value> = story
            .pending()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.commits
            .lock()
            .unwrap()
            .push((story.oid.clone(), written));
        story.clear_pending();
        Ok(())
    }
}

#[tokio::test]
async fn mock_jira_creates_sequential_keys() {
    let jira = MockJira::new();
    let mut fields = Map::new();
    fields.insert("project".into(), serde_json::json!({"key": "PROJ"}));
    let first = jira.create_issue(fields.clone()).await.unwrap();
    let second = jira.create_issue(fields).await.unwrap();
    assert_eq!(first.key, "PROJ-1");
    assert_eq!(second.key, "PROJ-2");
    assert!(jira.issue("PROJ-2").await.unwrap().is_some());
}

#[tokio::test]
async fn mock_versionone_filters_by_type() {
    let v1 = MockVersionOne::new().with_story(
        "D-1",
        V1Story::new("Defect:1", "Defect", "").with_attribute("Name", "Crash"),
    );
    let names = vec!["Name".to_string()];
    assert!(v1.select("Story", &names, "D-1").await.unwrap().is_empty());
    assert_eq!(v1.select("Defect", &names, "D-1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn mock_failure_propagates() {
    let jira = MockJira::new().with_issue("PROJ-1").failing_on_add_link("Wireframe");
    let ticket = jira.issue("PROJ-1").await.unwrap().unwrap();
    let result = jira
        .add_remote_link(&ticket, &RemoteLink::new("Wireframe", "http://wireframe"))
        .await;
    assert!(result.unwrap_err().to_string().contains("Mock failure"));
}
