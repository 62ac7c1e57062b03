use anyhow::{bail, Result};
use tracing::{debug, warn};

use crate::config::{JiraSettings, SettingsDiff, VersionOneSettings};
use crate::credentials::{CredentialStore, Service};
use crate::operator::Operator;
use crate::providers::versionone::instance_base_url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionOneLogin {
    pub username: String,
    pub instance_url: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JiraLogin {
    pub username: String,
    pub domain: String,
    pub project: String,
    pub password: String,
}

/// Gather everything needed to talk to VersionOne, asking for what the
/// configuration lacks.
pub fn versionone_login(
    settings: &VersionOneSettings,
    operator: &dyn Operator,
    credentials: &dyn CredentialStore,
) -> Result<(VersionOneLogin, SettingsDiff)> {
    let mut saved = true;

    let username = match &settings.username {
        Some(u) => u.clone(),
        None => {
            saved = false;
            required(operator, "VersionOne Username")?
        }
    };
    let instance_url = match &settings.instance_url {
        Some(u) => u.clone(),
        None => {
            saved = false;
            required(
                operator,
                "VersionOne Instance URL (ex: http://www.v1host.com/MyInstance100/)",
            )?
        }
    };
    // Reject a bad URL before asking for a password.
    instance_base_url(&instance_url)?;

    let password = password(Service::VersionOne, "VersionOne Password", operator, credentials)?;

    let mut diff = SettingsDiff::default();
    if !saved && operator.confirm("Save VersionOne username and instance URL?")? {
        diff.set("versionone", "username", &username);
        diff.set("versionone", "instance_url", &instance_url);
    }

    debug!(instance_url = %instance_url, username = %username, "VersionOne login ready");
    Ok((
        VersionOneLogin {
            username,
            instance_url,
            password,
        },
        diff,
    ))
}

/// Gather everything needed to talk to JIRA, asking for what the
/// configuration lacks.
pub fn jira_login(
    settings: &JiraSettings,
    operator: &dyn Operator,
    credentials: &dyn CredentialStore,
) -> Result<(JiraLogin, SettingsDiff)> {
    let mut saved = true;

    let username = match &settings.username {
        Some(u) => u.clone(),
        None => {
            saved = false;
            required(operator, "JIRA Username")?
        }
    };
    let domain = match &settings.domain {
        Some(d) => d.clone(),
        None => {
            saved = false;
            required(operator, "JIRA Domain (ex: http://jira.mycompany.com/)")?
        }
    };
    let project = match &settings.project {
        Some(p) => p.clone(),
        None => {
            saved = false;
            required(operator, "Default JIRA project for new issues")?
        }
    };

    let password = password(Service::Jira, "JIRA Password", operator, credentials)?;

    let mut diff = SettingsDiff::default();
    if !saved && operator.confirm("Save JIRA username, domain, and project?")? {
        diff.set("jira", "username", &username);
        diff.set("jira", "domain", &domain);
        diff.set("jira", "project", &project);
    }

    debug!(domain = %domain, project = %project, username = %username, "JIRA login ready");
    Ok((
        JiraLogin {
            username,
            domain,
            project,
            password,
        },
        diff,
    ))
}

fn required(operator: &dyn Operator, label: &str) -> Result<String> {
    let value = operator.prompt(label, None)?;
    let value = value.trim();
    if value.is_empty() {
        bail!("{label} is required");
    }
    Ok(value.to_string())
}

fn password(
    service: Service,
    label: &str,
    operator: &dyn Operator,
    credentials: &dyn CredentialStore,
) -> Result<String> {
    match credentials.get(service) {
        Ok(Some(secret)) => {
            debug!(service = service.as_str(), "Using saved password");
            return Ok(secret);
        }
        Ok(None) => {}
        Err(e) => warn!(service = service.as_str(), error = %e, "Could not read saved password"),
    }

    let secret = operator.prompt_secret(label)?;
    if operator.confirm(&format!("Save {label} to the system keyring?"))? {
        credentials.set(service, &secret)?;
    }
    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::memory::MemoryStore;
    use crate::error::SyncError;
    use crate::operator::scripted::ScriptedOperator;

    #[test]
    fn configured_versionone_uses_saved_password_without_prompting() {
        let settings = VersionOneSettings {
            username: Some("jdoe".into()),
            instance_url: Some("https://v1.example.com/Inst/".into()),
        };
        let operator = ScriptedOperator::new(&[]);
        let store = MemoryStore::default();
        store.set(Service::VersionOne, "hunter2").unwrap();

        let (login, diff) = versionone_login(&settings, &operator, &store).unwrap();

        assert_eq!(login.password, "hunter2");
        assert!(diff.is_empty());
        assert!(operator.asked.borrow().is_empty());
    }

    #[test]
    fn prompted_versionone_settings_are_saved_on_consent() {
        let operator = ScriptedOperator::new(&[
            "jdoe",
            "https://v1.example.com/Inst/",
            "hunter2",
            "n",
            "y",
        ]);
        let store = MemoryStore::default();

        let (login, diff) =
            versionone_login(&VersionOneSettings::default(), &operator, &store).unwrap();

        assert_eq!(login.username, "jdoe");
        assert_eq!(store.get(Service::VersionOne).unwrap(), None);
        let mut expected = SettingsDiff::default();
        expected.set("versionone", "username", "jdoe");
        expected.set("versionone", "instance_url", "https://v1.example.com/Inst/");
        assert_eq!(diff, expected);
    }

    #[test]
    fn bad_instance_url_fails_before_password_prompt() {
        let settings = VersionOneSettings {
            username: Some("jdoe".into()),
            instance_url: Some("https://v1.example.com/".into()),
        };
        let operator = ScriptedOperator::new(&[]);
        let err = versionone_login(&settings, &operator, &MemoryStore::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::Configuration(_))
        ));
        assert!(operator.asked.borrow().is_empty());
    }

    #[test]
    fn jira_password_is_stored_on_consent() {
        let settings = JiraSettings {
            username: Some("jdoe".into()),
            domain: Some("https://jira.example.com".into()),
            project: Some("PROJ".into()),
            ..JiraSettings::default()
        };
        let operator = ScriptedOperator::new(&["s3cret", "y"]);
        let store = MemoryStore::default();

        let (login, diff) = jira_login(&settings, &operator, &store).unwrap();

        assert_eq!(login.project, "PROJ");
        assert!(diff.is_empty());
        assert_eq!(store.get(Service::Jira).unwrap().as_deref(), Some("s3cret"));
    }

    #[test]
    fn blank_required_answer_fails() {
        let operator = ScriptedOperator::new(&["  "]);
        let result = jira_login(&JiraSettings::default(), &operator, &MemoryStore::default());
        assert!(result.unwrap_err().to_string().contains("JIRA Username"));
    }
}
