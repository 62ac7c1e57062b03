use anyhow::{Context, Result};
use tracing::info;

use crate::config::APP_NAME;

/// Which remote service a stored password belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    VersionOne,
    Jira,
}

impl Service {
    pub const ALL: [Service; 2] = [Service::VersionOne, Service::Jira];

    pub fn as_str(&self) -> &'static str {
        match self {
            Service::VersionOne => "versionone",
            Service::Jira => "jira",
        }
    }
}

pub trait CredentialStore {
    fn get(&self, service: Service) -> Result<Option<String>>;
    fn set(&self, service: Service, secret: &str) -> Result<()>;
    /// Removing an entry that does not exist is not an error.
    fn delete(&self, service: Service) -> Result<()>;
}

/// Passwords in the platform keyring under [`APP_NAME`].
pub struct KeyringStore;

impl KeyringStore {
    fn entry(&self, service: Service) -> Result<keyring::Entry> {
        keyring::Entry::new(APP_NAME, service.as_str())
            .with_context(|| format!("Failed to open keyring entry for {}", service.as_str()))
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, service: Service) -> Result<Option<String>> {
        match self.entry(service)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read password from keyring"),
        }
    }

    fn set(&self, service: Service, secret: &str) -> Result<()> {
        self.entry(service)?
            .set_password(secret)
            .context("Failed to store password in keyring")
    }

    fn delete(&self, service: Service) -> Result<()> {
        match self.entry(service)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete password from keyring"),
        }
    }
}

pub fn reset_saved_passwords(store: &dyn CredentialStore) -> Result<()> {
    for service in Service::ALL {
        store.delete(service)?;
        info!(service = service.as_str(), "Cleared saved password");
    }
    Ok(())
}
