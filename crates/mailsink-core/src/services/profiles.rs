/// Saved relay profiles
use crate::error::MailsinkError;
use crate::models::{RelayProfile, TenantId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// Name-keyed relay profiles.
///
/// Profiles loaded from configuration are shared by every tenant; profiles
/// saved through a release belong to the saving tenant only. A name is unique
/// across both scopes as seen by one tenant.
#[derive(Default)]
pub struct ProfileRegistry {
    shared: BTreeMap<String, RelayProfile>,
    saved: Mutex<HashMap<TenantId, BTreeMap<String, RelayProfile>>>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shared(profiles: impl IntoIterator<Item = RelayProfile>) -> Self {
        Self {
            shared: profiles
                .into_iter()
                .map(|profile| (profile.name.clone(), profile))
                .collect(),
            saved: Mutex::new(HashMap::new()),
        }
    }

    fn poisoned<T>(_: T) -> MailsinkError {
        MailsinkError::Storage("relay profile registry lock poisoned".to_string())
    }

    /// Adds a profile for the tenant. The uniqueness check and the insert
    /// happen under one lock; a duplicate leaves the registry untouched.
    pub fn save(&self, tenant: &TenantId, profile: RelayProfile) -> Result<(), MailsinkError> {
        if profile.name.is_empty() {
            return Err(MailsinkError::BadRequest(
                "profile name required to save a relay profile".to_string(),
            ));
        }

        let mut saved = self.saved.lock().map_err(Self::poisoned)?;

        let taken = self.shared.contains_key(&profile.name)
            || saved
                .get(tenant)
                .is_some_and(|profiles| profiles.contains_key(&profile.name));
        if taken {
            return Err(MailsinkError::Conflict(format!(
                "Server already exists named {}",
                profile.name
            )));
        }

        tracing::info!(tenant = %tenant, name = %profile.name, "Saved relay profile");
        saved
            .entry(tenant.clone())
            .or_default()
            .insert(profile.name.clone(), profile);
        Ok(())
    }

    pub fn get(&self, tenant: &TenantId, name: &str) -> Result<Option<RelayProfile>, MailsinkError> {
        let saved = self.saved.lock().map_err(Self::poisoned)?;
        Ok(saved
            .get(tenant)
            .and_then(|profiles| profiles.get(name))
            .or_else(|| self.shared.get(name))
            .cloned())
    }

    /// Every profile visible to the tenant, by name
    pub fn list(&self, tenant: &TenantId) -> Result<BTreeMap<String, RelayProfile>, MailsinkError> {
        let mut visible = self.shared.clone();
        if let Some(profiles) = self.saved.lock().map_err(Self::poisoned)?.get(tenant) {
            visible.extend(profiles.iter().map(|(name, p)| (name.clone(), p.clone())));
        }
        Ok(visible)
    }
}
