//! Time-bounded cache of custom field definitions
//!
//! Maps CRM field ids to their normalized keys. The mapping is replaced as a
//! whole on refresh. Concurrent misses may each fetch; the last one to finish
//! wins. No single-flight coordination is attempted since a duplicate listing
//! is cheap and readers already tolerate a stale mapping for one TTL.

use crate::api::constants::CONTACT_FIELD_PREFIX;
use crate::api::error::CrmResult;
use crate::api::models::FieldDefinitionList;
use crate::api::resilience::clock::{system_clock, SharedClock};
use log::{debug, info};
use std::future::Future;
use std::ops::Index;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Field id -> normalized field key, kept in listing order
///
/// Lookups by key return the first matching definition the CRM listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    entries: Vec<(String, String)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the key for `id`; a repeated id keeps its first position
    pub fn insert(&mut self, id: String, key: String) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = key,
            None => self.entries.push((id, key)),
        }
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, key)| key.as_str())
    }

    pub fn contains_key(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(id, key)` pairs in listing order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(id, key)| (id.as_str(), key.as_str()))
    }
}

impl FromIterator<(String, String)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (id, key) in iter {
            map.insert(id, key);
        }
        map
    }
}

impl<const N: usize> From<[(String, String); N]> for FieldMap {
    fn from(entries: [(String, String); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl Index<&str> for FieldMap {
    type Output = String;

    fn index(&self, id: &str) -> &String {
        match self.entries.iter().find(|(existing, _)| existing == id) {
            Some((_, key)) => key,
            None => panic!("no custom field with id {}", id),
        }
    }
}

#[derive(Debug)]
struct CachedFields {
    fields: Arc<FieldMap>,
    fetched_at: i64,
}

#[derive(Debug, Clone)]
pub struct FieldDefinitionCache {
    ttl: Duration,
    clock: SharedClock,
    state: Arc<Mutex<Option<CachedFields>>>,
}

impl FieldDefinitionCache {
    /// Create an empty cache whose entries live for `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, system_clock())
    }

    /// Create an empty cache reading time from `clock`
    pub fn with_clock(ttl: Duration, clock: SharedClock) -> Self {
        Self {
            ttl,
            clock,
            state: Arc::new(Mutex::new(None)),
        }
    }

    /// The cached mapping if it is younger than the TTL
    pub fn fresh(&self) -> Option<Arc<FieldMap>> {
        let now = self.clock.now_millis();
        let state = self.lock();

        state
            .as_ref()
            .filter(|cached| now - cached.fetched_at < self.ttl.as_millis() as i64)
            .map(|cached| cached.fields.clone())
    }

    /// Replace the whole mapping, stamping it with the current time
    pub fn store(&self, fields: FieldMap) -> Arc<FieldMap> {
        self.store_at(fields, self.clock.now_millis())
    }

    /// Replace the whole mapping, stamping it as fetched at `fetched_at`
    fn store_at(&self, fields: FieldMap, fetched_at: i64) -> Arc<FieldMap> {
        let fields = Arc::new(fields);

        *self.lock() = Some(CachedFields {
            fields: fields.clone(),
            fetched_at,
        });

        fields
    }

    /// Drop the cached mapping so the next lookup fetches again
    pub fn invalidate(&self) {
        *self.lock() = None;
    }

    /// Return the cached mapping, or fetch and cache a new one
    ///
    /// The lock is not held while `fetch` runs. A fetched mapping is aged
    /// from the moment the request started.
    pub async fn get_or_refresh<F, Fut>(&self, fetch: F) -> CrmResult<Arc<FieldMap>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CrmResult<FieldDefinitionList>>,
    {
        if let Some(fields) = self.fresh() {
            debug!("Using {} cached custom field definitions", fields.len());
            return Ok(fields);
        }

        let requested_at = self.clock.now_millis();
        let list = fetch().await?;
        let fields = self.store_at(build_field_map(list), requested_at);
        info!("Loaded {} custom field definitions", fields.len());
        Ok(fields)
    }

    fn lock(&self) -> MutexGuard<'_, Option<CachedFields>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Build the id -> key mapping, stripping the `contact.` namespace prefix
pub fn build_field_map(list: FieldDefinitionList) -> FieldMap {
    list.custom_fields
        .into_iter()
        .filter_map(|field| match (field.id, field.field_key) {
            (Some(id), Some(key)) if !id.is_empty() && !key.is_empty() => {
                Some((id, normalize_field_key(&key).to_string()))
            }
            _ => None,
        })
        .collect()
}

/// Strip the `contact.` namespace from a field key
pub fn normalize_field_key(key: &str) -> &str {
    key.strip_prefix(CONTACT_FIELD_PREFIX).unwrap_or(key)
}

/// First field id, in listing order, whose key equals `field_name`
pub fn field_id_for<'a>(fields: &'a FieldMap, field_name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(_, key)| *key == field_name)
        .map(|(id, _)| id)
}

/// Known field keys in listing order
pub fn field_names(fields: &FieldMap) -> Vec<String> {
    fields.iter().map(|(_, key)| key.to_string()).collect()
}
