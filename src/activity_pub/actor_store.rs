use std::collections::HashMap;

use anyhow::{Result, bail};
use httpsig::KeyResolver;
use tracing::debug;

use super::model::{Actor, Document};

/// Public keys of actors the caller already holds, keyed by key id.
///
/// Built once; lookups never touch the network.
#[derive(Debug, Clone, Default)]
pub struct ActorStore {
    keys: HashMap<String, String>,
    /// Actor id to key id, for `keyId`s that name the actor itself.
    owners: HashMap<String, String>,
}

impl ActorStore {
    pub fn from_actors<'a>(actors: impl IntoIterator<Item = &'a Actor>) -> ActorStore {
        let mut store = ActorStore::default();
        for actor in actors {
            store.insert(actor);
        }
        store
    }

    /// Actors found among `documents`; everything else is skipped.
    pub fn from_documents<'a>(documents: impl IntoIterator<Item = &'a Document>) -> ActorStore {
        ActorStore::from_actors(documents.into_iter().filter_map(Document::as_actor))
    }

    fn insert(&mut self, actor: &Actor) {
        let Some(key) = actor.key() else {
            debug!(target: "apub", id = ?actor.envelope.id, "actor has no inline key");
            return;
        };
        let owner = actor
            .envelope
            .id
            .clone()
            .or_else(|| key.owner.as_uri().map(str::to_string));
        if let Some(owner) = owner {
            self.owners.insert(owner, key.id.clone());
        }
        self.keys.insert(key.id.clone(), key.public_key_pem.clone());
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl KeyResolver for ActorStore {
    fn resolve(&self, key_id: &str) -> Result<String> {
        if let Some(pem) = self.keys.get(key_id) {
            return Ok(pem.clone());
        }
        let actor_id = key_id.split_once('#').map_or(key_id, |(id, _)| id);
        let by_owner = self
            .owners
            .get(actor_id)
            .and_then(|key_id| self.keys.get(key_id));
        match by_owner {
            Some(pem) => Ok(pem.clone()),
            None => bail!("no known actor holds key {key_id}"),
        }
    }
}

impl<'a> FromIterator<&'a Actor> for ActorStore {
    fn from_iter<I: IntoIterator<Item = &'a Actor>>(iter: I) -> Self {
        ActorStore::from_actors(iter)
    }
}
