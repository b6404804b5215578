use std::collections::HashMap;
use std::collections::hash_map::Entry;

use super::Instance;

/// Two admitted instances share one name, the later one is dropped.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("instance id {duplicate_id} with name {name} duplicates instance id {existing_id}")]
pub struct NameConflict {
    pub name: String,
    pub existing_id: String,
    pub duplicate_id: String,
}

/// Instance name to instance id, first registration wins.
#[derive(Debug, Default)]
pub struct Registry {
    names: HashMap<String, String>,
}

impl Registry {
    pub fn register(&mut self, instance: &Instance) -> Result<(), NameConflict> {
        match self.names.entry(instance.name.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(instance.id.clone());
                Ok(())
            }
            Entry::Occupied(entry) => Err(NameConflict {
                name: instance.name.clone(),
                existing_id: entry.get().clone(),
                duplicate_id: instance.id.clone(),
            }),
        }
    }
}
