use std::collections::HashMap;
use std::num::NonZeroU32;

use super::paginate::paginate;
use super::source::{NetworkSource, SourceError};
use super::Network;

/// VPC id to VPC name, built once per run.
#[derive(Debug, Default)]
pub struct NetworkDirectory {
    names: HashMap<String, String>,
    /// Networks returned by the source, duplicated ids included
    fetched: usize,
}

impl NetworkDirectory {
    pub async fn build<N>(source: &N, page_size: NonZeroU32) -> Result<Self, SourceError>
    where
        N: NetworkSource + ?Sized,
    {
        let networks = paginate(page_size, async |page_number, page_size| {
            source.list_networks(page_number, page_size).await
        })
        .await?;

        Ok(networks.into_iter().collect())
    }

    /// Unknown ids resolve to an empty name, the instance is still a target,
    /// only its `vpc` label is less useful.
    pub fn name_of(&self, id: &str) -> &str {
        self.names.get(id).map(String::as_str).unwrap_or_default()
    }

    pub fn fetched(&self) -> usize {
        self.fetched
    }

    /// Distinct network ids
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<Network> for NetworkDirectory {
    fn from_iter<T: IntoIterator<Item = Network>>(iter: T) -> Self {
        let mut directory = NetworkDirectory::default();
        for network in iter {
            directory.fetched += 1;
            directory.names.insert(network.id, network.name);
        }

        directory
    }
}
