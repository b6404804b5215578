//! Turns the instance inventory into Prometheus target groups.
//!
//! Networks and instances are fetched page by page, every instance then goes
//! through the scope filter, the name registry and the label grouper, in
//! discovery order. The resulting groups are written as one `file_sd`
//! document.

mod dedup;
mod document;
mod filter;
mod group;
mod network;
mod paginate;
mod source;

use std::collections::BTreeMap;
use std::path::PathBuf;

use exitcode::ExitCode;
use tracing::{debug, info, warn};

use crate::config::Config;
pub use dedup::{NameConflict, Registry};
pub use document::{decode, encode, write};
pub use filter::{Decision, PatternError, PatternKind, ScopeRule};
pub use group::{LabelGrouper, LabelSet, TargetGroup};
pub use network::NetworkDirectory;
pub use paginate::{Page, paginate};
pub use source::{InstanceQuery, InventorySource, NetworkSource, SourceError};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Instance {
    /// Unique per provider
    pub id: String,
    /// Human chosen, not guaranteed to be unique
    pub name: String,
    pub tags: BTreeMap<String, String>,
    /// VPC id, empty for classic network instances
    pub network: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Network {
    pub id: String,
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("encode target groups failed, {0}")]
    Encode(#[from] serde_json::Error),
    #[error("write {path:?} failed, {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Error::Source(_) => exitcode::UNAVAILABLE,
            Error::Encode(_) => exitcode::SOFTWARE,
            Error::Write { .. } => exitcode::CANTCREAT,
        }
    }
}

/// The outcome of one discovery pass.
#[derive(Debug, Default)]
pub struct Summary {
    /// Instances returned by the inventory source
    pub instances: usize,
    /// Networks returned by the network source, duplicated ids included
    pub networks: usize,
    /// Instances that passed the scope filter, conflicting ones included
    pub admitted: usize,
    pub rejected: usize,
    pub conflicts: Vec<NameConflict>,
    pub groups: Vec<TargetGroup>,
}

impl Summary {
    pub fn targets(&self) -> usize {
        self.groups.iter().map(|group| group.targets().len()).sum()
    }
}

/// Fetch the inventory and group it, nothing is written.
pub async fn discover<I, N>(config: &Config, inventory: &I, networks: &N) -> Result<Summary, Error>
where
    I: InventorySource + ?Sized,
    N: NetworkSource + ?Sized,
{
    let rule = ScopeRule::from_config(config);

    let directory = NetworkDirectory::build(networks, config.page_size).await?;
    debug!(
        message = "network directory built",
        fetched = directory.fetched(),
        distinct = directory.len()
    );

    let query = InstanceQuery::from_config(config);
    let instances = paginate(config.page_size, async |page_number, page_size| {
        inventory
            .list_instances(page_number, page_size, &query)
            .await
    })
    .await?;

    let mut summary = Summary {
        instances: instances.len(),
        networks: directory.fetched(),
        ..Default::default()
    };
    let mut registry = Registry::default();
    let mut grouper = LabelGrouper::from_config(config);

    for instance in &instances {
        match rule.evaluate(instance) {
            Decision::Admit => {}
            decision => {
                debug!(
                    message = "instance is out of scope",
                    id = %instance.id,
                    name = %instance.name,
                    ?decision
                );
                summary.rejected += 1;
                continue;
            }
        }

        summary.admitted += 1;

        if let Err(conflict) = registry.register(instance) {
            warn!(message = "duplicate instance name, dropped", %conflict);
            summary.conflicts.push(conflict);
            continue;
        }

        grouper.add(instance, &directory);
    }

    summary.groups = grouper.into_groups();

    Ok(summary)
}

/// One full pass, discover and then replace the output document.
pub async fn run<I, N>(config: &Config, inventory: &I, networks: &N) -> Result<Summary, Error>
where
    I: InventorySource + ?Sized,
    N: NetworkSource + ?Sized,
{
    let summary = discover(config, inventory, networks).await?;

    let data = encode(&summary.groups)?;
    write(&config.output, &data).map_err(|source| Error::Write {
        path: config.output.clone(),
        source,
    })?;

    info!(
        message = "service discovery document written",
        output = ?config.output,
        instances = summary.instances,
        networks = summary.networks,
        admitted = summary.admitted,
        rejected = summary.rejected,
        conflicts = summary.conflicts.len(),
        groups = summary.groups.len(),
        targets = summary.targets(),
    );

    Ok(summary)
}
