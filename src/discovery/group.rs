use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::Instance;
use super::network::NetworkDirectory;
use crate::config::Config;

pub const EXPORTER_LABEL: &str = "exporter";
pub const EXPORTER_NAME: &str = "node_exporter";
pub const VPC_LABEL: &str = "vpc";

/// Prometheus labels of a target group.
///
/// Backed by a sorted map, so equality and hashing only depend on the
/// key/value pairs, never on insertion order.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for LabelSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        LabelSet(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Scrape addresses sharing one label set. Labels are fixed once the group
/// exists, only targets are appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetGroup {
    targets: Vec<String>,
    labels: LabelSet,
}

impl TargetGroup {
    pub fn new(target: String, labels: LabelSet) -> Self {
        TargetGroup {
            targets: vec![target],
            labels,
        }
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }
}

/// Builds the label set of every instance and merges instances with equal
/// label sets into one target group, groups are kept in creation order.
#[derive(Debug)]
pub struct LabelGrouper {
    label_prefix: String,
    domain_suffix: String,
    exporter_port: u16,

    groups: Vec<TargetGroup>,
    index: HashMap<LabelSet, usize>,
}

impl LabelGrouper {
    pub fn new(
        label_prefix: impl Into<String>,
        domain_suffix: impl Into<String>,
        exporter_port: u16,
    ) -> Self {
        LabelGrouper {
            label_prefix: label_prefix.into(),
            domain_suffix: domain_suffix.into(),
            exporter_port,
            groups: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        LabelGrouper::new(
            config.label_prefix.as_str(),
            config.domain_suffix.as_str(),
            config.exporter_port,
        )
    }

    pub fn address(&self, instance: &Instance) -> String {
        format!(
            "{}.{}:{}",
            instance.name, self.domain_suffix, self.exporter_port
        )
    }

    fn label_key(&self, key: &str) -> String {
        if self.label_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}_{}", self.label_prefix, key)
        }
    }

    /// `exporter` first, then tags, then `vpc`, a later key overwrites an
    /// earlier one.
    pub fn labels(&self, instance: &Instance, networks: &NetworkDirectory) -> LabelSet {
        let mut labels = LabelSet::default();

        labels.insert(EXPORTER_LABEL, EXPORTER_NAME);
        for (key, value) in &instance.tags {
            labels.insert(self.label_key(key), value.as_str());
        }
        labels.insert(self.label_key(VPC_LABEL), networks.name_of(&instance.network));

        labels
    }

    pub fn add(&mut self, instance: &Instance, networks: &NetworkDirectory) {
        let address = self.address(instance);
        let labels = self.labels(instance, networks);

        match self.index.get(&labels) {
            Some(position) => self.groups[*position].targets.push(address),
            None => {
                self.index.insert(labels.clone(), self.groups.len());
                self.groups.push(TargetGroup::new(address, labels));
            }
        }
    }

    pub fn groups(&self) -> &[TargetGroup] {
        &self.groups
    }

    pub fn into_groups(self) -> Vec<TargetGroup> {
        self.groups
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::discovery::Network;

    fn instance(name: &str, tags: &[(&str, &str)], network: &str) -> Instance {
        Instance {
            id: format!("i-{name}"),
            name: name.to_string(),
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            network: network.to_string(),
        }
    }

    fn networks() -> NetworkDirectory {
        [
            Network {
                id: "vpc-1".to_string(),
                name: "core".to_string(),
            },
            Network {
                id: "vpc-2".to_string(),
                name: "edge".to_string(),
            },
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn label_set_equality_ignores_insertion_order() {
        let mut a = LabelSet::default();
        a.insert("env", "prod");
        a.insert("vpc", "core");

        let mut b = LabelSet::default();
        b.insert("vpc", "core");
        b.insert("env", "prod");

        assert_eq!(a, b);
    }

    #[test]
    fn single_instance() {
        let mut grouper = LabelGrouper::new("", "ali-netbase.com", 9100);
        grouper.add(&instance("web01", &[("env", "prod")], "vpc-1"), &networks());

        let groups = grouper.into_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].targets(), ["web01.ali-netbase.com:9100"]);
        assert_eq!(
            groups[0].labels(),
            &LabelSet::from_iter([("exporter", "node_exporter"), ("env", "prod"), ("vpc", "core")])
        );
    }

    #[test]
    fn label_prefix() {
        let grouper = LabelGrouper::new("ecs", "example.com", 9100);
        let labels = grouper.labels(
            &instance("web01", &[("env", "prod"), ("team", "infra")], "vpc-2"),
            &networks(),
        );

        assert_eq!(
            labels,
            LabelSet::from_iter([
                ("exporter", "node_exporter"),
                ("ecs_env", "prod"),
                ("ecs_team", "infra"),
                ("ecs_vpc", "edge"),
            ])
        );
    }

    #[test]
    fn tags_overwrite_exporter_and_vpc_overwrites_tags() {
        let grouper = LabelGrouper::new("", "example.com", 9100);
        let labels = grouper.labels(
            &instance("web01", &[("exporter", "custom"), ("vpc", "from-tag")], "vpc-1"),
            &networks(),
        );

        assert_eq!(labels.get("exporter"), Some("custom"));
        assert_eq!(labels.get("vpc"), Some("core"));
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn unknown_network_gets_empty_vpc() {
        let grouper = LabelGrouper::new("", "example.com", 9100);
        let labels = grouper.labels(&instance("web01", &[], "vpc-404"), &networks());

        assert_eq!(labels.get("vpc"), Some(""));
    }

    #[test]
    fn merge_identical_labels() {
        let networks = networks();
        let mut grouper = LabelGrouper::new("", "example.com", 9100);

        grouper.add(&instance("web01", &[("env", "prod")], "vpc-1"), &networks);
        grouper.add(&instance("db01", &[("env", "test")], "vpc-1"), &networks);
        grouper.add(&instance("web02", &[("env", "prod")], "vpc-1"), &networks);
        grouper.add(&instance("web03", &[("env", "prod")], "vpc-2"), &networks);
        grouper.add(&instance("db02", &[("env", "test")], "vpc-1"), &networks);

        let groups = grouper.into_groups();
        let got = groups
            .iter()
            .map(|group| group.targets().to_vec())
            .collect::<Vec<_>>();

        assert_eq!(
            got,
            vec![
                vec![
                    "web01.example.com:9100".to_string(),
                    "web02.example.com:9100".to_string()
                ],
                vec![
                    "db01.example.com:9100".to_string(),
                    "db02.example.com:9100".to_string()
                ],
                vec!["web03.example.com:9100".to_string()],
            ]
        );
    }

    #[test]
    fn one_extra_tag_splits_groups() {
        let networks = networks();
        let mut grouper = LabelGrouper::new("", "example.com", 9100);

        grouper.add(&instance("web01", &[("env", "prod")], "vpc-1"), &networks);
        grouper.add(
            &instance("web02", &[("env", "prod"), ("canary", "true")], "vpc-1"),
            &networks,
        );

        assert_eq!(grouper.groups().len(), 2);
    }
}
