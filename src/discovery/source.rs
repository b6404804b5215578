use std::collections::BTreeMap;

use aliyun::action::ecs::DescribeInstances;
use aliyun::action::vpc::DescribeVpcs;

use super::{Instance, Network, Page};
use crate::config::{Config, TagFilter};

#[derive(Debug, thiserror::Error)]
#[error("{action} failed, {source}")]
pub struct SourceError {
    action: &'static str,
    #[source]
    source: crate::Error,
}

impl SourceError {
    pub fn new(action: &'static str, source: impl Into<crate::Error>) -> Self {
        SourceError {
            action,
            source: source.into(),
        }
    }
}

/// Server side filters sent along with every instance listing request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InstanceQuery {
    pub tags: Vec<TagFilter>,
    pub name: Option<String>,
}

impl InstanceQuery {
    pub fn from_config(config: &Config) -> Self {
        InstanceQuery {
            tags: config.tags.clone(),
            name: config.instance_name.clone(),
        }
    }
}

#[async_trait::async_trait]
pub trait InventorySource {
    async fn list_instances(
        &self,
        page_number: u32,
        page_size: u32,
        query: &InstanceQuery,
    ) -> Result<Page<Instance>, SourceError>;
}

#[async_trait::async_trait]
pub trait NetworkSource {
    async fn list_networks(
        &self,
        page_number: u32,
        page_size: u32,
    ) -> Result<Page<Network>, SourceError>;
}

#[async_trait::async_trait]
impl InventorySource for aliyun::Client {
    async fn list_instances(
        &self,
        page_number: u32,
        page_size: u32,
        query: &InstanceQuery,
    ) -> Result<Page<Instance>, SourceError> {
        let action = DescribeInstances {
            region_id: self.region_id().to_string(),
            page_number,
            page_size,
            tags: query
                .tags
                .iter()
                .map(|tag| (tag.key.clone(), tag.value.clone()))
                .collect(),
            instance_name: query.name.clone(),
        };

        let resp = self
            .call(&action)
            .await
            .map_err(|err| SourceError::new("DescribeInstances", err))?;

        let items = resp
            .instances
            .instance
            .into_iter()
            .map(|instance| Instance {
                id: instance.instance_id,
                name: instance.instance_name,
                tags: instance
                    .tags
                    .tag
                    .into_iter()
                    .map(|tag| (tag.tag_key, tag.tag_value))
                    .collect::<BTreeMap<_, _>>(),
                network: instance.vpc_attributes.vpc_id,
            })
            .collect();

        Ok(Page {
            items,
            total_count: resp.total_count,
        })
    }
}

#[async_trait::async_trait]
impl NetworkSource for aliyun::Client {
    async fn list_networks(
        &self,
        page_number: u32,
        page_size: u32,
    ) -> Result<Page<Network>, SourceError> {
        let action = DescribeVpcs {
            region_id: self.region_id().to_string(),
            page_number,
            page_size,
        };

        let resp = self
            .call(&action)
            .await
            .map_err(|err| SourceError::new("DescribeVpcs", err))?;

        let items = resp
            .vpcs
            .vpc
            .into_iter()
            .map(|vpc| Network {
                id: vpc.vpc_id,
                name: vpc.vpc_name,
            })
            .collect();

        Ok(Page {
            items,
            total_count: resp.total_count,
        })
    }
}
