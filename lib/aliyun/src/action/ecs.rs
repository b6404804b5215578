use std::collections::BTreeMap;

use serde::Deserialize;

use super::{Action, Product};

/// Lists ECS instances of one region, a page at a time.
///
/// See https://www.alibabacloud.com/help/en/ecs/developer-reference/api-ecs-2014-05-26-describeinstances
#[derive(Debug, Default)]
pub struct DescribeInstances {
    pub region_id: String,
    pub page_number: u32,
    pub page_size: u32,
    /// Only instances carrying every one of these tags are returned.
    pub tags: Vec<(String, String)>,
    pub instance_name: Option<String>,
}

impl Action for DescribeInstances {
    const PRODUCT: Product = Product::Ecs;
    const NAME: &'static str = "DescribeInstances";

    type Response = DescribeInstancesResponse;

    fn params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();

        params.insert("RegionId".to_string(), self.region_id.clone());
        params.insert("PageNumber".to_string(), self.page_number.to_string());
        params.insert("PageSize".to_string(), self.page_size.to_string());

        for (index, (key, value)) in self.tags.iter().enumerate() {
            params.insert(format!("Tag.{}.Key", index + 1), key.clone());
            params.insert(format!("Tag.{}.Value", index + 1), value.clone());
        }

        if let Some(name) = &self.instance_name {
            params.insert("InstanceName".to_string(), name.clone());
        }

        params
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeInstancesResponse {
    #[serde(default)]
    pub request_id: String,
    pub total_count: u64,
    #[serde(default)]
    pub page_number: u32,
    #[serde(default)]
    pub page_size: u32,
    pub instances: Instances,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Instances {
    #[serde(default)]
    pub instance: Vec<Instance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Instance {
    pub instance_id: String,
    #[serde(default)]
    pub instance_name: String,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub vpc_attributes: VpcAttributes,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tags {
    #[serde(default)]
    pub tag: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub tag_key: String,
    #[serde(default)]
    pub tag_value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpcAttributes {
    /// Empty for instances in the classic network
    #[serde(default)]
    pub vpc_id: String,
}
