use std::collections::BTreeMap;

use serde::Deserialize;

use super::{Action, Product};

/// See https://www.alibabacloud.com/help/en/vpc/developer-reference/api-vpc-2016-04-28-describevpcs
#[derive(Debug, Default)]
pub struct DescribeVpcs {
    pub region_id: String,
    pub page_number: u32,
    pub page_size: u32,
}

impl Action for DescribeVpcs {
    const PRODUCT: Product = Product::Vpc;
    const NAME: &'static str = "DescribeVpcs";

    type Response = DescribeVpcsResponse;

    fn params(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("RegionId".to_string(), self.region_id.clone()),
            ("PageNumber".to_string(), self.page_number.to_string()),
            ("PageSize".to_string(), self.page_size.to_string()),
        ])
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeVpcsResponse {
    #[serde(default)]
    pub request_id: String,
    pub total_count: u64,
    pub vpcs: Vpcs,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Vpcs {
    #[serde(default)]
    pub vpc: Vec<Vpc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Vpc {
    pub vpc_id: String,
    #[serde(default)]
    pub vpc_name: String,
}
