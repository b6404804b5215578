pub mod ecs;
pub mod vpc;

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

/// Which product endpoint an action is sent to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Product {
    Ecs,
    Vpc,
}

impl Product {
    /// The API version sent with every request of this product.
    pub const fn version(&self) -> &'static str {
        match self {
            Product::Ecs => "2014-05-26",
            Product::Vpc => "2016-04-28",
        }
    }

    pub const fn default_endpoint(&self) -> &'static str {
        match self {
            Product::Ecs => "https://ecs.aliyuncs.com",
            Product::Vpc => "https://vpc.aliyuncs.com",
        }
    }
}

/// An RPC action, the request parameters plus the type its JSON response
/// decodes into.
pub trait Action {
    const PRODUCT: Product;

    /// The value of the `Action` parameter
    const NAME: &'static str;

    type Response: DeserializeOwned;

    /// Action specific parameters, the common ones are added by the client.
    fn params(&self) -> BTreeMap<String, String>;
}
