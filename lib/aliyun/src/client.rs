use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use http::{Method, Request};
use http_body_util::{BodyExt, Full};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client as HttpClient;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use rand::Rng;
use rustls::{ClientConfig, RootCertStore};
use serde::Deserialize;
use tracing::{debug, trace, warn};

use super::action::{Action, Product};
use super::config::Config;
use super::signature;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("build tls config failed, {0}")]
    Tls(rustls::Error),
    #[error("build http request failed, {0}")]
    BuildRequest(http::Error),
    #[error("read http response failed, {0}")]
    ReadResponse(hyper::Error),
    #[error(transparent)]
    Http(hyper_util::client::legacy::Error),
    #[error("api error, code: {}, message: {}, request id: {}", .0.code, .0.message, .0.request_id)]
    Api(ErrorResponse),
    #[error("unexpected status code {0}, body: {1}")]
    UnexpectedStatus(http::StatusCode, String),
    #[error("deserialize response failed, {0}")]
    Deserialize(serde_json::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Deserialize(err)
    }
}

impl From<hyper::Error> for Error {
    fn from(err: hyper::Error) -> Self {
        Error::ReadResponse(err)
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Error::BuildRequest(err)
    }
}

/// The body of a failed RPC call.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorResponse {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub host_id: String,
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Clone)]
pub struct Client {
    http_client: HttpClient<HttpsConnector<HttpConnector>, Full<Bytes>>,
    config: Config,
    ecs_endpoint: String,
    vpc_endpoint: String,
}

impl Client {
    pub fn new(config: Config) -> Result<Self, Error> {
        let tls = load_tls()?;

        let mut inner = HttpConnector::new();
        inner.enforce_http(false);
        let connector = HttpsConnectorBuilder::new()
            .with_tls_config(tls)
            .https_or_http()
            .enable_http1()
            .wrap_connector(inner);

        let http_client = HttpClient::builder(TokioExecutor::new()).build(connector);

        Ok(Client {
            http_client,
            config,
            ecs_endpoint: Product::Ecs.default_endpoint().to_string(),
            vpc_endpoint: Product::Vpc.default_endpoint().to_string(),
        })
    }

    /// Override the endpoint of a product, e.g. a regional or VPC-internal one.
    pub fn set_endpoint(&mut self, product: Product, endpoint: impl Into<String>) {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();

        match product {
            Product::Ecs => self.ecs_endpoint = endpoint,
            Product::Vpc => self.vpc_endpoint = endpoint,
        }
    }

    pub fn region_id(&self) -> &str {
        &self.config.region_id
    }

    /// Sign and send one action, then decode its response.
    pub async fn call<A: Action>(&self, action: &A) -> Result<A::Response, Error> {
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let nonce = {
            let mut rng = rand::rng();
            format!("{:016x}{:016x}", rng.random::<u64>(), rng.random::<u64>())
        };

        let query = self.signed_query(A::PRODUCT, A::NAME, action.params(), &timestamp, &nonce);
        let endpoint = match A::PRODUCT {
            Product::Ecs => &self.ecs_endpoint,
            Product::Vpc => &self.vpc_endpoint,
        };

        debug!(message = "call api", action = A::NAME, %endpoint);

        let req = Request::builder()
            .method(Method::GET)
            .uri(format!("{endpoint}/?{query}"))
            .body(Full::<Bytes>::default())?;

        let resp = self.http_client.request(req).await.map_err(Error::Http)?;
        let (parts, incoming) = resp.into_parts();
        let body = incoming.collect().await?.to_bytes();

        trace!(message = "api response", action = A::NAME, status = %parts.status, size = body.len());

        if parts.status.is_success() {
            return serde_json::from_slice::<A::Response>(&body).map_err(Error::Deserialize);
        }

        match serde_json::from_slice::<ErrorResponse>(&body) {
            Ok(err) => Err(Error::Api(err)),
            Err(_) => Err(Error::UnexpectedStatus(
                parts.status,
                String::from_utf8_lossy(&body).into_owned(),
            )),
        }
    }

    /// The full query string, common parameters included and the signature
    /// appended last.
    fn signed_query(
        &self,
        product: Product,
        action: &str,
        mut params: BTreeMap<String, String>,
        timestamp: &str,
        nonce: &str,
    ) -> String {
        let credentials = &self.config.credentials;

        params.insert("Format".to_string(), "JSON".to_string());
        params.insert("Version".to_string(), product.version().to_string());
        params.insert("Action".to_string(), action.to_string());
        params.insert("AccessKeyId".to_string(), credentials.access_key_id.clone());
        params.insert(
            "SignatureMethod".to_string(),
            signature::SIGNATURE_METHOD.to_string(),
        );
        params.insert(
            "SignatureVersion".to_string(),
            signature::SIGNATURE_VERSION.to_string(),
        );
        params.insert("SignatureNonce".to_string(), nonce.to_string());
        params.insert("Timestamp".to_string(), timestamp.to_string());

        let query = signature::canonicalized_query(&params);
        let string_to_sign = signature::string_to_sign(Method::GET.as_str(), &query);
        let sign = signature::sign(&credentials.access_key_secret, &string_to_sign);

        format!("{query}&Signature={}", signature::percent_encode(&sign))
    }
}

fn load_tls() -> Result<ClientConfig, Error> {
    let result = rustls_native_certs::load_native_certs();
    for err in &result.errors {
        warn!(message = "load native certificate failed", %err);
    }

    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(result.certs);
    if ignored > 0 {
        debug!(message = "ignore unparsable native certificates", added, ignored);
    }
    if roots.is_empty() {
        warn!(message = "no native root certificates found, https endpoints will fail");
    }

    let config = ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(Error::Tls)?
    .with_root_certificates(roots)
    .with_no_client_auth();

    Ok(config)
}
