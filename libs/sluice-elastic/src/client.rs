use std::future::Future;
use std::pin::Pin;

use reqwest::header::CONTENT_TYPE;

use sluice_api::{
    BackendError, BulkOp, BulkResponse, QueryExpr, Refresh, SearchBackend, SearchResponse,
};

use crate::config::ElasticConfig;
use crate::decode::{self, ClusterInfo};
use crate::encode;

/// Elasticsearch over HTTP.
///
/// Holds a pooled `reqwest::Client`; cloning the surrounding `Arc` is how
/// the connection is shared, never by reconnecting.
pub struct ElasticClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    keyword_suffix: String,
}

impl ElasticClient {
    pub fn new(config: &ElasticConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| BackendError::config(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            keyword_suffix: config.keyword_suffix.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch cluster name and version from the root endpoint.
    pub async fn ping(&self) -> Result<ClusterInfo, BackendError> {
        let req = self.http.get(format!("{}/", self.base_url));
        let body = self.send(req, "ping").await?;
        decode::cluster_info(&body)
    }

    async fn send(&self, req: reqwest::RequestBuilder, what: &str) -> Result<String, BackendError> {
        let resp = req
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| BackendError::transport(format!("{what} request: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| BackendError::transport(format!("{what} read: {e}")))?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(BackendError::status(status.as_u16(), body))
        }
    }
}

impl SearchBackend for ElasticClient {
    fn name(&self) -> &str {
        "elastic"
    }

    fn bulk<'a>(
        &'a self,
        ops: &'a [BulkOp],
        refresh: Refresh,
    ) -> Pin<Box<dyn Future<Output = Result<BulkResponse, BackendError>> + Send + 'a>> {
        Box::pin(async move {
            let body = encode::bulk_body(ops)?;
            let refresh = match refresh {
                Refresh::Immediate => "true",
                Refresh::Background => "false",
            };
            let req = self
                .http
                .post(format!("{}/_bulk", self.base_url))
                .query(&[("refresh", refresh)])
                .header(CONTENT_TYPE, "application/x-ndjson")
                .body(body);

            let body = self.send(req, "bulk").await?;
            decode::bulk_response(&body)
        })
    }

    fn search<'a>(
        &'a self,
        index: &'a str,
        query: &'a QueryExpr,
    ) -> Pin<Box<dyn Future<Output = Result<SearchResponse, BackendError>> + Send + 'a>> {
        Box::pin(async move {
            let req = self
                .http
                .post(format!("{}/{}/_search", self.base_url, index))
                .json(&encode::search_body(query, &self.keyword_suffix));

            let body = self.send(req, "search").await?;
            decode::search_response(&body)
        })
    }
}
