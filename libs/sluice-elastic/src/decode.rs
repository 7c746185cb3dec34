use std::collections::HashMap;

use serde::Deserialize;

use sluice_api::{
    BackendError, BulkItemError, BulkItemResult, BulkResponse, IndexDirective, Record,
    SearchResponse,
};

#[derive(Deserialize)]
struct RawBulk {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<HashMap<String, RawItem>>,
}

#[derive(Deserialize)]
struct RawItem {
    #[serde(rename = "_index", default)]
    index: String,
    #[serde(rename = "_id")]
    id: Option<String>,
    #[serde(default)]
    status: u16,
    error: Option<BulkItemError>,
}

/// Parse a `_bulk` response. Each item is keyed by its action name.
pub fn bulk_response(body: &str) -> Result<BulkResponse, BackendError> {
    let raw: RawBulk = serde_json::from_str(body)
        .map_err(|e| BackendError::protocol(format!("bulk response: {e}")))?;

    let mut items = Vec::with_capacity(raw.items.len());
    for entry in raw.items {
        let item = entry
            .into_values()
            .next()
            .ok_or_else(|| BackendError::protocol("bulk response: empty item"))?;
        items.push(BulkItemResult {
            directive: IndexDirective::new(item.index),
            id: item.id,
            status: item.status,
            error: item.error,
        });
    }

    Ok(BulkResponse { errors: raw.errors, items })
}

#[derive(Deserialize)]
struct RawSearch {
    hits: RawHits,
}

#[derive(Deserialize)]
struct RawHits {
    total: Option<RawTotal>,
    #[serde(default)]
    hits: Vec<RawHit>,
}

/// `{"value": n, "relation": ..}` on current clusters, a bare number on
/// older ones.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTotal {
    Object { value: u64 },
    Count(u64),
}

#[derive(Deserialize)]
struct RawHit {
    #[serde(rename = "_source", default)]
    source: Record,
}

/// Parse a `_search` response into the page of stored documents plus the
/// reported total.
pub fn search_response(body: &str) -> Result<SearchResponse, BackendError> {
    let raw: RawSearch = serde_json::from_str(body)
        .map_err(|e| BackendError::protocol(format!("search response: {e}")))?;

    let total = match raw.hits.total {
        Some(RawTotal::Object { value }) | Some(RawTotal::Count(value)) => value,
        None => 0,
    };

    Ok(SearchResponse {
        total,
        hits: raw.hits.hits.into_iter().map(|h| h.source).collect(),
    })
}

#[derive(Deserialize)]
struct RawInfo {
    #[serde(default)]
    cluster_name: String,
    version: Option<RawVersion>,
}

#[derive(Deserialize)]
struct RawVersion {
    number: String,
}

/// Answer of the root endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterInfo {
    pub cluster_name: String,
    pub version: String,
}

pub fn cluster_info(body: &str) -> Result<ClusterInfo, BackendError> {
    let raw: RawInfo = serde_json::from_str(body)
        .map_err(|e| BackendError::protocol(format!("cluster info: {e}")))?;
    Ok(ClusterInfo {
        cluster_name: raw.cluster_name,
        version: raw.version.map(|v| v.number).unwrap_or_default(),
    })
}
