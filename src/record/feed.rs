//! JSON feed adapters: one network fetch per row, normalized into a record.
//!
//! A [`FeedSchema`] declares how a provider's response maps onto record
//! fields. Field and image sources are JSON pointers into a scope object:
//!
//! ```text
//! {
//!   "item":     <the value at `item` inside the response>,
//!   "embedded": <JSON parsed from the string at `embedded` inside the item>,
//!   "query":    <the row's query string after transformation>
//! }
//! ```
//!
//! so `/item/title`, `/embedded/price` and `/query` are all valid sources.
//! The first source yielding a non-empty scalar wins.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::{Record, paste};
use crate::PlacardError;
use crate::net::Fetcher;
use crate::net::proxy::{CorsProxy, ImageProxy, encode_component};

fn default_absent() -> String {
    "N/A".into()
}

fn default_image_limit() -> usize {
    6
}

/// Produces a record for one row query.
#[async_trait]
pub trait RecordProvider: Send + Sync {
    async fn fetch_record(&self, query: &str) -> Result<Record, PlacardError>;
}

/// How the raw row text becomes the `{query}` of the endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryTransform {
    /// Use the trimmed row text.
    #[default]
    Verbatim,
    /// Take the path segment following `marker` (e.g. a product slug from a
    /// product page URL).
    SegmentAfter { marker: String },
}

impl QueryTransform {
    /// Split pasted query text into row queries. Search terms may contain
    /// commas, so verbatim queries are one per line; URL lists also split
    /// on commas.
    pub fn split(&self, text: &str) -> Vec<String> {
        match self {
            QueryTransform::Verbatim => paste::parse_lines(text),
            QueryTransform::SegmentAfter { .. } => paste::parse_list(text),
        }
    }

    pub fn apply(&self, raw: &str) -> Result<String, PlacardError> {
        let raw = raw.trim();
        match self {
            QueryTransform::Verbatim => {
                if raw.is_empty() {
                    Err(PlacardError::Input("empty query".into()))
                } else {
                    Ok(raw.to_string())
                }
            }
            QueryTransform::SegmentAfter { marker } => raw
                .split_once(marker.as_str())
                .map(|(_, rest)| rest.split(['/', '?', '#']).next().unwrap_or_default())
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .ok_or_else(|| {
                    PlacardError::Input(format!("'{}' has no segment after '{}'", raw, marker))
                }),
        }
    }
}

/// Maps one record field from the scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub field: String,
    /// JSON pointers tried in order.
    pub sources: Vec<String>,
    /// Format applied to a found value; `{}` is replaced by the value.
    #[serde(default)]
    pub format: Option<String>,
    /// Value used when no source yields anything (schema `absent` otherwise).
    #[serde(default)]
    pub default: Option<String>,
    /// Fail the row when no source yields a value.
    #[serde(default)]
    pub required: bool,
}

impl FieldMapping {
    pub fn new(field: &str, sources: &[&str]) -> Self {
        Self {
            field: field.into(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
            format: None,
            default: None,
            required: false,
        }
    }

    pub fn format(mut self, format: &str) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn default_value(mut self, default: &str) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Maps the record's image list from the scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMapping {
    /// Pointers to strings or arrays of strings.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Keep only URLs containing this substring.
    #[serde(default)]
    pub contains: Option<String>,
    #[serde(default = "default_image_limit")]
    pub limit: usize,
    /// Route images through the image-resize proxy.
    #[serde(default)]
    pub resize: bool,
}

impl Default for ImageMapping {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            contains: None,
            limit: default_image_limit(),
            resize: false,
        }
    }
}

/// Declarative description of a provider's response shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSchema {
    pub name: String,
    /// Endpoint URL with a `{query}` placeholder (percent-encoded on use).
    pub endpoint: String,
    #[serde(default)]
    pub query: QueryTransform,
    /// Pointer to the item inside the response; empty means the whole body.
    #[serde(default)]
    pub item: String,
    /// Pointer (inside the item) to a string holding embedded JSON.
    #[serde(default)]
    pub embedded: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldMapping>,
    #[serde(default)]
    pub images: ImageMapping,
    /// Value for absent fields without their own default.
    #[serde(default = "default_absent")]
    pub absent: String,
}

/// Schemas for the catalog providers the batch panels were built around.
pub fn builtin_schemas() -> Vec<FeedSchema> {
    vec![
        FeedSchema {
            name: "product-feed".into(),
            endpoint: "https://myrhub.vercel.app/kenyatronics/view/{query}?format=json".into(),
            query: QueryTransform::SegmentAfter {
                marker: "/view-product/".into(),
            },
            item: "/items/0".into(),
            embedded: Some("/content_html".into()),
            fields: vec![
                FieldMapping::new("name", &["/embedded/name", "/item/title"])
                    .default_value("Product"),
                FieldMapping::new("price", &["/embedded/price"]).format("KSh {}"),
                FieldMapping::new("spec1", &["/embedded/ram"])
                    .format("RAM: {}")
                    .default_value("RAM: N/A"),
                FieldMapping::new("spec2", &["/embedded/rom"])
                    .format("ROM: {}")
                    .default_value("ROM: N/A"),
            ],
            images: ImageMapping {
                sources: vec!["/item/tags".into()],
                contains: Some("wsrv.nl".into()),
                limit: 6,
                resize: false,
            },
            absent: default_absent(),
        },
        FeedSchema {
            name: "spec-sheet".into(),
            endpoint: "https://phapi-kappa.vercel.app/specs-image?device={query}".into(),
            query: QueryTransform::Verbatim,
            item: String::new(),
            embedded: None,
            fields: vec![
                FieldMapping::new("device", &["/item/device"]).required(),
                FieldMapping::new("name", &["/item/device"]),
                FieldMapping::new("announced", &["/item/announced"])
                    .default_value("Not specified"),
                FieldMapping::new("spec1", &["/item/specs/0"]),
                FieldMapping::new("spec2", &["/item/specs/1"]),
                FieldMapping::new("spec3", &["/item/specs/2"]),
                FieldMapping::new("spec4", &["/item/specs/3"]),
                FieldMapping::new("colour", &["/item/body_colour"]),
            ],
            images: ImageMapping {
                sources: vec!["/item/image_2".into()],
                contains: None,
                limit: 1,
                resize: true,
            },
            absent: default_absent(),
        },
        FeedSchema {
            name: "search-feed".into(),
            endpoint: "https://myrhubpy.vercel.app/smartphoneskenya/search/{query}.json".into(),
            query: QueryTransform::Verbatim,
            item: "/items/0/extra".into(),
            embedded: None,
            fields: vec![
                FieldMapping::new("name", &["/item/product_name", "/query"]),
                FieldMapping::new("price", &["/item/price"]),
                FieldMapping::new("spec1", &["/item/spec1"]).format("Display: {}"),
                FieldMapping::new("spec2", &["/item/spec2"]).format("RAM: {}"),
                FieldMapping::new("spec3", &["/item/spec3"]).format("Storage: {}"),
                FieldMapping::new("spec4", &["/item/spec4"]).format("OS: {}"),
            ],
            images: ImageMapping {
                sources: vec![
                    "/item/image1".into(),
                    "/item/image2".into(),
                    "/item/image3".into(),
                    "/item/image4".into(),
                ],
                contains: None,
                limit: 4,
                resize: false,
            },
            absent: default_absent(),
        },
    ]
}

/// Find a built-in or configured schema by name.
pub fn find_schema<'a>(schemas: &'a [FeedSchema], name: &str) -> Option<&'a FeedSchema> {
    schemas.iter().find(|s| s.name.eq_ignore_ascii_case(name))
}

/// Render a scalar JSON value as a field string.
fn scalar(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn image_urls(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.trim().to_string()),
        Value::Array(items) => {
            for item in items {
                if let Value::String(s) = item {
                    out.push(s.trim().to_string());
                }
            }
        }
        _ => {}
    }
}

impl FeedSchema {
    /// Endpoint for a raw row query, before relay wrapping.
    pub fn endpoint_for(&self, raw_query: &str) -> Result<(String, String), PlacardError> {
        let query = self.query.apply(raw_query)?;
        let url = self.endpoint.replace("{query}", &encode_component(&query));
        Ok((query, url))
    }

    /// Map a provider response into a record.
    ///
    /// `image_proxy` is used for image mappings with `resize` set.
    pub fn normalize(
        &self,
        query: &str,
        body: &Value,
        image_proxy: Option<&ImageProxy>,
    ) -> Result<Record, PlacardError> {
        let item = body
            .pointer(&self.item)
            .filter(|v| !v.is_null())
            .ok_or_else(|| {
                PlacardError::Fetch(format!("{}: no item at '{}'", self.name, self.item))
            })?;

        let embedded = match self.embedded.as_deref().and_then(|p| item.pointer(p)) {
            Some(Value::String(s)) => serde_json::from_str(s).unwrap_or_else(|e| {
                tracing::warn!(feed = %self.name, error = %e, "embedded JSON did not parse");
                Value::Null
            }),
            Some(other) => other.clone(),
            None => Value::Null,
        };

        let scope = serde_json::json!({
            "item": item,
            "embedded": embedded,
            "query": query,
        });

        let mut record = Record::new();
        for mapping in &self.fields {
            let found = mapping
                .sources
                .iter()
                .filter_map(|p| scope.pointer(p))
                .find_map(scalar);
            let value = match (found, &mapping.format) {
                (Some(v), Some(format)) => format.replace("{}", &v),
                (Some(v), None) => v,
                (None, _) if mapping.required => {
                    return Err(PlacardError::Fetch(format!(
                        "{}: response has no '{}'",
                        self.name, mapping.field
                    )));
                }
                (None, _) => mapping.default.clone().unwrap_or_else(|| self.absent.clone()),
            };
            record.insert(&mapping.field, value);
        }

        let mut urls = Vec::new();
        for pointer in &self.images.sources {
            if let Some(v) = scope.pointer(pointer) {
                image_urls(v, &mut urls);
            }
        }
        let mut images: Vec<String> = Vec::new();
        for url in urls {
            let keep = url.starts_with("http")
                && self
                    .images
                    .contains
                    .as_deref()
                    .is_none_or(|needle| url.contains(needle));
            if !keep || images.contains(&url) {
                continue;
            }
            images.push(url);
            if images.len() >= self.images.limit {
                break;
            }
        }
        if self.images.resize
            && let Some(proxy) = image_proxy
        {
            images = images.iter().map(|u| proxy.wrap(u)).collect();
        }
        record.images = images;

        Ok(record)
    }
}

/// Fetches one record per query through the relay and normalizes it.
pub struct FeedClient {
    schema: FeedSchema,
    fetcher: Arc<dyn Fetcher>,
    relay: Option<CorsProxy>,
    image_proxy: Option<ImageProxy>,
}

impl FeedClient {
    pub fn new(schema: FeedSchema, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            schema,
            fetcher,
            relay: None,
            image_proxy: None,
        }
    }

    pub fn with_relay(mut self, relay: Option<CorsProxy>) -> Self {
        self.relay = relay;
        self
    }

    pub fn with_image_proxy(mut self, proxy: Option<ImageProxy>) -> Self {
        self.image_proxy = proxy;
        self
    }

    pub fn schema(&self) -> &FeedSchema {
        &self.schema
    }
}

#[async_trait]
impl RecordProvider for FeedClient {
    async fn fetch_record(&self, raw_query: &str) -> Result<Record, PlacardError> {
        let (query, endpoint) = self.schema.endpoint_for(raw_query)?;
        let url = match &self.relay {
            Some(relay) => relay.wrap(&endpoint),
            None => endpoint,
        };

        let bytes = self.fetcher.fetch(&url).await?;
        let body: Value = serde_json::from_slice(&bytes).map_err(|e| {
            PlacardError::Fetch(format!("{}: response is not JSON: {}", self.schema.name, e))
        })?;

        let record = self
            .schema
            .normalize(&query, &body, self.image_proxy.as_ref())?;
        tracing::debug!(feed = %self.schema.name, query = %query, fields = record.len(), images = record.images.len(), "normalized feed record");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned bodies and remembers requested URLs.
    struct CannedFetcher {
        bodies: HashMap<String, String>,
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Fetcher for CannedFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, PlacardError> {
            self.requested.lock().unwrap().push(url.to_string());
            self.bodies
                .get(url)
                .map(|b| b.as_bytes().to_vec())
                .ok_or_else(|| PlacardError::Fetch(format!("HTTP 404 for {}", url)))
        }
    }

    fn schema(name: &str) -> FeedSchema {
        find_schema(&builtin_schemas(), name).unwrap().clone()
    }

    #[test]
    fn test_segment_after() {
        let t = QueryTransform::SegmentAfter {
            marker: "/view-product/".into(),
        };
        assert_eq!(
            t.apply("https://shop.example/view-product/galaxy-a55?ref=x").unwrap(),
            "galaxy-a55"
        );
        assert!(t.apply("https://shop.example/other/galaxy").is_err());
        assert!(QueryTransform::Verbatim.apply("  ").is_err());
    }

    #[test]
    fn test_query_split_by_transform() {
        let text = "Galaxy S24, 256GB\nPixel 8";
        assert_eq!(
            schema("spec-sheet").query.split(text),
            vec!["Galaxy S24, 256GB", "Pixel 8"]
        );
        assert_eq!(
            schema("product-feed").query.split("https://a/view-product/x, https://a/view-product/y\n"),
            vec!["https://a/view-product/x", "https://a/view-product/y"]
        );
    }

    #[test]
    fn test_product_feed_normalization() {
        let body = serde_json::json!({
            "items": [{
                "title": "Fallback Title",
                "content_html": "{\"name\": \" Galaxy A55 \", \"price\": 45000, \"ram\": \"8GB\"}",
                "tags": [
                    "https://wsrv.nl/?url=a.jpg",
                    "phones",
                    "https://wsrv.nl/?url=a.jpg",
                    "https://cdn.example/b.jpg",
                    "https://wsrv.nl/?url=c.jpg"
                ]
            }]
        });
        let record = schema("product-feed").normalize("galaxy-a55", &body, None).unwrap();
        assert_eq!(record.get("name"), Some("Galaxy A55"));
        assert_eq!(record.get("price"), Some("KSh 45000"));
        assert_eq!(record.get("spec1"), Some("RAM: 8GB"));
        assert_eq!(record.get("spec2"), Some("ROM: N/A"));
        assert_eq!(
            record.images,
            vec!["https://wsrv.nl/?url=a.jpg", "https://wsrv.nl/?url=c.jpg"]
        );
    }

    #[test]
    fn test_broken_embedded_json_falls_back() {
        let body = serde_json::json!({"items": [{"title": "T", "content_html": "{oops"}]});
        let record = schema("product-feed").normalize("t", &body, None).unwrap();
        assert_eq!(record.get("name"), Some("T"));
        assert_eq!(record.get("price"), Some("N/A"));
    }

    #[test]
    fn test_missing_item_is_fetch_error() {
        let body = serde_json::json!({"items": []});
        let err = schema("product-feed").normalize("x", &body, None).unwrap_err();
        assert!(matches!(err, PlacardError::Fetch(_)));
    }

    #[test]
    fn test_spec_sheet_requires_device_and_resizes_images() {
        let proxy = ImageProxy::new("https://resize/?url=");
        let body = serde_json::json!({
            "device": "Galaxy S25",
            "specs": ["6.2in", "12GB"],
            "image_2": "https://img.example/s25.jpg"
        });
        let record = schema("spec-sheet").normalize("s25", &body, Some(&proxy)).unwrap();
        assert_eq!(record.get("device"), Some("Galaxy S25"));
        assert_eq!(record.get("announced"), Some("Not specified"));
        assert_eq!(record.get("spec2"), Some("12GB"));
        assert_eq!(record.get("spec3"), Some("N/A"));
        assert!(record.images[0].starts_with("https://resize/?url=https%3A%2F%2Fimg"));

        let err = schema("spec-sheet")
            .normalize("s25", &serde_json::json!({"specs": []}), None)
            .unwrap_err();
        assert!(err.to_string().contains("device"));
    }

    #[test]
    fn test_search_feed_name_falls_back_to_query() {
        let body = serde_json::json!({"items": [{"extra": {"price": "KSh 20,000", "image2": "https://i/2.jpg"}}]});
        let record = schema("search-feed").normalize("Redmi 13", &body, None).unwrap();
        assert_eq!(record.get("name"), Some("Redmi 13"));
        assert_eq!(record.get("spec1"), Some("N/A"));
        assert_eq!(record.images, vec!["https://i/2.jpg"]);
    }

    #[tokio::test]
    async fn test_client_routes_through_relay() {
        let endpoint = "https://myrhubpy.vercel.app/smartphoneskenya/search/Redmi%2013.json";
        let relay = CorsProxy::new("https://relay/?url=");
        let fetcher = Arc::new(CannedFetcher {
            bodies: HashMap::from([(
                relay.wrap(endpoint),
                r#"{"items": [{"extra": {"product_name": "Redmi 13"}}]}"#.to_string(),
            )]),
            requested: Mutex::new(Vec::new()),
        });

        let client = FeedClient::new(schema("search-feed"), fetcher.clone())
            .with_relay(Some(relay.clone()));
        let record = client.fetch_record(" Redmi 13 ").await.unwrap();
        assert_eq!(record.get("name"), Some("Redmi 13"));
        assert_eq!(fetcher.requested.lock().unwrap()[0], relay.wrap(endpoint));
    }

    #[tokio::test]
    async fn test_client_non_json_body() {
        let fetcher = Arc::new(CannedFetcher {
            bodies: HashMap::from([(
                "https://phapi-kappa.vercel.app/specs-image?device=x".to_string(),
                "<html>".to_string(),
            )]),
            requested: Mutex::new(Vec::new()),
        });
        let client = FeedClient::new(schema("spec-sheet"), fetcher);
        let err = client.fetch_record("x").await.unwrap_err();
        assert!(err.to_string().contains("not JSON"));
    }

    #[test]
    fn test_schema_deserializes_with_defaults() {
        let schema: FeedSchema = serde_json::from_str(
            r#"{"name": "custom", "endpoint": "https://api/{query}",
                "fields": [{"field": "title", "sources": ["/item/t"]}]}"#,
        )
        .unwrap();
        assert_eq!(schema.query, QueryTransform::Verbatim);
        assert_eq!(schema.absent, "N/A");
        assert_eq!(schema.images.limit, 6);
    }
}
