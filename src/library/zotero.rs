//! Zotero Web API v3 client.

use super::LibraryClient;
use crate::http::{HttpConfig, build_http_client};
use crate::models::{CollectionKey, CollectionSummary, ItemNote, LibraryItem};
use crate::retry::RetryPolicy;
use crate::{Error, Result};
use reqwest::StatusCode;
use reqwest::blocking::Response;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Which kind of Zotero library the credentials address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LibraryType {
    /// A personal library (`/users/{id}`).
    #[default]
    User,
    /// A group library (`/groups/{id}`).
    Group,
}

impl LibraryType {
    /// Parses a library-type string; anything other than `group` is a user
    /// library.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("group") {
            Self::Group
        } else {
            Self::User
        }
    }

    const fn url_segment(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Group => "groups",
        }
    }
}

/// Blocking client for the Zotero Web API.
pub struct ZoteroClient {
    /// API endpoint.
    endpoint: String,
    /// Library path prefix, e.g. `users/12345`.
    library_prefix: String,
    /// API key.
    api_key: SecretString,
    /// HTTP client.
    client: reqwest::blocking::Client,
    /// Retry budget for transient failures.
    retry: RetryPolicy,
}

impl ZoteroClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.zotero.org";

    /// Creates a client for the given library.
    #[must_use]
    pub fn new(library_id: &str, library_type: LibraryType, api_key: SecretString) -> Self {
        Self {
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            library_prefix: format!("{}/{library_id}", library_type.url_segment()),
            api_key,
            client: build_http_client(HttpConfig::from_env()),
            retry: RetryPolicy::default(),
        }
    }

    /// Sets the API endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets HTTP client timeouts.
    #[must_use]
    pub fn with_http_config(mut self, config: HttpConfig) -> Self {
        self.client = build_http_client(config);
        self
    }

    /// Sets the retry budget for transient failures.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{path}", self.endpoint, self.library_prefix)
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        operation: &'static str,
        url: &str,
    ) -> Result<T> {
        self.retry.run(operation, || {
            let response = self
                .client
                .get(url)
                .header("Zotero-API-Key", self.api_key.expose_secret())
                .header("Zotero-API-Version", "3")
                .send()
                .map_err(|e| transport_error(operation, &e))?;
            let response = check_status(operation, response)?;
            response.json::<T>().map_err(|e| Error::RemoteUnavailable {
                operation: operation.to_string(),
                cause: format!("response decode: {e}"),
            })
        })
    }
}

impl LibraryClient for ZoteroClient {
    fn verify_connectivity(&self) -> Result<()> {
        let url = self.url("collections?limit=1");
        let _: Vec<CollectionRecord> = self.get_json("zotero_connectivity", &url)?;
        Ok(())
    }

    fn child_collections(&self, parent: Option<&CollectionKey>) -> Result<Vec<CollectionSummary>> {
        let url = parent.map_or_else(
            || self.url("collections/top?limit=200"),
            |p| self.url(&format!("collections/{p}/collections?limit=200")),
        );
        let records: Vec<CollectionRecord> = self.get_json("zotero_list_collections", &url)?;
        Ok(records.into_iter().map(CollectionRecord::into_summary).collect())
    }

    fn create_collection(
        &self,
        name: &str,
        parent: Option<&CollectionKey>,
    ) -> Result<CollectionKey> {
        let operation = "zotero_create_collection";
        let mut payload = serde_json::json!({ "name": name });
        if let Some(parent) = parent {
            payload["parentCollection"] = serde_json::Value::String(parent.as_str().to_string());
        }
        let body = serde_json::Value::Array(vec![payload]);

        tracing::info!(name, parent = parent.map(CollectionKey::as_str), "creating collection");

        let url = self.url("collections");
        self.retry.run(operation, || {
            let response = self
                .client
                .post(&url)
                .header("Zotero-API-Key", self.api_key.expose_secret())
                .header("Zotero-API-Version", "3")
                .json(&body)
                .send()
                .map_err(|e| transport_error(operation, &e))?;
            let response = check_status(operation, response)?;
            let write: WriteResponse =
                response.json().map_err(|e| Error::RemoteUnavailable {
                    operation: operation.to_string(),
                    cause: format!("response decode: {e}"),
                })?;
            write
                .success
                .into_values()
                .next()
                .map(CollectionKey::new)
                .ok_or_else(|| Error::RemoteUnavailable {
                    operation: operation.to_string(),
                    cause: format!("creation of '{name}' reported no successful key"),
                })
        })
    }

    fn tagged_items(
        &self,
        scope: Option<&CollectionKey>,
        tag: &str,
        limit: usize,
    ) -> Result<Vec<LibraryItem>> {
        let query = format!("items/top?tag={tag}&limit={limit}");
        let url = scope.map_or_else(
            || self.url(&query),
            |key| self.url(&format!("collections/{key}/{query}")),
        );
        let records: Vec<ItemRecord> = self.get_json("zotero_list_items", &url)?;
        Ok(records.into_iter().map(ItemRecord::into_item).collect())
    }

    fn item_notes(&self, item_key: &str) -> Result<Vec<ItemNote>> {
        let url = self.url(&format!("items/{item_key}/children"));
        let records: Vec<ItemRecord> = self.get_json("zotero_item_children", &url)?;
        Ok(records
            .into_iter()
            .filter(|r| r.data.item_type == "note")
            .map(|r| ItemNote {
                key: r.key,
                content: r.data.note,
            })
            .collect())
    }

    fn commit_placement(
        &self,
        item: &LibraryItem,
        collections: &[CollectionKey],
        completion_tag: &str,
    ) -> Result<()> {
        let operation = "zotero_commit_placement";

        // Merge new memberships and the completion tag with what the item
        // already carries; the PATCH replaces both arrays wholesale.
        let mut all_collections: Vec<String> = item
            .collections
            .iter()
            .map(|k| k.as_str().to_string())
            .collect();
        for key in collections {
            if !item.in_collection(key) && !all_collections.contains(&key.as_str().to_string()) {
                all_collections.push(key.as_str().to_string());
            }
        }
        let mut tags: Vec<BTreeMap<&str, String>> = item
            .tags
            .iter()
            .map(|t| BTreeMap::from([("tag", t.clone())]))
            .collect();
        if !item.has_tag(completion_tag) {
            tags.push(BTreeMap::from([("tag", completion_tag.to_string())]));
        }
        let body = serde_json::json!({
            "collections": all_collections,
            "tags": tags,
        });

        let url = self.url(&format!("items/{}", item.key));
        self.retry.run(operation, || {
            let response = self
                .client
                .patch(&url)
                .header("Zotero-API-Key", self.api_key.expose_secret())
                .header("Zotero-API-Version", "3")
                .header("If-Unmodified-Since-Version", item.version.to_string())
                .json(&body)
                .send()
                .map_err(|e| transport_error(operation, &e))?;
            check_status(operation, response).map(|_| ())
        })
    }
}

fn transport_error(operation: &'static str, e: &reqwest::Error) -> Error {
    let error_kind = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connect"
    } else if e.is_request() {
        "request"
    } else {
        "unknown"
    };
    tracing::error!(
        operation,
        error = %e,
        error_kind,
        "library request failed"
    );
    Error::RemoteUnavailable {
        operation: operation.to_string(),
        cause: format!("{error_kind} error: {e}"),
    }
}

fn check_status(operation: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());
        return Err(Error::RateLimited {
            operation: operation.to_string(),
            retry_after_secs: retry_after,
        });
    }
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        tracing::error!(operation, %status, body = %body, "library API returned error status");
        return Err(Error::RemoteUnavailable {
            operation: operation.to_string(),
            cause: format!("status {status}: {body}"),
        });
    }
    Ok(response)
}

/// A collection object as returned by the API.
#[derive(Debug, Deserialize)]
struct CollectionRecord {
    key: String,
    data: CollectionData,
}

#[derive(Debug, Deserialize)]
struct CollectionData {
    name: String,
    /// `false` at top level, a key string otherwise.
    #[serde(default, rename = "parentCollection")]
    parent_collection: Option<ParentField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ParentField {
    Key(String),
    Root(bool),
}

impl CollectionRecord {
    fn into_summary(self) -> CollectionSummary {
        let parent = match self.data.parent_collection {
            Some(ParentField::Key(key)) => Some(CollectionKey::new(key)),
            _ => None,
        };
        CollectionSummary {
            key: CollectionKey::new(self.key),
            name: self.data.name,
            parent,
        }
    }
}

/// An item object as returned by the API.
#[derive(Debug, Deserialize)]
struct ItemRecord {
    key: String,
    #[serde(default)]
    version: i64,
    data: ItemData,
}

#[derive(Debug, Deserialize)]
struct ItemData {
    #[serde(rename = "itemType")]
    item_type: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    tags: Vec<TagRecord>,
    #[serde(default)]
    collections: Vec<String>,
    #[serde(default)]
    note: String,
}

#[derive(Debug, Deserialize)]
struct TagRecord {
    tag: String,
}

impl ItemRecord {
    fn into_item(self) -> LibraryItem {
        LibraryItem {
            key: self.key,
            version: self.version,
            item_type: self.data.item_type,
            title: self.data.title,
            tags: self.data.tags.into_iter().map(|t| t.tag).collect(),
            collections: self
                .data
                .collections
                .into_iter()
                .map(CollectionKey::new)
                .collect(),
        }
    }
}

/// Multi-object write response.
#[derive(Debug, Deserialize)]
struct WriteResponse {
    #[serde(default)]
    success: BTreeMap<String, String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_library_type_parse() {
        assert_eq!(LibraryType::parse("group"), LibraryType::Group);
        assert_eq!(LibraryType::parse("Group"), LibraryType::Group);
        assert_eq!(LibraryType::parse("user"), LibraryType::User);
        assert_eq!(LibraryType::parse("anything"), LibraryType::User);
    }

    #[test]
    fn test_url_uses_library_prefix() {
        let client = ZoteroClient::new("12345", LibraryType::User, SecretString::from("k"))
            .with_endpoint("https://zotero.test");
        assert_eq!(
            client.url("collections/top?limit=200"),
            "https://zotero.test/users/12345/collections/top?limit=200"
        );

        let client = ZoteroClient::new("99", LibraryType::Group, SecretString::from("k"));
        assert_eq!(client.library_prefix, "groups/99");
    }

    #[test]
    fn test_collection_record_parsing() {
        let json = r#"{
            "key": "ABCD1234",
            "data": {"name": "Hazards", "parentCollection": "ROOT0001"}
        }"#;
        let record: CollectionRecord = serde_json::from_str(json).unwrap();
        let summary = record.into_summary();
        assert_eq!(summary.name, "Hazards");
        assert_eq!(summary.parent, Some(CollectionKey::new("ROOT0001")));

        let json = r#"{
            "key": "ABCD1234",
            "data": {"name": "Archive", "parentCollection": false}
        }"#;
        let record: CollectionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.into_summary().parent, None);
    }

    #[test]
    fn test_item_record_parsing() {
        let json = r#"{
            "key": "ITEM0001",
            "version": 42,
            "data": {
                "itemType": "journalArticle",
                "title": "Flash drought onset",
                "tags": [{"tag": "gemini_read"}],
                "collections": ["COLL0001"]
            }
        }"#;
        let record: ItemRecord = serde_json::from_str(json).unwrap();
        let item = record.into_item();
        assert_eq!(item.version, 42);
        assert!(item.has_tag("gemini_read"));
        assert!(item.in_collection(&CollectionKey::new("COLL0001")));
    }

    #[test]
    fn test_write_response_parsing() {
        let json = r#"{"successful": {"0": {"key": "NEW1"}}, "success": {"0": "NEW1"}, "unchanged": {}, "failed": {}}"#;
        let write: WriteResponse = serde_json::from_str(json).unwrap();
        assert_eq!(write.success.into_values().next().as_deref(), Some("NEW1"));
    }
}
