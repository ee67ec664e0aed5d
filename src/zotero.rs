//! Zotero Web API client.
//!
//! Only the handful of calls the summariser needs: collections, top-level
//! items of a collection, the children of an item, and note creation.

use crate::config::{LibraryType, ZoteroConfig};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const API_BASE: &str = "https://api.zotero.org";

/// Largest page the Zotero API serves
const PAGE_LIMIT: usize = 100;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("paper-summa/", env!("CARGO_PKG_VERSION"));

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Error, Debug)]
pub enum ZoteroError {
    #[error("Zotero request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Zotero API returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("Zotero rejected the note: {0}")]
    WriteRejected(String),
}

/// A collection in the library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub key: String,
    pub name: String,
}

/// A top-level bibliographic entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub key: String,
    pub title: String,
    pub item_type: String,
}

/// A tag as the API represents it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub tag: String,
}

/// An attachment or note belonging to an item
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Child {
    pub key: String,
    pub item_type: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Child {
    pub fn is_note(&self) -> bool {
        self.item_type == "note"
    }

    pub fn is_pdf_attachment(&self) -> bool {
        self.item_type == "attachment" && self.content_type.as_deref() == Some(PDF_CONTENT_TYPE)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.tag == tag)
    }

    /// Where the synced file lives: `<storage_dir>/<key>/<filename>`.
    ///
    /// `None` for entries without a filename (notes, linked URLs).
    pub fn local_path(&self, storage_dir: &Path) -> Option<PathBuf> {
        let filename = self.filename.as_deref()?;
        Some(storage_dir.join(&self.key).join(filename))
    }
}

/// True if any child is a note carrying `tag`.
pub fn has_summary_note(children: &[Child], tag: &str) -> bool {
    children.iter().any(|c| c.is_note() && c.has_tag(tag))
}

/// The first PDF attachment in listing order.
pub fn find_pdf_attachment(children: &[Child]) -> Option<&Child> {
    children.iter().find(|c| c.is_pdf_attachment())
}

/// Operations on a bibliographic library.
#[async_trait]
pub trait Library: Send + Sync {
    async fn list_collections(&self) -> Result<Vec<Collection>, ZoteroError>;

    /// Items directly in the collection; entries nested under other items are excluded.
    async fn list_top_level_items(&self, collection_key: &str) -> Result<Vec<Item>, ZoteroError>;

    async fn list_children(&self, item_key: &str) -> Result<Vec<Child>, ZoteroError>;

    async fn create_note(
        &self,
        parent_key: &str,
        html: &str,
        tags: &[String],
    ) -> Result<(), ZoteroError>;
}

/// Envelope wrapping every object the API returns
#[derive(Debug, Deserialize)]
struct ApiObject<T> {
    key: String,
    data: T,
}

#[derive(Debug, Deserialize)]
struct CollectionData {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemData {
    item_type: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewNote<'a> {
    item_type: &'static str,
    parent_item: &'a str,
    note: &'a str,
    tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    #[serde(default)]
    failed: HashMap<String, serde_json::Value>,
}

/// Client for the Zotero Web API v3
pub struct ZoteroClient {
    http: Client,
    library_prefix: String,
    api_key: String,
}

impl ZoteroClient {
    pub fn new(config: &ZoteroConfig) -> Result<Self, ZoteroError> {
        Self::with_base_url(config, API_BASE)
    }

    /// Build a client against another API root, e.g. a local mirror
    pub fn with_base_url(config: &ZoteroConfig, base_url: &str) -> Result<Self, ZoteroError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        let scope = match config.library_type {
            LibraryType::User => "users",
            LibraryType::Group => "groups",
        };
        Ok(Self {
            http,
            library_prefix: format!(
                "{}/{}/{}",
                base_url.trim_end_matches('/'),
                scope,
                config.user_id
            ),
            api_key: config.api_key.clone(),
        })
    }

    async fn send_checked(request: reqwest::RequestBuilder) -> Result<Response, ZoteroError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ZoteroError::Status { status, body });
        }
        Ok(response)
    }

    /// Fetch one page of a list endpoint, starting at offset `start`
    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        start: usize,
    ) -> Result<Vec<ApiObject<T>>, ZoteroError> {
        let url = format!(
            "{}{}?format=json&limit={}&start={}",
            self.library_prefix, path, PAGE_LIMIT, start
        );
        tracing::debug!(%url, "GET");
        let request = self
            .http
            .get(&url)
            .header("Zotero-API-Key", &self.api_key)
            .header("Zotero-API-Version", "3");
        Ok(Self::send_checked(request).await?.json().await?)
    }

    /// Fetch every page of a list endpoint
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Vec<ApiObject<T>>, ZoteroError> {
        collect_pages(|start| self.get_page(path, start)).await
    }
}

/// Request pages at increasing offsets until one comes back shorter than
/// [`PAGE_LIMIT`].
async fn collect_pages<T, F, Fut>(mut fetch_page: F) -> Result<Vec<T>, ZoteroError>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<Vec<T>, ZoteroError>>,
{
    let mut results = Vec::new();
    loop {
        let page = fetch_page(results.len()).await?;
        let len = page.len();
        results.extend(page);
        if len < PAGE_LIMIT {
            return Ok(results);
        }
    }
}

#[async_trait]
impl Library for ZoteroClient {
    async fn list_collections(&self) -> Result<Vec<Collection>, ZoteroError> {
        let objects = self.get_all::<CollectionData>("/collections").await?;
        Ok(objects
            .into_iter()
            .map(|o| Collection {
                key: o.key,
                name: o.data.name,
            })
            .collect())
    }

    async fn list_top_level_items(&self, collection_key: &str) -> Result<Vec<Item>, ZoteroError> {
        let path = format!("/collections/{}/items/top", collection_key);
        let objects = self.get_all::<ItemData>(&path).await?;
        Ok(objects
            .into_iter()
            .map(|o| Item {
                key: o.key,
                title: o.data.title.unwrap_or_else(|| "Untitled".to_string()),
                item_type: o.data.item_type,
            })
            .collect())
    }

    async fn list_children(&self, item_key: &str) -> Result<Vec<Child>, ZoteroError> {
        let path = format!("/items/{}/children", item_key);
        let objects = self.get_all::<Child>(&path).await?;
        Ok(objects.into_iter().map(|o| o.data).collect())
    }

    async fn create_note(
        &self,
        parent_key: &str,
        html: &str,
        tags: &[String],
    ) -> Result<(), ZoteroError> {
        let note = NewNote {
            item_type: "note",
            parent_item: parent_key,
            note: html,
            tags: tags.iter().map(|t| Tag { tag: t.clone() }).collect(),
        };
        let url = format!("{}/items", self.library_prefix);
        tracing::debug!(%url, parent = parent_key, "POST note");
        let request = self
            .http
            .post(&url)
            .header("Zotero-API-Key", &self.api_key)
            .header("Zotero-API-Version", "3")
            .json(&[note]);
        let response: WriteResponse = Self::send_checked(request).await?.json().await?;
        if let Some(reason) = response.failed.values().next() {
            return Err(ZoteroError::WriteRejected(reason.to_string()));
        }
        Ok(())
    }
}
