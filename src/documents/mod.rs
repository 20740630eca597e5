//! Narrative documents for numerology numbers
//!
//! Each (category, number) pair maps to one .docx object under a common
//! prefix. The text is fetched on demand and handed to the execute agent
//! as context.

pub mod docx;
pub mod http;
pub mod s3;

pub use docx::extract_text;
pub use http::HttpDocumentStore;
pub use s3::{S3DocumentStore, SigV4Signer};

use crate::config::DocumentStoreConfig;
use crate::error::AgentError;
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Byte source for document objects
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>>;
}

/// Store backed by a map, for tests and offline runs
#[derive(Default)]
pub struct InMemoryDocumentStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(objects: HashMap<String, Vec<u8>>) -> Self {
        Self {
            objects: RwLock::new(objects),
        }
    }

    pub async fn insert(&self, key: impl Into<String>, bytes: Vec<u8>) {
        self.objects.write().await.insert(key.into(), bytes);
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| AgentError::DocumentError(format!("no object at {}", key)))
    }
}

/// Signed S3 store when credentials are set, plain HTTP when only a URL
/// is, and an empty in-memory store otherwise.
pub fn store_from_config(config: &DocumentStoreConfig) -> Result<Arc<dyn DocumentStore>> {
    Ok(match (&config.base_url, &config.credentials) {
        (Some(url), Some(credentials)) => {
            Arc::new(S3DocumentStore::new(url, credentials.clone())?)
        }
        (Some(url), None) => Arc::new(HttpDocumentStore::new(url)?),
        (None, _) => {
            warn!("No document store configured, numerology context will use fallbacks");
            Arc::new(InMemoryDocumentStore::new())
        }
    })
}

/// Folder of the single-number categories; the file is `{folder}_{n}.docx`
fn category_folder(category: &str) -> Option<&'static str> {
    Some(match category {
        "life_path" => "duong_doi",
        "life_purpose" => "su_menh",
        "soul" => "linh_hon",
        "personality" => "nhan_cach",
        "balance" => "can_bang",
        "maturity" => "truong_thanh",
        "passion" => "dam_me",
        "missing_aspects" => "thieu",
        "rational_thinking" => "tu_duy_ly_tri",
        "personal_year" => "nam_ca_nhan",
        "personal_month" => "thang_ca_nhan",
        "personal_day" => "ngay_ca_nhan",
        _ => return None,
    })
}

pub fn is_known_category(category: &str) -> bool {
    category_folder(category).is_some()
        || matches!(category, "milestone" | "giai_doan" | "challenge" | "thu_thach")
}

/// Object key for a category and number.
///
/// Milestones and challenges live in one folder per phase, so `phase` is
/// required for them. Returns `Ok(None)` for unknown categories.
pub fn document_key(
    prefix: &str,
    category: &str,
    number: u32,
    phase: Option<u32>,
) -> Result<Option<String>> {
    let prefix = prefix.trim_end_matches('/');

    if let Some(folder) = category_folder(category) {
        return Ok(Some(format!("{}/{}/{}_{}.docx", prefix, folder, folder, number)));
    }

    let phase_of = |category: &str| {
        phase.ok_or_else(|| {
            AgentError::DocumentError(format!("category '{}' needs a phase number", category))
        })
    };

    match category {
        "milestone" | "giai_doan" => Ok(Some(format!(
            "{}/giai_doan_{}/chang_{}.docx",
            prefix,
            phase_of(category)?,
            number
        ))),
        "challenge" | "thu_thach" => Ok(Some(format!(
            "{}/thach_thuc_giai_doan_{}/thach_thuc_{}.docx",
            prefix,
            phase_of(category)?,
            number
        ))),
        _ => Ok(None),
    }
}

/// Reads numerology documents from a store under one prefix
#[derive(Clone)]
pub struct NumerologyLibrary {
    store: Arc<dyn DocumentStore>,
    prefix: String,
}

impl NumerologyLibrary {
    pub fn new(store: Arc<dyn DocumentStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Document text, or an error from the store or the .docx reader
    pub async fn try_document_text(
        &self,
        category: &str,
        number: u32,
        phase: Option<u32>,
    ) -> Result<String> {
        let Some(key) = document_key(&self.prefix, category, number, phase)? else {
            return Ok(format!(
                "Document for {} with value {} is not available yet.",
                category, number
            ));
        };

        debug!(%key, "Loading numerology document");
        let bytes = self.store.fetch(&key).await?;
        extract_text(&bytes)
    }

    /// Like `try_document_text`, but failures become a readable message
    pub async fn document_text(&self, category: &str, number: u32, phase: Option<u32>) -> String {
        match self.try_document_text(category, number, phase).await {
            Ok(text) => text,
            Err(e) => {
                warn!(category, number, "Document unavailable: {}", e);
                format!("Could not load document for {} {}: {}", category, number, e)
            }
        }
    }
}
