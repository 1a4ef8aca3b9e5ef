//! Loading the default knowledge base document.

use anyhow::{anyhow, Result};
use reqwest::Client;
use std::path::PathBuf;
use tracing::{info, warn};

/// Where the default document lives unless configured otherwise.
pub const DEFAULT_KNOWLEDGE_SOURCE: &str = "kb.txt";

/// Text used when the default document can't be loaded.
pub const FALLBACK_KNOWLEDGE: &str =
    "Oops! We couldn't load the default story. You can write your own here!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnowledgeSource {
    Url(String),
    File(PathBuf),
}

impl KnowledgeSource {
    /// `http://` and `https://` are fetched, everything else is a path.
    pub fn parse(source: &str) -> Self {
        let source = source.trim();
        if source.starts_with("http://") || source.starts_with("https://") {
            KnowledgeSource::Url(source.to_string())
        } else {
            KnowledgeSource::File(PathBuf::from(source))
        }
    }

    async fn fetch(&self) -> Result<String> {
        match self {
            KnowledgeSource::Url(url) => {
                let response = Client::new().get(url).send().await?;
                if !response.status().is_success() {
                    return Err(anyhow!("GET {} failed with status {}", url, response.status()));
                }
                Ok(response.text().await?)
            }
            KnowledgeSource::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| anyhow!("Failed to read {:?}: {}", path, e)),
        }
    }
}

impl std::fmt::Display for KnowledgeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KnowledgeSource::Url(url) => f.write_str(url),
            KnowledgeSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Load the default document once. Any failure yields [`FALLBACK_KNOWLEDGE`].
pub async fn load_default(source: &KnowledgeSource) -> String {
    match source.fetch().await {
        Ok(text) => {
            info!(%source, bytes = text.len(), "loaded knowledge base");
            text
        }
        Err(e) => {
            warn!(%source, error = %e, "failed to load knowledge base, using fallback");
            FALLBACK_KNOWLEDGE.to_string()
        }
    }
}
