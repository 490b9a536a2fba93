use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;
use url::Url;

use super::{RetrievalError, RetrievalFuture, Retriever};
use crate::config::ConfigError;
use crate::config_env::{optional_trimmed_env, parse_u32_env, parse_u64_env, require_env};

const API_KEY_HEADER: &str = "Api-Key";
const API_VERSION_HEADER: &str = "X-Pinecone-API-Version";
const API_VERSION: &str = "2025-01";

const DEFAULT_NAMESPACE: &str = "__default__";
const DEFAULT_TOP_K: u32 = 3;
const DEFAULT_TEXT_FIELD: &str = "text";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct PineconeRetrieverConfig {
    pub index_host: String,
    pub api_key: String,
    pub namespace: String,
    pub top_k: u32,
    pub text_field: String,
    pub timeout_ms: u64,
}

impl PineconeRetrieverConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let top_k = parse_u32_env("PINECONE_TOP_K", DEFAULT_TOP_K)?;
        if top_k == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "PINECONE_TOP_K must be > 0".to_string(),
            ));
        }

        Ok(Self {
            index_host: require_env("PINECONE_INDEX_HOST")?,
            api_key: require_env("PINECONE_API_KEY")?,
            namespace: optional_trimmed_env("PINECONE_NAMESPACE")
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            top_k,
            text_field: optional_trimmed_env("PINECONE_TEXT_FIELD")
                .unwrap_or_else(|| DEFAULT_TEXT_FIELD.to_string()),
            timeout_ms: parse_u64_env("PINECONE_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
        })
    }
}

/// Text search against a Pinecone index with integrated embedding.
#[derive(Clone)]
pub struct PineconeRetriever {
    client: reqwest::Client,
    search_url: Url,
    config: PineconeRetrieverConfig,
}

impl PineconeRetriever {
    pub fn new(config: PineconeRetrieverConfig) -> Result<Self, ConfigError> {
        let search_url = search_url(&config.index_host, &config.namespace)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;

        Ok(Self {
            client,
            search_url,
            config,
        })
    }

    pub fn search_url(&self) -> &Url {
        &self.search_url
    }

    async fn search(&self, query: &str) -> Result<Vec<String>, RetrievalError> {
        let request_body = json!({
            "query": {
                "inputs": { "text": query },
                "top_k": self.config.top_k
            },
            "fields": [self.config.text_field]
        });

        let response = self
            .client
            .post(self.search_url.clone())
            .header(API_KEY_HEADER, &self.config.api_key)
            .header(API_VERSION_HEADER, API_VERSION)
            .json(&request_body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    RetrievalError::Timeout
                } else {
                    RetrievalError::ProviderFailure("request_unavailable".to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            if err.is_timeout() {
                RetrievalError::Timeout
            } else {
                RetrievalError::InvalidProviderPayload("response_body_read_failed".to_string())
            }
        })?;

        if !status.is_success() {
            return Err(RetrievalError::ProviderFailure(format!(
                "status={}",
                status.as_u16()
            )));
        }

        let parsed: SearchRecordsResponse = serde_json::from_str(&body).map_err(|_| {
            RetrievalError::InvalidProviderPayload("response_json_parse_failed".to_string())
        })?;

        let snippets = parsed
            .result
            .hits
            .into_iter()
            .filter_map(|hit| match hit.fields.get(&self.config.text_field) {
                Some(Value::String(text)) => Some(text.clone()),
                _ => None,
            })
            .collect::<Vec<_>>();

        debug!(snippets = snippets.len(), "retrieval hits received");
        Ok(snippets)
    }
}

impl Retriever for PineconeRetriever {
    fn retrieve<'a>(&'a self, query: &'a str) -> RetrievalFuture<'a> {
        Box::pin(self.search(query))
    }
}

#[derive(Debug, Deserialize)]
struct SearchRecordsResponse {
    result: SearchRecordsResult,
}

#[derive(Debug, Deserialize)]
struct SearchRecordsResult {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    fields: Map<String, Value>,
}

fn search_url(index_host: &str, namespace: &str) -> Result<Url, ConfigError> {
    let base = if index_host.starts_with("http://") || index_host.starts_with("https://") {
        index_host.to_string()
    } else {
        format!("https://{index_host}")
    };

    let mut url = Url::parse(&base).map_err(|err| {
        ConfigError::InvalidConfiguration(format!("PINECONE_INDEX_HOST is not a valid URL: {err}"))
    })?;
    url.path_segments_mut()
        .map_err(|_| {
            ConfigError::InvalidConfiguration(
                "PINECONE_INDEX_HOST cannot be a base URL".to_string(),
            )
        })?
        .pop_if_empty()
        .extend(["records", "namespaces", namespace, "search"]);

    Ok(url)
}
