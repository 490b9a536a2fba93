use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

pub mod pinecone;

pub use pinecone::{PineconeRetriever, PineconeRetrieverConfig};

pub type RetrievalFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<String>, RetrievalError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("retrieval request timed out")]
    Timeout,
    #[error("retrieval request failed: {0}")]
    ProviderFailure(String),
    #[error("retrieval provider returned an invalid payload: {0}")]
    InvalidProviderPayload(String),
}

/// Returns the passages most relevant to `query`, best match first.
pub trait Retriever: Send + Sync {
    fn retrieve<'a>(&'a self, query: &'a str) -> RetrievalFuture<'a>;
}

/// Concatenates retrieved passages into the prompt's context block.
pub fn join_snippets(snippets: &[String]) -> String {
    snippets
        .iter()
        .map(|snippet| snippet.trim())
        .filter(|snippet| !snippet.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
