//! Keyword extraction for document bodies.
//!
//! The pipeline only sees the [`KeywordExtractor`] trait (text in, tags
//! out). [`AzureKeywordExtractor`] is the production backend, a chat
//! completion against an Azure OpenAI deployment.

mod azure;
mod parse;

use async_trait::async_trait;

use drivedocs_shared::Result;

pub use azure::{AzureKeywordExtractor, build_prompt};
pub use parse::parse_tags;

/// Turns document text into a short list of topical tags.
#[async_trait]
pub trait KeywordExtractor: Send + Sync {
    /// Extract tags from `text`. The returned list is passed through unvalidated.
    async fn extract_tags(&self, text: &str) -> Result<Vec<String>>;
}
