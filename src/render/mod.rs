//! Content rendering at a compression level
//!
//! A renderer maps (content, level) to rendered text. Rendering may be
//! expensive and non-deterministic (LLM-backed above trim); failures are
//! per file and recovered by the caller, never fatal to a run.

pub mod cache;
pub mod llm;
pub mod prompts;

use async_trait::async_trait;
use std::path::Path;

use crate::domain::CompressionLevel;
use crate::error::RenderResult;

pub use cache::RenderCache;
pub use llm::{LlmRenderer, LlmRendererConfig};

/// Renders file content at an assigned compression level
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Implementation name, for logs
    fn name(&self) -> &str;

    /// Render `content` at `level`. The path is advisory only (prompt
    /// selection by file kind); content is the source of truth.
    async fn render(
        &self,
        path: &Path,
        content: &str,
        level: CompressionLevel,
    ) -> RenderResult<String>;
}

/// Renderer that returns content unchanged at every level.
///
/// Used for token-count-only runs and as a harness in tests.
pub struct PassthroughRenderer;

#[async_trait]
impl Renderer for PassthroughRenderer {
    fn name(&self) -> &str {
        "passthrough"
    }

    async fn render(
        &self,
        _path: &Path,
        content: &str,
        _level: CompressionLevel,
    ) -> RenderResult<String> {
        Ok(content.to_string())
    }
}
