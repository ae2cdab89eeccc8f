//! Overlapping-window chunking of staged text.
//!
//! Splitting is delegated to the `text-splitter` crate; this module only
//! configures the window size and derives index-safe chunk identifiers.

use std::sync::LazyLock;

use regex::Regex;
use text_splitter::{ChunkConfig, TextSplitter};

use crate::types::PipelineError;

/// Characters allowed in an index document key.
static UNSAFE_ID_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\-=]").expect("valid id pattern"));

/// Window sizing for the splitter.
#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    /// Maximum window size in characters.
    pub max_chars: usize,
    /// Overlap between consecutive windows, in characters.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: 1000,
            overlap: 200,
        }
    }
}

/// One window of source text with its position metadata.
#[derive(Debug, Clone)]
pub struct TextChunk {
    /// Zero-based index of this chunk within its source document.
    pub index: usize,
    /// Byte offset of the window start within the source text.
    pub offset: usize,
    /// The window text.
    pub text: String,
}

/// Splits `text` into overlapping windows.
///
/// Empty or whitespace-only input yields no chunks rather than an error;
/// the caller decides whether that is worth reporting.
pub fn split_text(text: &str, config: &ChunkingConfig) -> Result<Vec<TextChunk>, PipelineError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let chunk_config = ChunkConfig::new(config.max_chars)
        .with_overlap(config.overlap)
        .map_err(|err| PipelineError::Chunking(err.to_string()))?;
    let splitter = TextSplitter::new(chunk_config);

    Ok(splitter
        .chunk_indices(text)
        .enumerate()
        .map(|(index, (offset, window))| TextChunk {
            index,
            offset,
            text: window.to_string(),
        })
        .collect())
}

/// Derives the index document key for a chunk of a staged file.
///
/// Mirrors the key constraints of the managed index: letters, digits,
/// underscore, dash, and equals only.
pub fn chunk_id(source_file: &str, index: usize) -> String {
    let raw = format!("{source_file}_{index}");
    UNSAFE_ID_CHARS.replace_all(&raw, "").into_owned()
}
