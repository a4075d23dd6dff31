//! Knowledge index over a static markdown document.
//!
//! The document is split on second-level headings (`## `) into titled
//! sections. Queries are scored by token overlap: for every query token,
//! add how often it appears in the section.

use std::collections::HashMap;
use std::path::Path;

use tokio::fs;

use crate::error::KnowledgeError;

/// Title given to content that precedes the first heading.
pub const OVERVIEW_TITLE: &str = "Overview";

/// Default number of sections returned by [`KnowledgeIndex::retrieve`].
pub const DEFAULT_MAX_SECTIONS: usize = 3;

/// Split text into lowercase runs of ASCII letters, digits, or apostrophes.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
        .collect()
}

/// One titled section of the knowledge document.
#[derive(Debug, Clone)]
pub struct KnowledgeSection {
    pub title: String,
    /// Non-blank lines of the section, each trimmed, joined with `\n`.
    pub content: String,
    pub token_frequency: HashMap<String, usize>,
}

impl KnowledgeSection {
    fn new(title: String, lines: &[&str]) -> Option<Self> {
        let content = lines
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        if content.is_empty() {
            return None;
        }

        let mut token_frequency = HashMap::new();
        for token in tokenize(&content) {
            *token_frequency.entry(token).or_insert(0) += 1;
        }

        Some(Self {
            title,
            content,
            token_frequency,
        })
    }

    /// Sum of this section's counts for each query token (repeats count again).
    pub fn score(&self, query_tokens: &[String]) -> usize {
        query_tokens
            .iter()
            .map(|t| self.token_frequency.get(t).copied().unwrap_or(0))
            .sum()
    }
}

/// Immutable index built once at startup.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeIndex {
    sections: Vec<KnowledgeSection>,
}

impl KnowledgeIndex {
    /// Split a document into sections, in document order.
    pub fn parse(document: &str) -> Self {
        let mut sections = Vec::new();
        let mut title = OVERVIEW_TITLE.to_string();
        let mut lines: Vec<&str> = Vec::new();

        for line in document.lines() {
            if let Some(heading) = line.strip_prefix("## ") {
                sections.extend(KnowledgeSection::new(title, &lines));
                title = heading.trim().to_string();
                lines.clear();
            } else {
                lines.push(line);
            }
        }
        sections.extend(KnowledgeSection::new(title, &lines));

        Self { sections }
    }

    /// Read and index a document. A missing file is an error.
    pub async fn load(path: &Path) -> Result<Self, KnowledgeError> {
        if !fs::try_exists(path).await? {
            return Err(KnowledgeError::NotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path).await?;
        let index = Self::parse(&text);
        tracing::info!(
            path = %path.display(),
            sections = index.sections.len(),
            "Knowledge index loaded"
        );
        Ok(index)
    }

    pub fn sections(&self) -> &[KnowledgeSection] {
        &self.sections
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Best-matching section contents, highest score first.
    ///
    /// Ties keep document order. Returns `(vec![], false)` when the query has
    /// no tokens or nothing overlaps.
    pub fn retrieve(&self, query: &str, max_sections: usize) -> (Vec<&str>, bool) {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return (Vec::new(), false);
        }

        let mut scored: Vec<(usize, &KnowledgeSection)> = self
            .sections
            .iter()
            .map(|s| (s.score(&query_tokens), s))
            .filter(|(score, _)| *score > 0)
            .collect();
        if scored.is_empty() {
            return (Vec::new(), false);
        }

        // stable: equal scores stay in document order
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        let top = scored
            .into_iter()
            .take(max_sections)
            .map(|(_, s)| s.content.as_str())
            .collect();
        (top, true)
    }

    /// The first two sections, used when retrieval finds nothing.
    pub fn default_context(&self) -> Vec<&str> {
        self.sections
            .iter()
            .take(2)
            .map(|s| s.content.as_str())
            .collect()
    }

    /// Excerpt text for a query plus whether retrieval matched.
    pub fn build_context(&self, query: &str) -> (String, bool) {
        let (sections, matched) = self.retrieve(query, DEFAULT_MAX_SECTIONS);
        if matched {
            (sections.join("\n\n"), true)
        } else {
            (self.default_context().join("\n\n"), false)
        }
    }
}
