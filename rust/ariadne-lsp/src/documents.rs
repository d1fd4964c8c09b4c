//! Open documents, grouped by analysis language

use std::collections::BTreeMap;

use ariadne_core::{SourceModule, SourcePosition};
use lsp_types::{Position, TextDocumentContentChangeEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub language: String,
    pub uri: String,
    pub text: String,
}

/// What [`DocumentStore::add_or_replace`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registration {
    /// The document is new or its text differs from the stored one.
    pub changed: bool,
    /// Language that held the URI before it was reopened under another.
    pub moved_from: Option<String>,
}

/// Per language, the open documents keyed by canonical URI.
#[derive(Debug, Default)]
pub struct DocumentStore {
    by_language: BTreeMap<String, BTreeMap<String, Document>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a document.
    ///
    /// A URI belongs to one language at a time; reopening it under another
    /// language moves it, and the outcome names the language it left.
    pub fn add_or_replace(&mut self, language: &str, uri: &str, text: &str) -> Registration {
        let mut moved_from = None;
        for (other, documents) in self.by_language.iter_mut() {
            if other != language && documents.remove(uri).is_some() {
                moved_from = Some(other.clone());
            }
        }
        self.by_language.retain(|_, documents| !documents.is_empty());

        let documents = self.by_language.entry(language.to_string()).or_default();
        if documents.get(uri).is_some_and(|doc| doc.text == text) {
            return Registration {
                changed: moved_from.is_some(),
                moved_from,
            };
        }
        documents.insert(
            uri.to_string(),
            Document {
                language: language.to_string(),
                uri: uri.to_string(),
                text: text.to_string(),
            },
        );
        Registration {
            changed: true,
            moved_from,
        }
    }

    /// Replace the text of an open document, keeping its language.
    pub fn update_text(&mut self, uri: &str, text: String) -> bool {
        match self.get_mut(uri) {
            Some(doc) if doc.text != text => {
                doc.text = text;
                true
            }
            _ => false,
        }
    }

    pub fn remove(&mut self, uri: &str) -> Option<Document> {
        let language = self.language_of(uri)?.to_string();
        let documents = self.by_language.get_mut(&language)?;
        let removed = documents.remove(uri);
        if documents.is_empty() {
            self.by_language.remove(&language);
        }
        removed
    }

    pub fn get(&self, uri: &str) -> Option<&Document> {
        self.by_language.values().find_map(|documents| documents.get(uri))
    }

    fn get_mut(&mut self, uri: &str) -> Option<&mut Document> {
        self.by_language
            .values_mut()
            .find_map(|documents| documents.get_mut(uri))
    }

    pub fn language_of(&self, uri: &str) -> Option<&str> {
        self.get(uri).map(|doc| doc.language.as_str())
    }

    pub fn documents(&self, language: &str) -> impl Iterator<Item = &Document> {
        self.by_language.get(language).into_iter().flat_map(|d| d.values())
    }

    pub fn has_documents(&self, language: &str) -> bool {
        self.by_language.get(language).is_some_and(|d| !d.is_empty())
    }

    pub fn uris(&self, language: &str) -> Vec<String> {
        self.documents(language).map(|doc| doc.uri.clone()).collect()
    }

    /// The module set handed to an engine, in URI order.
    pub fn modules(&self, language: &str) -> Vec<SourceModule> {
        self.documents(language)
            .map(|doc| SourceModule::new(doc.uri.clone(), doc.text.clone()))
            .collect()
    }

    /// Text covered by `position`, read from the open document of its URL.
    pub fn snippet(&self, position: &SourcePosition) -> Option<String> {
        let text = &self.get(&position.url)?.text;
        extract_range(text, position)
    }
}

fn extract_range(text: &str, position: &SourcePosition) -> Option<String> {
    if position.first_line == 0 || position.last_line < position.first_line {
        return None;
    }
    let first = (position.first_line - 1) as usize;
    let count = (position.last_line - position.first_line) as usize + 1;
    let lines: Vec<&str> = text.lines().skip(first).take(count).collect();
    if lines.len() != count {
        return None;
    }

    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        let start = if i == 0 { position.first_col as usize } else { 0 };
        let end = if i + 1 == count {
            position.last_col as usize
        } else {
            usize::MAX
        };
        if i > 0 {
            out.push('\n');
        }
        out.extend(line.chars().skip(start).take(end.saturating_sub(start)));
    }
    Some(out)
}

/// Collapse every run of whitespace, including line breaks, to one space.
pub fn compact(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Apply a batch of content changes to `previous_text`. `None` when a ranged
/// change does not fit the text it applies to.
pub fn apply_text_document_changes(
    previous_text: &str,
    content_changes: &[TextDocumentContentChangeEvent],
) -> Option<String> {
    let mut updated = previous_text.to_string();

    for change in content_changes {
        if let Some(range) = change.range {
            let start = lsp_position_to_byte_offset(&updated, range.start)?;
            let end = lsp_position_to_byte_offset(&updated, range.end)?;
            if start > end || end > updated.len() {
                return None;
            }
            updated.replace_range(start..end, &change.text);
        } else {
            updated = change.text.clone();
        }
    }

    Some(updated)
}

/// The last full replacement of a batch, used when ranged changes fail.
pub fn last_full_replacement(content_changes: &[TextDocumentContentChangeEvent]) -> Option<&str> {
    content_changes
        .iter()
        .rev()
        .find(|change| change.range.is_none())
        .map(|change| change.text.as_str())
}

fn lsp_position_to_byte_offset(text: &str, position: Position) -> Option<usize> {
    let line_start = line_start_offset(text, position.line)?;
    let line_end = text[line_start..]
        .find('\n')
        .map(|idx| line_start + idx)
        .unwrap_or(text.len());
    let line_slice = &text[line_start..line_end];

    let mut utf16_col: u32 = 0;
    for (idx, ch) in line_slice.char_indices() {
        if utf16_col == position.character {
            return Some(line_start + idx);
        }

        utf16_col = utf16_col.saturating_add(ch.len_utf16() as u32);
        if utf16_col > position.character {
            return None;
        }
    }

    (utf16_col == position.character).then_some(line_end)
}

fn line_start_offset(text: &str, line: u32) -> Option<usize> {
    if line == 0 {
        return Some(0);
    }

    let mut current_line = 0;
    for (idx, ch) in text.char_indices() {
        if ch == '\n' {
            current_line += 1;
            if current_line == line {
                return Some(idx + 1);
            }
        }
    }

    None
}
