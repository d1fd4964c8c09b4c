//! Canonical document identifiers.
//!
//! Clients send URIs that an engine cannot always load (`untitled:` buffers,
//! bare names, strings with spaces). Those are remapped to synthetic
//! `file://fake<N>` identifiers; the original is kept for the way back out.

use std::collections::HashMap;

use tracing::debug;

const FAKE_PREFIX: &str = "file://fake";

/// Reversible mapping from client URIs to canonical identifiers.
#[derive(Debug, Default)]
pub struct UriCanonicalizer {
    next_fake: u64,
    mangled: HashMap<String, String>,
    originals: HashMap<String, String>,
}

impl UriCanonicalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical identifier for `uri`. Parseable URLs map to themselves.
    pub fn mangle(&mut self, uri: &str) -> String {
        if let Some(existing) = self.mangled.get(uri) {
            return existing.clone();
        }
        if url::Url::parse(uri).is_ok() {
            return uri.to_string();
        }

        let fake = format!("{FAKE_PREFIX}{}", self.next_fake);
        self.next_fake += 1;
        debug!(original = uri, canonical = %fake, "remapped unparseable document uri");
        self.mangled.insert(uri.to_string(), fake.clone());
        self.originals.insert(fake.clone(), uri.to_string());
        fake
    }

    /// Canonical identifier for `uri` without allocating a new mapping.
    pub fn lookup(&self, uri: &str) -> Option<String> {
        if let Some(existing) = self.mangled.get(uri) {
            return Some(existing.clone());
        }
        url::Url::parse(uri).ok().map(|_| uri.to_string())
    }

    /// The client-facing URI a canonical identifier stands for.
    pub fn unmangle<'a>(&'a self, canonical: &'a str) -> &'a str {
        self.originals
            .get(canonical)
            .map(String::as_str)
            .unwrap_or(canonical)
    }
}
