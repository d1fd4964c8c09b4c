//! Ordered position indexes.
//!
//! A [`PositionIndex`] maps the ranges of one document to facts, ordered by
//! the total order on [`SourcePosition`]. There is no interval tree: the
//! nearest enclosing range is found by walking the sorted map backwards from
//! the query's start.

use std::collections::{BTreeMap, HashMap};

use crate::position::SourcePosition;

/// Sorted map from the ranges of a single document to facts.
#[derive(Debug, Clone)]
pub struct PositionIndex<F> {
    entries: BTreeMap<SourcePosition, F>,
}

impl<F> Default for PositionIndex<F> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<F> PositionIndex<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fact, replacing any fact recorded for the same range.
    pub fn put(&mut self, position: SourcePosition, fact: F) -> Option<F> {
        self.entries.insert(position, fact)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most specific recorded range that encloses `query`.
    ///
    /// Candidates are visited from the floor of the query's start downwards.
    /// Ranges that end before the query are stepped over; the first enclosing
    /// range wins, narrowed to the shortest range sharing its start. Among
    /// overlapping (non-nested) ranges the one starting last is preferred.
    pub fn nearest_enclosing(&self, query: &SourcePosition) -> Option<&SourcePosition> {
        let ceiling = SourcePosition::new(
            String::new(),
            query.first_line,
            query.first_col,
            u32::MAX,
            u32::MAX,
        );
        let mut walk = self.entries.range(..=ceiling).rev().map(|(position, _)| position);

        let mut best = walk.by_ref().find(|candidate| candidate.encloses(query))?;
        for candidate in walk {
            let same_start = candidate.first_line == best.first_line
                && candidate.first_col == best.first_col;
            if !same_start || !candidate.encloses(query) {
                break;
            }
            best = candidate;
        }
        Some(best)
    }

    /// Fact stored at the nearest enclosing range, with that range.
    pub fn lookup(&self, query: &SourcePosition) -> Option<(&SourcePosition, &F)> {
        let key = self.nearest_enclosing(query)?;
        self.entries.get_key_value(key)
    }
}

/// Per-URL collection of [`PositionIndex`]es.
#[derive(Debug, Clone)]
pub struct FactIndex<F> {
    by_url: HashMap<String, PositionIndex<F>>,
}

impl<F> Default for FactIndex<F> {
    fn default() -> Self {
        Self {
            by_url: HashMap::new(),
        }
    }
}

impl<F> FactIndex<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `fact` in the index of the position's URL.
    pub fn put(&mut self, position: SourcePosition, fact: F) -> Option<F> {
        self.by_url
            .entry(position.url.clone())
            .or_default()
            .put(position, fact)
    }

    pub fn nearest_enclosing(&self, query: &SourcePosition) -> Option<&SourcePosition> {
        self.by_url.get(&query.url)?.nearest_enclosing(query)
    }

    pub fn lookup(&self, query: &SourcePosition) -> Option<(&SourcePosition, &F)> {
        self.by_url.get(&query.url)?.lookup(query)
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.by_url.get(url).is_some_and(|index| !index.is_empty())
    }

    pub fn len(&self) -> usize {
        self.by_url.values().map(PositionIndex::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_url.values().all(PositionIndex::is_empty)
    }
}
