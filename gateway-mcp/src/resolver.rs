//! Resource resolution
//!
//! Maps a caller's loose reference (`"#general"`, `"general"`,
//! `"C0123456789"`) to a canonical identifier. Identifier-shaped references
//! are returned untouched; anything else is looked up by walking a
//! cursor-paginated directory listing until an exact name match.

use crate::error::{GatewayError, GatewayResult};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Entries requested per listing page.
pub const PAGE_SIZE: u32 = 200;

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Entries on this page.
    pub items: Vec<T>,
    /// Cursor for the next page; `None` once the chain is exhausted.
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Build a page, treating an empty cursor as the end of the chain.
    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        Self {
            items,
            next_cursor: next_cursor.filter(|cursor| !cursor.is_empty()),
        }
    }

    /// Convert the entries, keeping the cursor.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }
}

/// A listable resource: canonical id plus display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Canonical identifier.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// A cursor-paginated listing the resolver can search.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Human label for the listed resource kind (e.g. "Channel").
    fn kind(&self) -> &'static str;

    /// Fetch one page, starting after `cursor`.
    async fn list_page(
        &self,
        cursor: Option<&str>,
        limit: u32,
    ) -> GatewayResult<Page<DirectoryEntry>>;
}

/// What a canonical identifier looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdShape {
    /// Allowed first characters.
    pub prefixes: &'static [char],
    /// Minimum total length.
    pub min_len: usize,
}

/// Slack conversation ids: `C…` (channel), `G…` (private group), `D…` (DM).
pub const CHANNEL_ID_SHAPE: IdShape = IdShape {
    prefixes: &['C', 'G', 'D'],
    min_len: 9,
};

impl IdShape {
    /// Whether `reference` already has the canonical shape.
    pub fn matches(&self, reference: &str) -> bool {
        reference.len() >= self.min_len
            && reference
                .chars()
                .next()
                .map(|first| self.prefixes.contains(&first))
                .unwrap_or(false)
    }
}

/// Resolves loose references against a [`Directory`].
pub struct Resolver<'a, D: Directory + ?Sized> {
    directory: &'a D,
    shape: IdShape,
}

impl<'a, D: Directory + ?Sized> Resolver<'a, D> {
    /// Create a resolver for ids of the given shape.
    pub fn new(directory: &'a D, shape: IdShape) -> Self {
        Self { directory, shape }
    }

    /// Resolve a loose reference to a canonical id.
    ///
    /// Walks every page of the listing before giving up with `NotFound`.
    #[instrument(skip(self))]
    pub async fn resolve(&self, reference: &str) -> GatewayResult<String> {
        if self.shape.matches(reference) {
            return Ok(reference.to_string());
        }

        let target = reference.trim_start_matches('#');
        let mut cursor: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let page = self
                .directory
                .list_page(cursor.as_deref(), PAGE_SIZE)
                .await?;
            pages += 1;

            if let Some(entry) = page.items.into_iter().find(|entry| entry.name == target) {
                debug!(id = %entry.id, pages, "Resolved by name");
                return Ok(entry.id);
            }

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!(pages, "Listing exhausted without a match");
        Err(GatewayError::NotFound {
            kind: self.directory.kind(),
            reference: reference.to_string(),
        })
    }
}
