//! Byte ranges into the rendered query listing.
//!
//! Queries arrive as trees, not text, so diagnostics point into the
//! pretty-printed form of the preprocessed query (`Explain::source`).

use serde::Serialize;

/// A byte offset range into a rendered listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Span of the first occurrence of `needle` in `listing`, if any.
    pub fn locate(listing: &str, needle: &str) -> Option<Span> {
        if needle.is_empty() {
            return None;
        }
        listing
            .find(needle)
            .map(|start| Span::new(start as u32, (start + needle.len()) as u32))
    }

    /// Like `locate`, falling back to the whole listing.
    pub fn locate_or_all(listing: &str, needle: &str) -> Span {
        Self::locate(listing, needle).unwrap_or(Span::new(0, listing.len() as u32))
    }
}
