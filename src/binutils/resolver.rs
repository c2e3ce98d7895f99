//! Address-to-source mapping.

use crate::vma::Vma;
use std::collections::BTreeMap;

/// Source attribution for one address, straight from the line table.
///
/// Any field may be absent or empty when the debug info is incomplete; the
/// structure builder applies its own defaulting rules on top.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceInfo {
    /// Name of the enclosing procedure, if recorded.
    pub procedure: Option<String>,
    /// Source file path, if recorded.
    pub file: Option<String>,
    /// 1-based source line; 0 when unknown.
    pub line: u32,
}

impl SourceInfo {
    /// Returns `true` if the line number is valid (nonzero).
    #[must_use]
    pub fn has_line(&self) -> bool {
        self.line != 0
    }
}

/// Maps virtual addresses to source attribution.
///
/// Implemented over the debug line table of a load module; test fixtures use
/// [`MapResolver`] instead.
pub trait SourceResolver {
    /// Returns the source attribution of `vma`.
    fn line_info(&self, vma: Vma) -> SourceInfo;

    /// Returns the minimum and maximum valid line over `[begin, end)`, or
    /// `None` when no address in the range has a valid line.
    fn range_info(&self, begin: Vma, end: Vma) -> Option<(u32, u32)>;
}

/// In-memory [`SourceResolver`] backed by an address-sorted map.
///
/// Each entry covers addresses from its key up to the next key. Intended for
/// tests and for pre-digested line tables.
#[derive(Debug, Default)]
pub struct MapResolver {
    entries: BTreeMap<Vma, SourceInfo>,
}

impl MapResolver {
    /// Creates an empty resolver; every lookup yields a blank [`SourceInfo`].
    #[must_use]
    pub fn new() -> Self {
        MapResolver {
            entries: BTreeMap::new(),
        }
    }

    /// Records attribution for all addresses at or above `vma`, up to the
    /// next recorded entry.
    pub fn insert(&mut self, vma: Vma, info: SourceInfo) {
        self.entries.insert(vma, info);
    }

    /// Convenience for `insert` with all three fields present.
    pub fn insert_full(&mut self, vma: Vma, procedure: &str, file: &str, line: u32) {
        self.insert(
            vma,
            SourceInfo {
                procedure: Some(procedure.to_owned()),
                file: Some(file.to_owned()),
                line,
            },
        );
    }
}

impl SourceResolver for MapResolver {
    fn line_info(&self, vma: Vma) -> SourceInfo {
        self.entries
            .range(..=vma)
            .next_back()
            .map(|(_, info)| info.clone())
            .unwrap_or_default()
    }

    fn range_info(&self, begin: Vma, end: Vma) -> Option<(u32, u32)> {
        if begin >= end {
            return None;
        }
        // Entries strictly inside the range, plus the one covering `begin`.
        let mut lo = u32::MAX;
        let mut hi = 0u32;
        let covering = self.line_info(begin);
        if covering.has_line() {
            lo = lo.min(covering.line);
            hi = hi.max(covering.line);
        }
        for (_, info) in self.entries.range(begin..end) {
            if info.has_line() {
                lo = lo.min(info.line);
                hi = hi.max(info.line);
            }
        }
        (hi != 0).then_some((lo, hi))
    }
}
