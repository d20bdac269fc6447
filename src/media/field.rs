use std::collections::HashSet;

use super::{AcceptPolicy, StagedFile};

/// One media collection (images or videos) being edited.
///
/// `existing` keeps its order unless explicitly reordered; removal only toggles membership in
/// `removed`, so an "Undo" restores the item in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaField {
    existing: Vec<String>,
    removed: HashSet<String>,
    new_files: Vec<StagedFile>,
}

impl MediaField {
    /// Seed with server-hosted URLs. Duplicate URLs are collapsed to their first position.
    pub fn with_existing(urls: impl IntoIterator<Item = String>) -> Self {
        let mut seen = HashSet::new();
        let existing = urls
            .into_iter()
            .filter(|u| !u.is_empty() && seen.insert(u.clone()))
            .collect();
        Self {
            existing,
            ..Default::default()
        }
    }

    pub fn existing(&self) -> &[String] {
        &self.existing
    }

    pub fn new_files(&self) -> &[StagedFile] {
        &self.new_files
    }

    pub fn is_removed(&self, url: &str) -> bool {
        self.removed.contains(url)
    }

    /// URLs marked for deletion, in display order.
    pub fn removed(&self) -> Vec<&str> {
        self.existing
            .iter()
            .filter(|u| self.removed.contains(u.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Existing URLs that survive, in their final order.
    pub fn kept(&self) -> Vec<&str> {
        self.existing
            .iter()
            .filter(|u| !self.removed.contains(u.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Kept existing items plus staged files.
    pub fn surviving_count(&self) -> usize {
        self.existing.len() - self.removed.len() + self.new_files.len()
    }

    /// Stage the files `policy` accepts and hand back the rest.
    pub(crate) fn add(
        &mut self,
        files: impl IntoIterator<Item = StagedFile>,
        policy: AcceptPolicy,
    ) -> (usize, Vec<StagedFile>) {
        let mut accepted = 0;
        let mut rejected = Vec::new();
        for file in files {
            if policy.accepts(&file.mime_type) {
                self.new_files.push(file);
                accepted += 1;
            } else {
                rejected.push(file);
            }
        }
        (accepted, rejected)
    }

    pub(crate) fn remove_new(&mut self, index: usize) -> Option<StagedFile> {
        (index < self.new_files.len()).then(|| self.new_files.remove(index))
    }

    pub(crate) fn clear_new(&mut self) {
        self.new_files.clear();
    }

    /// Flip the removal mark on an existing URL. Returns whether it is now marked; URLs the
    /// field does not hold are ignored.
    pub(crate) fn toggle_removed(&mut self, url: &str) -> bool {
        if !self.existing.iter().any(|u| u == url) {
            return false;
        }
        if self.removed.remove(url) {
            false
        } else {
            self.removed.insert(url.to_string());
            true
        }
    }

    /// Move the existing item at `from` to `to`. Returns false (and changes nothing) when the
    /// indices are equal or out of range.
    pub(crate) fn reorder(&mut self, from: usize, to: usize) -> bool {
        let len = self.existing.len();
        if from == to || from >= len || to >= len {
            return false;
        }
        let moved = self.existing.remove(from);
        self.existing.insert(to, moved);
        true
    }
}
