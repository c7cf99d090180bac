//! In-memory directory for tests and local development
//!
//! Matches entries by the equality assertions found in the filter: an entry
//! matches when every `(attr=value)` term is satisfied, case-insensitively.
//! Boolean operators are not interpreted.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{
    Directory, DirectoryEntry, SearchScope, ATTR_ACCOUNT, ATTR_DISPLAY_NAME, ATTR_MAIL,
    ATTR_MEMBER_OF,
};
use crate::types::{Result, TravelerError};

#[derive(Debug, Default)]
pub struct StaticDirectory {
    entries: Vec<DirectoryEntry>,
    failure: Option<String>,
    searches: AtomicUsize,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, entry: DirectoryEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Add a user with an account name and display name
    pub fn with_user(self, account: &str, display_name: &str) -> Self {
        self.with_member(account, display_name, &[])
    }

    /// Add a user with `memberOf` DNs
    pub fn with_member(self, account: &str, display_name: &str, member_of: &[&str]) -> Self {
        let mut entry = DirectoryEntry::new()
            .with("objectClass", "user")
            .with(ATTR_ACCOUNT, account)
            .with(ATTR_DISPLAY_NAME, display_name)
            .with(ATTR_MAIL, format!("{}@example.org", account.to_lowercase()));
        for dn in member_of {
            entry = entry.with(ATTR_MEMBER_OF, *dn);
        }
        self.with_entry(entry)
    }

    pub fn with_group(self, id: &str, display_name: &str) -> Self {
        self.with_entry(
            DirectoryEntry::new()
                .with("objectClass", "group")
                .with(ATTR_ACCOUNT, id)
                .with(ATTR_DISPLAY_NAME, display_name),
        )
    }

    /// Fail every search with a directory error
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Number of searches served so far
    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn search(
        &self,
        _base: &str,
        filter: &str,
        attributes: &[String],
        _scope: SearchScope,
    ) -> Result<Vec<DirectoryEntry>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(TravelerError::Directory(message.clone()));
        }

        let terms = equality_terms(filter);
        let matches = self
            .entries
            .iter()
            .filter(|entry| {
                terms.iter().all(|(attr, value)| {
                    entry.all(attr).iter().any(|v| v.eq_ignore_ascii_case(value))
                })
            })
            .map(|entry| project(entry, attributes))
            .collect();
        Ok(matches)
    }
}

fn project(entry: &DirectoryEntry, attributes: &[String]) -> DirectoryEntry {
    if attributes.is_empty() {
        return entry.clone();
    }
    let mut out = DirectoryEntry::new();
    for (attr, values) in entry.attributes() {
        if attributes.iter().any(|a| a == attr) {
            for v in values {
                out = out.with(attr, v.clone());
            }
        }
    }
    out
}

/// Innermost `(attr=value)` terms with escapes decoded
fn equality_terms(filter: &str) -> Vec<(String, String)> {
    let mut terms = Vec::new();
    let mut rest = filter;
    while let Some(open) = rest.find('(') {
        let after = &rest[open + 1..];
        match after.find(['(', ')']) {
            Some(end) if after.as_bytes()[end] == b')' => {
                if let Some((attr, value)) = after[..end].split_once('=') {
                    terms.push((attr.to_string(), unescape(value)));
                }
                rest = &after[end + 1..];
            }
            Some(end) => rest = &after[end..],
            None => break,
        }
    }
    terms
}

fn unescape(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
