//! Directory service collaborator
//!
//! The directory (Active Directory over LDAP in production) is the canonical
//! source of user and group identity. This module defines the search seam
//! and the single-entry lookups the engine performs on top of it: every
//! lookup expects exactly one entry, and zero or several matches are
//! distinct terminal errors.

mod memory;

pub use memory::StaticDirectory;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::model::{GroupDoc, UserDoc};
use crate::types::{Result, TravelerError};

/// Account id attribute; its lower-cased value is the principal id
pub const ATTR_ACCOUNT: &str = "sAMAccountName";
pub const ATTR_DISPLAY_NAME: &str = "displayName";
pub const ATTR_MAIL: &str = "mail";
pub const ATTR_OFFICE: &str = "physicalDeliveryOfficeName";
pub const ATTR_PHONE: &str = "telephoneNumber";
pub const ATTR_MOBILE: &str = "mobile";
pub const ATTR_MEMBER_OF: &str = "memberOf";

/// LDAP search scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    Base,
    One,
    Sub,
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchScope::Base => write!(f, "base"),
            SearchScope::One => write!(f, "one"),
            SearchScope::Sub => write!(f, "sub"),
        }
    }
}

/// One search result: attribute name to values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    attributes: BTreeMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to an attribute
    pub fn with(mut self, attr: &str, value: impl Into<String>) -> Self {
        self.attributes
            .entry(attr.to_string())
            .or_default()
            .push(value.into());
        self
    }

    /// First value of an attribute
    pub fn first(&self, attr: &str) -> Option<&str> {
        self.attributes
            .get(attr)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// All values of an attribute, empty if absent
    pub fn all(&self, attr: &str) -> &[String] {
        self.attributes.get(attr).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.attributes.iter()
    }

    /// Lower-cased account name
    pub fn account_id(&self) -> Option<String> {
        self.first(ATTR_ACCOUNT).map(str::to_lowercase)
    }

    pub fn display_name(&self) -> Option<&str> {
        self.first(ATTR_DISPLAY_NAME)
    }

    /// Local user record for this entry
    pub fn to_user(&self) -> Result<UserDoc> {
        let id = self.account_id().ok_or_else(|| {
            TravelerError::Directory(format!("entry has no {} attribute", ATTR_ACCOUNT))
        })?;
        let mut user = UserDoc::new(id, self.display_name().unwrap_or_default());
        user.email = self.first(ATTR_MAIL).map(String::from);
        user.office = self.first(ATTR_OFFICE).map(String::from);
        user.phone = self.first(ATTR_PHONE).map(String::from);
        user.mobile = self.first(ATTR_MOBILE).map(String::from);
        Ok(user)
    }

    /// Local group record for this entry
    pub fn to_group(&self) -> Result<GroupDoc> {
        let id = self.account_id().ok_or_else(|| {
            TravelerError::Directory(format!("entry has no {} attribute", ATTR_ACCOUNT))
        })?;
        let mut group = GroupDoc::new(id, self.display_name().unwrap_or_default());
        group.email = self.first(ATTR_MAIL).map(String::from);
        Ok(group)
    }
}

/// Directory search seam
#[async_trait]
pub trait Directory: Send + Sync {
    /// Search `base` with an LDAP filter, returning the requested attributes
    async fn search(
        &self,
        base: &str,
        filter: &str,
        attributes: &[String],
        scope: SearchScope,
    ) -> Result<Vec<DirectoryEntry>>;
}

/// Search bases, filter templates and attribute lists
///
/// Filter templates carry an `_id` or `_name` placeholder that is replaced
/// by the escaped lookup value.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub search_base: String,
    pub search_filter: String,
    pub name_filter: String,
    pub obj_attributes: Vec<String>,
    pub member_attributes: Vec<String>,
    pub group_search_base: String,
    pub group_search_filter: String,
    pub group_attributes: Vec<String>,
    /// Only memberships whose common name starts with this prefix count
    pub group_prefix: String,
    /// Extra group granted to members of a group
    pub group_aliases: BTreeMap<String, String>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        let attrs = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            search_base: String::new(),
            search_filter: "(&(objectClass=user)(sAMAccountName=_id))".into(),
            name_filter: "(&(objectClass=user)(displayName=_name))".into(),
            obj_attributes: attrs(&[
                ATTR_ACCOUNT,
                ATTR_DISPLAY_NAME,
                ATTR_MAIL,
                ATTR_OFFICE,
                ATTR_PHONE,
                ATTR_MOBILE,
            ]),
            member_attributes: attrs(&[
                ATTR_ACCOUNT,
                ATTR_DISPLAY_NAME,
                ATTR_MAIL,
                ATTR_OFFICE,
                ATTR_PHONE,
                ATTR_MOBILE,
                ATTR_MEMBER_OF,
            ]),
            group_search_base: String::new(),
            group_search_filter: "(&(objectClass=group)(sAMAccountName=_id))".into(),
            group_attributes: attrs(&[ATTR_ACCOUNT, ATTR_DISPLAY_NAME, ATTR_MAIL]),
            group_prefix: "lab.frib".into(),
            group_aliases: BTreeMap::new(),
        }
    }
}

/// Escape a value for use inside an LDAP filter (RFC 4515)
pub fn escape_filter_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '*' => out.push_str("\\2a"),
            '(' => out.push_str("\\28"),
            ')' => out.push_str("\\29"),
            '\\' => out.push_str("\\5c"),
            '\0' => out.push_str("\\00"),
            _ => out.push(c),
        }
    }
    out
}

/// Single-entry lookups against the directory
#[derive(Clone)]
pub struct DirectoryLookup {
    config: Arc<DirectoryConfig>,
    client: Arc<dyn Directory>,
}

impl DirectoryLookup {
    pub fn new(config: DirectoryConfig, client: Arc<dyn Directory>) -> Self {
        Self {
            config: Arc::new(config),
            client,
        }
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Resolve a user by display name (share targets, ownership transfer)
    pub async fn user_by_name(&self, name: &str) -> Result<DirectoryEntry> {
        let filter = self
            .config
            .name_filter
            .replace("_name", &escape_filter_value(name));
        self.search_one(
            name,
            &self.config.search_base,
            &filter,
            &self.config.obj_attributes,
        )
        .await
    }

    /// Resolve a user by account id, including memberships (login)
    pub async fn user_by_id(&self, id: &str) -> Result<DirectoryEntry> {
        let filter = self
            .config
            .search_filter
            .replace("_id", &escape_filter_value(id));
        self.search_one(
            id,
            &self.config.search_base,
            &filter,
            &self.config.member_attributes,
        )
        .await
    }

    /// Resolve a group by id
    pub async fn group_by_id(&self, id: &str) -> Result<DirectoryEntry> {
        let filter = self
            .config
            .group_search_filter
            .replace("_id", &escape_filter_value(id));
        self.search_one(
            id,
            &self.config.group_search_base,
            &filter,
            &self.config.group_attributes,
        )
        .await
    }

    async fn search_one(
        &self,
        label: &str,
        base: &str,
        filter: &str,
        attributes: &[String],
    ) -> Result<DirectoryEntry> {
        debug!(base = %base, filter = %filter, "directory search");
        let mut entries = self
            .client
            .search(base, filter, attributes, SearchScope::Sub)
            .await
            .map_err(|e| {
                warn!(filter = %filter, error = %e, "directory search failed");
                match e {
                    TravelerError::Directory(_) => e,
                    other => TravelerError::Directory(other.to_string()),
                }
            })?;

        match entries.len() {
            0 => Err(TravelerError::NotFound(format!("{} in directory", label))),
            1 => Ok(entries.remove(0)),
            n => {
                debug!(label = %label, matches = n, "ambiguous directory lookup");
                Err(TravelerError::Ambiguous(label.to_string()))
            }
        }
    }
}
