//! Document-level access resolution
//!
//! Resolves the access level a requesting principal holds on a shareable
//! document from its ACL block. Rules are evaluated in a fixed order and the
//! first match wins:
//!
//! 1. public write
//! 2. creator of a document with no transferred owner
//! 3. transferred owner
//! 4. explicit user share (its own access level)
//! 5. any group share with write access
//! 6. any group share at all (read)
//! 7. public read
//! 8. no access
//!
//! Group read never masks a group write grant, and public read is only a
//! fallback once every private grant has been checked.

mod principal;

pub use principal::Principal;

use tracing::debug;

use crate::model::{AccessControl, AccessLevel, ShareList, Shareable};
use crate::types::{Result, TravelerError};

/// Resolve the access level of `principal` on a document's ACL
pub fn resolve_access(principal: &Principal, acl: &AccessControl) -> AccessLevel {
    if acl.public_access == AccessLevel::Write {
        return AccessLevel::Write;
    }
    if is_owner(principal, acl) {
        return AccessLevel::Write;
    }
    if let Some(entry) = acl.entry(ShareList::Users, &principal.id) {
        return entry.access;
    }

    let mut group_read = false;
    for group in &principal.groups {
        if let Some(entry) = acl.entry(ShareList::Groups, group) {
            if entry.access == AccessLevel::Write {
                return AccessLevel::Write;
            }
            group_read = true;
        }
    }
    if group_read {
        return AccessLevel::Read;
    }

    if acl.public_access == AccessLevel::Read {
        return AccessLevel::Read;
    }
    AccessLevel::NoAccess
}

pub fn can_write(principal: &Principal, acl: &AccessControl) -> bool {
    resolve_access(principal, acl) == AccessLevel::Write
}

pub fn can_read(principal: &Principal, acl: &AccessControl) -> bool {
    resolve_access(principal, acl) != AccessLevel::NoAccess
}

/// Ownership: the transferred owner, or the creator while no owner is set.
///
/// Public write and shared write grants never confer ownership.
pub fn is_owner(principal: &Principal, acl: &AccessControl) -> bool {
    match acl.owner.as_deref() {
        Some(owner) => owner == principal.id,
        None => acl.created_by == principal.id,
    }
}

fn denied<D: Shareable + ?Sized>(principal: &Principal, doc: &D, what: &str) -> TravelerError {
    debug!(
        user = %principal.id,
        kind = %doc.kind(),
        doc = %doc.id(),
        "{} access denied",
        what
    );
    TravelerError::Unauthorized("you are not authorized to access this resource".into())
}

pub fn require_read<D: Shareable + ?Sized>(principal: &Principal, doc: &D) -> Result<()> {
    if can_read(principal, doc.acl()) {
        Ok(())
    } else {
        Err(denied(principal, doc, "read"))
    }
}

pub fn require_write<D: Shareable + ?Sized>(principal: &Principal, doc: &D) -> Result<()> {
    if can_write(principal, doc.acl()) {
        Ok(())
    } else {
        Err(denied(principal, doc, "write"))
    }
}

pub fn require_owner<D: Shareable + ?Sized>(principal: &Principal, doc: &D) -> Result<()> {
    if is_owner(principal, doc.acl()) {
        Ok(())
    } else {
        Err(denied(principal, doc, "owner"))
    }
}

/// Reject the request unless the document is in one of `allowed` statuses
pub fn require_status<D: Shareable + ?Sized>(doc: &D, allowed: &[f64]) -> Result<()> {
    let status = doc.status_code();
    if allowed.contains(&status) {
        Ok(())
    } else {
        Err(TravelerError::BadRequest(format!(
            "request is not allowed for item {} status {}",
            doc.id(),
            status
        )))
    }
}

/// Reject the request unless the archived flag equals `expected`
pub fn require_archived<D: Shareable + ?Sized>(doc: &D, expected: bool) -> Result<()> {
    let archived = doc.acl().archived;
    if archived == expected {
        Ok(())
    } else {
        Err(TravelerError::BadRequest(format!(
            "request is not allowed for item {} archived {}",
            doc.id(),
            archived
        )))
    }
}

/// Position of an existing share for `identifier`.
///
/// User shares are matched by display name (the name a share request
/// carries), group shares by group id.
pub fn find_share_index(acl: &AccessControl, list: ShareList, identifier: &str) -> Option<usize> {
    match list {
        ShareList::Users => acl.shared_with.iter().position(|e| e.name == identifier),
        ShareList::Groups => acl.shared_group.iter().position(|e| e.id == identifier),
    }
}
