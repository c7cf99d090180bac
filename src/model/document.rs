//! Tagged union over the three shareable document kinds

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::acl::AccessControl;
use super::binder::{Binder, BINDER_COLLECTION};
use super::form::{Form, FORM_COLLECTION};
use super::traveler::{Traveler, TRAVELER_COLLECTION};

/// Kind of shareable document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocKind {
    Form,
    Traveler,
    Binder,
}

impl DocKind {
    pub const ALL: [DocKind; 3] = [DocKind::Form, DocKind::Traveler, DocKind::Binder];

    /// Collection holding documents of this kind
    pub fn collection(self) -> &'static str {
        match self {
            DocKind::Form => FORM_COLLECTION,
            DocKind::Traveler => TRAVELER_COLLECTION,
            DocKind::Binder => BINDER_COLLECTION,
        }
    }

    /// Field on a user or group record that lists documents of this kind
    pub fn backref_field(self) -> &'static str {
        match self {
            DocKind::Form => "forms",
            DocKind::Traveler => "travelers",
            DocKind::Binder => "binders",
        }
    }
}

impl fmt::Display for DocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocKind::Form => write!(f, "form"),
            DocKind::Traveler => write!(f, "traveler"),
            DocKind::Binder => write!(f, "binder"),
        }
    }
}

/// Common view over anything with an ACL and share lists
pub trait Shareable {
    fn kind(&self) -> DocKind;
    fn id(&self) -> ObjectId;
    fn acl(&self) -> &AccessControl;
    /// Raw status code
    fn status_code(&self) -> f64;
}

impl Shareable for Form {
    fn kind(&self) -> DocKind {
        DocKind::Form
    }
    fn id(&self) -> ObjectId {
        self.id
    }
    fn acl(&self) -> &AccessControl {
        &self.acl
    }
    fn status_code(&self) -> f64 {
        self.status.code()
    }
}

impl Shareable for Traveler {
    fn kind(&self) -> DocKind {
        DocKind::Traveler
    }
    fn id(&self) -> ObjectId {
        self.id
    }
    fn acl(&self) -> &AccessControl {
        &self.acl
    }
    fn status_code(&self) -> f64 {
        self.status.code()
    }
}

impl Shareable for Binder {
    fn kind(&self) -> DocKind {
        DocKind::Binder
    }
    fn id(&self) -> ObjectId {
        self.id
    }
    fn acl(&self) -> &AccessControl {
        &self.acl
    }
    fn status_code(&self) -> f64 {
        self.status.code()
    }
}

impl Shareable for Document {
    fn kind(&self) -> DocKind {
        Document::kind(self)
    }
    fn id(&self) -> ObjectId {
        Document::id(self)
    }
    fn acl(&self) -> &AccessControl {
        Document::acl(self)
    }
    fn status_code(&self) -> f64 {
        Document::status_code(self)
    }
}

/// A form, traveler or binder: anything with an ACL and share lists
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Form(Form),
    Traveler(Traveler),
    Binder(Binder),
}

impl Document {
    pub fn kind(&self) -> DocKind {
        match self {
            Document::Form(_) => DocKind::Form,
            Document::Traveler(_) => DocKind::Traveler,
            Document::Binder(_) => DocKind::Binder,
        }
    }

    pub fn id(&self) -> ObjectId {
        match self {
            Document::Form(f) => f.id,
            Document::Traveler(t) => t.id,
            Document::Binder(b) => b.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Document::Form(f) => &f.title,
            Document::Traveler(t) => &t.title,
            Document::Binder(b) => &b.title,
        }
    }

    pub fn acl(&self) -> &AccessControl {
        match self {
            Document::Form(f) => &f.acl,
            Document::Traveler(t) => &t.acl,
            Document::Binder(b) => &b.acl,
        }
    }

    pub fn acl_mut(&mut self) -> &mut AccessControl {
        match self {
            Document::Form(f) => &mut f.acl,
            Document::Traveler(t) => &mut t.acl,
            Document::Binder(b) => &mut b.acl,
        }
    }

    /// Raw status code, whatever the document kind
    pub fn status_code(&self) -> f64 {
        match self {
            Document::Form(f) => f.status.code(),
            Document::Traveler(t) => t.status.code(),
            Document::Binder(b) => b.status.code(),
        }
    }

    pub fn as_binder(&self) -> Option<&Binder> {
        match self {
            Document::Binder(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_traveler(&self) -> Option<&Traveler> {
        match self {
            Document::Traveler(t) => Some(t),
            _ => None,
        }
    }

    pub fn into_binder(self) -> Option<Binder> {
        match self {
            Document::Binder(b) => Some(b),
            _ => None,
        }
    }

    pub fn into_traveler(self) -> Option<Traveler> {
        match self {
            Document::Traveler(t) => Some(t),
            _ => None,
        }
    }

    pub fn into_form(self) -> Option<Form> {
        match self {
            Document::Form(f) => Some(f),
            _ => None,
        }
    }
}

impl From<Form> for Document {
    fn from(form: Form) -> Self {
        Document::Form(form)
    }
}

impl From<Traveler> for Document {
    fn from(traveler: Traveler) -> Self {
        Document::Traveler(traveler)
    }
}

impl From<Binder> for Document {
    fn from(binder: Binder) -> Self {
        Document::Binder(binder)
    }
}
