#![forbid(unsafe_code)]

//! Markup tree container used by `pictor`.
//!
//! Elements live in an arena owned by [`Document`] and are addressed by [`NodeId`]. The element
//! itself only knows its children; the parent relation is kept in a separate side-table that every
//! structural mutation maintains, so serializable attributes never carry bookkeeping.

mod document;
mod value;

pub use document::{Content, Document, Element};
pub use value::{AttrValue, Attributes, format_number};

/// Handle to an element stored in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Attribute-name prefix reserved for engine bookkeeping. Attributes using it are dropped by
/// [`Document::deep_copy`] and by the default serializer filter.
pub const DEFAULT_INTERNAL_ATTR_PREFIX: &str = "data-pictor-";
