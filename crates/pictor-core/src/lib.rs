#![forbid(unsafe_code)]

//! Vector-graphics document model and geometry engine (headless).
//!
//! Design goals:
//! - a plain markup tree with an explicitly owned parent index (see `pictor-dom`)
//! - pure, recomputed-per-call geometry queries
//! - lossless round-trips for the supported element subset

pub mod codec;
pub mod config;
pub mod defrefs;
pub mod error;
pub mod geom;
pub mod hit;
pub mod marker;
pub mod path;
pub mod schema;
pub mod segment;
pub mod session;
pub mod shape;
pub mod transform;
pub mod units;

pub use codec::{Decoded, EncodeOptions, Envelope};
pub use config::{EngineConfig, SvgVersion};
pub use defrefs::{DefRef, Defrefs};
pub use error::{Error, Result};
pub use marker::{MarkerSlot, MarkerType};
pub use path::{PathCommand, PathCommandList};
pub use pictor_dom::{AttrValue, Content, Document, NodeId};
pub use segment::{FillRule, SegList, Segment};
pub use session::{ImportReport, ImportSession};
pub use shape::{Geometry, ShapeKind};
pub use units::Resolver;

/// Entry point bundling a configuration with the decode / query / encode operations.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Decodes text, unwrapping the storage envelope first.
    pub fn decode(&self, data: &[u8], envelope: Envelope) -> Result<Decoded> {
        let text = codec::unpack(data, envelope)?;
        codec::decode(&text, &self.config)
    }

    pub fn decode_str(&self, text: &str) -> Result<Decoded> {
        codec::decode(text, &self.config)
    }

    /// Runs the compatibility pass for the configured version, then serializes `root`.
    pub fn encode(
        &self,
        doc: &mut Document,
        root: NodeId,
        opts: &EncodeOptions,
        envelope: Envelope,
    ) -> Result<Vec<u8>> {
        if !doc.contains(root) {
            return Err(Error::UnknownNode { node: root });
        }
        codec::apply_compat(doc, root, self.config.target_version);
        codec::pack(&codec::encode(doc, root, opts), envelope)
    }

    pub fn geometry<'a>(&'a self, doc: &'a Document) -> Geometry<'a> {
        Geometry::new(doc, &self.config)
    }

    pub fn resolver<'a>(&'a self, doc: &'a Document) -> Resolver<'a> {
        Resolver::new(doc, &self.config)
    }

    /// Rebuilds the definition registry of a decoded document: the first `<defs>` child of the
    /// root is the container (created when missing), the rest of the tree is scanned for
    /// references.
    pub fn defrefs(&self, doc: &mut Document, root: NodeId) -> Defrefs {
        let defs = match doc.children(root).into_iter().find(|c| doc.tag(*c) == Some("defs")) {
            Some(d) => d,
            None => {
                let d = doc.create_element("defs", pictor_dom::attrs! {}, vec![], None);
                match doc.first_child(root) {
                    Some(first) => doc.insert_before(first, d),
                    None => doc.append_child(root, d),
                };
                d
            }
        };
        Defrefs::rebuild_from_tree(doc, defs, root, true, &self.config.defref_prefix)
    }
}

#[cfg(test)]
mod tests;
