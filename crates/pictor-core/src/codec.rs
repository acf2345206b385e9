//! Text ⇄ tree conversion, version compatibility fixups and the storage envelope.

use crate::config::{EngineConfig, SvgVersion};
use crate::path::parse_path_data;
use crate::session::{ImportReport, ImportSession};
use crate::{Error, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use pictor_dom::{Content, Document, NodeId, attrs};
use std::io::{Read, Write};

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Elements kept on import. Everything else is dropped and reported.
pub const SUPPORTED_ELEMENTS: &[&str] = &[
    "svg", "g", "defs", "marker", "rect", "circle", "ellipse", "path", "text", "tspan", "image",
    "title", "desc",
];

/// Elements whose character data is rendered; indentation is never added inside them.
const TEXT_BEARING: &[&str] = &["text", "tspan", "title", "desc"];

/// A decoded document with the comments found around its root element.
#[derive(Debug)]
pub struct Decoded {
    pub doc: Document,
    pub root: NodeId,
    pub pre_comments: Vec<String>,
    pub post_comments: Vec<String>,
    pub report: ImportReport,
}

impl Decoded {
    /// Serializes the root and merges the surrounding comments back in.
    pub fn encode(&self, opts: &EncodeOptions) -> String {
        let body = encode(&self.doc, self.root, opts);
        merge_comments(&self.pre_comments, &body, &self.post_comments)
    }
}

/// Parses markup into a fresh document and applies the compatibility pass for
/// `config.target_version`.
pub fn decode(text: &str, config: &EngineConfig) -> Result<Decoded> {
    let opts = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let xml = roxmltree::Document::parse_with_options(text, opts)?;
    let mut doc = Document::with_internal_prefix(config.internal_attr_prefix.clone());
    let mut session = ImportSession::new();

    let mut pre_comments = Vec::new();
    let mut post_comments = Vec::new();
    let mut root = None;
    for node in xml.root().children() {
        if node.is_element() {
            root = build(&mut doc, &mut session, node, None);
        } else if let Some(c) = node.is_comment().then(|| node.text()).flatten() {
            if root.is_none() {
                pre_comments.push(c.to_string());
            } else {
                post_comments.push(c.to_string());
            }
        }
    }
    let root = root.ok_or(Error::MissingRoot)?;
    apply_compat(&mut doc, root, config.target_version);
    let report = session.finish();
    Ok(Decoded {
        doc,
        root,
        pre_comments,
        post_comments,
        report,
    })
}

fn attr_name(attr: &roxmltree::Attribute<'_, '_>) -> Option<String> {
    match attr.namespace() {
        None => Some(attr.name().to_string()),
        Some(XLINK_NS) if attr.name() == "href" => Some("href".to_string()),
        Some(XML_NS) => Some(format!("xml:{}", attr.name())),
        Some(_) => None,
    }
}

fn build(
    doc: &mut Document,
    session: &mut ImportSession,
    node: roxmltree::Node<'_, '_>,
    parent: Option<NodeId>,
) -> Option<NodeId> {
    let tag = node.tag_name();
    let supported = matches!(tag.namespace(), None | Some(SVG_NS))
        && SUPPORTED_ELEMENTS.contains(&tag.name());
    if !supported {
        session.unsupported_element(tag.name());
        return None;
    }
    let name = tag.name();

    let mut attributes = attrs! {};
    for a in node.attributes() {
        let Some(attr) = attr_name(&a) else {
            session.unsupported_attribute(name, a.name());
            continue;
        };
        if name == "path" && attr == "d" {
            if let Err(err) = parse_path_data(a.value()) {
                tracing::warn!(%err, "dropping malformed path data");
                session.invalid_path_data(&err);
                continue;
            }
        }
        attributes.insert(attr, a.value().into());
    }

    let id = doc.create_element(name, attributes, vec![], parent);
    let keep_whitespace = TEXT_BEARING.contains(&name);
    for child in node.children() {
        if child.is_element() {
            build(doc, session, child, Some(id));
        } else if child.is_text() {
            let text = child.text().unwrap_or_default();
            if keep_whitespace || !text.trim().is_empty() {
                doc.push_text(id, text);
            }
        } else if child.is_comment() {
            doc.push_comment(id, child.text().unwrap_or_default());
        }
    }
    Some(id)
}

/// Version-dependent fixups over the whole subtree of `root`.
///
/// SVG 1.1 wants `version`, the xlink namespace declaration and `xlink:href`; SVG 2 uses a
/// plain `href` and no xlink namespace. The default namespace is always declared.
pub fn apply_compat(doc: &mut Document, root: NodeId, version: SvgVersion) {
    if doc.attr(root, "xmlns").is_none() {
        doc.set_attr(root, "xmlns", SVG_NS);
    }
    let (from, to) = if version.uses_xlink() {
        if doc.attr(root, "version").is_none() {
            doc.set_attr(root, "version", "1.1");
        }
        if doc.attr(root, "xmlns:xlink").is_none() {
            doc.set_attr(root, "xmlns:xlink", XLINK_NS);
        }
        ("href", "xlink:href")
    } else {
        doc.remove_attr(root, "version");
        doc.remove_attr(root, "xmlns:xlink");
        ("xlink:href", "href")
    };
    for n in doc.descendants(root) {
        doc.rename_attr(n, from, to);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Envelope {
    pub base64: bool,
    pub gzip: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeOptions {
    /// Spaces per nesting level; `None` writes everything on one line.
    pub indent: Option<usize>,
    /// Keep attributes using the internal prefix.
    pub keep_internal: bool,
}

/// Minimal escaping: only `"`, `&` and `<`.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Serializes the subtree at `root`, dropping internal attributes unless asked not to.
pub fn encode(doc: &Document, root: NodeId, opts: &EncodeOptions) -> String {
    let keep = opts.keep_internal;
    encode_with_filter(doc, root, opts.indent, &|name: &str| keep || !doc.is_internal_attr(name))
}

/// Serializes the subtree at `root`, writing only attributes accepted by `filter`.
pub fn encode_with_filter(
    doc: &Document,
    root: NodeId,
    indent: Option<usize>,
    filter: &dyn Fn(&str) -> bool,
) -> String {
    let mut out = String::new();
    let w = Writer {
        doc,
        indent,
        filter,
    };
    w.element(root, 0, false, &mut out);
    out
}

struct Writer<'a> {
    doc: &'a Document,
    indent: Option<usize>,
    filter: &'a dyn Fn(&str) -> bool,
}

impl Writer<'_> {
    fn newline(&self, depth: usize, out: &mut String) {
        if let Some(n) = self.indent {
            out.push('\n');
            out.push_str(&" ".repeat(n * depth));
        }
    }

    fn element(&self, id: NodeId, depth: usize, in_text: bool, out: &mut String) {
        let Some(el) = self.doc.element(id) else {
            return;
        };
        out.push('<');
        out.push_str(el.tag());
        for (name, value) in el.attrs() {
            if !(self.filter)(name.as_str()) {
                continue;
            }
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape(&value.to_text()));
            out.push('"');
        }
        if el.contents().is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        let in_text = in_text || TEXT_BEARING.contains(&el.tag());
        let pretty = !in_text && self.indent.is_some();
        for c in el.contents() {
            match c {
                Content::Element(child) => {
                    if pretty {
                        self.newline(depth + 1, out);
                    }
                    self.element(*child, depth + 1, in_text, out);
                }
                Content::Text(t) => {
                    if pretty {
                        self.newline(depth + 1, out);
                        out.push_str(&escape(t.trim()));
                    } else {
                        out.push_str(&escape(t));
                    }
                }
                Content::Comment(t) => {
                    if pretty {
                        self.newline(depth + 1, out);
                    }
                    out.push_str("<!--");
                    out.push_str(t);
                    out.push_str("-->");
                }
            }
        }
        if pretty {
            self.newline(depth, out);
        }
        out.push_str("</");
        out.push_str(el.tag());
        out.push('>');
    }
}

/// Puts stray comments back around a serialized root element.
pub fn merge_comments(pre: &[String], body: &str, post: &[String]) -> String {
    let mut out = String::new();
    for c in pre {
        out.push_str(&format!("<!--{c}-->\n"));
    }
    out.push_str(body);
    for c in post {
        out.push_str(&format!("\n<!--{c}-->"));
    }
    out
}

/// Wraps serialized text: gzip first, then base64.
pub fn pack(text: &str, envelope: Envelope) -> Result<Vec<u8>> {
    let mut bytes = text.as_bytes().to_vec();
    if envelope.gzip {
        let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(&bytes)?;
        bytes = enc.finish()?;
    }
    if envelope.base64 {
        bytes = STANDARD.encode(&bytes).into_bytes();
    }
    Ok(bytes)
}

/// Reverses [`pack`].
pub fn unpack(data: &[u8], envelope: Envelope) -> Result<String> {
    let mut bytes = data.to_vec();
    if envelope.base64 {
        bytes = STANDARD.decode(bytes.trim_ascii())?;
    }
    if envelope.gzip {
        let mut dec = flate2::read::GzDecoder::new(&bytes[..]);
        let mut out = Vec::new();
        dec.read_to_end(&mut out)?;
        bytes = out;
    }
    Ok(String::from_utf8(bytes)?)
}
