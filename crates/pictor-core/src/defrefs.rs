//! Shared definition elements with reference counting.
//!
//! Engine-managed definitions carry ids of the form `<prefix>-<n>-<value>` and are referenced
//! from presentation attributes as `url(#<prefix>-<n>-<value>)`. Anything else in the
//! definitions container is user-authored and never touched.

use pictor_dom::{Document, NodeId};
use regex::Regex;

/// One shared definition and the elements that reference it.
#[derive(Debug, Clone, PartialEq)]
pub struct DefRef {
    pub def: NodeId,
    pub id: u32,
    /// Property value token embedded in the generated id.
    pub value: String,
    pub referrers: Vec<NodeId>,
}

/// Registry bound to one definitions container (usually `<defs>`).
#[derive(Debug, Clone)]
pub struct Defrefs {
    container: NodeId,
    prefix: String,
    refs: Vec<DefRef>,
    id_re: Regex,
    url_re: Regex,
}

/// Reduces a property value to characters that are safe inside an id and a `url(#...)`.
pub fn value_token(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl Defrefs {
    pub fn new(container: NodeId, prefix: &str) -> Self {
        let p = regex::escape(prefix);
        // Both patterns are built from an escaped literal, so they always compile.
        let id_re = Regex::new(&format!(r"^{p}-(\d+)-([A-Za-z0-9_-]*)$")).expect("valid regex");
        let url_re = Regex::new(&format!(r"url\(\s*#{p}-(\d+)-([A-Za-z0-9_-]*)\s*\)"))
            .expect("valid regex");
        Self {
            container,
            prefix: prefix.to_string(),
            refs: Vec::new(),
            id_re,
            url_re,
        }
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn refs(&self) -> &[DefRef] {
        &self.refs
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn element_id(&self, id: u32, value: &str) -> String {
        format!("{}-{}-{}", self.prefix, id, value)
    }

    pub fn url(&self, r: &DefRef) -> String {
        format!("url(#{})", self.element_id(r.id, &r.value))
    }

    /// Whether `text` contains an engine-generated reference.
    pub fn is_generated_url(&self, text: &str) -> bool {
        self.url_re.is_match(text)
    }

    /// Extracts `(id, value)` from a generated URL, `#id` fragment or bare element id.
    pub fn parse_key(&self, id_or_url: &str) -> Option<(u32, String)> {
        let text = id_or_url.trim();
        let caps = match self.url_re.captures(text) {
            Some(c) => c,
            None => self.id_re.captures(text.trim_start_matches('#'))?,
        };
        let id = caps.get(1)?.as_str().parse().ok()?;
        Some((id, caps.get(2)?.as_str().to_string()))
    }

    pub fn find(&self, id_or_url: &str) -> Option<&DefRef> {
        let (id, _) = self.parse_key(id_or_url)?;
        self.refs.iter().find(|r| r.id == id)
    }

    fn next_id(&self) -> u32 {
        (0..)
            .find(|n| !self.refs.iter().any(|r| r.id == *n))
            .unwrap_or(0)
    }

    /// Registers `referrer` as a user of `def` and returns the `url(#...)` to store.
    ///
    /// A structurally equal definition (ignoring its id) with the same value is shared;
    /// `def` itself then stays detached. Otherwise `def` gets a fresh id and is appended to
    /// the container.
    pub fn add_ref(
        &mut self,
        doc: &mut Document,
        def: NodeId,
        referrer: NodeId,
        value: &str,
    ) -> String {
        let token = value_token(value);
        if let Some(idx) = self
            .refs
            .iter()
            .position(|r| r.value == token && doc.structural_eq(r.def, def, &["id"]))
        {
            let r = &mut self.refs[idx];
            r.referrers.push(referrer);
            tracing::debug!(id = r.id, referrers = r.referrers.len(), "sharing definition");
            return self.url(&self.refs[idx]);
        }
        let id = self.next_id();
        doc.set_attr(def, "id", self.element_id(id, &token));
        doc.append_child(self.container, def);
        tracing::debug!(id, value = %token, "allocated definition");
        let r = DefRef {
            def,
            id,
            value: token,
            referrers: vec![referrer],
        };
        let url = self.url(&r);
        self.refs.push(r);
        url
    }

    /// Drops one reference; the last one detaches the definition. Returns `false` when the
    /// reference or referrer is unknown.
    pub fn remove_ref(&mut self, doc: &mut Document, id_or_url: &str, referrer: NodeId) -> bool {
        let Some((id, _)) = self.parse_key(id_or_url) else {
            return false;
        };
        let Some(idx) = self.refs.iter().position(|r| r.id == id) else {
            tracing::warn!(reference = id_or_url, "unknown definition reference");
            return false;
        };
        let r = &mut self.refs[idx];
        let Some(pos) = r.referrers.iter().position(|n| *n == referrer) else {
            tracing::warn!(reference = id_or_url, %referrer, "referrer not registered");
            return false;
        };
        r.referrers.remove(pos);
        if r.referrers.is_empty() {
            let def = r.def;
            self.refs.remove(idx);
            doc.remove(def);
            tracing::debug!(id, "released definition");
        }
        true
    }

    /// Rebuilds the registry from a loaded document: generated definitions in `container`
    /// seed the entries, generated URLs in `body` (and, if `recursive`, its descendants)
    /// become referrers, and unreferenced definitions are removed.
    pub fn rebuild_from_tree(
        doc: &mut Document,
        container: NodeId,
        body: NodeId,
        recursive: bool,
        prefix: &str,
    ) -> Self {
        let mut reg = Self::new(container, prefix);
        for child in doc.children(container) {
            let Some(id_attr) = doc.attr_str(child, "id") else {
                continue;
            };
            let Some(caps) = reg.id_re.captures(&id_attr) else {
                continue;
            };
            let (Some(id), Some(value)) = (
                caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()),
                caps.get(2).map(|m| m.as_str().to_string()),
            ) else {
                continue;
            };
            if reg.refs.iter().any(|r| r.id == id) {
                tracing::warn!(id, "duplicate generated definition id");
                continue;
            }
            reg.refs.push(DefRef {
                def: child,
                id,
                value,
                referrers: Vec::new(),
            });
        }

        let nodes = if recursive {
            let inside: Vec<NodeId> = doc.descendants(container);
            doc.descendants(body)
                .into_iter()
                .filter(|n| !inside.contains(n))
                .collect()
        } else {
            std::iter::once(body).chain(doc.children(body)).collect::<Vec<_>>()
        };
        for node in nodes {
            let Some(attrs) = doc.attrs(node) else {
                continue;
            };
            for value in attrs.values() {
                let text = value.to_text();
                for caps in reg.url_re.captures_iter(&text) {
                    let Some(id) = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok())
                    else {
                        continue;
                    };
                    if let Some(r) = reg.refs.iter_mut().find(|r| r.id == id) {
                        r.referrers.push(node);
                    }
                }
            }
        }

        let (kept, unused): (Vec<_>, Vec<_>) =
            reg.refs.drain(..).partition(|r| !r.referrers.is_empty());
        for r in &unused {
            tracing::debug!(id = r.id, "sweeping unreferenced definition");
            doc.remove(r.def);
        }
        reg.refs = kept;
        reg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pictor_dom::{Content, attrs};

    fn marker(doc: &mut Document, fill: &str) -> NodeId {
        let p = doc.create_element("path", attrs! { "d" => "M0,0 L20,10 L0,20 Z", "fill" => fill }, vec![], None);
        doc.create_element("marker", attrs! { "refX" => "4" }, vec![Content::Element(p)], None)
    }

    #[test]
    fn value_tokens_are_id_safe() {
        assert_eq!(value_token("#ff0000"), "_ff0000");
        assert_eq!(value_token(" arrow "), "arrow");
    }

    #[test]
    fn smallest_unused_id_is_reused() {
        let mut doc = Document::new();
        let defs = doc.create_element("defs", attrs! {}, vec![], None);
        let a = doc.create_element("path", attrs! {}, vec![], None);
        let b = doc.create_element("path", attrs! {}, vec![], None);
        let mut reg = Defrefs::new(defs, "pictor");

        let m0 = marker(&mut doc, "red");
        let u0 = reg.add_ref(&mut doc, m0, a, "arrow");
        let m1 = marker(&mut doc, "blue");
        let u1 = reg.add_ref(&mut doc, m1, b, "arrow");
        assert_eq!(u0, "url(#pictor-0-arrow)");
        assert_eq!(u1, "url(#pictor-1-arrow)");

        assert!(reg.remove_ref(&mut doc, &u0, a));
        let m2 = marker(&mut doc, "green");
        assert_eq!(reg.add_ref(&mut doc, m2, a, "arrow"), "url(#pictor-0-arrow)");
    }

    #[test]
    fn same_structure_with_a_different_value_is_not_shared() {
        let mut doc = Document::new();
        let defs = doc.create_element("defs", attrs! {}, vec![], None);
        let a = doc.create_element("path", attrs! {}, vec![], None);
        let mut reg = Defrefs::new(defs, "pictor");
        let m0 = marker(&mut doc, "red");
        reg.add_ref(&mut doc, m0, a, "arrow");
        let m1 = marker(&mut doc, "red");
        reg.add_ref(&mut doc, m1, a, "circle");
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn unknown_references_are_reported() {
        let mut doc = Document::new();
        let defs = doc.create_element("defs", attrs! {}, vec![], None);
        let a = doc.create_element("path", attrs! {}, vec![], None);
        let b = doc.create_element("path", attrs! {}, vec![], None);
        let mut reg = Defrefs::new(defs, "pictor");
        let m0 = marker(&mut doc, "red");
        let url = reg.add_ref(&mut doc, m0, a, "arrow");
        assert!(!reg.remove_ref(&mut doc, &url, b));
        assert!(!reg.remove_ref(&mut doc, "url(#pictor-7-arrow)", a));
        assert!(!reg.remove_ref(&mut doc, "url(#user-marker)", a));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn parse_key_accepts_urls_fragments_and_ids() {
        let mut doc = Document::new();
        let defs = doc.create_element("defs", attrs! {}, vec![], None);
        let reg = Defrefs::new(defs, "pictor");
        let expected = Some((3, "arrow".to_string()));
        assert_eq!(reg.parse_key("url(#pictor-3-arrow)"), expected);
        assert_eq!(reg.parse_key("#pictor-3-arrow"), expected);
        assert_eq!(reg.parse_key("pictor-3-arrow"), expected);
        assert_eq!(reg.parse_key("url(#other-3-arrow)"), None);
        assert!(reg.is_generated_url("url(#pictor-12-circle)"));
    }
}
