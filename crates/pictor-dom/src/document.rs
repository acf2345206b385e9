use crate::value::{AttrValue, Attributes};
use crate::{DEFAULT_INTERNAL_ATTR_PREFIX, NodeId};
use rustc_hash::FxBuildHasher;
use std::borrow::Cow;

type HashMap<K, V> = hashbrown::HashMap<K, V, FxBuildHasher>;

/// One entry of an element's ordered child sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Element(NodeId),
    Text(String),
    Comment(String),
}

impl Content {
    pub fn as_element(&self) -> Option<NodeId> {
        match self {
            Self::Element(id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Element {
    tag: String,
    attrs: Attributes,
    children: Vec<Content>,
}

impl Element {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    pub fn contents(&self) -> &[Content] {
        &self.children
    }
}

/// Arena of elements plus the parent side-table.
///
/// Invariant: `parent(n) == Some(p)` implies `p` lists `n` among its children. Nodes without a
/// parent entry are roots or detached.
#[derive(Debug, Clone)]
pub struct Document {
    elements: Vec<Element>,
    parent: HashMap<NodeId, NodeId>,
    internal_prefix: String,
}

impl Default for Document {
    fn default() -> Self {
        Self::with_internal_prefix(DEFAULT_INTERNAL_ATTR_PREFIX)
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_internal_prefix(prefix: impl Into<String>) -> Self {
        Self {
            elements: Vec::new(),
            parent: HashMap::default(),
            internal_prefix: prefix.into(),
        }
    }

    pub fn internal_prefix(&self) -> &str {
        &self.internal_prefix
    }

    pub fn is_internal_attr(&self, name: &str) -> bool {
        !self.internal_prefix.is_empty() && name.starts_with(self.internal_prefix.as_str())
    }

    /// Number of arena slots, detached elements included.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.elements.len()
    }

    /// Creates an element, adopting `children` (moving any that are attached elsewhere) and
    /// optionally appending the new element to `parent`.
    pub fn create_element(
        &mut self,
        tag: impl Into<String>,
        attrs: Attributes,
        children: Vec<Content>,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.elements.len());
        let mut adopted = Vec::with_capacity(children.len());
        for c in children {
            if let Content::Element(child) = &c {
                if !self.contains(*child) || adopted.contains(&c) {
                    continue;
                }
                self.unlink(*child);
            }
            adopted.push(c);
        }
        self.elements.push(Element {
            tag: tag.into(),
            attrs,
            children: adopted,
        });
        self.rebuild_parent_index(id);
        if let Some(p) = parent {
            self.append_child(p, id);
        }
        id
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.elements.get(id.0)
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    pub fn attrs(&self, id: NodeId) -> Option<&Attributes> {
        self.element(id).map(|e| &e.attrs)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&AttrValue> {
        self.element(id)?.attrs.get(name)
    }

    pub fn attr_str(&self, id: NodeId, name: &str) -> Option<Cow<'_, str>> {
        self.attr(id, name).map(AttrValue::to_text)
    }

    pub fn set_attr(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        value: impl Into<AttrValue>,
    ) -> Option<AttrValue> {
        self.elements
            .get_mut(id.0)?
            .attrs
            .insert(name.into(), value.into())
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<AttrValue> {
        self.elements.get_mut(id.0)?.attrs.shift_remove(name)
    }

    /// Renames an attribute in place, keeping its position in the attribute order.
    pub fn rename_attr(&mut self, id: NodeId, from: &str, to: &str) -> bool {
        let Some(e) = self.elements.get_mut(id.0) else {
            return false;
        };
        let Some((idx, _, value)) = e.attrs.shift_remove_full(from) else {
            return false;
        };
        e.attrs.shift_remove(to);
        let idx = idx.min(e.attrs.len());
        e.attrs.shift_insert(idx, to.to_string(), value);
        true
    }

    pub fn contents(&self, id: NodeId) -> &[Content] {
        self.element(id).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    pub fn push_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let Some(e) = self.elements.get_mut(id.0) {
            e.children.push(Content::Text(text.into()));
        }
    }

    pub fn push_comment(&mut self, id: NodeId, text: impl Into<String>) {
        if let Some(e) = self.elements.get_mut(id.0) {
            e.children.push(Content::Comment(text.into()));
        }
    }

    /// Concatenated character data of the subtree.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        for c in self.contents(id) {
            match c {
                Content::Text(t) => out.push_str(t),
                Content::Element(child) => self.collect_text(*child, out),
                Content::Comment(_) => {}
            }
        }
    }

    /// Element children in document order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.contents(id)
            .iter()
            .filter_map(Content::as_element)
            .collect()
    }

    /// Pre-order walk of the subtree rooted at `root`, `root` included.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(n) = stack.pop() {
            if !self.contains(n) {
                continue;
            }
            out.push(n);
            for c in self.contents(n).iter().rev() {
                if let Content::Element(child) = c {
                    stack.push(*child);
                }
            }
        }
        out
    }

    pub fn find_by_id(&self, root: NodeId, id_value: &str) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|&n| self.attr_str(n, "id").is_some_and(|v| v == id_value))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent.get(&id).copied()
    }

    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// Nearest strict ancestor with the given tag.
    pub fn ancestor_by_tag(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        self.ancestors(id).find(|&p| self.tag(p) == Some(tag))
    }

    pub fn root_of(&self, id: NodeId) -> NodeId {
        self.ancestors(id).last().unwrap_or(id)
    }

    /// Moves `child` under `parent`; equivalent to [`Document::append_child`].
    pub fn set_parent(&mut self, child: NodeId, parent: NodeId) -> bool {
        self.append_child(parent, child)
    }

    /// Detaches `child`; equivalent to [`Document::remove`].
    pub fn reset_parent(&mut self, child: NodeId) -> bool {
        self.remove(child)
    }

    fn would_cycle(&self, parent: NodeId, child: NodeId) -> bool {
        parent == child || self.ancestors(parent).any(|a| a == child)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !self.contains(parent) || !self.contains(child) || self.would_cycle(parent, child) {
            tracing::warn!(%parent, %child, "refusing to attach node");
            return false;
        }
        self.unlink(child);
        self.elements[parent.0].children.push(Content::Element(child));
        self.parent.insert(child, parent);
        self.rebuild_parent_index(child);
        true
    }

    /// Inserts `child` immediately before `reference` in `reference`'s parent.
    pub fn insert_before(&mut self, reference: NodeId, child: NodeId) -> bool {
        let Some(parent) = self.parent(reference) else {
            return false;
        };
        if !self.contains(child) || self.would_cycle(parent, child) || reference == child {
            return false;
        }
        self.unlink(child);
        let Some(pos) = self.content_position(parent, reference) else {
            return false;
        };
        self.elements[parent.0]
            .children
            .insert(pos, Content::Element(child));
        self.parent.insert(child, parent);
        self.rebuild_parent_index(child);
        true
    }

    fn content_position(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.contents(parent)
            .iter()
            .position(|c| *c == Content::Element(child))
    }

    /// Removes `child` from its parent's child list without touching the subtree's index.
    fn unlink(&mut self, child: NodeId) -> bool {
        let Some(parent) = self.parent.remove(&child) else {
            return false;
        };
        match self.content_position(parent, child) {
            Some(pos) => {
                self.elements[parent.0].children.remove(pos);
                true
            }
            None => {
                tracing::warn!(%parent, %child, "parent index out of sync: child not listed by its parent");
                false
            }
        }
    }

    fn invalidate_subtree(&mut self, root: NodeId) {
        for n in self.descendants(root) {
            self.parent.remove(&n);
        }
    }

    /// Detaches `id` from its parent. The removed subtree loses its parent entries; re-attaching
    /// it rebuilds them.
    pub fn remove(&mut self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        let had_parent = self.parent.contains_key(&id);
        let unlinked = self.unlink(id);
        self.invalidate_subtree(id);
        had_parent && unlinked
    }

    pub fn remove_children(&mut self, id: NodeId) {
        let Some(e) = self.elements.get_mut(id.0) else {
            return;
        };
        let removed = std::mem::take(&mut e.children);
        for c in removed {
            if let Content::Element(child) = c {
                self.invalidate_subtree(child);
            }
        }
    }

    /// Removes the descendant of `root` whose `id` attribute equals `id_value`.
    pub fn remove_by_id(&mut self, root: NodeId, id_value: &str) -> Option<NodeId> {
        let n = self.find_by_id(root, id_value)?;
        self.remove(n).then_some(n)
    }

    /// Sets parent entries for the whole subtree below `root`.
    pub fn rebuild_parent_index(&mut self, root: NodeId) {
        let mut stack = vec![root];
        while let Some(n) = stack.pop() {
            let Some(e) = self.elements.get(n.0) else {
                continue;
            };
            let kids: Vec<NodeId> = e.children.iter().filter_map(Content::as_element).collect();
            for k in kids {
                self.parent.insert(k, n);
                stack.push(k);
            }
        }
    }

    fn siblings(&self, id: NodeId) -> Option<(Vec<NodeId>, usize)> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|&s| s == id)?;
        Some((siblings, pos))
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.contents(id).iter().find_map(Content::as_element)
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.contents(id).iter().rev().find_map(Content::as_element)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (siblings, pos) = self.siblings(id)?;
        siblings.get(pos + 1).copied()
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (siblings, pos) = self.siblings(id)?;
        pos.checked_sub(1).map(|p| siblings[p])
    }

    pub fn is_first_child(&self, id: NodeId) -> bool {
        self.siblings(id).is_some_and(|(_, pos)| pos == 0)
    }

    pub fn is_last_child(&self, id: NodeId) -> bool {
        self.siblings(id)
            .is_some_and(|(siblings, pos)| pos + 1 == siblings.len())
    }

    fn move_content(&mut self, id: NodeId, to_end: bool) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        let Some(pos) = self.content_position(parent, id) else {
            return false;
        };
        let children = &mut self.elements[parent.0].children;
        let c = children.remove(pos);
        if to_end {
            children.push(c);
        } else {
            children.insert(0, c);
        }
        true
    }

    /// Moves `id` to the end of its parent's children (painted last).
    pub fn move_to_front(&mut self, id: NodeId) -> bool {
        self.move_content(id, true)
    }

    /// Moves `id` to the start of its parent's children (painted first).
    pub fn move_to_back(&mut self, id: NodeId) -> bool {
        self.move_content(id, false)
    }

    fn swap_with(&mut self, id: NodeId, other: Option<NodeId>) -> bool {
        let (Some(parent), Some(other)) = (self.parent(id), other) else {
            return false;
        };
        let (Some(a), Some(b)) = (
            self.content_position(parent, id),
            self.content_position(parent, other),
        ) else {
            return false;
        };
        self.elements[parent.0].children.swap(a, b);
        true
    }

    /// Swaps `id` with its next element sibling.
    pub fn move_forward(&mut self, id: NodeId) -> bool {
        let next = self.next_sibling(id);
        self.swap_with(id, next)
    }

    /// Swaps `id` with its previous element sibling.
    pub fn move_backward(&mut self, id: NodeId) -> bool {
        let prev = self.prev_sibling(id);
        self.swap_with(id, prev)
    }

    /// Copies the subtree into new, detached arena slots. Internal-use attributes are dropped;
    /// parent entries inside the copy are maintained.
    pub fn deep_copy(&mut self, id: NodeId) -> Option<NodeId> {
        if !self.contains(id) {
            return None;
        }
        Some(self.copy_rec(id))
    }

    fn copy_rec(&mut self, id: NodeId) -> NodeId {
        let src = self.elements[id.0].clone();
        let attrs: Attributes = src
            .attrs
            .into_iter()
            .filter(|(k, _)| !self.is_internal_attr(k))
            .collect();
        let mut children = Vec::with_capacity(src.children.len());
        for c in src.children {
            match c {
                Content::Element(child) => children.push(Content::Element(self.copy_rec(child))),
                other => children.push(other),
            }
        }
        let new = NodeId(self.elements.len());
        for c in &children {
            if let Content::Element(child) = c {
                self.parent.insert(*child, new);
            }
        }
        self.elements.push(Element {
            tag: src.tag,
            attrs,
            children,
        });
        new
    }

    /// Structural equality: same tag, same attribute set (order-insensitive, `ignore`d names
    /// skipped at the top level only) and pairwise-equal children.
    pub fn structural_eq(&self, a: NodeId, b: NodeId, ignore: &[&str]) -> bool {
        let (Some(ea), Some(eb)) = (self.element(a), self.element(b)) else {
            return false;
        };
        if ea.tag != eb.tag {
            return false;
        }
        let kept = |e: &Element| {
            e.attrs
                .iter()
                .filter(|(k, _)| !ignore.contains(&k.as_str()))
                .count()
        };
        if kept(ea) != kept(eb) {
            return false;
        }
        for (k, v) in ea.attrs.iter().filter(|(k, _)| !ignore.contains(&k.as_str())) {
            match eb.attrs.get(k) {
                Some(other) if other.to_text() == v.to_text() => {}
                _ => return false,
            }
        }
        if ea.children.len() != eb.children.len() {
            return false;
        }
        ea.children
            .iter()
            .zip(eb.children.iter())
            .all(|pair| match pair {
                (Content::Element(x), Content::Element(y)) => self.structural_eq(*x, *y, &[]),
                (Content::Text(x), Content::Text(y)) => x == y,
                (Content::Comment(x), Content::Comment(y)) => x == y,
                _ => false,
            })
    }
}

/// Builds an [`Attributes`] map from `(name, value)` pairs.
#[macro_export]
macro_rules! attrs {
    () => { $crate::Attributes::new() };
    ($($k:expr => $v:expr),+ $(,)?) => {{
        let mut m = $crate::Attributes::new();
        $( m.insert(($k).to_string(), $crate::AttrValue::from($v)); )+
        m
    }};
}
