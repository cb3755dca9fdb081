//! Input collection: walks a form and builds the name → element tree.
//!
//! Only direct children are considered at each level. Direct-child fieldsets
//! become nested [`InputTree`]s (collected first), direct-child `input`,
//! `textarea` and `select` elements become fields.
//!
//! Names are taken from the `name` attribute, then `id`; fieldsets may also
//! use their legend text. When nothing usable exists a fallback identifier is
//! synthesized and written back as the element's `name`, so later lookups see
//! the same name.

use crate::dom::{Document, ElementKind, NodeId};
use indexmap::IndexMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

pub const FALLBACK_PREFIX: &str = "formul8";

/// Field or fieldset entry of an [`InputTree`].
#[derive(Debug, Clone, PartialEq)]
pub enum InputNode {
    Field(NodeId),
    Group(InputTree),
}

/// Name → element mapping for one form, nested per fieldset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputTree {
    entries: IndexMap<String, InputNode>,
}

impl InputTree {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&InputNode> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InputNode)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn field(&self, name: &str) -> Option<NodeId> {
        match self.entries.get(name) {
            Some(InputNode::Field(node)) => Some(*node),
            _ => None,
        }
    }

    pub fn group(&self, name: &str) -> Option<&InputTree> {
        match self.entries.get(name) {
            Some(InputNode::Group(tree)) => Some(tree),
            _ => None,
        }
    }

    pub fn descend<S: AsRef<str>>(&self, path: &[S]) -> Option<&InputTree> {
        path.iter()
            .try_fold(self, |tree, name| tree.group(name.as_ref()))
    }

    /// Number of fields, counting into nested groups.
    pub fn field_count(&self) -> usize {
        self.entries
            .values()
            .map(|node| match node {
                InputNode::Field(_) => 1,
                InputNode::Group(tree) => tree.field_count(),
            })
            .sum()
    }

    // A repeated name replaces the earlier entry but keeps its position.
    fn insert(&mut self, name: String, node: InputNode) {
        if self.entries.insert(name.clone(), node).is_some() {
            debug!("Name \"{}\" collected twice, keeping the last element", name);
        }
    }
}

/// Source of synthesized identifiers (`formul8_0`, `formul8_1`, ...).
///
/// One counter is owned by each [`Binder`](super::Binder) and shared by every
/// session it creates.
#[derive(Debug)]
pub struct FallbackIds {
    prefix: String,
    next: AtomicUsize,
}

impl Default for FallbackIds {
    fn default() -> Self {
        Self::new(FALLBACK_PREFIX)
    }
}

impl FallbackIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicUsize::new(0),
        }
    }

    /// Number of identifiers handed out so far.
    pub fn issued(&self) -> usize {
        self.next.load(Ordering::SeqCst)
    }

    /// Synthesizes an identifier for `node` and writes it back as its `name`.
    pub fn assign(&self, document: &Document, node: NodeId) -> String {
        let id = format!("{}_{}", self.prefix, self.next.fetch_add(1, Ordering::SeqCst));
        let tag = document
            .kind(node)
            .map(|kind| kind.tag_name().to_string())
            .unwrap_or_default();
        if let Err(e) = document.set_name(node, &id) {
            warn!("Could not write fallback id back to {}: {}", node, e);
        }
        warn!("Using fallback id \"{}\" for <{}> {}", id, tag, node);
        id
    }
}

/// Builds the input tree below `root` (a form or a fieldset).
pub fn gather_inputs(document: &Document, root: NodeId, ids: &FallbackIds) -> InputTree {
    let mut tree = InputTree::default();
    let children = document.children(root);

    for &child in &children {
        if document.kind(child) == Some(ElementKind::Fieldset) {
            let name = group_name(document, child, ids);
            let nested = gather_inputs(document, child, ids);
            debug!("Collected fieldset \"{}\" with {} entries", name, nested.len());
            tree.insert(name, InputNode::Group(nested));
        }
    }

    for &child in &children {
        let editable = document
            .kind(child)
            .map(|kind| kind.is_editable())
            .unwrap_or(false);
        if editable {
            let name = document
                .name(child)
                .or_else(|| document.id(child))
                .unwrap_or_else(|| ids.assign(document, child));
            tree.insert(name, InputNode::Field(child));
        }
    }

    tree
}

fn group_name(document: &Document, fieldset: NodeId, ids: &FallbackIds) -> String {
    document
        .name(fieldset)
        .or_else(|| document.id(fieldset))
        .or_else(|| legend_label(document, fieldset))
        .unwrap_or_else(|| ids.assign(document, fieldset))
}

/// Label from the first direct-child legend: lower-cased, first space → `_`.
pub fn legend_label(document: &Document, fieldset: NodeId) -> Option<String> {
    let legend = document
        .children(fieldset)
        .into_iter()
        .find(|&child| document.kind(child) == Some(ElementKind::Legend))?;
    let text = document.text(legend)?;
    let label = text.trim().to_lowercase().replacen(' ', "_", 1);
    (!label.is_empty()).then_some(label)
}
