//! The document tree: a single tagged-variant arena, replacing the
//! source's `Node(list)` inheritance trick (a node that *is* a growable
//! sequence of its own children) with an index-addressed arena, the way
//! `roxmltree::Document`/`NodeData` replace a DOM-style object graph.
//! Parent links are [`NodeId`]s rather than borrowed references, so a
//! parser can keep mutating the tree while holding onto ids of nodes still
//! open on the ancestor stack.

use std::collections::BTreeMap;
use std::fmt;

use crate::content::ContentModel;

/// A qualified name: an optional namespace prefix plus a local part.
///
/// Equality to a bare `&str` compares the local part only; equality to
/// another `Name` compares both, per §3's invariant.
#[derive(Clone, Eq, Debug)]
pub struct Name {
    pub local: String,
    pub space: Option<String>,
}

impl Name {
    pub fn new(local: impl Into<String>) -> Self {
        Name { local: local.into(), space: None }
    }

    pub fn with_space(local: impl Into<String>, space: impl Into<String>) -> Self {
        let space = space.into();
        Name { local: local.into(), space: if space.is_empty() { None } else { Some(space) } }
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Name) -> bool {
        self.local == other.local && self.space == other.space
    }
}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        self.local == other
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        self.local == *other
    }
}

impl std::hash::Hash for Name {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.space {
            Some(space) => write!(f, "{}:{}", space, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

/// A run of text. Kept as an owned `String` (the source models it as a
/// list of characters so it can be grown one character at a time while the
/// tokenizer accumulates); the operations that matter, `collapse` and
/// `escape`, are the same either way.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Text(pub String);

impl Text {
    pub fn new(s: impl Into<String>) -> Self {
        Text(s.into())
    }

    pub fn push_str(&mut self, s: &str) {
        self.0.push_str(s);
    }

    pub fn push(&mut self, c: char) {
        self.0.push(c);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Normalize runs of whitespace (space, tab, CR, LF) to a single space.
    pub fn collapse(&self) -> String {
        let mut out = String::with_capacity(self.0.len());
        let mut in_ws = false;
        for c in self.0.chars() {
            if matches!(c, ' ' | '\t' | '\r' | '\n') {
                if !in_ws {
                    out.push(' ');
                    in_ws = true;
                }
            } else {
                out.push(c);
                in_ws = false;
            }
        }
        out
    }

    /// XML-escape `& < ' "` for use in text or an attribute value.
    pub fn escape(&self) -> String {
        self.0
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('\'', "&apos;")
            .replace('"', "&quot;")
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A `<!DOCTYPE ...>` declaration.
#[derive(Clone, Debug, Default)]
pub struct DocumentTypeData {
    pub root_name: String,
    /// Zero entries (no external id), one (`SYSTEM uri`), or two
    /// (`PUBLIC pubid uri`).
    pub location: Vec<String>,
}

impl DocumentTypeData {
    pub fn system_id(&self) -> Option<&str> {
        self.location.last().map(|s| s.as_str())
    }
}

/// A `<!ELEMENT ...>` declaration, plus any `<!ATTLIST ...>` defaults merged
/// into it.
#[derive(Clone, Debug)]
pub struct ElementTypeData {
    pub name: String,
    pub content: ContentModel,
    /// Attribute name -> default-value spec. Always a fresh map per
    /// declaration: sharing this by accident across declarations was a bug
    /// in the source (see DESIGN.md).
    pub attrs: BTreeMap<String, String>,
}

/// A `<!ENTITY ...>` declaration.
#[derive(Clone, Debug)]
pub struct EntityDefinitionData {
    pub name: String,
    pub value: String,
    /// `true` for a parameter entity (`<!ENTITY % name ...>`), scoped to
    /// declarations; `false` for a general entity, scoped to document text.
    pub system: bool,
}

/// The closed set of node variants a document tree may contain.
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// The tree root; has itself as parent (see `Document::root`).
    Root,
    Element(Name),
    Attribute(Name, Text),
    Text(Text),
    ProcessingInstruction(Name, BTreeMap<String, String>),
    DocumentType(DocumentTypeData),
    ElementType(ElementTypeData),
    EntityDefinition(EntityDefinitionData),
    Comment(String),
}

impl NodeKind {
    pub fn is_element(&self) -> bool {
        matches!(self, NodeKind::Element(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, NodeKind::Text(_))
    }

    pub fn is_sgml(&self) -> bool {
        matches!(
            self,
            NodeKind::DocumentType(_)
                | NodeKind::ElementType(_)
                | NodeKind::EntityDefinition(_)
                | NodeKind::Comment(_)
        )
    }

    pub fn element_name(&self) -> Option<&Name> {
        match self {
            NodeKind::Element(n) => Some(n),
            _ => None,
        }
    }
}

/// An opaque handle into a [`Document`]'s arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(pub usize);

#[derive(Clone, Debug)]
pub struct NodeData {
    pub kind: NodeKind,
    pub parent: NodeId,
    pub children: Vec<NodeId>,
}

/// The document tree produced by a parse.
///
/// An arena of [`NodeData`] addressed by [`NodeId`], following the
/// structural idiom `roxmltree::Document` uses for its immutable tree,
/// generalized here to support in-place mutation: a node may be appended to
/// while it is still the top of the parser's ancestor stack.
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Document {
    pub fn new() -> Self {
        let root = NodeData { kind: NodeKind::Root, parent: NodeId(0), children: Vec::new() };
        Document { nodes: vec![root] }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn get(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    /// Create a new node and append it as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData { kind, parent, children: Vec::new() });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id.0].children.iter().copied()
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).filter(move |c| self.get(*c).kind.is_element())
    }

    /// Pre-order index paths of descendants matching `pred`, bounded by
    /// `depth` (`Some(0)` = direct children only, `None` = unbounded),
    /// parent before child.
    pub fn find(&self, id: NodeId, pred: &dyn Fn(&NodeData) -> bool, depth: Option<u32>) -> Vec<Vec<usize>> {
        let mut out = Vec::new();
        for (index, child) in self.nodes[id.0].children.iter().enumerate() {
            let data = &self.nodes[child.0];
            if pred(data) {
                out.push(vec![index]);
            }
            let recurse = match depth {
                None => true,
                Some(0) => false,
                Some(d) => {
                    let mut sub = self.find(*child, pred, Some(d - 1));
                    for path in &mut sub {
                        path.insert(0, index);
                    }
                    out.extend(sub);
                    false
                }
            };
            if recurse {
                let mut sub = self.find(*child, pred, None);
                for path in &mut sub {
                    path.insert(0, index);
                }
                out.extend(sub);
            }
        }
        out
    }

    /// Resolve an index path, relative to `id`, to a concrete [`NodeId`].
    pub fn resolve(&self, id: NodeId, path: &[usize]) -> NodeId {
        let mut current = id;
        for &index in path {
            current = self.nodes[current.0].children[index];
        }
        current
    }

    pub fn filter(&self, id: NodeId, pred: &dyn Fn(&NodeData) -> bool, depth: Option<u32>) -> Vec<NodeId> {
        self.find(id, pred, depth).into_iter().map(|p| self.resolve(id, &p)).collect()
    }

    /// Replace the `kind` of every descendant matching `pred` (within
    /// `depth`, same bounds as [`Document::filter`]) with `f`'s result.
    /// Children, parent links, and node identity are untouched — only the
    /// node's payload changes.
    pub fn replace(&mut self, id: NodeId, pred: &dyn Fn(&NodeData) -> bool, f: &dyn Fn(&NodeData) -> NodeKind, depth: Option<u32>) {
        for target in self.filter(id, pred, depth) {
            let kind = f(self.get(target));
            self.get_mut(target).kind = kind;
        }
    }

    pub fn siblings(&self, id: NodeId) -> Vec<NodeId> {
        let parent = self.nodes[id.0].parent;
        self.nodes[parent.0].children.iter().copied().filter(|&c| c != id).collect()
    }

    pub fn preceding(&self, id: NodeId, pred: &dyn Fn(&NodeData) -> bool) -> Option<NodeId> {
        let parent = self.nodes[id.0].parent;
        let mut last = None;
        for &child in &self.nodes[parent.0].children {
            if child == id {
                return last;
            } else if pred(&self.nodes[child.0]) {
                last = Some(child);
            }
        }
        None
    }

    pub fn following(&self, id: NodeId, pred: &dyn Fn(&NodeData) -> bool) -> Option<NodeId> {
        let parent = self.nodes[id.0].parent;
        let mut seen_self = false;
        for &child in &self.nodes[parent.0].children {
            if child == id {
                seen_self = true;
            } else if seen_self && pred(&self.nodes[child.0]) {
                return Some(child);
            }
        }
        None
    }

    /// Ancestors from nearest to farthest, stopping at (and not including)
    /// the root's self-parent.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = id;
        loop {
            let parent = self.nodes[current.0].parent;
            if parent == current {
                break;
            }
            out.push(parent);
            current = parent;
        }
        out
    }

    /// Names of the open ancestors, root-ward to this node, used to build
    /// error [`crate::error::Context`]s.
    pub fn ancestor_names(&self, id: NodeId) -> Vec<String> {
        let mut names: Vec<String> = self
            .ancestors(id)
            .into_iter()
            .filter_map(|a| self.get(a).kind.element_name().map(|n| n.to_string()))
            .collect();
        names.reverse();
        names
    }

    /// The nearest enclosing `<!DOCTYPE>`, searching from `id` up to the root
    /// and then the whole tree (an internal subset is a child of the
    /// `DocumentType` node, so a reference site under the document body must
    /// search from the document root instead of its own ancestors).
    pub fn nearest_doctype(&self) -> Option<NodeId> {
        self.filter(self.root(), &|d| matches!(d.kind, NodeKind::DocumentType(_)), None)
            .into_iter()
            .next()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
