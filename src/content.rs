//! The DTD content-model mini-language: choice, sequence, occurrence
//! modifiers, and the three special terminals ANY / EMPTY / #PCDATA.
//!
//! Grounded on `parsing/sgml.py`'s `ContentRef`/`Choice`/`Sequence`/`Any`/
//! `Empty`/`Characters` family, reshaped into a single recursive enum the
//! way `roxmltree`'s `NodeKind` replaces a class hierarchy with one tagged
//! type.

use std::collections::BTreeSet;
use std::fmt;

/// An occurrence count. `max` may be unbounded, matching the source's `Inf`
/// sentinel.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Occurrence {
    pub min: u32,
    pub max: Bound,
}

/// The upper bound of an [`Occurrence`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Bound {
    Finite(u32),
    Unbounded,
}

impl PartialOrd<u32> for Bound {
    fn partial_cmp(&self, other: &u32) -> Option<std::cmp::Ordering> {
        match self {
            Bound::Unbounded => Some(std::cmp::Ordering::Greater),
            Bound::Finite(n) => n.partial_cmp(other),
        }
    }
}

impl PartialEq<u32> for Bound {
    fn eq(&self, other: &u32) -> bool {
        matches!(self, Bound::Finite(n) if n == other)
    }
}

impl Occurrence {
    pub const ONE: Occurrence = Occurrence { min: 1, max: Bound::Finite(1) };
    pub const OPTIONAL: Occurrence = Occurrence { min: 0, max: Bound::Finite(1) };
    pub const ANY_COUNT: Occurrence = Occurrence { min: 0, max: Bound::Unbounded };
    pub const AT_LEAST_ONE: Occurrence = Occurrence { min: 1, max: Bound::Unbounded };

    /// Map a trailing modifier character to its occurrence, per §4.3.
    /// `None` (no modifier) maps to the default `(1, 1)`.
    pub fn from_modifier(c: Option<char>) -> Self {
        match c {
            Some('?') => Occurrence::OPTIONAL,
            Some('*') => Occurrence::ANY_COUNT,
            Some('+') => Occurrence::AT_LEAST_ONE,
            _ => Occurrence::ONE,
        }
    }

    fn suffix(self) -> &'static str {
        match (self.min, self.max) {
            (0, Bound::Finite(1)) => "?",
            (1, Bound::Finite(1)) => "",
            (0, Bound::Unbounded) => "*",
            (1, Bound::Unbounded) => "+",
            _ => "",
        }
    }

    fn nullable(self) -> bool {
        self.min == 0
    }
}

/// A node in a content model: a leaf element name, a choice/sequence group,
/// or one of the three special terminals.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ContentModel {
    /// Matches an element whose local name equals this string.
    Leaf(String, Occurrence),
    /// Matches if any one branch matches (`|` groups).
    Choice(Vec<ContentModel>, Occurrence),
    /// Matches if every position in order matches (`,` groups).
    Sequence(Vec<ContentModel>, Occurrence),
    /// Matches any element or text content.
    Any,
    /// Matches no content at all.
    Empty,
    /// Matches text content (`#PCDATA`).
    Characters,
}

impl ContentModel {
    pub fn occurrence(&self) -> Occurrence {
        match self {
            ContentModel::Leaf(_, o) | ContentModel::Choice(_, o) | ContentModel::Sequence(_, o) => *o,
            ContentModel::Any | ContentModel::Empty | ContentModel::Characters => Occurrence::ONE,
        }
    }

    pub fn set_occurrence(&mut self, new: Occurrence) {
        match self {
            ContentModel::Leaf(_, o) | ContentModel::Choice(_, o) | ContentModel::Sequence(_, o) => *o = new,
            _ => {}
        }
    }

    /// Coarse "allowed somewhere" containment used by the validator's
    /// parent/sibling legality checks: true if `name` appears as a leaf
    /// anywhere in the model, or the model is `Any`, or it is `Characters`
    /// and `name` is the special text marker `""`.
    pub fn contains_element(&self, name: &str) -> bool {
        match self {
            ContentModel::Leaf(n, _) => n == name,
            ContentModel::Choice(kids, _) | ContentModel::Sequence(kids, _) => {
                kids.iter().any(|k| k.contains_element(name))
            }
            ContentModel::Any => true,
            ContentModel::Empty | ContentModel::Characters => false,
        }
    }

    /// True if this model admits text (`#PCDATA` or `ANY`) directly.
    pub fn admits_text(&self) -> bool {
        matches!(self, ContentModel::Characters | ContentModel::Any)
    }

    /// The set of leaf names that may legally begin an expansion of this model.
    pub fn first(&self) -> BTreeSet<String> {
        match self {
            ContentModel::Leaf(n, _) => {
                let mut s = BTreeSet::new();
                s.insert(n.clone());
                s
            }
            ContentModel::Choice(kids, _) => kids.iter().flat_map(|k| k.first()).collect(),
            ContentModel::Sequence(kids, _) => {
                let mut out = BTreeSet::new();
                for kid in kids {
                    out.extend(kid.first());
                    if !kid.occurrence().nullable() {
                        break;
                    }
                }
                out
            }
            ContentModel::Any | ContentModel::Empty | ContentModel::Characters => BTreeSet::new(),
        }
    }

    /// The set of leaf names that may legally end an expansion of this
    /// model: in a `Sequence`, walk right-to-left, unioning nullable tails
    /// and stopping at (and including) the first child whose `min >= 1`.
    pub fn last(&self) -> BTreeSet<String> {
        match self {
            ContentModel::Leaf(n, _) => {
                let mut s = BTreeSet::new();
                s.insert(n.clone());
                s
            }
            ContentModel::Choice(kids, _) => kids.iter().flat_map(|k| k.last()).collect(),
            ContentModel::Sequence(kids, _) => {
                let mut out = BTreeSet::new();
                for kid in kids.iter().rev() {
                    out.extend(kid.last());
                    if kid.occurrence().min >= 1 {
                        break;
                    }
                }
                out
            }
            ContentModel::Any | ContentModel::Empty | ContentModel::Characters => BTreeSet::new(),
        }
    }
}

impl fmt::Display for ContentModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ContentModel::Any => write!(f, "ANY"),
            ContentModel::Empty => write!(f, "EMPTY"),
            ContentModel::Characters => write!(f, "#PCDATA"),
            ContentModel::Leaf(n, o) => write!(f, "{}{}", n, o.suffix()),
            ContentModel::Choice(kids, o) => {
                write!(f, "(")?;
                for (i, kid) in kids.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", kid)?;
                }
                write!(f, "){}", o.suffix())
            }
            ContentModel::Sequence(kids, o) => {
                write!(f, "(")?;
                for (i, kid) in kids.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", kid)?;
                }
                write!(f, "){}", o.suffix())
            }
        }
    }
}
