use std::fmt;

/// A position in the original source text, 1-based.
///
/// Mirrors the role `xmlparser::TextPos` plays for `roxmltree`: every
/// error that can be attributed to a place in the document carries one of
/// these so a caller can point a user at the right line.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TextPos {
    pub row: u32,
    pub col: u32,
}

impl TextPos {
    pub fn new(row: u32, col: u32) -> Self {
        TextPos { row, col }
    }
}

impl fmt::Display for TextPos {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

/// Snapshot of the ancestor stack and offending token at the moment an
/// `InvalidMarkup` error was raised.
///
/// This is the Rust shape of the source's "context tuple" (parser,
/// offending-token, stream-snapshot, ancestor-stack): it is captured by
/// value so a caller can inspect it without holding a borrow on the
/// half-built tree.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Context {
    /// Names of the open elements, root first, innermost last.
    pub ancestors: Vec<String>,
    /// The token (tag name, entity name, ...) that triggered the error.
    pub token: String,
}

impl Context {
    pub fn new(ancestors: Vec<String>, token: impl Into<String>) -> Self {
        Context { ancestors, token: token.into() }
    }
}

/// All errors this crate can produce.
///
/// `EndOfTag`, the source's exception used to unwind out of the
/// content-spec loop, has no variant here: it is modeled as an explicit
/// state-machine transition (see `content::ContentSpecState`) and never
/// becomes a value a caller can observe.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The document has no `<!ELEMENT>` declaration for this name.
    #[error("element '{0}' is not defined at {1}")]
    ElementNotDefined(String, TextPos),

    /// An element's children do not satisfy its content model.
    #[error("invalid nesting in '{0}' at {1}: {2}")]
    InvalidNesting(String, TextPos, String),

    /// An element or attribute name starts with a disallowed character.
    #[error("illegal character starting a name at {0}: '{1}'")]
    IllegalCharacter(TextPos, char),

    /// A closing tag's name does not match the currently open element.
    #[error("tag '{opened}' was not closed before '{closed}' at {pos}")]
    TagNotMatching { opened: String, closed: String, pos: TextPos },

    /// Validation was requested but no (or more than one) `<!DOCTYPE>` is in scope.
    #[error("no single DOCTYPE is defined for this document")]
    NoDtdDefined,

    /// More than one root element was found.
    #[error("document has more than one root element at {0}")]
    MultipleRoots(TextPos),

    /// A named entity reference has no matching `<!ENTITY>` definition.
    #[error("entity '{0}' is not defined at {1}")]
    EntityNotDefined(String, TextPos),

    /// The stream ended while a construct (tag, declaration, comment, ...) was still open.
    #[error("unexpected end of input while parsing {0}")]
    UnexpectedEof(&'static str),

    /// An I/O failure while reading the backing file or an external DTD.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Attach ancestor/token context to a freshly constructed error, for callers
    /// that want the source's "context tuple" without each variant repeating it.
    pub fn with_context(self, ctx: Context) -> MarkupError {
        MarkupError { error: self, context: ctx }
    }
}

/// An [`Error`] paired with the [`Context`] it was raised in.
///
/// This is what a validating parse actually returns on failure: the plain
/// `Error` for `Display`, plus enough of the ancestor stack to locate it.
#[derive(Debug)]
pub struct MarkupError {
    pub error: Error,
    pub context: Context,
}

impl fmt::Display for MarkupError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (inside: {})", self.error, self.context.ancestors.join("/"))
    }
}

impl std::error::Error for MarkupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

pub type Result<T> = std::result::Result<T, MarkupError>;
