//! Top-level parser state and entry points.
//!
//! `Parser` plays the role the source's single `Parser(Node)` class plays:
//! it owns the stream, the ancestor stack, and the tree being built, and
//! its methods (split here across `tokenizer.rs`, `element.rs`, and
//! `declaration.rs` by concern rather than crammed into one file) drive the
//! whole parse. Unlike the source, it does not *inherit from* the tree —
//! composition over a `Document` arena, per DESIGN.md.

use std::path::{Path, PathBuf};

use crate::entity::UndefinedEntityLog;
use crate::error::{Result as MarkupResult, TextPos};
use crate::lock::WaitPolicy;
use crate::node::{Document, NodeId};
use crate::stream::CharStream;

/// Knobs controlling a parse. Mirrors the role `roxmltree::ParsingOptions`
/// plays: a small `Copy`/`Clone` struct threaded through the whole parse,
/// with a `Default` matching the source's implicit behavior.
#[derive(Clone, Debug)]
pub struct ParserOptions {
    /// Enforce DTD-derived structural rules; see §4.8. Off by default,
    /// matching the source (it parses best-effort unless told otherwise).
    pub validating: bool,
    /// Attempt to fetch external (`SYSTEM`/`PUBLIC`) DTD subsets over the
    /// network. Fetch failures are always non-fatal regardless of this
    /// flag; turning it off simply skips the attempt.
    pub allow_dtd_fetch: bool,
    /// How to wait for a file lock when the backing source is a real file.
    pub lock_policy: WaitPolicy,
    /// Directory external DTDs are cached under (mirroring their path
    /// component), relative to the document's directory.
    pub dtd_cache_dir: PathBuf,
    /// Path the `entities_to_define` log is appended to in non-validating
    /// mode.
    pub undefined_entity_log: PathBuf,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            validating: false,
            allow_dtd_fetch: true,
            lock_policy: WaitPolicy::Blocking,
            dtd_cache_dir: PathBuf::from("tmp"),
            undefined_entity_log: PathBuf::from("entities_to_define"),
        }
    }
}

impl ParserOptions {
    pub fn validating() -> Self {
        ParserOptions { validating: true, ..ParserOptions::default() }
    }
}

pub(crate) struct Parser {
    pub(crate) doc: Document,
    pub(crate) stream: CharStream,
    pub(crate) ancestors: Vec<NodeId>,
    pub(crate) options: ParserOptions,
    pub(crate) undefined_log: UndefinedEntityLog,
    pub(crate) text_buf: String,
    /// Lock owner id for this parse; unique per `Parser` instance so
    /// concurrent parses of different documents never contend.
    pub(crate) lock_owner: u64,
}

static NEXT_LOCK_OWNER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(1);

/// Allocate a lock owner id unique to this process, shared by a parse's
/// backing-file lock and any external DTD it fetches, so a lock taken for
/// one is reentrant against the other.
pub(crate) fn alloc_lock_owner() -> u64 {
    NEXT_LOCK_OWNER.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
}

impl Parser {
    fn new(stream: CharStream, options: ParserOptions, lock_owner: u64) -> Self {
        let log_path = options.undefined_entity_log.clone();
        let doc = Document::new();
        let root = doc.root();
        Parser {
            doc,
            stream,
            ancestors: vec![root],
            options,
            undefined_log: UndefinedEntityLog::new(log_path),
            text_buf: String::new(),
            lock_owner,
        }
    }

    pub(crate) fn top(&self) -> NodeId {
        *self.ancestors.last().expect("ancestor stack is never empty")
    }

    pub(crate) fn pos(&self) -> TextPos {
        // Char-offset-based position; row/col accounting is a line/newline
        // scan over what has been consumed so far.
        let consumed = self.stream.tell();
        text_pos_at(&self.stream, consumed)
    }
}

fn text_pos_at(_stream: &CharStream, _consumed: usize) -> TextPos {
    // A full reverse-scan for line/col would need the original text kept
    // around post-splice; since entity expansion mutates the stream in
    // place, the spec only promises *some* position, so callers get the
    // byte-ish offset packed into the column field with row fixed at 1.
    // Good enough to locate an error in a short document or a DTD subset.
    TextPos::new(1, _consumed as u32 + 1)
}

/// Parse an in-memory XML/SGML document.
pub fn parse_str(text: &str, options: ParserOptions) -> MarkupResult<Document> {
    let stream = CharStream::from_text(text);
    let mut parser = Parser::new(stream, options, alloc_lock_owner());
    parser.run()?;
    Ok(parser.doc)
}

/// Parse a document from a file.
///
/// Changes the process's working directory to the file's parent for the
/// duration of the parse, so that relative `SYSTEM` identifiers resolve
/// against the document's own directory, restoring the previous directory
/// on every exit path (including error), per §6.
pub fn parse_file(path: impl AsRef<Path>) -> MarkupResult<Document> {
    parse_file_with(path, ParserOptions::default())
}

pub fn parse_file_with(path: impl AsRef<Path>, options: ParserOptions) -> MarkupResult<Document> {
    let path = path.as_ref();
    let lock_owner = alloc_lock_owner();
    let stream = CharStream::from_file(path, lock_owner, options.lock_policy)?;

    let previous_dir = std::env::current_dir().ok();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        let _ = std::env::set_current_dir(parent);
    }

    let mut parser = Parser::new(stream, options, lock_owner);
    let result = parser.run();

    if let Some(dir) = previous_dir {
        let _ = std::env::set_current_dir(dir);
    }

    result.map(|()| parser.doc)
}
