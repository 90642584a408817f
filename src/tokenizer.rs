//! The top-level character loop: classifies `<`, `&`, and text runs and
//! hands control to the element, declaration, or entity sub-parsers.
//!
//! Grounded on `Parser.__call__` in `parsing/__init__.py`.

use crate::error::Result as MarkupResult;
use crate::node::{NodeKind, Text};
use crate::parser::Parser;
use crate::validator;

impl Parser {
    pub(crate) fn run(&mut self) -> MarkupResult<()> {
        loop {
            match self.stream.next_char() {
                None => break,
                Some('<') => {
                    self.flush_text()?;
                    self.dispatch_tag()?;
                }
                Some('&') => {
                    self.flush_text()?;
                    self.handle_entity_ref(false)?;
                }
                Some(c) => self.text_buf.push(c),
            }
        }
        self.flush_text()?;
        Ok(())
    }

    /// Append any accumulated text as a child of the current top of stack,
    /// merging into an existing trailing `Text` node rather than starting
    /// a new one (the source's `newtext`).
    pub(crate) fn flush_text(&mut self) -> MarkupResult<()> {
        if self.text_buf.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.text_buf);
        self.append_text_to(self.top(), text);
        Ok(())
    }

    pub(crate) fn append_text_to(&mut self, parent: crate::node::NodeId, text: String) {
        if let Some(&last) = self.doc.get(parent).children.last() {
            if let NodeKind::Text(t) = &mut self.doc.get_mut(last).kind {
                t.push_str(&text);
                return;
            }
        }
        self.doc.append(parent, NodeKind::Text(Text::new(text)));
    }

    fn dispatch_tag(&mut self) -> MarkupResult<()> {
        let pos = self.pos();
        match self.stream.next_char() {
            Some('!') => self.parse_declaration(),
            Some('?') => self.parse_processing_instruction(),
            Some('/') => self.parse_end_tag(),
            Some(c) => {
                if self.options.validating {
                    validator::test_name(&self.doc, self.top(), c, pos)?;
                    validator::test_doctype(&self.doc, self.top())?;
                }
                self.parse_start_tag(c)
            }
            None => Err(crate::error::Error::UnexpectedEof("tag after '<'").with_context(Default::default())),
        }
    }

    /// Resolve `&name;` (general) or `%name;` (parameter, `system = true`)
    /// and splice the replacement text back into the stream at the current
    /// cursor, so parsing re-enters the substituted text normally.
    pub(crate) fn handle_entity_ref(&mut self, system: bool) -> MarkupResult<()> {
        let pos = self.pos();
        let mut name = String::new();
        loop {
            match self.stream.next_char() {
                Some(';') => break,
                Some(c) => name.push(c),
                None => {
                    return Err(crate::error::Error::UnexpectedEof("entity reference")
                        .with_context(Default::default()))
                }
            }
        }
        let replacement =
            crate::entity::resolve(&self.doc, &name, pos, system, self.options.validating, &self.undefined_log)?;
        match replacement {
            Some(crate::entity::Resolution::Literal(value)) => self.text_buf.push_str(&value),
            Some(crate::entity::Resolution::Reentrant(value)) => self.stream.splice_here(&value),
            None => {}
        }
        Ok(())
    }
}
