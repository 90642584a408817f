//! Start-tag, end-tag, empty-element, attribute and processing-instruction
//! parsing; namespace splitting.
//!
//! Grounded on `Parser.newelement`/`newattr`/`newval`/`newpi`/`endelement`
//! in `parsing/__init__.py`. Namespaces are syntactic only, per §4.6: a
//! `prefix:` is stored on [`Name::space`] and never resolved to a URI.

use std::collections::BTreeMap;

use crate::error::{Error, Result as MarkupResult};
use crate::node::{Name, NodeId, NodeKind, Text};
use crate::parser::Parser;
use crate::validator;

impl Parser {
    /// Parse a start tag or empty element, having already consumed `<` and
    /// the tag's first name character `first_char`.
    pub(crate) fn parse_start_tag(&mut self, first_char: char) -> MarkupResult<()> {
        let mut space = String::new();
        let mut data = first_char.to_string();
        let mut keyspace = String::new();
        let mut name: Option<Name> = None;

        loop {
            let pos = self.pos();
            match self.stream.next_char() {
                Some(':') => {
                    if name.is_none() {
                        space = std::mem::take(&mut data);
                    } else {
                        keyspace = std::mem::take(&mut data);
                    }
                }
                Some(' ') | Some('\t') | Some('\n') | Some('\r') if name.is_none() && !data.is_empty() => {
                    name = Some(self.open_element(std::mem::take(&mut data), std::mem::take(&mut space), pos)?);
                }
                Some(' ') | Some('\t') | Some('\n') | Some('\r') => {
                    // whitespace between attributes, or before the first
                    // one once the name is already open
                }
                Some('=') => {
                    let attr_name = Name::with_space(std::mem::take(&mut data), std::mem::take(&mut keyspace));
                    let value = self.read_attribute_value()?;
                    let top = self.top();
                    self.doc.append(top, NodeKind::Attribute(attr_name, Text::new(value)));
                }
                Some('/') => {
                    loop {
                        match self.stream.next_char() {
                            Some('>') => break,
                            Some(_) => continue,
                            None => {
                                return Err(Error::UnexpectedEof("empty element close")
                                    .with_context(Default::default()))
                            }
                        }
                    }
                    if name.is_none() {
                        self.open_element(std::mem::take(&mut data), std::mem::take(&mut space), pos)?;
                    }
                    self.ancestors.pop();
                    return Ok(());
                }
                Some('>') => {
                    if name.is_none() {
                        self.open_element(std::mem::take(&mut data), std::mem::take(&mut space), pos)?;
                    }
                    return Ok(());
                }
                Some(c) => data.push(c),
                None => return Err(Error::UnexpectedEof("start tag").with_context(Default::default())),
            }
        }
    }

    /// Finalize an element's name, run the parent/sibling/existence
    /// validator hooks, create its node, and push it onto the ancestor
    /// stack as the new top-of-stack frame.
    fn open_element(&mut self, local: String, space: String, pos: crate::error::TextPos) -> MarkupResult<Name> {
        let name = Name::with_space(local, space);
        let parent = self.top();
        if self.options.validating {
            validator::test_existence(&self.doc, parent, &name, pos)?;
            validator::test_parent(&self.doc, parent, &name, pos)?;
            validator::test_siblings(&self.doc, parent, pos)?;
        }
        let id = self.doc.append(parent, NodeKind::Element(name.clone()));
        self.ancestors.push(id);
        Ok(name)
    }

    /// Parse an end tag, having already consumed `</`.
    pub(crate) fn parse_end_tag(&mut self) -> MarkupResult<()> {
        let pos = self.pos();
        let mut space = String::new();
        let mut data = String::new();
        loop {
            match self.stream.next_char() {
                Some(':') => space = std::mem::take(&mut data),
                Some('>') => break,
                Some(c) => data.push(c),
                None => return Err(Error::UnexpectedEof("end tag").with_context(Default::default())),
            }
        }
        let closing_name = Name::with_space(data, space);
        let opened = self.ancestors.pop().ok_or_else(|| {
            Error::TagNotMatching { opened: String::new(), closed: closing_name.to_string(), pos }
                .with_context(Default::default())
        })?;
        if self.options.validating {
            validator::test_closing(&self.doc, opened, &closing_name, pos)?;
            validator::test_kids(&self.doc, opened, pos)?;
        }
        Ok(())
    }

    /// Read a `"`-quoted string literal, expanding `&name;` references
    /// inline (general entities only; parameter entities are not expanded
    /// in attribute values, per the spec's open question).
    fn read_attribute_value(&mut self) -> MarkupResult<String> {
        loop {
            match self.stream.next_char() {
                Some('"') => break,
                Some(_) => continue,
                None => return Err(Error::UnexpectedEof("attribute value opening quote").with_context(Default::default())),
            }
        }
        let mut value = String::new();
        loop {
            match self.stream.next_char() {
                Some('"') => return Ok(value),
                Some('&') => {
                    let pos = self.pos();
                    let mut name = String::new();
                    loop {
                        match self.stream.next_char() {
                            Some(';') => break,
                            Some(c) => name.push(c),
                            None => {
                                return Err(Error::UnexpectedEof("attribute entity reference")
                                    .with_context(Default::default()))
                            }
                        }
                    }
                    let replacement = crate::entity::resolve(
                        &self.doc,
                        &name,
                        pos,
                        false,
                        self.options.validating,
                        &self.undefined_log,
                    )?;
                    match replacement {
                        Some(crate::entity::Resolution::Literal(v)) => value.push_str(&v),
                        Some(crate::entity::Resolution::Reentrant(v)) => value.push_str(&v),
                        None => {}
                    }
                }
                Some(c) => value.push(c),
                None => return Err(Error::UnexpectedEof("attribute value").with_context(Default::default())),
            }
        }
    }

    /// Parse `<?name attr="val" ...?>`.
    pub(crate) fn parse_processing_instruction(&mut self) -> MarkupResult<()> {
        let mut data = String::new();
        let mut name: Option<String> = None;
        let mut attrs: BTreeMap<String, String> = BTreeMap::new();
        let mut pi_id: Option<NodeId> = None;

        loop {
            match self.stream.next_char() {
                Some(' ') | Some('\t') | Some('\n') | Some('\r') if name.is_none() => {
                    name = Some(std::mem::take(&mut data));
                    let top = self.top();
                    pi_id = Some(self.doc.append(top, NodeKind::ProcessingInstruction(Name::new(name.clone().unwrap()), BTreeMap::new())));
                }
                Some('=') => {
                    let attr_name = std::mem::take(&mut data);
                    let value = self.read_attribute_value()?;
                    attrs.insert(attr_name, value);
                }
                Some('?') => {
                    loop {
                        match self.stream.next_char() {
                            Some('>') => break,
                            Some(_) => continue,
                            None => return Err(Error::UnexpectedEof("processing instruction close").with_context(Default::default())),
                        }
                    }
                    let id = match pi_id {
                        Some(id) => id,
                        None => {
                            let top = self.top();
                            self.doc.append(top, NodeKind::ProcessingInstruction(Name::new(std::mem::take(&mut data)), BTreeMap::new()))
                        }
                    };
                    if let NodeKind::ProcessingInstruction(_, map) = &mut self.doc.get_mut(id).kind {
                        *map = attrs;
                    }
                    return Ok(());
                }
                Some(c) => data.push(c),
                None => return Err(Error::UnexpectedEof("processing instruction").with_context(Default::default())),
            }
        }
    }
}
