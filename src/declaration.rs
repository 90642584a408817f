//! SGML declarations: `<!DOCTYPE>`, `<!ELEMENT>`, `<!ATTLIST>`, `<!ENTITY>`,
//! and comments, plus external DTD fetching and recursion.
//!
//! Grounded on `Parser.newdecl`/`newdoctype`/`newcmodel`/`defkids`/
//! `newattlist`/`defattrs`/`newentdef`/`newcomment`/`dtdfile` in
//! `parsing/__init__.py`. The source raises `EndOfTag` to unwind out of
//! the content-spec loop; here `parse_group`/`parse_content_spec` return a
//! built [`ContentModel`] on hitting `)`/`>`, an ordinary function return
//! rather than nonlocal unwinding, per the REDESIGN FLAGS.

use std::fs;
use std::path::Path;

use crate::content::{ContentModel, Occurrence};
use crate::error::{Error, Result as MarkupResult};
use crate::node::{DocumentTypeData, ElementTypeData, EntityDefinitionData, NodeId, NodeKind};
use crate::parser::Parser;

impl Parser {
    /// Entry point after `<!` has been consumed.
    pub(crate) fn parse_declaration(&mut self) -> MarkupResult<()> {
        if self.stream.peek() == Some('-') && self.stream.peek_at(1) == Some('-') {
            self.stream.next_char();
            self.stream.next_char();
            return self.parse_comment();
        }

        let mut keyword = String::new();
        loop {
            match self.stream.next_char() {
                Some(' ') | Some('\t') | Some('\n') | Some('\r') => break,
                Some('[') => break,
                Some('>') => return Ok(()),
                Some('%') => self.handle_entity_ref(true)?,
                Some(c) => keyword.push(c),
                None => return Err(Error::UnexpectedEof("declaration keyword").with_context(Default::default())),
            }
        }

        match keyword.as_str() {
            "DOCTYPE" => self.parse_doctype(),
            "ELEMENT" => self.parse_element_decl(),
            "ATTLIST" => self.parse_attlist(),
            "ENTITY" => self.parse_entity_decl(),
            _ => self.skip_to_close_tag(),
        }
    }

    fn skip_to_close_tag(&mut self) -> MarkupResult<()> {
        loop {
            match self.stream.next_char() {
                Some('>') => return Ok(()),
                Some(_) => continue,
                None => return Err(Error::UnexpectedEof("declaration").with_context(Default::default())),
            }
        }
    }

    /// `<!-- ... -->`, stopping at the first literal `-->`.
    fn parse_comment(&mut self) -> MarkupResult<()> {
        let mut body = String::new();
        loop {
            match self.stream.next_char() {
                Some('-') if body.ends_with('-') => match self.stream.next_char() {
                    Some('>') => {
                        body.pop();
                        break;
                    }
                    Some(c) => {
                        body.push('-');
                        body.push(c);
                    }
                    None => return Err(Error::UnexpectedEof("comment").with_context(Default::default())),
                },
                Some(c) => body.push(c),
                None => return Err(Error::UnexpectedEof("comment").with_context(Default::default())),
            }
        }
        let top = self.top();
        self.doc.append(top, NodeKind::Comment(body));
        Ok(())
    }

    /// `DOCTYPE name [PUBLIC lit lit | SYSTEM lit] ['[' inline-subset ']'] '>'`.
    fn parse_doctype(&mut self) -> MarkupResult<()> {
        let mut data = String::new();
        let mut dt_id: Option<NodeId> = None;
        let mut fetched = false;

        loop {
            match self.stream.next_char() {
                Some('%') => self.handle_entity_ref(true)?,
                Some(' ') | Some('\t') | Some('\n') | Some('\r') => {
                    if dt_id.is_none() && !data.is_empty() {
                        let root_name = std::mem::take(&mut data);
                        let parent = self.top();
                        dt_id = Some(self.doc.append(
                            parent,
                            NodeKind::DocumentType(DocumentTypeData { root_name, location: Vec::new() }),
                        ));
                    } else {
                        data.clear();
                    }
                }
                Some('"') => {
                    let literal = self.read_plain_quoted()?;
                    if let Some(id) = dt_id {
                        if let NodeKind::DocumentType(dt) = &mut self.doc.get_mut(id).kind {
                            dt.location.push(literal);
                        }
                    }
                }
                Some('[') => {
                    if dt_id.is_none() && !data.is_empty() {
                        let root_name = std::mem::take(&mut data);
                        let parent = self.top();
                        dt_id = Some(self.doc.append(
                            parent,
                            NodeKind::DocumentType(DocumentTypeData { root_name, location: Vec::new() }),
                        ));
                    }
                    let id = dt_id.ok_or_else(|| {
                        Error::UnexpectedEof("DOCTYPE name").with_context(Default::default())
                    })?;
                    if !fetched {
                        self.maybe_fetch_external_dtd(id);
                        fetched = true;
                    }
                    self.ancestors.push(id);
                    let result = self.parse_internal_subset();
                    self.ancestors.pop();
                    result?;
                }
                Some('>') => {
                    if dt_id.is_none() && !data.is_empty() {
                        let root_name = std::mem::take(&mut data);
                        let parent = self.top();
                        dt_id = Some(self.doc.append(
                            parent,
                            NodeKind::DocumentType(DocumentTypeData { root_name, location: Vec::new() }),
                        ));
                    }
                    if let Some(id) = dt_id {
                        if !fetched {
                            self.maybe_fetch_external_dtd(id);
                        }
                    }
                    return Ok(());
                }
                Some(c) => data.push(c),
                None => return Err(Error::UnexpectedEof("DOCTYPE declaration").with_context(Default::default())),
            }
        }
    }

    /// Read declarations (and nested PIs) up to `]`, same dispatch as the
    /// top level, used for a DOCTYPE's internal subset.
    fn parse_internal_subset(&mut self) -> MarkupResult<()> {
        loop {
            match self.stream.next_char() {
                Some(']') => return Ok(()),
                Some('%') => self.handle_entity_ref(true)?,
                Some('<') => match self.stream.next_char() {
                    Some('!') => self.parse_declaration()?,
                    Some('?') => self.parse_processing_instruction()?,
                    _ => return Err(Error::UnexpectedEof("internal subset").with_context(Default::default())),
                },
                Some(_) => {}
                None => return Err(Error::UnexpectedEof("internal subset").with_context(Default::default())),
            }
        }
    }

    /// Read declarations until end of stream, used when recursively parsing
    /// a fetched external DTD (which has no enclosing `[ ]`).
    fn parse_external_subset(&mut self) -> MarkupResult<()> {
        loop {
            match self.stream.next_char() {
                None => return Ok(()),
                Some('%') => self.handle_entity_ref(true)?,
                Some('<') => match self.stream.next_char() {
                    Some('!') => self.parse_declaration()?,
                    Some('?') => self.parse_processing_instruction()?,
                    _ => return Err(Error::UnexpectedEof("external subset").with_context(Default::default())),
                },
                Some(_) => {}
            }
        }
    }

    fn maybe_fetch_external_dtd(&mut self, dt_id: NodeId) {
        if !self.options.allow_dtd_fetch {
            return;
        }
        let system_id = match &self.doc.get(dt_id).kind {
            NodeKind::DocumentType(dt) => dt.system_id().map(|s| s.to_string()),
            _ => None,
        };
        let system_id = match system_id {
            Some(s) => s,
            None => return,
        };
        match self.fetch_dtd_text(&system_id) {
            Ok(text) => {
                let saved_stream = std::mem::replace(&mut self.stream, crate::stream::CharStream::from_text(&text));
                self.ancestors.push(dt_id);
                let result = self.parse_external_subset();
                self.ancestors.pop();
                self.stream = saved_stream;
                if let Err(e) = result {
                    log::warn!("failed to parse external DTD '{}': {}", system_id, e.error);
                }
            }
            Err(e) => {
                log::warn!("failed to fetch external DTD '{}': {}", system_id, e);
            }
        }
    }

    /// Retrieve the bytes of a `SYSTEM`/`ENTITY ... SYSTEM` URI: a network
    /// fetch (cached under `tmp/`) for a `scheme://netloc` URI, otherwise a
    /// local file read relative to the document's own directory (the
    /// parser's working directory has already been changed there).
    pub(crate) fn fetch_dtd_text(&self, uri: &str) -> std::io::Result<String> {
        if let Some(idx) = uri.find("://") {
            let path_component = uri[idx + 3..].split_once('/').map(|(_, rest)| rest).unwrap_or("");
            let cache_path = crate::stream::tmp_cache_path(&self.options.dtd_cache_dir, path_component);
            if cache_path.exists() {
                return fs::read_to_string(&cache_path);
            }
            let body = ureq::get(uri)
                .call()
                .map_err(|e| std::io::Error::other(e.to_string()))?
                .into_string()
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
            if let Some(parent) = cache_path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            let _ = fs::write(&cache_path, &body);
            Ok(body)
        } else {
            let path = Path::new(uri);
            let mut lock = crate::lock::FileLock::new(path, self.lock_owner);
            lock.acquire(self.options.lock_policy)?;
            let result = fs::read_to_string(path);
            lock.release()?;
            result
        }
    }

    fn read_plain_quoted(&mut self) -> MarkupResult<String> {
        let mut s = String::new();
        loop {
            match self.stream.next_char() {
                Some('"') => return Ok(s),
                Some(c) => s.push(c),
                None => return Err(Error::UnexpectedEof("quoted literal").with_context(Default::default())),
            }
        }
    }

    /// `ELEMENT name content-spec '>'`.
    fn parse_element_decl(&mut self) -> MarkupResult<()> {
        let mut data = String::new();
        loop {
            match self.stream.next_char() {
                Some('%') => self.handle_entity_ref(true)?,
                Some(' ') | Some('\t') | Some('\n') | Some('\r') if data.is_empty() => {}
                Some(' ') | Some('\t') | Some('\n') | Some('\r') => {
                    let name = std::mem::take(&mut data);
                    return self.finish_element_decl(name);
                }
                Some(c) => data.push(c),
                None => return Err(Error::UnexpectedEof("ELEMENT declaration").with_context(Default::default())),
            }
        }
    }

    fn finish_element_decl(&mut self, name: String) -> MarkupResult<()> {
        let first = loop {
            match self.stream.next_char() {
                Some(' ') | Some('\t') | Some('\n') | Some('\r') => continue,
                Some(c) => break c,
                None => return Err(Error::UnexpectedEof("content spec").with_context(Default::default())),
            }
        };
        let content = self.parse_content_spec(first)?;
        let top = self.top();
        self.doc.append(
            top,
            NodeKind::ElementType(ElementTypeData { name, content, attrs: Default::default() }),
        );
        Ok(())
    }

    /// Parse a content spec that begins with `first_char`: either `(...)`
    /// (delegated to `parse_group`) or a bare `ANY` / `EMPTY` / `#PCDATA`
    /// token, consuming through the declaration-closing `>`.
    fn parse_content_spec(&mut self, first_char: char) -> MarkupResult<ContentModel> {
        if first_char == '(' {
            let mut group = self.parse_group()?;
            match self.stream.next_char() {
                Some('>') => {}
                Some(m @ ('?' | '*' | '+')) => {
                    group.set_occurrence(Occurrence::from_modifier(Some(m)));
                    match self.stream.next_char() {
                        Some('>') => {}
                        _ => return Err(Error::UnexpectedEof("content spec close").with_context(Default::default())),
                    }
                }
                _ => return Err(Error::UnexpectedEof("content spec close").with_context(Default::default())),
            }
            Ok(group)
        } else {
            let mut data = first_char.to_string();
            loop {
                match self.stream.next_char() {
                    Some('>') => break,
                    Some(c) => data.push(c),
                    None => return Err(Error::UnexpectedEof("content spec").with_context(Default::default())),
                }
            }
            Ok(terminal_from_token(data.trim()))
        }
    }

    /// Parse a parenthesized group, having already consumed its opening
    /// `(`; returns once the matching `)` is found. `|`/`,` fixes the
    /// group's kind (Choice/Sequence) on first sight, per §4.7.
    fn parse_group(&mut self) -> MarkupResult<ContentModel> {
        let mut is_choice: Option<bool> = None;
        let mut kids: Vec<ContentModel> = Vec::new();
        let mut data = String::new();

        loop {
            match self.stream.next_char() {
                Some('(') => {
                    let nested = self.parse_group()?;
                    kids.push(nested);
                }
                Some(c @ ('|' | ',')) => {
                    if is_choice.is_none() {
                        is_choice = Some(c == '|');
                    }
                    if !data.is_empty() {
                        kids.push(terminal_from_token(std::mem::take(&mut data).trim()));
                    }
                }
                Some(m @ ('?' | '*' | '+')) => {
                    if !data.is_empty() {
                        let mut leaf = terminal_from_token(data.trim());
                        leaf.set_occurrence(Occurrence::from_modifier(Some(m)));
                        kids.push(leaf);
                        data.clear();
                    } else if let Some(last) = kids.last_mut() {
                        last.set_occurrence(Occurrence::from_modifier(Some(m)));
                    }
                }
                Some(')') => {
                    if !data.is_empty() {
                        kids.push(terminal_from_token(data.trim()));
                    }
                    return Ok(if is_choice == Some(true) {
                        ContentModel::Choice(kids, Occurrence::ONE)
                    } else {
                        ContentModel::Sequence(kids, Occurrence::ONE)
                    });
                }
                Some(c) if c.is_whitespace() => {}
                Some(c) => data.push(c),
                None => return Err(Error::UnexpectedEof("content model group").with_context(Default::default())),
            }
        }
    }

    /// `ATTLIST element-name (attr-name default-spec)* '>'`.
    fn parse_attlist(&mut self) -> MarkupResult<()> {
        let pos = self.pos();
        let mut data = String::new();
        let mut element_name: Option<String> = None;
        let mut attr_name: Option<String> = None;
        let mut attrs = std::collections::BTreeMap::new();

        loop {
            match self.stream.next_char() {
                Some('%') => self.handle_entity_ref(true)?,
                Some(' ') | Some('\t') | Some('\n') | Some('\r') => {
                    if element_name.is_none() {
                        if !data.is_empty() {
                            element_name = Some(std::mem::take(&mut data));
                        }
                    } else if attr_name.is_none() {
                        if !data.is_empty() {
                            attr_name = Some(std::mem::take(&mut data));
                        }
                    } else if !data.is_empty() {
                        attrs.insert(attr_name.take().unwrap(), std::mem::take(&mut data));
                    }
                }
                Some('>') => {
                    if let Some(name) = attr_name.take() {
                        if !data.is_empty() {
                            attrs.insert(name, std::mem::take(&mut data));
                        }
                    }
                    break;
                }
                Some(c) => data.push(c),
                None => return Err(Error::UnexpectedEof("ATTLIST declaration").with_context(Default::default())),
            }
        }

        let element_name =
            element_name.ok_or_else(|| Error::UnexpectedEof("ATTLIST element name").with_context(Default::default()))?;
        let doctype = self.top();
        let existing = self.doc.children(doctype).find(|c| {
            matches!(&self.doc.get(*c).kind, NodeKind::ElementType(et) if et.name == element_name)
        });
        match existing {
            Some(id) => {
                if let NodeKind::ElementType(et) = &mut self.doc.get_mut(id).kind {
                    et.attrs.extend(attrs);
                }
            }
            None if self.options.validating => {
                return Err(Error::ElementNotDefined(element_name.clone(), pos)
                    .with_context(Default::default()));
            }
            None => {
                log::warn!("ATTLIST for undefined element '{}' ignored", element_name);
            }
        }
        Ok(())
    }

    /// `ENTITY ['%'] name ('"' value '"' | SYSTEM '"' uri '"') '>'`.
    fn parse_entity_decl(&mut self) -> MarkupResult<()> {
        let mut data = String::new();
        let mut name: Option<String> = None;
        let mut parameter = false;
        let mut remote = false;
        let mut value = String::new();

        loop {
            match self.stream.next_char() {
                Some('%') if name.is_none() && data.is_empty() => parameter = true,
                Some(' ') | Some('\t') | Some('\n') | Some('\r') => {
                    if name.is_none() {
                        if !data.is_empty() {
                            if data == "SYSTEM" {
                                remote = true;
                            } else {
                                name = Some(data.clone());
                            }
                            data.clear();
                        }
                    } else if data == "SYSTEM" {
                        remote = true;
                        data.clear();
                    }
                }
                Some('"') => {
                    let literal = self.read_plain_quoted()?;
                    value = if remote { self.fetch_dtd_text(&literal).unwrap_or_default() } else { literal };
                }
                Some('>') => {
                    let name = name
                        .ok_or_else(|| Error::UnexpectedEof("entity name").with_context(Default::default()))?;
                    let top = self.top();
                    self.doc.append(
                        top,
                        NodeKind::EntityDefinition(EntityDefinitionData { name, value, system: parameter }),
                    );
                    return Ok(());
                }
                Some(c) => data.push(c),
                None => return Err(Error::UnexpectedEof("ENTITY declaration").with_context(Default::default())),
            }
        }
    }
}

fn terminal_from_token(token: &str) -> ContentModel {
    match token {
        "ANY" => ContentModel::Any,
        "EMPTY" => ContentModel::Empty,
        "#PCDATA" => ContentModel::Characters,
        other => ContentModel::Leaf(other.to_string(), Occurrence::ONE),
    }
}
