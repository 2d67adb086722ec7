//! Compact Turtle reader/writer.
//!
//! Covers the subset of Turtle that LDP container listings, ACL documents
//! and profile documents use: `@prefix`/`@base` (and their SPARQL-style
//! forms), IRIs, prefixed names, `a`, `;` and `,` lists, string literals
//! (short and long, with language tags or datatypes), numeric and boolean
//! literals, labelled blank nodes, `[ ... ]` property lists and `( ... )`
//! collections (expanded to `rdf:first`/`rdf:rest` chains).

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as _;

use tracing::trace;
use url::Url;

use pod_types::vocab::{rdf, xsd};
use pod_types::{GraphName, Literal, Quad, Term};

use crate::codec::{RdfCodec, TURTLE_MEDIA_TYPE};
use crate::error::{StoreError, StoreResult};

/// The Turtle [`RdfCodec`].
#[derive(Clone, Copy, Debug, Default)]
pub struct TurtleCodec;

impl TurtleCodec {
    pub fn new() -> Self {
        Self
    }
}

impl RdfCodec for TurtleCodec {
    fn media_type(&self) -> &'static str {
        TURTLE_MEDIA_TYPE
    }

    fn parse(&self, text: &str, base: &str) -> StoreResult<Vec<Quad>> {
        let quads = Parser::new(text, base).parse_document()?;
        trace!(base, count = quads.len(), "parsed turtle");
        Ok(quads)
    }

    fn serialize(&self, quads: &[Quad], prefixes: &[(&str, &str)]) -> String {
        write_turtle(quads, prefixes)
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    base: String,
    base_url: Option<Url>,
    prefixes: HashMap<String, String>,
    next_blank: usize,
    quads: Vec<Quad>,
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// `scheme:` prefix per RFC 3986.
fn has_scheme(iri: &str) -> bool {
    let mut chars = iri.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    for c in chars {
        match c {
            ':' => return true,
            c if c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.' => {}
            _ => return false,
        }
    }
    false
}

impl Parser {
    fn new(text: &str, base: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
            base: base.to_string(),
            base_url: Url::parse(base).ok(),
            prefixes: HashMap::new(),
            next_blank: 0,
            quads: Vec::new(),
        }
    }

    fn parse_document(mut self) -> StoreResult<Vec<Quad>> {
        loop {
            self.skip_ws();
            if self.peek().is_none() {
                break;
            }
            if self.eat_keyword("@prefix") {
                self.parse_prefix_decl()?;
                self.skip_ws();
                self.expect('.')?;
            } else if self.eat_keyword("@base") {
                self.parse_base_decl()?;
                self.skip_ws();
                self.expect('.')?;
            } else if self.eat_keyword_ci("PREFIX") {
                self.parse_prefix_decl()?;
            } else if self.eat_keyword_ci("BASE") {
                self.parse_base_decl()?;
            } else {
                self.parse_triples()?;
                self.skip_ws();
                self.expect('.')?;
            }
        }
        Ok(self.quads)
    }

    // ---- character plumbing ----

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn err(&self, message: impl Into<String>) -> StoreError {
        StoreError::Syntax { line: self.line, message: message.into() }
    }

    fn expect(&mut self, expected: char) -> StoreResult<()> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.err(format!("expected '{expected}', found '{c}'"))),
            None => Err(self.err(format!("expected '{expected}', found end of input"))),
        }
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else if c == '#' {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn starts_with(&self, word: &str, case_insensitive: bool) -> bool {
        let mut i = 0;
        for expected in word.chars() {
            match self.peek_at(i) {
                Some(c) if c == expected => {}
                Some(c) if case_insensitive && c.eq_ignore_ascii_case(&expected) => {}
                _ => return false,
            }
            i += 1;
        }
        // keyword must not run into a name
        !matches!(self.peek_at(i), Some(c) if is_name_char(c) || c == ':')
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        if self.starts_with(word, false) {
            self.pos += word.chars().count();
            true
        } else {
            false
        }
    }

    fn eat_keyword_ci(&mut self, word: &str) -> bool {
        if self.starts_with(word, true) {
            self.pos += word.chars().count();
            true
        } else {
            false
        }
    }

    // ---- directives ----

    fn parse_prefix_decl(&mut self) -> StoreResult<()> {
        self.skip_ws();
        let mut prefix = String::new();
        while let Some(c) = self.peek() {
            if c == ':' {
                break;
            }
            if !(is_name_char(c) || c == '.') {
                return Err(self.err(format!("invalid character '{c}' in prefix name")));
            }
            prefix.push(c);
            self.bump();
        }
        self.expect(':')?;
        self.skip_ws();
        let namespace = self.parse_iriref()?;
        self.prefixes.insert(prefix, namespace);
        Ok(())
    }

    fn parse_base_decl(&mut self) -> StoreResult<()> {
        self.skip_ws();
        let base = self.parse_iriref()?;
        self.base_url = Url::parse(&base).ok();
        self.base = base;
        Ok(())
    }

    // ---- statements ----

    fn parse_triples(&mut self) -> StoreResult<()> {
        if self.peek() == Some('[') {
            let subject = self.parse_blank_property_list()?;
            self.skip_ws();
            if self.peek() != Some('.') {
                self.parse_predicate_object_list(&subject)?;
            }
            return Ok(());
        }
        let subject = self.parse_subject()?;
        self.skip_ws();
        self.parse_predicate_object_list(&subject)
    }

    fn parse_predicate_object_list(&mut self, subject: &Term) -> StoreResult<()> {
        loop {
            self.skip_ws();
            let predicate = self.parse_verb()?;
            self.parse_object_list(subject, &predicate)?;
            self.skip_ws();
            if self.peek() != Some(';') {
                return Ok(());
            }
            while self.peek() == Some(';') {
                self.bump();
                self.skip_ws();
            }
            if matches!(self.peek(), Some('.') | Some(']') | None) {
                return Ok(());
            }
        }
    }

    fn parse_object_list(&mut self, subject: &Term, predicate: &Term) -> StoreResult<()> {
        loop {
            self.skip_ws();
            let object = self.parse_object()?;
            self.quads.push(Quad::new(
                subject.clone(),
                predicate.clone(),
                object,
                GraphName::DefaultGraph,
            ));
            self.skip_ws();
            if self.peek() == Some(',') {
                self.bump();
            } else {
                return Ok(());
            }
        }
    }

    fn parse_verb(&mut self) -> StoreResult<Term> {
        if self.peek() == Some('a') && !matches!(self.peek_at(1), Some(c) if is_name_char(c) || c == ':' || c == '.') {
            self.bump();
            return Ok(Term::iri(rdf::TYPE));
        }
        self.parse_iri().map(Term::Iri)
    }

    fn parse_subject(&mut self) -> StoreResult<Term> {
        match self.peek() {
            Some('<') => self.parse_iriref().map(Term::Iri),
            Some('_') if self.peek_at(1) == Some(':') => self.parse_blank_label(),
            Some('(') => self.parse_collection(),
            Some(_) => self.parse_prefixed_name().map(Term::Iri),
            None => Err(self.err("expected subject, found end of input")),
        }
    }

    fn parse_object(&mut self) -> StoreResult<Term> {
        match self.peek() {
            Some('<') => self.parse_iriref().map(Term::Iri),
            Some('_') if self.peek_at(1) == Some(':') => self.parse_blank_label(),
            Some('[') => self.parse_blank_property_list(),
            Some('"') | Some('\'') => self.parse_string_literal(),
            Some(c) if c.is_ascii_digit() || c == '+' || c == '-' || c == '.' => self.parse_numeric(),
            Some('(') => self.parse_collection(),
            Some(_) => {
                if self.eat_keyword("true") {
                    return Ok(Term::Literal(Literal::typed("true", xsd::BOOLEAN)));
                }
                if self.eat_keyword("false") {
                    return Ok(Term::Literal(Literal::typed("false", xsd::BOOLEAN)));
                }
                self.parse_prefixed_name().map(Term::Iri)
            }
            None => Err(self.err("expected object, found end of input")),
        }
    }

    fn parse_iri(&mut self) -> StoreResult<String> {
        if self.peek() == Some('<') {
            self.parse_iriref()
        } else {
            self.parse_prefixed_name()
        }
    }

    fn parse_iriref(&mut self) -> StoreResult<String> {
        self.expect('<')?;
        let mut raw = String::new();
        loop {
            match self.bump() {
                Some('>') => break,
                Some(c) if c.is_whitespace() => {
                    return Err(self.err("whitespace inside IRI"));
                }
                Some(c) => raw.push(c),
                None => return Err(self.err("unterminated IRI")),
            }
        }
        self.resolve(&raw)
    }

    fn resolve(&self, raw: &str) -> StoreResult<String> {
        if has_scheme(raw) {
            return Ok(raw.to_string());
        }
        let base = self.base_url.as_ref().ok_or_else(|| StoreError::IriResolution {
            iri: raw.to_string(),
            base: self.base.clone(),
            reason: "base is not an absolute IRI".into(),
        })?;
        base.join(raw)
            .map(|u| u.to_string())
            .map_err(|e| StoreError::IriResolution {
                iri: raw.to_string(),
                base: self.base.clone(),
                reason: e.to_string(),
            })
    }

    fn parse_prefixed_name(&mut self) -> StoreResult<String> {
        let line = self.line;
        let mut prefix = String::new();
        while let Some(c) = self.peek() {
            if c == ':' {
                break;
            }
            if !(is_name_char(c) || c == '.') {
                return Err(self.err(format!("unexpected character '{c}'")));
            }
            prefix.push(c);
            self.bump();
        }
        if self.peek() != Some(':') {
            return Err(self.err(format!("expected prefixed name, found '{prefix}'")));
        }
        self.bump();

        let mut local = String::new();
        while let Some(c) = self.peek() {
            if is_name_char(c) || c == '.' || c == ':' || c == '%' {
                local.push(c);
                self.bump();
            } else if c == '\\' {
                self.bump();
                match self.bump() {
                    Some(escaped) => local.push(escaped),
                    None => return Err(self.err("dangling escape in local name")),
                }
            } else {
                break;
            }
        }
        // a trailing '.' terminates the statement
        while local.ends_with('.') {
            local.pop();
            self.pos -= 1;
        }

        let namespace = self
            .prefixes
            .get(&prefix)
            .ok_or(StoreError::UndeclaredPrefix { prefix: prefix.clone(), line })?;
        Ok(format!("{namespace}{local}"))
    }

    fn fresh_blank(&mut self) -> Term {
        let id = format!("genid{}", self.next_blank);
        self.next_blank += 1;
        Term::blank(id)
    }

    fn parse_blank_label(&mut self) -> StoreResult<Term> {
        self.expect('_')?;
        self.expect(':')?;
        let mut label = String::new();
        while let Some(c) = self.peek() {
            if is_name_char(c) || c == '.' {
                label.push(c);
                self.bump();
            } else {
                break;
            }
        }
        while label.ends_with('.') {
            label.pop();
            self.pos -= 1;
        }
        if label.is_empty() {
            return Err(self.err("empty blank node label"));
        }
        Ok(Term::blank(label))
    }

    fn parse_blank_property_list(&mut self) -> StoreResult<Term> {
        self.expect('[')?;
        let node = self.fresh_blank();
        self.skip_ws();
        if self.peek() == Some(']') {
            self.bump();
            return Ok(node);
        }
        self.parse_predicate_object_list(&node)?;
        self.skip_ws();
        self.expect(']')?;
        Ok(node)
    }

    /// `( o1 o2 ... )`: a fresh blank node per member, linked by
    /// `rdf:rest` and closed with `rdf:nil`. The empty list is `rdf:nil`.
    fn parse_collection(&mut self) -> StoreResult<Term> {
        self.expect('(')?;
        let mut head: Option<Term> = None;
        let mut tail: Option<Term> = None;
        loop {
            self.skip_ws();
            match self.peek() {
                Some(')') => {
                    self.bump();
                    break;
                }
                None => return Err(self.err("unterminated collection")),
                Some(_) => {}
            }
            let node = self.fresh_blank();
            let member = self.parse_object()?;
            self.push_triple(&node, rdf::FIRST, member);
            match tail.replace(node.clone()) {
                Some(previous) => self.push_triple(&previous, rdf::REST, node),
                None => head = Some(node),
            }
        }
        if let Some(last) = tail {
            self.push_triple(&last, rdf::REST, Term::iri(rdf::NIL));
        }
        Ok(head.unwrap_or_else(|| Term::iri(rdf::NIL)))
    }

    fn push_triple(&mut self, subject: &Term, predicate: &str, object: Term) {
        self.quads.push(Quad::new(
            subject.clone(),
            Term::iri(predicate),
            object,
            GraphName::DefaultGraph,
        ));
    }

    fn parse_string_literal(&mut self) -> StoreResult<Term> {
        let quote = self.bump().ok_or_else(|| self.err("expected string"))?;
        let long = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if long {
            self.bump();
            self.bump();
        }
        let mut value = String::new();
        loop {
            let c = self.bump().ok_or_else(|| self.err("unterminated string literal"))?;
            if c == quote {
                if !long {
                    break;
                }
                if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                    self.bump();
                    self.bump();
                    break;
                }
                value.push(c);
            } else if c == '\\' {
                value.push(self.parse_escape()?);
            } else if (c == '\n' || c == '\r') && !long {
                return Err(self.err("newline in short string literal"));
            } else {
                value.push(c);
            }
        }

        if self.peek() == Some('@') {
            self.bump();
            let mut lang = String::new();
            while let Some(c) = self.peek() {
                if c.is_ascii_alphanumeric() || c == '-' {
                    lang.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
            if lang.is_empty() {
                return Err(self.err("empty language tag"));
            }
            return Ok(Term::Literal(Literal::lang(value, lang)));
        }
        if self.peek() == Some('^') && self.peek_at(1) == Some('^') {
            self.bump();
            self.bump();
            let datatype = self.parse_iri()?;
            return Ok(Term::Literal(Literal::typed(value, datatype)));
        }
        Ok(Term::literal(value))
    }

    fn parse_escape(&mut self) -> StoreResult<char> {
        let c = self.bump().ok_or_else(|| self.err("dangling escape"))?;
        let decoded = match c {
            't' => '\t',
            'n' => '\n',
            'r' => '\r',
            'b' => '\u{8}',
            'f' => '\u{c}',
            '"' => '"',
            '\'' => '\'',
            '\\' => '\\',
            'u' => self.parse_unicode_escape(4)?,
            'U' => self.parse_unicode_escape(8)?,
            other => return Err(self.err(format!("unknown escape '\\{other}'"))),
        };
        Ok(decoded)
    }

    fn parse_unicode_escape(&mut self, digits: usize) -> StoreResult<char> {
        let mut hex = String::with_capacity(digits);
        for _ in 0..digits {
            hex.push(self.bump().ok_or_else(|| self.err("truncated unicode escape"))?);
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.err(format!("invalid unicode escape '{hex}'")))
    }

    fn parse_numeric(&mut self) -> StoreResult<Term> {
        let mut lexical = String::new();
        if let Some(sign @ ('+' | '-')) = self.peek() {
            lexical.push(sign);
            self.bump();
        }
        let mut datatype = xsd::INTEGER;
        self.take_digits(&mut lexical);
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            datatype = xsd::DECIMAL;
            lexical.push('.');
            self.bump();
            self.take_digits(&mut lexical);
        }
        if let Some(e @ ('e' | 'E')) = self.peek() {
            datatype = xsd::DOUBLE;
            lexical.push(e);
            self.bump();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                lexical.push(sign);
                self.bump();
            }
            self.take_digits(&mut lexical);
        }
        if !lexical.chars().any(|c| c.is_ascii_digit()) {
            return Err(self.err(format!("invalid numeric literal '{lexical}'")));
        }
        Ok(Term::Literal(Literal::typed(lexical, datatype)))
    }

    fn take_digits(&mut self, into: &mut String) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                into.push(c);
                self.bump();
            } else {
                break;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

fn is_simple_local(local: &str) -> bool {
    !local.starts_with('-')
        && local.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn compact(iri: &str, prefixes: &[(&str, &str)]) -> String {
    for (prefix, namespace) in prefixes {
        if let Some(local) = iri.strip_prefix(namespace) {
            if is_simple_local(local) {
                return format!("{prefix}:{local}");
            }
        }
    }
    format!("<{iri}>")
}

fn write_term(term: &Term, prefixes: &[(&str, &str)]) -> String {
    match term {
        Term::Iri(iri) => compact(iri, prefixes),
        other => other.to_string(),
    }
}

/// Serialize the triples of `quads` (graphs ignored, duplicates merged),
/// grouped by subject and predicate.
pub fn write_turtle(quads: &[Quad], prefixes: &[(&str, &str)]) -> String {
    let mut grouped: BTreeMap<&Term, BTreeMap<&Term, BTreeSet<&Term>>> = BTreeMap::new();
    for quad in quads {
        grouped
            .entry(&quad.subject)
            .or_default()
            .entry(&quad.predicate)
            .or_default()
            .insert(&quad.object);
    }

    let mut out = String::new();
    for (prefix, namespace) in prefixes {
        let _ = writeln!(out, "@prefix {prefix}: <{namespace}>.");
    }
    if !prefixes.is_empty() && !grouped.is_empty() {
        out.push('\n');
    }

    for (subject, predicates) in grouped {
        out.push_str(&write_term(subject, prefixes));
        for (i, (predicate, objects)) in predicates.into_iter().enumerate() {
            out.push_str(if i == 0 { " " } else { ";\n    " });
            if predicate.is_iri(rdf::TYPE) {
                out.push('a');
            } else {
                out.push_str(&write_term(predicate, prefixes));
            }
            let rendered: Vec<String> = objects.into_iter().map(|o| write_term(o, prefixes)).collect();
            out.push(' ');
            out.push_str(&rendered.join(", "));
        }
        out.push_str(".\n");
    }
    out
}
