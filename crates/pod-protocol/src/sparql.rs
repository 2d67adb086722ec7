//! SPARQL-Update bodies for `PATCH`.
//!
//! Only the `DELETE DATA { ... }; INSERT DATA { ... }` shape is produced
//! and understood. Triples are written one N-Triples line each.

use pod_store::{DatasetChanges, RdfCodec, TurtleCodec};
use pod_types::Quad;

use crate::error::{ProtocolError, ProtocolResult};

fn data_block(keyword: &str, quads: &[Quad]) -> String {
    let mut block = format!("{keyword} DATA {{\n");
    for quad in quads {
        block.push_str("  ");
        block.push_str(&quad.to_triple_string());
        block.push('\n');
    }
    block.push('}');
    block
}

/// Encode a change set. Empty clauses are omitted.
pub fn update_body(changes: &DatasetChanges) -> String {
    let mut clauses = Vec::new();
    if !changes.removed.is_empty() {
        clauses.push(data_block("DELETE", &changes.removed));
    }
    if !changes.added.is_empty() {
        clauses.push(data_block("INSERT", &changes.added));
    }
    clauses.join(";\n")
}

/// Byte offset of the `}` closing a block that starts right after `{`,
/// skipping braces inside IRIs and string literals.
fn closing_brace(text: &str) -> Option<usize> {
    let mut in_iri = false;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' if !in_iri => in_string = !in_string,
            '<' if !in_string => in_iri = true,
            '>' if !in_string => in_iri = false,
            '}' if !in_iri && !in_string => return Some(i),
            _ => {}
        }
    }
    None
}

fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let head = text.get(..keyword.len())?;
    if head.eq_ignore_ascii_case(keyword) {
        Some(&text[keyword.len()..])
    } else {
        None
    }
}

/// Decode a body produced by [`update_body`] into `(removed, added)` triples.
pub fn parse_update_body(text: &str, base: &str) -> ProtocolResult<(Vec<Quad>, Vec<Quad>)> {
    let codec = TurtleCodec;
    let mut removed = Vec::new();
    let mut added = Vec::new();
    let mut rest = text.trim_start();

    while !rest.is_empty() {
        let (target, after) = if let Some(after) = strip_keyword(rest, "DELETE") {
            (&mut removed, after)
        } else if let Some(after) = strip_keyword(rest, "INSERT") {
            (&mut added, after)
        } else {
            return Err(ProtocolError::MalformedUpdate(format!(
                "expected DELETE DATA or INSERT DATA near '{}'",
                rest.chars().take(20).collect::<String>()
            )));
        };
        let after = strip_keyword(after.trim_start(), "DATA")
            .ok_or_else(|| ProtocolError::MalformedUpdate("expected DATA".into()))?
            .trim_start();
        let inner = after
            .strip_prefix('{')
            .ok_or_else(|| ProtocolError::MalformedUpdate("expected '{'".into()))?;
        let end = closing_brace(inner)
            .ok_or_else(|| ProtocolError::MalformedUpdate("unterminated data block".into()))?;
        let quads = codec
            .parse(&inner[..end], base)
            .map_err(|e| ProtocolError::MalformedUpdate(e.to_string()))?;
        target.extend(quads);

        rest = inner[end + 1..].trim_start();
        if let Some(after) = rest.strip_prefix(';') {
            rest = after.trim_start();
        }
    }
    Ok((removed, added))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pod_types::{GraphName, Term};

    fn quad(s: &str, o: &str) -> Quad {
        Quad::iris(s, "http://example.org/p", o, GraphName::named("https://pod.example/doc"))
    }

    #[test]
    fn omits_empty_clauses() {
        let only_insert = DatasetChanges::new().with_added(quad("http://a", "http://b"));
        let body = update_body(&only_insert);
        assert!(body.starts_with("INSERT DATA {"));
        assert!(!body.contains("DELETE"));
        assert_eq!(update_body(&DatasetChanges::new()), "");
    }

    #[test]
    fn delete_precedes_insert() {
        let changes = DatasetChanges::new()
            .with_added(quad("http://a", "http://new"))
            .with_removed(quad("http://a", "http://old"));
        let body = update_body(&changes);
        let del = body.find("DELETE DATA").unwrap();
        let ins = body.find("INSERT DATA").unwrap();
        assert!(del < ins);
        assert!(body.contains("<http://a> <http://example.org/p> <http://old> ."));
    }

    #[test]
    fn decodes_encoded_body() {
        let literal = Quad::new(
            Term::iri("http://a"),
            Term::iri("http://example.org/label"),
            Term::literal("curly } brace"),
            GraphName::DefaultGraph,
        );
        let changes = DatasetChanges::new()
            .with_added(literal.clone())
            .with_removed(quad("http://a", "http://old"));
        let (removed, added) = parse_update_body(&update_body(&changes), "https://pod.example/doc").unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].object, Term::iri("http://old"));
        assert_eq!(added, vec![literal]);
    }

    #[test]
    fn rejects_other_operations() {
        let err = parse_update_body("DELETE WHERE { ?s ?p ?o }", "https://pod.example/").unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedUpdate(_)));
    }
}
