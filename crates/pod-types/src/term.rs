use std::fmt;

use serde::{Deserialize, Serialize};

use crate::vocab::xsd;

/// An RDF literal: lexical value plus optional datatype or language tag.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    pub value: String,
    pub datatype: Option<String>,
    pub language: Option<String>,
}

impl Literal {
    pub fn simple(value: impl Into<String>) -> Self {
        Self { value: value.into(), datatype: None, language: None }
    }

    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        let datatype = datatype.into();
        // xsd:string is the implicit datatype of a simple literal
        let datatype = if datatype == xsd::STRING { None } else { Some(datatype) };
        Self { value: value.into(), datatype, language: None }
    }

    pub fn lang(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: None,
            language: Some(language.into().to_ascii_lowercase()),
        }
    }
}

/// An RDF term in subject, predicate or object position.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    Iri(String),
    BlankNode(String),
    Literal(Literal),
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Self::Iri(iri.into())
    }

    pub fn blank(id: impl Into<String>) -> Self {
        Self::BlankNode(id.into())
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(Literal::simple(value))
    }

    /// The IRI if this term is a named node.
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Self::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    pub fn is_iri(&self, iri: &str) -> bool {
        self.as_iri() == Some(iri)
    }
}

impl fmt::Display for Term {
    /// N-Triples rendering.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => write!(f, "<{iri}>"),
            Self::BlankNode(id) => write!(f, "_:{id}"),
            Self::Literal(lit) => {
                write!(f, "\"{}\"", escape_literal(&lit.value))?;
                if let Some(lang) = &lit.language {
                    write!(f, "@{lang}")
                } else if let Some(dt) = &lit.datatype {
                    write!(f, "^^<{dt}>")
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Escape a literal's lexical form for N-Triples/Turtle output.
pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

/// The graph a quad belongs to.
///
/// Every remote resource's triples live in the named graph equal to the
/// resource URI. The default graph holds purely local data.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GraphName {
    DefaultGraph,
    Named(String),
}

impl GraphName {
    pub fn named(iri: impl Into<String>) -> Self {
        Self::Named(iri.into())
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Self::DefaultGraph)
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Self::Named(iri) => Some(iri),
            Self::DefaultGraph => None,
        }
    }
}

impl fmt::Display for GraphName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DefaultGraph => write!(f, "DEFAULT"),
            Self::Named(iri) => write!(f, "<{iri}>"),
        }
    }
}

/// A subject/predicate/object statement in a graph.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quad {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
    pub graph: GraphName,
}

impl Quad {
    pub fn new(subject: Term, predicate: Term, object: Term, graph: GraphName) -> Self {
        Self { subject, predicate, object, graph }
    }

    /// A quad whose subject, predicate and object are all IRIs.
    pub fn iris(subject: &str, predicate: &str, object: &str, graph: GraphName) -> Self {
        Self::new(Term::iri(subject), Term::iri(predicate), Term::iri(object), graph)
    }

    /// The same statement moved into another graph.
    pub fn in_graph(&self, graph: GraphName) -> Self {
        Self { graph, ..self.clone() }
    }

    /// N-Triples line for the triple part (graph omitted).
    pub fn to_triple_string(&self) -> String {
        format!("{} {} {} .", self.subject, self.predicate, self.object)
    }
}
