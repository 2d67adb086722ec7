use pod_types::Quad;

use crate::error::StoreResult;

/// Media type of Turtle documents.
pub const TURTLE_MEDIA_TYPE: &str = "text/turtle";

/// Parser/serializer for an RDF text format.
pub trait RdfCodec: Send + Sync {
    /// Media type this codec reads and writes.
    fn media_type(&self) -> &'static str;

    /// Parse a document into default-graph quads, resolving relative IRIs
    /// against `base`.
    fn parse(&self, text: &str, base: &str) -> StoreResult<Vec<Quad>>;

    /// Serialize the triple part of `quads`, compacting IRIs with the given
    /// `(prefix, namespace)` pairs.
    fn serialize(&self, quads: &[Quad], prefixes: &[(&str, &str)]) -> String;
}
