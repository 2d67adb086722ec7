//! `ldp:contains` bookkeeping between a resource and its ancestors.
//!
//! Each container's graph in the dataset holds `container ldp:contains child`
//! for its children plus the children's type triples. These functions keep
//! that structure in step with what the client learns about existence.

use pod_store::Dataset;
use pod_types::vocab::{ldp, rdf};
use pod_types::{is_container_uri, normalize_uri, parent_uri, GraphName, Quad, Term};

/// Record that `uri` exists: every ancestor up to the top of the URI
/// hierarchy gains `parent ldp:contains child` and the child's type triples
/// in the parent's graph.
pub fn propagate_containment(dataset: &dyn Dataset, uri: &str) {
    let mut child = normalize_uri(uri).to_string();
    while let Some(parent) = parent_uri(&child) {
        let graph = GraphName::named(parent.as_str());
        dataset.add(Quad::iris(&parent, ldp::CONTAINS, &child, graph.clone()));
        dataset.add(Quad::iris(&child, rdf::TYPE, ldp::RESOURCE, graph.clone()));
        if is_container_uri(&child) {
            dataset.add(Quad::iris(&child, rdf::TYPE, ldp::CONTAINER, graph.clone()));
            dataset.add(Quad::iris(&child, rdf::TYPE, ldp::BASIC_CONTAINER, graph));
        }
        child = parent;
    }
}

/// Record that `uri` is gone: its parent no longer contains it and the
/// parent's graph holds nothing about it.
pub fn remove_containment(dataset: &dyn Dataset, uri: &str) {
    let uri = normalize_uri(uri);
    let Some(parent) = parent_uri(uri) else {
        return;
    };
    let graph = GraphName::named(parent.as_str());
    dataset.delete(&Quad::iris(&parent, ldp::CONTAINS, uri, graph.clone()));
    dataset.delete_matches(Some(&Term::iri(uri)), None, None, Some(&graph));
}

/// The children `container` is known to hold, from its graph.
pub fn contained_uris(dataset: &dyn Dataset, container: &str) -> Vec<String> {
    let container = normalize_uri(container);
    let mut children: Vec<String> = dataset
        .match_quads(
            Some(&Term::iri(container)),
            Some(&Term::iri(ldp::CONTAINS)),
            None,
            Some(&GraphName::named(container)),
        )
        .into_iter()
        .filter_map(|q| q.object.as_iri().map(str::to_string))
        .collect();
    children.sort();
    children.dedup();
    children
}

#[cfg(test)]
mod tests {
    use super::*;
    use pod_store::InMemoryDataset;

    #[test]
    fn propagation_reaches_the_top() {
        let dataset = InMemoryDataset::new();
        propagate_containment(&dataset, "https://pod.example/a/b/doc.ttl#me");

        assert_eq!(contained_uris(&dataset, "https://pod.example/a/b/"), vec!["https://pod.example/a/b/doc.ttl"]);
        assert_eq!(contained_uris(&dataset, "https://pod.example/a/"), vec!["https://pod.example/a/b/"]);
        assert_eq!(contained_uris(&dataset, "https://pod.example/"), vec!["https://pod.example/a/"]);

        let container_type = Quad::iris(
            "https://pod.example/a/b/",
            rdf::TYPE,
            ldp::CONTAINER,
            GraphName::named("https://pod.example/a/"),
        );
        assert!(dataset.contains(&container_type));
        let leaf_as_container = Quad::iris(
            "https://pod.example/a/b/doc.ttl",
            rdf::TYPE,
            ldp::CONTAINER,
            GraphName::named("https://pod.example/a/b/"),
        );
        assert!(!dataset.contains(&leaf_as_container));
    }

    #[test]
    fn propagation_is_idempotent() {
        let dataset = InMemoryDataset::new();
        propagate_containment(&dataset, "https://pod.example/a/doc.ttl");
        let before = dataset.len();
        propagate_containment(&dataset, "https://pod.example/a/doc.ttl");
        propagate_containment(&dataset, "https://pod.example/a/");
        assert_eq!(dataset.len(), before);
    }

    #[test]
    fn removal_only_touches_the_parent() {
        let dataset = InMemoryDataset::new();
        propagate_containment(&dataset, "https://pod.example/a/doc.ttl");
        propagate_containment(&dataset, "https://pod.example/a/other.ttl");

        remove_containment(&dataset, "https://pod.example/a/doc.ttl");
        assert_eq!(contained_uris(&dataset, "https://pod.example/a/"), vec!["https://pod.example/a/other.ttl"]);
        assert_eq!(contained_uris(&dataset, "https://pod.example/"), vec!["https://pod.example/a/"]);
        let doc = Term::iri("https://pod.example/a/doc.ttl");
        assert!(dataset.match_quads(Some(&doc), None, None, None).is_empty());
    }

    #[test]
    fn removing_the_top_is_a_no_op() {
        let dataset = InMemoryDataset::new();
        propagate_containment(&dataset, "https://pod.example/a/");
        remove_containment(&dataset, "https://pod.example/");
        assert_eq!(contained_uris(&dataset, "https://pod.example/"), vec!["https://pod.example/a/"]);
    }
}
