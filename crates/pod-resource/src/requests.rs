//! The HTTP exchanges behind each resource operation.
//!
//! These functions hold no resource state. They talk to the pod, keep the
//! dataset in step with what they learn and report what happened; the
//! resource types turn that into state transitions.

use bytes::Bytes;
use tracing::{debug, info};

use pod_protocol::{
    check_response, format_link, headers, links_with_rel, media, transport_failure, update_body,
    HttpRequest, HttpResponse,
};
use pod_store::DatasetChanges;
use pod_types::vocab::{ldp, pim};
use pod_types::{is_container_uri, parent_uri, slug, GraphName, Quad, ResourceError, ResourceResult};

use crate::containment::{propagate_containment, remove_containment};
use crate::context::PodContext;
use crate::outcome::{CreateOutcome, DeleteSuccess, ReadSuccess, UpdateSuccess};

async fn send(context: &PodContext, uri: &str, request: HttpRequest) -> ResourceResult<HttpResponse> {
    context
        .http()
        .send(request)
        .await
        .map_err(|e| transport_failure(uri, e))
}

fn is_storage_root(response: &HttpResponse, uri: &str) -> bool {
    links_with_rel(response, "type", uri)
        .iter()
        .any(|t| t == pim::STORAGE_TYPE)
}

fn forget_locally(context: &PodContext, uri: &str) {
    context
        .dataset()
        .delete_matches(None, None, None, Some(&GraphName::named(uri)));
    remove_containment(context.dataset().as_ref(), uri);
}

/// `GET` the resource and load what comes back.
///
/// A 404 empties the resource's graph and drops it from its parent. Turtle
/// replaces the graph. Anything else is binary content, which only a leaf
/// may have.
pub async fn read_resource(context: &PodContext, uri: &str) -> ResourceResult<ReadSuccess> {
    let response = send(
        context,
        uri,
        HttpRequest::get(uri).header(headers::ACCEPT, media::TURTLE),
    )
    .await?;

    if response.status == 404 {
        forget_locally(context, uri);
        debug!(uri, "resource is absent");
        return Ok(ReadSuccess::Absent { uri: uri.to_string() });
    }
    check_response(uri, &response)?;

    let mime_type = response
        .media_type()
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ResourceError::noncompliant(uri, "response has no Content-Type"))?;

    if mime_type == media::TURTLE {
        let quads = context
            .codec()
            .parse(&response.text(), uri)
            .map_err(|e| ResourceError::noncompliant(uri, format!("malformed Turtle: {e}")))?;
        let triples = quads.len();
        context.dataset().replace_graph(&GraphName::named(uri), quads);
        propagate_containment(context.dataset().as_ref(), uri);
        debug!(uri, triples, "read data resource");
        if is_container_uri(uri) {
            return Ok(ReadSuccess::Container {
                uri: uri.to_string(),
                is_root: is_storage_root(&response, uri),
            });
        }
        return Ok(ReadSuccess::Data { uri: uri.to_string() });
    }

    if is_container_uri(uri) {
        return Err(ResourceError::noncompliant(
            uri,
            format!("container served as {mime_type}"),
        ));
    }
    context
        .dataset()
        .delete_matches(None, None, None, Some(&GraphName::named(uri)));
    propagate_containment(context.dataset().as_ref(), uri);
    debug!(uri, mime_type = %mime_type, bytes = response.body.len(), "read binary resource");
    Ok(ReadSuccess::Binary {
        uri: uri.to_string(),
        mime_type,
        blob: response.body,
    })
}

/// `DELETE` the resource. A 404 counts as success with
/// `resource_existed == false`.
pub async fn delete_resource(context: &PodContext, uri: &str) -> ResourceResult<DeleteSuccess> {
    let response = send(context, uri, HttpRequest::delete(uri)).await?;
    let resource_existed = response.status != 404;
    if resource_existed {
        check_response(uri, &response)?;
    }
    forget_locally(context, uri);
    info!(uri, resource_existed, "deleted resource");
    Ok(DeleteSuccess {
        uri: uri.to_string(),
        resource_existed,
    })
}

/// Body and content type for a new resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewContent {
    pub mime_type: String,
    pub body: Bytes,
}

impl NewContent {
    /// An empty Turtle document (or container).
    pub fn turtle() -> Self {
        Self {
            mime_type: media::TURTLE.to_string(),
            body: Bytes::new(),
        }
    }

    pub fn binary(mime_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            mime_type: mime_type.into(),
            body: body.into(),
        }
    }
}

/// The triples a new leaf will hold once created. Turtle bodies are parsed
/// up front so a document the pod would store is also what the graph shows.
fn initial_triples(context: &PodContext, uri: &str, content: &NewContent) -> ResourceResult<Vec<Quad>> {
    if is_container_uri(uri) || content.mime_type != media::TURTLE {
        return Ok(Vec::new());
    }
    let text = std::str::from_utf8(&content.body)
        .map_err(|e| ResourceError::unexpected(uri, format!("Turtle body is not UTF-8: {e}")))?;
    context
        .codec()
        .parse(text, uri)
        .map_err(|e| ResourceError::unexpected(uri, format!("Turtle body does not parse: {e}")))
}

/// Create the resource by `POST`ing to its parent with a `Slug`.
///
/// With `overwrite` the resource is deleted first and any delete failure
/// aborts. Without it the resource is read first and left alone if present.
/// A Turtle body is loaded into the resource's graph once the pod accepts it.
pub async fn create_resource(
    context: &PodContext,
    uri: &str,
    content: NewContent,
    overwrite: bool,
) -> ResourceResult<CreateOutcome> {
    let triples = initial_triples(context, uri, &content)?;
    let mut did_overwrite = false;
    if overwrite {
        did_overwrite = delete_resource(context, uri).await?.resource_existed;
    } else {
        let existing = read_resource(context, uri).await?;
        if !existing.is_absent() {
            debug!(uri, "resource already exists");
            return Ok(CreateOutcome::AlreadyExists(existing));
        }
    }

    let parent = parent_uri(uri)
        .ok_or_else(|| ResourceError::invalid_uri(uri, "the top of a URI hierarchy cannot be created"))?;
    let mut request = HttpRequest::post(&parent)
        .header(headers::SLUG, slug(uri))
        .header(headers::CONTENT_TYPE, content.mime_type.as_str());
    if is_container_uri(uri) {
        request = request.header(headers::LINK, format_link(ldp::CONTAINER, "type"));
    }
    let response = send(context, uri, request.body(content.body)).await?;
    check_response(uri, &response)?;

    let loaded = triples.len();
    context.dataset().replace_graph(&GraphName::named(uri), triples);
    propagate_containment(context.dataset().as_ref(), uri);
    info!(uri, parent = %parent, did_overwrite, triples = loaded, "created resource");
    Ok(CreateOutcome::Created {
        uri: uri.to_string(),
        did_overwrite,
    })
}

/// `HEAD` the container and report whether it advertises `pim:Storage`.
pub async fn check_root(context: &PodContext, uri: &str) -> ResourceResult<bool> {
    let response = send(context, uri, HttpRequest::head(uri)).await?;
    check_response(uri, &response)?;
    let is_root = is_storage_root(&response, uri);
    debug!(uri, is_root, "checked for storage root");
    Ok(is_root)
}

/// Apply `changes` to the leaf's graph and `PATCH` them to the pod.
///
/// The local edit is made first and undone if the request fails, so the
/// graph always ends up matching the pod's last accepted state.
pub async fn update_leaf(
    context: &PodContext,
    uri: &str,
    changes: &DatasetChanges,
) -> ResourceResult<UpdateSuccess> {
    let graph = GraphName::named(uri);
    let dataset = context.dataset();
    let snapshot = dataset.graph_quads(&graph);
    dataset.apply(changes);

    let patched = async {
        let request = HttpRequest::patch(uri)
            .header(headers::CONTENT_TYPE, media::SPARQL_UPDATE)
            .body(update_body(changes));
        let response = send(context, uri, request).await?;
        check_response(uri, &response)
    }
    .await;

    match patched {
        Ok(()) => {
            propagate_containment(dataset.as_ref(), uri);
            info!(
                uri,
                added = changes.added.len(),
                removed = changes.removed.len(),
                "patched resource"
            );
            Ok(UpdateSuccess::Leaf { uri: uri.to_string() })
        }
        Err(e) => {
            dataset.replace_graph(&graph, snapshot);
            debug!(uri, error = %e, "rolled back local changes");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containment::contained_uris;
    use pod_protocol::{InMemoryPod, Method};
    use pod_types::{Quad, Term};
    use std::sync::Arc;

    const ROOT: &str = "https://pod.example/";

    fn setup() -> (Arc<InMemoryPod>, Arc<PodContext>) {
        let pod = Arc::new(InMemoryPod::new(ROOT));
        let context = PodContext::builder(pod.clone()).build();
        (pod, context)
    }

    #[tokio::test]
    async fn reading_turtle_fills_graph_and_parents() {
        let (pod, context) = setup();
        pod.add_turtle(
            "https://pod.example/a/doc.ttl",
            "<#me> <http://xmlns.com/foaf/0.1/name> \"Alice\" .",
        );

        let read = read_resource(&context, "https://pod.example/a/doc.ttl").await.unwrap();
        assert_eq!(read.kind(), "dataReadSuccess");
        let graph = GraphName::named("https://pod.example/a/doc.ttl");
        let quads = context.dataset().graph_quads(&graph);
        assert_eq!(quads.len(), 1);
        assert_eq!(quads[0].subject, Term::iri("https://pod.example/a/doc.ttl#me"));
        assert_eq!(
            contained_uris(context.dataset().as_ref(), "https://pod.example/a/"),
            vec!["https://pod.example/a/doc.ttl"]
        );
    }

    #[tokio::test]
    async fn reading_turtle_with_a_collection() {
        let (pod, context) = setup();
        let uri = "https://pod.example/list.ttl";
        pod.add_turtle(uri, "<#s> <http://ex/p> ( \"a\" \"b\" ) .");

        let read = read_resource(&context, uri).await.unwrap();
        assert_eq!(read.kind(), "dataReadSuccess");
        let quads = context.dataset().graph_quads(&GraphName::named(uri));
        // the link to the list, two rdf:first and two rdf:rest
        assert_eq!(quads.len(), 5);
        assert!(quads.iter().any(|q| q.object == Term::literal("b")));
    }

    #[tokio::test]
    async fn reading_a_container_reports_root() {
        let (_pod, context) = setup();
        let read = read_resource(&context, ROOT).await.unwrap();
        assert_eq!(read, ReadSuccess::Container { uri: ROOT.into(), is_root: true });
    }

    #[tokio::test]
    async fn binary_and_absent_reads() {
        let (pod, context) = setup();
        pod.add_document("https://pod.example/cat.png", "image/png", vec![1u8, 2, 3]);

        match read_resource(&context, "https://pod.example/cat.png").await.unwrap() {
            ReadSuccess::Binary { mime_type, blob, .. } => {
                assert_eq!(mime_type, "image/png");
                assert_eq!(&blob[..], &[1u8, 2, 3][..]);
            }
            other => panic!("unexpected read {other:?}"),
        }

        let read = read_resource(&context, "https://pod.example/nope.ttl").await.unwrap();
        assert!(read.is_absent());
    }

    #[tokio::test]
    async fn missing_content_type_is_noncompliant() {
        let (pod, context) = setup();
        pod.add_document("https://pod.example/raw", "", Bytes::from_static(b"??"));
        let err = read_resource(&context, "https://pod.example/raw").await.unwrap_err();
        assert_eq!(err.kind(), "noncompliantPodError");
    }

    #[tokio::test]
    async fn read_errors_are_classified() {
        let (pod, context) = setup();
        pod.fail(Method::Get, "https://pod.example/private.ttl", 401);
        pod.fail(Method::Get, "https://pod.example/broken.ttl", 503);
        pod.fail(Method::Get, "https://pod.example/odd.ttl", 418);

        let mut kinds = Vec::new();
        for name in ["private.ttl", "broken.ttl", "odd.ttl"] {
            let err = read_resource(&context, &format!("{ROOT}{name}")).await.unwrap_err();
            kinds.push(err.kind());
        }
        assert_eq!(kinds, vec!["unauthenticatedError", "serverError", "unexpectedHttpError"]);
    }

    #[tokio::test]
    async fn create_posts_to_parent_with_slug() {
        let (pod, context) = setup();
        let created = create_resource(&context, "https://pod.example/photos/", NewContent::turtle(), false)
            .await
            .unwrap();
        assert_eq!(created.kind(), "createSuccess");
        assert!(pod.exists("https://pod.example/photos/"));

        let post = pod.requests().into_iter().find(|r| r.method == Method::Post).unwrap();
        assert_eq!(post.uri, ROOT);
        assert!(post.headers.iter().any(|(k, v)| k == headers::SLUG && v == "photos"));
        assert!(post.headers.iter().any(|(k, v)| k == headers::LINK && v.contains(ldp::CONTAINER)));
        assert_eq!(contained_uris(context.dataset().as_ref(), ROOT), vec!["https://pod.example/photos/"]);
    }

    #[tokio::test]
    async fn created_turtle_is_loaded_into_graph() {
        let (pod, context) = setup();
        let uri = "https://pod.example/notes.ttl";
        let body = "<#n> <http://ex/title> \"first\" .";
        create_resource(&context, uri, NewContent::binary(media::TURTLE, body), false)
            .await
            .unwrap();

        assert!(pod.exists(uri));
        let quads = context.dataset().graph_quads(&GraphName::named(uri));
        assert_eq!(quads.len(), 1);
        assert_eq!(quads[0].subject, Term::iri("https://pod.example/notes.ttl#n"));
    }

    #[tokio::test]
    async fn malformed_turtle_is_never_sent() {
        let (pod, context) = setup();
        let uri = "https://pod.example/bad.ttl";
        let err = create_resource(&context, uri, NewContent::binary(media::TURTLE, "<#n> <oops"), true)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "unexpectedResourceError");
        assert!(pod.requests().is_empty());
    }

    #[tokio::test]
    async fn patch_failure_restores_graph() {
        let (pod, context) = setup();
        let uri = "https://pod.example/doc.ttl";
        pod.add_turtle(uri, "<#a> <http://ex/p> <http://ex/o> .");
        read_resource(&context, uri).await.unwrap();
        let before = context.dataset().graph_quads(&GraphName::named(uri));

        pod.fail(Method::Patch, uri, 500);
        let changes = DatasetChanges::new()
            .with_added(Quad::iris("https://pod.example/doc.ttl#b", "http://ex/p", "http://ex/o", GraphName::named(uri)))
            .with_removed(before[0].clone());
        let err = update_leaf(&context, uri, &changes).await.unwrap_err();
        assert_eq!(err.kind(), "serverError");
        assert_eq!(context.dataset().graph_quads(&GraphName::named(uri)), before);
    }
}
