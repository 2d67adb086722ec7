//! ACL discovery and the HTTP side of reading and writing rules.

use tracing::{debug, info};

use pod_protocol::{
    check_response, headers, links_with_rel, media, transport_failure, HttpRequest, HttpTransport,
};
use pod_store::RdfCodec;
use pod_types::vocab::pim;
use pod_types::{parent_uri, ResourceError, ResourceResult, WacRule};

use crate::rule::{parse_wac_rule, wac_rule_to_quads, ACL_PREFIXES};

/// Outcome of fetching an ACL document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AclDocument {
    Found(WacRule),
    /// The document does not exist; the resource inherits its rules.
    Absent,
}

/// The rule governing a resource and where it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EffectiveRule {
    /// The resource whose own ACL supplied the rule: the queried resource
    /// itself or one of its ancestors.
    pub resource_uri: String,
    pub acl_uri: String,
    pub rule: WacRule,
}

/// What a `HEAD` on a resource says about its access control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AclLink {
    pub acl_uri: String,
    /// The resource advertised itself as a storage root, so no ancestor
    /// ACL can apply to it.
    pub is_storage_root: bool,
}

/// `HEAD` `uri` and read its single `rel="acl"` link along with its
/// storage-root status.
pub async fn get_wac_link(transport: &dyn HttpTransport, uri: &str) -> ResourceResult<AclLink> {
    let response = transport
        .send(HttpRequest::head(uri))
        .await
        .map_err(|e| transport_failure(uri, e))?;
    check_response(uri, &response)?;

    let mut acl_links = links_with_rel(&response, "acl", uri);
    if acl_links.len() != 1 {
        return Err(ResourceError::noncompliant(
            uri,
            format!("expected exactly one rel=\"acl\" link, found {}", acl_links.len()),
        ));
    }
    let is_storage_root = links_with_rel(&response, "type", uri)
        .iter()
        .any(|t| t == pim::STORAGE_TYPE);
    Ok(AclLink {
        acl_uri: acl_links.remove(0),
        is_storage_root,
    })
}

/// The URI of the ACL document attached to `uri`, from the `rel="acl"`
/// link of a `HEAD` response.
///
/// A 404 is reported as a not-found HTTP error. Zero or several ACL links
/// make the pod noncompliant.
pub async fn get_wac_uri(transport: &dyn HttpTransport, uri: &str) -> ResourceResult<String> {
    get_wac_link(transport, uri).await.map(|link| link.acl_uri)
}

/// Fetch and parse the ACL document at `acl_uri`.
pub async fn get_wac_rule_with_acl_uri(
    transport: &dyn HttpTransport,
    codec: &dyn RdfCodec,
    acl_uri: &str,
) -> ResourceResult<AclDocument> {
    let response = transport
        .send(HttpRequest::get(acl_uri).header(headers::ACCEPT, media::TURTLE))
        .await
        .map_err(|e| transport_failure(acl_uri, e))?;
    if response.status == 404 {
        return Ok(AclDocument::Absent);
    }
    check_response(acl_uri, &response)?;

    let quads = codec
        .parse(&response.text(), acl_uri)
        .map_err(|e| ResourceError::noncompliant(acl_uri, format!("malformed ACL document: {e}")))?;
    Ok(AclDocument::Found(parse_wac_rule(&quads)))
}

/// The rule in effect for `uri`.
///
/// When a resource has no ACL document of its own, the nearest ancestor
/// container's document applies. Reaching the storage root (or the top of
/// the URI hierarchy) without finding one makes the pod noncompliant.
pub async fn get_wac_rule(
    transport: &dyn HttpTransport,
    codec: &dyn RdfCodec,
    uri: &str,
) -> ResourceResult<EffectiveRule> {
    let mut current = uri.to_string();
    loop {
        let link = get_wac_link(transport, &current).await?;
        match get_wac_rule_with_acl_uri(transport, codec, &link.acl_uri).await? {
            AclDocument::Found(rule) => {
                debug!(uri, governing = %current, acl = %link.acl_uri, "resolved access rule");
                return Ok(EffectiveRule {
                    resource_uri: current,
                    acl_uri: link.acl_uri,
                    rule,
                });
            }
            AclDocument::Absent => {
                let parent = parent_uri(&current).filter(|_| !link.is_storage_root);
                match parent {
                    Some(parent) => current = parent,
                    None => {
                        return Err(ResourceError::noncompliant(
                            uri,
                            format!("no ACL document found up to {current}"),
                        ))
                    }
                }
            }
        }
    }
}

/// Replace the ACL document at `acl_uri` with one expressing `rule` for
/// `access_to`.
pub async fn set_wac_rule(
    transport: &dyn HttpTransport,
    codec: &dyn RdfCodec,
    acl_uri: &str,
    rule: &WacRule,
    access_to: &str,
) -> ResourceResult<()> {
    let quads = wac_rule_to_quads(rule, acl_uri, access_to);
    let body = codec.serialize(&quads, ACL_PREFIXES);
    let response = transport
        .send(
            HttpRequest::put(acl_uri)
                .header(headers::CONTENT_TYPE, codec.media_type())
                .body(body),
        )
        .await
        .map_err(|e| transport_failure(acl_uri, e))?;
    check_response(acl_uri, &response)?;
    info!(acl = acl_uri, access_to, authorizations = quads.len(), "wrote access rule");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pod_protocol::{InMemoryPod, Method};
    use pod_store::TurtleCodec;
    use pod_types::AccessModeList;

    const ROOT: &str = "https://pod.example/";
    const ALICE: &str = "https://alice.example/profile/card#me";

    fn pod() -> InMemoryPod {
        let pod = InMemoryPod::new(ROOT);
        pod.add_turtle("https://pod.example/docs/notes.ttl", "");
        pod
    }

    #[tokio::test]
    async fn wac_uri_is_resolved_from_link() {
        let pod = pod();
        let acl = get_wac_uri(&pod, "https://pod.example/docs/notes.ttl").await.unwrap();
        assert_eq!(acl, "https://pod.example/docs/notes.ttl.acl");
        let acl = get_wac_uri(&pod, "https://pod.example/docs/").await.unwrap();
        assert_eq!(acl, "https://pod.example/docs/.acl");
    }

    #[tokio::test]
    async fn link_reports_storage_root() {
        let pod = pod();
        let link = get_wac_link(&pod, ROOT).await.unwrap();
        assert!(link.is_storage_root);
        assert_eq!(link.acl_uri, "https://pod.example/.acl");
        assert!(!get_wac_link(&pod, "https://pod.example/docs/").await.unwrap().is_storage_root);
    }

    #[tokio::test]
    async fn missing_resource_is_not_found() {
        let err = get_wac_uri(&pod(), "https://pod.example/nope.ttl").await.unwrap_err();
        assert_eq!(err.kind(), "notFoundError");
    }

    #[tokio::test]
    async fn acl_link_is_required() {
        let pod = pod();
        // ACL documents carry no acl link of their own
        pod.add_turtle("https://pod.example/docs/.acl", "");
        let err = get_wac_uri(&pod, "https://pod.example/docs/.acl").await.unwrap_err();
        assert_eq!(err.kind(), "noncompliantPodError");
    }

    #[tokio::test]
    async fn several_acl_links_are_noncompliant() {
        let pod = pod();
        pod.add_link("https://pod.example/docs/notes.ttl", "https://pod.example/shared.acl", "acl");
        let err = get_wac_uri(&pod, "https://pod.example/docs/notes.ttl").await.unwrap_err();
        assert_eq!(err.kind(), "noncompliantPodError");
        assert!(err.to_string().contains("found 2"));
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let pod = pod();
        let uri = "https://pod.example/docs/";
        let rule = WacRule::new()
            .with_public(AccessModeList::read_only())
            .with_authenticated(AccessModeList::from_letters("r,a"))
            .with_agent(ALICE, AccessModeList::all())
            .with_agent("https://nobody.example/#me", AccessModeList::none());

        let acl = get_wac_uri(&pod, uri).await.unwrap();
        set_wac_rule(&pod, &TurtleCodec, &acl, &rule, uri).await.unwrap();
        assert_eq!(pod.request_count(Method::Put, &acl), 1);

        let effective = get_wac_rule(&pod, &TurtleCodec, uri).await.unwrap();
        assert_eq!(effective.resource_uri, uri);
        assert_eq!(effective.acl_uri, acl);
        assert_eq!(effective.rule, rule.normalized());
        assert!(!effective.rule.agent.contains_key("https://nobody.example/#me"));
    }

    #[tokio::test]
    async fn rule_is_inherited_from_nearest_ancestor() {
        let pod = pod();
        let root_rule = WacRule::new().with_agent(ALICE, AccessModeList::all());
        set_wac_rule(&pod, &TurtleCodec, "https://pod.example/.acl", &root_rule, ROOT).await.unwrap();

        let effective = get_wac_rule(&pod, &TurtleCodec, "https://pod.example/docs/notes.ttl").await.unwrap();
        assert_eq!(effective.resource_uri, ROOT);
        assert_eq!(effective.rule, root_rule);
        // notes.ttl, docs/, then the root
        assert_eq!(pod.requests().iter().filter(|r| r.method == Method::Head).count(), 3);
    }

    #[tokio::test]
    async fn no_acl_up_to_root_is_noncompliant() {
        let err = get_wac_rule(&pod(), &TurtleCodec, "https://pod.example/docs/notes.ttl")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "noncompliantPodError");
    }

    #[tokio::test]
    async fn server_errors_propagate() {
        let pod = pod();
        pod.fail(Method::Get, "https://pod.example/docs/notes.ttl.acl", 500);
        let err = get_wac_rule(&pod, &TurtleCodec, "https://pod.example/docs/notes.ttl")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "serverError");
    }
}
