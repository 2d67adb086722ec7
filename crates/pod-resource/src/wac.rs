//! Cached access-control lookups on resources.
//!
//! Each resource remembers its own ACL document once fetched. The rule in
//! effect for a resource without its own document comes from the nearest
//! ancestor that has one, reusing each ancestor's cache on the way up.

use std::sync::Arc;

use tracing::debug;

use pod_types::{parent_uri, ResourceError, ResourceResult, WacRule};
use pod_wac::{AclDocument, EffectiveRule};

use crate::requester::OwnAcl;
use crate::resource::{Container, Leaf, Resource, ResourceCore};

impl ResourceCore {
    fn cached_acl(&self) -> Option<OwnAcl> {
        self.acl.lock().expect("lock poisoned").clone()
    }

    async fn own_acl(&self, ignore_cache: bool) -> ResourceResult<OwnAcl> {
        if !ignore_cache {
            if let Some(cached) = self.cached_acl() {
                return Ok(cached);
            }
        }
        let acl = self.requester.get_acl(self.context()?).await?;
        *self.acl.lock().expect("lock poisoned") = Some(acl.clone());
        Ok(acl)
    }

    async fn effective_wac(self: &Arc<Self>, ignore_cache: bool) -> ResourceResult<EffectiveRule> {
        let context = self.context()?;
        let mut current = Arc::clone(self);
        loop {
            let acl = current.own_acl(ignore_cache).await?;
            match acl.document {
                AclDocument::Found(rule) => {
                    debug!(uri = %self.uri, governing = %current.uri, "resolved effective access rule");
                    return Ok(EffectiveRule {
                        resource_uri: current.uri.clone(),
                        acl_uri: acl.link.acl_uri,
                        rule,
                    });
                }
                AclDocument::Absent => {
                    let parent = parent_uri(&current.uri).filter(|_| !acl.link.is_storage_root);
                    match parent {
                        Some(parent) => current = Arc::clone(&context.container(&parent)?.core),
                        None => {
                            return Err(ResourceError::noncompliant(
                                self.uri.as_str(),
                                format!("no ACL document found up to {}", current.uri),
                            ))
                        }
                    }
                }
            }
        }
    }

    async fn write_wac(&self, rule: &WacRule) -> ResourceResult<()> {
        let known_link = self.cached_acl().map(|acl| acl.link);
        let link = self
            .requester
            .set_acl(self.context()?, rule.clone(), known_link)
            .await?;
        *self.acl.lock().expect("lock poisoned") = Some(OwnAcl {
            link,
            document: AclDocument::Found(rule.normalized()),
        });
        Ok(())
    }
}

impl Leaf {
    /// The rule in effect for this leaf and the resource whose ACL document
    /// supplied it. Cached per resource unless `ignore_cache` is set.
    pub async fn get_wac(&self, ignore_cache: bool) -> ResourceResult<EffectiveRule> {
        self.core.effective_wac(ignore_cache).await
    }

    /// Replace this leaf's own ACL document with `rule`.
    pub async fn set_wac(&self, rule: &WacRule) -> ResourceResult<()> {
        self.core.write_wac(rule).await
    }
}

impl Container {
    pub async fn get_wac(&self, ignore_cache: bool) -> ResourceResult<EffectiveRule> {
        self.core.effective_wac(ignore_cache).await
    }

    /// Replace this container's own ACL document with `rule`. The rule also
    /// becomes the default for its descendants.
    pub async fn set_wac(&self, rule: &WacRule) -> ResourceResult<()> {
        self.core.write_wac(rule).await
    }
}

impl Resource {
    pub async fn get_wac(&self, ignore_cache: bool) -> ResourceResult<EffectiveRule> {
        self.core().effective_wac(ignore_cache).await
    }

    pub async fn set_wac(&self, rule: &WacRule) -> ResourceResult<()> {
        self.core().write_wac(rule).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PodContext;
    use pod_protocol::{InMemoryPod, Method};
    use pod_types::AccessModeList;

    const ROOT: &str = "https://pod.example/";
    const ALICE: &str = "https://alice.example/profile/card#me";

    fn setup() -> (Arc<InMemoryPod>, Arc<PodContext>) {
        let pod = Arc::new(InMemoryPod::new(ROOT));
        pod.add_turtle("https://pod.example/docs/notes.ttl", "");
        let context = PodContext::builder(pod.clone()).build();
        (pod, context)
    }

    #[tokio::test(start_paused = true)]
    async fn set_then_get_bypassing_cache() {
        let (pod, context) = setup();
        let container = context.container("https://pod.example/docs/").unwrap();
        let rule = WacRule::new()
            .with_public(AccessModeList::read_only())
            .with_authenticated(AccessModeList::from_letters("r,a"))
            .with_agent(ALICE, AccessModeList::all())
            .with_agent("https://nobody.example/#me", AccessModeList::none());

        container.set_wac(&rule).await.unwrap();
        assert_eq!(pod.request_count(Method::Put, "https://pod.example/docs/.acl"), 1);

        let effective = container.get_wac(true).await.unwrap();
        assert_eq!(effective.rule, rule.normalized());
        assert_eq!(effective.resource_uri, "https://pod.example/docs/");
        assert_eq!(effective.rule.agent.get("https://nobody.example/#me"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn inherited_rule_uses_each_resources_cache() {
        let (pod, context) = setup();
        let root_rule = WacRule::new().with_agent(ALICE, AccessModeList::all());
        context.container(ROOT).unwrap().set_wac(&root_rule).await.unwrap();

        let leaf = context.leaf("https://pod.example/docs/notes.ttl").unwrap();
        let effective = leaf.get_wac(false).await.unwrap();
        assert_eq!(effective.resource_uri, ROOT);
        assert_eq!(effective.rule, root_rule);

        pod.clear_requests();
        let again = leaf.get_wac(false).await.unwrap();
        assert_eq!(again, effective);
        assert!(pod.requests().is_empty());

        let sibling = context.leaf("https://pod.example/docs/other.ttl").unwrap();
        pod.add_turtle("https://pod.example/docs/other.ttl", "");
        sibling.get_wac(false).await.unwrap();
        // only the sibling's own ACL is fetched; docs/ and the root are cached
        assert_eq!(pod.request_count(Method::Head, "https://pod.example/docs/other.ttl"), 1);
        assert_eq!(pod.request_count(Method::Head, "https://pod.example/docs/"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_acls_are_noncompliant() {
        let (_pod, context) = setup();
        let leaf = context.leaf("https://pod.example/docs/notes.ttl").unwrap();
        let err = leaf.get_wac(false).await.unwrap_err();
        assert_eq!(err.kind(), "noncompliantPodError");
    }
}
