//! Routes a resource's requests through its [`RequestBatcher`].
//!
//! One batcher per resource serialises every request against that URI.
//! Reads, creates, deletes and root checks merge with an identical call
//! that is adjacent in the queue; updates and ACL writes never merge.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use pod_batch::{merge_adjacent, merge_with_queued_tail, never_merge, RequestBatcher, ANY_KEY};
use pod_store::DatasetChanges;
use pod_types::{ResourceError, ResourceResult, WacRule};
use pod_wac::{get_wac_link, get_wac_rule_with_acl_uri, set_wac_rule, AclDocument, AclLink};

use crate::context::PodContext;
use crate::outcome::{CreateOutcome, DeleteSuccess, ReadSuccess, UpdateSuccess};
use crate::requests::{
    check_root, create_resource, delete_resource, read_resource, update_leaf, NewContent,
};

pub const READ: &str = "read";
pub const CREATE: &str = "create";
pub const UPLOAD: &str = "upload";
pub const UPDATE: &str = "update";
pub const DELETE: &str = "delete";
pub const CHECK_ROOT: &str = "check-root";
pub const WAC: &str = "wac";

/// Arguments a queued request is compared on when deciding to merge.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum RequestArgs {
    Read,
    Create { content: NewContent, overwrite: bool },
    Update(DatasetChanges),
    Delete,
    CheckRoot,
    GetWac,
    SetWac(WacRule),
}

/// A resource's own ACL document and the link that led to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct OwnAcl {
    pub link: AclLink,
    pub document: AclDocument,
}

#[derive(Clone, Debug)]
pub(crate) enum Outcome {
    Read(ReadSuccess),
    Create(CreateOutcome),
    Update(UpdateSuccess),
    Delete(DeleteSuccess),
    Root(bool),
    Acl(OwnAcl),
    AclWritten(AclLink),
}

enum Merge {
    Adjacent,
    QueuedTail,
    Never,
}

pub(crate) struct BatchedRequester {
    uri: String,
    batcher: RequestBatcher<RequestArgs, ResourceResult<Outcome>>,
}

impl BatchedRequester {
    pub fn new(uri: impl Into<String>, batch_window: Duration) -> Self {
        Self {
            uri: uri.into(),
            batcher: RequestBatcher::new(batch_window),
        }
    }

    pub fn is_loading(&self, name: &str) -> bool {
        self.batcher.is_loading(name)
    }

    pub fn is_busy(&self) -> bool {
        self.batcher.is_loading(ANY_KEY)
    }

    async fn run<F>(&self, name: &'static str, args: RequestArgs, merge: Merge, action: F) -> ResourceResult<Outcome>
    where
        F: Future<Output = ResourceResult<Outcome>> + Send + 'static,
    {
        debug!(uri = %self.uri, name, "requesting");
        let batched = match merge {
            Merge::Adjacent => {
                self.batcher
                    .enqueue(name, args, action, |queue, running, args| {
                        merge_adjacent(name, queue, running, args, |a, b| a == b)
                    })
                    .await
            }
            Merge::QueuedTail => {
                self.batcher
                    .enqueue(name, args, action, |queue, _running, args| {
                        merge_with_queued_tail(name, queue, args, |a, b| a == b)
                    })
                    .await
            }
            Merge::Never => self.batcher.enqueue(name, args, action, never_merge).await,
        };
        batched.map_err(|e| ResourceError::unexpected(self.uri.as_str(), e))?
    }

    fn mismatch(&self, expected: &str, outcome: Outcome) -> ResourceError {
        ResourceError::unexpected(
            self.uri.as_str(),
            format!("{expected} request produced {outcome:?}"),
        )
    }

    pub async fn read(&self, context: Arc<PodContext>) -> ResourceResult<ReadSuccess> {
        let uri = self.uri.clone();
        let action = async move { read_resource(&context, &uri).await.map(Outcome::Read) };
        match self.run(READ, RequestArgs::Read, Merge::Adjacent, action).await? {
            Outcome::Read(read) => Ok(read),
            other => Err(self.mismatch(READ, other)),
        }
    }

    /// Create (`name == CREATE`) or upload (`name == UPLOAD`).
    pub async fn create(
        &self,
        context: Arc<PodContext>,
        name: &'static str,
        content: NewContent,
        overwrite: bool,
    ) -> ResourceResult<CreateOutcome> {
        let uri = self.uri.clone();
        let args = RequestArgs::Create {
            content: content.clone(),
            overwrite,
        };
        let merge = if name == UPLOAD {
            Merge::QueuedTail
        } else {
            Merge::Adjacent
        };
        let action = async move {
            create_resource(&context, &uri, content, overwrite)
                .await
                .map(Outcome::Create)
        };
        match self.run(name, args, merge, action).await? {
            Outcome::Create(created) => Ok(created),
            other => Err(self.mismatch(name, other)),
        }
    }

    pub async fn update(
        &self,
        context: Arc<PodContext>,
        changes: DatasetChanges,
    ) -> ResourceResult<UpdateSuccess> {
        let uri = self.uri.clone();
        let args = RequestArgs::Update(changes.clone());
        let action = async move { update_leaf(&context, &uri, &changes).await.map(Outcome::Update) };
        match self.run(UPDATE, args, Merge::Never, action).await? {
            Outcome::Update(updated) => Ok(updated),
            other => Err(self.mismatch(UPDATE, other)),
        }
    }

    pub async fn delete(&self, context: Arc<PodContext>) -> ResourceResult<DeleteSuccess> {
        let uri = self.uri.clone();
        let action = async move { delete_resource(&context, &uri).await.map(Outcome::Delete) };
        match self.run(DELETE, RequestArgs::Delete, Merge::Adjacent, action).await? {
            Outcome::Delete(deleted) => Ok(deleted),
            other => Err(self.mismatch(DELETE, other)),
        }
    }

    pub async fn check_root(&self, context: Arc<PodContext>) -> ResourceResult<bool> {
        let uri = self.uri.clone();
        let action = async move { check_root(&context, &uri).await.map(Outcome::Root) };
        match self.run(CHECK_ROOT, RequestArgs::CheckRoot, Merge::Adjacent, action).await? {
            Outcome::Root(is_root) => Ok(is_root),
            other => Err(self.mismatch(CHECK_ROOT, other)),
        }
    }

    pub async fn get_acl(&self, context: Arc<PodContext>) -> ResourceResult<OwnAcl> {
        let uri = self.uri.clone();
        let action = async move {
            let http = context.http().as_ref();
            let link = get_wac_link(http, &uri).await?;
            let document = get_wac_rule_with_acl_uri(http, context.codec().as_ref(), &link.acl_uri).await?;
            Ok(Outcome::Acl(OwnAcl { link, document }))
        };
        match self.run(WAC, RequestArgs::GetWac, Merge::Adjacent, action).await? {
            Outcome::Acl(acl) => Ok(acl),
            other => Err(self.mismatch(WAC, other)),
        }
    }

    /// Write `rule` as this resource's ACL. `known_link` skips the `HEAD`
    /// when the ACL location is already cached.
    pub async fn set_acl(
        &self,
        context: Arc<PodContext>,
        rule: WacRule,
        known_link: Option<AclLink>,
    ) -> ResourceResult<AclLink> {
        let uri = self.uri.clone();
        let args = RequestArgs::SetWac(rule.clone());
        let action = async move {
            let http = context.http().as_ref();
            let link = match known_link {
                Some(link) => link,
                None => get_wac_link(http, &uri).await?,
            };
            set_wac_rule(http, context.codec().as_ref(), &link.acl_uri, &rule, &uri).await?;
            Ok(Outcome::AclWritten(link))
        };
        match self.run(WAC, args, Merge::Never, action).await? {
            Outcome::AclWritten(link) => Ok(link),
            other => Err(self.mismatch(WAC, other)),
        }
    }
}

impl std::fmt::Debug for BatchedRequester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchedRequester")
            .field("uri", &self.uri)
            .field("batcher", &self.batcher)
            .finish()
    }
}
