//! An in-process pod speaking the subset of LDP/WAC the client uses.
//!
//! Every request is recorded, so callers can assert on exactly which
//! requests were made. Faults can be injected per method and URI.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::trace;

use pod_store::{RdfCodec, TurtleCodec};
use pod_types::vocab::{ldp, notify, pim, rdf, solid};
use pod_types::{child_uri, is_container_uri, normalize_uri, parent_uri, slug, GraphName, Quad};

use crate::error::ProtocolResult;
use crate::http::{headers, media, HttpRequest, HttpResponse, Method};
use crate::link::{format_link, parse_link_header};
use crate::notification::{ChannelDescription, SubscriptionRequest};
use crate::sparql::parse_update_body;
use crate::transport::HttpTransport;

/// A request as the pod received it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestRecord {
    pub method: Method,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

#[derive(Clone, Debug)]
struct Document {
    content_type: String,
    body: Bytes,
}

#[derive(Debug)]
struct Fault {
    method: Method,
    uri: String,
    status: u16,
    remaining: Option<usize>,
}

#[derive(Debug)]
struct NotificationEndpoint {
    receive_base: String,
    issued: usize,
}

#[derive(Debug, Default)]
struct PodState {
    containers: BTreeSet<String>,
    documents: BTreeMap<String, Document>,
    roots: BTreeSet<String>,
    faults: Vec<Fault>,
    log: Vec<RequestRecord>,
    notifications: Option<NotificationEndpoint>,
    extra_links: Vec<(String, String)>,
    latency: Duration,
}

/// In-memory pod implementing [`HttpTransport`].
pub struct InMemoryPod {
    root: String,
    state: RwLock<PodState>,
}

impl InMemoryPod {
    /// A pod whose storage root is `root` (a container URI).
    pub fn new(root: &str) -> Self {
        let root = if root.ends_with('/') {
            root.to_string()
        } else {
            format!("{root}/")
        };
        let mut state = PodState::default();
        state.containers.insert(root.clone());
        state.roots.insert(root.clone());
        Self {
            root,
            state: RwLock::new(state),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// URI of the storage description document.
    pub fn description_uri(&self) -> String {
        format!("{}.well-known/solid", self.root)
    }

    /// URI of the `WebSocketChannel2023` subscription endpoint.
    pub fn subscription_uri(&self) -> String {
        format!("{}.notifications/WebSocketChannel2023/", self.root)
    }

    pub fn add_container(&self, uri: &str) {
        let mut state = self.state.write().expect("lock poisoned");
        state.ensure_container(uri);
    }

    pub fn add_document(&self, uri: &str, content_type: &str, body: impl Into<Bytes>) {
        let mut state = self.state.write().expect("lock poisoned");
        state.store_document(
            uri,
            Document {
                content_type: content_type.to_string(),
                body: body.into(),
            },
        );
    }

    pub fn add_turtle(&self, uri: &str, text: &str) {
        self.add_document(uri, media::TURTLE, text.to_string());
    }

    /// Also send `Link: <target>; rel="rel"` on responses for `uri`.
    pub fn add_link(&self, uri: &str, target: &str, rel: &str) {
        self.state
            .write()
            .expect("lock poisoned")
            .extra_links
            .push((uri.to_string(), format_link(target, rel)));
    }

    /// Advertise `uri` as a storage root (`pim:Storage`).
    pub fn mark_root(&self, uri: &str) {
        self.state.write().expect("lock poisoned").roots.insert(uri.to_string());
    }

    pub fn unmark_root(&self, uri: &str) {
        self.state.write().expect("lock poisoned").roots.remove(uri);
    }

    /// Serve a storage description and a subscription endpoint handing out
    /// `receive_base` + a counter as channel addresses.
    pub fn enable_notifications(&self, receive_base: &str) {
        self.state.write().expect("lock poisoned").notifications = Some(NotificationEndpoint {
            receive_base: receive_base.to_string(),
            issued: 0,
        });
    }

    /// Answer every `method` request to `uri` with `status`.
    pub fn fail(&self, method: Method, uri: &str, status: u16) {
        self.push_fault(method, uri, status, None);
    }

    /// Answer the next `times` `method` requests to `uri` with `status`.
    pub fn fail_times(&self, method: Method, uri: &str, status: u16, times: usize) {
        self.push_fault(method, uri, status, Some(times));
    }

    fn push_fault(&self, method: Method, uri: &str, status: u16, remaining: Option<usize>) {
        self.state.write().expect("lock poisoned").faults.push(Fault {
            method,
            uri: uri.to_string(),
            status,
            remaining,
        });
    }

    pub fn clear_faults(&self) {
        self.state.write().expect("lock poisoned").faults.clear();
    }

    /// Delay every response by `latency` (on the tokio clock).
    pub fn set_latency(&self, latency: Duration) {
        self.state.write().expect("lock poisoned").latency = latency;
    }

    pub fn requests(&self) -> Vec<RequestRecord> {
        self.state.read().expect("lock poisoned").log.clone()
    }

    pub fn request_count(&self, method: Method, uri: &str) -> usize {
        self.state
            .read()
            .expect("lock poisoned")
            .log
            .iter()
            .filter(|r| r.method == method && r.uri == uri)
            .count()
    }

    /// `(method, uri)` of every request so far, in arrival order.
    pub fn request_lines(&self) -> Vec<(Method, String)> {
        self.state
            .read()
            .expect("lock poisoned")
            .log
            .iter()
            .map(|r| (r.method, r.uri.clone()))
            .collect()
    }

    pub fn clear_requests(&self) {
        self.state.write().expect("lock poisoned").log.clear();
    }

    pub fn exists(&self, uri: &str) -> bool {
        let state = self.state.read().expect("lock poisoned");
        state.containers.contains(uri) || state.documents.contains_key(uri)
    }

    /// Stored content type and body of a non-container resource.
    pub fn document(&self, uri: &str) -> Option<(String, Bytes)> {
        self.state
            .read()
            .expect("lock poisoned")
            .documents
            .get(uri)
            .map(|d| (d.content_type.clone(), d.body.clone()))
    }

    pub fn document_text(&self, uri: &str) -> Option<String> {
        self.document(uri)
            .map(|(_, body)| String::from_utf8_lossy(&body).into_owned())
    }

    fn is_auxiliary(&self, uri: &str) -> bool {
        slug(uri).ends_with(".acl")
            || uri.starts_with(&format!("{}.well-known/", self.root))
            || uri.starts_with(&format!("{}.notifications/", self.root))
    }

    fn handle(&self, state: &mut PodState, request: &HttpRequest, uri: &str) -> HttpResponse {
        match request.method {
            Method::Get => self.get(state, uri, false),
            Method::Head => self.get(state, uri, true),
            Method::Post => self.post(state, request, uri),
            Method::Put => self.put(state, request, uri),
            Method::Patch => self.patch(state, request, uri),
            Method::Delete => self.delete(state, uri),
        }
    }

    fn resource_headers(&self, state: &PodState, uri: &str) -> HttpResponse {
        let mut response = HttpResponse::new(200);
        if state.containers.contains(uri) {
            for ty in [ldp::BASIC_CONTAINER, ldp::CONTAINER, ldp::RESOURCE] {
                response = response.with_header(headers::LINK, format_link(ty, "type"));
            }
        } else {
            response = response.with_header(headers::LINK, format_link(ldp::RESOURCE, "type"));
        }
        if state.roots.contains(uri) {
            response = response.with_header(headers::LINK, format_link(pim::STORAGE_TYPE, "type"));
        }
        if !self.is_auxiliary(uri) {
            let acl = if is_container_uri(uri) {
                ".acl".to_string()
            } else {
                format!("{}.acl", slug(uri))
            };
            response = response.with_header(headers::LINK, format_link(&acl, "acl"));
        }
        if state.notifications.is_some() {
            response = response.with_header(
                headers::LINK,
                format_link(&self.description_uri(), solid::STORAGE_DESCRIPTION),
            );
        }
        for (_, link) in state.extra_links.iter().filter(|(target, _)| target == uri) {
            response = response.with_header(headers::LINK, link.clone());
        }
        response
    }

    fn children(&self, state: &PodState, uri: &str) -> Vec<String> {
        state
            .containers
            .iter()
            .chain(state.documents.keys())
            .filter(|child| parent_uri(child).as_deref() == Some(uri) && !self.is_auxiliary(child))
            .cloned()
            .collect()
    }

    fn get(&self, state: &PodState, uri: &str, head: bool) -> HttpResponse {
        if state.notifications.is_some() && uri == self.description_uri() {
            let description = self.description_uri();
            let subscription = self.subscription_uri();
            let quads = vec![
                Quad::iris(&description, rdf::TYPE, pim::STORAGE_TYPE, GraphName::DefaultGraph),
                Quad::iris(&description, notify::SUBSCRIPTION, &subscription, GraphName::DefaultGraph),
                Quad::iris(&subscription, notify::CHANNEL_TYPE, notify::WEBSOCKET_CHANNEL_2023, GraphName::DefaultGraph),
            ];
            let body = TurtleCodec.serialize(&quads, &[("notify", notify::NS)]);
            return HttpResponse::new(200)
                .with_header(headers::CONTENT_TYPE, media::TURTLE)
                .with_body(if head { String::new() } else { body });
        }

        if state.containers.contains(uri) {
            let graph = GraphName::DefaultGraph;
            let mut quads = vec![
                Quad::iris(uri, rdf::TYPE, ldp::CONTAINER, graph.clone()),
                Quad::iris(uri, rdf::TYPE, ldp::BASIC_CONTAINER, graph.clone()),
            ];
            for child in self.children(state, uri) {
                quads.push(Quad::iris(uri, ldp::CONTAINS, &child, graph.clone()));
                quads.push(Quad::iris(&child, rdf::TYPE, ldp::RESOURCE, graph.clone()));
            }
            let body = TurtleCodec.serialize(&quads, &[("ldp", ldp::NS)]);
            return self
                .resource_headers(state, uri)
                .with_header(headers::CONTENT_TYPE, media::TURTLE)
                .with_body(if head { String::new() } else { body });
        }

        match state.documents.get(uri) {
            Some(doc) => self
                .resource_headers(state, uri)
                .with_header(headers::CONTENT_TYPE, doc.content_type.clone())
                .with_body(if head { Bytes::new() } else { doc.body.clone() }),
            None => HttpResponse::new(404),
        }
    }

    fn post(&self, state: &mut PodState, request: &HttpRequest, uri: &str) -> HttpResponse {
        if uri == self.subscription_uri() {
            return self.subscribe(state, request);
        }
        if !state.containers.contains(uri) {
            return HttpResponse::new(404);
        }

        let wants_container = request
            .header_values(headers::LINK)
            .flat_map(parse_link_header)
            .any(|l| l.has_rel("type") && (l.target == ldp::CONTAINER || l.target == ldp::BASIC_CONTAINER));
        let name = request
            .header_value(headers::SLUG)
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let mut target = child_uri(uri, &name);
        if wants_container {
            target.push('/');
        }
        if state.containers.contains(&target) || state.documents.contains_key(&target) {
            return HttpResponse::new(409);
        }

        if wants_container {
            state.ensure_container(&target);
        } else {
            let content_type = request
                .header_value(headers::CONTENT_TYPE)
                .unwrap_or("application/octet-stream")
                .to_string();
            state.store_document(
                &target,
                Document {
                    content_type,
                    body: request.body.clone(),
                },
            );
        }
        HttpResponse::new(201).with_header(headers::LOCATION, target)
    }

    fn subscribe(&self, state: &mut PodState, request: &HttpRequest) -> HttpResponse {
        let Some(endpoint) = state.notifications.as_mut() else {
            return HttpResponse::new(404);
        };
        let Ok(subscription) = serde_json::from_slice::<SubscriptionRequest>(&request.body) else {
            return HttpResponse::new(400);
        };
        if subscription.channel_type != notify::WEBSOCKET_CHANNEL_2023 {
            return HttpResponse::new(422);
        }
        endpoint.issued += 1;
        let description = ChannelDescription {
            id: Some(format!("{}{}", self.subscription_uri(), endpoint.issued)),
            channel_type: Some(notify::WEBSOCKET_CHANNEL_2023.to_string()),
            topic: Some(subscription.topic),
            receive_from: format!("{}{}", endpoint.receive_base, endpoint.issued),
        };
        match serde_json::to_vec(&description) {
            Ok(body) => HttpResponse::new(200)
                .with_header(headers::CONTENT_TYPE, media::JSON_LD)
                .with_body(body),
            Err(_) => HttpResponse::new(500),
        }
    }

    fn put(&self, state: &mut PodState, request: &HttpRequest, uri: &str) -> HttpResponse {
        if is_container_uri(uri) {
            if state.containers.contains(uri) {
                return HttpResponse::new(205);
            }
            state.ensure_container(uri);
            return HttpResponse::new(201);
        }
        let existed = state.documents.contains_key(uri);
        let content_type = request
            .header_value(headers::CONTENT_TYPE)
            .unwrap_or("application/octet-stream")
            .to_string();
        state.store_document(
            uri,
            Document {
                content_type,
                body: request.body.clone(),
            },
        );
        HttpResponse::new(if existed { 205 } else { 201 })
    }

    fn patch(&self, state: &mut PodState, request: &HttpRequest, uri: &str) -> HttpResponse {
        let is_sparql = request
            .header_value(headers::CONTENT_TYPE)
            .map(|ct| ct.starts_with(media::SPARQL_UPDATE))
            .unwrap_or(false);
        if !is_sparql || is_container_uri(uri) {
            return HttpResponse::new(415);
        }
        let existing = match state.documents.get(uri) {
            Some(doc) if doc.content_type != media::TURTLE => return HttpResponse::new(409),
            Some(doc) => String::from_utf8_lossy(&doc.body).into_owned(),
            None => String::new(),
        };
        let Ok(text) = std::str::from_utf8(&request.body) else {
            return HttpResponse::new(400);
        };
        let Ok((removed, added)) = parse_update_body(text, uri) else {
            return HttpResponse::new(400);
        };
        let Ok(current) = TurtleCodec.parse(&existing, uri) else {
            return HttpResponse::new(500);
        };

        let mut triples: BTreeSet<Quad> = current.into_iter().collect();
        for quad in &removed {
            if !triples.remove(quad) {
                return HttpResponse::new(409);
            }
        }
        let existed = state.documents.contains_key(uri);
        triples.extend(added);
        let quads: Vec<Quad> = triples.into_iter().collect();
        state.store_document(
            uri,
            Document {
                content_type: media::TURTLE.to_string(),
                body: Bytes::from(TurtleCodec.serialize(&quads, &[])),
            },
        );
        HttpResponse::new(if existed { 205 } else { 201 })
    }

    fn delete(&self, state: &mut PodState, uri: &str) -> HttpResponse {
        if uri == self.root {
            return HttpResponse::new(405);
        }
        if state.containers.contains(uri) {
            if !self.children(state, uri).is_empty() {
                return HttpResponse::new(409);
            }
            state.containers.remove(uri);
            state.documents.remove(&format!("{uri}.acl"));
            return HttpResponse::new(205);
        }
        if state.documents.remove(uri).is_some() {
            state.documents.remove(&format!("{uri}.acl"));
            return HttpResponse::new(205);
        }
        HttpResponse::new(404)
    }
}

impl PodState {
    fn ensure_container(&mut self, uri: &str) {
        let mut current = Some(uri.to_string());
        while let Some(container) = current {
            current = parent_uri(&container);
            if !self.containers.insert(container) {
                break;
            }
        }
    }

    fn store_document(&mut self, uri: &str, document: Document) {
        if let Some(parent) = parent_uri(uri) {
            self.ensure_container(&parent);
        }
        self.documents.insert(uri.to_string(), document);
    }

    fn take_fault(&mut self, method: Method, uri: &str) -> Option<u16> {
        let idx = self
            .faults
            .iter()
            .position(|f| f.method == method && f.uri == uri && f.remaining != Some(0))?;
        let fault = &mut self.faults[idx];
        if let Some(remaining) = fault.remaining.as_mut() {
            *remaining -= 1;
        }
        Some(fault.status)
    }
}

#[async_trait]
impl HttpTransport for InMemoryPod {
    async fn send(&self, request: HttpRequest) -> ProtocolResult<HttpResponse> {
        let uri = normalize_uri(&request.uri).to_string();
        let latency = {
            let mut state = self.state.write().expect("lock poisoned");
            state.log.push(RequestRecord {
                method: request.method,
                uri: uri.clone(),
                headers: request.headers.clone(),
                body: request.body.clone(),
            });
            state.latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.write().expect("lock poisoned");
        let response = match state.take_fault(request.method, &uri) {
            Some(status) => HttpResponse::new(status),
            None => self.handle(&mut state, &request, &uri),
        };
        trace!(method = %request.method, uri = %uri, status = response.status, "in-memory pod");
        Ok(response)
    }
}

impl std::fmt::Debug for InMemoryPod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read().expect("lock poisoned");
        f.debug_struct("InMemoryPod")
            .field("root", &self.root)
            .field("containers", &state.containers.len())
            .field("documents", &state.documents.len())
            .field("requests", &state.log.len())
            .finish()
    }
}
