//! HTTP wire layer for the pod client.
//!
//! Everything that touches bytes on the wire lives here: the request and
//! response types, the [`HttpTransport`] seam with its `reqwest`
//! implementation, `Link` header parsing, status classification into the
//! shared error taxonomy, SPARQL-Update bodies and notification messages.
//!
//! [`InMemoryPod`] implements the transport against an in-process pod and
//! records every request it receives.

pub mod error;
pub mod http;
pub mod link;
pub mod memory;
pub mod notification;
pub mod sparql;
pub mod status;
pub mod transport;

pub use error::{ProtocolError, ProtocolResult};
pub use http::{headers, media, HttpRequest, HttpResponse, Method};
pub use link::{format_link, links_with_rel, parse_link_header, response_links, Link};
pub use memory::{InMemoryPod, RequestRecord};
pub use notification::{
    ChannelDescription, NotificationMessage, NotificationType, SubscriptionRequest,
};
pub use sparql::{parse_update_body, update_body};
pub use status::{check_response, classify_status, http_error, transport_failure};
pub use transport::{HttpTransport, ReqwestTransport, TransportConfig};
