//! IRIs of the vocabularies the client reads and writes.

pub mod rdf {
    pub const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    pub const FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
    pub const REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
    pub const NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";
}

pub mod xsd {
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
    pub const DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
    pub const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
}

pub mod ldp {
    pub const NS: &str = "http://www.w3.org/ns/ldp#";
    pub const CONTAINS: &str = "http://www.w3.org/ns/ldp#contains";
    pub const RESOURCE: &str = "http://www.w3.org/ns/ldp#Resource";
    pub const CONTAINER: &str = "http://www.w3.org/ns/ldp#Container";
    pub const BASIC_CONTAINER: &str = "http://www.w3.org/ns/ldp#BasicContainer";
}

pub mod acl {
    pub const NS: &str = "http://www.w3.org/ns/auth/acl#";
    pub const AUTHORIZATION: &str = "http://www.w3.org/ns/auth/acl#Authorization";
    pub const ACCESS_TO: &str = "http://www.w3.org/ns/auth/acl#accessTo";
    pub const DEFAULT: &str = "http://www.w3.org/ns/auth/acl#default";
    pub const MODE: &str = "http://www.w3.org/ns/auth/acl#mode";
    pub const AGENT: &str = "http://www.w3.org/ns/auth/acl#agent";
    pub const AGENT_CLASS: &str = "http://www.w3.org/ns/auth/acl#agentClass";
    pub const AUTHENTICATED_AGENT: &str = "http://www.w3.org/ns/auth/acl#AuthenticatedAgent";
    pub const READ: &str = "http://www.w3.org/ns/auth/acl#Read";
    pub const WRITE: &str = "http://www.w3.org/ns/auth/acl#Write";
    pub const APPEND: &str = "http://www.w3.org/ns/auth/acl#Append";
    pub const CONTROL: &str = "http://www.w3.org/ns/auth/acl#Control";
}

pub mod foaf {
    pub const NS: &str = "http://xmlns.com/foaf/0.1/";
    pub const AGENT: &str = "http://xmlns.com/foaf/0.1/Agent";
}

pub mod pim {
    pub const STORAGE: &str = "http://www.w3.org/ns/pim/space#storage";
    pub const STORAGE_TYPE: &str = "http://www.w3.org/ns/pim/space#Storage";
}

pub mod solid {
    pub const STORAGE_DESCRIPTION: &str = "http://www.w3.org/ns/solid/terms#storageDescription";
}

pub mod notify {
    pub const NS: &str = "http://www.w3.org/ns/solid/notifications#";
    pub const SUBSCRIPTION: &str = "http://www.w3.org/ns/solid/notifications#subscription";
    pub const CHANNEL_TYPE: &str = "http://www.w3.org/ns/solid/notifications#channelType";
    pub const WEBSOCKET_CHANNEL_2023: &str =
        "http://www.w3.org/ns/solid/notifications#WebSocketChannel2023";
    pub const CONTEXT: &str = "https://www.w3.org/ns/solid/notification/v1";
}

pub mod activity {
    pub const NS: &str = "https://www.w3.org/ns/activitystreams#";
    pub const CONTEXT: &str = "https://www.w3.org/ns/activitystreams";
}
