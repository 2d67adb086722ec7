//! Web Access Control for the pod client.
//!
//! Discovers the ACL document attached to a resource, reads it into a
//! [`WacRule`](pod_types::WacRule) (walking up the container chain when a
//! resource inherits its rules) and writes rules back as a fresh ACL
//! document.

pub mod fetch;
pub mod rule;

pub use fetch::{
    get_wac_link, get_wac_rule, get_wac_rule_with_acl_uri, get_wac_uri, set_wac_rule, AclDocument,
    AclLink, EffectiveRule,
};
pub use rule::{parse_wac_rule, wac_rule_to_quads, ACL_PREFIXES};
