//! Conversion between ACL triples and [`WacRule`].

use std::collections::BTreeMap;

use pod_types::vocab::{acl, foaf, rdf};
use pod_types::{is_container_uri, AccessModeList, GraphName, Quad, Term, WacRule};

/// Prefixes used when writing ACL documents.
pub const ACL_PREFIXES: &[(&str, &str)] = &[("acl", acl::NS), ("foaf", foaf::NS)];

fn modes_of(quads: &[Quad], subject: &Term) -> AccessModeList {
    let mut modes = AccessModeList::none();
    for quad in quads {
        if &quad.subject != subject || !quad.predicate.is_iri(acl::MODE) {
            continue;
        }
        match quad.object.as_iri() {
            Some(acl::READ) => modes.read = true,
            Some(acl::WRITE) => modes.write = true,
            Some(acl::APPEND) => modes.append = true,
            Some(acl::CONTROL) => modes.control = true,
            _ => {}
        }
    }
    modes
}

/// Fold every `acl:Authorization` in `quads` into one rule.
///
/// Modes are OR-ed across authorizations. `foaf:Agent` grants to both
/// `public` and `authenticated`; `acl:AuthenticatedAgent` to
/// `authenticated`; each `acl:agent` to that agent's own entry.
pub fn parse_wac_rule(quads: &[Quad]) -> WacRule {
    let mut rule = WacRule::new();
    let authorizations = quads
        .iter()
        .filter(|q| q.predicate.is_iri(rdf::TYPE) && q.object.is_iri(acl::AUTHORIZATION))
        .map(|q| &q.subject);

    for auth in authorizations {
        let modes = modes_of(quads, auth);
        for quad in quads.iter().filter(|q| &q.subject == auth) {
            if quad.predicate.is_iri(acl::AGENT_CLASS) {
                match quad.object.as_iri() {
                    Some(foaf::AGENT) => {
                        rule.public.grant(&modes);
                        rule.authenticated.grant(&modes);
                    }
                    Some(acl::AUTHENTICATED_AGENT) => rule.authenticated.grant(&modes),
                    _ => {}
                }
            } else if quad.predicate.is_iri(acl::AGENT) {
                if let Some(agent) = quad.object.as_iri() {
                    rule.agent.entry(agent.to_string()).or_default().grant(&modes);
                }
            }
        }
    }
    rule
}

#[derive(Default)]
struct Grantees<'a> {
    public: bool,
    authenticated: bool,
    agents: Vec<&'a str>,
}

fn group_for<'m, 'a>(
    groups: &'m mut BTreeMap<u8, (AccessModeList, Grantees<'a>)>,
    modes: &AccessModeList,
) -> Option<&'m mut Grantees<'a>> {
    if modes.is_empty() {
        return None;
    }
    let (_, grantees) = groups
        .entry(modes.mode_key())
        .or_insert_with(|| (*modes, Grantees::default()));
    Some(grantees)
}

/// Build the triples of an ACL document at `acl_uri` expressing `rule` for
/// `access_to`.
///
/// Grantees with identical modes share one authorization. Empty mode
/// lists produce nothing. Container targets also get `acl:default`.
pub fn wac_rule_to_quads(rule: &WacRule, acl_uri: &str, access_to: &str) -> Vec<Quad> {
    let mut groups: BTreeMap<u8, (AccessModeList, Grantees<'_>)> = BTreeMap::new();
    if let Some(g) = group_for(&mut groups, &rule.public) {
        g.public = true;
    }
    if let Some(g) = group_for(&mut groups, &rule.authenticated) {
        g.authenticated = true;
    }
    for (agent, modes) in &rule.agent {
        if let Some(g) = group_for(&mut groups, modes) {
            g.agents.push(agent.as_str());
        }
    }

    let graph = GraphName::DefaultGraph;
    let mut quads = Vec::new();
    for (modes, grantees) in groups.values() {
        let subject = format!("{acl_uri}#{}", uuid::Uuid::new_v4());
        let mut push = |p: &str, o: &str| quads.push(Quad::iris(&subject, p, o, graph.clone()));

        push(rdf::TYPE, acl::AUTHORIZATION);
        push(acl::ACCESS_TO, access_to);
        if is_container_uri(access_to) {
            push(acl::DEFAULT, access_to);
        }
        for (granted, mode) in [
            (modes.read, acl::READ),
            (modes.write, acl::WRITE),
            (modes.append, acl::APPEND),
            (modes.control, acl::CONTROL),
        ] {
            if granted {
                push(acl::MODE, mode);
            }
        }
        if grantees.public {
            push(acl::AGENT_CLASS, foaf::AGENT);
        }
        if grantees.authenticated {
            push(acl::AGENT_CLASS, acl::AUTHENTICATED_AGENT);
        }
        for agent in &grantees.agents {
            push(acl::AGENT, agent);
        }
    }
    quads
}

#[cfg(test)]
mod tests {
    use super::*;
    use pod_store::{RdfCodec, TurtleCodec};
    use proptest::prelude::*;

    const ACL: &str = "https://pod.example/docs/.acl";
    const ALICE: &str = "https://alice.example/profile/card#me";
    const BOB: &str = "https://bob.example/profile/card#me";

    fn authorization_count(quads: &[Quad]) -> usize {
        quads.iter().filter(|q| q.object.is_iri(acl::AUTHORIZATION)).count()
    }

    #[test]
    fn parses_agent_classes() {
        let text = r#"
            @prefix acl: <http://www.w3.org/ns/auth/acl#>.
            @prefix foaf: <http://xmlns.com/foaf/0.1/>.
            <#public> a acl:Authorization; acl:agentClass foaf:Agent; acl:accessTo <./>; acl:mode acl:Read.
            <#members> a acl:Authorization; acl:agentClass acl:AuthenticatedAgent; acl:mode acl:Append.
            <#owner> a acl:Authorization; acl:agent <https://alice.example/profile/card#me>;
                acl:mode acl:Read, acl:Write, acl:Control.
            <#notAnAuthorization> acl:agent <https://bob.example/profile/card#me>; acl:mode acl:Write.
        "#;
        let quads = TurtleCodec.parse(text, ACL).unwrap();
        let rule = parse_wac_rule(&quads);

        assert_eq!(rule.public, AccessModeList::read_only());
        assert_eq!(rule.authenticated, AccessModeList::from_letters("r,a"));
        assert_eq!(rule.agent.get(ALICE), Some(&AccessModeList::from_letters("r,w,c")));
        assert!(!rule.agent.contains_key(BOB));
    }

    #[test]
    fn modes_are_unioned_across_authorizations() {
        let text = r#"
            @prefix acl: <http://www.w3.org/ns/auth/acl#>.
            <#a> a acl:Authorization; acl:agent <https://alice.example/profile/card#me>; acl:mode acl:Read.
            <#b> a acl:Authorization; acl:agent <https://alice.example/profile/card#me>; acl:mode acl:Write.
        "#;
        let rule = parse_wac_rule(&TurtleCodec.parse(text, ACL).unwrap());
        assert_eq!(rule.agent[ALICE], AccessModeList::from_letters("r,w"));
    }

    #[test]
    fn identical_modes_share_an_authorization() {
        let rule = WacRule::new()
            .with_public(AccessModeList::read_only())
            .with_authenticated(AccessModeList::read_only())
            .with_agent(ALICE, AccessModeList::all())
            .with_agent(BOB, AccessModeList::all());
        let quads = wac_rule_to_quads(&rule, ACL, "https://pod.example/docs/doc.ttl");
        assert_eq!(authorization_count(&quads), 2);
        assert!(!quads.iter().any(|q| q.predicate.is_iri(acl::DEFAULT)));
    }

    #[test]
    fn empty_modes_write_nothing() {
        let rule = WacRule::new().with_agent(BOB, AccessModeList::none());
        assert!(wac_rule_to_quads(&rule, ACL, "https://pod.example/docs/").is_empty());
    }

    #[test]
    fn containers_get_default() {
        let rule = WacRule::new().with_agent(ALICE, AccessModeList::all());
        let quads = wac_rule_to_quads(&rule, ACL, "https://pod.example/docs/");
        let defaults: Vec<_> = quads.iter().filter(|q| q.predicate.is_iri(acl::DEFAULT)).collect();
        assert_eq!(defaults.len(), 1);
        assert!(defaults[0].object.is_iri("https://pod.example/docs/"));
        assert!(defaults[0].subject.as_iri().unwrap().starts_with("https://pod.example/docs/.acl#"));
    }

    fn modes() -> impl Strategy<Value = AccessModeList> {
        (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(read, write, append, control)| {
            AccessModeList { read, write, append, control }
        })
    }

    proptest! {
        #[test]
        fn serialized_rules_read_back(
            public in modes(),
            extra in modes(),
            agents in proptest::collection::btree_map("[a-z]{1,6}", modes(), 0..4),
        ) {
            let mut authenticated = public;
            authenticated.grant(&extra);
            let mut rule = WacRule::new().with_public(public).with_authenticated(authenticated);
            for (name, m) in agents {
                rule = rule.with_agent(format!("https://{name}.example/card#me"), m);
            }

            let quads = wac_rule_to_quads(&rule, ACL, "https://pod.example/docs/");
            let text = TurtleCodec.serialize(&quads, ACL_PREFIXES);
            let back = parse_wac_rule(&TurtleCodec.parse(&text, ACL).unwrap());
            prop_assert_eq!(back.normalized(), rule.normalized());
        }
    }
}
