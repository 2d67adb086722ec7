use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The four Web Access Control modes granted to one agent or agent class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessModeList {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    pub control: bool,
}

impl AccessModeList {
    /// No access at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Every mode granted.
    pub fn all() -> Self {
        Self { read: true, write: true, append: true, control: true }
    }

    pub fn read_only() -> Self {
        Self { read: true, ..Self::default() }
    }

    /// Returns `true` if no mode is granted.
    ///
    /// An empty list is never written as an authorization statement.
    pub fn is_empty(&self) -> bool {
        !(self.read || self.write || self.append || self.control)
    }

    /// Compact key identifying the exact combination of modes.
    ///
    /// Entries sharing a key can share one authorization statement.
    pub fn mode_key(&self) -> u8 {
        u8::from(self.read)
            | (u8::from(self.write) << 1)
            | (u8::from(self.append) << 2)
            | (u8::from(self.control) << 3)
    }

    /// Grant every mode that `other` grants (logical OR).
    pub fn grant(&mut self, other: &AccessModeList) {
        self.read |= other.read;
        self.write |= other.write;
        self.append |= other.append;
        self.control |= other.control;
    }

    /// Parse a compact mode string such as `"rw"` or `"r,w,a,c"`.
    ///
    /// Unknown characters are ignored.
    pub fn from_letters(letters: &str) -> Self {
        let mut list = Self::none();
        for c in letters.chars() {
            match c.to_ascii_lowercase() {
                'r' => list.read = true,
                'w' => list.write = true,
                'a' => list.append = true,
                'c' => list.control = true,
                _ => {}
            }
        }
        list
    }

    /// Inverse of [`Self::from_letters`]; `-` when empty.
    pub fn to_letters(&self) -> String {
        let mut out = String::new();
        if self.read {
            out.push('r');
        }
        if self.write {
            out.push('w');
        }
        if self.append {
            out.push('a');
        }
        if self.control {
            out.push('c');
        }
        if out.is_empty() {
            out.push('-');
        }
        out
    }
}

/// The effective access rules for a resource.
///
/// `public` covers every agent (`foaf:Agent`), `authenticated` every
/// logged-in agent, and `agent` individual WebIDs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WacRule {
    pub public: AccessModeList,
    pub authenticated: AccessModeList,
    pub agent: BTreeMap<String, AccessModeList>,
}

impl WacRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_public(mut self, modes: AccessModeList) -> Self {
        self.public = modes;
        self
    }

    pub fn with_authenticated(mut self, modes: AccessModeList) -> Self {
        self.authenticated = modes;
        self
    }

    pub fn with_agent(mut self, web_id: impl Into<String>, modes: AccessModeList) -> Self {
        self.agent.insert(web_id.into(), modes);
        self
    }

    /// Drop agent entries that grant nothing.
    ///
    /// Such entries are omitted on write, so this is the form a rule takes
    /// after a write/read round trip.
    pub fn normalized(&self) -> Self {
        Self {
            public: self.public,
            authenticated: self.authenticated,
            agent: self
                .agent
                .iter()
                .filter(|(_, modes)| !modes.is_empty())
                .map(|(id, modes)| (id.clone(), *modes))
                .collect(),
        }
    }
}
