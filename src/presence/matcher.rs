//! Beacon matching policy.
//!
//! A probe match qualifies when its hardware identifier equals the
//! configured address (ASCII case-insensitive) or its advertised name
//! contains the configured name.  Either criterion alone suffices; an empty
//! configured value disables that criterion.

use crate::config::{ADDRESS_LEN, BeaconConfig, MAX_NAME_LEN};

/// One advertisement observed during an open probe cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeMatch {
    /// Textual hardware address, `aa:bb:cc:dd:ee:ff`.
    pub identifier: heapless::String<ADDRESS_LEN>,
    /// Advertised local name, if the advertisement carried one.
    pub name: Option<heapless::String<MAX_NAME_LEN>>,
}

impl ProbeMatch {
    /// Build a match from borrowed text, truncating over-long values.
    pub fn new(identifier: &str, name: Option<&str>) -> Self {
        Self {
            identifier: truncated(identifier),
            name: name.map(truncated),
        }
    }

    /// Build a match from a raw 6-byte address (most significant byte first).
    pub fn from_address(addr: [u8; 6], name: Option<&str>) -> Self {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut identifier = heapless::String::new();
        for (i, b) in addr.iter().enumerate() {
            if i > 0 {
                let _ = identifier.push(':');
            }
            let _ = identifier.push(HEX[(b >> 4) as usize] as char);
            let _ = identifier.push(HEX[(b & 0x0f) as usize] as char);
        }
        Self {
            identifier,
            name: name.map(truncated),
        }
    }
}

fn truncated<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Which criterion accepted a probe match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    ByAddress,
    ByName,
}

impl MatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ByAddress => "address",
            Self::ByName => "name",
        }
    }
}

/// Compiled matching policy for one tracked beacon.
#[derive(Debug, Clone)]
pub struct BeaconMatcher {
    target: BeaconConfig,
}

impl BeaconMatcher {
    pub fn new(target: BeaconConfig) -> Self {
        Self { target }
    }

    /// Test a probe match.  Address is checked first.
    pub fn matches(&self, probe: &ProbeMatch) -> Option<MatchKind> {
        let address = self.target.target_address.as_str();
        if !address.is_empty() && probe.identifier.eq_ignore_ascii_case(address) {
            return Some(MatchKind::ByAddress);
        }

        let name = self.target.target_name.as_str();
        if !name.is_empty() && probe.name.as_ref().is_some_and(|n| n.contains(name)) {
            return Some(MatchKind::ByName);
        }

        None
    }

    pub fn target(&self) -> &BeaconConfig {
        &self.target
    }
}
