//! Identity string decoding.
//!
//! Address identities carry a one-character class prefix, a phase digit for
//! mobile addresses, and optionally an owning-node qualifier. Decoding is
//! total: malformed input degrades to an `unknown` class, never an error.

use serde::Serialize;
use std::borrow::Cow;
use std::fmt;

const PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AddressClass {
    Mobile,
    Router,
    Area,
    Local,
    LinkIncoming,
    LinkOutgoing,
    /// Prefix character outside the class table.
    Unknown(char),
    /// Absent or empty identity.
    Placeholder,
}

impl AddressClass {
    pub fn from_prefix(prefix: char) -> Self {
        match prefix {
            'M' => AddressClass::Mobile,
            'R' => AddressClass::Router,
            'A' => AddressClass::Area,
            'L' => AddressClass::Local,
            'C' => AddressClass::LinkIncoming,
            'D' => AddressClass::LinkOutgoing,
            other => AddressClass::Unknown(other),
        }
    }

    pub fn label(&self) -> Cow<'static, str> {
        match self {
            AddressClass::Mobile => Cow::Borrowed("mobile"),
            AddressClass::Router => Cow::Borrowed("router"),
            AddressClass::Area => Cow::Borrowed("area"),
            AddressClass::Local => Cow::Borrowed("local"),
            AddressClass::LinkIncoming => Cow::Borrowed("link-incoming"),
            AddressClass::LinkOutgoing => Cow::Borrowed("link-outgoing"),
            AddressClass::Unknown(prefix) => Cow::Owned(format!("unknown: {prefix}")),
            AddressClass::Placeholder => Cow::Borrowed(PLACEHOLDER),
        }
    }
}

impl fmt::Display for AddressClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityRecord {
    pub class: AddressClass,
    pub display_text: String,
    pub phase: Option<char>,
    pub raw: String,
}

impl IdentityRecord {
    fn placeholder(raw: &str) -> Self {
        Self {
            class: AddressClass::Placeholder,
            display_text: PLACEHOLDER.to_string(),
            phase: None,
            raw: raw.to_string(),
        }
    }

    /// Phase rendered for display; empty for non-mobile classes.
    pub fn phase_text(&self) -> String {
        self.phase.map(String::from).unwrap_or_default()
    }
}

/// Decodes an identity by its class prefix.
///
/// Mobile identities skip the class character and the phase digit; every other
/// class skips only the class character.
pub fn decode(identity: Option<&str>) -> IdentityRecord {
    let raw = match identity {
        Some(raw) if !raw.is_empty() => raw,
        other => return IdentityRecord::placeholder(other.unwrap_or_default()),
    };

    let mut chars = raw.chars();
    let class = match chars.next() {
        Some(prefix) => AddressClass::from_prefix(prefix),
        None => return IdentityRecord::placeholder(raw),
    };
    let phase = match class {
        AddressClass::Mobile => chars.next(),
        _ => None,
    };

    IdentityRecord {
        class,
        display_text: chars.as_str().to_string(),
        phase,
        raw: raw.to_string(),
    }
}

/// Decodes an identity whose text may be qualified with an owning node.
pub fn decode_qualified(identity: Option<&str>) -> IdentityRecord {
    let mut record = decode(identity);
    if record.class != AddressClass::Placeholder {
        record.display_text = strip_owner_prefix(&record.display_text).to_string();
    }
    record
}

/// Drops everything up to and including the last `/`.
pub fn strip_owner_prefix(identity: &str) -> &str {
    match identity.rfind('/') {
        Some(pos) => &identity[pos + 1..],
        None => identity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_empty_identities_decode_to_placeholder() {
        for input in [None, Some("")] {
            let record = decode(input);
            assert_eq!(record.class, AddressClass::Placeholder);
            assert_eq!(record.display_text, "-");
            assert_eq!(record.phase, None);
        }
    }

    #[test]
    fn qualified_mobile_identity_yields_phase_and_bare_name() {
        let record = decode_qualified(Some("M4/r1/addr1"));
        assert_eq!(record.class, AddressClass::Mobile);
        assert_eq!(record.phase, Some('4'));
        assert_eq!(record.display_text, "addr1");
        assert_eq!(record.raw, "M4/r1/addr1");
    }

    #[test]
    fn router_identity_skips_only_class_character() {
        let record = decode(Some("R/r1/name"));
        assert_eq!(record.class, AddressClass::Router);
        assert_eq!(record.display_text, "/r1/name");
        assert_eq!(record.phase, None);
        assert_eq!(record.phase_text(), "");
    }

    #[test]
    fn class_table_covers_every_prefix() {
        let cases = [
            ("Mx0", "mobile"),
            ("Rrouter", "router"),
            ("Aarea", "area"),
            ("Llocal", "local"),
            ("Clink", "link-incoming"),
            ("Dlink", "link-outgoing"),
            ("Zthing", "unknown: Z"),
        ];
        for (input, label) in cases {
            assert_eq!(decode(Some(input)).class.label(), label, "input {input}");
        }
    }

    #[test]
    fn single_character_identities_are_well_formed() {
        let mobile = decode(Some("M"));
        assert_eq!(mobile.class, AddressClass::Mobile);
        assert_eq!(mobile.phase, None);
        assert_eq!(mobile.display_text, "");

        let unknown = decode(Some("?"));
        assert_eq!(unknown.class, AddressClass::Unknown('?'));
        assert_eq!(unknown.display_text, "");
    }

    #[test]
    fn multibyte_prefix_does_not_split_characters() {
        let record = decode(Some("éaddr"));
        assert_eq!(record.class, AddressClass::Unknown('é'));
        assert_eq!(record.display_text, "addr");

        let mobile = decode(Some("Mßqueue"));
        assert_eq!(mobile.phase, Some('ß'));
        assert_eq!(mobile.display_text, "queue");
    }

    #[test]
    fn strip_owner_prefix_uses_last_separator() {
        assert_eq!(strip_owner_prefix("node/sub/name"), "name");
        assert_eq!(strip_owner_prefix("plain"), "plain");
        assert_eq!(strip_owner_prefix("trailing/"), "");
    }
}
