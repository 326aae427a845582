//! C-Bus network addresses.
//!
//! Every controllable element behind a C-Gate server is named by a
//! hierarchical path rooted at a project:
//!
//! ```text
//! //PROJECT                      project
//! //PROJECT/254                  network
//! //PROJECT/254/56               application
//! //PROJECT/254/56/12            group
//! //PROJECT/254/p/32             physical unit
//! ```
//!
//! [`NetworkAddress`] is the parsed, validated form. It is immutable, cheap to
//! clone, hashable, and totally ordered, and it renders back to exactly the
//! text it was parsed from (modulo leading zeros).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Constants ───────────────────────────────────────────────────────

const MAX_PROJECT_LEN: usize = 8;

/// Words C-Gate reserves for its own object tree. `CMD<n>` is reserved too.
const RESERVED_PROJECTS: &[&str] = &["P", "CBUS", "VM", "CMDINT", "CGATE", "TAG"];

const NON_UNIT_MARKER: u32 = 0x0100_0000;
const UNIT_MARKER: u32 = 0x0200_0000;

// ── Errors ──────────────────────────────────────────────────────────

/// Numeric address components, named in range errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "camelCase")]
pub enum AddressField {
    Network,
    Application,
    Group,
    UnitAddress,
}

/// Address construction or parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The text does not follow the address grammar, or the project name is
    /// malformed or reserved.
    #[error("invalid address '{text}': {reason}")]
    Format { text: String, reason: String },

    /// A numeric component falls outside 0-255.
    #[error("{field} out of range (0-255): {value}")]
    Range { field: AddressField, value: i64 },
}

impl AddressError {
    fn format(text: &str, reason: impl Into<String>) -> Self {
        Self::Format {
            text: text.to_owned(),
            reason: reason.into(),
        }
    }
}

// ── AddressKind / AddressKey ────────────────────────────────────────

/// Granularity of a [`NetworkAddress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum AddressKind {
    Project,
    Network,
    Application,
    Group,
    Unit,
}

/// Compact lookup key derived from an address.
///
/// Project-level addresses have no numeric form and key by name. Everything
/// else packs into a single integer: a variant marker in bits 24-25, the
/// network in bits 16-23, then application/group (or unit) below.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AddressKey {
    Project(String),
    Packed(u32),
}

impl fmt::Display for AddressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project(name) => f.write_str(name),
            Self::Packed(value) => write!(f, "{value:#x}"),
        }
    }
}

// ── NetworkAddress ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Scope {
    Project,
    Network { network: u8 },
    Application { network: u8, application: u8 },
    Group { network: u8, application: u8, group: u8 },
    Unit { network: u8, unit: u8 },
}

/// A validated C-Bus address.
///
/// Serializes as its canonical string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NetworkAddress {
    project: String,
    scope: Scope,
}

impl NetworkAddress {
    // ── Construction ─────────────────────────────────────────────────

    /// Project-level address (`//PROJECT`).
    pub fn project(project: &str) -> Result<Self, AddressError> {
        validate_project(project, project)?;
        Ok(Self::with_scope(project, Scope::Project))
    }

    /// Network-level address (`//PROJECT/network`).
    pub fn network(project: &str, network: i64) -> Result<Self, AddressError> {
        validate_project(project, project)?;
        let network = check_range(AddressField::Network, network)?;
        Ok(Self::with_scope(project, Scope::Network { network }))
    }

    /// Application-level address (`//PROJECT/network/application`).
    pub fn application(project: &str, network: i64, application: i64) -> Result<Self, AddressError> {
        validate_project(project, project)?;
        let network = check_range(AddressField::Network, network)?;
        let application = check_range(AddressField::Application, application)?;
        Ok(Self::with_scope(project, Scope::Application { network, application }))
    }

    /// Group address (`//PROJECT/network/application/group`).
    pub fn group(
        project: &str,
        network: i64,
        application: i64,
        group: i64,
    ) -> Result<Self, AddressError> {
        validate_project(project, project)?;
        let network = check_range(AddressField::Network, network)?;
        let application = check_range(AddressField::Application, application)?;
        let group = check_range(AddressField::Group, group)?;
        Ok(Self::with_scope(
            project,
            Scope::Group {
                network,
                application,
                group,
            },
        ))
    }

    /// Physical unit address (`//PROJECT/network/p/unit`).
    pub fn unit(project: &str, network: i64, unit_address: i64) -> Result<Self, AddressError> {
        validate_project(project, project)?;
        let network = check_range(AddressField::Network, network)?;
        let unit = check_range(AddressField::UnitAddress, unit_address)?;
        Ok(Self::with_scope(project, Scope::Unit { network, unit }))
    }

    fn with_scope(project: &str, scope: Scope) -> Self {
        Self {
            project: project.to_owned(),
            scope,
        }
    }

    /// Parse the canonical text form.
    ///
    /// The whole string must match; surrounding whitespace is rejected.
    pub fn parse(text: &str) -> Result<Self, AddressError> {
        let rest = text
            .strip_prefix("//")
            .ok_or_else(|| AddressError::format(text, "must start with '//'"))?;

        let segments: Vec<&str> = rest.split('/').collect();
        let scope = match segments.as_slice() {
            [project] => {
                validate_project(text, project)?;
                Scope::Project
            }
            [project, network] => {
                validate_project(text, project)?;
                Scope::Network {
                    network: parse_field(text, network, AddressField::Network)?,
                }
            }
            [project, network, "p", unit] => {
                validate_project(text, project)?;
                Scope::Unit {
                    network: parse_field(text, network, AddressField::Network)?,
                    unit: parse_field(text, unit, AddressField::UnitAddress)?,
                }
            }
            [project, network, application] => {
                validate_project(text, project)?;
                Scope::Application {
                    network: parse_field(text, network, AddressField::Network)?,
                    application: parse_field(text, application, AddressField::Application)?,
                }
            }
            [project, network, application, group] => {
                validate_project(text, project)?;
                Scope::Group {
                    network: parse_field(text, network, AddressField::Network)?,
                    application: parse_field(text, application, AddressField::Application)?,
                    group: parse_field(text, group, AddressField::Group)?,
                }
            }
            _ => {
                return Err(AddressError::format(
                    text,
                    "expected //PROJECT[/network[/application[/group]|/p/unit]]",
                ));
            }
        };

        // Validated above; every arm checks the project before building.
        let project = segments.first().copied().unwrap_or_default();
        Ok(Self::with_scope(project, scope))
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn project_name(&self) -> &str {
        &self.project
    }

    pub fn network_number(&self) -> Option<u8> {
        match self.scope {
            Scope::Project => None,
            Scope::Network { network }
            | Scope::Application { network, .. }
            | Scope::Group { network, .. }
            | Scope::Unit { network, .. } => Some(network),
        }
    }

    pub fn application_number(&self) -> Option<u8> {
        match self.scope {
            Scope::Application { application, .. } | Scope::Group { application, .. } => {
                Some(application)
            }
            _ => None,
        }
    }

    pub fn group_number(&self) -> Option<u8> {
        match self.scope {
            Scope::Group { group, .. } => Some(group),
            _ => None,
        }
    }

    pub fn unit_address(&self) -> Option<u8> {
        match self.scope {
            Scope::Unit { unit, .. } => Some(unit),
            _ => None,
        }
    }

    pub fn kind(&self) -> AddressKind {
        match self.scope {
            Scope::Project => AddressKind::Project,
            Scope::Network { .. } => AddressKind::Network,
            Scope::Application { .. } => AddressKind::Application,
            Scope::Group { .. } => AddressKind::Group,
            Scope::Unit { .. } => AddressKind::Unit,
        }
    }

    pub fn is_project_id(&self) -> bool {
        self.kind() == AddressKind::Project
    }

    pub fn is_network_id(&self) -> bool {
        self.kind() == AddressKind::Network
    }

    pub fn is_application_id(&self) -> bool {
        self.kind() == AddressKind::Application
    }

    pub fn is_group_id(&self) -> bool {
        self.kind() == AddressKind::Group
    }

    pub fn is_unit_id(&self) -> bool {
        self.kind() == AddressKind::Unit
    }

    /// The derived lookup key. See [`AddressKey`].
    pub fn key(&self) -> AddressKey {
        let packed = |network: u8, high: u8, low: u8| {
            (u32::from(network) << 16) | (u32::from(high) << 8) | u32::from(low)
        };

        match self.scope {
            Scope::Project => AddressKey::Project(self.project.clone()),
            Scope::Network { network } => AddressKey::Packed(NON_UNIT_MARKER | packed(network, 0, 0)),
            Scope::Application {
                network,
                application,
            } => AddressKey::Packed(NON_UNIT_MARKER | packed(network, application, 0)),
            Scope::Group {
                network,
                application,
                group,
            } => AddressKey::Packed(NON_UNIT_MARKER | packed(network, application, group)),
            Scope::Unit { network, unit } => AddressKey::Packed(UNIT_MARKER | packed(network, 0, unit)),
        }
    }

    // ── Navigation ───────────────────────────────────────────────────

    /// Truncate to the enclosing network, or `None` for a project address.
    pub fn network_address(&self) -> Option<Self> {
        self.network_number().map(|network| {
            Self::with_scope(&self.project, Scope::Network { network })
        })
    }

    /// Truncate a group to its application. Applications return themselves.
    pub fn application_address(&self) -> Option<Self> {
        match self.scope {
            Scope::Application {
                network,
                application,
            }
            | Scope::Group {
                network,
                application,
                ..
            } => Some(Self::with_scope(
                &self.project,
                Scope::Application {
                    network,
                    application,
                },
            )),
            _ => None,
        }
    }

    /// Sort key below the project name: non-unit before unit, then
    /// network, application, group (or unit). Absent components sort first.
    fn sort_key(&self) -> (bool, Option<u8>, Option<u8>, Option<u8>) {
        match self.scope {
            Scope::Unit { network, unit } => (true, Some(network), None, Some(unit)),
            _ => (
                false,
                self.network_number(),
                self.application_number(),
                self.group_number(),
            ),
        }
    }
}

// ── Validation helpers ──────────────────────────────────────────────

fn validate_project(text: &str, project: &str) -> Result<(), AddressError> {
    let mut chars = project.chars();
    let first_ok = chars.next().is_some_and(|c| c.is_ascii_uppercase());
    let rest_ok = chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');

    if !first_ok || !rest_ok || project.len() > MAX_PROJECT_LEN {
        return Err(AddressError::format(
            text,
            format!("project '{project}' must match [A-Z][A-Z0-9_]{{0,7}}"),
        ));
    }

    if is_reserved_project(project) {
        return Err(AddressError::format(
            text,
            format!("project '{project}' is a reserved word"),
        ));
    }

    Ok(())
}

fn is_reserved_project(project: &str) -> bool {
    if RESERVED_PROJECTS.contains(&project) {
        return true;
    }
    project
        .strip_prefix("CMD")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

fn parse_field(text: &str, segment: &str, field: AddressField) -> Result<u8, AddressError> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AddressError::format(
            text,
            format!("{field} must be a decimal number, got '{segment}'"),
        ));
    }
    let value: i64 = segment
        .parse()
        .map_err(|_| AddressError::format(text, format!("{field} '{segment}' is too large")))?;
    check_range(field, value)
}

fn check_range(field: AddressField, value: i64) -> Result<u8, AddressError> {
    u8::try_from(value).map_err(|_| AddressError::Range { field, value })
}

// ── Trait impls ─────────────────────────────────────────────────────

impl fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let project = &self.project;
        match self.scope {
            Scope::Project => write!(f, "//{project}"),
            Scope::Network { network } => write!(f, "//{project}/{network}"),
            Scope::Application {
                network,
                application,
            } => write!(f, "//{project}/{network}/{application}"),
            Scope::Group {
                network,
                application,
                group,
            } => write!(f, "//{project}/{network}/{application}/{group}"),
            Scope::Unit { network, unit } => write!(f, "//{project}/{network}/p/{unit}"),
        }
    }
}

impl FromStr for NetworkAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for NetworkAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<NetworkAddress> for String {
    fn from(address: NetworkAddress) -> Self {
        address.to_string()
    }
}

impl Ord for NetworkAddress {
    fn cmp(&self, other: &Self) -> Ordering {
        self.project
            .cmp(&other.project)
            .then_with(|| self.sort_key().cmp(&other.sort_key()))
    }
}

impl PartialOrd for NetworkAddress {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn addr(text: &str) -> NetworkAddress {
        NetworkAddress::parse(text).unwrap()
    }

    fn all_kinds() -> Vec<NetworkAddress> {
        vec![
            NetworkAddress::project("HOME").unwrap(),
            NetworkAddress::network("HOME", 254).unwrap(),
            NetworkAddress::application("HOME", 254, 56).unwrap(),
            NetworkAddress::group("HOME", 254, 56, 0).unwrap(),
            NetworkAddress::group("HOME", 0, 0, 255).unwrap(),
            NetworkAddress::unit("HOME", 254, 0).unwrap(),
            NetworkAddress::unit("A_1", 255, 255).unwrap(),
        ]
    }

    #[test]
    fn parses_every_granularity() {
        let project = addr("//FOO");
        assert_eq!(project.project_name(), "FOO");
        assert!(project.network_number().is_none());

        let network = addr("//FOO/254");
        assert_eq!(network.network_number(), Some(254));
        assert!(network.application_number().is_none());

        let app = addr("//FOO/254/56");
        assert_eq!(app.application_number(), Some(56));
        assert!(app.group_number().is_none());

        let group = addr("//FOO/254/56/12");
        assert_eq!(group.group_number(), Some(12));
        assert!(group.unit_address().is_none());

        let unit = addr("//FOO/254/p/32");
        assert_eq!(unit.unit_address(), Some(32));
        assert!(unit.application_number().is_none());
        assert!(unit.group_number().is_none());
    }

    #[test]
    fn round_trips_through_display() {
        for address in all_kinds() {
            let text = address.to_string();
            assert_eq!(NetworkAddress::parse(&text).unwrap(), address, "{text}");
        }
    }

    #[test]
    fn round_trips_every_group_value() {
        for group in 0..=255 {
            let address = NetworkAddress::group("S31415", 254, 56, group).unwrap();
            assert_eq!(addr(&address.to_string()), address);
        }
    }

    #[test]
    fn exactly_one_kind_predicate_holds() {
        for address in all_kinds() {
            let flags = [
                address.is_project_id(),
                address.is_network_id(),
                address.is_application_id(),
                address.is_group_id(),
                address.is_unit_id(),
            ];
            assert_eq!(flags.iter().filter(|f| **f).count(), 1, "{address}");
        }
    }

    #[test]
    fn keys_match_known_values() {
        assert_eq!(addr("//FOO").key(), AddressKey::Project("FOO".into()));
        assert_eq!(addr("//S31415/254").key(), AddressKey::Packed(0x1fe_0000));
        assert_eq!(addr("//S31415/254/208").key(), AddressKey::Packed(0x1fe_d000));
        assert_eq!(addr("//S31415/254/208/128").key(), AddressKey::Packed(0x1fe_d080));
        assert_eq!(addr("//S31415/254/p/128").key(), AddressKey::Packed(0x2fe_0080));
    }

    #[test]
    fn key_display() {
        assert_eq!(addr("//FOO").key().to_string(), "FOO");
        assert_eq!(addr("//S31415/254").key().to_string(), "0x1fe0000");
    }

    #[test]
    fn sorts_projects_then_variant_then_numbers() {
        let mut list = vec![
            addr("//PROJECT/254/p/5"),
            addr("//PROJECT/17/p/21"),
            addr("//PROJECT/254/56/1"),
            addr("//AAA/254/99"),
            addr("//PROJECT/254/56"),
            addr("//AAA/254/56"),
        ];
        list.sort();

        let rendered: Vec<String> = list.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "//AAA/254/56",
                "//AAA/254/99",
                "//PROJECT/254/56",
                "//PROJECT/254/56/1",
                "//PROJECT/17/p/21",
                "//PROJECT/254/p/5",
            ]
        );
    }

    #[test]
    fn ordering_is_total_and_consistent_with_eq() {
        let list = all_kinds();
        for a in &list {
            for b in &list {
                assert_eq!(a.cmp(b) == Ordering::Equal, a == b, "{a} vs {b}");
                assert_eq!(a.cmp(b), b.cmp(a).reverse(), "{a} vs {b}");
                for c in &list {
                    if a < b && b < c {
                        assert!(a < c, "{a} < {b} < {c}");
                    }
                }
            }
        }
    }

    #[test]
    fn rejects_reserved_projects() {
        for name in ["P", "CBUS", "VM", "CMDINT", "CGATE", "TAG", "CMD7"] {
            let err = NetworkAddress::project(name).unwrap_err();
            assert!(matches!(err, AddressError::Format { .. }), "{name}: {err}");
            let err = NetworkAddress::parse(&format!("//{name}/254")).unwrap_err();
            assert!(matches!(err, AddressError::Format { .. }), "{name}: {err}");
        }
        // Prefix alone is not reserved.
        assert!(NetworkAddress::project("CMD").is_ok());
        assert!(NetworkAddress::project("CMDX").is_ok());
    }

    #[test]
    fn rejects_malformed_projects() {
        for name in ["", "foo", "1ABC", "ABCDEFGHI", "AB-C", "AB C"] {
            assert!(
                matches!(
                    NetworkAddress::project(name),
                    Err(AddressError::Format { .. })
                ),
                "{name:?}"
            );
        }
        assert!(NetworkAddress::project("ABCDEFGH").is_ok());
    }

    #[test]
    fn rejects_out_of_range_fields() {
        let cases = [
            (NetworkAddress::network("FOO", 999), AddressField::Network, 999),
            (NetworkAddress::application("FOO", 254, 999), AddressField::Application, 999),
            (NetworkAddress::group("FOO", 254, 56, 999), AddressField::Group, 999),
            (NetworkAddress::unit("FOO", 254, 999), AddressField::UnitAddress, 999),
            (NetworkAddress::unit("FOO", 254, -999), AddressField::UnitAddress, -999),
        ];
        for (result, field, value) in cases {
            assert_eq!(result.unwrap_err(), AddressError::Range { field, value });
        }
    }

    #[test]
    fn range_error_names_field() {
        let err = NetworkAddress::parse("//FOO/254/p/999").unwrap_err();
        assert_eq!(err.to_string(), "unitAddress out of range (0-255): 999");
        let err = NetworkAddress::parse("//FOO/999").unwrap_err();
        assert_eq!(
            err,
            AddressError::Range {
                field: AddressField::Network,
                value: 999
            }
        );
    }

    #[test]
    fn rejects_malformed_text() {
        for text in [
            "",
            "FOO",
            "/FOO",
            "//",
            " //FOO",
            "//FOO ",
            "//FOO/254 ",
            "//FOO/",
            "//FOO/abc",
            "//FOO/254/56/1/2",
            "//FOO/254/p",
            "//FOO/254/p/",
            "//FOO/254/q/1",
            "//FOO/-1",
            "//FOO/254/56/+1",
        ] {
            let err = NetworkAddress::parse(text).unwrap_err();
            assert!(matches!(err, AddressError::Format { .. }), "{text:?}: {err}");
        }
    }

    #[test]
    fn format_error_names_text() {
        let err = NetworkAddress::parse("//FOO/abc").unwrap_err();
        assert!(err.to_string().contains("//FOO/abc"), "{err}");
    }

    #[test]
    fn navigation_helpers() {
        let group = addr("//HOME/254/56/3");
        assert_eq!(group.network_address().unwrap(), addr("//HOME/254"));
        assert_eq!(group.application_address().unwrap(), addr("//HOME/254/56"));
        assert!(addr("//HOME").network_address().is_none());
        assert!(addr("//HOME/254/p/3").application_address().is_none());
    }

    #[test]
    fn serde_uses_canonical_string() {
        let group = addr("//HOME/254/56/3");
        let json = serde_json::to_string(&group).unwrap();
        assert_eq!(json, "\"//HOME/254/56/3\"");
        let back: NetworkAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, group);
        assert!(serde_json::from_str::<NetworkAddress>("\"//P/1\"").is_err());
    }
}
