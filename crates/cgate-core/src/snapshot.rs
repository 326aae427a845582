// ── Object snapshot ──
//
// Parsed form of a `dbgetxml` document: dense vectors of entities plus
// per-kind key indexes. Built in one pass and never mutated; a refresh
// builds a new one and swaps it in whole.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use cgate_api::{AddressKey, NetworkAddress};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{Application, Group, Unit};

// ── Wire document ────────────────────────────────────────────────────
//
// Every field is optional so one bad record doesn't sink the document;
// validation happens while building the snapshot.

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NetworkDoc {
    #[serde(default)]
    tag_name: Option<String>,
    #[serde(default)]
    network_number: Option<String>,
    #[serde(default, rename = "Application")]
    applications: Vec<ApplicationDoc>,
    #[serde(default, rename = "Unit")]
    units: Vec<UnitDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApplicationDoc {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    tag_name: Option<String>,
    #[serde(default, rename = "Group")]
    groups: Vec<GroupDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GroupDoc {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    tag_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UnitDoc {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    tag_name: Option<String>,
    #[serde(default)]
    firmware_version: Option<String>,
    #[serde(default)]
    serial_number: Option<String>,
    #[serde(default)]
    catalog_number: Option<String>,
    #[serde(default)]
    unit_type: Option<String>,
}

// ── Snapshot ─────────────────────────────────────────────────────────

/// Immutable object model of one network.
#[derive(Debug, Clone)]
pub struct Snapshot {
    network: NetworkAddress,
    network_tag: Option<String>,
    fetched_at: DateTime<Utc>,
    applications: Vec<Application>,
    groups: Vec<Group>,
    units: Vec<Unit>,
    application_index: HashMap<AddressKey, usize>,
    group_index: HashMap<AddressKey, usize>,
    unit_index: HashMap<AddressKey, usize>,
}

impl Snapshot {
    /// Parse a `<Network>` document for `network`.
    ///
    /// Records with missing or out-of-range addresses are skipped with a
    /// warning; a document that is not well-formed XML fails as a whole.
    pub fn parse(network: &NetworkAddress, xml: &str) -> Result<Self, CoreError> {
        let doc: NetworkDoc = quick_xml::de::from_str(xml).map_err(|e| CoreError::Snapshot {
            message: e.to_string(),
        })?;

        let project = network.project_name();
        let number = i64::from(network.network_number().ok_or_else(|| {
            CoreError::InvalidDatabaseAddress {
                address: network.to_string(),
            }
        })?);

        let network_tag = match doc.network_number.as_deref().map(str::trim) {
            Some(n) if n.parse::<i64>().ok() != Some(number) => {
                warn!(%network, document = n, "snapshot describes a different network, ignoring its tag");
                None
            }
            _ => doc.tag_name.filter(|t| !t.is_empty()),
        };

        let mut snapshot = Self {
            network: network.clone(),
            network_tag,
            fetched_at: Utc::now(),
            applications: Vec::with_capacity(doc.applications.len()),
            groups: Vec::new(),
            units: Vec::with_capacity(doc.units.len()),
            application_index: HashMap::new(),
            group_index: HashMap::new(),
            unit_index: HashMap::new(),
        };

        for app in doc.applications {
            let Some(app_number) = field_number(app.address.as_deref(), "Application") else {
                continue;
            };
            let address = match NetworkAddress::application(project, number, app_number) {
                Ok(address) => address,
                Err(e) => {
                    warn!(error = %e, "skipping application record");
                    continue;
                }
            };

            for group in app.groups {
                let Some(group_number) = field_number(group.address.as_deref(), "Group") else {
                    continue;
                };
                match NetworkAddress::group(project, number, app_number, group_number) {
                    Ok(group_address) => snapshot.insert_group(Group {
                        application: address.clone(),
                        address: group_address,
                        name: group.tag_name.unwrap_or_default(),
                    }),
                    Err(e) => warn!(error = %e, application = %address, "skipping group record"),
                }
            }

            snapshot.insert_application(Application {
                address,
                name: app.tag_name.unwrap_or_default(),
            });
        }

        for unit in doc.units {
            let Some(unit_number) = field_number(unit.address.as_deref(), "Unit") else {
                continue;
            };
            match NetworkAddress::unit(project, number, unit_number) {
                Ok(address) => snapshot.insert_unit(Unit {
                    address,
                    tag: unit.tag_name.unwrap_or_default(),
                    firmware_version: unit.firmware_version,
                    serial_number: unit.serial_number,
                    catalog_number: unit.catalog_number,
                    unit_type: unit.unit_type,
                }),
                Err(e) => warn!(error = %e, "skipping unit record"),
            }
        }

        debug!(
            %network,
            applications = snapshot.applications.len(),
            groups = snapshot.groups.len(),
            units = snapshot.units.len(),
            "object snapshot parsed"
        );
        Ok(snapshot)
    }

    fn insert_application(&mut self, app: Application) {
        if let Entry::Vacant(slot) = self.application_index.entry(app.address.key()) {
            slot.insert(self.applications.len());
            self.applications.push(app);
        } else {
            warn!(address = %app.address, "duplicate application record ignored");
        }
    }

    fn insert_group(&mut self, group: Group) {
        if let Entry::Vacant(slot) = self.group_index.entry(group.address.key()) {
            slot.insert(self.groups.len());
            self.groups.push(group);
        } else {
            warn!(address = %group.address, "duplicate group record ignored");
        }
    }

    fn insert_unit(&mut self, unit: Unit) {
        if let Entry::Vacant(slot) = self.unit_index.entry(unit.address.key()) {
            slot.insert(self.units.len());
            self.units.push(unit);
        } else {
            warn!(address = %unit.address, "duplicate unit record ignored");
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn network(&self) -> &NetworkAddress {
        &self.network
    }

    /// The network's own name, when the document carried one.
    pub fn network_tag(&self) -> Option<&str> {
        self.network_tag.as_deref()
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn applications(&self) -> &[Application] {
        &self.applications
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Groups belonging to one application, in document order.
    pub fn groups_of<'a>(&'a self, application: &'a NetworkAddress) -> impl Iterator<Item = &'a Group> {
        self.groups.iter().filter(move |g| &g.application == application)
    }

    pub fn application(&self, address: &NetworkAddress) -> Option<&Application> {
        self.lookup(address, &self.application_index)
            .and_then(|i| self.applications.get(i))
    }

    pub fn group(&self, address: &NetworkAddress) -> Option<&Group> {
        self.lookup(address, &self.group_index)
            .and_then(|i| self.groups.get(i))
    }

    pub fn unit(&self, address: &NetworkAddress) -> Option<&Unit> {
        self.lookup(address, &self.unit_index)
            .and_then(|i| self.units.get(i))
    }

    fn lookup(&self, address: &NetworkAddress, index: &HashMap<AddressKey, usize>) -> Option<usize> {
        // Packed keys carry no project; guard against cross-project hits.
        if address.project_name() != self.network.project_name() {
            return None;
        }
        index.get(&address.key()).copied()
    }
}

/// Parse a record's `<Address>` text, warning and skipping when unusable.
fn field_number(text: Option<&str>, record: &str) -> Option<i64> {
    let Some(text) = text.map(str::trim) else {
        warn!(record, "skipping record without an address");
        return None;
    };
    match text.parse::<i64>() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!(record, address = text, "skipping record with non-numeric address");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) const DOCUMENT: &str = r"<Network>
<TagName>Ground Floor</TagName>
<NetworkNumber>254</NetworkNumber>
<Interface><InterfaceType>cni</InterfaceType></Interface>
<Application>
  <Address>56</Address>
  <TagName>Lighting</TagName>
  <Group><Address>3</Address><TagName>Kitchen</TagName></Group>
  <Group><Address>4</Address><TagName>Dining</TagName></Group>
  <Group><Address>300</Address><TagName>Bogus</TagName></Group>
</Application>
<Unit>
  <Address>12</Address>
  <TagName>Hall Dimmer</TagName>
  <FirmwareVersion>4.3.00</FirmwareVersion>
  <SerialNumber>1029384</SerialNumber>
  <CatalogNumber>L5504D2U</CatalogNumber>
  <UnitType>DIMDN8</UnitType>
</Unit>
<Application>
  <Address>202</Address>
  <TagName>Trigger Control</TagName>
  <Group><Address>1</Address><TagName>Scenes</TagName></Group>
</Application>
<Unit><TagName>No Address</TagName></Unit>
</Network>";

    fn network() -> NetworkAddress {
        NetworkAddress::network("HOME", 254).unwrap()
    }

    fn addr(text: &str) -> NetworkAddress {
        NetworkAddress::parse(text).unwrap()
    }

    #[test]
    fn parses_entities_and_indexes() {
        let snapshot = Snapshot::parse(&network(), DOCUMENT).unwrap();

        assert_eq!(snapshot.network_tag(), Some("Ground Floor"));
        assert_eq!(snapshot.applications().len(), 2);
        assert_eq!(snapshot.groups().len(), 3);
        assert_eq!(snapshot.units().len(), 1);

        let kitchen = snapshot.group(&addr("//HOME/254/56/3")).unwrap();
        assert_eq!(kitchen.name, "Kitchen");
        assert_eq!(kitchen.application, addr("//HOME/254/56"));

        let lighting = snapshot.application(&addr("//HOME/254/56")).unwrap();
        assert_eq!(lighting.name, "Lighting");

        let unit = snapshot.unit(&addr("//HOME/254/p/12")).unwrap();
        assert_eq!(unit.tag, "Hall Dimmer");
        assert_eq!(unit.catalog_number.as_deref(), Some("L5504D2U"));
    }

    #[test]
    fn application_and_group_zero_do_not_collide() {
        let xml = r"<Network><NetworkNumber>254</NetworkNumber>
<Application><Address>56</Address><TagName>Lighting</TagName>
<Group><Address>0</Address><TagName>Group Zero</TagName></Group>
</Application></Network>";
        let snapshot = Snapshot::parse(&network(), xml).unwrap();
        assert_eq!(snapshot.application(&addr("//HOME/254/56")).unwrap().name, "Lighting");
        assert_eq!(snapshot.group(&addr("//HOME/254/56/0")).unwrap().name, "Group Zero");
    }

    #[test]
    fn lookups_are_scoped_to_the_project() {
        let snapshot = Snapshot::parse(&network(), DOCUMENT).unwrap();
        assert!(snapshot.group(&addr("//OTHER/254/56/3")).is_none());
        assert!(snapshot.group(&addr("//HOME/253/56/3")).is_none());
    }

    #[test]
    fn groups_of_application() {
        let snapshot = Snapshot::parse(&network(), DOCUMENT).unwrap();
        let application = addr("//HOME/254/56");
        let names: Vec<&str> = snapshot
            .groups_of(&application)
            .map(|g| g.name.as_str())
            .collect();
        assert_eq!(names, vec!["Kitchen", "Dining"]);
    }

    #[test]
    fn mismatched_network_number_drops_the_tag() {
        let xml = "<Network><TagName>Upstairs</TagName><NetworkNumber>200</NetworkNumber></Network>";
        let snapshot = Snapshot::parse(&network(), xml).unwrap();
        assert_eq!(snapshot.network_tag(), None);
    }

    #[test]
    fn malformed_document_fails() {
        let err = Snapshot::parse(&network(), "<Network><Application>").unwrap_err();
        assert!(matches!(err, CoreError::Snapshot { .. }), "{err:?}");
    }
}
