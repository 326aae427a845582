// ── Object database ──
//
// Name resolution for one network. Holds the latest snapshot behind an
// `ArcSwapOption`: readers are wait-free and always see a complete
// snapshot, a failed fetch leaves the previous one in place.

use std::future::Future;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use cgate_api::{AddressKind, GatewayClient, NetworkAddress};
use tracing::{debug, info};

use crate::error::CoreError;
use crate::model::{Application, Group, Unit};
use crate::snapshot::Snapshot;

/// Where snapshot documents come from.
///
/// Implemented by [`GatewayClient`]; tests substitute canned documents.
pub trait SnapshotSource {
    fn fetch_snapshot(
        &self,
        network: &NetworkAddress,
    ) -> impl Future<Output = Result<String, cgate_api::Error>> + Send;
}

impl SnapshotSource for GatewayClient {
    fn fetch_snapshot(
        &self,
        network: &NetworkAddress,
    ) -> impl Future<Output = Result<String, cgate_api::Error>> + Send {
        self.get_snapshot_xml(network)
    }
}

/// Object model of one network, refreshed on demand.
pub struct ObjectDatabase {
    network: NetworkAddress,
    snapshot: ArcSwapOption<Snapshot>,
}

impl ObjectDatabase {
    /// Create an empty database for a project/network address.
    pub fn new(network: NetworkAddress) -> Result<Self, CoreError> {
        if !network.is_network_id() {
            return Err(CoreError::InvalidDatabaseAddress {
                address: network.to_string(),
            });
        }
        Ok(Self {
            network,
            snapshot: ArcSwapOption::empty(),
        })
    }

    pub fn network(&self) -> &NetworkAddress {
        &self.network
    }

    /// Retrieve and parse a fresh snapshot, replacing the current one.
    ///
    /// On failure the previous snapshot stays in place.
    pub async fn fetch<S: SnapshotSource>(&self, source: &S) -> Result<Arc<Snapshot>, CoreError> {
        debug!(network = %self.network, "fetching object snapshot");
        let xml = source.fetch_snapshot(&self.network).await?;
        let snapshot = Arc::new(Snapshot::parse(&self.network, &xml)?);
        self.snapshot.store(Some(Arc::clone(&snapshot)));
        info!(
            network = %self.network,
            applications = snapshot.applications().len(),
            groups = snapshot.groups().len(),
            units = snapshot.units().len(),
            "object database loaded"
        );
        Ok(snapshot)
    }

    /// The current snapshot, if one has been loaded.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.load_full()
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot.load().is_some()
    }

    /// Display name for any address. Never fails: entries missing from
    /// the snapshot (or before the first fetch) get a synthesized name.
    pub fn tag(&self, address: &NetworkAddress) -> String {
        let snapshot = self.snapshot.load();
        let snapshot = snapshot.as_deref();

        let found = match address.kind() {
            AddressKind::Project => return address.project_name().to_owned(),
            AddressKind::Network => snapshot
                .filter(|s| s.network() == address)
                .and_then(Snapshot::network_tag)
                .map(str::to_owned),
            AddressKind::Application => snapshot
                .and_then(|s| s.application(address))
                .map(|a| a.name.clone()),
            AddressKind::Group => snapshot
                .and_then(|s| s.group(address))
                .map(|g| g.name.clone()),
            AddressKind::Unit => snapshot
                .and_then(|s| s.unit(address))
                .map(|u| u.tag.clone()),
        };

        found
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| fallback_tag(address))
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn applications(&self) -> Vec<Application> {
        self.snapshot
            .load()
            .as_deref()
            .map(|s| s.applications().to_vec())
            .unwrap_or_default()
    }

    pub fn groups(&self) -> Vec<Group> {
        self.snapshot
            .load()
            .as_deref()
            .map(|s| s.groups().to_vec())
            .unwrap_or_default()
    }

    pub fn units(&self) -> Vec<Unit> {
        self.snapshot
            .load()
            .as_deref()
            .map(|s| s.units().to_vec())
            .unwrap_or_default()
    }

    pub fn application(&self, address: &NetworkAddress) -> Option<Application> {
        self.snapshot.load().as_deref()?.application(address).cloned()
    }

    pub fn group(&self, address: &NetworkAddress) -> Option<Group> {
        self.snapshot.load().as_deref()?.group(address).cloned()
    }

    pub fn unit(&self, address: &NetworkAddress) -> Option<Unit> {
        self.snapshot.load().as_deref()?.unit(address).cloned()
    }
}

/// `net{N}`, `app{N}`, `group{N}`, `unit{N}`.
fn fallback_tag(address: &NetworkAddress) -> String {
    let number = |n: Option<u8>| n.map(|n| n.to_string()).unwrap_or_default();
    match address.kind() {
        AddressKind::Project => address.project_name().to_owned(),
        AddressKind::Network => format!("net{}", number(address.network_number())),
        AddressKind::Application => format!("app{}", number(address.application_number())),
        AddressKind::Group => format!("group{}", number(address.group_number())),
        AddressKind::Unit => format!("unit{}", number(address.unit_address())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::snapshot::tests::DOCUMENT;
    use pretty_assertions::assert_eq;

    /// Serves a fixed sequence of documents, then errors.
    struct Scripted {
        documents: Vec<Result<String, cgate_api::Error>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(documents: Vec<Result<String, cgate_api::Error>>) -> Self {
            Self {
                documents,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl SnapshotSource for Scripted {
        fn fetch_snapshot(
            &self,
            _network: &NetworkAddress,
        ) -> impl Future<Output = Result<String, cgate_api::Error>> + Send {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let result = self
                .documents
                .get(call)
                .cloned()
                .unwrap_or(Err(cgate_api::Error::Stopped));
            async move { result }
        }
    }

    fn addr(text: &str) -> NetworkAddress {
        NetworkAddress::parse(text).unwrap()
    }

    fn database() -> ObjectDatabase {
        ObjectDatabase::new(addr("//HOME/254")).unwrap()
    }

    #[test]
    fn rejects_non_network_address() {
        for text in ["//HOME", "//HOME/254/56", "//HOME/254/56/3", "//HOME/254/p/1"] {
            assert!(
                matches!(
                    ObjectDatabase::new(addr(text)),
                    Err(CoreError::InvalidDatabaseAddress { .. })
                ),
                "{text}"
            );
        }
    }

    #[test]
    fn tags_before_first_fetch_are_synthesized() {
        let db = database();
        assert!(!db.is_loaded());
        assert_eq!(db.tag(&addr("//HOME")), "HOME");
        assert_eq!(db.tag(&addr("//HOME/254")), "net254");
        assert_eq!(db.tag(&addr("//HOME/254/56")), "app56");
        assert_eq!(db.tag(&addr("//HOME/254/56/3")), "group3");
        assert_eq!(db.tag(&addr("//HOME/254/p/12")), "unit12");
        assert!(db.applications().is_empty());
    }

    #[tokio::test]
    async fn fetch_loads_names() {
        let db = database();
        let source = Scripted::new(vec![Ok(DOCUMENT.to_owned())]);
        db.fetch(&source).await.unwrap();

        assert!(db.is_loaded());
        assert_eq!(db.tag(&addr("//HOME/254")), "Ground Floor");
        assert_eq!(db.tag(&addr("//HOME/254/56")), "Lighting");
        assert_eq!(db.tag(&addr("//HOME/254/56/3")), "Kitchen");
        assert_eq!(db.tag(&addr("//HOME/254/p/12")), "Hall Dimmer");
        // Absent entries and other networks still fall back.
        assert_eq!(db.tag(&addr("//HOME/254/56/99")), "group99");
        assert_eq!(db.tag(&addr("//HOME/17")), "net17");
        assert_eq!(db.applications().len(), 2);
        assert_eq!(db.unit(&addr("//HOME/254/p/12")).unwrap().unit_type.as_deref(), Some("DIMDN8"));
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_snapshot() {
        let db = database();
        let source = Scripted::new(vec![
            Ok(DOCUMENT.to_owned()),
            Err(cgate_api::Error::Connection("reset".into())),
            Ok("<Network><Application>".to_owned()),
        ]);

        let first = db.fetch(&source).await.unwrap();

        let err = db.fetch(&source).await.unwrap_err();
        assert!(matches!(err, CoreError::ConnectionFailed { .. }), "{err:?}");
        let err = db.fetch(&source).await.unwrap_err();
        assert!(matches!(err, CoreError::Snapshot { .. }), "{err:?}");

        let current = db.snapshot().unwrap();
        assert!(Arc::ptr_eq(&first, &current));
        assert_eq!(db.tag(&addr("//HOME/254/56/3")), "Kitchen");
    }

    #[tokio::test]
    async fn refetch_replaces_snapshot_wholesale() {
        let db = database();
        let source = Scripted::new(vec![
            Ok(DOCUMENT.to_owned()),
            Ok("<Network><Application><Address>56</Address><TagName>Lights</TagName></Application></Network>".to_owned()),
        ]);

        db.fetch(&source).await.unwrap();
        db.fetch(&source).await.unwrap();

        assert_eq!(db.tag(&addr("//HOME/254/56")), "Lights");
        assert_eq!(db.tag(&addr("//HOME/254/56/3")), "group3");
        assert!(db.units().is_empty());
    }
}
