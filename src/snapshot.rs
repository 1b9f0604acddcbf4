//! Configuration snapshot entity and the shared cell guarding it

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

/// Which remote store supplies a field's value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// A secret in the Key Vault
    Secret,
    /// A key-value in the App Configuration store
    Setting,
}

/// Mapping of one snapshot field to its remote resource
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Display name used when rendering the snapshot
    pub name: &'static str,
    /// Store the value comes from
    pub kind: SourceKind,
    /// Secret name or setting key in that store
    pub key: &'static str,
}

/// The snapshot's field table, in declared (and rendered) order.
///
/// Both the fetch routine and the renderer consult this table, so the
/// field set and its resource mapping are fixed at compile time.
pub const FIELDS: [FieldSpec; 4] = [
    FieldSpec {
        name: "KeyVaultFoo",
        kind: SourceKind::Secret,
        key: "ze-kv-foo",
    },
    FieldSpec {
        name: "KeyVaultBar",
        kind: SourceKind::Secret,
        key: "ze-kv-bar",
    },
    FieldSpec {
        name: "AppConfigFoo",
        kind: SourceKind::Setting,
        key: "ze-ac-foo",
    },
    FieldSpec {
        name: "AppConfigBar",
        kind: SourceKind::Setting,
        key: "ze-ac-bar",
    },
];

/// One fully-populated application configuration snapshot
///
/// Immutable once constructed; the Refresher builds a brand-new snapshot per
/// fetch and installs it wholesale, never mutating the current one in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub key_vault_foo: String,
    pub key_vault_bar: String,
    pub app_config_foo: String,
    pub app_config_bar: String,
}

impl Snapshot {
    /// Build a snapshot from values in [`FIELDS`] order
    pub fn from_values(values: [String; FIELDS.len()]) -> Self {
        let [key_vault_foo, key_vault_bar, app_config_foo, app_config_bar] = values;
        Self {
            key_vault_foo,
            key_vault_bar,
            app_config_foo,
            app_config_bar,
        }
    }

    /// Field values in [`FIELDS`] order
    pub fn values(&self) -> [&str; FIELDS.len()] {
        [
            &self.key_vault_foo,
            &self.key_vault_bar,
            &self.app_config_foo,
            &self.app_config_bar,
        ]
    }

    /// Render the snapshot as the fixed multi-line report format
    ///
    /// A `Config:` header followed by one indented `Name=value` line per
    /// field, in declared field order.
    pub fn render(&self) -> String {
        let mut out = String::from("Config:");
        for (spec, value) in FIELDS.iter().zip(self.values()) {
            out.push_str("\n\t");
            out.push_str(spec.name);
            out.push('=');
            out.push_str(value);
        }
        out
    }
}

/// Single-writer/multi-reader cell holding the current snapshot
///
/// The Refresher is the only writer; the Reporter (and any future readers)
/// read concurrently. Replacement is atomic with respect to readers, so a
/// completed read always returns a self-consistent snapshot.
#[derive(Debug, Clone, Default)]
pub struct SharedSnapshot {
    inner: Arc<RwLock<Snapshot>>,
}

impl SharedSnapshot {
    /// Create a cell holding the empty placeholder snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current snapshot with a newly fetched one
    pub async fn replace(&self, next: Snapshot) {
        let mut guard = self.inner.write().await;
        *guard = next;
        debug!("SharedSnapshot::replace: installed new snapshot");
    }

    /// Read the current snapshot
    ///
    /// Clones out under the read lock; callers never hold a reference past
    /// the critical section.
    pub async fn read(&self) -> Snapshot {
        self.inner.read().await.clone()
    }
}
