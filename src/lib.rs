//! cfgwatch - Azure configuration snapshot watcher
//!
//! Periodically refreshes an application's configuration from a Key Vault
//! (secrets) and an App Configuration store (settings) and prints the
//! current snapshot on an interval. Two tokio tasks share one snapshot
//! behind a read-write lock:
//!
//! - **Refresher**: fetches a brand-new snapshot every interval and installs
//!   it wholesale; a fetch failure is fatal to the whole program.
//! - **Reporter**: renders the current snapshot to stdout every interval.
//!
//! Both observe one shared shutdown signal, tripped by SIGINT/SIGTERM or by
//! the first task failure.
//!
//! # Modules
//!
//! - [`snapshot`] - The snapshot entity and the shared read-write cell
//! - [`credential`] - Ambient token credential resolution
//! - [`remote`] - Snapshot source trait and the Azure REST implementation
//! - [`refresher`] / [`reporter`] - The two interval loops
//! - [`coordinator`] - Bootstrap, supervision, and signal handling
//! - [`config`] - Daemon configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod credential;
pub mod refresher;
pub mod remote;
pub mod reporter;
pub mod snapshot;

// Re-export commonly used types
pub use config::{Config, RefreshConfig, ReportConfig};
pub use coordinator::{Coordinator, ShutdownHandle};
pub use credential::{AccessToken, CredentialError, EnvCredential, TokenCredential};
pub use refresher::Refresher;
pub use remote::{APP_CONFIG_NAME, AzureSource, ConfigSource, FetchError, KEY_VAULT_NAME};
pub use reporter::Reporter;
pub use snapshot::{FIELDS, FieldSpec, SharedSnapshot, Snapshot, SourceKind};
