//! DPL Array Adapter
//!
//! A command and transport layer for DPL-family storage arrays speaking a
//! CDMI-flavored REST dialect over HTTPS.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Hosting Control Plane                       │
//! │        (volume/snapshot/group/export lifecycle callers)         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌───────────────────────────┐   ┌───────────────────────────┐  │
//! │  │        DplAdapter         │──▶│        EventWaiter        │  │
//! │  │  (orchestration, rollback)│   │  (bounded status polling) │  │
//! │  └─────────────┬─────────────┘   └───────────────────────────┘  │
//! │                │ DplCommands                                    │
//! │  ┌─────────────┴─────────────┐                                  │
//! │  │          DplApi           │  paths, typed payloads,          │
//! │  │     (request builder)     │  expected status sets            │
//! │  └─────────────┬─────────────┘                                  │
//! │  ┌─────────────┴─────────────┐                                  │
//! │  │       DplTransport        │  TLS, auth, CDMI headers,        │
//! │  │   (HTTPS + retry/classify)│  503 retry, outcome classing     │
//! │  └─────────────┬─────────────┘                                  │
//! └────────────────┼────────────────────────────────────────────────┘
//!                  ▼
//!           DPL storage array
//! ```
//!
//! # Modules
//!
//! - [`adapter`]: Orchestration over the command set, plus the event waiter
//! - [`api`]: Per-operation request builders and the [`api::DplCommands`] trait
//! - [`transport`]: HTTPS session, retry loop, and outcome classification
//! - [`domain`]: Core entity types and the lifecycle/host ports
//! - [`error`]: Error types and handling

pub mod adapter;
pub mod api;
pub mod domain;
pub mod error;
pub mod transport;

// Re-export commonly used types
pub use adapter::waiter::{EventWaiter, WaitOutcome, WaiterConfig, DEFAULT_RETRY_BUDGET};
pub use adapter::DplAdapter;
pub use api::{DplApi, DplCommands};
pub use domain::ports::{
    ArrayInfo, ExportLifecycle, GroupLifecycle, HostModel, SnapshotLifecycle, StandaloneHost,
    VolumeLifecycle,
};
pub use domain::{
    canonical_id, FcExportSpec, GroupSpec, IscsiExportSpec, PoolStats, ServerInfo, SnapshotSpec,
    VolumeSpec, MAX_SNAPSHOTS,
};
pub use error::{Error, Result};
pub use transport::{CommandOutcome, DplConfig, DplTransport, CONNECTION_RETRY};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
