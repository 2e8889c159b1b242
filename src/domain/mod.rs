//! Core domain types shared across the adapter.

pub mod ports;

use serde::{Deserialize, Serialize};

/// Default cap on per-entity snapshot count, matching the array default.
pub const MAX_SNAPSHOTS: u32 = 1024;

/// Canonical form of an entity identifier as the array expects it on the
/// wire: a source-side UUID with the separators stripped.
///
/// Idempotent: feeding an already-canonical identifier back in is a no-op.
pub fn canonical_id(id: &str) -> String {
    id.replace('-', "")
}

// =============================================================================
// Entity Specifications
// =============================================================================

/// A block volume ("vdev") as the host control plane describes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeSpec {
    /// Host-side volume identifier (UUID, separators allowed)
    pub id: String,
    /// Display name; falls back to the identifier when empty
    pub name: String,
    /// Display description
    pub description: String,
    /// Owning pool identifier
    pub pool: String,
    /// Requested capacity in bytes
    pub size_bytes: u64,
    /// Allocate on demand rather than up front
    pub thin_provision: bool,
    /// Per-volume snapshot quota; the array default applies when unset
    pub snapshot_quota: Option<u64>,
    /// Group the volume should belong to, if any
    pub group_id: Option<String>,
}

/// A snapshot of a single volume, possibly taken as part of a group snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSpec {
    /// Host-side snapshot identifier
    pub id: String,
    /// Volume the snapshot belongs to
    pub volume_id: String,
    /// Size of the source volume at snapshot time, in bytes
    pub volume_size_bytes: u64,
    /// Display name; falls back to the identifier when empty
    pub name: String,
    /// Display description
    pub description: String,
    /// Set when the snapshot was taken as part of a group snapshot
    pub group_snapshot_id: Option<String>,
}

/// A volume group (consistency group) on the array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSpec {
    /// Host-side group identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Display description
    pub description: String,
}

// =============================================================================
// Export Arguments
// =============================================================================

/// Arguments for an iSCSI export assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IscsiExportSpec {
    /// Initiator IQN granted access
    pub initiator_iqn: String,
    /// Logical unit name presented to the initiator
    pub lun_name: String,
    /// Portal address (host:port)
    pub portal: String,
}

/// Arguments for a Fibre-Channel export assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcExportSpec {
    /// Target port WWPN
    pub target_wwpn: String,
    /// Initiator WWPNs granted access
    pub initiator_wwpns: Vec<String>,
    /// Logical unit name presented to the initiators
    pub lun_name: String,
    /// Logical unit number; -1 lets the array pick
    pub lun: i64,
}

// =============================================================================
// Read-Only Array Facts
// =============================================================================

/// Capacity accounting for one allocation pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Pool identifier as reported by the array
    pub pool_id: String,
    /// Total capacity in bytes
    pub total_capacity_bytes: u64,
    /// Unallocated capacity in bytes
    pub available_capacity_bytes: u64,
}

/// Vendor metadata reported by the array system endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub vendor: String,
    pub version: String,
}
