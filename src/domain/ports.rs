//! Domain ports - trait boundaries between the adapter and its host.
//!
//! The adapter exposes a small set of capability traits (volume, snapshot,
//! group and export lifecycles) that the hosting control plane composes as
//! needed, and consumes one collaborator trait ([`HostModel`]) for the
//! entity-record lookups only the host can answer.

use crate::domain::{
    FcExportSpec, GroupSpec, IscsiExportSpec, PoolStats, ServerInfo, SnapshotSpec, VolumeSpec,
};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

// =============================================================================
// Host Collaborator Port
// =============================================================================

/// Entity-record lookups supplied by the hosting control plane.
#[async_trait]
pub trait HostModel: Send + Sync {
    /// Whether the group takes consistency-group snapshots. Volumes only
    /// join array-side groups of this kind.
    async fn is_consistency_snapshot_group(&self, group_id: &str) -> Result<bool>;

    /// The group a volume currently belongs to, if any.
    async fn volume_group_id(&self, volume_id: &str) -> Result<Option<String>>;
}

/// [`HostModel`] for hosts without group records. Never joins groups.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandaloneHost;

#[async_trait]
impl HostModel for StandaloneHost {
    async fn is_consistency_snapshot_group(&self, _group_id: &str) -> Result<bool> {
        Ok(false)
    }

    async fn volume_group_id(&self, _volume_id: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

// =============================================================================
// Volume Lifecycle Port
// =============================================================================

/// Block volume provisioning operations.
///
/// Every operation blocks (asynchronously) until the array reaches a
/// terminal state, including any polling wait for accepted work. Callers
/// are expected to serialize operations per volume; the adapter performs
/// no per-entity locking.
#[async_trait]
pub trait VolumeLifecycle: Send + Sync {
    /// Create a volume; joins its consistency group when one is set,
    /// deleting the volume again if the join fails.
    async fn create_volume(&self, volume: &VolumeSpec) -> Result<()>;

    /// Delete a volume. Deleting an absent volume is success.
    async fn delete_volume(&self, volume: &VolumeSpec) -> Result<()>;

    /// Grow a volume to `new_size_bytes`.
    async fn extend_volume(&self, volume: &VolumeSpec, new_size_bytes: u64) -> Result<()>;

    /// Create a full copy of `source_volume_id` described by `volume`.
    async fn clone_volume(&self, volume: &VolumeSpec, source_volume_id: &str) -> Result<()>;

    /// Create a volume from a snapshot. When the snapshot was taken as a
    /// group snapshot, the per-volume snapshot is resolved through the
    /// group snapshot member map first.
    async fn create_volume_from_snapshot(
        &self,
        volume: &VolumeSpec,
        snapshot: &SnapshotSpec,
    ) -> Result<()>;

    /// Create a space-efficient volume referencing the snapshot data.
    async fn spawn_volume_from_snapshot(
        &self,
        volume: &VolumeSpec,
        snapshot: &SnapshotSpec,
    ) -> Result<()>;

    /// Roll a volume back to one of its snapshots.
    async fn restore_volume(&self, volume_id: &str, snapshot_id: &str) -> Result<()>;
}

// =============================================================================
// Snapshot Lifecycle Port
// =============================================================================

/// Per-volume snapshot operations.
#[async_trait]
pub trait SnapshotLifecycle: Send + Sync {
    async fn create_snapshot(&self, snapshot: &SnapshotSpec) -> Result<()>;

    /// Delete a snapshot. Deleting an absent snapshot is success.
    async fn delete_snapshot(&self, snapshot: &SnapshotSpec) -> Result<()>;

    /// Identifiers of the snapshots a volume currently has.
    async fn list_snapshots(&self, volume_id: &str) -> Result<Vec<String>>;
}

// =============================================================================
// Group Lifecycle Port
// =============================================================================

/// Volume group (consistency group) operations.
#[async_trait]
pub trait GroupLifecycle: Send + Sync {
    async fn create_group(&self, group: &GroupSpec) -> Result<()>;

    /// Delete a group, then best-effort delete its member volumes. Reports
    /// an error when any member delete fails.
    async fn delete_group(&self, group_id: &str, member_volume_ids: &[String]) -> Result<()>;

    /// Apply membership changes. Volumes already in the group are not
    /// re-joined; volumes not in the group are not asked to leave.
    async fn update_group(&self, group_id: &str, add: &[String], remove: &[String]) -> Result<()>;

    /// Take a group-consistent snapshot of all member volumes.
    async fn create_group_snapshot(&self, group_id: &str, snapshot: &SnapshotSpec) -> Result<()>;

    /// Delete a group snapshot. Absence is success.
    async fn delete_group_snapshot(&self, group_id: &str, snapshot_id: &str) -> Result<()>;

    /// Resolve the per-volume snapshot identifier inside a group snapshot.
    /// The volume missing from the member map is a fatal error.
    async fn snapshot_id_in_group_snapshot(
        &self,
        group_id: &str,
        group_snapshot_id: &str,
        volume_id: &str,
    ) -> Result<String>;
}

// =============================================================================
// Export Lifecycle Port
// =============================================================================

/// Export target and volume assignment operations (iSCSI and FC).
///
/// Assignment calls return the raw export descriptor reported by the array;
/// its shape is protocol-specific and consumed by the host's connection
/// brokering, not interpreted here.
#[async_trait]
pub trait ExportLifecycle: Send + Sync {
    async fn assign_iscsi(&self, volume_id: &str, export: &IscsiExportSpec) -> Result<Value>;

    async fn unassign_iscsi(
        &self,
        volume_id: &str,
        initiator_iqn: &str,
        target_iqn: &str,
    ) -> Result<()>;

    async fn assign_fc(&self, volume_id: &str, export: &FcExportSpec) -> Result<Value>;

    async fn unassign_fc(
        &self,
        volume_id: &str,
        target_wwpn: &str,
        initiator_wwpns: &[String],
    ) -> Result<()>;

    async fn create_target(
        &self,
        target_id: &str,
        protocol: &str,
        name: &str,
        address: &str,
    ) -> Result<()>;

    async fn get_target(&self, target_id: &str) -> Result<Value>;

    /// Identifiers of export targets, optionally filtered by protocol.
    async fn list_targets(&self, protocol: Option<&str>) -> Result<Vec<String>>;

    /// Delete an export target. Absence is success.
    async fn delete_target(&self, target_id: &str) -> Result<()>;

    /// Fibre-Channel simple name service lookup for a port WWPN.
    async fn sns_table(&self, wwpn: &str) -> Result<Value>;
}

// =============================================================================
// Array Info Port
// =============================================================================

/// Read-only array facts for scheduler/stats reporting.
#[async_trait]
pub trait ArrayInfo: Send + Sync {
    /// Vendor and version metadata from the system endpoint.
    async fn server_info(&self) -> Result<ServerInfo>;

    /// Capacity accounting for the given pools, or for every pool the
    /// array reports when `pool_ids` is empty.
    async fn pool_stats(&self, pool_ids: &[String]) -> Result<Vec<PoolStats>>;

    /// Capacity accounting for a single pool.
    async fn pool_info(&self, pool_id: &str) -> Result<PoolStats>;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type HostModelRef = Arc<dyn HostModel>;
pub type VolumeLifecycleRef = Arc<dyn VolumeLifecycle>;
pub type SnapshotLifecycleRef = Arc<dyn SnapshotLifecycle>;
pub type GroupLifecycleRef = Arc<dyn GroupLifecycle>;
pub type ExportLifecycleRef = Arc<dyn ExportLifecycle>;
