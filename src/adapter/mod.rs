//! Backend orchestration over the command API.
//!
//! [`DplAdapter`] sequences [`DplCommands`] calls into the synchronous
//! lifecycle contract the host expects: when the array accepts work
//! asynchronously it drives the event waiter to a terminal state, and it
//! is the single layer that converts non-success outcomes into raised
//! backend errors. Compound operations (create-then-join-group) roll back
//! the completed step on partial failure so no orphaned volume survives
//! a failed operation.

pub mod waiter;

use crate::api::wire::{EventEnvelope, GroupSnapshotEnvelope, PoolEnvelope, SystemEnvelope};
use crate::api::DplCommands;
use crate::domain::ports::{
    ArrayInfo, ExportLifecycle, GroupLifecycle, HostModel, SnapshotLifecycle, VolumeLifecycle,
};
use crate::domain::{
    canonical_id, FcExportSpec, GroupSpec, IscsiExportSpec, PoolStats, ServerInfo, SnapshotSpec,
    VolumeSpec,
};
use crate::error::{Error, Result};
use crate::transport::CommandOutcome;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use waiter::{EventWaiter, WaitOutcome, WaiterConfig};

// =============================================================================
// Adapter
// =============================================================================

/// Orchestration layer bound to one array.
///
/// Stateless apart from its construction-time collaborators; the host is
/// expected to serialize operations per entity.
pub struct DplAdapter {
    commands: Arc<dyn DplCommands>,
    host: Arc<dyn HostModel>,
    waiter: EventWaiter,
}

impl DplAdapter {
    pub fn new(commands: Arc<dyn DplCommands>, host: Arc<dyn HostModel>) -> Self {
        Self {
            commands,
            host,
            waiter: EventWaiter::with_defaults(),
        }
    }

    /// Override polling behavior (mainly for tests and slow arrays).
    pub fn with_waiter_config(mut self, config: WaiterConfig) -> Self {
        self.waiter = EventWaiter::new(config);
        self
    }

    // -------------------------------------------------------------------------
    // Polling helpers
    // -------------------------------------------------------------------------

    async fn wait_volume_event(&self, volume_id: &str, event_id: &str) -> WaitOutcome {
        let vid = canonical_id(volume_id);
        let eid = canonical_id(event_id);
        self.waiter
            .wait(|| self.commands.get_vdev_status(&vid, &eid))
            .await
    }

    async fn wait_pool_event(&self, pool_id: &str, event_id: &str) -> WaitOutcome {
        let pid = canonical_id(pool_id);
        let eid = canonical_id(event_id);
        self.waiter
            .wait(|| self.commands.get_pool_status(&pid, &eid))
            .await
    }

    /// Poll a volume without an event scope; deletes report no event id.
    async fn wait_volume(&self, volume_id: &str) -> WaitOutcome {
        let vid = canonical_id(volume_id);
        self.waiter.wait(|| self.commands.get_vdev(&vid)).await
    }

    /// Standard completion handling for volume-scoped operations.
    ///
    /// `entity_id` names the entity in errors; `poll_volume_id` is the
    /// volume whose status resolves an accepted event (for snapshots the
    /// two differ). Returns the final response body.
    async fn finish_volume_op(
        &self,
        operation: &'static str,
        entity_id: &str,
        poll_volume_id: &str,
        outcome: CommandOutcome,
        absent_ok: bool,
    ) -> Result<Value> {
        match outcome {
            CommandOutcome::Success(body) => Ok(body),
            CommandOutcome::NoData if absent_ok => {
                info!(entity = %entity_id, operation, "entity already absent");
                Ok(Value::Null)
            }
            CommandOutcome::Accepted(body) => {
                let event = event_uuid(&body).ok_or_else(|| {
                    Error::backend(operation, entity_id, "malformed accept response: missing event identifier")
                })?;
                debug!(entity = %entity_id, %event, "operation accepted, polling");
                match self.wait_volume_event(poll_volume_id, &event).await {
                    WaitOutcome::Available(body) => Ok(body),
                    state => Err(Error::backend(
                        operation,
                        entity_id,
                        format!("terminal state {state:?}"),
                    )),
                }
            }
            other => Err(Error::backend(operation, entity_id, outcome_reason(&other))),
        }
    }

    // -------------------------------------------------------------------------
    // Group membership helpers
    // -------------------------------------------------------------------------

    async fn join_group(&self, volume_id: &str, group_id: &str) -> Result<()> {
        let outcome = self.commands.join_vg(volume_id, group_id).await?;
        self.finish_volume_op("join group", volume_id, volume_id, outcome, false)
            .await?;
        info!(volume = %volume_id, group = %group_id, "volume joined group");
        Ok(())
    }

    async fn leave_group(&self, volume_id: &str, group_id: &str) -> Result<()> {
        let outcome = self.commands.leave_vg(volume_id, group_id).await?;
        self.finish_volume_op("leave group", volume_id, volume_id, outcome, false)
            .await?;
        info!(volume = %volume_id, group = %group_id, "volume left group");
        Ok(())
    }

    /// Join the volume's consistency group when one is set; on failure the
    /// freshly created volume is deleted again before the error surfaces,
    /// so a failed compound create leaves no orphan behind.
    async fn join_group_if_needed(
        &self,
        volume: &VolumeSpec,
        operation: &'static str,
    ) -> Result<()> {
        let Some(group_id) = &volume.group_id else {
            return Ok(());
        };
        if !self.host.is_consistency_snapshot_group(group_id).await? {
            return Ok(());
        }
        match self.join_group(&volume.id, group_id).await {
            Ok(()) => Ok(()),
            Err(join_err) => {
                warn!(
                    volume = %volume.id,
                    group = %group_id,
                    error = %join_err,
                    "group join failed, rolling back volume create"
                );
                match self.commands.delete_vdev(&volume.id).await {
                    Ok(CommandOutcome::Success(_))
                    | Ok(CommandOutcome::Accepted(_))
                    | Ok(CommandOutcome::NoData) => {}
                    Ok(other) => {
                        error!(volume = %volume.id, ?other, "rollback delete failed, volume orphaned")
                    }
                    Err(e) => {
                        error!(volume = %volume.id, error = %e, "rollback delete failed, volume orphaned")
                    }
                }
                Err(Error::backend(
                    operation,
                    &volume.id,
                    format!("failed to join group {group_id}: {join_err}"),
                ))
            }
        }
    }
}

fn event_uuid(body: &Value) -> Option<String> {
    let envelope: EventEnvelope = serde_json::from_value(body.clone()).ok()?;
    envelope
        .metadata
        .and_then(|m| m.event_uuid)
        .filter(|id| !id.is_empty())
}

fn outcome_reason(outcome: &CommandOutcome) -> String {
    match outcome {
        CommandOutcome::Failed(status) => format!("unexpected array status {status}"),
        CommandOutcome::Malformed => "undecodable response body".to_string(),
        CommandOutcome::InvalidRequest => "request payload rejected before send".to_string(),
        CommandOutcome::NoData => "entity not found".to_string(),
        CommandOutcome::Success(_) | CommandOutcome::Accepted(_) => "unexpected outcome".to_string(),
    }
}

/// CDMI collection children, with any trailing separator stripped.
fn children_ids(body: &Value) -> Vec<String> {
    let Some(children) = body.get("children").and_then(Value::as_array) else {
        return Vec::new();
    };
    children
        .iter()
        .filter_map(|child| match child {
            Value::String(id) => Some(id.trim_end_matches('/').to_string()),
            // Pool listings pair identifier and display name.
            Value::Array(pair) => pair.first().and_then(Value::as_str).map(str::to_string),
            other => {
                warn!(?other, "unrecognized child entry in collection listing");
                None
            }
        })
        .collect()
}

// =============================================================================
// Volume Lifecycle
// =============================================================================

#[async_trait]
impl VolumeLifecycle for DplAdapter {
    async fn create_volume(&self, volume: &VolumeSpec) -> Result<()> {
        let outcome = self.commands.create_vdev(volume).await?;
        self.finish_volume_op("create volume", &volume.id, &volume.id, outcome, false)
            .await?;
        info!(volume = %volume.id, pool = %volume.pool, "volume created");
        self.join_group_if_needed(volume, "create volume").await
    }

    async fn delete_volume(&self, volume: &VolumeSpec) -> Result<()> {
        if let Some(group_id) = &volume.group_id {
            match self.host.is_consistency_snapshot_group(group_id).await {
                Ok(true) => {
                    if let Err(e) = self.leave_group(&volume.id, group_id).await {
                        warn!(
                            volume = %volume.id,
                            group = %group_id,
                            error = %e,
                            "failed to leave group before delete"
                        );
                    }
                }
                Ok(false) => {}
                Err(e) => warn!(group = %group_id, error = %e, "group lookup failed"),
            }
        }

        let outcome = self.commands.delete_vdev(&volume.id).await?;
        match outcome {
            CommandOutcome::Success(_) => {
                info!(volume = %volume.id, "volume deleted");
                Ok(())
            }
            CommandOutcome::NoData => {
                info!(volume = %volume.id, "volume does not exist");
                Ok(())
            }
            CommandOutcome::Accepted(_) => match self.wait_volume(&volume.id).await {
                WaitOutcome::Error => Err(Error::backend(
                    "delete volume",
                    &volume.id,
                    "terminal state error",
                )),
                _ => Ok(()),
            },
            other => Err(Error::backend(
                "delete volume",
                &volume.id,
                outcome_reason(&other),
            )),
        }
    }

    async fn extend_volume(&self, volume: &VolumeSpec, new_size_bytes: u64) -> Result<()> {
        let outcome = self
            .commands
            .extend_vdev(&volume.id, &volume.name, &volume.description, new_size_bytes)
            .await?;
        self.finish_volume_op("extend volume", &volume.id, &volume.id, outcome, false)
            .await?;
        info!(volume = %volume.id, new_size_bytes, "volume extended");
        Ok(())
    }

    async fn clone_volume(&self, volume: &VolumeSpec, source_volume_id: &str) -> Result<()> {
        let outcome = self.commands.clone_vdev(source_volume_id, volume).await?;
        self.finish_volume_op("clone volume", &volume.id, &volume.id, outcome, false)
            .await?;
        info!(volume = %volume.id, source = %source_volume_id, "volume cloned");
        self.join_group_if_needed(volume, "clone volume").await
    }

    async fn create_volume_from_snapshot(
        &self,
        volume: &VolumeSpec,
        snapshot: &SnapshotSpec,
    ) -> Result<()> {
        // A snapshot taken as part of a group snapshot is addressed
        // through the group snapshot's member map, not by its own id.
        let mut snapshot_id = snapshot.id.clone();
        if let Some(group_snapshot_id) = &snapshot.group_snapshot_id {
            if let Some(group_id) = self.host.volume_group_id(&snapshot.volume_id).await? {
                snapshot_id = self
                    .snapshot_id_in_group_snapshot(&group_id, group_snapshot_id, &snapshot.volume_id)
                    .await?;
            }
        }

        let outcome = self
            .commands
            .create_vdev_from_snapshot(volume, &snapshot_id)
            .await?;
        self.finish_volume_op(
            "create volume from snapshot",
            &volume.id,
            &volume.id,
            outcome,
            false,
        )
        .await?;
        info!(volume = %volume.id, snapshot = %snapshot_id, "volume created from snapshot");

        if volume.size_bytes > snapshot.volume_size_bytes {
            self.extend_volume(volume, volume.size_bytes).await?;
        }
        self.join_group_if_needed(volume, "create volume from snapshot")
            .await
    }

    async fn spawn_volume_from_snapshot(
        &self,
        volume: &VolumeSpec,
        snapshot: &SnapshotSpec,
    ) -> Result<()> {
        let outcome = self
            .commands
            .spawn_vdev_from_snapshot(
                &volume.id,
                &snapshot.volume_id,
                &volume.name,
                &volume.description,
                &snapshot.id,
            )
            .await?;
        self.finish_volume_op(
            "spawn volume from snapshot",
            &volume.id,
            &volume.id,
            outcome,
            false,
        )
        .await?;
        info!(volume = %volume.id, snapshot = %snapshot.id, "volume spawned from snapshot");
        Ok(())
    }

    async fn restore_volume(&self, volume_id: &str, snapshot_id: &str) -> Result<()> {
        let outcome = self.commands.rollback_vdev(volume_id, snapshot_id).await?;
        self.finish_volume_op("restore volume", volume_id, volume_id, outcome, false)
            .await?;
        info!(volume = %volume_id, snapshot = %snapshot_id, "volume restored from snapshot");
        Ok(())
    }
}

// =============================================================================
// Snapshot Lifecycle
// =============================================================================

#[async_trait]
impl SnapshotLifecycle for DplAdapter {
    async fn create_snapshot(&self, snapshot: &SnapshotSpec) -> Result<()> {
        let outcome = self
            .commands
            .create_vdev_snapshot(
                &snapshot.volume_id,
                &snapshot.id,
                &snapshot.name,
                &snapshot.description,
                false,
            )
            .await?;
        self.finish_volume_op(
            "create snapshot",
            &snapshot.id,
            &snapshot.volume_id,
            outcome,
            false,
        )
        .await?;
        info!(snapshot = %snapshot.id, volume = %snapshot.volume_id, "snapshot created");
        Ok(())
    }

    async fn delete_snapshot(&self, snapshot: &SnapshotSpec) -> Result<()> {
        let outcome = self
            .commands
            .delete_vdev_snapshot(&snapshot.volume_id, &snapshot.id, false)
            .await?;
        self.finish_volume_op(
            "delete snapshot",
            &snapshot.id,
            &snapshot.volume_id,
            outcome,
            true,
        )
        .await?;
        info!(snapshot = %snapshot.id, "snapshot deleted");
        Ok(())
    }

    async fn list_snapshots(&self, volume_id: &str) -> Result<Vec<String>> {
        let outcome = self.commands.list_vdev_snapshots(volume_id, false).await?;
        match outcome {
            CommandOutcome::Success(body) => Ok(children_ids(&body)),
            other => Err(Error::backend(
                "list snapshots",
                volume_id,
                outcome_reason(&other),
            )),
        }
    }
}

// =============================================================================
// Group Lifecycle
// =============================================================================

#[async_trait]
impl GroupLifecycle for DplAdapter {
    async fn create_group(&self, group: &GroupSpec) -> Result<()> {
        let outcome = self.commands.create_vg(group).await?;
        match outcome {
            CommandOutcome::Success(_) => {
                info!(group = %group.id, "volume group created");
                Ok(())
            }
            // Group objects expose no status endpoint, so an accepted
            // create cannot be driven to completion. Fail and let the
            // host retry rather than report a group the array may
            // abandon.
            CommandOutcome::Accepted(_) => Err(Error::backend(
                "create group",
                &group.id,
                "accepted asynchronously with no pollable status",
            )),
            other => Err(Error::backend(
                "create group",
                &group.id,
                outcome_reason(&other),
            )),
        }
    }

    async fn delete_group(&self, group_id: &str, member_volume_ids: &[String]) -> Result<()> {
        let outcome = self.commands.delete_vg(group_id).await?;
        match outcome {
            CommandOutcome::Success(_) | CommandOutcome::NoData => {}
            other => {
                return Err(Error::backend(
                    "delete group",
                    group_id,
                    outcome_reason(&other),
                ))
            }
        }
        info!(group = %group_id, "volume group deleted");

        let mut failed = 0usize;
        for volume_id in member_volume_ids {
            match self.commands.delete_vdev(volume_id).await {
                Ok(CommandOutcome::Success(_))
                | Ok(CommandOutcome::Accepted(_))
                | Ok(CommandOutcome::NoData) => {}
                Ok(other) => {
                    warn!(volume = %volume_id, ?other, "member volume delete failed");
                    failed += 1;
                }
                Err(e) => {
                    warn!(volume = %volume_id, error = %e, "member volume delete failed");
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            return Err(Error::backend(
                "delete group",
                group_id,
                format!("{failed} member volume(s) failed to delete"),
            ));
        }
        Ok(())
    }

    async fn update_group(&self, group_id: &str, add: &[String], remove: &[String]) -> Result<()> {
        let outcome = self.commands.get_vg(group_id).await?;
        let members = match outcome {
            CommandOutcome::Success(body) => children_ids(&body),
            other => {
                return Err(Error::backend(
                    "update group",
                    group_id,
                    outcome_reason(&other),
                ))
            }
        };

        for volume_id in add {
            if members.contains(&canonical_id(volume_id)) {
                debug!(volume = %volume_id, group = %group_id, "already a member, skipping join");
                continue;
            }
            self.join_group(volume_id, group_id).await.map_err(|e| {
                Error::backend(
                    "update group",
                    group_id,
                    format!("failed to join volume {volume_id}: {e}"),
                )
            })?;
        }
        for volume_id in remove {
            if !members.contains(&canonical_id(volume_id)) {
                continue;
            }
            self.leave_group(volume_id, group_id).await.map_err(|e| {
                Error::backend(
                    "update group",
                    group_id,
                    format!("failed to remove volume {volume_id}: {e}"),
                )
            })?;
        }
        Ok(())
    }

    async fn create_group_snapshot(&self, group_id: &str, snapshot: &SnapshotSpec) -> Result<()> {
        let outcome = self
            .commands
            .create_vdev_snapshot(group_id, &snapshot.id, &snapshot.name, &snapshot.description, true)
            .await?;
        match outcome {
            CommandOutcome::Success(_) => {
                info!(group = %group_id, snapshot = %snapshot.id, "group snapshot created");
                Ok(())
            }
            // Unlike create_group, an accepted group snapshot is
            // tolerated: the snapshot set already exists array-side and
            // only its bookkeeping completes asynchronously.
            CommandOutcome::Accepted(_) => {
                warn!(group = %group_id, snapshot = %snapshot.id, "group snapshot accepted asynchronously, assuming completion");
                Ok(())
            }
            other => Err(Error::backend(
                "create group snapshot",
                &snapshot.id,
                outcome_reason(&other),
            )),
        }
    }

    async fn delete_group_snapshot(&self, group_id: &str, snapshot_id: &str) -> Result<()> {
        let outcome = self
            .commands
            .delete_vdev_snapshot(group_id, snapshot_id, true)
            .await?;
        match outcome {
            CommandOutcome::Success(_)
            | CommandOutcome::Accepted(_)
            | CommandOutcome::NoData => {
                info!(group = %group_id, snapshot = %snapshot_id, "group snapshot deleted");
                Ok(())
            }
            other => Err(Error::backend(
                "delete group snapshot",
                snapshot_id,
                outcome_reason(&other),
            )),
        }
    }

    async fn snapshot_id_in_group_snapshot(
        &self,
        group_id: &str,
        group_snapshot_id: &str,
        volume_id: &str,
    ) -> Result<String> {
        let outcome = self
            .commands
            .query_vdev_snapshot(group_id, group_snapshot_id, true)
            .await?;
        let body = match outcome {
            CommandOutcome::Success(body) => body,
            other => {
                return Err(Error::backend(
                    "query group snapshot",
                    group_snapshot_id,
                    outcome_reason(&other),
                ))
            }
        };
        let envelope: GroupSnapshotEnvelope = serde_json::from_value(body)
            .map_err(|e| Error::Protocol(format!("group snapshot response: {e}")))?;
        let members = envelope
            .metadata
            .and_then(|m| m.member)
            .unwrap_or_default();
        members
            .get(&canonical_id(volume_id))
            .cloned()
            .ok_or_else(|| Error::SnapshotNotFoundInGroup {
                volume: volume_id.to_string(),
                group: group_id.to_string(),
                snapshot: group_snapshot_id.to_string(),
            })
    }
}

// =============================================================================
// Export Lifecycle
// =============================================================================

#[async_trait]
impl ExportLifecycle for DplAdapter {
    async fn assign_iscsi(&self, volume_id: &str, export: &IscsiExportSpec) -> Result<Value> {
        let outcome = self.commands.assign_vdev(volume_id, export).await?;
        let body = self
            .finish_volume_op("assign iscsi export", volume_id, volume_id, outcome, false)
            .await?;
        info!(volume = %volume_id, initiator = %export.initiator_iqn, "iscsi export assigned");
        Ok(body)
    }

    async fn unassign_iscsi(
        &self,
        volume_id: &str,
        initiator_iqn: &str,
        target_iqn: &str,
    ) -> Result<()> {
        let outcome = self
            .commands
            .unassign_vdev(volume_id, initiator_iqn, target_iqn)
            .await?;
        self.finish_volume_op("unassign iscsi export", volume_id, volume_id, outcome, true)
            .await?;
        info!(volume = %volume_id, initiator = %initiator_iqn, "iscsi export unassigned");
        Ok(())
    }

    async fn assign_fc(&self, volume_id: &str, export: &FcExportSpec) -> Result<Value> {
        let outcome = self.commands.assign_vdev_fc(volume_id, export).await?;
        let body = self
            .finish_volume_op("assign fc export", volume_id, volume_id, outcome, false)
            .await?;
        info!(volume = %volume_id, target = %export.target_wwpn, "fc export assigned");
        Ok(body)
    }

    async fn unassign_fc(
        &self,
        volume_id: &str,
        target_wwpn: &str,
        initiator_wwpns: &[String],
    ) -> Result<()> {
        let outcome = self
            .commands
            .unassign_vdev_fc(volume_id, target_wwpn, initiator_wwpns)
            .await?;
        self.finish_volume_op("unassign fc export", volume_id, volume_id, outcome, true)
            .await?;
        info!(volume = %volume_id, target = %target_wwpn, "fc export unassigned");
        Ok(())
    }

    async fn create_target(
        &self,
        target_id: &str,
        protocol: &str,
        name: &str,
        address: &str,
    ) -> Result<()> {
        let outcome = self
            .commands
            .create_target(target_id, protocol, name, "", address)
            .await?;
        match outcome {
            CommandOutcome::Success(_) => Ok(()),
            other => Err(Error::backend(
                "create target",
                target_id,
                outcome_reason(&other),
            )),
        }
    }

    async fn get_target(&self, target_id: &str) -> Result<Value> {
        let outcome = self.commands.get_target(target_id).await?;
        match outcome {
            CommandOutcome::Success(body) => Ok(body),
            other => Err(Error::backend(
                "get target",
                target_id,
                outcome_reason(&other),
            )),
        }
    }

    async fn list_targets(&self, protocol: Option<&str>) -> Result<Vec<String>> {
        let outcome = self.commands.get_target_list(protocol).await?;
        match outcome {
            CommandOutcome::Success(body) => Ok(children_ids(&body)),
            other => Err(Error::backend(
                "list targets",
                protocol.unwrap_or("all"),
                outcome_reason(&other),
            )),
        }
    }

    async fn delete_target(&self, target_id: &str) -> Result<()> {
        let outcome = self.commands.delete_target(target_id).await?;
        match outcome {
            CommandOutcome::Success(_)
            | CommandOutcome::Accepted(_)
            | CommandOutcome::NoData => Ok(()),
            other => Err(Error::backend(
                "delete target",
                target_id,
                outcome_reason(&other),
            )),
        }
    }

    async fn sns_table(&self, wwpn: &str) -> Result<Value> {
        let outcome = self.commands.get_sns_table(wwpn).await?;
        match outcome {
            CommandOutcome::Success(body) => Ok(body),
            other => Err(Error::backend("sns lookup", wwpn, outcome_reason(&other))),
        }
    }
}

// =============================================================================
// Array Info
// =============================================================================

#[async_trait]
impl ArrayInfo for DplAdapter {
    async fn server_info(&self) -> Result<ServerInfo> {
        let outcome = self.commands.get_server_info().await?;
        let body = match outcome {
            CommandOutcome::Success(body) => body,
            other => {
                return Err(Error::backend(
                    "get server info",
                    "system",
                    outcome_reason(&other),
                ))
            }
        };
        let envelope: SystemEnvelope = serde_json::from_value(body)
            .map_err(|e| Error::Protocol(format!("system response: {e}")))?;
        Ok(ServerInfo {
            vendor: envelope.metadata.vendor,
            version: envelope.metadata.version,
        })
    }

    async fn pool_stats(&self, pool_ids: &[String]) -> Result<Vec<PoolStats>> {
        let pool_ids = if pool_ids.is_empty() {
            let outcome = self.commands.get_pools().await?;
            match outcome {
                CommandOutcome::Success(body) => children_ids(&body),
                other => {
                    return Err(Error::backend(
                        "list pools",
                        "all",
                        outcome_reason(&other),
                    ))
                }
            }
        } else {
            pool_ids.to_vec()
        };

        let mut stats = Vec::with_capacity(pool_ids.len());
        for pool_id in &pool_ids {
            match self.pool_info(pool_id).await {
                Ok(pool) => stats.push(pool),
                Err(e) => warn!(pool = %pool_id, error = %e, "failed to query pool"),
            }
        }
        Ok(stats)
    }

    async fn pool_info(&self, pool_id: &str) -> Result<PoolStats> {
        let outcome = self.commands.get_pool(pool_id).await?;
        let body = match outcome {
            CommandOutcome::Success(body) => body,
            CommandOutcome::Accepted(body) => {
                let event = event_uuid(&body).ok_or_else(|| {
                    Error::backend(
                        "get pool info",
                        pool_id,
                        "malformed accept response: missing event identifier",
                    )
                })?;
                match self.wait_pool_event(pool_id, &event).await {
                    WaitOutcome::Available(body) => body,
                    state => {
                        return Err(Error::backend(
                            "get pool info",
                            pool_id,
                            format!("terminal state {state:?}"),
                        ))
                    }
                }
            }
            other => {
                return Err(Error::backend(
                    "get pool info",
                    pool_id,
                    outcome_reason(&other),
                ))
            }
        };
        let envelope: PoolEnvelope = serde_json::from_value(body)
            .map_err(|e| Error::Protocol(format!("pool response: {e}")))?;
        Ok(PoolStats {
            pool_id: envelope.metadata.pool_uuid,
            total_capacity_bytes: envelope.metadata.total_capacity,
            available_capacity_bytes: envelope.metadata.available_capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;

    // -------------------------------------------------------------------------
    // Scripted array
    // -------------------------------------------------------------------------

    #[derive(Default)]
    struct MockArray {
        responses: Mutex<HashMap<&'static str, VecDeque<Result<CommandOutcome>>>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockArray {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn script(&self, op: &'static str, response: Result<CommandOutcome>) {
            self.responses
                .lock()
                .unwrap()
                .entry(op)
                .or_default()
                .push_back(response);
        }

        fn take(&self, op: &'static str, detail: &str) -> Result<CommandOutcome> {
            self.calls.lock().unwrap().push(format!("{op} {detail}"));
            if let Some(queue) = self.responses.lock().unwrap().get_mut(op) {
                if let Some(response) = queue.pop_front() {
                    return response;
                }
            }
            Ok(CommandOutcome::Success(Value::Null))
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, op: &str) -> usize {
            self.calls()
                .iter()
                .filter(|call| call.starts_with(op))
                .count()
        }
    }

    #[async_trait]
    impl DplCommands for MockArray {
        async fn get_server_info(&self) -> Result<CommandOutcome> {
            self.take("get_server_info", "")
        }
        async fn create_vdev(&self, volume: &VolumeSpec) -> Result<CommandOutcome> {
            self.take("create_vdev", &volume.id)
        }
        async fn extend_vdev(
            &self,
            volume_id: &str,
            _name: &str,
            _description: &str,
            new_size_bytes: u64,
        ) -> Result<CommandOutcome> {
            self.take("extend_vdev", &format!("{volume_id} {new_size_bytes}"))
        }
        async fn delete_vdev(&self, volume_id: &str) -> Result<CommandOutcome> {
            self.take("delete_vdev", volume_id)
        }
        async fn clone_vdev(
            &self,
            source_volume_id: &str,
            volume: &VolumeSpec,
        ) -> Result<CommandOutcome> {
            self.take("clone_vdev", &format!("{source_volume_id} {}", volume.id))
        }
        async fn create_vdev_from_snapshot(
            &self,
            volume: &VolumeSpec,
            snapshot_id: &str,
        ) -> Result<CommandOutcome> {
            self.take(
                "create_vdev_from_snapshot",
                &format!("{} {snapshot_id}", volume.id),
            )
        }
        async fn spawn_vdev_from_snapshot(
            &self,
            new_volume_id: &str,
            _source_volume_id: &str,
            _name: &str,
            _description: &str,
            snapshot_id: &str,
        ) -> Result<CommandOutcome> {
            self.take(
                "spawn_vdev_from_snapshot",
                &format!("{new_volume_id} {snapshot_id}"),
            )
        }
        async fn rollback_vdev(
            &self,
            volume_id: &str,
            snapshot_id: &str,
        ) -> Result<CommandOutcome> {
            self.take("rollback_vdev", &format!("{volume_id} {snapshot_id}"))
        }
        async fn get_vdev(&self, volume_id: &str) -> Result<CommandOutcome> {
            self.take("get_vdev", volume_id)
        }
        async fn get_vdev_status(
            &self,
            volume_id: &str,
            event_id: &str,
        ) -> Result<CommandOutcome> {
            self.take("get_vdev_status", &format!("{volume_id} {event_id}"))
        }
        async fn get_pools(&self) -> Result<CommandOutcome> {
            self.take("get_pools", "")
        }
        async fn get_pool(&self, pool_id: &str) -> Result<CommandOutcome> {
            self.take("get_pool", pool_id)
        }
        async fn get_pool_status(
            &self,
            pool_id: &str,
            event_id: &str,
        ) -> Result<CommandOutcome> {
            self.take("get_pool_status", &format!("{pool_id} {event_id}"))
        }
        async fn create_vdev_snapshot(
            &self,
            entity_id: &str,
            snapshot_id: &str,
            _name: &str,
            _description: &str,
            group_scoped: bool,
        ) -> Result<CommandOutcome> {
            self.take(
                "create_vdev_snapshot",
                &format!("{entity_id} {snapshot_id} {group_scoped}"),
            )
        }
        async fn delete_vdev_snapshot(
            &self,
            entity_id: &str,
            snapshot_id: &str,
            group_scoped: bool,
        ) -> Result<CommandOutcome> {
            self.take(
                "delete_vdev_snapshot",
                &format!("{entity_id} {snapshot_id} {group_scoped}"),
            )
        }
        async fn list_vdev_snapshots(
            &self,
            entity_id: &str,
            group_scoped: bool,
        ) -> Result<CommandOutcome> {
            self.take("list_vdev_snapshots", &format!("{entity_id} {group_scoped}"))
        }
        async fn query_vdev_snapshot(
            &self,
            entity_id: &str,
            snapshot_id: &str,
            group_scoped: bool,
        ) -> Result<CommandOutcome> {
            self.take(
                "query_vdev_snapshot",
                &format!("{entity_id} {snapshot_id} {group_scoped}"),
            )
        }
        async fn assign_vdev(
            &self,
            volume_id: &str,
            _export: &IscsiExportSpec,
        ) -> Result<CommandOutcome> {
            self.take("assign_vdev", volume_id)
        }
        async fn unassign_vdev(
            &self,
            volume_id: &str,
            _initiator_iqn: &str,
            _target_iqn: &str,
        ) -> Result<CommandOutcome> {
            self.take("unassign_vdev", volume_id)
        }
        async fn assign_vdev_fc(
            &self,
            volume_id: &str,
            _export: &FcExportSpec,
        ) -> Result<CommandOutcome> {
            self.take("assign_vdev_fc", volume_id)
        }
        async fn unassign_vdev_fc(
            &self,
            volume_id: &str,
            _target_wwpn: &str,
            _initiator_wwpns: &[String],
        ) -> Result<CommandOutcome> {
            self.take("unassign_vdev_fc", volume_id)
        }
        async fn create_target(
            &self,
            target_id: &str,
            _protocol: &str,
            _name: &str,
            _description: &str,
            _address: &str,
        ) -> Result<CommandOutcome> {
            self.take("create_target", target_id)
        }
        async fn get_target(&self, target_id: &str) -> Result<CommandOutcome> {
            self.take("get_target", target_id)
        }
        async fn delete_target(&self, target_id: &str) -> Result<CommandOutcome> {
            self.take("delete_target", target_id)
        }
        async fn get_target_list(&self, kind: Option<&str>) -> Result<CommandOutcome> {
            self.take("get_target_list", kind.unwrap_or(""))
        }
        async fn get_sns_table(&self, wwpn: &str) -> Result<CommandOutcome> {
            self.take("get_sns_table", wwpn)
        }
        async fn create_vg(&self, group: &GroupSpec) -> Result<CommandOutcome> {
            self.take("create_vg", &group.id)
        }
        async fn get_vg(&self, group_id: &str) -> Result<CommandOutcome> {
            self.take("get_vg", group_id)
        }
        async fn delete_vg(&self, group_id: &str) -> Result<CommandOutcome> {
            self.take("delete_vg", group_id)
        }
        async fn join_vg(&self, volume_id: &str, group_id: &str) -> Result<CommandOutcome> {
            self.take("join_vg", &format!("{volume_id} {group_id}"))
        }
        async fn leave_vg(&self, volume_id: &str, group_id: &str) -> Result<CommandOutcome> {
            self.take("leave_vg", &format!("{volume_id} {group_id}"))
        }
    }

    // -------------------------------------------------------------------------
    // Host stub
    // -------------------------------------------------------------------------

    struct TestHost {
        consistency_groups: bool,
        group_of_volume: Option<String>,
    }

    #[async_trait]
    impl HostModel for TestHost {
        async fn is_consistency_snapshot_group(&self, _group_id: &str) -> Result<bool> {
            Ok(self.consistency_groups)
        }
        async fn volume_group_id(&self, _volume_id: &str) -> Result<Option<String>> {
            Ok(self.group_of_volume.clone())
        }
    }

    fn adapter(mock: Arc<MockArray>, host: TestHost) -> DplAdapter {
        DplAdapter::new(mock, Arc::new(host)).with_waiter_config(WaiterConfig {
            retry_budget: 3,
            fetch_retry_delay: Duration::from_millis(1),
            progress_jitter_max: Duration::from_millis(1),
        })
    }

    fn plain_adapter(mock: Arc<MockArray>) -> DplAdapter {
        adapter(
            mock,
            TestHost {
                consistency_groups: false,
                group_of_volume: None,
            },
        )
    }

    fn volume(id: &str, group: Option<&str>) -> VolumeSpec {
        VolumeSpec {
            id: id.to_string(),
            name: "vol".to_string(),
            description: String::new(),
            pool: "pool1".to_string(),
            size_bytes: 1 << 30,
            thin_provision: true,
            snapshot_quota: None,
            group_id: group.map(str::to_string),
        }
    }

    fn accepted(event: &str) -> CommandOutcome {
        CommandOutcome::Accepted(json!({"metadata": {"event_uuid": event}}))
    }

    // -------------------------------------------------------------------------
    // Volume lifecycle
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_volume_immediate_success() {
        let mock = MockArray::new();
        mock.script("create_vdev", Ok(CommandOutcome::Success(Value::Null)));
        plain_adapter(mock.clone())
            .create_volume(&volume("v1", None))
            .await
            .unwrap();
        assert_eq!(mock.count("create_vdev"), 1);
        assert_eq!(mock.count("get_vdev_status"), 0);
        assert_eq!(mock.count("join_vg"), 0);
    }

    #[tokio::test]
    async fn test_create_volume_polls_accepted_event_to_completion() {
        let mock = MockArray::new();
        mock.script("create_vdev", Ok(accepted("e1")));
        mock.script(
            "get_vdev_status",
            Ok(CommandOutcome::Success(
                json!({"completionStatus": "Processing"}),
            )),
        );
        mock.script(
            "get_vdev_status",
            Ok(CommandOutcome::Success(
                json!({"completionStatus": "Complete"}),
            )),
        );

        plain_adapter(mock.clone())
            .create_volume(&volume("886e7386-3f1f-4b05-9f0e-804dd3de9cd1", None))
            .await
            .unwrap();

        // Exactly two polls, against the normalized volume and event ids.
        assert_eq!(mock.count("get_vdev_status"), 2);
        assert!(mock
            .calls()
            .iter()
            .any(|call| call == "get_vdev_status 886e73863f1f4b059f0e804dd3de9cd1 e1"));
    }

    #[tokio::test]
    async fn test_create_volume_async_error_is_backend_error() {
        let mock = MockArray::new();
        mock.script("create_vdev", Ok(accepted("e1")));
        mock.script(
            "get_vdev_status",
            Ok(CommandOutcome::Success(json!({"completionStatus": "Error"}))),
        );

        let err = plain_adapter(mock)
            .create_volume(&volume("v1", None))
            .await
            .unwrap_err();
        assert_matches!(err, Error::BackendOperationFailed { .. });
    }

    #[tokio::test]
    async fn test_create_volume_malformed_accept_response() {
        let mock = MockArray::new();
        mock.script("create_vdev", Ok(CommandOutcome::Accepted(json!({}))));

        let err = plain_adapter(mock.clone())
            .create_volume(&volume("v1", None))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("malformed accept response"));
        assert_eq!(mock.count("get_vdev_status"), 0);
    }

    #[tokio::test]
    async fn test_unauthorized_propagates_immediately() {
        let mock = MockArray::new();
        mock.script("create_vdev", Err(Error::Unauthorized));

        let err = plain_adapter(mock.clone())
            .create_volume(&volume("v1", None))
            .await
            .unwrap_err();
        assert_matches!(err, Error::Unauthorized);
        assert_eq!(mock.count("get_vdev_status"), 0);
    }

    #[tokio::test]
    async fn test_delete_absent_volume_is_success() {
        let mock = MockArray::new();
        mock.script("delete_vdev", Ok(CommandOutcome::NoData));
        plain_adapter(mock)
            .delete_volume(&volume("v1", None))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_volume_polls_until_gone() {
        let mock = MockArray::new();
        mock.script("delete_vdev", Ok(accepted("e1")));
        mock.script(
            "get_vdev",
            Ok(CommandOutcome::Success(
                json!({"completionStatus": "Processing"}),
            )),
        );
        mock.script("get_vdev", Ok(CommandOutcome::NoData));

        plain_adapter(mock.clone())
            .delete_volume(&volume("v1", None))
            .await
            .unwrap();
        assert_eq!(mock.count("get_vdev"), 2);
    }

    #[tokio::test]
    async fn test_delete_volume_leaves_group_first() {
        let mock = MockArray::new();
        plain_adapter_with_groups(mock.clone())
            .delete_volume(&volume("v1", Some("g1")))
            .await
            .unwrap();

        let calls = mock.calls();
        let leave = calls.iter().position(|c| c.starts_with("leave_vg")).unwrap();
        let delete = calls
            .iter()
            .position(|c| c.starts_with("delete_vdev"))
            .unwrap();
        assert!(leave < delete);
    }

    fn plain_adapter_with_groups(mock: Arc<MockArray>) -> DplAdapter {
        adapter(
            mock,
            TestHost {
                consistency_groups: true,
                group_of_volume: None,
            },
        )
    }

    #[tokio::test]
    async fn test_failed_group_join_rolls_back_created_volume() {
        let mock = MockArray::new();
        mock.script("create_vdev", Ok(CommandOutcome::Success(Value::Null)));
        mock.script(
            "join_vg",
            Ok(CommandOutcome::Failed(
                reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            )),
        );

        let err = plain_adapter_with_groups(mock.clone())
            .create_volume(&volume("v1", Some("g1")))
            .await
            .unwrap_err();

        assert_matches!(err, Error::BackendOperationFailed { .. });
        // The compensating delete ran: no orphan volume remains.
        assert_eq!(mock.count("delete_vdev"), 1);
    }

    #[tokio::test]
    async fn test_extend_after_create_from_larger_snapshot() {
        let mock = MockArray::new();
        let mut vol = volume("v1", None);
        vol.size_bytes = 4 << 30;
        let snapshot = SnapshotSpec {
            id: "s1".into(),
            volume_id: "src".into(),
            volume_size_bytes: 1 << 30,
            name: String::new(),
            description: String::new(),
            group_snapshot_id: None,
        };

        plain_adapter(mock.clone())
            .create_volume_from_snapshot(&vol, &snapshot)
            .await
            .unwrap();
        assert_eq!(mock.count("create_vdev_from_snapshot"), 1);
        assert_eq!(mock.count("extend_vdev"), 1);
    }

    #[tokio::test]
    async fn test_create_from_group_snapshot_resolves_member_snapshot() {
        let mock = MockArray::new();
        mock.script(
            "query_vdev_snapshot",
            Ok(CommandOutcome::Success(json!({
                "metadata": {"member": {"srcvol": "member-snap-1"}}
            }))),
        );

        let snapshot = SnapshotSpec {
            id: "s1".into(),
            volume_id: "srcvol".into(),
            volume_size_bytes: 1 << 30,
            name: String::new(),
            description: String::new(),
            group_snapshot_id: Some("gs1".into()),
        };
        let host = TestHost {
            consistency_groups: false,
            group_of_volume: Some("g1".into()),
        };

        adapter(mock.clone(), host)
            .create_volume_from_snapshot(&volume("v1", None), &snapshot)
            .await
            .unwrap();

        assert!(mock
            .calls()
            .iter()
            .any(|call| call == "create_vdev_from_snapshot v1 member-snap-1"));
    }

    #[tokio::test]
    async fn test_member_snapshot_missing_is_fatal() {
        let mock = MockArray::new();
        mock.script(
            "query_vdev_snapshot",
            Ok(CommandOutcome::Success(json!({"metadata": {"member": {}}}))),
        );

        let err = plain_adapter(mock)
            .snapshot_id_in_group_snapshot("g1", "gs1", "srcvol")
            .await
            .unwrap_err();
        assert_matches!(err, Error::SnapshotNotFoundInGroup { .. });
    }

    // -------------------------------------------------------------------------
    // Snapshots
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_delete_absent_snapshot_is_success() {
        let mock = MockArray::new();
        mock.script("delete_vdev_snapshot", Ok(CommandOutcome::NoData));
        let snapshot = SnapshotSpec {
            id: "s1".into(),
            volume_id: "v1".into(),
            volume_size_bytes: 0,
            name: String::new(),
            description: String::new(),
            group_snapshot_id: None,
        };
        plain_adapter(mock).delete_snapshot(&snapshot).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_snapshots_parses_children() {
        let mock = MockArray::new();
        mock.script(
            "list_vdev_snapshots",
            Ok(CommandOutcome::Success(json!({"children": ["s1/", "s2"]}))),
        );
        let snapshots = plain_adapter(mock).list_snapshots("v1").await.unwrap();
        assert_eq!(snapshots, vec!["s1".to_string(), "s2".to_string()]);
    }

    // -------------------------------------------------------------------------
    // Groups
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_group_accepted_is_error() {
        // No status endpoint exists for groups, so a 202 cannot be
        // resolved and must not be reported as a created group.
        let mock = MockArray::new();
        mock.script("create_vg", Ok(accepted("e1")));

        let group = GroupSpec {
            id: "g1".into(),
            name: "group".into(),
            description: String::new(),
        };
        let err = plain_adapter(mock.clone())
            .create_group(&group)
            .await
            .unwrap_err();
        assert_matches!(err, Error::BackendOperationFailed { .. });
        assert_eq!(mock.count("get_vdev_status"), 0);
    }

    #[tokio::test]
    async fn test_create_group_snapshot_tolerates_accepted() {
        let mock = MockArray::new();
        mock.script("create_vdev_snapshot", Ok(accepted("e1")));

        let snapshot = SnapshotSpec {
            id: "s1".into(),
            volume_id: String::new(),
            volume_size_bytes: 0,
            name: String::new(),
            description: String::new(),
            group_snapshot_id: None,
        };
        plain_adapter(mock)
            .create_group_snapshot("g1", &snapshot)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_group_skips_existing_members() {
        let mock = MockArray::new();
        mock.script(
            "get_vg",
            Ok(CommandOutcome::Success(json!({"children": ["aabb"]}))),
        );

        plain_adapter(mock.clone())
            .update_group("g1", &["aa-bb".to_string(), "ccdd".to_string()], &[])
            .await
            .unwrap();

        // "aa-bb" normalizes to the existing member; only "ccdd" joins.
        assert_eq!(mock.count("join_vg"), 1);
        assert!(mock.calls().iter().any(|call| call == "join_vg ccdd g1"));
    }

    #[tokio::test]
    async fn test_update_group_only_removes_present_members() {
        let mock = MockArray::new();
        mock.script(
            "get_vg",
            Ok(CommandOutcome::Success(json!({"children": ["aabb"]}))),
        );

        plain_adapter(mock.clone())
            .update_group("g1", &[], &["aabb".to_string(), "absent".to_string()])
            .await
            .unwrap();
        assert_eq!(mock.count("leave_vg"), 1);
    }

    #[tokio::test]
    async fn test_delete_group_reports_failed_member_deletes() {
        let mock = MockArray::new();
        mock.script("delete_vg", Ok(CommandOutcome::Success(Value::Null)));
        mock.script(
            "delete_vdev",
            Ok(CommandOutcome::Failed(
                reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            )),
        );

        let err = plain_adapter(mock.clone())
            .delete_group("g1", &["v1".to_string(), "v2".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("1 member volume(s)"));
        assert_eq!(mock.count("delete_vdev"), 2);
    }

    // -------------------------------------------------------------------------
    // Pools and server info
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_pool_info_polling_budget_exhaustion() {
        let mock = MockArray::new();
        mock.script("get_pool", Ok(accepted("e9")));
        // Every status poll decodes but never carries a completion field;
        // the waiter burns its whole budget.

        let err = plain_adapter(mock.clone())
            .pool_info("pool-7")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("pool-7"));
        assert!(err.to_string().contains("Error"));
        assert_eq!(mock.count("get_pool_status"), 3);
    }

    #[tokio::test]
    async fn test_pool_stats_discovers_pools_from_listing() {
        let mock = MockArray::new();
        mock.script(
            "get_pools",
            Ok(CommandOutcome::Success(
                json!({"children": [["p1", "fast"], ["p2", "slow"]]}),
            )),
        );
        mock.script(
            "get_pool",
            Ok(CommandOutcome::Success(json!({
                "metadata": {
                    "pool_uuid": "p1",
                    "total_capacity": 100u64,
                    "available_capacity": 60u64
                }
            }))),
        );
        mock.script(
            "get_pool",
            Ok(CommandOutcome::Success(json!({
                "metadata": {
                    "pool_uuid": "p2",
                    "total_capacity": "200",
                    "available_capacity": "50"
                }
            }))),
        );

        let stats = plain_adapter(mock).pool_stats(&[]).await.unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].pool_id, "p1");
        assert_eq!(stats[1].total_capacity_bytes, 200);
    }

    #[tokio::test]
    async fn test_server_info_parses_vendor_metadata() {
        let mock = MockArray::new();
        mock.script(
            "get_server_info",
            Ok(CommandOutcome::Success(json!({
                "metadata": {"vendor": "ProphetStor", "version": "1.5"}
            }))),
        );
        let info = plain_adapter(mock).server_info().await.unwrap();
        assert_eq!(
            info,
            ServerInfo {
                vendor: "ProphetStor".into(),
                version: "1.5".into()
            }
        );
    }

    // -------------------------------------------------------------------------
    // Exports
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_assign_iscsi_returns_export_descriptor() {
        let mock = MockArray::new();
        mock.script(
            "assign_vdev",
            Ok(CommandOutcome::Success(
                json!({"exports": {"Network/iSCSI": [{"target_identifier": "iqn.t"}]}}),
            )),
        );
        let export = IscsiExportSpec {
            initiator_iqn: "iqn.i".into(),
            lun_name: "lun0".into(),
            portal: "10.0.0.5:3260".into(),
        };
        let body = plain_adapter(mock)
            .assign_iscsi("v1", &export)
            .await
            .unwrap();
        assert!(body["exports"].get("Network/iSCSI").is_some());
    }

    #[tokio::test]
    async fn test_unassign_absent_export_is_success() {
        let mock = MockArray::new();
        mock.script("unassign_vdev", Ok(CommandOutcome::NoData));
        plain_adapter(mock)
            .unassign_iscsi("v1", "iqn.i", "iqn.t")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_list_targets_parses_children() {
        let mock = MockArray::new();
        mock.script(
            "get_target_list",
            Ok(CommandOutcome::Success(json!({"children": ["t1/", "t2/"]}))),
        );
        let targets = plain_adapter(mock.clone())
            .list_targets(Some("iscsi"))
            .await
            .unwrap();
        assert_eq!(targets, vec!["t1".to_string(), "t2".to_string()]);
        assert!(mock.calls().iter().any(|call| call == "get_target_list iscsi"));
    }

    #[tokio::test]
    async fn test_delete_absent_target_is_success() {
        let mock = MockArray::new();
        mock.script("delete_target", Ok(CommandOutcome::NoData));
        plain_adapter(mock).delete_target("t1").await.unwrap();
    }
}
