//! Command API over the array's CDMI-flavored REST surface.
//!
//! [`DplApi`] is a pure request builder: each method constructs the
//! resource path and typed payload for one array interaction, names the
//! status codes that interaction legitimately returns, and forwards the
//! transport outcome unchanged. No business-rule branching lives here;
//! the orchestration layer in [`crate::adapter`] decides what outcomes
//! mean per operation.

pub mod wire;

use crate::domain::{canonical_id, FcExportSpec, GroupSpec, IscsiExportSpec, VolumeSpec, MAX_SNAPSHOTS};
use crate::error::Result;
use crate::transport::{CommandOutcome, DplConfig, DplTransport};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use wire::*;

const DPL_VER_V1: &str = "v1";
const OBJ_POOL: &str = "dpl_pool";
const OBJ_VOLUME: &str = "dpl_volume";
const OBJ_VOLUMEGROUP: &str = "dpl_volgroup";
const OBJ_SNAPSHOT: &str = "cdmi_snapshots";
const OBJ_EXPORT: &str = "dpl_export";
const OBJ_SYSTEM: &str = "dpl_system";
const OBJ_SNS: &str = "sns_table";

// =============================================================================
// Resource Paths
// =============================================================================

fn volume_path(volume_id: &str) -> String {
    format!("/{}/{}/{}/", DPL_VER_V1, OBJ_VOLUME, volume_id)
}

fn pool_path(pool_id: &str) -> String {
    format!("/{}/{}/{}/", DPL_VER_V1, OBJ_POOL, pool_id)
}

fn pool_list_path() -> String {
    format!("/{}/{}/", DPL_VER_V1, OBJ_POOL)
}

fn system_path() -> String {
    format!("/{}/{}/", DPL_VER_V1, OBJ_SYSTEM)
}

fn export_path(target_id: &str) -> String {
    format!("/{}/{}/{}/", DPL_VER_V1, OBJ_EXPORT, target_id)
}

// Group object paths predate the version prefix and the deployed firmware
// still serves them unversioned; do not "fix" this without an array-side
// migration.
fn group_path(group_id: &str) -> String {
    format!("/{}/{}/", OBJ_VOLUMEGROUP, group_id)
}

/// Snapshot collection under a volume or (versioned) group.
fn snapshot_list_path(entity_id: &str, group_scoped: bool) -> String {
    let entity = if group_scoped { OBJ_VOLUMEGROUP } else { OBJ_VOLUME };
    format!("/{}/{}/{}/{}/", DPL_VER_V1, entity, entity_id, OBJ_SNAPSHOT)
}

fn snapshot_path(entity_id: &str, snapshot_id: &str, group_scoped: bool) -> String {
    let entity = if group_scoped { OBJ_VOLUMEGROUP } else { OBJ_VOLUME };
    format!(
        "/{}/{}/{}/{}/{}/",
        DPL_VER_V1, entity, entity_id, OBJ_SNAPSHOT, snapshot_id
    )
}

fn status_path(entity: &str, entity_id: &str, event_id: &str) -> String {
    format!(
        "/{}/{}/{}/?event_uuid={}",
        DPL_VER_V1,
        entity,
        entity_id,
        urlencoding::encode(event_id)
    )
}

/// `copy` source reference for snapshot-sourced volume operations.
fn snapshot_copy_ref(volume_id: &str, snapshot_id: &str) -> String {
    format!("/{}/{}/{}", volume_id, OBJ_SNAPSHOT, snapshot_id)
}

// =============================================================================
// Command Set
// =============================================================================

/// One method per array interaction. Implemented by [`DplApi`]; the
/// orchestration layer depends on this trait so tests can script array
/// behavior without a live endpoint.
#[async_trait]
pub trait DplCommands: Send + Sync {
    async fn get_server_info(&self) -> Result<CommandOutcome>;

    // Volumes
    async fn create_vdev(&self, volume: &VolumeSpec) -> Result<CommandOutcome>;
    async fn extend_vdev(
        &self,
        volume_id: &str,
        name: &str,
        description: &str,
        new_size_bytes: u64,
    ) -> Result<CommandOutcome>;
    async fn delete_vdev(&self, volume_id: &str) -> Result<CommandOutcome>;
    async fn clone_vdev(
        &self,
        source_volume_id: &str,
        volume: &VolumeSpec,
    ) -> Result<CommandOutcome>;
    async fn create_vdev_from_snapshot(
        &self,
        volume: &VolumeSpec,
        snapshot_id: &str,
    ) -> Result<CommandOutcome>;
    async fn spawn_vdev_from_snapshot(
        &self,
        new_volume_id: &str,
        source_volume_id: &str,
        name: &str,
        description: &str,
        snapshot_id: &str,
    ) -> Result<CommandOutcome>;
    async fn rollback_vdev(&self, volume_id: &str, snapshot_id: &str) -> Result<CommandOutcome>;
    async fn get_vdev(&self, volume_id: &str) -> Result<CommandOutcome>;
    async fn get_vdev_status(&self, volume_id: &str, event_id: &str) -> Result<CommandOutcome>;

    // Pools
    async fn get_pools(&self) -> Result<CommandOutcome>;
    async fn get_pool(&self, pool_id: &str) -> Result<CommandOutcome>;
    async fn get_pool_status(&self, pool_id: &str, event_id: &str) -> Result<CommandOutcome>;

    // Snapshots (volume- or group-scoped)
    async fn create_vdev_snapshot(
        &self,
        entity_id: &str,
        snapshot_id: &str,
        name: &str,
        description: &str,
        group_scoped: bool,
    ) -> Result<CommandOutcome>;
    async fn delete_vdev_snapshot(
        &self,
        entity_id: &str,
        snapshot_id: &str,
        group_scoped: bool,
    ) -> Result<CommandOutcome>;
    async fn list_vdev_snapshots(
        &self,
        entity_id: &str,
        group_scoped: bool,
    ) -> Result<CommandOutcome>;
    async fn query_vdev_snapshot(
        &self,
        entity_id: &str,
        snapshot_id: &str,
        group_scoped: bool,
    ) -> Result<CommandOutcome>;

    // Exports
    async fn assign_vdev(
        &self,
        volume_id: &str,
        export: &IscsiExportSpec,
    ) -> Result<CommandOutcome>;
    async fn unassign_vdev(
        &self,
        volume_id: &str,
        initiator_iqn: &str,
        target_iqn: &str,
    ) -> Result<CommandOutcome>;
    async fn assign_vdev_fc(
        &self,
        volume_id: &str,
        export: &FcExportSpec,
    ) -> Result<CommandOutcome>;
    async fn unassign_vdev_fc(
        &self,
        volume_id: &str,
        target_wwpn: &str,
        initiator_wwpns: &[String],
    ) -> Result<CommandOutcome>;
    async fn create_target(
        &self,
        target_id: &str,
        protocol: &str,
        name: &str,
        description: &str,
        address: &str,
    ) -> Result<CommandOutcome>;
    async fn get_target(&self, target_id: &str) -> Result<CommandOutcome>;
    async fn delete_target(&self, target_id: &str) -> Result<CommandOutcome>;
    async fn get_target_list(&self, kind: Option<&str>) -> Result<CommandOutcome>;
    async fn get_sns_table(&self, wwpn: &str) -> Result<CommandOutcome>;

    // Volume groups
    async fn create_vg(&self, group: &GroupSpec) -> Result<CommandOutcome>;
    async fn get_vg(&self, group_id: &str) -> Result<CommandOutcome>;
    async fn delete_vg(&self, group_id: &str) -> Result<CommandOutcome>;
    async fn join_vg(&self, volume_id: &str, group_id: &str) -> Result<CommandOutcome>;
    async fn leave_vg(&self, volume_id: &str, group_id: &str) -> Result<CommandOutcome>;
}

// =============================================================================
// Live Implementation
// =============================================================================

/// [`DplCommands`] over a live [`DplTransport`].
///
/// Identifiers are canonicalized here, so every identifier on the wire is
/// in normalized form no matter what the caller passed.
pub struct DplApi {
    transport: DplTransport,
}

impl DplApi {
    pub fn new(config: DplConfig) -> Result<Self> {
        Ok(Self {
            transport: DplTransport::new(config)?,
        })
    }

    pub fn from_transport(transport: DplTransport) -> Self {
        Self { transport }
    }

    async fn get(&self, path: &str, expected: &[StatusCode]) -> Result<CommandOutcome> {
        self.transport
            .send::<()>(Method::GET, path, None, expected)
            .await
    }
}

const EXPECT_CRUD: &[StatusCode] = &[StatusCode::OK, StatusCode::ACCEPTED, StatusCode::CREATED];
const EXPECT_DELETE: &[StatusCode] = &[
    StatusCode::OK,
    StatusCode::ACCEPTED,
    StatusCode::NOT_FOUND,
    StatusCode::NO_CONTENT,
];
const EXPECT_OK: &[StatusCode] = &[StatusCode::OK];
const EXPECT_STATUS: &[StatusCode] = &[StatusCode::OK, StatusCode::NOT_FOUND];

#[async_trait]
impl DplCommands for DplApi {
    async fn get_server_info(&self) -> Result<CommandOutcome> {
        self.get(&system_path(), &[StatusCode::OK, StatusCode::ACCEPTED])
            .await
    }

    async fn create_vdev(&self, volume: &VolumeSpec) -> Result<CommandOutcome> {
        let vid = canonical_id(&volume.id);
        let request = CreateVolume {
            metadata: CreateVolumeMetadata {
                display_name: display_name_or_id(&volume.name, &vid),
                display_description: volume.description.clone(),
                pool_uuid: volume.pool.clone(),
                total_capacity: volume.size_bytes,
                maximum_snapshot: MAX_SNAPSHOTS,
                snapshot_quota: volume.snapshot_quota,
                properties: VolumeProperties {
                    thin_provision: volume.thin_provision,
                },
            },
        };
        self.transport
            .send(Method::PUT, &volume_path(&vid), Some(&request), EXPECT_CRUD)
            .await
    }

    async fn extend_vdev(
        &self,
        volume_id: &str,
        name: &str,
        description: &str,
        new_size_bytes: u64,
    ) -> Result<CommandOutcome> {
        let vid = canonical_id(volume_id);
        let request = ExtendVolume {
            metadata: ExtendVolumeMetadata {
                display_name: display_name_or_id(name, &vid),
                display_description: description.to_string(),
                total_capacity: new_size_bytes,
                maximum_snapshot: MAX_SNAPSHOTS,
                snapshot_quota: None,
            },
        };
        self.transport
            .send(Method::PUT, &volume_path(&vid), Some(&request), EXPECT_CRUD)
            .await
    }

    async fn delete_vdev(&self, volume_id: &str) -> Result<CommandOutcome> {
        let vid = canonical_id(volume_id);
        let request = ForceDelete {
            metadata: ForceMetadata { force: true },
        };
        self.transport
            .send(
                Method::DELETE,
                &volume_path(&vid),
                Some(&request),
                EXPECT_DELETE,
            )
            .await
    }

    async fn clone_vdev(
        &self,
        source_volume_id: &str,
        volume: &VolumeSpec,
    ) -> Result<CommandOutcome> {
        let vid = canonical_id(&volume.id);
        let request = CloneVolume {
            metadata: CloneVolumeMetadata {
                snapshot_operation: "clone",
                display_name: display_name_or_id(&volume.name, &vid),
                display_description: volume.description.clone(),
                pool_uuid: volume.pool.clone(),
                total_capacity: volume.size_bytes,
                maximum_snapshot: MAX_SNAPSHOTS,
                snapshot_quota: volume.snapshot_quota,
                properties: VolumeProperties {
                    thin_provision: volume.thin_provision,
                },
            },
            copy: canonical_id(source_volume_id),
        };
        self.transport
            .send(Method::PUT, &volume_path(&vid), Some(&request), EXPECT_CRUD)
            .await
    }

    async fn create_vdev_from_snapshot(
        &self,
        volume: &VolumeSpec,
        snapshot_id: &str,
    ) -> Result<CommandOutcome> {
        let vid = canonical_id(&volume.id);
        let request = CreateFromSnapshot {
            metadata: CreateFromSnapshotMetadata {
                snapshot_operation: "copy",
                display_name: display_name_or_id(&volume.name, &vid),
                display_description: volume.description.clone(),
                pool_uuid: volume.pool.clone(),
                maximum_snapshot: MAX_SNAPSHOTS,
                snapshot_quota: volume.snapshot_quota,
                properties: VolumeProperties {
                    thin_provision: volume.thin_provision,
                },
            },
            copy: snapshot_copy_ref(&vid, &canonical_id(snapshot_id)),
        };
        self.transport
            .send(Method::PUT, &volume_path(&vid), Some(&request), EXPECT_CRUD)
            .await
    }

    async fn spawn_vdev_from_snapshot(
        &self,
        new_volume_id: &str,
        source_volume_id: &str,
        name: &str,
        description: &str,
        snapshot_id: &str,
    ) -> Result<CommandOutcome> {
        let vid = canonical_id(new_volume_id);
        let request = SpawnFromSnapshot {
            metadata: SpawnFromSnapshotMetadata {
                snapshot_operation: "spawn",
                display_name: display_name_or_id(name, &vid),
                display_description: description.to_string(),
            },
            copy: snapshot_copy_ref(&canonical_id(source_volume_id), &canonical_id(snapshot_id)),
        };
        self.transport
            .send(Method::PUT, &volume_path(&vid), Some(&request), EXPECT_CRUD)
            .await
    }

    async fn rollback_vdev(&self, volume_id: &str, snapshot_id: &str) -> Result<CommandOutcome> {
        let vid = canonical_id(volume_id);
        let request = RollbackVolume {
            copy: snapshot_copy_ref(&vid, &canonical_id(snapshot_id)),
        };
        self.transport
            .send(
                Method::PUT,
                &volume_path(&vid),
                Some(&request),
                &[StatusCode::OK, StatusCode::ACCEPTED],
            )
            .await
    }

    async fn get_vdev(&self, volume_id: &str) -> Result<CommandOutcome> {
        self.get(
            &volume_path(&canonical_id(volume_id)),
            &[StatusCode::OK, StatusCode::ACCEPTED, StatusCode::NOT_FOUND],
        )
        .await
    }

    async fn get_vdev_status(&self, volume_id: &str, event_id: &str) -> Result<CommandOutcome> {
        self.get(
            &status_path(OBJ_VOLUME, &canonical_id(volume_id), &canonical_id(event_id)),
            EXPECT_STATUS,
        )
        .await
    }

    async fn get_pools(&self) -> Result<CommandOutcome> {
        self.get(&pool_list_path(), EXPECT_OK).await
    }

    async fn get_pool(&self, pool_id: &str) -> Result<CommandOutcome> {
        self.get(
            &pool_path(&canonical_id(pool_id)),
            &[StatusCode::OK, StatusCode::ACCEPTED],
        )
        .await
    }

    async fn get_pool_status(&self, pool_id: &str, event_id: &str) -> Result<CommandOutcome> {
        self.get(
            &status_path(OBJ_POOL, &canonical_id(pool_id), &canonical_id(event_id)),
            EXPECT_STATUS,
        )
        .await
    }

    async fn create_vdev_snapshot(
        &self,
        entity_id: &str,
        snapshot_id: &str,
        name: &str,
        description: &str,
        group_scoped: bool,
    ) -> Result<CommandOutcome> {
        let eid = canonical_id(entity_id);
        let sid = canonical_id(snapshot_id);
        let path = if group_scoped {
            group_path(&eid)
        } else {
            volume_path(&eid)
        };
        let request = CreateSnapshot {
            metadata: DisplayMetadata {
                display_name: display_name_or_id(name, &sid),
                display_description: description.to_string(),
            },
            snapshot: sid,
        };
        self.transport
            .send(Method::PUT, &path, Some(&request), EXPECT_CRUD)
            .await
    }

    async fn delete_vdev_snapshot(
        &self,
        entity_id: &str,
        snapshot_id: &str,
        group_scoped: bool,
    ) -> Result<CommandOutcome> {
        self.transport
            .send::<()>(
                Method::DELETE,
                &snapshot_path(
                    &canonical_id(entity_id),
                    &canonical_id(snapshot_id),
                    group_scoped,
                ),
                None,
                EXPECT_DELETE,
            )
            .await
    }

    async fn list_vdev_snapshots(
        &self,
        entity_id: &str,
        group_scoped: bool,
    ) -> Result<CommandOutcome> {
        self.get(
            &snapshot_list_path(&canonical_id(entity_id), group_scoped),
            EXPECT_OK,
        )
        .await
    }

    async fn query_vdev_snapshot(
        &self,
        entity_id: &str,
        snapshot_id: &str,
        group_scoped: bool,
    ) -> Result<CommandOutcome> {
        self.get(
            &snapshot_path(
                &canonical_id(entity_id),
                &canonical_id(snapshot_id),
                group_scoped,
            ),
            EXPECT_OK,
        )
        .await
    }

    async fn assign_vdev(
        &self,
        volume_id: &str,
        export: &IscsiExportSpec,
    ) -> Result<CommandOutcome> {
        let request = IscsiAssign {
            metadata: ExportOperation {
                export_operation: "assign",
            },
            exports: IscsiAssignExports {
                iscsi: IscsiAssignTarget {
                    logical_unit_number: 0,
                    logical_unit_name: export.lun_name.clone(),
                    permissions: vec![export.initiator_iqn.clone()],
                    portals: vec![export.portal.clone()],
                },
            },
        };
        self.transport
            .send(
                Method::PUT,
                &volume_path(&canonical_id(volume_id)),
                Some(&request),
                EXPECT_CRUD,
            )
            .await
    }

    async fn unassign_vdev(
        &self,
        volume_id: &str,
        initiator_iqn: &str,
        target_iqn: &str,
    ) -> Result<CommandOutcome> {
        let request = IscsiUnassign {
            metadata: ExportOperation {
                export_operation: "unassign",
            },
            exports: IscsiUnassignExports {
                iscsi: IscsiUnassignTarget {
                    target_identifier: target_iqn.to_string(),
                    permissions: vec![initiator_iqn.to_string()],
                },
            },
        };
        self.transport
            .send(
                Method::PUT,
                &volume_path(&canonical_id(volume_id)),
                Some(&request),
                EXPECT_DELETE,
            )
            .await
    }

    async fn assign_vdev_fc(
        &self,
        volume_id: &str,
        export: &FcExportSpec,
    ) -> Result<CommandOutcome> {
        let request = FcAssign {
            metadata: ExportOperation {
                export_operation: "assign",
            },
            exports: FcAssignExports {
                fc: FcAssignTarget {
                    target_identifier: export.target_wwpn.clone(),
                    logical_unit_number: export.lun,
                    logical_unit_name: export.lun_name.clone(),
                    permissions: export.initiator_wwpns.clone(),
                },
            },
        };
        self.transport
            .send(
                Method::PUT,
                &volume_path(&canonical_id(volume_id)),
                Some(&request),
                EXPECT_CRUD,
            )
            .await
    }

    async fn unassign_vdev_fc(
        &self,
        volume_id: &str,
        target_wwpn: &str,
        initiator_wwpns: &[String],
    ) -> Result<CommandOutcome> {
        let request = FcUnassign {
            metadata: ExportOperation {
                export_operation: "unassign",
            },
            exports: FcUnassignExports {
                fc: FcUnassignTarget {
                    target_identifier: target_wwpn.to_string(),
                    permissions: initiator_wwpns.to_vec(),
                },
            },
        };
        self.transport
            .send(
                Method::PUT,
                &volume_path(&canonical_id(volume_id)),
                Some(&request),
                EXPECT_DELETE,
            )
            .await
    }

    async fn create_target(
        &self,
        target_id: &str,
        protocol: &str,
        name: &str,
        description: &str,
        address: &str,
    ) -> Result<CommandOutcome> {
        let tid = canonical_id(target_id);
        let request = CreateTarget {
            metadata: CreateTargetMetadata {
                kind: "target",
                protocol: protocol.to_string(),
                display_name: display_name_or_id(name, &tid),
                display_description: description.to_string(),
                address: address.to_string(),
            },
        };
        self.transport
            .send(Method::PUT, &export_path(&tid), Some(&request), EXPECT_OK)
            .await
    }

    async fn get_target(&self, target_id: &str) -> Result<CommandOutcome> {
        self.get(&export_path(&canonical_id(target_id)), EXPECT_OK).await
    }

    async fn delete_target(&self, target_id: &str) -> Result<CommandOutcome> {
        self.transport
            .send::<()>(
                Method::DELETE,
                &export_path(&canonical_id(target_id)),
                None,
                &[StatusCode::OK, StatusCode::ACCEPTED, StatusCode::NOT_FOUND],
            )
            .await
    }

    async fn get_target_list(&self, kind: Option<&str>) -> Result<CommandOutcome> {
        let path = match kind {
            Some(kind) => format!(
                "/{}/{}/?type={}",
                DPL_VER_V1,
                OBJ_EXPORT,
                urlencoding::encode(kind)
            ),
            None => format!("/{}/{}/", DPL_VER_V1, OBJ_EXPORT),
        };
        self.get(&path, EXPECT_OK).await
    }

    async fn get_sns_table(&self, wwpn: &str) -> Result<CommandOutcome> {
        let path = format!("/{}/{}/{}/", DPL_VER_V1, OBJ_EXPORT, OBJ_SNS);
        let request = SnsQuery {
            metadata: SnsQueryMetadata {
                protocol: "fc",
                address: wwpn.to_string(),
            },
        };
        self.transport
            .send(Method::PUT, &path, Some(&request), EXPECT_OK)
            .await
    }

    async fn create_vg(&self, group: &GroupSpec) -> Result<CommandOutcome> {
        let gid = canonical_id(&group.id);
        let request = CreateGroup {
            metadata: CreateGroupMetadata {
                display_name: display_name_or_id(&group.name, &gid),
                display_description: group.description.clone(),
                volume: Vec::new(),
                maximum_snapshot: MAX_SNAPSHOTS,
                properties: GroupProperties {
                    snapshot_rotation: true,
                },
            },
        };
        self.transport
            .send(Method::PUT, &group_path(&gid), Some(&request), EXPECT_CRUD)
            .await
    }

    async fn get_vg(&self, group_id: &str) -> Result<CommandOutcome> {
        self.get(&group_path(&canonical_id(group_id)), EXPECT_OK).await
    }

    async fn delete_vg(&self, group_id: &str) -> Result<CommandOutcome> {
        let request = ForceDelete {
            metadata: ForceMetadata { force: true },
        };
        self.transport
            .send(
                Method::DELETE,
                &group_path(&canonical_id(group_id)),
                Some(&request),
                &[StatusCode::NO_CONTENT, StatusCode::NOT_FOUND],
            )
            .await
    }

    async fn join_vg(&self, volume_id: &str, group_id: &str) -> Result<CommandOutcome> {
        let request = GroupMembership {
            metadata: GroupMembershipMetadata {
                volume_group_operation: "join",
                volume: vec![canonical_id(volume_id)],
            },
        };
        self.transport
            .send(
                Method::PUT,
                &group_path(&canonical_id(group_id)),
                Some(&request),
                &[StatusCode::OK, StatusCode::ACCEPTED],
            )
            .await
    }

    async fn leave_vg(&self, volume_id: &str, group_id: &str) -> Result<CommandOutcome> {
        let request = GroupMembership {
            metadata: GroupMembershipMetadata {
                volume_group_operation: "leave",
                volume: vec![canonical_id(volume_id)],
            },
        };
        self.transport
            .send(
                Method::PUT,
                &group_path(&canonical_id(group_id)),
                Some(&request),
                &[StatusCode::OK, StatusCode::ACCEPTED],
            )
            .await
    }
}
