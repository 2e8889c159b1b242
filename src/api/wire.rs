//! Wire shapes for array commands and responses.
//!
//! One explicit request type per operation; the documented `metadata`,
//! `copy`, `snapshot` and `exports` keys are struct fields, never
//! hand-assembled maps. Optional keys are omitted from the JSON entirely
//! when unset, matching what the array firmware tolerates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Display name falls back to the entity identifier when the caller
/// supplies an empty one.
pub fn display_name_or_id(name: &str, id: &str) -> String {
    if name.is_empty() {
        id.to_string()
    } else {
        name.to_string()
    }
}

// =============================================================================
// Volume Requests
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct VolumeProperties {
    pub thin_provision: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateVolume {
    pub metadata: CreateVolumeMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateVolumeMetadata {
    pub display_name: String,
    pub display_description: String,
    pub pool_uuid: String,
    pub total_capacity: u64,
    pub maximum_snapshot: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_quota: Option<u64>,
    pub properties: VolumeProperties,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtendVolume {
    pub metadata: ExtendVolumeMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtendVolumeMetadata {
    pub display_name: String,
    pub display_description: String,
    pub total_capacity: u64,
    pub maximum_snapshot: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_quota: Option<u64>,
}

/// Shared by volume and group deletes.
#[derive(Debug, Clone, Serialize)]
pub struct ForceDelete {
    pub metadata: ForceMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForceMetadata {
    pub force: bool,
}

// =============================================================================
// Snapshot-Sourced Volume Requests
// =============================================================================

/// PUT body for a full copy from a snapshot (`snapshot_operation: copy`).
#[derive(Debug, Clone, Serialize)]
pub struct CreateFromSnapshot {
    pub metadata: CreateFromSnapshotMetadata,
    /// Synthesized snapshot path `{vdev}/cdmi_snapshots/{snap}`
    pub copy: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateFromSnapshotMetadata {
    pub snapshot_operation: &'static str,
    pub display_name: String,
    pub display_description: String,
    pub pool_uuid: String,
    pub maximum_snapshot: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_quota: Option<u64>,
    pub properties: VolumeProperties,
}

/// PUT body for a referenced (space-efficient) volume
/// (`snapshot_operation: spawn`).
#[derive(Debug, Clone, Serialize)]
pub struct SpawnFromSnapshot {
    pub metadata: SpawnFromSnapshotMetadata,
    pub copy: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpawnFromSnapshotMetadata {
    pub snapshot_operation: &'static str,
    pub display_name: String,
    pub display_description: String,
}

/// PUT body for a volume-to-volume clone (`snapshot_operation: clone`,
/// `copy` names the source volume rather than a snapshot path).
#[derive(Debug, Clone, Serialize)]
pub struct CloneVolume {
    pub metadata: CloneVolumeMetadata,
    pub copy: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CloneVolumeMetadata {
    pub snapshot_operation: &'static str,
    pub display_name: String,
    pub display_description: String,
    pub pool_uuid: String,
    pub total_capacity: u64,
    pub maximum_snapshot: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_quota: Option<u64>,
    pub properties: VolumeProperties,
}

/// PUT body rolling a volume back to one of its snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct RollbackVolume {
    pub copy: String,
}

// =============================================================================
// Snapshot Requests
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CreateSnapshot {
    pub metadata: DisplayMetadata,
    /// Identifier the new snapshot is created under
    pub snapshot: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DisplayMetadata {
    pub display_name: String,
    pub display_description: String,
}

// =============================================================================
// Export Requests
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ExportOperation {
    pub export_operation: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct IscsiAssign {
    pub metadata: ExportOperation,
    pub exports: IscsiAssignExports,
}

#[derive(Debug, Clone, Serialize)]
pub struct IscsiAssignExports {
    #[serde(rename = "Network/iSCSI")]
    pub iscsi: IscsiAssignTarget,
}

#[derive(Debug, Clone, Serialize)]
pub struct IscsiAssignTarget {
    pub logical_unit_number: u32,
    pub logical_unit_name: String,
    pub permissions: Vec<String>,
    pub portals: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IscsiUnassign {
    pub metadata: ExportOperation,
    pub exports: IscsiUnassignExports,
}

#[derive(Debug, Clone, Serialize)]
pub struct IscsiUnassignExports {
    #[serde(rename = "Network/iSCSI")]
    pub iscsi: IscsiUnassignTarget,
}

#[derive(Debug, Clone, Serialize)]
pub struct IscsiUnassignTarget {
    pub target_identifier: String,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FcAssign {
    pub metadata: ExportOperation,
    pub exports: FcAssignExports,
}

#[derive(Debug, Clone, Serialize)]
pub struct FcAssignExports {
    #[serde(rename = "Network/FC")]
    pub fc: FcAssignTarget,
}

#[derive(Debug, Clone, Serialize)]
pub struct FcAssignTarget {
    pub target_identifier: String,
    pub logical_unit_number: i64,
    pub logical_unit_name: String,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FcUnassign {
    pub metadata: ExportOperation,
    pub exports: FcUnassignExports,
}

#[derive(Debug, Clone, Serialize)]
pub struct FcUnassignExports {
    #[serde(rename = "Network/FC")]
    pub fc: FcUnassignTarget,
}

#[derive(Debug, Clone, Serialize)]
pub struct FcUnassignTarget {
    pub target_identifier: String,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateTarget {
    pub metadata: CreateTargetMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateTargetMetadata {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub protocol: String,
    pub display_name: String,
    pub display_description: String,
    pub address: String,
}

/// PUT body for a simple name service lookup.
#[derive(Debug, Clone, Serialize)]
pub struct SnsQuery {
    pub metadata: SnsQueryMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnsQueryMetadata {
    pub protocol: &'static str,
    pub address: String,
}

// =============================================================================
// Volume Group Requests
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CreateGroup {
    pub metadata: CreateGroupMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateGroupMetadata {
    pub display_name: String,
    pub display_description: String,
    pub volume: Vec<String>,
    pub maximum_snapshot: u32,
    pub properties: GroupProperties,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupProperties {
    pub snapshot_rotation: bool,
}

/// PUT body for a join or leave membership change.
#[derive(Debug, Clone, Serialize)]
pub struct GroupMembership {
    pub metadata: GroupMembershipMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupMembershipMetadata {
    pub volume_group_operation: &'static str,
    pub volume: Vec<String>,
}

// =============================================================================
// Response Shapes
// =============================================================================

/// Envelope of an HTTP 202 body: `{"metadata": {"event_uuid": ...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct EventEnvelope {
    #[serde(default)]
    pub metadata: Option<EventMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventMetadata {
    #[serde(default)]
    pub event_uuid: Option<String>,
}

/// Pool detail response metadata. Capacities arrive as numbers or numeric
/// strings depending on firmware version.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolEnvelope {
    pub metadata: PoolMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolMetadata {
    pub pool_uuid: String,
    #[serde(deserialize_with = "flexible_u64")]
    pub total_capacity: u64,
    #[serde(deserialize_with = "flexible_u64")]
    pub available_capacity: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemEnvelope {
    pub metadata: SystemMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemMetadata {
    pub vendor: String,
    pub version: String,
}

/// Group snapshot detail; `member` maps volume identifier to the
/// per-volume snapshot identifier inside the group snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupSnapshotEnvelope {
    #[serde(default)]
    pub metadata: Option<GroupSnapshotMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupSnapshotMetadata {
    #[serde(default)]
    pub member: Option<BTreeMap<String, String>>,
}

fn flexible_u64<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error as _;
    let value = serde_json::Value::deserialize(deserializer)?;
    match &value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| D::Error::custom(format!("capacity out of range: {n}"))),
        serde_json::Value::String(s) => s
            .parse::<u64>()
            .map_err(|e| D::Error::custom(format!("capacity not numeric: {e}"))),
        other => Err(D::Error::custom(format!(
            "capacity has unexpected type: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_name_fallback() {
        assert_eq!(display_name_or_id("", "vol1"), "vol1");
        assert_eq!(display_name_or_id("data", "vol1"), "data");
    }

    #[test]
    fn test_create_volume_payload_shape() {
        let request = CreateVolume {
            metadata: CreateVolumeMetadata {
                display_name: "data".into(),
                display_description: "test".into(),
                pool_uuid: "pool1".into(),
                total_capacity: 1 << 30,
                maximum_snapshot: 1024,
                snapshot_quota: None,
                properties: VolumeProperties {
                    thin_provision: true,
                },
            },
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "metadata": {
                    "display_name": "data",
                    "display_description": "test",
                    "pool_uuid": "pool1",
                    "total_capacity": 1073741824u64,
                    "maximum_snapshot": 1024,
                    "properties": {"thin_provision": true}
                }
            })
        );
    }

    #[test]
    fn test_snapshot_quota_serialized_when_set() {
        let request = ExtendVolume {
            metadata: ExtendVolumeMetadata {
                display_name: "data".into(),
                display_description: String::new(),
                total_capacity: 2 << 30,
                maximum_snapshot: 1024,
                snapshot_quota: Some(16),
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["metadata"]["snapshot_quota"], 16);
    }

    #[test]
    fn test_iscsi_assign_payload_shape() {
        let request = IscsiAssign {
            metadata: ExportOperation {
                export_operation: "assign",
            },
            exports: IscsiAssignExports {
                iscsi: IscsiAssignTarget {
                    logical_unit_number: 0,
                    logical_unit_name: "lun0".into(),
                    permissions: vec!["iqn.1993-08.org.debian:01:abc".into()],
                    portals: vec!["10.0.0.5:3260".into()],
                },
            },
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "metadata": {"export_operation": "assign"},
                "exports": {
                    "Network/iSCSI": {
                        "logical_unit_number": 0,
                        "logical_unit_name": "lun0",
                        "permissions": ["iqn.1993-08.org.debian:01:abc"],
                        "portals": ["10.0.0.5:3260"]
                    }
                }
            })
        );
    }

    #[test]
    fn test_fc_assign_payload_keyed_by_protocol() {
        let request = FcAssign {
            metadata: ExportOperation {
                export_operation: "assign",
            },
            exports: FcAssignExports {
                fc: FcAssignTarget {
                    target_identifier: "5000d31000eeff00".into(),
                    logical_unit_number: -1,
                    logical_unit_name: "lun0".into(),
                    permissions: vec!["2100001b32927da0".into()],
                },
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value["exports"].get("Network/FC").is_some());
        assert_eq!(value["exports"]["Network/FC"]["logical_unit_number"], -1);
    }

    #[test]
    fn test_target_metadata_type_key() {
        let request = CreateTarget {
            metadata: CreateTargetMetadata {
                kind: "target",
                protocol: "iSCSI".into(),
                display_name: "tgt".into(),
                display_description: String::new(),
                address: "10.0.0.5".into(),
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["metadata"]["type"], "target");
    }

    #[test]
    fn test_group_membership_payload() {
        let request = GroupMembership {
            metadata: GroupMembershipMetadata {
                volume_group_operation: "join",
                volume: vec!["aabbcc".into()],
            },
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "metadata": {
                    "volume_group_operation": "join",
                    "volume": ["aabbcc"]
                }
            })
        );
    }

    #[test]
    fn test_pool_metadata_accepts_string_capacities() {
        let body = json!({
            "metadata": {
                "pool_uuid": "pool1",
                "total_capacity": "1073741824",
                "available_capacity": 536870912u64
            }
        });
        let envelope: PoolEnvelope = serde_json::from_value(body).unwrap();
        assert_eq!(envelope.metadata.total_capacity, 1 << 30);
        assert_eq!(envelope.metadata.available_capacity, 512 << 20);
    }

    #[test]
    fn test_event_envelope_tolerates_missing_fields() {
        let envelope: EventEnvelope = serde_json::from_value(json!({})).unwrap();
        assert!(envelope.metadata.is_none());

        let envelope: EventEnvelope =
            serde_json::from_value(json!({"metadata": {"event_uuid": "e1"}})).unwrap();
        assert_eq!(envelope.metadata.unwrap().event_uuid.unwrap(), "e1");
    }
}
