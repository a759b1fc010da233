//! Staffing observations and compliance snapshots.
//!
//! Both record types are append-only. A [`ComplianceSnapshot`] is never
//! edited after creation; the ordered sequence of snapshots for a group is
//! the regulator-facing audit trail.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{GroupId, TenantId};

/// Staffing adequacy of a group at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    /// Qualified staff meet or exceed the required count.
    Compliant,
    /// Below the required count but within the warning threshold.
    AtRisk,
    /// Below the warning threshold.
    NonCompliant,
}

impl std::fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComplianceStatus::Compliant => write!(f, "Compliant"),
            ComplianceStatus::AtRisk => write!(f, "AtRisk"),
            ComplianceStatus::NonCompliant => write!(f, "NonCompliant"),
        }
    }
}

/// A recorded count of qualified staff on duty in a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffLevelObservation {
    /// Unique identifier for the observation.
    pub id: Uuid,
    /// The observed group.
    pub group_id: GroupId,
    /// Number of qualified staff on duty.
    pub staff_count: u32,
    /// When the count was observed.
    pub observed_at: DateTime<Utc>,
}

/// An immutable, point-in-time staffing adequacy record.
///
/// # Example
///
/// ```
/// use childcare_attendance::models::{ComplianceSnapshot, ComplianceStatus};
/// use chrono::Utc;
/// use rust_decimal::Decimal;
/// use uuid::Uuid;
///
/// let snapshot = ComplianceSnapshot {
///     id: Uuid::new_v4(),
///     tenant_id: Uuid::nil(),
///     group_id: Uuid::nil(),
///     captured_at: Utc::now(),
///     recorded_at: Utc::now(),
///     present_children_count: 8,
///     required_staff_count: 2,
///     qualified_staff_count: 2,
///     buffer_percent: Decimal::ZERO,
///     status: ComplianceStatus::Compliant,
///     notes: String::new(),
/// };
/// assert!(snapshot.is_compliant());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceSnapshot {
    /// Unique identifier for the snapshot.
    pub id: Uuid,
    /// The owning tenant.
    pub tenant_id: TenantId,
    /// The assessed group.
    pub group_id: GroupId,
    /// The instant assessed.
    pub captured_at: DateTime<Utc>,
    /// Wall-clock time the snapshot was written; never earlier than any
    /// snapshot written before it.
    pub recorded_at: DateTime<Utc>,
    /// Children present in the assessed slot.
    pub present_children_count: u32,
    /// Staff required by the ratio policy.
    pub required_staff_count: u32,
    /// Qualified staff last observed at or before `captured_at`.
    pub qualified_staff_count: u32,
    /// Surplus (positive) or shortfall (negative) of staff, in percent of required.
    pub buffer_percent: Decimal,
    /// The derived status.
    pub status: ComplianceStatus,
    /// Human-readable context (assessed slot, missing observations).
    pub notes: String,
}

impl ComplianceSnapshot {
    /// Returns true if the snapshot status is [`ComplianceStatus::Compliant`].
    pub fn is_compliant(&self) -> bool {
        self.status == ComplianceStatus::Compliant
    }
}
