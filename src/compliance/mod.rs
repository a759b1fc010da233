//! Staffing-ratio compliance.
//!
//! Combines group attendance with recorded staff levels into append-only
//! [`ComplianceSnapshot`](crate::models::ComplianceSnapshot)s that form an
//! audit trail of whether supervision ratios were met.

mod assessment;
mod service;

pub use assessment::{StaffingAssessment, assess_staffing};
pub use service::ComplianceService;
