//! Staffing adequacy assessment.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::ComplianceStatus;

/// The outcome of comparing qualified staff with required staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffingAssessment {
    /// Staffing surplus (positive) or shortfall (negative) as a percentage of
    /// required staff, rounded to two decimal places.
    pub buffer_percent: Decimal,
    /// The derived compliance status.
    pub status: ComplianceStatus,
}

/// Compares `qualified` staff against `required` staff.
///
/// - The buffer is `(qualified - required) / required * 100`, or 100 when no
///   staff are required.
/// - The status is Compliant when `qualified >= required`, AtRisk when
///   `qualified >= required * warning_threshold`, and NonCompliant otherwise.
///
/// # Example
///
/// ```
/// use childcare_attendance::compliance::assess_staffing;
/// use childcare_attendance::models::ComplianceStatus;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let threshold = Decimal::from_str("0.8").unwrap();
///
/// let exact = assess_staffing(2, 2, threshold);
/// assert_eq!(exact.status, ComplianceStatus::Compliant);
/// assert_eq!(exact.buffer_percent, Decimal::ZERO);
///
/// let short = assess_staffing(5, 4, threshold);
/// assert_eq!(short.status, ComplianceStatus::AtRisk);
/// assert_eq!(short.buffer_percent, Decimal::from(-20));
/// ```
pub fn assess_staffing(
    required: u32,
    qualified: u32,
    warning_threshold: Decimal,
) -> StaffingAssessment {
    let required_dec = Decimal::from(required);
    let qualified_dec = Decimal::from(qualified);

    let buffer_percent = if required == 0 {
        Decimal::ONE_HUNDRED
    } else {
        ((qualified_dec - required_dec) / required_dec * Decimal::ONE_HUNDRED).round_dp(2)
    };

    let status = if qualified >= required {
        ComplianceStatus::Compliant
    } else if qualified_dec >= required_dec * warning_threshold {
        ComplianceStatus::AtRisk
    } else {
        ComplianceStatus::NonCompliant
    };

    StaffingAssessment {
        buffer_percent,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_exact_staffing_is_compliant_with_zero_buffer() {
        let assessment = assess_staffing(2, 2, dec("0.8"));
        assert_eq!(assessment.status, ComplianceStatus::Compliant);
        assert_eq!(assessment.buffer_percent, Decimal::ZERO);
    }

    #[test]
    fn test_no_required_staff_has_full_buffer() {
        let assessment = assess_staffing(0, 0, dec("0.8"));
        assert_eq!(assessment.status, ComplianceStatus::Compliant);
        assert_eq!(assessment.buffer_percent, dec("100"));
    }

    #[test]
    fn test_surplus_is_positive() {
        let assessment = assess_staffing(2, 3, dec("0.8"));
        assert_eq!(assessment.status, ComplianceStatus::Compliant);
        assert_eq!(assessment.buffer_percent, dec("50"));
    }

    #[test]
    fn test_shortfall_at_threshold_is_at_risk() {
        // 4 >= 5 * 0.8
        let assessment = assess_staffing(5, 4, dec("0.8"));
        assert_eq!(assessment.status, ComplianceStatus::AtRisk);
    }

    #[test]
    fn test_shortfall_below_threshold_is_non_compliant() {
        let assessment = assess_staffing(2, 1, dec("0.8"));
        assert_eq!(assessment.status, ComplianceStatus::NonCompliant);
        assert_eq!(assessment.buffer_percent, dec("-50"));
    }

    #[test]
    fn test_buffer_is_rounded_to_two_places() {
        let assessment = assess_staffing(3, 2, dec("0.5"));
        assert_eq!(assessment.buffer_percent, dec("-33.33"));
        assert_eq!(assessment.status, ComplianceStatus::AtRisk);
    }
}
