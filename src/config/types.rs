//! Configuration types for attendance and staffing.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files.

use chrono::FixedOffset;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{EngineError, EngineResult};
use crate::models::EndMarkSettings;

/// Default upper bound on the number of days a single query may span.
pub const DEFAULT_MAX_RANGE_DAYS: u32 = 366;

fn default_max_range_days() -> u32 {
    DEFAULT_MAX_RANGE_DAYS
}

/// An age band with its staff-to-child ratio.
///
/// Ages are in completed months; `max_age_months` is exclusive and `None`
/// means the band is open-ended.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AgeBand {
    /// Band name (e.g. "infant").
    pub name: String,
    /// Lowest age in the band (inclusive).
    pub min_age_months: u32,
    /// Age at which children leave the band (exclusive).
    #[serde(default)]
    pub max_age_months: Option<u32>,
    /// Children one staff member may supervise.
    pub children_per_staff: u32,
}

impl AgeBand {
    /// Returns true if a child of `age_months` belongs in this band.
    pub fn contains(&self, age_months: u32) -> bool {
        age_months >= self.min_age_months && self.max_age_months.is_none_or(|max| age_months < max)
    }
}

/// Staffing policy configuration from staffing.yaml.
#[derive(Debug, Clone, Deserialize)]
pub struct StaffingConfig {
    /// Age bands ordered from youngest to oldest.
    pub age_bands: Vec<AgeBand>,
    /// Fraction of required staff at or above which a shortfall is only at risk.
    pub warning_threshold: Decimal,
}

/// Calendar configuration from calendar.yaml.
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    /// Maximum days a single row or aggregation query may cover.
    #[serde(default = "default_max_range_days")]
    pub max_range_days: u32,
    /// Facility offset from UTC used to resolve instants to calendar dates.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            max_range_days: DEFAULT_MAX_RANGE_DAYS,
            utc_offset_minutes: 0,
        }
    }
}

/// End mark configuration from end_marks.yaml.
#[derive(Debug, Clone, Deserialize)]
pub struct EndMarksConfig {
    /// Default settings applied to tenants without their own.
    pub end_marks: EndMarkSettings,
}

/// The complete engine configuration.
///
/// Construction validates the age bands and thresholds so every consumer can
/// rely on a well-formed policy.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    staffing: StaffingConfig,
    calendar: CalendarConfig,
    end_mark_settings: EndMarkSettings,
    utc_offset: FixedOffset,
}

impl EngineConfig {
    /// Creates a validated configuration from its component parts.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if:
    /// - there are no age bands, or the first band does not start at 0 months
    /// - bands are not contiguous and strictly increasing
    /// - any band other than the last is open-ended, or the last is closed
    /// - any band allows fewer than one child per staff member
    /// - the warning threshold is not strictly between 0 and 1
    /// - `max_range_days` is zero or the UTC offset is out of range
    pub fn new(
        staffing: StaffingConfig,
        calendar: CalendarConfig,
        end_mark_settings: EndMarkSettings,
    ) -> EngineResult<Self> {
        validate_age_bands(&staffing.age_bands)?;

        if staffing.warning_threshold <= Decimal::ZERO || staffing.warning_threshold >= Decimal::ONE
        {
            return Err(EngineError::InvalidConfig {
                message: format!(
                    "warning_threshold must be between 0 and 1 (exclusive), got {}",
                    staffing.warning_threshold
                ),
            });
        }

        if calendar.max_range_days == 0 {
            return Err(EngineError::InvalidConfig {
                message: "max_range_days must be at least 1".to_string(),
            });
        }

        let utc_offset = FixedOffset::east_opt(calendar.utc_offset_minutes * 60).ok_or_else(|| {
            EngineError::InvalidConfig {
                message: format!(
                    "utc_offset_minutes out of range: {}",
                    calendar.utc_offset_minutes
                ),
            }
        })?;

        Ok(Self {
            staffing,
            calendar,
            end_mark_settings,
            utc_offset,
        })
    }

    /// Returns the age bands, youngest first.
    pub fn age_bands(&self) -> &[AgeBand] {
        &self.staffing.age_bands
    }

    /// Returns the band a child of `age_months` belongs to.
    pub fn band_for_age(&self, age_months: u32) -> Option<&AgeBand> {
        self.staffing
            .age_bands
            .iter()
            .find(|band| band.contains(age_months))
    }

    /// Returns the at-risk warning threshold.
    pub fn warning_threshold(&self) -> Decimal {
        self.staffing.warning_threshold
    }

    /// Returns the maximum number of days a single query may span.
    pub fn max_range_days(&self) -> u32 {
        self.calendar.max_range_days
    }

    /// Returns the facility's offset from UTC.
    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    /// Returns the default end mark settings.
    pub fn end_mark_settings(&self) -> &EndMarkSettings {
        &self.end_mark_settings
    }
}

fn validate_age_bands(bands: &[AgeBand]) -> EngineResult<()> {
    let invalid = |message: String| Err(EngineError::InvalidConfig { message });

    let Some(first) = bands.first() else {
        return invalid("at least one age band is required".to_string());
    };
    if first.min_age_months != 0 {
        return invalid(format!(
            "first age band '{}' must start at 0 months",
            first.name
        ));
    }

    for (index, band) in bands.iter().enumerate() {
        if band.children_per_staff == 0 {
            return invalid(format!(
                "age band '{}' must allow at least one child per staff member",
                band.name
            ));
        }

        match (band.max_age_months, bands.get(index + 1)) {
            (Some(max), Some(next)) => {
                if max <= band.min_age_months {
                    return invalid(format!("age band '{}' is empty", band.name));
                }
                if next.min_age_months != max {
                    return invalid(format!(
                        "age band '{}' must start at {} months to follow '{}'",
                        next.name, max, band.name
                    ));
                }
            }
            (None, Some(_)) => {
                return invalid(format!(
                    "only the last age band may be open-ended, but '{}' is",
                    band.name
                ));
            }
            (Some(_), None) => {
                return invalid(format!(
                    "last age band '{}' must be open-ended",
                    band.name
                ));
            }
            _ => {}
        }
    }

    Ok(())
}
