//! System end mark planning.

use std::collections::HashSet;

use tracing::warn;
use uuid::Uuid;

use crate::models::{Child, EndMark, EndMarkSettings};

/// Derives system-generated end marks for children that have none.
///
/// Each planned mark is dated on the child's birthday `years_after_birth`
/// years on and carries the settings' description as its reason. Children
/// with any existing end mark, manual or generated, are left alone. Disabled
/// settings plan nothing.
///
/// # Example
///
/// ```
/// use childcare_attendance::calendar::plan_system_end_marks;
/// use childcare_attendance::models::{Child, EndMarkSettings};
/// use chrono::NaiveDate;
/// use uuid::Uuid;
///
/// let settings = EndMarkSettings {
///     enabled: true,
///     years_after_birth: 4,
///     description: "Reached school age".to_string(),
/// };
/// let child = Child {
///     id: Uuid::new_v4(),
///     name: "Ada".to_string(),
///     birthday: NaiveDate::from_ymd_opt(2020, 9, 1).unwrap(),
/// };
///
/// let marks = plan_system_end_marks(&settings, &[child], &[]);
/// assert_eq!(marks.len(), 1);
/// assert_eq!(marks[0].end_date, NaiveDate::from_ymd_opt(2024, 9, 1).unwrap());
/// assert!(marks[0].system_generated);
/// ```
pub fn plan_system_end_marks(
    settings: &EndMarkSettings,
    children: &[Child],
    existing: &[EndMark],
) -> Vec<EndMark> {
    if !settings.enabled {
        return Vec::new();
    }

    let marked: HashSet<_> = existing.iter().map(|mark| mark.child_id).collect();

    children
        .iter()
        .filter(|child| !marked.contains(&child.id))
        .filter_map(|child| {
            let Some(end_date) = child.birthday_after_years(settings.years_after_birth) else {
                warn!(
                    child_id = %child.id,
                    years_after_birth = settings.years_after_birth,
                    "End mark date out of range, skipping"
                );
                return None;
            };
            Some(EndMark {
                id: Uuid::new_v4(),
                child_id: child.id,
                end_date,
                reason: settings.description.clone(),
                system_generated: true,
            })
        })
        .collect()
}
