//! Fault-code lookup helpers shared by the catalog backends.

use std::cmp::Reverse;

use crate::{Device, MaintenanceGuide, RepairRecord, StepInquiry, Technician};

/// Scope label used for guides that have none.
pub const OTHER_SCOPE: &str = "other";

/// Case-insensitive match of `query` against fault code, fault category or scope.
/// A blank query matches every guide.
pub fn guide_matches(guide: &MaintenanceGuide, query: &str) -> bool {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return true;
    }
    guide.fault_code.to_lowercase().contains(&q)
        || guide.fault_category.to_lowercase().contains(&q)
        || guide.scope.to_lowercase().contains(&q)
}

/// Most frequent faults first; guides without a count go last, ties keep input order.
pub fn rank_guides(mut guides: Vec<MaintenanceGuide>) -> Vec<MaintenanceGuide> {
    guides.sort_by_key(|g| Reverse(g.total_occurrence_count.map(|c| c as i64).unwrap_or(-1)));
    guides
}

pub fn search_guides<'a>(
    guides: impl IntoIterator<Item = &'a MaintenanceGuide>,
    query: Option<&str>,
) -> Vec<MaintenanceGuide> {
    let matched = guides
        .into_iter()
        .filter(|g| query.map_or(true, |q| guide_matches(g, q)))
        .cloned()
        .collect();
    rank_guides(matched)
}

/// Group an already ranked list by scope. Groups appear in first-seen order.
pub fn group_by_scope(guides: &[MaintenanceGuide]) -> Vec<(String, Vec<MaintenanceGuide>)> {
    let mut groups: Vec<(String, Vec<MaintenanceGuide>)> = Vec::new();
    for guide in guides {
        let scope = if guide.scope.trim().is_empty() { OTHER_SCOPE.to_string() } else { guide.scope.clone() };
        match groups.iter_mut().find(|(s, _)| *s == scope) {
            Some((_, members)) => members.push(guide.clone()),
            None => groups.push((scope, vec![guide.clone()])),
        }
    }
    groups
}

pub fn authorized_devices<'a>(
    devices: impl IntoIterator<Item = &'a Device>,
    technician: &Technician,
) -> Vec<Device> {
    devices.into_iter().filter(|d| technician.is_assigned(&d.id)).cloned().collect()
}

pub fn records_newest_first(mut records: Vec<RepairRecord>) -> Vec<RepairRecord> {
    records.sort_by_key(|r| Reverse(r.started_at_unix));
    records
}

pub fn inquiries_newest_first(mut inquiries: Vec<StepInquiry>) -> Vec<StepInquiry> {
    inquiries.sort_by_key(|i| Reverse(i.created_at_unix));
    inquiries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeviceId, GuideId};

    fn guide(id: &str, code: &str, category: &str, scope: &str, count: Option<u32>) -> MaintenanceGuide {
        MaintenanceGuide {
            id: GuideId::from_str(id),
            device_id: DeviceId::from_str("d1"),
            fault_code: code.into(),
            fault_category: category.into(),
            operation_type: String::new(),
            scope: scope.into(),
            fault_phenomenon: String::new(),
            version: "1.0.0".into(),
            published: true,
            total_occurrence_count: count,
            steps: vec![],
        }
    }

    fn catalog() -> Vec<MaintenanceGuide> {
        vec![
            guide("g1", "AL-1002", "Sensor contamination", "Alignment", Some(128)),
            guide("g3", "AL-2041", "Stage drift", "Wafer stage", None),
            guide("g6", "PW-0007", "Power fault", "", Some(300)),
        ]
    }

    #[test]
    fn search_matches_code_category_or_scope() {
        let all = catalog();
        let by_code: Vec<_> = search_guides(&all, Some("al-10")).into_iter().map(|g| g.id.0).collect();
        assert_eq!(by_code, vec!["g1"]);
        let by_scope: Vec<_> = search_guides(&all, Some("WAFER")).into_iter().map(|g| g.id.0).collect();
        assert_eq!(by_scope, vec!["g3"]);
        let by_category: Vec<_> = search_guides(&all, Some("power")).into_iter().map(|g| g.id.0).collect();
        assert_eq!(by_category, vec!["g6"]);
    }

    #[test]
    fn blank_query_returns_all_ranked() {
        let all = catalog();
        let ranked: Vec<_> = search_guides(&all, Some("   ")).into_iter().map(|g| g.id.0).collect();
        assert_eq!(ranked, vec!["g6", "g1", "g3"]);
    }

    #[test]
    fn groups_follow_rank_order_and_default_scope() {
        let ranked = search_guides(&catalog(), None);
        let groups = group_by_scope(&ranked);
        let names: Vec<_> = groups.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(names, vec![OTHER_SCOPE, "Alignment", "Wafer stage"]);
    }
}
