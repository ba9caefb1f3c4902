//! Aggregate self-healing statistics

use crate::{Incident, IncidentStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Healing outcomes over a time window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentStats {
    /// Window length in days
    pub period_days: u32,

    /// Incidents created within the window
    pub total_incidents: u64,

    /// Incidents that ended `healed`
    pub auto_healed: u64,

    /// `auto_healed / total_incidents * 100`, one decimal, 0 for an empty window
    pub healing_rate_percent: f64,

    /// Incident count per failure type
    pub by_failure_type: BTreeMap<String, u64>,

    /// Mean time to recovery in minutes over resolved incidents
    pub mttr_minutes: f64,
}

impl IncidentStats {
    /// Stats for a window with no incidents
    pub fn empty(period_days: u32) -> Self {
        Self {
            period_days,
            total_incidents: 0,
            auto_healed: 0,
            healing_rate_percent: 0.0,
            by_failure_type: BTreeMap::new(),
            mttr_minutes: 0.0,
        }
    }

    /// Fold a set of incidents already filtered to the window
    pub fn from_incidents<'a>(
        period_days: u32,
        incidents: impl IntoIterator<Item = &'a Incident>,
    ) -> Self {
        let mut stats = Self::empty(period_days);
        let mut resolved_minutes = 0.0;
        let mut resolved_count = 0u64;

        for incident in incidents {
            stats.total_incidents += 1;
            if incident.status == IncidentStatus::Healed {
                stats.auto_healed += 1;
            }
            *stats
                .by_failure_type
                .entry(incident.failure_type.clone())
                .or_insert(0) += 1;

            if let Some(elapsed) = incident.time_to_resolve() {
                resolved_minutes += elapsed.num_milliseconds() as f64 / 60_000.0;
                resolved_count += 1;
            }
        }

        stats.healing_rate_percent = healing_rate(stats.total_incidents, stats.auto_healed);
        stats.mttr_minutes = if resolved_count > 0 {
            round_one_decimal(resolved_minutes / resolved_count as f64)
        } else {
            0.0
        };
        stats
    }
}

/// Percentage of healed incidents, one decimal, 0 when there are none
pub fn healing_rate(total: u64, healed: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_one_decimal(healed as f64 / total as f64 * 100.0)
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IncidentContext, IncidentId};
    use chrono::{Duration, Utc};

    fn resolved(failure_type: &str, status: IncidentStatus, minutes: i64) -> Incident {
        let created = Utc::now() - Duration::hours(1);
        let mut incident = Incident::new(
            IncidentId::generate(created),
            failure_type,
            IncidentContext::new(),
            created,
        );
        incident
            .transition_to(IncidentStatus::Healing, created)
            .unwrap();
        incident
            .resolve(status, "test", created + Duration::minutes(minutes))
            .unwrap();
        incident
    }

    #[test]
    fn test_empty_window_has_zero_rate() {
        let stats = IncidentStats::from_incidents(30, std::iter::empty());
        assert_eq!(stats, IncidentStats::empty(30));
        assert_eq!(stats.healing_rate_percent, 0.0);
    }

    #[test]
    fn test_stats_fold() {
        let incidents = vec![
            resolved("cache_corrupt", IncidentStatus::Healed, 2),
            resolved("cache_corrupt", IncidentStatus::Healed, 4),
            resolved("service_down", IncidentStatus::Escalated, 9),
        ];
        let stats = IncidentStats::from_incidents(7, &incidents);

        assert_eq!(stats.total_incidents, 3);
        assert_eq!(stats.auto_healed, 2);
        assert_eq!(stats.healing_rate_percent, 66.7);
        assert_eq!(stats.by_failure_type["cache_corrupt"], 2);
        assert_eq!(stats.by_failure_type["service_down"], 1);
        assert_eq!(stats.mttr_minutes, 5.0);
    }

    #[test]
    fn test_unresolved_incidents_excluded_from_mttr() {
        let open = Incident::new(
            IncidentId::new("INC-20260101-aaaaaa"),
            "high_memory",
            IncidentContext::new(),
            Utc::now(),
        );
        let done = resolved("high_memory", IncidentStatus::Failed, 3);
        let stats = IncidentStats::from_incidents(7, [&open, &done]);
        assert_eq!(stats.total_incidents, 2);
        assert_eq!(stats.auto_healed, 0);
        assert_eq!(stats.mttr_minutes, 3.0);
    }
}
