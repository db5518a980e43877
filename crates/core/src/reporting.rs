//! Read-only daily and weekly triage statistics.
//!
//! Days are UTC calendar days. When a department is given, an assessment counts towards it if
//! it was recommended to that department or any of its queue entries targeted it.

use crate::assessment::{AssessmentStatus, ReassessmentReason, ReassessmentRecord, TriageAssessment};
use crate::engine::EngineContext;
use crate::error::TriageResult;
use crate::queue::{average_wait_minutes, TriageQueueEntry};
use crate::store::{AssessmentFilter, QueueFilter};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use triage_types::{AssessmentId, DepartmentId};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub completed: usize,
    pub cancelled: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub department: Option<DepartmentId>,
    pub assessments_created: usize,
    pub by_level: BTreeMap<u8, usize>,
    pub by_status: StatusCounts,
    pub reassessments: usize,
    pub deteriorations: usize,
    pub protocol_applications: usize,
    /// Mean start-to-end time of the day's completed assessments.
    pub average_triage_minutes: Option<f64>,
    pub queue_entries_enqueued: usize,
    pub queue_entries_called: usize,
    /// Mean wait of the entries called that day.
    pub average_wait_minutes: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub week_start: NaiveDate,
    pub department: Option<DepartmentId>,
    pub days: Vec<DailyReport>,
    pub total_assessments: usize,
    pub total_reassessments: usize,
    pub total_deteriorations: usize,
    pub total_protocol_applications: usize,
    pub total_enqueued: usize,
    pub total_called: usize,
    /// Day with the most assessments; the earliest wins a tie. `None` for an empty week.
    pub busiest_day: Option<NaiveDate>,
    /// Mean wait across the week, weighted by the number of entries called each day.
    pub average_wait_minutes: Option<f64>,
}

fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    (start, start + chrono::Duration::days(1))
}

fn within(at: DateTime<Utc>, (start, end): (DateTime<Utc>, DateTime<Utc>)) -> bool {
    at >= start && at < end
}

/// Assessments, entries and reassessments scoped to one department (or all).
struct Dataset {
    assessments: Vec<TriageAssessment>,
    entries: Vec<TriageQueueEntry>,
    reassessments: Vec<ReassessmentRecord>,
}

impl Dataset {
    fn load(
        ctx: &EngineContext,
        department: Option<DepartmentId>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> TriageResult<Self> {
        let assessments = ctx.store.list_assessments(&AssessmentFilter::default())?;
        let entries = ctx.store.list_queue_entries(&QueueFilter {
            department,
            ..Default::default()
        })?;
        let reassessments = ctx.store.reassessments_between(from, to)?;

        let Some(department) = department else {
            return Ok(Self {
                assessments,
                entries,
                reassessments,
            });
        };

        let mut members: HashSet<AssessmentId> =
            entries.iter().map(|e| e.assessment_id).collect();
        members.extend(
            assessments
                .iter()
                .filter(|a| a.recommended_department == Some(department))
                .map(|a| a.id),
        );

        Ok(Self {
            assessments: assessments
                .into_iter()
                .filter(|a| members.contains(&a.id))
                .collect(),
            entries,
            reassessments: reassessments
                .into_iter()
                .filter(|r| members.contains(&r.assessment_id))
                .collect(),
        })
    }

    fn daily(&self, date: NaiveDate, department: Option<DepartmentId>) -> DailyReport {
        let bounds = day_bounds(date);

        let created: Vec<&TriageAssessment> = self
            .assessments
            .iter()
            .filter(|a| within(a.triage_started_at, bounds))
            .collect();

        let mut by_level = BTreeMap::new();
        let mut by_status = StatusCounts::default();
        for assessment in &created {
            *by_level.entry(assessment.level.number()).or_insert(0) += 1;
            match assessment.status {
                AssessmentStatus::Pending => by_status.pending += 1,
                AssessmentStatus::Completed => by_status.completed += 1,
                AssessmentStatus::Cancelled => by_status.cancelled += 1,
            }
        }

        let durations: Vec<i64> = created
            .iter()
            .filter_map(|a| a.triage_duration())
            .map(|d| d.num_seconds())
            .collect();
        let average_triage_minutes = (!durations.is_empty())
            .then(|| durations.iter().sum::<i64>() as f64 / durations.len() as f64 / 60.0);

        let records: Vec<&ReassessmentRecord> = self
            .reassessments
            .iter()
            .filter(|r| within(r.created_at, bounds))
            .collect();

        let called: Vec<&TriageQueueEntry> = self
            .entries
            .iter()
            .filter(|e| e.called_at.is_some_and(|at| within(at, bounds)))
            .collect();

        DailyReport {
            date,
            department,
            assessments_created: created.len(),
            by_level,
            by_status,
            reassessments: records.len(),
            deteriorations: records.iter().filter(|r| r.is_deterioration()).count(),
            protocol_applications: records
                .iter()
                .filter(|r| r.reason == ReassessmentReason::ProtocolDriven)
                .count(),
            average_triage_minutes,
            queue_entries_enqueued: self
                .entries
                .iter()
                .filter(|e| within(e.queued_at, bounds))
                .count(),
            queue_entries_called: called.len(),
            average_wait_minutes: average_wait_minutes(called),
        }
    }
}

#[derive(Clone)]
pub struct ReportingService {
    ctx: Arc<EngineContext>,
}

impl ReportingService {
    pub(crate) fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    pub fn daily(
        &self,
        date: NaiveDate,
        department: Option<DepartmentId>,
    ) -> TriageResult<DailyReport> {
        let (from, to) = day_bounds(date);
        let data = Dataset::load(&self.ctx, department, from, to)?;
        let report = data.daily(date, department);
        tracing::debug!(%date, ?department, assessments = report.assessments_created, "daily report");
        Ok(report)
    }

    /// Seven daily reports starting at `week_start`, with totals.
    pub fn weekly(
        &self,
        week_start: NaiveDate,
        department: Option<DepartmentId>,
    ) -> TriageResult<WeeklyReport> {
        let dates: Vec<NaiveDate> = (0..7)
            .filter_map(|offset| week_start.checked_add_days(Days::new(offset)))
            .collect();
        let (from, _) = day_bounds(week_start);
        let to = from + chrono::Duration::days(7);

        let data = Dataset::load(&self.ctx, department, from, to)?;
        let days: Vec<DailyReport> = dates
            .into_iter()
            .map(|date| data.daily(date, department))
            .collect();

        let total_called: usize = days.iter().map(|d| d.queue_entries_called).sum();
        let weighted_wait: f64 = days
            .iter()
            .filter_map(|d| {
                d.average_wait_minutes
                    .map(|avg| avg * d.queue_entries_called as f64)
            })
            .sum();

        let busiest_day = days
            .iter()
            .filter(|d| d.assessments_created > 0)
            .fold(None::<&DailyReport>, |best, day| match best {
                Some(b) if b.assessments_created >= day.assessments_created => Some(b),
                _ => Some(day),
            })
            .map(|d| d.date);

        let report = WeeklyReport {
            week_start,
            department,
            total_assessments: days.iter().map(|d| d.assessments_created).sum(),
            total_reassessments: days.iter().map(|d| d.reassessments).sum(),
            total_deteriorations: days.iter().map(|d| d.deteriorations).sum(),
            total_protocol_applications: days.iter().map(|d| d.protocol_applications).sum(),
            total_enqueued: days.iter().map(|d| d.queue_entries_enqueued).sum(),
            total_called,
            busiest_day,
            average_wait_minutes: (total_called > 0).then(|| weighted_wait / total_called as f64),
            days,
        };

        tracing::debug!(%week_start, ?department, total = report.total_assessments, "weekly report");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::Clock;
    use crate::acuity::AcuityLevel;
    use crate::assessment::Completion;
    use crate::test_support::{critical_vitals, fixture, intake, sample_vitals, urgent_vitals, NURSE};
    use chrono::Duration;

    #[test]
    fn test_daily_report_counts() {
        let fx = fixture();
        let assessments = fx.engine.assessments();
        let queue = fx.engine.queue();
        let today = fx.clock.now().date_naive();

        let first = assessments.create(NURSE, intake(1, urgent_vitals())).unwrap();
        assessments.create(NURSE, intake(2, critical_vitals())).unwrap();
        let third = assessments.create(NURSE, intake(3, sample_vitals())).unwrap();

        fx.clock.advance(Duration::minutes(12));
        queue.call_next(NURSE, None).unwrap();
        assessments
            .reassess(
                NURSE,
                third.assessment.id,
                AcuityLevel::Urgent,
                ReassessmentReason::Deterioration,
                None,
            )
            .unwrap();
        fx.clock.advance(Duration::minutes(8));
        assessments
            .complete(NURSE, first.assessment.id, Completion::default())
            .unwrap();

        let report = fx.engine.reports().daily(today, None).unwrap();
        assert_eq!(report.assessments_created, 3);
        assert_eq!(report.by_level.get(&1), Some(&1));
        assert_eq!(report.by_level.get(&3), Some(&2));
        assert_eq!(report.by_status.completed, 1);
        assert_eq!(report.by_status.pending, 2);
        assert_eq!(report.reassessments, 1);
        assert_eq!(report.deteriorations, 1);
        assert_eq!(report.protocol_applications, 0);
        assert_eq!(report.average_triage_minutes, Some(20.0));
        assert_eq!(report.queue_entries_enqueued, 3);
        assert_eq!(report.queue_entries_called, 1);
        assert_eq!(report.average_wait_minutes, Some(12.0));

        let tomorrow = today.succ_opt().unwrap();
        let empty = fx.engine.reports().daily(tomorrow, None).unwrap();
        assert_eq!(empty.assessments_created, 0);
        assert_eq!(empty.average_wait_minutes, None);
    }

    #[test]
    fn test_department_membership() {
        let fx = fixture();
        let assessments = fx.engine.assessments();
        let today = fx.clock.now().date_naive();

        let mut queued = intake(1, sample_vitals());
        queued.target_department = Some(DepartmentId(7));
        assessments.create(NURSE, queued).unwrap();

        let recommended = assessments.create(NURSE, intake(2, sample_vitals())).unwrap();
        assessments
            .complete(
                NURSE,
                recommended.assessment.id,
                Completion {
                    department: Some(DepartmentId(7)),
                    doctor: None,
                },
            )
            .unwrap();
        assessments.create(NURSE, intake(3, sample_vitals())).unwrap();

        let report = fx.engine.reports().daily(today, Some(DepartmentId(7))).unwrap();
        assert_eq!(report.assessments_created, 2);
        // Only the entry that targeted the department counts as queue activity.
        assert_eq!(report.queue_entries_enqueued, 1);
    }

    #[test]
    fn test_weekly_report_totals_and_busiest_day() {
        let fx = fixture();
        let assessments = fx.engine.assessments();
        let week_start = fx.clock.now().date_naive();

        assessments.create(NURSE, intake(1, sample_vitals())).unwrap();
        fx.clock.advance(Duration::days(2));
        assessments.create(NURSE, intake(2, sample_vitals())).unwrap();
        assessments.create(NURSE, intake(3, sample_vitals())).unwrap();
        fx.clock.advance(Duration::minutes(30));
        fx.engine.queue().call_next(NURSE, None).unwrap();

        let report = fx.engine.reports().weekly(week_start, None).unwrap();
        assert_eq!(report.days.len(), 7);
        assert_eq!(report.total_assessments, 3);
        assert_eq!(report.total_enqueued, 3);
        assert_eq!(report.total_called, 1);
        assert_eq!(
            report.busiest_day,
            Some(week_start + Duration::days(2))
        );
        // Patient 1 waited two days and thirty minutes.
        assert_eq!(report.average_wait_minutes, Some((2.0 * 24.0 * 60.0) + 30.0));
    }
}
