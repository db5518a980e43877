//! Reassessment deadline monitoring.
//!
//! Pull-based: nothing here owns a timer. The runtime binary calls [`SlaMonitor::scan_overdue`]
//! on an interval; tests and the CLI call it directly.

use crate::collaborators::NotificationKind;
use crate::engine::EngineContext;
use crate::error::TriageResult;
use crate::queue::{QueueService, TriageQueueEntry};
use std::sync::Arc;

#[derive(Clone)]
pub struct SlaMonitor {
    ctx: Arc<EngineContext>,
}

impl SlaMonitor {
    pub(crate) fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Find every overdue entry and send one summary notification if there are any.
    pub fn scan_overdue(&self) -> TriageResult<Vec<TriageQueueEntry>> {
        let now = self.ctx.now();
        let overdue = QueueService::new(self.ctx.clone()).overdue(None)?;
        if overdue.is_empty() {
            tracing::debug!("overdue scan found nothing");
            return Ok(overdue);
        }

        let worst = overdue
            .iter()
            .filter_map(|e| e.next_reassessment_due_at)
            .min()
            .map(|due| (now - due).num_minutes())
            .unwrap_or_default();

        tracing::warn!(
            count = overdue.len(),
            longest_overdue_minutes = worst,
            "waiting patients past reassessment deadline"
        );

        let patients: Vec<String> = overdue.iter().map(|e| e.patient_id.to_string()).collect();
        self.ctx.notify(
            NotificationKind::SlaBreach,
            format!(
                "{} waiting patient(s) overdue for reassessment (longest {} min): {}",
                overdue.len(),
                worst,
                patients.join(", ")
            ),
        );

        Ok(overdue)
    }
}

#[cfg(test)]
mod tests {
    use crate::collaborators::NotificationKind;
    use crate::test_support::{fixture, intake, sample_vitals, urgent_vitals, NURSE};
    use chrono::Duration;

    #[test]
    fn test_scan_notifies_once_with_summary() {
        let fx = fixture();
        let assessments = fx.engine.assessments();
        assessments.create(NURSE, intake(1, urgent_vitals())).unwrap();
        assessments.create(NURSE, intake(2, urgent_vitals())).unwrap();
        assessments.create(NURSE, intake(3, sample_vitals())).unwrap();

        let monitor = fx.engine.monitor();
        assert!(monitor.scan_overdue().unwrap().is_empty());
        assert!(fx.notifier.sent().is_empty());

        fx.clock.advance(Duration::minutes(45));
        let overdue = monitor.scan_overdue().unwrap();
        assert_eq!(overdue.len(), 2);

        let sent = fx.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::SlaBreach);
        assert!(sent[0].message.contains("longest 15 min"));
        assert_eq!(sent[0].recipients, fx.engine.config().alert_recipients());
    }
}
