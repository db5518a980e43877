//! Engine facade and shared operation context.
//!
//! [`TriageEngine`] is cheap to clone and hands out the per-component services. Every service
//! holds the same [`EngineContext`], so they share the store, the collaborators and the lock
//! registries that serialise mutations.

use crate::assessment::AssessmentService;
use crate::collaborators::{
    Authorizer, Clock, Notification, NotificationKind, Notifier, PatientDirectory,
};
use crate::config::TriageConfig;
use crate::error::{TriageError, TriageResult};
use crate::locks::EngineLocks;
use crate::monitor::SlaMonitor;
use crate::protocol::ProtocolService;
use crate::queue::QueueService;
use crate::reporting::ReportingService;
use crate::store::TriageStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use triage_types::UserId;

/// External systems the engine calls out to.
#[derive(Clone)]
pub struct Collaborators {
    pub authorizer: Arc<dyn Authorizer>,
    pub patients: Arc<dyn PatientDirectory>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

pub(crate) struct EngineContext {
    pub(crate) cfg: Arc<TriageConfig>,
    pub(crate) store: Arc<dyn TriageStore>,
    pub(crate) authorizer: Arc<dyn Authorizer>,
    pub(crate) patients: Arc<dyn PatientDirectory>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) locks: EngineLocks,
}

impl EngineContext {
    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn ensure_authorised(&self, caller: UserId) -> TriageResult<()> {
        if self.authorizer.is_authorized_for_triage(caller) {
            Ok(())
        } else {
            tracing::warn!(%caller, "caller is not authorised for triage");
            Err(TriageError::Unauthorised(caller))
        }
    }

    /// Sends a notification to the configured alert recipients.
    pub(crate) fn notify(&self, kind: NotificationKind, message: String) {
        let recipients = self.cfg.alert_recipients().to_vec();
        if recipients.is_empty() {
            tracing::debug!(?kind, "no alert recipients configured");
        }
        self.notifier.send(Notification {
            kind,
            message,
            recipients,
        });
    }
}

/// Entry point to the triage engine.
#[derive(Clone)]
pub struct TriageEngine {
    ctx: Arc<EngineContext>,
}

impl TriageEngine {
    pub fn new(
        cfg: Arc<TriageConfig>,
        store: Arc<dyn TriageStore>,
        collaborators: Collaborators,
    ) -> Self {
        let Collaborators {
            authorizer,
            patients,
            notifier,
            clock,
        } = collaborators;

        Self {
            ctx: Arc::new(EngineContext {
                cfg,
                store,
                authorizer,
                patients,
                notifier,
                clock,
                locks: EngineLocks::default(),
            }),
        }
    }

    pub fn config(&self) -> &TriageConfig {
        &self.ctx.cfg
    }

    pub fn assessments(&self) -> AssessmentService {
        AssessmentService::new(self.ctx.clone())
    }

    pub fn queue(&self) -> QueueService {
        QueueService::new(self.ctx.clone())
    }

    pub fn protocols(&self) -> ProtocolService {
        ProtocolService::new(self.ctx.clone())
    }

    pub fn reports(&self) -> ReportingService {
        ReportingService::new(self.ctx.clone())
    }

    pub fn monitor(&self) -> SlaMonitor {
        SlaMonitor::new(self.ctx.clone())
    }
}
