mod model;

use chrono::{DateTime, Utc};

use crate::detectors::Finding;
use crate::notifications::{NotificationEvent, Notifier};
use crate::store::{Store, StoreError};

pub use model::{Incident, IncidentStatus};

/// Outcome of feeding one finding through deduplication.
#[derive(Debug, Clone)]
pub struct IncidentUpdate {
    pub incident: Incident,
    pub created: bool,
}

/// Deduplicates findings into incidents and drives their lifecycle.
/// Every transition is persisted before its notification goes out.
#[derive(Clone)]
pub struct IncidentManager {
    store: Store,
    notifier: Notifier,
}

impl IncidentManager {
    pub fn new(store: Store, notifier: Notifier) -> Self {
        Self { store, notifier }
    }

    /// Records a finding. A repeated finding while an incident for the same
    /// (service, kind) is ACTIVE merges evidence and bumps severity instead
    /// of creating a duplicate. After an escalation, repeats within
    /// `dedupe_secs` of the last merged finding keep feeding the escalated
    /// incident silently, so a blocked outage cannot churn out a new
    /// incident per tick.
    pub fn record(&self, finding: Finding, dedupe_secs: u64) -> Result<IncidentUpdate, StoreError> {
        if let Some(mut existing) = self
            .store
            .active_incident(&finding.service, finding.kind)?
        {
            let severity_upgraded = finding.severity > existing.severity;
            merge_finding(&mut existing, &finding);
            if severity_upgraded {
                log::warn!(
                    "incident_severity_upgraded service={} kind={} severity={}",
                    existing.service,
                    existing.kind,
                    existing.severity
                );
            }
            self.store.put_incident(&existing)?;
            return Ok(IncidentUpdate {
                incident: existing,
                created: false,
            });
        }

        if let Some(mut escalated) = self
            .store
            .recent_incident(&finding.service, finding.kind)?
            .filter(|incident| incident.status == IncidentStatus::Escalated)
            && finding
                .observed_at
                .signed_duration_since(escalated.last_seen_at)
                .num_seconds()
                <= dedupe_secs as i64
        {
            merge_finding(&mut escalated, &finding);
            self.store.put_incident(&escalated)?;
            log::debug!(
                "incident_suppressed service={} kind={} escalated_incident_id={}",
                escalated.service,
                escalated.kind,
                escalated.id
            );
            return Ok(IncidentUpdate {
                incident: escalated,
                created: false,
            });
        }

        let incident = Incident {
            id: self.store.generate_id()?,
            uuid: uuid::Uuid::new_v4().to_string(),
            service: finding.service,
            kind: finding.kind,
            severity: finding.severity,
            status: IncidentStatus::Active,
            details: details_with_occurrences(finding.evidence, 1),
            created_at: finding.observed_at,
            last_seen_at: finding.observed_at,
            resolved_at: None,
            resolution_secs: None,
        };
        self.store.put_incident(&incident)?;

        log::warn!(
            "incident_created service={} kind={} severity={} uuid={}",
            incident.service,
            incident.kind,
            incident.severity,
            incident.uuid
        );
        self.notifier.dispatch(NotificationEvent::IncidentCreated {
            incident: incident.clone(),
        });

        Ok(IncidentUpdate {
            incident,
            created: true,
        })
    }

    /// Transitions an ACTIVE incident to RESOLVED and stamps the resolution
    /// duration. Returns None if the incident is unknown or already terminal.
    pub fn resolve(
        &self,
        incident_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Option<Incident>, StoreError> {
        let Some(mut incident) = self.store.get_incident(incident_id)? else {
            return Ok(None);
        };
        if incident.status != IncidentStatus::Active {
            return Ok(None);
        }

        incident.status = IncidentStatus::Resolved;
        incident.resolved_at = Some(now);
        incident.resolution_secs =
            Some(now.signed_duration_since(incident.created_at).num_seconds());
        self.store.put_incident(&incident)?;

        log::info!(
            "incident_resolved service={} kind={} resolution_secs={}",
            incident.service,
            incident.kind,
            incident.resolution_secs.unwrap_or(0)
        );
        self.notifier.dispatch(NotificationEvent::IncidentResolved {
            incident: incident.clone(),
        });
        Ok(Some(incident))
    }

    /// Transitions an ACTIVE incident to ESCALATED, a terminal state that
    /// hands the problem to a human.
    pub fn escalate(
        &self,
        incident_id: u64,
        reason: &str,
        _now: DateTime<Utc>,
    ) -> Result<Option<Incident>, StoreError> {
        let Some(mut incident) = self.store.get_incident(incident_id)? else {
            return Ok(None);
        };
        if incident.status != IncidentStatus::Active {
            return Ok(None);
        }

        incident.status = IncidentStatus::Escalated;
        self.store.put_incident(&incident)?;

        log::error!(
            "incident_escalated service={} kind={} reason={}",
            incident.service,
            incident.kind,
            reason
        );
        self.notifier
            .dispatch(NotificationEvent::IncidentEscalated {
                incident: incident.clone(),
                reason: reason.to_string(),
            });
        Ok(Some(incident))
    }

    pub fn active_for_service(&self, service: &str) -> Result<Vec<Incident>, StoreError> {
        self.store.active_incidents_for_service(service)
    }
}

fn merge_finding(incident: &mut Incident, finding: &Finding) {
    let occurrences = incident
        .details
        .get("occurrences")
        .and_then(|value| value.as_u64())
        .unwrap_or(1);
    incident.details = details_with_occurrences(finding.evidence.clone(), occurrences + 1);
    if finding.severity > incident.severity {
        incident.severity = finding.severity;
    }
    incident.last_seen_at = finding.observed_at;
}

fn details_with_occurrences(evidence: serde_json::Value, occurrences: u64) -> serde_json::Value {
    let mut details = match evidence {
        serde_json::Value::Object(map) => serde_json::Value::Object(map),
        other => serde_json::json!({ "evidence": other }),
    };
    if let Some(object) = details.as_object_mut() {
        object.insert("occurrences".to_string(), occurrences.into());
    }
    details
}
