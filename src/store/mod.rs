use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use chrono::{DateTime, Utc};
use sled::Transactional;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use thiserror::Error;

use crate::breaker::BreakerState;
use crate::config::StoreConfig;
use crate::detectors::FindingKind;
use crate::incidents::{Incident, IncidentStatus};
use crate::remediation::{ActionType, RemediationAction};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o error: {0}")]
    Sled(#[from] sled::Error),
    #[error("store encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("store transaction aborted")]
    TransactionAborted,
}

/// Embedded persistence for incidents, remediation actions, breaker state and
/// the rate-limit window. One tree per record family; values are JSON.
#[derive(Clone)]
pub struct Store {
    db: sled::Db,
    incidents: sled::Tree,
    incidents_active: sled::Tree,
    incidents_recent: sled::Tree,
    actions: sled::Tree,
    breaker: sled::Tree,
    action_window: sled::Tree,
    window_sequence: Arc<AtomicU32>,
}

impl Store {
    pub fn open_from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        Self::open(&config.path)
    }

    pub fn open(path: &str) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        let incidents = db.open_tree("incidents")?;
        let incidents_active = db.open_tree("incidents_active")?;
        let incidents_recent = db.open_tree("incidents_recent")?;
        let actions = db.open_tree("actions")?;
        let breaker = db.open_tree("breaker")?;
        let action_window = db.open_tree("action_window")?;
        Ok(Self {
            db,
            incidents,
            incidents_active,
            incidents_recent,
            actions,
            breaker,
            action_window,
            window_sequence: Arc::new(AtomicU32::new(0)),
        })
    }

    pub fn generate_id(&self) -> Result<u64, StoreError> {
        Ok(self.db.generate_id()?)
    }

    // --- incidents ---

    /// Writes the incident record and keeps the indexes in sync: an ACTIVE
    /// incident is reachable by (service, kind) in the active index, and the
    /// recent index always points at the newest incident of that pair
    /// regardless of status.
    pub fn put_incident(&self, incident: &Incident) -> Result<(), StoreError> {
        let value = serde_json::to_vec(incident)?;
        self.incidents
            .insert(incident.id.to_be_bytes(), value)?;

        let idx_key = active_key(&incident.service, incident.kind);
        if incident.status == IncidentStatus::Active {
            self.incidents_active
                .insert(idx_key.clone(), &incident.id.to_be_bytes())?;
        } else {
            self.incidents_active.remove(idx_key.clone())?;
        }
        self.incidents_recent
            .insert(idx_key, &incident.id.to_be_bytes())?;
        Ok(())
    }

    pub fn get_incident(&self, id: u64) -> Result<Option<Incident>, StoreError> {
        let Some(value) = self.incidents.get(id.to_be_bytes())? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&value)?))
    }

    pub fn active_incident(
        &self,
        service: &str,
        kind: FindingKind,
    ) -> Result<Option<Incident>, StoreError> {
        let Some(id_bytes) = self.incidents_active.get(active_key(service, kind))? else {
            return Ok(None);
        };
        let id = decode_u64(&id_bytes);
        self.get_incident(id)
    }

    /// Newest incident of (service, kind) in any status. Used for the
    /// dedupe window after an escalation has cleared the active slot.
    pub fn recent_incident(
        &self,
        service: &str,
        kind: FindingKind,
    ) -> Result<Option<Incident>, StoreError> {
        let Some(id_bytes) = self.incidents_recent.get(active_key(service, kind))? else {
            return Ok(None);
        };
        self.get_incident(decode_u64(&id_bytes))
    }

    pub fn active_incidents_for_service(
        &self,
        service: &str,
    ) -> Result<Vec<Incident>, StoreError> {
        let mut prefix = service.as_bytes().to_vec();
        prefix.push(0);

        let mut incidents = Vec::new();
        for item in self.incidents_active.scan_prefix(prefix) {
            let (_, id_bytes) = item?;
            if let Some(incident) = self.get_incident(decode_u64(&id_bytes))? {
                incidents.push(incident);
            }
        }
        incidents.sort_by_key(|incident| incident.id);
        Ok(incidents)
    }

    // --- remediation actions + breaker + rate-limit window ---

    /// Records one attempt outcome atomically: the audit row, the rate-limit
    /// window entry and the updated breaker state commit or fail together, so
    /// a crash cannot leave an action recorded without its breaker update.
    pub fn record_attempt_outcome(
        &self,
        action: &RemediationAction,
        breaker_state: &BreakerState,
    ) -> Result<(), StoreError> {
        let action_key = action_key(action.incident_id, action.id);
        let action_value = serde_json::to_vec(action)?;

        let seq = self.window_sequence.fetch_add(1, Ordering::Relaxed);
        let window_key = window_key(
            &action.service,
            action.action_type,
            action.created_at,
            seq,
        );
        let window_value = [u8::from(action.success)];

        let breaker_key = action.service.as_bytes().to_vec();
        let breaker_value = serde_json::to_vec(breaker_state)?;

        let result = (&self.actions, &self.action_window, &self.breaker).transaction(
            |(actions, window, breaker)| {
                actions.insert(action_key.as_slice(), action_value.as_slice())?;
                window.insert(window_key.as_slice(), window_value.as_slice())?;
                breaker.insert(breaker_key.as_slice(), breaker_value.as_slice())?;
                Ok::<(), ConflictableTransactionError<()>>(())
            },
        );

        match result {
            Ok(()) => Ok(()),
            Err(TransactionError::Abort(())) => Err(StoreError::TransactionAborted),
            Err(TransactionError::Storage(source)) => Err(StoreError::Sled(source)),
        }
    }

    pub fn actions_for_incident(
        &self,
        incident_id: u64,
    ) -> Result<Vec<RemediationAction>, StoreError> {
        let mut actions = Vec::new();
        for item in self.actions.scan_prefix(incident_id.to_be_bytes()) {
            let (_, value) = item?;
            actions.push(serde_json::from_slice(&value)?);
        }
        Ok(actions)
    }

    pub fn last_action_at(
        &self,
        incident_id: u64,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let mut latest: Option<DateTime<Utc>> = None;
        for item in self.actions.scan_prefix(incident_id.to_be_bytes()) {
            let (_, value) = item?;
            let action: RemediationAction = serde_json::from_slice(&value)?;
            if latest.is_none_or(|current| action.created_at > current) {
                latest = Some(action.created_at);
            }
        }
        Ok(latest)
    }

    pub fn breaker_state(&self, service: &str) -> Result<Option<BreakerState>, StoreError> {
        let Some(value) = self.breaker.get(service.as_bytes())? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&value)?))
    }

    pub fn put_breaker_state(
        &self,
        service: &str,
        state: &BreakerState,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_vec(state)?;
        self.breaker.insert(service.as_bytes(), value)?;
        Ok(())
    }

    /// Appends a window entry outside the transactional outcome path. Used
    /// when an attempt is counted without a full audit record.
    pub fn append_window_entry(
        &self,
        service: &str,
        action_type: ActionType,
        timestamp: DateTime<Utc>,
        success: bool,
    ) -> Result<(), StoreError> {
        let seq = self.window_sequence.fetch_add(1, Ordering::Relaxed);
        let key = window_key(service, action_type, timestamp, seq);
        self.action_window.insert(key, &[u8::from(success)])?;
        Ok(())
    }

    pub fn count_actions_since(
        &self,
        service: &str,
        action_type: ActionType,
        cutoff: DateTime<Utc>,
    ) -> Result<u32, StoreError> {
        let prefix = window_prefix(service, action_type);
        let prefix_len = prefix.len();
        let cutoff_millis = cutoff.timestamp_millis();

        let mut count = 0;
        for item in self.action_window.scan_prefix(prefix) {
            let (key, _) = item?;
            if let Some(millis) = window_entry_millis(&key, prefix_len)
                && millis >= cutoff_millis
            {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn prune_window_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let cutoff_millis = cutoff.timestamp_millis();
        let mut removed = 0;

        let stale: Vec<sled::IVec> = self
            .action_window
            .iter()
            .keys()
            .filter_map(|key| key.ok())
            .filter(|key| {
                // The timestamp sits after the service\0action\0 prefix.
                let prefix_len = key.len().saturating_sub(12);
                window_entry_millis(key, prefix_len)
                    .is_some_and(|millis| millis < cutoff_millis)
            })
            .collect();

        for key in stale {
            self.action_window.remove(key)?;
            removed += 1;
        }
        Ok(removed)
    }
}

fn active_key(service: &str, kind: FindingKind) -> Vec<u8> {
    let kind = kind.as_str().as_bytes();
    let mut key = Vec::with_capacity(service.len() + 1 + kind.len());
    key.extend_from_slice(service.as_bytes());
    key.push(0);
    key.extend_from_slice(kind);
    key
}

fn action_key(incident_id: u64, action_id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(16);
    key.extend_from_slice(&incident_id.to_be_bytes());
    key.extend_from_slice(&action_id.to_be_bytes());
    key
}

fn window_prefix(service: &str, action_type: ActionType) -> Vec<u8> {
    let action = action_type.as_str().as_bytes();
    let mut prefix = Vec::with_capacity(service.len() + 2 + action.len());
    prefix.extend_from_slice(service.as_bytes());
    prefix.push(0);
    prefix.extend_from_slice(action);
    prefix.push(0);
    prefix
}

fn window_key(
    service: &str,
    action_type: ActionType,
    timestamp: DateTime<Utc>,
    seq: u32,
) -> Vec<u8> {
    let mut key = window_prefix(service, action_type);
    key.extend_from_slice(&timestamp.timestamp_millis().to_be_bytes());
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

fn window_entry_millis(key: &[u8], prefix_len: usize) -> Option<i64> {
    let bytes = key.get(prefix_len..prefix_len + 8)?;
    Some(i64::from_be_bytes(bytes.try_into().ok()?))
}

fn decode_u64(bytes: &[u8]) -> u64 {
    let mut buffer = [0u8; 8];
    let len = bytes.len().min(8);
    buffer[..len].copy_from_slice(&bytes[..len]);
    u64::from_be_bytes(buffer)
}
