//! One-shot bulk load of history, backup listings and system documents.

use std::sync::Mutex;
use std::thread;

use serde_json::Value;
use tracing::{debug, warn};

use crate::api::{ApiClient, BackupsPayload, SamplesPayload};
use crate::error::FetchError;
use crate::model::{BackupKind, Channel, Sample};

/// Outcome of one of the six snapshot fetches.
#[derive(Debug)]
pub enum SnapshotPart {
    Backups(BackupKind, Result<Vec<String>, FetchError>),
    Samples(Channel, Result<Vec<Sample>, FetchError>),
    SystemInfo(Result<Value, FetchError>),
    SystemSummary(Result<Value, FetchError>),
}

impl SnapshotPart {
    pub fn error(&self) -> Option<&FetchError> {
        match self {
            SnapshotPart::Backups(_, r) => r.as_ref().err(),
            SnapshotPart::Samples(_, r) => r.as_ref().err(),
            SnapshotPart::SystemInfo(r) | SnapshotPart::SystemSummary(r) => r.as_ref().err(),
        }
    }
}

/// Every part of a completed load. Each field fails independently.
#[derive(Debug)]
pub struct Snapshot {
    pub packet_backups: Result<Vec<String>, FetchError>,
    pub anomaly_backups: Result<Vec<String>, FetchError>,
    pub packet_samples: Result<Vec<Sample>, FetchError>,
    pub anomaly_samples: Result<Vec<Sample>, FetchError>,
    pub system_info: Result<Value, FetchError>,
    pub system_summary: Result<Value, FetchError>,
}

impl Snapshot {
    pub fn into_parts(self) -> Vec<SnapshotPart> {
        vec![
            SnapshotPart::Backups(BackupKind::Packet, self.packet_backups),
            SnapshotPart::Backups(BackupKind::Anomaly, self.anomaly_backups),
            SnapshotPart::Samples(Channel::Packets, self.packet_samples),
            SnapshotPart::Samples(Channel::Anomalies, self.anomaly_samples),
            SnapshotPart::SystemInfo(self.system_info),
            SnapshotPart::SystemSummary(self.system_summary),
        ]
    }

    pub fn failures(&self) -> usize {
        [
            self.packet_backups.is_err(),
            self.anomaly_backups.is_err(),
            self.packet_samples.is_err(),
            self.anomaly_samples.is_err(),
            self.system_info.is_err(),
            self.system_summary.is_err(),
        ]
        .into_iter()
        .filter(|failed| *failed)
        .count()
    }
}

#[derive(Clone)]
pub struct SnapshotLoader {
    api: ApiClient,
}

impl SnapshotLoader {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Runs all six fetches in parallel and waits for them.
    ///
    /// Fails only when every fetch failed; otherwise the per-part results are
    /// returned and the caller applies whatever succeeded.
    pub fn load(&self) -> Result<Snapshot, FetchError> {
        let parts = Mutex::new(Vec::with_capacity(6));
        self.load_each(|part| {
            if let Ok(mut parts) = parts.lock() {
                parts.push(part);
            }
        });
        let parts = parts.into_inner().unwrap_or_default();
        assemble(parts)
    }

    /// Runs all six fetches in parallel, handing each result to `on_part` as soon
    /// as it resolves. Returns once every fetch has resolved.
    pub fn load_each<F>(&self, on_part: F)
    where
        F: Fn(SnapshotPart) + Sync,
    {
        let on_part = &on_part;
        thread::scope(|s| {
            for kind in [BackupKind::Packet, BackupKind::Anomaly] {
                s.spawn(move || on_part(SnapshotPart::Backups(kind, self.fetch_backups(kind))));
            }
            for channel in Channel::ALL {
                s.spawn(move || {
                    on_part(SnapshotPart::Samples(channel, self.fetch_samples(channel)))
                });
            }
            s.spawn(move || on_part(SnapshotPart::SystemInfo(self.fetch_system_info())));
            s.spawn(move || on_part(SnapshotPart::SystemSummary(self.fetch_system_summary())));
        });
    }

    pub fn fetch_samples(&self, channel: Channel) -> Result<Vec<Sample>, FetchError> {
        let path = match channel {
            Channel::Packets => "/api/packets",
            Channel::Anomalies => "/api/anomalies",
        };
        let what = format!("fetch {}", channel);
        let payload: SamplesPayload = self.api.get_json(&what, path).inspect_err(|err| {
            warn!(%channel, error = %err, "sample fetch failed");
        })?;
        let samples = payload.into_samples();
        debug!(%channel, count = samples.len(), "fetched samples");
        Ok(samples)
    }

    /// Lists backup files. Backends expose the listing under one of two paths,
    /// so a 404 on the first is retried once on the second.
    pub fn fetch_backups(&self, kind: BackupKind) -> Result<Vec<String>, FetchError> {
        let (primary, fallback) = match kind {
            BackupKind::Packet => ("/api/packet_backup", "/api/list_packet_backup"),
            BackupKind::Anomaly => ("/api/anomaly_backup", "/api/list_anomaly_backup"),
        };
        let what = format!("list {} backups", kind);
        let payload = match self.api.get_json::<BackupsPayload>(&what, primary) {
            Err(err) if err.is_not_found() => {
                debug!(%kind, path = fallback, "backup listing not found, trying fallback");
                self.api.get_json(&what, fallback)
            }
            other => other,
        }
        .inspect_err(|err| warn!(%kind, error = %err, "backup listing failed"))?;
        Ok(payload.into_files())
    }

    pub fn fetch_system_info(&self) -> Result<Value, FetchError> {
        self.api
            .get_json("fetch system info", "/api/system_info")
            .inspect_err(|err| warn!(error = %err, "system info fetch failed"))
            .map_err(FetchError::from)
    }

    pub fn fetch_system_summary(&self) -> Result<Value, FetchError> {
        self.api
            .get_json("fetch system summary", "/api/system_summary")
            .inspect_err(|err| warn!(error = %err, "system summary fetch failed"))
            .map_err(FetchError::from)
    }
}

fn assemble(parts: Vec<SnapshotPart>) -> Result<Snapshot, FetchError> {
    let missing = || -> FetchError {
        crate::error::RequestError::Transport {
            what: "snapshot".to_string(),
            message: "fetch did not resolve".to_string(),
        }
        .into()
    };

    let mut packet_backups = None;
    let mut anomaly_backups = None;
    let mut packet_samples = None;
    let mut anomaly_samples = None;
    let mut system_info = None;
    let mut system_summary = None;
    for part in parts {
        match part {
            SnapshotPart::Backups(BackupKind::Packet, r) => packet_backups = Some(r),
            SnapshotPart::Backups(BackupKind::Anomaly, r) => anomaly_backups = Some(r),
            SnapshotPart::Samples(Channel::Packets, r) => packet_samples = Some(r),
            SnapshotPart::Samples(Channel::Anomalies, r) => anomaly_samples = Some(r),
            SnapshotPart::SystemInfo(r) => system_info = Some(r),
            SnapshotPart::SystemSummary(r) => system_summary = Some(r),
        }
    }

    let snapshot = Snapshot {
        packet_backups: packet_backups.unwrap_or_else(|| Err(missing())),
        anomaly_backups: anomaly_backups.unwrap_or_else(|| Err(missing())),
        packet_samples: packet_samples.unwrap_or_else(|| Err(missing())),
        anomaly_samples: anomaly_samples.unwrap_or_else(|| Err(missing())),
        system_info: system_info.unwrap_or_else(|| Err(missing())),
        system_summary: system_summary.unwrap_or_else(|| Err(missing())),
    };

    if snapshot.failures() == 6 {
        let first = snapshot
            .into_parts()
            .into_iter()
            .find_map(|p| p.error().cloned())
            .unwrap_or_else(missing);
        return Err(first);
    }
    Ok(snapshot)
}

#[cfg(test)]
#[path = "tests/snapshot_tests.rs"]
mod tests;
