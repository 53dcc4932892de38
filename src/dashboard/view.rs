use serde_json::Value;

use crate::feed::ConnectionState;
use crate::model::{BackupKind, Notice, Series};

/// Immutable read model handed to presentation. `None` fields have not loaded
/// yet and render as a loading placeholder.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DashboardView {
    pub packets: Series,
    pub anomalies: Series,
    pub packet_backups: Option<Vec<String>>,
    pub anomaly_backups: Option<Vec<String>>,
    pub system_info: Option<Value>,
    pub system_summary: Option<Value>,
    pub blacklist: Vec<String>,
    pub whitelist: Vec<String>,
    pub connection: ConnectionState,
    pub loading: bool,
    pub notices: Vec<Notice>,
}

impl DashboardView {
    /// Backup files of both kinds, packet captures first.
    pub fn backup_rows(&self) -> Vec<(BackupKind, &str)> {
        let packets = self
            .packet_backups
            .iter()
            .flatten()
            .map(|f| (BackupKind::Packet, f.as_str()));
        let anomalies = self
            .anomaly_backups
            .iter()
            .flatten()
            .map(|f| (BackupKind::Anomaly, f.as_str()));
        packets.chain(anomalies).collect()
    }

    pub fn latest_notice(&self) -> Option<&Notice> {
        self.notices.last()
    }
}
