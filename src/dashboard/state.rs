use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::access::ListEdit;
use crate::control::{ControlAck, DeviceCommand};
use crate::error::{ControlError, MutationError};
use crate::feed::ConnectionState;
use crate::model::{AccessList, BackupKind, Channel, Notice, Sample};
use crate::snapshot::SnapshotPart;
use crate::window::SampleWindow;

use super::view::DashboardView;

const NOTICES_KEEP_LAST: usize = 20;

/// Single-owner dashboard state. Every mutation rebuilds the shared view.
pub struct DashboardState {
    packets: SampleWindow,
    anomalies: SampleWindow,
    packet_backups: Option<Vec<String>>,
    anomaly_backups: Option<Vec<String>>,
    system_info: Option<Value>,
    system_summary: Option<Value>,
    blacklist: Vec<String>,
    whitelist: Vec<String>,
    connection: ConnectionState,
    notices: VecDeque<Notice>,

    generation: u64,
    loading: bool,

    // Live samples received since the current load began, per channel still
    // waiting for its seed. Re-appended after the seed so none are lost.
    since_load: HashMap<Channel, Vec<Sample>>,

    view: Arc<DashboardView>,
}

impl DashboardState {
    pub fn new(capacity: usize, blacklist: Vec<String>, whitelist: Vec<String>) -> Self {
        let mut state = Self {
            packets: SampleWindow::with_capacity(capacity),
            anomalies: SampleWindow::with_capacity(capacity),
            packet_backups: None,
            anomaly_backups: None,
            system_info: None,
            system_summary: None,
            blacklist: dedup(blacklist),
            whitelist: dedup(whitelist),
            connection: ConnectionState::Disconnected,
            notices: VecDeque::new(),
            generation: 0,
            loading: false,
            since_load: HashMap::new(),
            view: Arc::new(DashboardView::default()),
        };
        state.refresh();
        state
    }

    pub fn view(&self) -> Arc<DashboardView> {
        self.view.clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn window(&self, channel: Channel) -> &SampleWindow {
        match channel {
            Channel::Packets => &self.packets,
            Channel::Anomalies => &self.anomalies,
        }
    }

    fn window_mut(&mut self, channel: Channel) -> &mut SampleWindow {
        match channel {
            Channel::Packets => &mut self.packets,
            Channel::Anomalies => &mut self.anomalies,
        }
    }

    /// Starts a new load generation. Parts from older generations are ignored
    /// from now on.
    pub fn begin_load(&mut self) -> u64 {
        self.generation += 1;
        self.loading = true;
        for channel in Channel::ALL {
            self.since_load.entry(channel).or_default();
        }
        self.refresh();
        self.generation
    }

    pub fn finish_load(&mut self, generation: u64) {
        if generation != self.generation {
            return;
        }
        self.loading = false;
        self.refresh();
    }

    pub fn apply_part(&mut self, generation: u64, part: SnapshotPart) {
        if generation != self.generation {
            debug!(generation, current = self.generation, "dropping stale snapshot part");
            return;
        }
        match part {
            SnapshotPart::Samples(channel, Ok(samples)) => self.seed(channel, samples),
            SnapshotPart::Samples(channel, Err(err)) => {
                self.since_load.remove(&channel);
                self.push_notice(Notice::error(err.to_string()));
            }
            SnapshotPart::Backups(kind, Ok(files)) => match kind {
                BackupKind::Packet => self.packet_backups = Some(files),
                BackupKind::Anomaly => self.anomaly_backups = Some(files),
            },
            SnapshotPart::SystemInfo(Ok(doc)) => self.system_info = Some(doc),
            SnapshotPart::SystemSummary(Ok(doc)) => self.system_summary = Some(doc),
            SnapshotPart::Backups(_, Err(err))
            | SnapshotPart::SystemInfo(Err(err))
            | SnapshotPart::SystemSummary(Err(err)) => {
                self.push_notice(Notice::error(err.to_string()));
            }
        }
        self.refresh();
    }

    /// Replaces the window's contents with `samples`, then re-appends any live
    /// samples that arrived during the load and are not part of the seed.
    fn seed(&mut self, channel: Channel, samples: Vec<Sample>) {
        let live = self.since_load.remove(&channel).unwrap_or_default();
        let window = self.window_mut(channel);
        window.reset();
        for sample in &samples {
            window.push(sample.clone());
        }
        for sample in live {
            if !samples.contains(&sample) {
                window.push(sample);
            }
        }
    }

    pub fn push_live(&mut self, channel: Channel, sample: Sample) {
        let capacity = self.window(channel).capacity();
        if let Some(pending) = self.since_load.get_mut(&channel) {
            pending.push(sample.clone());
            if capacity.is_some_and(|cap| pending.len() > cap) {
                pending.remove(0);
            }
        }
        self.window_mut(channel).push(sample);
        self.refresh();
    }

    pub fn set_connection(&mut self, state: ConnectionState) {
        if self.connection != state {
            self.connection = state;
            self.refresh();
        }
    }

    /// Reflects an access-list edit once its outcome is known. The local copy
    /// only changes after the server acknowledged the edit.
    pub fn apply_list_edit(
        &mut self,
        list: AccessList,
        edit: ListEdit,
        ip: &str,
        result: Result<(), MutationError>,
    ) {
        match result {
            Ok(()) => {
                let entries = match list {
                    AccessList::Blacklist => &mut self.blacklist,
                    AccessList::Whitelist => &mut self.whitelist,
                };
                let ip = ip.trim();
                match edit {
                    ListEdit::Add => {
                        if !entries.iter().any(|e| e == ip) {
                            entries.push(ip.to_string());
                        }
                        self.push_notice(Notice::info(format!("added {} to {}", ip, list)));
                    }
                    ListEdit::Remove => {
                        entries.retain(|e| e != ip);
                        self.push_notice(Notice::info(format!("removed {} from {}", ip, list)));
                    }
                }
            }
            Err(err) => self.push_notice(Notice::error(err.to_string())),
        }
        self.refresh();
    }

    pub fn apply_command(&mut self, command: DeviceCommand, result: Result<ControlAck, ControlError>) {
        let notice = match result {
            Ok(ack) => {
                let mut text = format!("{} accepted", command.describe());
                if let Some(file) = ack.backup_file {
                    text.push_str(&format!(": {}", file));
                } else if let Some(message) = ack.message {
                    text.push_str(&format!(": {}", message));
                }
                Notice::info(text)
            }
            Err(err) => Notice::error(err.to_string()),
        };
        self.push_notice(notice);
        self.refresh();
    }

    pub fn notify(&mut self, notice: Notice) {
        self.push_notice(notice);
        self.refresh();
    }

    fn push_notice(&mut self, notice: Notice) {
        self.notices.push_back(notice);
        while self.notices.len() > NOTICES_KEEP_LAST {
            self.notices.pop_front();
        }
    }

    fn refresh(&mut self) {
        self.view = Arc::new(DashboardView {
            packets: self.packets.to_series(),
            anomalies: self.anomalies.to_series(),
            packet_backups: self.packet_backups.clone(),
            anomaly_backups: self.anomaly_backups.clone(),
            system_info: self.system_info.clone(),
            system_summary: self.system_summary.clone(),
            blacklist: self.blacklist.clone(),
            whitelist: self.whitelist.clone(),
            connection: self.connection,
            loading: self.loading,
            notices: self.notices.iter().cloned().collect(),
        });
    }
}

fn dedup(entries: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(entries.len());
    for e in entries {
        if !out.contains(&e) {
            out.push(e);
        }
    }
    out
}

#[cfg(test)]
#[path = "../tests/dashboard/state_tests.rs"]
mod tests;
