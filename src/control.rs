//! One-shot device commands: power, backups, data reset.
//!
//! Commands are sent as soon as they are invoked. Reboot and shutdown cannot be
//! undone; callers wanting a confirmation step must ask before calling.

use reqwest::Method;
use tracing::{info, warn};

use crate::api::{ApiClient, StatusBody};
use crate::error::ControlError;
use crate::model::BackupKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceCommand {
    Reboot,
    Shutdown,
    SaveBackup(BackupKind),
    ClearData,
}

impl DeviceCommand {
    pub fn path(self) -> &'static str {
        match self {
            DeviceCommand::Reboot => "/reboot_sys",
            DeviceCommand::Shutdown => "/shutdown_sys",
            DeviceCommand::SaveBackup(BackupKind::Packet) => "/save_packet_backup",
            DeviceCommand::SaveBackup(BackupKind::Anomaly) => "/save_anomaly_backup",
            DeviceCommand::ClearData => "/api/clear_data",
        }
    }

    pub fn describe(self) -> String {
        match self {
            DeviceCommand::Reboot => "reboot".to_string(),
            DeviceCommand::Shutdown => "shutdown".to_string(),
            DeviceCommand::SaveBackup(kind) => format!("save {} backup", kind),
            DeviceCommand::ClearData => "clear data".to_string(),
        }
    }
}

/// What the device said when it accepted a command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControlAck {
    pub message: Option<String>,
    pub backup_file: Option<String>,
}

impl From<StatusBody> for ControlAck {
    fn from(body: StatusBody) -> Self {
        Self {
            message: body.message,
            backup_file: body.backup_file,
        }
    }
}

#[derive(Clone)]
pub struct DeviceControlProxy {
    api: ApiClient,
}

impl DeviceControlProxy {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn reboot(&self) -> Result<ControlAck, ControlError> {
        self.send(DeviceCommand::Reboot)
    }

    pub fn shutdown(&self) -> Result<ControlAck, ControlError> {
        self.send(DeviceCommand::Shutdown)
    }

    pub fn save_backup(&self, kind: BackupKind) -> Result<ControlAck, ControlError> {
        self.send(DeviceCommand::SaveBackup(kind))
    }

    pub fn clear_data(&self) -> Result<ControlAck, ControlError> {
        self.send(DeviceCommand::ClearData)
    }

    pub fn send(&self, command: DeviceCommand) -> Result<ControlAck, ControlError> {
        let what = command.describe();
        let body = self
            .api
            .send_command::<()>(&what, Method::POST, command.path(), None)
            .inspect_err(|err| warn!(command = %what, error = %err, "device command failed"))?;
        info!(command = %what, "device command acknowledged");
        Ok(body.into())
    }
}

#[cfg(test)]
#[path = "tests/control_tests.rs"]
mod tests;
