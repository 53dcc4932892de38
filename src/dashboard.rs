//! The mounted dashboard: owns the state, the live connection, and the queue
//! every background worker reports into.
//!
//! Nothing here blocks on the network. `reload` and user commands hand their
//! work to short-lived threads; the live feed has its own reader thread. All of
//! them send [`Update`]s, and only [`Dashboard::pump`] applies them, on the
//! thread that owns the dashboard.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::access::{AccessListController, ListEdit, validate_ipv4};
use crate::api::ApiClient;
use crate::config::WiresConfig;
use crate::control::{ControlAck, DeviceCommand, DeviceControlProxy};
use crate::error::{ControlError, FeedError, MountError, MutationError, ValidationError};
use crate::feed::{Backoff, Connection, ConnectionState, FeedTransport, LiveFeedSubscriber, SseTransport};
use crate::model::{AccessList, BackupKind, Channel, Notice, Sample};
use crate::snapshot::{SnapshotLoader, SnapshotPart};

mod state;
pub use self::state::DashboardState;

mod view;
pub use self::view::DashboardView;

/// Result of background work, waiting to be applied by [`Dashboard::pump`].
#[derive(Debug)]
pub enum Update {
    Part {
        generation: u64,
        part: SnapshotPart,
    },
    LoadFinished {
        generation: u64,
    },
    Feed {
        subscription: u64,
        channel: Channel,
        sample: Sample,
    },
    Connection {
        subscription: u64,
        state: ConnectionState,
    },
    ListEdited {
        list: AccessList,
        edit: ListEdit,
        ip: String,
        result: Result<(), MutationError>,
    },
    Command {
        command: DeviceCommand,
        result: Result<ControlAck, ControlError>,
    },
}

pub struct Dashboard {
    state: DashboardState,
    tx: Sender<Update>,
    rx: Receiver<Update>,
    loader: SnapshotLoader,
    access: AccessListController,
    control: DeviceControlProxy,
    subscriber: LiveFeedSubscriber,
    connection: Option<Connection>,
    // Bumped per subscription; feed updates from older ones are dropped.
    subscription: u64,
}

impl Dashboard {
    /// Mounts against the backend named in `config`, using server-sent events
    /// at `{feed_url}/events` for the live feed.
    pub fn connect(config: &WiresConfig) -> Result<Self, MountError> {
        let transport = SseTransport::new(&config.feed_url)?;
        Self::mount(config, Arc::new(transport))
    }

    pub fn mount(config: &WiresConfig, transport: Arc<dyn FeedTransport>) -> Result<Self, MountError> {
        Self::mount_with(config, transport, Backoff::default())
    }

    /// Creates the state, starts the snapshot load, and opens the live feed.
    pub fn mount_with(
        config: &WiresConfig,
        transport: Arc<dyn FeedTransport>,
        backoff: Backoff,
    ) -> Result<Self, MountError> {
        let api = ApiClient::new(&config.base_url, config.request_timeout())?;
        let (tx, rx) = mpsc::channel();
        let mut dashboard = Self {
            state: DashboardState::new(
                config.window_capacity,
                config.blacklist.clone(),
                config.whitelist.clone(),
            ),
            tx,
            rx,
            loader: SnapshotLoader::new(api.clone()),
            access: AccessListController::new(api.clone()),
            control: DeviceControlProxy::new(api),
            subscriber: LiveFeedSubscriber::new(transport).with_backoff(backoff),
            connection: None,
            subscription: 0,
        };

        dashboard.reload();
        dashboard.open_feed()?;
        info!(base_url = %config.base_url, feed_url = %config.feed_url, "dashboard mounted");
        Ok(dashboard)
    }

    fn open_feed(&mut self) -> Result<(), FeedError> {
        self.subscription += 1;
        let subscription = self.subscription;
        let samples = self.tx.clone();
        let status = self.tx.clone();
        let conn = self.subscriber.subscribe_with_status(
            move |channel, sample| {
                let _ = samples.send(Update::Feed {
                    subscription,
                    channel,
                    sample,
                });
            },
            move |state| {
                let _ = status.send(Update::Connection {
                    subscription,
                    state,
                });
            },
        )?;
        self.connection = Some(conn);
        Ok(())
    }

    pub fn view(&self) -> Arc<DashboardView> {
        self.state.view()
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Resets both windows on arrival of the new backfill and refetches every
    /// snapshot part. Parts still in flight from an earlier load are ignored.
    pub fn reload(&mut self) {
        let generation = self.state.begin_load();
        let loader = self.loader.clone();
        let tx = self.tx.clone();
        let spawned = thread::Builder::new()
            .name(format!("wires-load-{}", generation))
            .spawn(move || {
                loader.load_each(|part| {
                    let _ = tx.send(Update::Part { generation, part });
                });
                let _ = tx.send(Update::LoadFinished { generation });
            });
        if let Err(err) = spawned {
            warn!(error = %err, "failed to start snapshot load");
            self.state.finish_load(generation);
            self.state
                .notify(Notice::error(format!("failed to start snapshot load: {}", err)));
        } else {
            debug!(generation, "snapshot load started");
        }
    }

    /// Validates `ip` and sends the edit in the background. A malformed address
    /// is reported right away and never reaches the network.
    pub fn add_to_list(&mut self, list: AccessList, ip: &str) -> Result<(), ValidationError> {
        self.edit_list(list, ListEdit::Add, ip)
    }

    pub fn remove_from_list(&mut self, list: AccessList, ip: &str) -> Result<(), ValidationError> {
        self.edit_list(list, ListEdit::Remove, ip)
    }

    fn edit_list(&mut self, list: AccessList, edit: ListEdit, ip: &str) -> Result<(), ValidationError> {
        let ip = match validate_ipv4(ip) {
            Ok(ip) => ip.to_string(),
            Err(err) => {
                self.state
                    .apply_list_edit(list, edit, ip, Err(err.clone().into()));
                return Err(err);
            }
        };
        let access = self.access.clone();
        let tx = self.tx.clone();
        self.spawn_worker("wires-access", move || {
            let result = access.edit(list, edit, &ip);
            let _ = tx.send(Update::ListEdited {
                list,
                edit,
                ip,
                result,
            });
        });
        Ok(())
    }

    pub fn reboot(&mut self) {
        self.run_command(DeviceCommand::Reboot);
    }

    pub fn shutdown(&mut self) {
        self.run_command(DeviceCommand::Shutdown);
    }

    pub fn save_backup(&mut self, kind: BackupKind) {
        self.run_command(DeviceCommand::SaveBackup(kind));
    }

    pub fn clear_data(&mut self) {
        self.run_command(DeviceCommand::ClearData);
    }

    pub fn run_command(&mut self, command: DeviceCommand) {
        let control = self.control.clone();
        let tx = self.tx.clone();
        self.spawn_worker("wires-control", move || {
            let result = control.send(command);
            let _ = tx.send(Update::Command { command, result });
        });
    }

    fn spawn_worker<F>(&mut self, name: &str, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Err(err) = thread::Builder::new().name(name.to_string()).spawn(work) {
            warn!(worker = name, error = %err, "failed to start worker");
            self.state
                .notify(Notice::error(format!("failed to start {}: {}", name, err)));
        }
    }

    /// Applies every queued update without blocking. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(update) = self.rx.try_recv() {
            self.apply(update);
            applied += 1;
        }
        applied
    }

    /// Applies updates as they arrive until `done` holds for the view or the
    /// timeout elapses. Returns whether `done` was reached.
    pub fn pump_until<P>(&mut self, timeout: Duration, done: P) -> bool
    where
        P: Fn(&DashboardView) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if done(&self.state.view()) {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.rx.recv_timeout(remaining) {
                Ok(update) => self.apply(update),
                Err(RecvTimeoutError::Timeout) => return done(&self.state.view()),
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
    }

    fn apply(&mut self, update: Update) {
        match update {
            Update::Part { generation, part } => self.state.apply_part(generation, part),
            Update::LoadFinished { generation } => self.state.finish_load(generation),
            Update::Feed {
                subscription,
                channel,
                sample,
            } => {
                if self.is_current(subscription) {
                    self.state.push_live(channel, sample);
                }
            }
            Update::Connection {
                subscription,
                state,
            } => {
                if self.is_current(subscription) {
                    self.state.set_connection(state);
                }
            }
            Update::ListEdited {
                list,
                edit,
                ip,
                result,
            } => self.state.apply_list_edit(list, edit, &ip, result),
            Update::Command { command, result } => self.state.apply_command(command, result),
        }
    }

    fn is_current(&self, subscription: u64) -> bool {
        subscription == self.subscription && self.connection.is_some()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection
            .as_ref()
            .map_or(ConnectionState::Disconnected, Connection::state)
    }

    /// Closes the live feed and drops the update queue. Workers still running
    /// finish their request; their outcome is discarded.
    pub fn unmount(mut self) {
        self.close_feed();
        info!("dashboard unmounted");
    }

    fn close_feed(&mut self) {
        if let Some(conn) = self.connection.take() {
            self.subscriber.unsubscribe(conn);
            self.state.set_connection(ConnectionState::Disconnected);
        }
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.close_feed();
    }
}

#[cfg(test)]
#[path = "tests/dashboard_tests.rs"]
mod tests;
