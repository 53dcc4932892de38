use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::access::ListEdit;
use crate::config::WiresConfig;
use crate::control::DeviceCommand;
use crate::dashboard::{Dashboard, DashboardView};
use crate::model::{AccessList, BackupKind};

use super::input::Input;

pub(super) enum Modal {
    /// Prompt for an address to add to or remove from a list.
    ListEntry {
        list: AccessList,
        edit: ListEdit,
        input: Input,
    },
    /// Irreversible device command waiting for `y`.
    Confirm { command: DeviceCommand },
}

impl Modal {
    pub(super) fn title(&self) -> String {
        match self {
            Modal::ListEntry { list, edit, .. } => match edit {
                ListEdit::Add => format!("Add to {}", list),
                ListEdit::Remove => format!("Remove from {}", list),
            },
            Modal::Confirm { command } => format!("Confirm {}", command.describe()),
        }
    }
}

pub(super) struct App {
    dashboard: Dashboard,
    pub(super) view: Arc<DashboardView>,
    pub(super) modal: Option<Modal>,
    pub(super) base_url: String,
    pub(super) feed_url: String,
    pub(super) quit: bool,
}

impl App {
    pub(super) fn new(dashboard: Dashboard, config: &WiresConfig) -> Self {
        let view = dashboard.view();
        Self {
            dashboard,
            view,
            modal: None,
            base_url: config.base_url.clone(),
            feed_url: config.feed_url.clone(),
            quit: false,
        }
    }

    /// Applies whatever background work finished since the last tick.
    pub(super) fn tick(&mut self) {
        if self.dashboard.pump() > 0 {
            self.view = self.dashboard.view();
        }
    }

    pub(super) fn into_dashboard(self) -> Dashboard {
        self.dashboard
    }

    pub(super) fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit = true;
            return;
        }

        if self.modal.is_some() {
            self.handle_modal_key(key);
        } else {
            self.handle_root_key(key);
        }
        self.view = self.dashboard.view();
    }

    fn handle_root_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit = true,
            KeyCode::Char('r') => self.dashboard.reload(),
            KeyCode::Char('p') => self.dashboard.save_backup(BackupKind::Packet),
            KeyCode::Char('a') => self.dashboard.save_backup(BackupKind::Anomaly),
            KeyCode::Char('b') => self.open_list_entry(AccessList::Blacklist, ListEdit::Add),
            KeyCode::Char('B') => self.open_list_entry(AccessList::Blacklist, ListEdit::Remove),
            KeyCode::Char('w') => self.open_list_entry(AccessList::Whitelist, ListEdit::Add),
            KeyCode::Char('W') => self.open_list_entry(AccessList::Whitelist, ListEdit::Remove),
            KeyCode::Char('R') => self.confirm(DeviceCommand::Reboot),
            KeyCode::Char('S') => self.confirm(DeviceCommand::Shutdown),
            KeyCode::Char('C') => self.confirm(DeviceCommand::ClearData),
            _ => {}
        }
    }

    fn open_list_entry(&mut self, list: AccessList, edit: ListEdit) {
        self.modal = Some(Modal::ListEntry {
            list,
            edit,
            input: Input::default(),
        });
    }

    fn confirm(&mut self, command: DeviceCommand) {
        self.modal = Some(Modal::Confirm { command });
    }

    fn handle_modal_key(&mut self, key: KeyEvent) {
        let Some(modal) = self.modal.as_mut() else {
            return;
        };
        match modal {
            Modal::Confirm { command } => {
                let command = *command;
                self.modal = None;
                if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
                    self.dashboard.run_command(command);
                }
            }
            Modal::ListEntry { list, edit, input } => match key.code {
                KeyCode::Esc => self.modal = None,
                KeyCode::Enter => {
                    let (list, edit, ip) = (*list, *edit, input.take());
                    self.modal = None;
                    // Rejected addresses are already reported as a notice.
                    let _ = match edit {
                        ListEdit::Add => self.dashboard.add_to_list(list, &ip),
                        ListEdit::Remove => self.dashboard.remove_from_list(list, &ip),
                    };
                }
                KeyCode::Backspace => input.backspace(),
                KeyCode::Delete => input.delete(),
                KeyCode::Left => input.move_left(),
                KeyCode::Right => input.move_right(),
                KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => input.insert_char(c),
                _ => {}
            },
        }
    }
}

#[cfg(test)]
#[path = "../tests/tui/app_tests.rs"]
mod tests;
