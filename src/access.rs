//! Blacklist/whitelist edits against the device's access-control lists.

use reqwest::Method;
use tracing::{info, warn};

use crate::api::{ApiClient, IpRequest};
use crate::error::{MutationError, ValidationError};
use crate::model::AccessList;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListEdit {
    Add,
    Remove,
}

impl ListEdit {
    pub fn as_str(self) -> &'static str {
        match self {
            ListEdit::Add => "add",
            ListEdit::Remove => "remove",
        }
    }
}

#[derive(Clone)]
pub struct AccessListController {
    api: ApiClient,
}

impl AccessListController {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn add(&self, list: AccessList, ip: &str) -> Result<(), MutationError> {
        self.edit(list, ListEdit::Add, ip)
    }

    pub fn remove(&self, list: AccessList, ip: &str) -> Result<(), MutationError> {
        self.edit(list, ListEdit::Remove, ip)
    }

    /// Validates `ip` and sends one request. Nothing local changes here; the
    /// caller decides what to do with the acknowledgement.
    pub fn edit(&self, list: AccessList, edit: ListEdit, ip: &str) -> Result<(), MutationError> {
        let ip = validate_ipv4(ip)?;
        let method = match edit {
            ListEdit::Add => Method::POST,
            ListEdit::Remove => Method::DELETE,
        };
        let what = format!("{} {} {}", edit.as_str(), ip, list);
        let path = format!("/{}_edit", list);

        self.api
            .send_command(&what, method, &path, Some(&IpRequest { ip }))
            .inspect_err(|err| warn!(%list, ip, error = %err, "access list edit failed"))?;
        info!(%list, ip, edit = edit.as_str(), "access list edit acknowledged");
        Ok(())
    }
}

/// Accepts dotted-quad IPv4 (four decimal octets, 0-255 each) after trimming
/// surrounding whitespace, and returns the trimmed form.
pub fn validate_ipv4(ip: &str) -> Result<&str, ValidationError> {
    let trimmed = ip.trim();
    let mut octets = 0;
    for part in trimmed.split('.') {
        octets += 1;
        let valid = !part.is_empty()
            && part.len() <= 3
            && part.bytes().all(|b| b.is_ascii_digit())
            && part.parse::<u16>().is_ok_and(|n| n <= 255);
        if !valid {
            return Err(ValidationError::MalformedIp(ip.to_string()));
        }
    }
    if octets != 4 {
        return Err(ValidationError::MalformedIp(ip.to_string()));
    }
    Ok(trimmed)
}

#[cfg(test)]
#[path = "tests/access_tests.rs"]
mod tests;
