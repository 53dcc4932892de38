//! Wire shapes of the backend's requests and responses.

use crate::model::Sample;

/// Bulk sample listing. Older backends answer with a bare array; the paginated
/// ones wrap it under `packets` or `anomalies`.
#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
pub enum SamplesPayload {
    List(Vec<Sample>),
    Packets { packets: Vec<Sample> },
    Anomalies { anomalies: Vec<Sample> },
}

impl SamplesPayload {
    pub fn into_samples(self) -> Vec<Sample> {
        match self {
            SamplesPayload::List(v) => v,
            SamplesPayload::Packets { packets } => packets,
            SamplesPayload::Anomalies { anomalies } => anomalies,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
pub enum BackupsPayload {
    List(Vec<String>),
    Wrapped { backups: Vec<String> },
}

impl BackupsPayload {
    pub fn into_files(self) -> Vec<String> {
        match self {
            BackupsPayload::List(v) => v,
            BackupsPayload::Wrapped { backups } => backups,
        }
    }
}

/// Status-only response returned by every command endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StatusBody {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub backup_file: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub(crate) struct IpRequest<'a> {
    pub(crate) ip: &'a str,
}
