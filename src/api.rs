//! Blocking HTTP client for the dashboard backend's REST surface.

use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::RequestError;

mod http_client;

mod types;
pub use self::types::*;

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RequestError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("wires")
            .timeout(timeout)
            .build()
            .map_err(|err| RequestError::Transport {
                what: "build http client".to_string(),
                message: err.to_string(),
            })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn get_json<T: DeserializeOwned>(
        &self,
        what: &str,
        path: &str,
    ) -> Result<T, RequestError> {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .map_err(|err| transport(what, err))?;
        let resp = self.ensure_ok(resp, what)?;
        resp.json::<T>().map_err(|err| RequestError::Decode {
            what: what.to_string(),
            message: err.to_string(),
        })
    }

    /// Sends a command and returns the parsed status body. Servers that answer
    /// with an empty or non-JSON body still count as acknowledged when the
    /// status code is 2xx.
    pub(crate) fn send_command<B: Serialize + ?Sized>(
        &self,
        what: &str,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<StatusBody, RequestError> {
        let mut req = self.client.request(method, self.url(path));
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().map_err(|err| transport(what, err))?;
        let resp = self.ensure_ok(resp, what)?;
        let text = resp.text().unwrap_or_default();
        Ok(serde_json::from_str(&text).unwrap_or_default())
    }
}

fn transport(what: &str, err: reqwest::Error) -> RequestError {
    RequestError::Transport {
        what: what.to_string(),
        message: err.to_string(),
    }
}
