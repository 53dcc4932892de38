use super::*;

impl ApiClient {
    /// Turns a non-2xx response into [`RequestError::Status`], carrying the
    /// server's `message`/`error` text when the body has one.
    pub(super) fn ensure_ok(
        &self,
        resp: reqwest::blocking::Response,
        what: &str,
    ) -> Result<reqwest::blocking::Response, RequestError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let text = resp.text().unwrap_or_default();
        Err(RequestError::Status {
            what: what.to_string(),
            status: status.as_u16(),
            message: error_message(&text),
        })
    }

    pub(super) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub(super) fn error_message(body: &str) -> Option<String> {
    let parsed: StatusBody = serde_json::from_str(body).ok()?;
    parsed.message.or(parsed.error)
}

#[cfg(test)]
#[path = "../tests/api/http_client_tests.rs"]
mod tests;
