//! Server-Sent Events transport for the live feed.

use std::io::{self, BufRead, BufReader, Read};

use tokio::runtime::Runtime;
use tokio::sync::watch;

use super::*;

pub struct SseTransport {
    url: String,
    client: reqwest::Client,
}

impl SseTransport {
    /// Streams from `{feed_url}/events`.
    pub fn new(feed_url: &str) -> Result<Self, RequestError> {
        // No overall timeout: the response body is the stream itself. Each
        // connection runs on its own runtime, so nothing is pooled across them.
        let client = reqwest::Client::builder()
            .user_agent("wires")
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|err| RequestError::Transport {
                what: "build feed client".to_string(),
                message: err.to_string(),
            })?;
        Ok(Self {
            url: format!("{}/events", feed_url.trim_end_matches('/')),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl FeedTransport for SseTransport {
    fn connect(&self) -> Result<Box<dyn FeedStream>, RequestError> {
        let what = "open live feed";
        let transport = |message: String| RequestError::Transport {
            what: what.to_string(),
            message,
        };
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| transport(err.to_string()))?;
        let resp = rt
            .block_on(
                self.client
                    .get(&self.url)
                    .header(reqwest::header::ACCEPT, "text/event-stream")
                    .send(),
            )
            .map_err(|err| transport(err.to_string()))?;
        if !resp.status().is_success() {
            return Err(RequestError::Status {
                what: what.to_string(),
                status: resp.status().as_u16(),
                message: None,
            });
        }

        let (cancel, cancelled) = watch::channel(false);
        let body = ResponseBody {
            resp,
            cancelled,
            chunk: Vec::new(),
            pos: 0,
            rt,
        };
        let closer: StreamCloser = Arc::new(move || {
            let _ = cancel.send(true);
        });
        Ok(Box::new(SseStream::with_closer(BufReader::new(body), closer)))
    }
}

/// Blocking reader over a streaming response body. Reads end with EOF once
/// the paired closer fires.
struct ResponseBody {
    resp: reqwest::Response,
    cancelled: watch::Receiver<bool>,
    chunk: Vec<u8>,
    pos: usize,
    // Declared last so the response is dropped while its runtime is still up.
    rt: Runtime,
}

impl Read for ResponseBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos == self.chunk.len() {
            let resp = &mut self.resp;
            let cancelled = &mut self.cancelled;
            let next = self.rt.block_on(async move {
                tokio::select! {
                    chunk = resp.chunk() => Some(chunk),
                    Ok(_) = cancelled.wait_for(|closed| *closed) => None,
                }
            });
            match next {
                None => return Ok(0),
                Some(Ok(None)) => return Ok(0),
                Some(Ok(Some(bytes))) => {
                    self.chunk.clear();
                    self.chunk.extend_from_slice(&bytes);
                    self.pos = 0;
                }
                Some(Err(err)) => return Err(io::Error::other(err)),
            }
        }
        let n = buf.len().min(self.chunk.len() - self.pos);
        buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Parses `event:`/`data:` framed events from a line reader.
pub struct SseStream<R> {
    reader: R,
    line: Vec<u8>,
    closer: Option<StreamCloser>,
}

impl<R: BufRead> SseStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            closer: None,
        }
    }

    /// A stream whose blocked reads end when `closer` fires.
    pub fn with_closer(reader: R, closer: StreamCloser) -> Self {
        Self {
            closer: Some(closer),
            ..Self::new(reader)
        }
    }
}

impl<R: BufRead + Send> FeedStream for SseStream<R> {
    fn next_event(&mut self) -> io::Result<Option<RawEvent>> {
        let mut name: Option<String> = None;
        let mut data = String::new();
        let mut has_data = false;
        loop {
            self.line.clear();
            if self.reader.read_until(b'\n', &mut self.line)? == 0 {
                // A trailing event without its blank line is incomplete; drop it.
                return Ok(None);
            }
            // Undecodable bytes become U+FFFD rather than failing the stream.
            let text = String::from_utf8_lossy(&self.line);
            let line = text.trim_end_matches(['\r', '\n']);

            if line.is_empty() {
                if has_data {
                    let name = name.take().unwrap_or_else(|| "message".to_string());
                    return Ok(Some(RawEvent { name, data }));
                }
                name = None;
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => name = Some(value.to_string()),
                "data" => {
                    if has_data {
                        data.push('\n');
                    }
                    data.push_str(value);
                    has_data = true;
                }
                _ => {}
            }
        }
    }

    fn closer(&self) -> Option<StreamCloser> {
        self.closer.clone()
    }
}

#[cfg(test)]
#[path = "../tests/feed/sse_tests.rs"]
mod tests;
