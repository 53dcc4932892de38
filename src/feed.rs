//! Live push feed: one long-lived subscription delivering channel-tagged samples.
//!
//! The subscriber owns a reader thread per [`Connection`]. The thread connects
//! through a [`FeedTransport`], decodes each event, and invokes the caller's
//! callback. Closing a connection takes the same gate the reader holds while
//! invoking the callback, so once `unsubscribe` returns no callback is running
//! and none will run again, even if the transport keeps emitting. Closing also
//! fires the open stream's [`StreamCloser`], which unblocks the reader so it
//! drops the stream and exits without waiting for another event.

use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{FeedError, RequestError};
use crate::model::{Channel, Sample, Timestamp};

mod backoff;
pub use self::backoff::Backoff;

mod memory;
pub use self::memory::{MemoryFeed, MemoryTransport};

mod sse;
pub use self::sse::{SseStream, SseTransport};

/// One framed event as delivered by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawEvent {
    pub name: String,
    pub data: String,
}

impl RawEvent {
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// Makes a blocked [`FeedStream::next_event`] return `Ok(None)`.
pub type StreamCloser = Arc<dyn Fn() + Send + Sync>;

pub trait FeedStream: Send {
    /// Blocks for the next event. `Ok(None)` means the stream ended, either
    /// because the peer closed it or because its closer fired.
    fn next_event(&mut self) -> io::Result<Option<RawEvent>>;

    /// Handle the subscriber fires when the connection is closed while this
    /// stream is open. Streams that end on their own may return `None`.
    fn closer(&self) -> Option<StreamCloser> {
        None
    }
}

pub trait FeedTransport: Send + Sync + 'static {
    fn connect(&self) -> Result<Box<dyn FeedStream>, RequestError>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        }
    }
}

// Upper bound on how long `unsubscribe` waits for the reader to drop its stream.
const RELEASE_WAIT: Duration = Duration::from_secs(2);

struct Shared {
    // true once closed; held by the reader while it calls back.
    gate: Mutex<bool>,
    state: Mutex<ConnectionState>,
    // Closer of the stream currently open, if any. Registered under `gate`.
    closer: Mutex<Option<StreamCloser>>,
    // Set by the reader thread once it has exited.
    finished: Mutex<bool>,
    finished_cv: Condvar,
}

impl Shared {
    fn new() -> Self {
        Self {
            gate: Mutex::new(false),
            state: Mutex::new(ConnectionState::Disconnected),
            closer: Mutex::new(None),
            finished: Mutex::new(false),
            finished_cv: Condvar::new(),
        }
    }

    fn gate(&self) -> MutexGuard<'_, bool> {
        self.gate.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn closer(&self) -> MutexGuard<'_, Option<StreamCloser>> {
        self.closer.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn mark_finished(&self) {
        *self.finished.lock().unwrap_or_else(|e| e.into_inner()) = true;
        self.finished_cv.notify_all();
    }

    /// Waits for the reader to exit. Returns false on timeout.
    fn wait_finished(&self, timeout: Duration) -> bool {
        let finished = self.finished.lock().unwrap_or_else(|e| e.into_inner());
        let (finished, _) = self
            .finished_cv
            .wait_timeout_while(finished, timeout, |done| !*done)
            .unwrap_or_else(|e| e.into_inner());
        *finished
    }

    fn is_closed(&self) -> bool {
        *self.gate()
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Handle to a live subscription. Dropping it closes the subscription.
pub struct Connection {
    id: u64,
    shared: Arc<Shared>,
}

impl Connection {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Closes the connection and releases its stream. Returns once the reader
    /// thread has dropped the stream, or after [`RELEASE_WAIT`].
    fn close(&self) {
        let closer = {
            let mut closed = self.shared.gate();
            if *closed {
                return;
            }
            *closed = true;
            self.shared.set_state(ConnectionState::Disconnected);
            self.shared.closer().take()
        };
        if let Some(closer) = closer {
            closer();
        }
        if self.shared.wait_finished(RELEASE_WAIT) {
            debug!(connection = self.id, "feed connection closed");
        } else {
            warn!(connection = self.id, "feed reader did not exit after close");
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("closed", &self.is_closed())
            .finish()
    }
}

pub struct LiveFeedSubscriber {
    transport: Arc<dyn FeedTransport>,
    backoff: Backoff,
    active: Option<Arc<Shared>>,
    next_id: u64,
}

impl LiveFeedSubscriber {
    pub fn new(transport: Arc<dyn FeedTransport>) -> Self {
        Self {
            transport,
            backoff: Backoff::default(),
            active: None,
            next_id: 1,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn is_active(&self) -> bool {
        self.active.as_ref().is_some_and(|s| !s.is_closed())
    }

    pub fn subscribe<F>(&mut self, on_sample: F) -> Result<Connection, FeedError>
    where
        F: FnMut(Channel, Sample) + Send + 'static,
    {
        self.subscribe_with_status(on_sample, |_| {})
    }

    /// Like [`subscribe`](Self::subscribe), additionally reporting every
    /// lifecycle transition of the connection.
    pub fn subscribe_with_status<F, S>(
        &mut self,
        on_sample: F,
        on_status: S,
    ) -> Result<Connection, FeedError>
    where
        F: FnMut(Channel, Sample) + Send + 'static,
        S: FnMut(ConnectionState) + Send + 'static,
    {
        if self.is_active() {
            return Err(FeedError::AlreadySubscribed);
        }

        let id = self.next_id;
        self.next_id += 1;
        let shared = Arc::new(Shared::new());

        let reader = Reader {
            id,
            shared: shared.clone(),
            transport: self.transport.clone(),
            backoff: self.backoff,
            on_sample,
            on_status,
        };
        thread::Builder::new()
            .name(format!("wires-feed-{}", id))
            .spawn(move || reader.run())
            .map_err(|err| FeedError::Spawn(err.to_string()))?;

        self.active = Some(shared.clone());
        Ok(Connection { id, shared })
    }

    pub fn unsubscribe(&mut self, conn: Connection) {
        conn.close();
        if self
            .active
            .as_ref()
            .is_some_and(|s| Arc::ptr_eq(s, &conn.shared))
        {
            self.active = None;
        }
    }
}

// Marks the reader as exited, including when a callback panics.
struct Finished(Arc<Shared>);

impl Drop for Finished {
    fn drop(&mut self) {
        self.0.mark_finished();
    }
}

struct Reader<F, S> {
    id: u64,
    shared: Arc<Shared>,
    transport: Arc<dyn FeedTransport>,
    backoff: Backoff,
    on_sample: F,
    on_status: S,
}

impl<F, S> Reader<F, S>
where
    F: FnMut(Channel, Sample),
    S: FnMut(ConnectionState),
{
    fn run(mut self) {
        let _finished = Finished(self.shared.clone());
        self.run_until_closed();
    }

    fn run_until_closed(&mut self) {
        let mut attempt: u32 = 0;
        loop {
            if !self.transition(ConnectionState::Connecting) {
                return;
            }
            match self.transport.connect() {
                Ok(mut stream) => {
                    attempt = 0;
                    if !self.attach(stream.closer()) {
                        return;
                    }
                    if !self.transition(ConnectionState::Connected) {
                        return;
                    }
                    info!(connection = self.id, "live feed connected");
                    let open = self.pump(stream.as_mut());
                    self.shared.closer().take();
                    if !open {
                        return;
                    }
                }
                Err(err) => {
                    warn!(connection = self.id, error = %err, "live feed connect failed");
                }
            }

            if !self.transition(ConnectionState::Disconnected) {
                return;
            }
            let delay = self.backoff.delay(attempt);
            attempt = attempt.saturating_add(1);
            debug!(connection = self.id, ?delay, "reconnecting live feed");
            if !self.backoff.sleep_unless(delay, || self.shared.is_closed()) {
                return;
            }
        }
    }

    /// Reads events until the stream ends. Returns false once the connection
    /// has been closed by its owner.
    fn pump(&mut self, stream: &mut dyn FeedStream) -> bool {
        loop {
            let event = match stream.next_event() {
                Ok(Some(event)) => event,
                Ok(None) => {
                    info!(connection = self.id, "live feed closed by peer");
                    return !self.shared.is_closed();
                }
                Err(err) => {
                    warn!(connection = self.id, error = %err, "live feed read failed");
                    return !self.shared.is_closed();
                }
            };

            let decoded = decode_event(&event);
            let closed = self.shared.gate();
            if *closed {
                return false;
            }
            match decoded {
                Ok((channel, sample)) => {
                    debug!(connection = self.id, %channel, value = sample.value, "feed sample");
                    (self.on_sample)(channel, sample);
                }
                Err(reason) => {
                    warn!(connection = self.id, event = %event.name, %reason, "skipping feed event");
                }
            }
            drop(closed);
        }
    }

    /// Registers the closer of a freshly opened stream. Returns false when the
    /// connection was closed while connecting.
    fn attach(&self, closer: Option<StreamCloser>) -> bool {
        let closed = self.shared.gate();
        if *closed {
            return false;
        }
        *self.shared.closer() = closer;
        true
    }

    fn transition(&mut self, state: ConnectionState) -> bool {
        let closed = self.shared.gate();
        if *closed {
            return false;
        }
        self.shared.set_state(state);
        (self.on_status)(state);
        true
    }
}

#[derive(serde::Deserialize)]
struct TaggedSample {
    channel: String,
    timestamp: Timestamp,
    value: f64,
}

/// Decodes a feed event into its channel and sample.
///
/// Named events carry a bare `{timestamp, value}` payload. Unnamed (`message`)
/// events must say which channel they belong to in a `channel` field.
pub fn decode_event(event: &RawEvent) -> Result<(Channel, Sample), String> {
    if let Some(channel) = Channel::from_event_name(&event.name) {
        let sample: Sample = serde_json::from_str(&event.data)
            .map_err(|err| format!("bad {} payload: {}", channel, err))?;
        return Ok((channel, sample));
    }
    if event.name == "message" {
        let tagged: TaggedSample = serde_json::from_str(&event.data)
            .map_err(|err| format!("bad message payload: {}", err))?;
        let channel = Channel::from_event_name(&tagged.channel)
            .ok_or_else(|| format!("unknown channel {:?}", tagged.channel))?;
        return Ok((
            channel,
            Sample {
                timestamp: tagged.timestamp,
                value: tagged.value,
            },
        ));
    }
    Err(format!("unknown event {:?}", event.name))
}

#[cfg(test)]
#[path = "tests/feed_tests.rs"]
mod tests;
