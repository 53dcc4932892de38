//! In-process transport, for driving a subscriber without a network peer.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use super::*;

#[derive(Default)]
struct Hub {
    // Sender of the open stream, tagged with that stream's number.
    sender: Mutex<Option<(u64, mpsc::Sender<RawEvent>)>>,
    streams: AtomicU64,
    connects: AtomicUsize,
    refuse: Mutex<bool>,
}

impl Hub {
    fn sender(&self) -> MutexGuard<'_, Option<(u64, mpsc::Sender<RawEvent>)>> {
        self.sender.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Drops the sender of stream `n`, ending it. Later streams are untouched.
    fn hang_up(&self, n: u64) {
        let mut sender = self.sender();
        if sender.as_ref().is_some_and(|(open, _)| *open == n) {
            sender.take();
        }
    }
}

pub struct MemoryTransport {
    hub: Arc<Hub>,
}

/// Producer side of a [`MemoryTransport`].
#[derive(Clone)]
pub struct MemoryFeed {
    hub: Arc<Hub>,
}

impl MemoryTransport {
    pub fn new() -> (Self, MemoryFeed) {
        let hub = Arc::new(Hub::default());
        (Self { hub: hub.clone() }, MemoryFeed { hub })
    }
}

impl FeedTransport for MemoryTransport {
    fn connect(&self) -> Result<Box<dyn FeedStream>, RequestError> {
        if *self.hub.refuse.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(RequestError::Transport {
                what: "open live feed".to_string(),
                message: "connection refused".to_string(),
            });
        }
        let (tx, rx) = mpsc::channel();
        let n = self.hub.streams.fetch_add(1, Ordering::SeqCst);
        *self.hub.sender() = Some((n, tx));
        self.hub.connects.fetch_add(1, Ordering::SeqCst);
        let hub = self.hub.clone();
        Ok(Box::new(MemoryStream {
            rx,
            closer: Arc::new(move || hub.hang_up(n)),
        }))
    }
}

struct MemoryStream {
    rx: mpsc::Receiver<RawEvent>,
    closer: StreamCloser,
}

impl FeedStream for MemoryStream {
    fn next_event(&mut self) -> io::Result<Option<RawEvent>> {
        Ok(self.rx.recv().ok())
    }

    fn closer(&self) -> Option<StreamCloser> {
        Some(self.closer.clone())
    }
}

impl MemoryFeed {
    /// Delivers an event to the current stream. Returns false when no stream is open.
    pub fn emit(&self, event: RawEvent) -> bool {
        match self.hub.sender().as_ref() {
            Some((_, tx)) => tx.send(event).is_ok(),
            None => false,
        }
    }

    pub fn emit_sample(&self, channel: Channel, sample: &Sample) -> bool {
        let data = serde_json::to_string(sample).unwrap_or_default();
        self.emit(RawEvent::new(channel.as_str(), data))
    }

    /// Ends the current stream, as if the peer hung up.
    pub fn disconnect(&self) {
        self.hub.sender().take();
    }

    /// While set, new connection attempts fail.
    pub fn refuse_connections(&self, refuse: bool) {
        *self.hub.refuse.lock().unwrap_or_else(|e| e.into_inner()) = refuse;
    }

    /// True while a subscriber holds an open stream.
    pub fn is_open(&self) -> bool {
        self.hub.sender().is_some()
    }

    pub fn connects(&self) -> usize {
        self.hub.connects.load(Ordering::SeqCst)
    }

    /// Waits until at least `n` connections have been opened.
    pub fn wait_for_connects(&self, n: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.connects() < n {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        true
    }
}
