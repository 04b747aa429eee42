//! Test doubles for the transport port.

use crate::domain::errors::PeerError;
use crate::domain::peer::PeerId;
use crate::ports::outbound::PeerNetwork;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{Message, Request, Response};

type Responder = Box<dyn Fn(&PeerId, Request) -> Result<Response, PeerError> + Send + Sync>;

/// Records every message and drop, answers requests through a closure.
pub struct RecordingNetwork {
    sent: Mutex<Vec<(PeerId, Message)>>,
    dropped: Mutex<Vec<PeerId>>,
    requests: Mutex<Vec<(PeerId, Request)>>,
    responder: Responder,
}

impl Default for RecordingNetwork {
    fn default() -> Self {
        Self::with_responder(|peer, _| Err(PeerError::Disconnected(peer.clone())))
    }
}

impl RecordingNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests with `responder`.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&PeerId, Request) -> Result<Response, PeerError> + Send + Sync + 'static,
    {
        Self {
            sent: Mutex::new(Vec::new()),
            dropped: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        }
    }

    /// Messages sent so far.
    pub fn sent(&self) -> Vec<(PeerId, Message)> {
        self.sent.lock().clone()
    }

    /// Drain messages sent so far.
    pub fn take_sent(&self) -> Vec<(PeerId, Message)> {
        std::mem::take(&mut *self.sent.lock())
    }

    pub fn dropped(&self) -> Vec<PeerId> {
        self.dropped.lock().clone()
    }

    pub fn requests(&self) -> Vec<(PeerId, Request)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl PeerNetwork for RecordingNetwork {
    async fn send(&self, peer: &PeerId, message: Message) -> Result<(), PeerError> {
        self.sent.lock().push((peer.clone(), message));
        Ok(())
    }

    async fn request(&self, peer: &PeerId, request: Request) -> Result<Response, PeerError> {
        self.requests.lock().push((peer.clone(), request.clone()));
        (self.responder)(peer, request)
    }

    async fn drop_peer(&self, peer: &PeerId) {
        self.dropped.lock().push(peer.clone());
    }
}
