//! Delivery of room events to member connections.
//!
//! The fan-out owns one outbound sender per session and carries out the
//! [`Dispatch`] directives a room produces, in order. Sends never wait:
//! a full queue drops the event for that member only, so one slow
//! connection cannot hold up its room.

use std::collections::HashMap;
use std::sync::Arc;

use retro_core::{Dispatch, ServerEvent, SessionId};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::types::OutboundTx;

/// Outbound channels of one room's sessions.
#[derive(Debug)]
pub struct Fanout {
    room_id: String,
    sessions: HashMap<SessionId, OutboundTx>,
    dropped: u64,
}

impl Fanout {
    pub fn new(room_id: impl Into<String>) -> Self {
        Fanout {
            room_id: room_id.into(),
            sessions: HashMap::new(),
            dropped: 0,
        }
    }

    /// Register (or re-register) a session's outbound channel.
    pub fn attach(&mut self, session: SessionId, outbound: OutboundTx) {
        self.sessions.insert(session, outbound);
    }

    /// Drop a session's channel. Its connection sees the queue close once
    /// everything already queued has been read.
    pub fn detach(&mut self, session: SessionId) -> bool {
        self.sessions.remove(&session).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of events dropped on full queues so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Carry out directives in order.
    pub fn dispatch_all(&mut self, dispatches: Vec<Dispatch>) {
        for dispatch in dispatches {
            self.dispatch(dispatch);
        }
    }

    pub fn dispatch(&mut self, dispatch: Dispatch) {
        match dispatch {
            Dispatch::Unicast(session, event) => {
                self.deliver(session, Arc::new(event));
            }
            Dispatch::Broadcast(event) => {
                let event = Arc::new(event);
                let sessions: Vec<SessionId> = self.sessions.keys().copied().collect();
                for session in sessions {
                    self.deliver(session, Arc::clone(&event));
                }
            }
            Dispatch::Disconnect(session) => {
                if self.detach(session) {
                    debug!(room = %self.room_id, %session, "session detached");
                }
            }
        }
    }

    fn deliver(&mut self, session: SessionId, event: Arc<ServerEvent>) {
        let Some(tx) = self.sessions.get(&session) else {
            debug!(room = %self.room_id, %session, event = event.kind(), "no channel for session");
            return;
        };

        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                self.dropped += 1;
                warn!(
                    room = %self.room_id,
                    %session,
                    event = event.kind(),
                    dropped = self.dropped,
                    "outbound queue full, event dropped"
                );
            }
            Err(TrySendError::Closed(event)) => {
                debug!(room = %self.room_id, %session, event = event.kind(), "outbound queue closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OutboundRx;
    use tokio::sync::mpsc;

    fn channel(capacity: usize) -> (OutboundTx, OutboundRx) {
        mpsc::channel(capacity)
    }

    #[tokio::test]
    async fn broadcast_reaches_every_session() {
        let mut fanout = Fanout::new("r1");
        let (tx_a, mut rx_a) = channel(4);
        let (tx_b, mut rx_b) = channel(4);
        fanout.attach(SessionId(1), tx_a);
        fanout.attach(SessionId(2), tx_b);

        fanout.dispatch(Dispatch::Broadcast(ServerEvent::VisibilityChanged { hidden: true }));

        let a = rx_a.recv().await.unwrap();
        let b = rx_b.recv().await.unwrap();
        assert_eq!(*a, ServerEvent::VisibilityChanged { hidden: true });
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn unicast_only_reaches_its_target() {
        let mut fanout = Fanout::new("r1");
        let (tx_a, mut rx_a) = channel(4);
        let (tx_b, mut rx_b) = channel(4);
        fanout.attach(SessionId(1), tx_a);
        fanout.attach(SessionId(2), tx_b);

        fanout.dispatch(Dispatch::Unicast(SessionId(2), ServerEvent::SessionReplaced));

        assert_eq!(*rx_b.recv().await.unwrap(), ServerEvent::SessionReplaced);
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_queue_drops_for_that_member_only() {
        let mut fanout = Fanout::new("r1");
        let (slow_tx, mut slow_rx) = channel(1);
        let (fast_tx, mut fast_rx) = channel(8);
        fanout.attach(SessionId(1), slow_tx);
        fanout.attach(SessionId(2), fast_tx);

        for hidden in [true, false, true] {
            fanout.dispatch(Dispatch::Broadcast(ServerEvent::VisibilityChanged { hidden }));
        }

        assert_eq!(fanout.dropped(), 2);
        assert_eq!(*slow_rx.recv().await.unwrap(), ServerEvent::VisibilityChanged { hidden: true });
        assert!(slow_rx.try_recv().is_err());

        let mut fast = Vec::new();
        while let Ok(event) = fast_rx.try_recv() {
            fast.push(event);
        }
        assert_eq!(fast.len(), 3);
    }

    #[tokio::test]
    async fn disconnect_closes_after_queued_events() {
        let mut fanout = Fanout::new("r1");
        let (tx, mut rx) = channel(4);
        fanout.attach(SessionId(7), tx);

        fanout.dispatch_all(vec![
            Dispatch::Unicast(SessionId(7), ServerEvent::SessionReplaced),
            Dispatch::Disconnect(SessionId(7)),
        ]);

        assert!(fanout.is_empty());
        assert_eq!(*rx.recv().await.unwrap(), ServerEvent::SessionReplaced);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn closed_receiver_does_not_disturb_others() {
        let mut fanout = Fanout::new("r1");
        let (gone_tx, gone_rx) = channel(4);
        let (tx, mut rx) = channel(4);
        drop(gone_rx);
        fanout.attach(SessionId(1), gone_tx);
        fanout.attach(SessionId(2), tx);

        fanout.dispatch(Dispatch::Broadcast(ServerEvent::OwnerChanged { new_owner: "b".into() }));

        assert_eq!(fanout.len(), 2);
        assert_eq!(fanout.dropped(), 0);
        assert!(rx.recv().await.is_some());
    }
}
