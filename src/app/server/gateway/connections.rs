use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::sync::{mpsc, Notify};

use super::protocol::ServerEvent;

pub type EventSender = mpsc::Sender<ServerEvent>;

struct Connection {
    /// Taken once the connection falls too far behind
    sender: Option<EventSender>,
    evicted: Arc<Notify>,
    /// Rooms this connection is a member of
    rooms: HashSet<String>,
}

/// Outbound channels of every live connection, and the rooms each one joined
///
/// Channels are inserted when a client connects and removed when it goes
/// away. Room membership here is only used to know which rooms to leave on
/// disconnect, who receives room broadcasts comes from the session itself.
///
/// Delivery never waits. A connection whose channel is full has stopped
/// reading, its channel is dropped and its `evicted` signal fires so the
/// transport can hang up and run the usual disconnect.
#[derive(Default)]
pub struct Connections {
    connections: Mutex<HashMap<String, Connection>>,
}

impl Connections {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Connection>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a channel, returning the signal raised if it is ever evicted
    pub fn insert_channel(&self, connection_id: &str, sender: EventSender) -> Arc<Notify> {
        let evicted = Arc::new(Notify::new());
        self.lock().insert(
            connection_id.to_string(),
            Connection {
                sender: Some(sender),
                evicted: Arc::clone(&evicted),
                rooms: HashSet::new(),
            },
        );
        evicted
    }

    /// Drop the channel of a connection, returning the rooms it was still in
    pub fn remove_channel(&self, connection_id: &str) -> Vec<String> {
        self.lock()
            .remove(connection_id)
            .map(|connection| connection.rooms.into_iter().collect())
            .unwrap_or_default()
    }

    pub fn join_group(&self, connection_id: &str, room_code: &str) {
        if let Some(connection) = self.lock().get_mut(connection_id) {
            connection.rooms.insert(room_code.to_string());
        }
    }

    pub fn leave_group(&self, connection_id: &str, room_code: &str) {
        if let Some(connection) = self.lock().get_mut(connection_id) {
            connection.rooms.remove(room_code);
        }
    }

    pub fn groups_of(&self, connection_id: &str) -> Vec<String> {
        self.lock()
            .get(connection_id)
            .map(|connection| connection.rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn connection_count(&self) -> usize {
        self.lock().len()
    }

    pub fn send_to(&self, connection_id: &str, event: ServerEvent) {
        let mut connections = self.lock();
        let Some(connection) = connections.get_mut(connection_id) else {
            tracing::debug!(connection_id, "no channel for connection, dropping event");
            return;
        };
        let Some(sender) = &connection.sender else {
            return;
        };

        match sender.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(connection_id, "connection is not reading, evicting it");
                connection.sender = None;
                connection.evicted.notify_one();
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(connection_id, "connection stream closed, dropping event");
            }
        }
    }

    pub fn send_to_many(&self, connection_ids: &[String], event: ServerEvent) {
        for connection_id in connection_ids {
            self.send_to(connection_id, event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn error(msg: &str) -> ServerEvent {
        ServerEvent::Error {
            msg: msg.to_string(),
        }
    }

    #[tokio::test]
    async fn events_reach_the_right_channel() {
        let connections = Connections::default();
        let (first_tx, mut first_rx) = mpsc::channel(4);
        let (second_tx, mut second_rx) = mpsc::channel(4);
        connections.insert_channel("conn_1", first_tx);
        connections.insert_channel("conn_2", second_tx);

        connections.send_to("conn_1", ServerEvent::LeftRoom { code: "A".to_string() });
        connections.send_to_many(&["conn_1".to_string(), "conn_2".to_string()], error("hi"));

        assert_eq!(
            first_rx.recv().await,
            Some(ServerEvent::LeftRoom { code: "A".to_string() })
        );
        assert_eq!(first_rx.recv().await, Some(error("hi")));
        assert_eq!(second_rx.recv().await, Some(error("hi")));
        assert!(second_rx.try_recv().is_err());
        assert_eq!(connections.connection_count(), 2);
    }

    #[tokio::test]
    async fn removing_a_channel_reports_its_rooms() {
        let connections = Connections::default();
        let (tx, mut rx) = mpsc::channel(1);
        connections.insert_channel("conn_1", tx);
        connections.join_group("conn_1", "ROOM01");
        connections.join_group("conn_1", "ROOM02");
        connections.leave_group("conn_1", "ROOM01");

        assert_eq!(connections.groups_of("conn_1"), vec!["ROOM02".to_string()]);
        assert_eq!(connections.remove_channel("conn_1"), vec!["ROOM02".to_string()]);
        assert_eq!(connections.connection_count(), 0);

        // Sender dropped with the connection
        assert_eq!(rx.recv().await, None);
        connections.send_to("conn_1", error("late"));
    }

    #[tokio::test]
    async fn a_full_channel_evicts_without_blocking_others() {
        let connections = Connections::default();
        let (stalled_tx, mut stalled_rx) = mpsc::channel(1);
        let (live_tx, mut live_rx) = mpsc::channel(8);
        let evicted = connections.insert_channel("conn_stalled", stalled_tx);
        connections.insert_channel("conn_live", live_tx);
        connections.join_group("conn_stalled", "ROOM01");

        let members = ["conn_stalled".to_string(), "conn_live".to_string()];
        for msg in ["one", "two", "three"] {
            connections.send_to_many(&members, error(msg));
        }

        tokio::time::timeout(Duration::from_secs(1), evicted.notified())
            .await
            .expect("stalled connection was not evicted");

        // Everything queued before the eviction is still delivered, then the channel closes
        assert_eq!(stalled_rx.recv().await, Some(error("one")));
        assert_eq!(stalled_rx.recv().await, None);
        for msg in ["one", "two", "three"] {
            assert_eq!(live_rx.recv().await, Some(error(msg)));
        }

        // Room membership survives so the disconnect can still leave the room
        assert_eq!(connections.groups_of("conn_stalled"), vec!["ROOM01".to_string()]);
    }
}
