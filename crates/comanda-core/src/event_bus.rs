//! Broadcast bus for board events.
//!
//! Components publish transition and synchronization outcomes here; the run
//! loop and any interested subscriber consume them independently. Publishing
//! never blocks: events to a bus with no subscribers are dropped.

use comanda_types::BoardEvent;
use tokio::sync::broadcast;

/// Cloneable handle to the board's broadcast channel.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<BoardEvent>,
}

impl EventBus {
	/// Creates a new bus holding up to `capacity` undelivered events per
	/// subscriber before older ones are dropped.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Publishes an event to all current subscribers.
	///
	/// Returns the number of subscribers that received it; an error only
	/// means nobody is listening, which callers are free to ignore.
	pub fn publish(
		&self,
		event: BoardEvent,
	) -> Result<usize, broadcast::error::SendError<BoardEvent>> {
		self.sender.send(event)
	}

	/// Creates a new subscription to the event stream.
	pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
		self.sender.subscribe()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use comanda_types::SyncEvent;

	#[tokio::test]
	async fn delivers_to_subscriber() {
		let bus = EventBus::new(16);
		let mut rx = bus.subscribe();

		bus.publish(BoardEvent::Sync(SyncEvent::BranchRefreshed {
			branch_id: 7,
			orders: 3,
			revision: 1,
		}))
		.unwrap();

		let event = rx.recv().await.unwrap();
		assert!(matches!(
			event,
			BoardEvent::Sync(SyncEvent::BranchRefreshed { branch_id: 7, .. })
		));
	}

	#[test]
	fn publish_without_subscribers_is_an_ignorable_error() {
		let bus = EventBus::new(16);
		let result = bus.publish(BoardEvent::Sync(SyncEvent::RefreshFailed {
			branch_id: 1,
			error: "offline".into(),
		}));
		assert!(result.is_err());
	}
}
