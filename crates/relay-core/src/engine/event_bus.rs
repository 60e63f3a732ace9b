//! Broadcast bus for authorization lifecycle events.

use relay_types::AuthorizationEvent;
use tokio::sync::broadcast;

/// Fan-out channel for [`AuthorizationEvent`]s.
///
/// Publishing never blocks; slow subscribers lag and miss events.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<AuthorizationEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<AuthorizationEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event; fails only when nobody is subscribed.
	pub fn publish(
		&self,
		event: AuthorizationEvent,
	) -> Result<usize, broadcast::error::SendError<AuthorizationEvent>> {
		self.sender.send(event)
	}
}
