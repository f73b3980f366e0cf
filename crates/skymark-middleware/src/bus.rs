//! Headless, typed, topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every message without any single subscriber blocking
//! the others — the sensor-side publisher in particular must never wait on a
//! slow overlay consumer.
//!
//! # Topics
//!
//! Traffic is partitioned into three [`Topic`] lanes so components only
//! receive the messages they care about:
//!
//! | Topic | Typical traffic |
//! |---|---|
//! | [`Topic::Orientation`] | Gated heading/pitch/roll samples (a few Hz) |
//! | [`Topic::Location`] | Validated location fixes (seconds apart) |
//! | [`Topic::Overlay`] | Ranked overlay frames after each query/rank pass |
//!
//! Subscribing returns a [`TopicReceiver`]; dropping it is the unsubscribe
//! operation.

use skymark_types::{Event, SkyError};
use tokio::sync::broadcast;

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Enumeration of all first-class routing topics on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Gated orientation samples from the compass engine.
    Orientation,
    /// Validated location fixes, passed through for overlay consumers.
    Location,
    /// Ranked overlay frames, one per completed query/rank pass.
    Overlay,
}

/// Shared event bus. Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct OverlayBus {
    orientation: broadcast::Sender<Event>,
    location: broadcast::Sender<Event>,
    overlay: broadcast::Sender<Event>,
}

impl OverlayBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// The `capacity` is applied to every topic channel independently.
    pub fn new(capacity: usize) -> Self {
        let (orientation, _) = broadcast::channel(capacity);
        let (location, _) = broadcast::channel(capacity);
        let (overlay, _) = broadcast::channel(capacity);
        Self {
            orientation,
            location,
            overlay,
        }
    }

    /// Publish `event` to the given [`Topic`] channel.
    ///
    /// Returns the number of active receivers that were handed the event, or
    /// [`SkyError::Channel`] when no subscriber is currently listening on the
    /// topic. Publishers that do not care whether anyone is watching (the
    /// engine between UI attach and detach) ignore that error.
    pub fn publish_to(&self, topic: Topic, event: Event) -> Result<usize, SkyError> {
        match self.topic_sender(topic).send(event) {
            Ok(n) => Ok(n),
            Err(broadcast::error::SendError(_)) => Err(SkyError::Channel(format!(
                "no subscribers for topic {topic:?}"
            ))),
        }
    }

    /// Subscribe to a specific [`Topic`] channel.
    ///
    /// The returned [`TopicReceiver`] yields only events published to that
    /// topic. Drop it to unsubscribe.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Orientation => &self.orientation,
            Topic::Location => &self.location,
            Topic::Overlay => &self.overlay,
        }
    }
}

impl Default for OverlayBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Topic-based receiver
// ---------------------------------------------------------------------------

/// An async receiver bound to a single [`Topic`] channel.
///
/// Obtained via [`OverlayBus::subscribe_to`]. Dropping the receiver
/// unsubscribes it from the topic.
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// Returns:
    /// * `Ok(event)` – a successfully received event.
    /// * `Err(broadcast::error::RecvError::Lagged(n))` – the subscriber fell
    ///   behind and `n` messages were dropped.  The caller decides whether to
    ///   continue or abort.
    /// * `Err(broadcast::error::RecvError::Closed)` – the bus has shut down.
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Non-blocking variant of [`recv`][Self::recv]; returns immediately
    /// with `TryRecvError::Empty` when nothing is pending.
    pub fn try_recv(&mut self) -> Result<Event, broadcast::error::TryRecvError> {
        self.receiver.try_recv()
    }

    /// The [`Topic`] this receiver is bound to.
    pub fn topic(&self) -> Topic {
        self.topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use skymark_types::{EventPayload, OrientationSample};

    fn make_event(source: &str) -> Event {
        Event::new(
            source,
            EventPayload::Orientation(OrientationSample {
                azimuth: 90.0,
                pitch: 0.0,
                roll: 0.0,
                timestamp: Utc::now(),
            }),
        )
    }

    #[tokio::test]
    async fn publish_and_receive_on_topic() -> Result<(), Box<dyn std::error::Error>> {
        let bus = OverlayBus::default();
        let mut rx = bus.subscribe_to(Topic::Orientation);

        let event = make_event("skymark-engine::compass");
        bus.publish_to(Topic::Orientation, event.clone())?;

        let received = rx.recv().await?;
        assert_eq!(received.id, event.id);
        assert_eq!(received.source, event.source);
        Ok(())
    }

    /// Two independent subscribers on the same topic both receive the event.
    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() -> Result<(), Box<dyn std::error::Error>> {
        let bus = OverlayBus::default();
        let mut subscriber1 = bus.subscribe_to(Topic::Overlay);
        let mut subscriber2 = bus.subscribe_to(Topic::Overlay);

        let event = make_event("skymark-engine::overlay");
        bus.publish_to(Topic::Overlay, event.clone())?;

        assert_eq!(subscriber1.recv().await?.id, event.id);
        assert_eq!(subscriber2.recv().await?.id, event.id);
        Ok(())
    }

    /// A subscriber on `Location` must not receive events published to
    /// `Orientation` because they are routed through separate channels.
    #[tokio::test]
    async fn topics_are_isolated() -> Result<(), Box<dyn std::error::Error>> {
        let bus = OverlayBus::default();
        let mut location_sub = bus.subscribe_to(Topic::Location);
        let _orientation_sub = bus.subscribe_to(Topic::Orientation);

        bus.publish_to(Topic::Orientation, make_event("skymark-engine::compass"))?;

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            location_sub.recv(),
        )
        .await;

        assert!(
            result.is_err(),
            "Location subscriber must not receive an Orientation event"
        );
        Ok(())
    }

    #[test]
    fn publish_without_subscribers_returns_error() {
        let bus = OverlayBus::default();
        let result = bus.publish_to(Topic::Overlay, make_event("test"));
        assert!(matches!(result, Err(SkyError::Channel(_))));
    }

    /// Flooding a low-capacity channel while a subscriber sleeps must produce
    /// a `Lagged` error rather than panicking or blocking.
    #[tokio::test]
    async fn slow_subscriber_lags_instead_of_blocking() {
        const CAPACITY: usize = 16;
        let bus = OverlayBus::new(CAPACITY);
        let mut slow_sub = bus.subscribe_to(Topic::Orientation);

        for _ in 0..1_000 {
            let _ = bus.publish_to(Topic::Orientation, make_event("flood::compass"));
        }

        let result = slow_sub.recv().await;
        assert!(
            matches!(result, Err(broadcast::error::RecvError::Lagged(_))),
            "expected Lagged error, got: {result:?}"
        );
    }

    #[tokio::test]
    async fn dropping_receiver_unsubscribes() {
        let bus = OverlayBus::default();
        let rx = bus.subscribe_to(Topic::Location);
        assert_eq!(rx.topic(), Topic::Location);
        drop(rx);

        let result = bus.publish_to(Topic::Location, make_event("test"));
        assert!(matches!(result, Err(SkyError::Channel(_))));
    }
}
