//! Event types for the FoodFinder event system
//!
//! Scan sessions publish their progress on an [`EventBus`]; presentation layers
//! (CLI output, map widgets) subscribe and react. Nothing flows back into the
//! session through the bus.

mod scan_types;

pub use scan_types::{RequestKind, ScanPhase};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Scan session events
///
/// Events are broadcast via EventBus and serialize with a `type` tag so a
/// widget can consume them as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScanEvent {
    /// Session moved between phases
    PhaseChanged {
        session_id: Uuid,
        old_phase: ScanPhase,
        new_phase: ScanPhase,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A backend request was issued
    ///
    /// `dish` is set for searches; `with_location` tells whether the search
    /// carried coordinates.
    RequestIssued {
        session_id: Uuid,
        request: RequestKind,
        dish: Option<String>,
        with_location: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A request failed and the session entered its error phase
    RequestFailed {
        session_id: Uuid,
        request: RequestKind,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A response arrived for state that was already discarded
    StaleResponseDiscarded {
        session_id: Uuid,
        request: RequestKind,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl ScanEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            ScanEvent::PhaseChanged { .. } => "PhaseChanged",
            ScanEvent::RequestIssued { .. } => "RequestIssued",
            ScanEvent::RequestFailed { .. } => "RequestFailed",
            ScanEvent::StaleResponseDiscarded { .. } => "StaleResponseDiscarded",
        }
    }

    /// Session the event belongs to
    pub fn session_id(&self) -> Uuid {
        match self {
            ScanEvent::PhaseChanged { session_id, .. }
            | ScanEvent::RequestIssued { session_id, .. }
            | ScanEvent::RequestFailed { session_id, .. }
            | ScanEvent::StaleResponseDiscarded { session_id, .. } => *session_id,
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block the session)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use foodfinder_common::events::{EventBus, ScanEvent, ScanPhase};
/// use uuid::Uuid;
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit(ScanEvent::PhaseChanged {
///     session_id: Uuid::new_v4(),
///     old_phase: ScanPhase::Idle,
///     new_phase: ScanPhase::ImageReady,
///     timestamp: chrono::Utc::now(),
/// }).ok();
///
/// assert_eq!(rx.try_recv().unwrap().event_type(), "PhaseChanged");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ScanEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ScanEvent,
    ) -> Result<usize, broadcast::error::SendError<ScanEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ScanEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase_changed(old: ScanPhase, new: ScanPhase) -> ScanEvent {
        ScanEvent::PhaseChanged {
            session_id: Uuid::new_v4(),
            old_phase: old,
            new_phase: new,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_eventbus_emit_without_subscribers_errors() {
        let bus = EventBus::new(10);
        assert!(bus
            .emit(phase_changed(ScanPhase::Idle, ScanPhase::ImageReady))
            .is_err());
    }

    #[test]
    fn test_eventbus_emit_lossy_on_full_channel() {
        let bus = EventBus::new(2);
        let _rx = bus.subscribe();

        for _ in 0..10 {
            bus.emit_lossy(phase_changed(ScanPhase::ImageReady, ScanPhase::Recognizing));
        }

        assert_eq!(bus.capacity(), 2);
    }

    #[test]
    fn test_eventbus_multiple_subscribers() {
        let bus = EventBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit(phase_changed(ScanPhase::Recognizing, ScanPhase::Error))
            .expect("emit should succeed");

        assert_eq!(rx1.try_recv().unwrap().event_type(), "PhaseChanged");
        assert_eq!(rx2.try_recv().unwrap().event_type(), "PhaseChanged");
    }

    #[test]
    fn test_scan_event_serializes_with_type_tag() {
        let session_id = Uuid::new_v4();
        let event = ScanEvent::RequestIssued {
            session_id,
            request: RequestKind::Search,
            dish: Some("pizza".to_string()),
            with_location: false,
            timestamp: chrono::Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "RequestIssued");
        assert_eq!(json["request"], "search");
        assert_eq!(json["dish"], "pizza");
        assert_eq!(event.session_id(), session_id);
    }

    #[test]
    fn test_phase_is_busy() {
        assert!(ScanPhase::Recognizing.is_busy());
        assert!(ScanPhase::SearchingRestaurants.is_busy());
        assert!(!ScanPhase::ResultsReady.is_busy());
        assert!(!ScanPhase::Error.is_busy());
    }
}
