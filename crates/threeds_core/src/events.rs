//! Analytics events delegated to the embedding application.

/// The point in the flow an event marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum EventKind {
    /// A fingerprint action was handed to the handler.
    FingerprintSent,
    /// The fingerprint phase reached a terminal state.
    FingerprintComplete,
    /// A challenge action was handed to the handler.
    ChallengeSent,
    /// The engine is about to present the challenge UI.
    ChallengeDisplayed,
    /// The challenge phase reached a terminal state.
    ChallengeComplete,
}

/// A flow event forwarded to the analytics collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// What happened.
    pub kind: EventKind,
}

impl Event {
    /// An event of the given kind.
    pub fn new(kind: EventKind) -> Self {
        Self { kind }
    }
}

/// The analytics collaborator. Implemented by the embedding application;
/// this crate only emits.
pub trait EventSink: Send + Sync {
    /// Records a flow event.
    fn add(&self, event: Event);
}

/// Sink for embedders that do not collect analytics.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn add(&self, _event: Event) {}
}
