use futures::{FutureExt as _, Stream, StreamExt as _};
use tracing::{debug, info, warn};

use crate::errors::{SessionFailure, SourceError};
use crate::event::StreamEvent;
use crate::observer::StreamObserver;
use crate::transcript::Transcript;

/// Lifecycle of one streaming session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    Streaming,
    Completed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Drives one session: dispatches events by kind, builds the transcript and
/// forwards side effects to an observer.
///
/// The same `accept` dispatch backs both the blocking (`consume_iter`) and the
/// async (`consume_stream`) drivers.
pub struct StreamConsumer<O: StreamObserver> {
    session_id: uuid::Uuid,
    state: SessionState,
    transcript: Transcript,
    failure: Option<SessionFailure>,
    observer: O,
    events_seen: u64,
}

impl<O: StreamObserver> StreamConsumer<O> {
    pub fn new(observer: O) -> Self {
        Self::with_session_id(uuid::Uuid::new_v4(), observer)
    }

    pub fn with_session_id(session_id: uuid::Uuid, observer: O) -> Self {
        Self {
            session_id,
            state: SessionState::NotStarted,
            transcript: Transcript::new(),
            failure: None,
            observer,
            events_seen: 0,
        }
    }

    pub fn session_id(&self) -> uuid::Uuid {
        self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Transcript collected so far. Finalized only after `completed`.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Number of items accepted before a terminal state was reached.
    pub fn events_seen(&self) -> u64 {
        self.events_seen
    }

    /// Dispatches one item pulled from the event sequence.
    ///
    /// Returns the session failure when this item ends the session in
    /// failure, or a `ProtocolViolation` when the session had already reached
    /// a terminal state. A violation leaves state, transcript and output
    /// untouched.
    pub fn accept(&mut self, item: Result<StreamEvent, SourceError>) -> Result<(), SessionFailure> {
        if self.state.is_terminal() {
            let kind = match &item {
                Ok(event) => event.kind().to_string(),
                Err(err) => err.to_string(),
            };
            warn!(session_id = %self.session_id, state = ?self.state, kind = %kind, "item received after terminal event");
            return Err(SessionFailure::ProtocolViolation {
                message: format!("received `{kind}` after session reached {:?}", self.state),
            });
        }
        if self.state == SessionState::NotStarted {
            self.state = SessionState::Streaming;
        }
        self.events_seen = self.events_seen.saturating_add(1);

        let event = match item {
            Ok(event) => event,
            Err(err) => return Err(self.fail(err.into())),
        };
        self.observer.on_event(&event);

        match event {
            StreamEvent::Created { response_id } => {
                info!(session_id = %self.session_id, response_id = ?response_id, "response stream created");
                self.observer.on_created();
            }
            StreamEvent::TextDelta { fragment } => {
                debug!(session_id = %self.session_id, seq = self.transcript.len(), "text delta");
                self.observer.on_fragment(&fragment);
                self.transcript.append(fragment);
            }
            StreamEvent::Completed { status } => {
                self.transcript.finalize();
                self.state = SessionState::Completed;
                info!(session_id = %self.session_id, status = ?status, fragments = self.transcript.len(), "response stream completed");
                let text = self.transcript.text();
                self.observer.on_completed(&text);
            }
            StreamEvent::Error { message } => {
                return Err(self.fail(SessionFailure::Upstream { message }));
            }
            StreamEvent::Unknown { kind, .. } => {
                debug!(session_id = %self.session_id, kind = %kind, "skipping unknown event kind");
                self.observer.on_unknown(&kind);
            }
        }
        Ok(())
    }

    fn fail(&mut self, failure: SessionFailure) -> SessionFailure {
        warn!(session_id = %self.session_id, error = %failure, "response stream failed");
        self.state = SessionState::Failed;
        self.observer.on_failed(&failure);
        self.failure = Some(failure.clone());
        failure
    }

    /// Ends the session and returns the finalized transcript or the failure.
    ///
    /// A session that never reached a terminal event is reported as a
    /// transport failure: the sequence broke before the producer could say
    /// how it ended.
    pub fn finish(mut self) -> Result<Transcript, SessionFailure> {
        match self.state {
            SessionState::Completed => Ok(self.transcript),
            SessionState::Failed => Err(self.failure.unwrap_or(SessionFailure::Transport {
                message: "session failed without a recorded cause".into(),
            })),
            SessionState::NotStarted | SessionState::Streaming => {
                let message = if self.state == SessionState::NotStarted {
                    "event stream ended before any event was received"
                } else {
                    "event stream ended before a terminal event"
                };
                Err(self.fail(SessionFailure::Transport {
                    message: message.into(),
                }))
            }
        }
    }

    /// Pulls from a blocking sequence until a terminal event, then finishes.
    ///
    /// One further item is pulled after the terminal event; if the producer
    /// sent one, it is reported as a protocol violation and discarded. The
    /// session result is unaffected.
    pub fn consume_iter<I>(mut self, events: I) -> Result<Transcript, SessionFailure>
    where
        I: IntoIterator<Item = Result<StreamEvent, SourceError>>,
    {
        let mut events = events.into_iter();
        for item in events.by_ref() {
            let _ = self.accept(item);
            if self.state.is_terminal() {
                break;
            }
        }
        if self.state.is_terminal()
            && let Some(trailing) = events.next()
        {
            let _ = self.accept(trailing);
        }
        self.finish()
    }

    /// Pulls from an async sequence until a terminal event, then finishes.
    ///
    /// Dropping the returned future abandons the session; nothing beyond what
    /// was already emitted is produced.
    ///
    /// After the terminal event the stream is polled once more without
    /// waiting. An item that is already available is reported as a protocol
    /// violation; a producer that is slow to close does not hold the session.
    pub async fn consume_stream<S>(mut self, events: S) -> Result<Transcript, SessionFailure>
    where
        S: Stream<Item = Result<StreamEvent, SourceError>>,
    {
        let mut events = std::pin::pin!(events);
        while let Some(item) = events.next().await {
            let _ = self.accept(item);
            if self.state.is_terminal() {
                break;
            }
        }
        if self.state.is_terminal()
            && let Some(Some(trailing)) = events.next().now_or_never()
        {
            let _ = self.accept(trailing);
        }
        self.finish()
    }
}
