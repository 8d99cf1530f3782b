//! Common imports for typical consumer usage.
pub use crate::{
    ConsoleObserver, ConsumerError, EventLogObserver, EventSource, RecordingObserver,
    SessionConfig, SessionFailure, SessionState, SourceError, StreamClient, StreamConsumer,
    StreamEvent, StreamObserver, Transcript,
};
