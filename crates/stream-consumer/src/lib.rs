//! Client-side consumer for LLM server-sent-event response streams.
//!
//! An event source produces a sequence of `StreamEvent`s; a `StreamConsumer`
//! pulls them one at a time, collects text fragments into a `Transcript` and
//! reports success or failure through a `StreamObserver`.
//!
//! # Usage (OpenAI Responses API)
//!
//! ```no_run
//! use stream_consumer::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ConsumerError> {
//! let client = StreamClient::responses(SessionConfig::from_env()?)?;
//!
//! let transcript = client
//!     .session("Say 'double bubble bath' ten times fast.")
//!     .stream(ConsoleObserver::stdout())
//!     .await?;
//!
//! println!("{} fragments", transcript.len());
//! # Ok(())
//! # }
//! ```
//!
//! Any iterator or stream of `Result<StreamEvent, SourceError>` can be
//! consumed directly:
//!
//! ```
//! use stream_consumer::prelude::*;
//!
//! let events = vec![
//!     Ok(StreamEvent::TextDelta { fragment: "double ".into() }),
//!     Ok(StreamEvent::TextDelta { fragment: "bubble bath".into() }),
//!     Ok(StreamEvent::Completed { status: None }),
//! ];
//! let transcript = StreamConsumer::new(RecordingObserver::new())
//!     .consume_iter(events)
//!     .unwrap();
//! assert_eq!(transcript.text(), "double bubble bath");
//! ```

/// Session configuration resolved from the environment.
pub mod config;
/// Session state machine and event dispatch.
pub mod consumer;
/// Public error types.
pub mod errors;
/// Decoded stream events.
pub mod event;
/// Logging setup.
pub mod observability;
/// Observers receiving session side effects.
pub mod observer;
/// Common imports for typical usage.
pub mod prelude;
/// Client and per-session runner.
pub mod session;
/// Event source seam and the OpenAI Responses implementation.
pub mod source;
/// Append-only text transcript.
pub mod transcript;

pub use config::SessionConfig;
pub use consumer::{SessionState, StreamConsumer};
pub use errors::{ConsumerError, SessionFailure, SourceError};
pub use event::StreamEvent;
pub use observer::{ConsoleObserver, Emission, EventLogObserver, RecordingObserver, StreamObserver};
pub use session::{SessionRun, StreamClient};
pub use source::{EventSource, EventStream, ResponsesSource, StreamRequest, sse_event_stream};
pub use transcript::Transcript;
