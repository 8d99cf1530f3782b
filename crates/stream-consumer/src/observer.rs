use std::io::Write;

use tracing::warn;

use crate::errors::SessionFailure;
use crate::event::StreamEvent;

/// Receives the side effects of a streaming session.
///
/// Calls happen synchronously from the consumer, one event at a time and in
/// pull order, so an observer sees fragments before the stream ends.
pub trait StreamObserver {
    /// Called for every event before it is dispatched.
    fn on_event(&mut self, _event: &StreamEvent) {}

    /// The producer signaled that a response started.
    fn on_created(&mut self) {}

    /// A text fragment arrived.
    fn on_fragment(&mut self, fragment: &str);

    /// The session completed; `text` is the full transcript. Called once.
    fn on_completed(&mut self, _text: &str) {}

    /// The session failed. Called once.
    fn on_failed(&mut self, _failure: &SessionFailure) {}

    /// An event of an unrecognized kind was skipped.
    fn on_unknown(&mut self, _kind: &str) {}
}

impl<O: StreamObserver + ?Sized> StreamObserver for &mut O {
    fn on_event(&mut self, event: &StreamEvent) {
        (**self).on_event(event);
    }

    fn on_created(&mut self) {
        (**self).on_created();
    }

    fn on_fragment(&mut self, fragment: &str) {
        (**self).on_fragment(fragment);
    }

    fn on_completed(&mut self, text: &str) {
        (**self).on_completed(text);
    }

    fn on_failed(&mut self, failure: &SessionFailure) {
        (**self).on_failed(failure);
    }

    fn on_unknown(&mut self, kind: &str) {
        (**self).on_unknown(kind);
    }
}

/// Prints fragments as they arrive, then the full text or the failure.
pub struct ConsoleObserver<W: Write> {
    out: W,
}

impl ConsoleObserver<std::io::Stdout> {
    /// Observer writing to standard output.
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> ConsoleObserver<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, args: std::fmt::Arguments<'_>) {
        if let Err(e) = self.out.write_fmt(args).and_then(|_| self.out.flush()) {
            warn!(error = %e, "failed to write stream output");
        }
    }
}

impl<W: Write> StreamObserver for ConsoleObserver<W> {
    fn on_created(&mut self) {
        self.emit(format_args!(
            "Response created, starting to receive content...\n"
        ));
    }

    fn on_fragment(&mut self, fragment: &str) {
        self.emit(format_args!("{fragment}"));
    }

    fn on_completed(&mut self, text: &str) {
        self.emit(format_args!(
            "\n\nResponse completed!\n\nFull response text: {text}\n"
        ));
    }

    fn on_failed(&mut self, failure: &SessionFailure) {
        self.emit(format_args!("\nError encountered: {failure}\n"));
    }
}

/// Prints every raw event with its kind, without interpreting it.
pub struct EventLogObserver<W: Write> {
    out: W,
}

impl EventLogObserver<std::io::Stdout> {
    /// Observer writing to standard output.
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> EventLogObserver<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> StreamObserver for EventLogObserver<W> {
    fn on_event(&mut self, event: &StreamEvent) {
        let written = writeln!(self.out, "Event type: {}", event.kind())
            .and_then(|_| writeln!(self.out, "Event data: {event:?}"))
            .and_then(|_| writeln!(self.out, "{}", "-".repeat(40)))
            .and_then(|_| self.out.flush());
        if let Err(e) = written {
            warn!(error = %e, "failed to write event log");
        }
    }

    fn on_fragment(&mut self, _fragment: &str) {}

    fn on_failed(&mut self, failure: &SessionFailure) {
        let written = writeln!(self.out, "Error encountered: {failure}")
            .and_then(|_| self.out.flush());
        if let Err(e) = written {
            warn!(error = %e, "failed to write event log");
        }
    }
}

/// One observable side effect, as recorded by `RecordingObserver`.
#[derive(Clone, Debug, PartialEq)]
pub enum Emission {
    Created,
    Fragment(String),
    Completed(String),
    Failed(SessionFailure),
    Unknown(String),
}

/// Records every emission in order.
#[derive(Clone, Debug, Default)]
pub struct RecordingObserver {
    pub emissions: Vec<Emission>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fragments emitted so far, in emission order.
    pub fn fragments(&self) -> Vec<&str> {
        self.emissions
            .iter()
            .filter_map(|e| match e {
                Emission::Fragment(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl StreamObserver for RecordingObserver {
    fn on_created(&mut self) {
        self.emissions.push(Emission::Created);
    }

    fn on_fragment(&mut self, fragment: &str) {
        self.emissions.push(Emission::Fragment(fragment.to_string()));
    }

    fn on_completed(&mut self, text: &str) {
        self.emissions.push(Emission::Completed(text.to_string()));
    }

    fn on_failed(&mut self, failure: &SessionFailure) {
        self.emissions.push(Emission::Failed(failure.clone()));
    }

    fn on_unknown(&mut self, kind: &str) {
        self.emissions.push(Emission::Unknown(kind.to_string()));
    }
}
