use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::SessionConfig;
use crate::consumer::StreamConsumer;
use crate::errors::ConsumerError;
use crate::observer::StreamObserver;
use crate::source::{EventSource, ResponsesSource, StreamRequest};
use crate::transcript::Transcript;

/// Entry point for starting streaming sessions.
///
/// Holds a validated `SessionConfig` and the event source. Sessions started
/// from the same client share nothing mutable; each owns its transcript.
#[derive(Clone)]
pub struct StreamClient {
    config: Arc<SessionConfig>,
    source: Arc<dyn EventSource>,
}

impl StreamClient {
    /// Creates a client after checking the configuration. A missing
    /// credential fails here, before any session can start.
    pub fn new(config: SessionConfig, source: Arc<dyn EventSource>) -> Result<Self, ConsumerError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            source,
        })
    }

    /// Creates a client streaming from the OpenAI Responses API.
    pub fn responses(config: SessionConfig) -> Result<Self, ConsumerError> {
        let source = Arc::new(ResponsesSource::new(&config)?);
        Self::new(config, source)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Starts building a session for one prompt.
    pub fn session(&self, prompt: impl Into<String>) -> SessionRun {
        SessionRun {
            config: self.config.clone(),
            source: self.source.clone(),
            prompt: prompt.into(),
            system_prompt: None,
            timeout: None,
        }
    }
}

/// Builder for a single streaming session.
pub struct SessionRun {
    config: Arc<SessionConfig>,
    source: Arc<dyn EventSource>,
    prompt: String,
    system_prompt: Option<String>,
    timeout: Option<Duration>,
}

impl SessionRun {
    pub fn system_prompt(mut self, text: impl Into<String>) -> Self {
        self.system_prompt = Some(text.into());
        self
    }

    /// Abandons the session if it has not reached a terminal event in time.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Opens the event source and consumes it, forwarding side effects to
    /// `observer`. Returns the finalized transcript on completion.
    ///
    /// Every `ConsumerError::Session` has already been passed to
    /// `observer.on_failed`, including a failure to open the source.
    /// Validation errors and timeouts are not.
    pub async fn stream<O: StreamObserver>(self, observer: O) -> Result<Transcript, ConsumerError> {
        let SessionRun {
            config,
            source,
            prompt,
            system_prompt,
            timeout,
        } = self;
        if prompt.trim().is_empty() {
            return Err(ConsumerError::Validation("prompt must not be empty".into()));
        }
        let session_id = uuid::Uuid::new_v4();
        let request = StreamRequest {
            session_id,
            model: config.model.clone(),
            system_prompt: system_prompt.filter(|s| !s.trim().is_empty()),
            prompt,
        };
        info!(session_id = %session_id, source = source.name(), model = %request.model, "starting session");

        let consumer = StreamConsumer::with_session_id(session_id, observer);
        let drive = async {
            match source.open(&request).await {
                Ok(events) => consumer.consume_stream(events).await.map_err(ConsumerError::from),
                Err(err) => consumer
                    .consume_iter(std::iter::once(Err(err)))
                    .map_err(ConsumerError::from),
            }
        };

        let result = match timeout {
            Some(limit) => match tokio::time::timeout(limit, drive).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(session_id = %session_id, timeout = ?limit, "session abandoned after timeout");
                    Err(ConsumerError::TimedOut(limit))
                }
            },
            None => drive.await,
        };
        if let Err(err) = &result {
            warn!(session_id = %session_id, error = %err, "session ended with error");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{SessionFailure, SourceError};
    use crate::event::StreamEvent;
    use crate::observer::{Emission, RecordingObserver};
    use crate::source::EventStream;
    use futures::StreamExt as _;
    use futures::stream;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum FakeBehavior {
        OpenError(SourceError),
        Events(Vec<Result<StreamEvent, SourceError>>),
        EventsThenPending(Vec<Result<StreamEvent, SourceError>>),
    }

    struct FakeSource {
        calls: AtomicUsize,
        script: Mutex<VecDeque<FakeBehavior>>,
        requests: Mutex<Vec<StreamRequest>>,
    }

    impl FakeSource {
        fn new(script: Vec<FakeBehavior>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                script: Mutex::new(script.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl EventSource for FakeSource {
        fn name(&self) -> &str {
            "fake"
        }

        async fn open(&self, request: &StreamRequest) -> Result<EventStream, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests
                .lock()
                .expect("requests lock")
                .push(request.clone());
            let next = self.script.lock().expect("script lock").pop_front();
            match next {
                Some(FakeBehavior::OpenError(err)) => Err(err),
                Some(FakeBehavior::Events(events)) => Ok(Box::pin(stream::iter(events))),
                Some(FakeBehavior::EventsThenPending(events)) => {
                    Ok(Box::pin(stream::iter(events).chain(stream::pending())))
                }
                None => Ok(Box::pin(stream::empty())),
            }
        }
    }

    fn config() -> SessionConfig {
        SessionConfig::new("sk-test", "gpt-4o")
    }

    fn scenario_a() -> Vec<Result<StreamEvent, SourceError>> {
        vec![
            Ok(StreamEvent::Created { response_id: None }),
            Ok(StreamEvent::TextDelta {
                fragment: "double ".into(),
            }),
            Ok(StreamEvent::TextDelta {
                fragment: "bubble ".into(),
            }),
            Ok(StreamEvent::TextDelta {
                fragment: "bath".into(),
            }),
            Ok(StreamEvent::Completed { status: None }),
        ]
    }

    #[tokio::test]
    async fn completed_session_returns_finalized_transcript() {
        let source = FakeSource::new(vec![FakeBehavior::Events(scenario_a())]);
        let client = StreamClient::new(config(), source.clone()).expect("client");
        let mut recorder = RecordingObserver::new();

        let transcript = client
            .session("Say 'double bubble bath' ten times fast.")
            .system_prompt("Be brief.")
            .stream(&mut recorder)
            .await
            .expect("completed");

        assert_eq!(transcript.text(), "double bubble bath");
        assert_eq!(recorder.fragments(), vec!["double ", "bubble ", "bath"]);
        assert_eq!(
            recorder.emissions.last(),
            Some(&Emission::Completed("double bubble bath".into()))
        );
        let requests = source.requests.lock().expect("requests lock");
        assert_eq!(requests[0].model, "gpt-4o");
        assert_eq!(requests[0].system_prompt.as_deref(), Some("Be brief."));
    }

    #[tokio::test]
    async fn upstream_error_event_fails_session() {
        let source = FakeSource::new(vec![FakeBehavior::Events(vec![
            Ok(StreamEvent::Created { response_id: None }),
            Ok(StreamEvent::Error {
                message: "rate limited".into(),
            }),
        ])]);
        let client = StreamClient::new(config(), source).expect("client");
        let mut recorder = RecordingObserver::new();

        let err = client
            .session("hello")
            .stream(&mut recorder)
            .await
            .expect_err("should fail");

        let expected = SessionFailure::Upstream {
            message: "rate limited".into(),
        };
        assert_eq!(err, ConsumerError::Session(expected.clone()));
        assert_eq!(
            recorder.emissions,
            vec![Emission::Created, Emission::Failed(expected)]
        );
    }

    #[tokio::test]
    async fn missing_credential_never_opens_a_stream() {
        let source = FakeSource::new(vec![FakeBehavior::Events(scenario_a())]);
        let result = SessionConfig::from_lookup(|_| None)
            .and_then(|config| StreamClient::new(config, source.clone()));
        assert!(matches!(result, Err(ConsumerError::Configuration(_))));

        let blank = StreamClient::new(SessionConfig::new("  ", "gpt-4o"), source.clone());
        assert!(matches!(blank, Err(ConsumerError::Configuration(_))));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn blank_prompt_is_rejected_before_opening() {
        let source = FakeSource::new(vec![]);
        let client = StreamClient::new(config(), source.clone()).expect("client");
        let err = client
            .session("   ")
            .stream(RecordingObserver::new())
            .await
            .expect_err("blank prompt");
        assert!(matches!(err, ConsumerError::Validation(_)));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn open_failure_is_reported_as_session_error() {
        let source = FakeSource::new(vec![FakeBehavior::OpenError(SourceError::upstream(
            "invalid api key",
            Some(401),
        ))]);
        let client = StreamClient::new(config(), source).expect("client");
        let mut recorder = RecordingObserver::new();
        let err = client
            .session("hello")
            .stream(&mut recorder)
            .await
            .expect_err("open fails");
        let ConsumerError::Session(failure) = err else {
            panic!("expected a session failure, got {err:?}");
        };
        assert!(matches!(
            failure,
            SessionFailure::Upstream { ref message } if message.contains("401")
        ));
        // reported through the observer like any in-stream failure
        assert_eq!(recorder.emissions, vec![Emission::Failed(failure)]);
    }

    #[tokio::test]
    async fn one_failed_session_does_not_block_the_next() {
        let source = FakeSource::new(vec![
            FakeBehavior::Events(vec![
                Ok(StreamEvent::Created { response_id: None }),
                Err(SourceError::transport("connection reset")),
            ]),
            FakeBehavior::Events(scenario_a()),
        ]);
        let client = StreamClient::new(config(), source.clone()).expect("client");

        let first = client.session("one").stream(RecordingObserver::new()).await;
        assert!(matches!(
            first,
            Err(ConsumerError::Session(SessionFailure::Transport { .. }))
        ));

        let second = client
            .session("two")
            .stream(RecordingObserver::new())
            .await
            .expect("second session completes");
        assert_eq!(second.text(), "double bubble bath");
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn timeout_abandons_session_without_further_output() {
        let source = FakeSource::new(vec![FakeBehavior::EventsThenPending(vec![
            Ok(StreamEvent::Created { response_id: None }),
            Ok(StreamEvent::TextDelta {
                fragment: "partial".into(),
            }),
        ])]);
        let client = StreamClient::new(config(), source).expect("client");
        let mut recorder = RecordingObserver::new();

        let err = client
            .session("hello")
            .timeout(Duration::from_millis(20))
            .stream(&mut recorder)
            .await
            .expect_err("times out");

        assert_eq!(err, ConsumerError::TimedOut(Duration::from_millis(20)));
        assert_eq!(
            recorder.emissions,
            vec![Emission::Created, Emission::Fragment("partial".into())]
        );
    }

    #[tokio::test]
    async fn env_gated_smoke_stream_if_key_present() {
        let config = match SessionConfig::from_env() {
            Ok(config) => config,
            Err(_) => {
                eprintln!("skipping responses smoke test (OPENAI_API_KEY missing)");
                return;
            }
        };
        let client = StreamClient::responses(config).expect("client");
        let mut recorder = RecordingObserver::new();
        let result = client
            .session("Reply with the single word: ok")
            .timeout(Duration::from_secs(60))
            .stream(&mut recorder)
            .await;
        assert!(result.is_ok(), "responses smoke failed: {result:?}");
    }
}
