use std::time::Duration;

use chrono::Utc;
use tracing::Instrument;
use uuid::Uuid;

use super::condition::{language_equals, status_equals, status_pending};
use super::document::{audio_artifact_key, transcript_key, JobDocument, Phase};
use super::failure::{FailureHandler, Fault};
use super::polling::{PollAttempt, PollingController};
use super::record::{ExecutionOutcome, ExecutionRecord};
use super::state::{next_state, Signal, State, START};
use crate::adapter::{JobSnapshot, ServiceAdapter, TranscriptionRequest, TranscriptionStatus};
use crate::trigger::TriggerPayload;

/// Tunables of the workflow engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    /// Wall-clock bound for a whole execution.
    pub execution_timeout: Duration,
    pub voice: String,
    pub target_language: String,
    /// Detected language for which translation is skipped.
    pub skip_language: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            max_poll_attempts: 18,
            execution_timeout: Duration::from_secs(600),
            voice: "Joanna".to_string(),
            target_language: "en".to_string(),
            skip_language: "en-US".to_string(),
        }
    }
}

impl WorkflowConfig {
    /// Whether every poll attempt, with its wait, can run before the
    /// execution timeout fires. When it cannot, a stuck job ends in `Timeout`
    /// and never in `PollTimeout`.
    pub fn poll_budget_fits(&self) -> bool {
        self.poll_interval
            .checked_mul(self.max_poll_attempts)
            .is_some_and(|budget| budget < self.execution_timeout)
    }
}

/// Called with every state the engine enters.
pub type StateObserver = Box<dyn Fn(State) + Send + Sync>;

/// Per-execution working set. Never shared between executions.
struct Execution {
    trigger: TriggerPayload,
    doc: JobDocument,
    state: State,
    history: Vec<State>,
    poller: PollingController,
    last_snapshot: Option<JobSnapshot>,
    audio: Option<Vec<u8>>,
}

/// Interprets the workflow graph for one trigger at a time per call; calls
/// may run concurrently.
pub struct Engine<A> {
    adapter: A,
    config: WorkflowConfig,
    observer: Option<StateObserver>,
}

impl<A: ServiceAdapter> Engine<A> {
    pub fn new(adapter: A, config: WorkflowConfig) -> Self {
        if !config.poll_budget_fits() {
            tracing::warn!(
                poll_interval = ?config.poll_interval,
                max_poll_attempts = config.max_poll_attempts,
                execution_timeout = ?config.execution_timeout,
                "poll bound does not fit in the execution timeout"
            );
        }
        Self {
            adapter,
            config,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: impl Fn(State) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Run the workflow for `trigger` and report only the outcome.
    pub async fn execute(&self, trigger: TriggerPayload) -> ExecutionOutcome {
        self.run(trigger).await.outcome
    }

    /// Run the workflow for `trigger` to a terminal state.
    ///
    /// Always returns: every path ends in Store, SkipTranslation or Fail,
    /// and exceeding `execution_timeout` fails with `Timeout` whatever state
    /// is active.
    pub async fn run(&self, trigger: TriggerPayload) -> ExecutionRecord {
        let execution_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            "execution",
            id = %execution_id,
            bucket = %trigger.bucket,
            key = %trigger.key,
        );
        self.run_inner(execution_id, trigger).instrument(span).await
    }

    async fn run_inner(&self, execution_id: String, trigger: TriggerPayload) -> ExecutionRecord {
        let started_at = Utc::now();
        tracing::info!("execution started");

        let mut exec = Execution {
            trigger,
            doc: JobDocument::default(),
            state: START,
            history: Vec::new(),
            poller: PollingController::new(
                self.config.poll_interval,
                self.config.max_poll_attempts,
            ),
            last_snapshot: None,
            audio: None,
        };

        let result = match tokio::time::timeout(self.config.execution_timeout, self.drive(&mut exec)).await {
            Ok(result) => result,
            Err(_) => Err(Fault::TimedOut {
                after_secs: self.config.execution_timeout.as_secs(),
            }),
        };

        let outcome = match result {
            Ok(terminal) => self.succeed(&exec, terminal),
            Err(fault) => self.fail(&mut exec, fault),
        };

        let completed_at = Utc::now();
        ExecutionRecord {
            execution_id,
            trigger: exec.trigger,
            outcome,
            terminal_state: exec.state,
            state_history: exec.history,
            poll_attempts: exec.poller.attempts(),
            document: exec.doc,
            started_at,
            completed_at,
            duration_ms: (completed_at - started_at).num_milliseconds(),
        }
    }

    /// The interpreter loop: run the current state, follow the edge its
    /// signal selects, stop at a terminal state.
    async fn drive(&self, exec: &mut Execution) -> Result<State, Fault> {
        loop {
            self.enter(exec);
            let signal = self.dispatch(exec).await?;
            if exec.state.is_terminal() {
                return Ok(exec.state);
            }
            exec.state = next_state(exec.state, signal).ok_or(Fault::NoTransition {
                from: exec.state,
                signal,
            })?;
        }
    }

    fn enter(&self, exec: &mut Execution) {
        tracing::debug!(state = %exec.state, "entering state");
        exec.history.push(exec.state);
        if let Some(observer) = &self.observer {
            observer(exec.state);
        }
    }

    async fn dispatch(&self, exec: &mut Execution) -> Result<Signal, Fault> {
        match exec.state {
            State::Preprocess => {
                exec.doc.preprocess(&exec.trigger.key)?;
                Ok(Signal::Done)
            }
            State::Transcribe => {
                let job_name = exec.doc.transcription_job_name.clone();
                let request = TranscriptionRequest {
                    media_uri: exec.trigger.media_uri(),
                    output_bucket: exec.trigger.bucket.clone(),
                    output_key: transcript_key(&job_name),
                    identify_language: true,
                    job_name,
                };
                self.adapter
                    .transcribe(&request)
                    .await
                    .map_err(Fault::Submission)?;
                tracing::info!(job = %request.job_name, "transcription job submitted");
                exec.doc.advance(Phase::Submitted)?;
                Ok(Signal::Done)
            }
            State::Wait => {
                exec.poller.wait().await;
                Ok(Signal::Done)
            }
            State::GetTranscriptionStatus => {
                let attempt = exec
                    .poller
                    .check(&self.adapter, &exec.doc.transcription_job_name)
                    .await;
                match attempt {
                    PollAttempt::Resolved(snapshot) | PollAttempt::Pending(Some(snapshot)) => {
                        exec.doc.record_status(snapshot.status)?;
                        exec.last_snapshot = Some(snapshot);
                    }
                    // Transient error: the document keeps its last status.
                    PollAttempt::Pending(None) => {}
                    PollAttempt::Exhausted(timeout) => return Err(Fault::PollExhausted(timeout)),
                }
                Ok(Signal::Done)
            }
            State::CheckJobStatus => {
                let signal = if status_equals(&exec.doc, TranscriptionStatus::Completed) {
                    Signal::Completed
                } else if status_pending(&exec.doc) {
                    Signal::Pending
                } else {
                    Signal::Otherwise
                };
                Ok(signal)
            }
            State::CaptureResult => {
                let snapshot = exec
                    .last_snapshot
                    .take()
                    .ok_or(Fault::MissingField("transcript"))?;
                let transcript = snapshot
                    .transcript
                    .ok_or(Fault::MissingField("transcript"))?;
                let language_code = snapshot
                    .language_code
                    .ok_or(Fault::MissingField("language_code"))?;
                tracing::info!(language = %language_code, "transcription captured");
                exec.doc.capture_result(transcript, language_code)?;
                Ok(Signal::Done)
            }
            State::CheckLanguage => {
                if language_equals(&exec.doc, &self.config.skip_language) {
                    Ok(Signal::Untranslated)
                } else {
                    Ok(Signal::Otherwise)
                }
            }
            State::SkipTranslation => {
                tracing::info!("source already in target language, translation skipped");
                Ok(Signal::Done)
            }
            State::Translate => {
                let transcript = exec
                    .doc
                    .transcript
                    .as_deref()
                    .ok_or(Fault::MissingField("transcript"))?;
                let source = exec
                    .doc
                    .language_code
                    .as_deref()
                    .ok_or(Fault::MissingField("language_code"))?;
                let translated = self
                    .adapter
                    .translate(transcript, source, &self.config.target_language)
                    .await
                    .map_err(Fault::Translation)?;
                exec.doc.record_translation(translated)?;
                Ok(Signal::Done)
            }
            State::Synthesize => {
                let text = exec
                    .doc
                    .translated_text
                    .as_deref()
                    .ok_or(Fault::MissingField("translated_text"))?;
                let audio = self
                    .adapter
                    .synthesize(text, &self.config.voice)
                    .await
                    .map_err(Fault::Synthesis)?;
                tracing::debug!(bytes = audio.len(), "speech synthesized");
                exec.audio = Some(audio);
                exec.doc.advance(Phase::Synthesized)?;
                Ok(Signal::Done)
            }
            State::Store => {
                let key = audio_artifact_key(&exec.doc.transcription_job_name);
                let body = exec.audio.take().ok_or(Fault::MissingField("audio"))?;
                self.adapter
                    .put(&exec.trigger.bucket, &key, body)
                    .await
                    .map_err(Fault::Store)?;
                exec.doc.record_artifact(key)?;
                Ok(Signal::Done)
            }
            State::Fail => Err(Fault::JobFailed {
                status: exec.doc.transcription_status,
            }),
        }
    }

    fn succeed(&self, exec: &Execution, terminal: State) -> ExecutionOutcome {
        let artifact_key = match terminal {
            State::Store => exec
                .doc
                .audio_artifact_key
                .clone()
                .unwrap_or_else(|| audio_artifact_key(&exec.doc.transcription_job_name)),
            _ => transcript_key(&exec.doc.transcription_job_name),
        };
        tracing::info!(state = %terminal, artifact = %artifact_key, "execution succeeded");
        ExecutionOutcome::Success { artifact_key }
    }

    fn fail(&self, exec: &mut Execution, fault: Fault) -> ExecutionOutcome {
        let failure = FailureHandler::classify(
            &fault,
            exec.state,
            exec.doc.transcription_status,
            exec.poller.attempts(),
        );
        if let Err(err) = exec.doc.record_failure(failure.code.to_string()) {
            tracing::error!(error = %err, "could not record failure reason");
        }
        if exec.state != State::Fail {
            exec.state = State::Fail;
            self.enter(exec);
        }
        tracing::error!(
            code = %failure.code,
            business = failure.code.is_business(),
            failure = %failure,
            "execution failed"
        );
        ExecutionOutcome::Failure(failure)
    }
}
