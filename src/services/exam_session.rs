use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use tokio::{
    sync::broadcast,
    task::JoinHandle,
    time::{self, Instant},
};

use crate::{
    errors::{AppError, AppResult, ErrorResponse},
    models::{
        domain::{Language, Question, QuestionVerdict, SessionResult, TestDefinition},
        dto::request::HintRequest,
    },
    repositories::SessionResultRepository,
    services::{
        code_buffer::CodeBufferStore,
        execution_service::CodeExecutor,
        hint_policy::{HintPolicy, HintState, HintTransition, HINT_UNLOCK_THRESHOLD},
        hint_service::{Hint, HintGenerator, HintService, HINT_EXAMPLE_LIMIT},
        scoring_service::{ScoringService, SubmissionDraft},
        session_timer::{SessionTimer, TimeWarning, TimerEvent, TICK_INTERVAL_MS},
        test_runner::TestCaseRunner,
    },
};

pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// External collaborators of a session.
#[derive(Clone)]
pub struct SessionServices {
    pub executor: Arc<dyn CodeExecutor>,
    pub hint_generator: Arc<dyn HintGenerator>,
    pub results: Arc<dyn SessionResultRepository>,
}

#[derive(Clone, Debug)]
pub enum SessionEvent {
    Tick {
        remaining_seconds: u32,
    },
    Warning(TimeWarning),
    TimeExpired,
    Navigated {
        index: usize,
        question_id: i64,
    },
    LanguageChanged(Language),
    RunStarted {
        question_id: i64,
        total_cases: usize,
    },
    TestCaseFinished {
        question_id: i64,
        index: usize,
        total_cases: usize,
        passed: bool,
    },
    VerdictUpdated {
        question_id: i64,
        verdict: QuestionVerdict,
    },
    HintUnlocked {
        question_id: i64,
    },
    HintReady {
        question_id: i64,
        hint: Hint,
    },
    Submitted {
        result: SessionResult,
    },
    SubmissionFailed {
        auto_submit: bool,
        error: ErrorResponse,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitTrigger {
    /// The attendee pressed submit; `confirmed` records the confirmation prompt.
    Manual { confirmed: bool },
    /// The clock ran out.
    Timer,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted(SessionResult),
    AlreadySubmitted,
    InProgress,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Committed(QuestionVerdict),
    /// The session was submitted or closed while the run was in flight.
    Discarded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickStatus {
    Running,
    Finished,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub remaining_seconds: u32,
    pub active_index: usize,
    pub language: Language,
    pub attempted_questions: usize,
    pub running: bool,
    pub submitted: bool,
}

struct SessionState {
    timer: SessionTimer,
    active_index: usize,
    buffers: CodeBufferStore,
    verdicts: Vec<Option<QuestionVerdict>>,
    hints: HintPolicy,
    running: Option<usize>,
    submitting: bool,
    submitted: bool,
    closed: bool,
}

impl SessionState {
    fn ensure_open(&self) -> AppResult<()> {
        if self.submitted {
            return Err(AppError::SessionClosed("the attempt was already submitted".to_string()));
        }
        if self.closed {
            return Err(AppError::SessionClosed("the session was closed".to_string()));
        }
        if self.timer.is_expired() {
            return Err(AppError::SessionClosed("time is up".to_string()));
        }
        Ok(())
    }

    /// Whether a finished run may still change the verdicts that get submitted.
    fn accepts_results(&self) -> bool {
        !(self.closed || self.submitted || self.submitting || self.timer.is_expired())
    }
}

struct SessionInner {
    attendee_id: String,
    test: TestDefinition,
    runner: TestCaseRunner,
    hints: HintService,
    scoring: ScoringService,
    state: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl SessionInner {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn stop_ticker(&self) {
        let handle = self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

/// Clears the in-flight marker when a run finishes or its future is dropped.
struct RunGuard<'a> {
    inner: &'a SessionInner,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.inner.state().running = None;
    }
}

/// One attendee's attempt at one test. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ExamSession {
    inner: Arc<SessionInner>,
}

impl ExamSession {
    pub fn new(
        attendee_id: impl Into<String>,
        test: TestDefinition,
        language: Language,
        services: SessionServices,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let question_count = test.questions.len();

        let state = SessionState {
            timer: SessionTimer::new(test.duration_seconds()),
            active_index: 0,
            buffers: CodeBufferStore::new(language, &test.questions),
            verdicts: vec![None; question_count],
            hints: HintPolicy::new(question_count),
            running: None,
            submitting: false,
            submitted: false,
            closed: false,
        };

        Self {
            inner: Arc::new(SessionInner {
                attendee_id: attendee_id.into(),
                test,
                runner: TestCaseRunner::new(services.executor),
                hints: HintService::new(services.hint_generator),
                scoring: ScoringService::new(services.results),
                state: Mutex::new(state),
                events,
                ticker: Mutex::new(None),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn attendee_id(&self) -> &str {
        &self.inner.attendee_id
    }

    pub fn test(&self) -> &TestDefinition {
        &self.inner.test
    }

    pub fn time_remaining(&self) -> u32 {
        self.inner.state().timer.remaining()
    }

    pub fn language(&self) -> Language {
        self.inner.state().buffers.language()
    }

    pub fn active_index(&self) -> usize {
        self.inner.state().active_index
    }

    pub fn active_question(&self) -> &Question {
        let index = self.active_index();
        &self.inner.test.questions[index]
    }

    pub fn is_submitted(&self) -> bool {
        self.inner.state().submitted
    }

    pub fn is_running(&self) -> bool {
        self.inner.state().running.is_some()
    }

    pub fn verdict(&self, question_id: i64) -> Option<QuestionVerdict> {
        let index = self.inner.test.question_index(question_id)?;
        self.inner.state().verdicts[index].clone()
    }

    pub fn hint_state(&self, question_id: i64) -> Option<HintState> {
        let index = self.inner.test.question_index(question_id)?;
        self.inner.state().hints.state(index).cloned()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.state();
        SessionSnapshot {
            remaining_seconds: state.timer.remaining(),
            active_index: state.active_index,
            language: state.buffers.language(),
            attempted_questions: state.verdicts.iter().flatten().count(),
            running: state.running.is_some(),
            submitted: state.submitted,
        }
    }

    /// Starts the one-second countdown on the current tokio runtime.
    pub fn start_timer(&self) {
        let mut ticker = self
            .inner
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if ticker.is_some() {
            return;
        }
        *ticker = Some(tokio::spawn(run_ticker(Arc::downgrade(&self.inner))));
    }

    /// Stops the timer and refuses every further command or late result.
    pub fn close(&self) {
        {
            let mut state = self.inner.state();
            if state.closed {
                return;
            }
            state.closed = true;
        }
        self.inner.stop_ticker();
        log::info!(
            "Closed session of attendee {} on test {}",
            self.inner.attendee_id,
            self.inner.test.id
        );
    }

    /// Advances the clock by one second. Expiry submits the attempt; while
    /// that submission keeps failing, later ticks retry it.
    pub async fn tick(&self) -> AppResult<TickStatus> {
        let (tick, retry_submit) = {
            let mut state = self.inner.state();
            if state.closed || state.submitted {
                return Ok(TickStatus::Finished);
            }
            if state.timer.is_expired() {
                (None, true)
            } else {
                let event = state.timer.tick();
                (Some((state.timer.remaining(), event)), false)
            }
        };

        let mut expired = retry_submit;
        if let Some((remaining_seconds, event)) = tick {
            self.inner.emit(SessionEvent::Tick { remaining_seconds });
            match event {
                Some(TimerEvent::Warning(warning)) => {
                    log::info!(
                        "Test {}: {:?} for attendee {}",
                        self.inner.test.id,
                        warning,
                        self.inner.attendee_id
                    );
                    self.inner.emit(SessionEvent::Warning(warning));
                }
                Some(TimerEvent::Expired) => {
                    log::info!(
                        "Time expired for attendee {} on test {}, auto-submitting",
                        self.inner.attendee_id,
                        self.inner.test.id
                    );
                    self.inner.emit(SessionEvent::TimeExpired);
                    expired = true;
                }
                None => {}
            }
        }

        if !expired {
            return Ok(TickStatus::Running);
        }

        match self.submit(SubmitTrigger::Timer).await? {
            SubmitOutcome::InProgress => Ok(TickStatus::Running),
            SubmitOutcome::Submitted(_) | SubmitOutcome::AlreadySubmitted => {
                Ok(TickStatus::Finished)
            }
        }
    }

    pub fn navigate(&self, index: usize) -> AppResult<()> {
        let question_id = {
            let mut state = self.inner.state();
            state.ensure_open()?;
            let question = self.inner.test.questions.get(index).ok_or_else(|| {
                AppError::ValidationError(format!("Question index {} is out of range", index))
            })?;
            if state.active_index == index {
                return Ok(());
            }
            let previous = state.active_index;
            state.hints.reset_failures(previous);
            state.active_index = index;
            question.id
        };

        self.inner
            .emit(SessionEvent::Navigated { index, question_id });
        Ok(())
    }

    /// Moves forward; a no-op on the last question.
    pub fn next(&self) -> AppResult<()> {
        let index = self.active_index();
        if index + 1 < self.inner.test.questions.len() {
            self.navigate(index + 1)
        } else {
            Ok(())
        }
    }

    /// Moves back; a no-op on the first question.
    pub fn previous(&self) -> AppResult<()> {
        match self.active_index() {
            0 => Ok(()),
            index => self.navigate(index - 1),
        }
    }

    pub fn code(&self, question_id: i64) -> AppResult<String> {
        let index = self.index_of(question_id)?;
        self.inner
            .state()
            .buffers
            .get_code(index)
            .ok_or_else(|| AppError::NotFound(format!("No buffer for question {}", question_id)))
    }

    pub fn set_code(&self, question_id: i64, code: impl Into<String>) -> AppResult<()> {
        let index = self.index_of(question_id)?;
        let mut state = self.inner.state();
        state.ensure_open()?;
        state.buffers.set_code(index, code.into());
        Ok(())
    }

    /// Changes the target language. Every buffer is reset to the new
    /// language's starter template, discarding all edits.
    pub fn switch_language(&self, language: Language) -> AppResult<()> {
        {
            let mut state = self.inner.state();
            state.ensure_open()?;
            if state.buffers.language() == language {
                return Ok(());
            }
            state.buffers.switch_language(language);
        }

        log::info!(
            "Attendee {} switched to {}, all buffers reset",
            self.inner.attendee_id,
            language
        );
        self.inner.emit(SessionEvent::LanguageChanged(language));
        Ok(())
    }

    /// Runs the active question's buffer against all of its test cases.
    pub async fn run(&self) -> AppResult<RunOutcome> {
        let (index, question, code, language) = {
            let mut state = self.inner.state();
            state.ensure_open()?;
            if state.submitting {
                return Err(AppError::SessionClosed(
                    "the attempt is being submitted".to_string(),
                ));
            }
            if let Some(running) = state.running {
                return Err(AppError::RunInProgress(self.inner.test.questions[running].id));
            }

            let index = state.active_index;
            let question = &self.inner.test.questions[index];
            let language = state.buffers.language();
            let code = state.buffers.get_code(index).unwrap_or_default();
            TestCaseRunner::precheck(question, language, &code)?;

            state.running = Some(index);
            (index, question, code, language)
        };
        let guard = RunGuard { inner: &self.inner };

        let question_id = question.id;
        let total_cases = question.test_cases.len();
        self.inner.emit(SessionEvent::RunStarted {
            question_id,
            total_cases,
        });

        let events = self.inner.events.clone();
        let verdict = self
            .inner
            .runner
            .run(question, language, &code, |case_index, outcome| {
                let _ = events.send(SessionEvent::TestCaseFinished {
                    question_id,
                    index: case_index,
                    total_cases,
                    passed: outcome.passed(),
                });
            })
            .await;

        let transition = {
            let mut state = self.inner.state();
            if !state.accepts_results() {
                log::info!(
                    "Discarding late verdict for question {}: session no longer accepts results",
                    question_id
                );
                return Ok(RunOutcome::Discarded);
            }
            state.verdicts[index] = Some(verdict.clone());
            state.hints.record_verdict(index, verdict.all_passed)
        };
        drop(guard);

        self.inner.emit(SessionEvent::VerdictUpdated {
            question_id,
            verdict: verdict.clone(),
        });

        if transition == HintTransition::Unlocked {
            log::info!(
                "Hint unlocked for question {} after {} consecutive failures",
                question_id,
                HINT_UNLOCK_THRESHOLD
            );
            self.inner
                .emit(SessionEvent::HintUnlocked { question_id });
        }

        let claimed = self.inner.state().hints.begin_hint_request(index);
        if claimed {
            self.fetch_hint(index).await;
        }

        Ok(RunOutcome::Committed(verdict))
    }

    /// Returns the active question's hint, generating it if necessary.
    /// `None` means another request is already generating it; the hint
    /// arrives as `SessionEvent::HintReady`.
    pub async fn request_hint(&self) -> AppResult<Option<Hint>> {
        let index = {
            let mut state = self.inner.state();
            state.ensure_open()?;
            let index = state.active_index;
            if !state.hints.is_unlocked(index) {
                return Err(AppError::ValidationError(format!(
                    "The hint unlocks after {} consecutive failed runs",
                    HINT_UNLOCK_THRESHOLD
                )));
            }
            if let Some(hint) = state.hints.state(index).and_then(|s| s.hint.clone()) {
                return Ok(Some(hint));
            }
            if !state.hints.begin_hint_request(index) {
                return Ok(None);
            }
            index
        };

        self.fetch_hint(index)
            .await
            .map(Some)
            .ok_or_else(|| AppError::SessionClosed("the session ended before the hint arrived".to_string()))
    }

    /// Caller must have claimed the request with `begin_hint_request`.
    async fn fetch_hint(&self, index: usize) -> Option<Hint> {
        let question = self.inner.test.questions.get(index)?;
        let request = HintRequest {
            question_id: question.id,
            description: question.description.clone(),
            function_signature: question.function_name.clone(),
            examples: question
                .test_cases
                .iter()
                .take(HINT_EXAMPLE_LIMIT)
                .cloned()
                .collect(),
        };

        let hint = self.inner.hints.hint_for(&request).await;

        {
            let mut state = self.inner.state();
            if state.closed || state.submitted {
                return None;
            }
            state.hints.set_hint(index, hint.clone());
        }

        self.inner.emit(SessionEvent::HintReady {
            question_id: question.id,
            hint: hint.clone(),
        });
        Some(hint)
    }

    /// Scores and persists the attempt exactly once. A failed write leaves
    /// the session open so the caller can retry.
    pub async fn submit(&self, trigger: SubmitTrigger) -> AppResult<SubmitOutcome> {
        if trigger == (SubmitTrigger::Manual { confirmed: false }) {
            return Err(AppError::ValidationError(
                "Submission must be confirmed by the attendee".to_string(),
            ));
        }
        let auto_submit = trigger == SubmitTrigger::Timer;

        let result = {
            let mut state = self.inner.state();
            if state.submitted {
                return Ok(SubmitOutcome::AlreadySubmitted);
            }
            if state.submitting {
                return Ok(SubmitOutcome::InProgress);
            }
            if state.closed {
                return Err(AppError::SessionClosed("the session was closed".to_string()));
            }
            state.submitting = true;

            ScoringService::build_result(SubmissionDraft {
                attendee_id: &self.inner.attendee_id,
                test: &self.inner.test,
                verdicts: &state.verdicts,
                language: state.buffers.language(),
                time_spent: state.timer.elapsed(),
                auto_submit,
            })
        };

        match self.inner.scoring.persist(result).await {
            Ok(saved) => {
                {
                    let mut state = self.inner.state();
                    state.submitting = false;
                    state.submitted = true;
                }
                self.inner.stop_ticker();
                self.inner.emit(SessionEvent::Submitted {
                    result: saved.clone(),
                });
                Ok(SubmitOutcome::Submitted(saved))
            }
            Err(e) => {
                self.inner.state().submitting = false;
                self.inner.emit(SessionEvent::SubmissionFailed {
                    auto_submit,
                    error: ErrorResponse::from(&e),
                });
                Err(e)
            }
        }
    }

    fn index_of(&self, question_id: i64) -> AppResult<usize> {
        self.inner
            .test
            .question_index(question_id)
            .ok_or_else(|| AppError::NotFound(format!("Question {} is not in this test", question_id)))
    }
}

async fn run_ticker(session: Weak<SessionInner>) {
    let period = Duration::from_millis(TICK_INTERVAL_MS);
    let mut interval = time::interval_at(Instant::now() + period, period);

    loop {
        interval.tick().await;

        // every handle dropped: the session is gone
        let Some(inner) = session.upgrade() else {
            break;
        };

        match (ExamSession { inner }).tick().await {
            Ok(TickStatus::Running) => {}
            Ok(TickStatus::Finished) => break,
            Err(e) if e.is_retryable() => {
                log::warn!("Auto-submission failed, retrying on next tick: {}", e)
            }
            Err(e) => {
                log::error!("Auto-submission failed permanently, stopping timer: {}", e);
                break;
            }
        }
    }
}
