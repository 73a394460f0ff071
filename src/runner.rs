//! Readiness test runner
//!
//! `ReadinessTest` owns every piece of mutable test state: phase, pending
//! timers, the open stimulus and the event buffer. The host drives it with a
//! virtual millisecond clock measured from test start:
//!
//! - [`ReadinessTest::advance`] fires every timer due up to `now_ms`
//! - [`ReadinessTest::press`] is a click during the Go/No-Go block
//! - [`ReadinessTest::answer`] is a color choice during the Stroop block
//!
//! Phases run strictly `Idle → Block1Running → Block2Running → Finished`.
//! Finishing the Stroop block submits the buffered events to the backend.

use chrono::{DateTime, Duration, Utc};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::backend::ReadinessBackend;
use crate::classifier::classify;
use crate::config::TestConfig;
use crate::error::ReadinessError;
use crate::stimulus::StimulusGenerator;
use crate::timer::{TimerId, TimerQueue};
use crate::types::{
    BlockType, FinalizeResponse, ReadinessEvent, Response, Stimulus, StimulusColor,
};

/// Lifecycle of a test run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestPhase {
    Idle,
    Block1Running,
    Block2Running,
    Finished,
}

impl TestPhase {
    /// Block running in this phase
    pub fn block(&self) -> Option<BlockType> {
        match self {
            TestPhase::Block1Running => Some(BlockType::SustainedAttention),
            TestPhase::Block2Running => Some(BlockType::Stroop),
            TestPhase::Idle | TestPhase::Finished => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    /// Periodic Go/No-Go stimulus emitter
    GoTick,
    /// Go/No-Go response window expiry
    GoWindow,
    /// End of the Go/No-Go block
    GoBlockEnd,
    /// Start of a Stroop cycle (elapsed check, then stimulus)
    StroopCycle,
    /// Stroop response window expiry
    StroopWindow,
}

/// Stimulus currently waiting for a response
#[derive(Debug, Clone)]
pub struct OpenStimulus {
    pub block: BlockType,
    pub stimulus: Stimulus,
    pub shown_at_ms: u64,
    /// When the response window closes
    pub deadline_ms: u64,
    window_timer: TimerId,
}

/// A single readiness test run against a backend
pub struct ReadinessTest<B: ReadinessBackend> {
    config: TestConfig,
    backend: B,
    generator: StimulusGenerator,
    timers: TimerQueue<TimerKind>,
    phase: TestPhase,
    subject_id: Option<String>,
    session_id: Option<String>,
    started_at: DateTime<Utc>,
    now_ms: u64,
    block_started_ms: u64,
    open: Option<OpenStimulus>,
    events: Vec<ReadinessEvent>,
    stimuli_shown: u32,
    result: Option<FinalizeResponse>,
    last_error: Option<String>,
}

impl<B: ReadinessBackend> ReadinessTest<B> {
    /// Create an idle test; the config must pass [`TestConfig::validate`]
    pub fn new(config: TestConfig, backend: B) -> Result<Self, ReadinessError> {
        config.validate()?;
        let generator = match config.seed {
            Some(seed) => StimulusGenerator::seeded(seed, config.go_probability),
            None => StimulusGenerator::from_entropy(config.go_probability),
        };

        Ok(Self {
            config,
            backend,
            generator,
            timers: TimerQueue::new(),
            phase: TestPhase::Idle,
            subject_id: None,
            session_id: None,
            started_at: Utc::now(),
            now_ms: 0,
            block_started_ms: 0,
            open: None,
            events: Vec::new(),
            stimuli_shown: 0,
            result: None,
            last_error: None,
        })
    }

    /// Open a session for `subject_id` and start the Go/No-Go block now
    pub fn start(&mut self, subject_id: &str) -> Result<String, ReadinessError> {
        self.start_at(subject_id, Utc::now())
    }

    /// Like [`start`](Self::start) with an explicit wall-clock origin for event timestamps
    pub fn start_at(
        &mut self,
        subject_id: &str,
        started_at: DateTime<Utc>,
    ) -> Result<String, ReadinessError> {
        if self.phase != TestPhase::Idle {
            return Err(ReadinessError::InvalidTransition(format!(
                "cannot start a test while {:?}",
                self.phase
            )));
        }

        let subject_id = subject_id.trim();
        if subject_id.is_empty() {
            self.last_error = Some(ReadinessError::MissingSubject.to_string());
            return Err(ReadinessError::MissingSubject);
        }

        let session_id = match self.backend.create_session(subject_id) {
            Ok(id) => id,
            Err(e) => {
                error!("failed to open readiness session for {}: {}", subject_id, e);
                self.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        info!("readiness session {} started for {}", session_id, subject_id);
        self.subject_id = Some(subject_id.to_string());
        self.session_id = Some(session_id.clone());
        self.started_at = started_at;
        self.now_ms = 0;
        self.events.clear();
        self.stimuli_shown = 0;
        self.result = None;
        self.last_error = None;

        self.begin_sustained_attention(0);
        Ok(session_id)
    }

    /// Fire every timer due at or before `now_ms`
    ///
    /// Returns an error only when finalization fails during this call.
    pub fn advance(&mut self, now_ms: u64) -> Result<(), ReadinessError> {
        let now_ms = now_ms.max(self.now_ms);
        let mut outcome = Ok(());

        while let Some((due_ms, kind)) = self.timers.pop_due(now_ms) {
            self.now_ms = due_ms;
            if let Err(e) = self.dispatch(kind) {
                outcome = Err(e);
            }
        }

        self.now_ms = now_ms;
        outcome
    }

    /// Click at `now_ms`. Returns whether the click was recorded.
    pub fn press(&mut self, now_ms: u64) -> Result<bool, ReadinessError> {
        self.advance(now_ms)?;

        if self.phase.block() != Some(BlockType::SustainedAttention) {
            return Ok(false);
        }
        let Some(open) = self.open.take() else {
            debug!("click at {} ms with no stimulus on screen", now_ms);
            return Ok(false);
        };

        self.timers.cancel(open.window_timer);
        self.record(open, Some(Response::Click));
        Ok(true)
    }

    /// Color choice at `now_ms`. Returns whether the answer was recorded.
    pub fn answer(&mut self, color: StimulusColor, now_ms: u64) -> Result<bool, ReadinessError> {
        self.advance(now_ms)?;

        if self.phase.block() != Some(BlockType::Stroop) {
            return Ok(false);
        }
        let Some(open) = self.open.take() else {
            return Ok(false);
        };

        self.timers.cancel(open.window_timer);
        self.record(open, Some(Response::Color(color)));
        self.schedule_after(self.config.stroop_gap_ms, TimerKind::StroopCycle);
        Ok(true)
    }

    /// Resubmit the retained events after a failed finalization
    pub fn retry_finalize(&mut self) -> Result<&FinalizeResponse, ReadinessError> {
        if self.phase != TestPhase::Finished {
            return Err(ReadinessError::InvalidTransition(
                "events can only be submitted after the Stroop block".to_string(),
            ));
        }
        if self.result.is_some() {
            return Err(ReadinessError::InvalidTransition(
                "session already finalized".to_string(),
            ));
        }
        self.finalize()?;
        self.result.as_ref().ok_or(ReadinessError::MissingSession)
    }

    /// Drop all pending timers and return to `Idle` (component teardown)
    pub fn teardown(&mut self) {
        if self.phase != TestPhase::Idle {
            info!("readiness test torn down while {:?}", self.phase);
        }
        self.timers.clear();
        self.open = None;
        self.phase = TestPhase::Idle;
        self.subject_id = None;
        self.session_id = None;
        self.events.clear();
        self.stimuli_shown = 0;
        self.result = None;
        self.last_error = None;
    }

    pub fn phase(&self) -> TestPhase {
        self.phase
    }

    pub fn config(&self) -> &TestConfig {
        &self.config
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn subject_id(&self) -> Option<&str> {
        self.subject_id.as_deref()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn events(&self) -> &[ReadinessEvent] {
        &self.events
    }

    pub fn stimuli_shown(&self) -> u32 {
        self.stimuli_shown
    }

    pub fn current_stimulus(&self) -> Option<&OpenStimulus> {
        self.open.as_ref()
    }

    /// Next instant at which a timer fires
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.next_due()
    }

    pub fn result(&self) -> Option<&FinalizeResponse> {
        self.result.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    fn dispatch(&mut self, kind: TimerKind) -> Result<(), ReadinessError> {
        match kind {
            TimerKind::GoTick => {
                self.show_go_no_go();
                self.schedule_after(self.config.go_interval_ms, TimerKind::GoTick);
            }
            TimerKind::GoWindow => self.expire_open(),
            TimerKind::GoBlockEnd => {
                self.expire_open();
                // Tick, window and block-end timers go together
                self.timers.clear();
                self.begin_stroop(self.now_ms);
            }
            TimerKind::StroopCycle => {
                let elapsed = self.now_ms.saturating_sub(self.block_started_ms);
                if elapsed >= self.config.stroop_block_ms {
                    return self.finish();
                }
                self.show_stroop();
            }
            TimerKind::StroopWindow => {
                self.expire_open();
                self.schedule_after(self.config.stroop_gap_ms, TimerKind::StroopCycle);
            }
        }
        Ok(())
    }

    fn begin_sustained_attention(&mut self, at_ms: u64) {
        self.phase = TestPhase::Block1Running;
        self.block_started_ms = at_ms;
        self.timers
            .schedule(at_ms.saturating_add(self.config.go_block_ms), TimerKind::GoBlockEnd);
        self.timers
            .schedule(at_ms.saturating_add(self.config.go_interval_ms), TimerKind::GoTick);
        debug!("sustained-attention block started at {} ms", at_ms);
    }

    fn begin_stroop(&mut self, at_ms: u64) {
        info!(
            "sustained-attention block done with {} events, starting Stroop",
            self.events.len()
        );
        self.phase = TestPhase::Block2Running;
        self.block_started_ms = at_ms;
        self.timers.schedule(at_ms, TimerKind::StroopCycle);
    }

    fn show_go_no_go(&mut self) {
        // Windows are shorter than the tick interval; a leftover is a timeout
        self.expire_open();
        let stimulus = self.generator.next_go_no_go();
        self.show(
            BlockType::SustainedAttention,
            stimulus,
            self.config.go_window_ms,
            TimerKind::GoWindow,
        );
    }

    fn show_stroop(&mut self) {
        let stimulus = self.generator.next_stroop();
        self.show(
            BlockType::Stroop,
            stimulus,
            self.config.stroop_window_ms,
            TimerKind::StroopWindow,
        );
    }

    fn show(&mut self, block: BlockType, stimulus: Stimulus, window_ms: u64, expiry: TimerKind) {
        let deadline_ms = self.now_ms.saturating_add(window_ms);
        let window_timer = self.timers.schedule(deadline_ms, expiry);
        self.stimuli_shown += 1;
        self.open = Some(OpenStimulus {
            block,
            stimulus,
            shown_at_ms: self.now_ms,
            deadline_ms,
            window_timer,
        });
    }

    fn schedule_after(&mut self, delay_ms: u64, kind: TimerKind) {
        self.timers.schedule(self.now_ms.saturating_add(delay_ms), kind);
    }

    /// Record the open stimulus, if any, as a non-response
    fn expire_open(&mut self) {
        if let Some(open) = self.open.take() {
            self.timers.cancel(open.window_timer);
            self.record(open, None);
        }
    }

    fn record(&mut self, open: OpenStimulus, observed: Option<Response>) {
        let Some(session_id) = self.session_id.clone() else {
            return;
        };
        let expected = open.stimulus.expected_response();
        let classification = classify(open.block, expected, observed);
        let elapsed_ms = self.now_ms.saturating_sub(open.shown_at_ms);
        let reaction_time_ms = observed.map(|_| u32::try_from(elapsed_ms).unwrap_or(u32::MAX));
        let timestamp = self.timestamp(self.now_ms);

        self.events.push(ReadinessEvent {
            session_id,
            block_type: open.block,
            timestamp,
            stimulus_type: open.stimulus.kind,
            stimulus_value: open.stimulus.value,
            stimulus_color: open.stimulus.color,
            expected_response: expected,
            observed_response: observed,
            reaction_time_ms,
            is_correct: classification.is_correct,
            error_type: classification.error_type,
        });
    }

    fn timestamp(&self, offset_ms: u64) -> DateTime<Utc> {
        Duration::from_std(std::time::Duration::from_millis(offset_ms))
            .ok()
            .and_then(|offset| self.started_at.checked_add_signed(offset))
            .unwrap_or(self.started_at)
    }

    fn finish(&mut self) -> Result<(), ReadinessError> {
        self.timers.clear();
        self.open = None;
        self.phase = TestPhase::Finished;
        info!(
            "readiness test finished: {} stimuli, {} events",
            self.stimuli_shown,
            self.events.len()
        );
        self.finalize()
    }

    fn finalize(&mut self) -> Result<(), ReadinessError> {
        let Some(session_id) = self.session_id.clone() else {
            error!("finalization requested without a session id");
            self.last_error = Some(ReadinessError::MissingSession.to_string());
            return Err(ReadinessError::MissingSession);
        };

        match self.backend.finalize_session(&session_id, &self.events) {
            Ok(response) => {
                info!(
                    "session {} scored {:.1} ({})",
                    session_id,
                    response.score,
                    response.risk_level.as_str()
                );
                self.result = Some(response);
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                error!("failed to finalize session {}: {}", session_id, e);
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }
}
