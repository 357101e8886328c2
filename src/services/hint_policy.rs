use crate::services::hint_service::Hint;

/// Consecutive failing runs that unlock a question's hint.
pub const HINT_UNLOCK_THRESHOLD: u32 = 3;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HintState {
    pub consecutive_failures: u32,
    pub unlocked: bool,
    /// A hint request is in flight; further callers wait for `HintReady`.
    pub hint_pending: bool,
    pub hint: Option<Hint>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HintTransition {
    Unchanged,
    Unlocked,
}

/// Per-question `Locked -> Unlocked` state machine, indexed like the test's
/// question list. An unlocked question never re-locks.
#[derive(Clone, Debug)]
pub struct HintPolicy {
    states: Vec<HintState>,
}

impl HintPolicy {
    pub fn new(question_count: usize) -> Self {
        Self {
            states: vec![HintState::default(); question_count],
        }
    }

    pub fn state(&self, index: usize) -> Option<&HintState> {
        self.states.get(index)
    }

    pub fn record_verdict(&mut self, index: usize, all_passed: bool) -> HintTransition {
        let Some(state) = self.states.get_mut(index) else {
            return HintTransition::Unchanged;
        };

        if all_passed {
            state.consecutive_failures = 0;
            return HintTransition::Unchanged;
        }

        state.consecutive_failures += 1;
        if !state.unlocked && state.consecutive_failures >= HINT_UNLOCK_THRESHOLD {
            state.unlocked = true;
            return HintTransition::Unlocked;
        }

        HintTransition::Unchanged
    }

    /// Called when the attendee navigates away from the question.
    pub fn reset_failures(&mut self, index: usize) {
        if let Some(state) = self.states.get_mut(index) {
            state.consecutive_failures = 0;
        }
    }

    pub fn is_unlocked(&self, index: usize) -> bool {
        self.states.get(index).map(|s| s.unlocked).unwrap_or(false)
    }

    /// Claims the single hint request for an unlocked question. Returns false
    /// when the question is locked, already has a hint, or a request is in flight.
    pub fn begin_hint_request(&mut self, index: usize) -> bool {
        match self.states.get_mut(index) {
            Some(state) if state.unlocked && state.hint.is_none() && !state.hint_pending => {
                state.hint_pending = true;
                true
            }
            _ => false,
        }
    }

    pub fn set_hint(&mut self, index: usize, hint: Hint) {
        if let Some(state) = self.states.get_mut(index) {
            if state.unlocked {
                state.hint = Some(hint);
                state.hint_pending = false;
            }
        }
    }
}
