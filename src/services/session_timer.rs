use serde::Serialize;

pub const TICK_INTERVAL_MS: u64 = 1000;
pub const FIVE_MINUTE_MARK: u32 = 300;
pub const ONE_MINUTE_MARK: u32 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWarning {
    FiveMinutesLeft,
    OneMinuteLeft,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerEvent {
    Warning(TimeWarning),
    Expired,
}

/// Countdown for one attempt. Each threshold event fires at most once.
#[derive(Clone, Debug)]
pub struct SessionTimer {
    total_seconds: u32,
    remaining_seconds: u32,
    warned_five: bool,
    warned_one: bool,
    expired: bool,
}

impl SessionTimer {
    pub fn new(total_seconds: u32) -> Self {
        Self {
            total_seconds,
            remaining_seconds: total_seconds,
            warned_five: false,
            warned_one: false,
            expired: total_seconds == 0,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn elapsed(&self) -> u32 {
        self.total_seconds - self.remaining_seconds
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Advances the clock by one second. A halted clock does nothing.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        if self.expired {
            return None;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);

        match self.remaining_seconds {
            0 => {
                self.expired = true;
                Some(TimerEvent::Expired)
            }
            FIVE_MINUTE_MARK if !self.warned_five => {
                self.warned_five = true;
                Some(TimerEvent::Warning(TimeWarning::FiveMinutesLeft))
            }
            ONE_MINUTE_MARK if !self.warned_one => {
                self.warned_one = true;
                Some(TimerEvent::Warning(TimeWarning::OneMinuteLeft))
            }
            _ => None,
        }
    }
}

/// `m:ss`
pub fn format_remaining(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
