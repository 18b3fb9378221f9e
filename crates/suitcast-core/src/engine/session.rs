use chrono::{DateTime, FixedOffset, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Local hour range `[start_hour, end_hour)`; `end_hour` may be 24.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl SessionWindow {
    pub const fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }

    pub fn contains_hour(&self, hour: u32) -> bool {
        self.start_hour <= hour && hour < self.end_hour
    }

    pub fn label(&self) -> String {
        format!("{:02}h00 – {:02}h00", self.start_hour, self.end_hour)
    }
}

pub const DEFAULT_WINDOWS: [SessionWindow; 4] = [
    SessionWindow::new(1, 6),
    SessionWindow::new(9, 12),
    SessionWindow::new(15, 18),
    SessionWindow::new(21, 24),
];

pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 1;

/// Daily allow-list of hours during which predictions may be issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionWindows {
    windows: Vec<SessionWindow>,
    offset: FixedOffset,
}

impl SessionWindows {
    pub fn new(windows: Vec<SessionWindow>, offset: FixedOffset) -> Self {
        Self { windows, offset }
    }

    /// `None` when the offset is outside ±23 hours.
    pub fn with_offset_hours(windows: Vec<SessionWindow>, hours: i32) -> Option<Self> {
        FixedOffset::east_opt(hours.checked_mul(3_600)?).map(|offset| Self::new(windows, offset))
    }

    /// A single window spanning the whole day.
    pub fn always() -> Self {
        Self::new(vec![SessionWindow::new(0, 24)], Utc.fix())
    }

    pub fn local_hour(&self, now: DateTime<Utc>) -> u32 {
        now.with_timezone(&self.offset).hour()
    }

    pub fn current(&self, now: DateTime<Utc>) -> Option<SessionWindow> {
        let hour = self.local_hour(now);
        self.windows
            .iter()
            .copied()
            .find(|window| window.contains_hour(hour))
    }

    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.current(now).is_some()
    }

    pub fn windows(&self) -> &[SessionWindow] {
        &self.windows
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }
}

impl Default for SessionWindows {
    fn default() -> Self {
        Self::with_offset_hours(DEFAULT_WINDOWS.to_vec(), DEFAULT_UTC_OFFSET_HOURS)
            .unwrap_or_else(|| Self::new(DEFAULT_WINDOWS.to_vec(), Utc.fix()))
    }
}
