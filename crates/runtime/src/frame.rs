use foundation::time::Time;

/// Animation-loop frame metadata.
///
/// Hosts drive the loop with their own timestamps; `dt_s` is derived from the
/// gap to the previous frame and never goes negative.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Seconds since the previous frame (0 for the first).
    pub dt_s: f64,
    /// Host time at the start of the frame.
    pub time: Time,
}

impl Frame {
    pub fn first(time: Time) -> Self {
        Self {
            index: 0,
            dt_s: 0.0,
            time,
        }
    }

    /// The frame following `self`, starting at host time `time`.
    pub fn next_at(self, time: Time) -> Self {
        Self {
            index: self.index + 1,
            dt_s: time.since(self.time).max(0.0),
            time,
        }
    }
}
