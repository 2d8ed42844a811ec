/// Elapsed/total time and the 0-100 progress figure shown in the UI.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Progress {
    /// Seconds
    pub elapsed: f64,
    /// Seconds
    pub total: f64,
    /// 0.0 -> 100.0
    pub percent: f64,
}

impl Progress {
    pub fn new(total: f64) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn on_tick(&mut self, total: f64, remaining: f64) {
        self.total = total;
        self.elapsed = total - remaining;
        self.percent = percent(self.elapsed, total);
    }

    pub fn finish(&mut self) {
        self.percent = 100.0;
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.percent = 0.0;
    }

    pub fn elapsed_label(&self) -> String {
        format_time(self.elapsed)
    }

    pub fn total_label(&self) -> String {
        format_time(self.total)
    }
}

/// `elapsed / total` as a percentage clamped to 0-100. A zero or undefined
/// total reports 0.
pub fn percent(elapsed: f64, total: f64) -> f64 {
    if !total.is_finite() || !elapsed.is_finite() || total <= 0.0 {
        return 0.0;
    }
    (elapsed / total * 100.0).clamp(0.0, 100.0)
}

/// Formats seconds as `mm:ss`. Negative or undefined input renders as `00:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "00:00".to_string();
    }
    let minutes = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).round() as u64;
    format!("{:02}:{:02}", minutes, secs)
}
