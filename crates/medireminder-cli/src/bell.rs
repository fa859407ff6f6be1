use std::io::Write;

use medireminder_core::storage::AlertSound;
use medireminder_core::FeedbackSink;

/// Rings the terminal bell on each pulse, shaped by `ui.sound`.
#[derive(Debug, Clone, Copy)]
pub struct TerminalBell {
    sound: AlertSound,
}

impl TerminalBell {
    pub fn new(sound: AlertSound) -> Self {
        Self { sound }
    }

    /// Bells rung for pulse `n`. Soft rings on odd pulses only.
    fn rings(&self, n: u32) -> usize {
        match self.sound {
            AlertSound::Silent => 0,
            AlertSound::Soft => usize::from(n % 2 == 1),
            AlertSound::Default => 1,
            AlertSound::Urgent => 2,
        }
    }
}

impl FeedbackSink for TerminalBell {
    fn pulse(&self, n: u32) {
        let rings = self.rings(n);
        if rings == 0 {
            return;
        }
        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "{}", "\x07".repeat(rings));
        let _ = stderr.flush();
        tracing::trace!(pulse = n, rings, "bell");
    }
}
