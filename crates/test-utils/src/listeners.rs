use std::sync::{Arc, Mutex};

use obsidia::logs::{LogEvent, LogListener, LogOrigin};

/// Records every line it receives, in delivery order.
#[derive(Debug, Default, Clone)]
pub struct RecordingListener {
    events: Arc<Mutex<Vec<LogEvent>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.line).collect()
    }

    /// Lines that came from the server's stdout.
    pub fn console_lines(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.origin == LogOrigin::Console)
            .map(|e| e.line)
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.events().iter().any(|e| e.line.contains(needle))
    }
}

impl LogListener for RecordingListener {
    fn receive(&self, event: &LogEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn name(&self) -> &str {
        "recording"
    }
}
