use std::sync::Mutex;
use tracing::debug;

/// Performs a full navigation (page load) to an application path.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Keeps the visited paths in memory; for headless clients and tests.
#[derive(Debug, Default)]
pub struct MemoryNavigator {
    visited: Mutex<Vec<String>>,
}

impl MemoryNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn visited(&self) -> Vec<String> {
        self.visited
            .lock()
            .map(|visited| visited.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn last(&self) -> Option<String> {
        self.visited().pop()
    }
}

impl Navigator for MemoryNavigator {
    fn navigate(&self, path: &str) {
        debug!("Navigating to {path}");
        if let Ok(mut visited) = self.visited.lock() {
            visited.push(path.to_string());
        }
    }
}
