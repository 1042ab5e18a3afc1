use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Tracks page visibility and decides which changes count as a tab switch.
#[derive(Debug, Clone)]
pub struct VisibilityWatcher {
    current: Visibility,
}

impl Default for VisibilityWatcher {
    fn default() -> Self {
        Self {
            current: Visibility::Visible,
        }
    }
}

impl VisibilityWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Visibility {
        self.current
    }

    /// Returns true when the change is a visible → hidden transition that must be counted.
    pub fn observe(&mut self, next: Visibility, monitoring: bool) -> bool {
        let previous = self.current;
        self.current = next;
        let switched = previous == Visibility::Visible && next == Visibility::Hidden;
        if switched && !monitoring {
            debug!("Page hidden while not monitoring, ignored");
        }
        switched && monitoring
    }
}
