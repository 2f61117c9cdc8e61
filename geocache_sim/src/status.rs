use std::fmt;

use bevy::prelude::Resource;

/// Line shown in the status panel.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusMessage {
    #[default]
    NoPoints,
    Carrying(u32),
    Merged(u32),
    Won(u32),
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusMessage::NoPoints => f.write_str("No points yet..."),
            StatusMessage::Carrying(value) => write!(f, "You are carrying: {value}"),
            StatusMessage::Merged(value) => write!(f, "Merged! Cache now holds {value}"),
            StatusMessage::Won(value) => write!(f, "You win! A cache reached {value}"),
        }
    }
}

impl StatusMessage {
    /// Status after a restore or a pick-up.
    pub fn for_inventory(inventory: u32) -> Self {
        if inventory == 0 {
            StatusMessage::NoPoints
        } else {
            StatusMessage::Carrying(inventory)
        }
    }
}

/// Win bookkeeping. Reaching the goal never ends the session.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WinState {
    pub achieved: bool,
    /// One per merge whose result met the goal.
    pub signals: u32,
    pub best_value: u32,
}

impl WinState {
    pub fn record_merge(&mut self, value: u32, goal_reached: bool) {
        self.best_value = self.best_value.max(value);
        if goal_reached {
            self.achieved = true;
            self.signals += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_panel_text() {
        assert_eq!(StatusMessage::NoPoints.to_string(), "No points yet...");
        assert_eq!(StatusMessage::Carrying(4).to_string(), "You are carrying: 4");
        assert_eq!(
            StatusMessage::Merged(8).to_string(),
            "Merged! Cache now holds 8"
        );
        assert_eq!(
            StatusMessage::Won(32).to_string(),
            "You win! A cache reached 32"
        );
    }

    #[test]
    fn inventory_status() {
        assert_eq!(StatusMessage::for_inventory(0), StatusMessage::NoPoints);
        assert_eq!(StatusMessage::for_inventory(8), StatusMessage::Carrying(8));
    }

    #[test]
    fn win_counts_each_qualifying_merge() {
        let mut win = WinState::default();
        win.record_merge(8, false);
        assert!(!win.achieved);
        win.record_merge(32, true);
        win.record_merge(64, true);
        assert!(win.achieved);
        assert_eq!(win.signals, 2);
        assert_eq!(win.best_value, 64);
    }
}
