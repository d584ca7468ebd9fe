use std::time::Duration;

use crate::constants::CYCLE_TIME;

/// How the driver loop paces and supervises a machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Pause between two steps
    pub cycle_time: Duration,
    /// Keep the host alive after a fatal error so the user can reboot, instead of returning it
    pub reboot_on_fault: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cycle_time: CYCLE_TIME,
            reboot_on_fault: false,
        }
    }
}
