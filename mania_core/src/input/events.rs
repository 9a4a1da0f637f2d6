use crate::config::KeyCode;
use crate::time::Millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    /// Wall time of the event on the same timeline passed to `Session::tick`.
    pub timestamp: Millis,
    pub key: KeyCode,
    pub pressed: bool,
}

impl InputEvent {
    pub fn press(timestamp: Millis, key: KeyCode) -> Self {
        Self {
            timestamp,
            key,
            pressed: true,
        }
    }

    pub fn release(timestamp: Millis, key: KeyCode) -> Self {
        Self {
            timestamp,
            key,
            pressed: false,
        }
    }
}
