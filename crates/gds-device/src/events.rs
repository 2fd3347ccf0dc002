/// Lifecycle notifications raised by a [`crate::GdsDevice`].
///
/// Flag-backed events (`Connected`, `Disconnected`, `Enabled`, `Disabled`,
/// `Initialized`) fire exactly once per actual transition; setting a flag to
/// its current value raises nothing. `InitializationFailed`, `ResetSucceeded`
/// and `ResetFailed` report the outcome of an attempt and fire per attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    Initialized,
    InitializationFailed,
    Enabled,
    Disabled,
    Connected,
    Disconnected,
    ResetSucceeded,
    ResetFailed,
}
