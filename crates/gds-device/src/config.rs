use std::time::Duration;

/// Reconnect policy for the retry controller.
///
/// The defaults (3 retries, 500 ms apart) match what the peripheral
/// families ship with; deployments tune them per device family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Additional attempts after the initial one.
    pub retry_limit: u32,
    /// Pause between attempts.
    pub retry_interval: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            retry_limit: 3,
            retry_interval: Duration::from_millis(500),
        }
    }
}

/// Timeouts and reconnect behavior for a device instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// How long command operations wait for their matching report.
    pub command_timeout: Duration,
    /// Extended wait for CRC calculation (firmware hashing is slow).
    pub crc_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(10),
            crc_timeout: Duration::from_secs(40),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl DeviceConfig {
    /// Override the command report timeout.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Override the CRC report timeout.
    pub fn with_crc_timeout(mut self, timeout: Duration) -> Self {
        self.crc_timeout = timeout;
        self
    }

    /// Override the reconnect policy.
    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }
}
