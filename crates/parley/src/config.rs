//! Relay behavior settings.

use std::time::Duration;

/// Configuration for relay behavior.
///
/// Sensible defaults are provided; override only the fields you need:
///
/// ```rust
/// use std::time::Duration;
/// use parley::RelayConfig;
///
/// let config = RelayConfig {
///     idle_timeout: Some(Duration::from_secs(300)),
///     ..RelayConfig::default()
/// };
/// assert!(config.roster_on_leave);
/// ```
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// How long a connection may stay silent before it is treated as lost.
    ///
    /// Default: `None`, connections are held open indefinitely.
    pub idle_timeout: Option<Duration>,

    /// Re-broadcast the roster to the remaining sessions after a session
    /// leaves or loses its connection.
    ///
    /// Default: `true`.
    pub roster_on_leave: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            idle_timeout: None,
            roster_on_leave: true,
        }
    }
}
