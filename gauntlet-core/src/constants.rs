use std::time::Duration;

/// Per-request deadline used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Latency percentiles reported when none are configured.
pub const DEFAULT_PERCENTILES: [u8; 3] = [50, 90, 99];

/// Largest percentile that can be requested.
pub const MAX_PERCENTILE: u8 = 100;
