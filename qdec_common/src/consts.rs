//! System-wide constants.
//!
//! Defaults describe the standard two-encoder wiring on a Raspberry Pi
//! header (BCM numbering).

/// Canonical service name (used for logging and telemetry topics).
pub const QDEC_SERVICE_NAME: &str = "qdec";

/// Highest GPIO line identifier accepted by the decoder (BCM 0..=53).
pub const MAX_CHANNEL: u32 = 53;

/// Maximum number of encoders a single bank may drive.
pub const MAX_ENCODERS: usize = 8;

/// Quarter-steps per mechanical detent click.
pub const STEPS_PER_DETENT: i64 = 4;

/// Default noise (glitch) filter window in microseconds.
pub const DEFAULT_NOISE_FILTER_US: u32 = 1000;

/// Default capacity of the deferred notification queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Default channels of the first encoder (A, B).
pub const DEFAULT_ENCODER_A_CHANNELS: (u32, u32) = (23, 24);

/// Default channels of the second encoder (C, D).
pub const DEFAULT_ENCODER_B_CHANNELS: (u32, u32) = (17, 27);

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "/etc/qdec/qdec.toml";
