use crate::modifier::ModificationSettings;

// Transform parameters
pub const BLOCK_SIZE: usize = 8;
pub const BLOCK_LEN: usize = BLOCK_SIZE * BLOCK_SIZE;

/// Highest zigzag position that can be perturbed (position 0 is the DC term).
pub const MAX_COEFFICIENT: u8 = 63;
pub const MIN_COEFFICIENT: u8 = 1;

// Modification parameter bounds
pub const ABSOLUTE_VALUE_MIN: i32 = -127;
pub const ABSOLUTE_VALUE_MAX: i32 = 128;
pub const PERCENTAGE_VALUE_MIN: i32 = -100;
pub const PERCENTAGE_VALUE_MAX: i32 = 100;

// Default modification (used by the CLI)
pub const DEFAULT_RANGE_INIT: u8 = 1;
pub const DEFAULT_RANGE_END: u8 = 10;
pub const DEFAULT_MODIFICATION_VALUE: i32 = 5;
pub const DEFAULT_LOW_LIMIT: i32 = 0;
pub const DEFAULT_UPPER_LIMIT: i32 = 0;

// Discrete factored Gaussian defaults
pub const DEFAULT_STD_DEVIATION: f64 = 1.0;
pub const DEFAULT_MEAN: f64 = 0.0;
pub const DEFAULT_FACTOR: f64 = 1.0;
pub const DEFAULT_GAUSSIAN_INF: i32 = -5;
pub const DEFAULT_GAUSSIAN_SUP: i32 = 5;
pub const DEFAULT_GAUSSIAN_BARS: u32 = 5;

/// Give up rejection sampling after this many draws and clamp the last one.
pub const MAX_REJECTION_ATTEMPTS: usize = 100_000;

/// File extensions recognised as raw YUV streams.
pub const YUV_EXTENSIONS: [&str; 2] = ["yuv", "y4m"];

/// Which of the three planes a run perturbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Components {
    pub y: bool,
    pub u: bool,
    pub v: bool,
}

impl Components {
    pub const LUMA: Components = Components { y: true, u: false, v: false };
    pub const ALL: Components = Components { y: true, u: true, v: true };
    pub const NONE: Components = Components { y: false, u: false, v: false };

    pub fn any(&self) -> bool {
        self.y || self.u || self.v
    }
}

impl Default for Components {
    fn default() -> Self {
        Self::LUMA
    }
}

/// Runtime configuration for one watermarking run.
#[derive(Debug, Clone)]
pub struct WatermarkConfig {
    pub settings: ModificationSettings,
    pub components: Components,
    /// Seed for the run's generator. `None` seeds from OS entropy.
    pub seed: Option<u64>,
    /// Show a progress bar while watermarking.
    pub progress: bool,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            settings: ModificationSettings::default(),
            components: Components::default(),
            seed: None,
            progress: false,
        }
    }
}
