pub mod distribution;

use std::fmt;
use std::sync::Arc;

use rand::RngCore;
use thiserror::Error;

use crate::config;
use crate::video::dct::Block8x8;
use crate::video::round_half_up;
use crate::video::zigzag::ZIGZAG;
use distribution::DiscreteDistribution;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModifyError {
    #[error("{mod_step} modification step is not allowed with {mod_type} modification")]
    InvalidCombination { mod_type: ModType, mod_step: ModStep },
    #[error("missing modification parameter: {0}")]
    MissingParameter(&'static str),
    #[error("modification parameter {parameter} out of range: {value}")]
    OutOfRange { parameter: &'static str, value: String },
}

/// How a perturbation relates to the coefficient it is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModType {
    Absolute,
    Percentage,
}

/// How the perturbation evolves across the selected coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModStep {
    Incremental,
    Uniform,
    Random,
}

impl fmt::Display for ModType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute => write!(f, "absolute"),
            Self::Percentage => write!(f, "percentage"),
        }
    }
}

impl fmt::Display for ModStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incremental => write!(f, "incremental"),
            Self::Uniform => write!(f, "uniform"),
            Self::Random => write!(f, "random"),
        }
    }
}

/// Which coefficients to perturb and how. Fixed for a whole run.
#[derive(Debug, Clone)]
pub struct ModificationSettings {
    /// First zigzag position to modify (1-based; the DC term is never touched).
    pub range_init: u8,
    /// Last zigzag position to modify, inclusive.
    pub range_end: u8,
    pub mod_type: ModType,
    pub mod_step: ModStep,
    pub low_limit: i32,
    pub upper_limit: i32,
    pub constant_value: i32,
    pub random_fn: Option<Arc<dyn DiscreteDistribution>>,
}

impl ModificationSettings {
    /// Add `value` (absolute) or `value`% (percentage) to every selected coefficient.
    pub fn uniform(range_init: u8, range_end: u8, mod_type: ModType, value: i32) -> Self {
        Self {
            range_init,
            range_end,
            mod_type,
            mod_step: ModStep::Uniform,
            low_limit: 0,
            upper_limit: 0,
            constant_value: value,
            random_fn: None,
        }
    }

    /// Add `low, low + 1, ..., upper, low, ...` to successive selected coefficients.
    pub fn incremental(range_init: u8, range_end: u8, low_limit: i32, upper_limit: i32) -> Self {
        Self {
            range_init,
            range_end,
            mod_type: ModType::Absolute,
            mod_step: ModStep::Incremental,
            low_limit,
            upper_limit,
            constant_value: 0,
            random_fn: None,
        }
    }

    /// Add a discretized random draw from `distribution` to every selected coefficient.
    pub fn random(range_init: u8, range_end: u8, distribution: Arc<dyn DiscreteDistribution>) -> Self {
        Self {
            range_init,
            range_end,
            mod_type: ModType::Absolute,
            mod_step: ModStep::Random,
            low_limit: 0,
            upper_limit: 0,
            constant_value: 0,
            random_fn: Some(distribution),
        }
    }

    /// Check the coefficient range and the parameters the chosen policy needs.
    pub fn validate(&self) -> Result<(), ModifyError> {
        if !(config::MIN_COEFFICIENT..=config::MAX_COEFFICIENT).contains(&self.range_init) {
            return Err(out_of_range("range_init", self.range_init));
        }
        if !(self.range_init..=config::MAX_COEFFICIENT).contains(&self.range_end) {
            return Err(out_of_range("range_end", self.range_end));
        }

        let absolute = config::ABSOLUTE_VALUE_MIN..=config::ABSOLUTE_VALUE_MAX;
        match (self.mod_type, self.mod_step) {
            (ModType::Absolute, ModStep::Incremental) => {
                if !absolute.contains(&self.low_limit) {
                    return Err(out_of_range("low_limit", self.low_limit));
                }
                if !absolute.contains(&self.upper_limit) || self.upper_limit < self.low_limit {
                    return Err(out_of_range("upper_limit", self.upper_limit));
                }
            }
            (ModType::Absolute, ModStep::Uniform) => {
                if !absolute.contains(&self.constant_value) {
                    return Err(out_of_range("constant_value", self.constant_value));
                }
            }
            (ModType::Absolute, ModStep::Random) => {
                if self.random_fn.is_none() {
                    return Err(ModifyError::MissingParameter("random_fn"));
                }
            }
            (ModType::Percentage, ModStep::Uniform) => {
                let percentage = config::PERCENTAGE_VALUE_MIN..=config::PERCENTAGE_VALUE_MAX;
                if !percentage.contains(&self.constant_value) {
                    return Err(out_of_range("constant_value", self.constant_value));
                }
            }
            (mod_type @ ModType::Percentage, mod_step) => {
                return Err(ModifyError::InvalidCombination { mod_type, mod_step });
            }
        }
        Ok(())
    }

    /// Number of coefficients touched per block.
    pub fn coefficient_count(&self) -> usize {
        usize::from(self.range_end.saturating_sub(self.range_init)) + 1
    }
}

impl Default for ModificationSettings {
    fn default() -> Self {
        Self::uniform(
            config::DEFAULT_RANGE_INIT,
            config::DEFAULT_RANGE_END,
            ModType::Absolute,
            config::DEFAULT_MODIFICATION_VALUE,
        )
    }
}

fn out_of_range(parameter: &'static str, value: impl fmt::Display) -> ModifyError {
    ModifyError::OutOfRange {
        parameter,
        value: value.to_string(),
    }
}

/// Circular `low..=upper` increment sequence for the incremental step.
#[derive(Debug, Clone, Copy)]
struct IncrementCycle {
    low: i32,
    upper: i32,
    current: i32,
}

impl IncrementCycle {
    fn new(low: i32, upper: i32) -> Self {
        Self {
            low,
            upper,
            current: low,
        }
    }

    fn advance(&mut self) {
        self.current = match self.current.checked_add(1) {
            Some(next) if next <= self.upper => next,
            _ => self.low,
        };
    }
}

/// Applies a validated [`ModificationSettings`] to DCT coefficient blocks.
#[derive(Debug, Clone)]
pub struct CoefficientModifier {
    settings: ModificationSettings,
}

impl CoefficientModifier {
    pub fn new(settings: ModificationSettings) -> Result<Self, ModifyError> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &ModificationSettings {
        &self.settings
    }

    /// Walk the AC coefficients in zigzag order and perturb those whose
    /// 1-based position lies in `range_init..=range_end`.
    ///
    /// The incremental sequence restarts at `low_limit` for every block.
    /// Returns the number of coefficients modified.
    pub fn zigzag_range(&self, block: &mut Block8x8, rng: &mut dyn RngCore) -> Result<usize, ModifyError> {
        let s = &self.settings;
        let first = usize::from(s.range_init.max(config::MIN_COEFFICIENT));
        let last = usize::from(s.range_end.min(config::MAX_COEFFICIENT));

        let mut cycle = IncrementCycle::new(s.low_limit, s.upper_limit);
        let mut modified = 0;
        for &(row, col) in ZIGZAG.iter().take(last + 1).skip(first) {
            block[row][col] = self.modify_value(block[row][col], cycle.current, rng)?;
            cycle.advance();
            modified += 1;
        }
        Ok(modified)
    }

    /// Perturb one coefficient. `inc` is the current incremental step value.
    pub fn modify_value(&self, value: f32, inc: i32, rng: &mut dyn RngCore) -> Result<f32, ModifyError> {
        let s = &self.settings;
        match (s.mod_type, s.mod_step) {
            (ModType::Absolute, ModStep::Incremental) => Ok(value + inc as f32),
            (ModType::Absolute, ModStep::Uniform) => Ok(value + s.constant_value as f32),
            (ModType::Absolute, ModStep::Random) => {
                let f = s
                    .random_fn
                    .as_ref()
                    .ok_or(ModifyError::MissingParameter("random_fn"))?;
                let delta = f.discretize(f.sample_in_range(f.inf(), f.sup(), rng));
                Ok((f64::from(value) + delta) as f32)
            }
            (ModType::Percentage, ModStep::Uniform) => {
                let delta = round_half_up(value * s.constant_value as f32 / 100.0);
                Ok(value + delta as f32)
            }
            (mod_type @ ModType::Percentage, mod_step) => {
                Err(ModifyError::InvalidCombination { mod_type, mod_step })
            }
        }
    }
}
