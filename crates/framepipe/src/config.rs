//! Stage and pipeline configuration
//!
//! The GPU program, its sampler and its output format are compile-time constants (see
//! [`crate::gpu`]); what remains configurable is which stages run, how the GPU adapter is
//! chosen, and how much buffering sits between stages.

use crate::error::ParseStageError;
use std::{str::FromStr, time::Duration};

/// Number of frames buffered between two adjacent stages
pub const DEFAULT_CHANNEL_CAPACITY: usize = 3;

/// Textual description of one stage, e.g. `drop:0.5` or `delay:40`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StageSpec {
    /// `passthrough`
    PassThrough,
    /// `drop:<p>`: forward each frame with probability `p`
    Drop { probability: f64 },
    /// `delay:<ms>`: hold each frame for `ms` milliseconds
    Delay { delay: Duration },
    /// `crop`
    Crop,
    /// `swirl`, the GPU stage
    Swirl,
}

impl FromStr for StageSpec {
    type Err = ParseStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, argument) = match s.split_once(':') {
            Some((name, argument)) => (name.trim(), Some(argument.trim())),
            None => (s.trim(), None),
        };

        let no_argument = |stage: &'static str, spec: StageSpec| match argument {
            Some(value) => Err(ParseStageError::UnexpectedArgument {
                stage,
                value: value.to_string(),
            }),
            None => Ok(spec),
        };

        match name.to_lowercase().as_str() {
            "passthrough" => no_argument("passthrough", StageSpec::PassThrough),
            "crop" => no_argument("crop", StageSpec::Crop),
            "swirl" => no_argument("swirl", StageSpec::Swirl),
            "drop" => {
                let value = argument.ok_or(ParseStageError::MissingArgument("drop"))?;
                let probability: f64 = value.parse().map_err(|_| ParseStageError::InvalidArgument {
                    stage: "drop",
                    value: value.to_string(),
                })?;
                if !(0.0..=1.0).contains(&probability) {
                    return Err(ParseStageError::ProbabilityOutOfRange(probability));
                }
                Ok(StageSpec::Drop { probability })
            }
            "delay" => {
                let value = argument.ok_or(ParseStageError::MissingArgument("delay"))?;
                let millis: u64 = value.parse().map_err(|_| ParseStageError::InvalidArgument {
                    stage: "delay",
                    value: value.to_string(),
                })?;
                Ok(StageSpec::Delay {
                    delay: Duration::from_millis(millis),
                })
            }
            _ => Err(ParseStageError::UnknownStage(s.to_string())),
        }
    }
}

/// Adapter selection for the GPU stage
#[derive(Debug, Clone)]
pub struct GpuStageConfig {
    /// Backends the wgpu instance may use
    ///
    /// An empty set never yields an adapter, which leaves the stage disabled.
    pub backends: wgpu::Backends,
    /// Preferred adapter class
    pub power_preference: wgpu::PowerPreference,
    /// Only accept a software (fallback) adapter
    pub force_fallback_adapter: bool,
}

impl Default for GpuStageConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::PRIMARY,
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
        }
    }
}

/// Settings for the stage-chain runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Capacity of every inter-stage channel, at least 1
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}
