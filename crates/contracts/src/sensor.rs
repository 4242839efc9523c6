//! SensorStream - Stream Aligner output
//!
//! One continuous recording for a (subject, device, measurement[, location])
//! tuple, time-sorted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{ContractError, SubjectId};

/// Recording device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    Smartphone,
    Smartwatch,
    /// Adhesive multi-site patch (accelerometer, gyroscope, EMG)
    WearablePatch,
}

impl Device {
    pub fn as_str(self) -> &'static str {
        match self {
            Device::Smartphone => "smartphone",
            Device::Smartwatch => "smartwatch",
            Device::WearablePatch => "wearable_patch",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Device {
    type Err = ContractError;

    /// Accepts the canonical names plus the spellings used in the
    /// synchronisation annotation sheets.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "smartphone" | "phone" => Ok(Device::Smartphone),
            "smartwatch" | "watch" => Ok(Device::Smartwatch),
            "wearablepatch" | "patch" | "mc10" => Ok(Device::WearablePatch),
            _ => Err(ContractError::unknown_value("device", s)),
        }
    }
}

/// Measured quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measurement {
    Accelerometer,
    Gyroscope,
    Emg,
}

impl Measurement {
    pub fn as_str(self) -> &'static str {
        match self {
            Measurement::Accelerometer => "accelerometer",
            Measurement::Gyroscope => "gyroscope",
            Measurement::Emg => "emg",
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Measurement {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accelerometer" | "accel" | "acc" => Ok(Measurement::Accelerometer),
            "gyroscope" | "gyro" => Ok(Measurement::Gyroscope),
            "emg" => Ok(Measurement::Emg),
            _ => Err(ContractError::unknown_value("measurement", s)),
        }
    }
}

/// Identity of one stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamKey {
    pub subject_id: SubjectId,
    pub device: Device,
    pub measurement: Measurement,
    /// Body location for multi-site recordings
    pub location: Option<String>,
}

/// One time-stamped multi-channel sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds (reference clock after alignment, relative after zero-basing)
    pub time: f64,
    /// Channel values, ordered as the owning stream's `channels`
    pub values: Vec<f64>,
}

impl Sample {
    pub fn new(time: f64, values: Vec<f64>) -> Self {
        Self { time, values }
    }
}

/// Time-ordered recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorStream {
    pub key: StreamKey,
    /// Channel names (e.g. `x`, `y`, `z`)
    pub channels: Vec<String>,
    samples: Vec<Sample>,
}

impl SensorStream {
    /// Build a stream, sorting samples into time order.
    ///
    /// Source order is never trusted; the sort is stable so samples sharing a
    /// timestamp keep their file order.
    pub fn new(key: StreamKey, channels: Vec<String>, mut samples: Vec<Sample>) -> Self {
        samples.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self {
            key,
            channels,
            samples,
        }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// First and last sample times.
    pub fn time_range(&self) -> Option<(f64, f64)> {
        Some((self.samples.first()?.time, self.samples.last()?.time))
    }

    /// Add `offset` seconds to every sample. Order is preserved.
    pub fn shift(&mut self, offset: f64) {
        for sample in &mut self.samples {
            sample.time += offset;
        }
    }

    /// Merge samples of the same stream read from another file.
    pub fn append(&mut self, other: SensorStream) {
        debug_assert_eq!(self.key, other.key);
        self.samples.extend(other.samples);
        self.samples.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    /// Whether samples are non-decreasing in time.
    pub fn is_time_ordered(&self) -> bool {
        self.samples.windows(2).all(|w| w[0].time <= w[1].time)
    }
}
