//! A measured channel: one axis of the IMU with its spectrum and statistics, or a derived series
//! (roll, pitch) with statistics only.

use crate::config::{Settings, SettingsError};
use crate::psd::{CoreBin, Psd};
use crate::stats::{Sample, Statistic};

// From Adafruit Sensors library.
pub const SENSORS_DPS_TO_RADS: f64 = 0.017453293;
pub const SENSORS_GRAVITY_STANDARD: f64 = 9.80665;

/// Accelerometer full scale.
pub const ACCEL_RANGE: f64 = 2.; // [g]

/// Gyroscope full scale.
pub const GYRO_RANGE: f64 = 250.; // [dps]

/// Raw accelerometer value to m/s^2.
pub const ACCEL_SCALE: f64 = ACCEL_RANGE * SENSORS_GRAVITY_STANDARD / 32768.;

/// Raw gyroscope value to rad/s.
pub const GYRO_SCALE: f64 = GYRO_RANGE * SENSORS_DPS_TO_RADS / 32768.;

/// Raw accelerometer value to g.
pub const ACCEL_G_SCALE: f32 = ACCEL_RANGE as f32 / 32768.;

/// Raw gyroscope value to dps.
pub const GYRO_DPS_SCALE: f32 = GYRO_RANGE as f32 / 32768.;

/// One raw reading of the IMU.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct ImuSample {
    pub accel: [i16; 3],
    pub gyro: [i16; 3],
}

impl ImuSample {
    /// Acceleration in g.
    pub fn accel_g(&self) -> [f32; 3] {
        self.accel.map(|a| a as f32 * ACCEL_G_SCALE)
    }

    /// Angular rate in dps.
    pub fn gyro_dps(&self) -> [f32; 3] {
        self.gyro.map(|g| g as f32 * GYRO_DPS_SCALE)
    }
}

pub struct Channel<T = i16> {
    pub name: &'static str,
    pub units: &'static str,

    /// Sample to `units`.
    pub scale: f64,

    psd: Option<Psd>,
    stats: Statistic<T>,
    statistic: bool,
}

impl Channel<i16> {
    /// A channel with a spectrum.
    pub fn new(
        name: &'static str,
        units: &'static str,
        scale: f64,
        settings: &Settings,
    ) -> Result<Channel, SettingsError> {
        settings.validate()?;

        Ok(Channel {
            name,
            units,
            scale,
            psd: Some(Psd::new(settings.segment_size(), settings.frequency as f32)),
            stats: Statistic::new(),
            statistic: settings.statistic,
        })
    }

    /// Add a segment of raw samples.
    pub fn process(&mut self, segment: &[i16]) {
        if let Some(psd) = &mut self.psd {
            psd.accumulate(segment);
        }

        self.calculate(segment);
    }
}

impl Channel<f32> {
    /// Add a segment of a derived series.
    pub fn process(&mut self, segment: &[f32]) {
        self.calculate(segment);
    }
}

impl<T: Sample> Channel<T> {
    /// A channel with statistics only.
    pub fn without_spectrum(
        name: &'static str,
        units: &'static str,
        scale: f64,
        settings: &Settings,
    ) -> Result<Channel<T>, SettingsError> {
        settings.validate()?;

        Ok(Channel {
            name,
            units,
            scale,
            psd: None,
            stats: Statistic::new(),
            statistic: settings.statistic,
        })
    }

    /// Apply new settings and start a new measurement. Invalid settings leave the channel
    /// unchanged.
    pub fn configure(&mut self, settings: &Settings) -> Result<(), SettingsError> {
        settings.validate()?;

        defmt::debug!("{}: configure: {:?}", self.name, settings);

        if let Some(psd) = &mut self.psd {
            psd.configure(settings.segment_size(), settings.frequency as f32);
        }

        self.stats.reset();
        self.statistic = settings.statistic;

        Ok(())
    }

    fn calculate(&mut self, segment: &[T]) {
        if self.statistic {
            self.stats.calculate(segment);
        }
    }

    pub fn psd(&self) -> Option<&Psd> {
        self.psd.as_ref()
    }

    pub fn psd_mut(&mut self) -> Option<&mut Psd> {
        self.psd.as_mut()
    }

    /// Averaged spectrum since the last read, see [`Psd::result`].
    pub fn result(&mut self) -> Option<&[f64]> {
        self.psd.as_mut().map(|psd| psd.result())
    }

    pub fn core_bin(&self) -> Option<CoreBin> {
        self.psd.as_ref().and_then(|psd| psd.core_bin())
    }

    /// Statistics in sample units, if enabled and at least one segment has been processed.
    pub fn stats(&self) -> Option<&Statistic<T>> {
        (self.statistic && self.stats.count() > 0).then_some(&self.stats)
    }

    /// Start a new measurement without changing the settings.
    pub fn reset(&mut self) {
        if let Some(psd) = &mut self.psd {
            psd.clear();
            let (n, fs) = (psd.sample_count(), psd.sample_frequency());
            psd.configure(n, fs);
        }

        self.stats.reset();
    }
}
