//! Compile-time limits and the runtime measurement settings.
//!
//! The defaults can be overridden at build time through environment variables (see `build.rs`):
//! `PSD_CAPACITY`, `SAMPLE_FREQUENCY`, `POINTS_PSD`, `POINTS_CUTOFF`, `MEASURE_INTERVAL` and
//! `PAUSE_INTERVAL`.

use crc::{Crc, CRC_8_SMBUS};
use serde::{Deserialize, Serialize};
use static_assertions as sa;

include!(concat!(env!("OUT_DIR"), "/config.rs"));

/// Largest transform length supported by the transform backend.
pub const TRANSFORM_MAX: usize = 4096;

sa::const_assert!(PSD_CAPACITY.is_power_of_two());
sa::const_assert!(PSD_CAPACITY >= 4);
sa::const_assert!(PSD_CAPACITY <= TRANSFORM_MAX);

pub const SAMPLE_FREQUENCY_MIN: u8 = 1; // Hz
pub const SAMPLE_FREQUENCY_MAX: u8 = 100; // Hz

/// Segment size is `2^points_psd`.
pub const POINTS_PSD_MIN: u8 = 2;
pub const POINTS_PSD_MAX: u8 = PSD_CAPACITY.trailing_zeros() as u8;

pub const POINTS_CUTOFF_MIN: u16 = 1;
pub const POINTS_CUTOFF_MAX: u16 = 1024;

sa::const_assert!(
    SAMPLE_FREQUENCY_DEFAULT >= SAMPLE_FREQUENCY_MIN
        && SAMPLE_FREQUENCY_DEFAULT <= SAMPLE_FREQUENCY_MAX
);
sa::const_assert!(POINTS_PSD_DEFAULT >= POINTS_PSD_MIN && POINTS_PSD_DEFAULT <= POINTS_PSD_MAX);
sa::const_assert!(
    POINTS_CUTOFF_DEFAULT >= POINTS_CUTOFF_MIN && POINTS_CUTOFF_DEFAULT <= POINTS_CUTOFF_MAX
);

/// Maximum length of an encoded settings record (postcard varints: 5 + 5 + 3 + 1 + 1 + 1) and
/// its trailing CRC8.
///
/// > Do not change the layout of `Settings` without taking care of records already stored on
/// > devices.
pub const SETTINGS_SZ: usize = 16 + 1;

static SETTINGS_CRC: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

const MILLIS_PER_SECOND: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum SettingsError {
    Frequency(u8),
    PointsPsd(u8),
    PointsCutoff(u16),
    Encode,
    Decode,
}

/// Measurement settings kept in non-volatile storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, defmt::Format)]
pub struct Settings {
    /// Time spent measuring, seconds.
    pub measure_interval: u32,

    /// Time between measurements, seconds.
    pub pause_interval: u32,

    /// Maximum number of PSD bins to store.
    pub points_cutoff: u16,

    /// Sampling frequency, Hz.
    pub frequency: u8,

    /// Segment size as a power of two.
    pub points_psd: u8,

    /// Collect min, max, mean and deviation alongside the spectrum.
    pub statistic: bool,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            measure_interval: MEASURE_INTERVAL_DEFAULT,
            pause_interval: PAUSE_INTERVAL_DEFAULT,
            points_cutoff: POINTS_CUTOFF_DEFAULT,
            frequency: SAMPLE_FREQUENCY_DEFAULT,
            points_psd: POINTS_PSD_DEFAULT,
            statistic: true,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(SAMPLE_FREQUENCY_MIN..=SAMPLE_FREQUENCY_MAX).contains(&self.frequency) {
            return Err(SettingsError::Frequency(self.frequency));
        }

        if !(POINTS_PSD_MIN..=POINTS_PSD_MAX).contains(&self.points_psd) {
            return Err(SettingsError::PointsPsd(self.points_psd));
        }

        if !(POINTS_CUTOFF_MIN..=POINTS_CUTOFF_MAX).contains(&self.points_cutoff) {
            return Err(SettingsError::PointsCutoff(self.points_cutoff));
        }

        Ok(())
    }

    /// Number of samples in a segment.
    pub fn segment_size(&self) -> usize {
        1 << self.points_psd
    }

    /// Interval between samples, milliseconds.
    pub fn sample_interval_ms(&self) -> u32 {
        MILLIS_PER_SECOND / self.frequency as u32
    }

    /// Time it takes to fill one segment, milliseconds.
    pub fn segment_time_ms(&self) -> u32 {
        self.segment_size() as u32 * self.sample_interval_ms()
    }

    /// Number of bins to report for a spectrum of `sample_count` samples. Only the first
    /// `sample_count / 2 + 1` bins carry information for a real signal.
    pub fn result_points(&self, sample_count: usize) -> usize {
        (sample_count / 2 + 1).min(self.points_cutoff as usize)
    }

    /// Encode settings followed by their CRC8 into `buf`, returns the number of bytes written.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, SettingsError> {
        let written =
            postcard::ser_flavors::crc::to_slice_u8(self, buf, SETTINGS_CRC.digest())
                .map_err(|_| SettingsError::Encode)?;
        Ok(written.len())
    }

    /// Decode and validate settings read back from storage. A record with a checksum mismatch
    /// is rejected with [`SettingsError::Decode`], the caller keeps its current settings and
    /// should write them back.
    pub fn decode(buf: &[u8]) -> Result<Settings, SettingsError> {
        let settings: Settings =
            postcard::de_flavors::crc::from_bytes_u8(buf, SETTINGS_CRC.digest()).map_err(|e| {
                defmt::warn!(
                    "stored settings could not be decoded: {:?}",
                    defmt::Debug2Format(&e)
                );
                SettingsError::Decode
            })?;

        settings
            .validate()
            .inspect_err(|e| defmt::warn!("stored settings are invalid: {:?}", e))?;

        Ok(settings)
    }
}
