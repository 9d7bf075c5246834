//! Roll and pitch of the node from the IMU, for the derived `ROLL` and `PITCH` channels.
//!
//! The NXP sensor fusion Kalman filter is fed gyroscope readings in dps and accelerometer
//! readings in g. The magnetometer is not used. The orientation quaternion is converted to
//! aerospace (ZYX) Euler angles in degrees.

use ahrs_fusion::NxpFusion;

use crate::config::Settings;
use crate::measure::ImuSample;

#[derive(Debug, Default, Clone, Copy, PartialEq, defmt::Format)]
pub struct Angles {
    pub roll: f32,  // [deg]
    pub pitch: f32, // [deg]
}

impl Angles {
    /// Roll and pitch of the unit quaternion `q = [w, x, y, z]`.
    pub fn from_quaternion(q: [f32; 4]) -> Angles {
        let [w, x, y, z] = q;

        let roll = libm::atan2f(2. * (w * x + y * z), 1. - 2. * (x * x + y * y));
        let pitch = libm::asinf((2. * (w * y - z * x)).clamp(-1., 1.));

        Angles {
            roll: roll.to_degrees(),
            pitch: pitch.to_degrees(),
        }
    }
}

pub struct Orientation {
    filter: NxpFusion,
    frequency: f32, // [Hz]
}

impl Orientation {
    pub fn new(frequency: f32) -> Orientation {
        Orientation {
            filter: NxpFusion::new(frequency),
            frequency,
        }
    }

    /// Restart the filter at the sample frequency of `settings`.
    pub fn configure(&mut self, settings: &Settings) {
        let frequency = settings.frequency as f32;

        if frequency != self.frequency {
            defmt::debug!("orientation: sample frequency: {} Hz", frequency);
            self.filter = NxpFusion::new(frequency);
            self.frequency = frequency;
        } else {
            self.filter.reset();
        }
    }

    pub fn reset(&mut self) {
        self.filter.reset();
    }

    /// Feed a new IMU reading through the filter and return the current orientation.
    pub fn update(&mut self, sample: &ImuSample) -> Angles {
        let g = sample.gyro_dps();
        let a = sample.accel_g();

        self.filter.update(
            g[0], g[1], g[2], a[0], a[1], a[2],
            0., // Magnetometer is not fitted.
            0.,
            0.,
        );

        let q = self.filter.quaternion();
        let angles = Angles::from_quaternion([q[0], q[1], q[2], q[3]]);

        defmt::trace!("orientation: {:?}", angles);

        angles
    }
}
