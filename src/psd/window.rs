//! Window functions applied to a segment before the transform.

use core::f32::consts::PI;
use num_complex::Complex32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum Window {
    Rectangle,
    Hamming,
    Hann,
    Blackman,
}

/// `Forward` tapers the segment, `Reverse` undoes a previous forward application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum Direction {
    Forward,
    Reverse,
}

impl Window {
    /// Weight of sample `i` in a symmetric window of length `n`.
    pub fn weight(&self, i: usize, n: usize) -> f32 {
        use Window::*;

        if n < 2 {
            return 1.0;
        }

        let ratio = i as f32 / (n - 1) as f32;

        match self {
            Rectangle => 1.0,
            Hamming => 0.54 - 0.46 * libm::cosf(2. * PI * ratio),
            Hann => 0.5 * (1. - libm::cosf(2. * PI * ratio)),
            Blackman => {
                0.42 - 0.5 * libm::cosf(2. * PI * ratio) + 0.08 * libm::cosf(4. * PI * ratio)
            }
        }
    }

    /// Apply window to the real part of `buf`. Samples with zero weight are left untouched in
    /// the reverse direction.
    pub fn apply(&self, buf: &mut [Complex32], dir: Direction) {
        let n = buf.len();

        for (i, c) in buf.iter_mut().enumerate() {
            let w = self.weight(i, n);

            match dir {
                Direction::Forward => c.re *= w,
                Direction::Reverse => {
                    if w != 0. {
                        c.re /= w
                    }
                }
            }
        }
    }
}
