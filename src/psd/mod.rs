//! Power spectral density averaged over consecutive segments (Welch-style, without overlap).
//!
//! Every segment is stripped of its mean, tapered with a Hamming window and transformed. The
//! single-sided power of each bin is summed over segments until the result is read, at which
//! point the sum is averaged and corrected for the amplitude loss of the window.
//!
//! The engine has two states:
//!
//! * `Idle`: no unread segments. `bins` holds either the last result or stale values from a
//!   previous configuration. The next segment clears the bins before it is added.
//! * `Accumulating`: `bins` holds a running sum of `segments` segments.
//!
//! Reading the result moves the engine back to `Idle`. Preconditions are asserted: a segment of
//! the wrong length, or a configuration outside the capacity, panics before any state is
//! changed.

use num_complex::Complex32;

mod transform;
pub mod window;

pub use transform::{MicroFft, Transform};
use window::{Direction, Window};

/// Maximum number of samples in a segment.
pub const CAPACITY: usize = crate::config::PSD_CAPACITY;

/// Amplitude correction for the Hamming window, applied squared to the power.
pub const WINDOW_CORRECTION: f64 = 1.59;

#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum State {
    Idle,
    Accumulating { segments: u32 },
}

/// The strongest non-DC bin of a spectrum.
#[derive(Debug, Clone, Copy, PartialEq, defmt::Format)]
pub struct CoreBin {
    pub index: usize,
    pub frequency: f32, // [Hz]
    pub amplitude: f64,
}

pub struct Psd<T: Transform = MicroFft> {
    transform: T,

    /// Transform scratch, reused for every segment.
    buf: [Complex32; CAPACITY],

    /// Running sum of power per bin while accumulating, averaged result once read.
    bins: [f64; CAPACITY],

    sample_count: usize,
    sample_frequency: f32, // [Hz]

    /// Segments added since the last read.
    segments: u32,
}

impl Psd<MicroFft> {
    pub fn new(sample_count: usize, sample_frequency: f32) -> Psd<MicroFft> {
        Psd::with_transform(MicroFft, sample_count, sample_frequency)
    }
}

impl<T: Transform> Psd<T> {
    pub fn with_transform(transform: T, sample_count: usize, sample_frequency: f32) -> Psd<T> {
        let mut psd = Psd {
            transform,
            buf: [Complex32::new(0., 0.); CAPACITY],
            bins: [0.; CAPACITY],
            sample_count: 0,
            sample_frequency: 0.,
            segments: 0,
        };

        psd.configure(sample_count, sample_frequency);
        psd
    }

    /// Set segment length and sampling frequency. Any unread segments are dropped, but the bins
    /// are not cleared until the next segment is added.
    pub fn configure(&mut self, sample_count: usize, sample_frequency: f32) {
        assert!(
            sample_count > 0 && sample_count <= CAPACITY,
            "sample count out of range: {} (capacity: {})",
            sample_count,
            CAPACITY
        );
        assert!(
            sample_count.is_power_of_two(),
            "sample count must be a power of two: {}",
            sample_count
        );
        assert!(
            sample_frequency.is_finite() && sample_frequency > 0.,
            "invalid sample frequency: {}",
            sample_frequency
        );

        defmt::debug!(
            "psd: configure, samples: {}, frequency: {} Hz",
            sample_count,
            sample_frequency
        );

        self.sample_count = sample_count;
        self.sample_frequency = sample_frequency;
        self.segments = 0;
    }

    pub fn state(&self) -> State {
        match self.segments {
            0 => State::Idle,
            segments => State::Accumulating { segments },
        }
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn sample_frequency(&self) -> f32 {
        self.sample_frequency
    }

    /// Number of bins carrying information: `sample_count / 2 + 1`.
    pub fn meaningful(&self) -> usize {
        self.sample_count / 2 + 1
    }

    /// Center frequency of bin `i`.
    pub fn frequency(&self, i: usize) -> f32 {
        i as f32 * self.sample_frequency / self.sample_count as f32
    }

    /// Compute the power of a new segment and add it to the running sum.
    pub fn accumulate(&mut self, samples: &[i16]) {
        assert_eq!(
            samples.len(),
            self.sample_count,
            "segment length does not match sample count"
        );

        if let State::Idle = self.state() {
            self.clear();
        }

        let n = self.sample_count;
        let avg = mean(samples) as i32;

        let buf = &mut self.buf[..n];
        for (c, s) in buf.iter_mut().zip(samples) {
            *c = Complex32::new((*s as i32 - avg) as f32, 0.);
        }

        self.transform
            .windowing(buf, Window::Hamming, Direction::Forward);
        self.transform.forward(buf);
        self.transform.complex_to_magnitude(buf);

        let fs = self.sample_frequency as f64;
        let nf = n as f64;

        for (i, (bin, c)) in self.bins[..n].iter_mut().zip(buf.iter()).enumerate() {
            let m = c.re as f64;
            let mut p = m * m / fs / nf;

            // Single-sided: fold the negative frequencies into the positive.
            if i > 0 {
                p *= 2.;
            }

            *bin += p;
        }

        self.segments += 1;

        defmt::trace!(
            "psd: added segment {} (mean: {})",
            self.segments,
            avg
        );
    }

    /// Average the accumulated segments and return the spectrum. If no segments have been added
    /// since the last read the bins are returned unchanged.
    ///
    /// Only the first `meaningful()` bins carry information, the rest mirror the negative
    /// frequencies.
    pub fn result(&mut self) -> &[f64] {
        if self.segments > 0 {
            let k = self.segments as f64;

            for bin in &mut self.bins[..self.sample_count] {
                *bin = *bin / k * WINDOW_CORRECTION * WINDOW_CORRECTION;
            }

            defmt::debug!("psd: averaged {} segments", self.segments);

            self.segments = 0;
        }

        &self.bins[..self.sample_count]
    }

    /// Current bins without finalizing: a running sum while accumulating.
    pub fn bins(&self) -> &[f64] {
        &self.bins[..self.sample_count]
    }

    /// Zero all bins. Does not change the number of accumulated segments.
    pub fn clear(&mut self) {
        self.bins.fill(0.);
    }

    /// Strongest bin in `[1, sample_count / 2]`. `None` while accumulating, since the bins do not
    /// hold an average yet.
    pub fn core_bin(&self) -> Option<CoreBin> {
        if self.segments > 0 {
            return None;
        }

        self.bins[..self.meaningful()]
            .iter()
            .enumerate()
            .skip(1)
            .fold(None, |best: Option<(usize, f64)>, (i, &a)| match best {
                Some((_, b)) if b >= a => best,
                _ => Some((i, a)),
            })
            .map(|(index, amplitude)| CoreBin {
                index,
                frequency: self.frequency(index),
                amplitude,
            })
    }
}

/// Mean of the segment, truncated towards zero.
fn mean(samples: &[i16]) -> i16 {
    let sum: f64 = samples.iter().map(|s| *s as f64).sum();
    (sum / samples.len() as f64) as i16
}

#[cfg(test)]
mod tests {
    use super::transform::tests::Dft;
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    /// Every bin gets magnitude 1.
    struct Flat;

    impl Transform for Flat {
        fn forward(&mut self, buf: &mut [Complex32]) {
            buf.fill(Complex32::new(1., 0.));
        }
    }

    fn sine(n: usize, bin: usize, amplitude: f32) -> Vec<i16> {
        (0..n)
            .map(|i| {
                let p = 2. * std::f32::consts::PI * (bin * i) as f32 / n as f32;
                (amplitude * p.sin()) as i16
            })
            .collect()
    }

    fn noise(n: usize, seed: u32) -> Vec<i16> {
        let mut x = seed;
        (0..n)
            .map(|_| {
                x = x.wrapping_mul(1664525).wrapping_add(1013904223);
                (x >> 20) as i16 - 2048
            })
            .collect()
    }

    #[test]
    fn mean_truncates() {
        assert_eq!(mean(&[1, 2]), 1);
        assert_eq!(mean(&[-1, -2]), -1);
        assert_eq!(mean(&[i16::MAX, i16::MAX]), i16::MAX);
        assert_eq!(mean(&[i16::MIN, i16::MIN]), i16::MIN);
    }

    #[test]
    fn state_transitions() {
        let mut p = Psd::new(16, 100.);
        assert_eq!(p.state(), State::Idle);

        p.accumulate(&noise(16, 1));
        assert_eq!(p.state(), State::Accumulating { segments: 1 });

        p.accumulate(&noise(16, 2));
        assert_eq!(p.state(), State::Accumulating { segments: 2 });

        p.result();
        assert_eq!(p.state(), State::Idle);

        p.accumulate(&noise(16, 3));
        p.configure(32, 100.);
        assert_eq!(p.state(), State::Idle);
    }

    #[test]
    fn configure_defers_clear() {
        let mut p = Psd::new(16, 100.);
        p.accumulate(&noise(16, 1));
        let sum = p.bins().to_vec();
        assert!(sum.iter().any(|b| *b > 0.));

        p.configure(16, 100.);
        assert_eq!(p.bins(), &sum[..]);

        let mut fresh = Psd::new(16, 100.);
        fresh.accumulate(&noise(16, 2));

        p.accumulate(&noise(16, 2));
        assert_eq!(p.bins(), fresh.bins());
    }

    #[test]
    fn empty_read_is_idempotent() {
        let mut p = Psd::new(64, 1000.);
        p.accumulate(&sine(64, 5, 500.));

        let a = p.result().to_vec();
        let b = p.result().to_vec();
        assert_eq!(a, b);

        let c = p.result().to_vec();
        assert_eq!(a, c);
    }

    #[test]
    fn empty_read_before_any_segment() {
        let mut p = Psd::new(8, 10.);
        assert_eq!(p.result(), &[0.; 8]);
        assert_eq!(p.state(), State::Idle);
    }

    #[test]
    fn identical_segments_average_to_one() {
        let s = noise(128, 7);

        let mut one = Psd::new(128, 50.);
        one.accumulate(&s);
        let one = one.result().to_vec();

        let mut many = Psd::new(128, 50.);
        for _ in 0..5 {
            many.accumulate(&s);
        }
        assert_eq!(many.state(), State::Accumulating { segments: 5 });

        for (a, b) in one.iter().zip(many.result()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-9);
        }
    }

    #[test]
    fn dc_is_removed() {
        let mut p = Psd::new(64, 1000.);
        p.accumulate(&[1234; 64]);

        for b in p.result() {
            assert_abs_diff_eq!(*b, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn single_sided_doubling() {
        let mut p = Psd::with_transform(Flat, 32, 100.);
        p.accumulate(&noise(32, 3));

        let bins = p.bins();
        assert_relative_eq!(bins[0], 1. / 100. / 32., max_relative = 1e-12);
        for b in &bins[1..] {
            assert_relative_eq!(*b, 2. * bins[0], max_relative = 1e-12);
        }
    }

    #[test]
    fn window_correction_applied() {
        let mut p = Psd::with_transform(Flat, 32, 100.);
        p.accumulate(&noise(32, 3));
        p.accumulate(&noise(32, 4));
        p.accumulate(&noise(32, 5));

        let bins = p.result();
        let c = WINDOW_CORRECTION * WINDOW_CORRECTION;
        assert_relative_eq!(bins[0], c / 100. / 32., max_relative = 1e-12);
        assert_relative_eq!(bins[1], 2. * c / 100. / 32., max_relative = 1e-12);
    }

    #[test]
    fn average_of_different_segments() {
        let a = noise(64, 11);
        let b = noise(64, 12);

        let mut pa = Psd::new(64, 20.);
        pa.accumulate(&a);
        let ra = pa.result().to_vec();

        let mut pb = Psd::new(64, 20.);
        pb.accumulate(&b);
        let rb = pb.result().to_vec();

        let mut p = Psd::new(64, 20.);
        p.accumulate(&a);
        p.accumulate(&b);

        for ((x, y), r) in ra.iter().zip(&rb).zip(p.result()) {
            assert_relative_eq!((x + y) / 2., *r, max_relative = 1e-9);
        }
    }

    #[test]
    fn lazy_clear_after_read() {
        let a = sine(64, 3, 800.);
        let b = noise(64, 5);

        let mut p = Psd::new(64, 1000.);
        p.accumulate(&a);
        p.result();

        p.accumulate(&b);
        assert_eq!(p.state(), State::Accumulating { segments: 1 });
        let r = p.result().to_vec();

        let mut fresh = Psd::new(64, 1000.);
        fresh.accumulate(&b);

        assert_eq!(r, fresh.result());
    }

    #[test]
    fn clear_keeps_segments() {
        let mut p = Psd::new(16, 100.);
        p.accumulate(&noise(16, 1));
        p.accumulate(&noise(16, 2));

        p.clear();
        assert!(p.bins().iter().all(|b| *b == 0.));
        assert_eq!(p.state(), State::Accumulating { segments: 2 });

        p.accumulate(&noise(16, 3));
        let mut fresh = Psd::new(16, 100.);
        fresh.accumulate(&noise(16, 3));

        // The third segment is averaged over three segments.
        for (a, b) in p.result().iter().zip(fresh.result()) {
            assert_relative_eq!(*a * 3., *b, max_relative = 1e-9);
        }
    }

    #[test]
    fn full_capacity() {
        let mut p = Psd::new(CAPACITY, 100.);
        p.accumulate(&noise(CAPACITY, 9));
        assert_eq!(p.result().len(), CAPACITY);
    }

    #[test]
    #[should_panic]
    fn above_capacity() {
        Psd::new(CAPACITY + 1, 100.);
    }

    #[test]
    #[should_panic]
    fn zero_samples() {
        Psd::new(0, 100.);
    }

    #[test]
    #[should_panic]
    fn zero_frequency() {
        Psd::new(64, 0.);
    }

    #[test]
    fn wrong_segment_length_does_not_change_state() {
        let mut p = Psd::new(16, 100.);
        p.accumulate(&noise(16, 1));
        let before = p.bins().to_vec();

        let r = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            p.accumulate(&noise(8, 1));
        }));
        assert!(r.is_err());

        assert_eq!(p.state(), State::Accumulating { segments: 1 });
        assert_eq!(p.bins(), &before[..]);
    }

    #[test]
    fn matches_reference_transform() {
        let s = noise(256, 21);

        let mut p = Psd::new(256, 40.);
        p.accumulate(&s);
        let a = p.result().to_vec();

        let mut r = Psd::with_transform(Dft, 256, 40.);
        r.accumulate(&s);
        let b = r.result();

        let peak = b.iter().cloned().fold(0., f64::max);
        for (a, b) in a.iter().zip(b) {
            assert_abs_diff_eq!(*a, *b, epsilon = peak * 1e-4);
        }
    }

    #[test]
    fn sine_at_bin_8() {
        let mut p = Psd::new(64, 1000.);
        p.accumulate(&sine(64, 8, 1000.));
        p.accumulate(&sine(64, 8, 1000.));

        let n = p.meaningful();
        let bins = p.result().to_vec();

        let (imax, max) = bins[..n]
            .iter()
            .enumerate()
            .fold((0, 0.), |(i, m), (j, b)| if *b > m { (j, *b) } else { (i, m) });
        assert_eq!(imax, 8);

        // The Hamming main lobe spans the neighbouring bins.
        for (i, b) in bins[..n].iter().enumerate() {
            if !(7..=9).contains(&i) {
                assert!(b * 10. < max, "bin {}: {} (max: {})", i, b, max);
            }
        }
        assert!(bins[7] < 0.25 * max);
        assert!(bins[9] < 0.25 * max);

        let core = p.core_bin().unwrap();
        assert_eq!(core.index, 8);
        assert_relative_eq!(core.frequency, 125.);
        assert_eq!(core.amplitude, max);
    }

    #[test]
    fn core_bin_skips_dc() {
        let mut p = Psd::with_transform(Flat, 8, 8.);
        p.accumulate(&[0; 8]);
        assert_eq!(p.core_bin(), None);

        p.result();
        let core = p.core_bin().unwrap();
        // All non-DC bins are equal, the first one wins.
        assert_eq!(core.index, 1);
        assert_relative_eq!(core.frequency, 1.);
    }
}
