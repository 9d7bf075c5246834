//! Running statistics of a measured channel.
//!
//! Minimum, maximum, mean and (population) standard deviation over every sample since the last
//! reset. Mean and deviation are updated with Welford's method, so segments can be added one at
//! a time without keeping them around.

/// A sample of a measured series: raw `i16` from the sensor or derived `f32`.
pub trait Sample: Copy + Default + PartialOrd + Into<f64> {}

impl<T: Copy + Default + PartialOrd + Into<f64>> Sample for T {}

/// Running statistics over samples of type `T`.
#[derive(Debug, Clone)]
pub struct Statistic<T> {
    min: T,
    max: T,
    mean: f64,
    m2: f64,
    count: u32,

    /// The next segment starts a new series.
    reset: bool,
}

impl<T: Sample> Default for Statistic<T> {
    fn default() -> Self {
        Statistic::new()
    }
}

impl<T: Sample> Statistic<T> {
    pub fn new() -> Statistic<T> {
        Statistic {
            min: T::default(),
            max: T::default(),
            mean: 0.,
            m2: 0.,
            count: 0,
            reset: true,
        }
    }

    /// Start a new series with the next segment. The previous values are still available until
    /// then.
    pub fn reset(&mut self) {
        self.reset = true;
    }

    /// Add a segment to the series.
    pub fn calculate(&mut self, data: &[T]) {
        assert!(!data.is_empty(), "empty segment");

        if self.reset {
            self.reset = false;

            self.min = data[0];
            self.max = data[0];
            self.mean = 0.;
            self.m2 = 0.;
            self.count = 0;
        }

        for v in data {
            if *v < self.min {
                self.min = *v;
            }

            if *v > self.max {
                self.max = *v;
            }

            let x: f64 = (*v).into();
            self.count += 1;

            let delta = x - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (x - self.mean);
        }
    }

    pub fn min(&self) -> T {
        self.min
    }

    pub fn max(&self) -> T {
        self.max
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn deviation(&self) -> f64 {
        if self.count == 0 {
            0.
        } else {
            libm::sqrt(self.m2 / self.count as f64)
        }
    }

    /// Number of samples in the series.
    pub fn count(&self) -> u32 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn single_segment() {
        let mut s = Statistic::<i16>::new();
        s.calculate(&[2, 4, 4, 4, 5, 5, 7, 9]);

        assert_eq!(s.min(), 2);
        assert_eq!(s.max(), 9);
        assert_relative_eq!(s.mean(), 5.0, max_relative = 1e-12);
        assert_relative_eq!(s.deviation(), 2.0, max_relative = 1e-12);
        assert_eq!(s.count(), 8);
    }

    #[test]
    fn segments_equal_concatenated() {
        let a: Vec<i16> = (0..64).map(|i| (i * 37 % 101) as i16 - 50).collect();
        let b: Vec<i16> = (0..64).map(|i| (i * 13 % 71) as i16 * 3).collect();

        let mut split = Statistic::<i16>::new();
        split.calculate(&a);
        split.calculate(&b);

        let mut whole = Statistic::<i16>::new();
        whole.calculate(&[a, b].concat());

        assert_eq!(split.min(), whole.min());
        assert_eq!(split.max(), whole.max());
        assert_relative_eq!(split.mean(), whole.mean(), max_relative = 1e-12);
        assert_relative_eq!(split.deviation(), whole.deviation(), max_relative = 1e-12);
    }

    #[test]
    fn reset_is_lazy() {
        let mut s = Statistic::<i16>::new();
        s.calculate(&[-100, 100]);
        s.reset();

        assert_eq!(s.min(), -100);
        assert_eq!(s.max(), 100);

        s.calculate(&[3, 4]);
        assert_eq!(s.min(), 3);
        assert_eq!(s.max(), 4);
        assert_relative_eq!(s.mean(), 3.5);
        assert_eq!(s.count(), 2);
    }

    #[test]
    fn negative_only() {
        let mut s = Statistic::<f32>::new();
        s.calculate(&[-3.5, -1.25, -2.0]);

        assert_eq!(s.min(), -3.5);
        assert_eq!(s.max(), -1.25);
        assert_relative_eq!(s.mean(), -6.75 / 3., max_relative = 1e-12);
    }

    #[test]
    fn constant() {
        let mut s = Statistic::<i16>::new();
        s.calculate(&[7; 32]);
        assert_eq!(s.deviation(), 0.);
    }

    #[test]
    #[should_panic]
    fn empty_segment() {
        Statistic::<i16>::new().calculate(&[]);
    }
}
