//! Double buffer of segments between the sampling loop and the measurements. Raw sensor axes
//! are buffered as `i16`, derived series (orientation) as `f32`.
//!
//! Samples are pushed one at a time into the half being filled. When it holds a full segment it
//! is ready, and filling continues in the other half. The measurement side consumes ready
//! segments in the order they were completed. If both halves are ready the buffer is full and
//! new samples are rejected until a segment has been consumed.

use heapless::Vec;

use crate::psd::CAPACITY;

#[derive(Debug, Clone, PartialEq, Eq, defmt::Format)]
pub enum Error {
    BufFull,
}

pub struct SegmentBuf<T = i16> {
    halves: [Vec<T, CAPACITY>; 2],
    segment_size: usize,

    /// Index of the half being filled. When both halves are ready this is the oldest one.
    filling: usize,
}

impl<T: Copy> SegmentBuf<T> {
    pub fn new(segment_size: usize) -> SegmentBuf<T> {
        let mut buf = SegmentBuf {
            halves: [Vec::new(), Vec::new()],
            segment_size: 0,
            filling: 0,
        };

        buf.reset(segment_size);
        buf
    }

    /// Drop all samples and change the segment size.
    pub fn reset(&mut self, segment_size: usize) {
        assert!(
            segment_size > 0 && segment_size <= CAPACITY,
            "segment size out of range: {}",
            segment_size
        );

        self.segment_size = segment_size;
        self.filling = 0;

        for h in &mut self.halves {
            h.clear();
        }
    }

    pub fn segment_size(&self) -> usize {
        self.segment_size
    }

    fn is_ready(&self, half: usize) -> bool {
        self.halves[half].len() == self.segment_size
    }

    pub fn is_full(&self) -> bool {
        self.is_ready(0) && self.is_ready(1)
    }

    /// Number of segments ready to be consumed.
    pub fn ready(&self) -> usize {
        self.is_ready(0) as usize + self.is_ready(1) as usize
    }

    /// Add a sample. Returns `true` if it completed a segment.
    pub fn sample(&mut self, v: T) -> Result<bool, Error> {
        if self.is_ready(self.filling) {
            defmt::warn!("segment buffer is full, dropping sample.");
            return Err(Error::BufFull);
        }

        let half = &mut self.halves[self.filling];
        half.push(v).map_err(|_| Error::BufFull)?;

        if half.len() == self.segment_size {
            defmt::trace!("segment {} ready", self.filling);
            self.filling = 1 - self.filling;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Index of the oldest ready segment.
    fn oldest(&self) -> Option<usize> {
        if self.is_ready(self.filling) {
            Some(self.filling)
        } else if self.is_ready(1 - self.filling) {
            Some(1 - self.filling)
        } else {
            None
        }
    }

    /// Pass the oldest ready segment to `f` and release it for filling.
    pub fn with_ready<R>(&mut self, f: impl FnOnce(&[T]) -> R) -> Option<R> {
        let i = self.oldest()?;
        let r = f(&self.halves[i]);
        self.halves[i].clear();

        Some(r)
    }
}
