//! Transform backends for the PSD engine.
//!
//! A backend operates in-place on a complex buffer where the real part carries the segment.
//! Only the forward transform is backend specific, windowing and magnitude have default
//! implementations.

use microfft::complex::*;
use num_complex::Complex32;

use super::window::{Direction, Window};

pub trait Transform {
    /// Apply `window` to the real part of `buf`.
    fn windowing(&mut self, buf: &mut [Complex32], window: Window, dir: Direction) {
        window.apply(buf, dir);
    }

    /// In-place forward transform. The length of `buf` must be a power of two.
    fn forward(&mut self, buf: &mut [Complex32]);

    /// Replace every element with its magnitude (stored in the real part).
    fn complex_to_magnitude(&mut self, buf: &mut [Complex32]) {
        for c in buf.iter_mut() {
            c.re = libm::sqrtf(c.re * c.re + c.im * c.im);
            c.im = 0.;
        }
    }
}

/// Radix-2 FFT from `microfft`, sizes up to 4096 points.
#[derive(Debug, Default, Clone, Copy)]
pub struct MicroFft;

macro_rules! cfft {
    ($buf:expr, $($n:literal => $f:ident),+ $(,)?) => {
        match $buf.len() {
            $(
                $n => {
                    if let Ok(b) = <&mut [Complex32; $n]>::try_from($buf) {
                        $f(b);
                    }
                }
            )+
            n => panic!("unsupported transform length: {}", n),
        }
    };
}

impl Transform for MicroFft {
    fn forward(&mut self, buf: &mut [Complex32]) {
        match buf.len() {
            0 | 1 => {}
            2 => {
                let (a, b) = (buf[0], buf[1]);
                buf[0] = a + b;
                buf[1] = a - b;
            }
            _ => cfft!(
                buf,
                4 => cfft_4,
                8 => cfft_8,
                16 => cfft_16,
                32 => cfft_32,
                64 => cfft_64,
                128 => cfft_128,
                256 => cfft_256,
                512 => cfft_512,
                1024 => cfft_1024,
                2048 => cfft_2048,
                4096 => cfft_4096,
            ),
        }
    }
}
