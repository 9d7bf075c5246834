//! Text report of a measurement, as stored on the SD-card.
//!
//! ```text
//! FW 0.1.0
//! BATT 3.9V
//! BATT 87%
//! START_TIME 2/6/2024 13:5:0
//! Logging Rate,40
//!
//! Channel Name,ACC_X
//! Channel Units,m/s^2
//! Maximum,0.245
//! Minimum,-0.198
//! Mean,0.0012
//! Standard Deviation,0.0754
//! Core Frequency (256pt PSD),1.25,0.0341
//! PSD_128_256,1.2E-06,3.4E-05,...
//!
//! ```
//!
//! Numbers are written like C's `%G`: six significant digits, trailing zeros removed, exponent
//! notation for very small or large values.

use chrono::{Datelike, NaiveDateTime, Timelike};
use core::fmt::{self, Write};

use crate::config::Settings;
use crate::measure::Channel;
use crate::stats::Sample;

/// Significant digits of numbers in the report.
const PRECISION: usize = 6;

/// A number formatted like C's `%G`.
#[derive(Debug, Clone, Copy)]
pub struct G(pub f64);

impl fmt::Display for G {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;

        if v.is_nan() {
            return f.write_str("NAN");
        }

        if v.is_infinite() {
            return f.write_str(if v < 0. { "-INF" } else { "INF" });
        }

        if v == 0. {
            return f.write_str("0");
        }

        // Let the exponent formatting do the rounding to significant digits.
        let mut s = heapless::String::<32>::new();
        write!(s, "{:.*e}", PRECISION - 1, v)?;
        let (mantissa, exp) = s.split_once('e').ok_or(fmt::Error)?;
        let exp: i32 = exp.parse().map_err(|_| fmt::Error)?;

        if exp < -4 || exp >= PRECISION as i32 {
            let sign = if exp < 0 { '-' } else { '+' };
            write!(f, "{}E{}{:02}", trim(mantissa), sign, exp.abs())
        } else {
            let mut s = heapless::String::<32>::new();
            write!(s, "{:.*}", (PRECISION as i32 - 1 - exp) as usize, v)?;
            f.write_str(trim(&s))
        }
    }
}

/// Remove trailing zeros of a decimal number (and the point if nothing is left after it).
fn trim(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[derive(Debug, Clone, Copy, PartialEq, defmt::Format)]
pub struct Battery {
    pub voltage: u16, // [mV]
    pub level: u8,    // [%]
}

pub struct Header<'a> {
    pub firmware: &'a str,
    pub battery: Option<Battery>,
    pub start: NaiveDateTime,
}

pub fn write_header<W: Write>(w: &mut W, header: &Header, settings: &Settings) -> fmt::Result {
    writeln!(w, "FW {}", header.firmware)?;

    if let Some(b) = header.battery {
        writeln!(w, "BATT {:.1}V", b.voltage as f32 / 1000.)?;
        writeln!(w, "BATT {}%", b.level)?;
    }

    let t = header.start;
    writeln!(
        w,
        "START_TIME {}/{}/{} {}:{}:{}",
        t.day(),
        t.month(),
        t.year(),
        t.hour(),
        t.minute(),
        t.second()
    )?;
    writeln!(w, "Logging Rate,{}", settings.frequency)?;
    writeln!(w)
}

/// Write statistics and spectrum of a channel. Reading the spectrum finalizes the average, see
/// [`crate::psd::Psd::result`].
pub fn write_channel<W: Write, T: Sample>(
    w: &mut W,
    channel: &mut Channel<T>,
    settings: &Settings,
) -> fmt::Result {
    writeln!(w, "Channel Name,{}", channel.name)?;
    writeln!(w, "Channel Units,{}", channel.units)?;

    if let Some(s) = channel.stats() {
        let scale = channel.scale;

        let (max, min): (f64, f64) = (s.max().into(), s.min().into());

        writeln!(w, "Maximum,{}", G(max * scale))?;
        writeln!(w, "Minimum,{}", G(min * scale))?;
        writeln!(w, "Mean,{}", G(s.mean() * scale))?;
        writeln!(w, "Standard Deviation,{}", G(s.deviation() * scale))?;
    }

    if let Some(psd) = channel.psd_mut() {
        let n = psd.sample_count();
        let points = settings.result_points(n);

        psd.result();

        if let Some(core) = psd.core_bin() {
            writeln!(
                w,
                "Core Frequency ({}pt PSD),{},{}",
                n,
                G(core.frequency as f64),
                G(core.amplitude)
            )?;
        }

        write!(w, "PSD_{}_{}", points, n)?;
        for b in &psd.bins()[..points] {
            write!(w, ",{}", G(*b))?;
        }
        writeln!(w)?;
    }

    writeln!(w)
}
