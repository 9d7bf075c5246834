//! Spectrum packet sent over the serial interface.
//!
//! The bins are sent as little endian `f32` and base64-encoded, the meta-data is sent alongside
//! in the clear.

use serde::{Deserialize, Serialize};

use crate::psd::{Psd, Transform, CAPACITY};

/// Maximum number of bins in a packet.
pub const PSD_PACKET_SZ: usize = CAPACITY / 2 + 1;

/// Maximum length of base64 string from [f32; PSD_PACKET_SZ]
pub const PSD_OUTN: usize = { PSD_PACKET_SZ * 4 } * 4 / 3 + 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, defmt::Format)]
pub struct PsdPacket {
    /// Time of the first sample of the first segment.
    pub timestamp: i64, // [ms]
    pub sample_count: u16,
    pub frequency: f32, // [Hz]

    pub bins: heapless::Vec<f32, PSD_PACKET_SZ>,
}

/// Meta-data of the packet, sent alongside the base64-encoded bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, defmt::Format)]
pub struct PsdPacketMeta {
    pub timestamp: i64,
    pub sample_count: u16,
    pub frequency: f32,
    pub length: u32,
}

impl PsdPacket {
    /// Finalize the spectrum of `psd` and take the first `points` bins (at most
    /// `sample_count / 2 + 1`).
    pub fn from_psd<T: Transform>(timestamp: i64, psd: &mut Psd<T>, points: usize) -> PsdPacket {
        let points = points.min(psd.meaningful());
        let bins = psd.result()[..points].iter().map(|b| *b as f32).collect();

        let packet = PsdPacket {
            timestamp,
            sample_count: psd.sample_count() as u16,
            frequency: psd.sample_frequency(),
            bins,
        };

        defmt::trace!("psd packet: {:?}", packet);

        packet
    }

    pub fn base64(&self) -> heapless::Vec<u8, PSD_OUTN> {
        let mut b64: heapless::Vec<_, PSD_OUTN> = heapless::Vec::new();
        b64.resize_default(PSD_OUTN).ok(); // never exceeds capacity.

        #[cfg(target_endian = "big")]
        compile_error!("serializied bins are assumed to be in little endian, target platform is big endian and no conversion is implemented.");

        let data: &[u8] = bytemuck::cast_slice(&self.bins[..]);
        let written = base64::encode_config_slice(data, base64::STANDARD, &mut b64);
        b64.truncate(written);

        b64
    }

    pub fn meta(&self, length: u32) -> PsdPacketMeta {
        PsdPacketMeta {
            timestamp: self.timestamp,
            sample_count: self.sample_count,
            frequency: self.frequency,
            length,
        }
    }
}
