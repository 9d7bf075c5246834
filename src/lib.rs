#![cfg_attr(not(test), no_std)]

#[allow(unused_imports)]
use defmt::{debug, error, info, trace, warn};

pub mod config;
pub mod measure;
pub mod orientation;
pub mod psd;
pub mod report;
pub mod segment;
pub mod stats;
pub mod wire;
