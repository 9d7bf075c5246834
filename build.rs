use std::env;
use std::fs;
use std::io::Write;
use std::path::Path;

fn main() {
    let out_dir = env::var_os("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("config.rs");

    let psd_capacity: usize = option_env!("PSD_CAPACITY")
        .map(|p| p.parse::<usize>().unwrap())
        .unwrap_or(1024);

    let sample_frequency: u8 = option_env!("SAMPLE_FREQUENCY")
        .map(|p| p.parse::<u8>().unwrap())
        .unwrap_or(40);

    let points_psd: u8 = option_env!("POINTS_PSD")
        .map(|p| p.parse::<u8>().unwrap())
        .unwrap_or(8);

    let points_cutoff: u16 = option_env!("POINTS_CUTOFF")
        .map(|p| p.parse::<u16>().unwrap())
        .unwrap_or(128);

    let measure_interval: u32 = option_env!("MEASURE_INTERVAL")
        .map(|p| p.parse::<u32>().unwrap())
        .unwrap_or(600);

    let pause_interval: u32 = option_env!("PAUSE_INTERVAL")
        .map(|p| p.parse::<u32>().unwrap())
        .unwrap_or(300);

    let fd = fs::File::create(&dest_path).unwrap();
    writeln!(&fd, "pub const PSD_CAPACITY: usize = {psd_capacity};").unwrap();
    writeln!(&fd, "pub const SAMPLE_FREQUENCY_DEFAULT: u8 = {sample_frequency};").unwrap();
    writeln!(&fd, "pub const POINTS_PSD_DEFAULT: u8 = {points_psd};").unwrap();
    writeln!(&fd, "pub const POINTS_CUTOFF_DEFAULT: u16 = {points_cutoff};").unwrap();
    writeln!(&fd, "pub const MEASURE_INTERVAL_DEFAULT: u32 = {measure_interval};").unwrap();
    writeln!(&fd, "pub const PAUSE_INTERVAL_DEFAULT: u32 = {pause_interval};").unwrap();

    println!("cargo:rerun-if-changed=build.rs");
    for var in [
        "PSD_CAPACITY",
        "SAMPLE_FREQUENCY",
        "POINTS_PSD",
        "POINTS_CUTOFF",
        "MEASURE_INTERVAL",
        "PAUSE_INTERVAL",
    ] {
        println!("cargo:rerun-if-env-changed={var}");
    }
}
