// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use clap::Parser;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use velodyne_frames::velodyne::DATA_PORT;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Packet capture (pcap or pcapng) recorded from the sensor.
    #[arg(env)]
    pub pcap: PathBuf,

    /// Directory receiving one PLY file per frame.
    #[arg(long, env, default_value = "frames")]
    pub output_dir: PathBuf,

    /// Stop after this many capture records, 0 reads the whole capture.
    #[arg(long, env, default_value = "10000")]
    pub max_packets: u64,

    /// UDP destination port of the sensor data stream.
    #[arg(long, env, default_value_t = DATA_PORT)]
    pub port: u16,

    /// Keep an existing output directory instead of clearing it first.
    #[arg(long, env)]
    pub keep_existing: bool,

    /// Application log level
    #[arg(long, env, default_value = "info")]
    pub rust_log: LevelFilter,
}

impl Args {
    /// Record cap, `None` when unlimited.
    pub fn packet_limit(&self) -> Option<u64> {
        (self.max_packets > 0).then_some(self.max_packets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["velodyne-frames", "capture.pcap"]).unwrap();
        assert_eq!(args.pcap, PathBuf::from("capture.pcap"));
        assert_eq!(args.output_dir, PathBuf::from("frames"));
        assert_eq!(args.packet_limit(), Some(10000));
        assert_eq!(args.port, 2368);
        assert!(!args.keep_existing);
        assert_eq!(args.rust_log, LevelFilter::INFO);
    }

    #[test]
    fn test_unlimited_packets() {
        let args = Args::try_parse_from([
            "velodyne-frames",
            "capture.pcap",
            "--max-packets",
            "0",
            "--rust-log",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.packet_limit(), None);
        assert_eq!(args.rust_log, LevelFilter::DEBUG);
    }
}
