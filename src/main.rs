// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

mod args;

use args::Args;
use clap::Parser as _;
use std::process::ExitCode;
use tracing::{error, info};
use velodyne_frames::{
    Error, PcapSource, formats::PlyDirectorySink, pipeline, velodyne::VelodyneDriver,
};

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.rust_log)
        .with_target(false)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Error> {
    info!(pcap = %args.pcap.display(), port = args.port, "opening capture");
    let mut source = PcapSource::from_file(&args.pcap, Some(args.port))?;
    info!(
        packets = source.len(),
        records = source.records(),
        "capture loaded"
    );

    let mut sink = PlyDirectorySink::create(&args.output_dir, !args.keep_existing)?;
    let mut driver = VelodyneDriver::new();

    let summary = pipeline::run(&mut source, &mut driver, &mut sink, args.packet_limit())?;

    info!(
        packets = summary.packets,
        frames = summary.frames,
        points = summary.points,
        rejected_packets = summary.rejected_packets,
        rejected_blocks = summary.rejected_blocks,
        "wrote {} frames to {}",
        summary.frames,
        sink.dir().display()
    );

    Ok(())
}
