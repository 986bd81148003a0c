// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Capture replay loop: source -> driver -> sink.
//!
//! [`run`] pulls payloads in capture order until the source is exhausted or
//! the packet cap is reached, then flushes the partial rotation still held
//! by the driver. The cap counts capture records, including the ones the
//! source filtered out.

use crate::{
    lidar::{Error, Frame, FrameSink, LidarDriver},
    packet_source::PacketSource,
};
use tracing::{debug, info};

/// Largest possible UDP payload
const MAX_PAYLOAD: usize = 65_535;

/// Progress is logged every this many payloads
const PROGRESS_INTERVAL: u64 = 100;

/// Totals for one replay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Payloads pulled from the source
    pub packets: u64,
    /// Frames handed to the sink, including the trailing partial one
    pub frames: u64,
    /// Points across all emitted frames
    pub points: u64,
    /// Payloads dropped for having the wrong length
    pub rejected_packets: u64,
    /// Blocks dropped for a bad flag
    pub rejected_blocks: u64,
}

/// Forwards frames while keeping totals.
struct CountingSink<'a> {
    inner: &'a mut dyn FrameSink,
    frames: u64,
    points: u64,
}

impl FrameSink for CountingSink<'_> {
    fn write_frame(&mut self, frame: Frame) -> Result<(), Error> {
        self.frames += 1;
        self.points += frame.len() as u64;
        self.inner.write_frame(frame)
    }
}

/// Replay `source` through `driver` into `sink`.
///
/// With a cap, only payloads from the first `max_packets` capture records
/// are pulled. Stopping at the cap still flushes the in-progress frame. Only
/// source or sink failures end the run early.
pub fn run<S, D>(
    source: &mut S,
    driver: &mut D,
    sink: &mut dyn FrameSink,
    max_packets: Option<u64>,
) -> Result<RunSummary, Error>
where
    S: PacketSource + ?Sized,
    D: LidarDriver + ?Sized,
{
    let before = driver.stats();
    let mut sink = CountingSink {
        inner: sink,
        frames: 0,
        points: 0,
    };
    let mut buf = vec![0u8; MAX_PAYLOAD];
    let mut packets = 0u64;

    while source.has_more() && max_packets.is_none_or(|max| source.next_record() <= max) {
        let len = source.recv(&mut buf)?;
        packets += 1;

        driver.process_packet(&buf[..len], &mut sink)?;

        if packets % PROGRESS_INTERVAL == 0 {
            debug!(packets, frames = sink.frames, "progress");
        }
    }

    if let Some(max) = max_packets {
        if source.has_more() {
            info!(packets, records = max, "packet limit reached");
        }
    }

    driver.finish(&mut sink)?;

    let after = driver.stats();
    Ok(RunSummary {
        packets,
        frames: sink.frames,
        points: sink.points,
        rejected_packets: after.rejected_packets - before.rejected_packets,
        rejected_blocks: after.rejected_blocks - before.rejected_blocks,
    })
}
