// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Velodyne VLP-16 LiDAR driver implementation.
//!
//! The VLP-16 is a spinning LiDAR with:
//! - 16 lasers fired in two interleaved groups per data block
//! - 360° horizontal FOV, ±15° vertical FOV
//! - ~29,000 points per rotation at 10 Hz
//!
//! # Packet Structure
//!
//! ## Data packet - 1206 bytes, port 2368
//! - Data: 12 blocks × 100 bytes = 1200 bytes
//!   - Flag: 2 bytes, `0xEEFF` little-endian
//!   - Azimuth: 2 bytes, hundredths of a degree
//!   - Returns: 32 × (2-byte distance in 2 mm units + 1-byte intensity)
//! - Footer: 4-byte timestamp (µs past the hour), return mode, product ID
//!
//! Frames are cut where the azimuth wraps from above 350° to below 10°.
//! This is a heuristic: jitter that never crosses both thresholds can merge
//! two rotations into one frame.

use crate::{
    buffer::FrameBuilder,
    lidar::{DriverStats, Error, Frame, FrameSink, LidarDriver, Point3D},
};
use std::{f64::consts::PI, fmt};
use tracing::{debug, trace};

/// Default UDP destination port of the data stream
pub const DATA_PORT: u16 = 2368;

/// Data packet payload size in bytes
pub const PACKET_SIZE: usize = 1206;

/// Number of data blocks per packet
pub const BLOCKS_PER_PACKET: usize = 12;

/// Size of each data block in bytes
pub const BLOCK_SIZE: usize = 100;

/// Number of channel returns per data block (two firing groups of 16)
pub const CHANNELS_PER_BLOCK: usize = 32;

/// Block start marker, read little-endian
pub const BLOCK_FLAG: u16 = 0xEEFF;

/// Distance resolution in meters (2mm)
pub const DISTANCE_RESOLUTION: f64 = 0.002;

/// Vertical angle of each laser in degrees, indexed by `channel % 16`
pub const VERTICAL_ANGLES_DEG: [f64; 16] = [
    -15.0, 1.0, -13.0, -3.0, -11.0, 5.0, -9.0, 7.0, -7.0, 9.0, -5.0, 11.0, -3.0, 13.0, -1.0, 15.0,
];

/// [`VERTICAL_ANGLES_DEG`] in radians
pub const VERTICAL_ANGLES_RAD: [f64; 16] = to_radians(VERTICAL_ANGLES_DEG);

/// Raw azimuth units per degree
const AZIMUTH_SCALE: f64 = 100.0;

/// Offset of the first channel return within a block
const RETURNS_OFFSET: usize = 4;

/// Size of one channel return in bytes
const RETURN_SIZE: usize = 3;

/// A rotation closes when the previous azimuth is above this...
const WRAP_HIGH_DEG: f64 = 350.0;

/// ...and the next one is below this.
const WRAP_LOW_DEG: f64 = 10.0;

/// Expected points per rotation (~29,000 at 10Hz)
const POINTS_PER_FRAME: usize = 30_000;

const fn to_radians(degrees: [f64; 16]) -> [f64; 16] {
    let mut radians = [0.0; 16];
    let mut i = 0;
    while i < degrees.len() {
        radians[i] = degrees[i] * PI / 180.0;
        i += 1;
    }
    radians
}

/// Why a payload or block was dropped.
///
/// Rejections are not errors: the payload or block is skipped and
/// processing continues with the next one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// Payload length differs from [`PACKET_SIZE`]; no block is decoded
    PayloadLength(usize),
    /// Block flag differs from [`BLOCK_FLAG`]; nothing else in the block is
    /// read
    BlockFlag { index: usize, flag: u16 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Rejection::PayloadLength(len) => {
                write!(f, "payload is {} bytes, expected {}", len, PACKET_SIZE)
            }
            Rejection::BlockFlag { index, flag } => {
                write!(f, "block {} has flag {:#06x}, expected {:#06x}", index, flag, BLOCK_FLAG)
            }
        }
    }
}

/// One laser return within a data block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChannelReturn {
    /// Channel index within the block (0..32)
    pub channel: usize,
    /// Distance in 2mm units, 0 means no return
    pub distance_raw: u16,
    /// Calibrated reflectivity (unused for projection)
    pub intensity: u8,
}

/// A decoded data block carrying a valid flag.
#[derive(Clone, Debug, PartialEq)]
pub struct DataBlock {
    azimuth_raw: u16,
    returns: [ChannelReturn; CHANNELS_PER_BLOCK],
}

impl DataBlock {
    /// Parse one 100-byte block slice.
    fn parse(index: usize, block: &[u8]) -> Result<Self, Rejection> {
        let flag = u16::from_le_bytes([block[0], block[1]]);
        if flag != BLOCK_FLAG {
            return Err(Rejection::BlockFlag { index, flag });
        }

        let azimuth_raw = u16::from_le_bytes([block[2], block[3]]);
        let returns = std::array::from_fn(|channel| {
            let offset = RETURNS_OFFSET + channel * RETURN_SIZE;
            ChannelReturn {
                channel,
                distance_raw: u16::from_le_bytes([block[offset], block[offset + 1]]),
                intensity: block[offset + 2],
            }
        });

        Ok(Self {
            azimuth_raw,
            returns,
        })
    }

    /// Azimuth in hundredths of a degree, as reported by the sensor.
    pub fn azimuth_raw(&self) -> u16 {
        self.azimuth_raw
    }

    /// Azimuth in degrees.
    pub fn azimuth(&self) -> f64 {
        self.azimuth_raw as f64 / AZIMUTH_SCALE
    }

    /// All 32 channel returns in channel order, including zero-distance ones.
    pub fn returns(&self) -> &[ChannelReturn; CHANNELS_PER_BLOCK] {
        &self.returns
    }
}

/// Lazy iterator over the blocks of one payload, in slice order.
///
/// Yields exactly [`BLOCKS_PER_PACKET`] items; each block is decoded only
/// when requested.
pub struct Blocks<'a> {
    chunks: std::iter::Enumerate<std::slice::ChunksExact<'a, u8>>,
}

impl Iterator for Blocks<'_> {
    type Item = Result<DataBlock, Rejection>;

    fn next(&mut self) -> Option<Self::Item> {
        self.chunks
            .next()
            .map(|(index, block)| DataBlock::parse(index, block))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for Blocks<'_> {}

/// Split a payload into its data blocks.
///
/// A payload of any length other than [`PACKET_SIZE`] is rejected whole.
pub fn decode_packet(payload: &[u8]) -> Result<Blocks<'_>, Rejection> {
    if payload.len() != PACKET_SIZE {
        return Err(Rejection::PayloadLength(payload.len()));
    }

    Ok(Blocks {
        chunks: payload[..BLOCKS_PER_PACKET * BLOCK_SIZE]
            .chunks_exact(BLOCK_SIZE)
            .enumerate(),
    })
}

/// Project a single channel return into sensor-relative Cartesian space.
///
/// Returns `None` for a zero distance. The second firing group (channels
/// 16..32) reuses the vertical angles of the first and receives no azimuth
/// interpolation.
pub fn project(azimuth_deg: f64, channel: usize, distance_raw: u16) -> Option<Point3D> {
    if distance_raw == 0 {
        return None;
    }

    let vertical = VERTICAL_ANGLES_RAD[channel % VERTICAL_ANGLES_RAD.len()];
    let distance = distance_raw as f64 * DISTANCE_RESOLUTION;
    let xy_distance = distance * vertical.cos();
    let azimuth = azimuth_deg * (PI / 180.0);

    Some(Point3D {
        x: (xy_distance * azimuth.sin()) as f32,
        y: (xy_distance * azimuth.cos()) as f32,
        z: (distance * vertical.sin()) as f32,
    })
}

/// True when moving from `last` to `current` degrees crosses zero azimuth.
pub fn is_wraparound(last: f64, current: f64) -> bool {
    last > WRAP_HIGH_DEG && current < WRAP_LOW_DEG
}

/// Return mode reported in the packet footer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReturnMode {
    Strongest,
    Last,
    Dual,
    Unknown(u8),
}

impl From<u8> for ReturnMode {
    fn from(value: u8) -> Self {
        match value {
            0x37 => ReturnMode::Strongest,
            0x38 => ReturnMode::Last,
            0x39 => ReturnMode::Dual,
            other => ReturnMode::Unknown(other),
        }
    }
}

/// Trailing six bytes of a data packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacketFooter {
    /// Microseconds past the top of the hour
    pub timestamp_us: u32,
    pub return_mode: ReturnMode,
    /// 0x22 for VLP-16
    pub product_id: u8,
}

impl PacketFooter {
    /// Read the footer of a full-size payload.
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        if payload.len() != PACKET_SIZE {
            return None;
        }

        let footer = &payload[BLOCKS_PER_PACKET * BLOCK_SIZE..];
        Some(Self {
            timestamp_us: u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]),
            return_mode: ReturnMode::from(footer[4]),
            product_id: footer[5],
        })
    }
}

/// Rotation segmentation state for one capture run.
///
/// Consumes valid blocks strictly in arrival order. `last_azimuth` is `None`
/// until the first block arrives; rejected blocks never reach the segmenter
/// and so never move it.
#[derive(Debug)]
pub struct FrameSegmenter {
    last_azimuth: Option<f64>,
    current: FrameBuilder,
    next_frame_id: u32,
}

impl FrameSegmenter {
    pub fn new() -> Self {
        Self {
            last_azimuth: None,
            current: FrameBuilder::with_capacity(POINTS_PER_FRAME),
            next_frame_id: 0,
        }
    }

    /// Azimuth of the most recent block, in degrees.
    pub fn last_azimuth(&self) -> Option<f64> {
        self.last_azimuth
    }

    /// The frame currently being accumulated.
    pub fn pending(&self) -> &FrameBuilder {
        &self.current
    }

    /// Number of frames sealed so far.
    pub fn frames_emitted(&self) -> u32 {
        self.next_frame_id
    }

    /// Feed one block, returning the previous rotation if this block starts a
    /// new one.
    ///
    /// The returned frame may be empty when a whole rotation produced no
    /// returns.
    pub fn push_block(&mut self, block: &DataBlock) -> Option<Frame> {
        let azimuth = block.azimuth();

        let completed = match self.last_azimuth {
            Some(last) if is_wraparound(last, azimuth) => Some(self.seal_current()),
            _ => None,
        };

        for ret in block.returns() {
            if let Some(point) = project(azimuth, ret.channel, ret.distance_raw) {
                self.current.push(point);
            }
        }

        self.last_azimuth = Some(azimuth);
        completed
    }

    /// End of input: seal the partial rotation, if it holds any points.
    pub fn finish(self) -> Option<Frame> {
        if self.current.is_empty() {
            return None;
        }
        Some(self.current.seal(self.next_frame_id))
    }

    fn seal_current(&mut self) -> Frame {
        let builder = std::mem::replace(
            &mut self.current,
            FrameBuilder::with_capacity(POINTS_PER_FRAME),
        );
        let frame = builder.seal(self.next_frame_id);
        self.next_frame_id = self.next_frame_id.wrapping_add(1);
        frame
    }
}

impl Default for FrameSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

/// Velodyne VLP-16 LiDAR driver
#[derive(Debug, Default)]
pub struct VelodyneDriver {
    /// Rotation segmentation state
    segmenter: FrameSegmenter,
    /// Packet and block counters
    stats: DriverStats,
    /// Whether the footer of the first valid packet has been logged
    footer_seen: bool,
}

impl VelodyneDriver {
    /// Create a new VLP-16 driver
    pub fn new() -> Self {
        Self::default()
    }

    /// Access the rotation segmentation state.
    pub fn segmenter(&self) -> &FrameSegmenter {
        &self.segmenter
    }

    fn emit(frame: Frame, sink: &mut dyn FrameSink) -> Result<(), Error> {
        debug!(
            frame_id = frame.frame_id(),
            points = frame.len(),
            "frame complete"
        );
        sink.write_frame(frame)
    }
}

impl LidarDriver for VelodyneDriver {
    fn process_packet(&mut self, data: &[u8], sink: &mut dyn FrameSink) -> Result<usize, Error> {
        self.stats.packets += 1;

        let blocks = match decode_packet(data) {
            Ok(blocks) => blocks,
            Err(rejection) => {
                self.stats.rejected_packets += 1;
                trace!(%rejection, "dropping payload");
                return Ok(0);
            }
        };

        if !self.footer_seen {
            if let Some(footer) = PacketFooter::from_payload(data) {
                debug!(
                    return_mode = ?footer.return_mode,
                    product_id = footer.product_id,
                    "first data packet"
                );
            }
            self.footer_seen = true;
        }

        let mut emitted = 0;
        for block in blocks {
            match block {
                Ok(block) => {
                    self.stats.blocks += 1;
                    if let Some(frame) = self.segmenter.push_block(&block) {
                        Self::emit(frame, sink)?;
                        emitted += 1;
                    }
                }
                Err(rejection) => {
                    self.stats.rejected_blocks += 1;
                    trace!(%rejection, "dropping block");
                }
            }
        }

        Ok(emitted)
    }

    fn finish(&mut self, sink: &mut dyn FrameSink) -> Result<bool, Error> {
        self.footer_seen = false;
        match std::mem::take(&mut self.segmenter).finish() {
            Some(frame) => {
                Self::emit(frame, sink)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn stats(&self) -> DriverStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a 100-byte block with the given flag, raw azimuth and
    /// `(channel, distance_raw)` returns. Other channels report no return.
    fn make_block(flag: u16, azimuth_raw: u16, returns: &[(usize, u16)]) -> [u8; BLOCK_SIZE] {
        let mut block = [0u8; BLOCK_SIZE];
        block[0..2].copy_from_slice(&flag.to_le_bytes());
        block[2..4].copy_from_slice(&azimuth_raw.to_le_bytes());
        for &(channel, distance) in returns {
            let offset = RETURNS_OFFSET + channel * RETURN_SIZE;
            block[offset..offset + 2].copy_from_slice(&distance.to_le_bytes());
            block[offset + 2] = 100;
        }
        block
    }

    /// Build a full payload; missing blocks are left zeroed and so fail the
    /// flag check.
    fn make_packet(blocks: &[[u8; BLOCK_SIZE]]) -> Vec<u8> {
        let mut packet = vec![0u8; PACKET_SIZE];
        for (i, block) in blocks.iter().enumerate() {
            packet[i * BLOCK_SIZE..(i + 1) * BLOCK_SIZE].copy_from_slice(block);
        }
        packet[1204] = 0x37;
        packet[1205] = 0x22;
        packet
    }

    fn data_block(azimuth_deg: f64, returns: &[(usize, u16)]) -> DataBlock {
        let raw = make_block(BLOCK_FLAG, (azimuth_deg * 100.0).round() as u16, returns);
        DataBlock::parse(0, &raw).unwrap()
    }

    #[test]
    fn test_vertical_angles_in_radians() {
        for (deg, rad) in VERTICAL_ANGLES_DEG.iter().zip(VERTICAL_ANGLES_RAD.iter()) {
            assert!((deg.to_radians() - rad).abs() < 1e-12);
        }
        assert_eq!(VERTICAL_ANGLES_DEG[0], -15.0);
        assert_eq!(VERTICAL_ANGLES_DEG[15], 15.0);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        for len in [0, 100, PACKET_SIZE - 1, PACKET_SIZE + 1, 1248] {
            let payload = vec![0xffu8; len];
            match decode_packet(&payload) {
                Err(Rejection::PayloadLength(n)) => assert_eq!(n, len),
                Err(other) => panic!("unexpected rejection {:?}", other),
                Ok(_) => panic!("payload of {} bytes was accepted", len),
            }
        }
    }

    #[test]
    fn test_decode_full_packet() {
        let blocks: Vec<_> = (0..BLOCKS_PER_PACKET)
            .map(|i| make_block(BLOCK_FLAG, 1000 + i as u16 * 20, &[(0, 5000), (31, 250)]))
            .collect();
        let packet = make_packet(&blocks);

        let decoded: Vec<_> = decode_packet(&packet).unwrap().collect();
        assert_eq!(decoded.len(), BLOCKS_PER_PACKET);

        for (i, block) in decoded.into_iter().enumerate() {
            let block = block.unwrap();
            assert_eq!(block.azimuth_raw(), 1000 + i as u16 * 20);
            assert!((block.azimuth() - (10.0 + i as f64 * 0.2)).abs() < 1e-9);

            let returns = block.returns();
            assert_eq!(returns[0].channel, 0);
            assert_eq!(returns[0].distance_raw, 5000);
            assert_eq!(returns[0].intensity, 100);
            assert_eq!(returns[31].channel, 31);
            assert_eq!(returns[31].distance_raw, 250);
            assert_eq!(returns[15].distance_raw, 0);
        }
    }

    #[test]
    fn test_decode_skips_bad_flag_only() {
        let good = make_block(BLOCK_FLAG, 4500, &[(3, 1234)]);
        let bad = make_block(0xDDFF, 4600, &[(3, 1234)]);
        let packet = make_packet(&[good, bad, good]);

        let decoded: Vec<_> = decode_packet(&packet).unwrap().collect();
        assert_eq!(decoded.len(), BLOCKS_PER_PACKET);
        assert!(decoded[0].is_ok());
        assert_eq!(
            decoded[1],
            Err(Rejection::BlockFlag {
                index: 1,
                flag: 0xDDFF
            })
        );
        assert!(decoded[2].is_ok());
        // Zeroed tail blocks carry no flag
        assert_eq!(
            decoded[3],
            Err(Rejection::BlockFlag { index: 3, flag: 0 })
        );
    }

    #[test]
    fn test_rejection_display() {
        assert_eq!(
            Rejection::PayloadLength(512).to_string(),
            "payload is 512 bytes, expected 1206"
        );
        assert_eq!(
            Rejection::BlockFlag {
                index: 2,
                flag: 0x1234
            }
            .to_string(),
            "block 2 has flag 0x1234, expected 0xeeff"
        );
    }

    #[test]
    fn test_packet_footer() {
        let mut packet = make_packet(&[]);
        packet[1200..1204].copy_from_slice(&123_456u32.to_le_bytes());
        let footer = PacketFooter::from_payload(&packet).unwrap();
        assert_eq!(footer.timestamp_us, 123_456);
        assert_eq!(footer.return_mode, ReturnMode::Strongest);
        assert_eq!(footer.product_id, 0x22);

        assert!(PacketFooter::from_payload(&packet[..1200]).is_none());
    }

    #[test]
    fn test_return_mode_from() {
        assert_eq!(ReturnMode::from(0x37), ReturnMode::Strongest);
        assert_eq!(ReturnMode::from(0x38), ReturnMode::Last);
        assert_eq!(ReturnMode::from(0x39), ReturnMode::Dual);
        assert_eq!(ReturnMode::from(0x00), ReturnMode::Unknown(0x00));
    }

    #[test]
    fn test_project_zero_distance() {
        for channel in 0..CHANNELS_PER_BLOCK {
            for azimuth in [0.0, 0.01, 90.0, 179.99, 270.5, 359.99] {
                assert!(project(azimuth, channel, 0).is_none());
            }
        }
    }

    #[test]
    fn test_project_worked_example() {
        // 5000 * 2mm = 10m on the -15° laser, straight ahead
        let point = project(0.0, 0, 5000).unwrap();
        assert!(point.x.abs() < 1e-6);
        assert!((point.y - 9.659).abs() < 1e-3);
        assert!((point.z + 2.588).abs() < 1e-3);
    }

    #[test]
    fn test_project_geometry() {
        for channel in 0..CHANNELS_PER_BLOCK {
            for azimuth in [0.0, 12.34, 90.0, 200.0, 359.99] {
                for distance_raw in [1u16, 777, 5000, u16::MAX] {
                    let point = project(azimuth, channel, distance_raw).unwrap();

                    let vertical = VERTICAL_ANGLES_RAD[channel % 16];
                    let distance = distance_raw as f64 * DISTANCE_RESOLUTION;
                    let xy = distance * vertical.cos();

                    let radius_sq = (point.x as f64).powi(2) + (point.y as f64).powi(2);
                    assert!(
                        (radius_sq - xy * xy).abs() <= 1e-5 * (xy * xy).max(1.0),
                        "channel {} azimuth {} distance {}",
                        channel,
                        azimuth,
                        distance_raw
                    );
                    assert_eq!(point.z, (distance * vertical.sin()) as f32);
                }
            }
        }
    }

    #[test]
    fn test_project_firing_groups_share_angles() {
        for channel in 0..16 {
            assert_eq!(
                project(123.45, channel, 3000),
                project(123.45, channel + 16, 3000)
            );
        }
    }

    #[test]
    fn test_project_quadrants() {
        let east = project(90.0, 1, 500).unwrap();
        assert!(east.x > 0.99 && east.y.abs() < 1e-6);

        let south = project(180.0, 1, 500).unwrap();
        assert!(south.y < -0.99 && south.x.abs() < 1e-6);

        let west = project(270.0, 1, 500).unwrap();
        assert!(west.x < -0.99);
    }

    #[test]
    fn test_is_wraparound() {
        assert!(is_wraparound(358.5, 3.2));
        assert!(is_wraparound(350.01, 9.99));
        assert!(!is_wraparound(350.0, 3.2));
        assert!(!is_wraparound(358.5, 10.0));
        assert!(!is_wraparound(340.0, 5.0));
        assert!(!is_wraparound(3.2, 358.5));
    }

    #[test]
    fn test_segmenter_boundary_crossed() {
        let mut segmenter = FrameSegmenter::new();
        assert!(segmenter.last_azimuth().is_none());

        assert!(segmenter.push_block(&data_block(357.0, &[(0, 100)])).is_none());
        assert!(segmenter.push_block(&data_block(358.5, &[(1, 100)])).is_none());
        let frame = segmenter
            .push_block(&data_block(3.2, &[(2, 100)]))
            .expect("boundary between 358.5 and 3.2");
        assert_eq!(frame.frame_id(), 0);
        assert_eq!(frame.len(), 2);
        assert!(segmenter.push_block(&data_block(5.0, &[(3, 100)])).is_none());

        assert_eq!(segmenter.frames_emitted(), 1);
        assert_eq!(segmenter.pending().len(), 2);
        assert_eq!(segmenter.last_azimuth(), Some(5.0));
    }

    #[test]
    fn test_segmenter_threshold_not_crossed() {
        let mut segmenter = FrameSegmenter::new();
        for azimuth in [300.0, 340.0, 5.0, 20.0] {
            assert!(segmenter.push_block(&data_block(azimuth, &[(0, 100)])).is_none());
        }
        assert_eq!(segmenter.frames_emitted(), 0);

        let frame = segmenter.finish().unwrap();
        assert_eq!(frame.len(), 4);
    }

    #[test]
    fn test_segmenter_first_block_never_closes() {
        let mut segmenter = FrameSegmenter::new();
        assert!(segmenter.push_block(&data_block(0.5, &[(0, 100)])).is_none());
        assert!(segmenter.push_block(&data_block(355.0, &[(0, 100)])).is_none());
    }

    #[test]
    fn test_segmenter_full_rotation() {
        let mut segmenter = FrameSegmenter::new();
        let mut frames = Vec::new();

        let mut azimuths: Vec<f64> = (0..12).map(|i| i as f64 * 30.0).collect();
        azimuths.extend([355.0, 5.0]);
        for azimuth in &azimuths {
            if let Some(frame) = segmenter.push_block(&data_block(*azimuth, &[(0, 1000)])) {
                frames.push(frame);
            }
        }
        frames.extend(segmenter.finish());

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].frame_id(), 0);
        assert_eq!(frames[0].len(), 13);
        assert_eq!(frames[1].frame_id(), 1);
        assert_eq!(frames[1].len(), 1);
    }

    #[test]
    fn test_segmenter_emits_empty_frame_at_boundary() {
        let mut segmenter = FrameSegmenter::new();
        assert!(segmenter.push_block(&data_block(355.0, &[])).is_none());
        let frame = segmenter.push_block(&data_block(1.0, &[])).unwrap();
        assert!(frame.is_empty());
        // Nothing accumulated since: no trailing flush
        assert!(segmenter.finish().is_none());
    }

    #[test]
    fn test_segmenter_channel_order_within_block() {
        let mut segmenter = FrameSegmenter::new();
        segmenter.push_block(&data_block(45.0, &[(20, 300), (2, 100), (9, 200)]));

        let frame = segmenter.finish().unwrap();
        let expected: Vec<_> = [(2, 100), (9, 200), (20, 300)]
            .iter()
            .map(|&(channel, distance)| project(45.0, channel, distance).unwrap())
            .collect();
        assert_eq!(frame.points(), expected.as_slice());
    }

    #[test]
    fn test_driver_rejected_block_keeps_azimuth() {
        let mut driver = VelodyneDriver::new();
        let mut sink: Vec<Frame> = Vec::new();

        // Valid block at 355°, then a corrupted block whose azimuth bytes read
        // 5°: the corrupted block must not move the tracked azimuth.
        let packet = make_packet(&[
            make_block(BLOCK_FLAG, 35500, &[(0, 100)]),
            make_block(0x0000, 500, &[(0, 100)]),
        ]);
        assert_eq!(driver.process_packet(&packet, &mut sink).unwrap(), 0);
        assert_eq!(driver.segmenter().last_azimuth(), Some(355.0));

        // Next valid block wraps relative to 355°, not 5°.
        let packet = make_packet(&[make_block(BLOCK_FLAG, 300, &[(0, 100)])]);
        assert_eq!(driver.process_packet(&packet, &mut sink).unwrap(), 1);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].len(), 1);

        let stats = driver.stats();
        assert_eq!(stats.packets, 2);
        assert_eq!(stats.blocks, 2);
        assert_eq!(stats.rejected_blocks, 22);
        assert_eq!(stats.rejected_packets, 0);
    }

    #[test]
    fn test_driver_rejects_wrong_length() {
        let mut driver = VelodyneDriver::new();
        let mut sink: Vec<Frame> = Vec::new();

        let mut packet = make_packet(&[make_block(BLOCK_FLAG, 100, &[(0, 100)])]);
        packet.push(0);
        assert_eq!(driver.process_packet(&packet, &mut sink).unwrap(), 0);

        assert!(driver.segmenter().last_azimuth().is_none());
        assert!(driver.segmenter().pending().is_empty());
        assert_eq!(driver.stats().rejected_packets, 1);
        assert!(!driver.finish(&mut sink).unwrap());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_driver_finish_flushes_and_resets() {
        let mut driver = VelodyneDriver::new();
        let mut sink: Vec<Frame> = Vec::new();

        let packet = make_packet(&[make_block(BLOCK_FLAG, 9000, &[(0, 100), (1, 100)])]);
        driver.process_packet(&packet, &mut sink).unwrap();
        assert!(sink.is_empty());

        assert!(driver.finish(&mut sink).unwrap());
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].len(), 2);

        // Fresh state afterwards
        assert!(driver.segmenter().last_azimuth().is_none());
        assert!(!driver.finish(&mut sink).unwrap());
        assert_eq!(sink.len(), 1);
    }
}
