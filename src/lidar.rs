// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Common LiDAR types and the driver/sink seams of the frame pipeline.
//!
//! Drivers turn raw UDP payloads into sealed [`Frame`]s and hand them to a
//! [`FrameSink`]. The sink owns each frame once it has been emitted.

use std::fmt;

/// A single return projected into sensor-relative Cartesian space (meters).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3D {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Completed frame from the LiDAR sensor.
///
/// A frame is produced by sealing a [`crate::buffer::FrameBuilder`] and has
/// no mutation API: once emitted, its points never change.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Zero-based frame sequence number within a run
    frame_id: u32,
    /// Points in arrival order
    points: Vec<Point3D>,
}

impl Frame {
    pub(crate) fn from_parts(frame_id: u32, points: Vec<Point3D>) -> Self {
        Self { frame_id, points }
    }

    /// Sequence number assigned when the frame was sealed.
    pub fn frame_id(&self) -> u32 {
        self.frame_id
    }

    /// Points of the frame in arrival order.
    pub fn points(&self) -> &[Point3D] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Common error type for LiDAR operations
///
/// Only conditions that abort a run are errors. Malformed payloads and
/// blocks are reported as [`crate::velodyne::Rejection`] values instead and
/// never surface here.
#[derive(Debug)]
pub enum Error {
    /// I/O error (capture file, output files)
    Io(std::io::Error),
    /// Capture file could not be parsed as pcap or pcapng
    InvalidCapture(String),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::InvalidCapture(_) => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::InvalidCapture(msg) => write!(f, "invalid capture: {}", msg),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

/// Destination for emitted frames.
///
/// Frames arrive in sequence-number order, exactly once each.
pub trait FrameSink {
    fn write_frame(&mut self, frame: Frame) -> Result<(), Error>;
}

/// Collects frames in memory.
impl FrameSink for Vec<Frame> {
    fn write_frame(&mut self, frame: Frame) -> Result<(), Error> {
        self.push(frame);
        Ok(())
    }
}

/// Packet and block counters kept by a driver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DriverStats {
    /// Payloads handed to the driver
    pub packets: u64,
    /// Payloads dropped whole (wrong length)
    pub rejected_packets: u64,
    /// Blocks decoded and segmented
    pub blocks: u64,
    /// Blocks dropped (bad flag)
    pub rejected_blocks: u64,
}

/// Trait for LiDAR driver implementations
///
/// A driver owns all per-run decoding state. Payloads must be fed in capture
/// order; frame boundaries are undefined otherwise.
pub trait LidarDriver {
    /// Process one UDP payload, forwarding every frame it completes to `sink`.
    ///
    /// # Returns
    /// - `Ok(n)` with the number of frames emitted by this payload
    /// - `Err` only when the sink fails
    fn process_packet(&mut self, data: &[u8], sink: &mut dyn FrameSink) -> Result<usize, Error>;

    /// Flush the in-progress frame, if it holds any points, and reset the
    /// frame state for a new run. Counters are kept.
    ///
    /// # Returns
    /// `Ok(true)` when a trailing frame was emitted.
    fn finish(&mut self, sink: &mut dyn FrameSink) -> Result<bool, Error>;

    /// Counters accumulated since the driver was created.
    fn stats(&self) -> DriverStats;
}
