// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Velodyne VLP-16 frame extraction library
//!
//! This library rebuilds full-rotation point cloud frames from the UDP data
//! stream of a VLP-16 captured in a pcap file.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌────────────────┐     ┌─────────────────┐
//! │  PacketSource   │ ──► │ VelodyneDriver │ ──► │   FrameSink     │
//! │  (pcap/test)    │     │ decode+segment │     │ (PLY dir / Vec) │
//! └─────────────────┘     └────────────────┘     └─────────────────┘
//! ```
//!
//! The driver owns the segmentation state for one run:
//! 1. Each payload is split into 12 blocks; malformed payloads and blocks are
//!    dropped as [`velodyne::Rejection`]s
//! 2. Every return of a valid block is projected to a [`lidar::Point3D`]
//! 3. Points accumulate in a [`buffer::FrameBuilder`] until the azimuth wraps
//! 4. The builder is sealed into an immutable [`lidar::Frame`] and handed to
//!    the sink, which owns it from then on
//!
//! # Modules
//!
//! - [`buffer`]: Append-only frame builder
//! - [`formats`]: ASCII PLY output
//! - [`lidar`]: Common types, traits, and error handling
//! - [`packet_source`]: Packet source abstraction for testing
//! - [`pcap_source`]: PCAP/PCAPNG replay (feature `pcap`)
//! - [`pipeline`]: Source to sink replay loop
//! - [`velodyne`]: VLP-16 packet decoding, projection and segmentation
//!
//! # Example
//!
//! ```
//! use velodyne_frames::{
//!     lidar::Frame, packet_source::TestSource, pipeline, velodyne::VelodyneDriver,
//! };
//!
//! let mut source = TestSource::new(Vec::new());
//! let mut driver = VelodyneDriver::new();
//! let mut frames: Vec<Frame> = Vec::new();
//!
//! let summary = pipeline::run(&mut source, &mut driver, &mut frames, None).unwrap();
//! assert_eq!(summary.frames, 0);
//! ```

pub mod buffer;
pub mod formats;
pub mod lidar;
pub mod packet_source;
#[cfg(feature = "pcap")]
pub mod pcap_source;
pub mod pipeline;
pub mod velodyne;

// Re-exports for convenience
pub use lidar::{Error, Frame, FrameSink, LidarDriver, Point3D};
pub use packet_source::PacketSource;
#[cfg(feature = "pcap")]
pub use pcap_source::PcapSource;
pub use velodyne::VelodyneDriver;
