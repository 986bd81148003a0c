// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Packet source abstraction for LiDAR drivers.
//!
//! This module provides a [`PacketSource`] trait that abstracts the source of
//! UDP payloads, enabling:
//!
//! - **Pcap replay**: Reading from pcap files (with the `pcap` feature)
//! - **Testing**: Replaying pre-built payloads
//!
//! Sources are pulled synchronously, one payload at a time, in capture order.
//!
//! # Example
//!
//! ```
//! use velodyne_frames::packet_source::{PacketSource, TestSource};
//!
//! let mut source = TestSource::new(vec![vec![1, 2, 3], vec![4, 5]]);
//!
//! let mut buf = [0u8; 2048];
//! while source.has_more() {
//!     let len = source.recv(&mut buf).unwrap();
//!     assert!(len > 0);
//! }
//! ```

use crate::lidar::Error;

/// Trait for packet sources.
///
/// Implementations yield UDP payloads already stripped of link, IP and UDP
/// headers.
pub trait PacketSource {
    /// Receive the next payload into the provided buffer.
    ///
    /// Payloads longer than `buf` are truncated.
    ///
    /// # Returns
    /// - `Ok(len)` - Number of bytes received
    /// - `Err` - I/O error or source exhausted
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, Error>;

    /// Check if more payloads are available.
    fn has_more(&self) -> bool;

    /// Position of the next payload in the capture, counting records from 1.
    ///
    /// Records the source filtered out still count. Past the last payload
    /// this is one beyond the final record.
    fn next_record(&self) -> u64;
}

/// Replays pre-built payloads, one capture record each.
pub struct TestSource {
    packets: Vec<Vec<u8>>,
    index: usize,
}

impl TestSource {
    /// Create a new test source with the given payloads.
    pub fn new(packets: Vec<Vec<u8>>) -> Self {
        Self { packets, index: 0 }
    }

    /// Create an empty test source.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl PacketSource for TestSource {
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let packet = self.packets.get(self.index).ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "no more packets",
            ))
        })?;

        let len = packet.len().min(buf.len());
        buf[..len].copy_from_slice(&packet[..len]);
        self.index += 1;
        Ok(len)
    }

    fn has_more(&self) -> bool {
        self.index < self.packets.len()
    }

    fn next_record(&self) -> u64 {
        self.index as u64 + 1
    }
}
