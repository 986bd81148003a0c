// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! PCAP file packet source for offline frame extraction.
//!
//! This module provides [`PcapSource`], a [`PacketSource`] implementation that
//! reads UDP payloads from PCAP/PCAPNG files.
//!
//! # Example
//!
//! ```ignore
//! use velodyne_frames::PcapSource;
//! use velodyne_frames::packet_source::PacketSource;
//!
//! // Load PCAP file, keeping payloads sent to the data port
//! let mut source = PcapSource::from_file("sensor_data.pcap", Some(2368))?;
//!
//! let mut buf = [0u8; 2048];
//! while source.has_more() {
//!     let len = source.recv(&mut buf)?;
//!     // Process buf[..len] with driver
//! }
//! ```

use crate::{lidar::Error, packet_source::PacketSource};
use pcap_parser::{Linktype, traits::PcapReaderIterator};
use std::path::Path;
use tracing::{debug, trace};

/// Extracted UDP payload and where it sat in the capture.
#[derive(Clone)]
struct ExtractedPacket {
    /// UDP payload data
    payload: Vec<u8>,
    /// Ordinal of the capture record carrying the payload, from 1
    record: u64,
}

/// PCAP file packet source for offline replay.
///
/// Loads the entire PCAP file into memory and provides payloads via the
/// [`PacketSource`] trait. Supports both legacy PCAP and PCAPNG formats with
/// Ethernet or raw IP link layers.
pub struct PcapSource {
    /// Pre-extracted UDP payloads
    packets: Vec<ExtractedPacket>,
    /// Packet records in the capture, filtered or not
    records: u64,
    /// Current packet index
    index: usize,
}

impl PcapSource {
    /// Load PCAP file from disk, optionally filtering by destination port.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to PCAP or PCAPNG file
    /// * `port` - Optional destination port filter
    ///
    /// # Returns
    ///
    /// `PcapSource` with extracted UDP payloads, or error when the file cannot
    /// be read or is not a capture.
    pub fn from_file<P: AsRef<Path>>(path: P, port: Option<u16>) -> Result<Self, Error> {
        let data = std::fs::read(path.as_ref()).map_err(Error::Io)?;
        Self::from_bytes(&data, port)
    }

    /// Load PCAP from bytes, optionally filtering by destination port.
    ///
    /// # Arguments
    ///
    /// * `data` - Raw PCAP/PCAPNG file contents
    /// * `port` - Optional destination port filter
    pub fn from_bytes(data: &[u8], port: Option<u16>) -> Result<Self, Error> {
        let mut packets = Vec::new();

        let records = if data.len() >= 4 && data[0..4] == [0x0a, 0x0d, 0x0d, 0x0a] {
            // PCAPNG format (Section Header Block magic)
            Self::extract_pcapng(data, port, &mut packets)?
        } else {
            Self::extract_legacy_pcap(data, port, &mut packets)?
        };

        debug!(packets = packets.len(), records, ?port, "loaded capture");
        Ok(Self {
            packets,
            records,
            index: 0,
        })
    }

    /// Count one packet record and keep its payload if it passes the filter.
    fn push_record(
        packets: &mut Vec<ExtractedPacket>,
        records: &mut u64,
        linktype: Linktype,
        data: &[u8],
        port: Option<u16>,
    ) {
        *records += 1;
        if let Some(payload) = Self::extract_udp_payload(linktype, data, port) {
            packets.push(ExtractedPacket {
                payload,
                record: *records,
            });
        }
    }

    /// Extract packets from legacy PCAP format, returning the record count.
    fn extract_legacy_pcap(
        data: &[u8],
        port: Option<u16>,
        packets: &mut Vec<ExtractedPacket>,
    ) -> Result<u64, Error> {
        use pcap_parser::*;

        // Buffer size must be at least as large as the data to avoid Incomplete errors
        let mut reader = LegacyPcapReader::new(data.len().max(65536), data)
            .map_err(|e| Error::InvalidCapture(format!("failed to create PCAP reader: {:?}", e)))?;
        let mut linktype = Linktype::ETHERNET;
        let mut records = 0u64;

        loop {
            match reader.next() {
                Ok((offset, block)) => {
                    match block {
                        PcapBlockOwned::Legacy(packet) => {
                            Self::push_record(packets, &mut records, linktype, packet.data, port);
                        }
                        PcapBlockOwned::LegacyHeader(header) => {
                            linktype = header.network;
                        }
                        _ => {}
                    }
                    reader.consume(offset);
                }
                Err(PcapError::Eof) => break,
                Err(PcapError::Incomplete(_)) => {
                    // Truncated final record; everything else is loaded
                    break;
                }
                Err(e) => {
                    return Err(Error::InvalidCapture(format!("PCAP parse error: {:?}", e)));
                }
            }
        }

        Ok(records)
    }

    /// Extract packets from PCAPNG format, returning the record count.
    fn extract_pcapng(
        data: &[u8],
        port: Option<u16>,
        packets: &mut Vec<ExtractedPacket>,
    ) -> Result<u64, Error> {
        use pcap_parser::*;

        // Buffer size must be at least as large as the data to avoid Incomplete errors
        let mut reader = PcapNGReader::new(data.len().max(65536), data).map_err(|e| {
            Error::InvalidCapture(format!("failed to create PCAPNG reader: {:?}", e))
        })?;
        // Link type of each interface, indexed by interface ID
        let mut interfaces: Vec<Linktype> = Vec::new();
        let mut records = 0u64;

        loop {
            match reader.next() {
                Ok((offset, block)) => {
                    match block {
                        PcapBlockOwned::NG(Block::SectionHeader(_)) => {
                            // Interface IDs are scoped to a section
                            interfaces.clear();
                        }
                        PcapBlockOwned::NG(Block::InterfaceDescription(idb)) => {
                            interfaces.push(idb.linktype);
                        }
                        PcapBlockOwned::NG(Block::EnhancedPacket(epb)) => {
                            let linktype = interfaces
                                .get(epb.if_id as usize)
                                .copied()
                                .unwrap_or(Linktype::ETHERNET);
                            Self::push_record(packets, &mut records, linktype, epb.data, port);
                        }
                        PcapBlockOwned::NG(Block::SimplePacket(spb)) => {
                            let linktype =
                                interfaces.first().copied().unwrap_or(Linktype::ETHERNET);
                            Self::push_record(packets, &mut records, linktype, spb.data, port);
                        }
                        _ => {
                            // Skip other block types (statistics, name resolution, etc.)
                        }
                    }
                    reader.consume(offset);
                }
                Err(PcapError::Eof) => break,
                Err(PcapError::Incomplete(_)) => break,
                Err(e) => {
                    return Err(Error::InvalidCapture(format!(
                        "PCAPNG parse error: {:?}",
                        e
                    )));
                }
            }
        }

        Ok(records)
    }

    /// Extract UDP payload from raw packet data.
    ///
    /// Uses etherparse to handle Ethernet/IP/UDP headers. Records on other
    /// link layers, non-UDP traffic and payloads sent to another destination
    /// port are skipped.
    fn extract_udp_payload(
        linktype: Linktype,
        data: &[u8],
        port: Option<u16>,
    ) -> Option<Vec<u8>> {
        use etherparse::SlicedPacket;

        let packet = if linktype == Linktype::ETHERNET {
            SlicedPacket::from_ethernet(data).ok()?
        } else if linktype == Linktype::RAW
            || linktype == Linktype::IPV4
            || linktype == Linktype::IPV6
        {
            SlicedPacket::from_ip(data).ok()?
        } else {
            trace!(?linktype, "skipping record on unsupported link type");
            return None;
        };

        let udp = match packet.transport {
            Some(etherparse::TransportSlice::Udp(udp)) => udp,
            _ => return None,
        };

        if let Some(filter_port) = port {
            if udp.destination_port() != filter_port {
                return None;
            }
        }

        let payload = udp.payload().to_vec();
        if payload.is_empty() {
            return None;
        }

        Some(payload)
    }

    /// Get the total number of packets.
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Check if the source contains no packets.
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Get the number of packet records in the capture, kept or filtered.
    pub fn records(&self) -> u64 {
        self.records
    }
}

impl PacketSource for PcapSource {
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let packet = self.packets.get(self.index).ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "no more packets in PCAP",
            ))
        })?;

        let len = packet.payload.len().min(buf.len());
        buf[..len].copy_from_slice(&packet.payload[..len]);
        self.index += 1;
        Ok(len)
    }

    fn has_more(&self) -> bool {
        self.index < self.packets.len()
    }

    fn next_record(&self) -> u64 {
        self.packets
            .get(self.index)
            .map_or(self.records + 1, |packet| packet.record)
    }
}
