// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Append-only point accumulation for the in-progress frame.
//!
//! The segmenter fills a [`FrameBuilder`] while the sensor sweeps one
//! rotation. At a rotation boundary the builder is sealed into an immutable
//! [`Frame`] and a fresh builder takes its place, so the frame being built
//! and the frame being emitted never alias.
//!
//! # Example
//!
//! ```
//! use velodyne_frames::{buffer::FrameBuilder, lidar::Point3D};
//!
//! let mut builder = FrameBuilder::with_capacity(1024);
//! builder.push(Point3D::new(1.0, 2.0, 3.0));
//! builder.push(Point3D::new(4.0, 5.0, 6.0));
//!
//! let frame = builder.seal(0);
//! assert_eq!(frame.len(), 2);
//! assert_eq!(frame.points()[1].x, 4.0);
//! ```

use crate::lidar::{Frame, Point3D};

/// Owned, append-only point buffer for one rotation.
///
/// Growth is unbounded within a frame; memory is released when the builder
/// is sealed and the resulting frame is dropped by the sink.
#[derive(Debug, Default)]
pub struct FrameBuilder {
    points: Vec<Point3D>,
}

impl FrameBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty builder with room for `capacity` points before the
    /// first reallocation.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Append a point to the end of the frame.
    #[inline]
    pub fn push(&mut self, point: Point3D) {
        self.points.push(point);
    }

    /// Returns the number of points accumulated so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if no points have been accumulated.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points accumulated so far, in arrival order.
    #[inline]
    pub fn points(&self) -> &[Point3D] {
        &self.points
    }

    /// Consume the builder and produce the immutable frame.
    pub fn seal(self, frame_id: u32) -> Frame {
        Frame::from_parts(frame_id, self.points)
    }
}
