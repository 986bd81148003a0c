// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Point cloud output in the ASCII PLY exchange format.
//!
//! # Layout
//!
//! ```text
//! ply
//! format ascii 1.0
//! element vertex <N>
//! property float x
//! property float y
//! property float z
//! end_header
//! <x> <y> <z>        one line per point
//! ```
//!
//! Coordinates are written with Rust's float formatting, which always uses
//! `.` as the decimal separator and the shortest text that reads back to the
//! same `f32`.

use crate::lidar::{Error, Frame, FrameSink, Point3D};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// Write `points` as an ASCII PLY document.
///
/// An empty slice produces a header declaring zero vertices.
pub fn write_ply<W: Write>(mut writer: W, points: &[Point3D]) -> std::io::Result<()> {
    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "element vertex {}", points.len())?;
    writeln!(writer, "property float x")?;
    writeln!(writer, "property float y")?;
    writeln!(writer, "property float z")?;
    writeln!(writer, "end_header")?;

    for point in points {
        writeln!(writer, "{} {} {}", point.x, point.y, point.z)?;
    }

    writer.flush()
}

/// File name of a frame inside the output directory.
pub fn frame_file_name(frame_id: u32) -> String {
    format!("frame_{:04}.ply", frame_id)
}

/// Writes each frame to `<dir>/frame_NNNN.ply`.
#[derive(Debug)]
pub struct PlyDirectorySink {
    dir: PathBuf,
    written: usize,
}

impl PlyDirectorySink {
    /// Prepare `dir` for output.
    ///
    /// With `clean` set, an existing directory and everything in it is
    /// removed first so stale frames from an earlier run cannot mix with the
    /// new ones.
    pub fn create<P: AsRef<Path>>(dir: P, clean: bool) -> Result<Self, Error> {
        let dir = dir.as_ref().to_path_buf();

        if clean && dir.exists() {
            info!(dir = %dir.display(), "removing previous output");
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;

        Ok(Self { dir, written: 0 })
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of frame files written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Path a frame is written to.
    pub fn frame_path(&self, frame_id: u32) -> PathBuf {
        self.dir.join(frame_file_name(frame_id))
    }
}

impl FrameSink for PlyDirectorySink {
    fn write_frame(&mut self, frame: Frame) -> Result<(), Error> {
        let path = self.frame_path(frame.frame_id());
        let file = File::create(&path)?;
        write_ply(BufWriter::new(file), frame.points())?;

        debug!(path = %path.display(), points = frame.len(), "wrote frame");
        self.written += 1;
        Ok(())
    }
}
