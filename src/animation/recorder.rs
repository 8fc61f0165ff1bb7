//! Replay recorder capturing rendered frames to a file.

use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use log::warn;

use super::format::{
    CompressionType, FrameIndex, FrameSnapshot, ReplayFlags, ReplayHeader, compress,
};
use crate::compute::{FrameView, Renderer};
use crate::schema::GameConfig;

/// Configuration for replay recording.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Compression type to use.
    pub compression: CompressionType,
    /// Record every Nth frame (1 = every frame).
    pub frame_skip: u32,
    /// Maximum frames to record (0 = unlimited).
    pub max_frames: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            compression: CompressionType::None,
            frame_skip: 1,
            max_frames: 0,
        }
    }
}

/// Replay recorder. Usable directly or as the session's [`Renderer`].
///
/// Usage:
/// ```ignore
/// let mut recorder = ReplayRecorder::create("run.flpr", &game, None, Default::default())?;
/// session.run(&mut recorder)?;
/// recorder.finalize()?;
/// ```
pub struct ReplayRecorder {
    writer: BufWriter<File>,
    header: ReplayHeader,
    frame_indices: Vec<FrameIndex>,
    config: RecorderConfig,
    frames_written: u64,
    step_counter: u32,
    /// Reused buffer for frame encoding.
    encode_buffer: Vec<u8>,
    /// First write error hit while drawing.
    deferred_error: Option<io::Error>,
}

impl ReplayRecorder {
    /// Create a replay file for a game with the given settings.
    pub fn create<P: AsRef<Path>>(
        path: P,
        game: &GameConfig,
        tick_rate: Option<f32>,
        config: RecorderConfig,
    ) -> io::Result<Self> {
        if !config.compression.is_supported() {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("{:?} compression is not available in this build", config.compression),
            ));
        }

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let header = ReplayHeader {
            width: game.playfield_width,
            height: game.playfield_height,
            ground_y: game.ground_y,
            tick_rate: tick_rate.unwrap_or(0.0),
            frame_count: 0, // Will be updated on finalize
            flags: ReplayFlags {
                compression: config.compression,
            },
        };

        // Placeholder header, rewritten on finalize
        header.write_to(&mut writer)?;

        Ok(Self {
            writer,
            header,
            frame_indices: Vec::new(),
            config,
            frames_written: 0,
            step_counter: 0,
            encode_buffer: Vec::new(),
            deferred_error: None,
        })
    }

    /// Record a frame.
    ///
    /// Returns true if frame was actually recorded (may skip frames based on config).
    pub fn record_frame(&mut self, frame: &FrameSnapshot) -> io::Result<bool> {
        self.step_counter += 1;

        // Check frame skip
        if self.step_counter < self.config.frame_skip {
            return Ok(false);
        }
        self.step_counter = 0;

        // Check max frames
        if self.config.max_frames > 0 && self.frames_written >= self.config.max_frames {
            return Ok(false);
        }

        let offset = self.writer.stream_position()?;

        frame.encode_into(&mut self.encode_buffer);
        let size = match self.header.flags.compression {
            CompressionType::None => {
                self.writer.write_all(&self.encode_buffer)?;
                self.encode_buffer.len()
            }
            compression => {
                let packed = compress(&self.encode_buffer, compression)?;
                self.writer.write_all(&packed)?;
                packed.len()
            }
        };

        self.frame_indices.push(FrameIndex {
            offset,
            size: size as u64,
        });
        self.frames_written += 1;

        Ok(true)
    }

    /// Finalize the replay file.
    ///
    /// Writes frame index table and updates header with final frame count.
    /// Fails with the first error hit while drawing, if any.
    pub fn finalize(mut self) -> io::Result<ReplayStats> {
        if let Some(err) = self.deferred_error.take() {
            return Err(err);
        }

        // Write frame index table at current position
        let index_offset = self.writer.stream_position()?;
        for index in &self.frame_indices {
            index.write_to(&mut self.writer)?;
        }

        // Update header with final frame count
        self.header.frame_count = self.frames_written;

        // Seek back and rewrite header
        self.writer.seek(SeekFrom::Start(0))?;
        self.header.write_to(&mut self.writer)?;

        // Flush and close
        self.writer.flush()?;

        let total_size = index_offset + self.frame_indices.len() as u64 * FrameIndex::SIZE as u64;

        Ok(ReplayStats {
            frame_count: self.frames_written,
            total_bytes: total_size,
            average_frame_size: if self.frames_written > 0 {
                index_offset.saturating_sub(ReplayHeader::SIZE as u64) / self.frames_written
            } else {
                0
            },
            compression: self.header.flags.compression,
        })
    }

    /// Get number of frames recorded so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Whether a write error has been latched.
    pub fn has_failed(&self) -> bool {
        self.deferred_error.is_some()
    }
}

impl Renderer for ReplayRecorder {
    fn draw(&mut self, frame: &FrameView<'_>) {
        if self.deferred_error.is_some() {
            return;
        }
        if let Err(err) = self.record_frame(&FrameSnapshot::from_view(frame)) {
            warn!("replay recording stopped: {err}");
            self.deferred_error = Some(err);
        }
    }
}

/// Statistics from recording session.
#[derive(Debug, Clone)]
pub struct ReplayStats {
    /// Total frames recorded.
    pub frame_count: u64,
    /// Total file size in bytes.
    pub total_bytes: u64,
    /// Average stored frame size.
    pub average_frame_size: u64,
    /// Compression used.
    pub compression: CompressionType,
}

impl std::fmt::Display for ReplayStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} frames, {} bytes total, {} bytes/frame avg ({:?} compression)",
            self.frame_count, self.total_bytes, self.average_frame_size, self.compression
        )
    }
}
