//! Replay player for reading back recorded runs.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use super::format::{FrameIndex, FrameSnapshot, ReplayHeader, decompress};

/// Replay player with random access to recorded frames.
///
/// Usage:
/// ```ignore
/// let mut player = ReplayPlayer::open("run.flpr")?;
/// println!("Replay has {} frames", player.frame_count());
///
/// let frame = player.read_frame(100)?;
///
/// for frame in player.frames() {
///     let frame = frame?;
///     // Draw frame...
/// }
/// ```
pub struct ReplayPlayer {
    reader: BufReader<File>,
    header: ReplayHeader,
    frame_indices: Vec<FrameIndex>,
}

impl ReplayPlayer {
    /// Open a replay file for playback.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let header = ReplayHeader::read_from(&mut reader)?;
        if !header.flags.compression.is_supported() {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!(
                    "Replay uses {:?} compression, which this build cannot read",
                    header.flags.compression
                ),
            ));
        }

        // Index table sits at the end of the file
        let index_size = header
            .frame_count
            .checked_mul(FrameIndex::SIZE as u64)
            .ok_or_else(|| invalid("Frame count overflows index size"))?;
        let file_len = reader.seek(SeekFrom::End(0))?;
        let index_start = file_len
            .checked_sub(index_size)
            .filter(|&start| start >= ReplayHeader::SIZE as u64)
            .ok_or_else(|| invalid("File too short for its frame index"))?;

        reader.seek(SeekFrom::Start(index_start))?;

        let mut frame_indices = Vec::with_capacity(header.frame_count as usize);
        for _ in 0..header.frame_count {
            let index = FrameIndex::read_from(&mut reader)?;
            if index.offset < ReplayHeader::SIZE as u64
                || index.offset.saturating_add(index.size) > index_start
            {
                return Err(invalid("Frame index points outside frame data"));
            }
            frame_indices.push(index);
        }

        Ok(Self {
            reader,
            header,
            frame_indices,
        })
    }

    /// Get replay header.
    pub fn header(&self) -> &ReplayHeader {
        &self.header
    }

    /// Get total number of frames.
    pub fn frame_count(&self) -> u64 {
        self.header.frame_count
    }

    /// Ticks per second the recording ran at, if it was throttled.
    pub fn tick_rate(&self) -> Option<f32> {
        (self.header.tick_rate > 0.0).then_some(self.header.tick_rate)
    }

    /// Read a specific frame by index.
    pub fn read_frame(&mut self, frame_index: u64) -> io::Result<FrameSnapshot> {
        let Some(index) = self.frame_indices.get(frame_index as usize).copied() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Frame index {} out of range ({} frames)",
                    frame_index, self.header.frame_count
                ),
            ));
        };

        self.reader.seek(SeekFrom::Start(index.offset))?;
        let mut data = vec![0u8; index.size as usize];
        self.reader.read_exact(&mut data)?;

        let raw = decompress(data, self.header.flags.compression)?;
        FrameSnapshot::decode(&raw)
    }

    /// Create an iterator over all frames.
    pub fn frames(&mut self) -> FrameIterator<'_> {
        FrameIterator {
            player: self,
            current: 0,
        }
    }
}

fn invalid(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

/// Iterator over replay frames.
pub struct FrameIterator<'a> {
    player: &'a mut ReplayPlayer,
    current: u64,
}

impl<'a> Iterator for FrameIterator<'a> {
    type Item = io::Result<FrameSnapshot>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.player.frame_count() {
            return None;
        }

        let result = self.player.read_frame(self.current);
        self.current += 1;
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.player.frame_count() - self.current) as usize;
        (remaining, Some(remaining))
    }
}

impl<'a> ExactSizeIterator for FrameIterator<'a> {}
