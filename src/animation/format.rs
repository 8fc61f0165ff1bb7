//! Binary format definitions for flappy replay files.

use std::io::{self, Read, Write};

use crate::compute::FrameView;

/// Magic bytes identifying a replay file.
pub const REPLAY_MAGIC: &[u8; 4] = b"FLPR";

/// Current format version.
pub const REPLAY_VERSION: u16 = 1;

/// Compression type for frame data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum CompressionType {
    /// No compression.
    #[default]
    None = 0,
    /// LZ4 fast compression.
    Lz4 = 1,
}

impl CompressionType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(CompressionType::None),
            1 => Some(CompressionType::Lz4),
            _ => None,
        }
    }

    /// Whether this build can read and write the compression type.
    pub fn is_supported(self) -> bool {
        match self {
            CompressionType::None => true,
            CompressionType::Lz4 => cfg!(feature = "lz4"),
        }
    }
}

/// Replay file header flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayFlags {
    /// Compression type (lower 4 bits).
    pub compression: CompressionType,
}

impl ReplayFlags {
    pub fn to_u16(self) -> u16 {
        self.compression as u16
    }

    pub fn from_u16(v: u16) -> io::Result<Self> {
        let compression = CompressionType::from_u8((v & 0x0F) as u8).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unknown compression type {}", v & 0x0F),
            )
        })?;
        Ok(Self { compression })
    }
}

/// File header for the replay format.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayHeader {
    /// Playfield width.
    pub width: f32,
    /// Playfield height.
    pub height: f32,
    /// Ground line.
    pub ground_y: f32,
    /// Ticks per second the game ran at (0 = unthrottled).
    pub tick_rate: f32,
    /// Total number of frames.
    pub frame_count: u64,
    pub flags: ReplayFlags,
}

impl ReplayHeader {
    /// Size of header in bytes.
    /// Magic(4) + Version(2) + Flags(2) + Width(4) + Height(4) + GroundY(4) +
    /// TickRate(4) + FrameCount(8) + Reserved(16) = 48
    pub const SIZE: usize = 48;

    /// Write header to output.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(REPLAY_MAGIC)?;
        w.write_all(&REPLAY_VERSION.to_le_bytes())?;
        w.write_all(&self.flags.to_u16().to_le_bytes())?;
        w.write_all(&self.width.to_le_bytes())?;
        w.write_all(&self.height.to_le_bytes())?;
        w.write_all(&self.ground_y.to_le_bytes())?;
        w.write_all(&self.tick_rate.to_le_bytes())?;
        w.write_all(&self.frame_count.to_le_bytes())?;
        // Reserved bytes
        w.write_all(&[0u8; 16])?;
        Ok(())
    }

    /// Read header from input.
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if &magic != REPLAY_MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Invalid FLPR magic bytes",
            ));
        }

        let version = read_u16(r)?;
        if version != REPLAY_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unsupported FLPR version: {}", version),
            ));
        }

        let flags = ReplayFlags::from_u16(read_u16(r)?)?;
        let width = read_f32(r)?;
        let height = read_f32(r)?;
        let ground_y = read_f32(r)?;
        let tick_rate = read_f32(r)?;
        let frame_count = read_u64(r)?;

        // Skip reserved bytes
        let mut reserved = [0u8; 16];
        r.read_exact(&mut reserved)?;

        Ok(Self {
            width,
            height,
            ground_y,
            tick_rate,
            frame_count,
            flags,
        })
    }
}

/// Index entry for a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameIndex {
    /// Byte offset from start of file.
    pub offset: u64,
    /// Stored size in bytes (after compression).
    pub size: u64,
}

impl FrameIndex {
    /// Size of one index entry in bytes.
    pub const SIZE: usize = 16;

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.offset.to_le_bytes())?;
        w.write_all(&self.size.to_le_bytes())?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let offset = read_u64(r)?;
        let size = read_u64(r)?;
        Ok(Self { offset, size })
    }
}

/// A bird as drawn in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BirdSnapshot {
    pub x: f32,
    pub y: f32,
    pub tilt: f32,
    /// Wing-flap frame.
    pub frame: u8,
}

impl BirdSnapshot {
    const SIZE: usize = 13;
}

/// A pipe pair as drawn in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipeSnapshot {
    pub x: f32,
    pub gap_top: f32,
    pub gap_bottom: f32,
}

impl PipeSnapshot {
    const SIZE: usize = 12;
}

/// Everything needed to redraw one tick.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameSnapshot {
    pub generation: u32,
    pub tick: u64,
    pub score: u32,
    /// Left edges of the two ground tiles.
    pub ground: (f32, f32),
    pub birds: Vec<BirdSnapshot>,
    pub pipes: Vec<PipeSnapshot>,
}

impl FrameSnapshot {
    /// Fixed part: generation, tick, score, ground offsets, two counts.
    const FIXED_SIZE: usize = 4 + 8 + 4 + 8 + 4 + 4;

    /// Capture a rendered frame.
    pub fn from_view(frame: &FrameView<'_>) -> Self {
        Self {
            generation: frame.generation as u32,
            tick: frame.tick,
            score: frame.score,
            ground: (frame.ground.x1, frame.ground.x2),
            birds: frame
                .birds
                .iter()
                .map(|b| BirdSnapshot {
                    x: b.x,
                    y: b.y,
                    tilt: b.tilt,
                    frame: b.animation_frame(),
                })
                .collect(),
            pipes: frame
                .pipes
                .iter()
                .map(|p| PipeSnapshot {
                    x: p.x,
                    gap_top: p.gap_top,
                    gap_bottom: p.gap_bottom,
                })
                .collect(),
        }
    }

    /// Size of the encoded frame in bytes.
    pub fn encoded_len(&self) -> usize {
        Self::FIXED_SIZE
            + self.birds.len() * BirdSnapshot::SIZE
            + self.pipes.len() * PipeSnapshot::SIZE
    }

    /// Encode into `out`, replacing its contents.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.clear();
        out.reserve(self.encoded_len());
        out.extend_from_slice(&self.generation.to_le_bytes());
        out.extend_from_slice(&self.tick.to_le_bytes());
        out.extend_from_slice(&self.score.to_le_bytes());
        out.extend_from_slice(&self.ground.0.to_le_bytes());
        out.extend_from_slice(&self.ground.1.to_le_bytes());

        out.extend_from_slice(&(self.birds.len() as u32).to_le_bytes());
        for bird in &self.birds {
            out.extend_from_slice(&bird.x.to_le_bytes());
            out.extend_from_slice(&bird.y.to_le_bytes());
            out.extend_from_slice(&bird.tilt.to_le_bytes());
            out.push(bird.frame);
        }

        out.extend_from_slice(&(self.pipes.len() as u32).to_le_bytes());
        for pipe in &self.pipes {
            out.extend_from_slice(&pipe.x.to_le_bytes());
            out.extend_from_slice(&pipe.gap_top.to_le_bytes());
            out.extend_from_slice(&pipe.gap_bottom.to_le_bytes());
        }
    }

    /// Decode a frame. The whole buffer must be consumed.
    pub fn decode(bytes: &[u8]) -> io::Result<Self> {
        let mut r = bytes;
        let frame = Self::decode_from(&mut r).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => {
                io::Error::new(io::ErrorKind::InvalidData, "Truncated frame data")
            }
            _ => e,
        })?;

        if !r.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} trailing bytes after frame", r.len()),
            ));
        }
        Ok(frame)
    }

    fn decode_from(r: &mut &[u8]) -> io::Result<Self> {
        let generation = read_u32(r)?;
        let tick = read_u64(r)?;
        let score = read_u32(r)?;
        let ground = (read_f32(r)?, read_f32(r)?);

        let bird_count = read_u32(r)? as usize;
        if bird_count * BirdSnapshot::SIZE > r.len() {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
        }
        let mut birds = Vec::with_capacity(bird_count);
        for _ in 0..bird_count {
            let x = read_f32(r)?;
            let y = read_f32(r)?;
            let tilt = read_f32(r)?;
            let mut frame = [0u8; 1];
            r.read_exact(&mut frame)?;
            birds.push(BirdSnapshot {
                x,
                y,
                tilt,
                frame: frame[0],
            });
        }

        let pipe_count = read_u32(r)? as usize;
        if pipe_count * PipeSnapshot::SIZE > r.len() {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
        }
        let mut pipes = Vec::with_capacity(pipe_count);
        for _ in 0..pipe_count {
            pipes.push(PipeSnapshot {
                x: read_f32(r)?,
                gap_top: read_f32(r)?,
                gap_bottom: read_f32(r)?,
            });
        }

        Ok(Self {
            generation,
            tick,
            score,
            ground,
            birds,
            pipes,
        })
    }
}

fn read_u16<R: Read>(r: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_f32<R: Read>(r: &mut R) -> io::Result<f32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

/// Compress encoded frame data.
pub fn compress(data: &[u8], compression: CompressionType) -> io::Result<Vec<u8>> {
    match compression {
        CompressionType::None => Ok(data.to_vec()),
        CompressionType::Lz4 => compress_lz4(data),
    }
}

/// Decompress stored frame data.
pub fn decompress(data: Vec<u8>, compression: CompressionType) -> io::Result<Vec<u8>> {
    match compression {
        CompressionType::None => Ok(data),
        CompressionType::Lz4 => decompress_lz4(&data),
    }
}

#[cfg(feature = "lz4")]
fn compress_lz4(data: &[u8]) -> io::Result<Vec<u8>> {
    Ok(lz4_flex::compress_prepend_size(data))
}

#[cfg(feature = "lz4")]
fn decompress_lz4(data: &[u8]) -> io::Result<Vec<u8>> {
    lz4_flex::decompress_size_prepended(data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(not(feature = "lz4"))]
fn compress_lz4(_data: &[u8]) -> io::Result<Vec<u8>> {
    Err(lz4_unsupported())
}

#[cfg(not(feature = "lz4"))]
fn decompress_lz4(_data: &[u8]) -> io::Result<Vec<u8>> {
    Err(lz4_unsupported())
}

#[cfg(not(feature = "lz4"))]
fn lz4_unsupported() -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        "LZ4 replay compression requires the `lz4` feature",
    )
}
