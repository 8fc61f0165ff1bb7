//! Replay recording and playback for training runs.
//!
//! A recorder plugs into a session as its renderer and stores every drawn
//! frame, so a run can be inspected or redrawn later without simulating.
//!
//! # File Format
//!
//! The `.flpr` (flappy replay) format:
//!
//! ```text
//! Header (48 bytes):
//!   Magic: "FLPR" (4 bytes)
//!   Version: u16
//!   Flags: u16 (compression)
//!   Playfield width: f32
//!   Playfield height: f32
//!   Ground y: f32
//!   Tick rate: f32 (0 = unthrottled)
//!   Frame count: u64
//!   Reserved: 16 bytes
//!
//! Frame data (variable, optionally LZ4 compressed):
//!   Generation: u32, Tick: u64, Score: u32
//!   Ground tile offsets: 2 x f32
//!   Bird count: u32, then per bird x, y, tilt (f32) and wing frame (u8)
//!   Pipe count: u32, then per pipe x, gap top, gap bottom (f32)
//!
//! Frame index table (frame_count * 16 bytes, at end of file):
//!   Offset: u64
//!   Stored size: u64
//! ```

mod format;
mod player;
mod recorder;

pub use format::{
    BirdSnapshot, CompressionType, FrameIndex, FrameSnapshot, PipeSnapshot, REPLAY_MAGIC,
    REPLAY_VERSION, ReplayFlags, ReplayHeader,
};
pub use player::{FrameIterator, ReplayPlayer};
pub use recorder::{RecorderConfig, ReplayRecorder, ReplayStats};
