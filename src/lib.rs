//! Tickerloop drives a scrolling text ticker mapped onto a wall of
//! physical LED tile modules, where each output port feeds a snake-cabled
//! run of tiles.
//!
//! # Pipeline overview
//!
//! 1. **Expand**: `Port`/`Block` descriptions -> flattened [`Tile`]
//!    sequence ([`build_tiles`])
//! 2. **Rasterize**: a content's text -> doubled horizontal/vertical
//!    master strips ([`TextStrip`])
//! 3. **Composite**: strip + scroll offset -> one rgb24 output frame, one
//!    phase-shifted toroidal sample per tile ([`FrameCompositor`])
//! 4. **Schedule**: time-of-day/weekday/date rules select the live
//!    content; a two-state controller cuts or crossfades between contents
//!    ([`Ticker`])
//! 5. **Export** (optional): stream exactly one seamless loop
//!    (`len / gcd(len, speed)` frames) to the system `ffmpeg` binary
//!    ([`export_loop`])
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic frames**: compositing is a pure function of strip,
//!   offset and tile sequence; equal inputs give byte-equal frames.
//! - **Single-owner state**: one thread drives [`Ticker::tick`]; frames
//!   are borrows of internally reused buffers, never fresh allocations.
//! - **No IO in the core**: fonts are resolved up front, preset IO and
//!   process spawning live at the edges (CLI, export).
#![forbid(unsafe_code)]

pub mod compositor;
pub mod crossfade;
pub mod error;
pub mod export;
pub mod model;
pub mod period;
pub mod pixel;
pub mod schedule;
pub mod strip;
pub mod ticker;
pub mod tilemap;

pub use compositor::{FrameCompositor, draw_tile_outlines};
pub use crossfade::{CrossfadeController, Decision, FadePhase};
pub use error::{TickerError, TickerResult};
pub use export::{
    ExportConfig, ExportStats, FfmpegEncoder, ensure_parent_dir, export_loop, is_ffmpeg_on_path,
};
pub use model::{
    Block, BlockDir, Content, CropRect, EntryKind, ModuleSize, OutputSettings, PathMode, Point,
    Port, PortMode, Preset, Rgb, Schedule, ScheduleEntry, Transition,
};
pub use period::{integer_speed, period_frames};
pub use pixel::{PixelBuffer, crossfade_into};
pub use schedule::in_range;
pub use strip::{BrushRgba8, FontCatalog, StripSpec, TextStrip};
pub use ticker::{Ticker, TickerState};
pub use tilemap::{Tile, build_tiles};
