use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveTime};

use crate::error::{TickerError, TickerResult};

pub type Rgb = [u8; 3];

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ModuleSize {
    pub w: u32,
    pub h: u32,
}

impl Default for ModuleSize {
    fn default() -> Self {
        Self { w: 128, h: 256 }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockDir {
    BottomUp,
    TopDown,
    LeftRight,
    RightLeft,
}

impl BlockDir {
    /// Whether tiles with this direction sample the vertical strip variant.
    pub fn is_vertical(self) -> bool {
        matches!(self, Self::BottomUp | Self::TopDown)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortMode {
    #[default]
    Vertical,
    Horizontal,
}

/// Reserved for cabling-phase bookkeeping; tile generation currently does
/// not vary by this flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathMode {
    #[default]
    Snake,
    Reset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    // Older presets wrote the direction under "order".
    #[serde(alias = "order")]
    pub dir: BlockDir,
    pub count: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(from = "PortDe")]
pub struct Port {
    pub id: String,
    pub start: Point,
    pub mode: PortMode,
    pub path_mode: PathMode,
    pub blocks: Vec<Block>,
}

#[derive(serde::Deserialize)]
struct PortDe {
    id: String,
    #[serde(default)]
    start: Option<Point>,
    #[serde(default)]
    x: Option<i32>,
    #[serde(default)]
    mode: Option<PortMode>,
    #[serde(default)]
    path_mode: PathMode,
    #[serde(default)]
    blocks: Vec<Block>,
}

impl From<PortDe> for Port {
    fn from(de: PortDe) -> Self {
        // Legacy records carry a bare column `x` instead of `start`/`mode`;
        // they migrate to an implicit vertical port starting at (x, 0).
        let start = de.start.unwrap_or(Point {
            x: de.x.unwrap_or(0),
            y: 0,
        });
        Self {
            id: de.id,
            start,
            mode: de.mode.unwrap_or_default(),
            path_mode: de.path_mode,
            blocks: de.blocks,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Content {
    pub name: String,
    pub text: String,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_pt")]
    pub font_pt: u32,
    #[serde(default = "white")]
    pub text_rgb: Rgb,
    #[serde(default)]
    pub bg_rgb: Rgb,
}

fn default_font_family() -> String {
    "Arial".to_string()
}

fn default_font_pt() -> u32 {
    72
}

fn white() -> Rgb {
    [255, 255, 255]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Daily,
    Date,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    #[default]
    Crossfade,
    Cut,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScheduleEntry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Weekday numbers, 0 = Monday .. 6 = Sunday. Only read for `daily`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weekdays: Vec<u8>,
    /// ISO calendar date. Only read for `date`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
    pub content: String,
    #[serde(default)]
    pub transition: Transition,
    #[serde(default = "default_fade_ms")]
    pub fade_ms: u32,
}

fn default_fade_ms() -> u32 {
    800
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Schedule {
    #[serde(default)]
    pub entries: Vec<ScheduleEntry>,
    /// Fade used when reverting to the fallback content (no entry matched).
    #[serde(default = "default_fade_ms")]
    pub fade_ms: u32,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            fade_ms: default_fade_ms(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OutputSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub speed_px_per_frame: f64,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 50,
            speed_px_per_frame: 4.0,
        }
    }
}

/// Export crop rectangle in output-frame pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Preset {
    pub name: String,
    pub module: ModuleSize,
    pub ports: Vec<Port>,
    pub concat_port_order: Vec<String>,
    pub contents: Vec<Content>,
    pub scheduler: Schedule,
    pub output: OutputSettings,
}

impl Default for Preset {
    fn default() -> Self {
        let mut preset = Self {
            name: String::new(),
            module: ModuleSize::default(),
            ports: Vec::new(),
            concat_port_order: Vec::new(),
            contents: Vec::new(),
            scheduler: Schedule::default(),
            output: OutputSettings::default(),
        };
        preset.normalize();
        preset
    }
}

impl Preset {
    /// Fill structural gaps so a partially specified preset still drives a
    /// working wall: missing ports become the stock two-column layout,
    /// missing contents a single fallback text, and an empty concatenation
    /// order lists all ports in declaration order.
    pub fn normalize(&mut self) {
        if self.ports.is_empty() {
            self.ports = stock_ports();
        }
        if self.contents.is_empty() {
            self.contents = vec![Content {
                name: "default".to_string(),
                text: "TICKERLOOP — SEAMLESS LED TICKER — ".to_string(),
                font_family: default_font_family(),
                font_pt: default_font_pt(),
                text_rgb: white(),
                bg_rgb: [0, 0, 0],
            }];
        }
        if self.concat_port_order.is_empty() {
            self.concat_port_order = self.ports.iter().map(|p| p.id.clone()).collect();
        }
    }

    pub fn validate(&self) -> TickerResult<()> {
        if self.output.width == 0 || self.output.height == 0 {
            return Err(TickerError::validation("output width/height must be > 0"));
        }
        if self.output.fps == 0 {
            return Err(TickerError::validation("output fps must be > 0"));
        }
        if !self.output.speed_px_per_frame.is_finite() || self.output.speed_px_per_frame <= 0.0 {
            return Err(TickerError::validation(
                "output speed_px_per_frame must be finite and > 0",
            ));
        }

        let mut names = BTreeSet::new();
        for content in &self.contents {
            if content.name.trim().is_empty() {
                return Err(TickerError::validation("content name must be non-empty"));
            }
            if !names.insert(content.name.as_str()) {
                return Err(TickerError::validation(format!(
                    "duplicate content name '{}'",
                    content.name
                )));
            }
        }

        let mut port_ids = BTreeSet::new();
        for port in &self.ports {
            if !port_ids.insert(port.id.as_str()) {
                return Err(TickerError::validation(format!(
                    "duplicate port id '{}'",
                    port.id
                )));
            }
        }

        for entry in &self.scheduler.entries {
            if !names.contains(entry.content.as_str()) {
                return Err(TickerError::validation(format!(
                    "schedule entry references unknown content '{}'",
                    entry.content
                )));
            }
            match entry.kind {
                EntryKind::Date => {
                    if entry.date.is_none() {
                        return Err(TickerError::validation(
                            "date schedule entry must carry a date",
                        ));
                    }
                }
                EntryKind::Daily => {
                    if entry.weekdays.is_empty() {
                        return Err(TickerError::validation(
                            "daily schedule entry must list at least one weekday",
                        ));
                    }
                    if let Some(bad) = entry.weekdays.iter().find(|&&d| d > 6) {
                        return Err(TickerError::validation(format!(
                            "weekday {bad} out of range (0 = Monday .. 6 = Sunday)"
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    pub fn content(&self, name: &str) -> Option<&Content> {
        self.contents.iter().find(|c| c.name == name)
    }
}

/// The stock wall: two cabled columns of four 128x256 modules, one running
/// bottom-up from the column foot, the other top-down from the head.
fn stock_ports() -> Vec<Port> {
    vec![
        Port {
            id: "port1".to_string(),
            start: Point { x: 0, y: 768 },
            mode: PortMode::Vertical,
            path_mode: PathMode::Snake,
            blocks: vec![Block {
                dir: BlockDir::BottomUp,
                count: 4,
            }],
        },
        Port {
            id: "port2".to_string(),
            start: Point { x: 128, y: 0 },
            mode: PortMode::Vertical,
            path_mode: PathMode::Snake,
            blocks: vec![Block {
                dir: BlockDir::TopDown,
                count: 4,
            }],
        },
    ]
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize as _, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(d)?;
        NaiveTime::parse_from_str(&s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&s, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}
