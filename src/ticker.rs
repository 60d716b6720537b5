use chrono::NaiveDateTime;

use crate::{
    compositor::FrameCompositor,
    crossfade::{CrossfadeController, Decision, FadePhase},
    error::{TickerError, TickerResult},
    model::{Content, Preset, Rgb, Transition},
    period,
    pixel::{self, PixelBuffer},
    strip::{FontCatalog, StripSpec, TextStrip},
    tilemap::{Tile, build_tiles},
};

/// Read-only runtime snapshot for presentation layers. The engine owns the
/// live values; windows, previews and remote UIs only ever see copies.
#[derive(Clone, Debug, PartialEq)]
pub struct TickerState {
    pub current: Option<String>,
    pub next: Option<String>,
    pub offset_px: f64,
    pub fade_active: bool,
    pub fade_started: Option<NaiveDateTime>,
    pub fade_ms: Option<u32>,
}

struct StripSlot {
    spec: StripSpec,
    strip: TextStrip,
}

/// The ticker engine: applied preset, content registry, derived tile
/// sequence, rendered strips and scroll/fade state, advanced one frame at
/// a time by [`Ticker::tick`].
///
/// Single-owner by construction: one thread drives ticks, and every
/// returned frame is a borrow of an internally reused buffer.
pub struct Ticker {
    preset: Preset,
    fonts: FontCatalog,
    tiles: Vec<Tile>,
    comp_curr: FrameCompositor,
    comp_next: FrameCompositor,
    blended: PixelBuffer,
    fade: CrossfadeController,
    current: Option<String>,
    strip_curr: Option<StripSlot>,
    strip_next: Option<StripSlot>,
    offset: f64,
}

impl Ticker {
    pub fn new(preset: Preset, now: NaiveDateTime) -> TickerResult<Self> {
        let mut preset = preset;
        preset.normalize();
        preset.validate()?;
        let tiles = build_tiles(&preset.ports, &preset.concat_port_order, preset.module)?;

        let mut ticker = Self {
            comp_curr: FrameCompositor::new(preset.output.width, preset.output.height),
            comp_next: FrameCompositor::new(preset.output.width, preset.output.height),
            blended: PixelBuffer::new(preset.output.width, preset.output.height),
            preset,
            fonts: FontCatalog::system(),
            tiles,
            fade: CrossfadeController::new(),
            current: None,
            strip_curr: None,
            strip_next: None,
            offset: 0.0,
        };

        let initial = ticker
            .preset
            .scheduler
            .pick(now)
            .map(str::to_string)
            .or_else(|| ticker.preset.contents.first().map(|c| c.name.clone()));
        ticker.set_current(initial)?;
        Ok(ticker)
    }

    /// Advance one frame: move the scroll accumulator, consult the
    /// scheduler, start or settle a transition, and composite. The
    /// returned frame is valid until the next call that renders.
    pub fn tick(&mut self, now: NaiveDateTime) -> TickerResult<&PixelBuffer> {
        self.offset += self.preset.output.speed_px_per_frame;
        self.advance_schedule(now)?;

        if let Some(promoted) = self.fade.settle(now) {
            self.current = Some(promoted);
            self.strip_curr = self.strip_next.take();
        }
        self.refresh_strips()?;

        let bg = self.current_bg();
        if self.fade.is_fading() && self.strip_next.is_some() {
            let alpha = self.fade.alpha(now);
            let next_bg = self
                .fade
                .next()
                .and_then(|n| self.preset.content(n))
                .map(|c| c.bg_rgb)
                .unwrap_or([0, 0, 0]);
            let curr = self.comp_curr.render(
                self.strip_curr.as_ref().map(|s| &s.strip),
                self.offset,
                &self.tiles,
                bg,
            );
            let next = self.comp_next.render(
                self.strip_next.as_ref().map(|s| &s.strip),
                self.offset,
                &self.tiles,
                next_bg,
            );
            pixel::crossfade_into(&mut self.blended, curr, next, alpha)?;
            Ok(&self.blended)
        } else {
            Ok(self.comp_curr.render(
                self.strip_curr.as_ref().map(|s| &s.strip),
                self.offset,
                &self.tiles,
                bg,
            ))
        }
    }

    /// Replace the whole configuration. Everything fallible happens before
    /// any state is touched; on error the running state is unchanged.
    /// On success the runtime state resets: offset to zero, fade cleared.
    #[tracing::instrument(skip_all, fields(preset = %preset.name))]
    pub fn apply_preset(&mut self, preset: Preset, now: NaiveDateTime) -> TickerResult<()> {
        let mut preset = preset;
        preset.normalize();
        preset.validate()?;
        let tiles = build_tiles(&preset.ports, &preset.concat_port_order, preset.module)?;

        let initial = preset
            .scheduler
            .pick(now)
            .map(str::to_string)
            .or_else(|| preset.contents.first().map(|c| c.name.clone()));
        let strip_curr = match &initial {
            Some(name) => {
                let content = preset
                    .content(name)
                    .ok_or_else(|| TickerError::content(format!("unknown content '{name}'")))?;
                let spec = StripSpec::for_content(content, preset.module);
                let strip = TextStrip::render(&spec, &mut self.fonts)?;
                Some(StripSlot { spec, strip })
            }
            None => None,
        };

        if self.preset.output.width != preset.output.width
            || self.preset.output.height != preset.output.height
        {
            self.comp_curr = FrameCompositor::new(preset.output.width, preset.output.height);
            self.comp_next = FrameCompositor::new(preset.output.width, preset.output.height);
            self.blended = PixelBuffer::new(preset.output.width, preset.output.height);
        }
        self.preset = preset;
        self.tiles = tiles;
        self.current = initial;
        self.strip_curr = strip_curr;
        self.strip_next = None;
        self.fade.cancel();
        self.offset = 0.0;
        Ok(())
    }

    /// Operator override: immediate cut to `name`, bypassing the
    /// transition machine. An unknown name falls back to the first
    /// registered content.
    pub fn set_live_content(&mut self, name: &str) -> TickerResult<()> {
        let target = if self.preset.content(name).is_some() {
            Some(name.to_string())
        } else {
            tracing::warn!(content = %name, "override names an unknown content; falling back");
            self.preset.contents.first().map(|c| c.name.clone())
        };
        self.fade.cancel();
        self.strip_next = None;
        self.set_current(target)
    }

    pub fn add_content(&mut self, content: Content) -> TickerResult<()> {
        if content.name.trim().is_empty() {
            return Err(TickerError::validation("content name must be non-empty"));
        }
        if self.preset.content(&content.name).is_some() {
            return Err(TickerError::validation(format!(
                "duplicate content name '{}'",
                content.name
            )));
        }
        self.preset.contents.push(content);
        Ok(())
    }

    /// Rename a registry entry, rewriting schedule references and the live
    /// and fade-target pointers.
    pub fn rename_content(&mut self, from: &str, to: &str) -> TickerResult<()> {
        if to.trim().is_empty() {
            return Err(TickerError::validation("content name must be non-empty"));
        }
        if from == to {
            return Ok(());
        }
        if self.preset.content(to).is_some() {
            return Err(TickerError::validation(format!(
                "duplicate content name '{to}'"
            )));
        }
        let Some(content) = self.preset.contents.iter_mut().find(|c| c.name == from) else {
            return Err(TickerError::content(format!("unknown content '{from}'")));
        };
        content.name = to.to_string();

        for entry in &mut self.preset.scheduler.entries {
            if entry.content == from {
                entry.content = to.to_string();
            }
        }
        if self.current.as_deref() == Some(from) {
            self.current = Some(to.to_string());
        }
        self.fade.rename_next(from, to);
        Ok(())
    }

    /// Remove a registry entry. Schedule entries referencing it are
    /// dropped. Deleting the live content (or the fade target, even
    /// mid-fade) clears the fade and cuts to the first remaining content,
    /// or to a background-only frame when the registry is empty.
    pub fn remove_content(&mut self, name: &str) -> TickerResult<()> {
        let Some(idx) = self.preset.contents.iter().position(|c| c.name == name) else {
            return Err(TickerError::content(format!("unknown content '{name}'")));
        };
        self.preset.contents.remove(idx);

        let before = self.preset.scheduler.entries.len();
        self.preset.scheduler.entries.retain(|e| e.content != name);
        if self.preset.scheduler.entries.len() != before {
            tracing::warn!(content = %name, "dropped schedule entries for removed content");
        }

        if self.fade.next() == Some(name) {
            self.fade.cancel();
            self.strip_next = None;
        }
        if self.current.as_deref() == Some(name) {
            self.fade.cancel();
            self.strip_next = None;
            let fallback = self.preset.contents.first().map(|c| c.name.clone());
            self.set_current(fallback)?;
        }
        Ok(())
    }

    pub fn state(&self) -> TickerState {
        let (fade_active, fade_started, fade_ms) = match self.fade.phase() {
            FadePhase::Idle => (false, None, None),
            FadePhase::Fading {
                started, fade_ms, ..
            } => (true, Some(*started), Some(*fade_ms)),
        };
        TickerState {
            current: self.current.clone(),
            next: self.fade.next().map(str::to_string),
            offset_px: self.offset,
            fade_active,
            fade_started,
            fade_ms,
        }
    }

    pub fn preset(&self) -> &Preset {
        &self.preset
    }

    /// Save-equivalent structure for persistence by the outer layer.
    pub fn to_preset(&self) -> Preset {
        self.preset.clone()
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn current_strip(&self) -> Option<&TextStrip> {
        self.strip_curr.as_ref().map(|s| &s.strip)
    }

    pub fn current_content(&self) -> Option<&Content> {
        self.current.as_deref().and_then(|n| self.preset.content(n))
    }

    /// Loop length of the live strip at the configured speed.
    pub fn period_frames(&self) -> Option<u32> {
        self.strip_curr.as_ref().map(|s| {
            period::period_frames(s.strip.len_px(), self.preset.output.speed_px_per_frame)
        })
    }

    fn current_bg(&self) -> Rgb {
        self.current_content().map(|c| c.bg_rgb).unwrap_or([0, 0, 0])
    }

    fn advance_schedule(&mut self, now: NaiveDateTime) -> TickerResult<()> {
        let (target, transition, fade_ms) = match self.preset.scheduler.pick_entry(now) {
            Some(entry) => (entry.content.clone(), entry.transition, entry.fade_ms),
            None => match self.preset.contents.first() {
                Some(content) => (
                    content.name.clone(),
                    Transition::Crossfade,
                    self.preset.scheduler.fade_ms,
                ),
                None => {
                    // Empty registry: show the background only.
                    if self.current.is_some() {
                        self.fade.cancel();
                        self.strip_next = None;
                        self.set_current(None)?;
                    }
                    return Ok(());
                }
            },
        };

        // A stale selection (content edited away between validation and
        // now) falls back instead of failing the tick.
        let target = if self.preset.content(&target).is_some() {
            target
        } else {
            tracing::warn!(content = %target, "selected content missing; falling back");
            match self.preset.contents.first() {
                Some(c) => c.name.clone(),
                None => return Ok(()),
            }
        };

        match self
            .fade
            .propose(self.current.as_deref(), &target, transition, fade_ms, now)
        {
            Decision::Ignored => Ok(()),
            Decision::Cut => self.set_current(Some(target)),
            Decision::FadeStarted => match self.build_slot(&target) {
                Ok(slot) => {
                    self.strip_next = Some(slot);
                    Ok(())
                }
                Err(e) => {
                    // Never leave a fade running without an incoming strip.
                    self.fade.cancel();
                    Err(e)
                }
            },
        }
    }

    fn set_current(&mut self, name: Option<String>) -> TickerResult<()> {
        self.current = name;
        self.strip_curr = None;
        if let Some(name) = self.current.clone() {
            self.strip_curr = Some(self.build_slot(&name)?);
        }
        Ok(())
    }

    /// Re-render any strip whose content was edited in place since the
    /// last frame (text, font, size or colors changed).
    fn refresh_strips(&mut self) -> TickerResult<()> {
        if let Some(name) = self.current.clone()
            && let Some(content) = self.preset.content(&name)
        {
            let spec = StripSpec::for_content(content, self.preset.module);
            let stale = self.strip_curr.as_ref().is_none_or(|slot| slot.spec != spec);
            if stale {
                let strip = TextStrip::render(&spec, &mut self.fonts)?;
                self.strip_curr = Some(StripSlot { spec, strip });
            }
        }
        if let Some(name) = self.fade.next().map(str::to_string)
            && let Some(content) = self.preset.content(&name)
        {
            let spec = StripSpec::for_content(content, self.preset.module);
            let stale = self.strip_next.as_ref().is_none_or(|slot| slot.spec != spec);
            if stale {
                let strip = TextStrip::render(&spec, &mut self.fonts)?;
                self.strip_next = Some(StripSlot { spec, strip });
            }
        }
        Ok(())
    }

    fn build_slot(&mut self, name: &str) -> TickerResult<StripSlot> {
        let content = self
            .preset
            .content(name)
            .ok_or_else(|| TickerError::content(format!("unknown content '{name}'")))?;
        let spec = StripSpec::for_content(content, self.preset.module);
        let strip = TextStrip::render(&spec, &mut self.fonts)?;
        Ok(StripSlot { spec, strip })
    }
}
