use std::{borrow::Cow, collections::HashMap, sync::Arc};

use crate::{
    error::{TickerError, TickerResult},
    model::{Content, ModuleSize, Rgb},
    pixel::PixelBuffer,
};

/// RGBA8 brush color carried through Parley text layouts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BrushRgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Everything a strip render depends on. Two equal specs produce identical
/// strips, so this doubles as the cache-invalidation key: re-render
/// whenever the live content's spec no longer equals the cached one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StripSpec {
    pub text: String,
    pub font_family: String,
    pub font_pt: u32,
    pub text_rgb: Rgb,
    pub bg_rgb: Rgb,
    pub module: ModuleSize,
}

impl StripSpec {
    pub fn for_content(content: &Content, module: ModuleSize) -> Self {
        Self {
            text: content.text.clone(),
            font_family: content.font_family.clone(),
            font_pt: content.font_pt,
            text_rgb: content.text_rgb,
            bg_rgb: content.bg_rgb,
            module,
        }
    }
}

/// System font database plus the Parley shaping contexts, with a per-family
/// memo so repeated re-renders of the same content do not re-register faces.
pub struct FontCatalog {
    db: fontdb::Database,
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<BrushRgba8>,
    resolved: HashMap<String, ResolvedFont>,
}

#[derive(Clone)]
pub struct ResolvedFont {
    /// Family name under which the face was registered with Parley.
    pub family: String,
    /// Raw face bytes, reused to build glyph outlines at raster time.
    pub bytes: Arc<Vec<u8>>,
}

impl FontCatalog {
    pub fn system() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        Self {
            db,
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            resolved: HashMap::new(),
        }
    }

    /// True when the host exposes no fonts at all (rendering will fail).
    pub fn is_empty(&self) -> bool {
        self.db.faces().next().is_none()
    }

    /// Resolve a requested family to a concrete face: the named family if
    /// installed, else the sans-serif default, else any available face.
    pub fn resolve(&mut self, family: &str) -> TickerResult<ResolvedFont> {
        if let Some(found) = self.resolved.get(family) {
            return Ok(found.clone());
        }

        let families = [fontdb::Family::Name(family), fontdb::Family::SansSerif];
        let query = fontdb::Query {
            families: &families,
            weight: fontdb::Weight::NORMAL,
            stretch: fontdb::Stretch::Normal,
            style: fontdb::Style::Normal,
        };
        let id = self
            .db
            .query(&query)
            .or_else(|| self.db.faces().next().map(|f| f.id))
            .ok_or_else(|| {
                TickerError::content(format!(
                    "no font available for family '{family}' (font database is empty)"
                ))
            })?;

        let bytes = self
            .db
            .with_face_data(id, |data, _| data.to_vec())
            .ok_or_else(|| {
                TickerError::content(format!("failed to load font face data for '{family}'"))
            })?;

        let registered = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.clone()), None);
        let family_id = registered
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| TickerError::content("no font families registered from face data"))?;
        let name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| TickerError::content("registered font family has no name"))?
            .to_string();

        let resolved = ResolvedFont {
            family: name,
            bytes: Arc::new(bytes),
        };
        self.resolved.insert(family.to_string(), resolved.clone());
        Ok(resolved)
    }

    fn layout(
        &mut self,
        text: &str,
        font: &ResolvedFont,
        size_px: f32,
        brush: BrushRgba8,
    ) -> parley::Layout<BrushRgba8> {
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(font.family.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));
        let mut layout = builder.build(text);
        layout.break_all_lines(None);
        layout
    }
}

/// The rendered master strips for one content, in the doubled form the
/// compositor samples from.
///
/// The horizontal variant is `2*len x module_h`, the vertical variant
/// `module_w x 2*len`; doubling lets any window of up to one period start
/// anywhere without modulo logic inside the blit itself (the blit still
/// splits at the doubled-buffer edge).
pub struct TextStrip {
    len: u32,
    horizontal: PixelBuffer,
    vertical: PixelBuffer,
}

impl TextStrip {
    /// Rasterize `spec` into master strips: measure the text advance with
    /// Parley (minimum 8 px), draw the glyph run centered on the cross
    /// axis over the background color, and derive the vertical variant by
    /// a 90-degree clockwise rotation of a `module_w`-high render.
    pub fn render(spec: &StripSpec, fonts: &mut FontCatalog) -> TickerResult<Self> {
        let text: &str = if spec.text.is_empty() { " " } else { &spec.text };
        let font = fonts.resolve(&spec.font_family)?;
        let size_px = spec.font_pt as f32 * 96.0 / 72.0;
        let brush = BrushRgba8 {
            r: spec.text_rgb[0],
            g: spec.text_rgb[1],
            b: spec.text_rgb[2],
            a: 255,
        };

        let layout = fonts.layout(text, &font, size_px, brush);
        let advance = layout.full_width();
        if !advance.is_finite() || advance < 0.0 {
            return Err(TickerError::validation("text layout produced no advance"));
        }
        let len = (advance.ceil() as u32).max(8);

        let master_h = rasterize_run(&layout, &font, len, spec.module.h, spec.bg_rgb)?;
        let master_v = rasterize_run(&layout, &font, len, spec.module.w, spec.bg_rgb)?.rotate_cw();
        Self::from_masters(master_h, master_v)
    }

    /// Assemble the doubled sampling buffers from single master strips.
    /// `horizontal` is `len x cross`, `vertical` is `cross x len`; the two
    /// lengths must agree.
    pub fn from_masters(horizontal: PixelBuffer, vertical: PixelBuffer) -> TickerResult<Self> {
        let len = horizontal.width();
        if len == 0 {
            return Err(TickerError::validation("strip length must be > 0"));
        }
        if vertical.height() != len {
            return Err(TickerError::validation(
                "horizontal and vertical master strips disagree on length",
            ));
        }

        let mut doubled_h = PixelBuffer::new(len * 2, horizontal.height());
        doubled_h.blit_from(&horizontal, 0, 0, 0, 0, len, horizontal.height());
        doubled_h.blit_from(&horizontal, 0, 0, len as i64, 0, len, horizontal.height());

        let mut doubled_v = PixelBuffer::new(vertical.width(), len * 2);
        doubled_v.blit_from(&vertical, 0, 0, 0, 0, vertical.width(), len);
        doubled_v.blit_from(&vertical, 0, 0, 0, len as i64, vertical.width(), len);

        Ok(Self {
            len,
            horizontal: doubled_h,
            vertical: doubled_v,
        })
    }

    /// Strip period in pixels: the measured text advance.
    pub fn len_px(&self) -> u32 {
        self.len
    }

    pub fn doubled_horizontal(&self) -> &PixelBuffer {
        &self.horizontal
    }

    pub fn doubled_vertical(&self) -> &PixelBuffer {
        &self.vertical
    }
}

fn rasterize_run(
    layout: &parley::Layout<BrushRgba8>,
    font: &ResolvedFont,
    width: u32,
    height: u32,
    bg: Rgb,
) -> TickerResult<PixelBuffer> {
    let w16: u16 = width
        .try_into()
        .map_err(|_| TickerError::validation("strip width exceeds the pixmap dimension limit"))?;
    let h16: u16 = height
        .try_into()
        .map_err(|_| TickerError::validation("strip height exceeds the pixmap dimension limit"))?;

    let mut pixmap = vello_cpu::Pixmap::new(w16, h16);
    // Opaque background, so the premultiplied readback is already flat.
    for px in pixmap.data_as_u8_slice_mut().chunks_exact_mut(4) {
        px[0] = bg[0];
        px[1] = bg[1];
        px[2] = bg[2];
        px[3] = 255;
    }

    let mut ctx = vello_cpu::RenderContext::new(w16, h16);
    let dy = (f64::from(height) - f64::from(layout.height())) / 2.0;
    ctx.set_transform(vello_cpu::kurbo::Affine::translate((0.0, dy)));

    let font_data =
        vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(font.bytes.as_ref().clone()), 0);
    for line in layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };
            let brush = run.style().brush;
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                brush.r, brush.g, brush.b, brush.a,
            ));
            let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(&font_data)
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs);
        }
    }
    ctx.flush();
    ctx.render_to_pixmap(&mut pixmap);

    let mut out = PixelBuffer::new(width, height);
    for (dst, src) in out
        .as_bytes_mut()
        .chunks_exact_mut(3)
        .zip(pixmap.data_as_u8_slice().chunks_exact(4))
    {
        dst.copy_from_slice(&src[..3]);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(w: u32, h: u32) -> PixelBuffer {
        let mut buf = PixelBuffer::new(w, h);
        for y in 0..h {
            for x in 0..w {
                buf.set_pixel(x, y, [(x % 251) as u8, (y % 251) as u8, 7]);
            }
        }
        buf
    }

    #[test]
    fn from_masters_tiles_both_variants() {
        let master_h = ramp(10, 4);
        let master_v = master_h.rotate_cw();
        let strip = TextStrip::from_masters(master_h.clone(), master_v).unwrap();
        assert_eq!(strip.len_px(), 10);
        assert_eq!(strip.doubled_horizontal().width(), 20);
        assert_eq!(strip.doubled_horizontal().height(), 4);
        assert_eq!(strip.doubled_vertical().width(), 4);
        assert_eq!(strip.doubled_vertical().height(), 20);
        // Second tiling repeats the first, pixel for pixel.
        for y in 0..4 {
            for x in 0..10 {
                assert_eq!(
                    strip.doubled_horizontal().pixel(x, y),
                    strip.doubled_horizontal().pixel(x + 10, y)
                );
                assert_eq!(strip.doubled_horizontal().pixel(x, y), master_h.pixel(x, y));
            }
        }
        for y in 0..10 {
            for x in 0..4 {
                assert_eq!(
                    strip.doubled_vertical().pixel(x, y),
                    strip.doubled_vertical().pixel(x, y + 10)
                );
            }
        }
    }

    #[test]
    fn from_masters_rejects_length_mismatch() {
        let master_h = ramp(10, 4);
        let master_v = ramp(4, 9);
        assert!(TextStrip::from_masters(master_h, master_v).is_err());
    }

    #[test]
    fn render_produces_matching_variants() {
        let mut fonts = FontCatalog::system();
        if fonts.is_empty() {
            eprintln!("skipping: host has no fonts installed");
            return;
        }
        let spec = StripSpec {
            text: "AB".to_string(),
            font_family: "Arial".to_string(),
            font_pt: 24,
            text_rgb: [255, 255, 255],
            bg_rgb: [10, 20, 30],
            module: ModuleSize { w: 48, h: 64 },
        };
        let strip = TextStrip::render(&spec, &mut fonts).unwrap();
        assert!(strip.len_px() >= 8);
        assert_eq!(strip.doubled_horizontal().height(), 64);
        assert_eq!(strip.doubled_horizontal().width(), strip.len_px() * 2);
        assert_eq!(strip.doubled_vertical().width(), 48);
        assert_eq!(strip.doubled_vertical().height(), strip.len_px() * 2);
        // Some glyph pixels differ from the background.
        let bg = [10, 20, 30];
        let any_ink = strip
            .doubled_horizontal()
            .as_bytes()
            .chunks_exact(3)
            .any(|px| px != bg);
        assert!(any_ink);
    }

    #[test]
    fn empty_text_still_measures_a_strip() {
        let mut fonts = FontCatalog::system();
        if fonts.is_empty() {
            eprintln!("skipping: host has no fonts installed");
            return;
        }
        let spec = StripSpec {
            text: String::new(),
            font_family: "Arial".to_string(),
            font_pt: 24,
            text_rgb: [255, 255, 255],
            bg_rgb: [0, 0, 0],
            module: ModuleSize { w: 32, h: 32 },
        };
        let strip = TextStrip::render(&spec, &mut fonts).unwrap();
        assert!(strip.len_px() >= 8);
    }
}
