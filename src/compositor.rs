use crate::{
    model::{BlockDir, Rgb},
    pixel::PixelBuffer,
    strip::TextStrip,
    tilemap::Tile,
};

/// Samples the doubled strips into every destination tile to build one
/// output frame.
///
/// The frame buffer is allocated once and reused across ticks; callers get
/// a borrow and must copy if they need to retain pixels across calls.
pub struct FrameCompositor {
    frame: PixelBuffer,
}

impl FrameCompositor {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            frame: PixelBuffer::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.frame.width()
    }

    pub fn height(&self) -> u32 {
        self.frame.height()
    }

    /// Compose the frame for `offset_px`. With no strip the frame is a
    /// solid background fill (nothing selected yet).
    ///
    /// Each tile samples at a phase shifted by its sequence index: tile i
    /// of a `left_right` run starts `i * tile_w` pixels into the strip
    /// (plus the scroll offset), so consecutive modules continue the text.
    /// `right_left` negates both the offset and the index term, mirroring
    /// the motion; the vertical directions are the transpose with
    /// `tile_h` as the phase step. Sampling windows that cross the end of
    /// the doubled buffer are split into wrapped sub-blits, looping as
    /// often as needed for tiles spanning multiple periods.
    pub fn render(
        &mut self,
        strip: Option<&TextStrip>,
        offset_px: f64,
        tiles: &[Tile],
        bg: Rgb,
    ) -> &PixelBuffer {
        self.frame.fill(bg);
        let Some(strip) = strip else {
            return &self.frame;
        };

        let len = i64::from(strip.len_px());
        let off = offset_px.floor() as i64;
        for (index, tile) in tiles.iter().enumerate() {
            let i = index as i64;
            match tile.dir {
                BlockDir::LeftRight | BlockDir::RightLeft => {
                    let phase = off + i * i64::from(tile.w);
                    let src_x = match tile.dir {
                        BlockDir::LeftRight => phase.rem_euclid(len),
                        _ => (-phase).rem_euclid(len),
                    };
                    blit_wrapped_x(&mut self.frame, strip.doubled_horizontal(), len, src_x, tile);
                }
                BlockDir::TopDown | BlockDir::BottomUp => {
                    let phase = off + i * i64::from(tile.h);
                    let src_y = match tile.dir {
                        BlockDir::TopDown => phase.rem_euclid(len),
                        _ => (-phase).rem_euclid(len),
                    };
                    blit_wrapped_y(&mut self.frame, strip.doubled_vertical(), len, src_y, tile);
                }
            }
        }
        &self.frame
    }
}

fn blit_wrapped_x(frame: &mut PixelBuffer, doubled: &PixelBuffer, len: i64, mut src_x: i64, tile: &Tile) {
    let w = i64::from(tile.w);
    let mut done = 0i64;
    while done < w {
        let n = (w - done).min(2 * len - src_x);
        frame.blit_from(
            doubled,
            src_x as u32,
            0,
            i64::from(tile.x) + done,
            i64::from(tile.y),
            n as u32,
            tile.h,
        );
        done += n;
        src_x = (src_x + n) % len;
    }
}

fn blit_wrapped_y(frame: &mut PixelBuffer, doubled: &PixelBuffer, len: i64, mut src_y: i64, tile: &Tile) {
    let h = i64::from(tile.h);
    let mut done = 0i64;
    while done < h {
        let n = (h - done).min(2 * len - src_y);
        frame.blit_from(
            doubled,
            0,
            src_y as u32,
            i64::from(tile.x),
            i64::from(tile.y) + done,
            tile.w,
            n as u32,
        );
        done += n;
        src_y = (src_y + n) % len;
    }
}

/// Paint 1-px tile outlines onto a finished frame, color-keyed by scroll
/// direction. Preview diagnostic only; never part of the export path.
pub fn draw_tile_outlines(frame: &mut PixelBuffer, tiles: &[Tile]) {
    for tile in tiles {
        let color = match tile.dir {
            BlockDir::BottomUp => [0, 255, 0],
            BlockDir::TopDown => [0, 180, 255],
            BlockDir::LeftRight => [255, 200, 0],
            BlockDir::RightLeft => [255, 0, 180],
        };
        let (x0, y0) = (i64::from(tile.x), i64::from(tile.y));
        let (x1, y1) = (x0 + i64::from(tile.w) - 1, y0 + i64::from(tile.h) - 1);
        for x in x0..=x1 {
            put(frame, x, y0, color);
            put(frame, x, y1, color);
        }
        for y in y0..=y1 {
            put(frame, x0, y, color);
            put(frame, x1, y, color);
        }
    }
}

fn put(frame: &mut PixelBuffer, x: i64, y: i64, rgb: Rgb) {
    if x >= 0 && y >= 0 {
        frame.set_pixel(x as u32, y as u32, rgb);
    }
}
