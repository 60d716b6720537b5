use tickerloop::{
    Block, BlockDir, FontCatalog, FrameCompositor, ModuleSize, PathMode, PixelBuffer, Point, Port,
    PortMode, StripSpec, TextStrip, build_tiles, integer_speed, period_frames,
};

const MODULE: ModuleSize = ModuleSize { w: 128, h: 256 };

/// Two ports of four vertical modules each, the stock wall layout.
fn two_port_wall() -> Vec<Port> {
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

fn order() -> Vec<String> {
    vec!["port1".to_string(), "port2".to_string()]
}

/// Strip with a distinct pixel per position so frame comparisons are
/// sensitive to any sampling drift.
fn coded_strip(len: u32, cross_h: u32, cross_v: u32) -> TextStrip {
    let mut master_h = PixelBuffer::new(len, cross_h);
    for y in 0..cross_h {
        for x in 0..len {
            master_h.set_pixel(x, y, [(x % 256) as u8, (x / 256) as u8, (y % 251) as u8]);
        }
    }
    let mut master_v = PixelBuffer::new(cross_v, len);
    for y in 0..len {
        for x in 0..cross_v {
            master_v.set_pixel(x, y, [(y % 256) as u8, (y / 256) as u8, (x % 251) as u8]);
        }
    }
    TextStrip::from_masters(master_h, master_v).unwrap()
}

#[test]
fn two_port_wall_loops_frame_exactly() {
    let tiles = build_tiles(&two_port_wall(), &order(), MODULE).unwrap();
    assert_eq!(tiles.len(), 8);

    // A strip length with a non-trivial gcd against the speed.
    let len = 998u32;
    let speed = 4.0f64;
    let strip = coded_strip(len, MODULE.h, MODULE.w);

    let period = period_frames(len, speed);
    assert_eq!(period, 499);
    let step = f64::from(integer_speed(speed));

    let mut compositor = FrameCompositor::new(256, 1024);
    let first = compositor.render(Some(&strip), 0.0, &tiles, [0, 0, 0]).clone();

    // Interior frames differ from the first (the scroll actually moves)...
    let mid = compositor
        .render(Some(&strip), f64::from(period / 2) * step, &tiles, [0, 0, 0])
        .clone();
    assert_ne!(first, mid);

    // ...and after exactly `period` steps the frame repeats byte for byte.
    let looped = compositor
        .render(Some(&strip), f64::from(period) * step, &tiles, [0, 0, 0])
        .clone();
    assert_eq!(first, looped);

    // Loop closure holds from any starting offset, not just zero.
    let o0 = 37.0 * step;
    let at_o0 = compositor.render(Some(&strip), o0, &tiles, [0, 0, 0]).clone();
    let wrapped = compositor
        .render(Some(&strip), o0 + f64::from(period) * step, &tiles, [0, 0, 0])
        .clone();
    assert_eq!(at_o0, wrapped);
}

#[test]
fn no_shorter_prefix_closes_the_loop() {
    let tiles = build_tiles(&two_port_wall(), &order(), MODULE).unwrap();
    let len = 60u32;
    let speed = 4.0f64;
    let strip = coded_strip(len, MODULE.h, MODULE.w);
    let period = period_frames(len, speed);
    assert_eq!(period, 15);

    let mut compositor = FrameCompositor::new(256, 1024);
    let first = compositor.render(Some(&strip), 0.0, &tiles, [0, 0, 0]).clone();
    for k in 1..period {
        let frame = compositor
            .render(Some(&strip), f64::from(k * 4), &tiles, [0, 0, 0])
            .clone();
        assert_ne!(first, frame, "loop closed early at frame {k}");
    }
}

#[test]
fn rendered_text_strip_loops_frame_exactly() {
    let mut fonts = FontCatalog::system();
    if fonts.is_empty() {
        eprintln!("skipping: host has no fonts installed");
        return;
    }

    let spec = StripSpec {
        text: "AB".to_string(),
        font_family: "Arial".to_string(),
        font_pt: 72,
        text_rgb: [255, 255, 255],
        bg_rgb: [0, 0, 0],
        module: MODULE,
    };
    let strip = TextStrip::render(&spec, &mut fonts).unwrap();
    let speed = 4.0f64;
    let period = period_frames(strip.len_px(), speed);

    let tiles = build_tiles(&two_port_wall(), &order(), MODULE).unwrap();
    let mut compositor = FrameCompositor::new(256, 1024);

    let first = compositor.render(Some(&strip), 0.0, &tiles, [0, 0, 0]).clone();
    let looped = compositor
        .render(Some(&strip), f64::from(period * 4), &tiles, [0, 0, 0])
        .clone();
    assert_eq!(first, looped);
}
