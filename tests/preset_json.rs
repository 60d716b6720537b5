use tickerloop::{BlockDir, EntryKind, ModuleSize, PortMode, Preset, Transition, build_tiles};

#[test]
fn full_preset_json_parses() {
    let json = r#"{
        "name": "lobby_wall",
        "module": { "w": 128, "h": 256 },
        "ports": [
            {
                "id": "port1",
                "start": { "x": 0, "y": 768 },
                "mode": "vertical",
                "path_mode": "snake",
                "blocks": [
                    { "dir": "bottom_up", "count": 4 },
                    { "dir": "top_down", "count": 4 }
                ]
            },
            {
                "id": "port2",
                "start": { "x": 256, "y": 0 },
                "mode": "horizontal",
                "blocks": [ { "dir": "left_right", "count": 3 } ]
            }
        ],
        "concat_port_order": ["port1", "port2"],
        "contents": [
            {
                "name": "day",
                "text": "WELCOME",
                "font_family": "DejaVu Sans",
                "font_pt": 64,
                "text_rgb": [255, 255, 255],
                "bg_rgb": [0, 0, 0]
            },
            { "name": "night", "text": "GOOD NIGHT" }
        ],
        "scheduler": {
            "fade_ms": 500,
            "entries": [
                {
                    "type": "daily",
                    "weekdays": [0, 1, 2, 3, 4],
                    "start": "06:00",
                    "end": "22:00",
                    "content": "day",
                    "transition": "crossfade",
                    "fade_ms": 1200
                },
                {
                    "type": "date",
                    "date": "2026-12-31",
                    "start": "22:00",
                    "end": "02:00",
                    "content": "night",
                    "transition": "cut"
                }
            ]
        },
        "output": { "width": 1920, "height": 1080, "fps": 50, "speed_px_per_frame": 4.0 }
    }"#;

    let mut preset: Preset = serde_json::from_str(json).unwrap();
    preset.normalize();
    preset.validate().unwrap();

    assert_eq!(preset.name, "lobby_wall");
    assert_eq!(preset.ports[1].mode, PortMode::Horizontal);
    assert_eq!(preset.contents[1].font_pt, 72); // defaulted
    assert_eq!(preset.scheduler.fade_ms, 500);
    assert_eq!(preset.scheduler.entries[0].kind, EntryKind::Daily);
    assert_eq!(preset.scheduler.entries[0].fade_ms, 1200);
    assert_eq!(preset.scheduler.entries[1].kind, EntryKind::Date);
    assert_eq!(preset.scheduler.entries[1].transition, Transition::Cut);

    let tiles = build_tiles(&preset.ports, &preset.concat_port_order, preset.module).unwrap();
    assert_eq!(tiles.len(), 11);
    // Port 1 block two landed one column to the right of block one.
    assert_eq!(tiles[4].x, 128);
    assert_eq!(tiles[4].dir, BlockDir::TopDown);
}

#[test]
fn empty_object_defaults_to_the_stock_wall() {
    let mut preset: Preset = serde_json::from_str("{}").unwrap();
    preset.normalize();
    preset.validate().unwrap();

    assert_eq!(preset.module, ModuleSize { w: 128, h: 256 });
    assert_eq!(preset.ports.len(), 2);
    assert_eq!(preset.contents.len(), 1);
    assert_eq!(preset.output.fps, 50);

    let tiles = build_tiles(&preset.ports, &preset.concat_port_order, preset.module).unwrap();
    assert_eq!(tiles.len(), 8);
}

#[test]
fn legacy_ports_migrate_like_explicit_vertical_columns() {
    let legacy = r#"{
        "ports": [
            { "id": "port1", "x": 0, "blocks": [ { "order": "top_down", "count": 2 } ] },
            { "id": "port2", "x": 128, "blocks": [ { "order": "top_down", "count": 2 } ] }
        ]
    }"#;
    let explicit = r#"{
        "ports": [
            {
                "id": "port1",
                "start": { "x": 0, "y": 0 },
                "mode": "vertical",
                "blocks": [ { "dir": "top_down", "count": 2 } ]
            },
            {
                "id": "port2",
                "start": { "x": 128, "y": 0 },
                "mode": "vertical",
                "blocks": [ { "dir": "top_down", "count": 2 } ]
            }
        ]
    }"#;

    let mut a: Preset = serde_json::from_str(legacy).unwrap();
    let mut b: Preset = serde_json::from_str(explicit).unwrap();
    a.normalize();
    b.normalize();
    assert_eq!(a.ports, b.ports);

    let tiles_a = build_tiles(&a.ports, &a.concat_port_order, a.module).unwrap();
    let tiles_b = build_tiles(&b.ports, &b.concat_port_order, b.module).unwrap();
    assert_eq!(tiles_a, tiles_b);
    assert_eq!(tiles_a.len(), 4);
}

#[test]
fn emitted_preset_is_load_equivalent() {
    let preset = Preset::default();
    let saved = serde_json::to_string(&preset).unwrap();
    let reloaded: Preset = serde_json::from_str(&saved).unwrap();
    assert_eq!(reloaded, preset);
}
