use crate::{
    error::{TickerError, TickerResult},
    model::{BlockDir, ModuleSize, Port, PortMode},
};

/// One destination rectangle in the output frame, corresponding to one
/// physical tile module. Derived data: regenerated from the ports whenever
/// geometry changes, never mutated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
    pub dir: BlockDir,
}

/// Expand ports into the flattened tile sequence, in `concat_port_order`.
///
/// A vertical port lays its blocks out as columns: the column x advances by
/// the module width after every block, including zero-count blocks, which
/// only move the cursor. Within a column `bottom_up` stacks tiles upward
/// from the start y and `top_down` stacks downward. A horizontal port is
/// the transpose: blocks are rows, tiles advance along x, and the row
/// cursor advances by the module height per block.
///
/// Ports not named in `concat_port_order` are excluded from the sequence
/// (configured-but-invisible ports are legal, e.g. staged roll-out).
pub fn build_tiles(
    ports: &[Port],
    concat_port_order: &[String],
    module: ModuleSize,
) -> TickerResult<Vec<Tile>> {
    if module.w == 0 || module.h == 0 {
        return Err(TickerError::geometry(
            "module width/height must be > 0 for tile expansion",
        ));
    }

    let mut tiles = Vec::new();
    for id in concat_port_order {
        let Some(port) = ports.iter().find(|p| &p.id == id) else {
            tracing::warn!(port = %id, "concat_port_order names a port that is not configured");
            continue;
        };
        expand_port(port, module, &mut tiles)?;
    }
    Ok(tiles)
}

fn expand_port(port: &Port, module: ModuleSize, tiles: &mut Vec<Tile>) -> TickerResult<()> {
    let (w, h) = (module.w as i64, module.h as i64);
    match port.mode {
        PortMode::Vertical => {
            let mut x = port.start.x as i64;
            for block in &port.blocks {
                for k in 0..block.count as i64 {
                    let y = match block.dir {
                        BlockDir::BottomUp => port.start.y as i64 - k * h,
                        BlockDir::TopDown => port.start.y as i64 + k * h,
                        BlockDir::LeftRight | BlockDir::RightLeft => {
                            return Err(TickerError::geometry(format!(
                                "port '{}' is vertical but block direction is {:?}",
                                port.id, block.dir
                            )));
                        }
                    };
                    tiles.push(Tile {
                        x: x as i32,
                        y: y as i32,
                        w: module.w,
                        h: module.h,
                        dir: block.dir,
                    });
                }
                x += w;
            }
        }
        PortMode::Horizontal => {
            let mut y = port.start.y as i64;
            for block in &port.blocks {
                for k in 0..block.count as i64 {
                    let x = match block.dir {
                        BlockDir::LeftRight => port.start.x as i64 + k * w,
                        BlockDir::RightLeft => port.start.x as i64 - k * w,
                        BlockDir::BottomUp | BlockDir::TopDown => {
                            return Err(TickerError::geometry(format!(
                                "port '{}' is horizontal but block direction is {:?}",
                                port.id, block.dir
                            )));
                        }
                    };
                    tiles.push(Tile {
                        x: x as i32,
                        y: y as i32,
                        w: module.w,
                        h: module.h,
                        dir: block.dir,
                    });
                }
                y += h;
            }
        }
    }
    Ok(())
}
