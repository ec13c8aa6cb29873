use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use dungeon_core::{
    DungeonGenerator, FloorConfig, FloorContext, GeneratedFloor, Grid, Pos, Room, RoomKind,
    TileKind,
};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Generate a dungeon floor and print it", long_about = None)]
struct Args {
    /// TOML floor configuration; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Generation seed label; numeric labels are used verbatim
    #[arg(short, long)]
    seed: Option<String>,
    #[arg(long)]
    width: Option<usize>,
    #[arg(long)]
    height: Option<usize>,
    #[arg(short, long)]
    depth: Option<u32>,
    /// Print JSON instead of an ASCII map
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct FloorReport<'a> {
    seed: u64,
    fingerprint: String,
    depth: u32,
    boss_room: Option<u32>,
    width: usize,
    height: usize,
    spawn_point: Pos,
    exit_point: Pos,
    rooms: &'a [Room],
    map: Vec<String>,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => FloorConfig::from_path(path)
            .with_context(|| format!("Failed to load floor config {}", path.display()))?,
        None => FloorConfig::default(),
    };
    if let Some(seed) = &args.seed {
        config.seed = Some(seed.clone());
    }
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(depth) = args.depth {
        config.depth = depth;
    }

    let generator = DungeonGenerator::new(config.clone()).context("Invalid floor config")?;
    let floor = generator.generate();
    let context = FloorContext::new(&config, &floor);
    info!(seed = %floor.seed, rooms = floor.rooms.len(), "floor ready");

    let map = render_rows(&floor);
    if args.json {
        let report = FloorReport {
            seed: floor.seed.0,
            fingerprint: format!("{:016x}", floor.fingerprint()),
            depth: context.depth,
            boss_room: context.boss_room.map(|room| room.0),
            width: floor.grid.width(),
            height: floor.grid.height(),
            spawn_point: floor.spawn_point,
            exit_point: floor.exit_point,
            rooms: &floor.rooms,
            map,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Seed: {}", floor.seed);
    println!("Fingerprint: {:016x}", floor.fingerprint());
    println!("Depth: {}{}", context.depth, if context.is_boss_floor() { " (boss)" } else { "" });
    println!();
    for row in map {
        println!("{row}");
    }
    println!();
    for room in &floor.rooms {
        let kind = format!("{:?}", room.kind);
        println!(
            "room {:>2} {kind:<9} at ({:>2},{:>2}) {:>2}x{:<2} doors={}",
            room.id.0,
            room.rect.x,
            room.rect.y,
            room.rect.width,
            room.rect.height,
            room.doors.len()
        );
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn render_rows(floor: &GeneratedFloor) -> Vec<String> {
    let grid: &Grid = &floor.grid;
    (0..grid.height())
        .map(|y| {
            (0..grid.width())
                .map(|x| {
                    let pos = Pos { y: y as i32, x: x as i32 };
                    glyph(floor, pos)
                })
                .collect()
        })
        .collect()
}

fn glyph(floor: &GeneratedFloor, pos: Pos) -> char {
    if pos == floor.spawn_point {
        return '@';
    }
    if pos == floor.exit_point {
        return '>';
    }
    if floor.rooms.iter().any(|room| room.doors.contains(&pos)) {
        return '+';
    }
    match floor.grid.tile_at(pos) {
        TileKind::Wall => '#',
        TileKind::Floor => match floor.room_containing(pos).map(|room| room.kind) {
            Some(RoomKind::Challenge) => '!',
            Some(RoomKind::Treasure) => '$',
            Some(RoomKind::Trap) => '^',
            Some(RoomKind::Shrine) => '_',
            _ => '.',
        },
    }
}
