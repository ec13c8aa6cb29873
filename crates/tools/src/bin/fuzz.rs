use std::collections::BTreeMap;

use anyhow::{Result, bail};
use clap::Parser;
use dungeon_core::{
    BasicPlayer, EnemyId, FloorConfig, FloorEvent, FloorSession, PlayerHandle, Pos, RoomId,
    RoomState, TileKind, Vec2,
};
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const FRAME_MS: u32 = 16;
const PLAYER_STEP_TILES: f32 = 0.12;
const WANDER_DIRECTIONS: [(f32, f32); 8] = [
    (1.0, 0.0),
    (-1.0, 0.0),
    (0.0, 1.0),
    (0.0, -1.0),
    (1.0, 1.0),
    (1.0, -1.0),
    (-1.0, 1.0),
    (-1.0, -1.0),
];

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
    #[arg(short, long, default_value_t = 20)]
    floors: u32,
    #[arg(short, long, default_value_t = 4000)]
    ticks: u32,
}

fn choose<T: Copy>(rng: &mut ChaCha8Rng, slice: &[T]) -> T {
    let p = rng.next_u64() as usize % slice.len();
    slice[p]
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
    let args = Args::parse();

    println!(
        "Starting floor fuzz on seed {} for {} floors of {} ticks...",
        args.seed, args.floors, args.ticks
    );
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let mut cleared_total = 0;

    for floor_index in 0..args.floors {
        let config = FloorConfig {
            seed: Some(rng.next_u64().to_string()),
            depth: floor_index + 1,
            ..FloorConfig::default()
        };
        cleared_total += run_floor(&config, args.ticks, &mut rng)?;
    }

    println!("Fuzzing completed successfully: {cleared_total} rooms cleared.");
    Ok(())
}

/// Walks a scripted player from room to room and checks invariants every tick.
fn run_floor(config: &FloorConfig, ticks: u32, rng: &mut ChaCha8Rng) -> Result<usize> {
    let mut session = FloorSession::from_config(config)?;
    let floor = session.floor().clone();
    let mut player = BasicPlayer {
        position: floor.spawn_point.center(),
        hp: i32::MAX / 2,
        attack: 30,
        defense: 2,
    };
    let mut history: BTreeMap<RoomId, RoomState> = BTreeMap::new();
    let mut opened: BTreeMap<RoomId, usize> = BTreeMap::new();
    let mut waypoint = floor.rooms.len().min(1);

    for _ in 0..ticks {
        let mut events = session.tick(FRAME_MS, &mut player);

        if session.lifecycle().active_room().is_some() {
            let ids: Vec<EnemyId> = session.enemies().map(|(id, _)| id).collect();
            if !ids.is_empty() && choose(rng, &[true, true, false]) {
                events.extend(session.player_attack(choose(rng, &ids), &mut player));
            } else {
                wander(&session, &mut player, choose(rng, &WANDER_DIRECTIONS));
            }
        } else if let Some(room) = floor.rooms.get(waypoint) {
            let target = room.center.center();
            if player.position().distance(target) < 0.5 {
                waypoint += 1;
            } else {
                step_toward(&session, &mut player, target);
            }
        }

        for event in &events {
            if let FloorEvent::DoorsOpened { room, .. } = event {
                *opened.entry(*room).or_insert(0) += 1;
            }
        }
        check_invariants(&session, player.position(), &mut history, &opened)?;
    }

    let cleared = floor
        .rooms
        .iter()
        .filter(|room| session.lifecycle().room_state_of(room.id) == Some(RoomState::Cleared))
        .count();
    info!(seed = %floor.seed, cleared, rooms = floor.rooms.len(), "floor finished");
    if cleared < floor.rooms.len() {
        warn!(seed = %floor.seed, cleared, "tick budget ran out before every room was cleared");
    }
    Ok(cleared)
}

/// Straight-line walking with the session's collision rule. Only called between
/// encounters; it teleports past corners since the core does no pathfinding.
fn step_toward(session: &FloorSession, player: &mut BasicPlayer, target: Vec2) {
    let Some(direction) = (target - player.position).normalized() else {
        return;
    };
    let next = player.position + direction * PLAYER_STEP_TILES;
    player.position = if session.can_occupy(next) { next } else { target };
}

/// Mid-encounter steps never teleport, so a sealed room must hold the player.
fn wander(session: &FloorSession, player: &mut BasicPlayer, (x, y): (f32, f32)) {
    let Some(direction) = Vec2::new(x, y).normalized() else {
        return;
    };
    let next = player.position + direction * (PLAYER_STEP_TILES * 4.0);
    if session.can_occupy(next) {
        player.position = next;
    }
}

fn check_invariants(
    session: &FloorSession,
    player: Vec2,
    history: &mut BTreeMap<RoomId, RoomState>,
    opened: &BTreeMap<RoomId, usize>,
) -> Result<()> {
    let floor = session.floor();
    for (_, enemy) in session.enemies() {
        if enemy.hp > enemy.max_hp {
            bail!("enemy hp {} above max {}", enemy.hp, enemy.max_hp);
        }
        if floor.grid.tile_at(enemy.position.cell()) == TileKind::Wall {
            bail!("enemy inside a wall at {:?}", enemy.position);
        }
    }

    for room in &floor.rooms {
        let Some(state) = session.lifecycle().room_state_of(room.id) else {
            bail!("room {} has no lifecycle state", room.id.0);
        };
        let previous = history.insert(room.id, state).unwrap_or(state);
        if state < previous {
            bail!("room {} went from {previous:?} back to {state:?}", room.id.0);
        }
    }

    if let Some((room, count)) = opened.iter().find(|(_, count)| **count > 1) {
        bail!("room {} opened its doors {count} times", room.0);
    }
    let lifecycle = session.lifecycle();
    let Some(active) = lifecycle.active_room().and_then(|id| floor.room(id)) else {
        if lifecycle.sealed_doors().next().is_some() {
            bail!("doors sealed with no active room");
        }
        return Ok(());
    };
    if !active.rect.contains(player.cell()) {
        bail!("player at {player:?} left active room {} while sealed", active.id.0);
    }
    let ring = active.rect.expanded(1);
    for y in ring.y..=ring.bottom() {
        for x in ring.x..=ring.right() {
            let cell = Pos { y: y as i32, x: x as i32 };
            if !active.rect.contains(cell) && session.can_occupy(cell.center()) {
                bail!("active room {} can be left through {cell:?}", active.id.0);
            }
        }
    }
    Ok(())
}
