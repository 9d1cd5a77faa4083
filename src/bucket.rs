use std::fmt;

use tracing::debug;

use crate::host::{ChunkCoord, Host, PlayerAccess, PlayerRef};
use crate::matchable::{ChunkTarget, Matchable};

/// A lazy, ordered, single-pass sequence of [`Matchable`]s.
pub trait Bucket: fmt::Debug + Send {
    fn has_next(&self) -> bool;
    /// Produce the next matchable. Returns `None` once exhausted.
    ///
    /// This runs on the search worker and may block on the host, e.g. while a chunk
    /// loads.
    fn next(&mut self, host: &dyn Host) -> Option<Matchable>;
    /// Estimated number of matchables, only used for progress.
    fn size(&self) -> usize;
    /// Canonical description, used to drop duplicate buckets.
    fn describe(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerScope {
    Online,
    /// Every known player, online ones included.
    Known,
}

#[derive(Debug)]
pub struct PlayerBucket {
    scope: PlayerScope,
    players: Vec<PlayerRef>,
    index: usize,
}

impl PlayerBucket {
    pub fn new<P: PlayerAccess + ?Sized>(players: &P, scope: PlayerScope) -> Self {
        let players = match scope {
            PlayerScope::Online => players.online_players(),
            PlayerScope::Known => players.known_players(),
        };
        Self { scope, players, index: 0 }
    }
    pub fn scope(&self) -> PlayerScope {
        self.scope
    }
    pub fn players(&self) -> &[PlayerRef] {
        &self.players
    }
}

impl Bucket for PlayerBucket {
    fn has_next(&self) -> bool {
        self.index < self.players.len()
    }
    fn next(&mut self, _host: &dyn Host) -> Option<Matchable> {
        let player = self.players.get(self.index)?.clone();
        self.index += 1;
        Some(Matchable::Player(player))
    }
    // one, however many players there are
    fn size(&self) -> usize {
        1
    }
    fn describe(&self) -> String {
        format!("player{{offline:{}}}", self.scope == PlayerScope::Known)
    }
}

/// Largest radius a chunk search may cover, 257² chunks.
pub const MAX_CHUNK_RADIUS: u32 = 128;

/// Offsets of a centered square, ring by ring, so nearer chunks come first.
///
/// Ring `d` holds every offset with `max(|dx|, |dz|) == d`. Within a ring, offsets
/// closer to the axes are produced first. The radius is clamped to [`MAX_CHUNK_RADIUS`].
pub fn ring_offsets(radius: u32) -> Vec<(i32, i32)> {
    let radius = radius.min(MAX_CHUNK_RADIUS) as i32;
    let side = (2 * radius + 1) as usize;
    let mut offsets = Vec::with_capacity(side * side);
    offsets.push((0, 0));
    for d in 1..=radius {
        for i in 0..=d {
            // vertical edges, x = ±d
            push_reflections(&mut offsets, d, i);
            // horizontal edges, z = ±d, corners already covered
            if i < d {
                for x in signed(i) {
                    offsets.push((x, d));
                    offsets.push((x, -d));
                }
            }
        }
    }
    offsets
}

fn push_reflections(offsets: &mut Vec<(i32, i32)>, d: i32, i: i32) {
    for z in signed(i) {
        offsets.push((d, z));
        offsets.push((-d, z));
    }
}

fn signed(value: i32) -> Vec<i32> {
    if value == 0 { vec![0] } else { vec![value, -value] }
}

#[derive(Debug)]
pub struct ChunkBucket {
    world: String,
    center: ChunkCoord,
    radius: u32,
    load: bool,
    chunks: Vec<ChunkCoord>,
    index: usize,
}

impl ChunkBucket {
    /// Chunks outside the coordinate range are skipped.
    pub fn new(world: impl Into<String>, center: ChunkCoord, radius: u32, load: bool) -> Self {
        let radius = radius.min(MAX_CHUNK_RADIUS);
        let chunks = ring_offsets(radius)
            .into_iter()
            .filter_map(|(dx, dz)| {
                Some(ChunkCoord::new(center.x.checked_add(dx)?, center.z.checked_add(dz)?))
            })
            .collect();
        Self { world: world.into(), center, radius, load, chunks, index: 0 }
    }
    pub fn world(&self) -> &str {
        &self.world
    }
    pub fn center(&self) -> ChunkCoord {
        self.center
    }
    pub fn radius(&self) -> u32 {
        self.radius
    }
    pub fn load(&self) -> bool {
        self.load
    }
    pub fn chunks(&self) -> &[ChunkCoord] {
        &self.chunks
    }
}

impl Bucket for ChunkBucket {
    fn has_next(&self) -> bool {
        self.index < self.chunks.len()
    }

    fn next(&mut self, host: &dyn Host) -> Option<Matchable> {
        let chunk = *self.chunks.get(self.index)?;
        self.index += 1;

        if !host.is_chunk_generated(&self.world, chunk) {
            return Some(Matchable::Nothing);
        }
        let loaded = host.is_chunk_loaded(&self.world, chunk);
        if !loaded && !self.load {
            return Some(Matchable::Nothing);
        }

        let target = |materialized| {
            Matchable::Chunk(ChunkTarget {
                world: self.world.clone(),
                chunk,
                materialized,
                release: !loaded,
            })
        };
        if loaded {
            return Some(target(true));
        }
        // Without a non-blocking facility the chunk is loaded when it is scanned.
        match host.load_chunk_async(&self.world, chunk) {
            None => Some(target(false)),
            Some(pending) => match pending.wait() {
                Ok(()) => Some(target(true)),
                Err(e) => {
                    debug!(world = %self.world, %chunk, error = %e, "async chunk load failed");
                    Some(Matchable::Nothing)
                }
            },
        }
    }

    fn size(&self) -> usize {
        self.chunks.len()
    }

    fn describe(&self) -> String {
        format!(
            "chunk{{w:{},x:{},z:{},r:{},l:{}}}",
            self.world, self.center.x, self.center.z, self.radius, self.load
        )
    }
}
