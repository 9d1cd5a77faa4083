use tracing::debug;

use crate::host::{ChunkCoord, Host, PlayerRef};
use crate::matcher::Matcher;
use crate::message::{MatchLocation, MessagePart};

/// Outcome of scanning one [`Matchable`]: either no match or a non-empty list of parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    parts: Vec<MessagePart>,
}

impl MatchResult {
    pub const NO_MATCH: MatchResult = MatchResult { parts: Vec::new() };

    /// An empty list collapses into [`MatchResult::NO_MATCH`].
    pub fn from_parts(parts: Vec<MessagePart>) -> Self {
        Self { parts }
    }
    pub fn is_match(&self) -> bool {
        !self.parts.is_empty()
    }
    pub fn parts(&self) -> &[MessagePart] {
        &self.parts
    }
    pub fn into_parts(self) -> Vec<MessagePart> {
        self.parts
    }
}

/// A chunk waiting to be scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkTarget {
    pub world: String,
    pub chunk: ChunkCoord,
    /// Already loaded by the bucket; otherwise it is loaded synchronously when scanned.
    pub materialized: bool,
    /// The search is responsible for releasing the chunk after scanning.
    pub release: bool,
}

/// A deferred unit of scan work. Nothing is read from the host until [`Matchable::evaluate`]
/// runs, which must happen on the authoritative lane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matchable {
    /// Short-circuited target, e.g. a chunk that was never generated.
    Nothing,
    Player(PlayerRef),
    Chunk(ChunkTarget),
}

impl Matchable {
    pub fn evaluate(&self, host: &dyn Host, matcher: &Matcher) -> MatchResult {
        match self {
            Self::Nothing => MatchResult::NO_MATCH,
            Self::Player(player) => match_player(host, matcher, player),
            Self::Chunk(target) => match_chunk(host, matcher, target),
        }
    }

    /// Give back what the bucket acquired when the matchable will never be evaluated.
    pub fn abandon(&self, host: &dyn Host) {
        if let Self::Chunk(target) = self {
            if target.release && target.materialized {
                debug!(world = %target.world, chunk = %target.chunk, "releasing unscanned chunk");
                host.release_chunk(&target.world, target.chunk);
            }
        }
    }
}

fn match_player(host: &dyn Host, matcher: &Matcher, player: &PlayerRef) -> MatchResult {
    let Some(inventories) = host.inventories(player) else {
        debug!(player = player.name(), "player data unavailable");
        return MatchResult::NO_MATCH;
    };

    // the cursor only matters when nothing in the inventory matched
    let inventory = matcher.matches_any(&inventories.inventory) || matcher.matches(inventories.cursor.as_ref());
    let ender_chest = matcher.matches_any(&inventories.ender_chest);

    if !inventory && !ender_chest {
        return MatchResult::NO_MATCH;
    }
    MatchResult::from_parts(vec![MessagePart::new(MatchLocation::Player {
        id: player.id(),
        name: player.name().to_string(),
        inventory,
        ender_chest,
    })])
}

fn match_chunk(host: &dyn Host, matcher: &Matcher, target: &ChunkTarget) -> MatchResult {
    if !target.materialized {
        if let Err(e) = host.load_chunk(&target.world, target.chunk) {
            debug!(world = %target.world, chunk = %target.chunk, error = %e, "chunk load failed");
            return MatchResult::NO_MATCH;
        }
    }

    let parts = host
        .containers(&target.world, target.chunk)
        .into_iter()
        .filter(|container| matcher.matches_any(&container.contents))
        .map(|container| {
            MessagePart::new(MatchLocation::Container {
                material: container.material,
                world: container.world,
                pos: container.pos,
            })
        })
        .collect();

    if target.release {
        host.release_chunk(&target.world, target.chunk);
    }
    MatchResult::from_parts(parts)
}
