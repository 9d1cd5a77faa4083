//! Collaborator interfaces implemented by the host environment.
//!
//! Buckets and matchables only ever hold the lightweight identifiers defined here
//! ([`PlayerRef`], [`ChunkCoord`], world names) and resolve them against a [`Host`]
//! when they are actually scanned. Container reads ([`WorldAccess::containers`],
//! [`PlayerAccess::inventories`]) are only made from the authoritative lane.

use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};

use uuid::Uuid;

use crate::error::{Result, SearchError};
use crate::item::{Catalog, ItemStack, Material};
use crate::message::Component;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayerRef {
    id: Uuid,
    name: String,
}
impl PlayerRef {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub z: i32,
}
impl ChunkCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
    /// The chunk containing a block position.
    pub fn of_block(pos: BlockPos) -> Self {
        Self { x: pos.x >> 4, z: pos.z >> 4 }
    }
}
impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}
impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// Where a player initiator currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub world: String,
    pub chunk: ChunkCoord,
}

/// A block entity holding an inventory.
#[derive(Debug, Clone)]
pub struct Container {
    pub material: Material,
    pub world: String,
    pub pos: BlockPos,
    pub contents: Vec<Option<ItemStack>>,
}

/// Everything searchable on a player.
#[derive(Debug, Clone, Default)]
pub struct PlayerInventories {
    /// Main inventory; includes armour and off hand slots.
    pub inventory: Vec<Option<ItemStack>>,
    pub cursor: Option<ItemStack>,
    pub ender_chest: Vec<Option<ItemStack>>,
}

/// Opaque boolean capabilities checked against the initiator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    SearchChunksLoaded,
    SearchChunksUnloaded,
    SearchPlayersOnline,
    SearchPlayersOffline,
}
impl Capability {
    pub const ALL: [Capability; 4] = [
        Self::SearchChunksLoaded,
        Self::SearchChunksUnloaded,
        Self::SearchPlayersOnline,
        Self::SearchPlayersOffline,
    ];

    pub fn node(&self) -> &'static str {
        match self {
            Self::SearchChunksLoaded => "invsearch.search.chunks.loaded",
            Self::SearchChunksUnloaded => "invsearch.search.chunks.unloaded",
            Self::SearchPlayersOnline => "invsearch.search.players.online",
            Self::SearchPlayersOffline => "invsearch.search.players.offline",
        }
    }
}

/// Handle for a chunk being loaded without blocking the authoritative lane.
#[derive(Debug)]
pub struct ChunkLoad(Receiver<Result<()>>);

impl ChunkLoad {
    /// Create a pending load and the sender the host completes it with.
    pub fn pending() -> (Sender<Result<()>>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self(rx))
    }
    pub fn ready(result: Result<()>) -> Self {
        let (tx, load) = Self::pending();
        let _ = tx.send(result);
        load
    }
    /// Block until the host finished loading.
    pub fn wait(self) -> Result<()> {
        self.0
            .recv()
            .map_err(|_| SearchError::Host("chunk load abandoned".to_string()))?
    }
}

pub trait WorldAccess: Send + Sync {
    fn worlds(&self) -> Vec<String>;
    fn is_chunk_generated(&self, world: &str, chunk: ChunkCoord) -> bool;
    fn is_chunk_loaded(&self, world: &str, chunk: ChunkCoord) -> bool;
    /// Request a non-blocking load. `None` when the host has no such facility.
    fn load_chunk_async(&self, world: &str, chunk: ChunkCoord) -> Option<ChunkLoad>;
    fn load_chunk(&self, world: &str, chunk: ChunkCoord) -> Result<()>;
    /// Let go of a chunk loaded on behalf of a search.
    fn release_chunk(&self, world: &str, chunk: ChunkCoord);
    fn containers(&self, world: &str, chunk: ChunkCoord) -> Vec<Container>;
}

pub trait PlayerAccess: Send + Sync {
    fn online_players(&self) -> Vec<PlayerRef>;
    /// Every player that ever joined, online ones included.
    fn known_players(&self) -> Vec<PlayerRef>;
    /// Inventories of a player, loading saved data for offline players.
    fn inventories(&self, player: &PlayerRef) -> Option<PlayerInventories>;
}

pub trait Host: WorldAccess + PlayerAccess {
    fn catalog(&self) -> &Catalog;
}

/// The operator who issued a search.
pub trait Initiator: Send + Sync {
    /// Key for the one-search-per-initiator registry.
    fn id(&self) -> String;
    fn has_capability(&self, capability: Capability) -> bool;
    /// Current position for player initiators.
    fn location(&self) -> Option<Location>;
    /// Interactive initiators get progress updates and rich output.
    fn is_interactive(&self) -> bool;
    fn send_message(&self, message: &str);
    fn send_rich(&self, component: &Component);
}
