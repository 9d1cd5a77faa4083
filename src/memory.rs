//! In-memory host and initiator, for the demo binary, tests and benches.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::error::{Result, SearchError};
use crate::host::{
    Capability, ChunkCoord, ChunkLoad, Container, Host, Initiator, Location, PlayerAccess, PlayerInventories,
    PlayerRef, WorldAccess,
};
use crate::item::Catalog;
use crate::message::Component;

#[derive(Debug, Default)]
struct ChunkState {
    loaded: bool,
    failing: bool,
    containers: Vec<Container>,
}

#[derive(Debug)]
struct PlayerState {
    player: PlayerRef,
    online: bool,
    inventories: Option<PlayerInventories>,
}

/// A [`Host`] backed by maps. Chunks that were never added count as not generated.
#[derive(Debug, Default)]
pub struct MemoryHost {
    catalog: Catalog,
    async_loading: bool,
    worlds: RwLock<BTreeMap<String, HashMap<ChunkCoord, ChunkState>>>,
    players: RwLock<Vec<PlayerState>>,
    loads: AtomicUsize,
    releases: AtomicUsize,
}

impl MemoryHost {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog, ..Self::default() }
    }

    /// Offer non-blocking chunk loads to buckets.
    pub fn with_async_loading(mut self, enabled: bool) -> Self {
        self.async_loading = enabled;
        self
    }

    pub fn add_world(&self, world: &str) {
        self.worlds.write().entry(world.to_string()).or_default();
    }

    /// Mark a chunk as generated, optionally loaded.
    pub fn add_chunk(&self, world: &str, chunk: ChunkCoord, loaded: bool) {
        let mut worlds = self.worlds.write();
        let state = worlds.entry(world.to_string()).or_default().entry(chunk).or_default();
        state.loaded = loaded;
    }

    /// Place a container in the chunk holding its position; the chunk is created
    /// loaded if it did not exist.
    pub fn add_container(&self, container: Container) {
        let chunk = ChunkCoord::of_block(container.pos);
        let mut worlds = self.worlds.write();
        let state = worlds.entry(container.world.clone()).or_default().entry(chunk).or_insert_with(|| ChunkState {
            loaded: true,
            ..ChunkState::default()
        });
        state.containers.push(container);
    }

    /// Make every load of the chunk fail.
    pub fn fail_loads(&self, world: &str, chunk: ChunkCoord) {
        let mut worlds = self.worlds.write();
        worlds.entry(world.to_string()).or_default().entry(chunk).or_default().failing = true;
    }

    /// `None` inventories simulate unreadable player data.
    pub fn add_player(&self, player: PlayerRef, online: bool, inventories: Option<PlayerInventories>) {
        self.players.write().push(PlayerState { player, online, inventories });
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    fn with_chunk<T>(&self, world: &str, chunk: ChunkCoord, f: impl FnOnce(&ChunkState) -> T) -> Option<T> {
        self.worlds.read().get(world)?.get(&chunk).map(f)
    }
}

impl WorldAccess for MemoryHost {
    fn worlds(&self) -> Vec<String> {
        self.worlds.read().keys().cloned().collect()
    }

    fn is_chunk_generated(&self, world: &str, chunk: ChunkCoord) -> bool {
        self.with_chunk(world, chunk, |_| ()).is_some()
    }

    fn is_chunk_loaded(&self, world: &str, chunk: ChunkCoord) -> bool {
        self.with_chunk(world, chunk, |state| state.loaded).unwrap_or(false)
    }

    fn load_chunk_async(&self, world: &str, chunk: ChunkCoord) -> Option<ChunkLoad> {
        self.async_loading.then(|| ChunkLoad::ready(self.load_chunk(world, chunk)))
    }

    fn load_chunk(&self, world: &str, chunk: ChunkCoord) -> Result<()> {
        let mut worlds = self.worlds.write();
        let state = worlds
            .get_mut(world)
            .and_then(|chunks| chunks.get_mut(&chunk))
            .ok_or_else(|| SearchError::Host(format!("chunk {chunk} of {world} was never generated")))?;
        if state.failing {
            return Err(SearchError::Host(format!("chunk {chunk} of {world} failed to load")));
        }
        state.loaded = true;
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release_chunk(&self, world: &str, chunk: ChunkCoord) {
        if let Some(state) = self.worlds.write().get_mut(world).and_then(|chunks| chunks.get_mut(&chunk)) {
            state.loaded = false;
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn containers(&self, world: &str, chunk: ChunkCoord) -> Vec<Container> {
        self.with_chunk(world, chunk, |state| if state.loaded { state.containers.clone() } else { Vec::new() })
            .unwrap_or_default()
    }
}

impl PlayerAccess for MemoryHost {
    fn online_players(&self) -> Vec<PlayerRef> {
        self.players.read().iter().filter(|state| state.online).map(|state| state.player.clone()).collect()
    }

    fn known_players(&self) -> Vec<PlayerRef> {
        self.players.read().iter().map(|state| state.player.clone()).collect()
    }

    fn inventories(&self, player: &PlayerRef) -> Option<PlayerInventories> {
        self.players.read().iter().find(|state| state.player == *player)?.inventories.clone()
    }
}

impl Host for MemoryHost {
    fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

/// An [`Initiator`] that records everything sent to it.
#[derive(Debug)]
pub struct RecordingInitiator {
    id: String,
    capabilities: HashSet<Capability>,
    location: Option<Location>,
    interactive: bool,
    messages: Mutex<Vec<String>>,
    rich: Mutex<Vec<Component>>,
}

impl RecordingInitiator {
    /// A non-interactive initiator without a location, holding every capability.
    pub fn console() -> Self {
        Self {
            id: "console".to_string(),
            capabilities: Capability::ALL.into_iter().collect(),
            location: None,
            interactive: false,
            messages: Mutex::new(Vec::new()),
            rich: Mutex::new(Vec::new()),
        }
    }

    /// An interactive initiator standing at `location`, holding every capability.
    pub fn player(id: impl Into<String>, location: Location) -> Self {
        Self { id: id.into(), location: Some(location), interactive: true, ..Self::console() }
    }

    pub fn with_capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities = capabilities.into_iter().collect();
        self
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn rich_messages(&self) -> Vec<Component> {
        self.rich.lock().clone()
    }
}

impl Initiator for RecordingInitiator {
    fn id(&self) -> String {
        self.id.clone()
    }
    fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
    fn location(&self) -> Option<Location> {
        self.location.clone()
    }
    fn is_interactive(&self) -> bool {
        self.interactive
    }
    fn send_message(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
    fn send_rich(&self, component: &Component) {
        self.rich.lock().push(component.clone());
    }
}
