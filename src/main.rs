//! Demo: runs one search as the console against a small in-memory world.
//!
//! ```text
//! cargo run -- chunk{w:world,x:0,z:0,r:2} type:diamond_sword enchant{t:sharpness}
//! ```

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use invsearch::command::{CommandOutcome, SearchCommand};
use invsearch::config::Settings;
use invsearch::host::{BlockPos, ChunkCoord, Container, PlayerInventories, PlayerRef};
use invsearch::interface::lane;
use invsearch::item::{Catalog, Enchantment, ItemMeta, ItemStack, Material};
use invsearch::memory::{MemoryHost, RecordingInitiator};
use invsearch::message::DefaultMessages;

const DEMO_QUERY: [&str; 4] = ["player{offline:true}", "chunk{w:world,x:0,z:0,r:2,l:true}", "type:diamond_sword", "enchant{t:sharpness}"];

fn main() -> ExitCode {
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> =
        if args.is_empty() { DEMO_QUERY.to_vec() } else { args.iter().map(String::as_str).collect() };

    let (handle, executor) = lane();
    let command = SearchCommand::new(Arc::new(demo_world()), handle, Arc::new(DefaultMessages), settings.search);
    let console = Arc::new(RecordingInitiator::console());

    match command.execute(console.clone(), &args) {
        CommandOutcome::Usage => {
            eprintln!("usage: invsearch <inventory>... <matcher>...");
            ExitCode::FAILURE
        }
        CommandOutcome::Rejected(key) => {
            error!(reason = key.path(), "search rejected");
            print_messages(&console);
            ExitCode::FAILURE
        }
        CommandOutcome::Started(search) => {
            // this thread plays the host's authoritative lane
            executor.run_until(Duration::from_millis(5), || search.is_finished());
            let elapsed = search.elapsed();
            if let Some(summary) = search.join() {
                info!(matches = summary.matches.len(), polls = summary.polls, ?elapsed, "done");
            }
            print_messages(&console);
            ExitCode::SUCCESS
        }
    }
}

fn print_messages(console: &RecordingInitiator) {
    for message in console.messages() {
        println!("{message}");
    }
}

fn demo_world() -> MemoryHost {
    let catalog = Catalog::new(
        ["chest", "barrel", "diamond_sword", "iron_sword", "stone", "diamond"],
        ["sharpness", "unbreaking", "mending"],
    );
    let host = MemoryHost::new(catalog).with_async_loading(true);
    let sword = |enchant: &str, level| {
        ItemStack::new(Material::new("diamond_sword"), 1)
            .with_meta(ItemMeta::new().with_enchant(Enchantment::new(enchant), level))
    };

    for x in -2..=2 {
        for z in -2..=2 {
            // every other chunk is unloaded
            host.add_chunk("world", ChunkCoord::new(x, z), (x + z) % 2 == 0);
        }
    }
    host.add_container(Container {
        material: Material::new("chest"),
        world: "world".into(),
        pos: BlockPos::new(3, 64, 5),
        contents: vec![Some(ItemStack::new(Material::new("stone"), 64)), Some(sword("sharpness", 5)), None],
    });
    host.add_container(Container {
        material: Material::new("barrel"),
        world: "world".into(),
        pos: BlockPos::new(-20, 70, 17),
        contents: vec![Some(sword("unbreaking", 3))],
    });
    host.add_container(Container {
        material: Material::new("chest"),
        world: "world".into(),
        pos: BlockPos::new(18, 12, -30),
        contents: vec![Some(sword("sharpness", 2))],
    });
    host.add_world("world_nether");

    host.add_player(
        PlayerRef::new(Uuid::new_v4(), "Alex"),
        true,
        Some(PlayerInventories {
            inventory: vec![Some(ItemStack::new(Material::new("diamond"), 12))],
            cursor: None,
            ender_chest: vec![Some(sword("sharpness", 1))],
        }),
    );
    host.add_player(
        PlayerRef::new(Uuid::new_v4(), "Steve"),
        false,
        Some(PlayerInventories {
            inventory: vec![Some(sword("sharpness", 4))],
            ..PlayerInventories::default()
        }),
    );
    host
}
