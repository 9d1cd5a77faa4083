use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use invsearch::SearchError;
use invsearch::bucket::{Bucket, ChunkBucket, PlayerBucket, PlayerScope};
use invsearch::config::SearchSettings;
use invsearch::host::{BlockPos, ChunkCoord, Container, Location, PlayerInventories, PlayerRef, WorldAccess};
use invsearch::interface::{CancelToken, lane, schedule};
use invsearch::item::{Catalog, ItemStack, Material};
use invsearch::matchable::{ChunkTarget, Matchable};
use invsearch::matcher::{ItemPredicate, Matcher};
use invsearch::memory::{MemoryHost, RecordingInitiator};
use invsearch::message::{DefaultMessages, MatchLocation};
use invsearch::search::{Cycle, Search, SearchContext, SearchState, SearchSummary};
use uuid::Uuid;

const PREFIX: &str = "Locations of items matching parameters:";
const NO_MATCHES: &str = "No items found with search parameters.";

fn setup() -> MemoryHost {
    let host = MemoryHost::new(Catalog::new(["chest", "stone", "diamond"], ["sharpness"]));
    host.add_world("world");
    host
}

fn settings(results_max: usize, polls_per_cycle: usize) -> SearchSettings {
    SearchSettings { results_max, polls_per_cycle, cycle_interval_ms: 1 }
}

fn diamonds() -> Matcher {
    Matcher::new(vec![ItemPredicate::is_type(Material::new("diamond"))], vec![])
}

fn stack(material: &str, amount: i32) -> Option<ItemStack> {
    Some(ItemStack::new(Material::new(material), amount))
}

fn chest(x: i32, y: i32, z: i32, contents: Vec<Option<ItemStack>>) -> Container {
    Container { material: Material::new("chest"), world: "world".into(), pos: BlockPos::new(x, y, z), contents }
}

fn chunks(center: ChunkCoord, radius: u32, load: bool) -> Box<dyn Bucket> {
    Box::new(ChunkBucket::new("world", center, radius, load))
}

fn players(host: &MemoryHost) -> Box<dyn Bucket> {
    Box::new(PlayerBucket::new(host, PlayerScope::Online))
}

fn context(host: &Arc<MemoryHost>, initiator: &Arc<RecordingInitiator>) -> (SearchContext, invsearch::interface::LaneExecutor) {
    let (handle, executor) = lane();
    let ctx = SearchContext {
        host: host.clone(),
        lane: handle,
        initiator: initiator.clone(),
        messages: Arc::new(DefaultMessages),
    };
    (ctx, executor)
}

// Schedule on a worker and serve the lane from this thread until it is done.
fn run(search: Search, host: &Arc<MemoryHost>, initiator: &Arc<RecordingInitiator>) -> Option<SearchSummary> {
    let (ctx, executor) = context(host, initiator);
    let handle = schedule(search, ctx, CancelToken::new());
    executor.run_until(Duration::from_millis(1), || handle.is_finished());
    handle.join()
}

#[test]
fn one_of_three_players_matches() {
    let host = setup();
    let bob = PlayerRef::new(Uuid::new_v4(), "Bob");
    for (player, inventory) in [
        (PlayerRef::new(Uuid::new_v4(), "Alice"), vec![stack("stone", 3)]),
        (bob.clone(), vec![None, stack("diamond", 2)]),
        (PlayerRef::new(Uuid::new_v4(), "Carol"), vec![]),
    ] {
        host.add_player(player, true, Some(PlayerInventories { inventory, ..PlayerInventories::default() }));
    }
    let host = Arc::new(host);
    let console = Arc::new(RecordingInitiator::console());

    let search = Search::new(diamonds(), vec![players(&host)], None, settings(100, 10)).expect("valid search");
    let summary = run(search, &host, &console).expect("completed");

    assert_eq!(summary.matches.len(), 1);
    assert_eq!(
        summary.matches[0].location(),
        &MatchLocation::Player { id: bob.id(), name: "Bob".into(), inventory: true, ender_chest: false }
    );
    assert_eq!(console.messages(), vec![format!("{PREFIX} Bob (inv)")]);
}

#[test]
fn player_parts_name_where_the_match_is() {
    let host = setup();
    let cases = [
        ("Cara", PlayerInventories { cursor: stack("diamond", 1), ..PlayerInventories::default() }, "Cara (inv)"),
        ("Dan", PlayerInventories { ender_chest: vec![stack("diamond", 1)], ..PlayerInventories::default() }, "Dan (ender)"),
        (
            "Eve",
            PlayerInventories { inventory: vec![stack("diamond", 1)], cursor: None, ender_chest: vec![stack("diamond", 9)] },
            "Eve (inv, ender)",
        ),
    ];
    for (name, inventories, expected) in cases {
        let player = PlayerRef::new(Uuid::new_v4(), name);
        host.add_player(player.clone(), true, Some(inventories));
        let result = Matchable::Player(player).evaluate(&host, &diamonds());
        assert!(result.is_match());
        assert_eq!(result.parts()[0].plain(), expected);
    }

    // unreadable player data degrades to no match
    let ghost = PlayerRef::new(Uuid::new_v4(), "Ghost");
    host.add_player(ghost.clone(), false, None);
    assert!(!Matchable::Player(ghost).evaluate(&host, &diamonds()).is_match());
}

#[test]
fn single_loaded_chunk_with_one_match() {
    let host = setup();
    host.add_container(chest(1, 64, 2, vec![stack("stone", 1), stack("diamond", 1)]));
    host.add_container(chest(3, 64, 2, vec![stack("stone", 1)]));
    let host = Arc::new(host);
    let console = Arc::new(RecordingInitiator::console());

    let search =
        Search::new(diamonds(), vec![chunks(ChunkCoord::new(0, 0), 0, false)], None, settings(100, 10)).expect("valid");
    let summary = run(search, &host, &console).expect("completed");

    assert_eq!(summary.matches.len(), 1);
    assert_eq!(console.messages(), vec![format!("{PREFIX} minecraft:chest @ world: 1x 64y 2z")]);
    // loaded by someone else, so left alone
    assert_eq!(host.releases(), 0);
}

#[test]
fn unloaded_chunk_async_path() {
    let host = setup().with_async_loading(true);
    host.add_chunk("world", ChunkCoord::new(0, 0), false);
    host.add_container(chest(1, 64, 2, vec![stack("diamond", 1)]));
    let host = Arc::new(host);
    let console = Arc::new(RecordingInitiator::console());

    let search =
        Search::new(diamonds(), vec![chunks(ChunkCoord::new(0, 0), 0, true)], None, settings(100, 10)).expect("valid");
    let summary = run(search, &host, &console).expect("completed");

    assert_eq!(summary.matches.len(), 1);
    assert_eq!(host.loads(), 1);
    assert_eq!(host.releases(), 1);
    assert!(!host.is_chunk_loaded("world", ChunkCoord::new(0, 0)));
}

#[test]
fn unloaded_chunk_sync_path() {
    let host = setup();
    host.add_chunk("world", ChunkCoord::new(0, 0), false);
    host.add_container(chest(1, 64, 2, vec![stack("diamond", 1)]));
    let host = Arc::new(host);
    let console = Arc::new(RecordingInitiator::console());

    let search =
        Search::new(diamonds(), vec![chunks(ChunkCoord::new(0, 0), 0, true)], None, settings(100, 10)).expect("valid");
    let summary = run(search, &host, &console).expect("completed");

    assert_eq!(summary.matches.len(), 1);
    assert_eq!(host.loads(), 1);
    assert_eq!(host.releases(), 1);
}

#[test]
fn failed_chunk_load_is_no_match() {
    let host = setup();
    host.add_chunk("world", ChunkCoord::new(0, 0), false);
    host.add_container(chest(1, 64, 2, vec![stack("diamond", 1)]));
    host.fail_loads("world", ChunkCoord::new(0, 0));
    let host = Arc::new(host);
    let console = Arc::new(RecordingInitiator::console());

    let search =
        Search::new(diamonds(), vec![chunks(ChunkCoord::new(0, 0), 0, true)], None, settings(100, 10)).expect("valid");
    let summary = run(search, &host, &console).expect("completed");

    assert!(summary.matches.is_empty());
    assert_eq!(console.messages(), vec![NO_MATCHES.to_string()]);
}

#[test]
fn deferred_chunk_target_is_released_after_scan() {
    let host = setup();
    host.add_chunk("world", ChunkCoord::new(0, 0), false);
    host.add_container(chest(1, 64, 2, vec![stack("diamond", 1)]));
    let target = Matchable::Chunk(ChunkTarget {
        world: "world".into(),
        chunk: ChunkCoord::new(0, 0),
        materialized: false,
        release: true,
    });
    assert_eq!(target.evaluate(&host, &diamonds()).parts().len(), 1);
    assert_eq!(host.loads(), 1);
    assert_eq!(host.releases(), 1);
}

fn chest_per_chunk(radius: i32) -> MemoryHost {
    let host = setup();
    for x in -radius..=radius {
        for z in -radius..=radius {
            host.add_container(chest(x * 16 + 1, 64, z * 16 + 1, vec![stack("diamond", 1)]));
        }
    }
    host
}

#[test]
fn completes_early_at_max_results() {
    let host = Arc::new(chest_per_chunk(2));
    let console = Arc::new(RecordingInitiator::console());

    let search =
        Search::new(diamonds(), vec![chunks(ChunkCoord::new(0, 0), 2, false)], None, settings(3, 1)).expect("valid");
    let summary = run(search, &host, &console).expect("completed");

    assert_eq!(summary.matches.len(), 3);
    assert_eq!(summary.polls, 3);
    assert_eq!(summary.total_work, 25);
}

#[test]
fn output_is_capped_when_one_batch_overshoots() {
    let host = Arc::new(chest_per_chunk(2));
    let console = Arc::new(RecordingInitiator::console());

    let search =
        Search::new(diamonds(), vec![chunks(ChunkCoord::new(0, 0), 2, false)], None, settings(2, 25)).expect("valid");
    let summary = run(search, &host, &console).expect("completed");

    assert_eq!(summary.matches.len(), 2);
    assert_eq!(summary.cycles, 1);
    let messages = console.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].matches("minecraft:chest").count(), 2);
}

#[test]
fn callback_fires_once_on_completion() {
    let host = Arc::new(chest_per_chunk(1));
    let console = Arc::new(RecordingInitiator::console());
    let (ctx, executor) = context(&host, &console);
    let _lane = executor.spawn();

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    let mut search = Search::new(
        diamonds(),
        vec![chunks(ChunkCoord::new(0, 0), 1, false)],
        Some(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })),
        settings(100, 2),
    )
    .expect("valid");

    let cancel = CancelToken::new();
    let mut cycles = 1;
    while search.cycle(&ctx, &cancel) == Cycle::Continue {
        cycles += 1;
    }
    assert_eq!(cycles, 5);
    assert_eq!(search.state(), SearchState::Completed);
    assert_eq!(search.results().len(), 9);
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    // further cycles are no-ops
    assert_eq!(search.cycle(&ctx, &cancel), Cycle::Completed);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(console.messages().len(), 1);
}

#[test]
fn cancelled_search_is_silent() {
    let host = Arc::new(chest_per_chunk(1));
    let console = Arc::new(RecordingInitiator::console());
    let (ctx, executor) = context(&host, &console);
    let _lane = executor.spawn();

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    let mut search = Search::new(
        diamonds(),
        vec![chunks(ChunkCoord::new(0, 0), 1, false)],
        Some(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })),
        settings(100, 1),
    )
    .expect("valid");

    let cancel = CancelToken::new();
    assert_eq!(search.cycle(&ctx, &cancel), Cycle::Continue);
    cancel.cancel();
    assert_eq!(search.cycle(&ctx, &cancel), Cycle::Cancelled);
    assert_eq!(search.polls(), 1);
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert!(console.messages().is_empty());
}

#[test]
fn scheduled_search_can_be_cancelled() {
    let host = setup();
    let host = Arc::new(host);
    let console = Arc::new(RecordingInitiator::console());
    let (ctx, _executor) = context(&host, &console);
    // nothing generated, so no hand-off is ever needed
    let slow = SearchSettings { results_max: 10, polls_per_cycle: 1, cycle_interval_ms: 20 };
    let search = Search::new(diamonds(), vec![chunks(ChunkCoord::new(0, 0), 10, false)], None, slow).expect("valid");

    let handle = schedule(search, ctx, CancelToken::new());
    handle.cancel();
    assert!(handle.join().is_none());
    assert!(console.messages().is_empty());
}

#[test]
fn progress_reaches_interactive_initiators_only() {
    let host = Arc::new(setup());
    let player = Arc::new(RecordingInitiator::player(
        "alex",
        Location { world: "world".into(), chunk: ChunkCoord::new(0, 0) },
    ));
    let console = Arc::new(RecordingInitiator::console());

    for initiator in [&player, &console] {
        let search =
            Search::new(diamonds(), vec![chunks(ChunkCoord::new(0, 0), 2, false)], None, settings(100, 1)).expect("valid");
        run(search, &host, initiator).expect("completed");
    }

    assert_eq!(
        player.messages(),
        vec![
            "Searching: 04.0% complete, 0 matches so far.".to_string(),
            "Searching: 44.0% complete, 0 matches so far.".to_string(),
            "Searching: 84.0% complete, 0 matches so far.".to_string(),
            NO_MATCHES.to_string(),
        ]
    );
    assert_eq!(console.messages(), vec![NO_MATCHES.to_string()]);
}

#[test]
fn interactive_results_are_rich() {
    let host = setup();
    host.add_container(chest(1, 64, 2, vec![stack("diamond", 1)]));
    let host = Arc::new(host);
    let player = Arc::new(RecordingInitiator::player(
        "alex",
        Location { world: "world".into(), chunk: ChunkCoord::new(0, 0) },
    ));

    let search =
        Search::new(diamonds(), vec![chunks(ChunkCoord::new(0, 0), 0, false)], None, settings(100, 10)).expect("valid");
    run(search, &host, &player).expect("completed");

    assert!(player.messages().is_empty());
    let rich = player.rich_messages();
    assert_eq!(rich.len(), 1);
    assert_eq!(rich[0].text, format!("{PREFIX} "));
    assert_eq!(rich[0].extra.len(), 1);
    assert_eq!(rich[0].extra[0].text, "CHEST");
    let click = rich[0].extra[0].click.as_ref().expect("teleport");
    assert_eq!(click.value, "/execute in world minecraft:tp 1 65 2");
    assert!(rich[0].to_json().contains("\"clickEvent\""));
    assert_eq!(rich[0].plain_text(), format!("{PREFIX} /execute in world minecraft:tp 1 65 2"));
}

#[test]
fn failed_hand_off_contributes_nothing() {
    let host = Arc::new(chest_per_chunk(0));
    let console = Arc::new(RecordingInitiator::console());
    let (ctx, executor) = context(&host, &console);
    drop(executor);

    let mut search =
        Search::new(diamonds(), vec![chunks(ChunkCoord::new(0, 0), 0, false)], None, settings(100, 1)).expect("valid");
    assert_eq!(search.cycle(&ctx, &CancelToken::new()), Cycle::Completed);
    assert!(search.results().is_empty());
    assert_eq!(console.messages(), vec![NO_MATCHES.to_string()]);
}

#[test]
fn failed_hand_off_releases_loaded_chunks() {
    let host = setup().with_async_loading(true);
    host.add_chunk("world", ChunkCoord::new(0, 0), false);
    host.add_container(chest(1, 64, 2, vec![stack("diamond", 1)]));
    let host = Arc::new(host);
    let console = Arc::new(RecordingInitiator::console());
    let (ctx, executor) = context(&host, &console);
    drop(executor);

    let mut search =
        Search::new(diamonds(), vec![chunks(ChunkCoord::new(0, 0), 0, true)], None, settings(100, 10)).expect("valid");
    assert_eq!(search.cycle(&ctx, &CancelToken::new()), Cycle::Completed);

    assert_eq!(host.loads(), 1);
    assert_eq!(host.releases(), 1);
    assert!(!host.is_chunk_loaded("world", ChunkCoord::new(0, 0)));
}

#[test]
fn abandoning_only_releases_what_the_bucket_loaded() {
    let host = setup();
    for (x, loaded) in [(0, true), (1, true), (2, false)] {
        host.add_chunk("world", ChunkCoord::new(x, 0), loaded);
    }
    let target = |x, materialized, release| {
        Matchable::Chunk(ChunkTarget { world: "world".into(), chunk: ChunkCoord::new(x, 0), materialized, release })
    };

    // already loaded by someone else, and a deferred load that never happened
    target(0, true, false).abandon(&host);
    target(2, false, true).abandon(&host);
    Matchable::Nothing.abandon(&host);
    assert_eq!(host.releases(), 0);

    target(1, true, true).abandon(&host);
    assert_eq!(host.releases(), 1);
    assert!(!host.is_chunk_loaded("world", ChunkCoord::new(1, 0)));
    assert!(host.is_chunk_loaded("world", ChunkCoord::new(0, 0)));
}

#[test]
fn lane_survives_a_panicking_job() {
    let (handle, executor) = lane();
    let _lane = executor.spawn();
    let err = handle.call(|| -> i32 { panic!("boom") }).unwrap_err();
    assert!(matches!(&err, SearchError::Handoff(message) if message.contains("boom")));
    assert_eq!(handle.call(|| 7).expect("lane alive"), 7);
}

#[test]
fn construction_checks() {
    let host = setup();
    let err = Search::new(Matcher::default(), vec![players(&host)], None, settings(10, 1)).unwrap_err();
    assert!(matches!(err, SearchError::EmptyMatcher));
    let err = Search::new(diamonds(), vec![], None, settings(10, 1)).unwrap_err();
    assert!(matches!(err, SearchError::NoBuckets));

    let search = Search::new(
        diamonds(),
        vec![chunks(ChunkCoord::new(0, 0), 1, false), chunks(ChunkCoord::new(0, 0), 1, false), players(&host)],
        None,
        settings(10, 1),
    )
    .expect("valid");
    assert_eq!(search.buckets().len(), 2);
    assert_eq!(search.total_work(), 10);
}
