use std::sync::Arc;
use std::time::Duration;

use invsearch::command::{CommandOutcome, SearchCommand};
use invsearch::config::SearchSettings;
use invsearch::host::{BlockPos, ChunkCoord, Container, Initiator, Location};
use invsearch::interface::{LaneExecutor, lane};
use invsearch::item::{Catalog, ItemStack, Material};
use invsearch::memory::{MemoryHost, RecordingInitiator};
use invsearch::message::{DefaultMessages, MessageCatalog, MessageKey};

fn setup(settings: SearchSettings) -> (SearchCommand, LaneExecutor) {
    let host = MemoryHost::new(Catalog::new(["chest", "stone", "diamond"], ["sharpness"]));
    host.add_container(Container {
        material: Material::new("chest"),
        world: "world".into(),
        pos: BlockPos::new(1, 64, 2),
        contents: vec![Some(ItemStack::new(Material::new("diamond"), 5))],
    });
    let (handle, executor) = lane();
    (SearchCommand::new(Arc::new(host), handle, Arc::new(DefaultMessages), settings), executor)
}

fn fast() -> SearchSettings {
    SearchSettings { results_max: 10, polls_per_cycle: 10, cycle_interval_ms: 1 }
}

fn rejection(outcome: CommandOutcome) -> MessageKey {
    match outcome {
        CommandOutcome::Rejected(key) => key,
        other => panic!("expected a rejection, got {other:?}"),
    }
}

#[test]
fn too_few_arguments_is_usage() {
    let (command, _executor) = setup(fast());
    let console = Arc::new(RecordingInitiator::console());
    let outcome = command.execute(console.clone(), &["type:diamond"]);
    assert!(matches!(outcome, CommandOutcome::Usage));
    assert!(!outcome.handled());
    assert!(console.messages().is_empty());
}

#[test]
fn rejections_are_reported() {
    let (command, _executor) = setup(fast());
    let console = Arc::new(RecordingInitiator::console());
    let cases: [(&[&str], MessageKey); 6] = [
        (&["chunk{w:wor(ld,x:0,z:0}", "type:diamond"], MessageKey::ErrorInvalidToken),
        (&["chunk{w:world,x:2147483647,z:0,r:1}", "type:diamond"], MessageKey::ErrorInvalidInventory),
        (&["type:diamond", "amount:2"], MessageKey::ErrorInvalidInventory),
        (&["chunk{w:nowhere,x:0,z:0}", "type:diamond"], MessageKey::ErrorInvalidInventory),
        (&["player", "type:bedrock"], MessageKey::ErrorInvalidMatcher),
        (&["player", "chunk{w:world,x:0,z:0}"], MessageKey::ErrorInvalidMatcher),
    ];
    for (args, expected) in cases {
        let outcome = command.execute(console.clone(), args);
        assert!(outcome.handled());
        assert_eq!(rejection(outcome), expected, "{args:?}");
    }
    let expected: Vec<String> =
        cases.iter().map(|(_, key)| DefaultMessages.render(console.as_ref(), *key, &[])).collect();
    assert_eq!(console.messages(), expected);
    assert!(!command.is_searching(&console.id()));
}

#[test]
fn search_runs_and_clears_the_registry() {
    let (command, executor) = setup(fast());
    let console = Arc::new(RecordingInitiator::console());

    let outcome = command.execute(console.clone(), &["chunk{w:world,x:0,z:0,r:1}", "type:diamond", "type:diamond"]);
    let CommandOutcome::Started(search) = outcome else {
        panic!("search did not start");
    };
    assert!(command.is_searching("console"));
    executor.run_until(Duration::from_millis(1), || search.is_finished());
    let summary = search.join().expect("completed");

    assert_eq!(summary.matches.len(), 1);
    assert!(!command.is_searching("console"));
    assert_eq!(console.messages(), vec!["Locations of items matching parameters: minecraft:chest @ world: 1x 64y 2z"]);
}

#[test]
fn one_search_per_initiator() {
    let slow = SearchSettings { results_max: 10, polls_per_cycle: 1, cycle_interval_ms: 20 };
    let (command, _executor) = setup(slow);
    let console = Arc::new(RecordingInitiator::console());
    // chunks far away were never generated, so the lane is never needed
    let args = ["chunk{w:world,x:1000,z:1000,r:10}", "type:diamond"];

    let CommandOutcome::Started(first) = command.execute(console.clone(), &args) else {
        panic!("search did not start");
    };
    assert_eq!(rejection(command.execute(console.clone(), &args)), MessageKey::ErrorActiveSearch);

    // someone else may search meanwhile
    let player = Arc::new(RecordingInitiator::player(
        "alex",
        Location { world: "world".into(), chunk: ChunkCoord::new(1000, 1000) },
    ));
    let CommandOutcome::Started(second) = command.execute(player.clone(), &["chunk{r:10}", "type:diamond"]) else {
        panic!("second initiator could not search");
    };

    assert!(command.cancel("console"));
    assert!(!command.cancel("console"));
    assert!(!command.is_searching("console"));
    assert!(first.join().is_none());

    second.cancel();
    assert!(second.join().is_none());
    // a cancelled handle leaves the registry to the command
    assert!(command.is_searching("alex"));
    assert!(command.cancel("alex"));
}

#[test]
fn completion_uses_the_last_argument() {
    let (command, _executor) = setup(fast());
    let console = RecordingInitiator::console();
    assert_eq!(command.complete(&console, &["player", "type:st"]), vec!["type:stone"]);
    assert!(command.complete(&console, &["type:stone", "type:st"]).is_empty());
    assert!(command.complete(&console, &["type:st", "bad{k:v(}"]).is_empty());
    assert!(command.complete(&console, &[]).contains(&"amount:".to_string()));
}
