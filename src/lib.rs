//! invsearch – incremental item search across player and chunk inventories.
//!
//! An operator describes what to look for with a handful of bracketed tokens:
//!
//! ```text
//! search player{offline:true} chunk{r:3} type:diamond_sword enchant{t:sharpness,l:3}
//! ```
//!
//! Tokens name *where* to look (buckets such as players or chunk rings) and *what* to
//! look for (item and metadata predicates). The resulting [`search::Search`] is driven
//! in small cycles from a worker thread, so a host with a single authoritative thread
//! never stalls: each cycle draws a bounded batch of matchables, evaluates it on the
//! host's lane and reports progress until the buckets run dry or enough results were
//! found.
//!
//! ## Modules
//! * [`token`] – The token mini-language: parsing, validation and canonical form.
//! * [`option`] – Registries of completable options turning tokens into buckets and predicates.
//! * [`complete`] – Tab completion helpers shared by the options.
//! * [`matcher`] – Item and metadata predicates and their conjunction.
//! * [`item`] – Host neutral item model and the host's catalog.
//! * [`bucket`] / [`matchable`] – Lazy scan targets and their evaluation.
//! * [`search`] – The cycle state machine, result set and rendering.
//! * [`interface`] – Worker threads, the authoritative lane hand-off and cancellation.
//! * [`command`] – The command entry point owning the active search registry.
//! * [`host`] – Traits the embedding host implements.
//! * [`message`] – Chat components, result parts and localized messages.
//! * [`memory`] – In-memory host and initiator.
//! * [`config`] – Settings loaded from file and environment.
//!
//! ## Quick Start
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use invsearch::command::{CommandOutcome, SearchCommand};
//! use invsearch::config::SearchSettings;
//! use invsearch::host::{BlockPos, Container};
//! use invsearch::interface::lane;
//! use invsearch::item::{Catalog, ItemStack, Material};
//! use invsearch::memory::{MemoryHost, RecordingInitiator};
//! use invsearch::message::DefaultMessages;
//!
//! let host = MemoryHost::new(Catalog::new(["chest", "diamond"], ["sharpness"]));
//! host.add_container(Container {
//!     material: Material::new("chest"),
//!     world: "world".into(),
//!     pos: BlockPos::new(1, 64, 2),
//!     contents: vec![Some(ItemStack::new(Material::new("diamond"), 3))],
//! });
//! let (handle, executor) = lane();
//! let command = SearchCommand::new(Arc::new(host), handle, Arc::new(DefaultMessages), SearchSettings::default());
//! let console = Arc::new(RecordingInitiator::console());
//!
//! let CommandOutcome::Started(search) = command.execute(console.clone(), &["chunk{w:world,x:0,z:0,r:0}", "type:diamond"]) else {
//!     panic!("search did not start");
//! };
//! executor.run_until(Duration::from_millis(5), || search.is_finished());
//! let summary = search.join().unwrap();
//! assert_eq!(summary.matches.len(), 1);
//! ```

pub mod bucket;
pub mod command;
pub mod complete;
pub mod config;
pub mod error;
pub mod host;
pub mod interface;
pub mod item;
pub mod matchable;
pub mod matcher;
pub mod memory;
pub mod message;
pub mod option;
pub mod search;
pub mod token;

pub use error::{Result, SearchError};
