//! The incremental search state machine.
//!
//! A [`Search`] owns a matcher and an ordered list of buckets. Each call to
//! [`Search::cycle`] draws a bounded batch of matchables on the calling worker thread,
//! hands the batch to the authoritative lane for evaluation, folds the results into a
//! deduplicated result set and decides whether the search is done. Rendering of
//! progress and final output happens here as well; who is allowed to search, and how
//! often, is up to the caller.

use std::collections::HashSet;
use std::fmt;
use std::hash::BuildHasherDefault;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use seahash::SeaHasher;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bucket::Bucket;
use crate::config::SearchSettings;
use crate::error::{Result, SearchError};
use crate::host::{Host, Initiator};
use crate::interface::{CancelToken, LaneHandle};
use crate::matchable::Matchable;
use crate::matcher::Matcher;
use crate::message::{Component, MatchLocation, MessageCatalog, MessageKey, MessagePart, SEPARATOR};

pub type OtherHasher = BuildHasherDefault<SeaHasher>;

/// Invoked once when a search completes on its own.
pub type Callback = Box<dyn FnOnce() + Send>;

// progress goes out on the first cycle and every tenth one after
const PROGRESS_EVERY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Running,
    Completed,
}

/// What the caller should do after a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    Continue,
    Completed,
    Cancelled,
}

/// Everything a cycle talks to.
#[derive(Clone)]
pub struct SearchContext {
    pub host: Arc<dyn Host>,
    pub lane: LaneHandle,
    pub initiator: Arc<dyn Initiator>,
    pub messages: Arc<dyn MessageCatalog>,
}

/// Insertion ordered set of result parts, deduplicated by location.
#[derive(Debug, Default)]
pub struct ResultSet {
    parts: Vec<MessagePart>,
    seen: HashSet<MatchLocation, OtherHasher>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }
    /// Returns false for a location already present.
    pub fn insert(&mut self, part: MessagePart) -> bool {
        if !self.seen.insert(part.location().clone()) {
            return false;
        }
        self.parts.push(part);
        true
    }
    pub fn len(&self) -> usize {
        self.parts.len()
    }
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
    pub fn parts(&self) -> &[MessagePart] {
        &self.parts
    }
}

/// Final numbers of a completed search.
#[derive(Debug, Clone)]
pub struct SearchSummary {
    pub id: Uuid,
    /// At most `results_max` parts, in discovery order.
    pub matches: Vec<MessagePart>,
    pub polls: usize,
    pub cycles: usize,
    pub total_work: usize,
}

pub struct Search {
    id: Uuid,
    matcher: Arc<Matcher>,
    buckets: Vec<Box<dyn Bucket>>,
    current: usize,
    results: ResultSet,
    polls: usize,
    cycles: usize,
    total_work: usize,
    settings: SearchSettings,
    callback: Option<Callback>,
    state: SearchState,
}

impl fmt::Debug for Search {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Search")
            .field("id", &self.id)
            .field("matcher", &self.matcher)
            .field("buckets", &self.buckets)
            .field("results", &self.results.len())
            .field("polls", &self.polls)
            .field("state", &self.state)
            .finish()
    }
}

impl Search {
    pub fn new(
        matcher: Matcher,
        buckets: Vec<Box<dyn Bucket>>,
        callback: Option<Callback>,
        settings: SearchSettings,
    ) -> Result<Self> {
        if matcher.is_empty() {
            return Err(SearchError::EmptyMatcher);
        }
        let mut described: HashSet<String, OtherHasher> = HashSet::default();
        let buckets: Vec<Box<dyn Bucket>> =
            buckets.into_iter().filter(|bucket| described.insert(bucket.describe())).collect();
        if buckets.is_empty() {
            return Err(SearchError::NoBuckets);
        }
        let total_work = buckets.iter().map(|bucket| bucket.size()).sum::<usize>().max(1);

        Ok(Self {
            id: Uuid::new_v4(),
            matcher: Arc::new(matcher),
            buckets,
            current: 0,
            results: ResultSet::new(),
            polls: 0,
            cycles: 0,
            total_work,
            settings,
            callback,
            state: SearchState::Running,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn state(&self) -> SearchState {
        self.state
    }
    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }
    pub fn buckets(&self) -> &[Box<dyn Bucket>] {
        &self.buckets
    }
    pub fn results(&self) -> &ResultSet {
        &self.results
    }
    pub fn polls(&self) -> usize {
        self.polls
    }
    pub fn cycles(&self) -> usize {
        self.cycles
    }
    pub fn total_work(&self) -> usize {
        self.total_work
    }

    /// Whether any bucket still has matchables left.
    pub fn has_next(&self) -> bool {
        self.buckets.iter().skip(self.current).any(|bucket| bucket.has_next())
    }

    /// Percentage of estimated work done, capped at 100.
    pub fn progress(&self) -> f64 {
        100.0 * self.polls.min(self.total_work) as f64 / self.total_work as f64
    }

    /// Run one cycle: draw, hand off, accumulate, then report or finish.
    pub fn cycle(&mut self, ctx: &SearchContext, cancel: &CancelToken) -> Cycle {
        if cancel.is_cancelled() {
            return Cycle::Cancelled;
        }
        if self.state == SearchState::Completed {
            return Cycle::Completed;
        }
        self.cycles += 1;

        let batch = Arc::new(self.draw(ctx.host.as_ref()));
        if !batch.is_empty() {
            // matchables the lane got through, the rest still hold what their bucket acquired
            let evaluated = Arc::new(AtomicUsize::new(0));
            let job = {
                let batch = Arc::clone(&batch);
                let evaluated = Arc::clone(&evaluated);
                let host = Arc::clone(&ctx.host);
                let matcher = Arc::clone(&self.matcher);
                move || {
                    batch
                        .iter()
                        .map(|matchable| {
                            let result = matchable.evaluate(host.as_ref(), &matcher);
                            evaluated.fetch_add(1, Ordering::SeqCst);
                            result
                        })
                        .collect::<Vec<_>>()
                }
            };
            match ctx.lane.call(job) {
                Ok(results) => {
                    for part in results.into_iter().flat_map(|result| result.into_parts()) {
                        self.results.insert(part);
                    }
                }
                Err(e) => {
                    let done = evaluated.load(Ordering::SeqCst).min(batch.len());
                    warn!(
                        search = %self.id,
                        drawn = batch.len(),
                        done,
                        error = %e,
                        "hand-off failed, no matches this cycle"
                    );
                    for matchable in &batch[done..] {
                        matchable.abandon(ctx.host.as_ref());
                    }
                }
            }
        }

        if cancel.is_cancelled() {
            return Cycle::Cancelled;
        }

        if self.results.len() < self.settings.results_max && self.has_next() {
            debug!(search = %self.id, cycle = self.cycles, polls = self.polls, matches = self.results.len(), "cycle done");
            if self.cycles % PROGRESS_EVERY == 1 {
                self.report_progress(ctx);
            }
            return Cycle::Continue;
        }

        self.finish(ctx);
        Cycle::Completed
    }

    // Up to `polls_per_cycle` draws. Short circuited targets count as draws but are not
    // worth a trip to the lane.
    fn draw(&mut self, host: &dyn Host) -> Vec<Matchable> {
        let mut batch = Vec::with_capacity(self.settings.polls_per_cycle);
        let mut draws = 0;
        while draws < self.settings.polls_per_cycle {
            let Some(bucket) = self.buckets.get_mut(self.current) else {
                break;
            };
            if !bucket.has_next() {
                self.current += 1;
                continue;
            }
            draws += 1;
            self.polls += 1;
            match bucket.next(host) {
                Some(Matchable::Nothing) | None => {}
                Some(matchable) => batch.push(matchable),
            }
        }
        batch
    }

    fn report_progress(&self, ctx: &SearchContext) {
        let initiator = ctx.initiator.as_ref();
        if !initiator.is_interactive() {
            return;
        }
        let progress = format!("{:04.1}", self.progress());
        let matches = self.results.len().to_string();
        let text = ctx.messages.render(
            initiator,
            MessageKey::SearchProgress,
            &[("%progress%", progress.as_str()), ("%matches%", matches.as_str())],
        );
        initiator.send_message(&text);
    }

    fn finish(&mut self, ctx: &SearchContext) {
        self.state = SearchState::Completed;
        let initiator = ctx.initiator.as_ref();
        if self.results.is_empty() {
            initiator.send_message(&ctx.messages.render(initiator, MessageKey::SearchNoMatches, &[]));
        } else {
            let prefix = ctx.messages.render(initiator, MessageKey::SearchMatches, &[]);
            render_results(initiator, &prefix, self.shown());
        }
        info!(
            search = %self.id,
            matches = self.results.len(),
            polls = self.polls,
            cycles = self.cycles,
            "search complete"
        );
        if let Some(callback) = self.callback.take() {
            callback();
        }
    }

    fn shown(&self) -> &[MessagePart] {
        let parts = self.results.parts();
        &parts[..parts.len().min(self.settings.results_max)]
    }

    pub fn summary(&self) -> SearchSummary {
        SearchSummary {
            id: self.id,
            matches: self.shown().to_vec(),
            polls: self.polls,
            cycles: self.cycles,
            total_work: self.total_work,
        }
    }
}

fn render_results(initiator: &dyn Initiator, prefix: &str, parts: &[MessagePart]) {
    if initiator.is_interactive() {
        let mut message = Component::text(format!("{prefix} "));
        for (index, part) in parts.iter().enumerate() {
            if index > 0 {
                message.push(Component::text(SEPARATOR));
            }
            message.push(part.rich().clone());
        }
        initiator.send_rich(&message);
    } else {
        let plain: Vec<&str> = parts.iter().map(MessagePart::plain).collect();
        initiator.send_message(&format!("{prefix} {}", plain.join(SEPARATOR)));
    }
}
