//! The `search` command: argument handling, the one-search-per-initiator registry and
//! the tab completion entry point.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::SearchSettings;
use crate::host::{Host, Initiator};
use crate::interface::{self, CancelToken, LaneHandle, SearchHandle};
use crate::matcher::Matcher;
use crate::message::{MessageCatalog, MessageKey};
use crate::option::{ParseContext, ParsedOption, SearchOptions};
use crate::search::{Callback, Search, SearchContext};
use crate::token::Token;

#[derive(Debug)]
pub enum CommandOutcome {
    /// Not enough arguments; the host should print usage.
    Usage,
    /// Refused, the initiator has already been told why.
    Rejected(MessageKey),
    Started(SearchHandle),
}

impl CommandOutcome {
    pub fn handled(&self) -> bool {
        !matches!(self, Self::Usage)
    }
}

pub struct SearchCommand {
    host: Arc<dyn Host>,
    lane: LaneHandle,
    messages: Arc<dyn MessageCatalog>,
    options: SearchOptions,
    settings: SearchSettings,
    active: Arc<Mutex<HashMap<String, CancelToken>>>,
}

impl SearchCommand {
    pub fn new(
        host: Arc<dyn Host>,
        lane: LaneHandle,
        messages: Arc<dyn MessageCatalog>,
        settings: SearchSettings,
    ) -> Self {
        Self::with_options(host, lane, messages, settings, SearchOptions::default())
    }

    pub fn with_options(
        host: Arc<dyn Host>,
        lane: LaneHandle,
        messages: Arc<dyn MessageCatalog>,
        settings: SearchSettings,
        options: SearchOptions,
    ) -> Self {
        Self { host, lane, messages, options, settings, active: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Parse the arguments and start a search. Needs at least an inventory and a matcher.
    pub fn execute(&self, initiator: Arc<dyn Initiator>, args: &[&str]) -> CommandOutcome {
        if args.len() < 2 {
            return CommandOutcome::Usage;
        }
        let id = initiator.id();
        if self.is_searching(&id) {
            return self.reject(initiator.as_ref(), MessageKey::ErrorActiveSearch);
        }

        let mut tokens: Vec<Token> = Vec::with_capacity(args.len());
        for arg in args {
            match Token::parse(arg) {
                Ok(token) if !tokens.contains(&token) => tokens.push(token),
                Ok(_) => {}
                Err(e) => {
                    debug!(initiator = %id, arg, error = %e, "invalid token");
                    return self.reject(initiator.as_ref(), MessageKey::ErrorInvalidToken);
                }
            }
        }

        let ctx = ParseContext::new(initiator.as_ref(), self.host.as_ref());
        for token in tokens.iter().filter(|token| !self.options.accepts(&ctx, token)) {
            debug!(initiator = %id, %token, "ignoring unrecognized token");
        }

        let buckets = match self.options.buckets.resolve(&ctx, &tokens) {
            Ok(buckets) if !buckets.is_empty() => buckets,
            _ => return self.reject(initiator.as_ref(), MessageKey::ErrorInvalidInventory),
        };
        let items = self.options.items.resolve(&ctx, &tokens);
        let metas = self.options.metas.resolve(&ctx, &tokens);
        let matcher = match (items, metas) {
            (Ok(items), Ok(metas)) => Matcher::new(
                items.into_iter().map(ParsedOption::into_value).collect(),
                metas.into_iter().map(ParsedOption::into_value).collect(),
            ),
            _ => return self.reject(initiator.as_ref(), MessageKey::ErrorInvalidMatcher),
        };
        if matcher.is_empty() {
            return self.reject(initiator.as_ref(), MessageKey::ErrorInvalidMatcher);
        }
        let buckets = buckets.into_iter().map(ParsedOption::into_value).collect();

        let cancel = CancelToken::new();
        let callback = self.release_on_completion(&id, &cancel);
        let search = match Search::new(matcher, buckets, Some(callback), self.settings) {
            Ok(search) => search,
            Err(e) => {
                debug!(initiator = %id, error = %e, "search rejected");
                return self.reject(initiator.as_ref(), MessageKey::ErrorInvalidMatcher);
            }
        };

        // a concurrent call may have won the race since the first check
        match self.active.lock().entry(id.clone()) {
            Entry::Occupied(_) => return self.reject(initiator.as_ref(), MessageKey::ErrorActiveSearch),
            Entry::Vacant(entry) => {
                entry.insert(cancel.clone());
            }
        }

        info!(
            initiator = %id,
            search = %search.id(),
            matcher = %search.matcher(),
            buckets = search.buckets().len(),
            work = search.total_work(),
            "search started"
        );
        let ctx = SearchContext {
            host: Arc::clone(&self.host),
            lane: self.lane.clone(),
            initiator,
            messages: Arc::clone(&self.messages),
        };
        CommandOutcome::Started(interface::schedule(search, ctx, cancel))
    }

    /// Suggestions for the last argument, given the ones before it.
    pub fn complete(&self, initiator: &dyn Initiator, args: &[&str]) -> Vec<String> {
        let (partial, prior) = match args.split_last() {
            Some((partial, prior)) => (*partial, prior),
            None => ("", args),
        };
        let Ok(partial) = Token::parse(partial) else {
            return Vec::new();
        };
        let prior: Vec<Token> = prior.iter().filter_map(|arg| Token::parse(arg).ok()).collect();
        let ctx = ParseContext::new(initiator, self.host.as_ref());
        self.options.complete(&ctx, &prior, &partial)
    }

    /// Cancel the initiator's search. Returns false when none was running.
    pub fn cancel(&self, initiator_id: &str) -> bool {
        match self.active.lock().remove(initiator_id) {
            Some(cancel) => {
                cancel.cancel();
                info!(initiator = initiator_id, "search cancel requested");
                true
            }
            None => false,
        }
    }

    pub fn is_searching(&self, initiator_id: &str) -> bool {
        self.active.lock().contains_key(initiator_id)
    }

    // removes only the entry this search registered
    fn release_on_completion(&self, id: &str, cancel: &CancelToken) -> Callback {
        let active = Arc::clone(&self.active);
        let id = id.to_string();
        let cancel = cancel.clone();
        Box::new(move || {
            if let Entry::Occupied(entry) = active.lock().entry(id) {
                if entry.get().same_as(&cancel) {
                    entry.remove();
                }
            }
        })
    }

    fn reject(&self, initiator: &dyn Initiator, key: MessageKey) -> CommandOutcome {
        initiator.send_message(&self.messages.render(initiator, key, &[]));
        CommandOutcome::Rejected(key)
    }
}
