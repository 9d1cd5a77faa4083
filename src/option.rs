//! Completable options: the registry that turns [`Token`]s into typed search parts.
//!
//! Each option is a strategy entry with a name, an acceptance check, a parser, a
//! merge rule and a suggester. Options are grouped into three independent
//! registries, one per target category:
//! * buckets (`chunk`, `player`) produce [`Bucket`]s,
//! * item options (`type`, `amount`) produce [`ItemPredicate`]s,
//! * meta options (`enchant`) produce [`MetaPredicate`]s.
//!
//! A parse failure anywhere rejects the whole command. Options that may appear only
//! once are merged when repeated, see [`CompletableOption::merge`].

use std::collections::BTreeSet;

use tracing::debug;

use crate::bucket::{Bucket, ChunkBucket, MAX_CHUNK_RADIUS, PlayerBucket, PlayerScope};
use crate::complete::{complete_bool, complete_integer, complete_keyed, starts_with_ignore_case};
use crate::error::{Result, SearchError};
use crate::host::{Capability, ChunkCoord, Host, Initiator};
use crate::matcher::{ItemPredicate, MetaPredicate};
use crate::token::Token;

const DEFAULT_CHUNK_RADIUS: i32 = 5;

/// Who is parsing and against which host.
#[derive(Clone, Copy)]
pub struct ParseContext<'a> {
    pub initiator: &'a dyn Initiator,
    pub host: &'a dyn Host,
}

impl<'a> ParseContext<'a> {
    pub fn new(initiator: &'a dyn Initiator, host: &'a dyn Host) -> Self {
        Self { initiator, host }
    }
}

/// A token together with the value an option parsed from it.
#[derive(Debug)]
pub struct ParsedOption<T> {
    name: &'static str,
    token: Token,
    value: T,
}

impl<T> ParsedOption<T> {
    pub fn new(name: &'static str, token: Token, value: T) -> Self {
        Self { name, token, value }
    }
    pub fn name(&self) -> &'static str {
        self.name
    }
    pub fn token(&self) -> &Token {
        &self.token
    }
    pub fn value(&self) -> &T {
        &self.value
    }
    pub fn into_value(self) -> T {
        self.value
    }
}

pub trait CompletableOption: Send + Sync {
    type Output;

    /// Unique identifier; also the identifier prefix the option answers to.
    fn name(&self) -> &'static str;

    fn accepts(&self, _ctx: &ParseContext<'_>, token: &Token) -> bool {
        token.identifier().to_lowercase().starts_with(self.name())
    }

    fn parse(&self, ctx: &ParseContext<'_>, token: &Token) -> Result<Self::Output>;

    /// Full replacement strings for a token being typed.
    fn suggest(&self, ctx: &ParseContext<'_>, token: &Token) -> Vec<String>;

    /// Whether at most one instance survives per search.
    fn is_unique(&self) -> bool;

    /// Whether a later token should be merged into an earlier one of the same option.
    fn merges_with(&self, _first: &Token, _second: &Token) -> bool {
        self.is_unique()
    }

    /// Combine two tokens: the mappings of `first` overwritten by those of `second`,
    /// parsed under the first identifier, then under the second.
    fn merge(&self, ctx: &ParseContext<'_>, first: &Token, second: &Token) -> Result<ParsedOption<Self::Output>> {
        let mut merged = Token::new(first.identifier());
        for (key, value) in first.mappings().chain(second.mappings()) {
            merged.put(key, value)?;
        }
        if let Ok(value) = self.parse(ctx, &merged) {
            return Ok(ParsedOption::new(self.name(), merged, value));
        }
        let retry = Token::with_mappings(second.identifier(), merged.mappings())?;
        match self.parse(ctx, &retry) {
            Ok(value) => Ok(ParsedOption::new(self.name(), retry, value)),
            Err(_) => Err(SearchError::Merge {
                option: self.name(),
                first: first.to_string(),
                second: second.to_string(),
            }),
        }
    }
}

pub struct OptionRegistry<T> {
    options: Vec<Box<dyn CompletableOption<Output = T>>>,
}

impl<T> Default for OptionRegistry<T> {
    fn default() -> Self {
        Self { options: Vec::new() }
    }
}

impl<T> OptionRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, option: impl CompletableOption<Output = T> + 'static) -> Self {
        self.options.push(Box::new(option));
        self
    }

    pub fn accepts(&self, ctx: &ParseContext<'_>, token: &Token) -> bool {
        self.options.iter().any(|option| option.accepts(ctx, token))
    }

    /// Parse every token some option accepts. Tokens no option accepts are skipped.
    pub fn resolve(&self, ctx: &ParseContext<'_>, tokens: &[Token]) -> Result<Vec<ParsedOption<T>>> {
        let mut parsed: Vec<ParsedOption<T>> = Vec::new();
        for token in tokens {
            for option in self.options.iter().filter(|option| option.accepts(ctx, token)) {
                let value = option.parse(ctx, token).inspect_err(|e| {
                    debug!(option = option.name(), %token, error = %e, "option rejected token");
                })?;
                let mut current = ParsedOption::new(option.name(), token.clone(), value);

                let mut index = 0;
                while index < parsed.len() {
                    let earlier = &parsed[index];
                    if earlier.name == option.name() && option.merges_with(&earlier.token, &current.token) {
                        let previous = parsed.remove(index);
                        current = option.merge(ctx, &previous.token, &current.token)?;
                    } else {
                        index += 1;
                    }
                }
                parsed.push(current);
            }
        }
        Ok(parsed)
    }

    /// Suggestions of every option, skipping unique options a prior token satisfies.
    pub fn suggest(&self, ctx: &ParseContext<'_>, prior: &[Token], partial: &Token) -> BTreeSet<String> {
        self.options
            .iter()
            .filter(|option| !(option.is_unique() && prior.iter().any(|token| option.accepts(ctx, token))))
            .flat_map(|option| option.suggest(ctx, partial))
            .collect()
    }
}

/// The three registries the search command consults.
pub struct SearchOptions {
    pub buckets: OptionRegistry<Box<dyn Bucket>>,
    pub items: OptionRegistry<ItemPredicate>,
    pub metas: OptionRegistry<MetaPredicate>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            buckets: OptionRegistry::new().register(ChunkOption).register(PlayerOption),
            items: OptionRegistry::new().register(TypeOption).register(AmountOption),
            metas: OptionRegistry::new().register(EnchantOption),
        }
    }
}

impl SearchOptions {
    /// Whether any registry has a use for the token.
    pub fn accepts(&self, ctx: &ParseContext<'_>, token: &Token) -> bool {
        self.buckets.accepts(ctx, token) || self.items.accepts(ctx, token) || self.metas.accepts(ctx, token)
    }

    pub fn complete(&self, ctx: &ParseContext<'_>, prior: &[Token], partial: &Token) -> Vec<String> {
        let mut suggestions = self.buckets.suggest(ctx, prior, partial);
        suggestions.extend(self.items.suggest(ctx, prior, partial));
        suggestions.extend(self.metas.suggest(ctx, prior, partial));
        suggestions.into_iter().collect()
    }
}

fn parse_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

fn is_named(token: &Token, name: &str) -> bool {
    token.identifier().eq_ignore_ascii_case(name)
}

// `name:value` parses the same as the canonical `name{name:value}` and reads better in chat
fn short_form(name: &str, value: &str) -> String {
    format!("{name}:{value}")
}

// Suggestion for a single valued option while its identifier is still being typed.
fn suggest_unformed(name: &str, token: &Token) -> Vec<String> {
    if starts_with_ignore_case(name, token.identifier()) {
        vec![format!("{name}:")]
    } else {
        Vec::new()
    }
}

// ------------- chunk -------------
pub struct ChunkOption;

impl CompletableOption for ChunkOption {
    type Output = Box<dyn Bucket>;

    fn name(&self) -> &'static str {
        "chunk"
    }

    fn accepts(&self, ctx: &ParseContext<'_>, token: &Token) -> bool {
        token.identifier().to_lowercase().starts_with(self.name())
            && ctx.initiator.has_capability(Capability::SearchChunksLoaded)
    }

    fn parse(&self, ctx: &ParseContext<'_>, token: &Token) -> Result<Box<dyn Bucket>> {
        let (mut world, mut x, mut z) = match ctx.initiator.location() {
            Some(location) => (Some(location.world), Some(location.chunk.x), Some(location.chunk.z)),
            None if token.len() < 3 => {
                return Err(SearchError::parse(self.name(), "world, x and z are required without a location"));
            }
            None => (None, None, None),
        };
        let mut radius = DEFAULT_CHUNK_RADIUS;
        let mut load = false;
        let worlds = ctx.host.worlds();

        // "world" contains an r and an l, so radius and load are checked last
        for (key, value) in token.mappings() {
            let key = key.to_lowercase();
            if key.contains('w') {
                world = worlds.iter().find(|known| known.eq_ignore_ascii_case(value)).cloned();
            } else if key.contains('x') {
                x = value.parse().ok();
            } else if key.contains('z') {
                z = value.parse().ok();
            } else if key.contains('r') {
                // an unreadable radius keeps the default
                if let Ok(parsed) = value.parse() {
                    radius = parsed;
                }
            } else if key.contains('l') {
                load = ctx.initiator.has_capability(Capability::SearchChunksUnloaded) && parse_bool(value);
            }
        }

        let world = world.ok_or_else(|| SearchError::parse(self.name(), "unknown or missing world"))?;
        let x = x.ok_or_else(|| SearchError::parse(self.name(), "invalid or missing x"))?;
        let z = z.ok_or_else(|| SearchError::parse(self.name(), "invalid or missing z"))?;
        let radius = u32::try_from(radius).map_err(|_| SearchError::parse(self.name(), "negative radius"))?;
        if radius > MAX_CHUNK_RADIUS {
            return Err(SearchError::parse(self.name(), format!("radius above {MAX_CHUNK_RADIUS}")));
        }
        let reach = radius as i32;
        let in_range = |coord: i32| coord.checked_add(reach).is_some() && coord.checked_sub(reach).is_some();
        if !in_range(x) || !in_range(z) {
            return Err(SearchError::parse(self.name(), "area leaves the coordinate range"));
        }

        Ok(Box::new(ChunkBucket::new(world, ChunkCoord::new(x, z), radius, load)))
    }

    fn suggest(&self, ctx: &ParseContext<'_>, token: &Token) -> Vec<String> {
        if !ctx.initiator.has_capability(Capability::SearchChunksLoaded) {
            return Vec::new();
        }
        let here = ctx.initiator.location().and_then(|location| {
            Token::with_mappings(
                self.name(),
                [
                    ("w", location.world),
                    ("x", location.chunk.x.to_string()),
                    ("z", location.chunk.z.to_string()),
                    ("r", DEFAULT_CHUNK_RADIUS.to_string()),
                ],
            )
            .ok()
        });

        if !is_named(token, self.name()) {
            if !starts_with_ignore_case(self.name(), token.identifier()) {
                return Vec::new();
            }
            let mut suggestions = vec![Token::new(self.name()).to_string()];
            suggestions.extend(here.map(|token| token.to_string()));
            return suggestions;
        }

        let world_key = token.keys().find(|key| key.to_lowercase().contains('w')).unwrap_or("w").to_string();
        let partial = token.get(&world_key).unwrap_or("");
        let worlds = ctx.host.worlds();
        let mut suggestions: Vec<String> = complete_keyed(partial, worlds.iter().map(String::as_str))
            .into_iter()
            .filter_map(|world| {
                let mut suggestion = Token::with_mappings(self.name(), token.mappings()).ok()?;
                suggestion.put(world_key.as_str(), world).ok()?;
                Some(suggestion.to_string())
            })
            .collect();
        if token.is_empty() {
            suggestions.extend(here.map(|token| token.to_string()));
        }
        suggestions
    }

    fn is_unique(&self) -> bool {
        false
    }
}

// ------------- player -------------
pub struct PlayerOption;

impl CompletableOption for PlayerOption {
    type Output = Box<dyn Bucket>;

    fn name(&self) -> &'static str {
        "player"
    }

    fn accepts(&self, ctx: &ParseContext<'_>, token: &Token) -> bool {
        token.identifier().to_lowercase().starts_with(self.name())
            && ctx.initiator.has_capability(Capability::SearchPlayersOnline)
    }

    fn parse(&self, ctx: &ParseContext<'_>, token: &Token) -> Result<Box<dyn Bucket>> {
        let offline = token
            .mappings()
            .find(|(key, _)| key.to_lowercase().contains("offline"))
            .is_some_and(|(_, value)| parse_bool(value));
        let scope = if offline && ctx.initiator.has_capability(Capability::SearchPlayersOffline) {
            PlayerScope::Known
        } else {
            PlayerScope::Online
        };
        Ok(Box::new(PlayerBucket::new(ctx.host, scope)))
    }

    fn suggest(&self, ctx: &ParseContext<'_>, token: &Token) -> Vec<String> {
        if !ctx.initiator.has_capability(Capability::SearchPlayersOnline) {
            return Vec::new();
        }
        let offline = ctx.initiator.has_capability(Capability::SearchPlayersOffline);

        if !is_named(token, self.name()) {
            if !starts_with_ignore_case(self.name(), token.identifier()) {
                return Vec::new();
            }
            let mut suggestions = vec![Token::new(self.name()).to_string()];
            if offline {
                suggestions.push(format!("{}{{offline:true}}", self.name()));
            }
            return suggestions;
        }

        if !offline {
            return vec![Token::new(self.name()).to_string()];
        }
        let partial = token.get("offline").unwrap_or("");
        complete_bool(partial)
            .into_iter()
            .map(|value| format!("{}{{offline:{value}}}", self.name()))
            .collect()
    }

    fn is_unique(&self) -> bool {
        true
    }
}

// ------------- type -------------
pub struct TypeOption;

impl CompletableOption for TypeOption {
    type Output = ItemPredicate;

    fn name(&self) -> &'static str {
        "type"
    }

    fn parse(&self, ctx: &ParseContext<'_>, token: &Token) -> Result<ItemPredicate> {
        let name = token.first_value().ok_or_else(|| SearchError::parse(self.name(), "missing material"))?;
        let material = ctx
            .host
            .catalog()
            .material(name)
            .ok_or_else(|| SearchError::parse(self.name(), format!("unknown material {name}")))?;
        Ok(ItemPredicate::is_type(material))
    }

    fn suggest(&self, ctx: &ParseContext<'_>, token: &Token) -> Vec<String> {
        if !is_named(token, self.name()) {
            return suggest_unformed(self.name(), token);
        }
        let partial = token.first_value().unwrap_or("");
        complete_keyed(partial, ctx.host.catalog().materials().map(|material| material.key()))
            .iter()
            .map(|material| short_form(self.name(), material))
            .collect()
    }

    fn is_unique(&self) -> bool {
        true
    }
}

// ------------- amount -------------
pub struct AmountOption;

impl CompletableOption for AmountOption {
    type Output = ItemPredicate;

    fn name(&self) -> &'static str {
        "amount"
    }

    fn parse(&self, _ctx: &ParseContext<'_>, token: &Token) -> Result<ItemPredicate> {
        let amount = token.first_value().ok_or_else(|| SearchError::parse(self.name(), "missing amount"))?;
        let amount = amount
            .parse()
            .map_err(|_| SearchError::parse(self.name(), format!("{amount} is not a number")))?;
        Ok(ItemPredicate::has_amount(amount))
    }

    fn suggest(&self, _ctx: &ParseContext<'_>, token: &Token) -> Vec<String> {
        if !is_named(token, self.name()) {
            return suggest_unformed(self.name(), token);
        }
        complete_integer(token.first_value().unwrap_or(""))
            .iter()
            .map(|amount| short_form(self.name(), amount))
            .collect()
    }

    fn is_unique(&self) -> bool {
        true
    }
}

// ------------- enchant -------------
pub struct EnchantOption;

// (level, type) classes of a key, e.g. "lvl" is a level and "type" is an enchantment
fn enchant_key_classes(key: &str) -> (bool, bool) {
    let key = key.to_lowercase();
    (key.contains('l'), key.contains('t'))
}

impl CompletableOption for EnchantOption {
    type Output = MetaPredicate;

    fn name(&self) -> &'static str {
        "enchant"
    }

    fn parse(&self, ctx: &ParseContext<'_>, token: &Token) -> Result<MetaPredicate> {
        let mut enchantment = None;
        let mut level = None;
        for (key, value) in token.mappings() {
            if value.trim().is_empty() {
                continue;
            }
            let (is_level, is_type) = enchant_key_classes(key);
            if is_level {
                level = Some(
                    value
                        .parse()
                        .map_err(|_| SearchError::parse(self.name(), format!("{value} is not a level")))?,
                );
            }
            if is_type {
                enchantment = Some(
                    ctx.host
                        .catalog()
                        .enchantment(value)
                        .ok_or_else(|| SearchError::parse(self.name(), format!("unknown enchantment {value}")))?,
                );
            }
        }
        Ok(MetaPredicate::has_enchant(enchantment, level))
    }

    fn suggest(&self, ctx: &ParseContext<'_>, token: &Token) -> Vec<String> {
        if !is_named(token, self.name()) {
            if !starts_with_ignore_case(self.name(), token.identifier()) {
                return Vec::new();
            }
            return [vec![], vec![("type", "")], vec![("type", ""), ("level", "")], vec![("level", "")]]
                .into_iter()
                .filter_map(|mappings| Token::with_mappings(self.name(), mappings).ok())
                .map(|token| token.to_string())
                .collect();
        }

        let mut enchantments: Option<Vec<String>> = None;
        let mut level: Option<i32> = None;
        for (key, value) in token.mappings() {
            if value.trim().is_empty() {
                continue;
            }
            let (is_level, is_type) = enchant_key_classes(key);
            if is_level {
                // a level being typed that is not a number yet
                level = Some(value.parse().unwrap_or(0));
            }
            if is_type {
                enchantments = Some(match ctx.host.catalog().enchantment(value) {
                    Some(_) => vec![value.to_string()],
                    None => complete_keyed(value, ctx.host.catalog().enchantments().map(|e| e.key())),
                });
            }
        }

        let mut base = Token::new(self.name());
        if let Some(level) = level {
            // digits never collide with reserved characters
            let _ = base.put("level", level.to_string());
        }
        match enchantments {
            None => vec![base.to_string()],
            Some(enchantments) => enchantments
                .into_iter()
                .filter_map(|enchantment| {
                    let mut suggestion = base.clone();
                    suggestion.put("type", enchantment).ok()?;
                    Some(suggestion.to_string())
                })
                .collect(),
        }
    }

    fn is_unique(&self) -> bool {
        false
    }

    // Partial enchant tokens complement each other, e.g. `enchant{t:sharpness}` and
    // `enchant{l:3}`; tokens that both name a type or both name a level stay separate.
    fn merges_with(&self, first: &Token, second: &Token) -> bool {
        let classes = |token: &Token| {
            token
                .mappings()
                .filter(|(_, value)| !value.trim().is_empty())
                .fold((false, false), |(level, kind), (key, _)| {
                    let (is_level, is_type) = enchant_key_classes(key);
                    (level || is_level, kind || is_type)
                })
        };
        let (first_level, first_type) = classes(first);
        let (second_level, second_type) = classes(second);
        // a bare `enchant` already stands on its own
        let both_partial = (first_level || first_type) && (second_level || second_type);
        both_partial && first_level != second_level && first_type != second_type
    }
}
