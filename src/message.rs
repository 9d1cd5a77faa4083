// Renderable search output: rich chat components for interactive initiators and plain
// text for everyone else, plus the message keys looked up in the host's catalog.

use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::host::{BlockPos, Initiator};
use crate::item::Material;

pub const SEPARATOR: &str = ", ";

const OPEN_INVENTORY: &str = "/invsearch:openinv ";
const OPEN_ENDER_CHEST: &str = "/invsearch:openender ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickAction {
    RunCommand,
    SuggestCommand,
    OpenUrl,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClickEvent {
    pub action: ClickAction,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoverAction {
    ShowText,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HoverEvent {
    pub action: HoverAction,
    pub contents: String,
}

/// A chat component in the host's JSON text format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Component {
    pub text: String,
    #[serde(rename = "clickEvent", skip_serializing_if = "Option::is_none", default)]
    pub click: Option<ClickEvent>,
    #[serde(rename = "hoverEvent", skip_serializing_if = "Option::is_none", default)]
    pub hover: Option<HoverEvent>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub extra: Vec<Component>,
}

impl Component {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }
    pub fn on_click(mut self, action: ClickAction, value: impl Into<String>) -> Self {
        self.click = Some(ClickEvent { action, value: value.into() });
        self
    }
    pub fn on_hover(mut self, contents: impl Into<String>) -> Self {
        self.hover = Some(HoverEvent { action: HoverAction::ShowText, contents: contents.into() });
        self
    }
    pub fn push(&mut self, extra: Component) {
        self.extra.push(extra);
    }
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self.text))
    }
    /// Flatten to text. Click values win over display text, i.e. a link renders as the
    /// link itself.
    pub fn plain_text(&self) -> String {
        let mut out = match &self.click {
            Some(click) => click.value.clone(),
            None => self.text.clone(),
        };
        for extra in &self.extra {
            out.push_str(&extra.plain_text());
        }
        out
    }
}

/// What a single search hit points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MatchLocation {
    Player { id: Uuid, name: String, inventory: bool, ender_chest: bool },
    Container { material: Material, world: String, pos: BlockPos },
}

impl MatchLocation {
    fn render_rich(&self) -> Component {
        match self {
            Self::Player { id, name, inventory: true, ender_chest: true } => {
                let mut component = player_link(&format!("{name} (inv,"), OPEN_INVENTORY, "/openinv ", id, name);
                component.push(player_link(" ender)", OPEN_ENDER_CHEST, "/openender ", id, name));
                component
            }
            Self::Player { id, name, ender_chest: true, .. } => {
                player_link(name, OPEN_ENDER_CHEST, "/openender ", id, name)
            }
            Self::Player { id, name, .. } => player_link(name, OPEN_INVENTORY, "/openinv ", id, name),
            Self::Container { material, world, pos } => {
                let teleport = format!("/execute in {world} minecraft:tp {} {} {}", pos.x, pos.y + 1, pos.z);
                let hover = format!(
                    "{} @ {world}: {}x, {}y, {}z\n\nClick to teleport.",
                    material.namespaced_key(),
                    pos.x,
                    pos.y,
                    pos.z
                );
                Component::text(material.name())
                    .on_click(ClickAction::RunCommand, teleport)
                    .on_hover(hover)
            }
        }
    }

    fn render_plain(&self) -> String {
        match self {
            Self::Player { name, inventory: true, ender_chest: true, .. } => format!("{name} (inv, ender)"),
            Self::Player { name, ender_chest: true, .. } => format!("{name} (ender)"),
            Self::Player { name, .. } => format!("{name} (inv)"),
            Self::Container { material, world, pos } => {
                format!("{} @ {world}: {}x {}y {}z", material.namespaced_key(), pos.x, pos.y, pos.z)
            }
        }
    }
}

// The click runs the precise uuid based command, the hover shows the friendly one.
fn player_link(text: &str, command: &str, hint: &str, id: &Uuid, name: &str) -> Component {
    Component::text(text)
        .on_click(ClickAction::RunCommand, format!("{command}{id}"))
        .on_hover(format!("{hint}{name}"))
}

/// One entry of a search result. Renderings are computed on first use and cached;
/// equality only looks at the location.
#[derive(Debug)]
pub struct MessagePart {
    location: MatchLocation,
    rich: OnceLock<Component>,
    plain: OnceLock<String>,
}

impl MessagePart {
    pub fn new(location: MatchLocation) -> Self {
        Self { location, rich: OnceLock::new(), plain: OnceLock::new() }
    }
    pub fn location(&self) -> &MatchLocation {
        &self.location
    }
    pub fn rich(&self) -> &Component {
        self.rich.get_or_init(|| self.location.render_rich())
    }
    pub fn plain(&self) -> &str {
        self.plain.get_or_init(|| self.location.render_plain())
    }
}

impl Clone for MessagePart {
    fn clone(&self) -> Self {
        Self::new(self.location.clone())
    }
}
impl PartialEq for MessagePart {
    fn eq(&self, other: &Self) -> bool {
        self.location == other.location
    }
}
impl Eq for MessagePart {}
impl Hash for MessagePart {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.location.hash(state);
    }
}

/// Messages the search subsystem sends, looked up in the host's catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    SearchProgress,
    SearchMatches,
    SearchNoMatches,
    ErrorActiveSearch,
    ErrorInvalidToken,
    ErrorInvalidInventory,
    ErrorInvalidMatcher,
}

impl MessageKey {
    pub fn path(&self) -> &'static str {
        match self {
            Self::SearchProgress => "messages.info.search.progress",
            Self::SearchMatches => "messages.info.search.matches",
            Self::SearchNoMatches => "messages.info.search.noMatches",
            Self::ErrorActiveSearch => "messages.error.search.activeSearch",
            Self::ErrorInvalidToken => "messages.error.search.invalidToken",
            Self::ErrorInvalidInventory => "messages.error.search.invalidInventory",
            Self::ErrorInvalidMatcher => "messages.error.search.invalidMatcher",
        }
    }
    pub fn default_text(&self) -> &'static str {
        match self {
            Self::SearchProgress => "Searching: %progress%% complete, %matches% matches so far.",
            Self::SearchMatches => "Locations of items matching parameters:",
            Self::SearchNoMatches => "No items found with search parameters.",
            Self::ErrorActiveSearch => "You already have a search running.",
            Self::ErrorInvalidToken => "Search arguments may not contain brackets, commas or colons in keys or values.",
            Self::ErrorInvalidInventory => "Invalid inventory specification.",
            Self::ErrorInvalidMatcher => "Invalid item matcher specification.",
        }
    }
}

pub trait MessageCatalog: Send + Sync {
    fn lookup(&self, initiator: &dyn Initiator, key: MessageKey) -> Option<String>;

    /// Localized text with `%placeholder%` replacements, falling back to English.
    fn render(&self, initiator: &dyn Initiator, key: MessageKey, replacements: &[(&str, &str)]) -> String {
        let mut text = self.lookup(initiator, key).unwrap_or_else(|| key.default_text().to_string());
        for (placeholder, value) in replacements {
            text = text.replace(placeholder, value);
        }
        text
    }
}

/// Catalog without translations.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMessages;

impl MessageCatalog for DefaultMessages {
    fn lookup(&self, _initiator: &dyn Initiator, _key: MessageKey) -> Option<String> {
        None
    }
}
