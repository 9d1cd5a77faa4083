use std::fmt;

use crate::item::{Enchantment, ItemMeta, ItemStack, Material};

/// A predicate over the base item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemPredicate {
    IsType(Material),
    HasAmount(i32),
}

impl ItemPredicate {
    pub fn is_type(material: Material) -> Self {
        Self::IsType(material)
    }
    pub fn has_amount(min_amount: i32) -> Self {
        Self::HasAmount(min_amount)
    }
    pub fn test(&self, item: &ItemStack) -> bool {
        match self {
            Self::IsType(material) => item.material() == material,
            Self::HasAmount(min_amount) => item.amount() >= *min_amount,
        }
    }
}

impl fmt::Display for ItemPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IsType(material) => write!(f, "type={material}"),
            Self::HasAmount(min_amount) => write!(f, "amount>={min_amount}"),
        }
    }
}

/// A predicate over item metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaPredicate {
    HasEnchant { enchantment: Option<Enchantment>, min_level: Option<i32> },
}

impl MetaPredicate {
    pub fn has_enchant(enchantment: Option<Enchantment>, min_level: Option<i32>) -> Self {
        Self::HasEnchant { enchantment, min_level }
    }
    pub fn test(&self, meta: &ItemMeta) -> bool {
        match self {
            Self::HasEnchant { enchantment, min_level } => match (enchantment, min_level) {
                // anything enchanted
                (None, None) => !meta.enchants().is_empty(),
                (Some(enchantment), None) => meta.has_enchant(enchantment),
                (Some(enchantment), Some(level)) => meta.enchant_level(enchantment) >= *level,
                (None, Some(level)) => meta.enchants().values().any(|found| found >= level),
            },
        }
    }
}

impl fmt::Display for MetaPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HasEnchant { enchantment, min_level } => {
                let enchantment = enchantment.as_ref().map(Enchantment::key).unwrap_or("*");
                match min_level {
                    Some(level) => write!(f, "enchant={enchantment}>={level}"),
                    None => write!(f, "enchant={enchantment}"),
                }
            }
        }
    }
}

/// A conjunction of item and meta predicates.
///
/// An empty matcher matches every item that exists; the search command refuses to
/// schedule one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Matcher {
    item: Vec<ItemPredicate>,
    meta: Vec<MetaPredicate>,
}

impl Matcher {
    pub fn new(item: Vec<ItemPredicate>, meta: Vec<MetaPredicate>) -> Self {
        Self { item, meta }
    }

    pub fn matches(&self, item: Option<&ItemStack>) -> bool {
        let Some(item) = item else {
            return false;
        };
        if item.material().is_air() {
            return false;
        }
        if !self.item.iter().all(|predicate| predicate.test(item)) {
            return false;
        }
        if self.meta.is_empty() {
            return true;
        }
        match item.meta() {
            Some(meta) => self.meta.iter().all(|predicate| predicate.test(meta)),
            None => false,
        }
    }

    /// True if any slot of the container matches.
    pub fn matches_any<'a, I>(&self, contents: I) -> bool
    where
        I: IntoIterator<Item = &'a Option<ItemStack>>,
    {
        contents.into_iter().any(|slot| self.matches(slot.as_ref()))
    }

    pub fn is_empty(&self) -> bool {
        self.item.is_empty() && self.meta.is_empty()
    }

    pub fn item_predicates(&self) -> &[ItemPredicate] {
        &self.item
    }

    pub fn meta_predicates(&self) -> &[MetaPredicate] {
        &self.meta
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .item
            .iter()
            .map(ToString::to_string)
            .chain(self.meta.iter().map(ToString::to_string))
            .collect();
        write!(f, "[{}]", parts.join(" & "))
    }
}
