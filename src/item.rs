// Host neutral item model. The host converts its own item representation into these
// value types when it hands container contents to the matching engine.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub const NAMESPACE: &str = "minecraft";

// lower case, no namespace, spaces and dashes folded into underscores
fn normalize(name: &str) -> String {
    let name = name.trim().to_lowercase();
    let name = name.strip_prefix("minecraft:").unwrap_or(&name);
    name.replace([' ', '-'], "_")
}

// ------------- Material -------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Material(String);

impl Material {
    pub fn new(name: &str) -> Self {
        Self(normalize(name))
    }
    /// The "nothing" type. Empty slots are reported either as `None` or as air.
    pub fn air() -> Self {
        Self("air".to_string())
    }
    pub fn is_air(&self) -> bool {
        self.0 == "air"
    }
    pub fn key(&self) -> &str {
        &self.0
    }
    pub fn namespaced_key(&self) -> String {
        format!("{NAMESPACE}:{}", self.0)
    }
    pub fn name(&self) -> String {
        self.0.to_uppercase()
    }
}
impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ------------- Enchantment -------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Enchantment(String);

impl Enchantment {
    pub fn new(name: &str) -> Self {
        Self(normalize(name))
    }
    pub fn key(&self) -> &str {
        &self.0
    }
}
impl fmt::Display for Enchantment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ------------- ItemMeta -------------
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemMeta {
    enchants: BTreeMap<Enchantment, i32>,
}

impl ItemMeta {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_enchant(mut self, enchantment: Enchantment, level: i32) -> Self {
        self.enchants.insert(enchantment, level);
        self
    }
    pub fn has_enchant(&self, enchantment: &Enchantment) -> bool {
        self.enchants.contains_key(enchantment)
    }
    /// Level of the enchantment, 0 when absent.
    pub fn enchant_level(&self, enchantment: &Enchantment) -> i32 {
        self.enchants.get(enchantment).copied().unwrap_or(0)
    }
    pub fn enchants(&self) -> &BTreeMap<Enchantment, i32> {
        &self.enchants
    }
}

// ------------- ItemStack -------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemStack {
    material: Material,
    amount: i32,
    meta: Option<ItemMeta>,
}

impl ItemStack {
    pub fn new(material: Material, amount: i32) -> Self {
        Self { material, amount, meta: None }
    }
    pub fn with_meta(mut self, meta: ItemMeta) -> Self {
        self.meta = Some(meta);
        self
    }
    pub fn material(&self) -> &Material {
        &self.material
    }
    pub fn amount(&self) -> i32 {
        self.amount
    }
    pub fn meta(&self) -> Option<&ItemMeta> {
        self.meta.as_ref()
    }
}

/// Known materials and enchantments of the host, used to resolve names typed by the
/// operator and to offer completions.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    materials: BTreeSet<Material>,
    enchantments: BTreeSet<Enchantment>,
}

impl Catalog {
    pub fn new<M, E>(materials: M, enchantments: E) -> Self
    where
        M: IntoIterator,
        M::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Self {
            materials: materials.into_iter().map(|m| Material::new(m.as_ref())).collect(),
            enchantments: enchantments.into_iter().map(|e| Enchantment::new(e.as_ref())).collect(),
        }
    }
    pub fn material(&self, name: &str) -> Option<Material> {
        self.materials.get(&Material::new(name)).cloned()
    }
    pub fn enchantment(&self, name: &str) -> Option<Enchantment> {
        self.enchantments.get(&Enchantment::new(name)).cloned()
    }
    pub fn materials(&self) -> impl Iterator<Item = &Material> {
        self.materials.iter()
    }
    pub fn enchantments(&self) -> impl Iterator<Item = &Enchantment> {
        self.enchantments.iter()
    }
}
