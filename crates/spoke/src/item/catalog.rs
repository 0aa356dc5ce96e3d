use super::{GameData, RefKind};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    pub id: u32,
    pub name: String,
    #[serde(default = "unlocked_by_default")]
    pub unlocked: bool,
}

fn unlocked_by_default() -> bool {
    true
}

/// Table-backed [`GameData`] for offline validation and tests.
///
/// A permissive catalog answers every lookup positively, for checking
/// configurations when no game data export is available.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaticCatalog {
    #[serde(default)]
    pub actions: Vec<CatalogEntry>,
    #[serde(default)]
    pub items: Vec<CatalogEntry>,
    #[serde(default)]
    pub gear_sets: Vec<CatalogEntry>,
    #[serde(default)]
    pub macros: Vec<CatalogEntry>,
    #[serde(skip)]
    permissive: bool,
}

impl StaticCatalog {
    pub fn permissive() -> Self {
        Self {
            permissive: true,
            ..Self::default()
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    fn entries(&self, kind: RefKind) -> &[CatalogEntry] {
        match kind {
            RefKind::Action => &self.actions,
            RefKind::Item => &self.items,
            RefKind::GearSet => &self.gear_sets,
            RefKind::Macro => &self.macros,
        }
    }

    fn entry(&self, kind: RefKind, id: u32) -> Option<&CatalogEntry> {
        self.entries(kind).iter().find(|e| e.id == id)
    }
}

impl GameData for StaticCatalog {
    fn exists(&self, kind: RefKind, id: u32) -> bool {
        self.permissive || self.entry(kind, id).is_some()
    }

    fn display_name(&self, kind: RefKind, id: u32) -> Option<String> {
        self.entry(kind, id).map(|e| e.name.clone())
    }

    fn is_unlocked(&self, kind: RefKind, id: u32) -> bool {
        self.permissive || self.entry(kind, id).is_some_and(|e| e.unlocked)
    }
}
