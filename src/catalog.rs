// src/catalog.rs
use serde::Serialize;

use crate::error::ConfigError;

/// One job category as known to the source site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryDescriptor {
    pub name: String,
    pub external_id: u32,
}

impl CategoryDescriptor {
    pub fn new(name: &str, external_id: u32) -> Self {
        Self {
            name: name.to_string(),
            external_id,
        }
    }
}

const DEFAULT_CATEGORIES: &[(&str, u32)] = &[
    ("Pārdošana, Tirdzniecība, Klientu apkalpošana", 14),
    ("Ražošana, Rūpniecība", 16),
    ("Būvniecība, Nekustamais īpašums, Ceļu būve", 4),
    ("Veselības aprūpe, Farmācija", 21),
    ("Pakalpojumi", 13),
    ("Izglītība, Zinātne", 7),
    ("Informāciju tehnoloģijas, Datori", 6),
    ("Transports, Loģistika, Piegāde", 17),
    ("Administrēšana, Asistēšana", 1),
    ("Vadība", 19),
    ("Inženiertehnika", 23),
    ("Tūrisms, Viesnīcas, Ēdināšana", 18),
    ("Bankas, Apdrošināšana, Finanses, Grāmatvedība", 3),
    ("Valsts un pašvaldību pārvalde", 20),
    ("Elektronika, Telekomunikācijas, Enerģētika", 5),
    ("Prakse, Brīvprātīgais darbs", 22),
    ("Mārketings, Reklāma, PR, Mediji", 12),
    ("Lauksaimniecība, Mežsaimniecība, Vide", 10),
    ("Personāla vadība", 15),
    ("Jurisprudence, Tieslietas", 8),
    ("Apsardze, Drošība", 2),
    ("Kultūra, Māksla, Izklaide", 9),
    ("Mājsaimniecība, Apkope", 11),
];

/// Ordered set of categories a run walks through.
///
/// The order here is the order pages are fetched and rows are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCatalog {
    categories: Vec<CategoryDescriptor>,
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES
                .iter()
                .map(|(name, id)| CategoryDescriptor::new(name, *id))
                .collect(),
        }
    }
}

impl CategoryCatalog {
    pub fn new(categories: Vec<CategoryDescriptor>) -> Self {
        Self { categories }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryDescriptor> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn find(&self, name: &str) -> Option<&CategoryDescriptor> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Keep only the named categories, in catalog order.
    ///
    /// An empty list keeps everything.
    pub fn restrict<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, ConfigError> {
        if names.is_empty() {
            return Ok(self.clone());
        }

        if let Some(unknown) = names.iter().find(|n| !self.contains(n.as_ref())) {
            return Err(ConfigError::UnknownCategory(unknown.as_ref().to_string()));
        }

        let categories = self
            .categories
            .iter()
            .filter(|c| names.iter().any(|n| n.as_ref() == c.name))
            .cloned()
            .collect();

        Ok(Self { categories })
    }
}

impl<'a> IntoIterator for &'a CategoryCatalog {
    type Item = &'a CategoryDescriptor;
    type IntoIter = std::slice::Iter<'a, CategoryDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.categories.iter()
    }
}
