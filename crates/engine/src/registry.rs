use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Prefix,
    Suffix,
}

impl Section {
    pub const ALL: [Section; 2] = [Section::Prefix, Section::Suffix];

    /// Section header as it appears in modifier source text.
    pub fn header(self) -> &'static str {
        match self {
            Section::Prefix => "Prefixes",
            Section::Suffix => "Suffixes",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModifierId(pub u32);

impl fmt::Display for ModifierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Append-only mapping between formatted modifier text and compact IDs.
///
/// IDs come from one counter shared by both sections and start at 1; `0` is reserved for an empty
/// slot in encoded boards. Feeding the same source text in the same order always yields the same IDs.
#[derive(Debug, Clone)]
pub struct Registry {
    prefixes: HashMap<String, ModifierId>,
    suffixes: HashMap<String, ModifierId>,
    by_id: BTreeMap<ModifierId, String>,
    next_id: u32,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            prefixes: HashMap::new(),
            suffixes: HashMap::new(),
            by_id: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn table(&self, section: Section) -> &HashMap<String, ModifierId> {
        match section {
            Section::Prefix => &self.prefixes,
            Section::Suffix => &self.suffixes,
        }
    }

    pub fn register(&mut self, section: Section, text: &str) -> ModifierId {
        if let Some(id) = self.table(section).get(text) {
            return *id;
        }
        let id = ModifierId(self.next_id);
        self.next_id += 1;
        let table = match section {
            Section::Prefix => &mut self.prefixes,
            Section::Suffix => &mut self.suffixes,
        };
        table.insert(text.to_string(), id);
        self.by_id.insert(id, text.to_string());
        id
    }

    pub fn id_in(&self, section: Section, text: &str) -> Option<ModifierId> {
        self.table(section).get(text).copied()
    }

    /// Looks in prefixes first, then suffixes.
    pub fn id_of(&self, text: &str) -> Option<ModifierId> {
        Section::ALL
            .iter()
            .find_map(|section| self.id_in(*section, text))
    }

    pub fn text_of(&self, id: ModifierId) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_and_stable() {
        let mut reg = Registry::new();
        assert_eq!(reg.register(Section::Prefix, "a (1)"), ModifierId(1));
        assert_eq!(reg.register(Section::Suffix, "b (1)"), ModifierId(2));
        assert_eq!(reg.register(Section::Prefix, "a (1)"), ModifierId(1));
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.text_of(ModifierId(2)), Some("b (1)"));
        assert_eq!(reg.id_in(Section::Prefix, "b (1)"), None);
        assert_eq!(reg.text_of(ModifierId(3)), None);
    }

    #[test]
    fn sections_are_scoped() {
        let mut reg = Registry::new();
        let p = reg.register(Section::Prefix, "shared (5)");
        let s = reg.register(Section::Suffix, "shared (5)");
        assert_ne!(p, s);
        // Prefix table wins when the same text lives in both sections.
        assert_eq!(reg.id_of("shared (5)"), Some(p));
        assert_eq!(reg.id_in(Section::Suffix, "shared (5)"), Some(s));
    }
}
