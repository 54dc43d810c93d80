use crate::registry::{Registry, Section};
use serde::{Deserialize, Serialize};

/// Separates the weight from the description on a modifier line.
pub const WEIGHT_MARKER: &str = "681";

/// Formatted modifier strings for one source, in file order. Duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierLists {
    pub prefixes: Vec<String>,
    pub suffixes: Vec<String>,
}

impl ModifierLists {
    pub fn section(&self, section: Section) -> &[String] {
        match section {
            Section::Prefix => &self.prefixes,
            Section::Suffix => &self.suffixes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty() && self.suffixes.is_empty()
    }

    /// Case-insensitive substring filter, as used by the modifier pickers.
    pub fn search<'a>(&'a self, section: Section, query: &str) -> Vec<&'a str> {
        let needle = query.to_lowercase();
        self.section(section)
            .iter()
            .filter(|m| m.to_lowercase().contains(&needle))
            .map(String::as_str)
            .collect()
    }
}

fn format_line(line: &str) -> Option<String> {
    let pos = line.find(WEIGHT_MARKER)?;
    if pos == 0 {
        return None;
    }
    let weight = line[..pos].trim();
    let description = line[pos + WEIGHT_MARKER.len()..].trim();
    Some(format!("{description} ({weight})"))
}

/// Parses `Prefixes` / `Suffixes` sections into formatted modifiers, registering each new string.
pub fn parse_modifier_text(content: &str, registry: &mut Registry) -> ModifierLists {
    let mut lists = ModifierLists::default();
    let mut section: Option<Section> = None;

    for line in content.lines() {
        let line = line.trim();
        if line == Section::Prefix.header() {
            section = Some(Section::Prefix);
            continue;
        }
        if line == Section::Suffix.header() {
            section = Some(Section::Suffix);
            continue;
        }
        let Some(current) = section else {
            continue;
        };
        if line.is_empty() {
            continue;
        }
        let Some(formatted) = format_line(line) else {
            log::trace!("skipping modifier line without weight marker: {line:?}");
            continue;
        };
        registry.register(current, &formatted);
        match current {
            Section::Prefix => lists.prefixes.push(formatted),
            Section::Suffix => lists.suffixes.push(formatted),
        }
    }

    lists
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ModifierId;

    const SAMPLE: &str = "Prefixes\n10681increased Life\n5681increased Mana\n\nSuffixes\n3681Culling Strike (x1)\n681no weight\nmissing marker\n";

    #[test]
    fn parses_sections_and_assigns_ids() {
        let mut reg = Registry::new();
        let lists = parse_modifier_text(SAMPLE, &mut reg);
        assert_eq!(
            lists.prefixes,
            vec!["increased Life (10)", "increased Mana (5)"]
        );
        assert_eq!(lists.suffixes, vec!["Culling Strike (x1) (3)"]);
        assert_eq!(reg.id_of("increased Life (10)"), Some(ModifierId(1)));
        assert_eq!(reg.id_of("increased Mana (5)"), Some(ModifierId(2)));
        assert_eq!(reg.id_of("Culling Strike (x1) (3)"), Some(ModifierId(3)));
    }

    #[test]
    fn lines_before_any_header_are_ignored() {
        let mut reg = Registry::new();
        let lists = parse_modifier_text("10681stray\nPrefixes\n2681kept\n", &mut reg);
        assert_eq!(lists.prefixes, vec!["kept (2)"]);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn duplicates_keep_one_id() {
        let mut reg = Registry::new();
        let lists = parse_modifier_text("Prefixes\n1681dup\n1681dup\n", &mut reg);
        assert_eq!(lists.prefixes.len(), 2);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn fresh_registries_agree() {
        let mut a = Registry::new();
        let mut b = Registry::new();
        let la = parse_modifier_text(SAMPLE, &mut a);
        let lb = parse_modifier_text(SAMPLE, &mut b);
        assert_eq!(la, lb);
        for text in la.prefixes.iter().chain(la.suffixes.iter()) {
            assert_eq!(a.id_of(text), b.id_of(text));
        }
    }

    #[test]
    fn search_is_case_insensitive() {
        let mut reg = Registry::new();
        let lists = parse_modifier_text(SAMPLE, &mut reg);
        assert_eq!(
            lists.search(Section::Prefix, "LIFE"),
            vec!["increased Life (10)"]
        );
        assert_eq!(lists.search(Section::Prefix, "").len(), 2);
    }
}
