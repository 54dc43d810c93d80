use crate::parser::{parse_modifier_text, ModifierLists};
use crate::registry::{Registry, Section};
use crate::size::Size;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SourceFetchError {
    #[error("modifier source {0} not found")]
    NotFound(String),
    #[error("failed to read modifier source {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Where modifier text for a size comes from. Aliased sizes resolve to the same source.
pub trait ModifierSource {
    fn fetch(&self, size: Size) -> Result<String, SourceFetchError>;
}

/// Reads `<dir>/<size>_mods.txt`.
#[derive(Debug, Clone)]
pub struct DirSource {
    dir: PathBuf,
}

impl DirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ModifierSource for DirSource {
    fn fetch(&self, size: Size) -> Result<String, SourceFetchError> {
        let name = size.source_file_name();
        let path = self.dir.join(&name);
        std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                SourceFetchError::NotFound(path.display().to_string())
            } else {
                SourceFetchError::Io { name, source }
            }
        })
    }
}

/// In-memory sources keyed by file name.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    files: HashMap<String, String>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, size: Size, content: impl Into<String>) -> Self {
        self.files.insert(size.source_file_name(), content.into());
        self
    }
}

impl ModifierSource for StaticSource {
    fn fetch(&self, size: Size) -> Result<String, SourceFetchError> {
        let name = size.source_file_name();
        self.files
            .get(&name)
            .cloned()
            .ok_or(SourceFetchError::NotFound(name))
    }
}

/// Parsed modifier lists per source plus the registry they populate.
///
/// Registry IDs depend on the order sources are parsed in, and saved boards store IDs. A miss on
/// any size therefore loads every pending source in [`Size::ALL`] order, so the IDs a session
/// assigns do not depend on which size was browsed first. A failed fetch yields an empty list for
/// that call and is retried on the next miss.
#[derive(Debug, Default)]
pub struct Catalog {
    registry: Registry,
    lists: HashMap<Size, ModifierLists>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn is_loaded(&self, size: Size) -> bool {
        self.lists.contains_key(&size.source_size())
    }

    pub fn lists(&self, size: Size) -> Option<&ModifierLists> {
        self.lists.get(&size.source_size())
    }

    /// Stores a fetch result for `size`. Already-loaded sources are left untouched.
    pub fn ingest(
        &mut self,
        size: Size,
        fetched: Result<String, SourceFetchError>,
    ) -> ModifierLists {
        let key = size.source_size();
        if let Some(lists) = self.lists.get(&key) {
            return lists.clone();
        }
        match fetched {
            Ok(content) => {
                let lists = parse_modifier_text(&content, &mut self.registry);
                log::info!(
                    "loaded {} prefixes and {} suffixes for {key}",
                    lists.prefixes.len(),
                    lists.suffixes.len()
                );
                self.lists.insert(key, lists.clone());
                lists
            }
            Err(err) => {
                log::warn!("error loading modifiers for {size}: {err}");
                ModifierLists::default()
            }
        }
    }

    /// Source sizes not loaded yet, in the order they must be loaded.
    pub fn pending_sources(&self) -> Vec<Size> {
        let mut pending = Vec::new();
        for size in Size::ALL {
            let key = size.source_size();
            if !self.lists.contains_key(&key) && !pending.contains(&key) {
                pending.push(key);
            }
        }
        pending
    }

    pub fn ensure_loaded(&mut self, size: Size, source: &dyn ModifierSource) -> ModifierLists {
        if let Some(lists) = self.lists(size) {
            log::debug!("using cached modifiers for {size}");
            return lists.clone();
        }
        self.preload_all(source);
        self.lists(size).cloned().unwrap_or_default()
    }

    /// Loads every pending source in canonical order.
    pub fn preload_all(&mut self, source: &dyn ModifierSource) {
        for key in self.pending_sources() {
            let fetched = source.fetch(key);
            self.ingest(key, fetched);
        }
    }

    pub fn search(&self, size: Size, section: Section, query: &str) -> Vec<String> {
        self.lists(size)
            .map(|lists| {
                lists
                    .search(section, query)
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ModifierId;

    fn size(label: &str) -> Size {
        label.parse().unwrap()
    }

    fn source() -> StaticSource {
        StaticSource::new()
            .with(size("1x1"), "Prefixes\n10681increased Life\nSuffixes\n2681of Haste\n")
            .with(size("2x1"), "Prefixes\n5681increased Mana\n")
    }

    #[test]
    fn aliased_sizes_share_one_load() {
        let mut catalog = Catalog::new();
        let src = source();
        let wide = catalog.ensure_loaded(size("2x1"), &src);
        assert_eq!(wide.prefixes, vec!["increased Mana (5)"]);
        assert!(catalog.is_loaded(size("1x2")));
        let tall = catalog.ensure_loaded(size("1x2"), &src);
        assert_eq!(tall, wide);
        // 1x1 was loaded too, and nothing was parsed twice.
        assert_eq!(catalog.registry().len(), 3);
    }

    #[test]
    fn missing_source_is_empty_and_retried() {
        let mut catalog = Catalog::new();
        let lists = catalog.ensure_loaded(size("2x2"), &source());
        assert!(lists.is_empty());
        assert!(!catalog.is_loaded(size("2x2")));
        assert_eq!(catalog.pending_sources(), vec![size("3x1"), size("2x2")]);

        let later = StaticSource::new().with(size("2x2"), "Suffixes\n1681of Later\n");
        let lists = catalog.ensure_loaded(size("2x2"), &later);
        assert_eq!(lists.suffixes, vec!["of Later (1)"]);
        assert_eq!(catalog.pending_sources(), vec![size("3x1")]);
    }

    #[test]
    fn ids_do_not_depend_on_browsing_order() {
        let src = source();
        let mut a = Catalog::new();
        let mut b = Catalog::new();
        a.preload_all(&src);
        b.ensure_loaded(size("1x2"), &src);
        b.ensure_loaded(size("1x1"), &src);
        for text in ["increased Life (10)", "of Haste (2)", "increased Mana (5)"] {
            assert_eq!(a.registry().id_of(text), b.registry().id_of(text));
        }
        assert_eq!(a.registry().id_of("increased Life (10)"), Some(ModifierId(1)));
        assert_eq!(a.registry().id_of("of Haste (2)"), Some(ModifierId(2)));
        assert_eq!(a.registry().id_of("increased Mana (5)"), Some(ModifierId(3)));
    }

    #[test]
    fn dir_source_reads_named_files() {
        let dir = std::env::temp_dir().join(format!(
            "idolboard-catalog-test-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("3x1_mods.txt"), "Prefixes\n7681wide thing\n").unwrap();
        let src = DirSource::new(&dir);
        assert_eq!(
            src.fetch(size("1x3")).unwrap(),
            "Prefixes\n7681wide thing\n"
        );
        assert!(matches!(
            src.fetch(size("1x1")),
            Err(SourceFetchError::NotFound(_))
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn search_filters_loaded_lists() {
        let mut catalog = Catalog::new();
        assert!(catalog.search(size("1x1"), Section::Prefix, "").is_empty());
        catalog.ensure_loaded(size("1x1"), &source());
        assert_eq!(
            catalog.search(size("1x1"), Section::Suffix, "haste"),
            vec!["of Haste (2)"]
        );
    }
}
