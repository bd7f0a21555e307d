use crate::classify::{Kind, KindClass, PageType, classify, is_template};
use crate::config::BuildPaths;
use crate::error::{KilnError, Result};
use crate::page::Page;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Component, Path};
use std::sync::{Arc, OnceLock};
use tracing::debug;
use walkdir::WalkDir;

const REGISTERED_CLASSES: [KindClass; 4] = [
    KindClass::Page,
    KindClass::Image,
    KindClass::Audio,
    KindClass::Font,
];

/// Resolves the final kind of a page, rendering its metadata if needed.
pub trait KindResolver {
    fn resolve_kind(&self, page: &Arc<Page>) -> Result<Kind>;
}

#[derive(Debug, Clone, Serialize)]
pub struct PageLink {
    pub path: String,
    pub friendly_path: String,
    pub kind: &'static str,
}

/// Every registered resource of the site, keyed by output path.
///
/// The tree is scanned once on first use.
#[derive(Debug)]
pub struct Pages {
    layout: BuildPaths,
    all: OnceLock<BTreeMap<String, Arc<Page>>>,
}

impl Pages {
    pub fn new(layout: BuildPaths) -> Self {
        Self {
            layout,
            all: OnceLock::new(),
        }
    }

    pub fn layout(&self) -> &BuildPaths {
        &self.layout
    }

    pub fn all(&self) -> Result<&BTreeMap<String, Arc<Page>>> {
        if let Some(all) = self.all.get() {
            return Ok(all);
        }
        let scanned = scan(&self.layout)?;
        Ok(self.all.get_or_init(|| scanned))
    }

    /// Finds a page by output path, falling back to `<key>/index.html` and
    /// then to an unregistered file copied verbatim from the intermediate tree.
    pub fn lookup(&self, key: &str) -> Result<Arc<Page>> {
        let all = self.all()?;
        let key = key.trim_start_matches('/');
        if let Some(page) = all.get(key) {
            return Ok(page.clone());
        }
        let index_key = if key.is_empty() {
            "index.html".to_string()
        } else {
            format!("{}/index.html", key.trim_end_matches('/'))
        };
        if let Some(page) = all.get(&index_key) {
            return Ok(page.clone());
        }
        self.unregistered(key).ok_or_else(|| KilnError::NotFound {
            key: key.to_string(),
        })
    }

    fn unregistered(&self, key: &str) -> Option<Arc<Page>> {
        let relative = Path::new(key);
        if key.is_empty()
            || relative
                .components()
                .any(|component| !matches!(component, Component::Normal(_)))
        {
            return None;
        }
        let source = self.layout.intermediate.join(relative);
        if is_template(&source) || !source.is_file() {
            return None;
        }
        let page = Page::new(&source, &self.layout).ok()?;
        debug!(key, kind = page.kind().name(), "resolved unregistered resource");
        Some(Arc::new(page))
    }

    /// Template view of the registry. Directory pages are reachable both
    /// as `blog/index.html` and as `blog`, mirroring `lookup`.
    pub fn links(&self) -> Result<BTreeMap<String, PageLink>> {
        let all = self.all()?;
        let mut links = BTreeMap::new();
        for (key, page) in all {
            let link = PageLink {
                path: page.path().to_string(),
                friendly_path: page.friendly_path(),
                kind: page.kind().name(),
            };
            if let Some(directory) = key.strip_suffix("/index.html")
                && !all.contains_key(directory)
            {
                links.insert(directory.to_string(), link.clone());
            }
            links.insert(key.clone(), link);
        }
        Ok(links)
    }

    pub fn blog_entries<R: KindResolver>(&self, resolver: &R) -> Result<Vec<Arc<Page>>> {
        let mut entries = Vec::new();
        for page in self.all()?.values() {
            if page.kind().class() != KindClass::Page {
                continue;
            }
            if resolver.resolve_kind(page)? == Kind::Page(PageType::BlogEntry) {
                entries.push(page.clone());
            }
        }
        Ok(entries)
    }
}

fn scan(layout: &BuildPaths) -> Result<BTreeMap<String, Arc<Page>>> {
    let mut all: BTreeMap<String, Arc<Page>> = BTreeMap::new();
    if !layout.intermediate.is_dir() {
        debug!(root = %layout.intermediate.display(), "intermediate tree missing, registry is empty");
        return Ok(all);
    }

    for entry in WalkDir::new(&layout.intermediate).sort_by_file_name() {
        let entry = entry.map_err(|error| KilnError::WalkDir {
            path: layout.intermediate.clone(),
            message: error.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().is_some_and(|extension| extension == "deps") {
            continue;
        }

        let kind = match classify(path) {
            Ok(kind) => kind,
            Err(KilnError::UnsupportedKind { .. }) => {
                debug!(path = %path.display(), "skipping unsupported resource");
                continue;
            }
            Err(error) => return Err(error),
        };
        if !REGISTERED_CLASSES.contains(&kind.class()) {
            continue;
        }

        let page = Arc::new(Page::new(path, layout)?);
        let key = page.path().to_string();
        match all.get(&key) {
            Some(existing) if is_transformed(existing) && !is_transformed(&page) => continue,
            Some(existing) if is_transformed(&page) && !is_transformed(existing) => {}
            Some(existing) => {
                return Err(KilnError::DuplicatePage {
                    key,
                    path: page.source_path().to_path_buf(),
                    existing_path: existing.source_path().to_path_buf(),
                });
            }
            None => {}
        }
        all.insert(key, page);
    }

    debug!(count = all.len(), "scanned page registry");
    Ok(all)
}

fn is_transformed(page: &Page) -> bool {
    page.source_path() != page.intermediate_path()
}
