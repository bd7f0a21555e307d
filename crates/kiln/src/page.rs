use crate::classify::{Kind, PageType, classify, intermediate_name};
use crate::config::BuildPaths;
use crate::error::{KilnError, Result};
use crate::links::{normalize, slash_path};
use chrono::{DateTime, FixedOffset};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const INDEX_FILE: &str = "index.html";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
}

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct History {
    pub authors: BTreeSet<Author>,
    pub publish_date: Option<DateTime<FixedOffset>>,
    pub last_edit_date: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Dependencies {
    pub srcdeps: BTreeSet<String>,
    pub rtdeps: BTreeSet<String>,
}

impl Dependencies {
    pub fn merge(&mut self, other: Dependencies) {
        self.srcdeps.extend(other.srcdeps);
        self.rtdeps.extend(other.rtdeps);
    }

    pub fn is_superset(&self, other: &Dependencies) -> bool {
        self.srcdeps.is_superset(&other.srcdeps) && self.rtdeps.is_superset(&other.rtdeps)
    }
}

/// One source resource and everything learned about it during this build.
///
/// Identity and kind are fixed at construction, except for markup templates
/// whose type is frozen by the first metadata render. Metadata cells are
/// filled lazily and never cleared; dependency and anchor sets only grow.
#[derive(Debug)]
pub struct Page {
    source_path: PathBuf,
    intermediate_path: PathBuf,
    build_path: PathBuf,
    path: String,
    placeholder: bool,
    provisional_kind: Kind,
    kind: OnceLock<Kind>,
    metadata_rendered: OnceLock<()>,
    title: OnceLock<String>,
    description: OnceLock<String>,
    declared_publish_date: OnceLock<DateTime<FixedOffset>>,
    history: OnceLock<History>,
    dimensions: OnceLock<Dimensions>,
    anchors: Mutex<Option<BTreeSet<String>>>,
    dependencies: Mutex<Option<Dependencies>>,
}

impl Page {
    pub fn new(source: impl AsRef<Path>, layout: &BuildPaths) -> Result<Self> {
        let source_path = normalize(source.as_ref());
        if !source_path.is_file() {
            return Err(KilnError::NotFound {
                key: source_path.display().to_string(),
            });
        }
        let kind = classify(&source_path)?;
        Self::build(source_path, kind, layout, false)
    }

    /// Stand-in for a dependency that has not been produced yet. Skips the
    /// existence check and never renders.
    pub fn placeholder(key: &str, layout: &BuildPaths) -> Result<Self> {
        let source_path = normalize(&layout.intermediate.join(key.trim_start_matches('/')));
        let kind = classify(&source_path).unwrap_or(Kind::Page(PageType::Generic));
        Self::build(source_path, kind, layout, true)
    }

    fn build(source_path: PathBuf, kind: Kind, layout: &BuildPaths, placeholder: bool) -> Result<Self> {
        let file_name = source_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| KilnError::InvalidPath {
                path: source_path.clone(),
            })?;

        let intermediate_path = source_path.with_file_name(intermediate_name(&file_name));
        let relative = layout.relative_to_intermediate(&intermediate_path)?;
        let build_path = normalize(&layout.output.join(&relative));
        let path = slash_path(&relative);

        let resolved = OnceLock::new();
        if placeholder || kind != Kind::Page(PageType::Generic) {
            let _ = resolved.set(kind);
        }

        Ok(Self {
            source_path,
            intermediate_path,
            build_path,
            path,
            placeholder,
            provisional_kind: kind,
            kind: resolved,
            metadata_rendered: OnceLock::new(),
            title: OnceLock::new(),
            description: OnceLock::new(),
            declared_publish_date: OnceLock::new(),
            history: OnceLock::new(),
            dimensions: OnceLock::new(),
            anchors: Mutex::new(None),
            dependencies: Mutex::new(None),
        })
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn intermediate_path(&self) -> &Path {
        &self.intermediate_path
    }

    pub fn build_path(&self) -> &Path {
        &self.build_path
    }

    /// Output path relative to the output root, `/` separated.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn friendly_path(&self) -> String {
        let trimmed = if self.path == INDEX_FILE {
            ""
        } else {
            self.path
                .strip_suffix(&format!("/{INDEX_FILE}"))
                .unwrap_or(&self.path)
        };
        let trimmed = trimmed.trim_end_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            trimmed.to_string()
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn kind(&self) -> Kind {
        self.kind.get().copied().unwrap_or(self.provisional_kind)
    }

    pub fn resolved_kind(&self) -> Option<Kind> {
        self.kind.get().copied()
    }

    pub fn freeze_type(&self, page_type: PageType) -> Result<Kind> {
        let frozen = *self.kind.get_or_init(|| Kind::Page(page_type));
        if frozen == Kind::Page(page_type) {
            Ok(frozen)
        } else {
            Err(KilnError::ImmutableFieldConflict {
                field: "type",
                path: self.path.clone(),
                existing: format!("{frozen:?}"),
                new: format!("{:?}", Kind::Page(page_type)),
            })
        }
    }

    pub(crate) fn has_rendered_metadata(&self) -> bool {
        self.metadata_rendered.get().is_some()
    }

    pub(crate) fn mark_metadata_rendered(&self) {
        let _ = self.metadata_rendered.set(());
    }

    pub fn title(&self) -> Option<&str> {
        self.title.get().map(String::as_str)
    }

    pub fn set_title(&self, title: &str) -> Result<()> {
        self.set_once(&self.title, "title", title)
    }

    pub fn description(&self) -> Option<&str> {
        self.description.get().map(String::as_str)
    }

    pub fn set_description(&self, description: &str) -> Result<()> {
        self.set_once(&self.description, "description", description)
    }

    fn set_once(&self, cell: &OnceLock<String>, field: &'static str, value: &str) -> Result<()> {
        let existing = cell.get_or_init(|| value.to_string());
        if existing == value {
            Ok(())
        } else {
            Err(KilnError::ImmutableFieldConflict {
                field,
                path: self.path.clone(),
                existing: existing.clone(),
                new: value.to_string(),
            })
        }
    }

    pub fn declared_publish_date(&self) -> Option<DateTime<FixedOffset>> {
        self.declared_publish_date.get().copied()
    }

    pub fn declare_publish_date(&self, date: DateTime<FixedOffset>) -> Result<()> {
        let existing = *self.declared_publish_date.get_or_init(|| date);
        if existing == date {
            Ok(())
        } else {
            Err(KilnError::ImmutableFieldConflict {
                field: "publish_date",
                path: self.path.clone(),
                existing: existing.to_rfc3339(),
                new: date.to_rfc3339(),
            })
        }
    }

    pub(crate) fn memoized_history(&self) -> Option<&History> {
        self.history.get()
    }

    pub(crate) fn remember_history(&self, history: History) -> &History {
        self.history.get_or_init(|| history)
    }

    pub(crate) fn memoized_dimensions(&self) -> Option<Dimensions> {
        self.dimensions.get().copied()
    }

    pub(crate) fn remember_dimensions(&self, dimensions: Dimensions) -> Dimensions {
        *self.dimensions.get_or_init(|| dimensions)
    }

    /// Anchor set, or `None` if anchors have never been queried.
    pub fn anchors(&self) -> Option<BTreeSet<String>> {
        self.anchors.lock().clone()
    }

    pub fn merge_anchors(&self, anchors: BTreeSet<String>) -> BTreeSet<String> {
        let mut guard = self.anchors.lock();
        let merged = guard.get_or_insert_with(BTreeSet::new);
        merged.extend(anchors);
        merged.clone()
    }

    /// Dependency sets, or `None` if dependencies have never been queried.
    pub fn dependencies(&self) -> Option<Dependencies> {
        self.dependencies.lock().clone()
    }

    pub fn merge_dependencies(&self, dependencies: Dependencies) -> Dependencies {
        let mut guard = self.dependencies.lock();
        let merged = guard.get_or_insert_with(Dependencies::default);
        merged.merge(dependencies);
        merged.clone()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub path: String,
    pub friendly_path: String,
    pub source_path: String,
    pub intermediate_path: String,
    pub build_path: String,
    pub kind: &'static str,
    pub page_type: Option<PageType>,
    pub is_video: bool,
    pub exists: bool,
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_published: bool,
    pub publish_date: Option<DateTime<FixedOffset>>,
    pub last_edit_date: Option<DateTime<FixedOffset>>,
    pub authors: Vec<Author>,
    pub dimensions: Option<Dimensions>,
    pub repo_page: Option<String>,
    pub comment_email: Option<String>,
    pub comment_email_subject: Option<String>,
}
