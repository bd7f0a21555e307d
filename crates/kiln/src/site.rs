use crate::classify::{Kind, PageType};
use crate::config::SiteConfig;
use crate::error::{KilnError, Result};
use crate::history::{GitHistory, SourceHistory};
use crate::links::slash_path;
use crate::markup::{Highlighter, KatexConverter, MarkupConverter};
use crate::media::{ImageProbe, MediaProbe};
use crate::page::{Dimensions, History, Page, PageView};
use crate::pages::{KindResolver, Pages};
use crate::recorder::RenderMode;
use chrono::{DateTime, FixedOffset};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tera::Tera;
use tracing::{debug, warn};

/// External tools the build consults for facts it cannot derive from sources.
pub struct Collaborators {
    pub history: Box<dyn SourceHistory>,
    pub media: Box<dyn MediaProbe>,
    pub math: Box<dyn MarkupConverter>,
}

impl Collaborators {
    /// `git`, `image`/`usvg`/`ffprobe` and `katex`, with equations cached under
    /// the configured cache directory.
    pub fn system(config: &SiteConfig) -> Self {
        Self {
            history: Box::new(GitHistory::new()),
            media: Box::new(ImageProbe::new()),
            math: Box::new(KatexConverter::new(config.build.cache.join("katex"))),
        }
    }

    pub fn new(
        history: impl SourceHistory + 'static,
        media: impl MediaProbe + 'static,
        math: impl MarkupConverter + 'static,
    ) -> Self {
        Self {
            history: Box::new(history),
            media: Box::new(media),
            math: Box::new(math),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    #[serde(flatten)]
    pub view: PageView,
    pub anchors: BTreeSet<String>,
    pub srcdeps: BTreeSet<String>,
    pub rtdeps: BTreeSet<String>,
}

/// Everything one build invocation knows: configuration, the page registry,
/// the base template set and the collaborators.
pub struct Site {
    pub(crate) config: SiteConfig,
    pub(crate) pages: Pages,
    pub(crate) templates: Tera,
    pub(crate) collaborators: Collaborators,
    pub(crate) highlighter: Highlighter,
    metadata_in_flight: Mutex<BTreeSet<PathBuf>>,
}

struct MetadataPass<'a> {
    in_flight: &'a Mutex<BTreeSet<PathBuf>>,
    source: PathBuf,
}

impl<'a> MetadataPass<'a> {
    /// `None` when a pass for `source` is already running further up the stack.
    fn enter(in_flight: &'a Mutex<BTreeSet<PathBuf>>, source: &Path) -> Option<Self> {
        if !in_flight.lock().insert(source.to_path_buf()) {
            return None;
        }
        Some(Self {
            in_flight,
            source: source.to_path_buf(),
        })
    }
}

impl Drop for MetadataPass<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.source);
    }
}

impl Site {
    pub fn new(config: SiteConfig, collaborators: Collaborators) -> Result<Arc<Self>> {
        let templates_dir = &config.build.templates;
        let mut templates = if templates_dir.is_dir() {
            let glob = format!("{}/**/*", templates_dir.display());
            Tera::new(&glob).map_err(|error| KilnError::Render {
                template: templates_dir.display().to_string(),
                message: error.to_string(),
            })?
        } else {
            debug!(dir = %templates_dir.display(), "no shared templates directory");
            Tera::default()
        };
        templates.autoescape_on(vec![]);

        let pages = Pages::new(config.build.clone());
        Ok(Arc::new(Self {
            config,
            pages,
            templates,
            collaborators,
            highlighter: Highlighter::new(),
            metadata_in_flight: Mutex::new(BTreeSet::new()),
        }))
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn pages(&self) -> &Pages {
        &self.pages
    }

    /// The registered page for `source`, or a fresh one if the source is not
    /// part of the scanned tree.
    pub fn page(&self, source: &Path) -> Result<Arc<Page>> {
        let candidate = Page::new(source, self.pages.layout())?;
        if let Some(existing) = self.pages.all()?.get(candidate.path())
            && existing.source_path() == candidate.source_path()
        {
            return Ok(existing.clone());
        }
        Ok(Arc::new(candidate))
    }

    /// Looks up a page a template refers to. Query modes tolerate dependencies
    /// that have not been built yet.
    pub fn dependency(&self, key: &str, mode: RenderMode) -> Result<Arc<Page>> {
        match self.pages.lookup(key) {
            Err(error) if error.is_not_found() && mode.is_query() => {
                debug!(key, mode = mode.name(), "using placeholder for missing dependency");
                Ok(Arc::new(Page::placeholder(key, self.pages.layout())?))
            }
            other => other,
        }
    }

    fn needs_metadata_pass(page: &Page) -> bool {
        !page.is_placeholder()
            && page.kind().is_templated()
            && page.kind() != Kind::Page(PageType::Stylesheet)
            && !page.has_rendered_metadata()
    }

    /// Runs the type query once per page, freezing its type and recording
    /// whatever title, description and publish date the template sets.
    pub fn ensure_metadata(self: &Arc<Self>, page: &Arc<Page>) -> Result<()> {
        if !Self::needs_metadata_pass(page) {
            return Ok(());
        }
        let Some(_pass) = MetadataPass::enter(&self.metadata_in_flight, page.source_path()) else {
            debug!(page = page.path(), "metadata pass re-entered, breaking the cycle");
            return Ok(());
        };

        let declared = self.query_type(page)?;
        match declared {
            Some(page_type) => {
                page.freeze_type(page_type)?;
            }
            None if page.resolved_kind().is_none() => {
                page.freeze_type(PageType::Generic)?;
            }
            None => {}
        }
        page.mark_metadata_rendered();
        Ok(())
    }

    pub fn title(self: &Arc<Self>, page: &Arc<Page>) -> Result<Option<String>> {
        self.ensure_metadata(page)?;
        Ok(page.title().map(str::to_string))
    }

    pub fn description(self: &Arc<Self>, page: &Arc<Page>) -> Result<Option<String>> {
        self.ensure_metadata(page)?;
        Ok(page.description().map(str::to_string))
    }

    pub fn history(&self, page: &Page) -> History {
        if page.is_placeholder() {
            return History::default();
        }
        if let Some(history) = page.memoized_history() {
            return history.clone();
        }
        let history = match self.collaborators.history.history_of(page.source_path()) {
            Ok(history) => history,
            Err(error) => {
                warn!(page = page.path(), %error, "source history unavailable");
                History::default()
            }
        };
        page.remember_history(history).clone()
    }

    pub fn publish_date(self: &Arc<Self>, page: &Arc<Page>) -> Result<Option<DateTime<FixedOffset>>> {
        self.ensure_metadata(page)?;
        Ok(page
            .declared_publish_date()
            .or_else(|| self.history(page).publish_date))
    }

    pub fn is_published(self: &Arc<Self>, page: &Arc<Page>) -> Result<bool> {
        Ok(self.publish_date(page)?.is_some())
    }

    pub fn dimensions(&self, page: &Page) -> Option<Dimensions> {
        let kind = page.kind();
        if !kind.is_visual() || page.is_placeholder() {
            return None;
        }
        if let Some(dimensions) = page.memoized_dimensions() {
            return Some(dimensions);
        }
        match self
            .collaborators
            .media
            .dimensions_of(page.source_path(), kind.is_video())
        {
            Ok(dimensions) => Some(page.remember_dimensions(dimensions)),
            Err(error) => {
                warn!(page = page.path(), %error, "could not probe dimensions");
                None
            }
        }
    }

    pub fn anchors(self: &Arc<Self>, page: &Arc<Page>) -> Result<BTreeSet<String>> {
        match page.anchors() {
            Some(anchors) => Ok(anchors),
            None => self.query_anchors(page),
        }
    }

    pub fn repo_page(&self, page: &Page) -> Option<String> {
        let repo = self.config.source_repo.as_deref()?;
        let relative = self
            .pages
            .layout()
            .relative_to_intermediate(page.source_path())
            .ok()?;
        Some(format!("{}/{}", repo.trim_end_matches('/'), slash_path(&relative)))
    }

    /// Blog entries, newest first; unpublished entries sort last.
    pub fn blog_entries(self: &Arc<Self>) -> Result<Vec<Arc<Page>>> {
        let entries = self.pages.blog_entries(self)?;
        let mut dated = Vec::with_capacity(entries.len());
        for entry in entries {
            dated.push((self.publish_date(&entry)?, entry));
        }
        dated.sort_by(|left, right| {
            right
                .0
                .cmp(&left.0)
                .then_with(|| left.1.path().cmp(right.1.path()))
        });
        Ok(dated.into_iter().map(|(_, entry)| entry).collect())
    }

    pub fn view(self: &Arc<Self>, page: &Arc<Page>) -> Result<PageView> {
        let title = self.title(page)?;
        let description = self.description(page)?;
        let publish_date = self.publish_date(page)?;
        let history = self.history(page);
        let kind = page.kind();

        let (comment_email, comment_email_subject) =
            if kind == Kind::Page(PageType::BlogEntry) {
                (
                    self.config.comment_email().map(str::to_string),
                    Some(format!("[{}]", page.friendly_path())),
                )
            } else {
                (None, None)
            };

        Ok(PageView {
            path: page.path().to_string(),
            friendly_path: page.friendly_path(),
            source_path: slash_path(page.source_path()),
            intermediate_path: slash_path(page.intermediate_path()),
            build_path: slash_path(page.build_path()),
            kind: kind.name(),
            page_type: kind.page_type(),
            is_video: kind.is_video(),
            exists: !page.is_placeholder(),
            title,
            description,
            is_published: publish_date.is_some(),
            publish_date,
            last_edit_date: history.last_edit_date,
            authors: history.authors.into_iter().collect(),
            dimensions: self.dimensions(page),
            repo_page: self.repo_page(page),
            comment_email,
            comment_email_subject,
        })
    }

    pub fn info(self: &Arc<Self>, page: &Arc<Page>) -> Result<PageInfo> {
        let view = self.view(page)?;
        let anchors = self.anchors(page)?;
        let dependencies = self.query_deps(page)?;
        Ok(PageInfo {
            view,
            anchors,
            srcdeps: dependencies.srcdeps,
            rtdeps: dependencies.rtdeps,
        })
    }
}

impl KindResolver for Arc<Site> {
    fn resolve_kind(&self, page: &Arc<Page>) -> Result<Kind> {
        if let Some(kind) = page.resolved_kind() {
            return Ok(kind);
        }
        self.ensure_metadata(page)?;
        Ok(page.kind())
    }
}
