use crate::classify::{Kind, PageType};
use crate::error::{IoContext, KilnError, Result};
use crate::filters;
use crate::links::{slash_path, split_fragment, to_rel_path};
use crate::page::{Dependencies, Page};
use crate::recorder::{Recorder, Recording, RenderMode};
use crate::site::Site;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::sync::Arc;
use tera::{Context, Tera};
use tracing::debug;

/// State shared by every template function and filter of one evaluation.
#[derive(Clone)]
struct TemplateScope {
    site: Arc<Site>,
    page: Arc<Page>,
    recorder: Recorder,
    mode: RenderMode,
}

type Args = HashMap<String, Value>;

fn string_arg(args: &Args, name: &str) -> tera::Result<String> {
    match args.get(name) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(Value::Null) | None => Err(tera::Error::msg(format!("missing argument `{name}`"))),
        Some(other) => Ok(other.to_string()),
    }
}

/// A page reference in a template is either a path or a page object.
fn page_key(args: &Args) -> tera::Result<String> {
    match args.get("path") {
        Some(Value::String(path)) => Ok(path.clone()),
        Some(Value::Object(page)) => page
            .get("path")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| tera::Error::msg("page object without a `path`")),
        Some(other) => Err(tera::Error::msg(format!("expected a page path, got {other}"))),
        None => Err(tera::Error::msg("missing argument `path`")),
    }
}

fn text_value(value: &Value, filter: &str) -> tera::Result<String> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Null => Ok(String::new()),
        other => Err(tera::Error::msg(format!(
            "filter `{filter}` expects a string, got {other}"
        ))),
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> tera::Result<Value> {
    serde_json::to_value(value).map_err(|error| tera::Error::msg(error.to_string()))
}

fn describe(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    message
}

impl TemplateScope {
    fn lift<T>(&self, result: Result<T>) -> tera::Result<T> {
        result.map_err(|error| self.recorder.fail(error))
    }

    fn dependency(&self, key: &str) -> tera::Result<Arc<Page>> {
        self.lift(self.site.dependency(key, self.mode))
    }

    fn view_value(&self, page: &Arc<Page>) -> tera::Result<Value> {
        let view = self.lift(self.site.view(page))?;
        to_value(&view)
    }

    fn add_srcdep(&self, args: &Args) -> tera::Result<Value> {
        let dependency = self.dependency(&page_key(args)?)?;
        self.recorder.add_srcdep(slash_path(dependency.source_path()));
        Ok(Value::Null)
    }

    fn add_rtdep(&self, args: &Args) -> tera::Result<Value> {
        let dependency = self.dependency(&page_key(args)?)?;
        self.recorder.add_rtdep(slash_path(dependency.build_path()));
        Ok(Value::Null)
    }

    fn add_anchor(&self, args: &Args) -> tera::Result<Value> {
        self.recorder.add_anchor(string_arg(args, "name")?);
        Ok(Value::Null)
    }

    fn set_page_type(&self, args: &Args) -> tera::Result<Value> {
        let tag = string_arg(args, "kind")?;
        let page_type = PageType::from_tag(&tag)
            .ok_or_else(|| tera::Error::msg(format!("unknown page type `{tag}`")))?;
        self.recorder.declare_type(page_type);
        if self.mode == RenderMode::Output {
            self.lift(self.page.freeze_type(page_type))?;
        }
        Ok(Value::Null)
    }

    fn set_title(&self, args: &Args) -> tera::Result<Value> {
        let title = string_arg(args, "value")?;
        self.lift(self.page.set_title(&title))?;
        Ok(Value::Null)
    }

    fn set_description(&self, args: &Args) -> tera::Result<Value> {
        let description = string_arg(args, "value")?;
        self.lift(self.page.set_description(&description))?;
        Ok(Value::Null)
    }

    fn mark_published(&self, args: &Args) -> tera::Result<Value> {
        let date = self.lift(filters::parse_date(&string_arg(args, "date")?))?;
        self.lift(self.page.declare_publish_date(date))?;
        Ok(Value::Null)
    }

    fn get_resource(&self, args: &Args) -> tera::Result<Value> {
        let resource = self.dependency(&page_key(args)?)?;
        self.recorder.add_srcdep(slash_path(resource.source_path()));
        self.view_value(&resource)
    }

    fn get_image(&self, args: &Args) -> tera::Result<Value> {
        let image = self.dependency(&page_key(args)?)?;
        if !image.kind().is_visual() && !image.is_placeholder() {
            return Err(self.recorder.fail(KilnError::Render {
                template: self.page.path().to_string(),
                message: format!("`{}` is a {}, not an image", image.path(), image.kind().name()),
            }));
        }
        self.recorder.add_srcdep(slash_path(image.source_path()));
        self.recorder.add_rtdep(slash_path(image.build_path()));
        self.view_value(&image)
    }

    fn blog_entries(&self) -> tera::Result<Value> {
        let entries = self.lift(self.site.blog_entries())?;
        let mut views = Vec::with_capacity(entries.len());
        for entry in &entries {
            self.recorder.add_srcdep(slash_path(entry.source_path()));
            views.push(self.view_value(entry)?);
        }
        Ok(Value::Array(views))
    }

    fn to_rel_path(&self, value: &Value, args: &Args) -> tera::Result<Value> {
        let target = text_value(value, "to_rel_path")?;
        let check = !matches!(args.get("check"), Some(Value::Bool(false)));
        let (target_path, fragment) = split_fragment(&target);
        let links_to_self = target_path.is_empty();

        let config = self.site.config();
        if let Some(anchor) = fragment
            && self.mode == RenderMode::Output
            && config.check_anchors
            && check
        {
            let linked = if links_to_self {
                self.page.clone()
            } else {
                self.dependency(target_path)?
            };
            let anchors = self.lift(self.site.anchors(&linked))?;
            if !anchors.contains(anchor) {
                return Err(self.recorder.fail(KilnError::AnchorNotFound {
                    anchor: anchor.to_string(),
                    target: linked.path().to_string(),
                    from: self.page.path().to_string(),
                }));
            }
        }

        let full_target = if links_to_self {
            format!("{}{}", self.page.path(), &target[target_path.len()..])
        } else {
            target
        };
        Ok(Value::String(to_rel_path(
            self.page.path(),
            &full_target,
            config.omit_index_from_url,
        )))
    }

    fn highlight(&self, value: &Value, args: &Args) -> tera::Result<Value> {
        let code = text_value(value, "highlight")?;
        let language = args.get("lang").and_then(Value::as_str);
        Ok(Value::String(self.site.highlighter.highlight(&code, language)))
    }

    fn markdown(&self, value: &Value) -> tera::Result<Value> {
        let content = text_value(value, "markdown")?;
        Ok(Value::String(self.site.highlighter.markdown(&content)))
    }

    fn equation(&self, value: &Value) -> tera::Result<Value> {
        let tex = text_value(value, "equation")?;
        let markup = self.lift(self.site.collaborators.math.to_markup(&tex))?;
        Ok(Value::String(markup))
    }

    fn function(&self, tera: &mut Tera, name: &str, call: fn(&TemplateScope, &Args) -> tera::Result<Value>) {
        let scope = self.clone();
        tera.register_function(name, move |args: &Args| call(&scope, args));
    }

    fn filter(
        &self,
        tera: &mut Tera,
        name: &str,
        call: fn(&TemplateScope, &Value, &Args) -> tera::Result<Value>,
    ) {
        let scope = self.clone();
        tera.register_filter(name, move |value: &Value, args: &Args| call(&scope, value, args));
    }

    fn register(&self, tera: &mut Tera) {
        self.function(tera, "add_srcdep", Self::add_srcdep);
        self.function(tera, "add_rtdep", Self::add_rtdep);
        self.function(tera, "add_anchor", Self::add_anchor);
        self.function(tera, "set_page_type", Self::set_page_type);
        self.function(tera, "set_title", Self::set_title);
        self.function(tera, "set_description", Self::set_description);
        self.function(tera, "mark_published", Self::mark_published);
        self.function(tera, "get_resource", Self::get_resource);
        self.function(tera, "get_image", Self::get_image);
        self.function(tera, "blog_entries", |scope, _| scope.blog_entries());

        self.filter(tera, "to_rel_path", Self::to_rel_path);
        self.filter(tera, "highlight", Self::highlight);
        self.filter(tera, "markdown", |scope, value, _| scope.markdown(value));
        self.filter(tera, "equation", |scope, value, _| scope.equation(value));

        tera.register_filter("into_tag", |value: &Value, _: &Args| {
            Ok(Value::String(filters::into_tag(&text_value(value, "into_tag")?)))
        });
        tera.register_filter("friendly_date", |value: &Value, _: &Args| {
            format_date(value, filters::friendly_date)
        });
        tera.register_filter("detailed_date", |value: &Value, _: &Args| {
            format_date(value, filters::detailed_date)
        });
        tera.register_filter("drop_null_values", |value: &Value, _: &Args| match value {
            Value::Object(map) => Ok(Value::Object(filters::drop_null_values(map))),
            other => Err(tera::Error::msg(format!(
                "filter `drop_null_values` expects a mapping, got {other}"
            ))),
        });
        tera.register_filter("url_with_args", |value: &Value, args: &Args| {
            let url = text_value(value, "url_with_args")?;
            let args: serde_json::Map<String, Value> = args
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            Ok(Value::String(filters::url_with_args(&url, &args)))
        });
    }
}

fn format_date(
    value: &Value,
    format: fn(&chrono::DateTime<chrono::FixedOffset>) -> String,
) -> tera::Result<Value> {
    match value {
        Value::Null => Ok(Value::String(String::new())),
        Value::String(text) => filters::parse_date(text)
            .map(|date| Value::String(format(&date)))
            .map_err(|error| tera::Error::msg(error.to_string())),
        other => Err(tera::Error::msg(format!("expected a date, got {other}"))),
    }
}

impl Site {
    fn context(self: &Arc<Self>, page: &Arc<Page>, mode: RenderMode) -> Result<Context> {
        let mut context = Context::new();
        for (key, value) in self.config.globals()? {
            context.insert(key, &value);
        }
        for page_type in PageType::DECLARABLE {
            context.insert(page_type.tag(), page_type.tag());
        }
        context.insert("page", &self.view(page)?);
        context.insert("pages", &self.pages.links()?);
        context.insert("render_mode", mode.name());
        Ok(context)
    }

    /// Evaluates the template of `page` once with a fresh recorder.
    pub fn evaluate(self: &Arc<Self>, page: &Arc<Page>, mode: RenderMode) -> Result<(String, Recording)> {
        debug!(page = page.path(), mode = mode.name(), "evaluating template");
        let source = fs::read_to_string(page.source_path())
            .io_context("reading template", page.source_path())?;
        let name = slash_path(page.source_path());
        let render_error = |error: tera::Error| KilnError::Render {
            template: name.clone(),
            message: describe(&error),
        };

        let mut tera = self.templates.clone();
        tera.add_raw_template(&name, &source).map_err(render_error)?;

        let recorder = Recorder::new();
        let scope = TemplateScope {
            site: self.clone(),
            page: page.clone(),
            recorder: recorder.clone(),
            mode,
        };
        scope.register(&mut tera);

        let context = self.context(page, mode)?;
        let rendered = tera.render(&name, &context);
        if let Some(failure) = recorder.take_failure() {
            return Err(failure);
        }
        let rendered = rendered.map_err(render_error)?;
        Ok((rendered, recorder.finish()))
    }

    /// The type the template declares for itself, if any.
    pub fn query_type(self: &Arc<Self>, page: &Arc<Page>) -> Result<Option<PageType>> {
        let (_, recording) = self.evaluate(page, RenderMode::QueryType)?;
        Ok(recording.page_type)
    }

    pub fn query_anchors(self: &Arc<Self>, page: &Arc<Page>) -> Result<BTreeSet<String>> {
        if page.is_placeholder() || !page.kind().is_templated() {
            return Ok(page.merge_anchors(BTreeSet::new()));
        }
        self.ensure_metadata(page)?;
        let (_, recording) = self.evaluate(page, RenderMode::QueryAnchors)?;
        Ok(page.merge_anchors(recording.anchors))
    }

    pub fn query_deps(self: &Arc<Self>, page: &Arc<Page>) -> Result<Dependencies> {
        if page.is_placeholder() || !page.kind().is_templated() {
            return Ok(page.merge_dependencies(Dependencies::default()));
        }
        self.ensure_metadata(page)?;
        let (_, recording) = self.evaluate(page, RenderMode::QueryDeps)?;
        Ok(page.merge_dependencies(recording.dependencies()))
    }

    /// Final bytes of `page`: templates are evaluated (SCSS then compiled,
    /// HTML optionally minified), everything else is copied.
    pub fn render(self: &Arc<Self>, page: &Arc<Page>) -> Result<Vec<u8>> {
        let kind = page.kind();
        if !kind.is_templated() {
            return fs::read(page.source_path()).io_context("reading", page.source_path());
        }

        self.ensure_metadata(page)?;
        let (mut text, _) = self.evaluate(page, RenderMode::Output)?;

        let is_scss = page
            .source_path()
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("scss"));
        if is_scss {
            let mut options = grass::Options::default();
            if let Some(directory) = page.source_path().parent() {
                options = options.load_path(directory);
            }
            text = grass::from_string(text, &options).map_err(|error| KilnError::Stylesheet {
                path: page.source_path().to_path_buf(),
                message: error.to_string(),
            })?;
        }

        if self.config.minify && kind != Kind::Page(PageType::Stylesheet) {
            let mut cfg = minify_html::Cfg::new();
            cfg.minify_css = true;
            cfg.minify_js = true;
            cfg.keep_closing_tags = true;
            return Ok(minify_html::minify(text.as_bytes(), &cfg));
        }
        Ok(text.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::history::StaticHistory;
    use crate::markup::MarkupConverter;
    use crate::media::ImageProbe;
    use tempfile::TempDir;

    struct EchoMath;

    impl MarkupConverter for EchoMath {
        fn to_markup(&self, tex: &str) -> Result<String> {
            Ok(format!("<math>{tex}</math>"))
        }
    }

    fn site_in(dir: &TempDir, files: &[(&str, &str)]) -> Arc<Site> {
        let mut config = SiteConfig::default();
        config.build = crate::config::BuildPaths::rooted_at(dir.path());
        for (relative, content) in files {
            let path = config.build.intermediate.join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let collaborators = crate::site::Collaborators::new(StaticHistory::new(), ImageProbe::new(), EchoMath);
        Site::new(config, collaborators).unwrap()
    }

    fn render_text(site: &Arc<Site>, key: &str) -> Result<String> {
        let page = site.pages().lookup(key)?;
        Ok(String::from_utf8(site.render(&page)?).unwrap())
    }

    #[test]
    fn test_plain_text_renders_verbatim() {
        let dir = TempDir::new().unwrap();
        let site = site_in(&dir, &[("index.tera.html", "<p>hi</p>")]);
        assert_eq!(render_text(&site, "index.html").unwrap(), "<p>hi</p>");
    }

    #[test]
    fn test_dependency_calls_render_nothing() {
        let dir = TempDir::new().unwrap();
        let site = site_in(
            &dir,
            &[
                ("index.tera.html", "a{{ add_srcdep(path='img/cat.png') }}{{ add_rtdep(path='img/cat.png') }}b"),
                ("img/cat.png", ""),
            ],
        );
        assert_eq!(render_text(&site, "index.html").unwrap(), "ab");
    }

    #[test]
    fn test_query_type_defaults_to_generic() {
        let dir = TempDir::new().unwrap();
        let site = site_in(&dir, &[("about.tera.html", "about")]);
        let page = site.pages().lookup("about.html").unwrap();

        assert_eq!(site.query_type(&page).unwrap(), None);
        site.ensure_metadata(&page).unwrap();
        assert_eq!(page.kind(), Kind::Page(PageType::Generic));
    }

    #[test]
    fn test_declared_type_is_frozen() {
        let dir = TempDir::new().unwrap();
        let site = site_in(
            &dir,
            &[("post.tera.html", "{{ set_page_type(kind=BlogEntry) }}{{ set_title(value='Post') }}")],
        );
        let page = site.pages().lookup("post.html").unwrap();

        assert_eq!(site.title(&page).unwrap().as_deref(), Some("Post"));
        assert_eq!(page.resolved_kind(), Some(Kind::Page(PageType::BlogEntry)));
    }

    #[test]
    fn test_conflicting_title_fails_render() {
        let dir = TempDir::new().unwrap();
        let site = site_in(
            &dir,
            &[("post.tera.html", "{{ set_title(value='One') }}{{ set_title(value='Two') }}")],
        );
        let error = render_text(&site, "post.html").unwrap_err();
        assert!(matches!(
            error,
            KilnError::ImmutableFieldConflict { field: "title", .. }
        ));
    }

    #[test]
    fn test_template_syntax_error_is_render_error() {
        let dir = TempDir::new().unwrap();
        let site = site_in(&dir, &[("broken.tera.html", "{{ unclosed")]);
        match render_text(&site, "broken.html") {
            Err(KilnError::Render { template, .. }) => {
                assert!(template.ends_with("broken.tera.html"))
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_missing_dependency_in_output_is_not_found() {
        let dir = TempDir::new().unwrap();
        let site = site_in(&dir, &[("index.tera.html", "{{ add_rtdep(path='later.png') }}")]);
        let page = site.pages().lookup("index.html").unwrap();

        let dependencies = site.query_deps(&page).unwrap();
        assert_eq!(dependencies.rtdeps.len(), 1);
        assert!(site.render(&page).unwrap_err().is_not_found());
    }

    #[test]
    fn test_to_rel_path_filter() {
        let dir = TempDir::new().unwrap();
        let site = site_in(
            &dir,
            &[
                ("blog/post/index.tera.html", "{{ 'blog' | to_rel_path }} {{ '/res/site.css' | to_rel_path }} {{ '#top' | to_rel_path(check=false) }} {{ 'blog/other/' | to_rel_path }}"),
                ("blog/index.tera.html", ""),
                ("res/site.css", ""),
            ],
        );
        assert_eq!(
            render_text(&site, "blog/post/index.html").unwrap(),
            "../ ../../res/site.css #top ../other/"
        );
    }

    #[test]
    fn test_anchor_check() {
        let dir = TempDir::new().unwrap();
        let site = site_in(
            &dir,
            &[
                ("index.tera.html", "{{ 'about.html#team' | to_rel_path }}"),
                ("about.tera.html", "{{ add_anchor(name='team') }}<h2 id=\"team\">Team</h2>"),
                ("bad.tera.html", "{{ 'about.html#nobody' | to_rel_path }}"),
                ("unchecked.tera.html", "{{ 'about.html#nobody' | to_rel_path(check=false) }}"),
            ],
        );

        assert_eq!(render_text(&site, "index.html").unwrap(), "about.html#team");
        assert!(matches!(
            render_text(&site, "bad.html"),
            Err(KilnError::AnchorNotFound { .. })
        ));
        assert_eq!(
            render_text(&site, "unchecked.html").unwrap(),
            "about.html#nobody"
        );
        let about = site.pages().lookup("about.html").unwrap();
        assert_eq!(about.anchors().unwrap(), BTreeSet::from(["team".to_string()]));
    }

    #[test]
    fn test_links_and_rtdeps_to_unregistered_files() {
        let dir = TempDir::new().unwrap();
        let site = site_in(
            &dir,
            &[
                (
                    "index.tera.html",
                    "{{ 'files/notes.txt' | to_rel_path }}{{ add_rtdep(path='files/notes.txt') }}",
                ),
                ("files/notes.txt", "notes"),
            ],
        );
        let page = site.pages().lookup("index.html").unwrap();
        let notes_build = slash_path(&site.config().build.output.join("files/notes.txt"));

        assert_eq!(site.query_deps(&page).unwrap().rtdeps, BTreeSet::from([notes_build]));
        assert_eq!(render_text(&site, "index.html").unwrap(), "files/notes.txt");
    }

    #[test]
    fn test_links_to_unknown_paths_are_computed() {
        let dir = TempDir::new().unwrap();
        let site = site_in(
            &dir,
            &[("blog/post.tera.html", "{{ '/feed.xml' | to_rel_path }} {{ 'gone.html' | to_rel_path }}")],
        );
        assert_eq!(
            render_text(&site, "blog/post.html").unwrap(),
            "../feed.xml ../gone.html"
        );
    }

    #[test]
    fn test_metadata_of_other_pages_is_consistent() {
        let dir = TempDir::new().unwrap();
        let site = site_in(
            &dir,
            &[
                (
                    "notes.tera.html",
                    "{% set b = get_resource(path='b.html') %}{{ set_title(value=b.title) }}{{ b.title }}",
                ),
                ("b.tera.html", "{{ set_title(value='B') }}"),
            ],
        );
        let notes = site.pages().lookup("notes.html").unwrap();

        assert_eq!(site.title(&notes).unwrap().as_deref(), Some("B"));
        assert_eq!(render_text(&site, "notes.html").unwrap(), "B");
    }

    #[test]
    fn test_metadata_cycle_terminates() {
        let dir = TempDir::new().unwrap();
        let site = site_in(
            &dir,
            &[
                ("a.tera.html", "{% set b = get_resource(path='b.html') %}{{ set_title(value='A') }}"),
                ("b.tera.html", "{% set a = get_resource(path='a.html') %}{{ set_title(value='B') }}"),
            ],
        );
        let a = site.pages().lookup("a.html").unwrap();
        let b = site.pages().lookup("b.html").unwrap();

        assert_eq!(site.title(&a).unwrap().as_deref(), Some("A"));
        assert_eq!(site.title(&b).unwrap().as_deref(), Some("B"));
    }

    #[test]
    fn test_null_title_is_rejected() {
        let dir = TempDir::new().unwrap();
        let site = site_in(
            &dir,
            &[
                ("index.tera.html", "{% set b = get_resource(path='b.html') %}{{ set_title(value=b.title) }}"),
                ("b.tera.html", "untitled"),
            ],
        );
        let page = site.pages().lookup("index.html").unwrap();

        assert!(matches!(site.title(&page), Err(KilnError::Render { .. })));
        assert_eq!(page.title(), None);
    }

    #[test]
    fn test_anchor_discovery_skips_checks() {
        let dir = TempDir::new().unwrap();
        let site = site_in(
            &dir,
            &[
                (
                    "index.tera.html",
                    "<a href=\"{{ '#later' | to_rel_path }}\"></a>{{ add_anchor(name='later') }}<h2 id=\"later\"></h2>",
                ),
                ("dangling.tera.html", "<a href=\"{{ '#nowhere' | to_rel_path }}\"></a>"),
            ],
        );
        let page = site.pages().lookup("index.html").unwrap();
        assert_eq!(
            site.query_anchors(&page).unwrap(),
            BTreeSet::from(["later".to_string()])
        );
        assert_eq!(
            render_text(&site, "index.html").unwrap(),
            "<a href=\"#later\"></a><h2 id=\"later\"></h2>"
        );

        let dangling = site.pages().lookup("dangling.html").unwrap();
        assert!(site.query_anchors(&dangling).unwrap().is_empty());
        assert!(matches!(
            site.render(&dangling),
            Err(KilnError::AnchorNotFound { .. })
        ));
    }

    #[test]
    fn test_filters_are_registered() {
        let dir = TempDir::new().unwrap();
        let site = site_in(
            &dir,
            &[(
                "index.tera.html",
                "{{ 'Hello, World!' | into_tag }}|{{ '2021-03-04' | friendly_date }}|{{ 'x^2' | equation }}|{{ 'mailto:a@b.c' | url_with_args(subject='hi') }}",
            )],
        );
        assert_eq!(
            render_text(&site, "index.html").unwrap(),
            "hello-world|Mar 04, 2021|<math>x^2</math>|mailto:a@b.c?subject=hi"
        );
    }

    #[test]
    fn test_scss_compiles_after_templating() {
        let dir = TempDir::new().unwrap();
        let site = site_in(
            &dir,
            &[("res/site.tera.scss", "$accent: {{ 'red' }};\na { color: $accent; }\n")],
        );
        let css = render_text(&site, "res/site.css").unwrap();
        assert!(css.contains("color: red"));
        assert!(!css.contains('$'));
    }

    #[test]
    fn test_binary_copies_bytes() {
        let dir = TempDir::new().unwrap();
        let site = site_in(&dir, &[("fonts/body.woff2", "\u{1}font")]);
        let page = site.pages().lookup("fonts/body.woff2").unwrap();
        assert_eq!(site.render(&page).unwrap(), b"\x01font");
    }
}
