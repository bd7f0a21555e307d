use crate::error::{IoContext, KilnError, Result};
use parking_lot::Mutex;
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;
use tracing::debug;

const THEME: &str = "base16-ocean.dark";

pub struct Highlighter {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Highlighter {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("Highlighter").finish_non_exhaustive()
    }
}

impl Highlighter {
    pub fn new() -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
        }
    }

    /// Highlighted `<pre>` block, or an escaped plain block for unknown languages.
    pub fn highlight(&self, code: &str, language: Option<&str>) -> String {
        let syntax = language
            .filter(|language| !language.is_empty())
            .and_then(|language| self.syntax_set.find_syntax_by_token(language));
        let theme = self.theme_set.themes.get(THEME);

        if let (Some(syntax), Some(theme)) = (syntax, theme)
            && let Ok(html) = highlighted_html_for_string(code, &self.syntax_set, syntax, theme)
        {
            return html;
        }

        match language.filter(|language| !language.is_empty()) {
            Some(language) => format!(
                "<pre><code class=\"language-{}\">{}</code></pre>",
                escape_html(language),
                escape_html(code)
            ),
            None => format!("<pre><code>{}</code></pre>", escape_html(code)),
        }
    }

    pub fn markdown(&self, content: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

        let mut events = Vec::new();
        let mut code_block: Option<(Option<String>, String)> = None;

        for event in Parser::new_ext(content, options) {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let language = match kind {
                        CodeBlockKind::Fenced(language) if !language.is_empty() => {
                            Some(language.to_string())
                        }
                        _ => None,
                    };
                    code_block = Some((language, String::new()));
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some((language, code)) = code_block.take() {
                        let html = self.highlight(&code, language.as_deref());
                        events.push(Event::Html(CowStr::from(html)));
                    }
                }
                Event::Text(text) if code_block.is_some() => {
                    if let Some((_, code)) = code_block.as_mut() {
                        code.push_str(&text);
                    }
                }
                other => events.push(other),
            }
        }

        let mut html = String::new();
        pulldown_cmark::html::push_html(&mut html, events.into_iter());
        html
    }
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Converts TeX source to HTML markup.
pub trait MarkupConverter: Send + Sync {
    fn to_markup(&self, tex: &str) -> Result<String>;
}

/// Runs the `katex` CLI, caching results by content hash in memory and on disk.
#[derive(Debug)]
pub struct KatexConverter {
    cache_dir: PathBuf,
    memo: Mutex<HashMap<String, String>>,
}

impl KatexConverter {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            memo: Mutex::new(HashMap::new()),
        }
    }

    fn run_katex(&self, tex: &str) -> Result<String> {
        let command_error = |message: String| KilnError::Command {
            command: "katex".to_string(),
            message,
        };

        let mut child = Command::new("katex")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| command_error(error.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(tex.as_bytes())
                .map_err(|error| command_error(error.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|error| command_error(error.to_string()))?;
        if !output.status.success() {
            return Err(command_error(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }
}

pub fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

impl MarkupConverter for KatexConverter {
    fn to_markup(&self, tex: &str) -> Result<String> {
        let hash = content_hash(tex);
        if let Some(html) = self.memo.lock().get(&hash) {
            return Ok(html.clone());
        }

        let cache_path = self.cache_dir.join(format!("{hash}.html"));
        let html = if cache_path.is_file() {
            fs::read_to_string(&cache_path).io_context("reading equation cache", &cache_path)?
        } else {
            debug!(hash = %hash, "rendering equation");
            let html = self.run_katex(tex)?;
            fs::create_dir_all(&self.cache_dir)
                .io_context("creating equation cache", &self.cache_dir)?;
            fs::write(&cache_path, &html).io_context("writing equation cache", &cache_path)?;
            html
        };

        self.memo.lock().insert(hash, html.clone());
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_highlight_known_language() {
        let html = Highlighter::new().highlight("fn main() {}", Some("rs"));
        assert!(html.starts_with("<pre"));
        assert!(html.contains("main"));
        assert!(!html.contains("language-rs"));
    }

    #[test]
    fn test_highlight_unknown_language_is_escaped() {
        let html = Highlighter::new().highlight("<b>", Some("nolang"));
        assert_eq!(
            html,
            "<pre><code class=\"language-nolang\">&lt;b&gt;</code></pre>"
        );
    }

    #[test]
    fn test_markdown_highlights_code_blocks() {
        let html = Highlighter::new().markdown("# Title\n\n```nolang\na < b\n```\n\nText `x`\n");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<pre><code class=\"language-nolang\">a &lt; b\n</code></pre>"));
        assert!(html.contains("<code>x</code>"));
    }

    #[test]
    fn test_content_hash_is_stable() {
        assert_eq!(content_hash("x^2"), content_hash("x^2"));
        assert_ne!(content_hash("x^2"), content_hash("x^3"));
        assert_eq!(content_hash("").len(), 64);
    }

    #[test]
    fn test_katex_reads_disk_cache() {
        let dir = TempDir::new().unwrap();
        let tex = "e^{i\\pi} + 1 = 0";
        fs::write(
            dir.path().join(format!("{}.html", content_hash(tex))),
            "<span>cached</span>",
        )
        .unwrap();

        let converter = KatexConverter::new(dir.path());
        assert_eq!(converter.to_markup(tex).unwrap(), "<span>cached</span>");
    }
}
