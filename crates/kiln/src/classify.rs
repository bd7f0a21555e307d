use crate::error::{KilnError, Result};
use serde::Serialize;
use std::path::Path;

pub const TEMPLATE_MARKER: &str = ".tera.";

const IMAGE_EXTENSIONS: &[&str] = &["gif", "jpg", "jpeg", "png", "svg"];
const VIDEO_EXTENSIONS: &[&str] = &["webm"];
const AUDIO_EXTENSIONS: &[&str] = &["ogg"];
const FONT_EXTENSIONS: &[&str] = &["eot", "ttf", "woff", "woff2"];
const STYLESHEET_EXTENSIONS: &[&str] = &["css", "scss"];
const MARKUP_EXTENSIONS: &[&str] = &["html", "htm", "xml"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    Generic,
    BlogEntry,
    Home,
    About,
    Stylesheet,
}

impl PageType {
    /// Types a template may declare for itself with `set_page_type`.
    pub const DECLARABLE: [PageType; 4] = [
        PageType::Generic,
        PageType::BlogEntry,
        PageType::Home,
        PageType::About,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            PageType::Generic => "Generic",
            PageType::BlogEntry => "BlogEntry",
            PageType::Home => "HomePage",
            PageType::About => "AboutPage",
            PageType::Stylesheet => "Stylesheet",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::DECLARABLE
            .into_iter()
            .find(|page_type| page_type.tag() == tag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindClass {
    Page,
    Image,
    Audio,
    Font,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Page(PageType),
    Image { video: bool },
    Audio,
    Font,
    Binary,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::Page(_) => "page",
            Kind::Image { .. } => "image",
            Kind::Audio => "audio",
            Kind::Font => "font",
            Kind::Binary => "binary",
        }
    }

    pub fn class(self) -> KindClass {
        match self {
            Kind::Page(_) => KindClass::Page,
            Kind::Image { .. } => KindClass::Image,
            Kind::Audio => KindClass::Audio,
            Kind::Font => KindClass::Font,
            Kind::Binary => KindClass::Binary,
        }
    }

    pub fn page_type(self) -> Option<PageType> {
        match self {
            Kind::Page(page_type) => Some(page_type),
            _ => None,
        }
    }

    pub fn is_templated(self) -> bool {
        matches!(self, Kind::Page(_))
    }

    pub fn is_visual(self) -> bool {
        matches!(self, Kind::Image { .. })
    }

    pub fn is_video(self) -> bool {
        matches!(self, Kind::Image { video: true })
    }
}

fn lowercase_extension(path: &Path) -> String {
    path.extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default()
}

pub fn is_template(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().contains(TEMPLATE_MARKER))
        .unwrap_or(false)
}

/// Decides how a resource is produced from its file name alone.
///
/// Markup templates come back as `Page(Generic)`; their real type is only
/// known once the template has been evaluated.
pub fn classify(path: &Path) -> Result<Kind> {
    let extension = lowercase_extension(path);
    let extension = extension.as_str();

    if is_template(path) {
        return if STYLESHEET_EXTENSIONS.contains(&extension) {
            Ok(Kind::Page(PageType::Stylesheet))
        } else if MARKUP_EXTENSIONS.contains(&extension) {
            Ok(Kind::Page(PageType::Generic))
        } else {
            Err(KilnError::UnsupportedKind {
                path: path.to_path_buf(),
            })
        };
    }

    if IMAGE_EXTENSIONS.contains(&extension) {
        Ok(Kind::Image { video: false })
    } else if VIDEO_EXTENSIONS.contains(&extension) {
        Ok(Kind::Image { video: true })
    } else if AUDIO_EXTENSIONS.contains(&extension) {
        Ok(Kind::Audio)
    } else if FONT_EXTENSIONS.contains(&extension) {
        Ok(Kind::Font)
    } else if STYLESHEET_EXTENSIONS.contains(&extension) {
        Ok(Kind::Page(PageType::Stylesheet))
    } else if MARKUP_EXTENSIONS.contains(&extension) {
        Err(KilnError::UnsupportedKind {
            path: path.to_path_buf(),
        })
    } else {
        Ok(Kind::Binary)
    }
}

/// File name of the artifact produced from `file_name`: the template marker is
/// stripped and SCSS compiles to CSS.
pub fn intermediate_name(file_name: &str) -> String {
    if let Some(position) = file_name.rfind(TEMPLATE_MARKER) {
        let base = &file_name[..position];
        let extension = &file_name[position + TEMPLATE_MARKER.len()..];
        let extension = if extension.eq_ignore_ascii_case("scss") {
            "css"
        } else {
            extension
        };
        let suffix = format!(".{extension}");
        return if base.ends_with(&suffix) {
            base.to_string()
        } else {
            format!("{base}{suffix}")
        };
    }

    match file_name.strip_suffix(".scss") {
        Some(stem) => format!("{stem}.css"),
        None => file_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_media() {
        assert_eq!(
            classify(Path::new("img/cat.png")).unwrap(),
            Kind::Image { video: false }
        );
        assert_eq!(
            classify(Path::new("img/diagram.SVG")).unwrap(),
            Kind::Image { video: false }
        );
        assert_eq!(
            classify(Path::new("clip.webm")).unwrap(),
            Kind::Image { video: true }
        );
        assert_eq!(classify(Path::new("song.ogg")).unwrap(), Kind::Audio);
        assert_eq!(classify(Path::new("font.woff2")).unwrap(), Kind::Font);
    }

    #[test]
    fn test_classify_templates() {
        assert_eq!(
            classify(Path::new("blog/index.tera.html")).unwrap(),
            Kind::Page(PageType::Generic)
        );
        assert_eq!(
            classify(Path::new("res/style.css")).unwrap(),
            Kind::Page(PageType::Stylesheet)
        );
        assert_eq!(
            classify(Path::new("res/theme.tera.scss")).unwrap(),
            Kind::Page(PageType::Stylesheet)
        );
    }

    #[test]
    fn test_plain_html_is_unsupported() {
        assert!(matches!(
            classify(Path::new("blog/index.html")),
            Err(KilnError::UnsupportedKind { .. })
        ));
    }

    #[test]
    fn test_unknown_extension_is_binary() {
        assert_eq!(classify(Path::new("files/archive.tar.gz")).unwrap(), Kind::Binary);
        assert_eq!(classify(Path::new("CNAME")).unwrap(), Kind::Binary);
    }

    #[test]
    fn test_intermediate_name() {
        assert_eq!(intermediate_name("index.tera.html"), "index.html");
        assert_eq!(intermediate_name("index.html.tera.html"), "index.html");
        assert_eq!(intermediate_name("style.tera.scss"), "style.css");
        assert_eq!(intermediate_name("style.scss"), "style.css");
        assert_eq!(intermediate_name("cat.png"), "cat.png");
    }

    #[test]
    fn test_page_type_tags() {
        assert_eq!(PageType::from_tag("BlogEntry"), Some(PageType::BlogEntry));
        assert_eq!(PageType::from_tag("HomePage"), Some(PageType::Home));
        assert_eq!(PageType::from_tag("Stylesheet"), None);
        assert_eq!(PageType::from_tag("Nope"), None);
    }
}
