pub mod classify;
pub mod config;
pub mod deps;
pub mod error;
pub mod filters;
pub mod history;
pub mod links;
pub mod markup;
pub mod media;
pub mod page;
pub mod pages;
pub mod recorder;
pub mod render;
pub mod site;

pub use classify::{Kind, PageType, classify};
pub use config::{BuildPaths, SiteConfig, load_config};
pub use deps::{deps_path, emit_rules, write_if_changed};
pub use error::*;
pub use history::{GitHistory, SourceHistory, StaticHistory};
pub use links::to_rel_path;
pub use markup::{Highlighter, KatexConverter, MarkupConverter};
pub use media::{ImageProbe, MediaProbe};
pub use page::{Author, Dependencies, Dimensions, History, Page, PageView};
pub use pages::Pages;
pub use recorder::RenderMode;
pub use site::{Collaborators, PageInfo, Site};
