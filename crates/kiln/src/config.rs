use crate::error::{IoContext, KilnError, Result};
use crate::links::normalize;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildPaths {
    #[serde(default = "default_intermediate")]
    pub intermediate: PathBuf,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default = "default_templates")]
    pub templates: PathBuf,
    #[serde(default = "default_cache")]
    pub cache: PathBuf,
}

fn default_intermediate() -> PathBuf {
    PathBuf::from("build/intermediate")
}

fn default_output() -> PathBuf {
    PathBuf::from("build/output")
}

fn default_templates() -> PathBuf {
    PathBuf::from("templates")
}

fn default_cache() -> PathBuf {
    PathBuf::from("build/cache")
}

impl Default for BuildPaths {
    fn default() -> Self {
        Self {
            intermediate: default_intermediate(),
            output: default_output(),
            templates: default_templates(),
            cache: default_cache(),
        }
    }
}

impl BuildPaths {
    pub fn rooted_at(root: &Path) -> Self {
        let defaults = Self::default();
        Self {
            intermediate: root.join(defaults.intermediate),
            output: root.join(defaults.output),
            templates: root.join(defaults.templates),
            cache: root.join(defaults.cache),
        }
    }

    pub fn relative_to_intermediate(&self, path: &Path) -> Result<PathBuf> {
        strip_root(path, &self.intermediate)
    }

    pub fn output_to_intermediate(&self, build_path: &Path) -> Result<PathBuf> {
        strip_root(build_path, &self.output).map(|relative| self.intermediate.join(relative))
    }
}

fn strip_root(path: &Path, root: &Path) -> Result<PathBuf> {
    normalize(path)
        .strip_prefix(normalize(root))
        .map(Path::to_path_buf)
        .map_err(|_| KilnError::InvalidPath {
            path: path.to_path_buf(),
        })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub build: BuildPaths,
    #[serde(default)]
    pub omit_index_from_url: bool,
    #[serde(default = "default_check_anchors")]
    pub check_anchors: bool,
    #[serde(default)]
    pub minify: bool,
    #[serde(default)]
    pub source_repo: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_check_anchors() -> bool {
    true
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            build: BuildPaths::default(),
            omit_index_from_url: false,
            check_anchors: default_check_anchors(),
            minify: false,
            source_repo: None,
            extra: Map::new(),
        }
    }
}

impl SiteConfig {
    /// Every top-level key, including the site-specific extras, as template globals.
    pub fn globals(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }

    pub fn comment_email(&self) -> Option<&str> {
        self.extra
            .get("social")
            .and_then(|social| social.get("comment_email"))
            .and_then(Value::as_str)
    }
}

pub fn load_config(config_path: &Path) -> Result<SiteConfig> {
    if !config_path.exists() {
        return Err(KilnError::ConfigNotFound {
            path: config_path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(config_path).io_context("reading config", config_path)?;

    let is_toml = config_path
        .extension()
        .map(|extension| extension == "toml")
        .unwrap_or(false);

    if is_toml {
        toml::from_str(&content).map_err(|error| KilnError::TomlParse {
            path: config_path.to_path_buf(),
            message: error.to_string(),
        })
    } else {
        serde_json::from_str(&content).map_err(|error| KilnError::JsonParse {
            path: config_path.to_path_buf(),
            message: error.to_string(),
        })
    }
}
