use std::path::{Component, Path, PathBuf};

const INDEX_FILE: &str = "index.html";

pub fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

/// `/` separated form of `path`; absolute paths keep their leading `/`.
pub fn slash_path(path: &Path) -> String {
    let joined = path
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");
    if path.has_root() {
        format!("/{joined}")
    } else {
        joined
    }
}

pub fn split_fragment(target: &str) -> (&str, Option<&str>) {
    match target.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (target, None),
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .collect()
}

fn is_index(relative: &str) -> bool {
    relative == INDEX_FILE || relative.ends_with(&format!("/{INDEX_FILE}"))
}

/// Hyperlink from the page at output path `from` to the output path `target`.
///
/// Both paths are relative to the output root; a leading `/` is ignored. A
/// `#fragment` on the target is carried over verbatim.
pub fn to_rel_path(from: &str, target: &str, omit_index: bool) -> String {
    let (target_path, fragment) = split_fragment(target);
    let from_segments = segments(from);
    let target_segments = segments(target_path);

    let common = from_segments
        .iter()
        .zip(&target_segments)
        .take_while(|(left, right)| left == right)
        .count();
    let climb = from_segments.len().saturating_sub(common).saturating_sub(1);

    let mut relative = "../".repeat(climb);
    relative.push_str(&target_segments[common..].join("/"));
    if target_path.ends_with('/') && common < target_segments.len() {
        relative.push('/');
    }

    let mut stripped_index = false;
    if omit_index && is_index(&relative) {
        relative.truncate(relative.len() - INDEX_FILE.len());
        stripped_index = true;
    }

    if relative.is_empty() {
        relative = if stripped_index && from_segments != target_segments {
            "./".to_string()
        } else {
            "#".to_string()
        };
    }

    match fragment {
        Some(fragment) if relative == "#" => format!("#{fragment}"),
        Some(fragment) => format!("{relative}#{fragment}"),
        None => relative,
    }
}
