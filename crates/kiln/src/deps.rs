use crate::config::BuildPaths;
use crate::error::{IoContext, Result};
use crate::links::slash_path;
use crate::page::{Dependencies, Page};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEPS_EXTENSION: &str = "deps";

/// Location of the rule fragment for an intermediate artifact.
pub fn deps_path(intermediate_path: &Path) -> PathBuf {
    let mut path = intermediate_path.as_os_str().to_owned();
    path.push(".");
    path.push(DEPS_EXTENSION);
    PathBuf::from(path)
}

fn escape_make(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len());
    for character in path.chars() {
        match character {
            ' ' => escaped.push_str("\\ "),
            '$' => escaped.push_str("$$"),
            '#' => escaped.push_str("\\#"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn variable_name(path: &str) -> String {
    path.chars()
        .map(|character| match character {
            ':' | '#' | '=' => '_',
            other if other.is_whitespace() => '_',
            other => other,
        })
        .collect()
}

/// Make rules for `page`: how to rebuild its intermediate artifact, and the
/// transitive set of output files it needs at runtime.
///
/// Runtime dependencies are resolved through the `.deps` fragments of the
/// pages they name, so each fragment is wrapped in an include guard.
pub fn emit_rules(page: &Page, dependencies: &Dependencies, layout: &BuildPaths) -> Result<String> {
    let own_source = slash_path(page.source_path());
    let own_build = slash_path(page.build_path());
    let intermediate = slash_path(page.intermediate_path());
    let variable = variable_name(&own_build);

    let srcdeps: Vec<&String> = dependencies
        .srcdeps
        .iter()
        .filter(|source| **source != own_source)
        .collect();

    let mut rtdeps = Vec::new();
    for build in &dependencies.rtdeps {
        if *build == own_build {
            continue;
        }
        let dep_intermediate = layout.output_to_intermediate(Path::new(build))?;
        rtdeps.push((build, slash_path(&deps_path(&dep_intermediate))));
    }

    let mut rules = String::new();
    let _ = writeln!(rules, "# Dependencies of {}, generated by kiln", page.path());
    let _ = writeln!(rules, "ifndef KILN_DEPS_{variable}");
    let _ = writeln!(rules, "KILN_DEPS_{variable} := 1");

    let _ = write!(rules, "{}: {}", escape_make(&intermediate), escape_make(&own_source));
    for source in &srcdeps {
        let _ = write!(rules, " \\\n    {}", escape_make(source));
    }
    rules.push('\n');

    for (_, deps_file) in &rtdeps {
        let _ = writeln!(rules, "-include {}", escape_make(deps_file));
    }

    let _ = write!(rules, "RT_DEPS_{variable} := $(sort {}", escape_make(&own_build));
    for (build, _) in &rtdeps {
        let _ = write!(rules, " $(RT_DEPS_{})", variable_name(build));
    }
    rules.push_str(")\n");
    rules.push_str("endif\n");

    Ok(rules)
}

/// Writes `contents` unless the file already holds exactly those bytes, so
/// unchanged rule files keep their timestamps.
pub fn write_if_changed(path: &Path, contents: &[u8]) -> Result<bool> {
    if let Ok(existing) = fs::read(path)
        && existing == contents
    {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).io_context("creating directory", parent)?;
    }
    fs::write(path, contents).io_context("writing", path)?;
    Ok(true)
}
