use kiln_ssg::{Collaborators, Site, emit_rules, load_config, write_if_changed};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

fn open_site(config_path: &Path) -> Result<Arc<Site>, Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let collaborators = Collaborators::system(&config);
    Ok(Site::new(config, collaborators)?)
}

pub fn render_page(
    config_path: &Path,
    source: &Path,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let site = open_site(config_path)?;
    let page = site.page(source)?;
    let bytes = site.render(&page)?;

    if write_if_changed(output, &bytes)? {
        info!(page = page.path(), output = %output.display(), "rendered");
    } else {
        info!(page = page.path(), "output unchanged");
    }
    Ok(())
}

pub fn write_deps(
    config_path: &Path,
    source: &Path,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let site = open_site(config_path)?;
    let page = site.page(source)?;
    let dependencies = site.query_deps(&page)?;
    let rules = emit_rules(&page, &dependencies, site.pages().layout())?;

    if write_if_changed(output, rules.as_bytes())? {
        info!(page = page.path(), output = %output.display(), "wrote dependencies");
    }
    Ok(())
}

pub fn print_info(config_path: &Path, source: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let site = open_site(config_path)?;
    let page = site.page(source)?;
    let info = site.info(&page)?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
