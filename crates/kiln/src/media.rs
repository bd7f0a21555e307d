use crate::error::{IoContext, KilnError, Result};
use crate::page::Dimensions;
use std::fs;
use std::path::Path;
use std::process::Command;

pub trait MediaProbe: Send + Sync {
    fn dimensions_of(&self, source: &Path, video: bool) -> Result<Dimensions>;
}

/// Raster images through `image`, SVG through `usvg`, video through `ffprobe`.
#[derive(Debug, Default, Clone)]
pub struct ImageProbe;

impl ImageProbe {
    pub fn new() -> Self {
        Self
    }

    fn raster(&self, source: &Path) -> Result<Dimensions> {
        let (width, height) =
            image::image_dimensions(source).map_err(|error| KilnError::Media {
                path: source.to_path_buf(),
                message: error.to_string(),
            })?;
        Ok(Dimensions { width, height })
    }

    fn vector(&self, source: &Path) -> Result<Dimensions> {
        let data = fs::read(source).io_context("reading svg", source)?;
        let tree = usvg::Tree::from_data(&data, &usvg::Options::default()).map_err(|error| {
            KilnError::Media {
                path: source.to_path_buf(),
                message: error.to_string(),
            }
        })?;
        let size = tree.size();
        Ok(Dimensions {
            width: size.width().round() as u32,
            height: size.height().round() as u32,
        })
    }

    fn video(&self, source: &Path) -> Result<Dimensions> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height",
                "-of",
                "csv=s=x:p=0",
            ])
            .arg(source)
            .output()
            .map_err(|error| KilnError::Command {
                command: "ffprobe".to_string(),
                message: error.to_string(),
            })?;

        if !output.status.success() {
            return Err(KilnError::Command {
                command: "ffprobe".to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_probe_output(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
            KilnError::Media {
                path: source.to_path_buf(),
                message: "ffprobe reported no video stream".to_string(),
            }
        })
    }
}

fn parse_probe_output(output: &str) -> Option<Dimensions> {
    let line = output.lines().find(|line| !line.trim().is_empty())?;
    let (width, height) = line.trim().split_once('x')?;
    Some(Dimensions {
        width: width.parse().ok()?,
        height: height.parse().ok()?,
    })
}

impl MediaProbe for ImageProbe {
    fn dimensions_of(&self, source: &Path, video: bool) -> Result<Dimensions> {
        if video {
            return self.video(source);
        }
        let is_svg = source
            .extension()
            .map(|extension| extension.eq_ignore_ascii_case("svg"))
            .unwrap_or(false);
        if is_svg {
            self.vector(source)
        } else {
            self.raster(source)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_raster_dimensions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cat.png");
        image::RgbImage::new(64, 32).save(&path).unwrap();

        let dimensions = ImageProbe::new().dimensions_of(&path, false).unwrap();
        assert_eq!(dimensions, Dimensions { width: 64, height: 32 });
    }

    #[test]
    fn test_svg_dimensions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("diagram.svg");
        fs::write(
            &path,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="120" height="40"><rect width="10" height="10"/></svg>"#,
        )
        .unwrap();

        let dimensions = ImageProbe::new().dimensions_of(&path, false).unwrap();
        assert_eq!(dimensions, Dimensions { width: 120, height: 40 });
    }

    #[test]
    fn test_unreadable_image_is_media_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.png");
        fs::write(&path, "not a png").unwrap();
        assert!(matches!(
            ImageProbe::new().dimensions_of(&path, false),
            Err(KilnError::Media { .. })
        ));
    }

    #[test]
    fn test_parse_probe_output() {
        assert_eq!(
            parse_probe_output("1920x1080\n"),
            Some(Dimensions { width: 1920, height: 1080 })
        );
        assert_eq!(parse_probe_output(""), None);
        assert_eq!(parse_probe_output("N/A"), None);
    }
}
