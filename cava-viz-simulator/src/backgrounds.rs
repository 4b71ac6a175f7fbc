use anyhow::Context;
use cava_pipe::config::MAX_MODES;
use cava_pipe::RenderError;
use embedded_graphics::{pixelcolor::Rgb888, prelude::*, primitives::Rectangle};
use image::imageops::FilterType;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A background image already scaled to the screen.
pub struct Background {
    pub path: PathBuf,
    area: Rectangle,
    pixels: Vec<Rgb888>,
}

impl Background {
    pub fn load(path: &Path, size: Size) -> anyhow::Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("failed to decode {}", path.display()))?
            .resize_exact(size.width, size.height, FilterType::Triangle)
            .to_rgb8();

        let pixels = image
            .pixels()
            .map(|p| Rgb888::new(p[0], p[1], p[2]))
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            area: Rectangle::new(Point::zero(), size),
            pixels,
        })
    }

    pub fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        target.fill_contiguous(&self.area, self.pixels.iter().copied())
    }
}

/// Every `*.png` directly inside `dir`, sorted by path.
pub fn discover(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("[backgrounds] cannot read {}: {err}", dir.display());
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
        })
        .collect();
    paths.sort();
    paths
}

/// Loads the backgrounds the number keys can select.
///
/// Unreadable images are skipped. Ending up with none is fatal, there is
/// nothing to draw on.
pub fn load_all(dir: &Path, size: Size) -> Result<Vec<Background>, RenderError> {
    let mut paths = discover(dir);
    if paths.len() > MAX_MODES {
        warn!(
            "[backgrounds] {} images found, only the first {MAX_MODES} are selectable",
            paths.len()
        );
        paths.truncate(MAX_MODES);
    }

    let backgrounds: Vec<Background> = paths
        .iter()
        .filter_map(|path| match Background::load(path, size) {
            Ok(background) => Some(background),
            Err(err) => {
                warn!("[backgrounds] skipping: {err:#}");
                None
            }
        })
        .collect();

    if backgrounds.is_empty() {
        return Err(RenderError::NoBackgrounds(dir.to_path_buf()));
    }
    for (index, background) in backgrounds.iter().enumerate() {
        info!("[backgrounds] key {} -> {}", index + 1, background.path.display());
    }
    Ok(backgrounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(path: &Path, color: [u8; 3]) {
        image::RgbImage::from_pixel(4, 2, image::Rgb(color))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_discover_sorts_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("b.png"), [0, 0, 0]);
        write_png(&dir.path().join("a.PNG"), [0, 0, 0]);
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let names: Vec<_> = discover(dir.path())
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.PNG", "b.png"]);
    }

    #[test]
    fn test_empty_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_all(dir.path(), Size::new(8, 8)),
            Err(RenderError::NoBackgrounds(_))
        ));
    }

    #[test]
    fn test_corrupt_image_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("0-broken.png"), b"not a png").unwrap();
        write_png(&dir.path().join("1-red.png"), [255, 0, 0]);

        let backgrounds = load_all(dir.path(), Size::new(8, 4)).unwrap();
        assert_eq!(backgrounds.len(), 1);
        assert_eq!(backgrounds[0].pixels.len(), 32);
        assert!(backgrounds[0]
            .pixels
            .iter()
            .all(|p| p.r() >= 250 && p.g() <= 5 && p.b() <= 5));
    }
}
