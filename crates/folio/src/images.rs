use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use image::{DynamicImage, ImageReader};
use rayon::prelude::*;

use crate::error::{FolioError, IoContext, Result};

pub const DEFAULT_IMAGE_DIR: &str = "public/opt/images";
pub const DEFAULT_QUALITY: u8 = 80;
pub const SOURCE_EXTENSIONS: &[&str] = &["jpg", "png", "jpeg"];
const OUTPUT_EXTENSION: &str = "webp";

#[derive(Debug, Clone)]
pub struct ImageOptions {
    pub source_dir: PathBuf,
    pub destination: PathBuf,
    pub quality: u8,
    pub extensions: Vec<String>,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self::for_root(Path::new("."))
    }
}

impl ImageOptions {
    /// The fixed optimizer settings, resolved against a project root.
    pub fn for_root(root: &Path) -> Self {
        Self {
            source_dir: root.join(DEFAULT_IMAGE_DIR),
            destination: root.join(DEFAULT_IMAGE_DIR),
            quality: DEFAULT_QUALITY,
            extensions: SOURCE_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        }
    }

    fn is_source_image(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|extension| extension.to_str())
            .map(|extension| {
                self.extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(extension))
            })
            .unwrap_or(false)
    }

    fn output_path(&self, source: &Path) -> Option<PathBuf> {
        let mut file_name = source.file_stem()?.to_os_string();
        file_name.push(".");
        file_name.push(OUTPUT_EXTENSION);
        Some(self.destination.join(file_name))
    }
}

#[derive(Debug, Clone)]
pub struct ConvertedImage {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
}

#[derive(Debug, Clone, Default)]
pub struct OptimizeReport {
    pub converted: Vec<ConvertedImage>,
}

impl OptimizeReport {
    pub fn total_bytes(&self) -> usize {
        self.converted.iter().map(|image| image.bytes).sum()
    }
}

/// Files directly inside the source directory with an accepted extension,
/// sorted by path.
pub fn find_source_images(options: &ImageOptions) -> Result<Vec<PathBuf>> {
    if !options.source_dir.is_dir() {
        tracing::warn!(
            "image directory {} does not exist, nothing to optimize",
            options.source_dir.display()
        );
        return Ok(Vec::new());
    }

    let mut image_paths = Vec::new();
    for entry in WalkDir::new(&options.source_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
    {
        let entry = entry.map_err(|error| FolioError::WalkDir {
            path: options.source_dir.clone(),
            message: error.to_string(),
        })?;

        let path = entry.path();
        if path.is_file() && options.is_source_image(path) {
            image_paths.push(path.to_path_buf());
        }
    }

    image_paths.sort();
    Ok(image_paths)
}

/// Pairs each source with its output path, refusing two sources that would
/// write the same file.
fn plan_outputs(options: &ImageOptions, sources: Vec<PathBuf>) -> Result<Vec<(PathBuf, PathBuf)>> {
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
    let mut plan = Vec::with_capacity(sources.len());

    for source in sources {
        let output = options
            .output_path(&source)
            .ok_or_else(|| FolioError::conversion(&source, "source has no file name"))?;

        if let Some(existing) = claimed.get(&output) {
            return Err(FolioError::conversion(
                &source,
                format!(
                    "output {} would also be written from {}",
                    output.display(),
                    existing.display()
                ),
            ));
        }

        claimed.insert(output.clone(), source.clone());
        plan.push((source, output));
    }

    Ok(plan)
}

/// Re-encodes every source image as WebP. The first failing image aborts the
/// batch; outputs already written stay on disk.
pub fn optimize_images(options: &ImageOptions) -> Result<OptimizeReport> {
    let sources = find_source_images(options)?;
    let plan = plan_outputs(options, sources)?;

    if plan.is_empty() {
        return Ok(OptimizeReport::default());
    }

    fs::create_dir_all(&options.destination)
        .io_context("creating image destination", &options.destination)?;

    tracing::info!(
        count = plan.len(),
        quality = options.quality,
        "converting images in {}",
        options.source_dir.display()
    );

    let converted = plan
        .par_iter()
        .map(|(source, output)| convert_image(source, output, options.quality))
        .collect::<Result<Vec<_>>>()?;

    Ok(OptimizeReport { converted })
}

pub fn convert_image(source: &Path, output: &Path, quality: u8) -> Result<ConvertedImage> {
    let source_image = ImageReader::open(source)
        .map_err(|error| FolioError::conversion(source, error))?
        .with_guessed_format()
        .map_err(|error| FolioError::conversion(source, error))?
        .decode()
        .map_err(|error| FolioError::conversion(source, error))?;

    let encoded = encode_webp(&source_image, quality)
        .map_err(|message| FolioError::conversion(source, message))?;

    fs::write(output, &encoded).map_err(|error| FolioError::conversion(output, error))?;

    tracing::debug!(
        bytes = encoded.len(),
        "wrote {} from {}",
        output.display(),
        source.display()
    );

    Ok(ConvertedImage {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        width: source_image.width(),
        height: source_image.height(),
        bytes: encoded.len(),
    })
}

fn encode_webp(image: &DynamicImage, quality: u8) -> std::result::Result<Vec<u8>, String> {
    let (width, height) = (image.width(), image.height());

    let encoded = if image.color().has_alpha() {
        let rgba_image = image.to_rgba8();
        webp::Encoder::from_rgba(rgba_image.as_raw(), width, height)
            .encode_simple(false, quality as f32)
            .map(|memory| memory.to_vec())
    } else {
        let rgb_image = image.to_rgb8();
        webp::Encoder::from_rgb(rgb_image.as_raw(), width, height)
            .encode_simple(false, quality as f32)
            .map(|memory| memory.to_vec())
    };

    encoded.map_err(|error| format!("WebP encoding failed: {error:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use tempfile::TempDir;

    fn options(dir: &TempDir) -> ImageOptions {
        ImageOptions::for_root(dir.path())
    }

    fn write_sample_images(dir: &TempDir) -> PathBuf {
        let image_dir = dir.path().join(DEFAULT_IMAGE_DIR);
        fs::create_dir_all(&image_dir).unwrap();

        let photo = RgbImage::from_fn(48, 32, |x, y| Rgb([(x * 5) as u8, (y * 7) as u8, 128]));
        photo
            .save_with_format(image_dir.join("photo.jpg"), ImageFormat::Jpeg)
            .unwrap();

        let logo = RgbaImage::from_fn(16, 16, |x, y| {
            Rgba([255, (x * 16) as u8, (y * 16) as u8, 200])
        });
        logo.save_with_format(image_dir.join("logo.png"), ImageFormat::Png)
            .unwrap();

        image_dir
    }

    #[test]
    fn test_default_options() {
        let options = ImageOptions::default();
        assert_eq!(options.quality, 80);
        assert_eq!(options.extensions, vec!["jpg", "png", "jpeg"]);
        assert_eq!(options.source_dir, options.destination);
    }

    #[test]
    fn test_is_source_image() {
        let options = ImageOptions::default();
        assert!(options.is_source_image(Path::new("photo.jpg")));
        assert!(options.is_source_image(Path::new("photo.jpeg")));
        assert!(options.is_source_image(Path::new("photo.PNG")));
        assert!(!options.is_source_image(Path::new("photo.gif")));
        assert!(!options.is_source_image(Path::new("photo.webp")));
        assert!(!options.is_source_image(Path::new("readme")));
    }

    #[test]
    fn test_output_path_keeps_dotted_stem() {
        let options = ImageOptions::default();
        assert_eq!(
            options.output_path(Path::new("shots/team.offsite.jpeg")),
            Some(options.destination.join("team.offsite.webp"))
        );
    }

    #[test]
    fn test_find_source_images_is_not_recursive() {
        let dir = TempDir::new().unwrap();
        let image_dir = write_sample_images(&dir);
        fs::create_dir_all(image_dir.join("nested")).unwrap();
        fs::write(image_dir.join("nested/skip.jpg"), b"ignored").unwrap();
        fs::write(image_dir.join("notes.txt"), b"ignored").unwrap();

        let found = find_source_images(&options(&dir)).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["logo.png", "photo.jpg"]);
    }

    #[test]
    fn test_optimize_images_writes_webp() {
        let dir = TempDir::new().unwrap();
        let image_dir = write_sample_images(&dir);

        let report = optimize_images(&options(&dir)).unwrap();
        assert_eq!(report.converted.len(), 2);
        assert!(report.total_bytes() > 0);

        for name in ["photo.webp", "logo.webp"] {
            let output = image_dir.join(name);
            let bytes = fs::read(&output).unwrap();
            assert_eq!(&bytes[0..4], b"RIFF");
            assert_eq!(&bytes[8..12], b"WEBP");
        }

        assert!(image_dir.join("photo.jpg").exists());
        assert!(image_dir.join("logo.png").exists());

        let photo = report
            .converted
            .iter()
            .find(|image| image.output.ends_with("photo.webp"))
            .unwrap();
        assert_eq!((photo.width, photo.height), (48, 32));
    }

    #[test]
    fn test_optimize_images_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let image_dir = write_sample_images(&dir);

        optimize_images(&options(&dir)).unwrap();
        let first = fs::read(image_dir.join("photo.webp")).unwrap();

        let report = optimize_images(&options(&dir)).unwrap();
        let second = fs::read(image_dir.join("photo.webp")).unwrap();

        assert_eq!(report.converted.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_separate_destination() {
        let dir = TempDir::new().unwrap();
        write_sample_images(&dir);
        let mut options = options(&dir);
        options.destination = dir.path().join("out");

        optimize_images(&options).unwrap();
        assert!(dir.path().join("out/photo.webp").exists());
        assert!(!dir.path().join(DEFAULT_IMAGE_DIR).join("photo.webp").exists());
    }

    #[test]
    fn test_corrupt_image_aborts_batch() {
        let dir = TempDir::new().unwrap();
        let image_dir = write_sample_images(&dir);
        fs::write(image_dir.join("broken.jpeg"), b"definitely not a jpeg").unwrap();

        let result = optimize_images(&options(&dir));
        match result {
            Err(FolioError::Conversion { path, .. }) => assert!(path.ends_with("broken.jpeg")),
            other => panic!("expected conversion error, got {other:?}"),
        }
        assert!(image_dir.join("broken.jpeg").exists());
    }

    #[test]
    fn test_output_collision_rejected() {
        let dir = TempDir::new().unwrap();
        let image_dir = write_sample_images(&dir);
        fs::copy(image_dir.join("logo.png"), image_dir.join("photo.png")).unwrap();

        let result = optimize_images(&options(&dir));
        assert!(matches!(result, Err(FolioError::Conversion { .. })));
        assert!(!image_dir.join("photo.webp").exists());
    }

    #[test]
    fn test_unusable_destination_reports_path() {
        let dir = TempDir::new().unwrap();
        write_sample_images(&dir);
        let blocker = dir.path().join("out");
        fs::write(&blocker, b"not a directory").unwrap();

        let mut options = options(&dir);
        options.destination = blocker.clone();

        match optimize_images(&options) {
            Err(FolioError::IoAt { path, .. }) => assert_eq!(path, blocker),
            other => panic!("expected io error with path, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_directory_is_empty_batch() {
        let dir = TempDir::new().unwrap();
        let report = optimize_images(&options(&dir)).unwrap();
        assert!(report.converted.is_empty());
    }
}
