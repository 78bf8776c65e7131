use std::fs;
use std::path::{Component, Path, PathBuf};

/// Container formats recognised by their leading signature bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    WebP,
    Heif,
}

impl ImageFormat {
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(ImageFormat::Png);
        }
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }
        if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            return Some(ImageFormat::Gif);
        }
        if bytes.starts_with(b"BM") && bytes.len() >= 14 {
            return Some(ImageFormat::Bmp);
        }
        if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
            return Some(ImageFormat::Tiff);
        }
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }
        if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
            let brand = &bytes[8..12];
            if [b"heic", b"heix", b"hevc", b"heif", b"mif1", b"msf1"]
                .iter()
                .any(|b| brand == &b[..])
            {
                return Some(ImageFormat::Heif);
            }
        }
        None
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Tiff => "tiff",
            ImageFormat::WebP => "webp",
            ImageFormat::Heif => "heif",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

/// Submission scans under `images/<submissionId>/<filename>`.
///
/// Nothing about images is recorded here beyond the files themselves; the
/// owning submission keeps the relative paths.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copies `source` into the submission's directory, replacing any file of
    /// the same name. Returns the stored relative path.
    pub fn import_image(&self, source: &Path, submission_id: &str) -> Option<String> {
        if !is_valid_submission_dir(submission_id) {
            tracing::warn!(submission_id, "refusing image import for unsafe submission id");
            return None;
        }
        let file_name = source.file_name()?.to_str()?.to_string();
        let dir = self.root.join(submission_id);
        if let Err(e) = fs::create_dir_all(&dir) {
            tracing::warn!(submission_id, error = %e, "could not create image directory");
            return None;
        }
        let dst = dir.join(&file_name);
        match fs::copy(source, &dst) {
            Ok(_) => Some(format!("{}/{}", submission_id, file_name)),
            Err(e) => {
                tracing::warn!(
                    source = %source.to_string_lossy(),
                    error = %e,
                    "image import failed"
                );
                None
            }
        }
    }

    pub fn resolve(&self, relative_path: &str) -> PathBuf {
        self.root.join(relative_path)
    }

    /// Reads a stored image. Paths that are not plain relative paths under
    /// the images root are never opened.
    pub fn load(&self, relative_path: &str) -> Option<ImageData> {
        if !is_plain_relative(relative_path) {
            tracing::warn!(relative_path, "refusing image path outside the images root");
            return None;
        }
        let path = self.resolve(relative_path);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(relative_path, error = %e, "image unreadable");
                return None;
            }
        };
        let Some(format) = ImageFormat::sniff(&bytes) else {
            tracing::warn!(relative_path, "unsupported image format");
            return None;
        };
        Some(ImageData { format, bytes })
    }

    /// Best-effort removal of the given files followed by the submission's
    /// whole directory. Only paths inside `images/<submission_id>/` are touched.
    pub fn remove_submission_images(&self, submission_id: &str, relative_paths: &[String]) {
        if !is_valid_submission_dir(submission_id) {
            tracing::warn!(submission_id, "skipping image cleanup for unsafe submission id");
            return;
        }
        for rel in relative_paths {
            if !is_owned_image_path(submission_id, rel) {
                tracing::warn!(rel = rel.as_str(), submission_id, "skipping foreign image path");
                continue;
            }
            let path = self.resolve(rel);
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(rel = rel.as_str(), error = %e, "could not delete image");
                }
            }
        }
        let dir = self.root.join(submission_id);
        if dir.exists() {
            if let Err(e) = fs::remove_dir_all(&dir) {
                tracing::warn!(submission_id, error = %e, "could not delete image directory");
            }
        }
    }
}

fn is_plain_relative(path: &str) -> bool {
    let p = Path::new(path);
    !path.is_empty() && p.components().all(|c| matches!(c, Component::Normal(_)))
}

/// A submission id usable as one directory name under the images root.
pub fn is_valid_submission_dir(submission_id: &str) -> bool {
    let mut parts = Path::new(submission_id).components();
    matches!(parts.next(), Some(Component::Normal(_))) && parts.next().is_none()
}

/// `"<submission_id>/<file>..."` with only normal components.
pub fn is_owned_image_path(submission_id: &str, relative_path: &str) -> bool {
    if !is_valid_submission_dir(submission_id) || !is_plain_relative(relative_path) {
        return false;
    }
    let mut parts = Path::new(relative_path).components();
    matches!(parts.next(), Some(Component::Normal(first)) if first == submission_id)
        && parts.next().is_some()
}
