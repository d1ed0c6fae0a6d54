//! Broad content categories derived from MIME types and file extensions.
//!
//! The built-in extractor reports the category as the `Content-Category`
//! attribute, which makes "sort by kind of file" available as a level.
//!
//! # Examples
//!
//! ```
//! use metasort::file_category::{Category, FileMapper};
//!
//! let mapper = FileMapper::default();
//! assert_eq!(mapper.categorize(Some("audio/mpeg"), None), Category::Audio);
//! assert_eq!(mapper.categorize(None, Some("PDF")), Category::Document);
//! assert_eq!(mapper.categorize(None, None), Category::Other);
//! ```
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Image,
    Audio,
    Video,
    Document,
    Archive,
    Code,
    Spreadsheet,
    Presentation,
    Font,
    Other,
}

impl Category {
    /// Value used for the `Content-Category` attribute.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Image => "Images",
            Category::Audio => "Audio",
            Category::Video => "Videos",
            Category::Document => "Documents",
            Category::Archive => "Archives",
            Category::Code => "Code",
            Category::Spreadsheet => "Spreadsheets",
            Category::Presentation => "Presentations",
            Category::Font => "Fonts",
            Category::Other => "Other",
        }
    }
}

const MIME_TABLE: &[(&str, Category)] = &[
    ("image/png", Category::Image),
    ("image/jpeg", Category::Image),
    ("image/gif", Category::Image),
    ("image/webp", Category::Image),
    ("image/bmp", Category::Image),
    ("image/tiff", Category::Image),
    ("image/heif", Category::Image),
    ("audio/mpeg", Category::Audio),
    ("audio/x-wav", Category::Audio),
    ("audio/ogg", Category::Audio),
    ("audio/x-flac", Category::Audio),
    ("audio/aac", Category::Audio),
    ("audio/m4a", Category::Audio),
    ("video/mp4", Category::Video),
    ("video/mpeg", Category::Video),
    ("video/quicktime", Category::Video),
    ("video/x-msvideo", Category::Video),
    ("video/x-matroska", Category::Video),
    ("video/webm", Category::Video),
    ("application/pdf", Category::Document),
    ("application/msword", Category::Document),
    ("application/rtf", Category::Document),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Category::Document,
    ),
    ("application/vnd.oasis.opendocument.text", Category::Document),
    ("application/zip", Category::Archive),
    ("application/vnd.rar", Category::Archive),
    ("application/x-7z-compressed", Category::Archive),
    ("application/x-tar", Category::Archive),
    ("application/gzip", Category::Archive),
    ("application/x-bzip2", Category::Archive),
    ("application/vnd.ms-excel", Category::Spreadsheet),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Category::Spreadsheet,
    ),
    ("application/vnd.ms-powerpoint", Category::Presentation),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        Category::Presentation,
    ),
    ("font/ttf", Category::Font),
    ("font/otf", Category::Font),
    ("font/woff", Category::Font),
    ("font/woff2", Category::Font),
];

const EXTENSION_TABLE: &[(&[&str], Category)] = &[
    (
        &["png", "jpg", "jpeg", "gif", "webp", "svg", "bmp", "tiff", "heic"],
        Category::Image,
    ),
    (
        &["mp3", "wav", "ogg", "flac", "aac", "m4a", "wma", "opus"],
        Category::Audio,
    ),
    (
        &["mp4", "mkv", "avi", "mov", "flv", "wmv", "webm", "3gp"],
        Category::Video,
    ),
    (
        &["pdf", "txt", "doc", "docx", "html", "htm", "md", "rtf", "odt", "epub"],
        Category::Document,
    ),
    (&["zip", "rar", "7z", "tar", "gz", "bz2", "xz"], Category::Archive),
    (
        &[
            "py", "java", "c", "cpp", "h", "hpp", "js", "ts", "rs", "go", "sh", "json", "xml",
            "yaml", "yml", "toml",
        ],
        Category::Code,
    ),
    (&["csv", "xls", "xlsx", "ods"], Category::Spreadsheet),
    (&["ppt", "pptx", "odp"], Category::Presentation),
    (&["ttf", "otf", "woff", "woff2"], Category::Font),
];

/// Maps MIME types and file extensions to categories.
#[derive(Debug, Clone)]
pub struct FileMapper {
    mime_map: HashMap<String, Category>,
    extension_map: HashMap<String, Category>,
}

impl FileMapper {
    pub fn new() -> Self {
        let mime_map = MIME_TABLE
            .iter()
            .map(|(mime, category)| (mime.to_string(), *category))
            .collect();
        let extension_map = EXTENSION_TABLE
            .iter()
            .flat_map(|(exts, category)| exts.iter().map(|ext| (ext.to_string(), *category)))
            .collect();

        Self {
            mime_map,
            extension_map,
        }
    }

    /// Adds or replaces a MIME type mapping.
    pub fn add_mime_mapping(&mut self, mime: &str, category: Category) {
        self.mime_map.insert(mime.to_lowercase(), category);
    }

    /// Adds or replaces an extension mapping.
    pub fn add_extension_mapping(&mut self, ext: &str, category: Category) {
        self.extension_map
            .insert(ext.trim_start_matches('.').to_lowercase(), category);
    }

    /// Categorizes a file, preferring the sniffed MIME type over the extension.
    pub fn categorize(&self, mime_type: Option<&str>, extension: Option<&str>) -> Category {
        mime_type
            .and_then(|mime| self.mime_map.get(&mime.to_lowercase()))
            .or_else(|| {
                extension.and_then(|ext| {
                    self.extension_map
                        .get(&ext.trim_start_matches('.').to_lowercase())
                })
            })
            .copied()
            .unwrap_or(Category::Other)
    }
}

impl Default for FileMapper {
    fn default() -> Self {
        Self::new()
    }
}
