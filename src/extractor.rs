//! Metadata extraction.
//!
//! The store is filled by a [`MetadataExtractor`]: given one file, it returns
//! that file's attribute map or an [`Error::ExtractionFailed`]. Any closure of
//! the right shape is an extractor, which keeps callers free to plug in their
//! own tag readers. [`ContentExtractor`] is the built-in one: generic file
//! attributes for everything, plus ID3 tags for MP3, EXIF fields for photos
//! and the document information dictionary for PDF.

use crate::error::{Error, Result};
use crate::file_category::FileMapper;
use crate::store::AttributeMap;
use chrono::{DateTime, Local};
use id3::TagLike;
use std::fs;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_CATEGORY: &str = "Content-Category";
pub const FILE_EXTENSION: &str = "File-Extension";
pub const FILE_SIZE_CLASS: &str = "File-Size-Class";
pub const LAST_MODIFIED_YEAR: &str = "Last-Modified-Year";
pub const LAST_MODIFIED_MONTH: &str = "Last-Modified-Month";
pub const ARTIST: &str = "Artist";
pub const ALBUM: &str = "Album";
pub const ALBUM_ARTIST: &str = "Album-Artist";
pub const TITLE: &str = "Title";
pub const GENRE: &str = "Genre";
pub const YEAR: &str = "Year";
pub const AUTHOR: &str = "Author";
pub const SUBJECT: &str = "Subject";
pub const CREATOR_TOOL: &str = "Creator-Tool";
pub const CAMERA_MAKE: &str = "Camera-Make";
pub const CAMERA_MODEL: &str = "Camera-Model";
pub const DATE_TAKEN_YEAR: &str = "Date-Taken-Year";
pub const DATE_TAKEN_MONTH: &str = "Date-Taken-Month";

/// MIME types `kamadak-exif` can find an EXIF block in.
const EXIF_MIME_TYPES: &[&str] = &["image/jpeg", "image/tiff", "image/png", "image/webp", "image/heif"];

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// Reads the attribute map of a single file.
///
/// Implementations are called from several worker threads at once, one file
/// per call.
pub trait MetadataExtractor: Sync {
    fn extract(&self, path: &Path) -> Result<AttributeMap>;
}

impl<F> MetadataExtractor for F
where
    F: Fn(&Path) -> Result<AttributeMap> + Sync,
{
    fn extract(&self, path: &Path) -> Result<AttributeMap> {
        self(path)
    }
}

/// Extracts content type, category, size and dates for any file, plus
/// ID3 tags for MP3 files.
#[derive(Debug, Clone, Default)]
pub struct ContentExtractor {
    mapper: FileMapper,
}

impl ContentExtractor {
    pub fn new(mapper: FileMapper) -> Self {
        Self { mapper }
    }

    fn failure(path: &Path, error: impl std::fmt::Display) -> Error {
        Error::ExtractionFailed {
            path: path.to_path_buf(),
            reason: error.to_string(),
        }
    }
}

impl MetadataExtractor for ContentExtractor {
    fn extract(&self, path: &Path) -> Result<AttributeMap> {
        let metadata = fs::metadata(path).map_err(|e| Self::failure(path, e))?;
        if !metadata.is_file() {
            return Err(Self::failure(path, "not a regular file"));
        }

        let mut attributes = AttributeMap::new();

        let kind = infer::get_from_path(path).map_err(|e| Self::failure(path, e))?;
        let mime = kind.map(|k| k.mime_type());
        if let Some(mime) = mime {
            attributes.insert(CONTENT_TYPE.to_string(), mime.to_string());
        }

        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase());
        if let Some(ext) = &extension {
            attributes.insert(FILE_EXTENSION.to_string(), ext.clone());
        }

        let category = self.mapper.categorize(mime, extension.as_deref());
        attributes.insert(CONTENT_CATEGORY.to_string(), category.label().to_string());
        attributes.insert(
            FILE_SIZE_CLASS.to_string(),
            size_class(metadata.len()).to_string(),
        );

        if let Ok(modified) = metadata.modified() {
            let modified: DateTime<Local> = modified.into();
            attributes.insert(
                LAST_MODIFIED_YEAR.to_string(),
                modified.format("%Y").to_string(),
            );
            attributes.insert(
                LAST_MODIFIED_MONTH.to_string(),
                modified.format("%m").to_string(),
            );
        }

        if mime == Some("audio/mpeg") || extension.as_deref() == Some("mp3") {
            read_id3(path, &mut attributes);
        }
        if mime.is_some_and(|m| EXIF_MIME_TYPES.contains(&m)) {
            read_exif(path, &mut attributes);
        }
        if mime == Some("application/pdf") {
            read_pdf_info(path, &mut attributes);
        }

        Ok(attributes)
    }
}

fn size_class(len: u64) -> &'static str {
    match len {
        l if l < 100 * KIB => "tiny",
        l if l < 10 * MIB => "small",
        l if l < GIB => "medium",
        _ => "large",
    }
}

/// Copies ID3 frames into `attributes`. A missing or unreadable tag leaves
/// the generic attributes in place.
fn read_id3(path: &Path, attributes: &mut AttributeMap) {
    let tag = match id3::Tag::read_from_path(path) {
        Ok(tag) => tag,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no usable ID3 tag");
            return;
        }
    };

    let frames = [
        (ARTIST, tag.artist()),
        (ALBUM, tag.album()),
        (ALBUM_ARTIST, tag.album_artist()),
        (TITLE, tag.title()),
        (GENRE, tag.genre()),
    ];
    for (name, value) in frames {
        if let Some(value) = value.map(join_frame_values)
            && !value.is_empty()
        {
            attributes.insert(name.to_string(), value);
        }
    }
    if let Some(year) = tag.year() {
        attributes.insert(YEAR.to_string(), year.to_string());
    }
}

/// Copies camera make, model and capture date from the EXIF block.
fn read_exif(path: &Path, attributes: &mut AttributeMap) {
    let data = match fs::File::open(path).map(BufReader::new).and_then(|mut reader| {
        exif::Reader::new()
            .read_from_container(&mut reader)
            .map_err(|e| std::io::Error::other(e.to_string()))
    }) {
        Ok(data) => data,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no usable EXIF data");
            return;
        }
    };

    let ascii = |tag: exif::Tag| -> Option<String> {
        let field = data.get_field(tag, exif::In::PRIMARY)?;
        match &field.value {
            exif::Value::Ascii(parts) => parts
                .first()
                .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
                .filter(|v| !v.is_empty()),
            _ => None,
        }
    };

    if let Some(make) = ascii(exif::Tag::Make) {
        attributes.insert(CAMERA_MAKE.to_string(), make);
    }
    if let Some(model) = ascii(exif::Tag::Model) {
        attributes.insert(CAMERA_MODEL.to_string(), model);
    }
    // "YYYY:MM:DD HH:MM:SS"
    if let Some(taken) = ascii(exif::Tag::DateTimeOriginal)
        && let Some((year, rest)) = taken.split_once(':')
        && let Some((month, _)) = rest.split_once(':')
    {
        attributes.insert(DATE_TAKEN_YEAR.to_string(), year.to_string());
        attributes.insert(DATE_TAKEN_MONTH.to_string(), month.to_string());
    }
}

/// Copies author, title, subject and creator from the PDF `Info` dictionary.
fn read_pdf_info(path: &Path, attributes: &mut AttributeMap) {
    let doc = match lopdf::Document::load(path) {
        Ok(doc) => doc,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "unreadable PDF");
            return;
        }
    };

    let info = doc.trailer.get(b"Info").and_then(|obj| match obj {
        lopdf::Object::Reference(id) => doc.get_dictionary(*id),
        other => other.as_dict(),
    });
    let Ok(info) = info else {
        return;
    };

    let fields = [
        (AUTHOR, b"Author".as_slice()),
        (TITLE, b"Title".as_slice()),
        (SUBJECT, b"Subject".as_slice()),
        (CREATOR_TOOL, b"Creator".as_slice()),
    ];
    for (name, key) in fields {
        if let Ok(raw) = info.get(key).and_then(|obj| obj.as_str()) {
            let value = decode_pdf_text(raw);
            let value = value.trim();
            if !value.is_empty() {
                attributes.insert(name.to_string(), value.to_string());
            }
        }
    }
}

/// PDF text strings are UTF-16BE when they start with a byte order mark,
/// otherwise single-byte.
fn decode_pdf_text(raw: &[u8]) -> String {
    match raw {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => raw.iter().map(|&b| char::from(b)).collect(),
    }
}

/// ID3v2.4 text frames separate multiple values with NUL.
fn join_frame_values(raw: &str) -> String {
    raw.split('\0')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}
