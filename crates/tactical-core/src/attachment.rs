//! Image attachments for a single turn.

use std::path::Path;

use base64::prelude::*;
use image::ImageFormat;
use tracing::warn;

use crate::error::CoachError;

/// File extensions the upload control accepts.
pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Media type written into every image data URI.
///
/// Uploads are labelled JPEG whatever their real encoding; PNG uploads are
/// accepted and sent with this declaration. See [`ImageAttachment::sniffed`].
pub const DECLARED_MEDIA_TYPE: &str = "image/jpeg";

/// One uploaded image, kept only until it is encoded into a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAttachment {
    bytes: Vec<u8>,
    sniffed: Option<ImageFormat>,
}

impl ImageAttachment {
    /// Accept an upload by file name, the way the picker filters it.
    ///
    /// Without a file name the content itself must look like PNG or JPEG.
    pub fn from_upload(file_name: Option<&str>, bytes: Vec<u8>) -> Result<Self, CoachError> {
        if bytes.is_empty() {
            return Err(CoachError::UnsupportedImage("empty file".into()));
        }
        let sniffed = image::guess_format(&bytes).ok();

        match file_name {
            Some(name) => {
                let ext = Path::new(name)
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.to_ascii_lowercase())
                    .unwrap_or_default();
                if !ACCEPTED_EXTENSIONS.contains(&ext.as_str()) {
                    return Err(CoachError::UnsupportedImage(format!(
                        "{name}: expected one of {}",
                        ACCEPTED_EXTENSIONS.join(", ")
                    )));
                }
            }
            None => {
                if !matches!(sniffed, Some(ImageFormat::Png | ImageFormat::Jpeg)) {
                    return Err(CoachError::UnsupportedImage(
                        "unnamed upload is not a PNG or JPEG image".into(),
                    ));
                }
            }
        }

        let attachment = Self { bytes, sniffed };
        if attachment.is_mislabelled() {
            warn!(
                actual = ?attachment.sniffed,
                declared = DECLARED_MEDIA_TYPE,
                "image will be sent with a media type that does not match its content"
            );
        }
        Ok(attachment)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Format detected from the file's magic bytes, if recognisable.
    pub fn sniffed(&self) -> Option<ImageFormat> {
        self.sniffed
    }

    /// True when the content is a known format other than JPEG.
    pub fn is_mislabelled(&self) -> bool {
        matches!(self.sniffed, Some(f) if f != ImageFormat::Jpeg)
    }

    /// `data:image/jpeg;base64,…` URI for embedding in a message.
    pub fn to_data_uri(&self) -> String {
        format!("data:{DECLARED_MEDIA_TYPE};base64,{}", BASE64_STANDARD.encode(&self.bytes))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
