//! `multipart/form-data` body for media uploads.

use shiguredo_http11::multipart::MultipartBuilder;

/// Field name, filename and part content type used for media uploads.
pub const MEDIA_FIELD: &str = "file";
pub const MEDIA_FILENAME: &str = "tmp.jpg";
pub const MEDIA_CONTENT_TYPE: &str = "image/jpeg";

/// A single-file upload form with a fresh random boundary.
pub fn media_form(content: &[u8]) -> MultipartBuilder {
    let (random, _) = uuid::Uuid::new_v4().as_u64_pair();
    MultipartBuilder::new(random).file_field(MEDIA_FIELD, MEDIA_FILENAME, MEDIA_CONTENT_TYPE, content)
}
