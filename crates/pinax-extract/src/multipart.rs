//! Multipart form source.
//!
//! A `multipart/form-data` body is read completely before binding: text
//! parts become values under the `form` namespace, file parts become
//! [`UploadedFile`]s served through the source's file capability.

use std::io;

use bytes::Bytes;
use http::{header, HeaderMap};
use indexmap::IndexMap;
use pinax_bind::{FileError, FileGetter, Sources, ValueGetter, ValueMap};
use pinax_core::{Bindable, UploadedFile};
use tracing::debug;

use crate::query::QueryValues;
use crate::{ExtractionContext, Rejection, RequestSource};

/// Default maximum total body size for multipart (50 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 50 * 1024 * 1024;

/// Default maximum size per part (10 MB).
pub const DEFAULT_MAX_FIELD_SIZE: usize = 10 * 1024 * 1024;

/// Configuration for multipart parsing.
#[derive(Debug, Clone)]
pub struct MultipartConfig {
    /// Maximum total body size in bytes.
    pub max_body_size: usize,
    /// Maximum size per part in bytes.
    pub max_field_size: usize,
    /// Maximum number of parts allowed.
    pub max_fields: usize,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            max_field_size: DEFAULT_MAX_FIELD_SIZE,
            max_fields: 100,
        }
    }
}

impl MultipartConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum body size.
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Set the maximum part size.
    #[must_use]
    pub fn max_field_size(mut self, size: usize) -> Self {
        self.max_field_size = size;
        self
    }

    /// Set the maximum number of parts.
    #[must_use]
    pub fn max_fields(mut self, count: usize) -> Self {
        self.max_fields = count;
        self
    }
}

/// The text values and files of a multipart body.
#[derive(Debug, Clone, Default)]
pub struct MultipartValues {
    values: ValueMap,
    files: IndexMap<String, Vec<UploadedFile>>,
}

impl MultipartValues {
    /// Reads every part of `body`.
    ///
    /// # Errors
    ///
    /// - [`Rejection::UnsupportedMediaType`] if the Content-Type is not
    ///   `multipart/form-data` with a boundary
    /// - [`Rejection::PayloadTooLarge`] if the body or a part exceeds its
    ///   limit
    /// - [`Rejection::Malformed`] if the body cannot be parsed, has too many
    ///   parts, or a text part is not UTF-8
    pub async fn read(
        headers: &HeaderMap,
        body: Bytes,
        config: &MultipartConfig,
    ) -> Result<Self, Rejection> {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());
        let boundary = content_type
            .and_then(|value| multer::parse_boundary(value).ok())
            .ok_or_else(|| Rejection::unsupported_media_type("multipart/form-data", content_type))?;

        if body.len() > config.max_body_size {
            return Err(Rejection::payload_too_large(config.max_body_size, body.len()));
        }

        let stream = futures_util::stream::once(async move { Ok::<_, io::Error>(body) });
        let mut multipart = multer::Multipart::new(stream, boundary);

        let mut parsed = Self::default();
        let mut count = 0;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| Rejection::malformed(RequestSource::Multipart, err))?
        {
            count += 1;
            if count > config.max_fields {
                return Err(Rejection::malformed(
                    RequestSource::Multipart,
                    format!("too many parts (max {})", config.max_fields),
                ));
            }

            let Some(name) = field.name().map(String::from) else {
                debug!(index = count, "skipping multipart part without a name");
                continue;
            };
            let file_name = field.file_name().map(String::from);
            let content_type = field.content_type().map(ToString::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|err| Rejection::malformed(RequestSource::Multipart, err))?;
            if data.len() > config.max_field_size {
                return Err(Rejection::payload_too_large(config.max_field_size, data.len()));
            }

            if file_name.is_some() {
                let file = UploadedFile::new(Some(name.clone()), file_name, content_type, data);
                parsed.files.entry(name).or_default().push(file);
            } else {
                let text = String::from_utf8(data.to_vec()).map_err(|_| {
                    Rejection::malformed(
                        RequestSource::Multipart,
                        format!("part '{name}' is not valid UTF-8"),
                    )
                })?;
                parsed.values.append(name, text);
            }
        }

        debug!(
            values = parsed.values.len(),
            files = parsed.files.len(),
            "read multipart body"
        );
        Ok(parsed)
    }

    /// The text values.
    #[must_use]
    pub fn values(&self) -> &ValueMap {
        &self.values
    }

    /// Names that carried at least one file.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}

impl ValueGetter for MultipartValues {
    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key)
    }

    fn get_all(&self, key: &str) -> Vec<&str> {
        self.values.get_all(key)
    }

    fn has(&self, key: &str) -> bool {
        self.values.has(key)
    }

    fn keys(&self) -> Vec<&str> {
        self.values.keys()
    }

    fn approx_count(&self, prefix: &str) -> Option<usize> {
        self.values.approx_count(prefix)
    }

    fn file_getter(&self) -> Option<&dyn FileGetter> {
        Some(self)
    }
}

impl FileGetter for MultipartValues {
    fn file(&self, name: &str) -> Result<UploadedFile, FileError> {
        self.files
            .get(name)
            .and_then(|files| files.first())
            .cloned()
            .ok_or_else(|| FileError::NotFound(name.to_string()))
    }

    fn files(&self, name: &str) -> Result<Vec<UploadedFile>, FileError> {
        match self.files.get(name) {
            Some(files) if !files.is_empty() => Ok(files.clone()),
            _ => Err(FileError::NotFound(name.to_string())),
        }
    }

    fn has_file(&self, name: &str) -> bool {
        self.files.get(name).is_some_and(|files| !files.is_empty())
    }
}

/// Binds a fresh `T` from a multipart request: path parameters, then the
/// query string, then the multipart body.
///
/// # Errors
///
/// Any rejection from [`MultipartValues::read`] or from binding.
pub async fn bind_multipart<T: Bindable + Default>(
    ctx: &ExtractionContext,
    config: &MultipartConfig,
) -> Result<T, Rejection> {
    let form = MultipartValues::read(ctx.headers(), ctx.body().clone(), config).await?;
    let query = QueryValues::from_context(ctx)?;

    let mut dest = T::default();
    Sources::new(ctx.binder().config())
        .values(ctx.path_params(), RequestSource::Path.namespace())
        .values(&query, RequestSource::Query.namespace())
        .values(&form, RequestSource::Multipart.namespace())
        .bind(&mut dest)?;
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};
    use pinax_macros::Bind;

    const BOUNDARY: &str = "X-PINAX-BOUNDARY";

    #[derive(Bind, Debug, Default)]
    #[bind(crate = "pinax_core")]
    struct Upload {
        #[bind(path = "album")]
        album: String,
        #[bind(form = "title")]
        title: String,
        #[bind(form = "tags")]
        tags: Vec<String>,
        #[bind(form = "cover")]
        cover: Option<UploadedFile>,
        #[bind(form = "photos")]
        photos: Vec<UploadedFile>,
    }

    fn part(name: &str, file_name: Option<&str>, body: &str) -> String {
        let disposition = match file_name {
            Some(file) => format!("form-data; name=\"{name}\"; filename=\"{file}\"\r\nContent-Type: image/png"),
            None => format!("form-data; name=\"{name}\""),
        };
        format!("--{BOUNDARY}\r\nContent-Disposition: {disposition}\r\n\r\n{body}\r\n")
    }

    fn body(parts: &[String]) -> String {
        format!("{}--{BOUNDARY}--\r\n", parts.concat())
    }

    fn ctx(body: String) -> ExtractionContext {
        ExtractionContext::builder()
            .method(Method::POST)
            .uri("/albums/summer/photos?tags=q".parse().unwrap())
            .header("content-type", &format!("multipart/form-data; boundary={BOUNDARY}"))
            .path_param("album", "summer")
            .body(body)
            .build()
    }

    fn sample() -> String {
        body(&[
            part("title", None, "Beach"),
            part("tags", None, "sea"),
            part("tags", None, "sun"),
            part("cover", Some("cover.png"), "PNG0"),
            part("photos", Some("a.png"), "PNG1"),
            part("photos", Some("b.png"), "PNG2"),
        ])
    }

    #[tokio::test]
    async fn test_read_values_and_files() {
        let ctx = ctx(sample());
        let values = MultipartValues::read(ctx.headers(), ctx.body().clone(), &MultipartConfig::default())
            .await
            .unwrap();

        assert_eq!(values.get("title"), Some("Beach"));
        assert_eq!(values.get_all("tags"), vec!["sea", "sun"]);
        assert!(values.has_file("photos"));
        assert!(!values.has_file("title"));
        assert_eq!(values.files("photos").unwrap().len(), 2);
        let cover = values.file("cover").unwrap();
        assert_eq!(cover.file_name(), Some("cover.png"));
        assert_eq!(cover.content_type(), Some("image/png"));
        assert_eq!(&cover.data[..], b"PNG0");
        assert!(matches!(values.file("missing"), Err(FileError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_bind_multipart() {
        let upload: Upload = bind_multipart(&ctx(sample()), &MultipartConfig::default())
            .await
            .unwrap();
        assert_eq!(upload.album, "summer");
        assert_eq!(upload.title, "Beach");
        assert_eq!(upload.tags, ["sea", "sun"]);
        assert_eq!(upload.cover.map(|f| f.len()), Some(4));
        let names: Vec<_> = upload.photos.iter().filter_map(UploadedFile::file_name).collect();
        assert_eq!(names, ["a.png", "b.png"]);
    }

    #[tokio::test]
    async fn test_wrong_content_type() {
        let ctx = ExtractionContext::builder()
            .header("content-type", "application/json")
            .body("{}")
            .build();
        let err = bind_multipart::<Upload>(&ctx, &MultipartConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_limits() {
        let config = MultipartConfig::new().max_body_size(16);
        let err = bind_multipart::<Upload>(&ctx(sample()), &config).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);

        let config = MultipartConfig::new().max_fields(2);
        let err = bind_multipart::<Upload>(&ctx(sample()), &config).await.unwrap_err();
        assert!(err.to_string().contains("too many parts"));

        let config = MultipartConfig::new().max_field_size(3);
        let err = bind_multipart::<Upload>(&ctx(sample()), &config).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
