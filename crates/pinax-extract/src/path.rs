//! Path parameter extractor.

use std::ops::Deref;

use pinax_core::Bindable;

use crate::extractor::bind_source;
use crate::{ExtractionContext, FromRequest, Rejection, RequestSource};

/// Extractor that binds the `path`-tagged fields of `T` from the router's
/// parameters.
///
/// ```rust
/// use pinax_core::{Bindable, FieldType, SchemaBuilder, StructSchema, TypeShape};
/// use pinax_extract::{ExtractionContext, FromRequest, Path};
///
/// #[derive(Default)]
/// struct OrderPath {
///     org: String,
///     id: u64,
/// }
///
/// impl FieldType for OrderPath {
///     fn shape() -> TypeShape {
///         TypeShape::nested::<Self>()
///     }
/// }
///
/// impl Bindable for OrderPath {
///     fn schema() -> StructSchema {
///         SchemaBuilder::<Self>::new()
///             .field("org", r#"path:"org""#, |p| &mut p.org)
///             .field("id", r#"path:"id""#, |p| &mut p.id)
///             .build()
///     }
/// }
///
/// let ctx = ExtractionContext::builder()
///     .path_param("org", "acme")
///     .path_param("id", "42")
///     .build();
/// let Path(path) = Path::<OrderPath>::from_request(&ctx).unwrap();
/// assert_eq!((path.org.as_str(), path.id), ("acme", 42));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path<T>(pub T);

impl<T> Path<T> {
    /// Consumes the Path and returns the inner value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Path<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: Bindable + Default> FromRequest for Path<T> {
    fn from_request(ctx: &ExtractionContext) -> Result<Self, Rejection> {
        bind_source(ctx, ctx.path_params(), RequestSource::Path).map(Path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use pinax_macros::Bind;

    #[derive(Bind, Debug, Default)]
    #[bind(crate = "pinax_core")]
    struct UserPath {
        #[bind(path = "userId", required)]
        user_id: u64,
        #[bind(path = "tab", enum = "posts,likes")]
        tab: String,
    }

    #[test]
    fn test_path_extraction() {
        let ctx = ExtractionContext::builder()
            .path_param("userId", "7")
            .path_param("tab", "likes")
            .build();
        let Path(path) = Path::<UserPath>::from_request(&ctx).unwrap();
        assert_eq!(path.user_id, 7);
        assert_eq!(path.tab, "likes");
    }

    #[test]
    fn test_path_enum_rejected() {
        let ctx = ExtractionContext::builder()
            .path_param("userId", "7")
            .path_param("tab", "friends")
            .build();
        let err = Path::<UserPath>::from_request(&ctx).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("posts, likes"));
    }
}
