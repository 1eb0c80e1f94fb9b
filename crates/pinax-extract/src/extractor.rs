//! The extractor trait and its blanket implementations.

use pinax_bind::ValueGetter;
use pinax_core::Bindable;

use crate::{ExtractionContext, Rejection, RequestSource};

/// A value that can be pulled out of an [`ExtractionContext`].
///
/// # Implementing `FromRequest`
///
/// ```rust
/// use pinax_extract::{ExtractionContext, FromRequest, Rejection, RequestSource};
///
/// struct ApiVersion(u32);
///
/// impl FromRequest for ApiVersion {
///     fn from_request(ctx: &ExtractionContext) -> Result<Self, Rejection> {
///         let version = ctx.header("x-api-version").unwrap_or("1");
///         version
///             .parse()
///             .map(ApiVersion)
///             .map_err(|err| Rejection::malformed(RequestSource::Header, err))
///     }
/// }
///
/// let ctx = ExtractionContext::builder().header("x-api-version", "3").build();
/// assert_eq!(ApiVersion::from_request(&ctx).unwrap().0, 3);
/// ```
///
/// Tuples of extractors are extractors too, so `(Path<Id>, Query<Page>)`
/// extracts both or fails with the first rejection.
pub trait FromRequest: Sized {
    /// Extracts this type from the request context.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] if extraction fails.
    fn from_request(ctx: &ExtractionContext) -> Result<Self, Rejection>;
}

// Optional extraction: None if it fails
impl<T: FromRequest> FromRequest for Option<T> {
    fn from_request(ctx: &ExtractionContext) -> Result<Self, Rejection> {
        Ok(T::from_request(ctx).ok())
    }
}

// Lets handlers inspect the rejection themselves
impl<T: FromRequest> FromRequest for Result<T, Rejection> {
    fn from_request(ctx: &ExtractionContext) -> Result<Self, Rejection> {
        Ok(T::from_request(ctx))
    }
}

macro_rules! impl_from_request_for_tuple {
    ($($T:ident),*) => {
        impl<$($T: FromRequest),*> FromRequest for ($($T,)*) {
            fn from_request(ctx: &ExtractionContext) -> Result<Self, Rejection> {
                Ok(($($T::from_request(ctx)?,)*))
            }
        }
    };
}

impl_from_request_for_tuple!(T1);
impl_from_request_for_tuple!(T1, T2);
impl_from_request_for_tuple!(T1, T2, T3);
impl_from_request_for_tuple!(T1, T2, T3, T4);
impl_from_request_for_tuple!(T1, T2, T3, T4, T5);
impl_from_request_for_tuple!(T1, T2, T3, T4, T5, T6);

impl FromRequest for () {
    fn from_request(_ctx: &ExtractionContext) -> Result<Self, Rejection> {
        Ok(())
    }
}

/// Binds a fresh `T` from one source with the context's binder.
pub(crate) fn bind_source<T: Bindable + Default>(
    ctx: &ExtractionContext,
    getter: &dyn ValueGetter,
    source: RequestSource,
) -> Result<T, Rejection> {
    let mut dest = T::default();
    ctx.binder().bind(&mut dest, getter, source.namespace())?;
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tenant(String);

    impl FromRequest for Tenant {
        fn from_request(ctx: &ExtractionContext) -> Result<Self, Rejection> {
            ctx.header("x-tenant")
                .map(|tenant| Tenant(tenant.to_string()))
                .ok_or_else(|| Rejection::malformed(RequestSource::Header, "x-tenant missing"))
        }
    }

    fn ctx(tenant: Option<&str>) -> ExtractionContext {
        let builder = ExtractionContext::builder();
        match tenant {
            Some(tenant) => builder.header("x-tenant", tenant).build(),
            None => builder.build(),
        }
    }

    #[test]
    fn test_option_swallows_rejection() {
        let found = <Option<Tenant>>::from_request(&ctx(Some("acme"))).unwrap();
        assert_eq!(found.map(|t| t.0).as_deref(), Some("acme"));
        assert!(<Option<Tenant>>::from_request(&ctx(None)).unwrap().is_none());
    }

    #[test]
    fn test_result_hands_rejection_over() {
        let result = <Result<Tenant, Rejection>>::from_request(&ctx(None)).unwrap();
        assert_eq!(result.err().map(|r| r.error_code()), Some("MALFORMED_REQUEST"));
    }

    #[test]
    fn test_tuple_fails_on_first_rejection() {
        let (a, b) = <(Tenant, Option<Tenant>)>::from_request(&ctx(Some("acme"))).unwrap();
        assert_eq!(a.0, "acme");
        assert!(b.is_some());

        assert!(<((), Tenant)>::from_request(&ctx(None)).is_err());
    }

    #[test]
    fn test_bind_source_uses_context_binder() {
        #[derive(pinax_macros::Bind, Default, Debug)]
        #[bind(crate = "pinax_core")]
        struct Order {
            #[bind(path = "order")]
            order: u32,
        }

        let values = pinax_bind::ValueMap::from_pairs([("order", "12")]);
        let order: Order = bind_source(&ctx(None), &values, RequestSource::Path).unwrap();
        assert_eq!(order.order, 12);

        let values = pinax_bind::ValueMap::from_pairs([("order", "twelve")]);
        let err = bind_source::<Order>(&ctx(None), &values, RequestSource::Path).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER");
    }
}
