//! Request-level binding through the extractors.

use http::{Method, StatusCode};
use pinax::extract::{Bind as BindRequest, ExtractionContextBuilder};
use pinax::prelude::*;
use pinax::{validate_with, ErrorMode, UnknownFieldPolicy};
use serde::Deserialize;

#[derive(Bind, Debug, Default, PartialEq)]
struct Line {
    #[bind(query = "sku", required)]
    sku: String,
    #[bind(query = "qty", default = "1")]
    qty: u16,
}

#[derive(Bind, Debug, Default)]
struct OrderQuery {
    #[bind(query = "status", enum = "open,shipped,cancelled")]
    status: Option<String>,
    #[bind(query = "lines")]
    lines: Vec<Line>,
    #[bind(query = "meta")]
    meta: std::collections::HashMap<String, String>,
}

#[derive(Bind, Debug, Default)]
struct OrderPath {
    #[bind(path = "shop")]
    shop: String,
    #[bind(path = "order")]
    order: u64,
}

#[derive(Bind, Debug, Default)]
struct Caller {
    #[bind(header = "X-Request-Id", required)]
    request_id: String,
    #[bind(header = "X-Retry")]
    retry: Option<u8>,
}

#[derive(Bind, Debug, Default)]
struct Session {
    #[bind(cookie = "sid")]
    sid: String,
    #[bind(cookie = "theme", default = "light")]
    theme: String,
}

#[derive(Bind, Debug, Default, Deserialize)]
struct Patch {
    #[bind(path = "order")]
    #[serde(skip)]
    order: u64,
    #[bind(header = "If-Match")]
    #[serde(skip)]
    version: Option<u32>,
    #[bind(json = "note")]
    #[serde(default)]
    note: String,
    #[bind(json = "priority")]
    #[serde(default)]
    priority: u8,
}

fn order_request() -> ExtractionContextBuilder {
    ExtractionContext::builder()
        .method(Method::GET)
        .uri(
            "/shops/north/orders/77?status=open&lines%5B0%5D.sku=A-1&lines%5B1%5D.sku=B-2&lines%5B1%5D.qty=4&meta%5Bsource%5D=app"
                .parse()
                .unwrap(),
        )
        .path_param("shop", "north")
        .path_param("order", "77")
        .header("x-request-id", "req-9")
        .header("cookie", "sid=abc; theme=\"dark\"")
}

#[test]
fn test_path_and_defaulted_query() {
    #[derive(Bind, Debug, Default, PartialEq)]
    struct Page {
        #[bind(path = "id")]
        id: i64,
        #[bind(query = "page", default = "1")]
        page: i64,
    }

    let ctx = ExtractionContext::builder()
        .uri("/items/42".parse().unwrap())
        .path_param("id", "42")
        .build();
    let (Path(path), Query(query)) = <(Path<Page>, Query<Page>)>::from_request(&ctx).unwrap();
    assert_eq!(path.id, 42);
    assert_eq!(query.page, 1);

    let path_values = ValueMap::from_pairs([("id", "42")]);
    let query_values = ValueMap::new();
    let config = BindConfig::default();
    let mut page = Page::default();
    Sources::new(&config)
        .values(&path_values, "path")
        .values(&query_values, "query")
        .bind(&mut page)
        .unwrap();
    assert_eq!(page, Page { id: 42, page: 1 });
}

#[test]
fn test_every_source_through_one_request() {
    let ctx = order_request().build();
    let (Path(path), Query(query), Headers(caller), Cookies(session)) =
        <(Path<OrderPath>, Query<OrderQuery>, Headers<Caller>, Cookies<Session>)>::from_request(&ctx)
            .unwrap();

    assert_eq!(path.shop, "north");
    assert_eq!(path.order, 77);

    assert_eq!(query.status.as_deref(), Some("open"));
    assert_eq!(
        query.lines,
        [
            Line {
                sku: "A-1".into(),
                qty: 1
            },
            Line {
                sku: "B-2".into(),
                qty: 4
            },
        ]
    );
    assert_eq!(query.meta.get("source").map(String::as_str), Some("app"));

    assert_eq!(caller.request_id, "req-9");
    assert_eq!(caller.retry, None);
    assert_eq!(session.sid, "abc");
    assert_eq!(session.theme, "dark");
}

#[test]
fn test_enum_violation_is_a_client_error() {
    let ctx = ExtractionContext::builder()
        .uri("/orders?status=lost".parse().unwrap())
        .build();
    let err = Query::<OrderQuery>::from_request(&ctx).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(err.error_code(), "INVALID_PARAMETER");
    assert_eq!(err.bind_error().unwrap().bind_errors()[0].field(), "status");
}

#[test]
fn test_required_header_when_checking_is_enabled() {
    let binder = Binder::new(BindConfig::builder().check_required(true).build());
    let ctx = ExtractionContext::builder().binder(binder).build();
    let err = Headers::<Caller>::from_request(&ctx).unwrap_err();
    assert_eq!(err.error_code(), "MISSING_PARAMETER");

    // unchecked by default
    let Headers(caller) = Headers::<Caller>::from_request(&ExtractionContext::default()).unwrap();
    assert!(caller.request_id.is_empty());
}

#[test]
fn test_collect_all_reports_every_bad_field() {
    let binder = Binder::default().with(|b| b.error_mode(ErrorMode::CollectAll));
    let ctx = ExtractionContext::builder()
        .path_param("shop", "north")
        .path_param("order", "seventy")
        .header("x-request-id", "r")
        .header("x-retry", "many")
        .binder(binder)
        .build();

    let err = Path::<OrderPath>::from_request(&ctx).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(err.error_code(), "MULTIPLE_ERRORS");
    assert_eq!(err.bind_error().unwrap().bind_errors().len(), 1);

    let result = <(Option<Path<OrderPath>>, Result<Headers<Caller>, Rejection>)>::from_request(&ctx);
    let (path, headers) = result.unwrap();
    assert!(path.is_none());
    let err = headers.unwrap_err();
    assert_eq!(err.bind_error().unwrap().bind_errors()[0].field(), "retry");
}

#[test]
fn test_json_body_with_path_and_header_overlay() {
    let ctx = ExtractionContext::builder()
        .method(Method::PATCH)
        .uri("/orders/77".parse().unwrap())
        .path_param("order", "77")
        .header("content-type", "application/json")
        .header("if-match", "3")
        .body(r#"{"note":"leave at door","priority":2}"#)
        .build();

    let BindRequest(patch) = BindRequest::<Patch>::from_request(&ctx).unwrap();
    assert_eq!(patch.order, 77);
    assert_eq!(patch.version, Some(3));
    assert_eq!(patch.note, "leave at door");
    assert_eq!(patch.priority, 2);
}

#[test]
fn test_json_policy_and_validation() {
    let strict = Binder::new(
        BindConfig::builder()
            .unknown_fields(UnknownFieldPolicy::Error)
            .validator(validate_with(|patch: &Patch| {
                if patch.priority > 5 {
                    Err("priority must be at most 5".into())
                } else {
                    Ok(())
                }
            }))
            .build(),
    );

    let ctx = ExtractionContext::builder()
        .header("content-type", "application/json")
        .body(r#"{"note":"x","urgent":true}"#)
        .binder(strict.clone())
        .build();
    let err = Json::<Patch>::from_request(&ctx).unwrap_err();
    assert_eq!(err.error_code(), "UNKNOWN_FIELD");

    let ctx = ExtractionContext::builder()
        .header("content-type", "application/json")
        .body(r#"{"priority":9}"#)
        .binder(strict)
        .build();
    let err = Json::<Patch>::from_request(&ctx).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err.error_code(), "VALIDATION_FAILED");
}

#[test]
fn test_form_body() {
    #[derive(Bind, Debug, Default)]
    struct Contact {
        #[bind(form = "email")]
        email: String,
        #[bind(form = "topics")]
        topics: Vec<String>,
        #[bind(form = "subscribe")]
        subscribe: bool,
    }

    let ctx = ExtractionContext::builder()
        .method(Method::POST)
        .header("content-type", "application/x-www-form-urlencoded")
        .body("email=a%40b.io&topics=news&topics=offers&subscribe=on")
        .build();
    let Form(contact) = Form::<Contact>::from_request(&ctx).unwrap();
    assert_eq!(contact.email, "a@b.io");
    assert_eq!(contact.topics, ["news", "offers"]);
    assert!(contact.subscribe);
}

#[tokio::test]
async fn test_multipart_upload() {
    #[derive(Bind, Debug, Default)]
    struct Avatar {
        #[bind(path = "user")]
        user: u32,
        #[bind(form = "alt")]
        alt: String,
        #[bind(form = "image")]
        image: Option<UploadedFile>,
    }

    let body = "--b0\r\nContent-Disposition: form-data; name=\"alt\"\r\n\r\nme\r\n\
                --b0\r\nContent-Disposition: form-data; name=\"image\"; filename=\"me.jpg\"\r\n\
                Content-Type: image/jpeg\r\n\r\nJPEG\r\n--b0--\r\n";
    let ctx = ExtractionContext::builder()
        .method(Method::PUT)
        .uri("/users/8/avatar".parse().unwrap())
        .path_param("user", "8")
        .header("content-type", "multipart/form-data; boundary=b0")
        .body(body)
        .build();

    let avatar: Avatar = bind_multipart(&ctx, &Default::default()).await.unwrap();
    assert_eq!(avatar.user, 8);
    assert_eq!(avatar.alt, "me");
    let image = avatar.image.unwrap();
    assert_eq!(image.file_name(), Some("me.jpg"));
    assert_eq!(image.extension(), Some("jpg"));
    assert_eq!(&image.data[..], b"JPEG");
}
