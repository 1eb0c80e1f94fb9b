//! Integration tests for `#[derive(Bind)]`.
//!
//! These check that the derived schema carries the rendered tags and that
//! the generated code binds through the `pinax` facade.

use pinax::{bind, BindConfig, Bindable, FieldKind, TypeRegistry, ValueMap};

#[derive(pinax::Bind, Debug, Default, PartialEq)]
struct Paging {
    #[bind(query = "page,p", default = "1")]
    page: u32,
    #[bind(query = "size", default = "20")]
    size: u32,
}

#[derive(pinax::Bind, Debug, Default)]
struct Search {
    #[bind(query = "q", required)]
    q: String,
    #[bind(query = "sort", enum = "asc,desc")]
    sort: Option<String>,
    #[bind(flatten)]
    paging: Paging,
    #[bind(query = "type")]
    r#type: String,
    #[bind(skip)]
    scratch: Vec<u8>,
    #[bind(tag = r#"query:"raw""#)]
    raw: String,
}

#[test]
fn test_schema_lists_declared_fields() {
    let schema = Search::schema();
    let names: Vec<_> = schema.fields().iter().map(|field| field.name()).collect();
    assert_eq!(names, ["q", "sort", "paging", "type", "raw"]);

    let q = &schema.fields()[0];
    assert_eq!(q.tag(), r#"query:"q" required:"true""#);
    assert!(schema.fields()[2].is_flattened());
}

#[test]
fn test_registry_reads_derived_tags() {
    let registry = TypeRegistry::new();
    let info = registry.struct_info::<Search>("query");

    let sort = info.field("sort").expect("sort field");
    assert_eq!(sort.enum_values(), ["asc", "desc"]);
    assert!(sort.is_optional());

    let page = info.field("page").expect("flattened page field");
    assert_eq!(page.alias_keys(), ["p"]);
    assert_eq!(page.default_raw(), Some("1"));
    assert_eq!(page.kind(), FieldKind::Scalar);

    assert!(info.field("q").expect("q field").is_required());
    assert!(info.field("raw").is_some());
    assert!(info.field("scratch").is_none());
}

#[test]
fn test_derived_struct_binds() {
    let values = ValueMap::from_pairs([("q", "rust"), ("p", "2"), ("type", "crate"), ("raw", "x")]);
    let mut search = Search {
        scratch: vec![1, 2],
        ..Search::default()
    };
    bind(&mut search, &values, "query", &BindConfig::default()).unwrap();

    assert_eq!(search.q, "rust");
    assert_eq!(search.paging, Paging { page: 2, size: 20 });
    assert_eq!(search.r#type, "crate");
    assert_eq!(search.raw, "x");
    assert_eq!(search.scratch, [1, 2]);
}
