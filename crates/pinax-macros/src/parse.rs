//! Attribute parsing for `#[derive(Bind)]`.

use syn::{Attribute, LitStr, Path};

/// Tag namespaces accepted as `#[bind(<namespace> = "...")]`.
pub const NAMESPACES: &[&str] = &[
    "query", "path", "form", "header", "cookie", "json", "xml", "yaml",
];

/// Body namespaces serde decodes by Rust field name, so their tag names
/// cannot differ from it.
pub const FIELD_NAMED: &[&str] = &["xml", "yaml"];

/// Struct-level options.
#[derive(Debug, Default)]
pub struct ContainerAttrs {
    /// Path to the crate that exports the runtime items.
    pub krate: Option<Path>,
}

impl ContainerAttrs {
    /// Reads every `#[bind(...)]` on the struct.
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for attr in attrs.iter().filter(|attr| attr.path().is_ident("bind")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("crate") {
                    let lit: LitStr = meta.value()?.parse()?;
                    parsed.krate = Some(lit.parse()?);
                    Ok(())
                } else {
                    Err(meta.error("unknown container attribute, expected `crate`"))
                }
            })?;
        }
        Ok(parsed)
    }
}

/// Field-level options.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FieldAttrs {
    /// `(namespace, "name,alias,...")` in declaration order.
    pub namespaces: Vec<(String, String)>,
    /// `default = "..."`
    pub default: Option<String>,
    /// `enum = "a,b,c"`
    pub enum_values: Option<String>,
    /// `required`
    pub required: bool,
    /// `tag = "..."`, appended verbatim.
    pub raw_tag: Option<String>,
    /// `flatten`
    pub flatten: bool,
    /// `skip`
    pub skip: bool,
}

impl FieldAttrs {
    /// Reads every `#[bind(...)]` on a field.
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for attr in attrs.iter().filter(|attr| attr.path().is_ident("bind")) {
            attr.parse_nested_meta(|meta| {
                let Some(ident) = meta.path.get_ident().map(ToString::to_string) else {
                    return Err(meta.error("expected an identifier"));
                };
                match ident.as_str() {
                    "required" => parsed.required = true,
                    "flatten" => parsed.flatten = true,
                    "skip" => parsed.skip = true,
                    "default" => parsed.default = Some(meta.value()?.parse::<LitStr>()?.value()),
                    "enum" => parsed.enum_values = Some(meta.value()?.parse::<LitStr>()?.value()),
                    "tag" => parsed.raw_tag = Some(meta.value()?.parse::<LitStr>()?.value()),
                    namespace if NAMESPACES.contains(&namespace) => {
                        let value = meta.value()?.parse::<LitStr>()?.value();
                        if parsed.namespaces.iter().any(|(ns, _)| ns == namespace) {
                            return Err(meta.error(format!("duplicate `{namespace}` attribute")));
                        }
                        parsed.namespaces.push((namespace.to_string(), value));
                    }
                    other => {
                        return Err(meta.error(format!(
                            "unknown bind attribute `{other}`, expected one of {}, default, enum, required, tag, flatten, skip",
                            NAMESPACES.join(", ")
                        )))
                    }
                }
                Ok(())
            })?;
        }
        Ok(parsed)
    }

    /// Rejects `xml`/`yaml` names other than `field` and any alias for them.
    pub fn check_field_named(&self, field: &str) -> Result<(), String> {
        for (namespace, value) in &self.namespaces {
            if !FIELD_NAMED.contains(&namespace.as_str()) {
                continue;
            }
            let mut names = value.split(',').map(str::trim);
            let primary = names.next().unwrap_or_default();
            if !primary.is_empty() && primary != field {
                return Err(format!(
                    "`{namespace}` name `{primary}` must equal the field name `{field}`"
                ));
            }
            if let Some(alias) = names.find(|name| !name.is_empty() && *name != "omitempty") {
                return Err(format!("`{namespace}` does not accept aliases, found `{alias}`"));
            }
        }
        Ok(())
    }

    /// Renders the Go-style struct tag, e.g. `query:"id,uid" default:"1"`.
    pub fn tag(&self) -> String {
        let mut parts: Vec<String> = self
            .namespaces
            .iter()
            .map(|(namespace, value)| format!("{namespace}:{}", quote_value(value)))
            .collect();
        if let Some(default) = &self.default {
            parts.push(format!("default:{}", quote_value(default)));
        }
        if let Some(values) = &self.enum_values {
            parts.push(format!("enum:{}", quote_value(values)));
        }
        if self.required {
            parts.push(r#"required:"true""#.to_string());
        }
        if let Some(raw) = &self.raw_tag {
            parts.push(raw.clone());
        }
        parts.join(" ")
    }
}

fn quote_value(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::{parse_quote, DeriveInput};

    fn field_attrs(input: DeriveInput) -> syn::Result<FieldAttrs> {
        let syn::Data::Struct(data) = input.data else {
            unreachable!("test inputs are structs")
        };
        let field = data.fields.iter().next().expect("one field");
        FieldAttrs::from_attrs(&field.attrs)
    }

    #[test]
    fn test_renders_tag_in_order() {
        let attrs = field_attrs(parse_quote! {
            struct S {
                #[bind(query = "page,p", form = "page", default = "1", required)]
                page: u32,
            }
        })
        .unwrap();
        assert_eq!(attrs.tag(), r#"query:"page,p" form:"page" default:"1" required:"true""#);
    }

    #[test]
    fn test_enum_keyword_and_raw_tag() {
        let attrs = field_attrs(parse_quote! {
            struct S {
                #[bind(query = "sort", enum = "asc,desc")]
                #[bind(tag = r#"custom:"x""#)]
                sort: String,
            }
        })
        .unwrap();
        assert_eq!(attrs.tag(), r#"query:"sort" enum:"asc,desc" custom:"x""#);
    }

    #[test]
    fn test_escapes_quotes() {
        let attrs = field_attrs(parse_quote! {
            struct S {
                #[bind(query = "q", default = r#"say "hi""#)]
                q: String,
            }
        })
        .unwrap();
        assert_eq!(attrs.tag(), r#"query:"q" default:"say \"hi\"""#);
    }

    #[test]
    fn test_flags() {
        let attrs = field_attrs(parse_quote! {
            struct S {
                #[bind(flatten)]
                base: Base,
            }
        })
        .unwrap();
        assert!(attrs.flatten);
        assert!(!attrs.skip);
        assert_eq!(attrs.tag(), "");
    }

    #[test]
    fn test_rejects_unknown_and_duplicate() {
        assert!(field_attrs(parse_quote! {
            struct S {
                #[bind(querystring = "q")]
                q: String,
            }
        })
        .is_err());
        assert!(field_attrs(parse_quote! {
            struct S {
                #[bind(query = "a", query = "b")]
                q: String,
            }
        })
        .is_err());
    }

    #[test]
    fn test_xml_and_yaml_names_follow_the_field() {
        let attrs = field_attrs(parse_quote! {
            struct S {
                #[bind(xml = "title", yaml = ",omitempty", json = "headline,t")]
                title: String,
            }
        })
        .unwrap();
        assert!(attrs.check_field_named("title").is_ok());

        let renamed = field_attrs(parse_quote! {
            struct S {
                #[bind(yaml = "heading")]
                title: String,
            }
        })
        .unwrap();
        let err = renamed.check_field_named("title").unwrap_err();
        assert!(err.contains("`heading`"));

        let aliased = field_attrs(parse_quote! {
            struct S {
                #[bind(xml = "title,name")]
                title: String,
            }
        })
        .unwrap();
        assert!(aliased.check_field_named("title").unwrap_err().contains("aliases"));
    }

    #[test]
    fn test_container_crate_path() {
        let input: DeriveInput = parse_quote! {
            #[bind(crate = "pinax_core")]
            struct S {}
        };
        let attrs = ContainerAttrs::from_attrs(&input.attrs).unwrap();
        let krate = attrs.krate.unwrap();
        assert!(krate.is_ident("pinax_core"));
    }
}
