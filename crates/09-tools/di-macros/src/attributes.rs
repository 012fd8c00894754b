//! 属性解析

use syn::{Attribute, Field, Ident, LitStr, Meta, Result, Type};

/// 结构体级选项，来自 `#[injectable(...)]`
#[derive(Default)]
pub struct TypeOptions {
    pub post_construct: Option<Ident>,
    pub pre_destroy: Option<Ident>,
    pub listener: bool,
    pub provides: Vec<Type>,
    pub no_register: bool,
}

impl TypeOptions {
    pub fn from_attributes(attrs: &[Attribute]) -> Result<Self> {
        let mut options = Self::default();
        for attr in attrs.iter().filter(|attr| attr.path().is_ident("injectable")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("post_construct") {
                    options.post_construct = Some(meta.value()?.parse::<LitStr>()?.parse()?);
                } else if meta.path.is_ident("pre_destroy") {
                    options.pre_destroy = Some(meta.value()?.parse::<LitStr>()?.parse()?);
                } else if meta.path.is_ident("provides") {
                    options.provides.push(meta.value()?.parse::<LitStr>()?.parse()?);
                } else if meta.path.is_ident("listener") {
                    options.listener = true;
                } else if meta.path.is_ident("no_register") {
                    options.no_register = true;
                } else {
                    return Err(meta.error("未知的 injectable 选项"));
                }
                Ok(())
            })?;
        }
        Ok(options)
    }
}

/// 注入字段的限定符
pub enum FieldQualifier {
    None,
    Named(String),
    Marker(Type),
}

/// 字段的 `#[inject]` 属性，未标记时返回 `None`
pub fn inject_qualifier(field: &Field) -> Result<Option<FieldQualifier>> {
    let Some(attr) = field.attrs.iter().find(|attr| attr.path().is_ident("inject")) else {
        return Ok(None);
    };
    if matches!(attr.meta, Meta::Path(_)) {
        return Ok(Some(FieldQualifier::None));
    }

    let mut qualifier = FieldQualifier::None;
    attr.parse_nested_meta(|meta| {
        if !matches!(qualifier, FieldQualifier::None) {
            return Err(meta.error("每个字段只能有一个限定符"));
        }
        if meta.path.is_ident("named") {
            qualifier = FieldQualifier::Named(meta.value()?.parse::<LitStr>()?.value());
        } else if meta.path.is_ident("marker") {
            qualifier = FieldQualifier::Marker(meta.value()?.parse::<LitStr>()?.parse()?);
        } else {
            return Err(meta.error("未知的 inject 选项"));
        }
        Ok(())
    })?;
    Ok(Some(qualifier))
}
