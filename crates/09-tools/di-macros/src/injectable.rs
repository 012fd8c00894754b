//! `#[derive(Injectable)]` 代码生成

use crate::attributes::{inject_qualifier, FieldQualifier, TypeOptions};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{
    Data, DeriveInput, Error, Field, Fields, GenericArgument, Ident, PathArguments, Result, Type,
};

/// 注入字段的形式，由字段类型决定
enum FieldForm {
    /// `Arc<T>`
    Instance(Type),
    /// `Option<Arc<T>>`
    Optional(Type),
    /// `Provider<T>`
    Provider(Type),
}

/// 单个字段的初始化方式
enum FieldInit {
    Injected {
        name: Ident,
        form: FieldForm,
        qualifier: FieldQualifier,
    },
    Defaulted(Ident),
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(&input.generics, "Injectable 不支持泛型类型"));
    }
    let name = &input.ident;
    let options = TypeOptions::from_attributes(&input.attrs)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named.named.iter().map(field_init).collect::<Result<Vec<_>>>()?,
            Fields::Unit => Vec::new(),
            Fields::Unnamed(_) => {
                return Err(Error::new_spanned(name, "Injectable 不支持元组结构体"));
            }
        },
        _ => return Err(Error::new_spanned(name, "Injectable 只能用于结构体")),
    };
    let is_unit = matches!(&input.data, Data::Struct(data) if matches!(data.fields, Fields::Unit));

    let constructor = constructor(&fields, is_unit);
    let post_construct = options.post_construct.as_ref().map(|method| {
        quote! {
            .with_post_construct(|this: &Self| Self::#method(this).map_err(::std::convert::Into::into))
        }
    });
    let pre_destroy = options.pre_destroy.as_ref().map(|method| {
        quote! {
            .with_pre_destroy(|this: &Self| Self::#method(this).map_err(::std::convert::Into::into))
        }
    });
    let listener = options.listener.then(|| quote! { .as_listener() });

    let upcasts = options.provides.iter().map(|target| {
        quote! { ::di_abstractions::upcast!(#name => #target); }
    });

    let registration = (!options.no_register).then(|| {
        let function = format_ident!("__di_register_{}", name.to_string().to_lowercase());
        quote! {
            #[::ctor::ctor]
            fn #function() {
                ::di_abstractions::catalog::register::<#name>();
            }
        }
    });

    Ok(quote! {
        impl ::di_abstractions::Injectable for #name {
            fn descriptor() -> ::di_abstractions::TypeDescriptor<Self> {
                ::di_abstractions::TypeDescriptor::new()
                    .with_constructor(#constructor)
                    #post_construct
                    #pre_destroy
                    #listener
            }
        }

        #(#upcasts)*

        #registration
    })
}

fn field_init(field: &Field) -> Result<FieldInit> {
    let name = field
        .ident
        .clone()
        .ok_or_else(|| Error::new_spanned(field, "需要具名字段"))?;
    match inject_qualifier(field)? {
        Some(qualifier) => {
            let form = field_form(&field.ty).ok_or_else(|| {
                Error::new_spanned(
                    &field.ty,
                    "注入字段的类型必须是 Arc<T>、Option<Arc<T>> 或 Provider<T>",
                )
            })?;
            Ok(FieldInit::Injected {
                name,
                form,
                qualifier,
            })
        }
        None => Ok(FieldInit::Defaulted(name)),
    }
}

fn constructor(fields: &[FieldInit], is_unit: bool) -> TokenStream {
    let injected = fields
        .iter()
        .filter(|field| matches!(field, FieldInit::Injected { .. }))
        .count();

    if injected == 0 {
        let body = if is_unit {
            quote! { Self }
        } else {
            let names = fields.iter().map(|field| match field {
                FieldInit::Defaulted(name) | FieldInit::Injected { name, .. } => name,
            });
            quote! { Self { #(#names: ::std::default::Default::default()),* } }
        };
        return quote! { ::di_abstractions::ConstructorPoint::no_arg("default", || #body) };
    }

    let mut dependencies = Vec::new();
    let mut initializers = Vec::new();
    let mut index = 0usize;
    for field in fields {
        match field {
            FieldInit::Injected {
                name,
                form,
                qualifier,
            } => {
                let (target, kind, take) = match form {
                    FieldForm::Instance(ty) => (ty, quote!(instance), quote!(instance)),
                    FieldForm::Optional(ty) => (ty, quote!(optional), quote!(optional)),
                    FieldForm::Provider(ty) => (ty, quote!(provider), quote!(provider)),
                };
                let key = key(target, qualifier);
                dependencies.push(quote! { ::di_abstractions::Dependency::#kind(#key) });
                initializers.push(quote! { #name: args.#take::<#target>(#index)? });
                index += 1;
            }
            FieldInit::Defaulted(name) => {
                initializers.push(quote! { #name: ::std::default::Default::default() });
            }
        }
    }

    quote! {
        ::di_abstractions::ConstructorPoint::injectable(
            "new",
            ::std::vec![#(#dependencies),*],
            |args: &mut ::di_abstractions::Arguments| {
                ::std::result::Result::Ok(Self { #(#initializers),* })
            },
        )
    }
}

fn key(target: &Type, qualifier: &FieldQualifier) -> TokenStream {
    match qualifier {
        FieldQualifier::None => quote! { ::di_abstractions::Key::of::<#target>() },
        FieldQualifier::Named(name) => quote! { ::di_abstractions::Key::named::<#target>(#name) },
        FieldQualifier::Marker(marker) => {
            quote! { ::di_abstractions::Key::marked::<#target, #marker>() }
        }
    }
}

fn field_form(ty: &Type) -> Option<FieldForm> {
    let (wrapper, inner) = single_argument(ty)?;
    match wrapper.as_str() {
        "Arc" => Some(FieldForm::Instance(inner)),
        "Provider" => Some(FieldForm::Provider(inner)),
        "Option" => match single_argument(&inner)? {
            (arc, target) if arc == "Arc" => Some(FieldForm::Optional(target)),
            _ => None,
        },
        _ => None,
    }
}

/// 取出 `Wrapper<T>` 的末段名称与唯一类型参数
fn single_argument(ty: &Type) -> Option<(String, Type)> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return None;
    };
    if arguments.args.len() != 1 {
        return None;
    }
    match arguments.args.first()? {
        GenericArgument::Type(inner) => Some((segment.ident.to_string(), inner.clone())),
        _ => None,
    }
}
