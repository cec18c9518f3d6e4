use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{Attribute, Expr, ItemFn, ItemStruct, Lit, LitStr, Meta, MetaNameValue, Token};

use super::error::derived_names;

#[derive(Default)]
struct ModelArgs {
    rename_all: Option<LitStr>,
    deny_unknown_fields: Option<bool>,
}

/// Serde container options already written by hand on the struct.
#[derive(Default)]
struct ExistingSerde {
    rename_all: Option<LitStr>,
    deny_unknown_fields: bool,
}

pub fn expand_api_model(args: TokenStream, input: ItemStruct) -> TokenStream {
    match model_attributes(args, &input) {
        Ok(extra) => quote! {
            #extra
            #input
        },
        Err(err) => err.to_compile_error(),
    }
}

pub fn expand_api_handler(args: TokenStream, input: ItemFn) -> TokenStream {
    let ItemFn { attrs, vis, sig, block } = input;

    quote! {
        #(#attrs)*
        #[allow(clippy::unused_async)]
        #[cfg_attr(feature = "server", ::utoipa::path(#args))]
        #vis #sig #block
    }
}

fn model_attributes(args: TokenStream, input: &ItemStruct) -> syn::Result<TokenStream> {
    let args = parse_model_args(args)?;
    let existing = existing_serde(&input.attrs)?;
    let derived = derived_names(&input.attrs);

    let mut derives = Vec::new();
    if !derived.contains("Debug") {
        derives.push(quote! { Debug });
    }
    if !derived.contains("Serialize") {
        derives.push(quote! { ::serde::Serialize });
    }
    if !derived.contains("Deserialize") {
        derives.push(quote! { ::serde::Deserialize });
    }
    let derive = if derives.is_empty() {
        TokenStream::new()
    } else {
        quote! { #[derive(#(#derives),*)] }
    };

    let schema = if derived.contains("ToSchema") {
        TokenStream::new()
    } else {
        quote! { #[cfg_attr(feature = "server", derive(::utoipa::ToSchema))] }
    };

    let casing = args.rename_all.unwrap_or_else(|| LitStr::new("camelCase", Span::call_site()));
    let rename = match &existing.rename_all {
        Some(current) if current.value() != casing.value() => {
            return Err(syn::Error::new_spanned(
                current,
                "serde(rename_all) disagrees with api_model; drop one of them",
            ));
        }
        Some(_) => TokenStream::new(),
        None => quote! { #[serde(rename_all = #casing)] },
    };

    let deny = args.deny_unknown_fields.unwrap_or(true);
    let strict = match (existing.deny_unknown_fields, deny) {
        (true, false) => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "serde(deny_unknown_fields) is set by hand; remove it to opt out",
            ));
        }
        (false, true) => quote! { #[serde(deny_unknown_fields)] },
        _ => TokenStream::new(),
    };

    Ok(quote! {
        #derive
        #schema
        #rename
        #strict
    })
}

fn parse_model_args(args: TokenStream) -> syn::Result<ModelArgs> {
    let metas = Punctuated::<Meta, Token![,]>::parse_terminated.parse2(args)?;
    let mut parsed = ModelArgs::default();

    for meta in metas {
        let Meta::NameValue(nv) = meta else {
            return Err(syn::Error::new_spanned(meta, "expected `key = value` arguments"));
        };
        if nv.path.is_ident("rename_all") {
            let Lit::Str(value) = literal(&nv)? else {
                return Err(syn::Error::new_spanned(&nv.value, "rename_all takes a string"));
            };
            replace_once(&mut parsed.rename_all, value, &nv)?;
        } else if nv.path.is_ident("deny_unknown_fields") {
            let Lit::Bool(value) = literal(&nv)? else {
                return Err(syn::Error::new_spanned(&nv.value, "deny_unknown_fields takes a bool"));
            };
            replace_once(&mut parsed.deny_unknown_fields, value.value, &nv)?;
        } else {
            return Err(syn::Error::new_spanned(
                &nv.path,
                "unknown api_model argument (rename_all, deny_unknown_fields)",
            ));
        }
    }

    Ok(parsed)
}

fn literal(nv: &MetaNameValue) -> syn::Result<Lit> {
    match &nv.value {
        Expr::Lit(expr) => Ok(expr.lit.clone()),
        other => Err(syn::Error::new_spanned(other, "expected a literal")),
    }
}

fn replace_once<T>(slot: &mut Option<T>, value: T, nv: &MetaNameValue) -> syn::Result<()> {
    if slot.replace(value).is_some() {
        return Err(syn::Error::new_spanned(nv, "argument given twice"));
    }
    Ok(())
}

fn existing_serde(attrs: &[Attribute]) -> syn::Result<ExistingSerde> {
    let mut found = ExistingSerde::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                found.rename_all = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("deny_unknown_fields") {
                found.deny_unknown_fields = true;
            } else if meta.input.peek(Token![=]) {
                let _: Expr = meta.value()?.parse()?;
            }
            Ok(())
        })?;
    }
    Ok(found)
}
