#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Attribute macros used across the topology service workspace:
//!
//! * [`macro@topo_error`] turns a plain enum into a `thiserror` error with context support.
//! * [`macro@topo_slice`] wraps a feature state struct into an `Arc` handle registered as a slice.
//! * [`macro@api_model`] / [`macro@api_handler`] keep DTOs and handlers consistent with `OpenAPI`.
//! * [`macro@main`] boots an `async fn main` on a [`topo_runtime`] profile.
//!
//! Examples are `ignore`d here because a proc-macro crate cannot expand its own macros.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemFn, ItemStruct, parse_macro_input};

/// Turns an `async fn main` into a synchronous `main` running on a configured Tokio runtime.
///
/// Accepted profiles: `high_performance`, `memory_efficient`, `default` (or no argument).
/// The function must return a `Result`, since runtime construction itself can fail.
///
/// ```rust,ignore
/// #[topo_runtime::main(high_performance)]
/// async fn main() -> anyhow::Result<()> {
///     Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn main(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::runtime::expand_main(args.into(), input).into()
}

/// Declares a request/response DTO.
///
/// Adds `Debug`, `Serialize` and `Deserialize` when missing, derives `utoipa::ToSchema`
/// under the `server` feature, and applies `rename_all = "camelCase"` plus
/// `deny_unknown_fields` unless overridden:
///
/// ```rust,ignore
/// #[api_model(deny_unknown_fields = false)]
/// pub struct SearchRequest {
///     #[serde(flatten)]
///     pub filter: serde_json::Map<String, serde_json::Value>,
/// }
/// ```
#[proc_macro_attribute]
pub fn api_model(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    macros::api::expand_api_model(attr.into(), input).into()
}

/// Registers an axum handler with `utoipa::path` when the `server` feature is on.
///
/// ```rust,ignore
/// #[api_handler(post, path = "/classification", tag = CLASSIFICATION_TAG)]
/// pub async fn create(/* extractors */) -> impl IntoResponse { /* ... */ }
/// ```
#[proc_macro_attribute]
pub fn api_handler(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::api::expand_api_handler(args.into(), input).into()
}

/// Defines a crate error enum.
///
/// Every variant must use named fields. A variant carrying a `source` field (or a field
/// marked `#[source]`/`#[from]`) must also carry `context: Option<Cow<'static, str>>`.
///
/// Generated items:
/// * `#[derive(Debug, thiserror::Error)]` when not already derived;
/// * a `<Name>Ext` trait adding `.context(..)` to `Result<T, Name>` and to
///   `Result<T, Source>` for every wrapped source type;
/// * `From<Source>` for each source-carrying variant;
/// * `From<&'static str>` / `From<String>` when an `Internal { message, context }` variant exists;
/// * a module-private `format_context` helper for the `#[error(..)]` strings.
///
/// ```rust,ignore
/// #[topo_error]
/// pub enum StoreError {
///     #[error("Io error{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///     #[error("Internal store error{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
/// ```
#[proc_macro_attribute]
pub fn topo_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}

/// Turns a struct into a feature slice handle.
///
/// The annotated struct becomes `<Name>Inner`; `<Name>` wraps it in an `Arc`, derefs to
/// it and implements `topo_domain::registry::FeatureSlice`.
///
/// ```rust,ignore
/// #[topo_derive::topo_slice]
/// pub struct Audit {
///     pub recorder: AuditRecorder,
/// }
/// ```
#[proc_macro_attribute]
pub fn topo_slice(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as ItemStruct);
    macros::slice::expand_slice(input).into()
}
