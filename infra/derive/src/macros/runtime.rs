use proc_macro2::TokenStream;
use quote::quote;
use syn::{Error, Ident, ItemFn, ReturnType, Type};

#[must_use]
pub fn expand_main(args: TokenStream, input: ItemFn) -> TokenStream {
    if input.sig.asyncness.is_none() {
        return Error::new_spanned(&input.sig.fn_token, "#[topo_runtime::main] needs an async fn")
            .to_compile_error();
    }
    if !returns_result(&input.sig.output) {
        return Error::new_spanned(
            &input.sig.output,
            "#[topo_runtime::main] needs a Result return type to report runtime build failures",
        )
        .to_compile_error();
    }

    let profile = match profile_constructor(args) {
        Ok(profile) => profile,
        Err(err) => return err.to_compile_error(),
    };

    let ItemFn { attrs, vis, sig, block } = input;
    let name = &sig.ident;
    let output = &sig.output;

    quote! {
        #(#attrs)*
        #vis fn #name() #output {
            let runtime = ::topo_runtime::build_runtime_with_config(&#profile)?;
            runtime.block_on(async move #block)
        }
    }
}

fn profile_constructor(args: TokenStream) -> syn::Result<TokenStream> {
    if args.is_empty() {
        return Ok(quote! { ::topo_runtime::RuntimeConfig::default() });
    }

    let profile: Ident = syn::parse2(args)?;
    match profile.to_string().as_str() {
        "high_performance" => Ok(quote! { ::topo_runtime::RuntimeConfig::high_performance() }),
        "memory_efficient" => Ok(quote! { ::topo_runtime::RuntimeConfig::memory_efficient() }),
        "default" => Ok(quote! { ::topo_runtime::RuntimeConfig::default() }),
        _ => Err(Error::new_spanned(
            profile,
            "unknown runtime profile (high_performance, memory_efficient, default)",
        )),
    }
}

fn returns_result(output: &ReturnType) -> bool {
    let ReturnType::Type(_, ty) = output else {
        return false;
    };
    matches!(&**ty, Type::Path(p) if p.path.segments.last().is_some_and(|s| s.ident == "Result"))
}
