// Copyright (C) Microsoft Corporation. All rights reserved.

//! Procedural macro behind `test_with_tracing::test`.

use proc_macro::TokenStream;
use quote::quote;
use syn::parse_macro_input;
use syn::spanned::Spanned;
use syn::Error;
use syn::ItemFn;

/// Attribute macro for creating tests with tracing support.
///
/// Wraps the test function so that tracing is initialized and a span named
/// after the test is entered before the body runs.
///
/// # Constraints
///
/// - The function must not be async
/// - The function must not have any parameters
#[proc_macro_attribute]
pub fn test(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let item = parse_macro_input!(item as ItemFn);
    make_test(item)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

fn make_test(mut item: ItemFn) -> syn::Result<proc_macro2::TokenStream> {
    if item.sig.asyncness.is_some() {
        return Err(Error::new(
            item.sig.fn_token.span(),
            "test function must not be async",
        ));
    }
    if !item.sig.inputs.is_empty() {
        return Err(Error::new(item.sig.inputs.span(), "expected 0 arguments"));
    }

    // Attributes such as `#[should_panic]` belong on the outer test function.
    let attrs = std::mem::take(&mut item.attrs);
    let name = item.sig.ident.clone();
    let return_type = item.sig.output.clone();

    Ok(quote! {
        #[::core::prelude::v1::test]
        #(#attrs)*
        fn #name() #return_type {
            #item
            ::test_with_tracing::init();
            let span = ::tracing::span!(::tracing::Level::INFO, stringify!(#name));
            let _span_guard = span.enter();
            #name()
        }
    })
}
