//! Derive macros for `action-spy`.
//!
//! Use through the re-export in `action_spy` (enabled by the default
//! `macros` feature) rather than depending on this crate directly.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, parse_macro_input};

/// Derive `action_spy::Action`.
///
/// - Enums: the action type is the variant name.
/// - Structs: the action type is the struct name.
/// - `#[action(rename = "...")]` on a variant or on the struct overrides it.
///
/// ```rust,ignore
/// #[derive(Action)]
/// enum Cart {
///     AddItem(u32),
///     #[action(rename = "cart/checkout")]
///     Checkout { total: u64 },
/// }
/// ```
#[proc_macro_derive(Action, attributes(action))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Enum(data) => {
            let arms = data
                .variants
                .iter()
                .map(|variant| {
                    let ident = &variant.ident;
                    let tag = rename(&variant.attrs)?.unwrap_or_else(|| ident.to_string());
                    let pattern = match &variant.fields {
                        Fields::Unit => quote! { Self::#ident },
                        Fields::Unnamed(_) => quote! { Self::#ident(..) },
                        Fields::Named(_) => quote! { Self::#ident { .. } },
                    };
                    Ok(quote! { #pattern => #tag })
                })
                .collect::<syn::Result<Vec<_>>>()?;
            if arms.is_empty() {
                quote! { match *self {} }
            } else {
                quote! {
                    ::std::borrow::Cow::Borrowed(match self {
                        #(#arms,)*
                    })
                }
            }
        }
        Data::Struct(_) => {
            let tag = rename(&input.attrs)?.unwrap_or_else(|| name.to_string());
            quote! { ::std::borrow::Cow::Borrowed(#tag) }
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                name,
                "Action cannot be derived for unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::action_spy::Action for #name #ty_generics #where_clause {
            fn action_type(&self) -> ::std::borrow::Cow<'_, str> {
                #body
            }
        }
    })
}

/// Reads `#[action(rename = "...")]`, if present.
fn rename(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut renamed = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("action")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                renamed = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported action attribute, expected `rename`"))
            }
        })?;
    }
    Ok(renamed)
}
