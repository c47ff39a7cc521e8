//! Derive macro for error types.
//!
//! Generates `std::fmt::Display` and `std::error::Error` implementations from an
//! `#[error("...")]` attribute on each enum variant (or on the struct itself).
//!
//! ```ignore
//! use ledger_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum StorageError {
//!     #[error("key not found: {0}")]
//!     NotFound(String),
//!
//!     #[error("height {requested} is above the tip ({height})")]
//!     HeightTooHigh { requested: u32, height: u32 },
//!
//!     #[error("backend unavailable")]
//!     Unavailable,
//! }
//! ```
//!
//! Positional placeholders (`{0}`, `{1:?}`) refer to tuple fields and named ones
//! (`{height}`) to struct fields. Fields the message does not mention are allowed.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Fields, Ident, LitStr, parse_macro_input};

pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Enum(data) => {
            let arms = data
                .variants
                .iter()
                .map(|variant| {
                    let message = error_message(&variant.attrs, &variant.ident)?;
                    let ident = &variant.ident;
                    Ok(display_arm(quote!(Self::#ident), &variant.fields, &message))
                })
                .collect::<syn::Result<Vec<_>>>()?;

            quote! {
                match self {
                    #(#arms)*
                }
            }
        }
        Data::Struct(data) => {
            let message = error_message(&input.attrs, name)?;
            let arm = display_arm(quote!(Self), &data.fields, &message);
            quote! {
                match self {
                    #arm
                }
            }
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                name,
                "Error cannot be derived for unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                #body
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
    })
}

/// Builds one `match` arm writing `message` with the fields it references.
fn display_arm(path: TokenStream2, fields: &Fields, message: &LitStr) -> TokenStream2 {
    let referenced = placeholders(&message.value());

    match fields {
        Fields::Unit => quote! {
            #path => write!(f, #message),
        },
        Fields::Named(named) => {
            let idents: Vec<&Ident> = named.named.iter().filter_map(|f| f.ident.as_ref()).collect();
            let used: Vec<&Ident> = idents
                .iter()
                .copied()
                .filter(|ident| referenced.contains(&ident.to_string()))
                .collect();
            quote! {
                #path { #(#used,)* .. } => write!(f, #message, #(#used = #used),*),
            }
        }
        Fields::Unnamed(unnamed) => {
            let count = unnamed.unnamed.len();
            let bindings: Vec<TokenStream2> = (0..count)
                .map(|i| {
                    if referenced.contains(&i.to_string()) {
                        let ident = format_ident!("f{}", i);
                        quote!(#ident)
                    } else {
                        quote!(_)
                    }
                })
                .collect();
            let used: Vec<Ident> = (0..count)
                .filter(|i| referenced.contains(&i.to_string()))
                .map(|i| format_ident!("f{}", i))
                .collect();
            let rewritten = LitStr::new(&positional_to_named(&message.value()), message.span());
            quote! {
                #path(#(#bindings),*) => write!(f, #rewritten, #(#used = #used),*),
            }
        }
    }
}

/// Returns the argument names (or positions) referenced by a format string.
fn placeholders(format: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
            }
            '{' => {
                let mut name = String::new();
                while let Some(&next) = chars.peek() {
                    if next == '}' || next == ':' {
                        break;
                    }
                    name.push(next);
                    chars.next();
                }
                if !name.is_empty() && !names.contains(&name) {
                    names.push(name);
                }
            }
            _ => {}
        }
    }

    names
}

/// Rewrites `{0}` / `{0:?}` into `{f0}` / `{f0:?}` so tuple fields can be passed by name.
fn positional_to_named(format: &str) -> String {
    let mut out = String::with_capacity(format.len() + 8);
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        out.push(c);
        match c {
            '{' if chars.peek() == Some(&'{') => {
                out.push('{');
                chars.next();
            }
            '{' if chars.peek().is_some_and(|next| next.is_ascii_digit()) => out.push('f'),
            _ => {}
        }
    }

    out
}

fn error_message(attrs: &[Attribute], target: &Ident) -> syn::Result<LitStr> {
    let attr = attrs
        .iter()
        .find(|attr| attr.path().is_ident("error"))
        .ok_or_else(|| {
            syn::Error::new_spanned(
                target,
                format!("missing #[error(\"...\")] attribute on `{target}`"),
            )
        })?;

    attr.parse_args::<LitStr>().map_err(|_| {
        syn::Error::new_spanned(
            attr,
            "expected a string literal, e.g. #[error(\"not found: {0}\")]",
        )
    })
}
