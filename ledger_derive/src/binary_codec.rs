//! Derive macro for the canonical binary codec.
//!
//! Generates `Encode` and `Decode` implementations against `crate::types::encoding`,
//! so it can only be used inside the `ledger_node` crate.
//!
//! # Binary Format
//!
//! - Struct fields are written in declaration order, with no framing of their own.
//! - Enums write a `u8` tag (the variant's position, starting at 0) followed by the
//!   variant's fields in declaration order.
//!
//! The output depends only on the values, never on the platform, which is what makes
//! it usable as the pre-image of a hash.
//!
//! Field names `out` and `input` are reserved by the generated code.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, Ident, parse_macro_input};

pub fn derive_binary_codec(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let (encode_body, decode_body) = match &input.data {
        Data::Struct(data) => {
            let shape = FieldShape::new(&data.fields);
            let pattern = shape.pattern(quote!(Self));
            let writes = shape.writes();
            let build = shape.construct(quote!(Self));
            (
                quote! {
                    let #pattern = self;
                    #(#writes)*
                },
                quote! { Ok(#build) },
            )
        }
        Data::Enum(data) => {
            if data.variants.len() > usize::from(u8::MAX) + 1 {
                return Err(syn::Error::new_spanned(
                    name,
                    "BinaryCodec supports at most 256 enum variants",
                ));
            }

            let mut encode_arms = Vec::with_capacity(data.variants.len());
            let mut decode_arms = Vec::with_capacity(data.variants.len());

            for (position, variant) in data.variants.iter().enumerate() {
                if let Some((_, expr)) = &variant.discriminant {
                    return Err(syn::Error::new_spanned(
                        expr,
                        "BinaryCodec tags follow declaration order; remove the explicit discriminant",
                    ));
                }

                let tag = position as u8;
                let ident = &variant.ident;
                let shape = FieldShape::new(&variant.fields);
                let pattern = shape.pattern(quote!(Self::#ident));
                let writes = shape.writes();
                let build = shape.construct(quote!(Self::#ident));

                encode_arms.push(quote! {
                    #pattern => {
                        crate::types::encoding::Encode::encode(&#tag, out);
                        #(#writes)*
                    }
                });
                decode_arms.push(quote! {
                    #tag => Ok(#build),
                });
            }

            (
                quote! {
                    match self {
                        #(#encode_arms)*
                    }
                },
                quote! {
                    let tag: u8 = crate::types::encoding::Decode::decode(input)?;
                    match tag {
                        #(#decode_arms)*
                        _ => Err(crate::types::encoding::DecodeError::InvalidValue),
                    }
                },
            )
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                name,
                "BinaryCodec cannot be derived for unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics crate::types::encoding::Encode for #name #ty_generics #where_clause {
            fn encode<S: crate::types::encoding::EncodeSink>(&self, out: &mut S) {
                let _ = &out;
                #encode_body
            }
        }

        impl #impl_generics crate::types::encoding::Decode for #name #ty_generics #where_clause {
            fn decode(
                input: &mut &[u8],
            ) -> ::std::result::Result<Self, crate::types::encoding::DecodeError> {
                let _ = &input;
                #decode_body
            }
        }
    })
}

/// The fields of a struct or enum variant, bound to local identifiers.
enum FieldShape {
    Named(Vec<Ident>),
    Unnamed(Vec<Ident>),
    Unit,
}

impl FieldShape {
    fn new(fields: &Fields) -> Self {
        match fields {
            Fields::Named(named) => Self::Named(
                named
                    .named
                    .iter()
                    .filter_map(|field| field.ident.clone())
                    .collect(),
            ),
            Fields::Unnamed(unnamed) => Self::Unnamed(
                (0..unnamed.unnamed.len())
                    .map(|i| format_ident!("f{}", i))
                    .collect(),
            ),
            Fields::Unit => Self::Unit,
        }
    }

    fn bindings(&self) -> &[Ident] {
        match self {
            Self::Named(idents) | Self::Unnamed(idents) => idents,
            Self::Unit => &[],
        }
    }

    /// Destructuring pattern binding every field by reference.
    fn pattern(&self, path: TokenStream2) -> TokenStream2 {
        match self {
            Self::Named(idents) => quote! { #path { #(#idents),* } },
            Self::Unnamed(idents) => quote! { #path(#(#idents),*) },
            Self::Unit => path,
        }
    }

    fn writes(&self) -> Vec<TokenStream2> {
        self.bindings()
            .iter()
            .map(|ident| quote! { crate::types::encoding::Encode::encode(#ident, out); })
            .collect()
    }

    /// Constructor expression decoding every field in declaration order.
    fn construct(&self, path: TokenStream2) -> TokenStream2 {
        match self {
            Self::Named(idents) => quote! {
                #path { #(#idents: crate::types::encoding::Decode::decode(input)?),* }
            },
            Self::Unnamed(idents) => {
                let reads = idents
                    .iter()
                    .map(|_| quote! { crate::types::encoding::Decode::decode(input)? });
                quote! { #path(#(#reads),*) }
            }
            Self::Unit => path,
        }
    }
}
