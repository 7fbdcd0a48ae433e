extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse::{Parse, ParseStream},
    parse_macro_input, DeriveInput, Ident, Token, Type,
};

/// Implements `Component` for a payload type. `Component` has to be in scope, which it is when
/// using the crate's prelude.
#[proc_macro_derive(Component)]
pub fn derive_component(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    derive_component_impl(&ast).into()
}

fn derive_component_impl(ast: &DeriveInput) -> TokenStream2 {
    let t_ident = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let name = t_ident.to_string();

    quote! {
        impl #impl_generics Component for #t_ident #ty_generics #where_clause {
            const NAME: &'static str = #name;
        }
    }
}


struct Identifier {
    ident: Ident,
    ty: Type,
}

impl Parse for Identifier {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let ident = input.parse()?;
        input.parse::<Token![,]>()?;
        let ty = input.parse()?;
        Ok(Self { ident, ty })
    }
}

/// `identifier!(Name, u32)` declares a copyable numeric newtype that can index into a
/// `SparseSet`. Only usable inside this crate, as it refers to `crate::store::sparse`.
#[proc_macro]
pub fn identifier(input: TokenStream) -> TokenStream {
    let identifier = parse_macro_input!(input as Identifier);
    identifier_impl(identifier).into()
}

fn identifier_impl(Identifier { ident, ty }: Identifier) -> TokenStream2 {
    quote! {
        #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
        pub struct #ident(#ty);

        impl #ident {
            pub const INVALID: Self = Self(#ty::MAX);

            #[inline]
            pub const fn new(id: #ty) -> Self {
                Self(id)
            }

            #[inline]
            pub const fn id(self) -> #ty {
                self.0
            }

            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl ::std::fmt::Display for #ident {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::write!(f, "{}", self.0)
            }
        }

        impl crate::store::sparse::SparseSetIndex for #ident {
            #[inline]
            fn from_usize(value: usize) -> Self {
                Self(value as #ty)
            }

            #[inline]
            fn as_usize(&self) -> usize {
                self.0 as usize
            }
        }
    }
}
