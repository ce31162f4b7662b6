use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DataEnum, DeriveInput, Fields, Ident};

fn parse_enum<'a>(ast: &'a DeriveInput, macro_name: &str) -> &'a DataEnum {
    let Data::Enum(data) = &ast.data else {
        panic!("{macro_name} can only be applied to enums; {} is not an enum", ast.ident);
    };
    data
}

fn fieldless_variants<'a>(ast: &'a DeriveInput, macro_name: &str) -> Vec<&'a Ident> {
    let name = &ast.ident;
    parse_enum(ast, macro_name)
        .variants
        .iter()
        .map(|variant| {
            let variant_name = &variant.ident;
            assert!(
                matches!(variant.fields, Fields::Unit),
                "{macro_name} only supports fieldless variants; {name}::{variant_name} has fields"
            );
            variant_name
        })
        .collect()
}

pub fn enum_display(input: TokenStream) -> TokenStream {
    let ast: DeriveInput = syn::parse(input).expect("unable to parse input");
    let name = &ast.ident;

    let match_arms = fieldless_variants(&ast, "EnumDisplay").into_iter().map(|variant| {
        let variant_str = variant.to_string();
        quote! { Self::#variant => #variant_str }
    });

    let expanded = quote! {
        impl #name {
            #[must_use]
            pub fn to_str(&self) -> &'static str {
                match self {
                    #(#match_arms,)*
                }
            }
        }

        impl ::std::fmt::Display for #name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.to_str())
            }
        }
    };

    expanded.into()
}

pub fn enum_from_str(input: TokenStream) -> TokenStream {
    let ast: DeriveInput = syn::parse(input).expect("unable to parse input");
    let name = &ast.ident;

    let match_arms = fieldless_variants(&ast, "EnumFromStr").into_iter().map(|variant| {
        let lowercase = variant.to_string().to_ascii_lowercase();
        quote! { #lowercase => ::std::result::Result::Ok(Self::#variant) }
    });

    let err_fmt = format!("invalid {name} string: '{{}}'");
    let expanded = quote! {
        impl ::std::str::FromStr for #name {
            type Err = ::std::string::String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    #(#match_arms,)*
                    _ => ::std::result::Result::Err(::std::format!(#err_fmt, s)),
                }
            }
        }
    };

    expanded.into()
}

pub fn enum_all(input: TokenStream) -> TokenStream {
    let ast: DeriveInput = syn::parse(input).expect("unable to parse input");
    let name = &ast.ident;

    let constructors: Vec<_> = fieldless_variants(&ast, "EnumAll")
        .into_iter()
        .map(|variant| quote! { Self::#variant })
        .collect();
    let len = constructors.len();

    let expanded = quote! {
        impl #name {
            pub const ALL: [Self; #len] = [#(#constructors,)*];
        }
    };

    expanded.into()
}

pub fn match_each_variant_macro(input: TokenStream) -> TokenStream {
    let ast: DeriveInput = syn::parse(input).expect("unable to parse input");
    let name = &ast.ident;

    let match_arms: Vec<_> = parse_enum(&ast, "MatchEachVariantMacro")
        .variants
        .iter()
        .map(|variant| {
            let variant_name = &variant.ident;
            let Fields::Unnamed(fields) = &variant.fields else {
                panic!("{name}::{variant_name} must have exactly one unnamed field");
            };
            assert_eq!(
                fields.unnamed.len(),
                1,
                "{name}::{variant_name} has {} unnamed fields, expected 1",
                fields.unnamed.len()
            );

            quote! { #name::#variant_name($field) => $match_arm }
        })
        .collect();

    let expanded = quote! {
        macro_rules! match_each_variant {
            ($value:expr, $field:ident => $match_arm:expr) => {
                match $value {
                    #(#match_arms,)*
                }
            };
        }
    };

    expanded.into()
}
