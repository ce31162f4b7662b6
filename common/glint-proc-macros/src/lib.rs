mod enums;

use proc_macro::TokenStream;

/// Implement `Display` and a `to_str()` method for an enum with only fieldless variants.
///
/// The display string is the variant name as written.
#[proc_macro_derive(EnumDisplay)]
pub fn enum_display(input: TokenStream) -> TokenStream {
    enums::enum_display(input)
}

/// Implement `FromStr` for an enum with only fieldless variants.
///
/// Parsing is case-insensitive against the variant names.
#[proc_macro_derive(EnumFromStr)]
pub fn enum_from_str(input: TokenStream) -> TokenStream {
    enums::enum_from_str(input)
}

/// Add an `ALL` associated constant containing every variant in declaration order.
#[proc_macro_derive(EnumAll)]
pub fn enum_all(input: TokenStream) -> TokenStream {
    enums::enum_all(input)
}

/// Generate a `match_each_variant!` macro for an enum whose variants each wrap exactly one
/// value, so that a method call can be forwarded to whichever value is present.
#[proc_macro_derive(MatchEachVariantMacro)]
pub fn match_each_variant_macro(input: TokenStream) -> TokenStream {
    enums::match_each_variant_macro(input)
}
