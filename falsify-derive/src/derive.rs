//! Implementation of `#[derive(Arbitrary)]`
//!
//! Structs become a `Gen::compose` over one generator per field. Enums pick a
//! variant with a split of the source and build it the same way.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::parse::Parser;
use syn::{
    Attribute, Data, DeriveInput, Error, Field, Fields, GenericParam, Ident, Index, Lit, Member,
    Meta, MetaList, MetaNameValue, Result, Type, Variant, parse_macro_input, parse_quote,
};

/// Main entry point for the Arbitrary derive macro
pub fn derive_arbitrary_impl(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match generate_arbitrary_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn generate_arbitrary_impl(input: &DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;

    let mut generics = input.generics.clone();
    add_trait_bounds(&mut generics);
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let (arbitrary_body, shrink_body) = match &input.data {
        Data::Struct(data_struct) => (
            struct_generator(name, &data_struct.fields)?,
            struct_shrinks(&data_struct.fields)?,
        ),
        Data::Enum(data_enum) => {
            let variants = data_enum.variants.iter().collect::<Vec<_>>();
            (
                enum_generator(name, &variants)?,
                enum_shrinks(name, &variants)?,
            )
        }
        Data::Union(_) => {
            return Err(Error::new_spanned(
                input,
                "Arbitrary derive is not supported for unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics falsify::Arbitrary for #name #ty_generics #where_clause {
            fn arbitrary() -> falsify::Gen<Self> {
                #arbitrary_body
            }

            fn shrink(&self) -> ::std::vec::Vec<Self> {
                #shrink_body
            }
        }
    })
}

/// Add `falsify::Arbitrary` to every type parameter
fn add_trait_bounds(generics: &mut syn::Generics) {
    for param in &mut generics.params {
        if let GenericParam::Type(ref mut type_param) = *param {
            type_param.bounds.push(parse_quote!(falsify::Arbitrary));
        }
    }
}

/// How a single field is generated and shrunk
enum FieldStrategy {
    Arbitrary,
    Range {
        low: TokenStream,
        high: TokenStream,
        inclusive: bool,
    },
    With(syn::Path),
}

impl FieldStrategy {
    fn generator(&self, ty: &Type) -> TokenStream {
        match self {
            FieldStrategy::Arbitrary => quote! {
                <#ty as falsify::Arbitrary>::arbitrary()
            },
            FieldStrategy::Range {
                low,
                high,
                inclusive,
            } => {
                let high = if *inclusive {
                    quote! { #high }
                } else {
                    quote! { (#high) - 1 }
                };
                quote! {
                    match falsify::Gen::<#ty>::choose(#low, #high) {
                        ::std::result::Result::Ok(generator) => generator,
                        ::std::result::Result::Err(error) => {
                            ::std::panic!("invalid `range` attribute: {}", error)
                        }
                    }
                }
            }
            FieldStrategy::With(path) => quote! { #path() },
        }
    }

    fn shrinks(&self, ty: &Type, value: TokenStream) -> TokenStream {
        match self {
            FieldStrategy::Arbitrary => quote! {
                <#ty as falsify::Arbitrary>::shrink(#value)
            },
            FieldStrategy::Range {
                low,
                high,
                inclusive,
            } => {
                let range = if *inclusive {
                    quote! { (#low..=#high) }
                } else {
                    quote! { (#low..#high) }
                };
                quote! {
                    <#ty as falsify::Arbitrary>::shrink(#value)
                        .into_iter()
                        .filter(|candidate| #range.contains(candidate))
                        .collect::<::std::vec::Vec<#ty>>()
                }
            }
            FieldStrategy::With(_) => quote! { ::std::vec::Vec::<#ty>::new() },
        }
    }
}

/// Member used to access the field, and the local name it is bound to
fn field_bindings(fields: &Fields) -> Vec<(Member, Ident)> {
    fields
        .iter()
        .enumerate()
        .map(|(index, field)| match &field.ident {
            Some(ident) => (Member::Named(ident.clone()), format_ident!("field_{}", ident)),
            None => (
                Member::Unnamed(Index::from(index)),
                format_ident!("field_{}", index),
            ),
        })
        .collect()
}

/// `Path { a: value_a, .. }`, `Path(value_0, ..)` or `Path`
fn construct(path: &TokenStream, fields: &Fields, values: &[TokenStream]) -> TokenStream {
    match fields {
        Fields::Named(named) => {
            let names = named.named.iter().map(|field| &field.ident);
            quote! { #path { #(#names: #values,)* } }
        }
        Fields::Unnamed(_) => quote! { #path(#(#values,)*) },
        Fields::Unit => quote! { #path },
    }
}

/// A `Gen<Self>` building `path` from one generator per field
fn compose_fields(path: &TokenStream, fields: &Fields) -> Result<TokenStream> {
    if matches!(fields, Fields::Unit) {
        return Ok(quote! { falsify::Gen::constant(#path) });
    }

    let bindings = field_bindings(fields);
    let generators = fields
        .iter()
        .zip(&bindings)
        .map(|(field, (_, binding))| {
            let generator = parse_field_attributes(field)?.generator(&field.ty);
            Ok(quote! { let #binding = #generator; })
        })
        .collect::<Result<Vec<_>>>()?;
    let values = bindings
        .iter()
        .map(|(_, binding)| quote! { composer.generate(&#binding) })
        .collect::<Vec<_>>();
    let value = construct(path, fields, &values);

    Ok(quote! {
        {
            #(#generators)*
            falsify::Gen::compose(move |composer: &mut falsify::GenComposer| #value)
        }
    })
}

fn struct_generator(name: &Ident, fields: &Fields) -> Result<TokenStream> {
    compose_fields(&quote! { #name }, fields)
}

fn enum_generator(name: &Ident, variants: &[&Variant]) -> Result<TokenStream> {
    if variants.is_empty() {
        return Err(Error::new_spanned(
            name,
            "Cannot derive Arbitrary for empty enum",
        ));
    }

    let last = variants.len() - 1;
    let variant_generators = variants
        .iter()
        .map(|variant| {
            let variant_name = &variant.ident;
            compose_fields(&quote! { #name::#variant_name }, &variant.fields)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(quote! {
        let variants: ::std::vec::Vec<falsify::Gen<Self>> = vec![#(#variant_generators,)*];
        falsify::Gen::new(move |source: falsify::RandomSource, size: usize| {
            let (pick, rest) = source.split();
            let (index, _) = pick.bounded(0usize, #last);
            variants[index].generate(rest, size)
        })
    })
}

fn struct_shrinks(fields: &Fields) -> Result<TokenStream> {
    if fields.is_empty() {
        return Ok(quote! { ::std::vec::Vec::new() });
    }

    let bindings = field_bindings(fields);
    let per_field = fields
        .iter()
        .zip(&bindings)
        .map(|(field, (member, _))| {
            let shrinks = parse_field_attributes(field)?.shrinks(&field.ty, quote! { &self.#member });
            Ok(quote! {
                for candidate in #shrinks {
                    let mut next = ::std::clone::Clone::clone(self);
                    next.#member = candidate;
                    candidates.push(next);
                }
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(quote! {
        let mut candidates: ::std::vec::Vec<Self> = ::std::vec::Vec::new();
        #(#per_field)*
        candidates
    })
}

fn enum_shrinks(name: &Ident, variants: &[&Variant]) -> Result<TokenStream> {
    let towards_unit = variants
        .iter()
        .find(|variant| matches!(variant.fields, Fields::Unit))
        .map(|variant| {
            let variant_name = &variant.ident;
            quote! {
                if !matches!(self, #name::#variant_name) {
                    candidates.push(#name::#variant_name);
                }
            }
        });

    let arms = variants
        .iter()
        .map(|variant| {
            let variant_name = &variant.ident;
            let path = quote! { #name::#variant_name };
            let bindings = field_bindings(&variant.fields);
            let locals = bindings
                .iter()
                .map(|(_, binding)| quote! { #binding })
                .collect::<Vec<_>>();
            let pattern = construct(&path, &variant.fields, &locals);

            let per_field = variant
                .fields
                .iter()
                .enumerate()
                .map(|(position, field)| {
                    let binding = &bindings[position].1;
                    let shrinks =
                        parse_field_attributes(field)?.shrinks(&field.ty, quote! { #binding });
                    let values = bindings
                        .iter()
                        .enumerate()
                        .map(|(other, (_, local))| {
                            if other == position {
                                quote! { candidate }
                            } else {
                                quote! { ::std::clone::Clone::clone(#local) }
                            }
                        })
                        .collect::<Vec<_>>();
                    let rebuilt = construct(&path, &variant.fields, &values);
                    Ok(quote! {
                        for candidate in #shrinks {
                            candidates.push(#rebuilt);
                        }
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(quote! {
                #pattern => {
                    #(#per_field)*
                }
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(quote! {
        let mut candidates: ::std::vec::Vec<Self> = ::std::vec::Vec::new();
        #towards_unit
        match self {
            #(#arms)*
        }
        candidates
    })
}

/// Parse field-level attributes for customization
fn parse_field_attributes(field: &Field) -> Result<FieldStrategy> {
    for attr in &field.attrs {
        if attr.path().is_ident("arbitrary") {
            return parse_arbitrary_attribute(attr);
        }
    }
    Ok(FieldStrategy::Arbitrary)
}

/// Parse a #[arbitrary(...)] attribute
fn parse_arbitrary_attribute(attr: &Attribute) -> Result<FieldStrategy> {
    let Meta::List(MetaList { tokens, .. }) = &attr.meta else {
        return Err(Error::new_spanned(
            attr,
            "arbitrary attribute must be a list",
        ));
    };

    let parser = syn::punctuated::Punctuated::<Meta, syn::Token![,]>::parse_terminated;
    let parsed = parser.parse2(tokens.clone())?;

    let mut strategy = None;
    for meta in parsed {
        let Meta::NameValue(MetaNameValue { path, value, .. }) = &meta else {
            return Err(Error::new_spanned(
                meta,
                "Unsupported arbitrary attribute format",
            ));
        };
        let parsed = if path.is_ident("range") {
            parse_range_attribute(value)?
        } else if path.is_ident("with") {
            parse_with_attribute(value)?
        } else {
            return Err(Error::new_spanned(
                path,
                "Unknown arbitrary attribute, expected `range` or `with`",
            ));
        };
        if strategy.replace(parsed).is_some() {
            return Err(Error::new_spanned(
                &meta,
                "Only one of `range` and `with` may be given",
            ));
        }
    }

    strategy.ok_or_else(|| Error::new_spanned(attr, "Empty arbitrary attribute"))
}

fn string_literal(value: &syn::Expr) -> Option<String> {
    match value {
        syn::Expr::Lit(syn::ExprLit {
            lit: Lit::Str(lit_str),
            ..
        }) => Some(lit_str.value()),
        _ => None,
    }
}

/// Parse range attribute (e.g., range = "1..=100")
fn parse_range_attribute(value: &syn::Expr) -> Result<FieldStrategy> {
    let text = string_literal(value).unwrap_or_default();
    let (low, high, inclusive) = parse_range_string(&text).ok_or_else(|| {
        Error::new_spanned(
            value,
            "Range attribute must be a string literal in format \"lo..=hi\" or \"lo..hi\"",
        )
    })?;
    if let Some(problem) = literal_range_problem(&text) {
        return Err(Error::new_spanned(value, problem));
    }
    Ok(FieldStrategy::Range {
        low,
        high,
        inclusive,
    })
}

/// Parse with attribute (e.g., with = "my_module::names")
fn parse_with_attribute(value: &syn::Expr) -> Result<FieldStrategy> {
    let Some(text) = string_literal(value) else {
        return Err(Error::new_spanned(
            value,
            "With attribute must be a string literal naming a function",
        ));
    };
    syn::parse_str::<syn::Path>(&text)
        .map(FieldStrategy::With)
        .map_err(|e| Error::new_spanned(value, format!("Invalid function path: {}", e)))
}

/// Split "lo..=hi" or "lo..hi" into its trimmed bound texts
fn split_range(range_str: &str) -> Option<(&str, &str, bool)> {
    let pos = range_str.find("..")?;
    let start_str = range_str[..pos].trim();
    let (end_str, inclusive) = match range_str[pos + 2..].strip_prefix('=') {
        Some(end) => (end.trim(), true),
        None => (range_str[pos + 2..].trim(), false),
    };
    if start_str.is_empty() || end_str.is_empty() {
        return None;
    }
    Some((start_str, end_str, inclusive))
}

/// Parse a range string like "1..=100" or "1..100" into its bounds
fn parse_range_string(range_str: &str) -> Option<(TokenStream, TokenStream, bool)> {
    let (start_str, end_str, inclusive) = split_range(range_str)?;
    let start = start_str.parse::<TokenStream>().ok()?;
    let end = end_str.parse::<TokenStream>().ok()?;
    Some((start, end, inclusive))
}

/// A numeric literal bound, ignoring digit separators
enum LiteralBound {
    Int(i128),
    Float(f64),
}

fn literal_bound(text: &str) -> Option<LiteralBound> {
    let digits = text.replace('_', "");
    if let Ok(value) = digits.parse::<i128>() {
        return Some(LiteralBound::Int(value));
    }
    digits.parse::<f64>().ok().map(LiteralBound::Float)
}

/// Why a range with literal bounds can never produce a value, if it can't.
///
/// Bounds that are not plain literals (constants, suffixed literals) are
/// checked by `Gen::choose` when the generator is built.
fn literal_range_problem(range_str: &str) -> Option<String> {
    let (start_str, end_str, inclusive) = split_range(range_str)?;
    let empty = match (literal_bound(start_str)?, literal_bound(end_str)?) {
        (LiteralBound::Int(low), LiteralBound::Int(high)) => {
            if inclusive { low > high } else { low >= high }
        }
        (LiteralBound::Int(_), LiteralBound::Float(_))
        | (LiteralBound::Float(_), LiteralBound::Int(_)) => {
            return Some(format!(
                "Range \"{}\" mixes integer and float bounds",
                range_str
            ));
        }
        (LiteralBound::Float(_), LiteralBound::Float(_)) if !inclusive => {
            return Some(format!(
                "Range \"{}\" needs integer bounds to be exclusive, use \"lo..=hi\"",
                range_str
            ));
        }
        (LiteralBound::Float(low), LiteralBound::Float(high)) => {
            low.is_nan() || high.is_nan() || low > high
        }
    };
    empty.then(|| format!("Range \"{}\" is empty", range_str))
}
