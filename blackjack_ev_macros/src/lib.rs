use proc_macro::TokenStream as TokenStream1;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, ToTokens};
use syn::{self, parse_macro_input, parse_quote, DeriveInput, Ident};

/// This macro is added before a method of `Simulator` struct in the impl block.
/// Use this macro to first check if current round phase is exactly the phase in
/// the attribute.
///
/// For example, `#[allowed_phase(Deal)]` will make a method first check
/// if current round phase is `RoundPhase::Deal`. If not, the method will return
/// `SimulationError::WrongPhase`. Both `RoundPhase` and `SimulationError` must be
/// in scope where the method is defined.
#[proc_macro_attribute]
pub fn allowed_phase(attr: TokenStream1, item: TokenStream1) -> TokenStream1 {
    let phase = parse_macro_input!(attr as Ident);
    let mut ast = parse_macro_input!(item as syn::ImplItemFn);
    let operation = ast.sig.ident.to_string();
    let early_return: syn::Stmt = parse_quote! {
        if self.current_phase != RoundPhase::#phase {
            return Err(SimulationError::WrongPhase {
                operation: #operation,
                expected: RoundPhase::#phase,
                actual: self.current_phase,
            });
        }
    };
    ast.block.stmts.insert(0, early_return);
    ast.into_token_stream().into()
}

/// Generates `impl Accumulate` by accumulating every named field in turn.
///
/// Fields are folded with their own `Accumulate` impl, except fields marked
/// `#[accumulate(min)]` or `#[accumulate(max)]`, which must be `Option`s of a
/// `PartialOrd + Copy` type and keep the smaller or larger present value.
#[proc_macro_derive(Accumulate, attributes(accumulate))]
pub fn accumulate_derive(input: TokenStream1) -> TokenStream1 {
    let ast = parse_macro_input!(input as DeriveInput);
    match expand_accumulate(&ast) {
        Ok(ts) => ts.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

enum FieldMode {
    Fold,
    Min,
    Max,
}

fn expand_accumulate(ast: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &ast.ident;
    let data_struct = match &ast.data {
        syn::Data::Struct(x) => x,
        _ => {
            return Err(syn::Error::new_spanned(
                struct_name,
                "Accumulate can only be derived for structs",
            ))
        }
    };
    let named_fields = match &data_struct.fields {
        syn::Fields::Named(x) => x,
        _ => {
            return Err(syn::Error::new_spanned(
                struct_name,
                "Accumulate requires named fields",
            ))
        }
    };

    let mut lines = Vec::with_capacity(named_fields.named.len());
    for field in &named_fields.named {
        let name = field.ident.as_ref().expect("named field");
        let line = match field_mode(field)? {
            FieldMode::Fold => quote! {
                Accumulate::accumulate(&mut self.#name, &other.#name);
            },
            FieldMode::Min => generate_extreme(name, quote!(<)),
            FieldMode::Max => generate_extreme(name, quote!(>)),
        };
        lines.push(line);
    }

    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics Accumulate for #struct_name #ty_generics #where_clause {
            fn accumulate(&mut self, other: &Self) {
                #(#lines)*
            }
        }
    })
}

fn field_mode(field: &syn::Field) -> syn::Result<FieldMode> {
    let mut mode = FieldMode::Fold;
    for attr in &field.attrs {
        if !attr.path().is_ident("accumulate") {
            continue;
        }
        let keyword: Ident = attr.parse_args()?;
        mode = match keyword.to_string().as_str() {
            "min" => FieldMode::Min,
            "max" => FieldMode::Max,
            _ => {
                return Err(syn::Error::new_spanned(
                    keyword,
                    "expected `min` or `max`",
                ))
            }
        };
    }
    Ok(mode)
}

fn generate_extreme(name: &Ident, cmp: TokenStream2) -> TokenStream2 {
    quote! {
        self.#name = match (self.#name, other.#name) {
            (Some(mine), Some(theirs)) => Some(if theirs #cmp mine { theirs } else { mine }),
            (mine, theirs) => mine.or(theirs),
        };
    }
}
