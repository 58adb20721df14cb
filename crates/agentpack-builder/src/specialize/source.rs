// ABOUTME: Structural rename of the template source's single type definition to its index-qualified name.
// ABOUTME: Parses with syn, rewrites every identifier occurrence and string literal, and re-prints with prettyplease.

use std::mem;

use agentpack_core::naming;
use proc_macro2::{Group, Ident, Literal, TokenStream, TokenTree};
use syn::visit_mut::{self, VisitMut};
use syn::{Item, LitByteStr, LitStr, Macro, MetaList};

use super::SpecializeError;

/// Rename the template's type definition to `agent<index>` and normalize
/// string literals.
pub fn specialize_source(template: &str, index: usize) -> Result<String, SpecializeError> {
    let mut file = syn::parse_file(template)
        .map_err(|e| SpecializeError::SourceMalformed(format!("parse error: {}", e)))?;

    let from = single_type_definition(&file.items)?;
    let to = naming::tool_name(index);

    let mut renamer = Renamer {
        from: from.clone(),
        to,
    };
    renamer.visit_file_mut(&mut file);
    let output = prettyplease::unparse(&file);

    let residual = count_identifier(&output, &from)?;
    if residual > 0 {
        return Err(SpecializeError::SourceMalformed(format!(
            "{} occurrence(s) of '{}' survived the rename",
            residual, from
        )));
    }

    Ok(output)
}

/// Count identifier tokens equal to `name`, including inside macro bodies.
/// Substrings of longer identifiers do not count.
pub fn count_identifier(source: &str, name: &str) -> Result<usize, SpecializeError> {
    let tokens: TokenStream = source
        .parse()
        .map_err(|e| SpecializeError::SourceMalformed(format!("lex error: {}", e)))?;
    Ok(count_in_tokens(tokens, name))
}

fn count_in_tokens(tokens: TokenStream, name: &str) -> usize {
    tokens
        .into_iter()
        .map(|tree| match tree {
            TokenTree::Ident(ident) if ident == name => 1,
            TokenTree::Group(group) => count_in_tokens(group.stream(), name),
            _ => 0,
        })
        .sum()
}

/// Find the name of the one top-level struct, enum or union.
fn single_type_definition(items: &[Item]) -> Result<String, SpecializeError> {
    let names: Vec<String> = items
        .iter()
        .filter_map(|item| match item {
            Item::Struct(item) => Some(item.ident.to_string()),
            Item::Enum(item) => Some(item.ident.to_string()),
            Item::Union(item) => Some(item.ident.to_string()),
            _ => None,
        })
        .collect();

    match names.as_slice() {
        [name] => Ok(name.clone()),
        [] => Err(SpecializeError::SourceMalformed(
            "no top-level type definition".to_string(),
        )),
        many => Err(SpecializeError::SourceMalformed(format!(
            "expected one top-level type definition, found {}: {}",
            many.len(),
            many.join(", ")
        ))),
    }
}

struct Renamer {
    from: String,
    to: String,
}

impl Renamer {
    /// Rewrite raw tokens that syn does not parse: macro bodies and
    /// attribute arguments.
    fn rewrite_tokens(&self, tokens: TokenStream) -> TokenStream {
        tokens
            .into_iter()
            .map(|tree| match tree {
                TokenTree::Ident(ident) if ident == self.from => {
                    TokenTree::Ident(Ident::new(&self.to, ident.span()))
                }
                TokenTree::Group(group) => {
                    let mut rewritten =
                        Group::new(group.delimiter(), self.rewrite_tokens(group.stream()));
                    rewritten.set_span(group.span());
                    TokenTree::Group(rewritten)
                }
                TokenTree::Literal(lit) => TokenTree::Literal(normalize_literal(lit)),
                other => other,
            })
            .collect()
    }
}

impl VisitMut for Renamer {
    fn visit_ident_mut(&mut self, ident: &mut Ident) {
        if *ident == self.from {
            *ident = Ident::new(&self.to, ident.span());
        }
    }

    fn visit_macro_mut(&mut self, mac: &mut Macro) {
        visit_mut::visit_macro_mut(self, mac);
        mac.tokens = self.rewrite_tokens(mem::take(&mut mac.tokens));
    }

    fn visit_meta_list_mut(&mut self, list: &mut MetaList) {
        visit_mut::visit_meta_list_mut(self, list);
        list.tokens = self.rewrite_tokens(mem::take(&mut list.tokens));
    }

    fn visit_lit_str_mut(&mut self, lit: &mut LitStr) {
        *lit = LitStr::new(&lit.value(), lit.span());
    }

    fn visit_lit_byte_str_mut(&mut self, lit: &mut LitByteStr) {
        *lit = LitByteStr::new(&lit.value(), lit.span());
    }
}

/// Re-emit raw and escaped string literals in the standard escaped form.
/// Other literals are returned unchanged.
fn normalize_literal(lit: Literal) -> Literal {
    let repr = lit.to_string();

    let normalized = if let Ok(s) = syn::parse_str::<LitStr>(&repr)
        && s.suffix().is_empty()
    {
        Some(Literal::string(&s.value()))
    } else if let Ok(b) = syn::parse_str::<LitByteStr>(&repr)
        && b.suffix().is_empty()
    {
        Some(Literal::byte_string(&b.value()))
    } else {
        None
    };

    match normalized {
        Some(mut out) => {
            out.set_span(lit.span());
            out
        }
        None => lit,
    }
}
