use proc_macro::TokenStream;

use quote::{format_ident, quote};
use syn::{
    bracketed,
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    Ident, LitStr, Result, Token,
};

/// `key: value` pair where the key must match `expected`.
fn parse_key(input: ParseStream, expected: &str) -> Result<()> {
    let key: Ident = input.parse()?;
    if key != expected {
        return Err(syn::Error::new(
            key.span(),
            format!("expected `{}`, found `{}`", expected, key),
        ));
    }
    input.parse::<Token![:]>()?;
    Ok(())
}

fn parse_idents(input: ParseStream) -> Result<Punctuated<Ident, Token![,]>> {
    let content;
    bracketed!(content in input);
    Punctuated::parse_terminated(&content)
}

#[cfg_attr(test, derive(Debug))]
struct OpenApiGroup {
    title: LitStr,
    prefix: LitStr,
    paths: Punctuated<Ident, Token![,]>,
    components: Punctuated<Ident, Token![,]>,
}

impl Parse for OpenApiGroup {
    fn parse(input: ParseStream) -> Result<Self> {
        parse_key(input, "title")?;
        let title = input.parse()?;
        input.parse::<Token![,]>()?;

        parse_key(input, "prefix")?;
        let prefix = input.parse()?;
        input.parse::<Token![,]>()?;

        parse_key(input, "paths")?;
        let paths = parse_idents(input)?;
        input.parse::<Token![,]>()?;

        parse_key(input, "components")?;
        let components = parse_idents(input)?;
        let _ = input.parse::<Option<Token![,]>>()?;

        Ok(Self {
            title,
            prefix,
            paths,
            components,
        })
    }
}

/// Builds the `utoipa::openapi::OpenApi` document of one route group.
///
/// ```ignore
/// foodgram_macro::openapi_group! {
///     title: "Recipes API",
///     prefix: "/api/recipes",
///     paths: [create_recipe, get_recipe],
///     components: [CreateRecipe, Recipe],
/// }
/// ```
#[proc_macro]
pub fn openapi_group(input: TokenStream) -> TokenStream {
    let group = match syn::parse::<OpenApiGroup>(input) {
        Ok(group) => group,
        Err(e) => return e.to_compile_error().into(),
    };

    let OpenApiGroup {
        title,
        prefix,
        paths,
        components,
    } = group;

    let mut chained_paths = quote! {};
    for ident in paths {
        let ident = format_ident!("__path_{}", ident);
        chained_paths.extend(quote! {
            .path(
                format!("{}{}", #prefix, #ident::path()),
                PathItem::from_http_methods(#ident::methods(), #ident::operation()),
            )
        });
    }

    let mut chained_components = quote! {};
    for ident in components {
        chained_components.extend(quote! {
            components = ComponentsBuilder::schema_from::<#ident>(components);
        });
    }

    let output = quote! {
        {
            use utoipa::openapi::{ComponentsBuilder, InfoBuilder, OpenApiBuilder, Paths, path::PathItem};
            use utoipa::Path as _;

            let paths = Paths::builder() #chained_paths .build();

            let mut components = ComponentsBuilder::new();
            #chained_components

            OpenApiBuilder::new()
                .info(
                    InfoBuilder::new()
                        .title(#title)
                        .description(Some(#title))
                        .version("1.0")
                        .build(),
                )
                .paths(paths)
                .components(Some(components.build()))
                .build()
        }
    };

    TokenStream::from(output)
}
