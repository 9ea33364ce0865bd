mod model;
mod route;

use proc_macro::TokenStream;

/// Creates a documentation transform for the handler, named after it with the suffix `_docs`.
///
/// The first line of the doc comment becomes the summary and the rest the description.
#[proc_macro_attribute]
pub fn route(args: TokenStream, input: TokenStream) -> TokenStream {
	route::from_input(args, input)
}

/// Creates a `CreateX` request body next to the model `X`.
///
/// Fields marked with `#[serde(skip_deserializing)]` or `#[serde(skip)]` are
/// assigned by the server and left out. Every other field is copied verbatim,
/// attributes included, so validation rules follow the model.
#[proc_macro_attribute]
pub fn model(_args: TokenStream, input: TokenStream) -> TokenStream {
	model::from_input(input)
}
