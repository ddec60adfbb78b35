//! perfbench Macros
//!
//! Procedural macro that describes a benchmarked type.
//!
//! ## Macros
//!
//! - `#[bench_class]` - Generate the `BenchClass` descriptor of an inherent impl block
//!
//! ## Method attributes
//!
//! Recognized inside a `#[bench_class]` block and stripped from the output:
//! `#[bench]`, `#[bench(runs = N)]`, `#[skip_bench]`, `#[before_first_run]`,
//! `#[before_each_run]`, `#[after_each_run]`, `#[after_last_run]`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    FnArg, GenericArgument, ImplItem, ImplItemFn, ItemImpl, PathArguments, ReturnType, Type,
    parse_macro_input,
};

// ============================================================================
// Attribute Parsing Helpers
// ============================================================================

mod attr {
    use syn::meta::ParseNestedMeta;

    /// Get the attribute name as a string
    pub fn name(meta: &ParseNestedMeta) -> String {
        meta.path
            .get_ident()
            .map(|i| i.to_string())
            .unwrap_or_default()
    }

    /// Parse a string literal attribute: `attr = "value"`
    pub fn string(meta: &ParseNestedMeta) -> syn::Result<String> {
        let value: syn::LitStr = meta.value()?.parse()?;
        Ok(value.value())
    }

    /// Parse a repetition count: `runs = 5`, at least 1
    pub fn runs(meta: &ParseNestedMeta) -> syn::Result<u32> {
        let value: syn::LitInt = meta.value()?.parse()?;
        let runs: u32 = value.base10_parse()?;
        if runs == 0 {
            return Err(syn::Error::new_spanned(value, "runs must be at least 1"));
        }
        Ok(runs)
    }

    /// Parse a boolean literal attribute: `attr = true`
    pub fn bool(meta: &ParseNestedMeta) -> syn::Result<bool> {
        let value: syn::LitBool = meta.value()?.parse()?;
        Ok(value.value())
    }

    /// Create an unknown attribute error
    pub fn unknown(meta: &ParseNestedMeta, name: &str) -> syn::Error {
        meta.error(format!("unknown attribute: {}", name))
    }
}

/// Method attributes understood inside `#[bench_class]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Helper {
    Bench,
    Skip,
    BeforeFirstRun,
    BeforeEachRun,
    AfterEachRun,
    AfterLastRun,
}

impl Helper {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "bench" => Helper::Bench,
            "skip_bench" => Helper::Skip,
            "before_first_run" => Helper::BeforeFirstRun,
            "before_each_run" => Helper::BeforeEachRun,
            "after_each_run" => Helper::AfterEachRun,
            "after_last_run" => Helper::AfterLastRun,
            _ => return None,
        })
    }

    fn attr_name(self) -> &'static str {
        match self {
            Helper::Bench => "bench",
            Helper::Skip => "skip_bench",
            Helper::BeforeFirstRun => "before_first_run",
            Helper::BeforeEachRun => "before_each_run",
            Helper::AfterEachRun => "after_each_run",
            Helper::AfterLastRun => "after_last_run",
        }
    }

    fn role(self) -> TokenStream2 {
        match self {
            Helper::Bench => quote! { ::perfbench::internal::Role::Bench },
            Helper::Skip => quote! { ::perfbench::internal::Role::Skip },
            Helper::BeforeFirstRun => quote! { ::perfbench::internal::Role::BeforeFirstRun },
            Helper::BeforeEachRun => quote! { ::perfbench::internal::Role::BeforeEachRun },
            Helper::AfterEachRun => quote! { ::perfbench::internal::Role::AfterEachRun },
            Helper::AfterLastRun => quote! { ::perfbench::internal::Role::AfterLastRun },
        }
    }
}

/// Describe a benchmarked type from its inherent impl block
///
/// The type must implement `Default` and `Send`; one instance is created per
/// run. Methods are registered in declaration order with their real
/// visibility, parameter count and return type, so invalid benchmarks are
/// reported by the runner rather than silently dropped.
///
/// # Example
///
/// ```ignore
/// #[derive(Default)]
/// struct Parser { input: String }
///
/// #[bench_class(runs = 10)]
/// impl Parser {
///     #[before_each_run]
///     pub fn load(&mut self) { self.input = sample(); }
///
///     #[bench]
///     pub fn parse(&mut self) { parse(&self.input); }
///
///     #[bench(runs = 100)]
///     pub fn validate(&self) -> Result<(), ParseError> { validate(&self.input) }
/// }
/// ```
///
/// Arguments: `name = "..."` (defaults to the type name), `runs = N`
/// (repetitions for methods without their own), `bench_all = true` (treat
/// every public method without a marker as a benchmark).
///
/// `Result<(), E>` methods fail the invocation on `Err`; `E` must implement
/// `Display`. Methods taking `self` by value run on a taken instance,
/// leaving `Default::default()` behind.
#[proc_macro_attribute]
pub fn bench_class(args: TokenStream, item: TokenStream) -> TokenStream {
    let args = TokenStream2::from(args);
    let input = parse_macro_input!(item as ItemImpl);

    bench_class_impl(args, input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

#[derive(Default)]
struct ClassConfig {
    name: Option<String>,
    runs: Option<u32>,
    bench_all: bool,
}

fn parse_class_config(args: TokenStream2) -> Result<ClassConfig, syn::Error> {
    let mut config = ClassConfig::default();

    if args.is_empty() {
        return Ok(config);
    }

    let parser = syn::meta::parser(|meta| {
        let name = attr::name(&meta);
        match name.as_str() {
            "name" => config.name = Some(attr::string(&meta)?),
            "runs" => config.runs = Some(attr::runs(&meta)?),
            "bench_all" => config.bench_all = attr::bool(&meta)?,
            _ => return Err(attr::unknown(&meta, &name)),
        }
        Ok(())
    });

    syn::parse::Parser::parse2(parser, args)?;
    Ok(config)
}

fn bench_class_impl(args: TokenStream2, mut input: ItemImpl) -> Result<TokenStream2, syn::Error> {
    let config = parse_class_config(args)?;

    if let Some((_, path, _)) = &input.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "bench_class must be placed on an inherent impl block",
        ));
    }
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "bench_class does not support generic impl blocks",
        ));
    }

    let class_name = match config.name {
        Some(name) => name,
        None => type_name(&input.self_ty)?,
    };

    let mut methods = Vec::new();
    for item in &mut input.items {
        match item {
            ImplItem::Fn(method) => {
                let (helpers, runs) = take_helpers(method)?;
                if let Some(tokens) = describe_method(method, &helpers, runs, config.bench_all)? {
                    methods.push(tokens);
                }
            }
            ImplItem::Const(c) => reject_helpers(&c.attrs)?,
            ImplItem::Type(t) => reject_helpers(&t.attrs)?,
            _ => {}
        }
    }

    let self_ty = &input.self_ty;
    let runs = config.runs.map(|r| quote! { .runs(#r) });
    let bench_all = config.bench_all.then(|| quote! { .bench_all(true) });

    Ok(quote! {
        #input

        impl ::perfbench::BenchClass for #self_ty {
            fn descriptor() -> &'static ::perfbench::ClassDescriptor {
                static DESCRIPTOR: ::std::sync::OnceLock<::perfbench::ClassDescriptor> =
                    ::std::sync::OnceLock::new();
                DESCRIPTOR.get_or_init(|| {
                    ::perfbench::ClassDescriptor::builder::<Self>(#class_name)
                        #runs
                        #bench_all
                        #(#methods)*
                        .build()
                })
            }
        }
    })
}

fn type_name(ty: &Type) -> syn::Result<String> {
    match ty {
        Type::Path(p) if p.qself.is_none() => p
            .path
            .segments
            .last()
            .map(|s| s.ident.to_string())
            .ok_or_else(|| syn::Error::new_spanned(ty, "expected a type name")),
        _ => Err(syn::Error::new_spanned(
            ty,
            "cannot derive a class name from this type; use `name = \"...\"`",
        )),
    }
}

fn helper_of(attr: &syn::Attribute) -> Option<Helper> {
    attr.path()
        .get_ident()
        .and_then(|i| Helper::from_name(&i.to_string()))
}

fn reject_helpers(attrs: &[syn::Attribute]) -> syn::Result<()> {
    match attrs.iter().find(|a| helper_of(a).is_some()) {
        Some(attr) => Err(syn::Error::new_spanned(
            attr,
            "benchmark attributes can only be placed on methods",
        )),
        None => Ok(()),
    }
}

/// Remove helper attributes from `method`, returning them with the `runs` override
fn take_helpers(method: &mut ImplItemFn) -> syn::Result<(Vec<Helper>, Option<u32>)> {
    let mut helpers = Vec::new();
    let mut runs = None;
    let mut kept = Vec::with_capacity(method.attrs.len());

    for attribute in std::mem::take(&mut method.attrs) {
        let Some(helper) = helper_of(&attribute) else {
            kept.push(attribute);
            continue;
        };

        match (&attribute.meta, helper) {
            (syn::Meta::Path(_), _) => {}
            (syn::Meta::List(_), Helper::Bench) => {
                attribute.parse_nested_meta(|meta| {
                    let name = attr::name(&meta);
                    match name.as_str() {
                        "runs" => runs = Some(attr::runs(&meta)?),
                        _ => return Err(attr::unknown(&meta, &name)),
                    }
                    Ok(())
                })?;
            }
            _ => {
                return Err(syn::Error::new_spanned(
                    &attribute,
                    format!("`#[{}]` takes no arguments", helper.attr_name()),
                ));
            }
        }

        if !helpers.contains(&helper) {
            helpers.push(helper);
        }
    }

    method.attrs = kept;
    Ok((helpers, runs))
}

/// Shape of a method's return type
#[derive(Debug, PartialEq)]
enum Shape {
    Unit,
    Fallible,
    Value(String),
}

fn is_unit(ty: &Type) -> bool {
    match ty {
        Type::Tuple(t) => t.elems.is_empty(),
        Type::Paren(p) => is_unit(&p.elem),
        _ => false,
    }
}

fn return_shape(output: &ReturnType) -> Shape {
    let ReturnType::Type(_, ty) = output else {
        return Shape::Unit;
    };
    if is_unit(ty) {
        return Shape::Unit;
    }

    if let Type::Path(p) = ty.as_ref() {
        if let Some(segment) = p.path.segments.last() {
            if segment.ident == "Result" {
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(GenericArgument::Type(ok)) = args.args.first() {
                        if is_unit(ok) {
                            return Shape::Fallible;
                        }
                    }
                }
            }
        }
    }

    Shape::Value(quote!(#ty).to_string())
}

/// How a method receives its instance
#[derive(Debug, PartialEq)]
enum Receiver {
    Ref,
    Owned,
    Static,
    Unsupported,
}

fn receiver_kind(method: &ImplItemFn) -> Receiver {
    match method.sig.receiver() {
        None => Receiver::Static,
        Some(r) if r.colon_token.is_some() => Receiver::Unsupported,
        Some(r) if r.reference.is_some() => Receiver::Ref,
        Some(_) => Receiver::Owned,
    }
}

/// Descriptor tokens for one method, or `None` if it is not registered
fn describe_method(
    method: &ImplItemFn,
    helpers: &[Helper],
    runs: Option<u32>,
    bench_all: bool,
) -> syn::Result<Option<TokenStream2>> {
    let sig = &method.sig;
    let is_public = matches!(method.vis, syn::Visibility::Public(_));
    let unsupported = if sig.asyncness.is_some() {
        Some("async methods cannot be benchmarked")
    } else if sig.unsafety.is_some() {
        Some("unsafe methods cannot be benchmarked")
    } else if !sig.generics.params.is_empty() {
        Some("generic methods cannot be benchmarked")
    } else {
        None
    };

    if let Some(reason) = unsupported {
        let claimed = !helpers.is_empty() && helpers != [Helper::Skip];
        if claimed || (helpers.is_empty() && bench_all && is_public) {
            return Err(syn::Error::new_spanned(sig, reason));
        }
        return Ok(None);
    }

    let ident = &sig.ident;
    let name = ident.to_string();
    let params = sig
        .inputs
        .iter()
        .filter(|arg| matches!(arg, FnArg::Typed(_)))
        .count();

    let visibility = match &method.vis {
        syn::Visibility::Public(_) => quote! { ::perfbench::internal::Visibility::Public },
        syn::Visibility::Restricted(_) => quote! { ::perfbench::internal::Visibility::Restricted },
        syn::Visibility::Inherited => quote! { ::perfbench::internal::Visibility::Private },
    };

    let shape = return_shape(&sig.output);
    let returns = match &shape {
        Shape::Unit => quote! { ::perfbench::internal::ReturnShape::Unit },
        Shape::Fallible => quote! { ::perfbench::internal::ReturnShape::Fallible },
        Shape::Value(ty) => quote! { ::perfbench::internal::ReturnShape::Value(#ty) },
    };

    let roles = helpers.iter().map(|h| {
        let role = h.role();
        quote! { .role(#role) }
    });
    let runs = runs.map(|r| quote! { .runs(#r) });

    let invoker = if params == 0 {
        let target = quote! { ::perfbench::internal::downcast_target::<Self>(target)? };
        let call = match receiver_kind(method) {
            Receiver::Ref => Some(quote! { #target.#ident() }),
            Receiver::Owned => Some(quote! { ::std::mem::take(#target).#ident() }),
            Receiver::Static => Some(quote! { { #target; Self::#ident() } }),
            Receiver::Unsupported => None,
        };
        call.map(|call| {
            let body = match shape {
                Shape::Unit => quote! { #call; Ok(()) },
                Shape::Fallible => {
                    quote! { #call.map_err(::perfbench::internal::InvokeFailure::raised) }
                }
                Shape::Value(_) => quote! { let _ = #call; Ok(()) },
            };
            quote! { .invoker(|target| { #body }) }
        })
    } else {
        None
    };

    Ok(Some(quote! {
        .method(#name, |m| {
            m.visibility(#visibility)
                .params(#params)
                .returns(#returns)
                #(#roles)*
                #runs
                #invoker
        })
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_return_shapes() {
        let unit: ReturnType = parse_quote! {};
        let explicit_unit: ReturnType = parse_quote! { -> () };
        let fallible: ReturnType = parse_quote! { -> Result<(), String> };
        let io: ReturnType = parse_quote! { -> std::io::Result<()> };
        let value: ReturnType = parse_quote! { -> u64 };
        let ok_value: ReturnType = parse_quote! { -> Result<u64, String> };

        assert_eq!(return_shape(&unit), Shape::Unit);
        assert_eq!(return_shape(&explicit_unit), Shape::Unit);
        assert_eq!(return_shape(&fallible), Shape::Fallible);
        assert_eq!(return_shape(&io), Shape::Fallible);
        assert_eq!(return_shape(&value), Shape::Value("u64".to_string()));
        assert!(matches!(return_shape(&ok_value), Shape::Value(_)));
    }

    #[test]
    fn test_helpers_are_stripped() {
        let mut method: ImplItemFn = parse_quote! {
            #[inline]
            #[bench(runs = 3)]
            #[skip_bench]
            pub fn run(&mut self) {}
        };

        let (helpers, runs) = take_helpers(&mut method).unwrap();

        assert_eq!(helpers, vec![Helper::Bench, Helper::Skip]);
        assert_eq!(runs, Some(3));
        assert_eq!(method.attrs.len(), 1);
        assert!(method.attrs[0].path().is_ident("inline"));
    }

    #[test]
    fn test_helper_arguments_rejected() {
        let mut unknown: ImplItemFn = parse_quote! {
            #[bench(iterations = 3)]
            pub fn run(&mut self) {}
        };
        assert!(take_helpers(&mut unknown).is_err());

        let mut hook_args: ImplItemFn = parse_quote! {
            #[before_each_run(runs = 3)]
            pub fn setup(&mut self) {}
        };
        assert!(take_helpers(&mut hook_args).is_err());

        let mut zero: ImplItemFn = parse_quote! {
            #[bench(runs = 0)]
            pub fn run(&mut self) {}
        };
        assert!(take_helpers(&mut zero).is_err());
    }

    #[test]
    fn test_receivers() {
        let by_ref: ImplItemFn = parse_quote! { fn a(&self) {} };
        let by_mut: ImplItemFn = parse_quote! { fn a(&mut self) {} };
        let owned: ImplItemFn = parse_quote! { fn a(self) {} };
        let assoc: ImplItemFn = parse_quote! { fn a() {} };
        let boxed: ImplItemFn = parse_quote! { fn a(self: Box<Self>) {} };

        assert_eq!(receiver_kind(&by_ref), Receiver::Ref);
        assert_eq!(receiver_kind(&by_mut), Receiver::Ref);
        assert_eq!(receiver_kind(&owned), Receiver::Owned);
        assert_eq!(receiver_kind(&assoc), Receiver::Static);
        assert_eq!(receiver_kind(&boxed), Receiver::Unsupported);
    }

    #[test]
    fn test_async_bench_rejected() {
        let method: ImplItemFn = parse_quote! { pub async fn run(&mut self) {} };
        assert!(describe_method(&method, &[Helper::Bench], None, false).is_err());
        assert!(describe_method(&method, &[], None, false).unwrap().is_none());
        assert!(describe_method(&method, &[], None, true).is_err());
    }

    #[test]
    fn test_generic_impl_rejected() {
        let input: ItemImpl = parse_quote! {
            impl<T> Holder<T> {
                #[bench]
                pub fn run(&mut self) {}
            }
        };
        assert!(bench_class_impl(TokenStream2::new(), input).is_err());
    }

    #[test]
    fn test_unknown_class_argument_rejected() {
        let input: ItemImpl = parse_quote! { impl Holder {} };
        let args: TokenStream2 = quote! { iterations = 3 };
        assert!(bench_class_impl(args, input).is_err());
    }
}
