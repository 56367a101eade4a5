use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Turn a function taking `&mut LedgerState` into a test that runs against a
/// fresh example ledger, with logging enabled.
///
/// `#[ledger_test(election)]` additionally seeds the example election (see
/// `LedgerState::seed_example_election`) before the test body runs.
///
/// If the test panics, the ledger's event log is dumped at error level before
/// the panic is resumed.
#[proc_macro_attribute]
pub fn ledger_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Reject invalid function signatures.
    if let Err(err) = check_sig(&item_fn.sig) {
        return err.into_compile_error().into();
    }

    // Rename the inner function so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_body", name);
    item_fn.sig.ident = new_name.clone();

    // Seed the example election if asked to.
    let maybe_seed = match parse_macro_input!(args as Option<Ident>) {
        Some(arg) if arg == "election" => quote! {
            ledger.seed_example_election();
        },
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected no argument, or `election`")
                .into_compile_error()
                .into();
        }
        None => quote! {},
    };

    quote! {
        #[test]
        fn #name() {
            log4rs_test_utils::test_logging::init_logging_once_for(
                ["election_ledger"],
                None,
                None,
            );

            /// The test itself.
            #item_fn

            // Test setup.
            let mut ledger = crate::ledger::LedgerState::example();
            #maybe_seed

            // Run the test, catching any panics.
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                #new_name(&mut ledger)
            }));

            // If the test panicked, show what the ledger went through and re-raise.
            if let Err(cause) = result {
                for record in ledger.events() {
                    log::error!("{}", record);
                }
                std::panic::resume_unwind(cause);
            }
        }
    }
    .into()
}

/// Ensure the wrapped test is synchronous and takes exactly one `&mut LedgerState`.
fn check_sig(sig: &Signature) -> Result<(), syn::Error> {
    if let Some(asyncness) = sig.asyncness {
        return Err(syn::Error::new(
            asyncness.span(),
            "Ledger tests are synchronous; remove `async`",
        ));
    }

    if sig.inputs.len() != 1 {
        return Err(syn::Error::new(
            sig.inputs.span(),
            "Expected exactly one argument, `ledger: &mut LedgerState`",
        ));
    }

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(_) = &*pat_type.pat {
                if let Type::Reference(reference) = &*pat_type.ty {
                    if reference.mutability.is_some() {
                        if let Type::Path(type_path) = &*reference.elem {
                            let is_ledger = type_path
                                .path
                                .segments
                                .last()
                                .map_or(false, |segment| segment.ident == "LedgerState");
                            if is_ledger {
                                continue;
                            }
                        }
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected `ledger_ident: &mut LedgerState`",
        ));
    }

    Ok(())
}
