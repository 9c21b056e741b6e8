use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one and inject
/// dependencies.
///
/// Every test gets a fresh in-memory election store. Injectable dependencies
/// are [`rocket::local::asynchronous::Client`] and
/// `crate::service::ElectionService`, both backed by that store.
///
/// `#[backend_test(admin)]` logs the client in as the administrator first, and
/// `#[backend_test(participant)]` as the example participant.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract type information and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Log in the client as admin/participant if needed. Each login is its own
    // block so the response's borrow of the client ends before it is moved.
    let maybe_login = match parse_macro_input!(args as Option<Ident>) {
        Some(arg) if arg == "admin" => quote! {{
            let response = rocket_client
                .post(uri!(crate::api::auth::authenticate_admin))
                .header(rocket::http::ContentType::JSON)
                .body(rocket::serde::json::json!(crate::model::api::AdminLogin::example()).to_string())
                .dispatch()
                .await;
            assert_eq!(response.status(), rocket::http::Status::Ok, "admin login failed");
        }},
        Some(arg) if arg == "participant" => quote! {{
            let response = rocket_client
                .post(uri!(crate::api::auth::login))
                .header(rocket::http::ContentType::JSON)
                .body(rocket::serde::json::json!(crate::model::api::ParticipantLogin::example()).to_string())
                .dispatch()
                .await;
            assert_eq!(response.status(), rocket::http::Status::Ok, "participant login failed");
        }},
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected `admin` or `participant`")
                .into_compile_error()
                .into();
        }
        None => quote! {},
    };

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// Test setup.
            async fn setup() -> (rocket::local::asynchronous::Client, crate::service::ElectionService) {
                let service = crate::service::ElectionService::new(
                    std::sync::Arc::new(crate::store::LocalStore::in_memory()),
                    crate::model::roster::Roster::builtin(),
                );
                let rocket_client = rocket::local::asynchronous::Client::tracked(crate::test_rocket(service.clone()))
                    .await
                    .unwrap();

                #maybe_login

                (rocket_client, service)
            }

            /// The test itself.
            #item_fn

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                #[allow(unused_variables)]
                let (rocket_client, service) = setup().await;
                #new_name(#(#test_args),*).await;
            });
        }
    }
    .into()
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut has_service = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(_) = &*pat_type.pat {
                if let Type::Path(type_path) = &*pat_type.ty {
                    // The last path segment names the type however it was imported.
                    let type_ident = type_path.path.segments.last().map(|s| &s.ident);
                    if let Some(type_ident) = type_ident {
                        if type_ident == "Client" {
                            if has_client {
                                return Err(syn::Error::new(input.span(), "Test cannot accept more than one `rocket::local::asynchronous::Client`"));
                            }
                            has_client = true;
                            args.push(quote! { rocket_client });
                            continue;
                        } else if type_ident == "ElectionService" {
                            if has_service {
                                return Err(syn::Error::new(
                                    input.span(),
                                    "Test cannot accept more than one `ElectionService`",
                                ));
                            }
                            has_service = true;
                            args.push(quote! { service.clone() });
                            continue;
                        }
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client` or `service_ident: ElectionService`",
        ));
    }

    Ok(args)
}
