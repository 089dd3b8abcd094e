//! Property tests for routing and decoding.

use notesync_protocol::{decode_cbor, decode_json, Method, Note, RemoteNote, Route};
use proptest::prelude::*;

fn id_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-]{1,36}"
}

fn route_strategy() -> impl Strategy<Value = Route> {
    prop_oneof![
        Just(Route::ListNotes),
        Just(Route::CreateNote),
        id_strategy().prop_map(Route::UpdateNote),
        id_strategy().prop_map(Route::DeleteNote),
    ]
}

proptest! {
    #[test]
    fn every_route_parses_from_its_own_path(route in route_strategy()) {
        prop_assert_eq!(Route::parse(route.method(), &route.path()), Some(route.clone()));

        // Trailing slash and query string are tolerated.
        let decorated = format!("{}/?page=2", route.path());
        prop_assert_eq!(Route::parse(route.method(), &decorated), Some(route));
    }

    #[test]
    fn paths_outside_the_collection_never_route(
        prefix in "/[a-z]{1,8}",
        method in prop_oneof![
            Just(Method::Get),
            Just(Method::Post),
            Just(Method::Patch),
            Just(Method::Delete),
        ],
    ) {
        prop_assume!(!prefix.starts_with("/notes"));
        prop_assert_eq!(Route::parse(method, &prefix), None);
    }

    #[test]
    fn decoding_garbage_is_an_error_not_a_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = decode_cbor::<Note>(&bytes);
        let _ = decode_json::<Vec<RemoteNote>>(&bytes);
    }
}
