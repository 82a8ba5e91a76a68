use docport_formats::layout::{Subtree, mangle, route_id};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn mangled_ids_never_contain_path_separators(id in "\\PC*") {
        let mangled = mangle(&id);
        prop_assert!(!mangled.contains('/'));
        prop_assert!(!mangled.contains('\\'));
    }

    #[test]
    fn routing_always_yields_a_usable_file_stem(id in "\\PC+") {
        let (_, stem) = route_id(&id);
        prop_assert!(!stem.is_empty());
        prop_assert!(!stem.contains('/'));
        prop_assert!(!stem.contains('\\'));
        prop_assert!(stem != "." && stem != "..");
    }

    #[test]
    fn design_ids_restore_their_prefix(rest in "[a-z0-9/_]{1,24}") {
        let (subtree, stem) = route_id(&format!("_design/{rest}"));
        prop_assert_eq!(subtree, Subtree::DesignDocs);
        prop_assert_eq!(subtree.restore_id(&stem), format!("_design/{}", mangle(&rest)));
    }
}
