//! Property tests: any string value survives render -> parse.

use proptest::prelude::*;
use xcpost_pbxproj::{Dict, PbxProject, Value};

fn document_with(key: &str, value: &str) -> PbxProject {
    let mut root = Dict::new();
    root.insert(key, value);
    root.insert("list", vec![Value::from(value), Value::from("tail")]);
    PbxProject::from_root(root)
}

proptest! {
    #[test]
    fn strings_round_trip(key in "k_[A-Za-z0-9_]{0,12}", value in any::<String>()) {
        let project = document_with(&key, &value);
        let text = project.render();
        let reparsed = PbxProject::parse(&text).expect("rendered output parses");

        prop_assert_eq!(reparsed.root().get_str(&key), Some(value.as_str()));
        prop_assert_eq!(&reparsed, &project);
    }

    #[test]
    fn path_like_strings_round_trip(value in "[A-Za-z0-9_./$:+ -]{1,40}") {
        let project = document_with("path", &value);
        let reparsed = PbxProject::parse(&project.render()).expect("rendered output parses");
        prop_assert_eq!(reparsed.root().get_str("path"), Some(value.as_str()));
    }
}
