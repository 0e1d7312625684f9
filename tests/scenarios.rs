//! The shipped scenario files must stay parseable and in sync with the
//! built-in matrix.

use std::path::Path;

use webmail_e2e::scenario::{Expectation, Scenario};

#[test]
fn shipped_scenarios_parse_and_match_builtin_matrix() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios");
    let shipped = Scenario::load_all(&dir).expect("scenario files should parse");
    let builtin = Scenario::builtin();

    assert_eq!(shipped.len(), builtin.len());
    for (shipped, builtin) in shipped.iter().zip(&builtin) {
        assert_eq!(shipped.name, builtin.name);
        assert_eq!(shipped.credentials, builtin.credentials);
        assert_eq!(shipped.expect, builtin.expect);
        assert_eq!(shipped.reuse_session, builtin.reuse_session);
    }
}

#[test]
fn negative_scenarios_expect_the_error_banner() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios");
    let negative =
        Scenario::filter_by_tag(Scenario::load_all(&dir).unwrap(), "negative");
    assert_eq!(negative.len(), 2);
    assert!(negative
        .iter()
        .all(|s| s.expect == Expectation::ErrorShown));
}
