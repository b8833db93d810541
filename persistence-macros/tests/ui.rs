#[test]
fn ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/entity_basic.rs");
    t.pass("tests/ui/entity_columns.rs");
    t.pass("tests/ui/entity_assigned_id.rs");
    t.pass("tests/ui/entity_id_basic.rs");
}
