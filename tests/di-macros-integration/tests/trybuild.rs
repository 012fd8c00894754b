//! trybuild 编译期测试

#[test]
fn ui_injectable_derive() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/injectable_ok.rs");
    t.pass("tests/ui/injectable_hooks_ok.rs");
}
