use nekoscript::Engine;

#[test]
fn clean_programs_pass() {
    let engine = Engine::new();
    let report = engine.check(
        "importer Math\nfonction double(x) { retourner x * 2 }\nnekAfficher(double(racine(16)))",
    );
    assert!(report.diagnostics.is_empty(), "{}", report.render());
    assert_eq!(report.render(), "Aucun problème détecté.");
}

#[test]
fn syntax_errors_are_reported_without_running() {
    let engine = Engine::new();
    let report = engine.check("nekAfficher(\"jamais fermé");
    assert!(report.has_errors());
    assert_eq!(report.errors().count(), 1);
}

#[test]
fn unresolved_imports_are_errors() {
    let engine = Engine::new();
    let report = engine.check("importer introuvable");
    assert!(report.has_errors());
    assert!(report.render().contains("introuvable"), "{}", report.render());
}

#[test]
fn published_packages_resolve() {
    let mut engine = Engine::new();
    engine
        .publish_package("fonction saluer(nom) { retourner \"Salut \" + nom }", "salutations", false)
        .expect("publish");
    let report = engine.check("importer salutations\nnekAfficher(saluer(\"Mina\"))");
    assert!(!report.has_errors(), "{}", report.render());
    assert_eq!(report.warnings().count(), 0, "{}", report.render());
}

#[test]
fn undeclared_calls_only_warn() {
    let engine = Engine::new();
    let report = engine.check("fantome()");
    assert!(!report.has_errors());
    assert_eq!(report.warnings().count(), 1);
    assert!(report.render().ends_with("0 erreur(s), 1 avertissement(s)"));
}
