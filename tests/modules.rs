mod util;

use nekoscript::interpreter::{Bindings, NativeArity, Value};
use nekoscript::modules::{ModuleRegistry, PackageStore};
use nekoscript::{Engine, EngineConfig};
use util::{run_lines, run_neko_source};

#[test]
fn builtin_aliases_are_case_insensitive() {
    assert_eq!(run_neko_source("importer MATHS\nnekAfficher(racine(81))"), "9");
    assert_eq!(run_neko_source("importer math\nnekAfficher(math.abs(-3))"), "3");
}

#[test]
fn import_binds_module_map_and_merges_bindings() {
    let src = r#"
importer Base
nekAfficher(majuscules("neko"))
nekAfficher(Base.minuscules("NEKO"))
nekAfficher(joindre(trier([3, 1, 2]), "-"))
"#;
    assert_eq!(run_lines(src), vec!["NEKO", "neko", "1-2-3"]);
}

#[test]
fn missing_module_suggests_install_command() {
    let out = run_neko_source("importer Fantome");
    assert!(out.starts_with("Erreur d'exécution"), "{out}");
    assert!(out.contains("neko telecharger Fantome"), "{out}");
}

#[test]
fn external_import_binds_under_the_given_name() {
    let mut engine = Engine::new();
    engine
        .publish_package("fonction pluie() { retourner \"parapluie\" }", "meteo-fr", false)
        .expect("publish");
    let out = engine.execute("nekImporter Meteo depuis \"meteo-fr\"\nnekAfficher(Meteo.pluie())");
    assert_eq!(out, "parapluie");
}

#[test]
fn language_package_prefers_its_named_module() {
    let mut engine = Engine::new();
    engine
        .publish_package(
            "nekVariable brouillon = 1\nnekModule couleurs { nekVariable rouge = \"#f00\" }",
            "couleurs",
            false,
        )
        .expect("publish");
    let out = engine.execute("importer couleurs\nnekAfficher(rouge)\nnekAfficher(nekType(couleurs.brouillon))");
    assert!(out.starts_with("#f00"), "{out}");
    assert!(out.contains("Erreur d'exécution"), "{out}");
}

#[test]
fn capability_instances_are_independent() {
    let src = r#"
importer Jeu
nekVariable a = creerJeu(10, 10)
nekVariable b = creerJeu(20, 5)
a.texte("salut", 1, 1)
nekAfficher(a.largeur, b.largeur)
nekAfficher(nekLongueur(a.textes()), nekLongueur(b.textes()))
"#;
    assert_eq!(run_lines(src), vec!["10 20", "1 0"]);
}

#[test]
fn host_factories_back_host_packages() {
    let mut engine = Engine::with_config(EngineConfig::default());
    engine.register_host_module("horloge", |_| {
        let mut exports = Bindings::new();
        exports.insert(
            "heure".into(),
            Value::native("heure", NativeArity::Exact(0), |_, _| Ok(Value::text("midi"))),
        );
        Ok(exports)
    });
    engine.publish_package("horloge", "temps", true).expect("publish");
    assert_eq!(engine.execute("importer temps\nnekAfficher(heure())"), "midi");
    assert_eq!(engine.list_packages()[0].name, "temps");
    assert!(engine.list_packages()[0].is_host_code);
}

#[test]
fn package_snapshot_round_trips_through_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("paquets.json");

    let mut store = PackageStore::new();
    store.publish("outils", "fonction f() { retourner 1 }", false).expect("publish");
    store.save_json(&path).expect("save");

    let restored = PackageStore::load_json(&path).expect("load");
    assert_eq!(restored.len(), 1);
    assert_eq!(
        restored.get("outils").map(|p| p.source_code.as_str()),
        Some("fonction f() { retourner 1 }")
    );

    let missing = PackageStore::load_json(&dir.path().join("absent.json")).expect("missing file");
    assert!(missing.is_empty());
}

#[test]
fn registry_only_lists_ready_modules() {
    let mut registry = ModuleRegistry::new();
    registry.register("b", Bindings::new());
    registry.register("a", Bindings::new());
    assert_eq!(registry.names(), vec!["a".to_string(), "b".to_string()]);
    assert!(registry.contains("a"));
    assert!(registry.get("c").is_none());
}
