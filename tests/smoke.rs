// NekoScript smoke tests through the Engine facade
// Covers: arithmetic, variables, functions, branches, loops, modules, errors

mod util;

use nekoscript::{Engine, EngineConfig, SUCCESS_MESSAGE};
use util::{run_lines, run_neko_source};

#[test]
fn numbers_add_and_text_concatenates() {
    assert_eq!(
        run_neko_source("nekVariable a = 2; nekVariable b = 3; nekAfficher(a + b);"),
        "5"
    );
    assert_eq!(run_neko_source("nekAfficher(\"2\" + \"3\")"), "23");
}

#[test]
fn silent_program_reports_success() {
    assert_eq!(run_neko_source("nekVariable x = 1"), SUCCESS_MESSAGE);
    assert_eq!(run_neko_source(""), SUCCESS_MESSAGE);
}

#[test]
fn functions_return_values() {
    let src = r#"
fonction double(x) {
    retourner x * 2
}
nekAfficher(double(21))
"#;
    assert_eq!(run_neko_source(src), "42");
}

#[test]
fn return_inside_branch_stops_the_function() {
    let src = r#"
fonction signe(n) {
    si n < 0 {
        retourner "négatif"
    }
    retourner "positif"
}
nekAfficher(signe(-4))
nekAfficher(signe(4))
"#;
    assert_eq!(run_lines(src), vec!["négatif", "positif"]);
}

#[test]
fn bare_and_parenthesised_conditions() {
    let src = r#"
si (vrai) nekAfficher("oui") sinon nekAfficher("non")
nekSi 1 > 2 nekAfficher("a") nekSinon nekAfficher("b")
"#;
    assert_eq!(run_lines(src), vec!["oui", "b"]);
}

#[test]
fn english_keywords_are_accepted() {
    let src = r#"
let total = 0
function ajoute(n) { return total + n }
if true { total = ajoute(5) } else { total = 0 }
nekAfficher(total)
"#;
    assert_eq!(run_neko_source(src), "5");
}

#[test]
fn while_loop_accumulates() {
    let src = r#"
nekVariable i = 0
nekVariable somme = 0
tantque i < 5 {
    i = i + 1
    somme = somme + i
}
nekAfficher(somme)
"#;
    assert_eq!(run_neko_source(src), "15");
}

#[test]
fn declared_module_is_importable() {
    let src = r#"
nekModule outils {
    fonction carre(x) { retourner x * x }
}
importer outils
nekAfficher(carre(4))
nekAfficher(outils.carre(3))
"#;
    assert_eq!(run_lines(src), vec!["16", "9"]);
}

#[test]
fn runtime_errors_are_embedded_in_the_result() {
    assert_eq!(
        run_neko_source("nekAfficher(1 / 0)"),
        "Erreur d'exécution : division par zéro"
    );
}

#[test]
fn module_registry_survives_between_runs() {
    let mut engine = Engine::new();
    engine.execute("nekModule salut { fonction bonjour(n) { retourner \"bonjour \" + n } }");
    assert_eq!(
        engine.execute("importer salut\nnekAfficher(bonjour(\"Mina\"))"),
        "bonjour Mina"
    );
}

#[test]
fn hostile_scripts_never_escape_execute() {
    let nested_blocks = format!("{}nekAfficher(1)", "si vrai { ".repeat(5000));
    let nested_parens = format!("nekAfficher({}1{})", "(".repeat(5000), ")".repeat(5000));
    let cases: Vec<(String, &str)> = vec![
        (
            "importer Jeu\nnekVariable jeu = creerJeu(10, 10)\njeu.effacer(\"#€\")".into(),
            "couleur invalide",
        ),
        (
            "importer Base\nimporter Math\nnekAfficher(aleatoire(0, puissance(10, 400)))".into(),
            "bornes non finies",
        ),
        (
            "importer Base\nimporter Math\nnekAfficher(aleatoire(0, racine(-1)))".into(),
            "bornes non finies",
        ),
        (
            "importer Base\nimporter Math\nnekAfficher(aleatoireEntier(0, puissance(10, 400)))".into(),
            "borne hors limites",
        ),
        (
            "importer Jeu\nimporter Math\ncreerJeu(racine(-1), 10)".into(),
            "dimensions invalides",
        ),
        (
            "importer Jeu\ncreerJeu(4294967296, 4294967296)".into(),
            "dimensions invalides",
        ),
        (nested_blocks, "trop imbriqu"),
        (nested_parens, "trop imbriqu"),
        (
            "fonction f(n) { retourner f(n + 1) }\nf(0)".into(),
            "profondeur d'appel maximale",
        ),
    ];

    let mut engine = Engine::new();
    for (source, expected) in &cases {
        let out = engine.execute(source);
        assert!(out.contains(expected), "expected '{expected}' in: {out}");
    }

    let out = engine.execute("importer nulPart\nnekAfficher(1)");
    assert!(!out.is_empty());
    assert_eq!(engine.execute("nekAfficher(\"encore\")"), "encore");
}

#[test]
fn long_pauses_are_capped() {
    let mut config = EngineConfig::default();
    config.engine.max_sleep_ms = 10;
    let mut engine = Engine::with_config(config);
    let started = std::time::Instant::now();
    assert_eq!(
        engine.execute("importer Base\nattendre(999999999999)\nnekAfficher(\"fin\")"),
        "fin"
    );
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
}
