use std::time::{Duration, Instant};

use nekoscript::runtime::{ProcessKind, SupervisorError};
use nekoscript::{Engine, EngineConfig};

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    false
}

#[test]
fn kinds_are_inferred_from_imports() {
    assert_eq!(ProcessKind::infer("importer Discord\nnekVariable b = 1"), ProcessKind::MessagingBot);
    assert_eq!(ProcessKind::infer("importer web"), ProcessKind::WebApp);
    assert_eq!(ProcessKind::infer("importer Jeu"), ProcessKind::Game);
    assert_eq!(ProcessKind::infer("nekAfficher(1)"), ProcessKind::Script);
    assert_eq!(ProcessKind::infer("   "), ProcessKind::Unknown);
}

#[test]
fn game_process_runs_until_stopped() {
    let engine = Engine::new();
    let id = engine
        .start_process(
            "boucle",
            "importer Jeu\nnekVariable jeu = creerJeu(16, 16, \"Boucle\")\njeu.demarrer()",
        )
        .expect("start");

    let processes = engine.list_processes();
    assert_eq!(processes.len(), 1);
    assert_eq!(processes[0].kind, ProcessKind::Game);
    assert_eq!(processes[0].name, "boucle");
    assert!(!processes[0].finished);

    let output = engine.process_output(id).expect("output");
    assert_eq!(output, vec!["Jeu « Boucle » démarré".to_string()]);

    engine.stop_process(id).expect("stop");
    assert!(engine.list_processes().is_empty());
    assert!(matches!(
        engine.stop_process(id),
        Err(SupervisorError::UnknownProcess(unknown)) if unknown == id
    ));
}

#[test]
fn offline_bot_is_listed_until_stopped() {
    let engine = Engine::new();
    let id = engine
        .start_process(
            "gardien",
            "importer Discord\nnekVariable bot = creerBot(\"\")\nbot.connecter()",
        )
        .expect("start");

    let listed = engine.list_processes();
    assert!(
        listed
            .iter()
            .any(|info| info.id == id && info.kind == ProcessKind::MessagingBot && !info.finished)
    );
    assert_eq!(listed[0].kind.to_string(), "messaging-bot");

    engine.stop_process(id).expect("stop");
    assert!(engine.list_processes().iter().all(|info| info.id != id));
}

#[test]
fn plain_scripts_finish_on_their_own() {
    let engine = Engine::new();
    let id = engine
        .start_process("salut", "nekAfficher(\"bonjour\")")
        .expect("start");
    assert!(wait_until(|| {
        engine
            .list_processes()
            .iter()
            .any(|info| info.id == id && info.finished)
    }));
    assert_eq!(engine.stop_process(id).expect("stop"), vec!["bonjour".to_string()]);
}

#[test]
fn failing_startup_leaves_no_record() {
    let engine = Engine::new();
    let error = engine
        .start_process("casse", "nekAfficher(1 / 0)")
        .expect_err("division by zero");
    assert!(matches!(error, SupervisorError::Script(_)), "{error}");
    assert!(engine.list_processes().is_empty());
}

#[test]
fn processes_get_distinct_ids() {
    let engine = Engine::new();
    let source = "importer Jeu\nnekVariable jeu = creerJeu(8, 8)\njeu.demarrer()";
    let first = engine.start_process("a", source).expect("first");
    let second = engine.start_process("b", source).expect("second");
    assert_ne!(first, second);
    assert_eq!(engine.list_processes().len(), 2);
    engine.stop_all_processes();
    assert!(engine.list_processes().is_empty());
}

#[test]
fn endless_loops_return_an_id_and_stop() {
    let mut config = EngineConfig::default();
    config.engine.startup_grace_ms = 100;
    let engine = Engine::with_config(config);

    let started = Instant::now();
    let id = engine
        .start_process("boucle", "nekVariable n = 0\ntantque vrai { n = n + 1 }")
        .expect("start");
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(engine.list_processes().iter().any(|info| info.id == id && !info.finished));

    engine.stop_process(id).expect("stop");
    assert!(engine.list_processes().is_empty());
}

#[test]
fn late_failures_land_in_the_output() {
    let mut config = EngineConfig::default();
    config.engine.startup_grace_ms = 20;
    let engine = Engine::with_config(config);

    let id = engine
        .start_process("tardif", "importer Base\nattendre(300)\ninconnue()")
        .expect("start");
    assert!(wait_until(|| {
        engine
            .list_processes()
            .iter()
            .any(|info| info.id == id && info.finished)
    }));
    let output = engine.stop_process(id).expect("stop");
    assert_eq!(output, vec!["Erreur d'exécution : fonction 'inconnue' non définie".to_string()]);
}
