mod util;

use nekoscript::stdx::game::{decode_ppm, encode_ppm};
use nekoscript::Engine;
use util::{run_lines, run_neko_source};

#[test]
fn shapes_paint_the_canvas() {
    let src = r##"
importer Jeu
nekVariable jeu = creerJeu(20, 20)
jeu.effacer("bleu")
jeu.rectangle(0, 0, 5, 5, "rouge")
jeu.cercle(15, 15, 3, "#00ff00")
nekAfficher(jeu.pixel(2, 2))
nekAfficher(jeu.pixel(15, 15))
nekAfficher(jeu.pixel(10, 2))
"##;
    assert_eq!(run_lines(src), vec!["#ff0000", "#00ff00", "#0000ff"]);
}

#[test]
fn sprites_collide_and_move() {
    let src = r#"
importer Jeu
nekVariable jeu = creerJeu(100, 100)
nekVariable a = jeu.sprite(0, 0, 10, 10, "jaune")
nekVariable b = jeu.sprite(20, 0, 10, 10)
nekAfficher(jeu.collision(a, b), a.touche(b))
b.deplacer(-15, 0)
nekAfficher(jeu.collision(a, b), a.touche(b))
nekAfficher(b.position().x)
nekAfficher(jeu.pixel(1, 1))
"#;
    assert_eq!(run_lines(src), vec!["faux faux", "vrai vrai", "5", "#ffff00"]);
}

#[test]
fn immediate_loop_stops_when_asked() {
    let src = r#"
importer Jeu
nekVariable jeu = creerJeu(50, 50, "Compteur")
jeu.demarrer(fonction(dt, image) {
    si image >= 30 {
        jeu.arreter()
    }
})
nekAfficher(jeu.images())
"#;
    let lines = run_lines(src);
    assert_eq!(lines, vec!["Jeu « Compteur » arrêté après 30 images", "30"]);
}

#[test]
fn immediate_loop_is_bounded() {
    let src = "importer Jeu\nnekVariable jeu = creerJeu(10, 10, \"Infini\")\njeu.demarrer()\nnekAfficher(jeu.images())";
    let out = run_neko_source(src);
    assert!(out.contains("600 images"), "{out}");
    assert!(out.contains("neko demarrer"), "{out}");
    assert!(out.ends_with("600"), "{out}");
}

#[test]
fn snapshots_are_binary_ppm() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("image.ppm");
    let src = format!(
        "importer Jeu\nnekVariable jeu = creerJeu(4, 3)\njeu.effacer(\"blanc\")\njeu.sauvegarder(\"{}\")",
        path.display()
    );
    assert_eq!(Engine::new().execute(&src), nekoscript::SUCCESS_MESSAGE);

    let bytes = std::fs::read(&path).expect("snapshot");
    let image = decode_ppm(&bytes).expect("decode");
    assert_eq!((image.width, image.height), (4, 3));
    assert!(image.pixels.iter().all(|pixel| *pixel == [255, 255, 255]));
}

#[test]
fn sprite_images_load_or_degrade() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("chat.ppm");
    std::fs::write(&path, encode_ppm(2, 2, &[[9, 9, 9]; 4])).expect("write");

    let src = format!(
        r#"
importer Jeu
nekVariable jeu = creerJeu(10, 10)
nekVariable chat = jeu.sprite(0, 0, nul, nul, "{}")
nekVariable fantome = jeu.sprite(5, 5, 2, 2, "{}")
nekAfficher(jeu.pixel(1, 1))
nekAfficher(jeu.pixel(6, 6))
"#,
        path.display(),
        dir.path().join("absent.ppm").display()
    );
    assert_eq!(run_lines(&src), vec!["#090909", "#ffffff"]);
}
