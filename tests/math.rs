mod util;

use util::{run_lines, run_neko_source};

#[test]
fn scalar_functions() {
    let src = r#"
importer Math
nekAfficher(racine(16))
nekAfficher(puissance(2, 10))
nekAfficher(arrondir(PI, 2))
nekAfficher(plancher(2.7), plafond(2.1))
nekAfficher(limiter(15, 0, 10))
"#;
    assert_eq!(run_lines(src), vec!["4", "1024", "3.14", "2 3", "10"]);
}

#[test]
fn statistics_over_lists_and_arguments() {
    let src = r#"
importer Math
nekAfficher(somme([1, 2, 3, 4]))
nekAfficher(moyenne(2, 4, 6))
nekAfficher(mediane([5, 1, 3, 2]))
nekAfficher(variance([2, 4, 4, 4, 5, 5, 7, 9]))
nekAfficher(ecartType([2, 4, 4, 4, 5, 5, 7, 9]))
"#;
    assert_eq!(run_lines(src), vec!["10", "4", "2.5", "4", "2"]);
}

#[test]
fn vectors_are_maps() {
    let src = r#"
importer Math
nekVariable v = vecteur(3, 4)
nekAfficher(norme(v))
nekAfficher(produitScalaire(v, vecteur(1, 0)))
nekAfficher(distance(vecteur(0, 0), { x: 6, y: 8 }))
"#;
    assert_eq!(run_lines(src), vec!["5", "3", "10"]);
}

#[test]
fn base_conversions() {
    let src = r#"
importer Math
nekAfficher(versBinaire(10))
nekAfficher(versHexadecimal(255))
nekAfficher(depuisBase("ff", 16))
nekAfficher(versBase(-35, 36))
"#;
    assert_eq!(run_lines(src), vec!["1010", "ff", "255", "-z"]);
}

#[test]
fn invalid_base_is_an_error() {
    let out = run_neko_source("importer Math\nversBase(10, 1)");
    assert!(out.contains("base 1"), "{out}");
}
