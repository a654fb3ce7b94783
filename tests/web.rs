mod util;

use nekoscript::stdx::web::parse_request;
use util::{run_lines, run_neko_source};

#[test]
fn simulated_requests_reach_route_handlers() {
    let src = r#"
importer Web
nekVariable serveur = creerServeur(8080)
serveur.get("/bonjour/:nom", fonction(requete, reponse) {
    retourner "Bonjour " + requete.parametres.nom
})
nekVariable r = serveur.simuler("GET", "/bonjour/Mina")
nekAfficher(r.statut, r.corps)
"#;
    assert_eq!(run_lines(src), vec!["200 Bonjour Mina"]);
}

#[test]
fn unmatched_routes_get_404() {
    let src = r#"
importer Web
nekVariable serveur = creerServeur(8080)
nekVariable r = serveur.simuler("GET", "/absent")
nekAfficher(r.statut)
"#;
    assert_eq!(run_neko_source(src), "404");
}

#[test]
fn response_helpers_chain_status_and_json() {
    let src = r#"
importer Web
nekVariable serveur = creerServeur(8080)
serveur.post("/chats", fonction(requete, reponse) {
    reponse.statut(201).json({ nom: requete.json.nom })
})
nekVariable r = serveur.simuler("POST", "/chats", { nom: "Neko" })
nekAfficher(r.statut)
nekAfficher(r.corps)
"#;
    assert_eq!(run_lines(src), vec!["201", "{\"nom\":\"Neko\"}"]);
}

#[test]
fn query_strings_are_decoded() {
    let src = r#"
importer Web
nekVariable serveur = creerServeur(8080)
serveur.get("/recherche", fonction(requete, reponse) {
    reponse.envoyer(requete.requete.q)
})
nekAfficher(serveur.simuler("GET", "/recherche?q=chat%20noir").corps)
"#;
    assert_eq!(run_neko_source(src), "chat noir");
}

#[test]
fn immediate_mode_start_explains_persistent_mode() {
    let src = "importer Web\nnekVariable s = creerServeur(8123)\ns.demarrer()";
    let out = run_neko_source(src);
    assert!(out.contains("8123"), "{out}");
    assert!(out.contains("neko demarrer"), "{out}");
}

#[test]
fn json_helpers_round_trip() {
    let src = r#"
importer Web
nekVariable texte = versJson({ a: 1, b: [vrai, nul] })
nekAfficher(texte)
nekAfficher(depuisJson(texte).b)
"#;
    assert_eq!(run_lines(src), vec!["{\"a\":1,\"b\":[true,null]}", "[vrai, nul]"]);
}

#[test]
fn raw_http_requests_parse_incrementally() {
    let partial = b"GET /index HTTP/1.1\r\nHost: localhost\r\n";
    assert!(parse_request(partial).expect("partial").is_none());

    let full = b"POST /api?x=1 HTTP/1.1\r\nContent-Length: 4\r\nX-Neko: oui\r\n\r\nmiou";
    let request = parse_request(full).expect("parse").expect("complete");
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/api");
    assert_eq!(request.query.get("x").map(String::as_str), Some("1"));
    assert_eq!(request.headers.get("x-neko").map(String::as_str), Some("oui"));
    assert_eq!(request.body, "miou");

    assert!(parse_request(b"n'importe quoi\r\n\r\n").is_err());
}
