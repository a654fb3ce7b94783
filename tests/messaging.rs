mod util;

use util::{run_lines, run_neko_source};

#[test]
fn offline_bot_answers_simulated_messages() {
    let src = r#"
importer Discord
nekVariable bot = creerBot("")
bot.surMessage(fonction(message) {
    si message.contenu contient "bonjour" {
        message.repondre("Bonjour " + message.auteur)
    }
})
bot.simulerMessage("bonjour le bot", "Mina", "accueil")
bot.simulerMessage("rien à voir")
nekVariable envoyes = bot.messagesEnvoyes()
nekAfficher(nekLongueur(envoyes))
nekAfficher(envoyes[0].salon, envoyes[0].contenu)
"#;
    assert_eq!(run_lines(src), vec!["1", "accueil Bonjour Mina"]);
}

#[test]
fn slash_commands_receive_arguments() {
    let src = r#"
importer Messagerie
nekVariable bot = creerBot("pas-un-jeton")
bot.commande("/dire", fonction(message, args) {
    message.repondre(args.joindre(" "))
})
bot.surMessage(fonction(message) {
    message.repondre("ignoré")
})
bot.simulerMessage("/dire salut tout le monde")
nekAfficher(bot.messagesEnvoyes()[0].contenu)
"#;
    assert_eq!(run_neko_source(src), "salut tout le monde");
}

#[test]
fn ready_handlers_run_on_connect() {
    let src = r#"
importer Bot
nekVariable bot = creerBot("")
bot.surPret(fonction(info) {
    nekAfficher("prêt via " + info.passerelle)
})
bot.connecter()
nekAfficher(bot.enLigne())
"#;
    let lines = run_lines(src);
    assert_eq!(lines[0], "prêt via hors-ligne");
    assert!(lines[1].contains("neko demarrer"), "{lines:?}");
    assert_eq!(lines[2], "faux");
}

#[test]
fn default_intents_are_exposed() {
    assert_eq!(
        run_neko_source("importer Discord\nnekAfficher(creerBot(\"\").intentions)"),
        "33281"
    );
    assert_eq!(
        run_neko_source("importer Discord\nnekAfficher(creerBot(\"\", { intentions: 1 }).intentions)"),
        "1"
    );
}

#[test]
fn embeds_are_built_immutably() {
    let src = r#"
importer Discord
nekVariable base = creerEmbed("Météo", "Prévisions")
nekVariable complet = ajouterChamp(base, "Paris", "12°", vrai)
nekAfficher(nekLongueur(base.champs), nekLongueur(complet.champs))
nekAfficher(complet.champs[0].nom)
"#;
    assert_eq!(run_lines(src), vec!["0 1", "Paris"]);
}
