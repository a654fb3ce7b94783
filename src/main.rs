//=====================================================
// File: main.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: NekoScript CLI entry point
// Objective: Command-line interface (`neko`) for running, checking and
//            supervising .neko programs and managing published packages
//=====================================================

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use nekoscript::config::{LOCAL_CONFIG_FILE, MANIFEST_FILE};
use nekoscript::modules::{PackageError, PackageStore, fetch_remote};
use nekoscript::runtime::format_uptime;
use nekoscript::{Engine, EngineConfig, ProjectManifest, logging};

#[derive(Parser, Debug)]
#[command(name = "neko", version, about = "NekoScript : le langage de script en français")]
pub struct Args {
    /// Verbose tracing on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Engine configuration file (defaults to ./neko.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install a package from the local store or the remote registry.
    #[command(alias = "installer")]
    Telecharger { nom: String },
    /// Create a project manifest and entry file.
    Init { nom: Option<String> },
    /// List published packages and built-in modules.
    Liste,
    /// Write a starter .neko file.
    Creer {
        fichier: PathBuf,
        #[arg(long, value_enum, default_value_t = Modele::Script)]
        modele: Modele,
    },
    /// Publish a .neko file as a package.
    Publier {
        fichier: PathBuf,
        #[arg(long)]
        nom: String,
        /// The file names a host module factory instead of holding source.
        #[arg(long)]
        hote: bool,
    },
    /// Run a program once and print its output.
    #[command(alias = "run")]
    Executer { fichier: PathBuf },
    /// Static analysis without running the program.
    Tester { fichier: PathBuf },
    /// Run a long-lived program (bot, server, game) until Ctrl-C.
    Demarrer {
        fichier: PathBuf,
        #[arg(long)]
        nom: Option<String>,
    },
    /// List supervised processes.
    Processus,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Modele {
    Script,
    Bot,
    Web,
    Jeu,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init("neko", args.verbose);

    let config = match &args.config {
        Some(path) => EngineConfig::load_from(path)
            .with_context(|| format!("chargement de {}", path.display()))?,
        None => EngineConfig::load().context("chargement de la configuration")?,
    };

    let store_path = package_store_path();
    let packages = PackageStore::load_json(&store_path)
        .with_context(|| format!("lecture des paquets dans {}", store_path.display()))?;
    let mut engine = Engine::with_packages(config, packages);

    match args.command {
        Command::Telecharger { nom } => download(&mut engine, &store_path, &nom)?,
        Command::Init { nom } => init_project(nom)?,
        Command::Liste => list(&engine),
        Command::Creer { fichier, modele } => create_file(&fichier, modele)?,
        Command::Publier { fichier, nom, hote } => {
            let code = read_source(&fichier)?;
            match engine.publish_package(&code, &nom, hote) {
                Ok(message) => {
                    save_store(&engine, &store_path)?;
                    println!("{message}");
                }
                Err(error) => println!("Publication impossible : {error}"),
            }
        }
        Command::Executer { fichier } => {
            let source = read_source(&fichier)?;
            println!("{}", engine.execute(&source));
        }
        Command::Tester { fichier } => {
            let source = read_source(&fichier)?;
            println!("{}", engine.check(&source).render());
        }
        Command::Demarrer { fichier, nom } => {
            let source = read_source(&fichier)?;
            let name = nom.unwrap_or_else(|| {
                fichier
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "programme".to_string())
            });
            run_supervised(&engine, &name, &source)?;
        }
        Command::Processus => list_processes(&engine),
    }
    Ok(())
}

//=====================================================
// Section 1 - Packages
//=====================================================

fn package_store_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("nekoscript"))
        .unwrap_or_else(|| PathBuf::from(".neko"))
        .join("paquets.json")
}

fn save_store(engine: &Engine, path: &Path) -> Result<()> {
    engine
        .packages()
        .read()
        .save_json(path)
        .with_context(|| format!("écriture des paquets dans {}", path.display()))
}

fn download(engine: &mut Engine, store_path: &Path, name: &str) -> Result<()> {
    let known = engine.list_packages().iter().any(|package| package.name == name);
    if !known {
        let registry = engine.config().registry.url.clone();
        match fetch_remote(&registry, name) {
            Ok(package) => {
                engine.install_package(package)?;
                save_store(engine, store_path)?;
            }
            Err(PackageError::NotFound(_)) => {
                println!("Paquet '{name}' introuvable dans le registre {registry}");
                return Ok(());
            }
            Err(error) => {
                println!("Téléchargement de '{name}' impossible : {error}");
                return Ok(());
            }
        }
    }

    match engine.download_package(name) {
        Ok(message) => println!("{message}"),
        Err(error) => println!("Installation de '{name}' impossible : {error}"),
    }

    let manifest_path = Path::new(MANIFEST_FILE);
    if manifest_path.exists() {
        let mut manifest = ProjectManifest::load(manifest_path)?;
        let version = engine
            .list_packages()
            .into_iter()
            .find(|package| package.name == name)
            .map(|package| package.version)
            .unwrap_or_else(|| "*".to_string());
        manifest.dependances.insert(name.to_string(), version);
        manifest.save(manifest_path)?;
    }
    Ok(())
}

fn list(engine: &Engine) {
    let packages = engine.list_packages();
    if packages.is_empty() {
        println!("Aucun paquet publié.");
    } else {
        println!("Paquets publiés :");
        for package in packages {
            let kind = if package.is_host_code { "hôte" } else { "neko" };
            println!("  {} {} ({kind})", package.name, package.version);
        }
    }
    let builtins: Vec<&str> = nekoscript::BuiltinModule::ALL
        .iter()
        .map(|module| module.canonical_name())
        .collect();
    println!("Modules intégrés : {}", builtins.join(", "));
}

//=====================================================
// Section 2 - Project Scaffolding
//=====================================================

fn init_project(name: Option<String>) -> Result<()> {
    let manifest_path = Path::new(MANIFEST_FILE);
    if manifest_path.exists() {
        bail!("{MANIFEST_FILE} existe déjà");
    }
    let name = match name {
        Some(name) => name,
        None => std::env::current_dir()?
            .file_name()
            .map(|dir| dir.to_string_lossy().into_owned())
            .unwrap_or_else(|| "projet".to_string()),
    };
    let manifest = ProjectManifest::new(&name);
    manifest.save(manifest_path)?;

    let entry = Path::new(&manifest.projet.entree);
    if !entry.exists() {
        fs::write(entry, template(Modele::Script))
            .with_context(|| format!("écriture de {}", entry.display()))?;
    }
    println!(
        "Projet '{name}' initialisé ({MANIFEST_FILE}, {}). Configuration moteur optionnelle : {LOCAL_CONFIG_FILE}",
        manifest.projet.entree
    );
    Ok(())
}

fn create_file(path: &Path, modele: Modele) -> Result<()> {
    if path.exists() {
        bail!("{} existe déjà", path.display());
    }
    fs::write(path, template(modele)).with_context(|| format!("écriture de {}", path.display()))?;
    println!("Fichier {} créé (modèle {modele:?})", path.display());
    Ok(())
}

fn template(modele: Modele) -> &'static str {
    match modele {
        Modele::Script => {
            "// Mon premier programme NekoScript\n\
             nekVariable nom = \"monde\"\n\
             nekAfficher(\"Bonjour \" + nom)\n"
        }
        Modele::Bot => {
            "importer Base\n\
             importer Discord\n\n\
             nekVariable bot = creerBot(env(\"NEKO_JETON\", \"\"))\n\n\
             bot.commande(\"ping\", fonction(message, args) {\n\
             \x20   message.repondre(\"pong\")\n\
             })\n\n\
             bot.surMessage(fonction(message) {\n\
             \x20   si message.contenu contient \"bonjour\" {\n\
             \x20       message.repondre(\"Bonjour \" + message.auteur)\n\
             \x20   }\n\
             })\n\n\
             bot.connecter()\n"
        }
        Modele::Web => {
            "importer Web\n\n\
             nekVariable serveur = creerServeur(3000)\n\n\
             serveur.get(\"/\", fonction(requete, reponse) {\n\
             \x20   reponse.html(page(\"Accueil\", \"<h1>Bienvenue</h1>\"))\n\
             })\n\n\
             serveur.get(\"/bonjour/:nom\", fonction(requete, reponse) {\n\
             \x20   retourner \"Bonjour \" + requete.parametres.nom\n\
             })\n\n\
             serveur.demarrer()\n"
        }
        Modele::Jeu => {
            "importer Jeu\n\n\
             nekVariable jeu = creerJeu(320, 240, \"Mon jeu\")\n\
             nekVariable joueur = jeu.sprite(10, 100, 16, 16, \"jaune\")\n\
             joueur.definirVitesse(60, 0)\n\n\
             jeu.demarrer(fonction(dt, image) {\n\
             \x20   jeu.effacer(\"noir\")\n\
             \x20   si joueur.position().x > 300 {\n\
             \x20       joueur.positionner(0, 100)\n\
             \x20   }\n\
             })\n"
        }
    }
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("lecture de {}", path.display()))
}

//=====================================================
// Section 3 - Supervised Processes
//=====================================================

fn run_supervised(engine: &Engine, name: &str, source: &str) -> Result<()> {
    let id = match engine.start_process(name, source) {
        Ok(id) => id,
        Err(error) => {
            println!("Démarrage impossible : {error}");
            return Ok(());
        }
    };
    let kind = engine
        .list_processes()
        .into_iter()
        .find(|info| info.id == id)
        .map(|info| info.kind.to_string())
        .unwrap_or_default();
    println!("Processus {id} « {name} » démarré ({kind}). Ctrl-C pour arrêter.");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("création du runtime tokio")?;

    let printed = runtime.block_on(async {
        let mut printed = 0;
        let mut ticker = tokio::time::interval(Duration::from_millis(250));
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        loop {
            tokio::select! {
                result = &mut ctrl_c => {
                    if let Err(error) = result {
                        tracing::warn!(%error, "ctrl-c handler unavailable");
                    }
                    break;
                }
                _ = ticker.tick() => {
                    let lines = engine.process_output(id).unwrap_or_default();
                    for line in lines.iter().skip(printed) {
                        println!("{line}");
                    }
                    printed = lines.len();
                    let finished = engine
                        .list_processes()
                        .iter()
                        .any(|info| info.id == id && info.finished);
                    if finished {
                        break;
                    }
                }
            }
        }
        printed
    });

    let lines = engine.stop_process(id)?;
    for line in lines.iter().skip(printed) {
        println!("{line}");
    }
    println!("Processus {id} arrêté.");
    Ok(())
}

fn list_processes(engine: &Engine) {
    let processes = engine.list_processes();
    if processes.is_empty() {
        println!("Aucun processus actif.");
        return;
    }
    for info in processes {
        println!(
            "{:>4}  {:<20} {:<14} {}{}",
            info.id,
            info.name,
            info.kind,
            format_uptime(info.uptime),
            if info.finished { "  (terminé)" } else { "" }
        );
    }
}

//=====================================================
// End of file
//=====================================================
