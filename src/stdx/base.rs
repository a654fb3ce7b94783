//=============================================
// nekoscript/stdx/base.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Base capability module
// Objective: Console, timers, files, environment, randomness and the
//            list/text/map utilities scripts reach for first
//=============================================

use super::ModuleBuilder;
use crate::interpreter::{
    Bindings, Interpreter, NativeArity, RuntimeError, Value, arg, expect_list, expect_map,
    expect_number, expect_text, join_values, length_of, split_text,
};
use chrono::Local;
use rand::Rng;
use std::cmp::Ordering;
use std::fs;
use std::path::Path;

pub fn create_module() -> Bindings {
    let mut builder = ModuleBuilder::new("Base");
    builder
        // Console & timers
        .function("afficher", NativeArity::ANY, afficher)
        .function("attendre", NativeArity::between(1, 2), attendre)
        .function("lireEntree", NativeArity::between(0, 1), lire_entree)
        // Files & environment
        .function("lireFichier", NativeArity::Exact(1), lire_fichier)
        .function("ecrireFichier", NativeArity::Exact(2), ecrire_fichier)
        .function("fichierExiste", NativeArity::Exact(1), fichier_existe)
        .function("env", NativeArity::between(1, 2), env)
        // Randomness
        .function("aleatoire", NativeArity::between(0, 2), aleatoire)
        .function("aleatoireEntier", NativeArity::Exact(2), aleatoire_entier)
        // Lists
        .function("longueur", NativeArity::Exact(1), longueur)
        .function("ajouter", NativeArity::Exact(2), ajouter)
        .function("retirer", NativeArity::Exact(2), retirer)
        .function("inverser", NativeArity::Exact(1), inverser)
        .function("trier", NativeArity::Exact(1), trier)
        .function("joindre", NativeArity::between(1, 2), joindre)
        .function("contient", NativeArity::Exact(2), contient)
        // Text
        .function("diviser", NativeArity::between(1, 2), |_, args| {
            let text = expect_text(&arg(args, 0), "diviser")?;
            split_text(&text, &arg(args, 1))
        })
        .function("remplacer", NativeArity::Exact(3), remplacer)
        .function("majuscules", NativeArity::Exact(1), |_, args| {
            Ok(Value::text(expect_text(&arg(args, 0), "majuscules")?.to_uppercase()))
        })
        .function("minuscules", NativeArity::Exact(1), |_, args| {
            Ok(Value::text(expect_text(&arg(args, 0), "minuscules")?.to_lowercase()))
        })
        .function("rogner", NativeArity::Exact(1), |_, args| {
            Ok(Value::text(expect_text(&arg(args, 0), "rogner")?.trim()))
        })
        // Maps
        .function("cles", NativeArity::Exact(1), cles)
        .function("valeurs", NativeArity::Exact(1), valeurs)
        .function("fusionner", NativeArity::at_least(1), fusionner)
        // Conversions
        .function("typeDe", NativeArity::Exact(1), |_, args| {
            Ok(Value::text(arg(args, 0).type_name()))
        })
        .function("versTexte", NativeArity::Exact(1), |_, args| {
            Ok(Value::text(arg(args, 0).to_string()))
        })
        .function("versNombre", NativeArity::Exact(1), |_, args| {
            Ok(arg(args, 0).to_number().map(Value::Number).unwrap_or_default())
        })
        .function("maintenant", NativeArity::Exact(0), |_, _| {
            Ok(Value::text(Local::now().format("%Y-%m-%d %H:%M:%S").to_string()))
        })
        .function("erreur", NativeArity::between(0, 1), erreur);
    builder.build()
}

//=============================================
//            Section 1: Console & Timers
//=============================================

pub(super) fn afficher(interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let line = args
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    interpreter.print_line(line);
    Ok(Value::Null)
}

fn attendre(interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    interpreter.sleep_builtin(args, "attendre")
}

fn lire_entree(interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let prompt = args.first().map(Value::to_string);
    interpreter.read_line(prompt.as_deref()).map(Value::Str)
}

//=============================================
//            Section 2: Files & Environment
//=============================================

fn lire_fichier(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let path = expect_text(&arg(args, 0), "lireFichier")?;
    fs::read_to_string(&path)
        .map(Value::Str)
        .map_err(|error| RuntimeError::Io(format!("{path} : {error}")))
}

fn ecrire_fichier(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let path = expect_text(&arg(args, 0), "ecrireFichier")?;
    let contents = arg(args, 1).to_string();
    fs::write(&path, contents).map_err(|error| RuntimeError::Io(format!("{path} : {error}")))?;
    Ok(Value::Bool(true))
}

fn fichier_existe(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let path = expect_text(&arg(args, 0), "fichierExiste")?;
    Ok(Value::Bool(Path::new(&path).exists()))
}

fn env(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let name = expect_text(&arg(args, 0), "env")?;
    Ok(std::env::var(&name).map(Value::Str).unwrap_or_else(|_| arg(args, 1)))
}

//=============================================
//            Section 3: Randomness
//=============================================

/// Largest integer a number holds exactly.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// `aleatoire()` in [0, 1), `aleatoire(max)` in [0, max),
/// `aleatoire(min, max)` in [min, max).
fn aleatoire(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let (min, max) = match args.len() {
        0 => (0.0, 1.0),
        1 => (0.0, expect_number(&args[0], "aleatoire")?),
        _ => (
            expect_number(&args[0], "aleatoire")?,
            expect_number(&args[1], "aleatoire")?,
        ),
    };
    if !min.is_finite() || !max.is_finite() || !(max - min).is_finite() {
        return Err(RuntimeError::ArgumentError(format!(
            "aleatoire : bornes non finies {min} et {max}"
        )));
    }
    if min >= max {
        return Ok(Value::Number(min));
    }
    Ok(Value::Number(rand::thread_rng().gen_range(min..max)))
}

/// Inclusive on both ends.
fn aleatoire_entier(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let bound = |index: usize| -> Result<f64, RuntimeError> {
        let value = expect_number(&arg(args, index), "aleatoireEntier")?;
        if !value.is_finite() || value.abs() > MAX_EXACT_INTEGER {
            return Err(RuntimeError::ArgumentError(format!(
                "aleatoireEntier : borne hors limites {value}"
            )));
        }
        Ok(value)
    };
    let min = bound(0)?.ceil() as i64;
    let max = bound(1)?.floor() as i64;
    if min > max {
        return Err(RuntimeError::ArgumentError(format!(
            "aleatoireEntier : minimum {min} supérieur au maximum {max}"
        )));
    }
    Ok(Value::Number(rand::thread_rng().gen_range(min..=max) as f64))
}

//=============================================
//            Section 4: Lists & Text
//=============================================

fn longueur(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    length_of(&arg(args, 0)).map(|len| Value::Number(len as f64))
}

/// Lists are values: `ajouter` returns a new list.
fn ajouter(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let mut items = expect_list(&arg(args, 0), "ajouter")?;
    items.push(arg(args, 1));
    Ok(Value::List(items))
}

/// Remove the element at an index (negative counts from the end).
fn retirer(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let mut items = expect_list(&arg(args, 0), "retirer")?;
    let raw = expect_number(&arg(args, 1), "retirer")?.trunc() as i64;
    let index = if raw < 0 { items.len() as i64 + raw } else { raw };
    if index < 0 || index >= items.len() as i64 {
        return Err(RuntimeError::IndexError(format!(
            "index {raw} hors limites (longueur {})",
            items.len()
        )));
    }
    items.remove(index as usize);
    Ok(Value::List(items))
}

fn inverser(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    match arg(args, 0) {
        Value::Str(text) => Ok(Value::text(text.chars().rev().collect::<String>())),
        other => {
            let mut items = expect_list(&other, "inverser")?;
            items.reverse();
            Ok(Value::List(items))
        }
    }
}

/// Numbers sort numerically, everything else by its text.
fn trier(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let mut items = expect_list(&arg(args, 0), "trier")?;
    items.sort_by(|a, b| match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        _ => a.to_string().cmp(&b.to_string()),
    });
    Ok(Value::List(items))
}

fn joindre(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let items = expect_list(&arg(args, 0), "joindre")?;
    let separator = match args.get(1) {
        Some(value) => expect_text(value, "joindre")?,
        None => ",".to_string(),
    };
    Ok(Value::text(join_values(&items, &separator)))
}

fn contient(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let needle = arg(args, 1);
    match arg(args, 0) {
        Value::Str(text) => Ok(Value::Bool(text.contains(&needle.to_string()))),
        Value::List(items) => Ok(Value::Bool(items.iter().any(|item| item.loose_eq(&needle)))),
        Value::Map(map) => Ok(Value::Bool(map.contains_key(&needle.to_string()))),
        other => Err(RuntimeError::TypeError(format!(
            "contient n'accepte pas une valeur de type {}",
            other.type_name()
        ))),
    }
}

fn remplacer(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let text = expect_text(&arg(args, 0), "remplacer")?;
    let from = expect_text(&arg(args, 1), "remplacer")?;
    let to = expect_text(&arg(args, 2), "remplacer")?;
    if from.is_empty() {
        return Ok(Value::Str(text));
    }
    Ok(Value::text(text.replace(&from, &to)))
}

//=============================================
//            Section 5: Maps & Errors
//=============================================

fn cles(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let map = expect_map(&arg(args, 0), "cles")?;
    Ok(Value::List(map.into_keys().map(Value::Str).collect()))
}

fn valeurs(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let map = expect_map(&arg(args, 0), "valeurs")?;
    Ok(Value::List(map.into_values().collect()))
}

/// Later maps win on duplicate keys.
fn fusionner(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let mut merged = Bindings::new();
    for value in args {
        merged.extend(expect_map(value, "fusionner")?);
    }
    Ok(Value::Map(merged))
}

fn erreur(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let message = match args.first() {
        Some(value) => value.to_string(),
        None => "erreur levée par le script".to_string(),
    };
    Err(RuntimeError::User(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let module = create_module();
        let func = module.get(name).expect("binding").clone();
        Interpreter::new().call_value(&func, args)
    }

    fn list(values: &[f64]) -> Value {
        Value::List(values.iter().copied().map(Value::Number).collect())
    }

    #[test]
    fn list_helpers_return_new_lists() {
        assert_eq!(
            call("ajouter", vec![list(&[1.0]), Value::Number(2.0)]).expect("ajouter"),
            list(&[1.0, 2.0])
        );
        assert_eq!(
            call("retirer", vec![list(&[1.0, 2.0, 3.0]), Value::Number(-1.0)]).expect("retirer"),
            list(&[1.0, 2.0])
        );
        assert_eq!(
            call("trier", vec![list(&[10.0, 2.0, 1.0])]).expect("trier"),
            list(&[1.0, 2.0, 10.0])
        );
    }

    #[test]
    fn random_bounds_must_be_finite() {
        for (min, max) in [
            (0.0, f64::INFINITY),
            (0.0, f64::NAN),
            (f64::NEG_INFINITY, 1.0),
            (-f64::MAX, f64::MAX),
        ] {
            let err = call("aleatoire", vec![Value::Number(min), Value::Number(max)])
                .expect_err("non-finite range");
            assert!(matches!(err, RuntimeError::ArgumentError(_)), "{min} {max}");
        }
        for (min, max) in [(0.0, f64::INFINITY), (f64::NAN, 1.0), (0.0, 1e300)] {
            let err = call("aleatoireEntier", vec![Value::Number(min), Value::Number(max)])
                .expect_err("out of range");
            assert!(matches!(err, RuntimeError::ArgumentError(_)), "{min} {max}");
        }
    }

    #[test]
    fn random_integers_stay_in_range() {
        for _ in 0..50 {
            let value = call("aleatoireEntier", vec![Value::Number(1.0), Value::Number(3.0)])
                .expect("aleatoireEntier")
                .to_number()
                .expect("number");
            assert!((1.0..=3.0).contains(&value));
        }
    }

    #[test]
    fn erreur_raises_user_error() {
        let err = call("erreur", vec![Value::text("stop")]).expect_err("raised");
        assert!(matches!(err, RuntimeError::User(ref message) if message == "stop"));
    }

    #[test]
    fn files_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("note.txt");
        let path_value = Value::text(path.to_string_lossy());
        call("ecrireFichier", vec![path_value.clone(), Value::text("miaou")]).expect("write");
        assert_eq!(call("fichierExiste", vec![path_value.clone()]).expect("exists"), Value::Bool(true));
        assert_eq!(call("lireFichier", vec![path_value]).expect("read"), Value::text("miaou"));
    }

    #[test]
    fn fusionner_prefers_later_maps() {
        let a = super::super::map_of([("x", Value::Number(1.0)), ("y", Value::Number(1.0))]);
        let b = super::super::map_of([("y", Value::Number(2.0))]);
        let merged = call("fusionner", vec![a, b]).expect("fusionner");
        let map = merged.as_map().expect("map");
        assert_eq!(map.get("y"), Some(&Value::Number(2.0)));
        assert_eq!(map.len(), 2);
    }
}
