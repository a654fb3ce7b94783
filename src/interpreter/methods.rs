//=============================================
// nekoscript/interpreter/methods.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Built-in methods on text and list values
// Objective: Resolve `texte.majuscules()` style member calls with French and
//            English method names
//=============================================

use super::value::{Value, arg, expect_text};
use super::RuntimeError;

/// Evaluate a method on a text receiver. `None` when the method is unknown.
pub(super) fn text_method(
    text: &str,
    method: &str,
    args: &[Value],
) -> Option<Result<Value, RuntimeError>> {
    let result = match method {
        "commencePar" | "startsWith" => {
            expect_text(&arg(args, 0), method).map(|prefix| Value::Bool(text.starts_with(&prefix)))
        }
        "finitPar" | "endsWith" => {
            expect_text(&arg(args, 0), method).map(|suffix| Value::Bool(text.ends_with(&suffix)))
        }
        "contient" | "includes" => {
            expect_text(&arg(args, 0), method).map(|needle| Value::Bool(text.contains(&needle)))
        }
        "majuscules" | "toUpperCase" => Ok(Value::text(text.to_uppercase())),
        "minuscules" | "toLowerCase" => Ok(Value::text(text.to_lowercase())),
        "rogner" | "trim" => Ok(Value::text(text.trim())),
        "diviser" | "split" => split_text(text, &arg(args, 0)),
        "remplacer" | "replace" => replace_text(text, args),
        "longueur" | "length" => Ok(Value::Number(text.chars().count() as f64)),
        _ => return None,
    };
    Some(result)
}

/// Evaluate a method on a list receiver. `None` when the method is unknown.
pub(super) fn list_method(
    items: &[Value],
    method: &str,
    args: &[Value],
) -> Option<Result<Value, RuntimeError>> {
    let result = match method {
        "longueur" | "length" => Ok(Value::Number(items.len() as f64)),
        "contient" | "includes" => {
            let needle = arg(args, 0);
            Ok(Value::Bool(items.iter().any(|item| item.loose_eq(&needle))))
        }
        "joindre" | "join" => {
            let separator = match args.first() {
                Some(value) => match expect_text(value, method) {
                    Ok(separator) => separator,
                    Err(error) => return Some(Err(error)),
                },
                None => ",".to_string(),
            };
            Ok(Value::text(join_values(items, &separator)))
        }
        _ => return None,
    };
    Some(result)
}

pub fn split_text(text: &str, separator: &Value) -> Result<Value, RuntimeError> {
    let parts: Vec<Value> = match separator {
        Value::Null => text.split_whitespace().map(Value::text).collect(),
        other => {
            let separator = expect_text(other, "diviser")?;
            if separator.is_empty() {
                text.chars().map(|ch| Value::text(ch.to_string())).collect()
            } else {
                text.split(separator.as_str()).map(Value::text).collect()
            }
        }
    };
    Ok(Value::List(parts))
}

fn replace_text(text: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    let from = expect_text(&arg(args, 0), "remplacer")?;
    let to = expect_text(&arg(args, 1), "remplacer")?;
    if from.is_empty() {
        return Ok(Value::text(text));
    }
    Ok(Value::text(text.replace(&from, &to)))
}

pub fn join_values(items: &[Value], separator: &str) -> String {
    items
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call_text(text: &str, method: &str, args: &[Value]) -> Value {
        text_method(text, method, args)
            .expect("known method")
            .expect("method succeeds")
    }

    #[test]
    fn french_and_english_names_agree() {
        let arg = [Value::text("ne")];
        assert_eq!(call_text("neko", "commencePar", &arg), Value::Bool(true));
        assert_eq!(call_text("neko", "startsWith", &arg), Value::Bool(true));
        assert_eq!(call_text("Neko", "majuscules", &[]), Value::text("NEKO"));
    }

    #[test]
    fn split_and_join() {
        let parts = call_text("a,b,c", "diviser", &[Value::text(",")]);
        match &parts {
            Value::List(items) => {
                assert_eq!(items.len(), 3);
                let joined = list_method(items, "joindre", &[Value::text("-")])
                    .expect("known")
                    .expect("join");
                assert_eq!(joined, Value::text("a-b-c"));
            }
            other => panic!("expected list, found {other:?}"),
        }
    }

    #[test]
    fn unknown_method_is_none() {
        assert!(text_method("x", "voler", &[]).is_none());
        assert!(list_method(&[], "voler", &[]).is_none());
    }
}
