//=============================================
// nekoscript/stdx/math.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Math capability module
// Objective: Trigonometry, rounding, statistics, 2D/3D vectors and base
//            conversions over NekoScript numbers
//=============================================

use super::{ModuleBuilder, map_of};
use crate::interpreter::{
    Bindings, NativeArity, RuntimeError, Value, arg, expect_list, expect_map, expect_number,
    expect_text,
};
use std::f64::consts;

pub fn create_module() -> Bindings {
    let mut builder = ModuleBuilder::new("Math");
    builder
        .constant("PI", Value::Number(consts::PI))
        .constant("E", Value::Number(consts::E))
        .constant("TAU", Value::Number(consts::TAU));

    let unary_functions: [(&'static str, fn(f64) -> f64); 16] = [
        ("sin", f64::sin),
        ("cos", f64::cos),
        ("tan", f64::tan),
        ("asin", f64::asin),
        ("acos", f64::acos),
        ("atan", f64::atan),
        ("exp", f64::exp),
        ("ln", f64::ln),
        ("log10", f64::log10),
        ("racine", f64::sqrt),
        ("abs", f64::abs),
        ("plancher", f64::floor),
        ("plafond", f64::ceil),
        ("degres", f64::to_degrees),
        ("radians", f64::to_radians),
        ("signe", f64::signum),
    ];
    for (name, func) in unary_functions {
        builder.function(name, NativeArity::Exact(1), move |_, args| {
            unary(args, name, func)
        });
    }

    builder
        .function("atan2", NativeArity::Exact(2), |_, args| {
            binary(args, "atan2", f64::atan2)
        })
        .function("puissance", NativeArity::Exact(2), |_, args| {
            binary(args, "puissance", f64::powf)
        })
        .function("log", NativeArity::between(1, 2), |_, args| {
            let x = expect_number(&arg(args, 0), "log")?;
            match args.get(1) {
                Some(base) => Ok(Value::Number(x.log(expect_number(base, "log")?))),
                None => Ok(Value::Number(x.ln())),
            }
        })
        .function("arrondir", NativeArity::between(1, 2), |_, args| {
            let x = expect_number(&arg(args, 0), "arrondir")?;
            let decimals = match args.get(1) {
                Some(value) => expect_number(value, "arrondir")?.max(0.0) as i32,
                None => 0,
            };
            let factor = 10f64.powi(decimals);
            Ok(Value::Number((x * factor).round() / factor))
        })
        .function("min", NativeArity::at_least(1), |_, args| {
            fold_numbers(args, "min", f64::min)
        })
        .function("max", NativeArity::at_least(1), |_, args| {
            fold_numbers(args, "max", f64::max)
        })
        .function("limiter", NativeArity::Exact(3), |_, args| {
            let x = expect_number(&arg(args, 0), "limiter")?;
            let low = expect_number(&arg(args, 1), "limiter")?;
            let high = expect_number(&arg(args, 2), "limiter")?;
            Ok(Value::Number(x.max(low).min(high)))
        })
        // Statistics
        .function("somme", NativeArity::at_least(1), |_, args| {
            Ok(Value::Number(numbers(args, "somme")?.iter().sum()))
        })
        .function("moyenne", NativeArity::at_least(1), |_, args| {
            mean(&numbers(args, "moyenne")?).map(Value::Number)
        })
        .function("mediane", NativeArity::at_least(1), |_, args| {
            median(numbers(args, "mediane")?).map(Value::Number)
        })
        .function("variance", NativeArity::at_least(1), |_, args| {
            variance(&numbers(args, "variance")?).map(Value::Number)
        })
        .function("ecartType", NativeArity::at_least(1), |_, args| {
            variance(&numbers(args, "ecartType")?).map(|v| Value::Number(v.sqrt()))
        })
        // Vectors
        .function("vecteur", NativeArity::between(2, 3), |_, args| {
            let components = args
                .iter()
                .map(|value| expect_number(value, "vecteur"))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Vector::from_components(&components).into_value())
        })
        .function("addition", NativeArity::Exact(2), |_, args| {
            let (a, b) = vector_pair(args, "addition")?;
            Ok(a.zip(&b, |x, y| x + y).into_value())
        })
        .function("soustraction", NativeArity::Exact(2), |_, args| {
            let (a, b) = vector_pair(args, "soustraction")?;
            Ok(a.zip(&b, |x, y| x - y).into_value())
        })
        .function("echelle", NativeArity::Exact(2), |_, args| {
            let v = Vector::from_value(&arg(args, 0), "echelle")?;
            let k = expect_number(&arg(args, 1), "echelle")?;
            Ok(v.scale(k).into_value())
        })
        .function("produitScalaire", NativeArity::Exact(2), |_, args| {
            let (a, b) = vector_pair(args, "produitScalaire")?;
            Ok(Value::Number(a.dot(&b)))
        })
        .function("produitVectoriel", NativeArity::Exact(2), |_, args| {
            let (a, b) = vector_pair(args, "produitVectoriel")?;
            Ok(a.cross(&b).into_value())
        })
        .function("norme", NativeArity::Exact(1), |_, args| {
            Ok(Value::Number(Vector::from_value(&arg(args, 0), "norme")?.norm()))
        })
        .function("normaliser", NativeArity::Exact(1), |_, args| {
            let v = Vector::from_value(&arg(args, 0), "normaliser")?;
            let norm = v.norm();
            if norm == 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(v.scale(1.0 / norm).into_value())
        })
        .function("distance", NativeArity::Exact(2), |_, args| {
            let (a, b) = vector_pair(args, "distance")?;
            Ok(Value::Number(a.zip(&b, |x, y| x - y).norm()))
        })
        // Bases
        .function("versBinaire", NativeArity::Exact(1), |_, args| {
            to_base(&arg(args, 0), 2, "versBinaire")
        })
        .function("versOctal", NativeArity::Exact(1), |_, args| {
            to_base(&arg(args, 0), 8, "versOctal")
        })
        .function("versHexadecimal", NativeArity::Exact(1), |_, args| {
            to_base(&arg(args, 0), 16, "versHexadecimal")
        })
        .function("versBase", NativeArity::Exact(2), |_, args| {
            let radix = expect_number(&arg(args, 1), "versBase")? as u32;
            to_base(&arg(args, 0), radix, "versBase")
        })
        .function("depuisBase", NativeArity::Exact(2), |_, args| {
            let digits = expect_text(&arg(args, 0), "depuisBase")?;
            let radix = expect_number(&arg(args, 1), "depuisBase")? as u32;
            from_base(&digits, radix)
        });
    builder.build()
}

//=============================================
//            Section 1: Scalar Helpers
//=============================================

pub(super) fn unary(args: &[Value], name: &str, func: fn(f64) -> f64) -> Result<Value, RuntimeError> {
    Ok(Value::Number(func(expect_number(&arg(args, 0), name)?)))
}

fn binary(args: &[Value], name: &str, func: fn(f64, f64) -> f64) -> Result<Value, RuntimeError> {
    let a = expect_number(&arg(args, 0), name)?;
    let b = expect_number(&arg(args, 1), name)?;
    Ok(Value::Number(func(a, b)))
}

/// Accepts either a single list or numbers as separate arguments.
fn numbers(args: &[Value], name: &str) -> Result<Vec<f64>, RuntimeError> {
    let values = match args {
        [Value::List(items)] => items.clone(),
        _ => args.to_vec(),
    };
    if values.is_empty() {
        return Err(RuntimeError::ArgumentError(format!(
            "{name} attend au moins un nombre"
        )));
    }
    values.iter().map(|value| expect_number(value, name)).collect()
}

fn fold_numbers(args: &[Value], name: &str, func: fn(f64, f64) -> f64) -> Result<Value, RuntimeError> {
    let values = numbers(args, name)?;
    let first = values[0];
    Ok(Value::Number(values.into_iter().skip(1).fold(first, func)))
}

fn mean(values: &[f64]) -> Result<f64, RuntimeError> {
    if values.is_empty() {
        return Err(RuntimeError::ArgumentError("moyenne d'une liste vide".into()));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

fn median(mut values: Vec<f64>) -> Result<f64, RuntimeError> {
    if values.is_empty() {
        return Err(RuntimeError::ArgumentError("médiane d'une liste vide".into()));
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Ok((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Ok(values[mid])
    }
}

/// Population variance.
fn variance(values: &[f64]) -> Result<f64, RuntimeError> {
    let avg = mean(values)?;
    Ok(values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64)
}

fn to_base(value: &Value, radix: u32, name: &str) -> Result<Value, RuntimeError> {
    if !(2..=36).contains(&radix) {
        return Err(RuntimeError::ArgumentError(format!(
            "{name} : base {radix} hors de l'intervalle 2..36"
        )));
    }
    let n = expect_number(value, name)?.trunc() as i64;
    let mut magnitude = n.unsigned_abs();
    if magnitude == 0 {
        return Ok(Value::text("0"));
    }
    let mut digits = Vec::new();
    while magnitude > 0 {
        let digit = (magnitude % radix as u64) as u32;
        digits.push(std::char::from_digit(digit, radix).unwrap_or('?'));
        magnitude /= radix as u64;
    }
    if n < 0 {
        digits.push('-');
    }
    Ok(Value::text(digits.iter().rev().collect::<String>()))
}

fn from_base(digits: &str, radix: u32) -> Result<Value, RuntimeError> {
    if !(2..=36).contains(&radix) {
        return Err(RuntimeError::ArgumentError(format!(
            "depuisBase : base {radix} hors de l'intervalle 2..36"
        )));
    }
    let cleaned = digits.trim();
    let cleaned = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0b"))
        .filter(|_| radix == 16 || radix == 2)
        .unwrap_or(cleaned);
    i64::from_str_radix(cleaned, radix)
        .map(|n| Value::Number(n as f64))
        .map_err(|_| {
            RuntimeError::ArgumentError(format!("'{digits}' n'est pas un nombre en base {radix}"))
        })
}

//=============================================
//            Section 2: Vectors
//=============================================

/// `{x, y}` or `{x, y, z}` map.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Vector {
    x: f64,
    y: f64,
    z: Option<f64>,
}

impl Vector {
    fn from_components(components: &[f64]) -> Self {
        Self {
            x: components.first().copied().unwrap_or_default(),
            y: components.get(1).copied().unwrap_or_default(),
            z: components.get(2).copied(),
        }
    }

    fn from_value(value: &Value, name: &str) -> Result<Self, RuntimeError> {
        if let Value::List(_) = value {
            let components = expect_list(value, name)?
                .iter()
                .map(|c| expect_number(c, name))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Self::from_components(&components));
        }
        let map = expect_map(value, name)?;
        let component = |key: &str| -> Result<Option<f64>, RuntimeError> {
            map.get(key).map(|v| expect_number(v, name)).transpose()
        };
        Ok(Self {
            x: component("x")?.unwrap_or_default(),
            y: component("y")?.unwrap_or_default(),
            z: component("z")?,
        })
    }

    fn into_value(self) -> Value {
        let mut entries = vec![("x", Value::Number(self.x)), ("y", Value::Number(self.y))];
        if let Some(z) = self.z {
            entries.push(("z", Value::Number(z)));
        }
        map_of(entries)
    }

    fn zip(&self, other: &Vector, func: impl Fn(f64, f64) -> f64) -> Vector {
        let z = match (self.z, other.z) {
            (None, None) => None,
            (a, b) => Some(func(a.unwrap_or_default(), b.unwrap_or_default())),
        };
        Vector {
            x: func(self.x, other.x),
            y: func(self.y, other.y),
            z,
        }
    }

    fn scale(&self, k: f64) -> Vector {
        Vector {
            x: self.x * k,
            y: self.y * k,
            z: self.z.map(|z| z * k),
        }
    }

    fn dot(&self, other: &Vector) -> f64 {
        self.x * other.x + self.y * other.y + self.z.unwrap_or_default() * other.z.unwrap_or_default()
    }

    /// 2D inputs are treated as lying in the z = 0 plane.
    fn cross(&self, other: &Vector) -> Vector {
        let (az, bz) = (self.z.unwrap_or_default(), other.z.unwrap_or_default());
        Vector {
            x: self.y * bz - az * other.y,
            y: az * other.x - self.x * bz,
            z: Some(self.x * other.y - self.y * other.x),
        }
    }

    fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }
}

fn vector_pair(args: &[Value], name: &str) -> Result<(Vector, Vector), RuntimeError> {
    Ok((
        Vector::from_value(&arg(args, 0), name)?,
        Vector::from_value(&arg(args, 1), name)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Interpreter;

    fn call(name: &str, args: Vec<Value>) -> Value {
        let module = create_module();
        let func = module.get(name).expect("binding").clone();
        Interpreter::new().call_value(&func, args).expect("call")
    }

    fn num(value: Value) -> f64 {
        value.to_number().expect("number")
    }

    #[test]
    fn statistics_accept_list_or_varargs() {
        let list = Value::List(vec![Value::Number(2.0), Value::Number(4.0), Value::Number(9.0)]);
        assert_eq!(num(call("moyenne", vec![list.clone()])), 5.0);
        assert_eq!(num(call("mediane", vec![list])), 4.0);
        assert_eq!(
            num(call("mediane", vec![Value::Number(1.0), Value::Number(3.0)])),
            2.0
        );
        assert_eq!(
            num(call("variance", vec![Value::Number(1.0), Value::Number(3.0)])),
            1.0
        );
    }

    #[test]
    fn rounding_with_decimals() {
        assert_eq!(
            num(call("arrondir", vec![Value::Number(3.14159), Value::Number(2.0)])),
            3.14
        );
        assert_eq!(num(call("arrondir", vec![Value::Number(2.5)])), 3.0);
    }

    #[test]
    fn vectors_are_maps() {
        let a = call("vecteur", vec![Value::Number(3.0), Value::Number(4.0)]);
        assert_eq!(num(call("norme", vec![a.clone()])), 5.0);
        let sum = call("addition", vec![a.clone(), a]);
        assert_eq!(sum.as_map().and_then(|m| m.get("x")).cloned(), Some(Value::Number(6.0)));

        let x = call("vecteur", vec![Value::Number(1.0), Value::Number(0.0), Value::Number(0.0)]);
        let y = call("vecteur", vec![Value::Number(0.0), Value::Number(1.0), Value::Number(0.0)]);
        let z = call("produitVectoriel", vec![x, y]);
        assert_eq!(z.as_map().and_then(|m| m.get("z")).cloned(), Some(Value::Number(1.0)));
    }

    #[test]
    fn base_conversions() {
        assert_eq!(call("versBinaire", vec![Value::Number(10.0)]), Value::text("1010"));
        assert_eq!(call("versHexadecimal", vec![Value::Number(255.0)]), Value::text("ff"));
        assert_eq!(call("versBase", vec![Value::Number(-8.0), Value::Number(8.0)]), Value::text("-10"));
        assert_eq!(
            call("depuisBase", vec![Value::text("ff"), Value::Number(16.0)]),
            Value::Number(255.0)
        );
    }
}
