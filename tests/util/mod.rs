#![allow(dead_code)]

use nekoscript::Engine;

/// Run `source` on a fresh engine and return the result text.
pub fn run_neko_source(source: &str) -> String {
    Engine::new().execute(source)
}

/// Output lines of a successful run; panics with the error otherwise.
pub fn run_lines(source: &str) -> Vec<String> {
    match Engine::new().try_execute(source) {
        Ok(lines) => lines,
        Err((lines, error)) => panic!("script failed after {lines:?}: {error}"),
    }
}
