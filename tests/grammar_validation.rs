use nekoscript::ast::{BinaryOp, Expr, ImportKind, Stmt};
use nekoscript::parser::{ParseError, Parser, SyntaxError, parse_expression_source, parse_program};
use nekoscript::tokenizer::{SyntaxMode, TokenKind, TokenizeError, Tokenizer};

fn parse(source: &str) -> nekoscript::ast::Program {
    let tokens = Tokenizer::new(source).tokenize().expect("tokenize");
    Parser::new(tokens).parse().expect("parse")
}

#[test]
fn french_word_operators_map_to_binary_ops() {
    let cases = [
        ("a est égal à b", BinaryOp::Equal),
        ("a vaut b", BinaryOp::Equal),
        ("a est différent de b", BinaryOp::NotEqual),
        ("a est supérieur à b", BinaryOp::Greater),
        ("a est inférieur ou égal à b", BinaryOp::LessEqual),
        ("a commence par b", BinaryOp::StartsWith),
        ("a finit par b", BinaryOp::EndsWith),
    ];
    for (source, expected) in cases {
        match parse_expression_source(source).expect(source) {
            Expr::Binary { operator, .. } => assert_eq!(operator, expected, "{source}"),
            other => panic!("{source}: expected binary expression, got {other:?}"),
        }
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    match parse_expression_source("1 + 2 * 3").expect("parse") {
        Expr::Binary {
            operator, right, ..
        } => {
            assert_eq!(operator, BinaryOp::Add);
            assert!(matches!(
                *right,
                Expr::Binary {
                    operator: BinaryOp::Multiply,
                    ..
                }
            ));
        }
        other => panic!("expected addition, got {other:?}"),
    }
}

#[test]
fn both_import_forms_are_parsed() {
    let program = parse("importer Math\nnekImporter Meteo depuis \"meteo-fr\"");
    let imports: Vec<_> = program
        .statements
        .iter()
        .filter_map(|stmt| match stmt {
            Stmt::Import { decl } => Some(decl),
            _ => None,
        })
        .collect();
    assert_eq!(imports.len(), 2);
    assert_eq!(imports[0].kind, ImportKind::Local);
    assert_eq!(imports[0].module_key(), "Math");
    assert_eq!(imports[1].kind, ImportKind::External);
    assert_eq!(imports[1].name, "Meteo");
    assert_eq!(imports[1].module_key(), "meteo-fr");
}

#[test]
fn strict_tokenizer_rejects_unterminated_strings() {
    let err = Tokenizer::new("nekAfficher(\"ouvert")
        .with_mode(SyntaxMode::Strict)
        .tokenize()
        .expect_err("strict");
    assert!(matches!(err, TokenizeError::UnterminatedString { .. }));

    let lenient = Tokenizer::new("nekAfficher(\"ouvert").tokenize().expect("lenient");
    assert!(lenient.iter().any(|token| token.kind == TokenKind::String));
}

#[test]
fn strict_parse_reports_missing_brace() {
    let err = parse_program("fonction f() { retourner 1", SyntaxMode::Strict).expect_err("strict");
    assert!(matches!(
        err,
        SyntaxError::Parse(ParseError::UnexpectedEndOfInput { .. })
    ));
    assert!(parse_program("fonction f() { retourner 1", SyntaxMode::Lenient).is_ok());
}

#[test]
fn statements_keep_source_order() {
    let program = parse("nekVariable a = 1; a = 2; nekAfficher(a)");
    let kinds: Vec<String> = program.statements.iter().map(Stmt::describe).collect();
    assert_eq!(kinds, vec!["variable a", "a = ..", "expression"]);
}
