#[cfg(test)]
mod scanner_tests {
    use rox::error::LoxError;
    use rox::scanner::*;
    use rox::token::*;
    use rox::CollectingReporter;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    // Helper function
    fn assert_token_matches(
        result: &Result<Token, LoxError>,
        expected_type: TokenType,
        expected_lexeme: &str,
    ) {
        match result {
            Ok(token) => {
                assert_eq!(
                    token.token_type, expected_type,
                    "Expected token type {:?}, got {:?}",
                    expected_type, token.token_type
                );
                assert_eq!(
                    token.lexeme, expected_lexeme,
                    "Expected lexeme '{}', got '{}'",
                    expected_lexeme, token.lexeme
                );
            }
            Err(e) => panic!("Expected token but got error: {}", e),
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_var_declaration() {
        let tokens: Vec<Token> = Scanner::new("var i = 123;")
            .filter_map(Result::ok)
            .collect();

        let kinds: Vec<&str> = tokens.iter().map(|t| t.token_type.name()).collect();
        assert_eq!(
            kinds,
            ["VAR", "IDENTIFIER", "EQUAL", "NUMBER", "SEMICOLON", "EOF"]
        );

        assert_eq!(tokens[1].lexeme, "i");
        assert_eq!(tokens[3].lexeme, "123");
        assert!(matches!(tokens[3].token_type, TokenType::NUMBER(n) if n == 123.0));
        assert!(tokens.iter().all(|t| t.line == 1));
    }

    #[test]
    fn test_scanner_03_two_char_operators() {
        assert_token_sequence(
            "! != = == < <= > >=",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_keywords_and_identifiers() {
        assert_token_sequence(
            "class orchid fun _under this",
            &[
                (TokenType::CLASS, "class"),
                (TokenType::IDENTIFIER, "orchid"),
                (TokenType::FUN, "fun"),
                (TokenType::IDENTIFIER, "_under"),
                (TokenType::THIS, "this"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_05_comments_are_skipped() {
        let tokens: Vec<Token> = Scanner::new("// nothing here\n/ // but a slash")
            .filter_map(Result::ok)
            .collect();

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].token_type, TokenType::SLASH);
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[1].token_type, TokenType::EOF);
    }

    #[test]
    fn test_scanner_06_multiline_string_advances_line() {
        let tokens: Vec<Token> = Scanner::new("\"one\ntwo\nthree\" x")
            .filter_map(Result::ok)
            .collect();

        match &tokens[0].token_type {
            TokenType::STRING(s) => assert_eq!(s, "one\ntwo\nthree"),
            other => panic!("Expected STRING, got {:?}", other),
        }

        assert_eq!(tokens[0].line, 3);
        assert_eq!(tokens[1].lexeme, "x");
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_scanner_07_number_display() {
        let tokens: Vec<Token> = Scanner::new("42 3.25 \"hi\" nil")
            .filter_map(Result::ok)
            .collect();

        assert_eq!(tokens[0].to_string(), "NUMBER 42 42.0");
        assert_eq!(tokens[1].to_string(), "NUMBER 3.25 3.25");
        assert_eq!(tokens[2].to_string(), "STRING \"hi\" hi");
        assert_eq!(tokens[3].to_string(), "NIL nil null");
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let scanner = Scanner::new(source);

        let results: Vec<_> = scanner.collect();

        // 0: COMMA ','
        // 1: DOT '.'
        // 2: Error for '$'
        // 3: LEFT_PAREN '('
        // 4: Error for '#'
        // 5: EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 2, "Expected 2 error messages");

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert_eq!(err.to_string(), "[line 1] Error: Unexpected character.");
        }
    }

    #[test]
    fn test_unterminated_string_is_reported() {
        let mut reporter = CollectingReporter::new();
        let tokens: Vec<Token> = Scanner::new("print \"oops").scan_tokens(&mut reporter);

        assert_eq!(reporter.messages(), ["Unterminated string."]);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].token_type, TokenType::PRINT);
        assert_eq!(tokens[1].token_type, TokenType::EOF);
    }

    #[test]
    fn test_unexpected_multibyte_char_is_skipped_whole() {
        let mut reporter = CollectingReporter::new();
        let tokens: Vec<Token> = Scanner::new("a é b").scan_tokens(&mut reporter);

        assert_eq!(reporter.errors.len(), 1);

        let lexemes: Vec<&str> = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(lexemes, ["a", "b", ""]);
    }

    #[test]
    fn test_scan_tokens_reports_lexical_errors_with_their_line() {
        let mut reporter = CollectingReporter::new();
        let tokens: Vec<Token> = Scanner::new("var a;\n@ a = 1;").scan_tokens(&mut reporter);

        let errors: Vec<String> = reporter.errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(errors, ["[line 2] Error: Unexpected character."]);
        assert!(matches!(reporter.errors[0], LoxError::Lex { line: 2, .. }));

        assert_eq!(tokens.len(), 8);
        assert_eq!(tokens.last().map(|t| t.line), Some(2));
    }
}
