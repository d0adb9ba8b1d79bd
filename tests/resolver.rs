#[cfg(test)]
mod resolver_tests {
    use treelox as lox;

    use lox::interpreter::Interpreter;
    use lox::parser::Parser;
    use lox::resolver::Resolver;
    use lox::scanner::scan_tokens;

    fn resolve_errors(source: &str) -> Vec<String> {
        let (tokens, lex_errors) = scan_tokens(source);
        assert!(lex_errors.is_empty(), "lex errors: {:?}", lex_errors);

        let (statements, parse_errors) = Parser::new(&tokens).parse();
        assert!(parse_errors.is_empty(), "parse errors: {:?}", parse_errors);

        let mut sink: Vec<u8> = Vec::new();
        let mut interpreter = Interpreter::new(&mut sink);

        Resolver::new(&mut interpreter)
            .resolve(&statements)
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn test_clean_program_has_no_errors() {
        let source = r#"
            var a = 1;
            fun f(x) { var y = x; return y + a; }
            class A { init(v) { this.v = v; } get() { return this.v; } }
            class B < A { get() { return super.get(); } }
        "#;

        assert!(resolve_errors(source).is_empty());
    }

    #[test]
    fn test_redeclaration_in_local_scope() {
        assert_eq!(
            resolve_errors("{ var a = 1; var a = 2; }"),
            vec!["[line 1] Error at 'a': Variable with this name already declared in this scope."]
        );
    }

    #[test]
    fn test_duplicate_parameter() {
        assert_eq!(
            resolve_errors("fun f(a, a) {}"),
            vec!["[line 1] Error at 'a': Variable with this name already declared in this scope."]
        );
    }

    #[test]
    fn test_global_redeclaration_and_shadowing_are_allowed() {
        assert!(resolve_errors("var a = 1; var a = 2;").is_empty());
        assert!(resolve_errors("{ var a = 1; { var a = 2; } }").is_empty());
    }

    #[test]
    fn test_read_in_own_initializer() {
        assert_eq!(
            resolve_errors("{ var a = 1; { var a = a; } }"),
            vec!["[line 1] Error at 'a': Cannot read local variable in its own initializer."]
        );

        // globals are looked up at runtime instead
        assert!(resolve_errors("var a = a;").is_empty());
    }

    #[test]
    fn test_top_level_return() {
        assert_eq!(
            resolve_errors("return 1;"),
            vec!["[line 1] Error at 'return': Cannot return from top-level code."]
        );
    }

    #[test]
    fn test_return_value_from_initializer() {
        assert_eq!(
            resolve_errors("class A { init() { return 1; } }"),
            vec!["[line 1] Error at 'return': Cannot return a value from an initializer."]
        );

        assert!(resolve_errors("class A { init() { return; } }").is_empty());
    }

    #[test]
    fn test_this_outside_class() {
        assert_eq!(
            resolve_errors("print this;"),
            vec!["[line 1] Error at 'this': Cannot use 'this' outside of a class."]
        );

        assert_eq!(
            resolve_errors("fun f() { return this; }"),
            vec!["[line 1] Error at 'this': Cannot use 'this' outside of a class."]
        );
    }

    #[test]
    fn test_super_misuse() {
        assert_eq!(
            resolve_errors("print super.x;"),
            vec!["[line 1] Error at 'super': Cannot use 'super' outside of a class."]
        );

        assert_eq!(
            resolve_errors("class A { f() { super.f(); } }"),
            vec!["[line 1] Error at 'super': Can't use 'super' in a class with no superclass."]
        );
    }

    #[test]
    fn test_class_inheriting_from_itself() {
        assert_eq!(
            resolve_errors("class A < A {}"),
            vec!["[line 1] Error at 'A': A class can't inherit from itself."]
        );
    }

    #[test]
    fn test_contextual_errors_do_not_stop_the_pass() {
        assert_eq!(
            resolve_errors("return 1;\nprint this;"),
            vec![
                "[line 1] Error at 'return': Cannot return from top-level code.",
                "[line 2] Error at 'this': Cannot use 'this' outside of a class.",
            ]
        );
    }

    #[test]
    fn test_redeclaration_stops_the_pass() {
        assert_eq!(
            resolve_errors("{ var a; var a; }\nreturn 1;"),
            vec!["[line 1] Error at 'a': Variable with this name already declared in this scope."]
        );
    }
}
