#[cfg(test)]
mod parser_tests {
    use treelox as lox;

    use lox::ast::*;
    use lox::ast_printer::AstPrinter;
    use lox::parser::Parser;
    use lox::scanner::scan_tokens;

    fn print_expr(source: &str) -> String {
        let (tokens, lex_errors) = scan_tokens(source);
        assert!(lex_errors.is_empty(), "lex errors: {:?}", lex_errors);

        let (expr, errors) = Parser::new(&tokens).parse_expression();
        assert!(errors.is_empty(), "parse errors: {:?}", errors);

        AstPrinter::print(&expr.expect("expression"))
    }

    fn parse_program(source: &str) -> (Vec<Stmt>, Vec<String>) {
        let (tokens, lex_errors) = scan_tokens(source);
        assert!(lex_errors.is_empty(), "lex errors: {:?}", lex_errors);

        let (statements, errors) = Parser::new(&tokens).parse();
        (statements, errors.iter().map(|e| e.to_string()).collect())
    }

    #[test]
    fn test_precedence_ladder() {
        assert_eq!(print_expr("1 + 2 * 3"), "(+ 1 (* 2 3))");
        assert_eq!(print_expr("1 - 2 - 3"), "(- (- 1 2) 3)");
        assert_eq!(print_expr("(1 + 2) % 4"), "(% (group (+ 1 2)) 4)");
        assert_eq!(print_expr("!true == false"), "(== (! true) false)");
        assert_eq!(print_expr("1 < 2 == 3 >= 4"), "(== (< 1 2) (>= 3 4))");
        assert_eq!(print_expr("a or b and c"), "(or a (and b c))");
    }

    #[test]
    fn test_power_is_right_associative_and_binds_tighter_than_factor() {
        assert_eq!(print_expr("2 ** 3 ** 2"), "(** 2 (** 3 2))");
        assert_eq!(print_expr("2 * 3 ** 2"), "(* 2 (** 3 2))");
        assert_eq!(print_expr("-2 ** 2"), "(** (- 2) 2)");
    }

    #[test]
    fn test_conditional_is_right_associative() {
        assert_eq!(
            print_expr("1 > 2 ? 3 : 4 ? 5 : 6"),
            "(conditional (> 1 2) 3 (conditional 4 5 6))"
        );
        assert_eq!(
            print_expr("a ? b ? 1 : 2 : 3"),
            "(conditional a (conditional b 1 2) 3)"
        );
    }

    #[test]
    fn test_literals_print_compactly() {
        assert_eq!(print_expr("13.0"), "13");
        assert_eq!(print_expr("1.5"), "1.5");
        assert_eq!(print_expr("\"hi\" + nil"), "(+ hi nil)");
    }

    #[test]
    fn test_calls_and_properties() {
        assert_eq!(print_expr("f(1)(2, 3)"), "(call (call f 1) 2 3)");
        assert_eq!(print_expr("-a.b(c)"), "(- (call (. a b) c))");
        assert_eq!(print_expr("a.b = 1"), "(= (. a b) 1)");
        assert_eq!(print_expr("a = b = 3"), "(= a (= b 3))");
    }

    #[test]
    fn test_trailing_tokens_in_expression_mode() {
        let (tokens, _) = scan_tokens("1 2");
        let (expr, errors) = Parser::new(&tokens).parse_expression();

        assert!(expr.is_none());
        assert_eq!(
            errors[0].to_string(),
            "[line 1] Error at '2': Expect end of expression."
        );
    }

    #[test]
    fn test_for_loop_desugars_to_while_in_block() {
        let (statements, errors) = parse_program("for (var i = 0; i < 3; i = i + 1) print i;");

        assert!(errors.is_empty());
        assert_eq!(statements.len(), 1);

        let Stmt::Block(outer) = &statements[0] else {
            panic!("expected block, got {:?}", statements[0]);
        };

        assert!(matches!(outer[0], Stmt::Var { .. }));

        let Stmt::While { body, .. } = &outer[1] else {
            panic!("expected while, got {:?}", outer[1]);
        };

        let Stmt::Block(inner) = body.as_ref() else {
            panic!("expected increment block, got {:?}", body);
        };

        assert!(matches!(inner[0], Stmt::Print(_)));
        assert!(matches!(inner[1], Stmt::Expression(Expr::Assign { .. })));
    }

    #[test]
    fn test_for_without_condition_loops_on_true() {
        let (statements, errors) = parse_program("for (;;) print 1;");

        assert!(errors.is_empty());
        assert!(matches!(
            &statements[0],
            Stmt::While {
                condition: Expr::Literal(LiteralValue::True),
                ..
            }
        ));
    }

    #[test]
    fn test_class_declaration() {
        let (statements, errors) =
            parse_program("class B < A { init(x) { this.x = x; } get() { return super.get(); } }");

        assert!(errors.is_empty(), "{:?}", errors);

        let Stmt::Class {
            name,
            superclass,
            methods,
        } = &statements[0]
        else {
            panic!("expected class, got {:?}", statements[0]);
        };

        assert_eq!(name.lexeme, "B");
        assert!(matches!(superclass, Some(Expr::Variable { name, .. }) if name.lexeme == "A"));
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].params.len(), 1);
        assert_eq!(methods[1].name.lexeme, "get");
    }

    #[test]
    fn test_missing_semicolon_recovers_at_next_statement() {
        let (statements, errors) = parse_program("var a = 1 2;\nprint a;");

        assert_eq!(
            errors,
            vec!["[line 1] Error at '2': Expect ';' after variable declaration."]
        );
        // the broken declaration is dropped, parsing resumes at `print`
        assert_eq!(statements.len(), 1);
        assert!(matches!(statements[0], Stmt::Print(_)));
    }

    #[test]
    fn test_one_diagnostic_per_broken_statement() {
        let (_, errors) = parse_program("print ;\nvar = 3;\nprint (1;");

        assert_eq!(
            errors,
            vec![
                "[line 1] Error at ';': Expect expression.",
                "[line 2] Error at '=': Expect variable name.",
                "[line 3] Error at ';': Expect ')' after expression.",
            ]
        );
    }

    #[test]
    fn test_error_at_end() {
        let (_, errors) = parse_program("print 1");

        assert_eq!(errors, vec!["[line 1] Error at end: Expect ';' after value."]);
    }

    #[test]
    fn test_invalid_assignment_target_is_not_fatal() {
        let (statements, errors) = parse_program("1 + 2 = 3;\nprint 4;");

        assert_eq!(
            errors,
            vec!["[line 1] Error at '=': Invalid assignment target."]
        );
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_missing_left_hand_operand() {
        for source in ["== 1;", "+ 2;", "* 3;", "> 4;"] {
            let (_, errors) = parse_program(source);

            assert_eq!(errors.len(), 1, "{}", source);
            assert!(
                errors[0].ends_with("Missing left-hand operand."),
                "{}: {}",
                source,
                errors[0]
            );
        }
    }

    #[test]
    fn test_too_many_arguments_is_reported_but_parsed() {
        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));

        let (statements, errors) = parse_program(&source);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].ends_with("Can't have more than 255 arguments."));
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_too_many_parameters_is_reported_but_parsed() {
        let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
        let source = format!("fun f({}) {{}}", params.join(", "));

        let (statements, errors) = parse_program(&source);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].ends_with("Error at 'p255': Can't have more than 255 parameters."));
        assert_eq!(statements.len(), 1);

        let Stmt::Function(decl) = &statements[0] else {
            panic!("expected function, got {:?}", statements[0]);
        };
        assert_eq!(decl.params.len(), 256);
    }

    #[test]
    fn test_unterminated_conditional() {
        let (_, errors) = parse_program("print true ? 1;");

        assert_eq!(
            errors,
            vec!["[line 1] Error at ';': Expect ':' after then branch of conditional expression."]
        );
    }
}
