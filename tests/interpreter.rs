#[cfg(test)]
mod interpreter_tests {
    use treelox as lox;

    use lox::lox::{run, RunStatus};

    struct Outcome {
        out: String,
        err: String,
        status: RunStatus,
    }

    fn run_source(source: &str) -> Outcome {
        let mut out: Vec<u8> = Vec::new();
        let mut err: Vec<u8> = Vec::new();

        let status = run(source, &mut out, &mut err).expect("in-memory sinks never fail");

        Outcome {
            out: String::from_utf8(out).expect("utf8 stdout"),
            err: String::from_utf8(err).expect("utf8 stderr"),
            status,
        }
    }

    /// Runs a program that must succeed and returns its printed lines.
    fn output_of(source: &str) -> Vec<String> {
        let outcome = run_source(source);

        assert_eq!(outcome.err, "", "unexpected diagnostics");
        assert_eq!(outcome.status, RunStatus::default());

        outcome.out.lines().map(str::to_owned).collect()
    }

    fn runtime_error_of(source: &str) -> (Vec<String>, String) {
        let outcome = run_source(source);

        assert!(outcome.status.had_runtime_error, "expected a runtime error");
        assert!(!outcome.status.had_error);

        (
            outcome.out.lines().map(str::to_owned).collect(),
            outcome.err,
        )
    }

    // ───────────────────────── values and operators ─────────────────────────

    #[test]
    fn test_number_printing_drops_integral_fraction() {
        assert_eq!(
            output_of("print 13 + 0.0; print 2.5; print -0.5; print 10 / 4; print 100;"),
            vec!["13", "2.5", "-0.5", "2.5", "100"]
        );
    }

    #[test]
    fn test_number_printing_of_extreme_values() {
        assert_eq!(
            output_of(
                r#"
                print 10000000000000000000000;
                print 10 ** 400;
                print -(10 ** 400);
                print (-1) ** 0.5;
                print 0.0000001;
                print 0.000001;
                print 1000000000000000;
                print 123456789012345678901;
                "#
            ),
            vec![
                "1e+22",
                "Infinity",
                "-Infinity",
                "NaN",
                "1e-7",
                "0.000001",
                "1000000000000000",
                "123456789012345680000",
            ]
        );
    }

    #[test]
    fn test_arithmetic_extensions() {
        assert_eq!(
            output_of("print 7 % 3; print 2 ** 10; print 2 ** 3 ** 2; print 2 * 3 + 4;"),
            vec!["1", "1024", "512", "10"]
        );
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(
            output_of(r#"print "foo" + "bar"; print "n=" + 3; print 1.5 + "x";"#),
            vec!["foobar", "n=3", "1.5x"]
        );
    }

    #[test]
    fn test_truthiness_and_logic() {
        assert_eq!(
            output_of(
                r#"
                print !nil;
                print !0;
                print !"";
                print nil or "yes";
                print false and explode();
                print 1 and 2;
                "#
            ),
            vec!["true", "false", "false", "yes", "false", "2"]
        );
    }

    #[test]
    fn test_equality_across_types() {
        assert_eq!(
            output_of(r#"print 1 == "1"; print nil == false; print "a" == "a"; print nil == nil;"#),
            vec!["false", "false", "true", "true"]
        );
    }

    #[test]
    fn test_conditional_expression() {
        assert_eq!(
            output_of("print 1 > 2 ? 3 : 4 ? 5 : 6; print true ? \"t\" : \"f\";"),
            vec!["5", "t"]
        );
    }

    // ───────────────────────── runtime errors ───────────────────────────────

    #[test]
    fn test_division_by_zero_halts_before_printing() {
        let (out, err) = runtime_error_of("print 1/(((10+10)/20)-1);\nprint \"unreached\";");

        assert!(out.is_empty());
        assert_eq!(err, "division by zero \n[line 1]\n");
    }

    #[test]
    fn test_mod_by_zero() {
        let (_, err) = runtime_error_of("print 5 % 0;");

        assert_eq!(err, "mod by zero \n[line 1]\n");
    }

    #[test]
    fn test_operand_type_errors() {
        let (_, err) = runtime_error_of("print -\"a\";");
        assert_eq!(err, "Operand must be a number. \n[line 1]\n");

        let (_, err) = runtime_error_of("print 1 < \"a\";");
        assert_eq!(err, "Operands must be numbers. But got 1 < a. \n[line 1]\n");

        let (_, err) = runtime_error_of("print nil ** 2;");
        assert_eq!(err, "Operands must be numbers. But got nil ** 2. \n[line 1]\n");

        let (_, err) = runtime_error_of("print true + nil;");
        assert_eq!(
            err,
            "Operands must be two numbers or two strings. But got true + nil. \n[line 1]\n"
        );
    }

    #[test]
    fn test_output_before_error_is_kept() {
        let (out, err) = runtime_error_of("print 1;\nprint 2;\nprint undefined;\nprint 3;");

        assert_eq!(out, vec!["1", "2"]);
        assert_eq!(err, "Undefined variable 'undefined'. \n[line 3]\n");
    }

    #[test]
    fn test_call_errors() {
        let (_, err) = runtime_error_of("\"str\"();");
        assert_eq!(err, "Can only call functions and classes. \n[line 1]\n");

        let (_, err) = runtime_error_of("fun f(a, b) {}\nf(1);");
        assert_eq!(err, "Expected 2 arguments but got 1. \n[line 2]\n");
    }

    #[test]
    fn test_unbounded_recursion_is_a_runtime_error() {
        // debug builds use large evaluator frames
        let (out, err) = std::thread::Builder::new()
            .stack_size(32 * 1024 * 1024)
            .spawn(|| {
                runtime_error_of("fun f(n) { return f(n + 1); }\nf(0);\nprint \"after\";")
            })
            .expect("spawn")
            .join()
            .expect("no host stack overflow");

        assert!(out.is_empty());
        assert_eq!(err, "Stack overflow. \n[line 1]\n");
    }

    #[test]
    fn test_deep_recursion_within_limit() {
        assert_eq!(
            output_of(
                r#"
                fun count(n) {
                    if (n == 0) return 0;
                    return 1 + count(n - 1);
                }
                print count(50);
                print count(50);
                "#
            ),
            vec!["50", "50"]
        );
    }

    #[test]
    fn test_method_recursion_overflow_keeps_prior_output() {
        let (out, err) = std::thread::Builder::new()
            .stack_size(32 * 1024 * 1024)
            .spawn(|| {
                runtime_error_of(
                    "class A { loop() { return this.loop(); } }\nprint \"start\";\nA().loop();",
                )
            })
            .expect("spawn")
            .join()
            .expect("no host stack overflow");

        assert_eq!(out, vec!["start"]);
        assert_eq!(err, "Stack overflow. \n[line 1]\n");
    }

    // ───────────────────────── scoping and control flow ─────────────────────

    #[test]
    fn test_for_loop_scoping() {
        let (out, err) =
            runtime_error_of("for (var i = 0; i < 3; i = i + 1) print i;\nprint i;");

        assert_eq!(out, vec!["0", "1", "2"]);
        assert_eq!(err, "Undefined variable 'i'. \n[line 2]\n");
    }

    #[test]
    fn test_block_shadowing_restores_outer_binding() {
        assert_eq!(
            output_of(
                r#"
                var a = "outer";
                {
                    var a = "inner";
                    print a;
                }
                print a;
                "#
            ),
            vec!["inner", "outer"]
        );
    }

    #[test]
    fn test_while_and_if() {
        assert_eq!(
            output_of(
                r#"
                var n = 0;
                while (n < 5) {
                    if (n % 2 == 0) print n; else print "odd";
                    n = n + 1;
                }
                "#
            ),
            vec!["0", "odd", "2", "odd", "4"]
        );
    }

    #[test]
    fn test_resolution_is_static() {
        assert_eq!(
            output_of(
                r#"
                var a = "global";
                {
                    fun show() { print a; }
                    show();
                    var a = "block";
                    show();
                }
                "#
            ),
            vec!["global", "global"]
        );
    }

    // ───────────────────────── functions and closures ───────────────────────

    #[test]
    fn test_recursion_and_early_return() {
        assert_eq!(
            output_of(
                r#"
                fun fib(n) {
                    if (n < 2) return n;
                    return fib(n - 1) + fib(n - 2);
                }
                print fib(15);

                fun first() {
                    for (var i = 0; i < 10; i = i + 1) {
                        if (i == 3) return i;
                    }
                    return -1;
                }
                print first();
                "#
            ),
            vec!["610", "3"]
        );
    }

    #[test]
    fn test_make_counter_closure() {
        assert_eq!(
            output_of(
                r#"
                fun makeCounter() {
                    var i = 0;
                    fun count() {
                        i = i + 1;
                        print i;
                    }
                    return count;
                }

                var counter = makeCounter();
                counter();
                counter();

                var other = makeCounter();
                other();
                "#
            ),
            vec!["1", "2", "1"]
        );
    }

    #[test]
    fn test_function_without_return_yields_nil() {
        assert_eq!(output_of("fun f() {}\nprint f();"), vec!["nil"]);
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(
            output_of(
                r#"
                fun f() {}
                class Point {}
                print f;
                print clock;
                print Point;
                print Point();
                "#
            ),
            vec!["<fn f>", "<native fn>", "<class Point>", "<instance Point>"]
        );
    }

    #[test]
    fn test_clock_is_a_positive_number() {
        assert_eq!(output_of("print clock() > 0;"), vec!["true"]);
    }

    // ───────────────────────── classes ──────────────────────────────────────

    #[test]
    fn test_fields_and_methods() {
        assert_eq!(
            output_of(
                r#"
                class Cake {
                    taste() {
                        var adjective = "delicious";
                        print "The " + this.flavor + " cake is " + adjective + "!";
                    }
                }

                var cake = Cake();
                cake.flavor = "German chocolate";
                cake.taste();

                var method = cake.taste;
                cake.flavor = "lemon";
                method();
                "#
            ),
            vec![
                "The German chocolate cake is delicious!",
                "The lemon cake is delicious!",
            ]
        );
    }

    #[test]
    fn test_initializer_and_class_arity() {
        assert_eq!(
            output_of(
                r#"
                class Point {
                    init(x, y) {
                        this.x = x;
                        this.y = y;
                    }
                }
                var p = Point(1, 2);
                print p.x + p.y;
                print p.init(3, 4) == p;
                print p.x;
                "#
            ),
            vec!["3", "true", "3"]
        );

        let (_, err) = runtime_error_of("class P { init(a) {} }\nP();");
        assert_eq!(err, "Expected 1 arguments but got 0. \n[line 2]\n");

        let (_, err) = runtime_error_of("class Q {}\nQ(1);");
        assert_eq!(err, "Expected 0 arguments but got 1. \n[line 2]\n");
    }

    #[test]
    fn test_early_return_in_initializer_yields_instance() {
        assert_eq!(
            output_of(
                r#"
                class A {
                    init() {
                        this.ready = true;
                        return;
                    }
                }
                print A().ready;
                "#
            ),
            vec!["true"]
        );
    }

    #[test]
    fn test_inheritance_and_super() {
        assert_eq!(
            output_of(
                r#"
                class Base {
                    init(name) { this.name = name; }
                    greet() { return "hello " + this.name; }
                    tag() { this.tagged = "base"; }
                }

                class Derived < Base {
                    greet() { return super.greet() + "!"; }
                    tag() {
                        super.tag();
                        print this.tagged;
                    }
                }

                var d = Derived("lox");
                print d.greet();
                d.tag();
                print d.tagged;
                "#
            ),
            vec!["hello lox!", "base", "base"]
        );
    }

    #[test]
    fn test_property_errors() {
        let (_, err) = runtime_error_of("class A {}\nprint A().missing;");
        assert_eq!(err, "Undefined property 'missing'. \n[line 2]\n");

        let (_, err) = runtime_error_of("var x = 1;\nprint x.y;");
        assert_eq!(err, "Only instances have properties. \n[line 2]\n");

        let (_, err) = runtime_error_of("var x = 1;\nx.y = 2;");
        assert_eq!(err, "Only instances have fields. \n[line 2]\n");
    }

    #[test]
    fn test_superclass_must_be_a_class() {
        let (_, err) = runtime_error_of("var NotAClass = 1;\nclass B < NotAClass {}");

        assert_eq!(err, "Superclass must be a class. \n[line 2]\n");
    }

    // ───────────────────────── pipeline ─────────────────────────────────────

    #[test]
    fn test_compile_errors_prevent_execution() {
        let outcome = run_source("print \"before\";\nprint ;");

        assert!(outcome.status.had_error);
        assert!(!outcome.status.had_runtime_error);
        assert_eq!(outcome.out, "");
        assert_eq!(outcome.err, "[line 2] Error at ';': Expect expression.\n");
    }

    #[test]
    fn test_lex_errors_are_reported_alongside_parse_errors() {
        let outcome = run_source("var a = 1 @;\nprint ;");

        assert!(outcome.status.had_error);
        assert_eq!(outcome.out, "");
        assert_eq!(
            outcome.err,
            "[line 1] Error : Unexpected character: @\n[line 2] Error at ';': Expect expression.\n"
        );
    }

    #[test]
    fn test_resolution_errors_prevent_execution() {
        let outcome = run_source("print 1;\n{ var a = 1; var a = 2; }");

        assert!(outcome.status.had_error);
        assert_eq!(outcome.out, "");
        assert_eq!(
            outcome.err,
            "[line 2] Error at 'a': Variable with this name already declared in this scope.\n"
        );
    }

    #[test]
    fn test_empty_program() {
        assert!(output_of("").is_empty());
    }
}
