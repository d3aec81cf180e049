#[cfg(test)]
mod interpreter_tests {
    use rox::interpreter::MAX_CALL_DEPTH;
    use rox::value::Value;
    use rox::{CollectingReporter, Lox, Transcript};

    struct Run {
        output: Vec<String>,
        errors: Vec<String>,
        had_runtime_error: bool,
    }

    fn run(source: &str) -> Run {
        let transcript = Transcript::default();
        let mut lox = Lox::new(CollectingReporter::new(), transcript.clone());
        lox.run(source);

        Run {
            output: transcript.lines(),
            errors: lox.reporter().messages(),
            had_runtime_error: lox.had_runtime_error(),
        }
    }

    fn output(source: &str) -> Vec<String> {
        let result = run(source);
        assert!(result.errors.is_empty(), "unexpected errors: {:?}", result.errors);
        result.output
    }

    #[test]
    fn test_interpreter_01_arithmetic() {
        assert_eq!(output("print (100) + (2 * 4) - (20 / 2);"), ["98"]);
        assert_eq!(output("print 7 / 2; print -3;"), ["3.5", "-3"]);
    }

    #[test]
    fn test_interpreter_02_string_concatenation() {
        assert_eq!(output("print \"it \" + \"works.\";"), ["it works."]);
    }

    #[test]
    fn test_interpreter_03_comparison_type_error() {
        let result = run("3 < \"pancake\";");

        assert!(result.output.is_empty());
        assert!(result.had_runtime_error);
        assert_eq!(result.errors, ["Operands for '<' must be numbers."]);
    }

    #[test]
    fn test_interpreter_04_runtime_error_keeps_earlier_effects() {
        let transcript = Transcript::default();
        let mut lox = Lox::new(CollectingReporter::new(), transcript.clone());
        lox.run("print 1;\nprint -\"x\";\nprint 2;");

        assert_eq!(transcript.lines(), ["1"]);
        assert_eq!(
            lox.reporter().errors[0].to_string(),
            "Must be Number.\n[line 2]"
        );
    }

    #[test]
    fn test_interpreter_05_mixed_plus_operands() {
        let result = run("print 1 + \"a\";");

        assert_eq!(
            result.errors,
            ["Operands for '+' must be two numbers or two strings."]
        );
    }

    #[test]
    fn test_interpreter_06_truthiness_and_equality() {
        assert_eq!(
            output(
                "print nil == false; print 0 == 0; print \"a\" == \"a\";
                 print !nil; print !0; print nil == nil; print 1 != \"1\";"
            ),
            ["false", "true", "true", "true", "false", "true", "true"]
        );
    }

    #[test]
    fn test_interpreter_07_logical_operators_return_operands() {
        assert_eq!(
            output("print nil or \"yes\"; print 1 and 2; print false and oops;"),
            ["yes", "2", "false"]
        );
    }

    #[test]
    fn test_interpreter_08_nested_block_shadowing() {
        let program = r#"
            var a = "global a";
            var b = "global b";
            var c = "global c";
            {
              var a = "outer a";
              var b = "outer b";
              {
                var a = "inner a";
                print a;
                print b;
                print c;
              }
              print a;
              print b;
              print c;
            }
            print a;
            print b;
            print c;
        "#;

        assert_eq!(
            output(program),
            [
                "inner a", "outer b", "global c", "outer a", "outer b", "global c", "global a",
                "global b", "global c",
            ]
        );
    }

    #[test]
    fn test_interpreter_09_control_flow() {
        let program = r#"
            var sum = 0;
            for (var i = 1; i <= 4; i = i + 1) sum = sum + i;
            print sum;

            var n = 3;
            while (n > 0) n = n - 1;
            if (n == 0) print "done"; else print "not done";
        "#;

        assert_eq!(output(program), ["10", "done"]);
    }

    #[test]
    fn test_interpreter_10_recursion() {
        let program = r#"
            fun fib(n) {
              if (n < 2) return n;
              return fib(n - 1) + fib(n - 2);
            }
            print fib(10);
        "#;

        assert_eq!(output(program), ["55"]);
    }

    #[test]
    fn test_interpreter_11_independent_closures() {
        let program = r#"
            fun makeCounter() {
              var i = 0;
              fun count() {
                i = i + 1;
                print i;
              }
              return count;
            }

            var first = makeCounter();
            var second = makeCounter();
            first();
            second();
            first();
            second();
            first();
        "#;

        assert_eq!(output(program), ["1", "1", "2", "2", "3"]);
    }

    #[test]
    fn test_interpreter_12_closures_bind_statically() {
        let program = r#"
            var a = "global";
            {
              fun showA() {
                print a;
              }

              showA();
              var a = "block";
              showA();
            }
        "#;

        assert_eq!(output(program), ["global", "global"]);
    }

    #[test]
    fn test_interpreter_13_function_without_return_gives_nil() {
        assert_eq!(output("fun f() {} print f();"), ["nil"]);
    }

    #[test]
    fn test_interpreter_14_callable_display() {
        assert_eq!(
            output("fun f() {} class P {} print f; print clock; print P; print P();"),
            ["<fn f>", "<native fn>", "P", "P instance"]
        );
    }

    #[test]
    fn test_interpreter_15_clock_is_a_number() {
        assert_eq!(output("print clock() > 0;"), ["true"]);
    }

    #[test]
    fn test_interpreter_16_call_errors() {
        assert_eq!(
            run("\"x\"();").errors,
            ["Can only call functions and classes."]
        );
        assert_eq!(
            run("fun f(a) {} f();").errors,
            ["Expected 1 arguments but got 0."]
        );
        assert_eq!(run("print nope;").errors, ["Undefined variable 'nope'."]);
        assert_eq!(run("nope = 1;").errors, ["Undefined variable 'nope'."]);
    }

    #[test]
    fn test_interpreter_17_property_errors() {
        assert_eq!(run("1.x;").errors, ["Only instances have properties."]);
        assert_eq!(run("var s = \"s\"; s.x = 1;").errors, ["Only instances have fields."]);
        assert_eq!(
            run("class A {} A().missing;").errors,
            ["Undefined property 'missing'."]
        );
    }

    #[test]
    fn test_interpreter_18_fields_and_methods() {
        let program = r#"
            class Point {
              init(x, y) {
                this.x = x;
                this.y = y;
              }
              sum() {
                return this.x + this.y;
              }
            }

            var p = Point(1, 2);
            print p.sum();
            p.x = 10;
            print p.sum();

            var method = p.sum;
            print method();
        "#;

        assert_eq!(output(program), ["3", "12", "12"]);
    }

    #[test]
    fn test_interpreter_19_initializer_returns_this() {
        let program = r#"
            class P {
              init() {
                this.x = 1;
                return;
              }
            }
            var p = P();
            print p.init() == p;
            print p.x;
        "#;

        assert_eq!(output(program), ["true", "1"]);
    }

    #[test]
    fn test_interpreter_20_inheritance_and_super() {
        let program = r#"
            class A {
              init(n) {
                this.n = n;
              }
              describe() {
                return "A" + this.name();
              }
              name() {
                return "a";
              }
            }

            class B < A {
              init(n) {
                super.init(n * 2);
              }
              name() {
                return "b";
              }
              describe() {
                return super.describe() + "!";
              }
            }

            var b = B(21);
            print b.n;
            print b.describe();
            print b;
        "#;

        assert_eq!(output(program), ["42", "Ab!", "B instance"]);
    }

    #[test]
    fn test_interpreter_21_inherited_method_binds_this() {
        let program = r#"
            class Base {
              greet() {
                print "hi " + this.who;
              }
            }
            class Derived < Base {}

            var d = Derived();
            d.who = "there";
            d.greet();
        "#;

        assert_eq!(output(program), ["hi there"]);
    }

    #[test]
    fn test_interpreter_22_superclass_must_be_a_class() {
        let result = run("var NotAClass = 1; class A < NotAClass {}");

        assert_eq!(result.errors, ["Superclass must be a class."]);
    }

    #[test]
    fn test_interpreter_23_session_persists_across_runs() {
        let transcript = Transcript::default();
        let mut lox = Lox::new(CollectingReporter::new(), transcript.clone());

        lox.run("var a = 1;");
        lox.run("fun f() { return a + 1; }");
        lox.run("print undefined;");
        assert!(lox.had_runtime_error());
        lox.reset();

        lox.run("{ var b = f(); print b; }");

        assert!(!lox.had_error());
        assert!(!lox.had_runtime_error());
        assert_eq!(transcript.lines(), ["2"]);
    }

    #[test]
    fn test_interpreter_24_static_error_blocks_execution() {
        let result = run("print 1;\nprint (;");

        assert!(result.output.is_empty());
        assert!(!result.had_runtime_error);
        assert_eq!(result.errors, ["Expect expression."]);
    }

    #[test]
    fn test_interpreter_25_evaluate_single_expression() {
        let mut lox = Lox::new(CollectingReporter::new(), Transcript::default());

        assert_eq!(lox.evaluate("1 + 2 * 3"), Some(Value::Number(7.0)));
        assert_eq!(lox.evaluate("\"a\" + \"b\""), Some(Value::String("ab".into())));

        assert_eq!(lox.evaluate("-\"a\""), None);
        assert!(lox.had_runtime_error());
    }

    /// Deep recursion needs more native stack than a test thread gets.
    fn on_large_stack<F: FnOnce() + Send + 'static>(body: F) {
        std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(body)
            .unwrap()
            .join()
            .unwrap();
    }

    #[test]
    fn test_interpreter_26_unbounded_recursion_is_a_runtime_error() {
        on_large_stack(|| {
            let result = run("fun f() { f(); }\nf();");

            assert!(result.had_runtime_error);
            assert_eq!(result.errors, ["Stack overflow."]);
        });
    }

    #[test]
    fn test_interpreter_27_recursion_up_to_the_limit_succeeds() {
        on_large_stack(|| {
            let program = format!(
                "fun f(n) {{ if (n == 0) return 0; return f(n - 1) + 1; }} print f({});",
                MAX_CALL_DEPTH - 1
            );

            assert_eq!(output(&program), [(MAX_CALL_DEPTH - 1).to_string()]);
        });
    }

    #[test]
    fn test_interpreter_28_session_recovers_after_stack_overflow() {
        on_large_stack(|| {
            let transcript = Transcript::default();
            let mut lox = Lox::new(CollectingReporter::new(), transcript.clone());

            lox.run("fun f() { f(); } f();");
            assert!(lox.had_runtime_error());
            lox.reset();

            lox.run("fun g(n) { if (n == 0) return \"ok\"; return g(n - 1); } print g(10);");

            assert!(!lox.had_runtime_error());
            assert_eq!(transcript.lines(), ["ok"]);
        });
    }

    #[test]
    fn test_interpreter_29_scopes_restored_after_error_in_block() {
        let transcript = Transcript::default();
        let mut lox = Lox::new(CollectingReporter::new(), transcript.clone());

        lox.run("{ var a = 1; { nope; } }");
        assert_eq!(lox.reporter().messages(), ["Undefined variable 'nope'."]);
        lox.reset();

        lox.run("var g = 5; fun h() { return g; }");
        lox.run("print h(); print g;");

        assert!(!lox.had_error());
        assert!(!lox.had_runtime_error());
        assert_eq!(transcript.lines(), ["5", "5"]);
    }

    #[test]
    fn test_interpreter_30_scopes_restored_after_error_in_function() {
        let transcript = Transcript::default();
        let mut lox = Lox::new(CollectingReporter::new(), transcript.clone());

        lox.run("fun boom() { var local = 1; { return local + nil; } } boom();");
        assert!(lox.had_runtime_error());
        lox.reset();

        // `local` must not have leaked into the global scope.
        lox.run("var local = \"global\"; print local;");
        lox.run("print local;");

        assert_eq!(transcript.lines(), ["global", "global"]);
        assert!(!lox.had_runtime_error());
    }

    #[test]
    fn test_interpreter_31_special_numbers_print() {
        assert_eq!(
            output("print 1 / 0; print -1 / 0; print 1000000 * 1000000000000000;"),
            ["Infinity", "-Infinity", "1.0E21"]
        );
    }
}
