//! Whole-program tests driven through the public pipeline with a captured
//! output sink.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use indoc::indoc;

use rlox::Lox;

struct Harness {
    lox: Lox,
    buffer: Rc<RefCell<Vec<u8>>>,
}

impl Harness {
    fn new() -> Harness {
        let buffer = Rc::new(RefCell::new(Vec::<u8>::new()));
        let sink: Rc<RefCell<dyn Write>> = buffer.clone();
        Harness {
            lox: Lox::with_output(sink),
            buffer,
        }
    }

    fn run(&mut self, source: &str) -> String {
        let before = self.buffer.borrow().len();
        self.lox.run(source);
        let bytes = self.buffer.borrow();
        String::from_utf8(bytes[before..].to_vec()).expect("utf-8 output")
    }
}

fn run_once(source: &str) -> (String, Lox) {
    let mut harness = Harness::new();
    let output = harness.run(source);
    (output, harness.lox)
}

#[test]
fn closures_capture_lexically_not_dynamically() {
    let source = indoc! {r#"
        var a = "global";
        {
            fun showA() { print a; }
            showA();
            var a = "block";
            showA();
        }
    "#};
    let (output, lox) = run_once(source);
    assert!(!lox.had_error() && !lox.had_runtime_error());
    assert_eq!(output, "global\nglobal\n");
}

#[test]
fn recursive_fibonacci() {
    let source = indoc! {r#"
        fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }
        print fib(10);
    "#};
    let (output, _) = run_once(source);
    assert_eq!(output, "55\n");
}

#[test]
fn super_dispatches_from_the_method_owner_upward() {
    let source = indoc! {r#"
        class A { method() { print "A"; } }
        class B < A { method() { print "B"; } test() { super.method(); } }
        class C < B {}
        C().test();
    "#};
    let (output, _) = run_once(source);
    assert_eq!(output, "A\n");
}

#[test]
fn an_initializer_returns_its_instance_even_on_bare_return() {
    let source = indoc! {r#"
        class Foo { init() { return; } }
        print Foo();
    "#};
    let (output, _) = run_once(source);
    assert_eq!(output, "Foo instance\n");
}

#[test]
fn for_loops_count_as_expected() {
    let (output, _) = run_once("for (var i = 0; i < 3; i = i + 1) print i;");
    assert_eq!(output, "0\n1\n2\n");
}

#[test]
fn runtime_errors_carry_their_source_line() {
    let (output, lox) = run_once("print \"a\" + 3;");
    assert_eq!(output, "");
    assert!(lox.had_runtime_error());
    let reports = lox.session.diagnostics.reports();
    assert!(reports[0].contains("Operands must be two numbers or two strings."));
    assert!(reports[0].ends_with("[line 1]"));
}

#[test]
fn static_errors_stop_the_pipeline_before_execution() {
    let (output, lox) = run_once("print this;");
    assert_eq!(output, "");
    assert!(lox.had_error());
    assert!(!lox.had_runtime_error());
}

#[test]
fn globals_persist_across_repl_lines() {
    let mut repl = Harness::new();

    assert_eq!(repl.run("var a = 1;"), "");
    repl.lox.session.diagnostics.reset();

    assert_eq!(repl.run("print a;"), "1\n");
}

#[test]
fn the_error_flag_resets_but_definitions_survive() {
    let mut repl = Harness::new();

    repl.run("var a = 40;");
    repl.lox.session.diagnostics.reset();

    // A bad line reports, then the session keeps going.
    repl.run("print !;");
    assert!(repl.lox.had_error());
    repl.lox.session.diagnostics.reset();
    assert!(!repl.lox.had_error());

    assert_eq!(repl.run("print a + 2;"), "42\n");
}

#[test]
fn closures_created_on_one_line_keep_working_on_later_lines() {
    let mut repl = Harness::new();

    let source = indoc! {r#"
        fun make() {
            var n = 0;
            fun inc() { n = n + 1; print n; }
            return inc;
        }
        var counter = make();
    "#};
    repl.run(source);
    repl.lox.session.diagnostics.reset();

    assert_eq!(repl.run("counter();"), "1\n");
    repl.lox.session.diagnostics.reset();
    assert_eq!(repl.run("counter(); counter();"), "2\n3\n");
}

#[test]
fn a_runtime_error_leaves_the_session_usable() {
    let mut repl = Harness::new();

    repl.run("print 1 / 0;");
    assert!(repl.lox.had_runtime_error());
    repl.lox.session.diagnostics.reset();

    assert_eq!(repl.run("print 2;"), "2\n");
}
