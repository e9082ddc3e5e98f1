use super::builtins;
use super::value::Value;
use super::Interpreter;

fn run(source: &str) -> String {
    let mut interp = Interpreter::new();
    run_in(&mut interp, source)
}

fn run_in(interp: &mut Interpreter, source: &str) -> String {
    let value = interp.run(source).unwrap();
    interp.write_string(value)
}

fn run_error(source: &str) -> String {
    let mut interp = Interpreter::new();
    interp.run(source).unwrap_err().message
}

// arithmetic and numeric predicates

#[test]
fn folds_arithmetic() {
    assert_eq!(run("(+ 1 2 3)"), "6");
    assert_eq!(run("(+)"), "0");
    assert_eq!(run("(*)"), "1");
    assert_eq!(run("(* 2 3 4)"), "24");
    assert_eq!(run("(- 10 1 2)"), "7");
    assert_eq!(run("(- 5)"), "-5");
    assert_eq!(run("(/ 2)"), "0.5");
    assert_eq!(run("(/ 100 5 2)"), "10");
}

#[test]
fn division_by_zero_is_not_an_error() {
    assert_eq!(run("(/ 1 0)"), "inf");
}

#[test]
fn whole_doubles_print_without_a_fraction() {
    assert_eq!(run("(+ 1 2)"), "3");
    assert_eq!(run("(/ 1 2)"), "0.5");
    assert_eq!(run("(* 1000000 1000000)"), "1000000000000");
}

#[test]
fn comparisons_chain() {
    assert_eq!(run("(< 1 2 3)"), "#t");
    assert_eq!(run("(< 1 3 2)"), "#f");
    assert_eq!(run("(<= 1 1 2)"), "#t");
    assert_eq!(run("(> 3 2 1)"), "#t");
    assert_eq!(run("(>= 3 3 1)"), "#t");
    assert_eq!(run("(= 2 2 2)"), "#t");
    assert_eq!(run("(= 2 2 3)"), "#f");
}

#[test]
fn numeric_predicates() {
    assert_eq!(run("(zero? 0)"), "#t");
    assert_eq!(run("(positive? 3)"), "#t");
    assert_eq!(run("(negative? (- 0 3))"), "#t");
    assert_eq!(run("(odd? 3)"), "#t");
    assert_eq!(run("(even? 4)"), "#t");
    assert_eq!(run("(integer? 2)"), "#t");
    assert_eq!(run("(integer? (/ 1 2))"), "#f");
    assert_eq!(run("(number? 2)"), "#t");
    assert_eq!(run("(real? 2)"), "#t");
    assert_eq!(run("(complex? 2)"), "#f");
    assert_eq!(run("(rational? 2)"), "#f");
    assert_eq!(run("(exact? 2)"), "#f");
    assert_eq!(run("(inexact? 2)"), "#t");
}

#[test]
fn min_max_and_modulo() {
    assert_eq!(run("(min 3 1 2)"), "1");
    assert_eq!(run("(max 3 1 2)"), "3");
    assert_eq!(run("(modulo 7 3)"), "1");
    assert_eq!(run("(modulo (- 0 7) 3)"), "-1");
}

// definitions, closures, assignment

#[test]
fn recursive_definitions_work() {
    assert_eq!(
        run("(define (fact n) (if (= n 0) 1 (* n (fact (- n 1))))) (fact 10)"),
        "3628800"
    );
}

#[test]
fn accumulating_loop_by_definition() {
    assert_eq!(
        run("(define (loop i acc) (if (= i 5) acc (loop (+ i 1) (+ acc i)))) (loop 0 0)"),
        "10"
    );
}

#[test]
fn set_updates_an_existing_binding() {
    assert_eq!(run("(define x 1) (set! x (+ x 1)) x"), "2");
}

#[test]
fn define_and_set_return_nothing_printable() {
    let mut interp = Interpreter::new();
    assert_eq!(interp.run("(define x 1)").unwrap(), Value::Unspecified);
    assert_eq!(interp.run("(set! x 2)").unwrap(), Value::Unspecified);
    assert_eq!(interp.run("(if #f 'x)").unwrap(), Value::Unspecified);
}

#[test]
fn closures_capture_their_environment() {
    assert_eq!(
        run("(define (make-adder n) (lambda (m) (+ n m))) ((make-adder 3) 4)"),
        "7"
    );
    assert_eq!(run("((lambda (x y) (+ x y)) 3 4)"), "7");
}

#[test]
fn closures_can_mutate_captured_state() {
    assert_eq!(
        run("(define (make-counter) \
               (let ((count 0)) \
                 (lambda () (set! count (+ count 1)) count))) \
             (define tick (make-counter)) \
             (tick) (tick) (tick)"),
        "3"
    );
}

#[test]
fn inner_defines_bind_in_the_call_frame() {
    assert_eq!(run("(define (f) (define a 2) (+ a 1)) (f)"), "3");
    assert_eq!(run("(define (f) (define a 2) a) (f) (define a 9) a"), "9");
}

#[test]
fn operands_evaluate_left_to_right() {
    assert_eq!(
        run("(define order '()) \
             (define (note v) (set! order (cons v order)) v) \
             (+ (note 1) (note 2)) \
             order"),
        "(2 1)"
    );
}

// special forms

#[test]
fn only_false_is_false() {
    assert_eq!(run("(if 0 'yes 'no)"), "yes");
    assert_eq!(run("(if '() 'yes 'no)"), "yes");
    assert_eq!(run("(if \"\" 'yes 'no)"), "yes");
    assert_eq!(run("(if #f 'yes 'no)"), "no");
    assert_eq!(run("(not #f)"), "#t");
    assert_eq!(run("(not 0)"), "#f");
}

#[test]
fn cond_selects_the_first_live_clause() {
    assert_eq!(run("(cond ((= 1 2) 'a) ((= 1 1) 'b) (else 'c))"), "b");
    assert_eq!(run("(cond (#f 1) (else 2))"), "2");
    // a clause without expressions yields its test's value
    assert_eq!(run("(cond (#f) (42))"), "42");
    let mut interp = Interpreter::new();
    assert_eq!(interp.run("(cond (#f 1))").unwrap(), Value::Unspecified);
}

#[test]
fn case_compares_with_eqv() {
    assert_eq!(
        run("(case (* 2 3) ((2 3 5 7) 'prime) ((1 4 6 8 9) 'composite))"),
        "composite"
    );
    assert_eq!(run("(case 9 ((1) 'one) (else 'many))"), "many");
    assert_eq!(run("(case 'b ((a) 1) ((b) 2))"), "2");
    let mut interp = Interpreter::new();
    assert_eq!(interp.run("(case 9 ((1) 'one))").unwrap(), Value::Unspecified);
}

#[test]
fn and_or_short_circuit() {
    assert_eq!(run("(and)"), "#t");
    assert_eq!(run("(or)"), "#f");
    assert_eq!(run("(and 1 2)"), "2");
    assert_eq!(run("(and #f (undefined-var))"), "#f");
    assert_eq!(run("(or 1 (undefined-var))"), "1");
    assert_eq!(run("(or #f 2)"), "2");
    assert_eq!(run("(define x 1) (and #f (set! x 2)) x"), "1");
}

#[test]
fn begin_sequences_in_order() {
    assert_eq!(run("(begin 1 2 3)"), "3");
    assert_eq!(run("(define x 0) (begin (set! x 5) x)"), "5");
}

#[test]
fn let_evaluates_inits_in_the_outer_scope() {
    assert_eq!(run("(define x 2) (let ((x 3) (y x)) y)"), "2");
    assert_eq!(run("(define x 2) (let* ((x 3) (y x)) y)"), "3");
    assert_eq!(run("(let ((a 1) (b 2)) (+ a b))"), "3");
}

#[test]
fn quote_suppresses_evaluation() {
    assert_eq!(run("(quote (1 2))"), "(1 2)");
    assert_eq!(run("'(+ 1 2)"), "(+ 1 2)");
    assert_eq!(run("''a"), "(quote a)");
}

#[test]
fn quasiquote_copies_and_splices() {
    assert_eq!(run("`(1 ,(+ 1 1) ,@(list 3 4) 5)"), "(1 2 3 4 5)");
    assert_eq!(run("`(1 2 3)"), "(1 2 3)");
    assert_eq!(run("`(a (b ,(+ 1 2)))"), "(a (b 3))");
    assert_eq!(run("`(1 . ,(+ 1 1))"), "(1 . 2)");
    assert_eq!(run("`,(+ 1 1)"), "2");
}

#[test]
fn special_forms_cannot_be_shadowed() {
    assert_eq!(run("(define if 5) (if #t 'ok 'no)"), "ok");
}

// pairs, lists and vectors

#[test]
fn pair_primitives() {
    assert_eq!(run("(cons 1 2)"), "(1 . 2)");
    assert_eq!(run("(car (cons 1 2))"), "1");
    assert_eq!(run("(cdr (cons 1 2))"), "2");
    assert_eq!(run("(define p (cons 1 2)) (set-car! p 9) p"), "(9 . 2)");
    assert_eq!(run("(define p (cons 1 2)) (set-cdr! p 9) p"), "(1 . 9)");
}

#[test]
fn list_primitives() {
    assert_eq!(run("(list 1 2 3)"), "(1 2 3)");
    assert_eq!(run("(list)"), "()");
    assert_eq!(run("(length '())"), "0");
    assert_eq!(run("(length '(1 2 3))"), "3");
    assert_eq!(run("(append '(1 2) '(3) '())"), "(1 2 3)");
    assert_eq!(run("(append)"), "()");
}

#[test]
fn list_and_null_predicates() {
    assert_eq!(run("(null? '())"), "#t");
    assert_eq!(run("(null? '(1))"), "#f");
    assert_eq!(run("(pair? '())"), "#f");
    assert_eq!(run("(pair? '(1))"), "#t");
    assert_eq!(run("(list? '(1 2))"), "#t");
    assert_eq!(run("(list? '(1 . 2))"), "#f");
    assert_eq!(run("(list? 5)"), "#f");
}

#[test]
fn vector_primitives() {
    assert_eq!(run("(vector-ref (vector 10 20 30) 1)"), "20");
    assert_eq!(run("(vector 1 2 3)"), "#(1 2 3)");
    assert_eq!(run("(make-vector 3 0)"), "#(0 0 0)");
    assert_eq!(run("(vector-length (vector 1 2 3))"), "3");
    assert_eq!(run("(vector->list (vector 1 2 3))"), "(1 2 3)");
    assert_eq!(run("(list->vector '(1 2))"), "#(1 2)");
    assert_eq!(run("(vector-set! (vector 1 2) 0 9)"), "9");
    assert_eq!(run("(define v (vector 1 2)) (vector-set! v 0 9) v"), "#(9 2)");
    assert_eq!(run("(vector-fill! (vector 1 2) 7)"), "7");
    assert_eq!(run("(define v (vector 1 2)) (vector-fill! v 7) v"), "#(7 7)");
    assert_eq!(run("(vector-ref #(1 2 3) 0)"), "1");
}

// characters, strings and symbols

#[test]
fn character_primitives() {
    assert_eq!(run("(char? #\\a)"), "#t");
    assert_eq!(run("(char->integer #\\a)"), "97");
    assert_eq!(run("(integer->char 98)"), "#\\b");
    assert_eq!(run("#\\space"), "#\\space");
    assert_eq!(run("#\\newline"), "#\\newline");
}

#[test]
fn string_primitives() {
    assert_eq!(run("(make-string 3 #\\a)"), "\"aaa\"");
    assert_eq!(run("(string-length \"hello\")"), "5");
    assert_eq!(run("(string-ref \"abc\" 1)"), "#\\b");
    assert_eq!(
        run("(define s (make-string 2 #\\a)) (string-set! s 0 #\\b) s"),
        "\"ba\""
    );
}

#[test]
fn symbol_primitives() {
    assert_eq!(run("(symbol? 'abc)"), "#t");
    assert_eq!(run("(symbol->string 'abc)"), "\"abc\"");
    assert_eq!(run("(string->symbol \"abc\")"), "abc");
    assert_eq!(run("(eq? (string->symbol \"abc\") 'abc)"), "#t");
}

// equivalence

#[test]
fn eq_compares_atoms_by_content_and_heap_objects_by_identity() {
    assert_eq!(run("(eq? 'a 'a)"), "#t");
    assert_eq!(run("(eq? 1 1)"), "#t");
    assert_eq!(run("(eq? #\\a #\\a)"), "#t");
    assert_eq!(run("(eq? '() '())"), "#t");
    assert_eq!(run("(eq? (list 1 2) (list 1 2))"), "#f");
    assert_eq!(run("(define p (list 1 2)) (eq? p p)"), "#t");
    assert_eq!(run("(eq? \"a\" \"a\")"), "#f");
}

#[test]
fn eqv_additionally_compares_string_contents() {
    assert_eq!(run("(eqv? \"ab\" \"ab\")"), "#t");
    assert_eq!(run("(eqv? \"ab\" \"ac\")"), "#f");
    assert_eq!(run("(eqv? (list 1) (list 1))"), "#f");
}

#[test]
fn equal_recurses_through_structure() {
    assert_eq!(run("(equal? (list 1 2) (list 1 2))"), "#t");
    assert_eq!(run("(equal? '(1 (2 3)) '(1 (2 3)))"), "#t");
    assert_eq!(run("(equal? (vector 1 2) (vector 1 2))"), "#t");
    assert_eq!(run("(equal? (vector 1 2) (vector 1 2 3))"), "#f");
    assert_eq!(run("(equal? '(1 2) '(1 2 3))"), "#f");
}

// apply and procedures

#[test]
fn apply_spreads_its_final_list() {
    assert_eq!(run("(apply + (list 1 2 3))"), "6");
    assert_eq!(run("(apply + 1 2 (list 3 4))"), "10");
    assert_eq!(run("(apply car (list (list 9 8)))"), "9");
}

#[test]
fn procedure_predicate_and_printing() {
    assert_eq!(run("(procedure? car)"), "#t");
    assert_eq!(run("(procedure? (lambda (x) x))"), "#t");
    assert_eq!(run("(procedure? 'car)"), "#f");
    assert_eq!(run("car"), "#<procedure:car>");
    assert_eq!(run("(lambda (x) x)"), "#<procedure>");
}

// printing

#[test]
fn dotted_and_proper_lists_print_distinctly() {
    assert_eq!(run("'(1 . 2)"), "(1 . 2)");
    assert_eq!(run("'(1 2 . 3)"), "(1 2 . 3)");
    assert_eq!(run("'(1 2 3)"), "(1 2 3)");
    assert_eq!(run("'()"), "()");
}

#[test]
fn write_escapes_and_display_does_not() {
    let mut interp = Interpreter::new();
    let value = interp.run(r#""hi \"there\" \\ back""#).unwrap();
    assert_eq!(interp.write_string(value), r#""hi \"there\" \\ back""#);
    assert_eq!(interp.display_string(value), r#"hi "there" \ back"#);

    let value = interp.run("#\\a").unwrap();
    assert_eq!(interp.write_string(value), "#\\a");
    assert_eq!(interp.display_string(value), "a");

    let value = interp.run("'(\"a\" #\\b)").unwrap();
    assert_eq!(interp.write_string(value), "(\"a\" #\\b)");
    assert_eq!(interp.display_string(value), "(a b)");
}

#[test]
fn written_data_reads_back_equal() {
    let sources = [
        "#t",
        "#f",
        "42",
        "#\\a",
        "#\\space",
        "\"hi \\\\ there\"",
        "(1 2 3)",
        "(1 . 2)",
        "(a (b #t) ())",
        "#(1 #(2) \"x\")",
        "foo",
    ];
    for source in sources {
        let mut interp = Interpreter::new();
        let original = interp.parse(source).unwrap()[0];
        let printed = interp.write_string(original);
        let reread = interp.parse(&printed).unwrap()[0];
        assert!(
            builtins::equal(&interp, original, reread),
            "{} printed as {} which read back differently",
            source,
            printed
        );
    }
}

// ports

#[test]
fn standard_ports_answer_the_predicates() {
    assert_eq!(run("(input-port? (current-input-port))"), "#t");
    assert_eq!(run("(output-port? (current-output-port))"), "#t");
    assert_eq!(run("(input-port? 5)"), "#f");
    assert_eq!(run("(output-port? (current-input-port))"), "#f");
    assert!(run("(current-output-port)").starts_with("#<output port"));
}

#[test]
fn write_and_display_reach_file_ports() {
    let path = std::env::temp_dir().join(format!("atom-out-{}.txt", std::process::id()));
    let mut interp = Interpreter::new();
    let source = format!(
        "(define out (open-output-file \"{}\")) \
         (write \"hi\" out) \
         (display 'and out) \
         (newline out) \
         (write-char #\\x out) \
         (close-output-port out) \
         (close-output-port out)",
        path.display()
    );
    interp.run(&source).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "\"hi\"and\nx");
    std::fs::remove_file(&path).ok();
}

#[test]
fn closing_the_standard_ports_is_a_no_op() {
    assert_eq!(
        run("(close-input-port (current-input-port)) \
             (input-port? (current-input-port))"),
        "#t"
    );
}

// load

#[test]
fn load_evaluates_a_file_and_returns_true() {
    let path = std::env::temp_dir().join(format!("atom-load-{}.scm", std::process::id()));
    std::fs::write(&path, "(define from-file (+ 20 22))").unwrap();
    let mut interp = Interpreter::new();
    let loaded = interp.run(&format!("(load \"{}\")", path.display())).unwrap();
    assert_eq!(loaded, Value::Boolean(true));
    assert_eq!(run_in(&mut interp, "from-file"), "42");
    std::fs::remove_file(&path).ok();
}

// errors

#[test]
fn type_errors_name_expected_and_actual() {
    assert_eq!(run_error("(car 5)"), "pair expected, got number");
    assert_eq!(run_error("(+ 1 #t)"), "number expected, got boolean");
    assert_eq!(run_error("(string-length 5)"), "string expected, got number");
    assert_eq!(run_error("(5 1)"), "procedure expected, got number");
}

#[test]
fn unbound_identifiers_are_reported() {
    assert_eq!(
        run_error("(undefined-var)"),
        "reference to undefined identifier: undefined-var"
    );
    assert_eq!(run_error("(set! nope 1)"), "No binding for nope in any scope.");
}

#[test]
fn arity_errors_are_reported() {
    assert_eq!(run_error("(cons 1)"), "Too few parameters passed (2 expected)");
    assert_eq!(
        run_error("(define (f x) x) (f 1 2)"),
        "Must supply exactly 1 arguments to function, got 2"
    );
}

#[test]
fn index_errors_are_reported() {
    assert_eq!(run_error("(vector-ref (vector 1) 5)"), "Invalid vector index");
    assert_eq!(
        run_error("(string-ref \"abc\" 5)"),
        "k is not a valid index of the given string"
    );
    assert_eq!(run_error("(vector-ref (vector 1) (/ 1 2))"), "Not an integer");
    assert_eq!(
        run_error("(vector-ref (make-vector 2) 0)"),
        "Cannot access uninitialized vector"
    );
}

#[test]
fn user_errors_carry_their_message() {
    assert_eq!(run_error("(error \"boom\")"), "boom");
    assert_eq!(run_error("(error \"boom\" 42)"), "boom 42");
}

#[test]
fn syntax_errors_carry_position() {
    assert!(run_error("\"abc").starts_with("Syntax error line 1"));
    assert!(run_error("(a\n\"abc").starts_with("Syntax error line 2"));
    assert_eq!(run_error("("), "Syntax error: unexpected end of input");
    assert_eq!(run_error(")"), "Syntax error: unexpected )");
}

#[test]
fn empty_combinations_are_rejected() {
    assert_eq!(run_error("()"), "missing procedure in expression");
}

#[test]
fn io_errors_are_reported() {
    assert_eq!(
        run_error("(load \"no-such-file.scm\")"),
        "Error opening file no-such-file.scm"
    );
    assert_eq!(
        run_error("(open-input-file \"no-such-file.scm\")"),
        "Error opening file: no-such-file.scm"
    );
}

#[test]
fn an_error_aborts_the_rest_of_the_form_but_not_the_session() {
    let mut interp = Interpreter::new();
    interp.run("(define x 1)").unwrap();
    assert!(interp.run("(car 5)").is_err());
    // the session and its bindings survive the unwind
    assert_eq!(run_in(&mut interp, "x"), "1");
}

// tail calls

#[test]
fn tail_recursion_runs_in_constant_native_stack() {
    let mut interp = Interpreter::new();
    interp
        .run("(define (countdown n) (if (= n 0) 'done (countdown (- n 1))))")
        .unwrap();
    assert_eq!(run_in(&mut interp, "(countdown 1000000)"), "done");
}

#[test]
fn cond_and_let_tails_do_not_grow_the_stack() {
    assert_eq!(
        run("(define (spin n) (cond ((= n 0) 'done) (else (spin (- n 1))))) (spin 100000)"),
        "done"
    );
    assert_eq!(
        run("(define (step n) (let ((m (- n 1))) (if (= n 0) 'done (step m)))) (step 100000)"),
        "done"
    );
    assert_eq!(
        run("(define (drain n) (begin (if (= n 0) 'empty (drain (- n 1))))) (drain 100000)"),
        "empty"
    );
    assert_eq!(
        run("(define (churn n) (or (= n 0) (churn (- n 1)))) (churn 100000)"),
        "#t"
    );
}

// garbage collection

#[test]
fn collector_reclaims_unreachable_data() {
    let mut interp = Interpreter::new();
    let baseline = interp.collect().remaining;

    interp.run("(define keep (list 1 2 3))").unwrap();
    assert_eq!(interp.collect().remaining, baseline + 3);

    // the result of a discarded expression survives its own safe point
    // (it is still the value of the form) and dies at the next one
    interp.run("(list 4 5 6 7)").unwrap();
    let stats = interp.collect();
    assert_eq!(stats.collected, 4);
    assert_eq!(stats.remaining, baseline + 3);

    // rebinding makes the old list garbage at the safe point itself
    interp.run("(define keep #f)").unwrap();
    let stats = interp.collect();
    assert_eq!(stats.collected, 0);
    assert_eq!(stats.remaining, baseline);

    // a second pass over the same roots finds nothing more
    assert_eq!(interp.collect().collected, 0);
}

#[test]
fn unreachable_closures_and_frames_are_swept() {
    let mut interp = Interpreter::new();
    let baseline = interp.collect().remaining;
    interp.run("((lambda (x) x) 1)").unwrap();
    assert_eq!(interp.collect().remaining, baseline);
}

#[test]
fn closures_keep_captured_frames_alive_across_collections() {
    let mut interp = Interpreter::new();
    interp
        .run("(define (make-adder n) (lambda (m) (+ n m))) (define add3 (make-adder 3))")
        .unwrap();
    interp.collect();
    interp.collect();
    assert_eq!(run_in(&mut interp, "(add3 4)"), "7");
}

#[test]
fn shared_structure_survives_collection_intact() {
    let mut interp = Interpreter::new();
    interp
        .run("(define shared (list 1 2)) (define holder (cons shared shared))")
        .unwrap();
    interp.collect();
    assert_eq!(run_in(&mut interp, "(eq? (car holder) (cdr holder))"), "#t");
    assert_eq!(run_in(&mut interp, "holder"), "((1 2) 1 2)");
}
