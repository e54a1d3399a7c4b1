use c6t_backend::{compile, ArenaLimits, Backend, BackendOptions};
use c6t_common::{CommandKind, CompilerError};
use indoc::indoc;
use pretty_assertions::assert_eq;

fn compile_error(source: &str) -> CompilerError {
    let options = BackendOptions::i8080().unwrap().with_filename("t.ir");
    compile(source, options).unwrap_err()
}

#[test]
fn test_errors_carry_the_statement_line() {
    let err = compile_error("CODE\nEVAL\n");
    assert_eq!(err.to_string(), "t.ir:2: no node to pop");
    assert_eq!(err.root(), &CompilerError::NodeStackUnderflow);
}

#[test]
fn test_parse_errors_are_not_wrapped_twice() {
    let err = compile_error("CODE\nBOGUS 1\n");
    assert_eq!(err.to_string(), "Parse error at t.ir:2: unknown keyword 'BOGUS'");
}

#[test]
fn test_unconsumed_tree_at_end_of_input() {
    let err = compile_error("CON 1\n");
    assert_eq!(err.to_string(), "t.ir:1: 1 node(s) left on the node stack");
}

#[test]
fn test_extra_nodes_before_command() {
    let err = compile_error(indoc! {"
        CON 1
        CON 2
        RET
    "});
    assert_eq!(err.root(), &CompilerError::UnbalancedNodeStack { remaining: 1 });

    let err = compile_error("CON 1\nJMP L1\n");
    assert_eq!(err.root(), &CompilerError::UnbalancedNodeStack { remaining: 1 });
}

#[test]
fn test_missing_tree() {
    let err = compile_error("NULL\nRET\n");
    assert_eq!(
        err.root(),
        &CompilerError::MissingTree {
            command: CommandKind::Ret
        }
    );
}

#[test]
fn test_constant_division_by_zero() {
    let err = compile_error("CON 1\nCON 0\nDIV\n");
    assert_eq!(err.to_string(), "t.ir:3: division by zero in constant DIV");
}

#[test]
fn test_floating_point_is_rejected() {
    let err = compile_error("CON _f\nFLOAD\n");
    assert_eq!(err.to_string(), "t.ir:2: unsupported: floating point (FLOAD)");
}

#[test]
fn test_bad_register_cell() {
    let err = compile_error("REG 7\nEVAL\n");
    assert_eq!(err.to_string(), "t.ir:2: bad register number 7");
}

#[test]
fn test_wrong_argument_count() {
    let err = compile_error("COMMON _buf\n");
    assert_eq!(err.to_string(), "t.ir:1: bad arg count for COMMON: expected 2, found 1");
}

#[test]
fn test_node_pool_exhaustion() {
    let limits = ArenaLimits {
        nodes: 4,
        ..ArenaLimits::default()
    };
    let options = BackendOptions::i8080().unwrap().with_limits(limits);
    let err = compile("CON _a\nLOAD\nCON _b\nLOAD\nADD\nEVAL\n", options).unwrap_err();
    assert_eq!(err.to_string(), "<stdin>:5: out of node space (capacity 4)");
}

#[test]
fn test_node_stack_exhaustion() {
    let limits = ArenaLimits {
        node_stack: 2,
        ..ArenaLimits::default()
    };
    let mut backend = Backend::new(BackendOptions::i8080().unwrap().with_limits(limits));
    backend.process_line("CON 1").unwrap();
    backend.process_line("CON 2").unwrap();
    let err = backend.process_line("CON 3").unwrap_err();
    assert_eq!(
        err.root(),
        &CompilerError::ArenaExhausted {
            arena: "node stack",
            capacity: 2
        }
    );
}
