use c6t_backend::{compile, plan_switch, ArenaLimits, Backend, BackendOptions, SwitchCase, SwitchStrategy};
use indoc::indoc;
use pretty_assertions::assert_eq;

fn run(source: &str) -> String {
    compile(source, BackendOptions::i8080().unwrap()).unwrap()
}

#[test]
fn test_small_function() {
    let asm = run(indoc! {"
        CODE
        _main:EXPORT _main
        FUNC _main
        AUTOS 2
        USEDREGS 0
        CON _x
        LOAD
        CON 1
        ADD
        RET
        ENDFUNC
    "});
    assert_eq!(
        asm,
        indoc! {"
            .code
            _main:
            .export _main
            call csave
            lxi h,-2
            dad sp
            sphl
            lhld _x
            mov a,l
            adi <1
            mov l,a
            mov a,h
            aci >1
            mov h,a
            jmp cret
        "}
    );
}

#[test]
fn test_constant_plus_scaled_variable() {
    let asm = run(indoc! {"
        CON 3
        CON 2
        CON _x
        LOAD
        MULT
        ADD
        RET
    "});
    assert_eq!(
        asm,
        indoc! {"
            lhld _x
            dad h
            mov a,l
            adi <3
            mov l,a
            mov a,h
            aci >3
            mov h,a
            jmp cret
        "}
    );
    assert!(!asm.contains("push"));
}

#[test]
fn test_shift_by_zero_leaves_value_alone() {
    assert_eq!(run("CON _x\nLOAD\nCON 0\nLSHIFT\nRET\n"), "lhld _x\njmp cret\n");
    assert_eq!(run("CON _x\nLOAD\nCON 0\nRSHIFT\nRET\n"), "lhld _x\njmp cret\n");
}

#[test]
fn test_call_statement_pops_each_argument() {
    let asm = run(indoc! {"
        CON _c
        LOAD
        CON _b
        LOAD
        CON _a
        LOAD
        NULL
        ARG
        ARG
        ARG
        CON _f
        CALL
        EVAL
    "});
    let call = asm.find("call _f\n").unwrap();
    assert_eq!(&asm[call..], "call _f\npop d\npop d\npop d\n");
    assert_eq!(asm.matches("push h").count(), 3);
}

#[test]
fn test_generated_labels_are_numbered_across_statements() {
    let conditional = indoc! {"
        CON _c
        LOAD
        CON 1
        CON 2
        COLON
        QUEST
        EVAL
    "};
    let asm = run(&conditional.repeat(2));
    let labels: Vec<&str> = asm.lines().filter(|l| l.ends_with(':')).collect();
    assert_eq!(labels, vec!["LL1:", "LL2:", "LL3:", "LL4:"]);
}

#[test]
fn test_branch_on_zero() {
    let asm = run(indoc! {"
        CON _a
        LOAD
        CON 3
        LESS
        BRZ L2
    "});
    assert_eq!(
        asm,
        indoc! {"
            lhld _a
            lxi d,3
            call clt
            mov a,h
            ora l
            jz L2
        "}
    );
}

#[test]
fn test_branch_on_logical_not_inverts_jump() {
    let asm = run(indoc! {"
        CON _a
        LOAD
        CON 0
        EQU
        BRZ L1
    "});
    assert_eq!(asm, "lhld _a\nmov a,h\nora l\njnz L1\n");
}

#[test]
fn test_discarded_post_increment() {
    let asm = run(indoc! {"
        CON _x
        POST 1
        EVAL
    "});
    // Same code as a pre-increment: the old value is not kept
    assert!(!asm.contains("xthl"));
    assert!(asm.starts_with("lxi h,_x\npush h\n"));
    assert!(asm.contains("lxi d,1\n"));
}

#[test]
fn test_stack_jumps() {
    assert_eq!(run("CON L5\nSTKJMP\n"), "jmp L5\n");
    assert_eq!(run("CON _t\nLOAD\nSTKJMP\n"), "lhld _t\npchl\n");
}

#[test]
fn test_runtime_switch() {
    let asm = run(indoc! {"
        CON _x
        LOAD
        SWITCH L1,L2,3
    "});
    assert_eq!(
        asm,
        indoc! {"
            lxi h,L1
            push h
            lxi h,L2
            push h
            lxi h,3
            push h
            lhld _x
            push h
            jmp cswitch
        "}
    );
}

fn switch_source(cases: &[SwitchCase]) -> (SwitchStrategy, String) {
    let plan = plan_switch(cases, "LD", "LT");
    let mut lines = plan.prelude.clone();
    lines.push("CON _x".to_string());
    lines.push("LOAD".to_string());
    lines.extend(plan.dispatch.iter().cloned());
    (plan.strategy, lines.join("\n"))
}

#[test]
fn test_dense_switch_uses_jump_table() {
    let cases = [
        SwitchCase::new(1, "L1"),
        SwitchCase::new(2, "L2"),
        SwitchCase::new(4, "L4"),
    ];
    let (strategy, source) = switch_source(&cases);
    assert_eq!(strategy, SwitchStrategy::Dense);
    assert_eq!(
        run(&source),
        indoc! {"
            .data
            LT:
            .dw L1
            .dw L2
            .dw LD
            .dw L4
            .code
            lhld _x
            lxi d,-1
            dad d
            lxi d,4
            mov a,l
            sub e
            mov a,h
            sbb d
            jnc LD
            dad h
            lxi d,LT
            dad d
            mov a,m
            inx h
            mov h,m
            mov l,a
            pchl
        "}
    );
}

#[test]
fn test_dense_switch_from_zero_skips_rebase() {
    let cases = [SwitchCase::new(0, "L0"), SwitchCase::new(1, "L1")];
    let (_, source) = switch_source(&cases);
    let asm = run(&source);
    assert!(asm.contains("lhld _x\nlxi d,2\n"));
}

#[test]
fn test_sparse_and_single_switches() {
    let cases = [SwitchCase::new(10, "LA"), SwitchCase::new(500, "LB")];
    let (strategy, source) = switch_source(&cases);
    assert_eq!(strategy, SwitchStrategy::Sparse);
    let asm = run(&source);
    assert!(asm.starts_with(".data\nLT:\n.dw 10,LA\n.dw 500,LB\n.code\n"));
    assert!(asm.ends_with("lhld _x\npush h\njmp cswitch\n"));

    let (strategy, source) = switch_source(&[SwitchCase::new(7, "L7")]);
    assert_eq!(strategy, SwitchStrategy::Single);
    // x == 7 is tested as x + -7 being non-zero
    assert_eq!(
        run(&source),
        indoc! {"
            lhld _x
            mov a,l
            adi <-7
            mov l,a
            mov a,h
            aci >-7
            mov h,a
            mov a,h
            ora l
            jnz LD
            jmp L7
        "}
    );
}

#[test]
fn test_data_section() {
    let asm = run(indoc! {"
        DATA
        _tab:EXPORT _tab
        WORD 1,2,_tab+4
        BYTE 104,105
        STORAGE 10
        BSS
        COMMON _buf,128
        STRING
    "});
    assert_eq!(
        asm,
        indoc! {"
            .data
            _tab:
            .export _tab
            .dw 1,2,_tab+4
            .db 104,105
            .ds 10
            .bss
            .common _buf,128
            .string
        "}
    );
}

#[test]
fn test_statements_reuse_the_pools() {
    let statement = "CON _x\nCON 1\nASSIGN\nEVAL\n";
    let limits = ArenaLimits {
        nodes: 4,
        ..ArenaLimits::default()
    };
    let options = BackendOptions::i8080().unwrap().with_limits(limits);
    let asm = compile(&statement.repeat(50), options).unwrap();
    assert_eq!(asm.matches("shld _x").count(), 50);
}

#[test]
fn test_backend_is_clear_between_statements() {
    let mut backend = Backend::new(BackendOptions::i8080().unwrap());
    for line in ["CON _a", "LOAD", "CON _b", "LOAD", "ADD"] {
        backend.process_line(line).unwrap();
    }
    assert_eq!(backend.context().stack.len(), 1);
    assert_eq!(backend.context().args.live(), 0);

    backend.process_line("EVAL").unwrap();
    assert!(backend.context().is_clear());
    backend.finish().unwrap();
    assert!(backend.output().ends_with("dad d\n"));
}

#[test]
fn test_every_command_leaves_the_context_clear() {
    let statements = [
        "CODE",
        "DATA",
        "BSS",
        "STRING",
        "EXPORT _a,_b",
        "COMMON _c,4",
        "BYTE 1,2",
        "WORD _a+2",
        "STORAGE 6",
        "FUNC _f",
        "AUTOS 4",
        "USEDREGS 2",
        "JMP L1",
        "CON _x\nLOAD\nEVAL",
        "CON _x\nLOAD\nRET",
        "CON _x\nLOAD\nBRZ L3",
        "CON _x\nLOAD\nSWITCH L1,L2,2",
        "CON _x\nLOAD\nSWEASY L1,L2,0,3",
        "CON L4\nSTKJMP",
        "RETNULL",
        "ENDFUNC",
        "END",
    ];
    let mut backend = Backend::new(BackendOptions::i8080().unwrap());
    for statement in statements {
        for line in statement.lines() {
            backend.process_line(line).unwrap();
        }
        assert!(backend.context().is_clear(), "after {statement}");
    }
    backend.finish().unwrap();
}
