//! End-to-end decompilation scenarios.
//!
//! Each test assembles a small method with `MethodBuilder`, runs the whole
//! pipeline and checks the shape of the syntax tree and the rendered text.

use dexscope::{
    emit::ast::{Block, Expression, JumpKind, Statement},
    prelude::*,
};

fn decompile(method: &MethodInfo) -> Result<DecompiledMethod> {
    Decompiler::new(DecompilerConfig::sequential()).decompile_method(method)
}

fn call(name: &str) -> MethodRef {
    MethodRef::new("LP;", name, "()V")
}

fn while_body(statements: &[Statement]) -> &Block {
    statements
        .iter()
        .find_map(|s| match s {
            Statement::WhileStatement { body, .. } => Some(body),
            _ => None,
        })
        .expect("while statement")
}

fn is_jump(stmt: &Statement, kind: JumpKind) -> bool {
    matches!(stmt, Statement::JumpStatement { keyword, .. } if *keyword == kind)
}

fn body(output: &DecompiledMethod) -> &[Statement] {
    &output
        .ast
        .as_ref()
        .and_then(|ast| ast.body.as_ref())
        .expect("method body")
        .statements
}

#[test]
fn test_if_return_pair() -> Result<()> {
    // static int max(int a, int b) { if (a <= b) return b; return a; }
    let method = MethodBuilder::new("LMath;", "max", "(II)I")
        .access(AccessFlags::STATIC)
        .registers(2)
        .code(|c| {
            c.if_cmp(Opcode::IfLe, 0, 1, "else")
                .ret(Opcode::Return, 0)
                .label("else")
                .ret(Opcode::Return, 1);
        })
        .build()?;
    let output = decompile(&method)?;

    let statements = body(&output);
    assert_eq!(statements.len(), 1);
    let Statement::IfStatement {
        then_block,
        else_block: Some(else_block),
        ..
    } = &statements[0]
    else {
        panic!("expected if/else, got {statements:?}");
    };
    assert!(matches!(
        then_block.statements[..],
        [Statement::ReturnStatement { value: Some(_) }]
    ));
    assert!(matches!(
        else_block.statements[..],
        [Statement::ReturnStatement { value: Some(_) }]
    ));

    let source = output.source();
    assert!(source.starts_with("static int max(int p0, int p1) {"));
    assert!(source.contains("if (p0 <= p1) {"));
    assert_eq!(source.matches("return").count(), 2);
    Ok(())
}

#[test]
fn test_pretest_while_loop() -> Result<()> {
    // static int count(int n) { int i = 0; while (i < n) { i++; } return i; }
    let method = MethodBuilder::new("LLoop;", "count", "(I)I")
        .access(AccessFlags::STATIC)
        .registers(2)
        .code(|c| {
            c.const_int(0, 0)
                .label("head")
                .if_cmp(Opcode::IfGe, 0, 1, "end")
                .binop_lit(Opcode::AddIntLit8, 0, 0, 1)
                .goto("head")
                .label("end")
                .ret(Opcode::Return, 0);
        })
        .build()?;
    let output = decompile(&method)?;
    assert_eq!(output.summary.loops, 1);

    let statements = body(&output);
    assert!(statements
        .iter()
        .any(|s| matches!(s, Statement::WhileStatement { .. })));
    assert!(matches!(
        statements.last(),
        Some(Statement::ReturnStatement { .. })
    ));

    let source = output.source();
    assert!(source.contains("while (v0 < p1) {"), "{source}");
    assert!(source.contains("v0++;"), "{source}");
    Ok(())
}

#[test]
fn test_switch_with_default_and_shared_follow() -> Result<()> {
    let method = MethodBuilder::new("LSwitch;", "pick", "(I)I")
        .access(AccessFlags::STATIC)
        .registers(2)
        .code(|c| {
            c.switch(
                Opcode::PackedSwitch,
                1,
                &[(1, "one"), (2, "two"), (3, "three")],
            )
            .const_int(0, 0)
            .goto("end")
            .label("one")
            .const_int(0, 10)
            .goto("end")
            .label("two")
            .const_int(0, 20)
            .goto("end")
            .label("three")
            .const_int(0, 30)
            .goto("end")
            .label("end")
            .ret(Opcode::Return, 0);
        })
        .build()?;
    let output = decompile(&method)?;
    assert_eq!(output.summary.switches, 1);

    let statements = body(&output);
    let cases = statements
        .iter()
        .find_map(|s| match s {
            Statement::SwitchStatement { cases, .. } => Some(cases),
            _ => None,
        })
        .expect("switch statement");
    assert_eq!(cases.len(), 4);
    let keys: Vec<&[i32]> = cases.iter().map(|c| c.keys.as_slice()).collect();
    assert_eq!(keys, vec![&[1][..], &[2][..], &[3][..], &[][..]]);
    assert!(cases[3].is_default);

    // the follow comes once, after the switch
    let source = output.source();
    assert_eq!(source.matches("return v0;").count(), 1, "{source}");
    assert_eq!(source.matches("break;").count(), 3, "{source}");
    assert!(source.contains("switch (p1) {"));
    assert!(source.contains("default:"));
    Ok(())
}

#[test]
fn test_or_short_circuit() -> Result<()> {
    // static int anyZero(int a, int b) { if (a == 0 || b == 0) return 1; return 0; }
    let method = MethodBuilder::new("LCond;", "anyZero", "(II)I")
        .access(AccessFlags::STATIC)
        .registers(3)
        .code(|c| {
            c.if_zero(Opcode::IfEqz, 1, "yes")
                .if_zero(Opcode::IfEqz, 2, "yes")
                .const_int(0, 0)
                .ret(Opcode::Return, 0)
                .label("yes")
                .const_int(0, 1)
                .ret(Opcode::Return, 0);
        })
        .build()?;
    let output = decompile(&method)?;
    assert_eq!(output.summary.short_circuits, 1);

    let statements = body(&output);
    let Some(Statement::IfStatement { condition, .. }) = statements.first() else {
        panic!("expected if, got {statements:?}");
    };
    assert!(matches!(condition, Expression::BinaryInfix { op, .. } if op == "||"));

    let source = output.source();
    assert!(source.contains("if ((p1 == 0) || (p2 == 0)) {"), "{source}");
    assert!(source.contains("return 1;"));
    assert!(source.contains("return 0;"));
    Ok(())
}

#[test]
fn test_dead_store_removed_call_kept() -> Result<()> {
    let method = MethodBuilder::new("LDead;", "f", "(I)I")
        .access(AccessFlags::STATIC)
        .registers(2)
        .code(|c| {
            c.const_int(0, 5)
                .invoke(Opcode::InvokeStatic, MethodRef::new("LDead;", "tick", "()I"), &[])
                .move_result(Opcode::MoveResult, 0)
                .ret(Opcode::Return, 1);
        })
        .build()?;
    let output = decompile(&method)?;

    let statements = body(&output);
    assert_eq!(statements.len(), 2, "{statements:?}");
    assert!(matches!(
        statements[0],
        Statement::ExpressionStatement {
            expression: Expression::MethodInvocation { .. }
        }
    ));
    let source = output.source();
    assert!(source.contains("Dead.tick();"), "{source}");
    assert!(source.contains("return p1;"));
    assert!(!source.contains("v0"));
    Ok(())
}

#[test]
fn test_try_catch() -> Result<()> {
    let method = MethodBuilder::new("LTry;", "t", "()V")
        .access(AccessFlags::STATIC)
        .code(|c| {
            c.label("try")
                .invoke(Opcode::InvokeStatic, MethodRef::new("LTry;", "g", "()V"), &[])
                .label("end")
                .ret_void()
                .label("handler")
                .move_exception(0)
                .ret_void()
                .try_range("try", "end", &[(Some("Ljava/lang/Exception;"), "handler")]);
        })
        .build()?;
    let output = decompile(&method)?;
    assert_eq!(output.summary.tries, 1);

    let statements = body(&output);
    assert!(matches!(
        statements.first(),
        Some(Statement::TryStatement { catches, .. }) if catches.len() == 1
    ));
    let source = output.source();
    assert!(source.contains("try {"), "{source}");
    assert!(source.contains("} catch (java.lang.Exception "), "{source}");
    assert!(source.contains("Try.g();"));
    Ok(())
}

#[test]
fn test_constructor_super_call_omitted() -> Result<()> {
    let method = MethodBuilder::new("LPoint;", "<init>", "(I)V")
        .access(AccessFlags::PUBLIC | AccessFlags::CONSTRUCTOR)
        .registers(2)
        .code(|c| {
            c.invoke(
                Opcode::InvokeDirect,
                MethodRef::new("Ljava/lang/Object;", "<init>", "()V"),
                &[0],
            )
            .field(Opcode::Iput, &[1, 0], FieldRef::new("LPoint;", "x", "I"))
            .ret_void();
        })
        .build()?;
    let output = decompile(&method)?;
    let source = output.source();
    assert!(source.starts_with("public Point(int p1) {"), "{source}");
    assert!(source.contains("this.x = p1;"), "{source}");
    assert!(!source.contains("super"), "{source}");

    let config = DecompilerConfig {
        skip_constructor_super_call: false,
        ..DecompilerConfig::sequential()
    };
    let explicit = Decompiler::new(config).decompile_method(&method)?;
    assert!(explicit.source().contains("super();"), "{}", explicit.source());
    Ok(())
}

#[test]
fn test_json_output() -> Result<()> {
    let method = MethodBuilder::new("LMath;", "max", "(II)I")
        .access(AccessFlags::STATIC)
        .registers(2)
        .code(|c| {
            c.if_cmp(Opcode::IfLe, 0, 1, "else")
                .ret(Opcode::Return, 0)
                .label("else")
                .ret(Opcode::Return, 1);
        })
        .build()?;
    let output = decompile(&method)?;
    let json = output.to_json()?.expect("ast enabled");
    let value: serde_json::Value = serde_json::from_str(&json)?;
    assert_eq!(value["triple"]["class"], "Math");
    assert_eq!(value["triple"]["name"], "max");
    assert_eq!(value["body"]["statements"][0]["type"], "IfStatement");
    assert_eq!(value["params"][1]["name"], "p1");
    Ok(())
}

#[test]
fn test_post_test_do_while_loop() -> Result<()> {
    // static int atLeastOnce(int n) { int i = 0; do { i++; } while (i < n); return i; }
    let method = MethodBuilder::new("LLoop;", "atLeastOnce", "(I)I")
        .access(AccessFlags::STATIC)
        .registers(2)
        .code(|c| {
            c.const_int(0, 0)
                .label("top")
                .binop_lit(Opcode::AddIntLit8, 0, 0, 1)
                .if_cmp(Opcode::IfLt, 0, 1, "top")
                .ret(Opcode::Return, 0);
        })
        .build()?;
    let output = decompile(&method)?;
    assert_eq!(output.summary.loops, 1);

    let statements = body(&output);
    assert!(statements
        .iter()
        .any(|s| matches!(s, Statement::DoStatement { .. })));
    let source = output.source();
    assert!(source.contains("do {"), "{source}");
    assert!(source.contains("} while (v0 < p1);"), "{source}");
    assert!(!source.contains("continue;"), "{source}");
    Ok(())
}

#[test]
fn test_endless_loop_with_break() -> Result<()> {
    // static int spin(int n) { int i = 0; while (true) { i++; if (i >= n) break; P.tick(); } return i; }
    let method = MethodBuilder::new("LLoop;", "spin", "(I)I")
        .access(AccessFlags::STATIC)
        .registers(2)
        .code(|c| {
            c.const_int(0, 0)
                .label("top")
                .binop_lit(Opcode::AddIntLit8, 0, 0, 1)
                .if_cmp(Opcode::IfGe, 0, 1, "out")
                .invoke(Opcode::InvokeStatic, call("tick"), &[])
                .goto("top")
                .label("out")
                .ret(Opcode::Return, 0);
        })
        .build()?;
    let output = decompile(&method)?;
    assert_eq!(output.summary.loops, 1);

    let statements = body(&output);
    assert!(matches!(
        statements.last(),
        Some(Statement::ReturnStatement { .. })
    ));
    let source = output.source();
    assert!(source.contains("while (true) {"), "{source}");
    assert_eq!(source.matches("break;").count(), 1, "{source}");
    assert_eq!(source.matches("P.tick();").count(), 1, "{source}");
    assert!(!source.contains("continue;"), "{source}");
    Ok(())
}

#[test]
fn test_switch_case_falls_through() -> Result<()> {
    // case 1 runs P.a() and falls into case 2
    let method = MethodBuilder::new("LSwitch;", "fall", "(I)I")
        .access(AccessFlags::STATIC)
        .registers(2)
        .code(|c| {
            c.switch(Opcode::PackedSwitch, 1, &[(1, "one"), (2, "two")])
                .const_int(0, 0)
                .goto("end")
                .label("one")
                .invoke(Opcode::InvokeStatic, call("a"), &[])
                .label("two")
                .const_int(0, 20)
                .goto("end")
                .label("end")
                .ret(Opcode::Return, 0);
        })
        .build()?;
    let output = decompile(&method)?;
    assert_eq!(output.summary.switches, 1);

    let cases = body(&output)
        .iter()
        .find_map(|s| match s {
            Statement::SwitchStatement { cases, .. } => Some(cases),
            _ => None,
        })
        .expect("switch statement");
    assert_eq!(cases.len(), 3);
    assert_eq!(cases[0].keys, vec![1]);
    assert!(!cases[0]
        .body
        .statements
        .iter()
        .any(|s| is_jump(s, JumpKind::Break)));
    assert!(cases[1]
        .body
        .statements
        .last()
        .is_some_and(|s| is_jump(s, JumpKind::Break)));

    let source = output.source();
    assert_eq!(source.matches("P.a();").count(), 1, "{source}");
    assert_eq!(source.matches("= 20;").count(), 1, "{source}");
    assert_eq!(source.matches("return v0;").count(), 1, "{source}");
    assert_eq!(source.matches("break;").count(), 1, "{source}");
    Ok(())
}

#[test]
fn test_continue_from_nested_if() -> Result<()> {
    // while (i < n) { i++; if (x) { if (y) continue; P.b(); } P.d(); }
    let method = MethodBuilder::new("LLoop;", "skip", "(IZZ)V")
        .access(AccessFlags::STATIC)
        .registers(4)
        .code(|c| {
            c.const_int(0, 0)
                .label("head")
                .if_cmp(Opcode::IfGe, 0, 1, "end")
                .binop_lit(Opcode::AddIntLit8, 0, 0, 1)
                .if_zero(Opcode::IfEqz, 2, "d")
                .if_zero(Opcode::IfNez, 3, "head")
                .invoke(Opcode::InvokeStatic, call("b"), &[])
                .label("d")
                .invoke(Opcode::InvokeStatic, call("d"), &[])
                .goto("head")
                .label("end")
                .ret_void();
        })
        .build()?;
    let output = decompile(&method)?;
    assert_eq!(output.summary.loops, 1);

    let body = while_body(body(&output));
    // P.d() runs on every iteration that does not continue
    assert!(matches!(
        body.statements.last(),
        Some(Statement::ExpressionStatement {
            expression: Expression::MethodInvocation { name, .. }
        }) if name == "d"
    ));
    let nested_continue = body.statements.iter().any(|s| match s {
        Statement::IfStatement { then_block, .. } => then_block.statements.iter().any(|inner| {
            matches!(
                inner,
                Statement::IfStatement { then_block, else_block: None, .. }
                    if matches!(&then_block.statements[..], [j] if is_jump(j, JumpKind::Continue))
            )
        }),
        _ => false,
    });
    assert!(nested_continue, "{body:?}");

    let source = output.source();
    assert_eq!(source.matches("continue;").count(), 1, "{source}");
    assert_eq!(source.matches("P.b();").count(), 1, "{source}");
    assert_eq!(source.matches("P.d();").count(), 1, "{source}");
    assert!(!source.contains("goto"), "{source}");
    Ok(())
}

#[test]
fn test_irreducible_cycle_kept_as_goto() -> Result<()> {
    // two entries into the a/b cycle: no loop construct covers it
    let method = MethodBuilder::new("LJump;", "cycle", "(II)V")
        .access(AccessFlags::STATIC)
        .registers(2)
        .code(|c| {
            c.if_zero(Opcode::IfEqz, 0, "b")
                .label("a")
                .invoke(Opcode::InvokeStatic, call("a"), &[])
                .label("b")
                .invoke(Opcode::InvokeStatic, call("b"), &[])
                .if_zero(Opcode::IfNez, 1, "a")
                .ret_void();
        })
        .build()?;
    let decompiler = Decompiler::new(DecompilerConfig::sequential());
    let output = decompiler.decompile_method(&method)?;
    assert!(output.summary.irreducible);
    assert_eq!(decompiler.events().count(EventKind::IrreducibleFlow), 1);

    let source = output.source();
    assert_eq!(source.matches("P.a();").count(), 1, "{source}");
    assert_eq!(source.matches("P.b();").count(), 1, "{source}");
    assert!(source.contains("// Unstructured control flow kept as goto"), "{source}");

    // the back edge survives as a jump to a printed label
    let start = source.find("goto ").expect("goto") + "goto ".len();
    let label = &source[start..start + source[start..].find(';').expect("goto end")];
    assert!(source.contains(&format!("{label}:\n")), "{source}");
    Ok(())
}

#[test]
fn test_call_stays_before_earlier_field_read() -> Result<()> {
    // v0 = P.a(); v1 = P.x; return v1 + v0
    let method = MethodBuilder::new("LOrder;", "f", "()I")
        .access(AccessFlags::STATIC)
        .registers(3)
        .code(|c| {
            c.invoke(Opcode::InvokeStatic, MethodRef::new("LP;", "a", "()I"), &[])
                .move_result(Opcode::MoveResult, 0)
                .field(Opcode::Sget, &[1], FieldRef::new("LP;", "x", "I"))
                .op(Opcode::AddInt, &[2, 1, 0])
                .ret(Opcode::Return, 2);
        })
        .build()?;
    let output = decompile(&method)?;
    let source = output.source();
    assert!(!source.contains("P.x + P.a()"), "{source}");
    let call = source.find("P.a()").expect("call");
    let read = source.find("P.x").expect("field read");
    assert!(call < read, "{source}");
    Ok(())
}
