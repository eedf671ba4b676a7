//! Structured traversal of the method graph.
//!
//! One recursive walk from the entry visits every node once (return and throw
//! nodes may be duplicated into several branches) and appends statements to
//! the innermost open block of the [`EmitContext`]. A branch ends when it
//! reaches the follow of an enclosing construct; that construct then continues
//! with its follow. Reaching the loop header (or the latch of a post-tested
//! loop) prints `continue`; reaching any other emitted node prints a `goto`
//! to a label placed on that node.

use rustc_hash::FxHashSet;

use crate::{
    emit::{
        ast::{Block, CatchClause, Expression, JumpKind, Statement, SwitchCase, VarDecl},
        EmitContext, EmitOptions,
    },
    graph::{Graph, LoopType, NodeKind, SwitchCases},
    input::{DescriptorInterner, MethodInfo},
    ir::{Instruction, VarId, VariableTable},
    utils::graph::NodeId,
};

pub(super) const THROWABLE: &str = "Ljava/lang/Throwable;";

/// Emitter state of one method.
pub(super) struct Writer<'a> {
    pub(super) graph: &'a Graph,
    pub(super) vars: &'a mut VariableTable,
    pub(super) method: &'a MethodInfo,
    pub(super) types: &'a DescriptorInterner,
    pub(super) options: EmitOptions,
    pub(super) ctx: EmitContext,
}

impl<'a> Writer<'a> {
    pub(super) fn new(
        graph: &'a Graph,
        vars: &'a mut VariableTable,
        method: &'a MethodInfo,
        types: &'a DescriptorInterner,
        options: EmitOptions,
    ) -> Self {
        Writer {
            graph,
            vars,
            method,
            types,
            options,
            ctx: EmitContext::new(),
        }
    }

    /// Emits the whole graph and returns the method body.
    ///
    /// Nodes in `labels` are preceded by their label.
    pub(super) fn write_body(&mut self, labels: FxHashSet<NodeId>) -> Block {
        self.ctx.labels = labels;
        self.ctx.open();
        self.visit_node(self.graph.entry());
        self.ctx.close()
    }

    fn scoped(&mut self, f: impl FnOnce(&mut Self)) -> Block {
        self.ctx.open();
        f(self);
        self.ctx.close()
    }

    fn add_break(&mut self) {
        self.ctx.add(Statement::jump(JumpKind::Break));
    }

    fn add_continue(&mut self) {
        self.ctx.add(Statement::jump(JumpKind::Continue));
    }

    fn label(&self, node: NodeId) -> String {
        format!("L{}", self.graph[node].num)
    }

    pub(super) fn emit_ins(&mut self, ins: &Instruction) {
        if let Some(stmt) = self.statement(ins) {
            self.ctx.add(stmt);
        }
    }

    /// Prints `type name;` unless the variable is already declared.
    fn declare(&mut self, var: VarId) {
        if self.vars.is_param(var) {
            return;
        }
        let decl = self.decl(var);
        match self.vars.get_mut(var) {
            Some(v) if !v.declared => v.declared = true,
            _ => return,
        }
        self.ctx
            .add(Statement::LocalDeclarationStatement { decl, init: None });
    }

    pub(super) fn visit_node(&mut self, node: NodeId) {
        if self.ctx.is_continue(node) {
            self.add_continue();
            return;
        }
        if self.ctx.is_sentinel(node) {
            return;
        }
        let graph = self.graph;
        let n = &graph[node];
        let repeatable = matches!(n.kind.base(), NodeKind::Return | NodeKind::Throw);
        if !repeatable && self.ctx.visited.contains(&node) {
            // no construct ends here: keep the edge as a jump
            self.ctx.goto_targets.insert(node);
            self.ctx.add(Statement::JumpStatement {
                keyword: JumpKind::Goto,
                label: Some(self.label(node)),
            });
            return;
        }
        self.ctx.visited.insert(node);
        if self.ctx.labels.contains(&node) {
            self.ctx.add(Statement::LabelStatement {
                label: self.label(node),
            });
        }
        for var in &n.var_to_declare {
            self.declare(*var);
        }
        self.visit_kind(node, &n.kind);
    }

    fn visit_opt(&mut self, node: Option<NodeId>) {
        if let Some(node) = node {
            self.visit_node(node);
        }
    }

    fn visit_kind(&mut self, node: NodeId, kind: &NodeKind) {
        match kind {
            NodeKind::Loop { inner, loop_type } => self.visit_loop(node, inner, *loop_type),
            NodeKind::Conditional(_) | NodeKind::ShortCircuit(_) => self.visit_cond(node),
            NodeKind::Switch(cases) => self.visit_switch(node, cases),
            NodeKind::Statement => self.visit_statement(node),
            NodeKind::Return | NodeKind::Throw => self.visit_exit(node),
            NodeKind::Try {
                try_start,
                catches,
                follow,
            } => self.visit_try(*try_start, catches, *follow),
            NodeKind::Catch { catch_start, .. } => self.visit_node(*catch_start),
        }
    }

    fn visit_loop(&mut self, node: NodeId, inner: &NodeKind, loop_type: LoopType) {
        let graph = self.graph;
        let header = &graph[node];
        let follow = header.loop_follow;

        let stmt = match (loop_type, inner.branches()) {
            (LoopType::PreTest, Some(branches)) => {
                let negate = Some(branches.on_true) == follow;
                let start = if negate {
                    branches.on_false
                } else {
                    branches.on_true
                };
                let condition = self.cond_expr(node, negate);
                let body = self.scoped(|w| {
                    w.ctx.loop_follow.push(follow);
                    w.ctx.loop_continue.push(Some(node));
                    w.visit_node(start);
                    w.ctx.loop_continue.pop();
                    w.ctx.loop_follow.pop();
                });
                Statement::WhileStatement {
                    condition,
                    body: without_trailing_continue(body),
                }
            }
            (LoopType::PostTest, _) => {
                let latch = header.latch;
                let target = latch.filter(|l| graph[*l].kind.is_cond()).unwrap_or(node);
                let body = self.scoped(|w| {
                    w.ctx.latch.push(latch);
                    w.ctx.loop_follow.push(follow);
                    w.ctx.loop_continue.push(Some(target));
                    w.visit_kind(node, inner);
                    w.ctx.loop_continue.pop();
                    w.ctx.loop_follow.pop();
                    w.ctx.latch.pop();
                });
                let body = without_trailing_continue(body);
                let condition = match latch {
                    Some(latch) if graph[latch].kind.is_cond() => {
                        self.ctx.visited.insert(latch);
                        let negate = graph[latch]
                            .kind
                            .branches()
                            .is_some_and(|b| b.on_true != node && b.on_false == node);
                        self.cond_expr(latch, negate)
                    }
                    _ => self.bool_literal(true),
                };
                Statement::DoStatement { condition, body }
            }
            _ => {
                let latch = header.latch;
                let body = self.scoped(|w| {
                    w.ctx.loop_follow.push(follow);
                    w.ctx.loop_continue.push(Some(node));
                    w.visit_kind(node, inner);
                    if let Some(latch) = latch.filter(|l| !w.ctx.visited.contains(l)) {
                        w.visit_node(latch);
                    }
                    w.ctx.loop_continue.pop();
                    w.ctx.loop_follow.pop();
                });
                Statement::WhileStatement {
                    condition: self.bool_literal(true),
                    body: without_trailing_continue(body),
                }
            }
        };
        self.ctx.add(stmt);
        self.visit_opt(follow);
    }

    fn visit_cond(&mut self, node: NodeId) {
        let graph = self.graph;
        let n = &graph[node];
        let Some(branches) = n.kind.branches() else {
            return;
        };
        let (mut on_true, mut on_false) = (branches.on_true, branches.on_false);
        let mut negate = false;

        if on_true == on_false {
            let expression = self.cond_expr(node, false);
            self.ctx.add(Statement::ExpressionStatement { expression });
            self.visit_node(on_true);
            return;
        }

        let loop_follow = self.ctx.loop_follow();
        if Some(on_false) == loop_follow {
            negate = true;
            std::mem::swap(&mut on_true, &mut on_false);
        }

        if loop_follow.is_some_and(|f| f == on_true || f == on_false) {
            let condition = self.cond_expr(node, negate);
            let then_block = self.scoped(Self::add_break);
            let else_block = self.scoped(|w| w.visit_node(on_false));
            self.ctx.add(Statement::IfStatement {
                condition,
                then_block,
                else_block: non_empty(else_block),
            });
        } else if let Some(target) = [on_true, on_false]
            .into_iter()
            .find(|b| self.ctx.is_continue(*b))
        {
            if on_false == target {
                negate = !negate;
                std::mem::swap(&mut on_true, &mut on_false);
            }
            let condition = self.cond_expr(node, negate);
            let then_block = self.scoped(Self::add_continue);
            self.ctx.add(Statement::IfStatement {
                condition,
                then_block,
                else_block: None,
            });
            self.visit_node(on_false);
        } else if let Some(follow) = n.if_follow {
            if on_true == follow
                || Some(on_true) == self.ctx.next_case
                || n.num > graph[on_true].num
            {
                negate = !negate;
                std::mem::swap(&mut on_true, &mut on_false);
            }
            self.ctx.if_follow.push(Some(follow));
            let condition = self.cond_expr(node, negate);
            let then_block = self.scoped(|w| w.visit_node(on_true));
            let is_else = follow != on_true && follow != on_false;
            let else_block = if is_else {
                non_empty(self.scoped(|w| w.visit_node(on_false)))
            } else {
                None
            };
            self.ctx.if_follow.pop();
            self.ctx.add(Statement::IfStatement {
                condition,
                then_block,
                else_block,
            });
            self.visit_node(follow);
        } else {
            let condition = self.cond_expr(node, negate);
            let then_block = self.scoped(|w| w.visit_node(on_true));
            let else_block = self.scoped(|w| w.visit_node(on_false));
            self.ctx.add(Statement::IfStatement {
                condition,
                then_block,
                else_block: non_empty(else_block),
            });
        }
    }

    fn visit_switch(&mut self, node: NodeId, cases: &SwitchCases) {
        let graph = self.graph;
        let n = &graph[node];
        let Some((last, pre)) = n.ins.split_last() else {
            return;
        };
        for ins in pre {
            self.emit_ins(ins);
        }
        let selector = match last {
            Instruction::Switch(value) => self.expr(value, Some("I")),
            other => self.dummy(&other.describe(self.vars)),
        };

        let follow = n.switch_follow;
        self.ctx.switch_follow.push(follow);
        let mut default = cases.default;
        let mut arms = Vec::with_capacity(cases.cases.len() + 1);
        for (index, case) in cases.cases.iter().enumerate() {
            if self.ctx.visited.contains(case) {
                continue;
            }
            self.ctx.next_case = cases.cases.get(index + 1).copied();
            let is_default = default == Some(*case);
            if is_default {
                default = None;
            }
            let mut body = self.scoped(|w| w.visit_node(*case));
            let falls_through = !std::mem::replace(&mut self.ctx.need_break, true);
            let ends_abruptly = body.statements.last().is_some_and(Statement::ends_abruptly);
            if !falls_through && !ends_abruptly {
                body.statements.push(Statement::jump(JumpKind::Break));
            }
            arms.push(SwitchCase {
                keys: cases.keys_of(*case).to_vec(),
                is_default,
                body,
            });
        }
        self.ctx.next_case = None;

        if let Some(default) = default.filter(|d| Some(*d) != follow) {
            let body = self.scoped(|w| w.visit_node(default));
            arms.push(SwitchCase {
                keys: Vec::new(),
                is_default: true,
                body,
            });
        }
        self.ctx.add(Statement::SwitchStatement {
            selector,
            cases: arms,
        });
        self.ctx.switch_follow.pop();
        self.visit_opt(follow);
    }

    fn visit_statement(&mut self, node: NodeId) {
        let graph = self.graph;
        for ins in &graph[node].ins {
            self.emit_ins(ins);
        }
        if let [suc] = graph.sucs(node) {
            if Some(*suc) == self.ctx.loop_follow() {
                self.add_break();
            } else if Some(*suc) == self.ctx.next_case {
                self.ctx.need_break = false;
            } else {
                self.visit_node(*suc);
            }
        }
    }

    /// Return and throw nodes.
    fn visit_exit(&mut self, node: NodeId) {
        let graph = self.graph;
        for ins in &graph[node].ins {
            self.emit_ins(ins);
        }
    }

    fn visit_try(&mut self, try_start: NodeId, catches: &[NodeId], follow: Option<NodeId>) {
        let graph = self.graph;
        self.ctx.try_follow.push(follow);
        let body = self.scoped(|w| w.visit_node(try_start));

        let mut clauses = Vec::with_capacity(catches.len());
        for catch in catches {
            self.ctx.visited.insert(*catch);
            let NodeKind::Catch {
                catch_start,
                binding,
                ty,
            } = &graph[*catch].kind
            else {
                continue;
            };
            let decl = match binding {
                Some(var) => {
                    if let Some(v) = self.vars.get_mut(*var) {
                        v.declared = true;
                    }
                    let caught = self
                        .vars
                        .ty(*var)
                        .or(ty.as_deref())
                        .unwrap_or(THROWABLE)
                        .to_string();
                    VarDecl {
                        ty: self.type_name(&caught),
                        name: self.vars.name(*var),
                    }
                }
                None => VarDecl {
                    ty: self.type_name(ty.as_deref().unwrap_or(THROWABLE)),
                    name: "_".to_string(),
                },
            };
            let body = self.scoped(|w| w.visit_node(*catch_start));
            clauses.push(CatchClause { decl, body });
        }

        self.ctx.add(Statement::TryStatement {
            body,
            catches: clauses,
        });
        let follow = self.ctx.try_follow.pop().flatten();
        self.visit_opt(follow);
    }

    /// Condition of a conditional, short-circuit or loop header node.
    pub(super) fn cond_expr(&self, node: NodeId, negate: bool) -> Expression {
        let n = &self.graph[node];
        match n.kind.base() {
            NodeKind::ShortCircuit(sc) => {
                let first = self.cond_expr(sc.first, sc.is_not ^ negate).paren_operand();
                let second = self.cond_expr(sc.second, negate).paren_operand();
                let op = if sc.is_and ^ negate { "&&" } else { "||" };
                Expression::binary(op, first, second)
            }
            _ => match n.ins.last() {
                Some(ins) => self.condition(ins, negate),
                None => self.dummy("empty condition"),
            },
        }
    }
}

fn non_empty(block: Block) -> Option<Block> {
    (!block.statements.is_empty()).then_some(block)
}

/// Drops `continue` statements that end the loop body, looking into the
/// branches of a closing `if`.
fn without_trailing_continue(mut body: Block) -> Block {
    match body.statements.last_mut() {
        Some(Statement::JumpStatement {
            keyword: JumpKind::Continue,
            ..
        }) => {
            body.statements.pop();
        }
        Some(Statement::IfStatement {
            then_block,
            else_block,
            ..
        }) => {
            *then_block = without_trailing_continue(std::mem::take(then_block));
            *else_block = else_block
                .take()
                .map(without_trailing_continue)
                .and_then(non_empty);
        }
        _ => {}
    }
    body
}
