//! A small assembler producing [`MethodInfo`] values.
//!
//! Container parsers hand the engine fully split basic blocks. Tests,
//! benchmarks and callers that synthesize code instead write a linear listing
//! with labels; [`CodeBuilder`] lays out offsets, splits the listing into basic
//! blocks at labels and control transfers, and wires block successors the way a
//! Dalvik disassembler reports them (fallthrough first, then branch targets).
//!
//! # Examples
//!
//! ```rust
//! use dexscope::input::{AccessFlags, MethodBuilder, Opcode};
//!
//! // static int max(int a, int b) { if (a > b) return a; return b; }
//! let method = MethodBuilder::new("LMath;", "max", "(II)I")
//!     .access(AccessFlags::PUBLIC | AccessFlags::STATIC)
//!     .registers(2)
//!     .code(|c| {
//!         c.if_cmp(Opcode::IfLe, 0, 1, "else")
//!             .ret(Opcode::Return, 0)
//!             .label("else")
//!             .ret(Opcode::Return, 1);
//!     })
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(method.blocks.len(), 3);
//! assert_eq!(method.blocks[0].children.len(), 2);
//! ```

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::{
    input::{
        descriptor, AccessFlags, BasicBlock, DecodedInstruction, ExceptionTable, FieldRef,
        Handler, MethodInfo, MethodRef, Opcode, Operand, TryRange,
    },
    Result,
};

#[derive(Debug, Clone)]
enum Target {
    None,
    Label(String),
    Cases(Vec<String>),
}

#[derive(Debug, Clone)]
struct Item {
    opcode: Opcode,
    operands: Vec<Operand>,
    target: Target,
}

#[derive(Debug, Clone)]
struct PendingTry {
    start: String,
    end: String,
    handlers: Vec<(Option<String>, String)>,
}

/// Linear instruction listing with labels.
#[derive(Debug, Default)]
pub struct CodeBuilder {
    items: Vec<Item>,
    labels: FxHashMap<String, usize>,
    tries: Vec<PendingTry>,
}

impl CodeBuilder {
    /// Creates an empty listing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, opcode: Opcode, operands: Vec<Operand>, target: Target) -> &mut Self {
        self.items.push(Item {
            opcode,
            operands,
            target,
        });
        self
    }

    fn regs(regs: &[u16]) -> Vec<Operand> {
        regs.iter().map(|r| Operand::Register(*r)).collect()
    }

    /// Binds `name` to the next instruction.
    pub fn label(&mut self, name: &str) -> &mut Self {
        self.labels.insert(name.to_string(), self.items.len());
        self
    }

    /// Appends an instruction with explicit operands.
    pub fn raw(&mut self, opcode: Opcode, operands: Vec<Operand>) -> &mut Self {
        self.push(opcode, operands, Target::None)
    }

    /// Appends an instruction whose operands are all registers.
    pub fn op(&mut self, opcode: Opcode, regs: &[u16]) -> &mut Self {
        self.push(opcode, Self::regs(regs), Target::None)
    }

    /// `nop`
    pub fn nop(&mut self) -> &mut Self {
        self.op(Opcode::Nop, &[])
    }

    /// `move` family, `dst = src`.
    pub fn mov(&mut self, opcode: Opcode, dst: u16, src: u16) -> &mut Self {
        self.op(opcode, &[dst, src])
    }

    /// `move-result` family.
    pub fn move_result(&mut self, opcode: Opcode, dst: u16) -> &mut Self {
        self.op(opcode, &[dst])
    }

    /// `move-exception`
    pub fn move_exception(&mut self, dst: u16) -> &mut Self {
        self.op(Opcode::MoveException, &[dst])
    }

    /// Narrowest `const` form holding `value`.
    pub fn const_int(&mut self, dst: u16, value: i32) -> &mut Self {
        let opcode = if (-8..=7).contains(&value) {
            Opcode::Const4
        } else if i16::try_from(value).is_ok() {
            Opcode::Const16
        } else {
            Opcode::Const
        };
        self.raw(
            opcode,
            vec![Operand::Register(dst), Operand::Literal(i64::from(value))],
        )
    }

    /// `const-wide`
    pub fn const_wide(&mut self, dst: u16, value: i64) -> &mut Self {
        self.raw(
            Opcode::ConstWide,
            vec![Operand::Register(dst), Operand::WideLiteral(value)],
        )
    }

    /// `const-string`
    pub fn const_string(&mut self, dst: u16, value: &str) -> &mut Self {
        self.raw(
            Opcode::ConstString,
            vec![Operand::Register(dst), Operand::String(value.to_string())],
        )
    }

    /// `const-class`
    pub fn const_class(&mut self, dst: u16, ty: &str) -> &mut Self {
        self.raw(
            Opcode::ConstClass,
            vec![Operand::Register(dst), Operand::Type(ty.to_string())],
        )
    }

    /// `new-instance`
    pub fn new_instance(&mut self, dst: u16, ty: &str) -> &mut Self {
        self.raw(
            Opcode::NewInstance,
            vec![Operand::Register(dst), Operand::Type(ty.to_string())],
        )
    }

    /// `new-array dst, size, ty`
    pub fn new_array(&mut self, dst: u16, size: u16, ty: &str) -> &mut Self {
        self.raw(
            Opcode::NewArray,
            vec![
                Operand::Register(dst),
                Operand::Register(size),
                Operand::Type(ty.to_string()),
            ],
        )
    }

    /// `check-cast`
    pub fn check_cast(&mut self, reg: u16, ty: &str) -> &mut Self {
        self.raw(
            Opcode::CheckCast,
            vec![Operand::Register(reg), Operand::Type(ty.to_string())],
        )
    }

    /// `instance-of dst, src, ty`
    pub fn instance_of(&mut self, dst: u16, src: u16, ty: &str) -> &mut Self {
        self.raw(
            Opcode::InstanceOf,
            vec![
                Operand::Register(dst),
                Operand::Register(src),
                Operand::Type(ty.to_string()),
            ],
        )
    }

    /// Instance and static field access (`iget*`, `iput*`, `sget*`, `sput*`).
    ///
    /// Registers are the value register followed by the object register for
    /// instance fields.
    pub fn field(&mut self, opcode: Opcode, regs: &[u16], field: FieldRef) -> &mut Self {
        let mut operands = Self::regs(regs);
        operands.push(Operand::Field(field));
        self.raw(opcode, operands)
    }

    /// Any `invoke-*` form.
    pub fn invoke(&mut self, opcode: Opcode, method: MethodRef, args: &[u16]) -> &mut Self {
        let mut operands = Self::regs(args);
        operands.push(Operand::Method(method));
        self.raw(opcode, operands)
    }

    /// `filled-new-array {args}, ty`
    pub fn filled_new_array(&mut self, ty: &str, args: &[u16]) -> &mut Self {
        let mut operands = Self::regs(args);
        operands.push(Operand::Type(ty.to_string()));
        self.raw(Opcode::FilledNewArray, operands)
    }

    /// `fill-array-data` with its payload.
    pub fn fill_array_data(&mut self, reg: u16, width: u16, data: &[u8]) -> &mut Self {
        self.raw(
            Opcode::FillArrayData,
            vec![
                Operand::Register(reg),
                Operand::ArrayData {
                    width,
                    data: data.to_vec(),
                },
            ],
        )
    }

    /// Binary operation with a literal (`*/lit8`, `*/lit16`, `rsub-int`).
    pub fn binop_lit(&mut self, opcode: Opcode, dst: u16, src: u16, lit: i32) -> &mut Self {
        self.raw(
            opcode,
            vec![
                Operand::Register(dst),
                Operand::Register(src),
                Operand::Literal(i64::from(lit)),
            ],
        )
    }

    /// `if-*` comparing two registers.
    pub fn if_cmp(&mut self, opcode: Opcode, a: u16, b: u16, target: &str) -> &mut Self {
        self.push(opcode, Self::regs(&[a, b]), Target::Label(target.to_string()))
    }

    /// `if-*z` comparing one register against zero.
    pub fn if_zero(&mut self, opcode: Opcode, a: u16, target: &str) -> &mut Self {
        self.push(opcode, Self::regs(&[a]), Target::Label(target.to_string()))
    }

    /// `goto`
    pub fn goto(&mut self, target: &str) -> &mut Self {
        self.push(Opcode::Goto, Vec::new(), Target::Label(target.to_string()))
    }

    /// `packed-switch` or `sparse-switch` with `(key, label)` cases.
    pub fn switch(&mut self, opcode: Opcode, reg: u16, cases: &[(i32, &str)]) -> &mut Self {
        let keys = cases.iter().map(|(key, _)| *key).collect();
        let labels = cases.iter().map(|(_, label)| (*label).to_string()).collect();
        self.push(
            opcode,
            vec![Operand::Register(reg), Operand::SwitchKeys(keys)],
            Target::Cases(labels),
        )
    }

    /// `return-void`
    pub fn ret_void(&mut self) -> &mut Self {
        self.op(Opcode::ReturnVoid, &[])
    }

    /// `return`, `return-wide` or `return-object`.
    pub fn ret(&mut self, opcode: Opcode, reg: u16) -> &mut Self {
        self.op(opcode, &[reg])
    }

    /// `throw`
    pub fn throw(&mut self, reg: u16) -> &mut Self {
        self.op(Opcode::Throw, &[reg])
    }

    /// Protects `[start, end)` with handlers given as `(type, label)`; a `None`
    /// type is a catch-all.
    pub fn try_range(
        &mut self,
        start: &str,
        end: &str,
        handlers: &[(Option<&str>, &str)],
    ) -> &mut Self {
        self.tries.push(PendingTry {
            start: start.to_string(),
            end: end.to_string(),
            handlers: handlers
                .iter()
                .map(|(ty, label)| (ty.map(str::to_string), (*label).to_string()))
                .collect(),
        });
        self
    }

    fn highest_register(&self) -> Option<u16> {
        self.items
            .iter()
            .flat_map(|item| item.operands.iter())
            .filter_map(|op| match op {
                Operand::Register(r) => Some(*r),
                _ => None,
            })
            .max()
    }

    fn label_index(&self, name: &str) -> Result<usize> {
        self.labels
            .get(name)
            .copied()
            .ok_or_else(|| malformed_error!("undefined label '{}'", name))
    }

    /// Lays out the listing and splits it into basic blocks.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] for undefined labels, labels past the
    /// last instruction used as branch targets, or a conditional branch or
    /// switch without a following instruction.
    pub fn assemble(&self, method_name: &str) -> Result<(Vec<BasicBlock>, ExceptionTable)> {
        let count = self.items.len();
        let mut offsets = Vec::with_capacity(count + 1);
        let mut offset = 0u32;
        for item in &self.items {
            offsets.push(offset);
            offset += unit_length(item.opcode);
        }
        offsets.push(offset);

        let mut leaders = BTreeSet::new();
        if count > 0 {
            leaders.insert(0);
        }
        for &index in self.labels.values() {
            if index < count {
                leaders.insert(index);
            }
        }
        for (index, item) in self.items.iter().enumerate() {
            if ends_block(item.opcode) && index + 1 < count {
                leaders.insert(index + 1);
            }
        }
        let leaders: Vec<usize> = leaders.into_iter().collect();

        let mut block_of = vec![0usize; count];
        for (block, window) in leaders.iter().enumerate() {
            let end = leaders.get(block + 1).copied().unwrap_or(count);
            for slot in block_of.iter_mut().take(end).skip(*window) {
                *slot = block;
            }
        }

        let target_block = |name: &str| -> Result<(u32, usize)> {
            let index = self.label_index(name)?;
            if index >= count {
                return Err(malformed_error!("label '{}' has no instruction", name));
            }
            Ok((offsets[index], block_of[index]))
        };

        let mut blocks = Vec::with_capacity(leaders.len());
        for (block, &first) in leaders.iter().enumerate() {
            let end = leaders.get(block + 1).copied().unwrap_or(count);
            let mut instructions = Vec::with_capacity(end - first);
            for index in first..end {
                let item = &self.items[index];
                let mut ins = DecodedInstruction::new(
                    item.opcode,
                    item.operands.clone(),
                    offsets[index],
                    unit_length(item.opcode),
                );
                if let Target::Label(name) = &item.target {
                    let (target, _) = target_block(name)?;
                    ins.ref_offset = Some(target as i32 - offsets[index] as i32);
                }
                instructions.push(ins);
            }

            let last = &self.items[end - 1];
            let fallthrough = if end < count {
                Some((offsets[end], block_of[end]))
            } else {
                None
            };
            let mut children = Vec::new();
            match &last.target {
                Target::Label(name) if last.opcode.is_goto() => {
                    children.push(target_block(name)?);
                }
                Target::Label(name) => {
                    let next = fallthrough.ok_or_else(|| {
                        malformed_error!("branch at {:#x} falls off the code", offsets[end - 1])
                    })?;
                    children.push(next);
                    children.push(target_block(name)?);
                }
                Target::Cases(labels) => {
                    let next = fallthrough.ok_or_else(|| {
                        malformed_error!("switch at {:#x} falls off the code", offsets[end - 1])
                    })?;
                    children.push(next);
                    for name in labels {
                        children.push(target_block(name)?);
                    }
                }
                Target::None => {
                    if !last.opcode.is_return() && !last.opcode.is_throw() {
                        if let Some(next) = fallthrough {
                            children.push(next);
                        }
                    }
                }
            }

            blocks.push(BasicBlock {
                name: format!("{}-BB@{:#x}", method_name, offsets[first]),
                start: offsets[first],
                end: offsets[end],
                instructions,
                children,
            });
        }

        let mut exceptions = ExceptionTable::default();
        for pending in &self.tries {
            let start = offsets[self.label_index(&pending.start)?];
            let end = offsets[self.label_index(&pending.end)?];
            let mut handlers = Vec::with_capacity(pending.handlers.len());
            for (ty, label) in &pending.handlers {
                let (_, block) = target_block(label)?;
                handlers.push(Handler {
                    exception_type: ty.clone(),
                    block,
                });
            }
            exceptions.ranges.push(TryRange {
                start,
                end,
                handlers,
            });
        }

        Ok((blocks, exceptions))
    }
}

fn ends_block(opcode: Opcode) -> bool {
    opcode.is_goto()
        || opcode.is_conditional()
        || opcode.is_switch()
        || opcode.is_return()
        || opcode.is_throw()
}

/// Encoded size in code units, as laid out by `dx`/`d8`.
fn unit_length(opcode: Opcode) -> u32 {
    use Opcode::*;
    match opcode {
        ConstWide => 5,
        Const | ConstWide32 | ConstStringJumbo | MoveWide16 | Move16 | MoveObject16 | Goto32
        | FillArrayData | PackedSwitch | SparseSwitch | FilledNewArray | FilledNewArrayRange => 3,
        op if op.is_invoke() => 3,
        Const16 | ConstHigh16 | ConstWide16 | ConstWideHigh16 | ConstString | ConstClass
        | MoveFrom16 | MoveWideFrom16 | MoveObjectFrom16 | Goto16 | CheckCast | InstanceOf
        | NewInstance | NewArray | CmplFloat | CmpgFloat | CmplDouble | CmpgDouble | CmpLong => 2,
        op if op.is_conditional() => 2,
        op => {
            let mnemonic = op.mnemonic();
            let two_units = ["aget", "aput", "iget", "iput", "sget", "sput", "/lit", "rsub-int"]
                .iter()
                .any(|p| mnemonic.contains(p));
            let three_register = !mnemonic.contains('/')
                && ["-int", "-long", "-float", "-double"]
                    .iter()
                    .any(|t| mnemonic.ends_with(t))
                && !mnemonic.contains("-to-")
                && !mnemonic.starts_with("neg-")
                && !mnemonic.starts_with("not-");
            if two_units || three_register {
                2
            } else {
                1
            }
        }
    }
}

/// Fluent builder for [`MethodInfo`].
#[derive(Debug)]
pub struct MethodBuilder {
    class: String,
    name: String,
    descriptor: String,
    access: AccessFlags,
    registers: Option<u16>,
    code: Option<CodeBuilder>,
}

impl MethodBuilder {
    /// Starts a method of `class` with the given name and prototype.
    #[must_use]
    pub fn new(class: &str, name: &str, descriptor: &str) -> Self {
        MethodBuilder {
            class: class.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            access: AccessFlags::empty(),
            registers: None,
            code: None,
        }
    }

    /// Sets the access flags.
    #[must_use]
    pub fn access(mut self, access: AccessFlags) -> Self {
        self.access = access;
        self
    }

    /// Sets `registers_size`; arguments occupy the last registers.
    #[must_use]
    pub fn registers(mut self, registers: u16) -> Self {
        self.registers = Some(registers);
        self
    }

    /// Provides the body. Methods without a body are native or abstract.
    #[must_use]
    pub fn code(mut self, f: impl FnOnce(&mut CodeBuilder)) -> Self {
        let mut code = CodeBuilder::new();
        f(&mut code);
        self.code = Some(code);
        self
    }

    /// Assembles the method.
    ///
    /// When no register count was given, the frame is sized to the highest
    /// register used, and at least to the argument registers.
    ///
    /// # Errors
    ///
    /// See [`CodeBuilder::assemble`].
    pub fn build(self) -> Result<MethodInfo> {
        let mut method = MethodInfo::new(self.class, self.name, self.descriptor, self.access);
        let ins = u16::from(!method.is_static())
            + method
                .params()
                .iter()
                .map(|p| descriptor::register_width(p))
                .sum::<u16>();

        if let Some(code) = self.code {
            let used = code.highest_register().map_or(0, |r| r + 1);
            method.registers = self.registers.unwrap_or_else(|| used.max(ins));
            let (blocks, exceptions) = code.assemble(&method.name)?;
            method.blocks = blocks;
            method.exceptions = exceptions;
        } else {
            method.registers = self.registers.unwrap_or(ins);
        }
        Ok(method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_splits_blocks_and_orders_children() {
        let method = MethodBuilder::new("LFoo;", "f", "(I)I")
            .access(AccessFlags::STATIC)
            .registers(2)
            .code(|c| {
                c.const_int(0, 1)
                    .if_zero(Opcode::IfEqz, 1, "zero")
                    .const_int(0, 2)
                    .label("zero")
                    .ret(Opcode::Return, 0);
            })
            .build()
            .unwrap();

        assert_eq!(method.blocks.len(), 3);
        let entry = &method.blocks[0];
        assert_eq!(entry.instructions.len(), 2);
        // fallthrough first, then the branch target
        assert_eq!(entry.children.iter().map(|c| c.1).collect::<Vec<_>>(), vec![1, 2]);

        let branch = entry.last().unwrap();
        assert_eq!(branch.branch_target(), Some(method.blocks[2].start));
        assert_eq!(method.blocks[1].children, vec![(method.blocks[2].start, 2)]);
        assert!(method.blocks[2].children.is_empty());
    }

    #[test]
    fn test_goto_has_single_child() {
        let method = MethodBuilder::new("LFoo;", "loop", "()V")
            .access(AccessFlags::STATIC)
            .code(|c| {
                c.label("top").nop().goto("top");
            })
            .build()
            .unwrap();

        assert_eq!(method.blocks.len(), 1);
        assert_eq!(method.blocks[0].children, vec![(0, 0)]);
    }

    #[test]
    fn test_switch_children_start_with_default() {
        let method = MethodBuilder::new("LFoo;", "s", "(I)V")
            .access(AccessFlags::STATIC)
            .registers(1)
            .code(|c| {
                c.switch(Opcode::PackedSwitch, 0, &[(1, "one"), (2, "two")])
                    .ret_void()
                    .label("one")
                    .ret_void()
                    .label("two")
                    .ret_void();
            })
            .build()
            .unwrap();

        let children: Vec<usize> = method.blocks[0].children.iter().map(|c| c.1).collect();
        assert_eq!(children, vec![1, 2, 3]);
        assert_eq!(method.blocks[0].last().unwrap().switch_keys(), Some(&[1, 2][..]));
    }

    #[test]
    fn test_try_range_resolves_handler_block() {
        let method = MethodBuilder::new("LFoo;", "t", "()V")
            .access(AccessFlags::STATIC)
            .code(|c| {
                c.label("try")
                    .invoke(Opcode::InvokeStatic, MethodRef::new("LFoo;", "g", "()V"), &[])
                    .label("end")
                    .ret_void()
                    .label("handler")
                    .move_exception(0)
                    .ret_void()
                    .try_range("try", "end", &[(Some("Ljava/lang/Exception;"), "handler")]);
            })
            .build()
            .unwrap();

        assert_eq!(method.blocks.len(), 3);
        let range = &method.exceptions.ranges[0];
        assert_eq!((range.start, range.end), (0, 3));
        assert_eq!(range.handlers[0].block, 2);
        assert_eq!(method.registers, 1);
    }

    #[test]
    fn test_undefined_label_is_malformed() {
        let result = MethodBuilder::new("LFoo;", "bad", "()V")
            .code(|c| {
                c.goto("nowhere");
            })
            .build();
        assert!(matches!(result, Err(crate::Error::Malformed { .. })));
    }

    #[test]
    fn test_unit_lengths() {
        assert_eq!(unit_length(Opcode::AddInt), 2);
        assert_eq!(unit_length(Opcode::AddInt2addr), 1);
        assert_eq!(unit_length(Opcode::AddIntLit8), 2);
        assert_eq!(unit_length(Opcode::IgetObject), 2);
        assert_eq!(unit_length(Opcode::IntToLong), 1);
        assert_eq!(unit_length(Opcode::NegInt), 1);
        assert_eq!(unit_length(Opcode::InvokeVirtual), 3);
        assert_eq!(unit_length(Opcode::ConstWide), 5);
        assert_eq!(unit_length(Opcode::Return), 1);
    }
}
