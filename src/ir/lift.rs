//! Lifting of decoded Dalvik instructions to IR.
//!
//! Instructions are lifted one block at a time in address order by a
//! [`Lifter`] that shares the method's [`VariableTable`]. The lifter keeps the
//! one piece of state Dalvik threads between instructions: the result of the
//! most recent `invoke-*` or `filled-new-array`, which a following
//! `move-result*` reads.
//!
//! # Operand conventions
//!
//! Operands follow the listing order of disassemblers (destination first).
//! Range invokes list every register of the range, and literals are the final
//! values (`const/high16 v0, 0x41200000`, not the encoded high half).
//!
//! # Results of invocations
//!
//! Every non-void invoke assigns its value to a fresh temporary that a
//! `move-result*` may copy. Constructor calls (`<init>`) on anything but the
//! receiver of the current method redefine their receiver register, which
//! lets register propagation fold `new-instance` into the call and print a
//! class instance creation.

use crate::{
    input::{descriptor, DecodedInstruction, Opcode, Operand},
    ir::{
        BinaryOp, CondOp, Constant, Expr, Instruction, InvokeKind, UnaryOp, VarId, VarKind,
        VariableTable,
    },
    Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Form {
    /// `op vA, vB, vC`
    ThreeRegister,
    /// `op/2addr vA, vB`
    TwoAddress,
    /// `op/lit vA, vB, #lit`
    Literal,
    /// `rsub-int vA, vB, #lit` computing `lit - vB`
    ReverseLiteral,
}

/// Stateful per-method lifter.
pub struct Lifter<'a> {
    vars: &'a mut VariableTable,
    last_result: Option<VarId>,
}

impl<'a> Lifter<'a> {
    /// Creates a lifter writing variables into `vars`.
    pub fn new(vars: &'a mut VariableTable) -> Self {
        Lifter {
            vars,
            last_result: None,
        }
    }

    /// Lifts one instruction.
    ///
    /// Returns `None` for jumps, which only shape the graph. Unknown opcodes
    /// lift to [`Instruction::Nop`]; the caller reports them.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] when the operands do not match the
    /// opcode, or for a `move-result*` without a preceding result.
    pub fn lift(&mut self, ins: &DecodedInstruction) -> Result<Option<Instruction>> {
        use Opcode::*;

        let op = ins.opcode;
        let lifted = match op {
            Nop | Unknown => Instruction::Nop,
            Goto | Goto16 | Goto32 => return Ok(None),

            Move | MoveFrom16 | Move16 | MoveWide | MoveWideFrom16 | MoveWide16 | MoveObject
            | MoveObjectFrom16 | MoveObject16 => Instruction::Move {
                lhs: self.reg(ins, 0)?,
                rhs: Expr::Var(self.reg(ins, 1)?),
            },
            MoveResult | MoveResultWide | MoveResultObject => {
                let result = self.last_result.ok_or_else(|| {
                    malformed_error!("{} at {:#x} without a pending result", op, ins.offset)
                })?;
                Instruction::MoveResult {
                    lhs: self.reg(ins, 0)?,
                    rhs: Expr::Var(result),
                }
            }
            MoveException => Instruction::MoveException(self.reg(ins, 0)?),

            ReturnVoid => Instruction::Return(None),
            Return | ReturnWide | ReturnObject => {
                Instruction::Return(Some(Expr::Var(self.reg(ins, 0)?)))
            }

            Const4 | Const16 | Const | ConstHigh16 => {
                let value = Self::literal(ins)?;
                self.assign(ins, Expr::Const(Constant::Int(value as i32)))?
            }
            ConstWide16 | ConstWide32 | ConstWide | ConstWideHigh16 => {
                let value = Self::literal(ins)?;
                self.assign(ins, Expr::Const(Constant::Wide(value)))?
            }
            ConstString | ConstStringJumbo => {
                let value = ins
                    .string()
                    .ok_or_else(|| malformed_error!("{} without string operand", op))?;
                self.assign(ins, Expr::Const(Constant::String(value.to_string())))?
            }
            ConstClass => {
                let ty = Self::type_ref(ins)?;
                self.assign(ins, Expr::Const(Constant::Class(ty)))?
            }

            MonitorEnter => Instruction::MonitorEnter(Expr::Var(self.reg(ins, 0)?)),
            MonitorExit => Instruction::MonitorExit(Expr::Var(self.reg(ins, 0)?)),

            CheckCast => {
                let value = self.reg(ins, 0)?;
                let ty = Self::type_ref(ins)?;
                Instruction::Assign {
                    lhs: Some(value),
                    rhs: Expr::CheckCast {
                        ty,
                        operand: Expr::var(value),
                    },
                }
            }
            InstanceOf => {
                let operand = Expr::var(self.reg(ins, 1)?);
                let ty = Self::type_ref(ins)?;
                self.assign(ins, Expr::InstanceOf { ty, operand })?
            }
            ArrayLength => {
                let array = Expr::var(self.reg(ins, 1)?);
                self.assign(ins, Expr::ArrayLength(array))?
            }
            NewInstance => {
                let ty = Self::type_ref(ins)?;
                self.assign(ins, Expr::NewInstance(ty))?
            }
            NewArray => {
                let size = Expr::var(self.reg(ins, 1)?);
                let ty = Self::type_ref(ins)?;
                self.assign(ins, Expr::NewArray { ty, size })?
            }
            FilledNewArray | FilledNewArrayRange => {
                let ty = Self::type_ref(ins)?;
                let elements = ins
                    .registers()
                    .map(|r| Expr::Var(self.vars.register(r)))
                    .collect();
                let result = self.vars.new_temp(Some(ty.clone()));
                self.last_result = Some(result);
                Instruction::Assign {
                    lhs: Some(result),
                    rhs: Expr::FilledArray { ty, elements },
                }
            }
            FillArrayData => {
                let array = Expr::Var(self.reg(ins, 0)?);
                let (width, data) = ins
                    .operands
                    .iter()
                    .find_map(|o| match o {
                        Operand::ArrayData { width, data } => Some((*width, data.clone())),
                        _ => None,
                    })
                    .ok_or_else(|| malformed_error!("fill-array-data without payload"))?;
                Instruction::FillArrayData { array, width, data }
            }
            Throw => Instruction::Throw(Expr::Var(self.reg(ins, 0)?)),
            PackedSwitch | SparseSwitch => Instruction::Switch(Expr::Var(self.reg(ins, 0)?)),

            CmplFloat | CmpgFloat | CmplDouble | CmpgDouble | CmpLong => {
                let ty = match op {
                    CmplFloat | CmpgFloat => "F",
                    CmplDouble | CmpgDouble => "D",
                    _ => "J",
                };
                let lhs = Expr::var(self.reg(ins, 1)?);
                let rhs = Expr::var(self.reg(ins, 2)?);
                self.assign(
                    ins,
                    Expr::Compare {
                        ty: ty.to_string(),
                        lhs,
                        rhs,
                    },
                )?
            }

            IfEq | IfNe | IfLt | IfGe | IfGt | IfLe => Instruction::IfCompare {
                op: Self::relation(op),
                lhs: Expr::Var(self.reg(ins, 0)?),
                rhs: Expr::Var(self.reg(ins, 1)?),
            },
            IfEqz | IfNez | IfLtz | IfGez | IfGtz | IfLez => Instruction::IfCompareZero {
                op: Self::relation(op),
                operand: Expr::Var(self.reg(ins, 0)?),
            },

            Aget | AgetWide | AgetObject | AgetBoolean | AgetByte | AgetChar | AgetShort => {
                let ty = match op {
                    AgetBoolean => Some("Z"),
                    AgetByte => Some("B"),
                    AgetChar => Some("C"),
                    AgetShort => Some("S"),
                    _ => None,
                };
                let array = Expr::var(self.reg(ins, 1)?);
                let index = Expr::var(self.reg(ins, 2)?);
                self.assign(
                    ins,
                    Expr::ArrayRead {
                        array,
                        index,
                        ty: ty.map(str::to_string),
                    },
                )?
            }
            Aput | AputWide | AputObject | AputBoolean | AputByte | AputChar | AputShort => {
                Instruction::ArrayWrite {
                    value: Expr::Var(self.reg(ins, 0)?),
                    array: Expr::Var(self.reg(ins, 1)?),
                    index: Expr::Var(self.reg(ins, 2)?),
                }
            }

            Iget | IgetWide | IgetObject | IgetBoolean | IgetByte | IgetChar | IgetShort => {
                let object = Expr::var(self.reg(ins, 1)?);
                let field = Self::field(ins)?;
                self.assign(ins, Expr::FieldRead { object, field })?
            }
            Iput | IputWide | IputObject | IputBoolean | IputByte | IputChar | IputShort => {
                Instruction::FieldWrite {
                    value: Expr::Var(self.reg(ins, 0)?),
                    object: Expr::Var(self.reg(ins, 1)?),
                    field: Self::field(ins)?,
                }
            }
            Sget | SgetWide | SgetObject | SgetBoolean | SgetByte | SgetChar | SgetShort => {
                let field = Self::field(ins)?;
                self.assign(ins, Expr::StaticFieldRead(field))?
            }
            Sput | SputWide | SputObject | SputBoolean | SputByte | SputChar | SputShort => {
                Instruction::StaticFieldWrite {
                    value: Expr::Var(self.reg(ins, 0)?),
                    field: Self::field(ins)?,
                }
            }

            InvokeVirtual | InvokeVirtualRange => self.invoke(ins, InvokeKind::Virtual)?,
            InvokeSuper | InvokeSuperRange => self.invoke(ins, InvokeKind::Super)?,
            InvokeDirect | InvokeDirectRange => self.invoke(ins, InvokeKind::Direct)?,
            InvokeStatic | InvokeStaticRange => self.invoke(ins, InvokeKind::Static)?,
            InvokeInterface | InvokeInterfaceRange => self.invoke(ins, InvokeKind::Interface)?,

            NegInt | NotInt | NegLong | NotLong | NegFloat | NegDouble => {
                let (op, ty) = match op {
                    NegInt => (UnaryOp::Neg, "I"),
                    NotInt => (UnaryOp::Not, "I"),
                    NegLong => (UnaryOp::Neg, "J"),
                    NotLong => (UnaryOp::Not, "J"),
                    NegFloat => (UnaryOp::Neg, "F"),
                    _ => (UnaryOp::Neg, "D"),
                };
                let operand = Expr::var(self.reg(ins, 1)?);
                self.assign(
                    ins,
                    Expr::Unary {
                        op,
                        operand,
                        ty: ty.to_string(),
                    },
                )?
            }

            IntToLong | FloatToLong | DoubleToLong => self.cast(ins, "J")?,
            IntToFloat | LongToFloat | DoubleToFloat => self.cast(ins, "F")?,
            IntToDouble | LongToDouble | FloatToDouble => self.cast(ins, "D")?,
            LongToInt | FloatToInt | DoubleToInt => self.cast(ins, "I")?,
            IntToByte => self.cast(ins, "B")?,
            IntToChar => self.cast(ins, "C")?,
            IntToShort => self.cast(ins, "S")?,

            _ => match Self::arithmetic(op) {
                Some((binop, ty, form)) => self.binary(ins, binop, ty, form)?,
                None => Instruction::Nop,
            },
        };
        Ok(Some(lifted))
    }

    fn reg(&mut self, ins: &DecodedInstruction, n: usize) -> Result<VarId> {
        let reg = ins.register(n).ok_or_else(|| {
            malformed_error!(
                "{} at {:#x} is missing register operand {}",
                ins.opcode,
                ins.offset,
                n
            )
        })?;
        Ok(self.vars.register(reg))
    }

    fn literal(ins: &DecodedInstruction) -> Result<i64> {
        ins.literal()
            .ok_or_else(|| malformed_error!("{} at {:#x} without literal", ins.opcode, ins.offset))
    }

    fn type_ref(ins: &DecodedInstruction) -> Result<String> {
        ins.type_ref()
            .map(str::to_string)
            .ok_or_else(|| malformed_error!("{} at {:#x} without type", ins.opcode, ins.offset))
    }

    fn field(ins: &DecodedInstruction) -> Result<crate::input::FieldRef> {
        ins.field()
            .cloned()
            .ok_or_else(|| malformed_error!("{} at {:#x} without field", ins.opcode, ins.offset))
    }

    /// `vA = rhs`
    fn assign(&mut self, ins: &DecodedInstruction, rhs: Expr) -> Result<Instruction> {
        let lhs = self.reg(ins, 0)?;
        Ok(Instruction::Assign {
            lhs: Some(lhs),
            rhs,
        })
    }

    fn cast(&mut self, ins: &DecodedInstruction, ty: &str) -> Result<Instruction> {
        let operand = Expr::var(self.reg(ins, 1)?);
        self.assign(
            ins,
            Expr::Cast {
                ty: ty.to_string(),
                operand,
            },
        )
    }

    fn relation(op: Opcode) -> CondOp {
        use Opcode::*;
        match op {
            IfEq | IfEqz => CondOp::Eq,
            IfNe | IfNez => CondOp::Ne,
            IfLt | IfLtz => CondOp::Lt,
            IfGe | IfGez => CondOp::Ge,
            IfGt | IfGtz => CondOp::Gt,
            _ => CondOp::Le,
        }
    }

    fn invoke(&mut self, ins: &DecodedInstruction, kind: InvokeKind) -> Result<Instruction> {
        let method = ins
            .method()
            .cloned()
            .ok_or_else(|| malformed_error!("{} at {:#x} without method", ins.opcode, ins.offset))?;
        let regs: Vec<u16> = ins.registers().collect();
        let mut next = 0usize;

        let receiver = if kind == InvokeKind::Static {
            None
        } else {
            let reg = *regs.first().ok_or_else(|| {
                malformed_error!("{} at {:#x} without receiver", ins.opcode, ins.offset)
            })?;
            next = 1;
            Some(self.vars.register(reg))
        };

        let mut args = Vec::new();
        for param in method.params() {
            let reg = *regs.get(next).ok_or_else(|| {
                malformed_error!(
                    "{} at {:#x} passes fewer registers than {} expects",
                    ins.opcode,
                    ins.offset,
                    method.descriptor
                )
            })?;
            args.push(Expr::Var(self.vars.register(reg)));
            next += usize::from(descriptor::register_width(&param));
        }

        let ret = method.return_type().to_string();
        let constructs = method.is_constructor()
            && receiver.is_some_and(|r| {
                self.vars
                    .get(r)
                    .is_some_and(|v| !matches!(v.kind, VarKind::This))
            });
        let rhs = Expr::Invoke {
            kind,
            method,
            receiver: receiver.map(Expr::var),
            args,
        };

        let lhs = if constructs {
            receiver
        } else if ret == "V" {
            None
        } else {
            let result = self.vars.new_temp(Some(ret));
            self.last_result = Some(result);
            Some(result)
        };
        Ok(Instruction::Assign { lhs, rhs })
    }

    fn binary(
        &mut self,
        ins: &DecodedInstruction,
        op: BinaryOp,
        ty: &str,
        form: Form,
    ) -> Result<Instruction> {
        let (lhs, rhs) = match form {
            Form::ThreeRegister => (
                Expr::var(self.reg(ins, 1)?),
                Expr::var(self.reg(ins, 2)?),
            ),
            Form::TwoAddress => (
                Expr::var(self.reg(ins, 0)?),
                Expr::var(self.reg(ins, 1)?),
            ),
            Form::Literal => (
                Expr::var(self.reg(ins, 1)?),
                Box::new(Expr::Const(Constant::Int(Self::literal(ins)? as i32))),
            ),
            Form::ReverseLiteral => (
                Box::new(Expr::Const(Constant::Int(Self::literal(ins)? as i32))),
                Expr::var(self.reg(ins, 1)?),
            ),
        };
        self.assign(
            ins,
            Expr::Binary {
                op,
                lhs,
                rhs,
                ty: ty.to_string(),
            },
        )
    }

    fn arithmetic(op: Opcode) -> Option<(BinaryOp, &'static str, Form)> {
        use Opcode::*;
        Some(match op {
            AddInt => (BinaryOp::Add, "I", Form::ThreeRegister),
            SubInt => (BinaryOp::Sub, "I", Form::ThreeRegister),
            MulInt => (BinaryOp::Mul, "I", Form::ThreeRegister),
            DivInt => (BinaryOp::Div, "I", Form::ThreeRegister),
            RemInt => (BinaryOp::Rem, "I", Form::ThreeRegister),
            AndInt => (BinaryOp::And, "I", Form::ThreeRegister),
            OrInt => (BinaryOp::Or, "I", Form::ThreeRegister),
            XorInt => (BinaryOp::Xor, "I", Form::ThreeRegister),
            ShlInt => (BinaryOp::Shl, "I", Form::ThreeRegister),
            ShrInt => (BinaryOp::Shr, "I", Form::ThreeRegister),
            UshrInt => (BinaryOp::Ushr, "I", Form::ThreeRegister),
            AddLong => (BinaryOp::Add, "J", Form::ThreeRegister),
            SubLong => (BinaryOp::Sub, "J", Form::ThreeRegister),
            MulLong => (BinaryOp::Mul, "J", Form::ThreeRegister),
            DivLong => (BinaryOp::Div, "J", Form::ThreeRegister),
            RemLong => (BinaryOp::Rem, "J", Form::ThreeRegister),
            AndLong => (BinaryOp::And, "J", Form::ThreeRegister),
            OrLong => (BinaryOp::Or, "J", Form::ThreeRegister),
            XorLong => (BinaryOp::Xor, "J", Form::ThreeRegister),
            ShlLong => (BinaryOp::Shl, "J", Form::ThreeRegister),
            ShrLong => (BinaryOp::Shr, "J", Form::ThreeRegister),
            UshrLong => (BinaryOp::Ushr, "J", Form::ThreeRegister),
            AddFloat => (BinaryOp::Add, "F", Form::ThreeRegister),
            SubFloat => (BinaryOp::Sub, "F", Form::ThreeRegister),
            MulFloat => (BinaryOp::Mul, "F", Form::ThreeRegister),
            DivFloat => (BinaryOp::Div, "F", Form::ThreeRegister),
            RemFloat => (BinaryOp::Rem, "F", Form::ThreeRegister),
            AddDouble => (BinaryOp::Add, "D", Form::ThreeRegister),
            SubDouble => (BinaryOp::Sub, "D", Form::ThreeRegister),
            MulDouble => (BinaryOp::Mul, "D", Form::ThreeRegister),
            DivDouble => (BinaryOp::Div, "D", Form::ThreeRegister),
            RemDouble => (BinaryOp::Rem, "D", Form::ThreeRegister),
            AddInt2addr => (BinaryOp::Add, "I", Form::TwoAddress),
            SubInt2addr => (BinaryOp::Sub, "I", Form::TwoAddress),
            MulInt2addr => (BinaryOp::Mul, "I", Form::TwoAddress),
            DivInt2addr => (BinaryOp::Div, "I", Form::TwoAddress),
            RemInt2addr => (BinaryOp::Rem, "I", Form::TwoAddress),
            AndInt2addr => (BinaryOp::And, "I", Form::TwoAddress),
            OrInt2addr => (BinaryOp::Or, "I", Form::TwoAddress),
            XorInt2addr => (BinaryOp::Xor, "I", Form::TwoAddress),
            ShlInt2addr => (BinaryOp::Shl, "I", Form::TwoAddress),
            ShrInt2addr => (BinaryOp::Shr, "I", Form::TwoAddress),
            UshrInt2addr => (BinaryOp::Ushr, "I", Form::TwoAddress),
            AddLong2addr => (BinaryOp::Add, "J", Form::TwoAddress),
            SubLong2addr => (BinaryOp::Sub, "J", Form::TwoAddress),
            MulLong2addr => (BinaryOp::Mul, "J", Form::TwoAddress),
            DivLong2addr => (BinaryOp::Div, "J", Form::TwoAddress),
            RemLong2addr => (BinaryOp::Rem, "J", Form::TwoAddress),
            AndLong2addr => (BinaryOp::And, "J", Form::TwoAddress),
            OrLong2addr => (BinaryOp::Or, "J", Form::TwoAddress),
            XorLong2addr => (BinaryOp::Xor, "J", Form::TwoAddress),
            ShlLong2addr => (BinaryOp::Shl, "J", Form::TwoAddress),
            ShrLong2addr => (BinaryOp::Shr, "J", Form::TwoAddress),
            UshrLong2addr => (BinaryOp::Ushr, "J", Form::TwoAddress),
            AddFloat2addr => (BinaryOp::Add, "F", Form::TwoAddress),
            SubFloat2addr => (BinaryOp::Sub, "F", Form::TwoAddress),
            MulFloat2addr => (BinaryOp::Mul, "F", Form::TwoAddress),
            DivFloat2addr => (BinaryOp::Div, "F", Form::TwoAddress),
            RemFloat2addr => (BinaryOp::Rem, "F", Form::TwoAddress),
            AddDouble2addr => (BinaryOp::Add, "D", Form::TwoAddress),
            SubDouble2addr => (BinaryOp::Sub, "D", Form::TwoAddress),
            MulDouble2addr => (BinaryOp::Mul, "D", Form::TwoAddress),
            DivDouble2addr => (BinaryOp::Div, "D", Form::TwoAddress),
            RemDouble2addr => (BinaryOp::Rem, "D", Form::TwoAddress),
            AddIntLit16 => (BinaryOp::Add, "I", Form::Literal),
            RsubInt => (BinaryOp::Sub, "I", Form::ReverseLiteral),
            MulIntLit16 => (BinaryOp::Mul, "I", Form::Literal),
            DivIntLit16 => (BinaryOp::Div, "I", Form::Literal),
            RemIntLit16 => (BinaryOp::Rem, "I", Form::Literal),
            AndIntLit16 => (BinaryOp::And, "I", Form::Literal),
            OrIntLit16 => (BinaryOp::Or, "I", Form::Literal),
            XorIntLit16 => (BinaryOp::Xor, "I", Form::Literal),
            AddIntLit8 => (BinaryOp::Add, "I", Form::Literal),
            RsubIntLit8 => (BinaryOp::Sub, "I", Form::ReverseLiteral),
            MulIntLit8 => (BinaryOp::Mul, "I", Form::Literal),
            DivIntLit8 => (BinaryOp::Div, "I", Form::Literal),
            RemIntLit8 => (BinaryOp::Rem, "I", Form::Literal),
            AndIntLit8 => (BinaryOp::And, "I", Form::Literal),
            OrIntLit8 => (BinaryOp::Or, "I", Form::Literal),
            XorIntLit8 => (BinaryOp::Xor, "I", Form::Literal),
            ShlIntLit8 => (BinaryOp::Shl, "I", Form::Literal),
            ShrIntLit8 => (BinaryOp::Shr, "I", Form::Literal),
            UshrIntLit8 => (BinaryOp::Ushr, "I", Form::Literal),
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{AccessFlags, FieldRef, MethodInfo, MethodRef};

    fn decoded(opcode: Opcode, operands: Vec<Operand>) -> DecodedInstruction {
        DecodedInstruction::new(opcode, operands, 0, 1)
    }

    fn regs(list: &[u16]) -> Vec<Operand> {
        list.iter().map(|r| Operand::Register(*r)).collect()
    }

    #[test]
    fn test_invoke_result_flows_through_temp() {
        let mut vars = VariableTable::new();
        let mut lifter = Lifter::new(&mut vars);

        let mut ops = regs(&[1, 2]);
        ops.push(Operand::Method(MethodRef::new("LFoo;", "get", "(I)I")));
        let call = lifter.lift(&decoded(Opcode::InvokeVirtual, ops)).unwrap().unwrap();
        let tmp = call.lhs().unwrap();

        let mv = lifter
            .lift(&decoded(Opcode::MoveResult, regs(&[0])))
            .unwrap()
            .unwrap();
        assert_eq!(mv.used_vars(), vec![tmp]);
        assert_eq!(vars.name(tmp), "vtmp0");
        assert_eq!(vars.ty(tmp), Some("I"));
    }

    #[test]
    fn test_move_result_without_call_is_malformed() {
        let mut vars = VariableTable::new();
        let mut lifter = Lifter::new(&mut vars);
        let result = lifter.lift(&decoded(Opcode::MoveResult, regs(&[0])));
        assert!(matches!(result, Err(crate::Error::Malformed { .. })));
    }

    #[test]
    fn test_wide_arguments_skip_high_register() {
        let mut vars = VariableTable::new();
        let mut lifter = Lifter::new(&mut vars);
        let mut ops = regs(&[0, 1, 2]);
        ops.push(Operand::Method(MethodRef::new("LFoo;", "f", "(JI)V")));
        let ins = lifter
            .lift(&decoded(Opcode::InvokeStaticRange, ops))
            .unwrap()
            .unwrap();
        assert_eq!(ins.lhs(), None);
        assert_eq!(ins.describe(&vars), "Foo.f(v0, v2)");
    }

    #[test]
    fn test_constructor_redefines_fresh_object_but_not_this() {
        let mut method = MethodInfo::new("LFoo;", "<init>", "()V", AccessFlags::CONSTRUCTOR);
        method.registers = 2;
        let mut vars = VariableTable::for_method(&method);
        let mut lifter = Lifter::new(&mut vars);

        let mut ops = regs(&[0]);
        ops.push(Operand::Method(MethodRef::new("LBar;", "<init>", "()V")));
        let fresh = lifter.lift(&decoded(Opcode::InvokeDirect, ops)).unwrap().unwrap();
        assert!(fresh.lhs().is_some());

        let mut ops = regs(&[1]);
        ops.push(Operand::Method(MethodRef::new("Ljava/lang/Object;", "<init>", "()V")));
        let sup = lifter.lift(&decoded(Opcode::InvokeDirect, ops)).unwrap().unwrap();
        assert_eq!(sup.lhs(), None);
    }

    #[test]
    fn test_arithmetic_forms() {
        let mut vars = VariableTable::new();
        let mut lifter = Lifter::new(&mut vars);

        let two_addr = lifter
            .lift(&decoded(Opcode::AddInt2addr, regs(&[0, 1])))
            .unwrap()
            .unwrap();
        let mut ops = regs(&[2, 3]);
        ops.push(Operand::Literal(10));
        let rsub = lifter.lift(&decoded(Opcode::RsubInt, ops)).unwrap().unwrap();
        let mut ops = regs(&[4, 5]);
        ops.push(Operand::Literal(2));
        let shl = lifter.lift(&decoded(Opcode::ShlIntLit8, ops)).unwrap().unwrap();

        assert_eq!(two_addr.describe(&vars), "v0 = (v0 + v1)");
        assert_eq!(rsub.describe(&vars), "v2 = (10 - v3)");
        assert_eq!(shl.describe(&vars), "v4 = (v5 << 2)");
    }

    #[test]
    fn test_fields_arrays_and_jumps() {
        let mut vars = VariableTable::new();
        let mut lifter = Lifter::new(&mut vars);
        let field = FieldRef::new("LFoo;", "count", "I");

        let mut ops = regs(&[0, 1]);
        ops.push(Operand::Field(field));
        let put = lifter.lift(&decoded(Opcode::Iput, ops)).unwrap().unwrap();
        let get = lifter
            .lift(&decoded(Opcode::AgetBoolean, regs(&[2, 3, 4])))
            .unwrap()
            .unwrap();
        assert!(lifter.lift(&decoded(Opcode::Goto, vec![])).unwrap().is_none());
        assert_eq!(
            lifter.lift(&decoded(Opcode::Unknown, vec![])).unwrap(),
            Some(Instruction::Nop)
        );

        assert_eq!(put.describe(&vars), "v1.count = v0");
        assert_eq!(get.rhs().and_then(|r| r.type_hint(&vars)), Some("Z".to_string()));
    }

    #[test]
    fn test_every_arithmetic_opcode_is_mapped() {
        use strum::IntoEnumIterator;
        for op in Opcode::iter() {
            let m = op.mnemonic();
            let binary = [
                "add-", "sub-", "mul-", "div-", "rem-", "and-", "or-", "xor-", "shl-", "shr-",
                "ushr-", "rsub-",
            ]
            .iter()
            .any(|p| m.starts_with(p));
            assert_eq!(Lifter::arithmetic(op).is_some(), binary, "{m}");
        }
    }
}
