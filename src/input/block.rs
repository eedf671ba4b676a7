//! Basic blocks, decoded instructions and exception tables.
//!
//! These are the structures a container parser fills in. Offsets are in code
//! units (16-bit words) from the start of the method body, exactly like the
//! addresses printed by Dalvik disassemblers.

use serde::{Deserialize, Serialize};

use crate::input::Opcode;

/// Reference to a field: owning class, name and type descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    /// Descriptor of the declaring class (`Lcom/example/Foo;`)
    pub class: String,
    /// Simple field name
    pub name: String,
    /// Type descriptor of the field
    pub ty: String,
}

impl FieldRef {
    /// Creates a field reference.
    pub fn new(class: impl Into<String>, name: impl Into<String>, ty: impl Into<String>) -> Self {
        FieldRef {
            class: class.into(),
            name: name.into(),
            ty: ty.into(),
        }
    }
}

/// Reference to a method: owning class, name and prototype descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    /// Descriptor of the declaring class
    pub class: String,
    /// Method name (`<init>` for constructors)
    pub name: String,
    /// Prototype descriptor, e.g. `(ILjava/lang/String;)V`
    pub descriptor: String,
}

impl MethodRef {
    /// Creates a method reference.
    pub fn new(
        class: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        MethodRef {
            class: class.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }

    /// Parameter type descriptors.
    #[must_use]
    pub fn params(&self) -> Vec<String> {
        crate::input::descriptor::parse_params(&self.descriptor)
    }

    /// Return type descriptor.
    #[must_use]
    pub fn return_type(&self) -> &str {
        crate::input::descriptor::return_type(&self.descriptor)
    }

    /// True for `<init>`.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }
}

/// One operand of a decoded instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    /// A virtual register `vN`
    Register(u16),
    /// A 32-bit (or narrower) literal, already sign extended
    Literal(i64),
    /// A 64-bit literal
    WideLiteral(i64),
    /// A string constant from the string pool
    String(String),
    /// A type descriptor
    Type(String),
    /// A field reference
    Field(FieldRef),
    /// A method reference
    Method(MethodRef),
    /// A branch offset relative to the instruction, in code units
    Offset(i32),
    /// Case keys of a switch payload in case order
    SwitchKeys(Vec<i32>),
    /// Element width and raw little-endian bytes of a `fill-array-data` payload
    ArrayData {
        /// Width of one element in bytes
        width: u16,
        /// Raw payload
        data: Vec<u8>,
    },
}

/// An instruction as handed over by the disassembler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedInstruction {
    /// Mnemonic
    pub opcode: Opcode,
    /// Operands in listing order (destination first)
    pub operands: Vec<Operand>,
    /// Offset of the instruction in code units
    pub offset: u32,
    /// Length of the instruction in code units
    pub length: u32,
    /// Branch offset for jumps, conditional branches and switches
    pub ref_offset: Option<i32>,
}

impl DecodedInstruction {
    /// Creates an instruction without branch reference.
    #[must_use]
    pub fn new(opcode: Opcode, operands: Vec<Operand>, offset: u32, length: u32) -> Self {
        DecodedInstruction {
            opcode,
            operands,
            offset,
            length,
            ref_offset: None,
        }
    }

    /// Absolute target of the branch, if the instruction has one.
    #[must_use]
    pub fn branch_target(&self) -> Option<u32> {
        self.ref_offset
            .and_then(|delta| u32::try_from(i64::from(self.offset) + i64::from(delta)).ok())
    }

    /// Registers in operand order.
    pub fn registers(&self) -> impl Iterator<Item = u16> + '_ {
        self.operands.iter().filter_map(|op| match op {
            Operand::Register(reg) => Some(*reg),
            _ => None,
        })
    }

    /// The `n`-th register operand.
    #[must_use]
    pub fn register(&self, n: usize) -> Option<u16> {
        self.registers().nth(n)
    }

    /// First integer literal operand (narrow or wide).
    #[must_use]
    pub fn literal(&self) -> Option<i64> {
        self.operands.iter().find_map(|op| match op {
            Operand::Literal(v) | Operand::WideLiteral(v) => Some(*v),
            _ => None,
        })
    }

    /// First string operand.
    #[must_use]
    pub fn string(&self) -> Option<&str> {
        self.operands.iter().find_map(|op| match op {
            Operand::String(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// First type operand.
    #[must_use]
    pub fn type_ref(&self) -> Option<&str> {
        self.operands.iter().find_map(|op| match op {
            Operand::Type(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// First field operand.
    #[must_use]
    pub fn field(&self) -> Option<&FieldRef> {
        self.operands.iter().find_map(|op| match op {
            Operand::Field(f) => Some(f),
            _ => None,
        })
    }

    /// First method operand.
    #[must_use]
    pub fn method(&self) -> Option<&MethodRef> {
        self.operands.iter().find_map(|op| match op {
            Operand::Method(m) => Some(m),
            _ => None,
        })
    }

    /// Switch keys, if present.
    #[must_use]
    pub fn switch_keys(&self) -> Option<&[i32]> {
        self.operands.iter().find_map(|op| match op {
            Operand::SwitchKeys(keys) => Some(keys.as_slice()),
            _ => None,
        })
    }
}

/// A straight-line run of instructions with a single entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicBlock {
    /// Display name, usually `<method>-BB@0x<start>`
    pub name: String,
    /// Offset of the first instruction
    pub start: u32,
    /// Offset past the last instruction
    pub end: u32,
    /// Instructions in address order
    pub instructions: Vec<DecodedInstruction>,
    /// Successors as `(branch address, block index)`, in the order the
    /// disassembler reported them
    pub children: Vec<(u32, usize)>,
}

impl BasicBlock {
    /// The terminating instruction.
    #[must_use]
    pub fn last(&self) -> Option<&DecodedInstruction> {
        self.instructions.last()
    }
}

/// One handler of a try range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handler {
    /// Caught type descriptor; `None` for a catch-all
    pub exception_type: Option<String>,
    /// Index of the handler's first block
    pub block: usize,
}

/// A protected address range and its handlers in dispatch order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TryRange {
    /// First protected offset
    pub start: u32,
    /// Offset past the protected range
    pub end: u32,
    /// Handlers in the order the VM tries them
    pub handlers: Vec<Handler>,
}

/// The exception table of a method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionTable {
    /// Protected ranges
    pub ranges: Vec<TryRange>,
}

impl ExceptionTable {
    /// Handlers protecting the block that starts at `offset`, outermost range last.
    pub fn handlers_at(&self, offset: u32) -> impl Iterator<Item = &Handler> + '_ {
        self.ranges
            .iter()
            .filter(move |range| range.start <= offset && offset < range.end)
            .flat_map(|range| range.handlers.iter())
    }

    /// Returns true when the method has no try range.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_target_backwards() {
        let mut ins = DecodedInstruction::new(Opcode::Goto, vec![], 0x10, 1);
        ins.ref_offset = Some(-6);
        assert_eq!(ins.branch_target(), Some(0x0a));

        ins.ref_offset = Some(-0x20);
        assert_eq!(ins.branch_target(), None);
    }

    #[test]
    fn test_operand_accessors() {
        let ins = DecodedInstruction::new(
            Opcode::Iget,
            vec![
                Operand::Register(1),
                Operand::Register(4),
                Operand::Field(FieldRef::new("LFoo;", "count", "I")),
            ],
            0,
            2,
        );
        assert_eq!(ins.register(0), Some(1));
        assert_eq!(ins.register(1), Some(4));
        assert_eq!(ins.register(2), None);
        assert_eq!(ins.field().map(|f| f.name.as_str()), Some("count"));
        assert!(ins.method().is_none());
    }

    #[test]
    fn test_handlers_at_covers_range() {
        let table = ExceptionTable {
            ranges: vec![TryRange {
                start: 2,
                end: 8,
                handlers: vec![
                    Handler {
                        exception_type: Some("Ljava/io/IOException;".into()),
                        block: 3,
                    },
                    Handler {
                        exception_type: None,
                        block: 4,
                    },
                ],
            }],
        };
        assert_eq!(table.handlers_at(2).count(), 2);
        assert_eq!(table.handlers_at(7).count(), 2);
        assert_eq!(table.handlers_at(8).count(), 0);
        assert_eq!(table.handlers_at(0).count(), 0);
    }

    #[test]
    fn test_method_ref_prototype() {
        let m = MethodRef::new("Ljava/lang/Math;", "max", "(II)I");
        assert_eq!(m.params(), vec!["I", "I"]);
        assert_eq!(m.return_type(), "I");
        assert!(!m.is_constructor());
    }
}
