//! Dalvik opcode mnemonics.
//!
//! The container parser hands instructions over by mnemonic. [`Opcode`] is the
//! closed set of mnemonics the lifter understands; anything else parses to
//! [`Opcode::Unknown`] and is lifted as a no-op with an event.
//!
//! # Examples
//!
//! ```rust
//! use dexscope::input::Opcode;
//!
//! let op = Opcode::parse("add-int/2addr");
//! assert_eq!(op, Opcode::AddInt2addr);
//! assert_eq!(op.to_string(), "add-int/2addr");
//! assert_eq!(Opcode::parse("invoke-polymorphic"), Opcode::Unknown);
//! ```

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// A Dalvik instruction mnemonic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, IntoStaticStr, EnumIter,
)]
pub enum Opcode {
    /// `nop`
    #[strum(serialize = "nop")]
    Nop,
    /// `move`
    #[strum(serialize = "move")]
    Move,
    /// `move/from16`
    #[strum(serialize = "move/from16")]
    MoveFrom16,
    /// `move/16`
    #[strum(serialize = "move/16")]
    Move16,
    /// `move-wide`
    #[strum(serialize = "move-wide")]
    MoveWide,
    /// `move-wide/from16`
    #[strum(serialize = "move-wide/from16")]
    MoveWideFrom16,
    /// `move-wide/16`
    #[strum(serialize = "move-wide/16")]
    MoveWide16,
    /// `move-object`
    #[strum(serialize = "move-object")]
    MoveObject,
    /// `move-object/from16`
    #[strum(serialize = "move-object/from16")]
    MoveObjectFrom16,
    /// `move-object/16`
    #[strum(serialize = "move-object/16")]
    MoveObject16,
    /// `move-result`
    #[strum(serialize = "move-result")]
    MoveResult,
    /// `move-result-wide`
    #[strum(serialize = "move-result-wide")]
    MoveResultWide,
    /// `move-result-object`
    #[strum(serialize = "move-result-object")]
    MoveResultObject,
    /// `move-exception`
    #[strum(serialize = "move-exception")]
    MoveException,
    /// `return-void`
    #[strum(serialize = "return-void")]
    ReturnVoid,
    /// `return`
    #[strum(serialize = "return")]
    Return,
    /// `return-wide`
    #[strum(serialize = "return-wide")]
    ReturnWide,
    /// `return-object`
    #[strum(serialize = "return-object")]
    ReturnObject,
    /// `const/4`
    #[strum(serialize = "const/4")]
    Const4,
    /// `const/16`
    #[strum(serialize = "const/16")]
    Const16,
    /// `const`
    #[strum(serialize = "const")]
    Const,
    /// `const/high16`
    #[strum(serialize = "const/high16")]
    ConstHigh16,
    /// `const-wide/16`
    #[strum(serialize = "const-wide/16")]
    ConstWide16,
    /// `const-wide/32`
    #[strum(serialize = "const-wide/32")]
    ConstWide32,
    /// `const-wide`
    #[strum(serialize = "const-wide")]
    ConstWide,
    /// `const-wide/high16`
    #[strum(serialize = "const-wide/high16")]
    ConstWideHigh16,
    /// `const-string`
    #[strum(serialize = "const-string")]
    ConstString,
    /// `const-string/jumbo`
    #[strum(serialize = "const-string/jumbo")]
    ConstStringJumbo,
    /// `const-class`
    #[strum(serialize = "const-class")]
    ConstClass,
    /// `monitor-enter`
    #[strum(serialize = "monitor-enter")]
    MonitorEnter,
    /// `monitor-exit`
    #[strum(serialize = "monitor-exit")]
    MonitorExit,
    /// `check-cast`
    #[strum(serialize = "check-cast")]
    CheckCast,
    /// `instance-of`
    #[strum(serialize = "instance-of")]
    InstanceOf,
    /// `array-length`
    #[strum(serialize = "array-length")]
    ArrayLength,
    /// `new-instance`
    #[strum(serialize = "new-instance")]
    NewInstance,
    /// `new-array`
    #[strum(serialize = "new-array")]
    NewArray,
    /// `filled-new-array`
    #[strum(serialize = "filled-new-array")]
    FilledNewArray,
    /// `filled-new-array/range`
    #[strum(serialize = "filled-new-array/range")]
    FilledNewArrayRange,
    /// `fill-array-data`
    #[strum(serialize = "fill-array-data")]
    FillArrayData,
    /// `throw`
    #[strum(serialize = "throw")]
    Throw,
    /// `goto`
    #[strum(serialize = "goto")]
    Goto,
    /// `goto/16`
    #[strum(serialize = "goto/16")]
    Goto16,
    /// `goto/32`
    #[strum(serialize = "goto/32")]
    Goto32,
    /// `packed-switch`
    #[strum(serialize = "packed-switch")]
    PackedSwitch,
    /// `sparse-switch`
    #[strum(serialize = "sparse-switch")]
    SparseSwitch,
    /// `cmpl-float`
    #[strum(serialize = "cmpl-float")]
    CmplFloat,
    /// `cmpg-float`
    #[strum(serialize = "cmpg-float")]
    CmpgFloat,
    /// `cmpl-double`
    #[strum(serialize = "cmpl-double")]
    CmplDouble,
    /// `cmpg-double`
    #[strum(serialize = "cmpg-double")]
    CmpgDouble,
    /// `cmp-long`
    #[strum(serialize = "cmp-long")]
    CmpLong,
    /// `if-eq`
    #[strum(serialize = "if-eq")]
    IfEq,
    /// `if-ne`
    #[strum(serialize = "if-ne")]
    IfNe,
    /// `if-lt`
    #[strum(serialize = "if-lt")]
    IfLt,
    /// `if-ge`
    #[strum(serialize = "if-ge")]
    IfGe,
    /// `if-gt`
    #[strum(serialize = "if-gt")]
    IfGt,
    /// `if-le`
    #[strum(serialize = "if-le")]
    IfLe,
    /// `if-eqz`
    #[strum(serialize = "if-eqz")]
    IfEqz,
    /// `if-nez`
    #[strum(serialize = "if-nez")]
    IfNez,
    /// `if-ltz`
    #[strum(serialize = "if-ltz")]
    IfLtz,
    /// `if-gez`
    #[strum(serialize = "if-gez")]
    IfGez,
    /// `if-gtz`
    #[strum(serialize = "if-gtz")]
    IfGtz,
    /// `if-lez`
    #[strum(serialize = "if-lez")]
    IfLez,
    /// `aget`
    #[strum(serialize = "aget")]
    Aget,
    /// `aget-wide`
    #[strum(serialize = "aget-wide")]
    AgetWide,
    /// `aget-object`
    #[strum(serialize = "aget-object")]
    AgetObject,
    /// `aget-boolean`
    #[strum(serialize = "aget-boolean")]
    AgetBoolean,
    /// `aget-byte`
    #[strum(serialize = "aget-byte")]
    AgetByte,
    /// `aget-char`
    #[strum(serialize = "aget-char")]
    AgetChar,
    /// `aget-short`
    #[strum(serialize = "aget-short")]
    AgetShort,
    /// `aput`
    #[strum(serialize = "aput")]
    Aput,
    /// `aput-wide`
    #[strum(serialize = "aput-wide")]
    AputWide,
    /// `aput-object`
    #[strum(serialize = "aput-object")]
    AputObject,
    /// `aput-boolean`
    #[strum(serialize = "aput-boolean")]
    AputBoolean,
    /// `aput-byte`
    #[strum(serialize = "aput-byte")]
    AputByte,
    /// `aput-char`
    #[strum(serialize = "aput-char")]
    AputChar,
    /// `aput-short`
    #[strum(serialize = "aput-short")]
    AputShort,
    /// `iget`
    #[strum(serialize = "iget")]
    Iget,
    /// `iget-wide`
    #[strum(serialize = "iget-wide")]
    IgetWide,
    /// `iget-object`
    #[strum(serialize = "iget-object")]
    IgetObject,
    /// `iget-boolean`
    #[strum(serialize = "iget-boolean")]
    IgetBoolean,
    /// `iget-byte`
    #[strum(serialize = "iget-byte")]
    IgetByte,
    /// `iget-char`
    #[strum(serialize = "iget-char")]
    IgetChar,
    /// `iget-short`
    #[strum(serialize = "iget-short")]
    IgetShort,
    /// `iput`
    #[strum(serialize = "iput")]
    Iput,
    /// `iput-wide`
    #[strum(serialize = "iput-wide")]
    IputWide,
    /// `iput-object`
    #[strum(serialize = "iput-object")]
    IputObject,
    /// `iput-boolean`
    #[strum(serialize = "iput-boolean")]
    IputBoolean,
    /// `iput-byte`
    #[strum(serialize = "iput-byte")]
    IputByte,
    /// `iput-char`
    #[strum(serialize = "iput-char")]
    IputChar,
    /// `iput-short`
    #[strum(serialize = "iput-short")]
    IputShort,
    /// `sget`
    #[strum(serialize = "sget")]
    Sget,
    /// `sget-wide`
    #[strum(serialize = "sget-wide")]
    SgetWide,
    /// `sget-object`
    #[strum(serialize = "sget-object")]
    SgetObject,
    /// `sget-boolean`
    #[strum(serialize = "sget-boolean")]
    SgetBoolean,
    /// `sget-byte`
    #[strum(serialize = "sget-byte")]
    SgetByte,
    /// `sget-char`
    #[strum(serialize = "sget-char")]
    SgetChar,
    /// `sget-short`
    #[strum(serialize = "sget-short")]
    SgetShort,
    /// `sput`
    #[strum(serialize = "sput")]
    Sput,
    /// `sput-wide`
    #[strum(serialize = "sput-wide")]
    SputWide,
    /// `sput-object`
    #[strum(serialize = "sput-object")]
    SputObject,
    /// `sput-boolean`
    #[strum(serialize = "sput-boolean")]
    SputBoolean,
    /// `sput-byte`
    #[strum(serialize = "sput-byte")]
    SputByte,
    /// `sput-char`
    #[strum(serialize = "sput-char")]
    SputChar,
    /// `sput-short`
    #[strum(serialize = "sput-short")]
    SputShort,
    /// `invoke-virtual`
    #[strum(serialize = "invoke-virtual")]
    InvokeVirtual,
    /// `invoke-super`
    #[strum(serialize = "invoke-super")]
    InvokeSuper,
    /// `invoke-direct`
    #[strum(serialize = "invoke-direct")]
    InvokeDirect,
    /// `invoke-static`
    #[strum(serialize = "invoke-static")]
    InvokeStatic,
    /// `invoke-interface`
    #[strum(serialize = "invoke-interface")]
    InvokeInterface,
    /// `invoke-virtual/range`
    #[strum(serialize = "invoke-virtual/range")]
    InvokeVirtualRange,
    /// `invoke-super/range`
    #[strum(serialize = "invoke-super/range")]
    InvokeSuperRange,
    /// `invoke-direct/range`
    #[strum(serialize = "invoke-direct/range")]
    InvokeDirectRange,
    /// `invoke-static/range`
    #[strum(serialize = "invoke-static/range")]
    InvokeStaticRange,
    /// `invoke-interface/range`
    #[strum(serialize = "invoke-interface/range")]
    InvokeInterfaceRange,
    /// `neg-int`
    #[strum(serialize = "neg-int")]
    NegInt,
    /// `not-int`
    #[strum(serialize = "not-int")]
    NotInt,
    /// `neg-long`
    #[strum(serialize = "neg-long")]
    NegLong,
    /// `not-long`
    #[strum(serialize = "not-long")]
    NotLong,
    /// `neg-float`
    #[strum(serialize = "neg-float")]
    NegFloat,
    /// `neg-double`
    #[strum(serialize = "neg-double")]
    NegDouble,
    /// `int-to-long`
    #[strum(serialize = "int-to-long")]
    IntToLong,
    /// `int-to-float`
    #[strum(serialize = "int-to-float")]
    IntToFloat,
    /// `int-to-double`
    #[strum(serialize = "int-to-double")]
    IntToDouble,
    /// `long-to-int`
    #[strum(serialize = "long-to-int")]
    LongToInt,
    /// `long-to-float`
    #[strum(serialize = "long-to-float")]
    LongToFloat,
    /// `long-to-double`
    #[strum(serialize = "long-to-double")]
    LongToDouble,
    /// `float-to-int`
    #[strum(serialize = "float-to-int")]
    FloatToInt,
    /// `float-to-long`
    #[strum(serialize = "float-to-long")]
    FloatToLong,
    /// `float-to-double`
    #[strum(serialize = "float-to-double")]
    FloatToDouble,
    /// `double-to-int`
    #[strum(serialize = "double-to-int")]
    DoubleToInt,
    /// `double-to-long`
    #[strum(serialize = "double-to-long")]
    DoubleToLong,
    /// `double-to-float`
    #[strum(serialize = "double-to-float")]
    DoubleToFloat,
    /// `int-to-byte`
    #[strum(serialize = "int-to-byte")]
    IntToByte,
    /// `int-to-char`
    #[strum(serialize = "int-to-char")]
    IntToChar,
    /// `int-to-short`
    #[strum(serialize = "int-to-short")]
    IntToShort,
    /// `add-int`
    #[strum(serialize = "add-int")]
    AddInt,
    /// `sub-int`
    #[strum(serialize = "sub-int")]
    SubInt,
    /// `mul-int`
    #[strum(serialize = "mul-int")]
    MulInt,
    /// `div-int`
    #[strum(serialize = "div-int")]
    DivInt,
    /// `rem-int`
    #[strum(serialize = "rem-int")]
    RemInt,
    /// `and-int`
    #[strum(serialize = "and-int")]
    AndInt,
    /// `or-int`
    #[strum(serialize = "or-int")]
    OrInt,
    /// `xor-int`
    #[strum(serialize = "xor-int")]
    XorInt,
    /// `shl-int`
    #[strum(serialize = "shl-int")]
    ShlInt,
    /// `shr-int`
    #[strum(serialize = "shr-int")]
    ShrInt,
    /// `ushr-int`
    #[strum(serialize = "ushr-int")]
    UshrInt,
    /// `add-long`
    #[strum(serialize = "add-long")]
    AddLong,
    /// `sub-long`
    #[strum(serialize = "sub-long")]
    SubLong,
    /// `mul-long`
    #[strum(serialize = "mul-long")]
    MulLong,
    /// `div-long`
    #[strum(serialize = "div-long")]
    DivLong,
    /// `rem-long`
    #[strum(serialize = "rem-long")]
    RemLong,
    /// `and-long`
    #[strum(serialize = "and-long")]
    AndLong,
    /// `or-long`
    #[strum(serialize = "or-long")]
    OrLong,
    /// `xor-long`
    #[strum(serialize = "xor-long")]
    XorLong,
    /// `shl-long`
    #[strum(serialize = "shl-long")]
    ShlLong,
    /// `shr-long`
    #[strum(serialize = "shr-long")]
    ShrLong,
    /// `ushr-long`
    #[strum(serialize = "ushr-long")]
    UshrLong,
    /// `add-float`
    #[strum(serialize = "add-float")]
    AddFloat,
    /// `sub-float`
    #[strum(serialize = "sub-float")]
    SubFloat,
    /// `mul-float`
    #[strum(serialize = "mul-float")]
    MulFloat,
    /// `div-float`
    #[strum(serialize = "div-float")]
    DivFloat,
    /// `rem-float`
    #[strum(serialize = "rem-float")]
    RemFloat,
    /// `add-double`
    #[strum(serialize = "add-double")]
    AddDouble,
    /// `sub-double`
    #[strum(serialize = "sub-double")]
    SubDouble,
    /// `mul-double`
    #[strum(serialize = "mul-double")]
    MulDouble,
    /// `div-double`
    #[strum(serialize = "div-double")]
    DivDouble,
    /// `rem-double`
    #[strum(serialize = "rem-double")]
    RemDouble,
    /// `add-int/2addr`
    #[strum(serialize = "add-int/2addr")]
    AddInt2addr,
    /// `sub-int/2addr`
    #[strum(serialize = "sub-int/2addr")]
    SubInt2addr,
    /// `mul-int/2addr`
    #[strum(serialize = "mul-int/2addr")]
    MulInt2addr,
    /// `div-int/2addr`
    #[strum(serialize = "div-int/2addr")]
    DivInt2addr,
    /// `rem-int/2addr`
    #[strum(serialize = "rem-int/2addr")]
    RemInt2addr,
    /// `and-int/2addr`
    #[strum(serialize = "and-int/2addr")]
    AndInt2addr,
    /// `or-int/2addr`
    #[strum(serialize = "or-int/2addr")]
    OrInt2addr,
    /// `xor-int/2addr`
    #[strum(serialize = "xor-int/2addr")]
    XorInt2addr,
    /// `shl-int/2addr`
    #[strum(serialize = "shl-int/2addr")]
    ShlInt2addr,
    /// `shr-int/2addr`
    #[strum(serialize = "shr-int/2addr")]
    ShrInt2addr,
    /// `ushr-int/2addr`
    #[strum(serialize = "ushr-int/2addr")]
    UshrInt2addr,
    /// `add-long/2addr`
    #[strum(serialize = "add-long/2addr")]
    AddLong2addr,
    /// `sub-long/2addr`
    #[strum(serialize = "sub-long/2addr")]
    SubLong2addr,
    /// `mul-long/2addr`
    #[strum(serialize = "mul-long/2addr")]
    MulLong2addr,
    /// `div-long/2addr`
    #[strum(serialize = "div-long/2addr")]
    DivLong2addr,
    /// `rem-long/2addr`
    #[strum(serialize = "rem-long/2addr")]
    RemLong2addr,
    /// `and-long/2addr`
    #[strum(serialize = "and-long/2addr")]
    AndLong2addr,
    /// `or-long/2addr`
    #[strum(serialize = "or-long/2addr")]
    OrLong2addr,
    /// `xor-long/2addr`
    #[strum(serialize = "xor-long/2addr")]
    XorLong2addr,
    /// `shl-long/2addr`
    #[strum(serialize = "shl-long/2addr")]
    ShlLong2addr,
    /// `shr-long/2addr`
    #[strum(serialize = "shr-long/2addr")]
    ShrLong2addr,
    /// `ushr-long/2addr`
    #[strum(serialize = "ushr-long/2addr")]
    UshrLong2addr,
    /// `add-float/2addr`
    #[strum(serialize = "add-float/2addr")]
    AddFloat2addr,
    /// `sub-float/2addr`
    #[strum(serialize = "sub-float/2addr")]
    SubFloat2addr,
    /// `mul-float/2addr`
    #[strum(serialize = "mul-float/2addr")]
    MulFloat2addr,
    /// `div-float/2addr`
    #[strum(serialize = "div-float/2addr")]
    DivFloat2addr,
    /// `rem-float/2addr`
    #[strum(serialize = "rem-float/2addr")]
    RemFloat2addr,
    /// `add-double/2addr`
    #[strum(serialize = "add-double/2addr")]
    AddDouble2addr,
    /// `sub-double/2addr`
    #[strum(serialize = "sub-double/2addr")]
    SubDouble2addr,
    /// `mul-double/2addr`
    #[strum(serialize = "mul-double/2addr")]
    MulDouble2addr,
    /// `div-double/2addr`
    #[strum(serialize = "div-double/2addr")]
    DivDouble2addr,
    /// `rem-double/2addr`
    #[strum(serialize = "rem-double/2addr")]
    RemDouble2addr,
    /// `add-int/lit16`
    #[strum(serialize = "add-int/lit16")]
    AddIntLit16,
    /// `rsub-int`
    #[strum(serialize = "rsub-int")]
    RsubInt,
    /// `mul-int/lit16`
    #[strum(serialize = "mul-int/lit16")]
    MulIntLit16,
    /// `div-int/lit16`
    #[strum(serialize = "div-int/lit16")]
    DivIntLit16,
    /// `rem-int/lit16`
    #[strum(serialize = "rem-int/lit16")]
    RemIntLit16,
    /// `and-int/lit16`
    #[strum(serialize = "and-int/lit16")]
    AndIntLit16,
    /// `or-int/lit16`
    #[strum(serialize = "or-int/lit16")]
    OrIntLit16,
    /// `xor-int/lit16`
    #[strum(serialize = "xor-int/lit16")]
    XorIntLit16,
    /// `add-int/lit8`
    #[strum(serialize = "add-int/lit8")]
    AddIntLit8,
    /// `rsub-int/lit8`
    #[strum(serialize = "rsub-int/lit8")]
    RsubIntLit8,
    /// `mul-int/lit8`
    #[strum(serialize = "mul-int/lit8")]
    MulIntLit8,
    /// `div-int/lit8`
    #[strum(serialize = "div-int/lit8")]
    DivIntLit8,
    /// `rem-int/lit8`
    #[strum(serialize = "rem-int/lit8")]
    RemIntLit8,
    /// `and-int/lit8`
    #[strum(serialize = "and-int/lit8")]
    AndIntLit8,
    /// `or-int/lit8`
    #[strum(serialize = "or-int/lit8")]
    OrIntLit8,
    /// `xor-int/lit8`
    #[strum(serialize = "xor-int/lit8")]
    XorIntLit8,
    /// `shl-int/lit8`
    #[strum(serialize = "shl-int/lit8")]
    ShlIntLit8,
    /// `shr-int/lit8`
    #[strum(serialize = "shr-int/lit8")]
    ShrIntLit8,
    /// `ushr-int/lit8`
    #[strum(serialize = "ushr-int/lit8")]
    UshrIntLit8,
    /// Any mnemonic outside the supported set.
    #[strum(serialize = "unknown")]
    Unknown,
}

impl Opcode {
    /// Parses a mnemonic, mapping unsupported ones to [`Opcode::Unknown`].
    #[must_use]
    pub fn parse(mnemonic: &str) -> Opcode {
        Opcode::from_str(mnemonic.trim()).unwrap_or(Opcode::Unknown)
    }

    /// Returns the mnemonic as written in disassembly listings.
    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        self.into()
    }

    /// `return-void`, `return`, `return-wide`, `return-object`.
    #[must_use]
    pub fn is_return(self) -> bool {
        matches!(
            self,
            Opcode::ReturnVoid | Opcode::Return | Opcode::ReturnWide | Opcode::ReturnObject
        )
    }

    /// `packed-switch` and `sparse-switch`.
    #[must_use]
    pub fn is_switch(self) -> bool {
        matches!(self, Opcode::PackedSwitch | Opcode::SparseSwitch)
    }

    /// Two-way conditional branches (`if-*` and `if-*z`).
    #[must_use]
    pub fn is_conditional(self) -> bool {
        matches!(
            self,
            Opcode::IfEq
                | Opcode::IfNe
                | Opcode::IfLt
                | Opcode::IfGe
                | Opcode::IfGt
                | Opcode::IfLe
                | Opcode::IfEqz
                | Opcode::IfNez
                | Opcode::IfLtz
                | Opcode::IfGez
                | Opcode::IfGtz
                | Opcode::IfLez
        )
    }

    /// `throw`.
    #[must_use]
    pub fn is_throw(self) -> bool {
        self == Opcode::Throw
    }

    /// Unconditional jumps of any width.
    #[must_use]
    pub fn is_goto(self) -> bool {
        matches!(self, Opcode::Goto | Opcode::Goto16 | Opcode::Goto32)
    }

    /// All `invoke-*` forms, ranged or not.
    #[must_use]
    pub fn is_invoke(self) -> bool {
        matches!(
            self,
            Opcode::InvokeVirtual
                | Opcode::InvokeSuper
                | Opcode::InvokeDirect
                | Opcode::InvokeStatic
                | Opcode::InvokeInterface
                | Opcode::InvokeVirtualRange
                | Opcode::InvokeSuperRange
                | Opcode::InvokeDirectRange
                | Opcode::InvokeStaticRange
                | Opcode::InvokeInterfaceRange
        )
    }

    /// `move-result`, `move-result-wide`, `move-result-object`.
    #[must_use]
    pub fn is_move_result(self) -> bool {
        matches!(
            self,
            Opcode::MoveResult | Opcode::MoveResultWide | Opcode::MoveResultObject
        )
    }
}

impl Serialize for Opcode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.mnemonic())
    }
}

impl<'de> Deserialize<'de> for Opcode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mnemonic = String::deserialize(deserializer)?;
        Ok(Opcode::parse(&mnemonic))
    }
}
