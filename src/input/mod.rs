//! Input model handed over by the container parser.
//!
//! The engine does not read DEX files itself. A parser (or the
//! [`MethodBuilder`] assembler used in tests) provides, per method, the basic
//! blocks with decoded instructions and the exception table, plus the class
//! level metadata needed to print a whole class.
//!
//! # Key Types
//!
//! - [`MethodInfo`] - One method: prototype, flags, register layout, blocks
//! - [`ClassInfo`] - One class: prototype, fields, methods
//! - [`BasicBlock`], [`DecodedInstruction`], [`Operand`] - Code
//! - [`ExceptionTable`] - Try ranges and their handlers
//! - [`Opcode`] - Dalvik mnemonics
//! - [`AccessFlags`] - Access flags with Java keyword rendering

mod block;
mod builder;
pub mod descriptor;
mod flags;
mod opcode;

pub use block::{
    BasicBlock, DecodedInstruction, ExceptionTable, FieldRef, Handler, MethodRef, Operand,
    TryRange,
};
pub use builder::{CodeBuilder, MethodBuilder};
pub use descriptor::DescriptorInterner;
pub use flags::AccessFlags;
pub use opcode::Opcode;

use serde::{Deserialize, Serialize};

/// A method with its code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodInfo {
    /// Descriptor of the declaring class
    pub class: String,
    /// Method name
    pub name: String,
    /// Prototype descriptor, e.g. `(II)I`
    pub descriptor: String,
    /// Access flags
    pub access: AccessFlags,
    /// Number of registers of the frame (`registers_size`)
    pub registers: u16,
    /// Basic blocks, entry block first; empty for native and abstract methods
    pub blocks: Vec<BasicBlock>,
    /// Try ranges of the body
    pub exceptions: ExceptionTable,
}

impl MethodInfo {
    /// Creates a method without code.
    pub fn new(
        class: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
        access: AccessFlags,
    ) -> Self {
        MethodInfo {
            class: class.into(),
            name: name.into(),
            descriptor: descriptor.into(),
            access,
            registers: 0,
            blocks: Vec::new(),
            exceptions: ExceptionTable::default(),
        }
    }

    /// True when the method has a body to decompile.
    #[must_use]
    pub fn has_code(&self) -> bool {
        !self.blocks.is_empty()
    }

    /// True for static methods, which have no receiver register.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.access.contains(AccessFlags::STATIC)
    }

    /// True for `<init>` methods.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }

    /// Parameter type descriptors, receiver excluded.
    #[must_use]
    pub fn params(&self) -> Vec<String> {
        descriptor::parse_params(&self.descriptor)
    }

    /// Return type descriptor.
    #[must_use]
    pub fn return_type(&self) -> &str {
        descriptor::return_type(&self.descriptor)
    }

    /// Registers holding the incoming arguments, receiver first.
    ///
    /// Arguments occupy the last `ins_size` registers of the frame; wide
    /// arguments (`J`, `D`) take two consecutive registers and are named after
    /// the first one. The type is `None` for the receiver.
    #[must_use]
    pub fn param_registers(&self) -> Vec<(u16, Option<String>)> {
        let params = self.params();
        let receiver = u16::from(!self.is_static());
        let ins: u16 = receiver
            + params
                .iter()
                .map(|p| descriptor::register_width(p))
                .sum::<u16>();
        let mut register = self.registers.saturating_sub(ins);

        let mut result = Vec::with_capacity(params.len() + 1);
        if receiver == 1 {
            result.push((register, None));
            register += 1;
        }
        for param in params {
            let width = descriptor::register_width(&param);
            result.push((register, Some(param)));
            register += width;
        }
        result
    }

    /// `Lcom/example/Foo;->name(desc)` form used in logs and events.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}->{}{}", self.class, self.name, self.descriptor)
    }
}

/// Constant initial value of a static field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// `boolean`
    Boolean(bool),
    /// `byte`, printed in hex
    Byte(i8),
    /// `short`
    Short(i16),
    /// `char`
    Char(u16),
    /// `int`
    Int(i32),
    /// `long`
    Long(i64),
    /// `float`
    Float(f32),
    /// `double`
    Double(f64),
    /// `String`
    String(String),
    /// Class literal, as a type descriptor
    Type(String),
    /// `null`
    Null,
}

impl FieldValue {
    /// Java source spelling of the value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dexscope::input::FieldValue;
    ///
    /// assert_eq!(FieldValue::String("a\"b\n".into()).to_java(), "\"a\\\"b\\n\"");
    /// assert_eq!(FieldValue::Byte(-1).to_java(), "0xff");
    /// assert_eq!(FieldValue::Long(3).to_java(), "3L");
    /// ```
    #[must_use]
    pub fn to_java(&self) -> String {
        match self {
            FieldValue::Boolean(v) => v.to_string(),
            FieldValue::Byte(v) => format!("{:#x}", *v as u8),
            FieldValue::Short(v) => v.to_string(),
            FieldValue::Char(v) => match char::from_u32(u32::from(*v)) {
                Some(c) if !c.is_control() => format!("'{}'", escape_char(c, '\'')),
                _ => format!("'\\u{v:04x}'"),
            },
            FieldValue::Int(v) => v.to_string(),
            FieldValue::Long(v) => format!("{v}L"),
            FieldValue::Float(v) => format!("{v:?}F"),
            FieldValue::Double(v) => format!("{v:?}"),
            FieldValue::String(s) => quote_string(s),
            FieldValue::Type(t) => format!("{}.class", descriptor::java_type(t)),
            FieldValue::Null => "null".to_string(),
        }
    }
}

/// Quotes and escapes a string literal for Java source.
#[must_use]
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        out.push_str(&escape_char(c, '"'));
    }
    out.push('"');
    out
}

fn escape_char(c: char, quote: char) -> String {
    match c {
        '\\' => "\\\\".to_string(),
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        '\t' => "\\t".to_string(),
        '\0' => "\\0".to_string(),
        c if c == quote => format!("\\{c}"),
        c if c.is_control() => format!("\\u{:04x}", c as u32),
        c => c.to_string(),
    }
}

/// A field declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Field name
    pub name: String,
    /// Type descriptor
    pub ty: String,
    /// Access flags
    pub access: AccessFlags,
    /// Static initial value, if any
    pub value: Option<FieldValue>,
}

/// A class with its members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassInfo {
    /// Class descriptor, e.g. `Lcom/example/Foo;`
    pub descriptor: String,
    /// Access flags
    pub access: AccessFlags,
    /// Superclass descriptor
    pub superclass: Option<String>,
    /// Implemented interface descriptors
    pub interfaces: Vec<String>,
    /// Declared fields
    pub fields: Vec<FieldInfo>,
    /// Declared methods, in declaration order
    pub methods: Vec<MethodInfo>,
}

impl ClassInfo {
    /// Creates a class without members extending `java.lang.Object`.
    pub fn new(descriptor: impl Into<String>, access: AccessFlags) -> Self {
        ClassInfo {
            descriptor: descriptor.into(),
            access,
            superclass: Some("Ljava/lang/Object;".to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// True for interfaces and annotation types.
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.access.contains(AccessFlags::INTERFACE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_registers_instance_with_wide() {
        let mut method = MethodInfo::new("LFoo;", "f", "(JI)V", AccessFlags::PUBLIC);
        method.registers = 6;

        // ins = this + J(2) + I = 4, so arguments start at v2
        assert_eq!(
            method.param_registers(),
            vec![
                (2, None),
                (3, Some("J".to_string())),
                (5, Some("I".to_string()))
            ]
        );
    }

    #[test]
    fn test_param_registers_static() {
        let mut method = MethodInfo::new("LFoo;", "max", "(II)I", AccessFlags::STATIC);
        method.registers = 2;
        assert_eq!(
            method.param_registers(),
            vec![(0, Some("I".to_string())), (1, Some("I".to_string()))]
        );
        assert_eq!(method.return_type(), "I");
        assert_eq!(method.full_name(), "LFoo;->max(II)I");
    }

    #[test]
    fn test_field_value_rendering() {
        assert_eq!(FieldValue::Char(u16::from(b'a')).to_java(), "'a'");
        assert_eq!(FieldValue::Char(u16::from(b'\'')).to_java(), "'\\''");
        assert_eq!(FieldValue::Float(1.5).to_java(), "1.5F");
        assert_eq!(FieldValue::Double(2.0).to_java(), "2.0");
        assert_eq!(FieldValue::Type("[I".into()).to_java(), "int[].class");
        assert_eq!(FieldValue::Null.to_java(), "null");
    }

    #[test]
    fn test_quote_string_escapes_control() {
        assert_eq!(quote_string("a\tb\\"), "\"a\\tb\\\\\"");
        assert_eq!(quote_string("\u{1}"), "\"\\u0001\"");
    }
}
