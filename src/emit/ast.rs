//! Serializable syntax tree of decompiled code.
//!
//! Statements and expressions are internally tagged with a `type` field, so a
//! method body serializes to JSON like
//!
//! ```json
//! {"type": "ReturnStatement", "value": {"type": "Local", "name": "p1"}}
//! ```
//!
//! Operator precedence is explicit: the emitter inserts [`Expression::Parenthesis`]
//! nodes wherever the text form needs them, and the text renderer never adds
//! parentheses on its own.

use serde::{Deserialize, Serialize};

/// `(class, name, descriptor)` of a referenced member, class in internal form
/// (`java/lang/String`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triple {
    /// Internal name of the declaring class
    pub class: String,
    /// Member name
    pub name: String,
    /// Member type or prototype descriptor
    pub descriptor: String,
}

impl Triple {
    /// Builds a triple from a class descriptor (`Lfoo/Bar;`).
    pub fn new(class: &str, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        let internal = class
            .strip_prefix('L')
            .and_then(|c| c.strip_suffix(';'))
            .unwrap_or(class);
        Triple {
            class: internal.to_string(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

/// A type in source spelling with its array dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeName {
    /// Element type, `int` or `java.lang.String`
    pub name: String,
    /// Number of `[]`
    pub dim: usize,
}

impl TypeName {
    /// Source spelling including dimensions.
    #[must_use]
    pub fn spelling(&self) -> String {
        let mut out = self.name.clone();
        for _ in 0..self.dim {
            out.push_str("[]");
        }
        out
    }
}

/// `type name` pair of a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarDecl {
    /// Declared type
    pub ty: TypeName,
    /// Variable name
    pub name: String,
}

/// A braced statement list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Statements in order
    pub statements: Vec<Statement>,
}

/// One arm of a switch statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    /// Literal labels
    pub keys: Vec<i32>,
    /// Also labelled `default`
    pub is_default: bool,
    /// Body, including its `break`
    pub body: Block,
}

/// One handler of a try statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    /// Caught type and binding (`_` when the handler ignores the exception)
    pub decl: VarDecl,
    /// Handler body
    pub body: Block,
}

/// `break`, `continue` or a jump to a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JumpKind {
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// Jump to a label, for flow no loop or conditional covers
    Goto,
}

/// Statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Statement {
    /// Nested block
    BlockStatement(Block),
    /// `if (condition) { ... } else { ... }`
    IfStatement {
        /// Condition
        condition: Expression,
        /// Taken branch
        then_block: Block,
        /// Other branch
        else_block: Option<Block>,
    },
    /// `while (condition) { ... }`
    WhileStatement {
        /// Loop condition
        condition: Expression,
        /// Body
        body: Block,
    },
    /// `do { ... } while (condition);`
    DoStatement {
        /// Loop condition
        condition: Expression,
        /// Body
        body: Block,
    },
    /// `switch (selector) { ... }`
    SwitchStatement {
        /// Switched value
        selector: Expression,
        /// Arms in source order
        cases: Vec<SwitchCase>,
    },
    /// `try { ... } catch (...) { ... }`
    TryStatement {
        /// Protected body
        body: Block,
        /// Handlers in order
        catches: Vec<CatchClause>,
    },
    /// `return` or `return value`
    ReturnStatement {
        /// Returned value
        value: Option<Expression>,
    },
    /// `throw value`
    ThrowStatement {
        /// Thrown value
        value: Expression,
    },
    /// Expression evaluated for its effect
    ExpressionStatement {
        /// The expression
        expression: Expression,
    },
    /// `type name` or `type name = init`
    LocalDeclarationStatement {
        /// Declared variable
        decl: VarDecl,
        /// Initial value
        init: Option<Expression>,
    },
    /// `break`, `continue` or `goto label`
    JumpStatement {
        /// Jump keyword
        keyword: JumpKind,
        /// Target of a `goto`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    /// `label:` marking a `goto` target
    LabelStatement {
        /// Label name
        label: String,
    },
}

impl Statement {
    /// Unlabelled `break` or `continue`.
    #[must_use]
    pub fn jump(keyword: JumpKind) -> Self {
        Statement::JumpStatement {
            keyword,
            label: None,
        }
    }

    /// Returns `true` when control never reaches the next statement.
    #[must_use]
    pub fn ends_abruptly(&self) -> bool {
        matches!(
            self,
            Statement::ReturnStatement { .. }
                | Statement::ThrowStatement { .. }
                | Statement::JumpStatement { .. }
        )
    }
}

/// Expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Expression {
    /// `lhs = rhs` or `lhs op= rhs`
    Assignment {
        /// Target
        lhs: Box<Expression>,
        /// Value
        rhs: Box<Expression>,
        /// Operator of a compound assignment
        op: Option<String>,
    },
    /// `lhs op rhs`
    BinaryInfix {
        /// Operator spelling
        op: String,
        /// Left operand
        lhs: Box<Expression>,
        /// Right operand
        rhs: Box<Expression>,
    },
    /// `op operand` or `operand op`
    Unary {
        /// Operator spelling
        op: String,
        /// Operand
        operand: Box<Expression>,
        /// Postfix form (`i++`)
        postfix: bool,
    },
    /// `receiver.name(args)`, `Type.name(args)`, `this(args)` or `super(args)`
    MethodInvocation {
        /// Called member
        triple: Triple,
        /// Printed name; `this`/`super` for constructor chaining
        name: String,
        /// Receiver or owning type
        receiver: Option<Box<Expression>>,
        /// Arguments
        args: Vec<Expression>,
    },
    /// `new Type(args)`
    ClassInstanceCreation {
        /// Called constructor
        triple: Triple,
        /// Instantiated type
        ty: TypeName,
        /// Arguments
        args: Vec<Expression>,
    },
    /// `object.field`, `Type.field` or `array.length`
    FieldAccess {
        /// Accessed member; absent for `length`
        triple: Option<Triple>,
        /// Printed name
        name: String,
        /// Object or owning type
        object: Box<Expression>,
    },
    /// `array[index]`
    ArrayAccess {
        /// Array
        array: Box<Expression>,
        /// Index
        index: Box<Expression>,
    },
    /// `(Type) operand`
    Cast {
        /// Target type
        ty: TypeName,
        /// Converted value
        operand: Box<Expression>,
    },
    /// Literal in source spelling
    Literal {
        /// Source spelling (`1.5f`, `"a"`, `null`)
        value: String,
        /// Literal type
        ty: TypeName,
    },
    /// Local variable or parameter
    Local {
        /// Name
        name: String,
    },
    /// A type in expression position (static member owner, `instanceof` operand)
    TypeName(TypeName),
    /// `{a, b}` or `new T[] {a, b}`
    ArrayInitializer {
        /// Array type, printed as `new T[]` when present
        ty: Option<TypeName>,
        /// Elements
        elements: Vec<Expression>,
    },
    /// `new T[size]`
    ArrayCreation {
        /// Element type
        ty: TypeName,
        /// Sized dimensions
        dims: Vec<Expression>,
    },
    /// `(expr)`
    Parenthesis {
        /// Wrapped expression
        expr: Box<Expression>,
    },
    /// Construct without Java counterpart
    Dummy {
        /// Leading text
        label: String,
        /// Arguments printed in parentheses after the label
        args: Vec<Expression>,
    },
}

impl Expression {
    /// Local variable reference.
    pub fn local(name: impl Into<String>) -> Self {
        Expression::Local { name: name.into() }
    }

    /// Wraps in parentheses.
    #[must_use]
    pub fn paren(self) -> Self {
        Expression::Parenthesis {
            expr: Box::new(self),
        }
    }

    /// Wraps infix and assignment forms only; atoms, calls and unary forms
    /// bind tighter than any operator they can appear under.
    #[must_use]
    pub fn paren_operand(self) -> Self {
        match self {
            Expression::BinaryInfix { .. }
            | Expression::Assignment { .. }
            | Expression::Cast { .. } => self.paren(),
            other => other,
        }
    }

    /// `lhs op rhs`.
    pub fn binary(op: impl Into<String>, lhs: Expression, rhs: Expression) -> Self {
        Expression::BinaryInfix {
            op: op.into(),
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Prefix operator application.
    pub fn prefix(op: impl Into<String>, operand: Expression) -> Self {
        Expression::Unary {
            op: op.into(),
            operand: Box::new(operand),
            postfix: false,
        }
    }

    /// Plain assignment.
    #[must_use]
    pub fn assign(lhs: Expression, rhs: Expression) -> Self {
        Expression::Assignment {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            op: None,
        }
    }
}

/// Envelope of a decompiled method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodAst {
    /// Declaring class, name and prototype
    pub triple: Triple,
    /// Modifier keywords
    pub flags: Vec<String>,
    /// Return type
    pub ret: TypeName,
    /// Parameters, receiver excluded
    pub params: Vec<VarDecl>,
    /// Free-form notes (failures, fallbacks)
    pub comments: Vec<String>,
    /// Body; `None` for native and abstract methods
    pub body: Option<Block>,
}

/// A field declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldAst {
    /// Field name
    pub name: String,
    /// Field type
    pub ty: TypeName,
    /// Modifier keywords
    pub flags: Vec<String>,
    /// Initial value in source spelling
    pub value: Option<String>,
}

/// Envelope of a decompiled class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassAst {
    /// Class descriptor
    pub rawname: String,
    /// Dotted class name
    pub name: String,
    /// Dotted superclass name
    #[serde(rename = "super")]
    pub super_class: Option<String>,
    /// Modifier keywords
    pub flags: Vec<String>,
    /// Interface or annotation type
    pub is_interface: bool,
    /// Dotted names of implemented interfaces
    pub interfaces: Vec<String>,
    /// Fields
    pub fields: Vec<FieldAst>,
    /// Methods that decompiled, in declaration order
    pub methods: Vec<MethodAst>,
}
