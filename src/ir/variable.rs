//! Variables and the per-method variable table.
//!
//! Every storage location an instruction can read or write is a [`Variable`]
//! owned by the method's [`VariableTable`] and addressed through a [`VarId`]
//! handle. Instructions only carry handles, so renaming a variable (live range
//! splitting) or attaching a type is a table update and never rewrites
//! instruction trees.
//!
//! # Naming
//!
//! | Origin | Name |
//! |--------|------|
//! | Register `vN` | `vN` |
//! | Parameter in register `N` | `pN` |
//! | Receiver of an instance method | `this` |
//! | Invoke result temporary `N` | `vtmpN` |
//! | Split version `i` of a variable `x` | `x_i` |

use std::fmt;

use rustc_hash::FxHashMap;

use crate::input::MethodInfo;

/// Handle of a variable inside a [`VariableTable`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    /// Creates a handle from a table index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the table index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "var{}", self.0)
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "var{}", self.0)
    }
}

/// Where a variable comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKind {
    /// A plain virtual register
    Register(u16),
    /// A method argument living in the given register
    Param(u16),
    /// The receiver of an instance method
    This,
    /// A synthesized invoke or `filled-new-array` result
    Temp(u32),
    /// A live range of `base` split off by variable splitting
    Split {
        /// Variable the range was split from
        base: VarId,
        /// Version number, starting at 0
        version: u32,
    },
}

/// A variable with its rendering attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// Origin of the variable
    pub kind: VarKind,
    /// Type descriptor, once known
    pub ty: Option<String>,
    /// Set once the emitter has printed a declaration
    pub declared: bool,
}

impl Variable {
    fn new(kind: VarKind, ty: Option<String>) -> Self {
        Variable {
            kind,
            ty,
            declared: false,
        }
    }

    /// Returns `true` for parameters and the receiver.
    #[must_use]
    pub fn is_param(&self) -> bool {
        matches!(self.kind, VarKind::Param(_) | VarKind::This)
    }

    /// Returns `true` for register backed variables (parameters included).
    ///
    /// Only these take part in live range splitting.
    #[must_use]
    pub fn is_register(&self) -> bool {
        matches!(
            self.kind,
            VarKind::Register(_) | VarKind::Param(_) | VarKind::This
        )
    }
}

/// Owner of all variables of one method.
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    vars: Vec<Variable>,
    registers: FxHashMap<u16, VarId>,
    params: Vec<VarId>,
    temps: u32,
}

impl VariableTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table with the method's receiver and parameters registered.
    ///
    /// The parameter registers map to their parameter variables, so code that
    /// reads an argument register resolves to `pN`/`this`.
    #[must_use]
    pub fn for_method(method: &MethodInfo) -> Self {
        let mut table = Self::new();
        for (register, ty) in method.param_registers() {
            let (kind, ty) = match ty {
                Some(ty) => (VarKind::Param(register), Some(ty)),
                None => (VarKind::This, Some(method.class.clone())),
            };
            let id = table.push(Variable::new(kind, ty));
            table.registers.insert(register, id);
            table.params.push(id);
        }
        table
    }

    fn push(&mut self, var: Variable) -> VarId {
        let id = VarId(self.vars.len());
        self.vars.push(var);
        id
    }

    /// Variable backing register `reg`, created on first use.
    pub fn register(&mut self, reg: u16) -> VarId {
        if let Some(id) = self.registers.get(&reg) {
            return *id;
        }
        let id = self.push(Variable::new(VarKind::Register(reg), None));
        self.registers.insert(reg, id);
        id
    }

    /// Allocates a fresh temporary.
    pub fn new_temp(&mut self, ty: Option<String>) -> VarId {
        let n = self.temps;
        self.temps += 1;
        self.push(Variable::new(VarKind::Temp(n), ty))
    }

    /// Allocates split version `version` of `base`, inheriting its type.
    pub fn new_split(&mut self, base: VarId, version: u32) -> VarId {
        let ty = self.get(base).and_then(|v| v.ty.clone());
        self.push(Variable::new(VarKind::Split { base, version }, ty))
    }

    /// Looks a variable up.
    #[must_use]
    pub fn get(&self, id: VarId) -> Option<&Variable> {
        self.vars.get(id.0)
    }

    /// Looks a variable up for modification.
    pub fn get_mut(&mut self, id: VarId) -> Option<&mut Variable> {
        self.vars.get_mut(id.0)
    }

    /// Type descriptor of a variable, if known.
    #[must_use]
    pub fn ty(&self, id: VarId) -> Option<&str> {
        self.get(id).and_then(|v| v.ty.as_deref())
    }

    /// Records a type unless one is already known.
    pub fn hint_type(&mut self, id: VarId, ty: &str) {
        if let Some(var) = self.get_mut(id) {
            if var.ty.is_none() && ty != "V" {
                var.ty = Some(ty.to_string());
            }
        }
    }

    /// Parameters in declaration order, receiver first.
    #[must_use]
    pub fn params(&self) -> &[VarId] {
        &self.params
    }

    /// Returns `true` for parameters and the receiver.
    #[must_use]
    pub fn is_param(&self, id: VarId) -> bool {
        self.get(id).is_some_and(Variable::is_param)
    }

    /// Display name of a variable.
    #[must_use]
    pub fn name(&self, id: VarId) -> String {
        match self.get(id).map(|v| v.kind) {
            Some(VarKind::Register(reg)) => format!("v{reg}"),
            Some(VarKind::Param(reg)) => format!("p{reg}"),
            Some(VarKind::This) => "this".to_string(),
            Some(VarKind::Temp(n)) => format!("vtmp{n}"),
            Some(VarKind::Split { base, version }) => format!("{}_{}", self.name(base), version),
            None => format!("{id:?}"),
        }
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns `true` when no variable exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// All handles in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = VarId> {
        (0..self.vars.len()).map(VarId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::AccessFlags;

    #[test]
    fn test_params_map_their_registers() {
        let mut method = MethodInfo::new("LFoo;", "f", "(ILjava/lang/String;)V", AccessFlags::PUBLIC);
        method.registers = 5;
        let mut table = VariableTable::for_method(&method);

        // this = v2, p3 = int, p4 = String
        assert_eq!(table.params().len(), 3);
        let this = table.register(2);
        assert_eq!(table.name(this), "this");
        assert_eq!(table.ty(this), Some("LFoo;"));
        let p4 = table.register(4);
        assert_eq!(table.name(p4), "p4");
        assert_eq!(table.ty(p4), Some("Ljava/lang/String;"));
        assert!(table.is_param(p4));

        let v0 = table.register(0);
        assert_eq!(table.name(v0), "v0");
        assert_eq!(table.register(0), v0);
        assert!(!table.is_param(v0));
    }

    #[test]
    fn test_temps_and_splits_naming() {
        let mut table = VariableTable::new();
        let t0 = table.new_temp(Some("I".into()));
        let t1 = table.new_temp(None);
        assert_eq!(table.name(t0), "vtmp0");
        assert_eq!(table.name(t1), "vtmp1");

        let v3 = table.register(3);
        table.hint_type(v3, "J");
        table.hint_type(v3, "I");
        let split = table.new_split(v3, 1);
        assert_eq!(table.name(split), "v3_1");
        assert_eq!(table.ty(split), Some("J"));
        assert!(table.get(split).is_some_and(|v| !v.is_register()));
    }
}
