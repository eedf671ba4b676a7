//! Class level output: source text and the class envelope.

use std::fmt::Write;

use crate::{
    decompiler::MethodOutput,
    emit::{
        ast::{ClassAst, FieldAst},
        method_header, text, type_name,
    },
    input::{descriptor, ClassInfo, DescriptorInterner},
};

const OBJECT: &str = "Ljava/lang/Object;";

/// A decompiled class.
#[derive(Debug)]
pub struct DecompiledClass {
    /// Class descriptor
    pub descriptor: String,
    /// Source text
    pub text: String,
    /// Class envelope with the methods that decompiled, when enabled
    pub ast: Option<ClassAst>,
    /// Per-method outcomes in declaration order
    pub methods: Vec<MethodOutput>,
}

impl DecompiledClass {
    /// Outcomes of the methods that failed.
    pub fn failures(&self) -> impl Iterator<Item = &MethodOutput> + '_ {
        self.methods.iter().filter(|m| m.is_failed())
    }
}

fn dotted(desc: &str, types: &DescriptorInterner) -> String {
    types.java_type(desc).to_string()
}

fn field_asts(class: &ClassInfo, types: &DescriptorInterner) -> Vec<FieldAst> {
    class
        .fields
        .iter()
        .map(|field| FieldAst {
            name: field.name.clone(),
            ty: type_name(types, &field.ty),
            flags: field
                .access
                .field_keywords()
                .into_iter()
                .map(str::to_string)
                .collect(),
            value: field.value.as_ref().map(|v| v.to_java()),
        })
        .collect()
}

pub(crate) fn class_ast(
    class: &ClassInfo,
    outputs: &[MethodOutput],
    types: &DescriptorInterner,
) -> ClassAst {
    let methods = outputs
        .iter()
        .filter_map(|output| match output {
            MethodOutput::Decompiled(method) => method.ast.clone(),
            MethodOutput::NoCode(header) => Some(header.clone()),
            MethodOutput::Failed { .. } => None,
        })
        .collect();
    ClassAst {
        rawname: class.descriptor.clone(),
        name: dotted(&class.descriptor, types),
        super_class: class.superclass.as_deref().map(|s| dotted(s, types)),
        flags: class
            .access
            .class_keywords()
            .into_iter()
            .map(str::to_string)
            .collect(),
        is_interface: class.is_interface(),
        interfaces: class.interfaces.iter().map(|i| dotted(i, types)).collect(),
        fields: field_asts(class, types),
        methods,
    }
}

/// Renders the whole class.
///
/// Methods keep their declaration order; a failed method is replaced by a
/// comment naming it and the error.
pub(crate) fn render_class(
    class: &ClassInfo,
    outputs: &[MethodOutput],
    types: &DescriptorInterner,
) -> String {
    let mut out = String::new();
    let (package, simple) = descriptor::split_class_name(&class.descriptor);
    if !package.is_empty() {
        let _ = writeln!(out, "package {package};\n");
    }

    let mut prototype: Vec<String> = class
        .access
        .class_keywords()
        .into_iter()
        .map(str::to_string)
        .collect();
    prototype.push(class.access.class_kind().to_string());
    prototype.push(simple);

    let interfaces: Vec<String> = class.interfaces.iter().map(|i| dotted(i, types)).collect();
    if class.is_interface() {
        if !interfaces.is_empty() {
            prototype.push(format!("extends {}", interfaces.join(", ")));
        }
    } else {
        if let Some(superclass) = class.superclass.as_deref().filter(|s| *s != OBJECT) {
            prototype.push(format!("extends {}", dotted(superclass, types)));
        }
        if !interfaces.is_empty() {
            prototype.push(format!("implements {}", interfaces.join(", ")));
        }
    }
    let _ = writeln!(out, "{} {{", prototype.join(" "));

    let fields = field_asts(class, types);
    if !fields.is_empty() {
        out.push('\n');
    }
    for field in &fields {
        let mut line = field.flags.clone();
        line.push(field.ty.spelling());
        line.push(field.name.clone());
        match &field.value {
            Some(value) => {
                let _ = writeln!(out, "    {} = {value};", line.join(" "));
            }
            None => {
                let _ = writeln!(out, "    {};", line.join(" "));
            }
        }
    }

    for (info, output) in class.methods.iter().zip(outputs) {
        out.push('\n');
        match output {
            MethodOutput::Decompiled(method) => match (&method.ast, &method.text) {
                (Some(ast), _) => out.push_str(&text::render_method(ast, 1)),
                (None, Some(source)) => {
                    for line in source.lines() {
                        let _ = writeln!(out, "    {line}");
                    }
                }
                (None, None) => {
                    let header = method_header(info, types);
                    out.push_str(&text::render_method(&header, 1));
                }
            },
            MethodOutput::NoCode(header) => out.push_str(&text::render_method(header, 1)),
            MethodOutput::Failed { descriptor, error } => {
                let _ = writeln!(out, "    // Failed to decompile {descriptor}: {error}");
            }
        }
    }
    out.push_str("}\n");
    out
}
