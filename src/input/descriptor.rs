//! Type and method descriptor utilities.
//!
//! Dalvik uses JVM-style descriptors: `I` for `int`, `Ljava/lang/String;` for a
//! class, `[I` for `int[]` and `(ILjava/lang/String;)V` for a method prototype.
//! This module turns them into Java source names and answers the few layout
//! questions the engine needs (parameter lists, register widths).

use std::sync::Arc;

use dashmap::DashMap;

/// Splits the parameter part of a method descriptor into single type descriptors.
///
/// Whitespace between parameters is tolerated, since some disassemblers print
/// prototypes as `(I C)V`.
///
/// # Examples
///
/// ```rust
/// use dexscope::input::descriptor::parse_params;
///
/// assert_eq!(
///     parse_params("(I[JLjava/lang/String;)V"),
///     vec!["I", "[J", "Ljava/lang/String;"]
/// );
/// assert!(parse_params("()V").is_empty());
/// ```
#[must_use]
pub fn parse_params(descriptor: &str) -> Vec<String> {
    let Some(open) = descriptor.find('(') else {
        return Vec::new();
    };
    let close = descriptor.rfind(')').unwrap_or(descriptor.len());
    if close <= open {
        return Vec::new();
    }

    let chars: Vec<char> = descriptor[open + 1..close].chars().collect();
    let mut params = Vec::new();
    let mut index = 0;
    while index < chars.len() {
        if chars[index].is_whitespace() {
            index += 1;
            continue;
        }
        let start = index;
        while index < chars.len() && chars[index] == '[' {
            index += 1;
        }
        if index < chars.len() && chars[index] == 'L' {
            while index < chars.len() && chars[index] != ';' {
                index += 1;
            }
        }
        index = (index + 1).min(chars.len());
        params.push(chars[start..index].iter().collect());
    }
    params
}

/// Returns the return type descriptor of a method descriptor (`V` when absent).
#[must_use]
pub fn return_type(descriptor: &str) -> &str {
    match descriptor.rfind(')') {
        Some(close) if close + 1 < descriptor.len() => descriptor[close + 1..].trim(),
        _ => "V",
    }
}

/// Converts a type descriptor into its Java source spelling.
///
/// Primitive descriptors map to keywords, classes to their dotted name and
/// arrays get one `[]` per dimension. Strings that are not descriptors are
/// returned unchanged.
///
/// # Examples
///
/// ```rust
/// use dexscope::input::descriptor::java_type;
///
/// assert_eq!(java_type("Z"), "boolean");
/// assert_eq!(java_type("Ljava/util/List;"), "java.util.List");
/// assert_eq!(java_type("[[I"), "int[][]");
/// ```
#[must_use]
pub fn java_type(descriptor: &str) -> String {
    let descriptor = descriptor.trim();
    if let Some(element) = descriptor.strip_prefix('[') {
        return format!("{}[]", java_type(element));
    }
    if let Some(primitive) = primitive_name(descriptor) {
        return primitive.to_string();
    }
    if let Some(class) = descriptor
        .strip_prefix('L')
        .and_then(|rest| rest.strip_suffix(';'))
    {
        return class.replace('/', ".");
    }
    descriptor.to_string()
}

/// Returns the keyword for a primitive descriptor character.
#[must_use]
pub fn primitive_name(descriptor: &str) -> Option<&'static str> {
    Some(match descriptor {
        "V" => "void",
        "Z" => "boolean",
        "B" => "byte",
        "S" => "short",
        "C" => "char",
        "I" => "int",
        "J" => "long",
        "F" => "float",
        "D" => "double",
        _ => return None,
    })
}

/// Number of registers a value of this type occupies (`J` and `D` take two).
#[must_use]
pub fn register_width(descriptor: &str) -> u16 {
    match descriptor.trim() {
        "J" | "D" => 2,
        _ => 1,
    }
}

/// Checks whether the descriptor denotes a reference (class or array) type.
#[must_use]
pub fn is_reference(descriptor: &str) -> bool {
    let descriptor = descriptor.trim();
    descriptor.starts_with('L') || descriptor.starts_with('[')
}

/// Splits a class descriptor into its dotted package and simple name.
///
/// # Examples
///
/// ```rust
/// use dexscope::input::descriptor::split_class_name;
///
/// assert_eq!(split_class_name("Lcom/example/Foo;"), ("com.example".to_string(), "Foo".to_string()));
/// assert_eq!(split_class_name("LFoo;"), (String::new(), "Foo".to_string()));
/// ```
#[must_use]
pub fn split_class_name(descriptor: &str) -> (String, String) {
    let dotted = java_type(descriptor);
    match dotted.rsplit_once('.') {
        Some((package, name)) => (package.to_string(), name.to_string()),
        None => (String::new(), dotted),
    }
}

/// Concurrent cache of descriptor to Java type conversions.
///
/// Class processing runs in parallel and the same few hundred descriptors show
/// up in every method, so converted names are shared between workers.
#[derive(Debug, Default)]
pub struct DescriptorInterner {
    names: DashMap<String, Arc<str>>,
}

impl DescriptorInterner {
    /// Creates an empty interner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the Java spelling of a descriptor, converting it at most once.
    pub fn java_type(&self, descriptor: &str) -> Arc<str> {
        if let Some(name) = self.names.get(descriptor) {
            return Arc::clone(name.value());
        }
        let name: Arc<str> = Arc::from(java_type(descriptor));
        self.names
            .entry(descriptor.to_string())
            .or_insert_with(|| Arc::clone(&name))
            .value()
            .clone()
    }

    /// Number of distinct descriptors seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true when nothing has been interned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_params_mixed() {
        assert_eq!(
            parse_params("([Ljava/lang/String;JZ[[B)I"),
            vec!["[Ljava/lang/String;", "J", "Z", "[[B"]
        );
    }

    #[test]
    fn test_parse_params_with_spaces() {
        assert_eq!(parse_params("(I C)V"), vec!["I", "C"]);
    }

    #[test]
    fn test_return_type() {
        assert_eq!(return_type("(II)J"), "J");
        assert_eq!(return_type("()Ljava/lang/Object;"), "Ljava/lang/Object;");
        assert_eq!(return_type("broken"), "V");
    }

    #[test]
    fn test_java_type_unknown_passthrough() {
        assert_eq!(java_type("T"), "T");
        assert_eq!(java_type("[Ljava/lang/Object;"), "java.lang.Object[]");
    }

    #[test]
    fn test_register_width() {
        assert_eq!(register_width("J"), 2);
        assert_eq!(register_width("D"), 2);
        assert_eq!(register_width("[J"), 1);
        assert_eq!(register_width("I"), 1);
    }

    #[test]
    fn test_interner_shares_names() {
        let interner = DescriptorInterner::new();
        let a = interner.java_type("Ljava/lang/String;");
        let b = interner.java_type("Ljava/lang/String;");

        assert_eq!(&*a, "java.lang.String");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn test_interner_parallel_use() {
        use rayon::prelude::*;

        let interner = DescriptorInterner::new();
        let names: Vec<Arc<str>> = (0..64)
            .into_par_iter()
            .map(|i| interner.java_type(if i % 2 == 0 { "I" } else { "[Z" }))
            .collect();

        assert_eq!(interner.len(), 2);
        assert!(names.iter().any(|n| &**n == "boolean[]"));
    }
}
