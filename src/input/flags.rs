use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    /// Dalvik `access_flags` of classes, fields and methods
    pub struct AccessFlags: u32 {
        /// `public`
        const PUBLIC = 0x0001;
        /// `private`
        const PRIVATE = 0x0002;
        /// `protected`
        const PROTECTED = 0x0004;
        /// `static`
        const STATIC = 0x0008;
        /// `final`
        const FINAL = 0x0010;
        /// `synchronized` method (monitor taken by the VM)
        const SYNCHRONIZED = 0x0020;
        /// `volatile` field, or bridge method
        const VOLATILE = 0x0040;
        /// Compiler generated bridge method (same bit as `VOLATILE`)
        const BRIDGE = 0x0040;
        /// `transient` field, or varargs method
        const TRANSIENT = 0x0080;
        /// Last argument is a varargs array (same bit as `TRANSIENT`)
        const VARARGS = 0x0080;
        /// `native` method
        const NATIVE = 0x0100;
        /// `interface` class
        const INTERFACE = 0x0200;
        /// `abstract`
        const ABSTRACT = 0x0400;
        /// `strictfp`
        const STRICT = 0x0800;
        /// Not present in source
        const SYNTHETIC = 0x1000;
        /// Annotation type
        const ANNOTATION = 0x2000;
        /// Enum class or enum constant
        const ENUM = 0x4000;
        /// Constructor (`<init>` or `<clinit>`)
        const CONSTRUCTOR = 0x10000;
        /// `synchronized` declared in source
        const DECLARED_SYNCHRONIZED = 0x20000;
    }
}

impl AccessFlags {
    /// Keywords of a method prototype, in source order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dexscope::input::AccessFlags;
    ///
    /// let flags = AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::CONSTRUCTOR;
    /// assert_eq!(flags.method_keywords(), vec!["public", "static"]);
    /// ```
    #[must_use]
    pub fn method_keywords(self) -> Vec<&'static str> {
        let mut words = self.visibility();
        for (flag, word) in [
            (AccessFlags::STATIC, "static"),
            (AccessFlags::FINAL, "final"),
            (AccessFlags::SYNCHRONIZED, "synchronized"),
            (AccessFlags::BRIDGE, "bridge"),
            (AccessFlags::VARARGS, "varargs"),
            (AccessFlags::NATIVE, "native"),
            (AccessFlags::ABSTRACT, "abstract"),
            (AccessFlags::STRICT, "strictfp"),
            (AccessFlags::SYNTHETIC, "synthetic"),
            (AccessFlags::DECLARED_SYNCHRONIZED, "synchronized"),
        ] {
            if self.contains(flag) && !words.contains(&word) {
                words.push(word);
            }
        }
        words
    }

    /// Keywords of a field declaration, in source order.
    #[must_use]
    pub fn field_keywords(self) -> Vec<&'static str> {
        let mut words = self.visibility();
        for (flag, word) in [
            (AccessFlags::STATIC, "static"),
            (AccessFlags::FINAL, "final"),
            (AccessFlags::VOLATILE, "volatile"),
            (AccessFlags::TRANSIENT, "transient"),
            (AccessFlags::SYNTHETIC, "synthetic"),
            (AccessFlags::ENUM, "enum"),
        ] {
            if self.contains(flag) {
                words.push(word);
            }
        }
        words
    }

    /// Modifier keywords of a class prototype; the kind keyword comes from
    /// [`AccessFlags::class_kind`].
    #[must_use]
    pub fn class_keywords(self) -> Vec<&'static str> {
        let mut words = self.visibility();
        if self.contains(AccessFlags::STATIC) {
            words.push("static");
        }
        if self.contains(AccessFlags::FINAL) && !self.contains(AccessFlags::ENUM) {
            words.push("final");
        }
        if self.contains(AccessFlags::ABSTRACT) && !self.contains(AccessFlags::INTERFACE) {
            words.push("abstract");
        }
        words
    }

    /// `class`, `interface`, `@interface` or `enum`.
    #[must_use]
    pub fn class_kind(self) -> &'static str {
        if self.contains(AccessFlags::ANNOTATION) {
            "@interface"
        } else if self.contains(AccessFlags::INTERFACE) {
            "interface"
        } else if self.contains(AccessFlags::ENUM) {
            "enum"
        } else {
            "class"
        }
    }

    fn visibility(self) -> Vec<&'static str> {
        let mut words = Vec::with_capacity(4);
        if self.contains(AccessFlags::PUBLIC) {
            words.push("public");
        }
        if self.contains(AccessFlags::PRIVATE) {
            words.push("private");
        }
        if self.contains(AccessFlags::PROTECTED) {
            words.push("protected");
        }
        words
    }
}
