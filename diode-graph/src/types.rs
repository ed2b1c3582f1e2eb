//! Structural type names.
//!
//! Types are compared structurally: two `TypeName`s are equal when their
//! names and type arguments are equal. Well-known framework wrappers are
//! canonicalized on construction, so `javax.inject.Provider<Foo>` and
//! `Provider<Foo>` are the same type.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::GraphError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Char,
    Float,
    Double,
    Void,
}

impl Primitive {
    const ALL: [Primitive; 9] = [
        Primitive::Boolean,
        Primitive::Byte,
        Primitive::Short,
        Primitive::Int,
        Primitive::Long,
        Primitive::Char,
        Primitive::Float,
        Primitive::Double,
        Primitive::Void,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Byte => "byte",
            Primitive::Short => "short",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Char => "char",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Void => "void",
        }
    }

    /// Name of the reference type a primitive is boxed into.
    pub fn boxed_name(self) -> &'static str {
        match self {
            Primitive::Boolean => "Boolean",
            Primitive::Byte => "Byte",
            Primitive::Short => "Short",
            Primitive::Int => "Integer",
            Primitive::Long => "Long",
            Primitive::Char => "Character",
            Primitive::Float => "Float",
            Primitive::Double => "Double",
            Primitive::Void => "Void",
        }
    }
}

/// Framework types that change how a dependency is requested or assembled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameworkType {
    Provider,
    Lazy,
    Producer,
    Produced,
    ListenableFuture,
    MembersInjector,
    Optional,
    Set,
    Map,
}

impl FrameworkType {
    const ALL: [FrameworkType; 9] = [
        FrameworkType::Provider,
        FrameworkType::Lazy,
        FrameworkType::Producer,
        FrameworkType::Produced,
        FrameworkType::ListenableFuture,
        FrameworkType::MembersInjector,
        FrameworkType::Optional,
        FrameworkType::Set,
        FrameworkType::Map,
    ];

    /// Canonical name used inside `TypeName`.
    pub fn name(self) -> &'static str {
        match self {
            FrameworkType::Provider => "Provider",
            FrameworkType::Lazy => "Lazy",
            FrameworkType::Producer => "Producer",
            FrameworkType::Produced => "Produced",
            FrameworkType::ListenableFuture => "ListenableFuture",
            FrameworkType::MembersInjector => "MembersInjector",
            FrameworkType::Optional => "Optional",
            FrameworkType::Set => "Set",
            FrameworkType::Map => "Map",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            FrameworkType::Provider => &["javax.inject.Provider", "jakarta.inject.Provider"],
            FrameworkType::Lazy => &["dagger.Lazy"],
            FrameworkType::Producer => &["dagger.producers.Producer"],
            FrameworkType::Produced => &["dagger.producers.Produced"],
            FrameworkType::ListenableFuture => {
                &["com.google.common.util.concurrent.ListenableFuture"]
            }
            FrameworkType::MembersInjector => &["dagger.MembersInjector"],
            FrameworkType::Optional => &["java.util.Optional", "com.google.common.base.Optional"],
            FrameworkType::Set => &["java.util.Set"],
            FrameworkType::Map => &["java.util.Map"],
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.name() == name || v.aliases().contains(&name))
    }
}

/// A structural type: a primitive, a declared (possibly parameterized) type
/// or an array.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeName {
    Primitive(Primitive),
    Declared { name: String, args: Vec<TypeName> },
    Array(Box<TypeName>),
}

impl TypeName {
    pub fn declared(name: impl Into<String>, args: Vec<TypeName>) -> Self {
        Self::Declared {
            name: canonical_name(name.into()),
            args,
        }
    }

    pub fn simple(name: impl Into<String>) -> Self {
        Self::declared(name, Vec::new())
    }

    pub fn wrap(framework: FrameworkType, inner: TypeName) -> Self {
        Self::declared(framework.name(), vec![inner])
    }

    pub fn set_of(element: TypeName) -> Self {
        Self::wrap(FrameworkType::Set, element)
    }

    pub fn map_of(key: TypeName, value: TypeName) -> Self {
        Self::declared(FrameworkType::Map.name(), vec![key, value])
    }

    /// Returns the reference type for primitives and the type itself otherwise.
    pub fn boxed(&self) -> TypeName {
        match self {
            TypeName::Primitive(p) => TypeName::simple(p.boxed_name()),
            other => other.clone(),
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeName::Primitive(_))
    }

    pub fn is_declared(&self) -> bool {
        matches!(self, TypeName::Declared { .. })
    }

    /// Raw name of a declared type.
    pub fn name(&self) -> Option<&str> {
        match self {
            TypeName::Declared { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn args(&self) -> &[TypeName] {
        match self {
            TypeName::Declared { args, .. } => args,
            _ => &[],
        }
    }

    pub fn type_argument(&self, index: usize) -> Option<&TypeName> {
        self.args().get(index)
    }

    pub fn framework_type(&self) -> Option<FrameworkType> {
        self.name().and_then(FrameworkType::from_name)
    }

    pub fn is_type_of(&self, framework: FrameworkType) -> bool {
        self.framework_type() == Some(framework)
    }

    /// Returns `T` when this type is `framework<T>`.
    pub fn unwrap_type(&self, framework: FrameworkType) -> Option<&TypeName> {
        if self.is_type_of(framework) && self.args().len() == 1 {
            self.type_argument(0)
        } else {
            None
        }
    }

    /// A declared type used without its type arguments.
    pub fn is_raw(&self) -> bool {
        matches!(self, TypeName::Declared { args, .. } if args.is_empty())
    }

    /// Replaces every occurrence of a type variable by its binding.
    ///
    /// Type variables are plain declared names without arguments.
    pub fn substitute(&self, bindings: &HashMap<String, TypeName>) -> TypeName {
        if bindings.is_empty() {
            return self.clone();
        }
        match self {
            TypeName::Primitive(_) => self.clone(),
            TypeName::Declared { name, args } if args.is_empty() => {
                bindings.get(name).cloned().unwrap_or_else(|| self.clone())
            }
            TypeName::Declared { name, args } => TypeName::Declared {
                name: name.clone(),
                args: args.iter().map(|v| v.substitute(bindings)).collect(),
            },
            TypeName::Array(inner) => TypeName::Array(Box::new(inner.substitute(bindings))),
        }
    }

    /// Builds the substitution of `params` by the arguments of this type.
    ///
    /// Returns `None` if the argument count does not match, which is the case
    /// for raw uses of generic types.
    pub fn bind_type_params(&self, params: &[String]) -> Option<HashMap<String, TypeName>> {
        if self.args().len() != params.len() {
            return None;
        }
        Some(
            params
                .iter()
                .cloned()
                .zip(self.args().iter().cloned())
                .collect(),
        )
    }
}

fn canonical_name(name: String) -> String {
    if let Some(framework) = FrameworkType::from_name(&name) {
        return framework.name().to_owned();
    }
    if let Some(simple) = name.strip_prefix("java.lang.")
        && Primitive::ALL.iter().any(|p| p.boxed_name() == simple)
    {
        return simple.to_owned();
    }
    name
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeName::Primitive(p) => f.write_str(p.name()),
            TypeName::Declared { name, args } => {
                f.write_str(name)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            TypeName::Array(inner) => write!(f, "{inner}[]"),
        }
    }
}

impl FromStr for TypeName {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser { input: s, pos: 0 };
        let ty = parser.parse_type()?;
        parser.skip_whitespace();
        if parser.pos != s.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(ty)
    }
}

impl TryFrom<String> for TypeName {
    type Error = GraphError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeName> for String {
    fn from(value: TypeName) -> Self {
        value.to_string()
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn parse_type(&mut self) -> Result<TypeName, GraphError> {
        self.skip_whitespace();
        let name = self.identifier()?;
        let mut ty = match Primitive::from_name(name) {
            Some(p) => TypeName::Primitive(p),
            None => {
                let name = name.to_owned();
                let mut args = Vec::new();
                self.skip_whitespace();
                if self.eat('<') {
                    loop {
                        args.push(self.parse_type()?);
                        self.skip_whitespace();
                        if self.eat(',') {
                            continue;
                        }
                        if self.eat('>') {
                            break;
                        }
                        return Err(self.error("expected ',' or '>'"));
                    }
                }
                TypeName::declared(name, args)
            }
        };
        loop {
            self.skip_whitespace();
            if self.input[self.pos..].starts_with("[]") {
                self.pos += 2;
                ty = TypeName::Array(Box::new(ty));
            } else {
                return Ok(ty);
            }
        }
    }

    fn identifier(&mut self) -> Result<&'a str, GraphError> {
        let start = self.pos;
        let len = self.input[start..]
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.' || c == '$'))
            .unwrap_or(self.input.len() - start);
        if len == 0 {
            return Err(self.error("expected a type name"));
        }
        self.pos += len;
        Ok(&self.input[start..start + len])
    }

    fn eat(&mut self, c: char) -> bool {
        if self.input[self.pos..].starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.input[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn error(&self, reason: &str) -> GraphError {
        GraphError::InvalidTypeName {
            input: self.input.to_owned(),
            reason: format!("{reason} at offset {}", self.pos),
        }
    }
}
