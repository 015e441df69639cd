//! AVM2 namespaces.
//!
//! A namespace is interned once per loaded container and then shared as an
//! `Rc<Namespace>`. Equality is structural over `(kind, mangled_name)`.

use std::fmt;
use std::rc::Rc;

/// AVM2 namespace kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamespaceKind {
    Public,
    Private,
    Protected,
    PackageInternal,
    ExplicitNamespace,
    StaticProtected,
}

impl NamespaceKind {
    fn mangle_prefix(self) -> &'static str {
        match self {
            NamespaceKind::Public => "",
            NamespaceKind::Private => "v",
            NamespaceKind::Protected => "t",
            NamespaceKind::PackageInternal => "i",
            NamespaceKind::ExplicitNamespace => "x",
            NamespaceKind::StaticProtected => "s",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    kind: NamespaceKind,
    mangled_name: Box<str>,
}

impl Namespace {
    /// Mangles `uri` with a per-kind prefix so namespaces of different kinds
    /// never collide. Private namespaces are unique per declaration, so the
    /// container must hand each one a distinct `uri`.
    pub fn new(kind: NamespaceKind, uri: &str) -> Rc<Self> {
        let mangled_name = if uri.is_empty() {
            kind.mangle_prefix().to_owned()
        } else {
            format!("{}${}", kind.mangle_prefix(), uri)
        };

        Rc::new(Namespace {
            kind,
            mangled_name: mangled_name.into_boxed_str(),
        })
    }

    /// For containers that already carry their own mangling.
    pub fn with_mangled_name(kind: NamespaceKind, mangled_name: &str) -> Rc<Self> {
        Rc::new(Namespace {
            kind,
            mangled_name: mangled_name.into(),
        })
    }

    /// The unnamed public namespace, `""`.
    pub fn public() -> Rc<Self> {
        Namespace::new(NamespaceKind::Public, "")
    }

    #[inline]
    pub fn kind(&self) -> NamespaceKind {
        self.kind
    }

    #[inline]
    pub fn mangled_name(&self) -> &str {
        &self.mangled_name
    }

    #[inline]
    pub fn is_public(&self) -> bool {
        self.kind == NamespaceKind::Public
    }

    #[inline]
    pub fn is_protected(&self) -> bool {
        self.kind == NamespaceKind::Protected
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.kind, self.mangled_name)
    }
}
