//! The type information contract the engine consumes from its host.
//!
//! The host analysis environment knows what type a symbol holds and what a
//! type's direct supertypes are. The engine asks for nothing else, and it
//! walks supertypes transitively on its own.

use rule_config::pattern::canonicalize;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::Arc;

/// A nominal, fully-qualified type name such as `\App\Models\User`.
pub type TypeName = Arc<str>;

/// The set of nominal types a symbol may hold at runtime.
///
/// Members are canonicalized on insertion (leading namespace separator) and
/// deduplicated. An empty union means the symbol cannot be classified.
///
/// Uses `SmallVec` optimized for the common case of one or two types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeUnion(SmallVec<[TypeName; 2]>);

impl TypeUnion {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(type_name: &str) -> Self {
        let mut union = Self::empty();
        union.insert(type_name);
        union
    }

    pub fn insert(&mut self, type_name: &str) {
        let trimmed = type_name.trim();
        if trimmed.is_empty() {
            return;
        }
        let canonical = canonicalize(trimmed);
        if !self.contains(&canonical) {
            self.0.push(canonical.into());
        }
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.0.iter().any(|member| member.as_ref() == type_name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeName> {
        self.0.iter()
    }
}

impl<S: AsRef<str>> FromIterator<S> for TypeUnion {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut union = Self::empty();
        for type_name in iter {
            union.insert(type_name.as_ref());
        }
        union
    }
}

/// Supplies resolved type information for host-owned symbols.
///
/// Implementations must be safe to call concurrently. The engine calls
/// `type_of` at most once per symbol between invalidations, but it does not
/// memoize `supertypes_of`.
pub trait TypeResolver: Send + Sync {
    type Symbol: Send + Sync + 'static;

    /// The declared or inferred types of `symbol`; empty when unknown.
    fn type_of(&self, symbol: &Self::Symbol) -> TypeUnion;

    /// Direct supertypes (parent class, implemented interfaces) of `type_name`.
    fn supertypes_of(&self, type_name: &str) -> Vec<TypeName>;

    /// The implicit receiver (`$this`) is never classified.
    fn is_receiver(&self, _symbol: &Self::Symbol) -> bool {
        false
    }
}

impl<R: TypeResolver + ?Sized> TypeResolver for Arc<R> {
    type Symbol = R::Symbol;

    fn type_of(&self, symbol: &Self::Symbol) -> TypeUnion {
        (**self).type_of(symbol)
    }

    fn supertypes_of(&self, type_name: &str) -> Vec<TypeName> {
        (**self).supertypes_of(type_name)
    }

    fn is_receiver(&self, symbol: &Self::Symbol) -> bool {
        (**self).is_receiver(symbol)
    }
}

/// In-memory supertype graph keyed by canonical type name.
///
/// The graph is taken as given: cycles and dangling names are allowed.
#[derive(Debug, Clone, Default)]
pub struct TypeHierarchy {
    supertypes: FxHashMap<TypeName, Vec<TypeName>>,
}

impl TypeHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `supertypes` as direct supertypes of `type_name`, keeping
    /// previously recorded ones.
    pub fn add_supertypes<I, S>(&mut self, type_name: &str, supertypes: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entry = self
            .supertypes
            .entry(canonicalize(type_name.trim()).into())
            .or_default();
        for supertype in supertypes {
            let canonical: TypeName = canonicalize(supertype.as_ref().trim()).into();
            if !entry.contains(&canonical) {
                entry.push(canonical);
            }
        }
    }

    pub fn supertypes_of(&self, type_name: &str) -> &[TypeName] {
        self.supertypes
            .get(type_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.supertypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.supertypes.is_empty()
    }
}

/// A symbol whose types were already resolved by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredSymbol {
    pub name: String,
    pub types: TypeUnion,
}

impl DeclaredSymbol {
    pub fn new<I, S>(name: impl Into<String>, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            types: types.into_iter().collect(),
        }
    }
}

const RECEIVER_NAME: &str = "$this";

/// Resolver over [`DeclaredSymbol`]s and a [`TypeHierarchy`].
#[derive(Debug, Clone, Default)]
pub struct HierarchyResolver {
    hierarchy: TypeHierarchy,
}

impl HierarchyResolver {
    pub fn new(hierarchy: TypeHierarchy) -> Self {
        Self { hierarchy }
    }

    pub fn hierarchy(&self) -> &TypeHierarchy {
        &self.hierarchy
    }
}

impl TypeResolver for HierarchyResolver {
    type Symbol = DeclaredSymbol;

    fn type_of(&self, symbol: &DeclaredSymbol) -> TypeUnion {
        symbol.types.clone()
    }

    fn supertypes_of(&self, type_name: &str) -> Vec<TypeName> {
        self.hierarchy.supertypes_of(type_name).to_vec()
    }

    fn is_receiver(&self, symbol: &DeclaredSymbol) -> bool {
        symbol.name == RECEIVER_NAME
    }
}
