//! Type handles
//!
//! A [`TypeHandle`] is an immutable snapshot of one class, array, primitive
//! or not-yet-loaded type, taken the first time a compilation asks about it.
//! Handles live in their oracle's arena and are referred to by [`TypeRef`].

use crate::error::{HeapError, OracleError, OracleResult};
use crate::heap::layout::{self, BasicType, LayoutDescriptor};
use crate::heap::{ClassFlags, ClassKind, HeapIdentity, HierarchyRecord, LoadState, LoaderId};
use crate::interner::NameRef;
use std::sync::atomic::{AtomicU32, Ordering};

/// Identifies one oracle session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u32);

impl SessionId {
    pub(crate) fn next() -> Self {
        static NEXT_ID: AtomicU32 = AtomicU32::new(1);
        SessionId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw session number
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

/// Reference to a handle in an oracle's arena
///
/// Two refs from the same oracle are equal exactly when they name the same
/// handle. A ref is meaningless to any other oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeRef {
    session: SessionId,
    index: u32,
}

impl TypeRef {
    pub(crate) fn new(session: SessionId, index: u32) -> Self {
        Self { session, index }
    }

    /// The session that produced this ref
    pub fn session(&self) -> SessionId {
        self.session
    }

    pub(crate) fn index(self) -> usize {
        self.index as usize
    }
}

/// Where a fast subtype check against a class compares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckSlot {
    /// Primary display slot at this depth
    Primary(usize),
    /// The secondary supertype cache; the check falls back to a scan
    Secondary,
}

impl CheckSlot {
    /// Decode a super check offset
    pub fn decode(offset: u32) -> Option<Self> {
        if offset == layout::SECONDARY_SUPER_CACHE_OFFSET {
            return Some(CheckSlot::Secondary);
        }
        let relative = offset.checked_sub(layout::PRIMARY_SUPERS_OFFSET)?;
        if relative % layout::WORD_SIZE != 0 {
            return None;
        }
        let depth = (relative / layout::WORD_SIZE) as usize;
        (depth < layout::MAX_DISPLAY_CAPACITY).then_some(CheckSlot::Primary(depth))
    }
}

/// Hierarchy position of a loaded class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyDescriptor {
    /// Superclass chain from the root down, excluding the class itself
    supers: Vec<HeapIdentity>,
    /// Length of the primary display prefix of `supers`
    display_len: usize,
    secondary_supers: Vec<HeapIdentity>,
    can_be_primary_super: bool,
    super_check_offset: u32,
    check_slot: CheckSlot,
}

impl HierarchyDescriptor {
    /// Build from a store record
    ///
    /// With `verify` set, rejects records in which an ancestor repeats or the
    /// class appears among its own ancestors, and records whose check slot
    /// disagrees with their depth and eligibility.
    pub(crate) fn from_record(
        record: HierarchyRecord,
        this: HeapIdentity,
        name: &str,
        verify: bool,
    ) -> Result<Self, HeapError> {
        let malformed = || HeapError::CyclicHierarchy {
            name: name.to_string(),
        };

        let check_slot = CheckSlot::decode(record.super_check_offset).ok_or_else(malformed)?;
        if record.display_capacity == 0 || record.display_capacity > layout::MAX_DISPLAY_CAPACITY {
            return Err(malformed());
        }

        if verify {
            let mut seen = record.supers.clone();
            seen.push(this);
            seen.sort_unstable();
            seen.dedup();
            if seen.len() != record.supers.len() + 1 || record.secondary_supers.contains(&this) {
                return Err(malformed());
            }

            let depth = record.supers.len();
            let consistent = match check_slot {
                CheckSlot::Primary(slot) => {
                    record.can_be_primary_super && slot == depth && depth < record.display_capacity
                }
                CheckSlot::Secondary => !record.can_be_primary_super,
            };
            if !consistent {
                return Err(malformed());
            }
        }

        let display_len = record.supers.len().min(record.display_capacity);
        Ok(Self {
            supers: record.supers,
            display_len,
            secondary_supers: record.secondary_supers,
            can_be_primary_super: record.can_be_primary_super,
            super_check_offset: record.super_check_offset,
            check_slot,
        })
    }

    /// Number of proper ancestors on the class chain
    pub fn depth(&self) -> usize {
        self.supers.len()
    }

    /// The primary supertype display, root first
    pub fn display(&self) -> &[HeapIdentity] {
        &self.supers[..self.display_len]
    }

    /// Ancestor in display slot `depth`, if the slot exists
    pub fn primary_super_of_depth(&self, depth: usize) -> Option<HeapIdentity> {
        self.display().get(depth).copied()
    }

    /// Complete superclass chain, root first
    pub fn class_chain(&self) -> &[HeapIdentity] {
        &self.supers
    }

    /// Interfaces and ancestors past display capacity
    pub fn secondary_supers(&self) -> &[HeapIdentity] {
        &self.secondary_supers
    }

    /// Whether subclasses record this class in their display
    pub fn can_be_primary_super(&self) -> bool {
        self.can_be_primary_super
    }

    /// Raw check offset
    pub fn super_check_offset(&self) -> u32 {
        self.super_check_offset
    }

    /// Decoded check offset
    pub fn check_slot(&self) -> CheckSlot {
        self.check_slot
    }
}

/// Shape of a type as seen by the compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Ordinary class
    Instance,
    /// Interface
    Interface,
    /// Array with the given element basic type
    Array(BasicType),
    /// Primitive value type
    Primitive(BasicType),
}

impl From<ClassKind> for TypeKind {
    fn from(kind: ClassKind) -> Self {
        match kind {
            ClassKind::Instance => TypeKind::Instance,
            ClassKind::Interface => TypeKind::Interface,
            ClassKind::Array(bt) => TypeKind::Array(bt),
        }
    }
}

/// Snapshot of a loaded class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedClass {
    pub(crate) identity: HeapIdentity,
    pub(crate) kind: TypeKind,
    pub(crate) layout: LayoutDescriptor,
    pub(crate) hierarchy: HierarchyDescriptor,
    pub(crate) flags: ClassFlags,
    pub(crate) loader: LoaderId,
    pub(crate) prototype_header: u64,
}

impl LoadedClass {
    /// Heap identity
    pub fn identity(&self) -> HeapIdentity {
        self.identity
    }

    /// Hierarchy position
    pub fn hierarchy(&self) -> &HierarchyDescriptor {
        &self.hierarchy
    }

    /// Defining loader
    pub fn loader(&self) -> LoaderId {
        self.loader
    }
}

/// A type referenced by name that has not been loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnloadedClass {
    pub(crate) identity: Option<HeapIdentity>,
    pub(crate) basic_type: BasicType,
}

/// The closed set of handle variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeState {
    /// A loaded class, interface or array
    Loaded(Box<LoadedClass>),
    /// A placeholder for a type that is not loaded yet
    Unloaded(UnloadedClass),
    /// A primitive type; always loaded, never in a hierarchy
    Primitive(BasicType),
}

/// Immutable proxy for one type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeHandle {
    pub(crate) name: NameRef,
    pub(crate) external_name: Box<str>,
    pub(crate) state: TypeState,
}

impl TypeHandle {
    /// Interned internal name
    pub fn name(&self) -> NameRef {
        self.name
    }

    /// Human-readable name for diagnostics, e.g. `java.lang.String[]`
    pub fn external_name(&self) -> &str {
        &self.external_name
    }

    /// The variant
    pub fn state(&self) -> &TypeState {
        &self.state
    }

    /// Loaded or not; fixed for the handle's lifetime
    pub fn load_state(&self) -> LoadState {
        match self.state {
            TypeState::Unloaded(_) => LoadState::Unloaded,
            TypeState::Loaded(_) | TypeState::Primitive(_) => LoadState::Loaded,
        }
    }

    /// Is the type loaded
    pub fn is_loaded(&self) -> bool {
        self.load_state() == LoadState::Loaded
    }

    /// Heap identity, absent for primitives and name-only placeholders
    pub fn identity(&self) -> Option<HeapIdentity> {
        match &self.state {
            TypeState::Loaded(class) => Some(class.identity),
            TypeState::Unloaded(unloaded) => unloaded.identity,
            TypeState::Primitive(_) => None,
        }
    }

    /// Layout helper; neutral unless the type is a loaded class or array
    pub fn layout_descriptor(&self) -> LayoutDescriptor {
        match &self.state {
            TypeState::Loaded(class) => class.layout,
            _ => LayoutDescriptor::NEUTRAL,
        }
    }

    /// Basic type this handle stands for
    pub fn basic_type(&self) -> BasicType {
        match &self.state {
            TypeState::Loaded(class) => match class.kind {
                TypeKind::Array(_) => BasicType::Array,
                _ => BasicType::Object,
            },
            TypeState::Unloaded(unloaded) => unloaded.basic_type,
            TypeState::Primitive(bt) => *bt,
        }
    }

    /// Shape, if known
    pub fn kind(&self) -> Option<TypeKind> {
        match &self.state {
            TypeState::Loaded(class) => Some(class.kind),
            TypeState::Unloaded(_) => None,
            TypeState::Primitive(bt) => Some(TypeKind::Primitive(*bt)),
        }
    }

    /// Is a loaded interface
    pub fn is_interface(&self) -> bool {
        self.kind() == Some(TypeKind::Interface)
    }

    /// Is an array type (loaded or not)
    pub fn is_array(&self) -> bool {
        self.basic_type() == BasicType::Array
    }

    /// Is a primitive type
    pub fn is_primitive(&self) -> bool {
        matches!(self.state, TypeState::Primitive(_))
    }

    /// The loaded snapshot, or a precondition failure naming `operation`
    pub fn loaded(&self, operation: &'static str) -> OracleResult<&LoadedClass> {
        match &self.state {
            TypeState::Loaded(class) => Ok(class),
            TypeState::Unloaded(_) => Err(OracleError::precondition(
                operation,
                format!("{} is not loaded", self.external_name),
            )),
            TypeState::Primitive(_) => Err(OracleError::precondition(
                operation,
                format!("{} is a primitive type", self.external_name),
            )),
        }
    }

    /// Hierarchy position (loaded only)
    pub fn hierarchy(&self) -> OracleResult<&HierarchyDescriptor> {
        Ok(&self.loaded("hierarchy")?.hierarchy)
    }

    /// Number of proper class ancestors (loaded only)
    pub fn super_depth(&self) -> OracleResult<usize> {
        Ok(self.loaded("super_depth")?.hierarchy.depth())
    }

    /// Offset the code generator embeds in a subtype check against this type
    ///
    /// Valid only while the producing oracle is alive.
    pub fn check_slot_offset(&self) -> OracleResult<u32> {
        Ok(self.loaded("check_slot_offset")?.hierarchy.super_check_offset)
    }

    /// Alias of [`check_slot_offset`](Self::check_slot_offset)
    pub fn super_check_offset(&self) -> OracleResult<u32> {
        Ok(self.loaded("super_check_offset")?.hierarchy.super_check_offset)
    }

    /// Whether subclasses record this type in their primary display (loaded only)
    pub fn can_be_primary_super(&self) -> OracleResult<bool> {
        Ok(self.loaded("can_be_primary_super")?.hierarchy.can_be_primary_super)
    }

    /// Modifier flags as reflection reports them (loaded only)
    pub fn modifier_flags(&self) -> OracleResult<u32> {
        Ok(self.loaded("modifier_flags")?.flags.modifier_flags)
    }

    /// Class file access flags (loaded only)
    pub fn access_flags(&self) -> OracleResult<u32> {
        Ok(self.loaded("access_flags")?.flags.access_flags)
    }

    /// Prototype mark word for new instances (loaded only)
    pub fn prototype_header(&self) -> OracleResult<u64> {
        Ok(self.loaded("prototype_header")?.prototype_header)
    }

    /// Defining loader (loaded only)
    pub fn loader(&self) -> OracleResult<LoaderId> {
        Ok(self.loaded("loader")?.loader)
    }
}

/// Convert an internal name to its external spelling
///
/// `com/example/Foo` becomes `com.example.Foo`; `[[I` becomes `int[][]`;
/// `[Lcom/example/Foo;` becomes `com.example.Foo[]`.
pub fn external_name(internal: &str) -> String {
    let dims = internal.bytes().take_while(|&b| b == b'[').count();
    if dims == 0 {
        return internal.replace('/', ".");
    }

    let element = &internal[dims..];
    let mut out = match element.chars().next().and_then(BasicType::from_descriptor) {
        Some(BasicType::Object) if element.ends_with(';') => {
            element[1..element.len() - 1].replace('/', ".")
        }
        Some(bt) if element.len() == 1 && !bt.is_reference() => bt.name().to_string(),
        _ => return internal.replace('/', "."),
    };
    for _ in 0..dims {
        out.push_str("[]");
    }
    out
}

/// Basic type implied by an internal name
pub(crate) fn basic_type_of_name(internal: &str) -> BasicType {
    if internal.starts_with('[') {
        BasicType::Array
    } else {
        BasicType::Object
    }
}
