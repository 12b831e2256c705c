//! In-memory class table
//!
//! A [`MetadataStore`] that owns its class records directly. Embedders that
//! keep class metadata elsewhere implement the trait themselves; the table
//! backs tests, tools and the benchmarks.
//!
//! Hierarchy records are computed when a class finishes loading:
//! - `supers` is the superclass chain from the root down
//! - the first `display_capacity` entries form the primary display
//! - secondary supers collect transitive interfaces and ancestors deeper
//!   than the display
//! - an array's superclass is the array of its element's superclass, so
//!   `B[]` sits below `A[]`, `Object[]` and `Object`

use super::gate::{HeapEntryScope, HeapGate};
use super::layout::{self, access, BasicType, LayoutDescriptor};
use super::{
    ClassFlags, ClassKind, HeapIdentity, HierarchyRecord, LoadState, LoaderId, MetadataStore,
};
use crate::error::HeapError;
use dashmap::DashMap;
use parking_lot::RwLock;
use thiserror::Error;

/// Array header size in bytes
const ARRAY_HEADER_SIZE: u8 = 16;

/// Mark word of a fresh, unlocked, unhashed object
const UNLOCKED_PROTOTYPE: u64 = 0x1;

/// Instance size of the root class
const ROOT_INSTANCE_SIZE: u32 = 16;

const MODIFIER_MASK: u32 =
    access::ACC_PUBLIC | access::ACC_FINAL | access::ACC_INTERFACE | access::ACC_ABSTRACT;

/// Errors raised while defining or removing classes
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TableError {
    /// The loader already defines a class with this name
    #[error("Class {name} is already defined by loader {loader}")]
    Duplicate {
        /// Class name
        name: String,
        /// Defining loader
        loader: u32,
    },

    /// No class with this identity
    #[error("Unknown class {0}")]
    UnknownClass(HeapIdentity),

    /// No loader with this number
    #[error("Unknown loader {0}")]
    UnknownLoader(u32),

    /// A referenced class has not finished loading
    #[error("Class {0} is not loaded")]
    NotLoaded(String),

    /// Completing a class that is already loaded
    #[error("Class {0} is already loaded")]
    AlreadyLoaded(String),

    /// The superclass cannot be extended
    #[error("Cannot extend {name}: {reason}")]
    IllegalSuper {
        /// Superclass name
        name: String,
        /// Why not
        reason: &'static str,
    },

    /// An implemented type is not an interface
    #[error("{0} is not an interface")]
    NotAnInterface(String),

    /// The root class cannot be removed
    #[error("Class {0} cannot be unloaded")]
    Pinned(String),

    /// Display capacity outside `1..=MAX_DISPLAY_CAPACITY`
    #[error("Display capacity {0} is out of range")]
    BadDisplayCapacity(usize),

    /// The gate refused a pause
    #[error(transparent)]
    Heap(#[from] HeapError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DefKind {
    Class,
    Interface,
}

/// Description of a class to define
#[derive(Debug, Clone)]
pub struct ClassDef {
    name: String,
    loader: LoaderId,
    kind: DefKind,
    superclass: Option<HeapIdentity>,
    interfaces: Vec<HeapIdentity>,
    instance_size: u32,
    access_flags: u32,
}

impl ClassDef {
    /// A public class extending the root unless [`extends`](Self::extends) says otherwise
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            loader: LoaderId::BOOTSTRAP,
            kind: DefKind::Class,
            superclass: None,
            interfaces: Vec::new(),
            instance_size: ROOT_INSTANCE_SIZE,
            access_flags: access::ACC_PUBLIC | access::ACC_SUPER,
        }
    }

    /// A public interface
    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            kind: DefKind::Interface,
            access_flags: access::ACC_PUBLIC | access::ACC_INTERFACE | access::ACC_ABSTRACT,
            ..Self::class(name)
        }
    }

    /// Set the superclass (ignored for interfaces, whose superclass is the root)
    pub fn extends(mut self, superclass: HeapIdentity) -> Self {
        self.superclass = Some(superclass);
        self
    }

    /// Add implemented interfaces (superinterfaces for an interface)
    pub fn implements(mut self, interfaces: impl IntoIterator<Item = HeapIdentity>) -> Self {
        self.interfaces.extend(interfaces);
        self
    }

    /// Define through `loader` instead of the bootstrap loader
    pub fn loader(mut self, loader: LoaderId) -> Self {
        self.loader = loader;
        self
    }

    /// Instance size in bytes (rounded up to a word)
    pub fn instance_size(mut self, bytes: u32) -> Self {
        self.instance_size = bytes;
        self
    }

    /// Replace the access flags
    pub fn access_flags(mut self, flags: u32) -> Self {
        self.access_flags = match self.kind {
            DefKind::Interface => flags | access::ACC_INTERFACE | access::ACC_ABSTRACT,
            DefKind::Class => flags & !access::ACC_INTERFACE,
        };
        self
    }

    /// Mark the class abstract
    pub fn make_abstract(mut self) -> Self {
        self.access_flags |= access::ACC_ABSTRACT;
        self
    }

    /// Mark the class final
    pub fn make_final(mut self) -> Self {
        self.access_flags |= access::ACC_FINAL;
        self
    }
}

/// Element of an array class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayElement {
    /// A primitive element type
    Primitive(BasicType),
    /// A class, interface or array element type
    Class(HeapIdentity),
}

#[derive(Debug, Clone)]
struct ClassEntry {
    name: String,
    loader: LoaderId,
    kind: ClassKind,
    state: LoadState,
    flags: ClassFlags,
    layout: LayoutDescriptor,
    hierarchy: Option<HierarchyRecord>,
}

struct LoadedParts {
    kind: ClassKind,
    flags: ClassFlags,
    layout: LayoutDescriptor,
    hierarchy: HierarchyRecord,
}

/// Reference metadata store with class loaders, interfaces and arrays
#[derive(Debug)]
pub struct ClassTable {
    gate: HeapGate,
    display_capacity: usize,
    root: HeapIdentity,
    /// Entries indexed by identity - 1; `None` once unloaded
    entries: RwLock<Vec<Option<ClassEntry>>>,
    /// `(defining loader, name)` to identity
    names: DashMap<(LoaderId, String), HeapIdentity>,
    /// Parent of each loader, indexed by loader number
    loader_parents: RwLock<Vec<Option<LoaderId>>>,
}

impl ClassTable {
    /// Create a table holding only the root class, with the default display capacity
    pub fn new(root_name: &str) -> Self {
        Self::build(root_name, layout::DEFAULT_DISPLAY_CAPACITY)
    }

    /// Create a table with a custom primary display capacity
    pub fn with_display_capacity(root_name: &str, capacity: usize) -> Result<Self, TableError> {
        if capacity == 0 || capacity > layout::MAX_DISPLAY_CAPACITY {
            return Err(TableError::BadDisplayCapacity(capacity));
        }
        Ok(Self::build(root_name, capacity))
    }

    fn build(root_name: &str, display_capacity: usize) -> Self {
        let root = identity_of(0);
        let entry = ClassEntry {
            name: root_name.to_string(),
            loader: LoaderId::BOOTSTRAP,
            kind: ClassKind::Instance,
            state: LoadState::Loaded,
            flags: ClassFlags {
                access_flags: access::ACC_PUBLIC | access::ACC_SUPER,
                modifier_flags: access::ACC_PUBLIC,
            },
            layout: LayoutDescriptor::instance(ROOT_INSTANCE_SIZE),
            hierarchy: Some(HierarchyRecord {
                supers: Vec::new(),
                secondary_supers: Vec::new(),
                can_be_primary_super: true,
                super_check_offset: layout::primary_slot_offset(0),
                display_capacity,
            }),
        };

        let names = DashMap::new();
        names.insert((LoaderId::BOOTSTRAP, root_name.to_string()), root);

        Self {
            gate: HeapGate::new(),
            display_capacity,
            root,
            entries: RwLock::new(vec![Some(entry)]),
            names,
            loader_parents: RwLock::new(vec![None]),
        }
    }

    /// The root class
    pub fn root(&self) -> HeapIdentity {
        self.root
    }

    /// Number of primary display slots
    pub fn display_capacity(&self) -> usize {
        self.display_capacity
    }

    /// Number of live class entries
    pub fn len(&self) -> usize {
        self.entries.read().iter().filter(|e| e.is_some()).count()
    }

    /// Check if the table holds nothing but the root
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Create a loader that delegates to `parent`
    pub fn new_loader(&self, parent: LoaderId) -> Result<LoaderId, TableError> {
        let mut parents = self.loader_parents.write();
        if parent.as_u32() as usize >= parents.len() {
            return Err(TableError::UnknownLoader(parent.as_u32()));
        }
        let loader = LoaderId::new(parents.len() as u32);
        parents.push(Some(parent));
        Ok(loader)
    }

    /// Find a class by name through `loader`, outside of any scope
    ///
    /// For embedders building a table; compilers go through the gate.
    pub fn lookup(&self, loader: LoaderId, name: &str) -> Option<HeapIdentity> {
        let chain = self.loader_chain(loader).ok()?;
        chain
            .iter()
            .rev()
            .find_map(|l| self.names.get(&(*l, name.to_string())).map(|e| *e.value()))
    }

    /// Define and load a class or interface
    pub fn define(&self, def: ClassDef) -> Result<HeapIdentity, TableError> {
        self.check_loader(def.loader)?;
        let mut entries = self.entries.write();
        let key = (def.loader, def.name.clone());
        if self.names.contains_key(&key) {
            return Err(TableError::Duplicate {
                name: def.name,
                loader: def.loader.as_u32(),
            });
        }

        let parts = self.class_parts(&entries, &def)?;
        let id = identity_of(entries.len());
        entries.push(Some(ClassEntry {
            name: def.name,
            loader: def.loader,
            kind: parts.kind,
            state: LoadState::Loaded,
            flags: parts.flags,
            layout: parts.layout,
            hierarchy: Some(parts.hierarchy),
        }));
        self.names.insert(key, id);
        Ok(id)
    }

    /// Record a class that is referenced but not yet loaded
    pub fn declare(&self, loader: LoaderId, name: &str) -> Result<HeapIdentity, TableError> {
        self.check_loader(loader)?;
        let mut entries = self.entries.write();
        let key = (loader, name.to_string());
        if self.names.contains_key(&key) {
            return Err(TableError::Duplicate {
                name: name.to_string(),
                loader: loader.as_u32(),
            });
        }

        let kind = if name.starts_with('[') {
            ClassKind::Array(BasicType::Object)
        } else {
            ClassKind::Instance
        };
        let id = identity_of(entries.len());
        entries.push(Some(ClassEntry {
            name: name.to_string(),
            loader,
            kind,
            state: LoadState::Unloaded,
            flags: ClassFlags::default(),
            layout: LayoutDescriptor::NEUTRAL,
            hierarchy: None,
        }));
        self.names.insert(key, id);
        Ok(id)
    }

    /// Finish loading a declared class
    ///
    /// The name and loader of the declaration win over those in `def`.
    pub fn complete_loading(&self, id: HeapIdentity, def: ClassDef) -> Result<(), TableError> {
        let mut entries = self.entries.write();
        let (name, loader) = match entry_at(&entries, id) {
            Some(entry) if entry.state == LoadState::Loaded => {
                return Err(TableError::AlreadyLoaded(entry.name.clone()))
            }
            Some(entry) => (entry.name.clone(), entry.loader),
            None => return Err(TableError::UnknownClass(id)),
        };

        let def = ClassDef { name, loader, ..def };
        let parts = self.class_parts(&entries, &def)?;
        if let Some(Some(entry)) = entries.get_mut(index_of(id)) {
            entry.kind = parts.kind;
            entry.flags = parts.flags;
            entry.layout = parts.layout;
            entry.hierarchy = Some(parts.hierarchy);
            entry.state = LoadState::Loaded;
        }
        Ok(())
    }

    /// Get or create the array class with the given element
    ///
    /// Arrays follow their element: `B[]` extends `A[]` when `B` extends `A`,
    /// and implements `I[]` when `B` implements `I`. Those supertype arrays
    /// are created first if missing. `interfaces` (usually `Cloneable` and
    /// `Serializable`) are implemented by every array this call creates.
    pub fn array_of(
        &self,
        element: ArrayElement,
        interfaces: &[HeapIdentity],
    ) -> Result<HeapIdentity, TableError> {
        let mut entries = self.entries.write();
        self.array_in(&mut entries, element, interfaces)
    }

    fn array_in(
        &self,
        entries: &mut Vec<Option<ClassEntry>>,
        element: ArrayElement,
        interfaces: &[HeapIdentity],
    ) -> Result<HeapIdentity, TableError> {
        let (name, loader, element_type, modifier, element_primary, lineage) = match element {
            ArrayElement::Primitive(bt) if !bt.is_reference() && bt != BasicType::Void => (
                format!("[{}", primitive_descriptor(bt)),
                LoaderId::BOOTSTRAP,
                bt,
                access::ACC_PUBLIC,
                true,
                None,
            ),
            ArrayElement::Primitive(bt) => {
                return Err(TableError::IllegalSuper {
                    name: bt.name().to_string(),
                    reason: "not an array element type",
                })
            }
            ArrayElement::Class(elem) => {
                let entry = loaded_entry(entries.as_slice(), elem)?;
                let hierarchy = entry
                    .hierarchy
                    .as_ref()
                    .ok_or_else(|| TableError::NotLoaded(entry.name.clone()))?;
                // Interfaces hang off the root, so `I[]` extends `Object[]`
                let lineage = (elem != self.root).then(|| {
                    let parent = hierarchy.supers.last().copied().unwrap_or(self.root);
                    let implemented: Vec<HeapIdentity> = hierarchy
                        .secondary_supers
                        .iter()
                        .filter(|s| !hierarchy.supers.contains(s))
                        .copied()
                        .collect();
                    (parent, implemented)
                });
                (
                    format!("[{}", class_descriptor(&entry.name)),
                    entry.loader,
                    BasicType::Object,
                    entry.flags.modifier_flags & access::ACC_PUBLIC,
                    hierarchy.can_be_primary_super,
                    lineage,
                )
            }
        };

        let key = (loader, name.clone());
        if let Some(existing) = self.names.get(&key) {
            return Ok(*existing.value());
        }

        let (supers, mut secondary_supers) = match lineage {
            None => (vec![self.root], Vec::new()),
            Some((parent, implemented)) => {
                let super_array = self.array_in(entries, ArrayElement::Class(parent), interfaces)?;
                let super_hierarchy = loaded_entry(entries.as_slice(), super_array)?
                    .hierarchy
                    .clone()
                    .ok_or(TableError::UnknownClass(super_array))?;
                let mut supers = super_hierarchy.supers;
                supers.push(super_array);
                let mut secondary = super_hierarchy.secondary_supers;
                for s in implemented {
                    let array = self.array_in(entries, ArrayElement::Class(s), interfaces)?;
                    push_unique(&mut secondary, array);
                }
                (supers, secondary)
            }
        };

        for &iface in interfaces {
            let entry = loaded_entry(entries.as_slice(), iface)?;
            if entry.kind != ClassKind::Interface {
                return Err(TableError::NotAnInterface(entry.name.clone()));
            }
            push_unique(&mut secondary_supers, iface);
            if let Some(h) = &entry.hierarchy {
                for &s in &h.secondary_supers {
                    push_unique(&mut secondary_supers, s);
                }
            }
        }
        for &s in supers.iter().skip(self.display_capacity) {
            push_unique(&mut secondary_supers, s);
        }

        // Arrays of interfaces are found through secondary supers only
        let depth = supers.len();
        let can_be_primary_super = element_primary && depth < self.display_capacity;
        let super_check_offset = if can_be_primary_super {
            layout::primary_slot_offset(depth)
        } else {
            layout::SECONDARY_SUPER_CACHE_OFFSET
        };

        let flags = modifier | access::ACC_ABSTRACT | access::ACC_FINAL;
        let id = identity_of(entries.len());
        entries.push(Some(ClassEntry {
            name,
            loader,
            kind: ClassKind::Array(element_type),
            state: LoadState::Loaded,
            flags: ClassFlags {
                access_flags: flags,
                modifier_flags: flags,
            },
            layout: LayoutDescriptor::array(element_type, ARRAY_HEADER_SIZE),
            hierarchy: Some(HierarchyRecord {
                supers,
                secondary_supers,
                can_be_primary_super,
                super_check_offset,
                display_capacity: self.display_capacity,
            }),
        }));
        self.names.insert(key, id);
        Ok(id)
    }

    /// Remove a class, pausing all heap readers while doing so
    ///
    /// Must not be called from a thread holding a scope on this table's gate.
    pub fn unload(&self, id: HeapIdentity) -> Result<(), TableError> {
        let _pause = self.gate.pause()?;
        let mut entries = self.entries.write();
        let slot = entries
            .get_mut(index_of(id))
            .ok_or(TableError::UnknownClass(id))?;
        let entry = slot.as_ref().ok_or(TableError::UnknownClass(id))?;
        if id == self.root {
            return Err(TableError::Pinned(entry.name.clone()));
        }
        let key = (entry.loader, entry.name.clone());
        *slot = None;
        self.names.remove(&key);
        tracing::debug!(%id, name = %key.1, "class unloaded");
        Ok(())
    }

    fn check_loader(&self, loader: LoaderId) -> Result<(), TableError> {
        if (loader.as_u32() as usize) < self.loader_parents.read().len() {
            Ok(())
        } else {
            Err(TableError::UnknownLoader(loader.as_u32()))
        }
    }

    /// `loader` followed by its ancestors up to the bootstrap loader
    fn loader_chain(&self, loader: LoaderId) -> Result<Vec<LoaderId>, TableError> {
        let parents = self.loader_parents.read();
        let mut chain = vec![loader];
        let mut current = loader;
        loop {
            match parents.get(current.as_u32() as usize) {
                Some(Some(parent)) => {
                    chain.push(*parent);
                    current = *parent;
                }
                Some(None) => return Ok(chain),
                None => return Err(TableError::UnknownLoader(current.as_u32())),
            }
        }
    }

    fn class_parts(
        &self,
        entries: &[Option<ClassEntry>],
        def: &ClassDef,
    ) -> Result<LoadedParts, TableError> {
        let superclass = match def.kind {
            DefKind::Interface => self.root,
            DefKind::Class => def.superclass.unwrap_or(self.root),
        };

        let super_entry = loaded_entry(entries, superclass)?;
        match super_entry.kind {
            ClassKind::Interface => {
                return Err(TableError::IllegalSuper {
                    name: super_entry.name.clone(),
                    reason: "it is an interface",
                })
            }
            ClassKind::Array(_) => {
                return Err(TableError::IllegalSuper {
                    name: super_entry.name.clone(),
                    reason: "it is an array",
                })
            }
            ClassKind::Instance => {}
        }
        if super_entry.flags.access_flags & access::ACC_FINAL != 0 {
            return Err(TableError::IllegalSuper {
                name: super_entry.name.clone(),
                reason: "it is final",
            });
        }
        let super_hierarchy = super_entry
            .hierarchy
            .as_ref()
            .ok_or_else(|| TableError::NotLoaded(super_entry.name.clone()))?;

        let mut supers = super_hierarchy.supers.clone();
        supers.push(superclass);
        let depth = supers.len();

        let mut secondary_supers = Vec::new();
        for &s in supers.iter().skip(self.display_capacity) {
            push_unique(&mut secondary_supers, s);
        }
        for &s in &super_hierarchy.secondary_supers {
            push_unique(&mut secondary_supers, s);
        }
        for &iface in &def.interfaces {
            let entry = loaded_entry(entries, iface)?;
            if entry.kind != ClassKind::Interface {
                return Err(TableError::NotAnInterface(entry.name.clone()));
            }
            push_unique(&mut secondary_supers, iface);
            if let Some(h) = &entry.hierarchy {
                for &s in &h.secondary_supers {
                    push_unique(&mut secondary_supers, s);
                }
            }
        }

        let kind = match def.kind {
            DefKind::Class => ClassKind::Instance,
            DefKind::Interface => ClassKind::Interface,
        };
        let can_be_primary_super = kind == ClassKind::Instance && depth < self.display_capacity;
        let super_check_offset = if can_be_primary_super {
            layout::primary_slot_offset(depth)
        } else {
            layout::SECONDARY_SUPER_CACHE_OFFSET
        };

        let concrete = kind == ClassKind::Instance && def.access_flags & access::ACC_ABSTRACT == 0;
        let layout = if concrete {
            LayoutDescriptor::instance(def.instance_size)
        } else {
            LayoutDescriptor::NEUTRAL
        };

        Ok(LoadedParts {
            kind,
            flags: ClassFlags {
                access_flags: def.access_flags,
                modifier_flags: def.access_flags & MODIFIER_MASK,
            },
            layout,
            hierarchy: HierarchyRecord {
                supers,
                secondary_supers,
                can_be_primary_super,
                super_check_offset,
                display_capacity: self.display_capacity,
            },
        })
    }

    fn with_entry<T>(
        &self,
        scope: &HeapEntryScope<'_>,
        id: HeapIdentity,
        read: impl FnOnce(&ClassEntry) -> Result<T, HeapError>,
    ) -> Result<T, HeapError> {
        debug_assert_eq!(
            scope.gate_id(),
            self.gate.id(),
            "heap scope opened on a foreign gate"
        );
        let entries = self.entries.read();
        let entry = entry_at(&entries, id).ok_or(HeapError::UnknownIdentity(id))?;
        read(entry)
    }
}

impl MetadataStore for ClassTable {
    fn gate(&self) -> &HeapGate {
        &self.gate
    }

    fn read_name(&self, scope: &HeapEntryScope<'_>, id: HeapIdentity) -> Result<String, HeapError> {
        self.with_entry(scope, id, |e| Ok(e.name.clone()))
    }

    fn read_load_state(
        &self,
        scope: &HeapEntryScope<'_>,
        id: HeapIdentity,
    ) -> Result<LoadState, HeapError> {
        self.with_entry(scope, id, |e| Ok(e.state))
    }

    fn read_kind(&self, scope: &HeapEntryScope<'_>, id: HeapIdentity) -> Result<ClassKind, HeapError> {
        self.with_entry(scope, id, |e| Ok(e.kind))
    }

    fn read_layout(
        &self,
        scope: &HeapEntryScope<'_>,
        id: HeapIdentity,
    ) -> Result<LayoutDescriptor, HeapError> {
        self.with_entry(scope, id, |e| Ok(e.layout))
    }

    fn read_hierarchy(
        &self,
        scope: &HeapEntryScope<'_>,
        id: HeapIdentity,
    ) -> Result<HierarchyRecord, HeapError> {
        self.with_entry(scope, id, |e| {
            e.hierarchy
                .clone()
                .ok_or_else(|| HeapError::StoreFailure(format!("{} is not loaded", e.name)))
        })
    }

    fn read_flags(&self, scope: &HeapEntryScope<'_>, id: HeapIdentity) -> Result<ClassFlags, HeapError> {
        self.with_entry(scope, id, |e| Ok(e.flags))
    }

    fn read_prototype_header(
        &self,
        scope: &HeapEntryScope<'_>,
        id: HeapIdentity,
    ) -> Result<u64, HeapError> {
        self.with_entry(scope, id, |_| Ok(UNLOCKED_PROTOTYPE))
    }

    fn read_loader(&self, scope: &HeapEntryScope<'_>, id: HeapIdentity) -> Result<LoaderId, HeapError> {
        self.with_entry(scope, id, |e| Ok(e.loader))
    }

    fn find_by_name_and_loader(
        &self,
        scope: &HeapEntryScope<'_>,
        loader: LoaderId,
        name: &str,
    ) -> Result<Option<HeapIdentity>, HeapError> {
        debug_assert_eq!(scope.gate_id(), self.gate.id(), "heap scope opened on a foreign gate");
        let chain = self
            .loader_chain(loader)
            .map_err(|e| HeapError::StoreFailure(e.to_string()))?;
        // Parent-first delegation
        Ok(chain
            .iter()
            .rev()
            .find_map(|l| self.names.get(&(*l, name.to_string())).map(|e| *e.value())))
    }
}

fn identity_of(index: usize) -> HeapIdentity {
    HeapIdentity::new(index as u64 + 1).unwrap_or_else(|| unreachable!("index + 1 is non-zero"))
}

fn index_of(id: HeapIdentity) -> usize {
    (id.as_u64() - 1) as usize
}

fn entry_at(entries: &[Option<ClassEntry>], id: HeapIdentity) -> Option<&ClassEntry> {
    entries.get(index_of(id)).and_then(Option::as_ref)
}

fn loaded_entry(entries: &[Option<ClassEntry>], id: HeapIdentity) -> Result<&ClassEntry, TableError> {
    let entry = entry_at(entries, id).ok_or(TableError::UnknownClass(id))?;
    if entry.state != LoadState::Loaded {
        return Err(TableError::NotLoaded(entry.name.clone()));
    }
    Ok(entry)
}

fn push_unique(list: &mut Vec<HeapIdentity>, id: HeapIdentity) {
    if !list.contains(&id) {
        list.push(id);
    }
}

/// Field descriptor of a class name: arrays keep their name, classes become `L<name>;`
fn class_descriptor(name: &str) -> String {
    if name.starts_with('[') {
        name.to_string()
    } else {
        format!("L{name};")
    }
}

fn primitive_descriptor(bt: BasicType) -> char {
    match bt {
        BasicType::Boolean => 'Z',
        BasicType::Char => 'C',
        BasicType::Float => 'F',
        BasicType::Double => 'D',
        BasicType::Byte => 'B',
        BasicType::Short => 'S',
        BasicType::Int => 'I',
        BasicType::Long => 'J',
        BasicType::Object => 'L',
        BasicType::Array => '[',
        BasicType::Void => 'V',
    }
}
