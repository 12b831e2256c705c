//! The per-compilation type oracle
//!
//! A [`TypeOracle`] belongs to exactly one compilation task. It owns an
//! arena of [`TypeHandle`]s and an identity-keyed cache guaranteeing at most
//! one handle per heap object. Store reads happen only inside a
//! [`HeapEntryScope`]; once a handle is built no further reads are needed
//! to answer questions about it.
//!
//! Dropping the oracle frees every handle it produced.

use crate::config::OracleOptions;
use crate::error::{OracleError, OracleResult};
use crate::handle::{
    basic_type_of_name, external_name, HierarchyDescriptor, LoadedClass, SessionId, TypeHandle,
    TypeRef, TypeState, UnloadedClass,
};
use crate::heap::{BasicType, HeapEntryScope, HeapIdentity, LoadState, MetadataStore};
use crate::hierarchy;
use crate::interner::{NameInterner, NameRef};
use rustc_hash::FxHashMap;
use std::ops::Index;
use std::sync::Arc;

/// Counters for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OracleStats {
    /// `resolve` calls answered from the cache
    pub cache_hits: usize,
    /// Heap scopes opened
    pub heap_entries: usize,
    /// Handles built from heap reads
    pub handles_built: usize,
    /// Unloaded handles replaced by loaded ones
    pub superseded: usize,
}

/// Session-scoped cache of type handles
pub struct TypeOracle {
    session: SessionId,
    store: Arc<dyn MetadataStore>,
    options: OracleOptions,
    names: NameInterner,
    /// Arena; indices are stable for the oracle's lifetime
    handles: Vec<TypeHandle>,
    by_identity: FxHashMap<HeapIdentity, TypeRef>,
    /// Name-only placeholders
    unloaded_by_name: FxHashMap<NameRef, TypeRef>,
    /// Best handle known for each name; loaded handles win
    by_name: FxHashMap<NameRef, TypeRef>,
    primitives: FxHashMap<BasicType, TypeRef>,
    stats: OracleStats,
}

impl TypeOracle {
    /// Start a session over `store` with default options
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self::with_options(store, OracleOptions::default())
    }

    /// Start a session with explicit options
    pub fn with_options(store: Arc<dyn MetadataStore>, options: OracleOptions) -> Self {
        let session = SessionId::next();
        tracing::debug!(session = session.as_u32(), ?options, "type oracle created");
        Self {
            session,
            store,
            options,
            names: NameInterner::new(),
            handles: Vec::new(),
            by_identity: FxHashMap::default(),
            unloaded_by_name: FxHashMap::default(),
            by_name: FxHashMap::default(),
            primitives: FxHashMap::default(),
            stats: OracleStats::default(),
        }
    }

    /// This session's identity
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Options in force
    pub fn options(&self) -> &OracleOptions {
        &self.options
    }

    /// Session counters
    pub fn stats(&self) -> OracleStats {
        self.stats
    }

    /// Number of handles in the arena
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Check if no handle has been created
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// The session's name interner
    pub fn names(&self) -> &NameInterner {
        &self.names
    }

    /// Look up a handle, rejecting refs from other sessions
    pub fn get(&self, ty: TypeRef) -> OracleResult<&TypeHandle> {
        if ty.session() != self.session {
            return Err(OracleError::precondition(
                "get",
                format!(
                    "type ref from session {} used in session {}",
                    ty.session().as_u32(),
                    self.session.as_u32()
                ),
            ));
        }
        self.handles.get(ty.index()).ok_or_else(|| {
            OracleError::precondition("get", format!("no handle at index {}", ty.index()))
        })
    }

    /// Internal name text of a handle
    pub fn name_of(&self, ty: TypeRef) -> OracleResult<&str> {
        let handle = self.get(ty)?;
        Ok(self.names.resolve(handle.name))
    }

    /// Print form: `name=<internal name> loaded=<bool>`
    pub fn describe(&self, ty: TypeRef) -> OracleResult<String> {
        let handle = self.get(ty)?;
        Ok(format!(
            "name={} loaded={}",
            self.names.resolve(handle.name),
            handle.is_loaded()
        ))
    }

    /// Cached handle for an identity, without touching the heap
    pub fn cached(&self, id: HeapIdentity) -> Option<TypeRef> {
        self.by_identity.get(&id).copied()
    }

    /// Best cached handle for a name; loaded handles supersede placeholders
    pub fn cached_by_name(&self, name: &str) -> Option<TypeRef> {
        let name = self.names.get(name)?;
        self.by_name.get(&name).copied()
    }

    /// Handle for the heap object `id`
    ///
    /// Returns the cached handle when there is one. A cached unloaded handle
    /// is re-checked: if the class has since loaded, a new handle replaces it.
    pub fn resolve(&mut self, id: HeapIdentity) -> OracleResult<TypeRef> {
        if let Some(ty) = self.loaded_hit(id) {
            return Ok(ty);
        }

        let store = Arc::clone(&self.store);
        let scope = self.enter(store.as_ref())?;
        self.resolve_in_scope(store.as_ref(), &scope, id)
    }

    /// Placeholder for a type known only by name
    ///
    /// `hint` must be [`BasicType::Object`] or [`BasicType::Array`].
    pub fn resolve_unloaded(&mut self, name: &str, hint: BasicType) -> OracleResult<TypeRef> {
        if !hint.is_reference() {
            return Err(OracleError::precondition(
                "resolve_unloaded",
                format!("{name} cannot be a {} placeholder", hint.name()),
            ));
        }

        let name_ref = self.intern(name)?;
        if self.options.dedup_unloaded {
            if let Some(&ty) = self.unloaded_by_name.get(&name_ref) {
                return Ok(ty);
            }
        }

        let ty = self.alloc(TypeHandle {
            name: name_ref,
            external_name: external_name(name).into_boxed_str(),
            state: TypeState::Unloaded(UnloadedClass {
                identity: None,
                basic_type: hint,
            }),
        })?;
        if self.options.dedup_unloaded {
            self.unloaded_by_name.insert(name_ref, ty);
        }
        self.by_name.entry(name_ref).or_insert(ty);
        tracing::trace!(session = self.session.as_u32(), name, "unloaded placeholder created");
        Ok(ty)
    }

    /// Find `name` through the defining loader of `from`
    ///
    /// `from` must be loaded. A missing class is `NotFound`.
    pub fn find_by_name(&mut self, from: TypeRef, name: &str) -> OracleResult<TypeRef> {
        let loader = self.get(from)?.loader()?;

        let store = Arc::clone(&self.store);
        let scope = self.enter(store.as_ref())?;
        match store.find_by_name_and_loader(&scope, loader, name)? {
            Some(id) => self.resolve_in_scope(store.as_ref(), &scope, id),
            None => Err(OracleError::NotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Like [`find_by_name`](Self::find_by_name), falling back to an unloaded placeholder
    pub fn find_by_name_or_unloaded(&mut self, from: TypeRef, name: &str) -> OracleResult<TypeRef> {
        match self.find_by_name(from, name) {
            Err(OracleError::NotFound { .. }) => {
                self.resolve_unloaded(name, basic_type_of_name(name))
            }
            result => result,
        }
    }

    /// Handle for a primitive type
    pub fn primitive(&mut self, bt: BasicType) -> OracleResult<TypeRef> {
        if bt.is_reference() {
            return Err(OracleError::precondition(
                "primitive",
                format!("{} is not a primitive type", bt.name()),
            ));
        }
        if let Some(&ty) = self.primitives.get(&bt) {
            return Ok(ty);
        }
        let name = self.intern(bt.name())?;
        let ty = self.alloc(TypeHandle {
            name,
            external_name: bt.name().into(),
            state: TypeState::Primitive(bt),
        })?;
        self.primitives.insert(bt, ty);
        Ok(ty)
    }

    /// See [`hierarchy::is_subtype_of`]
    pub fn is_subtype_of(&self, a: TypeRef, b: TypeRef) -> OracleResult<bool> {
        hierarchy::is_subtype_of(self, a, b)
    }

    /// See [`hierarchy::is_subclass_of`]
    pub fn is_subclass_of(&self, a: TypeRef, b: TypeRef) -> OracleResult<bool> {
        hierarchy::is_subclass_of(self, a, b)
    }

    /// See [`hierarchy::super_of_depth`]
    pub fn super_of_depth(&mut self, a: TypeRef, depth: usize) -> OracleResult<Option<TypeRef>> {
        hierarchy::super_of_depth(self, a, depth)
    }

    /// See [`hierarchy::least_common_ancestor`]
    pub fn least_common_ancestor(&mut self, a: TypeRef, b: TypeRef) -> OracleResult<TypeRef> {
        hierarchy::least_common_ancestor(self, a, b)
    }

    fn loaded_hit(&mut self, id: HeapIdentity) -> Option<TypeRef> {
        let ty = *self.by_identity.get(&id)?;
        if self.handles[ty.index()].is_loaded() {
            self.stats.cache_hits += 1;
            tracing::trace!(session = self.session.as_u32(), %id, "handle cache hit");
            Some(ty)
        } else {
            None
        }
    }

    fn enter<'s>(&mut self, store: &'s dyn MetadataStore) -> OracleResult<HeapEntryScope<'s>> {
        let scope = match self.options.scope_timeout() {
            Some(timeout) => store.gate().enter_timeout(timeout)?,
            None => store.gate().enter()?,
        };
        self.stats.heap_entries += 1;
        Ok(scope)
    }

    fn resolve_in_scope(
        &mut self,
        store: &dyn MetadataStore,
        scope: &HeapEntryScope<'_>,
        id: HeapIdentity,
    ) -> OracleResult<TypeRef> {
        if let Some(ty) = self.loaded_hit(id) {
            return Ok(ty);
        }

        let state = store.read_load_state(scope, id)?;
        let cached_unloaded = self.by_identity.get(&id).copied();
        if let (Some(ty), LoadState::Unloaded) = (cached_unloaded, state) {
            return Ok(ty);
        }

        let text = store.read_name(scope, id)?;
        let name = self.intern(&text)?;
        let state = match state {
            LoadState::Loaded => {
                let record = store.read_hierarchy(scope, id)?;
                let hierarchy = HierarchyDescriptor::from_record(
                    record,
                    id,
                    &text,
                    self.options.verify_hierarchy,
                )?;
                TypeState::Loaded(Box::new(LoadedClass {
                    identity: id,
                    kind: store.read_kind(scope, id)?.into(),
                    layout: store.read_layout(scope, id)?,
                    hierarchy,
                    flags: store.read_flags(scope, id)?,
                    loader: store.read_loader(scope, id)?,
                    prototype_header: store.read_prototype_header(scope, id)?,
                }))
            }
            LoadState::Unloaded => TypeState::Unloaded(UnloadedClass {
                identity: Some(id),
                basic_type: basic_type_of_name(&text),
            }),
        };
        let loaded = matches!(state, TypeState::Loaded(_));

        let ty = self.alloc(TypeHandle {
            name,
            external_name: external_name(&text).into_boxed_str(),
            state,
        })?;
        self.by_identity.insert(id, ty);
        self.stats.handles_built += 1;

        if loaded {
            self.by_name.insert(name, ty);
            if cached_unloaded.is_some() {
                self.stats.superseded += 1;
                tracing::debug!(session = self.session.as_u32(), name = %text, "unloaded handle superseded");
            }
        } else {
            self.by_name.entry(name).or_insert(ty);
        }

        tracing::debug!(session = self.session.as_u32(), %id, name = %text, loaded, "type handle built");
        Ok(ty)
    }

    fn intern(&mut self, text: &str) -> OracleResult<NameRef> {
        self.names.intern(text).ok_or_else(|| {
            let limit = self.names.len();
            tracing::warn!(session = self.session.as_u32(), limit, "name interner exhausted");
            OracleError::ResourceExhausted { limit }
        })
    }

    fn alloc(&mut self, handle: TypeHandle) -> OracleResult<TypeRef> {
        let limit = self.options.max_handles.unwrap_or(u32::MAX as usize);
        let index = self.handles.len();
        if index >= limit {
            tracing::warn!(session = self.session.as_u32(), limit, "type oracle arena exhausted");
            return Err(OracleError::ResourceExhausted { limit });
        }
        let index = u32::try_from(index).map_err(|_| OracleError::ResourceExhausted { limit })?;
        self.handles.push(handle);
        Ok(TypeRef::new(self.session, index))
    }
}

impl Index<TypeRef> for TypeOracle {
    type Output = TypeHandle;

    /// # Panics
    ///
    /// Panics if `ty` came from another session.
    fn index(&self, ty: TypeRef) -> &TypeHandle {
        match self.get(ty) {
            Ok(handle) => handle,
            Err(err) => panic!("{err}"),
        }
    }
}

impl std::fmt::Debug for TypeOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeOracle")
            .field("session", &self.session)
            .field("handles", &self.handles.len())
            .field("options", &self.options)
            .field("stats", &self.stats)
            .finish()
    }
}
