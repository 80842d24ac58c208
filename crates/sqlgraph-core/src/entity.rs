//! Static entity descriptors.
//!
//! An [`Entity`] describes how a struct maps onto the columns of a result
//! set: which table it lives in, which properties form its key, how each
//! property is read and written, and which fields hold relations to other
//! entities. Descriptors are plain `static` tables of function pointers,
//! normally generated by `#[derive(Entity)]`.

use crate::Result;
use crate::error::MappingError;
use crate::types::SqlType;
use crate::value::Value;
use serde::de::IgnoredAny;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::any::{Any, TypeId};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

/// A struct that can be populated from result set rows.
pub trait Entity: Default + 'static {
    /// Short type name, used by `{Name.*}` expansion macros.
    const ENTITY_NAME: &'static str;

    /// Table name, possibly schema qualified (`app.users`).
    const TABLE_NAME: &'static str;

    /// Key property names, in key order. May be empty; the mapper's key
    /// policy decides whether that is an error.
    const KEYS: &'static [&'static str];

    /// All column-mapped properties, in declaration order.
    fn properties() -> &'static [PropertyRef<Self>];

    /// Relation fields that joined entities can be attached to.
    fn relations() -> &'static [RelationRef<Self>] {
        &[]
    }

    /// Find a property by its logical name.
    fn find_property(name: &str) -> Option<&'static PropertyRef<Self>> {
        Self::properties().iter().find(|p| p.name == name)
    }

    /// Find a relation by its field name.
    fn find_relation(name: &str) -> Option<&'static RelationRef<Self>> {
        Self::relations().iter().find(|r| r.name == name)
    }
}

/// One column-mapped property of an entity.
pub struct PropertyRef<E: 'static> {
    /// Logical (Rust field) name
    pub name: &'static str,
    /// Column name in the database
    pub column_name: &'static str,
    /// Storage type, used as a bind hint for NULLs
    pub sql_type: SqlType,
    /// Rust type name, reported in conversion errors
    pub rust_type: &'static str,
    getter: Option<fn(&E) -> Value>,
    setter: Option<fn(&mut E, &Value) -> Result<()>>,
}

impl<E> PropertyRef<E> {
    /// Create a property whose column is named after it.
    pub const fn new(name: &'static str, sql_type: SqlType, rust_type: &'static str) -> Self {
        Self {
            name,
            column_name: name,
            sql_type,
            rust_type,
            getter: None,
            setter: None,
        }
    }

    /// Set the database column name.
    pub const fn column(mut self, name: &'static str) -> Self {
        self.column_name = name;
        self
    }

    /// Set the accessor used when the entity is written out.
    pub const fn getter(mut self, getter: fn(&E) -> Value) -> Self {
        self.getter = Some(getter);
        self
    }

    /// Set the mutator used when a row is mapped onto the entity.
    pub const fn setter(mut self, setter: fn(&mut E, &Value) -> Result<()>) -> Self {
        self.setter = Some(setter);
        self
    }

    pub const fn is_readable(&self) -> bool {
        self.getter.is_some()
    }

    pub const fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    /// Read the property, or `None` when it has no accessor.
    pub fn get(&self, entity: &E) -> Option<Value> {
        self.getter.map(|get| get(entity))
    }

    /// Write the property.
    ///
    /// Fails with a configuration error when the property has no mutator;
    /// conversion failures are returned as the setter reports them.
    pub fn set(&self, entity: &mut E, value: &Value) -> Result<()> {
        match self.setter {
            Some(set) => set(entity, value),
            None => Err(MappingError::configuration(
                std::any::type_name::<E>(),
                format!("property <{}> is read-only", self.name),
            )
            .into()),
        }
    }
}

impl<E> Clone for PropertyRef<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for PropertyRef<E> {}

impl<E> fmt::Debug for PropertyRef<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyRef")
            .field("name", &self.name)
            .field("column_name", &self.column_name)
            .field("sql_type", &self.sql_type)
            .field("readable", &self.is_readable())
            .field("writable", &self.is_writable())
            .finish()
    }
}

/// How many targets a relation field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// Zero or one target; a later attach overwrites.
    Single,
    /// Insertion-ordered targets without duplicates.
    List,
    /// Unordered unique targets.
    Set,
}

impl Cardinality {
    pub const fn as_str(self) -> &'static str {
        match self {
            Cardinality::Single => "single",
            Cardinality::List => "list",
            Cardinality::Set => "set",
        }
    }
}

/// Outcome of attaching a target to a relation field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attached {
    /// The target was stored (or replaced a single reference).
    Inserted,
    /// The collection already held this target.
    Present,
    /// The target is not the type this field holds.
    WrongType,
}

/// Object-safe view of a relation field.
pub trait RelationSlot {
    /// Store `target` (expected to be an `EntityRef` of the field's target
    /// type) according to the field's shape. Collections are created on
    /// first use.
    fn attach(&mut self, target: &dyn Any) -> Attached;

    /// Number of targets currently held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Static shape of a relation field type.
pub trait RelationShape: RelationSlot {
    type Target: Entity;
    const CARDINALITY: Cardinality;
}

fn push_unique<T: Entity>(list: &mut Vec<EntityRef<T>>, target: &dyn Any) -> Attached {
    let Some(target) = target.downcast_ref::<EntityRef<T>>() else {
        return Attached::WrongType;
    };
    if list.contains(target) {
        Attached::Present
    } else {
        list.push(target.clone());
        Attached::Inserted
    }
}

fn insert_unique<T: Entity>(set: &mut HashSet<EntityRef<T>>, target: &dyn Any) -> Attached {
    let Some(target) = target.downcast_ref::<EntityRef<T>>() else {
        return Attached::WrongType;
    };
    if set.insert(target.clone()) {
        Attached::Inserted
    } else {
        Attached::Present
    }
}

impl<T: Entity> RelationSlot for Option<EntityRef<T>> {
    fn attach(&mut self, target: &dyn Any) -> Attached {
        match target.downcast_ref::<EntityRef<T>>() {
            Some(target) => {
                *self = Some(target.clone());
                Attached::Inserted
            }
            None => Attached::WrongType,
        }
    }

    fn len(&self) -> usize {
        usize::from(self.is_some())
    }
}

impl<T: Entity> RelationShape for Option<EntityRef<T>> {
    type Target = T;
    const CARDINALITY: Cardinality = Cardinality::Single;
}

impl<T: Entity> RelationSlot for Option<WeakRef<T>> {
    fn attach(&mut self, target: &dyn Any) -> Attached {
        match target.downcast_ref::<EntityRef<T>>() {
            Some(target) => {
                *self = Some(target.downgrade());
                Attached::Inserted
            }
            None => Attached::WrongType,
        }
    }

    fn len(&self) -> usize {
        usize::from(self.as_ref().is_some_and(WeakRef::is_live))
    }
}

impl<T: Entity> RelationShape for Option<WeakRef<T>> {
    type Target = T;
    const CARDINALITY: Cardinality = Cardinality::Single;
}

impl<T: Entity> RelationSlot for Vec<EntityRef<T>> {
    fn attach(&mut self, target: &dyn Any) -> Attached {
        push_unique(self, target)
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }
}

impl<T: Entity> RelationShape for Vec<EntityRef<T>> {
    type Target = T;
    const CARDINALITY: Cardinality = Cardinality::List;
}

impl<T: Entity> RelationSlot for Option<Vec<EntityRef<T>>> {
    fn attach(&mut self, target: &dyn Any) -> Attached {
        if target.downcast_ref::<EntityRef<T>>().is_none() {
            return Attached::WrongType;
        }
        push_unique(self.get_or_insert_with(Vec::new), target)
    }

    fn len(&self) -> usize {
        self.as_ref().map_or(0, Vec::len)
    }
}

impl<T: Entity> RelationShape for Option<Vec<EntityRef<T>>> {
    type Target = T;
    const CARDINALITY: Cardinality = Cardinality::List;
}

impl<T: Entity> RelationSlot for HashSet<EntityRef<T>> {
    fn attach(&mut self, target: &dyn Any) -> Attached {
        insert_unique(self, target)
    }

    fn len(&self) -> usize {
        HashSet::len(self)
    }
}

impl<T: Entity> RelationShape for HashSet<EntityRef<T>> {
    type Target = T;
    const CARDINALITY: Cardinality = Cardinality::Set;
}

impl<T: Entity> RelationSlot for Option<HashSet<EntityRef<T>>> {
    fn attach(&mut self, target: &dyn Any) -> Attached {
        if target.downcast_ref::<EntityRef<T>>().is_none() {
            return Attached::WrongType;
        }
        insert_unique(self.get_or_insert_with(HashSet::new), target)
    }

    fn len(&self) -> usize {
        self.as_ref().map_or(0, HashSet::len)
    }
}

impl<T: Entity> RelationShape for Option<HashSet<EntityRef<T>>> {
    type Target = T;
    const CARDINALITY: Cardinality = Cardinality::Set;
}

/// One relation field of an entity.
pub struct RelationRef<E: 'static> {
    /// Field name
    pub name: &'static str,
    /// Shape of the field, fixed by its declared type
    pub cardinality: Cardinality,
    target: fn() -> TypeId,
    target_name: fn() -> &'static str,
    slot: fn(&mut E) -> &mut dyn RelationSlot,
}

impl<E> RelationRef<E> {
    /// Describe the field `name` of type `F`, reached through `slot`.
    pub const fn new<F: RelationShape>(
        name: &'static str,
        slot: fn(&mut E) -> &mut dyn RelationSlot,
    ) -> Self {
        Self {
            name,
            cardinality: F::CARDINALITY,
            target: TypeId::of::<F::Target>,
            target_name: std::any::type_name::<F::Target>,
            slot,
        }
    }

    /// `TypeId` of the entity this relation points at.
    pub fn target_type(&self) -> TypeId {
        (self.target)()
    }

    pub fn target_name(&self) -> &'static str {
        (self.target_name)()
    }

    /// Borrow the field on `owner`.
    pub fn slot<'a>(&self, owner: &'a mut E) -> &'a mut dyn RelationSlot {
        (self.slot)(owner)
    }
}

impl<E> Clone for RelationRef<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for RelationRef<E> {}

impl<E> fmt::Debug for RelationRef<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationRef")
            .field("name", &self.name)
            .field("cardinality", &self.cardinality)
            .field("target", &self.target_name())
            .finish()
    }
}

/// Type-erased summary of an entity, used where the concrete type is only
/// known by name (macro expansion).
#[derive(Clone, Copy)]
pub struct EntityMeta {
    pub name: &'static str,
    pub table: &'static str,
    pub type_id: TypeId,
    columns: fn() -> Vec<&'static str>,
}

fn writable_columns<T: Entity>() -> Vec<&'static str> {
    T::properties()
        .iter()
        .filter(|p| p.is_writable())
        .map(|p| p.column_name)
        .collect()
}

impl EntityMeta {
    pub fn of<T: Entity>() -> Self {
        Self {
            name: T::ENTITY_NAME,
            table: T::TABLE_NAME,
            type_id: TypeId::of::<T>(),
            columns: writable_columns::<T>,
        }
    }

    /// Columns of every writable property, in declaration order.
    pub fn columns(&self) -> Vec<&'static str> {
        (self.columns)()
    }
}

impl fmt::Debug for EntityMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityMeta")
            .field("name", &self.name)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

/// Shared handle to a mapped entity.
///
/// Equality and hashing are by instance, not by value: two handles are
/// equal only when they point at the same allocation. Inside one mapping
/// session the identity map hands out a single instance per key, so this
/// coincides with key equality there.
pub struct EntityRef<T>(Rc<RefCell<T>>);

impl<T> EntityRef<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    /// Immutably borrow the entity.
    ///
    /// Panics if the entity is currently mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    /// Mutably borrow the entity.
    ///
    /// Panics if the entity is currently borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Non-owning handle to the same instance, for back references that
    /// would otherwise form a reference cycle.
    pub fn downgrade(&self) -> WeakRef<T> {
        WeakRef(Rc::downgrade(&self.0))
    }

    /// Unwrap the entity if this is the only handle left.
    pub fn try_unwrap(self) -> std::result::Result<T, Self> {
        Rc::try_unwrap(self.0)
            .map(RefCell::into_inner)
            .map_err(Self)
    }
}

impl<T> Clone for EntityRef<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T> PartialEq for EntityRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T> Eq for EntityRef<T> {}

impl<T> Hash for EntityRef<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Rc::as_ptr(&self.0), state);
    }
}

impl<T> fmt::Debug for EntityRef<T> {
    // Relation graphs may be cyclic, so the contents are not printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EntityRef<{}>({:p})",
            std::any::type_name::<T>(),
            Rc::as_ptr(&self.0)
        )
    }
}

thread_local! {
    static SERIALIZING: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
}

/// Marks an instance as being serialized on this thread until dropped.
struct SerializeGuard(usize);

impl SerializeGuard {
    fn enter(addr: usize) -> Option<Self> {
        SERIALIZING
            .with_borrow_mut(|active| active.insert(addr))
            .then_some(Self(addr))
    }
}

impl Drop for SerializeGuard {
    fn drop(&mut self) {
        SERIALIZING.with_borrow_mut(|active| {
            active.remove(&self.0);
        });
    }
}

impl<T: Serialize> Serialize for EntityRef<T> {
    /// Serializes the entity in place. An instance reached again while it
    /// is still being written (a strong reference cycle) is an error.
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let Some(_guard) = SerializeGuard::enter(Rc::as_ptr(&self.0).addr()) else {
            return Err(S::Error::custom(format!(
                "cyclic reference to {} while serializing; use WeakRef for back references",
                std::any::type_name::<T>()
            )));
        };
        self.0.borrow().serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for EntityRef<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        T::deserialize(deserializer).map(Self::new)
    }
}

/// Weak handle to a mapped entity.
///
/// Holds a back reference (a file's owner, say) without keeping the target
/// alive, so bidirectional relations are freed with the rest of the result.
/// Back references are not serialized: they are written as `null` and
/// read back as a handle that no longer resolves.
pub struct WeakRef<T>(Weak<RefCell<T>>);

impl<T> WeakRef<T> {
    /// A handle that never resolves.
    pub fn new() -> Self {
        Self(Weak::new())
    }

    /// The target, if it is still alive.
    pub fn upgrade(&self) -> Option<EntityRef<T>> {
        self.0.upgrade().map(EntityRef)
    }

    pub fn is_live(&self) -> bool {
        self.0.strong_count() > 0
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Default for WeakRef<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for WeakRef<T> {
    fn clone(&self) -> Self {
        Self(Weak::clone(&self.0))
    }
}

impl<T> PartialEq for WeakRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T> Eq for WeakRef<T> {}

impl<T> fmt::Debug for WeakRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WeakRef<{}>({:p})",
            std::any::type_name::<T>(),
            Weak::as_ptr(&self.0)
        )
    }
}

impl<T> Serialize for WeakRef<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_none()
    }
}

impl<'de, T> Deserialize<'de> for WeakRef<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        IgnoredAny::deserialize(deserializer).map(|_| Self::new())
    }
}
