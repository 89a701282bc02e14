use std::{collections::HashMap, convert::TryFrom};

use crate::{
    entry::*,
    mutf8,
    resolved::{DynamicRef, MemberRef, NameAndType, Resolved},
    ConstantPoolError, Result,
};

#[macro_export]
macro_rules! matches_pool_entry {
    ($cp:expr, $index:expr, $i:ident) => {
        match $cp.entry($index)? {
            $crate::PoolEntry::$i(n) => Ok(n),
            e => Err($crate::ConstantPoolError::TypeMismatch {
                index: $index,
                expected: $crate::KindSet::from($crate::Tag::$i),
                found: e.tag(),
            }),
        }
    };
}

/// Largest value the `constant_pool_count` header can hold. The pool's
/// [`size`](ConstantPool::size) never exceeds it.
pub const MAX_POOL_SIZE: usize = u16::MAX as usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolState {
    /// Entries may still be added; requests are interned.
    Building,
    /// Read-only. There is no way back to `Building`.
    Sealed,
}

/// An index-addressed arena of constant pool entries.
///
/// Slot `i` of the arena holds pool index `i + 1`; index 0 is never valid.
/// The second slot of a `Long` or `Double` is `None` and can't be addressed.
#[derive(Debug, Clone)]
pub struct ConstantPool {
    slots: Vec<Option<PoolEntry>>,
    interned: HashMap<PoolEntry, u16>,
    state: PoolState,
}
impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}
impl ConstantPool {
    /// Creates an empty pool in the `Building` state.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            interned: HashMap::new(),
            state: PoolState::Building,
        }
    }

    /// Wraps slots read from a class file. The result is sealed and keeps the
    /// exact index assignment of the input.
    pub(crate) fn from_slots(slots: Vec<Option<PoolEntry>>) -> Self {
        Self {
            slots,
            interned: HashMap::new(),
            state: PoolState::Sealed,
        }
    }

    /// The `constant_pool_count` value: one more than the highest index.
    pub fn size(&self) -> usize {
        self.slots.len() + 1
    }

    /// Whether the pool has no entries at all.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn state(&self) -> PoolState {
        self.state
    }

    pub fn is_sealed(&self) -> bool {
        self.state == PoolState::Sealed
    }

    /// Makes the pool read-only. Sealing twice is a no-op.
    pub fn seal(&mut self) {
        if self.state == PoolState::Building {
            log::debug!("Sealing constant pool of size {}", self.size());
            self.state = PoolState::Sealed;
            self.interned = HashMap::new();
        }
    }

    /// Returns a `Building` copy of this pool that keeps every existing index
    /// and interns new requests against the existing entries.
    pub fn to_builder(&self) -> ConstantPool {
        let mut interned = HashMap::with_capacity(self.slots.len());
        for (index, entry) in self.iter() {
            interned.entry(entry.clone()).or_insert(index);
        }

        ConstantPool {
            slots: self.slots.clone(),
            interned,
            state: PoolState::Building,
        }
    }

    /// Physical entries in index order, skipping the shadow slots of wide entries.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &PoolEntry)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|entry| ((i + 1) as u16, entry)))
    }

    pub fn entry(&self, index: u16) -> Result<&PoolEntry> {
        let out_of_range = || ConstantPoolError::IndexOutOfRange {
            index,
            size: self.size(),
        };

        if index == 0 {
            return Err(out_of_range());
        }

        self.slots
            .get(index as usize - 1)
            .and_then(Option::as_ref)
            .ok_or_else(out_of_range)
    }

    /// Looks up `index` and checks that its kind is one of `expected`.
    pub fn get(&self, index: u16, expected: impl Into<KindSet>) -> Result<&PoolEntry> {
        let expected = expected.into();
        let entry = self.entry(index)?;

        if !expected.contains_tag(entry.tag()) {
            return Err(ConstantPoolError::TypeMismatch {
                index,
                expected,
                found: entry.tag(),
            });
        }

        Ok(entry)
    }

    pub fn utf8(&self, index: u16) -> Result<&str> {
        Ok(matches_pool_entry!(self, index, Utf8)?.as_str())
    }

    pub fn integer(&self, index: u16) -> Result<i32> {
        Ok(*matches_pool_entry!(self, index, Integer)?)
    }

    pub fn float(&self, index: u16) -> Result<f32> {
        Ok(matches_pool_entry!(self, index, Float)?.value())
    }

    pub fn long(&self, index: u16) -> Result<i64> {
        Ok(*matches_pool_entry!(self, index, Long)?)
    }

    pub fn double(&self, index: u16) -> Result<f64> {
        Ok(matches_pool_entry!(self, index, Double)?.value())
    }

    pub fn class(&self, index: u16) -> Result<&ClassInfo> {
        matches_pool_entry!(self, index, Class)
    }

    pub fn name_and_type(&self, index: u16) -> Result<&NameAndTypeInfo> {
        matches_pool_entry!(self, index, NameAndType)
    }

    /// The internal-form name of the `Class` entry at `index`.
    pub fn class_name(&self, index: u16) -> Result<&str> {
        let ClassInfo { name_index } = self.class(index)?;

        self.utf8(*name_index)
    }

    /// The text of the `String` entry at `index`.
    pub fn string(&self, index: u16) -> Result<&str> {
        let StringInfo { string_index } = matches_pool_entry!(self, index, String)?;

        self.utf8(*string_index)
    }

    /// Dereferences the entry at `index` all the way down to names,
    /// descriptors and values.
    pub fn resolve(&self, index: u16) -> Result<Resolved<'_>> {
        let resolved = match self.entry(index)? {
            PoolEntry::Utf8(info) => Resolved::Utf8(info.as_str()),
            PoolEntry::Integer(value) => Resolved::Integer(*value),
            PoolEntry::Float(info) => Resolved::Float(info.value()),
            PoolEntry::Long(value) => Resolved::Long(*value),
            PoolEntry::Double(info) => Resolved::Double(info.value()),
            PoolEntry::Class(info) => Resolved::Class(self.utf8(info.name_index)?),
            PoolEntry::String(info) => Resolved::String(self.utf8(info.string_index)?),
            PoolEntry::FieldRef(_) => Resolved::FieldRef(self.resolve_member(index)?),
            PoolEntry::MethodRef(_) => Resolved::MethodRef(self.resolve_member(index)?),
            PoolEntry::InterfaceMethodRef(_) => {
                Resolved::InterfaceMethodRef(self.resolve_member(index)?)
            }
            PoolEntry::NameAndType(_) => Resolved::NameAndType(self.resolve_name_and_type(index)?),
            PoolEntry::MethodHandle(info) => {
                let kind = ReferenceKind::try_from(info.reference_kind)
                    .map_err(ConstantPoolError::InvalidReferenceKind)?;
                self.get(info.reference_index, kind.targets())?;

                Resolved::MethodHandle {
                    kind,
                    member: self.resolve_member(info.reference_index)?,
                }
            }
            PoolEntry::MethodType(info) => Resolved::MethodType(self.utf8(info.descriptor_index)?),
            PoolEntry::Dynamic(_) => Resolved::Dynamic(self.resolve_dynamic(index)?),
            PoolEntry::InvokeDynamic(_) => Resolved::InvokeDynamic(self.resolve_dynamic(index)?),
            PoolEntry::Module(info) => Resolved::Module(self.utf8(info.name_index)?),
            PoolEntry::Package(info) => Resolved::Package(self.utf8(info.name_index)?),
        };

        Ok(resolved)
    }

    /// Resolves a `Fieldref`, `Methodref` or `InterfaceMethodref`.
    pub fn resolve_member(&self, index: u16) -> Result<MemberRef<'_>> {
        let entry = self.get(index, KindSet::MEMBER_REF)?;
        let (PoolEntry::FieldRef(info)
        | PoolEntry::MethodRef(info)
        | PoolEntry::InterfaceMethodRef(info)) = entry
        else {
            return Err(ConstantPoolError::TypeMismatch {
                index,
                expected: KindSet::MEMBER_REF,
                found: entry.tag(),
            });
        };

        let owner = self.class_name(info.class_index)?;
        let NameAndType { name, descriptor } =
            self.resolve_name_and_type(info.name_and_type_index)?;

        Ok(MemberRef {
            kind: entry.tag(),
            owner,
            name,
            descriptor,
        })
    }

    pub fn resolve_name_and_type(&self, index: u16) -> Result<NameAndType<'_>> {
        let NameAndTypeInfo {
            name_index,
            descriptor_index,
        } = self.name_and_type(index)?;

        Ok(NameAndType {
            name: self.utf8(*name_index)?,
            descriptor: self.utf8(*descriptor_index)?,
        })
    }

    /// Resolves a `Dynamic` or `InvokeDynamic`. The bootstrap method index is
    /// passed through as-is; it points into the `BootstrapMethods` attribute.
    pub fn resolve_dynamic(&self, index: u16) -> Result<DynamicRef<'_>> {
        let expected = KindSet::DYNAMIC | KindSet::INVOKE_DYNAMIC;
        let entry = self.get(index, expected)?;
        let (PoolEntry::Dynamic(info) | PoolEntry::InvokeDynamic(info)) = entry else {
            return Err(ConstantPoolError::TypeMismatch {
                index,
                expected,
                found: entry.tag(),
            });
        };

        let NameAndType { name, descriptor } =
            self.resolve_name_and_type(info.name_and_type_index)?;

        Ok(DynamicRef {
            bootstrap_method_attr_index: info.bootstrap_method_attr_index,
            name,
            descriptor,
        })
    }

    /// Checks that every reference held by every entry lands on an existing
    /// entry of an acceptable kind.
    ///
    /// Decoding accepts forward references, so a freshly parsed pool has not
    /// been checked yet.
    pub fn validate_references(&self) -> Result<()> {
        for (_, entry) in self.iter() {
            if let PoolEntry::MethodHandle(info) = entry {
                ReferenceKind::try_from(info.reference_kind)
                    .map_err(ConstantPoolError::InvalidReferenceKind)?;
            }

            for reference in entry.references() {
                self.get(reference.index, reference.expected)?;
            }
        }

        Ok(())
    }

    /// Interns `entry`, returning the index of an identical entry if there
    /// is one.
    ///
    /// Every index the entry references must already exist with the right
    /// kind. On error the pool is unchanged.
    pub fn add_entry(&mut self, entry: PoolEntry) -> Result<u16> {
        if self.is_sealed() {
            return Err(ConstantPoolError::ImmutabilityViolation);
        }

        if let PoolEntry::MethodHandle(info) = &entry {
            ReferenceKind::try_from(info.reference_kind)
                .map_err(ConstantPoolError::InvalidReferenceKind)?;
        }
        for reference in entry.references() {
            self.get(reference.index, reference.expected)?;
        }

        if let Some(&index) = self.interned.get(&entry) {
            return Ok(index);
        }

        let width = entry.slot_width() as usize;
        if self.size() + width > MAX_POOL_SIZE {
            return Err(ConstantPoolError::PoolOverflow {
                size: self.size(),
                adding: width,
            });
        }

        let index = self.size() as u16;
        self.interned.insert(entry.clone(), index);
        self.slots.push(Some(entry));
        if width == 2 {
            self.slots.push(None);
        }

        Ok(index)
    }

    /// Interns a Utf8 entry from already encoded modified UTF-8 bytes.
    pub fn add_utf8(&mut self, bytes: &[u8]) -> Result<u16> {
        if bytes.len() > u16::MAX as usize {
            return Err(ConstantPoolError::Utf8TooLong(bytes.len()));
        }
        let text = mutf8::decode(bytes)
            .map_err(|offset| ConstantPoolError::MalformedUtf8 { offset })?
            .into_owned();

        self.add_entry(PoolEntry::Utf8(Utf8Info::new(bytes.to_vec(), text)))
    }

    pub fn add_utf8_str(&mut self, s: &str) -> Result<u16> {
        let bytes = mutf8::encode(s);
        if bytes.len() > u16::MAX as usize {
            return Err(ConstantPoolError::Utf8TooLong(bytes.len()));
        }

        self.add_entry(PoolEntry::Utf8(Utf8Info::new(
            bytes.into_owned(),
            s.to_owned(),
        )))
    }

    pub fn add_integer(&mut self, value: i32) -> Result<u16> {
        self.add_entry(PoolEntry::Integer(value))
    }

    pub fn add_float(&mut self, value: f32) -> Result<u16> {
        self.add_entry(PoolEntry::Float(FloatInfo::from_value(value)))
    }

    pub fn add_long(&mut self, value: i64) -> Result<u16> {
        self.add_entry(PoolEntry::Long(value))
    }

    pub fn add_double(&mut self, value: f64) -> Result<u16> {
        self.add_entry(PoolEntry::Double(DoubleInfo::from_value(value)))
    }

    pub fn add_class(&mut self, name_index: u16) -> Result<u16> {
        self.add_entry(PoolEntry::Class(ClassInfo { name_index }))
    }

    pub fn add_string(&mut self, string_index: u16) -> Result<u16> {
        self.add_entry(PoolEntry::String(StringInfo { string_index }))
    }

    pub fn add_field_ref(&mut self, class_index: u16, name_and_type_index: u16) -> Result<u16> {
        self.add_entry(PoolEntry::FieldRef(RefInfo {
            class_index,
            name_and_type_index,
        }))
    }

    pub fn add_method_ref(&mut self, class_index: u16, name_and_type_index: u16) -> Result<u16> {
        self.add_entry(PoolEntry::MethodRef(RefInfo {
            class_index,
            name_and_type_index,
        }))
    }

    pub fn add_interface_method_ref(
        &mut self,
        class_index: u16,
        name_and_type_index: u16,
    ) -> Result<u16> {
        self.add_entry(PoolEntry::InterfaceMethodRef(RefInfo {
            class_index,
            name_and_type_index,
        }))
    }

    pub fn add_name_and_type(&mut self, name_index: u16, descriptor_index: u16) -> Result<u16> {
        self.add_entry(PoolEntry::NameAndType(NameAndTypeInfo {
            name_index,
            descriptor_index,
        }))
    }

    pub fn add_method_handle(
        &mut self,
        reference_kind: ReferenceKind,
        reference_index: u16,
    ) -> Result<u16> {
        self.add_entry(PoolEntry::MethodHandle(MethodHandleInfo {
            reference_kind: reference_kind as u8,
            reference_index,
        }))
    }

    pub fn add_method_type(&mut self, descriptor_index: u16) -> Result<u16> {
        self.add_entry(PoolEntry::MethodType(MethodTypeInfo { descriptor_index }))
    }

    pub fn add_dynamic(
        &mut self,
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    ) -> Result<u16> {
        self.add_entry(PoolEntry::Dynamic(DynamicInfo {
            bootstrap_method_attr_index,
            name_and_type_index,
        }))
    }

    pub fn add_invoke_dynamic(
        &mut self,
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    ) -> Result<u16> {
        self.add_entry(PoolEntry::InvokeDynamic(DynamicInfo {
            bootstrap_method_attr_index,
            name_and_type_index,
        }))
    }

    pub fn add_module(&mut self, name_index: u16) -> Result<u16> {
        self.add_entry(PoolEntry::Module(ModuleInfo { name_index }))
    }

    pub fn add_package(&mut self, name_index: u16) -> Result<u16> {
        self.add_entry(PoolEntry::Package(PackageInfo { name_index }))
    }

    pub fn add_class_named(&mut self, name: &str) -> Result<u16> {
        self.transaction(|cp| {
            let name_index = cp.add_utf8_str(name)?;
            cp.add_class(name_index)
        })
    }

    pub fn add_string_value(&mut self, value: &str) -> Result<u16> {
        self.transaction(|cp| {
            let string_index = cp.add_utf8_str(value)?;
            cp.add_string(string_index)
        })
    }

    pub fn add_name_and_type_named(&mut self, name: &str, descriptor: &str) -> Result<u16> {
        self.transaction(|cp| {
            let name_index = cp.add_utf8_str(name)?;
            let descriptor_index = cp.add_utf8_str(descriptor)?;
            cp.add_name_and_type(name_index, descriptor_index)
        })
    }

    pub fn add_field_ref_named(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<u16> {
        self.transaction(|cp| {
            let (class_index, nat_index) = cp.add_member_parts(owner, name, descriptor)?;
            cp.add_field_ref(class_index, nat_index)
        })
    }

    pub fn add_method_ref_named(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u16> {
        self.transaction(|cp| {
            let (class_index, nat_index) = cp.add_member_parts(owner, name, descriptor)?;
            cp.add_method_ref(class_index, nat_index)
        })
    }

    pub fn add_interface_method_ref_named(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u16> {
        self.transaction(|cp| {
            let (class_index, nat_index) = cp.add_member_parts(owner, name, descriptor)?;
            cp.add_interface_method_ref(class_index, nat_index)
        })
    }

    pub fn add_method_type_named(&mut self, descriptor: &str) -> Result<u16> {
        self.transaction(|cp| {
            let descriptor_index = cp.add_utf8_str(descriptor)?;
            cp.add_method_type(descriptor_index)
        })
    }

    pub fn add_module_named(&mut self, name: &str) -> Result<u16> {
        self.transaction(|cp| {
            let name_index = cp.add_utf8_str(name)?;
            cp.add_module(name_index)
        })
    }

    pub fn add_package_named(&mut self, name: &str) -> Result<u16> {
        self.transaction(|cp| {
            let name_index = cp.add_utf8_str(name)?;
            cp.add_package(name_index)
        })
    }

    fn add_member_parts(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<(u16, u16)> {
        let class_index = self.add_class_named(owner)?;
        let nat_index = self.add_name_and_type_named(name, descriptor)?;

        Ok((class_index, nat_index))
    }

    /// Runs `f` and, if it fails, drops every entry it appended.
    fn transaction<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let mark = self.slots.len();
        let result = f(self);
        if result.is_err() {
            let appended: Vec<_> = self.slots.drain(mark..).flatten().collect();
            for entry in appended {
                self.interned.remove(&entry);
            }
        }

        result
    }

    /// Rebuilds this pool through interning: duplicates collapse and every
    /// entry is preceded by the entries it references.
    ///
    /// The returned map translates old indices into the new pool.
    pub fn canonical(&self) -> Result<(ConstantPool, IndexMap)> {
        let mut pool = ConstantPool::new();
        let mut remap = IndexMap(vec![0; self.size()]);

        for (index, _) in self.iter() {
            self.copy_into(index, &mut pool, &mut remap)?;
        }

        log::debug!(
            "Canonicalized constant pool: size {} -> {}",
            self.size(),
            pool.size()
        );

        Ok((pool, remap))
    }

    fn copy_into(&self, index: u16, pool: &mut ConstantPool, remap: &mut IndexMap) -> Result<u16> {
        if let Some(mapped) = remap.get(index) {
            return Ok(mapped);
        }

        // References are kind-checked before following them, so the
        // recursion only walks down the Handle -> Ref -> Class/NameAndType ->
        // Utf8 layering and terminates.
        let entry = self.entry(index)?.map_references(|reference| {
            self.get(reference.index, reference.expected)?;
            self.copy_into(reference.index, pool, remap)
        })?;
        let mapped = pool.add_entry(entry)?;
        remap.0[index as usize] = mapped;

        Ok(mapped)
    }
}
impl<'a> IntoIterator for &'a ConstantPool {
    type Item = (u16, &'a PoolEntry);
    type IntoIter = Box<dyn Iterator<Item = (u16, &'a PoolEntry)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Old-to-new index translation produced by [`ConstantPool::canonical`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMap(Vec<u16>);
impl IndexMap {
    /// The new index for `old`, or `None` for index 0, shadow slots and
    /// indices past the end of the original pool.
    pub fn get(&self, old: u16) -> Option<u16> {
        match self.0.get(old as usize) {
            Some(&0) | None => None,
            Some(&mapped) => Some(mapped),
        }
    }
}
