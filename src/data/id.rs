//! Identity and type descriptors for data objects.
//!
//! Objects are compared by address, never by content. [`ObjectKey`] captures
//! that address so callers can name an object without holding a strong
//! reference, which would otherwise count as an extra sharer and defeat
//! copy-on-write.
//!
//! [`DataObjectClass`] replaces runtime type information: every concrete
//! object type owns one static descriptor, descriptors form a single
//! inheritance chain, and lookups ask "is this object a member of class X".

use super::object::{DataObject, DataObjectRef};
use std::fmt;

/// Address-based identity of a shared object.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectKey(usize);

impl ObjectKey {
    pub const INVALID: ObjectKey = ObjectKey(0);

    #[inline]
    pub fn of(obj: &DataObjectRef) -> Self {
        Self::of_object(obj.as_ref())
    }

    #[inline]
    pub fn of_object(obj: &dyn DataObject) -> Self {
        ObjectKey(obj as *const dyn DataObject as *const () as usize)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl fmt::Debug for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "ObjectKey(INVALID)")
        } else {
            write!(f, "ObjectKey({:#x})", self.0)
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Static type descriptor of a data object kind.
pub struct DataObjectClass {
    name: &'static str,
    display_name: &'static str,
    parent: Option<&'static DataObjectClass>,
}

impl DataObjectClass {
    pub const fn new(
        name: &'static str,
        display_name: &'static str,
        parent: Option<&'static DataObjectClass>,
    ) -> Self {
        Self {
            name,
            display_name,
            parent,
        }
    }

    /// Stable identifier.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Human-readable name used in error messages.
    pub fn display_name(&self) -> &'static str {
        self.display_name
    }

    pub fn parent(&self) -> Option<&'static DataObjectClass> {
        self.parent
    }

    /// Returns true if this class equals `other` or inherits from it.
    pub fn is_derived_from(&self, other: &DataObjectClass) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if class == other {
                return true;
            }
            current = class.parent;
        }
        false
    }

    /// Returns true if `obj` is an instance of this class or of a subclass.
    #[inline]
    pub fn is_member(&self, obj: &dyn DataObject) -> bool {
        obj.class().is_derived_from(self)
    }
}

impl PartialEq for DataObjectClass {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || self.name == other.name
    }
}

impl Eq for DataObjectClass {}

impl fmt::Debug for DataObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataObjectClass({})", self.name)
    }
}

impl fmt::Display for DataObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name)
    }
}

/// Root of the class hierarchy. Every data object is a member.
pub static DATA_OBJECT_CLASS: DataObjectClass =
    DataObjectClass::new("DataObject", "Data object", None);
