//! IR Type System
//!
//! The type registry owns every type of a module and interns them, so two
//! structurally equal types always resolve to the same `TypeId` and type
//! equality is a plain handle comparison.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Registry identity, so handles from a foreign registry are recognised
static REGISTRY_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Bit widths of the supported integer types
pub const INT_WIDTHS: [u32; 5] = [1, 8, 16, 32, 64];

/// Handle to an interned type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TypeId {
    registry: u32,
    index: u32,
}

/// Structural description of a type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum IrType {
    /// Integer of a fixed bit width
    Int(u32),

    /// Untyped pointer, compatible with every value type
    AnyPtr,

    /// Pointer to a value of the underlying type
    PtrTo(TypeId),

    /// Function type; `None` return type means void
    Function {
        return_type: Option<TypeId>,
        args: Vec<TypeId>,
    },
}

#[derive(Debug, Serialize)]
pub struct TypeRegistry {
    id: u32,
    types: Vec<IrType>,
    #[serde(skip)]
    interned: HashMap<IrType, TypeId>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            id: REGISTRY_COUNTER.fetch_add(1, Ordering::Relaxed),
            types: Vec::new(),
            interned: HashMap::new(),
        };
        // Fixed slots: i1..i64 at 0..5, any pointer at 5, then their pointers
        for bits in INT_WIDTHS {
            registry.intern(IrType::Int(bits));
        }
        registry.intern(IrType::AnyPtr);
        for index in 0..INT_WIDTHS.len() {
            let int = registry.handle(index);
            registry.intern(IrType::PtrTo(int));
        }
        registry
    }

    fn handle(&self, index: usize) -> TypeId {
        TypeId {
            registry: self.id,
            index: index as u32,
        }
    }

    fn intern(&mut self, ty: IrType) -> TypeId {
        if let Some(&id) = self.interned.get(&ty) {
            return id;
        }
        let id = self.handle(self.types.len());
        self.types.push(ty.clone());
        self.interned.insert(ty, id);
        id
    }

    pub fn int1(&self) -> TypeId {
        self.handle(0)
    }

    pub fn int8(&self) -> TypeId {
        self.handle(1)
    }

    pub fn int16(&self) -> TypeId {
        self.handle(2)
    }

    pub fn int32(&self) -> TypeId {
        self.handle(3)
    }

    pub fn int64(&self) -> TypeId {
        self.handle(4)
    }

    /// Integer type of the given width, if supported
    pub fn int(&self, bits: u32) -> Option<TypeId> {
        INT_WIDTHS
            .iter()
            .position(|&w| w == bits)
            .map(|index| self.handle(index))
    }

    /// The untyped "any pointer"
    pub fn ptr(&self) -> TypeId {
        self.handle(INT_WIDTHS.len())
    }

    /// Unique pointer-to-`ty`, created on first use
    pub fn ptr_to(&mut self, ty: TypeId) -> TypeId {
        debug_assert!(self.has(ty), "pointer to a foreign type requested");
        self.intern(IrType::PtrTo(ty))
    }

    /// Unique function type for this return type and argument list
    pub fn make_function_type(&mut self, return_type: Option<TypeId>, args: &[TypeId]) -> TypeId {
        self.intern(IrType::Function {
            return_type,
            args: args.to_vec(),
        })
    }

    pub fn has(&self, ty: TypeId) -> bool {
        ty.registry == self.id && (ty.index as usize) < self.types.len()
    }

    /// Structural view of a type owned by this registry
    pub fn get(&self, ty: TypeId) -> &IrType {
        assert!(self.has(ty), "type does not belong to this registry");
        &self.types[ty.index as usize]
    }

    /// Function types count as pointers: they are what a function value points at
    pub fn is_ptr(&self, ty: TypeId) -> bool {
        self.has(ty)
            && matches!(
                self.get(ty),
                IrType::AnyPtr | IrType::PtrTo(_) | IrType::Function { .. }
            )
    }

    pub fn is_integer(&self, ty: TypeId) -> bool {
        self.has(ty) && matches!(self.get(ty), IrType::Int(_))
    }

    pub fn is_function(&self, ty: TypeId) -> bool {
        self.has(ty) && matches!(self.get(ty), IrType::Function { .. })
    }

    pub fn bit_width(&self, ty: TypeId) -> Option<u32> {
        match self.get(ty) {
            IrType::Int(bits) => Some(*bits),
            _ => None,
        }
    }

    /// Whether `value` is a valid bit pattern for the integer type `ty`
    pub fn fits(&self, ty: TypeId, value: u64) -> bool {
        match self.bit_width(ty) {
            Some(64) => true,
            Some(bits) => value >> bits == 0,
            None => false,
        }
    }

    /// Can a value of `value_type` be stored through / loaded from `ptr_type`?
    pub fn is_ptr_compatible_with(&self, ptr_type: TypeId, value_type: TypeId) -> bool {
        match self.get(ptr_type) {
            IrType::AnyPtr => true,
            IrType::Function { .. } => ptr_type == value_type,
            IrType::PtrTo(underlying) => *underlying == value_type,
            IrType::Int(_) => false,
        }
    }

    /// Return and argument types of a function type
    pub fn function_parts(&self, ty: TypeId) -> Option<(Option<TypeId>, &[TypeId])> {
        match self.get(ty) {
            IrType::Function { return_type, args } => Some((*return_type, args.as_slice())),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn display(&self, ty: TypeId) -> TypeDisplay<'_> {
        TypeDisplay { registry: self, ty }
    }
}

/// Renders a type the way the textual IR spells it
pub struct TypeDisplay<'a> {
    registry: &'a TypeRegistry,
    ty: TypeId,
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.registry.get(self.ty) {
            IrType::Int(bits) => write!(f, "i{bits}"),
            IrType::AnyPtr => write!(f, "ptr"),
            IrType::PtrTo(underlying) => write!(f, "{}*", self.registry.display(*underlying)),
            IrType::Function { return_type, args } => {
                write!(f, "func(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", self.registry.display(*arg))?;
                }
                match return_type {
                    Some(ret) => write!(f, ") {}", self.registry.display(*ret)),
                    None => write!(f, ") void"),
                }
            }
        }
    }
}
