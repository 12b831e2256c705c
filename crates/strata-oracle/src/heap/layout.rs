//! Class layout encoding shared with the code generator
//!
//! The metadata store describes each class with a packed 32-bit layout
//! helper and places its supertype display at fixed offsets inside the
//! class record. The oracle hands these numbers through untouched; the code
//! generator embeds them into emitted instructions.
//!
//! Layout helper encoding:
//! - `0` is the neutral value (interfaces, abstract classes, unloaded types)
//! - a positive value is the instance size in bytes
//! - a negative value describes an array:
//!   `tag:2 | unused:6 | header_size:8 | element_type:8 | log2_element_size:8`

/// Machine word size of the class record
pub const WORD_SIZE: u32 = 8;

/// Offset of the one-entry secondary supertype cache in a class record
pub const SECONDARY_SUPER_CACHE_OFFSET: u32 = 32;

/// Offset of the first primary supertype display slot in a class record
pub const PRIMARY_SUPERS_OFFSET: u32 = 40;

/// Largest primary display a store may configure
pub const MAX_DISPLAY_CAPACITY: usize = 16;

/// Display capacity used when none is configured
pub const DEFAULT_DISPLAY_CAPACITY: usize = 8;

/// Offset of the prototype mark word in a class record
pub const PROTOTYPE_HEADER_OFFSET: u32 =
    PRIMARY_SUPERS_OFFSET + (MAX_DISPLAY_CAPACITY as u32) * WORD_SIZE;

/// Byte offset of display slot `depth`
#[inline]
pub const fn primary_slot_offset(depth: usize) -> u32 {
    PRIMARY_SUPERS_OFFSET + (depth as u32) * WORD_SIZE
}

/// Class access flags as stored in the class file
pub mod access {
    /// Declared public
    pub const ACC_PUBLIC: u32 = 0x0001;
    /// Declared final
    pub const ACC_FINAL: u32 = 0x0010;
    /// Treat superclass methods specially in invokespecial
    pub const ACC_SUPER: u32 = 0x0020;
    /// Is an interface
    pub const ACC_INTERFACE: u32 = 0x0200;
    /// Declared abstract
    pub const ACC_ABSTRACT: u32 = 0x0400;
    /// Not present in source
    pub const ACC_SYNTHETIC: u32 = 0x1000;
}

/// Primitive and reference kinds, numbered as the VM does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BasicType {
    /// `Z`
    Boolean = 4,
    /// `C`
    Char = 5,
    /// `F`
    Float = 6,
    /// `D`
    Double = 7,
    /// `B`
    Byte = 8,
    /// `S`
    Short = 9,
    /// `I`
    Int = 10,
    /// `J`
    Long = 11,
    /// Instance reference
    Object = 12,
    /// Array reference
    Array = 13,
    /// `V`
    Void = 14,
}

impl BasicType {
    /// Decode from the numeric value
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            4 => BasicType::Boolean,
            5 => BasicType::Char,
            6 => BasicType::Float,
            7 => BasicType::Double,
            8 => BasicType::Byte,
            9 => BasicType::Short,
            10 => BasicType::Int,
            11 => BasicType::Long,
            12 => BasicType::Object,
            13 => BasicType::Array,
            14 => BasicType::Void,
            _ => return None,
        })
    }

    /// Basic type of a field descriptor character
    pub fn from_descriptor(c: char) -> Option<Self> {
        Some(match c {
            'Z' => BasicType::Boolean,
            'C' => BasicType::Char,
            'F' => BasicType::Float,
            'D' => BasicType::Double,
            'B' => BasicType::Byte,
            'S' => BasicType::Short,
            'I' => BasicType::Int,
            'J' => BasicType::Long,
            'L' => BasicType::Object,
            '[' => BasicType::Array,
            'V' => BasicType::Void,
            _ => return None,
        })
    }

    /// Source-level name
    pub fn name(self) -> &'static str {
        match self {
            BasicType::Boolean => "boolean",
            BasicType::Char => "char",
            BasicType::Float => "float",
            BasicType::Double => "double",
            BasicType::Byte => "byte",
            BasicType::Short => "short",
            BasicType::Int => "int",
            BasicType::Long => "long",
            BasicType::Object => "object",
            BasicType::Array => "array",
            BasicType::Void => "void",
        }
    }

    /// log2 of the storage size of one element of this type
    pub fn log2_size(self) -> u8 {
        match self {
            BasicType::Boolean | BasicType::Byte => 0,
            BasicType::Char | BasicType::Short => 1,
            BasicType::Float | BasicType::Int => 2,
            BasicType::Double | BasicType::Long => 3,
            BasicType::Object | BasicType::Array => 3,
            BasicType::Void => 0,
        }
    }

    /// Is this a reference kind
    pub fn is_reference(self) -> bool {
        matches!(self, BasicType::Object | BasicType::Array)
    }
}

const TAG_SHIFT: u32 = 30;
const TAG_TYPE_ARRAY: u32 = 0x3;
const TAG_OBJ_ARRAY: u32 = 0x2;
const HEADER_SIZE_SHIFT: u32 = 16;
const ELEMENT_TYPE_SHIFT: u32 = 8;
const BYTE_MASK: u32 = 0xFF;

/// Largest encodable instance size (word aligned, positive `i32`)
pub const MAX_INSTANCE_SIZE: u32 = i32::MAX as u32 & !(WORD_SIZE - 1);

/// Packed layout helper of a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LayoutDescriptor(i32);

impl LayoutDescriptor {
    /// The "not yet known" value
    pub const NEUTRAL: LayoutDescriptor = LayoutDescriptor(0);

    /// Layout of a concrete instance class of `size_bytes` (word aligned)
    ///
    /// Sizes past [`MAX_INSTANCE_SIZE`] are clamped to it.
    pub fn instance(size_bytes: u32) -> Self {
        let aligned = size_bytes
            .div_ceil(WORD_SIZE)
            .max(1)
            .checked_mul(WORD_SIZE)
            .unwrap_or(MAX_INSTANCE_SIZE);
        LayoutDescriptor(aligned.min(MAX_INSTANCE_SIZE) as i32)
    }

    /// Layout of an array whose elements have `element` type
    pub fn array(element: BasicType, header_size: u8) -> Self {
        let tag = if element.is_reference() {
            TAG_OBJ_ARRAY
        } else {
            TAG_TYPE_ARRAY
        };
        let raw = (tag << TAG_SHIFT)
            | ((header_size as u32) << HEADER_SIZE_SHIFT)
            | ((element as u32) << ELEMENT_TYPE_SHIFT)
            | element.log2_size() as u32;
        LayoutDescriptor(raw as i32)
    }

    /// Wrap a raw value read from a class record
    pub const fn from_raw(raw: i32) -> Self {
        LayoutDescriptor(raw)
    }

    /// The raw value to embed in generated code
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Is this the neutral value
    pub const fn is_neutral(self) -> bool {
        self.0 == 0
    }

    /// Does this describe an instance class
    pub const fn is_instance(self) -> bool {
        self.0 > 0
    }

    /// Does this describe an array class
    pub const fn is_array(self) -> bool {
        self.0 < 0
    }

    /// Instance size in bytes
    pub fn instance_size(self) -> Option<u32> {
        self.is_instance().then_some(self.0 as u32)
    }

    /// Array header size in bytes
    pub fn array_header_size(self) -> Option<u8> {
        self.is_array()
            .then(|| ((self.0 as u32 >> HEADER_SIZE_SHIFT) & BYTE_MASK) as u8)
    }

    /// Element type of an array
    pub fn array_element_type(self) -> Option<BasicType> {
        if !self.is_array() {
            return None;
        }
        BasicType::from_u8(((self.0 as u32 >> ELEMENT_TYPE_SHIFT) & BYTE_MASK) as u8)
    }

    /// log2 of the array element size
    pub fn array_log2_element_size(self) -> Option<u8> {
        self.is_array().then(|| (self.0 as u32 & BYTE_MASK) as u8)
    }
}
