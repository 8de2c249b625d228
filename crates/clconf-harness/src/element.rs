//! Element types, vector widths, and typed host buffers.
//!
//! [`HostBuffer`] is what crosses the backend boundary: a tagged vector of
//! one OpenCL scalar type. Vector types (`float3`, `ulong4`, ...) are stored
//! flattened, with 3-wide vectors padded to 4 lanes as OpenCL lays them out.

use std::fmt;

/// OpenCL scalar element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
}

impl ElementType {
    pub const fn size_bytes(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 => 8,
        }
    }

    pub const fn bits(self) -> u32 {
        (self.size_bytes() * 8) as u32
    }

    /// OpenCL C spelling of the scalar type.
    pub const fn cl_name(self) -> &'static str {
        match self {
            Self::I8 => "char",
            Self::U8 => "uchar",
            Self::I16 => "short",
            Self::U16 => "ushort",
            Self::I32 => "int",
            Self::U32 => "uint",
            Self::I64 => "long",
            Self::U64 => "ulong",
            Self::F32 => "float",
        }
    }

    pub fn from_cl_name(name: &str) -> Option<Self> {
        Some(match name {
            "char" => Self::I8,
            "uchar" => Self::U8,
            "short" => Self::I16,
            "ushort" => Self::U16,
            "int" => Self::I32,
            "uint" => Self::U32,
            "long" => Self::I64,
            "ulong" => Self::U64,
            "float" => Self::F32,
            _ => return None,
        })
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cl_name())
    }
}

/// Vector arity of an OpenCL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VectorWidth {
    Scalar,
    V2,
    V3,
    V4,
    V8,
    V16,
}

impl VectorWidth {
    /// Logical component count.
    pub const fn lanes(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::V2 => 2,
            Self::V3 => 3,
            Self::V4 => 4,
            Self::V8 => 8,
            Self::V16 => 16,
        }
    }

    /// Components occupied in memory; 3-wide vectors take 4 slots.
    pub const fn storage_lanes(self) -> usize {
        match self {
            Self::V3 => 4,
            other => other.lanes(),
        }
    }

    pub const fn from_lanes(lanes: usize) -> Option<Self> {
        match lanes {
            1 => Some(Self::Scalar),
            2 => Some(Self::V2),
            3 => Some(Self::V3),
            4 => Some(Self::V4),
            8 => Some(Self::V8),
            16 => Some(Self::V16),
            _ => None,
        }
    }

    /// Suffix appended to a scalar type name (`""` for scalars).
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Scalar => "",
            Self::V2 => "2",
            Self::V3 => "3",
            Self::V4 => "4",
            Self::V8 => "8",
            Self::V16 => "16",
        }
    }
}

/// OpenCL C spelling of a possibly-vector type, e.g. `float3`.
pub fn cl_type_name(element: ElementType, width: VectorWidth) -> String {
    format!("{}{}", element.cl_name(), width.suffix())
}

/// Parse `float3`, `uchar`, `ulong16`, ... back into element and width.
pub fn parse_cl_type(name: &str) -> Option<(ElementType, VectorWidth)> {
    let name = name.trim();
    let split = name.find(|c: char| c.is_ascii_digit()).unwrap_or(name.len());
    let (base, digits) = name.split_at(split);
    let element = ElementType::from_cl_name(base)?;
    let width = if digits.is_empty() {
        VectorWidth::Scalar
    } else {
        VectorWidth::from_lanes(digits.parse().ok()?).filter(|w| *w != VectorWidth::Scalar)?
    };
    Some((element, width))
}

/// Signed difference between a device value and its reference, kept in a
/// type wide enough that it never overflows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Difference {
    Integer(i128),
    Float(f64),
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(d) => write!(f, "{d}"),
            Self::Float(d) => write!(f, "{d:e}"),
        }
    }
}

/// A Rust type that maps onto one OpenCL scalar element type.
pub trait Element: Copy + PartialEq + fmt::Debug + fmt::Display + 'static {
    const TYPE: ElementType;

    fn into_buffer(values: Vec<Self>) -> HostBuffer;
    fn from_buffer(buffer: &HostBuffer) -> Option<&[Self]>;
    fn from_buffer_mut(buffer: &mut HostBuffer) -> Option<&mut [Self]>;
    fn from_owned(buffer: HostBuffer) -> Option<Vec<Self>>;

    /// Raw bit pattern, zero-extended.
    fn to_bits(self) -> u64;

    fn difference(device: Self, reference: Self) -> Difference;
}

macro_rules! host_buffer {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        /// A typed, flattened host-side buffer.
        #[derive(Debug, Clone, PartialEq)]
        pub enum HostBuffer {
            $($variant(Vec<$ty>),)*
        }

        impl HostBuffer {
            pub fn element_type(&self) -> ElementType {
                match self {
                    $(Self::$variant(_) => ElementType::$variant,)*
                }
            }

            pub fn len(&self) -> usize {
                match self {
                    $(Self::$variant(v) => v.len(),)*
                }
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            pub fn size_bytes(&self) -> usize {
                self.len() * self.element_type().size_bytes()
            }

            /// A zero-filled buffer, as a freshly allocated output.
            pub fn zeroed(element: ElementType, len: usize) -> Self {
                match element {
                    $(ElementType::$variant => Self::$variant(vec![<$ty>::default(); len]),)*
                }
            }

            /// Native-endian byte image, as uploaded to a device.
            pub fn to_ne_bytes(&self) -> Vec<u8> {
                match self {
                    $(Self::$variant(v) => v.iter().flat_map(|x| x.to_ne_bytes()).collect(),)*
                }
            }

            /// Rebuild a buffer from a native-endian byte image. Returns
            /// `None` when the byte count is not a whole number of elements.
            pub fn from_ne_bytes(element: ElementType, bytes: &[u8]) -> Option<Self> {
                match element {
                    $(ElementType::$variant => {
                        const N: usize = std::mem::size_of::<$ty>();
                        if bytes.len() % N != 0 {
                            return None;
                        }
                        let values = bytes
                            .chunks_exact(N)
                            .map(|chunk| {
                                let mut raw = [0u8; N];
                                raw.copy_from_slice(chunk);
                                <$ty>::from_ne_bytes(raw)
                            })
                            .collect();
                        Some(Self::$variant(values))
                    })*
                }
            }
        }
    };
}

host_buffer! {
    I8 => i8,
    U8 => u8,
    I16 => i16,
    U16 => u16,
    I32 => i32,
    U32 => u32,
    I64 => i64,
    U64 => u64,
    F32 => f32,
}

macro_rules! integer_element {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl Element for $ty {
                const TYPE: ElementType = ElementType::$variant;

                fn into_buffer(values: Vec<Self>) -> HostBuffer {
                    HostBuffer::$variant(values)
                }

                fn from_buffer(buffer: &HostBuffer) -> Option<&[Self]> {
                    match buffer {
                        HostBuffer::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                fn from_buffer_mut(buffer: &mut HostBuffer) -> Option<&mut [Self]> {
                    match buffer {
                        HostBuffer::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                fn from_owned(buffer: HostBuffer) -> Option<Vec<Self>> {
                    match buffer {
                        HostBuffer::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                fn to_bits(self) -> u64 {
                    let mut raw = [0u8; 8];
                    let bytes = self.to_le_bytes();
                    raw[..bytes.len()].copy_from_slice(&bytes);
                    u64::from_le_bytes(raw)
                }

                fn difference(device: Self, reference: Self) -> Difference {
                    Difference::Integer(device as i128 - reference as i128)
                }
            }
        )*
    };
}

integer_element! {
    I8 => i8,
    U8 => u8,
    I16 => i16,
    U16 => u16,
    I32 => i32,
    U32 => u32,
    I64 => i64,
    U64 => u64,
}

impl Element for f32 {
    const TYPE: ElementType = ElementType::F32;

    fn into_buffer(values: Vec<Self>) -> HostBuffer {
        HostBuffer::F32(values)
    }

    fn from_buffer(buffer: &HostBuffer) -> Option<&[Self]> {
        match buffer {
            HostBuffer::F32(v) => Some(v),
            _ => None,
        }
    }

    fn from_buffer_mut(buffer: &mut HostBuffer) -> Option<&mut [Self]> {
        match buffer {
            HostBuffer::F32(v) => Some(v),
            _ => None,
        }
    }

    fn from_owned(buffer: HostBuffer) -> Option<Vec<Self>> {
        match buffer {
            HostBuffer::F32(v) => Some(v),
            _ => None,
        }
    }

    fn to_bits(self) -> u64 {
        u64::from(f32::to_bits(self))
    }

    fn difference(device: Self, reference: Self) -> Difference {
        Difference::Float(f64::from(device) - f64::from(reference))
    }
}

/// A scalar kernel argument passed by value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarArg {
    Int(i32),
    Uint(u32),
    Ulong(u64),
    Float(f32),
}

impl ScalarArg {
    pub fn element_type(self) -> ElementType {
        match self {
            Self::Int(_) => ElementType::I32,
            Self::Uint(_) => ElementType::U32,
            Self::Ulong(_) => ElementType::U64,
            Self::Float(_) => ElementType::F32,
        }
    }

    pub fn to_ne_bytes(self) -> Vec<u8> {
        match self {
            Self::Int(v) => v.to_ne_bytes().to_vec(),
            Self::Uint(v) => v.to_ne_bytes().to_vec(),
            Self::Ulong(v) => v.to_ne_bytes().to_vec(),
            Self::Float(v) => v.to_ne_bytes().to_vec(),
        }
    }
}

impl fmt::Display for ScalarArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}u"),
            Self::Ulong(v) => write!(f, "{v}ul"),
            Self::Float(v) => write!(f, "{v}f"),
        }
    }
}
