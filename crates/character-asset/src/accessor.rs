//! Typed views over raw buffer bytes.
//!
//! An [`Accessor`] says how a [`BufferView`]'s bytes are reinterpreted as a
//! sequence of `count` elements. [`AccessorReader`] resolves the byte region
//! of an accessor, refusing anything that would read outside the owning view
//! or buffer, and decodes it into the values the rest of the crate needs.
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use glam::{Mat4, Vec3, Vec4};

use crate::{
    buffer::BufferView,
    index::{AccessorIndex, BufferViewIndex},
};

#[derive(Debug, Clone, PartialEq)]
pub enum AccessorError {
    /// The pair does not name a known format. `None` stands for a code or tag
    /// the document used that glTF does not define.
    UnsupportedFormat {
        component_type: Option<ComponentType>,
        element_type: Option<ElementType>,
    },
    /// An accessor without a buffer view whose zeros would not fit in memory.
    TooLarge {
        accessor: AccessorIndex,
        count: usize,
    },
    OutOfBounds {
        accessor: AccessorIndex,
        start: usize,
        end: usize,
        limit: usize,
    },
    BadStride {
        accessor: AccessorIndex,
        stride: usize,
        element_size: usize,
    },
    MissingBufferView(AccessorIndex, BufferViewIndex),
    BadComponentType {
        accessor: AccessorIndex,
        expected: ComponentType,
        actual: ComponentType,
    },
    BadElementType {
        accessor: AccessorIndex,
        expected: ElementType,
        actual: ElementType,
    },
}

impl Display for AccessorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AccessorError::UnsupportedFormat {
                component_type,
                element_type,
            } => {
                let component_type = component_type
                    .map(|component_type| component_type.code().to_string())
                    .unwrap_or_else(|| String::from("unknown"));
                let element_type = element_type.map_or("unknown", ElementType::tag);
                write!(
                    f,
                    "Unsupported format: component type {} with element type {}",
                    component_type, element_type
                )
            }
            AccessorError::TooLarge { accessor, count } => write!(
                f,
                "{} has no buffer view and too many elements to zero-fill: {}",
                accessor, count
            ),
            AccessorError::OutOfBounds {
                accessor,
                start,
                end,
                limit,
            } => write!(
                f,
                "Out of bounds read for {}: {}..{} exceeds {}",
                accessor, start, end, limit
            ),
            AccessorError::BadStride {
                accessor,
                stride,
                element_size,
            } => write!(
                f,
                "Stride {} of {} is smaller than its element size {}",
                stride, accessor, element_size
            ),
            AccessorError::MissingBufferView(accessor, view) => {
                write!(f, "{} refers to missing {}", accessor, view)
            }
            AccessorError::BadComponentType {
                accessor,
                expected,
                actual,
            } => write!(
                f,
                "Bad component type of {}: expected {:?}, but got {:?}",
                accessor, expected, actual
            ),
            AccessorError::BadElementType {
                accessor,
                expected,
                actual,
            } => write!(
                f,
                "Bad element type of {}: expected {}, but got {}",
                accessor, expected, actual
            ),
        }
    }
}

impl Error for AccessorError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    F32,
}

impl ComponentType {
    pub fn code(self) -> u32 {
        match self {
            ComponentType::I8 => 5120,
            ComponentType::U8 => 5121,
            ComponentType::I16 => 5122,
            ComponentType::U16 => 5123,
            ComponentType::U32 => 5125,
            ComponentType::F32 => 5126,
        }
    }

    pub fn size(self) -> usize {
        match self {
            ComponentType::I8 | ComponentType::U8 => 1,
            ComponentType::I16 | ComponentType::U16 => 2,
            ComponentType::U32 | ComponentType::F32 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl ElementType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "SCALAR" => Some(ElementType::Scalar),
            "VEC2" => Some(ElementType::Vec2),
            "VEC3" => Some(ElementType::Vec3),
            "VEC4" => Some(ElementType::Vec4),
            "MAT2" => Some(ElementType::Mat2),
            "MAT3" => Some(ElementType::Mat3),
            "MAT4" => Some(ElementType::Mat4),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ElementType::Scalar => "SCALAR",
            ElementType::Vec2 => "VEC2",
            ElementType::Vec3 => "VEC3",
            ElementType::Vec4 => "VEC4",
            ElementType::Mat2 => "MAT2",
            ElementType::Mat3 => "MAT3",
            ElementType::Mat4 => "MAT4",
        }
    }

    pub fn components(self) -> usize {
        match self {
            ElementType::Scalar => 1,
            ElementType::Vec2 => 2,
            ElementType::Vec3 => 3,
            ElementType::Vec4 | ElementType::Mat2 => 4,
            ElementType::Mat3 => 9,
            ElementType::Mat4 => 16,
        }
    }
}

impl Display for ElementType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Size in bytes of one element, including the column padding glTF requires
/// for matrices of 1 and 2 byte components.
pub fn element_size(component_type: ComponentType, element_type: ElementType) -> usize {
    let component = component_type.size();
    match (element_type, component) {
        (ElementType::Mat2, 1) => 8,
        (ElementType::Mat3, 1) => 12,
        (ElementType::Mat3, 2) => 24,
        (element_type, component) => element_type.components() * component,
    }
}

/// Format of a single vertex attribute element.
///
/// Only scalar and vector elements can feed a vertex attribute, so matrices
/// are rejected here even though accessors may carry them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexFormat {
    pub component_type: ComponentType,
    pub element_type: ElementType,
}

impl VertexFormat {
    pub fn new(
        component_type: ComponentType,
        element_type: ElementType,
    ) -> Result<Self, AccessorError> {
        match element_type {
            ElementType::Scalar | ElementType::Vec2 | ElementType::Vec3 | ElementType::Vec4 => {
                Ok(Self {
                    component_type,
                    element_type,
                })
            }
            _ => Err(AccessorError::UnsupportedFormat {
                component_type: Some(component_type),
                element_type: Some(element_type),
            }),
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        element_size(self.component_type, self.element_type)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueRange {
    pub min: Vec<f32>,
    pub max: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Accessor {
    pub index: AccessorIndex,
    pub component_type: ComponentType,
    pub element_type: ElementType,
    pub byte_offset: usize,
    pub count: usize,
    /// Accessors without a view read as zeros.
    pub buffer_view: Option<BufferViewIndex>,
    pub normalized: bool,
    pub range: ValueRange,
}

impl Accessor {
    #[inline]
    pub fn element_size(&self) -> usize {
        element_size(self.component_type, self.element_type)
    }

    pub fn check(
        &self,
        component_type: ComponentType,
        element_type: ElementType,
    ) -> Result<(), AccessorError> {
        if self.component_type != component_type {
            return Err(AccessorError::BadComponentType {
                accessor: self.index,
                expected: component_type,
                actual: self.component_type,
            });
        }
        self.check_element(element_type)
    }

    pub fn check_element(&self, element_type: ElementType) -> Result<(), AccessorError> {
        if self.element_type != element_type {
            return Err(AccessorError::BadElementType {
                accessor: self.index,
                expected: element_type,
                actual: self.element_type,
            });
        }
        Ok(())
    }
}

/// Absolute location of an accessor's elements inside a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRegion {
    pub start: usize,
    pub stride: usize,
    pub element_size: usize,
    pub count: usize,
}

impl ByteRegion {
    #[inline]
    pub fn end(&self) -> usize {
        if self.count == 0 {
            self.start
        } else {
            self.start + (self.count - 1) * self.stride + self.element_size
        }
    }
}

/// Largest zero-filled read served for an accessor without a buffer view.
pub const MAX_ZEROED_LENGTH: usize = 1 << 24;

/// Reads accessors against the buffers and views of one document.
#[derive(Debug, Clone, Copy)]
pub struct AccessorReader<'a, B: AsRef<[u8]>> {
    buffers: &'a [B],
    views: &'a [BufferView],
}

impl<'a, B: AsRef<[u8]>> AccessorReader<'a, B> {
    pub fn new(buffers: &'a [B], views: &'a [BufferView]) -> Self {
        Self { buffers, views }
    }

    /// Resolve where the accessor's elements live.
    ///
    /// Returns `None` for accessors without a buffer view.
    pub fn region(&self, accessor: &Accessor) -> Result<Option<ByteRegion>, AccessorError> {
        Ok(self.locate(accessor)?.map(|(_, region)| region))
    }

    fn locate(&self, accessor: &Accessor) -> Result<Option<(&'a [u8], ByteRegion)>, AccessorError> {
        let Some(view_index) = accessor.buffer_view else {
            return Ok(None);
        };
        let view = self
            .views
            .get(view_index.0)
            .ok_or(AccessorError::MissingBufferView(accessor.index, view_index))?;

        let element_size = accessor.element_size();
        let stride = view.byte_stride.unwrap_or(element_size);
        if stride < element_size {
            return Err(AccessorError::BadStride {
                accessor: accessor.index,
                stride,
                element_size,
            });
        }

        let out_of_bounds = |start: usize, end: usize, limit: usize| AccessorError::OutOfBounds {
            accessor: accessor.index,
            start,
            end,
            limit,
        };
        let length = match accessor.count {
            0 => 0,
            count => (count - 1)
                .checked_mul(stride)
                .and_then(|length| length.checked_add(element_size))
                .ok_or_else(|| out_of_bounds(accessor.byte_offset, usize::MAX, view.byte_length))?,
        };

        // The region must stay inside the view...
        let relative_end = accessor
            .byte_offset
            .checked_add(length)
            .ok_or_else(|| out_of_bounds(accessor.byte_offset, usize::MAX, view.byte_length))?;
        if relative_end > view.byte_length {
            return Err(out_of_bounds(
                accessor.byte_offset,
                relative_end,
                view.byte_length,
            ));
        }

        // ...and the view inside its buffer.
        let buffer = self
            .buffers
            .get(view.buffer.0)
            .map(|buffer| buffer.as_ref())
            .unwrap_or(&[]);
        let buffer_length = buffer.len();
        let start = view.byte_offset + accessor.byte_offset;
        let end = start + length;
        if end > buffer_length {
            return Err(out_of_bounds(start, end, buffer_length));
        }

        Ok(Some((
            buffer,
            ByteRegion {
                start,
                stride,
                element_size,
                count: accessor.count,
            },
        )))
    }

    /// Element bytes with any stride padding removed.
    pub fn read_bytes(&self, accessor: &Accessor) -> Result<Vec<u8>, AccessorError> {
        let Some((buffer, region)) = self.locate(accessor)? else {
            let length = accessor
                .count
                .checked_mul(accessor.element_size())
                .filter(|length| *length <= MAX_ZEROED_LENGTH)
                .ok_or(AccessorError::TooLarge {
                    accessor: accessor.index,
                    count: accessor.count,
                })?;
            return Ok(vec![0; length]);
        };

        if region.stride == region.element_size {
            return Ok(buffer[region.start..region.end()].to_vec());
        }
        let mut result = Vec::with_capacity(region.count * region.element_size);
        for item in 0..region.count {
            let start = region.start + item * region.stride;
            result.extend_from_slice(&buffer[start..start + region.element_size]);
        }
        Ok(result)
    }

    pub fn read_f32(&self, accessor: &Accessor) -> Result<Vec<f32>, AccessorError> {
        if accessor.component_type != ComponentType::F32 {
            return Err(AccessorError::BadComponentType {
                accessor: accessor.index,
                expected: ComponentType::F32,
                actual: accessor.component_type,
            });
        }
        let data = self.read_bytes(accessor)?;
        Ok(data
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }

    /// Floats, or integers mapped to `[0, 1]` / `[-1, 1]` as glTF normalizes
    /// them.
    pub fn read_normalized(&self, accessor: &Accessor) -> Result<Vec<f32>, AccessorError> {
        let data = match accessor.component_type {
            ComponentType::F32 => return self.read_f32(accessor),
            ComponentType::U32 => {
                return Err(AccessorError::BadComponentType {
                    accessor: accessor.index,
                    expected: ComponentType::F32,
                    actual: ComponentType::U32,
                })
            }
            _ => self.read_bytes(accessor)?,
        };
        let values = match accessor.component_type {
            ComponentType::U8 => data
                .into_iter()
                .map(|item| item as f32 / u8::MAX as f32)
                .collect(),
            ComponentType::I8 => data
                .into_iter()
                .map(|item| (item as i8 as f32 / i8::MAX as f32).max(-1.0))
                .collect(),
            ComponentType::U16 => data
                .chunks_exact(2)
                .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]) as f32 / u16::MAX as f32)
                .collect(),
            ComponentType::I16 => data
                .chunks_exact(2)
                .map(|chunk| {
                    (i16::from_le_bytes([chunk[0], chunk[1]]) as f32 / i16::MAX as f32).max(-1.0)
                })
                .collect(),
            ComponentType::U32 | ComponentType::F32 => Vec::new(),
        };
        Ok(values)
    }

    pub fn read_scalars(&self, accessor: &Accessor) -> Result<Vec<f32>, AccessorError> {
        accessor.check(ComponentType::F32, ElementType::Scalar)?;
        self.read_f32(accessor)
    }

    pub fn read_vec3(&self, accessor: &Accessor) -> Result<Vec<Vec3>, AccessorError> {
        accessor.check(ComponentType::F32, ElementType::Vec3)?;
        let data = self.read_f32(accessor)?;
        Ok(data.chunks_exact(3).map(Vec3::from_slice).collect())
    }

    pub fn read_vec4_normalized(&self, accessor: &Accessor) -> Result<Vec<Vec4>, AccessorError> {
        accessor.check_element(ElementType::Vec4)?;
        let data = self.read_normalized(accessor)?;
        Ok(data.chunks_exact(4).map(Vec4::from_slice).collect())
    }

    /// Column-major 4x4 float matrices.
    pub fn read_mat4(&self, accessor: &Accessor) -> Result<Vec<Mat4>, AccessorError> {
        accessor.check(ComponentType::F32, ElementType::Mat4)?;
        let data = self.read_f32(accessor)?;
        Ok(data.chunks_exact(16).map(Mat4::from_cols_slice).collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::index::BufferIndex;

    const COMPONENTS: [(ComponentType, u32, usize); 6] = [
        (ComponentType::I8, 5120, 1),
        (ComponentType::U8, 5121, 1),
        (ComponentType::I16, 5122, 2),
        (ComponentType::U16, 5123, 2),
        (ComponentType::U32, 5125, 4),
        (ComponentType::F32, 5126, 4),
    ];

    fn accessor(component_type: ComponentType, element_type: ElementType) -> Accessor {
        Accessor {
            index: AccessorIndex(0),
            component_type,
            element_type,
            byte_offset: 0,
            count: 0,
            buffer_view: Some(BufferViewIndex(0)),
            normalized: false,
            range: ValueRange::default(),
        }
    }

    fn view(byte_offset: usize, byte_length: usize, byte_stride: Option<usize>) -> BufferView {
        BufferView {
            index: BufferViewIndex(0),
            buffer: BufferIndex(0),
            byte_offset,
            byte_length,
            byte_stride,
            target: None,
        }
    }

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|value| value.to_le_bytes()).collect()
    }

    #[test]
    fn test_supported_format_sizes() {
        let elements = [("SCALAR", 1), ("VEC2", 2), ("VEC3", 3), ("VEC4", 4)];
        for (component_type, code, component_size) in COMPONENTS {
            for (tag, components) in elements {
                let element_type = ElementType::from_tag(tag).unwrap();
                let format = VertexFormat::new(component_type, element_type).unwrap();
                assert_eq!(format.size(), component_size * components, "{} {}", code, tag);
                assert_eq!(format.component_type.code(), code);
                assert_eq!(format.element_type.tag(), tag);
            }
        }
    }

    #[test]
    fn test_unsupported_formats() {
        for (component_type, element_type) in [
            (ComponentType::F32, ElementType::Mat4),
            (ComponentType::U8, ElementType::Mat2),
            (ComponentType::I16, ElementType::Mat3),
        ] {
            assert_eq!(
                VertexFormat::new(component_type, element_type),
                Err(AccessorError::UnsupportedFormat {
                    component_type: Some(component_type),
                    element_type: Some(element_type),
                })
            );
        }
        assert_eq!(ElementType::from_tag("VEC5"), None);

        let unknown = AccessorError::UnsupportedFormat {
            component_type: None,
            element_type: Some(ElementType::Vec3),
        };
        assert_eq!(
            unknown.to_string(),
            "Unsupported format: component type unknown with element type VEC3"
        );
    }

    #[test]
    fn test_matrix_padding() {
        assert_eq!(element_size(ComponentType::F32, ElementType::Mat4), 64);
        assert_eq!(element_size(ComponentType::U8, ElementType::Mat2), 8);
        assert_eq!(element_size(ComponentType::U8, ElementType::Mat3), 12);
        assert_eq!(element_size(ComponentType::I16, ElementType::Mat3), 24);
        assert_eq!(element_size(ComponentType::U16, ElementType::Mat2), 8);
    }

    #[test]
    fn test_read_packed_with_offsets() {
        let mut data = vec![0xAA; 8];
        data.extend(f32_bytes(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
        let buffers = [data];
        let views = [view(8, 24, None)];
        let reader = AccessorReader::new(&buffers, &views);

        let mut accessor = accessor(ComponentType::F32, ElementType::Vec3);
        accessor.byte_offset = 12;
        accessor.count = 1;
        assert_eq!(reader.read_vec3(&accessor).unwrap(), vec![Vec3::new(4.0, 5.0, 6.0)]);

        accessor.byte_offset = 0;
        accessor.count = 2;
        let values = reader.read_vec3(&accessor).unwrap();
        assert_eq!(values, vec![Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0)]);
    }

    #[test]
    fn test_read_strided() {
        // Interleaved: one float of interest followed by one float of padding.
        let buffers = [f32_bytes(&[1.0, -1.0, 2.0, -1.0, 3.0])];
        let views = [view(0, 20, Some(8))];
        let reader = AccessorReader::new(&buffers, &views);

        let mut accessor = accessor(ComponentType::F32, ElementType::Scalar);
        accessor.count = 3;
        let region = reader.region(&accessor).unwrap().unwrap();
        assert_eq!(region.end(), 20);
        assert_eq!(reader.read_scalars(&accessor).unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_out_of_bounds() {
        let buffers = [f32_bytes(&[1.0, 2.0, 3.0])];

        // Accessor runs past its view.
        let views = [view(0, 8, None)];
        let reader = AccessorReader::new(&buffers, &views);
        let mut accessor = accessor(ComponentType::F32, ElementType::Scalar);
        accessor.count = 3;
        assert!(matches!(
            reader.read_f32(&accessor),
            Err(AccessorError::OutOfBounds { end: 12, limit: 8, .. })
        ));

        // View runs past its buffer.
        let views = [view(4, 12, None)];
        let reader = AccessorReader::new(&buffers, &views);
        assert!(matches!(
            reader.read_f32(&accessor),
            Err(AccessorError::OutOfBounds { end: 16, limit: 12, .. })
        ));

        // Huge counts do not overflow.
        accessor.count = usize::MAX;
        assert!(matches!(
            reader.region(&accessor),
            Err(AccessorError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_bad_stride() {
        let buffers = [f32_bytes(&[1.0, 2.0, 3.0])];
        let views = [view(0, 12, Some(4))];
        let reader = AccessorReader::new(&buffers, &views);
        let mut accessor = accessor(ComponentType::F32, ElementType::Vec2);
        accessor.count = 1;
        assert!(matches!(
            reader.region(&accessor),
            Err(AccessorError::BadStride { stride: 4, element_size: 8, .. })
        ));
    }

    #[test]
    fn test_missing_view_reads_zero() {
        let buffers: [Vec<u8>; 0] = [];
        let reader = AccessorReader::new(&buffers, &[]);
        let mut accessor = accessor(ComponentType::F32, ElementType::Vec3);
        accessor.buffer_view = None;
        accessor.count = 2;
        assert_eq!(reader.read_vec3(&accessor).unwrap(), vec![Vec3::ZERO; 2]);
    }

    #[test]
    fn test_missing_view_too_large() {
        let buffers: [Vec<u8>; 0] = [];
        let reader = AccessorReader::new(&buffers, &[]);
        let mut accessor = accessor(ComponentType::F32, ElementType::Scalar);
        accessor.buffer_view = None;

        accessor.count = usize::MAX / 2;
        assert_eq!(
            reader.read_scalars(&accessor),
            Err(AccessorError::TooLarge {
                accessor: AccessorIndex(0),
                count: usize::MAX / 2,
            })
        );

        // Fits in usize, but not in a sane allocation.
        accessor.count = MAX_ZEROED_LENGTH / 4 + 1;
        assert!(matches!(
            reader.read_f32(&accessor),
            Err(AccessorError::TooLarge { .. })
        ));

        accessor.count = MAX_ZEROED_LENGTH / 4;
        assert_eq!(reader.read_f32(&accessor).unwrap().len(), MAX_ZEROED_LENGTH / 4);
    }

    #[test]
    fn test_normalized() {
        let buffers = [vec![0u8, 255, 0, 0, 0xff, 0x7f, 0x01, 0x80]];
        let views = [view(0, 8, None)];
        let reader = AccessorReader::new(&buffers, &views);

        let mut accessor = accessor(ComponentType::U8, ElementType::Vec4);
        accessor.count = 1;
        assert_eq!(
            reader.read_vec4_normalized(&accessor).unwrap(),
            vec![Vec4::new(0.0, 1.0, 0.0, 0.0)]
        );

        let mut accessor = self::accessor(ComponentType::I16, ElementType::Scalar);
        accessor.byte_offset = 4;
        accessor.count = 2;
        assert_eq!(reader.read_normalized(&accessor).unwrap(), vec![1.0, -1.0]);
    }

    #[test]
    fn test_check() {
        let accessor = accessor(ComponentType::U16, ElementType::Vec3);
        assert!(accessor.check(ComponentType::U16, ElementType::Vec3).is_ok());
        assert!(matches!(
            accessor.check(ComponentType::F32, ElementType::Vec3),
            Err(AccessorError::BadComponentType { .. })
        ));
        assert!(matches!(
            accessor.check(ComponentType::U16, ElementType::Vec4),
            Err(AccessorError::BadElementType { .. })
        ));
    }
}
