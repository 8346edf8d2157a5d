//! Decoding of calibration values from ECU memory
//!
//! A `CalibrationData` binds a byte source, a record layout and a cursor. Every element of the
//! layout is read through the same primitive: read the bytes of the element's datatype at the
//! cursor, assemble them in the configured byte order and advance the cursor.

use std::collections::BTreeMap;

use num_traits::FromBytes;
use thiserror::Error;
use tracing::debug;

use crate::Module;
use crate::layout::{LayoutError, LayoutField};
use crate::specification::{ByteOrderEnum, Characteristic, CharacteristicType, DataType, RecordLayout};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CalibrationError {
    #[error("{field} of record layout {layout} has no datatype")]
    MissingDatatype { layout: String, field: LayoutField },

    #[error("{len} bytes at address 0x{address:08X} are not available")]
    AddressNotMapped { address: u32, len: usize },

    #[error("{field} of record layout {layout} has the non-integer datatype {datatype}")]
    NonIntegerDatatype {
        layout: String,
        field: LayoutField,
        datatype: DataType,
    },

    #[error("characteristic {name} does not exist")]
    UnknownCharacteristic { name: String },

    #[error("record layout {name} of characteristic {characteristic} does not exist")]
    UnknownRecordLayout { name: String, characteristic: String },

    #[error("compu method {name} of characteristic {characteristic} does not exist")]
    UnknownCompuMethod { name: String, characteristic: String },

    #[error("record layout {layout} has no FNC_VALUES")]
    MissingFncValues { layout: String },

    #[error("characteristic {name} has no valid address")]
    InvalidAddress { name: String },

    #[error("characteristic {name} of type {char_type} can not be read as a single value")]
    UnsupportedCharacteristicType {
        name: String,
        char_type: CharacteristicType,
    },

    #[error("compu method {name} with conversion type {conversion_type} is not supported")]
    UnsupportedConversion { name: String, conversion_type: String },

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Random access to the bytes of an ECU memory image
pub trait ByteSource {
    /// the `len` bytes starting at `address`, or None if any of them is not available
    fn read(&self, address: u32, len: usize) -> Option<&[u8]>;
}

/// a plain byte slice; the address is the index into the slice
impl ByteSource for [u8] {
    fn read(&self, address: u32, len: usize) -> Option<&[u8]> {
        let start = usize::try_from(address).ok()?;
        self.get(start..start.checked_add(len)?)
    }
}

/// A sparse memory image made of segments of contiguous bytes
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MemoryImage {
    segments: BTreeMap<u32, Vec<u8>>,
}

impl MemoryImage {
    pub fn new() -> Self {
        Self::default()
    }

    /// add a segment starting at `start`. A segment with the same start address is replaced
    pub fn add_segment(&mut self, start: u32, data: Vec<u8>) {
        self.segments.insert(start, data);
    }

    pub fn segments(&self) -> impl Iterator<Item = (u32, &[u8])> {
        self.segments
            .iter()
            .map(|(start, data)| (*start, data.as_slice()))
    }
}

impl ByteSource for MemoryImage {
    fn read(&self, address: u32, len: usize) -> Option<&[u8]> {
        // reads never span two segments
        let (start, data) = self.segments.range(..=address).next_back()?;
        let offset = usize::try_from(address - start).ok()?;
        data.get(offset..offset.checked_add(len)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

impl From<ByteOrderEnum> for Endianness {
    fn from(byte_order: ByteOrderEnum) -> Self {
        // MSB_LAST and BIG_ENDIAN are the deprecated ASAP2 spellings of little endian
        match byte_order {
            ByteOrderEnum::MsbFirst
            | ByteOrderEnum::LittleEndian
            | ByteOrderEnum::MsbFirstMswLast => Endianness::Big,
            ByteOrderEnum::MsbLast | ByteOrderEnum::BigEndian | ByteOrderEnum::MsbLastMswFirst => {
                Endianness::Little
            }
        }
    }
}

/// A decoded value before conversion
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue {
    Int(i64),
    Float(f64),
}

impl RawValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            RawValue::Int(value) => *value as f64,
            RawValue::Float(value) => *value,
        }
    }
}

/// Decode context for one calibration object
pub struct CalibrationData<'a, S: ByteSource + ?Sized> {
    source: &'a S,
    layout: &'a RecordLayout,
    endianness: Endianness,
    cursor: u32,
}

// integer reads of single layout elements
macro_rules! field_readers {
    ($($name:ident => $field:ident),+ $(,)?) => {
        $(
            pub fn $name(&mut self) -> Result<i64, CalibrationError> {
                self.read_field(LayoutField::$field)
            }
        )+
    };
}

impl<'a, S: ByteSource + ?Sized> CalibrationData<'a, S> {
    pub fn new(
        source: &'a S,
        layout: &'a RecordLayout,
        endianness: Endianness,
        address: u32,
    ) -> Self {
        Self {
            source,
            layout,
            endianness,
            cursor: address,
        }
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn set_cursor(&mut self, address: u32) {
        self.cursor = address;
    }

    /// Read one value of the datatype of `field` at the cursor and advance the cursor.
    ///
    /// If the element has no datatype, or the bytes are not available, the cursor is unchanged.
    pub fn read_raw(&mut self, field: LayoutField) -> Result<RawValue, CalibrationError> {
        let datatype = self.datatype_of(field)?;
        let len = datatype.width() as usize;
        let bytes = self
            .source
            .read(self.cursor, len)
            .ok_or(CalibrationError::AddressNotMapped {
                address: self.cursor,
                len,
            })?;
        let value =
            decode_value(bytes, datatype, self.endianness).ok_or(CalibrationError::AddressNotMapped {
                address: self.cursor,
                len,
            })?;
        self.cursor = self.cursor.wrapping_add(datatype.width());
        Ok(value)
    }

    /// Read an element with an integer datatype. A_UINT64 values above `i64::MAX` wrap.
    pub fn read_field(&mut self, field: LayoutField) -> Result<i64, CalibrationError> {
        let datatype = self.datatype_of(field)?;
        if datatype.is_float() {
            return Err(CalibrationError::NonIntegerDatatype {
                layout: self.layout.name.clone(),
                field,
                datatype,
            });
        }
        match self.read_raw(field)? {
            RawValue::Int(value) => Ok(value),
            RawValue::Float(value) => Ok(value as i64),
        }
    }

    field_readers! {
        offset_x => OffsetX,
        offset_y => OffsetY,
        offset_z => OffsetZ,
        offset_4 => Offset4,
        offset_5 => Offset5,
        src_addr_x => SrcAddrX,
        src_addr_y => SrcAddrY,
        src_addr_z => SrcAddrZ,
        src_addr_4 => SrcAddr4,
        src_addr_5 => SrcAddr5,
        rip_addr_w => RipAddrW,
        rip_addr_x => RipAddrX,
        rip_addr_y => RipAddrY,
        rip_addr_z => RipAddrZ,
        rip_addr_4 => RipAddr4,
        rip_addr_5 => RipAddr5,
        shift_op_x => ShiftOpX,
        shift_op_y => ShiftOpY,
        shift_op_z => ShiftOpZ,
        shift_op_4 => ShiftOp4,
        shift_op_5 => ShiftOp5,
        dist_op_x => DistOpX,
        dist_op_y => DistOpY,
        dist_op_z => DistOpZ,
        dist_op_4 => DistOp4,
        dist_op_5 => DistOp5,
        no_axis_pts_x => NoAxisPtsX,
        no_axis_pts_y => NoAxisPtsY,
        no_axis_pts_z => NoAxisPtsZ,
        no_axis_pts_4 => NoAxisPts4,
        no_axis_pts_5 => NoAxisPts5,
    }

    /// one axis point of the X axis; axis points may be floats
    pub fn axis_pts_x(&mut self) -> Result<RawValue, CalibrationError> {
        self.read_raw(LayoutField::AxisPtsX)
    }

    pub fn axis_pts_y(&mut self) -> Result<RawValue, CalibrationError> {
        self.read_raw(LayoutField::AxisPtsY)
    }

    pub fn axis_pts_z(&mut self) -> Result<RawValue, CalibrationError> {
        self.read_raw(LayoutField::AxisPtsZ)
    }

    pub fn axis_pts_4(&mut self) -> Result<RawValue, CalibrationError> {
        self.read_raw(LayoutField::AxisPts4)
    }

    pub fn axis_pts_5(&mut self) -> Result<RawValue, CalibrationError> {
        self.read_raw(LayoutField::AxisPts5)
    }

    pub fn fnc_value(&mut self) -> Result<RawValue, CalibrationError> {
        self.read_raw(LayoutField::FncValues)
    }

    fn datatype_of(&self, field: LayoutField) -> Result<DataType, CalibrationError> {
        self.layout
            .field_datatype(field)
            .ok_or_else(|| CalibrationError::MissingDatatype {
                layout: self.layout.name.clone(),
                field,
            })
    }
}

fn decode<T, const N: usize>(bytes: &[u8], endianness: Endianness) -> Option<T>
where
    T: FromBytes<Bytes = [u8; N]>,
{
    let buf: [u8; N] = bytes.get(..N)?.try_into().ok()?;
    Some(match endianness {
        Endianness::Little => T::from_le_bytes(&buf),
        Endianness::Big => T::from_be_bytes(&buf),
    })
}

fn decode_value(bytes: &[u8], datatype: DataType, endianness: Endianness) -> Option<RawValue> {
    let value = match datatype {
        DataType::Ubyte => RawValue::Int(i64::from(*bytes.first()?)),
        DataType::Sbyte => RawValue::Int(i64::from(decode::<i8, 1>(bytes, endianness)?)),
        DataType::Uword => RawValue::Int(i64::from(decode::<u16, 2>(bytes, endianness)?)),
        DataType::Sword => RawValue::Int(i64::from(decode::<i16, 2>(bytes, endianness)?)),
        DataType::Ulong => RawValue::Int(i64::from(decode::<u32, 4>(bytes, endianness)?)),
        DataType::Slong => RawValue::Int(i64::from(decode::<i32, 4>(bytes, endianness)?)),
        DataType::AUint64 => RawValue::Int(decode::<u64, 8>(bytes, endianness)? as i64),
        DataType::AInt64 => RawValue::Int(decode::<i64, 8>(bytes, endianness)?),
        DataType::Float16Ieee => {
            RawValue::Float(f16_to_f64(decode::<u16, 2>(bytes, endianness)?))
        }
        DataType::Float32Ieee => {
            RawValue::Float(f64::from(decode::<f32, 4>(bytes, endianness)?))
        }
        DataType::Float64Ieee => RawValue::Float(decode::<f64, 8>(bytes, endianness)?),
    };
    Some(value)
}

// IEEE 754 binary16
fn f16_to_f64(bits: u16) -> f64 {
    let sign = if bits & 0x8000 != 0 { -1.0 } else { 1.0 };
    let exponent = i32::from((bits >> 10) & 0x1f);
    let fraction = f64::from(bits & 0x3ff);
    match exponent {
        0 => sign * fraction * 2f64.powi(-24),
        0x1f if fraction == 0.0 => sign * f64::INFINITY,
        0x1f => f64::NAN,
        _ => sign * (1.0 + fraction / 1024.0) * 2f64.powi(exponent - 15),
    }
}

impl Module {
    /// The byte order of a characteristic: its own BYTE_ORDER, else the one from MOD_COMMON,
    /// else MSB_LAST
    pub fn characteristic_endianness(&self, characteristic: &Characteristic) -> Endianness {
        characteristic
            .byte_order
            .or_else(|| self.mod_common.as_ref().and_then(|mc| mc.byte_order))
            .unwrap_or(ByteOrderEnum::MsbLast)
            .into()
    }

    /// Read the raw value of a VALUE characteristic from a memory image
    pub fn read_characteristic_raw<S: ByteSource + ?Sized>(
        &self,
        name: &str,
        source: &S,
    ) -> Result<RawValue, CalibrationError> {
        let characteristic =
            self.characteristic
                .get(name)
                .ok_or_else(|| CalibrationError::UnknownCharacteristic {
                    name: name.to_string(),
                })?;
        if let Some(char_type) = characteristic.characteristic_type {
            if char_type != CharacteristicType::Value {
                return Err(CalibrationError::UnsupportedCharacteristicType {
                    name: name.to_string(),
                    char_type,
                });
            }
        }
        let address =
            characteristic
                .address_value()
                .ok_or_else(|| CalibrationError::InvalidAddress {
                    name: name.to_string(),
                })?;
        let deposit = characteristic.deposit.as_deref().unwrap_or_default();
        let layout = self.record_layout.get(deposit).ok_or_else(|| {
            CalibrationError::UnknownRecordLayout {
                name: deposit.to_string(),
                characteristic: name.to_string(),
            }
        })?;

        let resolved = layout.resolve_absolute_positions()?;
        let fnc_values = resolved.get(LayoutField::FncValues).ok_or_else(|| {
            CalibrationError::MissingFncValues {
                layout: layout.name.clone(),
            }
        })?;
        let start = address
            .checked_add(fnc_values.offset)
            .ok_or(CalibrationError::AddressNotMapped {
                address,
                len: fnc_values.width as usize,
            })?;
        let endianness = self.characteristic_endianness(characteristic);
        debug!(
            characteristic = name,
            layout = %layout.name,
            address = start,
            ?endianness,
            "reading characteristic"
        );

        let mut data = CalibrationData::new(source, layout, endianness, start);
        data.fnc_value()
    }

    /// Read a VALUE characteristic and convert it with its compu method
    pub fn read_characteristic_physical<S: ByteSource + ?Sized>(
        &self,
        name: &str,
        source: &S,
    ) -> Result<f64, CalibrationError> {
        let raw = self.read_characteristic_raw(name, source)?;
        let conversion = self
            .characteristic
            .get(name)
            .and_then(|characteristic| characteristic.conversion.as_deref())
            .unwrap_or("NO_COMPU_METHOD");
        if conversion == "NO_COMPU_METHOD" {
            return Ok(raw.as_f64());
        }
        let compu_method = self.compu_method.get(conversion).ok_or_else(|| {
            CalibrationError::UnknownCompuMethod {
                name: conversion.to_string(),
                characteristic: name.to_string(),
            }
        })?;
        compu_method.to_physical(raw.as_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ParseOptions, parse_block};

    fn layout(text: &str) -> RecordLayout {
        parse_block::<RecordLayout>(text, &ParseOptions::default()).unwrap()
    }

    #[test]
    fn byte_sources() {
        let data = [1u8, 2, 3, 4];
        assert_eq!(data[..].read(1, 2), Some(&[2u8, 3][..]));
        assert_eq!(data[..].read(3, 2), None);
        assert_eq!(data[..].read(u32::MAX, 1), None);

        let mut image = MemoryImage::new();
        image.add_segment(0x1000, vec![0xAA, 0xBB]);
        image.add_segment(0x2000, vec![0xCC; 4]);
        assert_eq!(image.read(0x1001, 1), Some(&[0xBB][..]));
        assert_eq!(image.read(0x1001, 2), None);
        assert_eq!(image.read(0x0FFF, 1), None);
        assert_eq!(image.read(0x2002, 2), Some(&[0xCC, 0xCC][..]));
        assert_eq!(image.segments().count(), 2);
    }

    #[test]
    fn offsets_in_both_byte_orders() {
        let rl = layout(
            r#"/begin RECORD_LAYOUT RL
                OFFSET_X 1 UBYTE
                OFFSET_Y 2 SWORD
                OFFSET_Z 3 ULONG
            /end RECORD_LAYOUT"#,
        );
        let data = [0x7f, 0xff, 0xfe, 0x00, 0x00, 0x01, 0x02];
        let mut little = CalibrationData::new(&data[..], &rl, Endianness::Little, 0);
        assert_eq!(little.offset_x().unwrap(), 0x7f);
        assert_eq!(little.offset_y().unwrap(), -257);
        assert_eq!(little.offset_z().unwrap(), 0x0201_0000);
        assert_eq!(little.cursor(), 7);

        let mut big = CalibrationData::new(&data[..], &rl, Endianness::Big, 0);
        assert_eq!(big.offset_x().unwrap(), 0x7f);
        assert_eq!(big.offset_y().unwrap(), -2);
        assert_eq!(big.offset_z().unwrap(), 0x0000_0102);
    }

    #[test]
    fn missing_datatype_keeps_cursor() {
        let rl = layout("/begin RECORD_LAYOUT RL OFFSET_X 1 UBYTE /end RECORD_LAYOUT");
        let data = [0u8; 8];
        let mut cd = CalibrationData::new(&data[..], &rl, Endianness::Little, 2);
        assert!(matches!(
            cd.offset_y(),
            Err(CalibrationError::MissingDatatype {
                field: LayoutField::OffsetY,
                ..
            })
        ));
        assert_eq!(cd.cursor(), 2);

        // reading past the end does not move the cursor either
        cd.set_cursor(8);
        assert!(matches!(
            cd.offset_x(),
            Err(CalibrationError::AddressNotMapped { address: 8, len: 1 })
        ));
        assert_eq!(cd.cursor(), 8);
    }

    #[test]
    fn float_values() {
        let rl = layout(
            r#"/begin RECORD_LAYOUT RL
                FNC_VALUES 1 FLOAT32_IEEE ROW_DIR DIRECT
            /end RECORD_LAYOUT"#,
        );
        let data = 1.5f32.to_be_bytes();
        let mut cd = CalibrationData::new(&data[..], &rl, Endianness::Big, 0);
        assert_eq!(cd.fnc_value().unwrap(), RawValue::Float(1.5));

        cd.set_cursor(0);
        assert!(matches!(
            cd.read_field(LayoutField::FncValues),
            Err(CalibrationError::NonIntegerDatatype { .. })
        ));
        assert_eq!(cd.cursor(), 0);
    }

    #[test]
    fn axis_points_of_every_axis() {
        let rl = layout(
            r#"/begin RECORD_LAYOUT RL
                AXIS_PTS_Y 1 SWORD INDEX_INCR DIRECT
                AXIS_PTS_Z 2 FLOAT32_IEEE INDEX_INCR DIRECT
                AXIS_PTS_4 3 UBYTE INDEX_INCR DIRECT
                AXIS_PTS_5 4 ULONG INDEX_INCR DIRECT
            /end RECORD_LAYOUT"#,
        );
        let mut data = vec![0xfe, 0xff];
        data.extend_from_slice(&2.5f32.to_le_bytes());
        data.push(7);
        data.extend_from_slice(&0x0001_0000u32.to_le_bytes());

        let mut cd = CalibrationData::new(&data[..], &rl, Endianness::Little, 0);
        assert_eq!(cd.axis_pts_y().unwrap(), RawValue::Int(-2));
        assert_eq!(cd.axis_pts_z().unwrap(), RawValue::Float(2.5));
        assert_eq!(cd.axis_pts_4().unwrap(), RawValue::Int(7));
        assert_eq!(cd.axis_pts_5().unwrap(), RawValue::Int(0x0001_0000));
        assert_eq!(cd.cursor(), 11);

        // no AXIS_PTS_X in this layout
        assert!(matches!(
            cd.axis_pts_x(),
            Err(CalibrationError::MissingDatatype {
                field: LayoutField::AxisPtsX,
                ..
            })
        ));
        assert_eq!(cd.cursor(), 11);
    }

    #[test]
    fn wide_integers() {
        let data = u64::MAX.to_le_bytes();
        assert_eq!(
            decode_value(&data, DataType::AUint64, Endianness::Little),
            Some(RawValue::Int(-1))
        );
        assert_eq!(
            decode_value(&data, DataType::AInt64, Endianness::Little),
            Some(RawValue::Int(-1))
        );
        assert_eq!(
            decode_value(&data[..4], DataType::Sbyte, Endianness::Big),
            Some(RawValue::Int(-1))
        );
        assert_eq!(decode_value(&data[..3], DataType::Ulong, Endianness::Big), None);
    }

    #[test]
    fn half_precision() {
        assert_eq!(f16_to_f64(0x3c00), 1.0);
        assert_eq!(f16_to_f64(0xc000), -2.0);
        assert_eq!(f16_to_f64(0x0001), 2f64.powi(-24));
        assert_eq!(f16_to_f64(0x7c00), f64::INFINITY);
        assert!(f16_to_f64(0x7e00).is_nan());
    }

    #[test]
    fn byte_order_names() {
        assert_eq!(Endianness::from(ByteOrderEnum::MsbFirst), Endianness::Big);
        assert_eq!(Endianness::from(ByteOrderEnum::LittleEndian), Endianness::Big);
        assert_eq!(Endianness::from(ByteOrderEnum::MsbLast), Endianness::Little);
        assert_eq!(Endianness::from(ByteOrderEnum::BigEndian), Endianness::Little);
    }
}
