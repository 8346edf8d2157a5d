//! Resolution of record layout positions
//!
//! The elements of a RECORD_LAYOUT carry relative positions which only give their order in
//! memory. The byte offset of an element is the sum of the widths of all elements before it.

use std::collections::BTreeMap;
use std::fmt::Display;

use thiserror::Error;

use crate::specification::{DataSize, DataType, RecordLayout};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("position {position} is used twice in record layout {layout}: by {first} and by {second}")]
    DuplicatePosition {
        layout: String,
        position: u16,
        first: LayoutField,
        second: LayoutField,
    },
}

/// An element of a record layout that is a field of the calibration object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayoutField {
    AxisPtsX,
    AxisPtsY,
    AxisPtsZ,
    AxisPts4,
    AxisPts5,
    AxisRescaleX,
    AxisRescaleY,
    AxisRescaleZ,
    AxisRescale4,
    AxisRescale5,
    DistOpX,
    DistOpY,
    DistOpZ,
    DistOp4,
    DistOp5,
    FncValues,
    Identification,
    NoAxisPtsX,
    NoAxisPtsY,
    NoAxisPtsZ,
    NoAxisPts4,
    NoAxisPts5,
    NoRescaleX,
    NoRescaleY,
    NoRescaleZ,
    NoRescale4,
    NoRescale5,
    OffsetX,
    OffsetY,
    OffsetZ,
    Offset4,
    Offset5,
    Reserved,
    RipAddrW,
    RipAddrX,
    RipAddrY,
    RipAddrZ,
    RipAddr4,
    RipAddr5,
    SrcAddrX,
    SrcAddrY,
    SrcAddrZ,
    SrcAddr4,
    SrcAddr5,
    ShiftOpX,
    ShiftOpY,
    ShiftOpZ,
    ShiftOp4,
    ShiftOp5,
}

impl Display for LayoutField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// A present element of a record layout with its relative position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionedField {
    pub field: LayoutField,
    pub position: u16,
    pub datatype: Option<DataType>,
    /// width in bytes; 0 if the element has no datatype
    pub width: u32,
}

/// A record layout element at its byte offset from the start of the calibration object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedField {
    pub field: LayoutField,
    pub position: u16,
    pub offset: u32,
    pub width: u32,
    pub datatype: Option<DataType>,
}

/// The elements of a record layout in memory order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLayout {
    pub name: String,
    pub fields: Vec<ResolvedField>,
}

impl ResolvedLayout {
    pub fn get(&self, field: LayoutField) -> Option<&ResolvedField> {
        self.fields.iter().find(|resolved| resolved.field == field)
    }

    /// number of bytes covered by all fields
    pub fn size(&self) -> u32 {
        self.fields
            .last()
            .map_or(0, |resolved| resolved.offset + resolved.width)
    }
}

impl DataType {
    /// the size of one value of this type in bytes
    pub fn width(&self) -> u32 {
        match self {
            DataType::Ubyte | DataType::Sbyte => 1,
            DataType::Uword | DataType::Sword | DataType::Float16Ieee => 2,
            DataType::Ulong | DataType::Slong | DataType::Float32Ieee => 4,
            DataType::AUint64 | DataType::AInt64 | DataType::Float64Ieee => 8,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(
            self,
            DataType::Float16Ieee | DataType::Float32Ieee | DataType::Float64Ieee
        )
    }
}

impl DataSize {
    pub fn width(&self) -> u32 {
        match self {
            DataSize::Byte => 1,
            DataSize::Word => 2,
            DataSize::Long => 4,
        }
    }
}

// (position, datatype) of every optional element, in declaration order
macro_rules! positioned_elements {
    ($layout:ident; $($field:ident => $variant:ident),+ $(,)?) => {
        [
            $((
                LayoutField::$variant,
                $layout.$field.as_ref().map(|elem| (elem.position, elem.datatype)),
            ),)+
        ]
    };
}

impl RecordLayout {
    fn element_entries(&self) -> [(LayoutField, Option<(Option<u16>, Option<DataType>)>); 48] {
        positioned_elements! { self;
            axis_pts_x => AxisPtsX,
            axis_pts_y => AxisPtsY,
            axis_pts_z => AxisPtsZ,
            axis_pts_4 => AxisPts4,
            axis_pts_5 => AxisPts5,
            axis_rescale_x => AxisRescaleX,
            axis_rescale_y => AxisRescaleY,
            axis_rescale_z => AxisRescaleZ,
            axis_rescale_4 => AxisRescale4,
            axis_rescale_5 => AxisRescale5,
            dist_op_x => DistOpX,
            dist_op_y => DistOpY,
            dist_op_z => DistOpZ,
            dist_op_4 => DistOp4,
            dist_op_5 => DistOp5,
            fnc_values => FncValues,
            identification => Identification,
            no_axis_pts_x => NoAxisPtsX,
            no_axis_pts_y => NoAxisPtsY,
            no_axis_pts_z => NoAxisPtsZ,
            no_axis_pts_4 => NoAxisPts4,
            no_axis_pts_5 => NoAxisPts5,
            no_rescale_x => NoRescaleX,
            no_rescale_y => NoRescaleY,
            no_rescale_z => NoRescaleZ,
            no_rescale_4 => NoRescale4,
            no_rescale_5 => NoRescale5,
            offset_x => OffsetX,
            offset_y => OffsetY,
            offset_z => OffsetZ,
            offset_4 => Offset4,
            offset_5 => Offset5,
            rip_addr_w => RipAddrW,
            rip_addr_x => RipAddrX,
            rip_addr_y => RipAddrY,
            rip_addr_z => RipAddrZ,
            rip_addr_4 => RipAddr4,
            rip_addr_5 => RipAddr5,
            src_addr_x => SrcAddrX,
            src_addr_y => SrcAddrY,
            src_addr_z => SrcAddrZ,
            src_addr_4 => SrcAddr4,
            src_addr_5 => SrcAddr5,
            shift_op_x => ShiftOpX,
            shift_op_y => ShiftOpY,
            shift_op_z => ShiftOpZ,
            shift_op_4 => ShiftOp4,
            shift_op_5 => ShiftOp5,
        }
    }

    /// All present elements that have a position, in declaration order
    ///
    /// RESERVED elements are listed after the named elements; their width comes from their
    /// data size.
    pub fn positioned_fields(&self) -> Vec<PositionedField> {
        let named = self
            .element_entries()
            .into_iter()
            .filter_map(|(field, entry)| {
                let (position, datatype) = entry?;
                Some(PositionedField {
                    field,
                    position: position?,
                    datatype,
                    width: datatype.map_or(0, |datatype| datatype.width()),
                })
            });
        let reserved = self.reserved.iter().filter_map(|reserved| {
            Some(PositionedField {
                field: LayoutField::Reserved,
                position: reserved.position?,
                datatype: None,
                width: reserved.data_size.map_or(0, |size| size.width()),
            })
        });
        named.chain(reserved).collect()
    }

    /// the datatype of an element, if the element is present and has one
    pub fn field_datatype(&self, field: LayoutField) -> Option<DataType> {
        self.element_entries()
            .into_iter()
            .find(|(candidate, _)| *candidate == field)
            .and_then(|(_, entry)| entry?.1)
    }

    fn positions(&self) -> Result<BTreeMap<u16, PositionedField>, LayoutError> {
        let mut positions: BTreeMap<u16, PositionedField> = BTreeMap::new();
        for field in self.positioned_fields() {
            if let Some(first) = positions.get(&field.position) {
                return Err(LayoutError::DuplicatePosition {
                    layout: self.name.clone(),
                    position: field.position,
                    first: first.field,
                    second: field.field,
                });
            }
            positions.insert(field.position, field);
        }
        Ok(positions)
    }

    /// map the relative position of every present element to the element
    pub fn resolve_relative_positions(&self) -> Result<BTreeMap<u16, LayoutField>, LayoutError> {
        Ok(self
            .positions()?
            .into_iter()
            .map(|(position, field)| (position, field.field))
            .collect())
    }

    /// Compute the byte offset of every present element.
    ///
    /// The elements are visited in ascending position order; each one starts where the
    /// previous one ended.
    pub fn resolve_absolute_positions(&self) -> Result<ResolvedLayout, LayoutError> {
        let mut offset = 0u32;
        let fields = self
            .positions()?
            .into_values()
            .map(|field| {
                let resolved = ResolvedField {
                    field: field.field,
                    position: field.position,
                    offset,
                    width: field.width,
                    datatype: field.datatype,
                };
                offset += field.width;
                resolved
            })
            .collect();
        Ok(ResolvedLayout {
            name: self.name.clone(),
            fields,
        })
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
    fn relative_positions() {
        let rl = layout(
            r#"/begin RECORD_LAYOUT DAMOS_KF
                FNC_VALUES 7 SWORD COLUMN_DIR DIRECT
                AXIS_PTS_X 3 SWORD INDEX_INCR DIRECT
                AXIS_PTS_Y 6 UBYTE INDEX_INCR DIRECT
                NO_AXIS_PTS_X 2 UBYTE
                NO_AXIS_PTS_Y 5 UBYTE
                SRC_ADDR_X 1 ULONG
                SRC_ADDR_Y 4 ULONG
                ALIGNMENT_BYTE 2
            /end RECORD_LAYOUT"#,
        );
        let positions = rl.resolve_relative_positions().unwrap();
        let fields: Vec<LayoutField> = positions.values().copied().collect();
        assert_eq!(
            fields,
            vec![
                LayoutField::SrcAddrX,
                LayoutField::NoAxisPtsX,
                LayoutField::AxisPtsX,
                LayoutField::SrcAddrY,
                LayoutField::NoAxisPtsY,
                LayoutField::AxisPtsY,
                LayoutField::FncValues,
            ]
        );
        assert_eq!(rl.field_datatype(LayoutField::AxisPtsY), Some(DataType::Ubyte));
        assert_eq!(rl.field_datatype(LayoutField::OffsetX), None);
    }

    #[test]
    fn absolute_positions() {
        let rl = layout(
            r#"/begin RECORD_LAYOUT DAMOS_KF
                FNC_VALUES 7 SWORD COLUMN_DIR DIRECT
                AXIS_PTS_X 3 SWORD INDEX_INCR DIRECT
                AXIS_PTS_Y 6 UBYTE INDEX_INCR DIRECT
                NO_AXIS_PTS_X 2 UBYTE
                NO_AXIS_PTS_Y 5 UBYTE
                SRC_ADDR_X 1 ULONG
                SRC_ADDR_Y 4 ULONG
            /end RECORD_LAYOUT"#,
        );
        let resolved = rl.resolve_absolute_positions().unwrap();
        let offsets: Vec<(LayoutField, u32)> = resolved
            .fields
            .iter()
            .map(|field| (field.field, field.offset))
            .collect();
        assert_eq!(
            offsets,
            vec![
                (LayoutField::SrcAddrX, 0),
                (LayoutField::NoAxisPtsX, 4),
                (LayoutField::AxisPtsX, 5),
                (LayoutField::SrcAddrY, 7),
                (LayoutField::NoAxisPtsY, 11),
                (LayoutField::AxisPtsY, 12),
                (LayoutField::FncValues, 13),
            ]
        );
        assert_eq!(resolved.size(), 15);
        assert_eq!(resolved.get(LayoutField::FncValues).unwrap().width, 2);
    }

    #[test]
    fn reserved_elements() {
        let rl = layout(
            r#"/begin RECORD_LAYOUT RL
                RESERVED 1 LONG
                FNC_VALUES 2 FLOAT32_IEEE ROW_DIR DIRECT
                RESERVED 3 BYTE
                IDENTIFICATION 4 UWORD
            /end RECORD_LAYOUT"#,
        );
        let resolved = rl.resolve_absolute_positions().unwrap();
        assert_eq!(resolved.get(LayoutField::FncValues).unwrap().offset, 4);
        assert_eq!(resolved.get(LayoutField::Identification).unwrap().offset, 9);
        assert_eq!(resolved.size(), 11);
    }

    #[test]
    fn duplicate_position() {
        let rl = layout(
            r#"/begin RECORD_LAYOUT RL
                RESERVED 2 WORD
                SHIFT_OP_X 2 UBYTE
            /end RECORD_LAYOUT"#,
        );
        let err = rl.resolve_absolute_positions().unwrap_err();
        // named elements are checked before reserved ones
        assert_eq!(
            err,
            LayoutError::DuplicatePosition {
                layout: "RL".to_string(),
                position: 2,
                first: LayoutField::ShiftOpX,
                second: LayoutField::Reserved,
            }
        );
        assert!(err.to_string().contains("ShiftOpX"));
    }

    #[test]
    fn empty_layout() {
        let rl = layout("/begin RECORD_LAYOUT EMPTY ALIGNMENT_WORD 2 /end RECORD_LAYOUT");
        assert!(rl.resolve_relative_positions().unwrap().is_empty());
        let resolved = rl.resolve_absolute_positions().unwrap();
        assert!(resolved.fields.is_empty());
        assert_eq!(resolved.size(), 0);
    }
}
