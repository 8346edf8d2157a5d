use super::{AddrType, DataSize, DataType, IndexMode, IndexOrder, named_record};
use crate::parser::{A2lBlock, BlockForm, Grammar, item, lit_enum, lit_int, slot};

/// Describes the layout of a calibration object in memory
///
/// Every present element has a position. The positions give the order of the elements in
/// memory, not their byte offsets.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecordLayout {
    pub name: String,
    pub alignment_byte: Option<u16>,
    pub alignment_float16_ieee: Option<u16>,
    pub alignment_float32_ieee: Option<u16>,
    pub alignment_float64_ieee: Option<u16>,
    pub alignment_int64: Option<u16>,
    pub alignment_long: Option<u16>,
    pub alignment_word: Option<u16>,
    pub axis_pts_x: Option<AxisPtsDim>,
    pub axis_pts_y: Option<AxisPtsDim>,
    pub axis_pts_z: Option<AxisPtsDim>,
    pub axis_pts_4: Option<AxisPtsDim>,
    pub axis_pts_5: Option<AxisPtsDim>,
    pub axis_rescale_x: Option<AxisRescale>,
    pub axis_rescale_y: Option<AxisRescale>,
    pub axis_rescale_z: Option<AxisRescale>,
    pub axis_rescale_4: Option<AxisRescale>,
    pub axis_rescale_5: Option<AxisRescale>,
    pub dist_op_x: Option<PositionedDatatype>,
    pub dist_op_y: Option<PositionedDatatype>,
    pub dist_op_z: Option<PositionedDatatype>,
    pub dist_op_4: Option<PositionedDatatype>,
    pub dist_op_5: Option<PositionedDatatype>,
    pub fix_no_axis_pts_x: Option<u16>,
    pub fix_no_axis_pts_y: Option<u16>,
    pub fix_no_axis_pts_z: Option<u16>,
    pub fix_no_axis_pts_4: Option<u16>,
    pub fix_no_axis_pts_5: Option<u16>,
    pub fnc_values: Option<FncValues>,
    pub identification: Option<PositionedDatatype>,
    pub no_axis_pts_x: Option<PositionedDatatype>,
    pub no_axis_pts_y: Option<PositionedDatatype>,
    pub no_axis_pts_z: Option<PositionedDatatype>,
    pub no_axis_pts_4: Option<PositionedDatatype>,
    pub no_axis_pts_5: Option<PositionedDatatype>,
    pub no_rescale_x: Option<PositionedDatatype>,
    pub no_rescale_y: Option<PositionedDatatype>,
    pub no_rescale_z: Option<PositionedDatatype>,
    pub no_rescale_4: Option<PositionedDatatype>,
    pub no_rescale_5: Option<PositionedDatatype>,
    pub offset_x: Option<PositionedDatatype>,
    pub offset_y: Option<PositionedDatatype>,
    pub offset_z: Option<PositionedDatatype>,
    pub offset_4: Option<PositionedDatatype>,
    pub offset_5: Option<PositionedDatatype>,
    pub reserved: Vec<Reserved>,
    pub rip_addr_w: Option<PositionedDatatype>,
    pub rip_addr_x: Option<PositionedDatatype>,
    pub rip_addr_y: Option<PositionedDatatype>,
    pub rip_addr_z: Option<PositionedDatatype>,
    pub rip_addr_4: Option<PositionedDatatype>,
    pub rip_addr_5: Option<PositionedDatatype>,
    pub src_addr_x: Option<PositionedDatatype>,
    pub src_addr_y: Option<PositionedDatatype>,
    pub src_addr_z: Option<PositionedDatatype>,
    pub src_addr_4: Option<PositionedDatatype>,
    pub src_addr_5: Option<PositionedDatatype>,
    pub shift_op_x: Option<PositionedDatatype>,
    pub shift_op_y: Option<PositionedDatatype>,
    pub shift_op_z: Option<PositionedDatatype>,
    pub shift_op_4: Option<PositionedDatatype>,
    pub shift_op_5: Option<PositionedDatatype>,
    pub static_record_layout: bool,
    pub static_address_offsets: bool,
    pub line: u32,
}

/// An element of a record layout described by its position and its datatype
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PositionedDatatype {
    pub position: Option<u16>,
    pub datatype: Option<DataType>,
}

/// Axis points of one axis in a record layout
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AxisPtsDim {
    pub position: Option<u16>,
    pub datatype: Option<DataType>,
    pub index_incr: Option<IndexOrder>,
    pub addressing: Option<AddrType>,
}

/// Rescale axis pairs of one axis in a record layout
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AxisRescale {
    pub position: Option<u16>,
    pub datatype: Option<DataType>,
    pub max_number_of_rescale_pairs: Option<u16>,
    pub index_incr: Option<IndexOrder>,
    pub addressing: Option<AddrType>,
}

/// The table values of a record layout
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FncValues {
    pub position: Option<u16>,
    pub datatype: Option<DataType>,
    pub index_mode: Option<IndexMode>,
    pub address_type: Option<AddrType>,
}

/// Unused memory in a record layout
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Reserved {
    pub position: Option<u16>,
    pub data_size: Option<DataSize>,
}

impl A2lBlock for RecordLayout {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "RECORD_LAYOUT",
        form: BlockForm::Block,
        positional: &[slot!(name "Name")],
        sub_items: &[
            item!(value "ALIGNMENT_BYTE" => alignment_byte, lit_int),
            item!(value "ALIGNMENT_FLOAT16_IEEE" => alignment_float16_ieee, lit_int),
            item!(value "ALIGNMENT_FLOAT32_IEEE" => alignment_float32_ieee, lit_int),
            item!(value "ALIGNMENT_FLOAT64_IEEE" => alignment_float64_ieee, lit_int),
            item!(value "ALIGNMENT_INT64" => alignment_int64, lit_int),
            item!(value "ALIGNMENT_LONG" => alignment_long, lit_int),
            item!(value "ALIGNMENT_WORD" => alignment_word, lit_int),
            item!(keyword "AXIS_PTS_X" => axis_pts_x),
            item!(keyword "AXIS_PTS_Y" => axis_pts_y),
            item!(keyword "AXIS_PTS_Z" => axis_pts_z),
            item!(keyword "AXIS_PTS_4" => axis_pts_4),
            item!(keyword "AXIS_PTS_5" => axis_pts_5),
            item!(keyword "AXIS_RESCALE_X" => axis_rescale_x),
            item!(keyword "AXIS_RESCALE_Y" => axis_rescale_y),
            item!(keyword "AXIS_RESCALE_Z" => axis_rescale_z),
            item!(keyword "AXIS_RESCALE_4" => axis_rescale_4),
            item!(keyword "AXIS_RESCALE_5" => axis_rescale_5),
            item!(keyword "DIST_OP_X" => dist_op_x),
            item!(keyword "DIST_OP_Y" => dist_op_y),
            item!(keyword "DIST_OP_Z" => dist_op_z),
            item!(keyword "DIST_OP_4" => dist_op_4),
            item!(keyword "DIST_OP_5" => dist_op_5),
            item!(value "FIX_NO_AXIS_PTS_X" => fix_no_axis_pts_x, lit_int),
            item!(value "FIX_NO_AXIS_PTS_Y" => fix_no_axis_pts_y, lit_int),
            item!(value "FIX_NO_AXIS_PTS_Z" => fix_no_axis_pts_z, lit_int),
            item!(value "FIX_NO_AXIS_PTS_4" => fix_no_axis_pts_4, lit_int),
            item!(value "FIX_NO_AXIS_PTS_5" => fix_no_axis_pts_5, lit_int),
            item!(keyword "FNC_VALUES" => fnc_values),
            item!(keyword "IDENTIFICATION" => identification),
            item!(keyword "NO_AXIS_PTS_X" => no_axis_pts_x),
            item!(keyword "NO_AXIS_PTS_Y" => no_axis_pts_y),
            item!(keyword "NO_AXIS_PTS_Z" => no_axis_pts_z),
            item!(keyword "NO_AXIS_PTS_4" => no_axis_pts_4),
            item!(keyword "NO_AXIS_PTS_5" => no_axis_pts_5),
            item!(keyword "NO_RESCALE_X" => no_rescale_x),
            item!(keyword "NO_RESCALE_Y" => no_rescale_y),
            item!(keyword "NO_RESCALE_Z" => no_rescale_z),
            item!(keyword "NO_RESCALE_4" => no_rescale_4),
            item!(keyword "NO_RESCALE_5" => no_rescale_5),
            item!(keyword "OFFSET_X" => offset_x),
            item!(keyword "OFFSET_Y" => offset_y),
            item!(keyword "OFFSET_Z" => offset_z),
            item!(keyword "OFFSET_4" => offset_4),
            item!(keyword "OFFSET_5" => offset_5),
            item!(keyword "RESERVED" => push reserved),
            item!(keyword "RIP_ADDR_W" => rip_addr_w),
            item!(keyword "RIP_ADDR_X" => rip_addr_x),
            item!(keyword "RIP_ADDR_Y" => rip_addr_y),
            item!(keyword "RIP_ADDR_Z" => rip_addr_z),
            item!(keyword "RIP_ADDR_4" => rip_addr_4),
            item!(keyword "RIP_ADDR_5" => rip_addr_5),
            item!(keyword "SRC_ADDR_X" => src_addr_x),
            item!(keyword "SRC_ADDR_Y" => src_addr_y),
            item!(keyword "SRC_ADDR_Z" => src_addr_z),
            item!(keyword "SRC_ADDR_4" => src_addr_4),
            item!(keyword "SRC_ADDR_5" => src_addr_5),
            item!(keyword "SHIFT_OP_X" => shift_op_x),
            item!(keyword "SHIFT_OP_Y" => shift_op_y),
            item!(keyword "SHIFT_OP_Z" => shift_op_z),
            item!(keyword "SHIFT_OP_4" => shift_op_4),
            item!(keyword "SHIFT_OP_5" => shift_op_5),
            item!(flag "STATIC_RECORD_LAYOUT" => static_record_layout),
            item!(flag "STATIC_ADDRESS_OFFSETS" => static_address_offsets),
        ],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for PositionedDatatype {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "OFFSET_X",
        form: BlockForm::Keyword,
        positional: &[
            slot!("Position", position, lit_int),
            slot!("Datatype", datatype, lit_enum),
        ],
        sub_items: &[],
    };
}

impl A2lBlock for AxisPtsDim {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "AXIS_PTS_X",
        form: BlockForm::Keyword,
        positional: &[
            slot!("Position", position, lit_int),
            slot!("Datatype", datatype, lit_enum),
            slot!("IndexIncr", index_incr, lit_enum),
            slot!("Addressing", addressing, lit_enum),
        ],
        sub_items: &[],
    };
}

impl A2lBlock for AxisRescale {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "AXIS_RESCALE_X",
        form: BlockForm::Keyword,
        positional: &[
            slot!("Position", position, lit_int),
            slot!("Datatype", datatype, lit_enum),
            slot!("MaxNumberOfRescalePairs", max_number_of_rescale_pairs, lit_int),
            slot!("IndexIncr", index_incr, lit_enum),
            slot!("Addressing", addressing, lit_enum),
        ],
        sub_items: &[],
    };
}

impl A2lBlock for FncValues {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "FNC_VALUES",
        form: BlockForm::Keyword,
        positional: &[
            slot!("Position", position, lit_int),
            slot!("Datatype", datatype, lit_enum),
            slot!("IndexMode", index_mode, lit_enum),
            slot!("AddressType", address_type, lit_enum),
        ],
        sub_items: &[],
    };
}

impl A2lBlock for Reserved {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "RESERVED",
        form: BlockForm::Keyword,
        positional: &[
            slot!("Position", position, lit_int),
            slot!("DataSize", data_size, lit_enum),
        ],
        sub_items: &[],
    };
}

named_record!(RecordLayout);
