use super::{
    AddrType, Annotation, ByteOrderEnum, CalibrationAccess, Deposit, ExtendedLimits, IfData,
    MatrixDim, MaxRefresh, Monotony, NameList, SymbolLink, a2l_enum, named_record,
};
use crate::parser::{
    A2lBlock, BadLiteral, BlockForm, Grammar, item, lit_enum, lit_float, lit_ident, lit_int,
    lit_string, slot,
};
use crate::tokenizer::Token;

a2l_enum! {
    /// The kind of a CHARACTERISTIC
    pub enum CharacteristicType {
        Ascii = "ASCII",
        Curve = "CURVE",
        Map = "MAP",
        Cuboid = "CUBOID",
        Cube4 = "CUBE_4",
        Cube5 = "CUBE_5",
        ValBlk = "VAL_BLK",
        Value = "VALUE",
    }
}

a2l_enum! {
    /// The kind of an axis described by AXIS_DESCR
    pub enum AxisDescrAttribute {
        CurveAxis = "CURVE_AXIS",
        ComAxis = "COM_AXIS",
        FixAxis = "FIX_AXIS",
        ResAxis = "RES_AXIS",
        StdAxis = "STD_AXIS",
    }
}

a2l_enum! {
    pub enum CharacterEncoding {
        Utf8 = "UTF8",
        Utf16 = "UTF16",
        Utf32 = "UTF32",
    }
}

/// Specifies all the parameters of an adjustable object
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Characteristic {
    pub name: String,
    pub long_identifier: Option<String>,
    pub characteristic_type: Option<CharacteristicType>,
    /// the address as written in the file
    pub address: Option<String>,
    /// name of the RECORD_LAYOUT that describes the memory layout
    pub deposit: Option<String>,
    pub max_diff: Option<f64>,
    /// name of the COMPU_METHOD, or `NO_COMPU_METHOD`
    pub conversion: Option<String>,
    pub lower_limit: Option<f64>,
    pub upper_limit: Option<f64>,
    pub annotation: Vec<Annotation>,
    pub axis_descr: Vec<AxisDescr>,
    pub bit_mask: Option<u64>,
    pub byte_order: Option<ByteOrderEnum>,
    pub calibration_access: Option<CalibrationAccess>,
    pub comparison_quantity: Option<String>,
    pub dependent_characteristic: Option<CharacteristicFormula>,
    pub discrete: bool,
    pub display_identifier: Option<String>,
    pub ecu_address_extension: Option<i16>,
    pub encoding: Option<CharacterEncoding>,
    pub extended_limits: Option<ExtendedLimits>,
    pub format: Option<String>,
    pub function_list: Option<NameList>,
    pub guard_rails: bool,
    pub if_data: Vec<IfData>,
    pub map_list: Option<NameList>,
    pub matrix_dim: Option<MatrixDim>,
    pub max_refresh: Option<MaxRefresh>,
    pub model_link: Option<String>,
    pub number: Option<u16>,
    pub phys_unit: Option<String>,
    pub read_only: bool,
    pub ref_memory_segment: Option<String>,
    pub step_size: Option<f64>,
    pub symbol_link: Option<SymbolLink>,
    pub virtual_characteristic: Option<CharacteristicFormula>,
    pub line: u32,
}

/// Describes an axis of a CURVE, MAP, CUBOID, CUBE_4 or CUBE_5
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AxisDescr {
    pub attribute: Option<AxisDescrAttribute>,
    pub input_quantity: Option<String>,
    pub conversion: Option<String>,
    pub max_axis_points: Option<u16>,
    pub lower_limit: Option<f64>,
    pub upper_limit: Option<f64>,
    pub annotation: Vec<Annotation>,
    pub axis_pts_ref: Option<String>,
    pub byte_order: Option<ByteOrderEnum>,
    pub curve_axis_ref: Option<String>,
    pub deposit: Option<Deposit>,
    pub extended_limits: Option<ExtendedLimits>,
    pub fix_axis_par: Option<FixAxisPar>,
    pub fix_axis_par_dist: Option<FixAxisParDist>,
    pub fix_axis_par_list: Option<FixAxisParList>,
    pub format: Option<String>,
    pub max_grad: Option<f64>,
    pub monotony: Option<Monotony>,
    pub phys_unit: Option<String>,
    pub read_only: bool,
    pub step_size: Option<f64>,
    pub line: u32,
}

/// Parameters of a shared axis that is stored separately from the characteristics using it
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AxisPts {
    pub name: String,
    pub long_identifier: Option<String>,
    pub address: Option<u32>,
    pub input_quantity: Option<String>,
    pub deposit_record: Option<String>,
    pub max_diff: Option<f64>,
    pub conversion: Option<String>,
    pub max_axis_points: Option<u16>,
    pub lower_limit: Option<f64>,
    pub upper_limit: Option<f64>,
    pub annotation: Vec<Annotation>,
    pub byte_order: Option<ByteOrderEnum>,
    pub calibration_access: Option<CalibrationAccess>,
    pub deposit: Option<Deposit>,
    pub display_identifier: Option<String>,
    pub ecu_address_extension: Option<i16>,
    pub extended_limits: Option<ExtendedLimits>,
    pub format: Option<String>,
    pub function_list: Option<NameList>,
    pub guard_rails: bool,
    pub if_data: Vec<IfData>,
    pub monotony: Option<Monotony>,
    pub phys_unit: Option<String>,
    pub read_only: bool,
    pub ref_memory_segment: Option<String>,
    pub step_size: Option<f64>,
    pub symbol_link: Option<SymbolLink>,
    pub line: u32,
}

/// An untyped memory area
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Blob {
    pub name: String,
    pub long_identifier: Option<String>,
    pub start_address: Option<u32>,
    pub size: Option<u32>,
    pub address_type: Option<AddrType>,
    pub annotation: Vec<Annotation>,
    pub calibration_access: Option<CalibrationAccess>,
    pub display_identifier: Option<String>,
    pub ecu_address_extension: Option<i16>,
    pub if_data: Vec<IfData>,
    pub max_refresh: Option<MaxRefresh>,
    pub model_link: Option<String>,
    pub symbol_link: Option<SymbolLink>,
    pub line: u32,
}

/// An instance of a typedef
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Instance {
    pub name: String,
    pub long_identifier: Option<String>,
    pub type_ref: Option<String>,
    pub start_address: Option<u32>,
    pub address_type: Option<AddrType>,
    pub annotation: Vec<Annotation>,
    pub calibration_access: Option<CalibrationAccess>,
    pub display_identifier: Option<String>,
    pub ecu_address_extension: Option<i16>,
    pub if_data: Vec<IfData>,
    pub matrix_dim: Option<MatrixDim>,
    pub max_refresh: Option<MaxRefresh>,
    pub model_link: Option<String>,
    pub read_only: bool,
    pub symbol_link: Option<SymbolLink>,
    pub line: u32,
}

/// A formula over other characteristics, used by DEPENDENT_CHARACTERISTIC and VIRTUAL_CHARACTERISTIC
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CharacteristicFormula {
    pub formula: Option<String>,
    pub characteristics: Vec<String>,
}

/// Axis points computed as `offset + n * 2^shift`
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FixAxisPar {
    pub offset: Option<f64>,
    pub shift: Option<f64>,
    pub number_apo: Option<u16>,
}

/// Axis points computed as `offset + n * distance`
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FixAxisParDist {
    pub offset: Option<f64>,
    pub distance: Option<f64>,
    pub number_apo: Option<u16>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct FixAxisParList {
    pub axis_pts_values: Vec<f64>,
}

impl Characteristic {
    /// the numeric value of the address, if it is a valid 32-bit address
    pub fn address_value(&self) -> Option<u32> {
        let text = self.address.as_deref()?;
        parse_u32(text)
    }
}

fn parse_u32(text: &str) -> Option<u32> {
    if let Some(hexval) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u32::from_str_radix(hexval, 16).ok()
    } else {
        text.parse().ok()
    }
}

// the address keeps its original spelling; it must still be a valid 32-bit value
fn lit_address(token: &Token<'_>) -> Result<String, BadLiteral> {
    lit_int::<u32>(token)?;
    Ok(token.text.to_owned())
}

impl A2lBlock for Characteristic {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "CHARACTERISTIC",
        form: BlockForm::Block,
        positional: &[
            slot!(name "Name"),
            slot!("LongIdentifier", long_identifier, lit_string),
            slot!("Type", characteristic_type, lit_enum),
            slot!("Address", address, lit_address),
            slot!("Deposit", deposit, lit_ident),
            slot!("MaxDiff", max_diff, lit_float),
            slot!("Conversion", conversion, lit_ident),
            slot!("LowerLimit", lower_limit, lit_float),
            slot!("UpperLimit", upper_limit, lit_float),
        ],
        sub_items: &[
            item!(block "ANNOTATION" => push annotation),
            item!(block "AXIS_DESCR" => push axis_descr),
            item!(value "BIT_MASK" => bit_mask, lit_int),
            item!(value "BYTE_ORDER" => byte_order, lit_enum),
            item!(value "CALIBRATION_ACCESS" => calibration_access, lit_enum),
            item!(value "COMPARISON_QUANTITY" => comparison_quantity, lit_ident),
            item!(block "DEPENDENT_CHARACTERISTIC" => dependent_characteristic),
            item!(flag "DISCRETE" => discrete),
            item!(value "DISPLAY_IDENTIFIER" => display_identifier, lit_ident),
            item!(value "ECU_ADDRESS_EXTENSION" => ecu_address_extension, lit_int),
            item!(value "ENCODING" => encoding, lit_enum),
            item!(keyword "EXTENDED_LIMITS" => extended_limits),
            item!(value "FORMAT" => format, lit_string),
            item!(block "FUNCTION_LIST" => function_list),
            item!(flag "GUARD_RAILS" => guard_rails),
            item!(block "IF_DATA" => push if_data),
            item!(block "MAP_LIST" => map_list),
            item!(keyword "MATRIX_DIM" => matrix_dim),
            item!(keyword "MAX_REFRESH" => max_refresh),
            item!(value "MODEL_LINK" => model_link, lit_string),
            item!(value "NUMBER" => number, lit_int),
            item!(value "PHYS_UNIT" => phys_unit, lit_string),
            item!(flag "READ_ONLY" => read_only),
            item!(value "REF_MEMORY_SEGMENT" => ref_memory_segment, lit_ident),
            item!(value "STEP_SIZE" => step_size, lit_float),
            item!(keyword "SYMBOL_LINK" => symbol_link),
            item!(block "VIRTUAL_CHARACTERISTIC" => virtual_characteristic),
        ],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for AxisDescr {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "AXIS_DESCR",
        form: BlockForm::Block,
        positional: &[
            slot!("Attribute", attribute, lit_enum),
            slot!("InputQuantity", input_quantity, lit_ident),
            slot!("Conversion", conversion, lit_ident),
            slot!("MaxAxisPoints", max_axis_points, lit_int),
            slot!("LowerLimit", lower_limit, lit_float),
            slot!("UpperLimit", upper_limit, lit_float),
        ],
        sub_items: &[
            item!(block "ANNOTATION" => push annotation),
            item!(value "AXIS_PTS_REF" => axis_pts_ref, lit_ident),
            item!(value "BYTE_ORDER" => byte_order, lit_enum),
            item!(value "CURVE_AXIS_REF" => curve_axis_ref, lit_ident),
            item!(value "DEPOSIT" => deposit, lit_enum),
            item!(keyword "EXTENDED_LIMITS" => extended_limits),
            item!(keyword "FIX_AXIS_PAR" => fix_axis_par),
            item!(keyword "FIX_AXIS_PAR_DIST" => fix_axis_par_dist),
            item!(block "FIX_AXIS_PAR_LIST" => fix_axis_par_list),
            item!(value "FORMAT" => format, lit_string),
            item!(value "MAX_GRAD" => max_grad, lit_float),
            item!(value "MONOTONY" => monotony, lit_enum),
            item!(value "PHYS_UNIT" => phys_unit, lit_string),
            item!(flag "READ_ONLY" => read_only),
            item!(value "STEP_SIZE" => step_size, lit_float),
        ],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for AxisPts {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "AXIS_PTS",
        form: BlockForm::Block,
        positional: &[
            slot!(name "Name"),
            slot!("LongIdentifier", long_identifier, lit_string),
            slot!("Address", address, lit_int),
            slot!("InputQuantity", input_quantity, lit_ident),
            slot!("DepositRecord", deposit_record, lit_ident),
            slot!("MaxDiff", max_diff, lit_float),
            slot!("Conversion", conversion, lit_ident),
            slot!("MaxAxisPoints", max_axis_points, lit_int),
            slot!("LowerLimit", lower_limit, lit_float),
            slot!("UpperLimit", upper_limit, lit_float),
        ],
        sub_items: &[
            item!(block "ANNOTATION" => push annotation),
            item!(value "BYTE_ORDER" => byte_order, lit_enum),
            item!(value "CALIBRATION_ACCESS" => calibration_access, lit_enum),
            item!(value "DEPOSIT" => deposit, lit_enum),
            item!(value "DISPLAY_IDENTIFIER" => display_identifier, lit_ident),
            item!(value "ECU_ADDRESS_EXTENSION" => ecu_address_extension, lit_int),
            item!(keyword "EXTENDED_LIMITS" => extended_limits),
            item!(value "FORMAT" => format, lit_string),
            item!(block "FUNCTION_LIST" => function_list),
            item!(flag "GUARD_RAILS" => guard_rails),
            item!(block "IF_DATA" => push if_data),
            item!(value "MONOTONY" => monotony, lit_enum),
            item!(value "PHYS_UNIT" => phys_unit, lit_string),
            item!(flag "READ_ONLY" => read_only),
            item!(value "REF_MEMORY_SEGMENT" => ref_memory_segment, lit_ident),
            item!(value "STEP_SIZE" => step_size, lit_float),
            item!(keyword "SYMBOL_LINK" => symbol_link),
        ],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for Blob {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "BLOB",
        form: BlockForm::Block,
        positional: &[
            slot!(name "Name"),
            slot!("LongIdentifier", long_identifier, lit_string),
            slot!("StartAddress", start_address, lit_int),
            slot!("Size", size, lit_int),
        ],
        sub_items: &[
            item!(value "ADDRESS_TYPE" => address_type, lit_enum),
            item!(block "ANNOTATION" => push annotation),
            item!(value "CALIBRATION_ACCESS" => calibration_access, lit_enum),
            item!(value "DISPLAY_IDENTIFIER" => display_identifier, lit_ident),
            item!(value "ECU_ADDRESS_EXTENSION" => ecu_address_extension, lit_int),
            item!(block "IF_DATA" => push if_data),
            item!(keyword "MAX_REFRESH" => max_refresh),
            item!(value "MODEL_LINK" => model_link, lit_string),
            item!(keyword "SYMBOL_LINK" => symbol_link),
        ],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for Instance {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "INSTANCE",
        form: BlockForm::Block,
        positional: &[
            slot!(name "Name"),
            slot!("LongIdentifier", long_identifier, lit_string),
            slot!("TypeRef", type_ref, lit_ident),
            slot!("StartAddress", start_address, lit_int),
        ],
        sub_items: &[
            item!(value "ADDRESS_TYPE" => address_type, lit_enum),
            item!(block "ANNOTATION" => push annotation),
            item!(value "CALIBRATION_ACCESS" => calibration_access, lit_enum),
            item!(value "DISPLAY_IDENTIFIER" => display_identifier, lit_ident),
            item!(value "ECU_ADDRESS_EXTENSION" => ecu_address_extension, lit_int),
            item!(block "IF_DATA" => push if_data),
            item!(keyword "MATRIX_DIM" => matrix_dim),
            item!(keyword "MAX_REFRESH" => max_refresh),
            item!(value "MODEL_LINK" => model_link, lit_string),
            item!(flag "READ_ONLY" => read_only),
            item!(keyword "SYMBOL_LINK" => symbol_link),
        ],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for CharacteristicFormula {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "DEPENDENT_CHARACTERISTIC",
        form: BlockForm::Block,
        positional: &[
            slot!("Formula", formula, lit_string),
            slot!(repeated "Characteristic", characteristics, lit_ident),
        ],
        sub_items: &[],
    };
}

impl A2lBlock for FixAxisPar {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "FIX_AXIS_PAR",
        form: BlockForm::Keyword,
        positional: &[
            slot!("Offset", offset, lit_float),
            slot!("Shift", shift, lit_float),
            slot!("Numberapo", number_apo, lit_int),
        ],
        sub_items: &[],
    };
}

impl A2lBlock for FixAxisParDist {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "FIX_AXIS_PAR_DIST",
        form: BlockForm::Keyword,
        positional: &[
            slot!("Offset", offset, lit_float),
            slot!("Distance", distance, lit_float),
            slot!("Numberapo", number_apo, lit_int),
        ],
        sub_items: &[],
    };
}

impl A2lBlock for FixAxisParList {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "FIX_AXIS_PAR_LIST",
        form: BlockForm::Block,
        positional: &[slot!(repeated "AxisPtsValue", axis_pts_values, lit_float)],
        sub_items: &[],
    };
}

named_record!(Characteristic, AxisPts, Blob, Instance);
