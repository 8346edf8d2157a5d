use super::{
    AddrType, AxisDescr, ByteOrderEnum, CharacterEncoding, CharacteristicType, DataType, Deposit,
    ExtendedLimits, IndexMode, MatrixDim, Monotony, NameList, a2l_enum, named_record,
};
use crate::parser::{
    A2lBlock, BlockForm, Grammar, item, lit_enum, lit_float, lit_ident, lit_int, lit_string, slot,
};

a2l_enum! {
    /// When the transformer is called
    pub enum TransformerTrigger {
        OnUserRequest = "ON_USER_REQUEST",
        OnChange = "ON_CHANGE",
    }
}

/// Type definition of an axis object
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TypedefAxis {
    pub name: String,
    pub long_identifier: Option<String>,
    pub input_quantity: Option<String>,
    pub record_layout: Option<String>,
    pub max_diff: Option<f64>,
    pub conversion: Option<String>,
    pub max_axis_points: Option<u16>,
    pub lower_limit: Option<f64>,
    pub upper_limit: Option<f64>,
    pub byte_order: Option<ByteOrderEnum>,
    pub deposit: Option<Deposit>,
    pub extended_limits: Option<ExtendedLimits>,
    pub format: Option<String>,
    pub monotony: Option<Monotony>,
    pub phys_unit: Option<String>,
    pub step_size: Option<f64>,
    pub line: u32,
}

/// Type definition of a BLOB
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TypedefBlob {
    pub name: String,
    pub long_identifier: Option<String>,
    pub size: Option<u32>,
    pub address_type: Option<AddrType>,
    pub line: u32,
}

/// Type definition of a calibration object
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TypedefCharacteristic {
    pub name: String,
    pub long_identifier: Option<String>,
    pub characteristic_type: Option<CharacteristicType>,
    pub record_layout: Option<String>,
    pub max_diff: Option<f64>,
    pub conversion: Option<String>,
    pub lower_limit: Option<f64>,
    pub upper_limit: Option<f64>,
    pub axis_descr: Vec<AxisDescr>,
    pub bit_mask: Option<u64>,
    pub byte_order: Option<ByteOrderEnum>,
    pub discrete: bool,
    pub encoding: Option<CharacterEncoding>,
    pub extended_limits: Option<ExtendedLimits>,
    pub format: Option<String>,
    pub matrix_dim: Option<MatrixDim>,
    pub number: Option<u16>,
    pub phys_unit: Option<String>,
    pub step_size: Option<f64>,
    pub line: u32,
}

/// Type definition of a measurement object
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TypedefMeasurement {
    pub name: String,
    pub long_identifier: Option<String>,
    pub datatype: Option<DataType>,
    pub conversion: Option<String>,
    pub resolution: Option<u16>,
    pub accuracy: Option<f64>,
    pub lower_limit: Option<f64>,
    pub upper_limit: Option<f64>,
    pub bit_mask: Option<u64>,
    pub byte_order: Option<ByteOrderEnum>,
    pub discrete: bool,
    pub error_mask: Option<u64>,
    pub format: Option<String>,
    pub layout: Option<IndexMode>,
    pub matrix_dim: Option<MatrixDim>,
    pub phys_unit: Option<String>,
    pub line: u32,
}

/// A structured data type, instantiated by INSTANCE
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TypedefStructure {
    pub name: String,
    pub long_identifier: Option<String>,
    pub total_size: Option<u32>,
    pub address_type: Option<AddrType>,
    pub consistent_exchange: bool,
    pub structure_component: Vec<StructureComponent>,
    pub symbol_type_link: Option<String>,
    pub line: u32,
}

/// One component of a TYPEDEF_STRUCTURE
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StructureComponent {
    pub name: String,
    /// name of the typedef of the component
    pub component_type: Option<String>,
    pub address_offset: Option<u32>,
    pub address_type: Option<AddrType>,
    pub layout: Option<IndexMode>,
    pub matrix_dim: Option<MatrixDim>,
    pub symbol_type_link: Option<String>,
}

/// Call of an external function which converts calibration values between their
/// implementation format and their physical format
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Transformer {
    pub name: String,
    pub version: Option<String>,
    pub dllname_32bit: Option<String>,
    pub dllname_64bit: Option<String>,
    pub timeout: Option<u32>,
    pub trigger: Option<TransformerTrigger>,
    pub inverse_transformer: Option<String>,
    pub transformer_in_objects: Option<NameList>,
    pub transformer_out_objects: Option<NameList>,
    pub line: u32,
}

impl A2lBlock for TypedefAxis {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "TYPEDEF_AXIS",
        form: BlockForm::Block,
        positional: &[
            slot!(name "Name"),
            slot!("LongIdentifier", long_identifier, lit_string),
            slot!("InputQuantity", input_quantity, lit_ident),
            slot!("RecordLayout", record_layout, lit_ident),
            slot!("MaxDiff", max_diff, lit_float),
            slot!("Conversion", conversion, lit_ident),
            slot!("MaxAxisPoints", max_axis_points, lit_int),
            slot!("LowerLimit", lower_limit, lit_float),
            slot!("UpperLimit", upper_limit, lit_float),
        ],
        sub_items: &[
            item!(value "BYTE_ORDER" => byte_order, lit_enum),
            item!(value "DEPOSIT" => deposit, lit_enum),
            item!(keyword "EXTENDED_LIMITS" => extended_limits),
            item!(value "FORMAT" => format, lit_string),
            item!(value "MONOTONY" => monotony, lit_enum),
            item!(value "PHYS_UNIT" => phys_unit, lit_string),
            item!(value "STEP_SIZE" => step_size, lit_float),
        ],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for TypedefBlob {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "TYPEDEF_BLOB",
        form: BlockForm::Block,
        positional: &[
            slot!(name "Name"),
            slot!("LongIdentifier", long_identifier, lit_string),
            slot!("Size", size, lit_int),
        ],
        sub_items: &[item!(value "ADDRESS_TYPE" => address_type, lit_enum)],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for TypedefCharacteristic {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "TYPEDEF_CHARACTERISTIC",
        form: BlockForm::Block,
        positional: &[
            slot!(name "Name"),
            slot!("LongIdentifier", long_identifier, lit_string),
            slot!("Type", characteristic_type, lit_enum),
            slot!("RecordLayout", record_layout, lit_ident),
            slot!("MaxDiff", max_diff, lit_float),
            slot!("Conversion", conversion, lit_ident),
            slot!("LowerLimit", lower_limit, lit_float),
            slot!("UpperLimit", upper_limit, lit_float),
        ],
        sub_items: &[
            item!(block "AXIS_DESCR" => push axis_descr),
            item!(value "BIT_MASK" => bit_mask, lit_int),
            item!(value "BYTE_ORDER" => byte_order, lit_enum),
            item!(flag "DISCRETE" => discrete),
            item!(value "ENCODING" => encoding, lit_enum),
            item!(keyword "EXTENDED_LIMITS" => extended_limits),
            item!(value "FORMAT" => format, lit_string),
            item!(keyword "MATRIX_DIM" => matrix_dim),
            item!(value "NUMBER" => number, lit_int),
            item!(value "PHYS_UNIT" => phys_unit, lit_string),
            item!(value "STEP_SIZE" => step_size, lit_float),
        ],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for TypedefMeasurement {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "TYPEDEF_MEASUREMENT",
        form: BlockForm::Block,
        positional: &[
            slot!(name "Name"),
            slot!("LongIdentifier", long_identifier, lit_string),
            slot!("Datatype", datatype, lit_enum),
            slot!("Conversion", conversion, lit_ident),
            slot!("Resolution", resolution, lit_int),
            slot!("Accuracy", accuracy, lit_float),
            slot!("LowerLimit", lower_limit, lit_float),
            slot!("UpperLimit", upper_limit, lit_float),
        ],
        sub_items: &[
            item!(value "BIT_MASK" => bit_mask, lit_int),
            item!(value "BYTE_ORDER" => byte_order, lit_enum),
            item!(flag "DISCRETE" => discrete),
            item!(value "ERROR_MASK" => error_mask, lit_int),
            item!(value "FORMAT" => format, lit_string),
            item!(value "LAYOUT" => layout, lit_enum),
            item!(keyword "MATRIX_DIM" => matrix_dim),
            item!(value "PHYS_UNIT" => phys_unit, lit_string),
        ],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for TypedefStructure {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "TYPEDEF_STRUCTURE",
        form: BlockForm::Block,
        positional: &[
            slot!(name "Name"),
            slot!("LongIdentifier", long_identifier, lit_string),
            slot!("TotalSize", total_size, lit_int),
        ],
        sub_items: &[
            item!(value "ADDRESS_TYPE" => address_type, lit_enum),
            item!(flag "CONSISTENT_EXCHANGE" => consistent_exchange),
            item!(block "STRUCTURE_COMPONENT" => push structure_component),
            item!(value "SYMBOL_TYPE_LINK" => symbol_type_link, lit_string),
        ],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for StructureComponent {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "STRUCTURE_COMPONENT",
        form: BlockForm::Block,
        positional: &[
            slot!(name "Name"),
            slot!("ComponentType", component_type, lit_ident),
            slot!("AddressOffset", address_offset, lit_int),
        ],
        sub_items: &[
            item!(value "ADDRESS_TYPE" => address_type, lit_enum),
            item!(value "LAYOUT" => layout, lit_enum),
            item!(keyword "MATRIX_DIM" => matrix_dim),
            item!(value "SYMBOL_TYPE_LINK" => symbol_type_link, lit_string),
        ],
    };
}

impl A2lBlock for Transformer {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "TRANSFORMER",
        form: BlockForm::Block,
        positional: &[
            slot!(name "Name"),
            slot!("Version", version, lit_string),
            slot!("Dllname32", dllname_32bit, lit_string),
            slot!("Dllname64", dllname_64bit, lit_string),
            slot!("Timeout", timeout, lit_int),
            slot!("Trigger", trigger, lit_enum),
            slot!("InverseTransformer", inverse_transformer, lit_ident),
        ],
        sub_items: &[
            item!(block "TRANSFORMER_IN_OBJECTS" => transformer_in_objects),
            item!(block "TRANSFORMER_OUT_OBJECTS" => transformer_out_objects),
        ],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

named_record!(
    TypedefAxis,
    TypedefBlob,
    TypedefCharacteristic,
    TypedefMeasurement,
    TypedefStructure,
    Transformer,
);
