use super::{
    Annotation, ByteOrderEnum, DataType, IfData, IndexMode, MatrixDim, MaxRefresh, NameList,
    SymbolLink, named_record,
};
use crate::parser::{
    A2lBlock, BlockForm, Grammar, item, lit_enum, lit_float, lit_ident, lit_int, lit_string, slot,
};

/// Describes the parameters of a measurement object in the ECU
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Measurement {
    pub name: String,
    pub long_identifier: Option<String>,
    pub datatype: Option<DataType>,
    pub conversion: Option<String>,
    pub resolution: Option<u16>,
    pub accuracy: Option<f64>,
    pub lower_limit: Option<f64>,
    pub upper_limit: Option<f64>,
    pub annotation: Vec<Annotation>,
    pub array_size: Option<u16>,
    pub bit_mask: Option<u64>,
    pub byte_order: Option<ByteOrderEnum>,
    pub discrete: bool,
    pub display_identifier: Option<String>,
    pub ecu_address: Option<u32>,
    pub ecu_address_extension: Option<i16>,
    pub error_mask: Option<u64>,
    pub format: Option<String>,
    pub function_list: Option<NameList>,
    pub if_data: Vec<IfData>,
    pub layout: Option<IndexMode>,
    pub matrix_dim: Option<MatrixDim>,
    pub max_refresh: Option<MaxRefresh>,
    pub phys_unit: Option<String>,
    pub read_write: bool,
    pub ref_memory_segment: Option<String>,
    pub symbol_link: Option<SymbolLink>,
    /// the measurements this virtual measurement is computed from
    pub var_virtual: Option<NameList>,
    pub line: u32,
}

impl A2lBlock for Measurement {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "MEASUREMENT",
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
            item!(block "ANNOTATION" => push annotation),
            item!(value "ARRAY_SIZE" => array_size, lit_int),
            item!(value "BIT_MASK" => bit_mask, lit_int),
            item!(value "BYTE_ORDER" => byte_order, lit_enum),
            item!(flag "DISCRETE" => discrete),
            item!(value "DISPLAY_IDENTIFIER" => display_identifier, lit_ident),
            item!(value "ECU_ADDRESS" => ecu_address, lit_int),
            item!(value "ECU_ADDRESS_EXTENSION" => ecu_address_extension, lit_int),
            item!(value "ERROR_MASK" => error_mask, lit_int),
            item!(value "FORMAT" => format, lit_string),
            item!(block "FUNCTION_LIST" => function_list),
            item!(block "IF_DATA" => push if_data),
            item!(value "LAYOUT" => layout, lit_enum),
            item!(keyword "MATRIX_DIM" => matrix_dim),
            item!(keyword "MAX_REFRESH" => max_refresh),
            item!(value "PHYS_UNIT" => phys_unit, lit_string),
            item!(flag "READ_WRITE" => read_write),
            item!(value "REF_MEMORY_SEGMENT" => ref_memory_segment, lit_ident),
            item!(keyword "SYMBOL_LINK" => symbol_link),
            item!(block "VIRTUAL" => var_virtual),
        ],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

named_record!(Measurement);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ParseOptions, parse_block};

    #[test]
    fn measurement() {
        let text = r#"
        /begin MEASUREMENT ENGINE_SPEED "engine speed" UWORD CM_RPM 1 100.0 0 8000
            ECU_ADDRESS 0x20001000
            BYTE_ORDER MSB_LAST
            FORMAT "%6.1"
            PHYS_UNIT "rpm"
            READ_WRITE
            /begin VIRTUAL N1 N2 /end VIRTUAL
        /end MEASUREMENT"#;
        let meas = parse_block::<Measurement>(text, &ParseOptions::default()).unwrap();
        assert_eq!(meas.name, "ENGINE_SPEED");
        assert_eq!(meas.datatype, Some(DataType::Uword));
        assert_eq!(meas.resolution, Some(1));
        assert_eq!(meas.accuracy, Some(100.0));
        assert_eq!(meas.upper_limit, Some(8000.0));
        assert_eq!(meas.ecu_address, Some(0x2000_1000));
        assert_eq!(meas.byte_order, Some(ByteOrderEnum::MsbLast));
        assert_eq!(meas.format.as_deref(), Some("%6.1"));
        assert!(meas.read_write);
        assert_eq!(meas.var_virtual.unwrap().names, vec!["N1", "N2"]);
        assert_eq!(meas.line, 2);
    }

    #[test]
    fn measurement_bad_datatype() {
        let text = r#"/begin MEASUREMENT M1 "" UINT16 CM 1 0 0 1 /end MEASUREMENT"#;
        let partial = parse_block::<Measurement>(text, &ParseOptions::default()).unwrap_err();
        assert_eq!(partial.record.name, "M1");
        assert!(partial.record.datatype.is_none());
        assert!(matches!(
            partial.error,
            crate::A2lError::ParserError {
                parser_error: crate::ParserError::MalformedLiteral {
                    slot: "Datatype",
                    ..
                }
            }
        ));
    }
}
