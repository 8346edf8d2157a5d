use super::{ByteOrderEnum, Deposit, IfData, a2l_enum, named_record};
use crate::parser::{
    A2lBlock, BlockForm, Grammar, item, lit_enum, lit_ident, lit_int, lit_string, slot,
};

a2l_enum! {
    /// Program type of a memory segment
    pub enum PrgType {
        CalibrationVariables = "CALIBRATION_VARIABLES",
        Code = "CODE",
        Data = "DATA",
        ExcludeFromFlash = "EXCLUDE_FROM_FLASH",
        OfflineData = "OFFLINE_DATA",
        Reserved = "RESERVED",
        Seram = "SERAM",
        Variables = "VARIABLES",
    }
}

a2l_enum! {
    pub enum MemoryType {
        Eeprom = "EEPROM",
        Eprom = "EPROM",
        Flash = "FLASH",
        Ram = "RAM",
        Rom = "ROM",
        Register = "REGISTER",
        NotInEcu = "NOT_IN_ECU",
    }
}

a2l_enum! {
    pub enum MemoryAttribute {
        Intern = "INTERN",
        Extern = "EXTERN",
    }
}

a2l_enum! {
    /// Format of the variant extension of adjustable object names
    pub enum VarNaming {
        Numeric = "NUMERIC",
        Alpha = "ALPHA",
    }
}

/// Module-wide defaults for the description of data
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ModCommon {
    pub comment: Option<String>,
    pub alignment_byte: Option<u16>,
    pub alignment_float16_ieee: Option<u16>,
    pub alignment_float32_ieee: Option<u16>,
    pub alignment_float64_ieee: Option<u16>,
    pub alignment_int64: Option<u16>,
    pub alignment_long: Option<u16>,
    pub alignment_word: Option<u16>,
    pub byte_order: Option<ByteOrderEnum>,
    pub data_size: Option<u16>,
    pub deposit: Option<Deposit>,
    pub s_rec_layout: Option<String>,
    pub line: u32,
}

/// Management data of the ECU
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ModPar {
    pub comment: Option<String>,
    pub addr_epk: Vec<u32>,
    pub cpu_type: Option<String>,
    pub customer: Option<String>,
    pub customer_no: Option<String>,
    pub ecu: Option<String>,
    pub ecu_calibration_offset: Option<i32>,
    pub epk: Option<String>,
    pub memory_segment: Vec<MemorySegment>,
    pub no_of_interfaces: Option<u16>,
    pub phone_no: Option<String>,
    pub supplier: Option<String>,
    pub system_constant: Vec<SystemConstant>,
    pub user: Option<String>,
    pub version: Option<String>,
    pub line: u32,
}

/// A memory segment of the ECU
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MemorySegment {
    pub name: String,
    pub long_identifier: Option<String>,
    pub prg_type: Option<PrgType>,
    pub memory_type: Option<MemoryType>,
    pub attribute: Option<MemoryAttribute>,
    pub address: Option<u32>,
    pub size: Option<u32>,
    /// five offsets, -1 when unused
    pub offsets: Vec<i32>,
    pub if_data: Vec<IfData>,
    pub line: u32,
}

/// A constant of the ECU software; both name and value are strings
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SystemConstant {
    pub name: Option<String>,
    pub value: Option<String>,
}

/// The variants of the calibration data
#[derive(Debug, Default, Clone, PartialEq)]
pub struct VariantCoding {
    pub var_characteristic: Vec<VarCharacteristic>,
    pub var_criterion: Vec<VarCriterion>,
    pub var_forbidden_comb: Vec<VarForbiddenComb>,
    pub var_naming: Option<VarNaming>,
    pub var_separator: Option<String>,
    pub line: u32,
}

/// A characteristic that has variants, and the criteria it depends on
#[derive(Debug, Default, Clone, PartialEq)]
pub struct VarCharacteristic {
    pub name: String,
    pub criterion_names: Vec<String>,
    pub var_address: Option<VarAddress>,
    pub line: u32,
}

/// Addresses of the variants of a characteristic
#[derive(Debug, Default, Clone, PartialEq)]
pub struct VarAddress {
    pub addresses: Vec<u32>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct VarCriterion {
    pub name: String,
    pub long_identifier: Option<String>,
    pub values: Vec<String>,
    pub var_measurement: Option<String>,
    pub var_selection_characteristic: Option<String>,
    pub line: u32,
}

/// A forbidden combination of criterion values
#[derive(Debug, Default, Clone, PartialEq)]
pub struct VarForbiddenComb {
    /// alternating criterion names and values
    pub combination: Vec<String>,
}

/// A frame of measurements that are transmitted together
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Frame {
    pub name: String,
    pub long_identifier: Option<String>,
    pub scaling_unit: Option<u16>,
    pub rate: Option<u32>,
    pub frame_measurement: Option<FrameMeasurement>,
    pub if_data: Vec<IfData>,
    pub line: u32,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct FrameMeasurement {
    pub identifiers: Vec<String>,
}

impl ModPar {
    /// find a system constant by name
    pub fn system_constant(&self, name: &str) -> Option<&str> {
        self.system_constant
            .iter()
            .find(|sc| sc.name.as_deref() == Some(name))
            .and_then(|sc| sc.value.as_deref())
    }
}

impl VarForbiddenComb {
    /// the (criterion, value) pairs of the combination
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.combination
            .chunks_exact(2)
            .map(|pair| (pair[0].as_str(), pair[1].as_str()))
    }
}

impl A2lBlock for ModCommon {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "MOD_COMMON",
        form: BlockForm::Block,
        positional: &[slot!("Comment", comment, lit_string)],
        sub_items: &[
            item!(value "ALIGNMENT_BYTE" => alignment_byte, lit_int),
            item!(value "ALIGNMENT_FLOAT16_IEEE" => alignment_float16_ieee, lit_int),
            item!(value "ALIGNMENT_FLOAT32_IEEE" => alignment_float32_ieee, lit_int),
            item!(value "ALIGNMENT_FLOAT64_IEEE" => alignment_float64_ieee, lit_int),
            item!(value "ALIGNMENT_INT64" => alignment_int64, lit_int),
            item!(value "ALIGNMENT_LONG" => alignment_long, lit_int),
            item!(value "ALIGNMENT_WORD" => alignment_word, lit_int),
            item!(value "BYTE_ORDER" => byte_order, lit_enum),
            item!(value "DATA_SIZE" => data_size, lit_int),
            item!(value "DEPOSIT" => deposit, lit_enum),
            item!(value "S_REC_LAYOUT" => s_rec_layout, lit_ident),
        ],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for ModPar {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "MOD_PAR",
        form: BlockForm::Block,
        positional: &[slot!("Comment", comment, lit_string)],
        sub_items: &[
            item!(value "ADDR_EPK" => push addr_epk, lit_int),
            item!(value "CPU_TYPE" => cpu_type, lit_string),
            item!(value "CUSTOMER" => customer, lit_string),
            item!(value "CUSTOMER_NO" => customer_no, lit_string),
            item!(value "ECU" => ecu, lit_string),
            item!(value "ECU_CALIBRATION_OFFSET" => ecu_calibration_offset, lit_int),
            item!(value "EPK" => epk, lit_string),
            item!(block "MEMORY_SEGMENT" => push memory_segment),
            item!(value "NO_OF_INTERFACES" => no_of_interfaces, lit_int),
            item!(value "PHONE_NO" => phone_no, lit_string),
            item!(value "SUPPLIER" => supplier, lit_string),
            item!(keyword "SYSTEM_CONSTANT" => push system_constant),
            item!(value "USER" => user, lit_string),
            item!(value "VERSION" => version, lit_string),
        ],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for MemorySegment {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "MEMORY_SEGMENT",
        form: BlockForm::Block,
        positional: &[
            slot!(name "Name"),
            slot!("LongIdentifier", long_identifier, lit_string),
            slot!("PrgType", prg_type, lit_enum),
            slot!("MemoryType", memory_type, lit_enum),
            slot!("Attribute", attribute, lit_enum),
            slot!("Address", address, lit_int),
            slot!("Size", size, lit_int),
            slot!(repeated "Offset", offsets, lit_int),
        ],
        sub_items: &[item!(block "IF_DATA" => push if_data)],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for SystemConstant {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "SYSTEM_CONSTANT",
        form: BlockForm::Keyword,
        positional: &[
            slot!("Name", name, lit_string),
            slot!("Value", value, lit_string),
        ],
        sub_items: &[],
    };
}

impl A2lBlock for VariantCoding {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "VARIANT_CODING",
        form: BlockForm::Block,
        positional: &[],
        sub_items: &[
            item!(block "VAR_CHARACTERISTIC" => push var_characteristic),
            item!(block "VAR_CRITERION" => push var_criterion),
            item!(block "VAR_FORBIDDEN_COMB" => push var_forbidden_comb),
            item!(value "VAR_NAMING" => var_naming, lit_enum),
            item!(value "VAR_SEPARATOR" => var_separator, lit_string),
        ],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for VarCharacteristic {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "VAR_CHARACTERISTIC",
        form: BlockForm::Block,
        positional: &[
            slot!(name "Name"),
            slot!(repeated "CriterionName", criterion_names, lit_ident),
        ],
        sub_items: &[item!(block "VAR_ADDRESS" => var_address)],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for VarAddress {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "VAR_ADDRESS",
        form: BlockForm::Block,
        positional: &[slot!(repeated "Address", addresses, lit_int)],
        sub_items: &[],
    };
}

impl A2lBlock for VarCriterion {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "VAR_CRITERION",
        form: BlockForm::Block,
        positional: &[
            slot!(name "Name"),
            slot!("LongIdentifier", long_identifier, lit_string),
            slot!(repeated "Value", values, lit_ident),
        ],
        sub_items: &[
            item!(value "VAR_MEASUREMENT" => var_measurement, lit_ident),
            item!(value "VAR_SELECTION_CHARACTERISTIC" => var_selection_characteristic, lit_ident),
        ],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for VarForbiddenComb {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "VAR_FORBIDDEN_COMB",
        form: BlockForm::Block,
        positional: &[slot!(repeated "Combination", combination, lit_ident)],
        sub_items: &[],
    };
}

impl A2lBlock for Frame {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "FRAME",
        form: BlockForm::Block,
        positional: &[
            slot!(name "Name"),
            slot!("LongIdentifier", long_identifier, lit_string),
            slot!("ScalingUnit", scaling_unit, lit_int),
            slot!("Rate", rate, lit_int),
        ],
        sub_items: &[
            item!(keyword "FRAME_MEASUREMENT" => frame_measurement),
            item!(block "IF_DATA" => push if_data),
        ],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for FrameMeasurement {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "FRAME_MEASUREMENT",
        form: BlockForm::Keyword,
        positional: &[slot!(repeated "Identifier", identifiers, lit_ident)],
        sub_items: &[],
    };
}

named_record!(MemorySegment, VarCharacteristic, VarCriterion, Frame);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ParseOptions, parse_block};

    #[test]
    fn mod_common() {
        let text = r#"/begin MOD_COMMON "common settings"
            BYTE_ORDER MSB_FIRST
            ALIGNMENT_BYTE 1
            ALIGNMENT_WORD 2
            ALIGNMENT_LONG 4
            DEPOSIT ABSOLUTE
        /end MOD_COMMON"#;
        let mod_common = parse_block::<ModCommon>(text, &ParseOptions::default()).unwrap();
        assert_eq!(mod_common.comment.as_deref(), Some("common settings"));
        assert_eq!(mod_common.byte_order, Some(ByteOrderEnum::MsbFirst));
        assert_eq!(mod_common.alignment_word, Some(2));
        assert_eq!(mod_common.alignment_long, Some(4));
        assert_eq!(mod_common.deposit, Some(Deposit::Absolute));
    }

    #[test]
    fn mod_par() {
        let text = r#"/begin MOD_PAR "ECU management"
            ADDR_EPK 0x45678
            ADDR_EPK 0x45680
            EPK "EPROM identifier test"
            SYSTEM_CONSTANT "CONTROLLERx constant1" "0.33"
            SYSTEM_CONSTANT "CONTROLLERx constant2" "2.79"
            /begin MEMORY_SEGMENT Data1 "Data internal Flash" DATA FLASH INTERN 0x4000 0x2000 -1 -1 -1 -1 -1
            /end MEMORY_SEGMENT
            NO_OF_INTERFACES 2
        /end MOD_PAR"#;
        let mod_par = parse_block::<ModPar>(text, &ParseOptions::default()).unwrap();
        assert_eq!(mod_par.addr_epk, vec![0x45678, 0x45680]);
        assert_eq!(mod_par.epk.as_deref(), Some("EPROM identifier test"));
        assert_eq!(mod_par.system_constant.len(), 2);
        assert_eq!(mod_par.system_constant("CONTROLLERx constant2"), Some("2.79"));
        assert_eq!(mod_par.system_constant("missing"), None);
        let segment = &mod_par.memory_segment[0];
        assert_eq!(segment.name, "Data1");
        assert_eq!(segment.prg_type, Some(PrgType::Data));
        assert_eq!(segment.memory_type, Some(MemoryType::Flash));
        assert_eq!(segment.attribute, Some(MemoryAttribute::Intern));
        assert_eq!(segment.address, Some(0x4000));
        assert_eq!(segment.size, Some(0x2000));
        assert_eq!(segment.offsets, vec![-1; 5]);
        assert_eq!(mod_par.no_of_interfaces, Some(2));
    }

    #[test]
    fn variant_coding() {
        let text = r#"/begin VARIANT_CODING
            VAR_SEPARATOR "."
            VAR_NAMING NUMERIC
            /begin VAR_CRITERION Car "Car body" Limousine Kombi Cabrio
                VAR_MEASUREMENT S_CAR
            /end VAR_CRITERION
            /begin VAR_CRITERION Gear "Type of gear box" Manual Automatic /end VAR_CRITERION
            /begin VAR_FORBIDDEN_COMB Car Limousine Gear Manual /end VAR_FORBIDDEN_COMB
            /begin VAR_CHARACTERISTIC PUMCD Car Gear
                /begin VAR_ADDRESS 0x7140 0x7168 0x8400 0x8428 /end VAR_ADDRESS
            /end VAR_CHARACTERISTIC
        /end VARIANT_CODING"#;
        let vc = parse_block::<VariantCoding>(text, &ParseOptions::default()).unwrap();
        assert_eq!(vc.var_separator.as_deref(), Some("."));
        assert_eq!(vc.var_naming, Some(VarNaming::Numeric));
        assert_eq!(vc.var_criterion.len(), 2);
        assert_eq!(vc.var_criterion[0].values, vec!["Limousine", "Kombi", "Cabrio"]);
        assert_eq!(vc.var_criterion[0].var_measurement.as_deref(), Some("S_CAR"));
        let pairs: Vec<(&str, &str)> = vc.var_forbidden_comb[0].pairs().collect();
        assert_eq!(pairs, vec![("Car", "Limousine"), ("Gear", "Manual")]);
        let var_chr = &vc.var_characteristic[0];
        assert_eq!(var_chr.criterion_names, vec!["Car", "Gear"]);
        assert_eq!(var_chr.var_address.as_ref().unwrap().addresses.len(), 4);
    }

    #[test]
    fn frame() {
        let text = r#"/begin FRAME ABS_ADJUSTM "function group ABS adjustment" 3 2
            FRAME_MEASUREMENT LOOP_COUNTER TEMPORARY_1
        /end FRAME"#;
        let frame = parse_block::<Frame>(text, &ParseOptions::default()).unwrap();
        assert_eq!(frame.scaling_unit, Some(3));
        assert_eq!(frame.rate, Some(2));
        assert_eq!(
            frame.frame_measurement.unwrap().identifiers,
            vec!["LOOP_COUNTER", "TEMPORARY_1"]
        );
    }
}
