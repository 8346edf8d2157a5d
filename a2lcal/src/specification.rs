//! The record kinds of an a2l file and their grammars
//!
//! Every record kind is a plain struct. Positional attributes that the grammar makes optional
//! are `Option`s, so that "absent" is distinct from a zero value.

use crate::parser::{
    A2lBlock, BlockForm, Grammar, SubItem, item, lit_float, lit_ident, lit_int, lit_raw,
    lit_string, slot,
};

mod characteristic;
mod compu;
mod hierarchy;
mod measurement;
mod module_data;
mod record_layout;
mod typedef;

pub use characteristic::*;
pub use compu::*;
pub use hierarchy::*;
pub use measurement::*;
pub use module_data::*;
pub use record_layout::*;
pub use typedef::*;

/// Access to the name and source line of named records
pub trait A2lObjectName {
    fn get_name(&self) -> &str;

    fn get_line(&self) -> u32;
}

macro_rules! a2l_enum {
    (
        $(#[$attr:meta])*
        pub enum $name:ident {
            $($variant:ident = $text:literal),+ $(,)?
        }
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $crate::parser::A2lEnum for $name {
            fn from_a2l(text: &str) -> Option<Self> {
                match text {
                    $($text => Some(Self::$variant),)+
                    _ => None,
                }
            }

            fn as_a2l(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::parser::A2lEnum::as_a2l(self))
            }
        }
    };
}
pub(crate) use a2l_enum;

// records with a `name` and a `line` field
macro_rules! named_record {
    ($($name:ident),+ $(,)?) => {
        $(
            impl $crate::specification::A2lObjectName for $name {
                fn get_name(&self) -> &str {
                    &self.name
                }

                fn get_line(&self) -> u32 {
                    self.line
                }
            }
        )+
    };
}
pub(crate) use named_record;

a2l_enum! {
    /// Description of the basic data types in the ECU program.
    pub enum DataType {
        Ubyte = "UBYTE",
        Sbyte = "SBYTE",
        Uword = "UWORD",
        Sword = "SWORD",
        Ulong = "ULONG",
        Slong = "SLONG",
        AUint64 = "A_UINT64",
        AInt64 = "A_INT64",
        Float16Ieee = "FLOAT16_IEEE",
        Float32Ieee = "FLOAT32_IEEE",
        Float64Ieee = "FLOAT64_IEEE",
    }
}

a2l_enum! {
    /// Description of the word lengths in the ECU program.
    pub enum DataSize {
        Byte = "BYTE",
        Word = "WORD",
        Long = "LONG",
    }
}

a2l_enum! {
    /// Byte ordering of a value on the ECU
    ///
    /// `BIG_ENDIAN` and `LITTLE_ENDIAN` are the deprecated aliases of `MSB_LAST` and `MSB_FIRST`.
    pub enum ByteOrderEnum {
        LittleEndian = "LITTLE_ENDIAN",
        BigEndian = "BIG_ENDIAN",
        MsbLast = "MSB_LAST",
        MsbFirst = "MSB_FIRST",
        MsbFirstMswLast = "MSB_FIRST_MSW_LAST",
        MsbLastMswFirst = "MSB_LAST_MSW_FIRST",
    }
}

a2l_enum! {
    /// Description of the axis point sequence in the memory.
    pub enum IndexOrder {
        IndexIncr = "INDEX_INCR",
        IndexDecr = "INDEX_DECR",
    }
}

a2l_enum! {
    /// Description of the addressing of table values or axis point values.
    pub enum AddrType {
        Pbyte = "PBYTE",
        Pword = "PWORD",
        Plong = "PLONG",
        Plonglong = "PLONGLONG",
        Direct = "DIRECT",
    }
}

a2l_enum! {
    /// Order of the values of maps and arrays in memory
    pub enum IndexMode {
        AlternateCurves = "ALTERNATE_CURVES",
        AlternateWithX = "ALTERNATE_WITH_X",
        AlternateWithY = "ALTERNATE_WITH_Y",
        ColumnDir = "COLUMN_DIR",
        RowDir = "ROW_DIR",
    }
}

a2l_enum! {
    pub enum Deposit {
        Absolute = "ABSOLUTE",
        Difference = "DIFFERENCE",
    }
}

a2l_enum! {
    /// Type of access that is possible for a CHARACTERISTIC or AXIS_PTS object
    pub enum CalibrationAccess {
        Calibration = "CALIBRATION",
        NoCalibration = "NO_CALIBRATION",
        NotInMcdSystem = "NOT_IN_MCD_SYSTEM",
        OfflineCalibration = "OFFLINE_CALIBRATION",
    }
}

a2l_enum! {
    pub enum Monotony {
        MonDecrease = "MON_DECREASE",
        MonIncrease = "MON_INCREASE",
        StrictDecrease = "STRICT_DECREASE",
        StrictIncrease = "STRICT_INCREASE",
        Monotonous = "MONOTONOUS",
        StrictMon = "STRICT_MON",
        NotMon = "NOT_MON",
    }
}

/// Version of the ASAM MCD-2MC standard (`ASAP2_VERSION`) or of the A2ML language (`A2ML_VERSION`)
#[derive(Debug, Default, Clone, PartialEq)]
pub struct VersionInfo {
    pub version_no: Option<u16>,
    pub upgrade_no: Option<u16>,
}

/// Contains all the objects of an a2l file
///
/// An instance of this struct is returned when an a2l file is loaded successfully
#[derive(Debug, Default, Clone, PartialEq)]
pub struct A2lFile {
    pub asap2_version: Option<VersionInfo>,
    pub a2ml_version: Option<VersionInfo>,
    pub project: Project,
}

/// The PROJECT keyword describes the project and contains the MODULEs
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Project {
    pub name: String,
    pub long_identifier: Option<String>,
    pub header: Option<Header>,
    pub module: Vec<crate::Module>,
    pub line: u32,
}

/// Header information for the project
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Header {
    pub comment: Option<String>,
    pub project_no: Option<String>,
    pub version: Option<String>,
}

/// An extended description text
///
/// One ANNOTATION may represent a voluminous description, e.g. an application note which
/// explains the function of an identifier for the calibration engineer.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Annotation {
    pub annotation_label: Option<String>,
    pub annotation_origin: Option<String>,
    pub annotation_text: Option<AnnotationText>,
}

/// Text of an annotation; one string per line
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AnnotationText {
    pub annotation_text_list: Vec<String>,
}

/// A list of references to other objects, e.g. `REF_CHARACTERISTIC` or `FUNCTION_LIST`
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NameList {
    pub names: Vec<String>,
}

/// Interface specific data
///
/// The content is defined by the A2ML description of the interface; it is kept as the text of
/// its tokens. Nested blocks are represented by "/begin TAG" and "/end TAG" entries.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IfData {
    pub name: String,
    pub content: Vec<String>,
    pub line: u32,
}

/// Contains AML code for the description of interface specific data
#[derive(Debug, Default, Clone, PartialEq)]
pub struct A2ml {
    pub text: Option<String>,
    pub line: u32,
}

/// Links a calibration object to a symbol in a linker map file
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SymbolLink {
    pub symbol_name: Option<String>,
    pub offset: Option<i32>,
}

/// Maximum refresh rate of a value in the ECU
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MaxRefresh {
    pub scaling_unit: Option<u16>,
    pub rate: Option<u32>,
}

/// Extended range of values that may be used with a warning
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExtendedLimits {
    pub lower_limit: Option<f64>,
    pub upper_limit: Option<f64>,
}

/// Dimensions of a multidimensional array of values
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MatrixDim {
    pub dimensions: Vec<u16>,
}

impl A2lBlock for A2lFile {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "A2L_FILE",
        form: BlockForm::File,
        positional: &[],
        sub_items: &[
            item!(keyword "ASAP2_VERSION" => asap2_version),
            item!(keyword "A2ML_VERSION" => a2ml_version),
            SubItem {
                tag: "PROJECT",
                is_block: true,
                // parsed in place, so that a partial project survives an error
                parse: |rec: &mut Self, parser, context| {
                    rec.project.line = context.line;
                    parser.parse_into(&mut rec.project, context)
                },
            },
        ],
    };
}

impl A2lBlock for VersionInfo {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "ASAP2_VERSION",
        form: BlockForm::Keyword,
        positional: &[
            slot!("VersionNo", version_no, lit_int),
            slot!("UpgradeNo", upgrade_no, lit_int),
        ],
        sub_items: &[],
    };
}

impl A2lBlock for Project {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "PROJECT",
        form: BlockForm::Block,
        positional: &[
            slot!(name "Name"),
            slot!("LongIdentifier", long_identifier, lit_string),
        ],
        sub_items: &[
            item!(block "HEADER" => header),
            SubItem {
                tag: "MODULE",
                is_block: true,
                parse: |rec: &mut Self, parser, context| {
                    let (module, result) = crate::assembler::parse_module(parser, context);
                    rec.module.push(module);
                    result
                },
            },
        ],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for Header {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "HEADER",
        form: BlockForm::Block,
        positional: &[slot!("Comment", comment, lit_string)],
        sub_items: &[
            item!(value "PROJECT_NO" => project_no, lit_ident),
            item!(value "VERSION" => version, lit_string),
        ],
    };
}

impl A2lBlock for Annotation {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "ANNOTATION",
        form: BlockForm::Block,
        positional: &[],
        sub_items: &[
            item!(value "ANNOTATION_LABEL" => annotation_label, lit_string),
            item!(value "ANNOTATION_ORIGIN" => annotation_origin, lit_string),
            item!(block "ANNOTATION_TEXT" => annotation_text),
        ],
    };
}

impl A2lBlock for AnnotationText {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "ANNOTATION_TEXT",
        form: BlockForm::Block,
        positional: &[slot!(repeated "AnnotationText", annotation_text_list, lit_string)],
        sub_items: &[],
    };
}

impl A2lBlock for NameList {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "REF_CHARACTERISTIC",
        form: BlockForm::Block,
        positional: &[slot!(repeated "Identifier", names, lit_ident)],
        sub_items: &[],
    };
}

impl A2lBlock for IfData {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "IF_DATA",
        form: BlockForm::Opaque,
        positional: &[
            slot!(name "Tag"),
            slot!(repeated "Content", content, lit_raw),
        ],
        sub_items: &[],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for A2ml {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "A2ML",
        form: BlockForm::Block,
        positional: &[slot!(optional "Text", text, lit_string)],
        sub_items: &[],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for SymbolLink {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "SYMBOL_LINK",
        form: BlockForm::Keyword,
        positional: &[
            slot!("SymbolName", symbol_name, lit_string),
            slot!("Offset", offset, lit_int),
        ],
        sub_items: &[],
    };
}

impl A2lBlock for MaxRefresh {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "MAX_REFRESH",
        form: BlockForm::Keyword,
        positional: &[
            slot!("ScalingUnit", scaling_unit, lit_int),
            slot!("Rate", rate, lit_int),
        ],
        sub_items: &[],
    };
}

impl A2lBlock for ExtendedLimits {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "EXTENDED_LIMITS",
        form: BlockForm::Keyword,
        positional: &[
            slot!("LowerLimit", lower_limit, lit_float),
            slot!("UpperLimit", upper_limit, lit_float),
        ],
        sub_items: &[],
    };
}

impl A2lBlock for MatrixDim {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "MATRIX_DIM",
        form: BlockForm::Keyword,
        positional: &[slot!(repeated "Dim", dimensions, lit_int)],
        sub_items: &[],
    };
}

named_record!(IfData);
