use super::{a2l_enum, named_record};
use crate::parser::{
    A2lBlock, BadLiteral, BlockForm, Grammar, Slot, SlotKind, item, lit_enum, lit_float,
    lit_ident, lit_int, lit_string, slot,
};
use crate::tokenizer::{Token, TokenKind};

a2l_enum! {
    /// The kind of a conversion between raw and physical values
    pub enum ConversionType {
        Identical = "IDENTICAL",
        Form = "FORM",
        Linear = "LINEAR",
        RatFunc = "RAT_FUNC",
        TabIntp = "TAB_INTP",
        TabNointp = "TAB_NOINTP",
        TabVerb = "TAB_VERB",
    }
}

a2l_enum! {
    pub enum UnitType {
        Derived = "DERIVED",
        ExtendedSi = "EXTENDED_SI",
    }
}

/// Specifies the conversion from raw ECU values to physical values
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CompuMethod {
    pub name: String,
    pub long_identifier: Option<String>,
    pub conversion_type: Option<ConversionType>,
    pub format: Option<String>,
    pub unit: Option<String>,
    pub coeffs: Option<Coeffs>,
    pub coeffs_linear: Option<CoeffsLinear>,
    pub compu_tab_ref: Option<String>,
    pub formula: Option<Formula>,
    pub ref_unit: Option<String>,
    pub status_string_ref: Option<String>,
    pub line: u32,
}

/// Conversion table with numeric output values
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CompuTab {
    pub name: String,
    pub long_identifier: Option<String>,
    pub conversion_type: Option<ConversionType>,
    pub number_value_pairs: Option<u16>,
    /// alternating input and output values
    pub values: Vec<f64>,
    pub default_value: Option<String>,
    pub default_value_numeric: Option<f64>,
    pub line: u32,
}

/// Conversion table for verbal output values
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CompuVtab {
    pub name: String,
    pub long_identifier: Option<String>,
    pub conversion_type: Option<ConversionType>,
    pub number_value_pairs: Option<u16>,
    pub in_values: Vec<f64>,
    pub out_values: Vec<String>,
    pub default_value: Option<String>,
    pub line: u32,
}

/// Conversion table that maps ranges of input values to verbal output values
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CompuVtabRange {
    pub name: String,
    pub long_identifier: Option<String>,
    pub number_value_triples: Option<u16>,
    /// alternating lower and upper bounds
    pub bounds: Vec<f64>,
    pub out_values: Vec<String>,
    pub default_value: Option<String>,
    pub line: u32,
}

/// Coefficients of the rational function `f(x) = (axx + bx + c) / (dxx + ex + f)`
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Coeffs {
    pub a: Option<f64>,
    pub b: Option<f64>,
    pub c: Option<f64>,
    pub d: Option<f64>,
    pub e: Option<f64>,
    pub f: Option<f64>,
}

/// Coefficients of the linear function `f(x) = ax + b`
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CoeffsLinear {
    pub a: Option<f64>,
    pub b: Option<f64>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Formula {
    pub fx: Option<String>,
    pub formula_inv: Option<String>,
}

/// Definition of a measurement unit
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Unit {
    pub name: String,
    pub long_identifier: Option<String>,
    pub display: Option<String>,
    pub unit_type: Option<UnitType>,
    pub ref_unit: Option<String>,
    pub si_exponents: Option<SiExponents>,
    pub unit_conversion: Option<UnitConversion>,
    pub line: u32,
}

/// Exponents of the seven SI base units
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SiExponents {
    pub length: Option<i16>,
    pub mass: Option<i16>,
    pub time: Option<i16>,
    pub electric_current: Option<i16>,
    pub temperature: Option<i16>,
    pub amount_of_substance: Option<i16>,
    pub luminous_intensity: Option<i16>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct UnitConversion {
    pub gradient: Option<f64>,
    pub offset: Option<f64>,
}

impl CompuTab {
    /// the (input, output) pairs of the table
    pub fn entries(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.values.chunks_exact(2).map(|pair| (pair[0], pair[1]))
    }
}

impl CompuVtab {
    /// the (input, text) pairs of the table
    pub fn entries(&self) -> impl Iterator<Item = (f64, &str)> {
        self.in_values
            .iter()
            .copied()
            .zip(self.out_values.iter().map(String::as_str))
    }

    /// look up the text for a raw value, falling back to the default value
    pub fn lookup(&self, raw: f64) -> Option<&str> {
        self.entries()
            .find(|(inval, _)| *inval == raw)
            .map(|(_, text)| text)
            .or(self.default_value.as_deref())
    }
}

impl CompuVtabRange {
    /// the (lower, upper, text) triples of the table
    pub fn entries(&self) -> impl Iterator<Item = (f64, f64, &str)> {
        self.bounds
            .chunks_exact(2)
            .zip(self.out_values.iter())
            .map(|(bounds, text)| (bounds[0], bounds[1], text.as_str()))
    }

    /// look up the text for a raw value; the ranges include both bounds
    pub fn lookup(&self, raw: f64) -> Option<&str> {
        self.entries()
            .find(|(lower, upper, _)| *lower <= raw && raw <= *upper)
            .map(|(_, _, text)| text)
            .or(self.default_value.as_deref())
    }
}

impl A2lBlock for CompuMethod {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "COMPU_METHOD",
        form: BlockForm::Block,
        positional: &[
            slot!(name "Name"),
            slot!("LongIdentifier", long_identifier, lit_string),
            slot!("ConversionType", conversion_type, lit_enum),
            slot!("Format", format, lit_string),
            slot!("Unit", unit, lit_string),
        ],
        sub_items: &[
            item!(keyword "COEFFS" => coeffs),
            item!(keyword "COEFFS_LINEAR" => coeffs_linear),
            item!(value "COMPU_TAB_REF" => compu_tab_ref, lit_ident),
            item!(block "FORMULA" => formula),
            item!(value "REF_UNIT" => ref_unit, lit_ident),
            item!(value "STATUS_STRING_REF" => status_string_ref, lit_ident),
        ],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for CompuTab {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "COMPU_TAB",
        form: BlockForm::Block,
        positional: &[
            slot!(name "Name"),
            slot!("LongIdentifier", long_identifier, lit_string),
            slot!("ConversionType", conversion_type, lit_enum),
            slot!("NumberValuePairs", number_value_pairs, lit_int),
            slot!(repeated "TabEntry", values, lit_float),
        ],
        sub_items: &[
            item!(value "DEFAULT_VALUE" => default_value, lit_string),
            item!(value "DEFAULT_VALUE_NUMERIC" => default_value_numeric, lit_float),
        ],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for CompuVtab {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "COMPU_VTAB",
        form: BlockForm::Block,
        positional: &[
            slot!(name "Name"),
            slot!("LongIdentifier", long_identifier, lit_string),
            slot!("ConversionType", conversion_type, lit_enum),
            slot!("NumberValuePairs", number_value_pairs, lit_int),
            // numbers are the table inputs, everything else is an output text
            Slot {
                name: "ValuePairs",
                kind: SlotKind::Repeated,
                is_set: |_: &Self| false,
                assign: |rec: &mut Self, token: &Token<'_>| -> Result<(), BadLiteral> {
                    if token.kind == TokenKind::Number {
                        rec.in_values.push(lit_float(token)?);
                    } else {
                        rec.out_values.push(lit_string(token)?);
                    }
                    Ok(())
                },
            },
        ],
        sub_items: &[item!(value "DEFAULT_VALUE" => default_value, lit_string)],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for CompuVtabRange {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "COMPU_VTAB_RANGE",
        form: BlockForm::Block,
        positional: &[
            slot!(name "Name"),
            slot!("LongIdentifier", long_identifier, lit_string),
            slot!("NumberValueTriples", number_value_triples, lit_int),
            Slot {
                name: "ValueTriples",
                kind: SlotKind::Repeated,
                is_set: |_: &Self| false,
                assign: |rec: &mut Self, token: &Token<'_>| -> Result<(), BadLiteral> {
                    if token.kind == TokenKind::Number {
                        rec.bounds.push(lit_float(token)?);
                    } else {
                        rec.out_values.push(lit_string(token)?);
                    }
                    Ok(())
                },
            },
        ],
        sub_items: &[item!(value "DEFAULT_VALUE" => default_value, lit_string)],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for Coeffs {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "COEFFS",
        form: BlockForm::Keyword,
        positional: &[
            slot!("A", a, lit_float),
            slot!("B", b, lit_float),
            slot!("C", c, lit_float),
            slot!("D", d, lit_float),
            slot!("E", e, lit_float),
            slot!("F", f, lit_float),
        ],
        sub_items: &[],
    };
}

impl A2lBlock for CoeffsLinear {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "COEFFS_LINEAR",
        form: BlockForm::Keyword,
        positional: &[slot!("A", a, lit_float), slot!("B", b, lit_float)],
        sub_items: &[],
    };
}

impl A2lBlock for Formula {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "FORMULA",
        form: BlockForm::Block,
        positional: &[slot!("Fx", fx, lit_string)],
        sub_items: &[item!(value "FORMULA_INV" => formula_inv, lit_string)],
    };
}

impl A2lBlock for Unit {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "UNIT",
        form: BlockForm::Block,
        positional: &[
            slot!(name "Name"),
            slot!("LongIdentifier", long_identifier, lit_string),
            slot!("Display", display, lit_string),
            slot!("Type", unit_type, lit_enum),
        ],
        sub_items: &[
            item!(value "REF_UNIT" => ref_unit, lit_ident),
            item!(keyword "SI_EXPONENTS" => si_exponents),
            item!(keyword "UNIT_CONVERSION" => unit_conversion),
        ],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for SiExponents {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "SI_EXPONENTS",
        form: BlockForm::Keyword,
        positional: &[
            slot!("Length", length, lit_int),
            slot!("Mass", mass, lit_int),
            slot!("Time", time, lit_int),
            slot!("ElectricCurrent", electric_current, lit_int),
            slot!("Temperature", temperature, lit_int),
            slot!("AmountOfSubstance", amount_of_substance, lit_int),
            slot!("LuminousIntensity", luminous_intensity, lit_int),
        ],
        sub_items: &[],
    };
}

impl A2lBlock for UnitConversion {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "UNIT_CONVERSION",
        form: BlockForm::Keyword,
        positional: &[
            slot!("Gradient", gradient, lit_float),
            slot!("Offset", offset, lit_float),
        ],
        sub_items: &[],
    };
}

named_record!(CompuMethod, CompuTab, CompuVtab, CompuVtabRange, Unit);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ParseOptions, parse_block};

    #[test]
    fn compu_method_linear() {
        let text = r#"/begin COMPU_METHOD CM_LIN "" LINEAR "%4.2" "km/h"
            COEFFS_LINEAR 0.5 -10
            REF_UNIT KMH
        /end COMPU_METHOD"#;
        let cm = parse_block::<CompuMethod>(text, &ParseOptions::default()).unwrap();
        assert_eq!(cm.conversion_type, Some(ConversionType::Linear));
        assert_eq!(cm.format.as_deref(), Some("%4.2"));
        assert_eq!(cm.unit.as_deref(), Some("km/h"));
        let coeffs = cm.coeffs_linear.unwrap();
        assert_eq!(coeffs.a, Some(0.5));
        assert_eq!(coeffs.b, Some(-10.0));
        assert_eq!(cm.ref_unit.as_deref(), Some("KMH"));
    }

    #[test]
    fn compu_method_formula() {
        let text = r#"/begin COMPU_METHOD CM_F "" FORM "%4.2" ""
            /begin FORMULA "X1 * 2" FORMULA_INV "X1 / 2" /end FORMULA
        /end COMPU_METHOD"#;
        let cm = parse_block::<CompuMethod>(text, &ParseOptions::default()).unwrap();
        let formula = cm.formula.unwrap();
        assert_eq!(formula.fx.as_deref(), Some("X1 * 2"));
        assert_eq!(formula.formula_inv.as_deref(), Some("X1 / 2"));
    }

    #[test]
    fn compu_tab() {
        let text = r#"/begin COMPU_TAB TAB1 "" TAB_INTP 2
            0 0.0
            100 50.5
            DEFAULT_VALUE_NUMERIC -1
        /end COMPU_TAB"#;
        let tab = parse_block::<CompuTab>(text, &ParseOptions::default()).unwrap();
        assert_eq!(tab.number_value_pairs, Some(2));
        let entries: Vec<(f64, f64)> = tab.entries().collect();
        assert_eq!(entries, vec![(0.0, 0.0), (100.0, 50.5)]);
        assert_eq!(tab.default_value_numeric, Some(-1.0));
    }

    #[test]
    fn compu_vtab() {
        let text = r#"/begin COMPU_VTAB VT_ONOFF "" TAB_VERB 2
            0 "OFF"
            1 "ON"
            DEFAULT_VALUE "INVALID"
        /end COMPU_VTAB"#;
        let vtab = parse_block::<CompuVtab>(text, &ParseOptions::default()).unwrap();
        assert_eq!(vtab.in_values, vec![0.0, 1.0]);
        assert_eq!(vtab.out_values, vec!["OFF", "ON"]);
        assert_eq!(vtab.lookup(1.0), Some("ON"));
        assert_eq!(vtab.lookup(7.0), Some("INVALID"));
    }

    #[test]
    fn compu_vtab_range() {
        let text = r#"/begin COMPU_VTAB_RANGE VTR "" 2
            0 9 "LOW"
            10 20 "HIGH"
        /end COMPU_VTAB_RANGE"#;
        let vtab = parse_block::<CompuVtabRange>(text, &ParseOptions::default()).unwrap();
        let entries: Vec<(f64, f64, &str)> = vtab.entries().collect();
        assert_eq!(entries, vec![(0.0, 9.0, "LOW"), (10.0, 20.0, "HIGH")]);
        assert_eq!(vtab.lookup(10.0), Some("HIGH"));
        assert_eq!(vtab.lookup(-1.0), None);
    }

    #[test]
    fn unit() {
        let text = r#"/begin UNIT KMH "kilometres per hour" "km/h" DERIVED
            REF_UNIT MPS
            UNIT_CONVERSION 3.6 0
            SI_EXPONENTS 1 0 -1 0 0 0 0
        /end UNIT"#;
        let unit = parse_block::<Unit>(text, &ParseOptions::default()).unwrap();
        assert_eq!(unit.display.as_deref(), Some("km/h"));
        assert_eq!(unit.unit_type, Some(UnitType::Derived));
        assert_eq!(unit.unit_conversion.unwrap().gradient, Some(3.6));
        assert_eq!(unit.si_exponents.unwrap().time, Some(-1));
    }
}
