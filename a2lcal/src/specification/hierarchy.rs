use super::{Annotation, IfData, NameList, named_record};
use crate::parser::{A2lBlock, BlockForm, Grammar, item, lit_string, slot};

/// Describes a function of the ECU software and the objects it uses
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub long_identifier: Option<String>,
    pub annotation: Vec<Annotation>,
    pub def_characteristic: Option<NameList>,
    pub function_version: Option<String>,
    pub if_data: Vec<IfData>,
    pub in_measurement: Option<NameList>,
    pub loc_measurement: Option<NameList>,
    pub out_measurement: Option<NameList>,
    pub ref_characteristic: Option<NameList>,
    pub sub_function: Option<NameList>,
    pub line: u32,
}

/// Groups characteristics and measurements, e.g. for display in a calibration tool
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Group {
    pub name: String,
    pub long_identifier: Option<String>,
    pub annotation: Vec<Annotation>,
    pub function_list: Option<NameList>,
    pub if_data: Vec<IfData>,
    pub ref_characteristic: Option<NameList>,
    pub ref_measurement: Option<NameList>,
    pub root: bool,
    pub sub_group: Option<NameList>,
    pub line: u32,
}

/// Access rights of a user level to groups of objects
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UserRights {
    /// the user level id; USER_RIGHTS blocks are keyed by it
    pub name: String,
    pub read_only: bool,
    pub ref_group: Vec<NameList>,
    pub line: u32,
}

impl UserRights {
    /// all groups referenced by this set of user rights
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.ref_group
            .iter()
            .flat_map(|list| list.names.iter().map(String::as_str))
    }
}

impl A2lBlock for Function {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "FUNCTION",
        form: BlockForm::Block,
        positional: &[
            slot!(name "Name"),
            slot!("LongIdentifier", long_identifier, lit_string),
        ],
        sub_items: &[
            item!(block "ANNOTATION" => push annotation),
            item!(block "DEF_CHARACTERISTIC" => def_characteristic),
            item!(value "FUNCTION_VERSION" => function_version, lit_string),
            item!(block "IF_DATA" => push if_data),
            item!(block "IN_MEASUREMENT" => in_measurement),
            item!(block "LOC_MEASUREMENT" => loc_measurement),
            item!(block "OUT_MEASUREMENT" => out_measurement),
            item!(block "REF_CHARACTERISTIC" => ref_characteristic),
            item!(block "SUB_FUNCTION" => sub_function),
        ],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for Group {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "GROUP",
        form: BlockForm::Block,
        positional: &[
            slot!(name "GroupName"),
            slot!("GroupLongIdentifier", long_identifier, lit_string),
        ],
        sub_items: &[
            item!(block "ANNOTATION" => push annotation),
            item!(block "FUNCTION_LIST" => function_list),
            item!(block "IF_DATA" => push if_data),
            item!(block "REF_CHARACTERISTIC" => ref_characteristic),
            item!(block "REF_MEASUREMENT" => ref_measurement),
            item!(flag "ROOT" => root),
            item!(block "SUB_GROUP" => sub_group),
        ],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

impl A2lBlock for UserRights {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "USER_RIGHTS",
        form: BlockForm::Block,
        positional: &[slot!(name "UserLevelId")],
        sub_items: &[
            item!(flag "READ_ONLY" => read_only),
            item!(block "REF_GROUP" => push ref_group),
        ],
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

named_record!(Function, Group, UserRights);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{A2lObjectName, ParseOptions, parse_block};

    #[test]
    fn function() {
        let text = r#"/begin FUNCTION ID_ADJUSTM "function group idling speed"
            FUNCTION_VERSION "BG5.0815"
            /begin DEF_CHARACTERISTIC INJECTION_CURVE DELAY_FACTOR /end DEF_CHARACTERISTIC
            /begin REF_CHARACTERISTIC FACTOR_1 /end REF_CHARACTERISTIC
            /begin IN_MEASUREMENT WHEEL_REVOLUTIONS ENGINE_SPEED /end IN_MEASUREMENT
            /begin SUB_FUNCTION ID_ADJUSTM_SUB /end SUB_FUNCTION
        /end FUNCTION"#;
        let function = parse_block::<Function>(text, &ParseOptions::default()).unwrap();
        assert_eq!(function.get_name(), "ID_ADJUSTM");
        assert_eq!(function.function_version.as_deref(), Some("BG5.0815"));
        assert_eq!(
            function.def_characteristic.unwrap().names,
            vec!["INJECTION_CURVE", "DELAY_FACTOR"]
        );
        assert_eq!(function.in_measurement.unwrap().names.len(), 2);
        assert_eq!(function.sub_function.unwrap().names, vec!["ID_ADJUSTM_SUB"]);
    }

    #[test]
    fn group_and_user_rights() {
        let options = ParseOptions::default();
        let text = r#"/begin GROUP SOFTWARE_COMPONENTS "assignment of the definitions"
            ROOT
            /begin SUB_GROUP INJE C6TD /end SUB_GROUP
        /end GROUP"#;
        let group = parse_block::<Group>(text, &options).unwrap();
        assert!(group.root);
        assert_eq!(group.sub_group.unwrap().names, vec!["INJE", "C6TD"]);

        let text = r#"/begin USER_RIGHTS calibration_engineers
            /begin REF_GROUP group_1 /end REF_GROUP
            /begin REF_GROUP group_2 group_3 /end REF_GROUP
            READ_ONLY
        /end USER_RIGHTS"#;
        let user_rights = parse_block::<UserRights>(text, &options).unwrap();
        assert_eq!(user_rights.get_name(), "calibration_engineers");
        assert!(user_rights.read_only);
        let groups: Vec<&str> = user_rights.groups().collect();
        assert_eq!(groups, vec!["group_1", "group_2", "group_3"]);
    }
}
