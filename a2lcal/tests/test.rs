#[cfg(test)]
mod test {
    use a2lcal::*;
    use tempfile::tempdir;

    const ENGINE_A2L: &str = r#"ASAP2_VERSION 1 71
/begin PROJECT demo "demo project"
  /begin HEADER "header" VERSION "1.0" PROJECT_NO P42 /end HEADER
  /begin MODULE engine "engine ecu"
    /begin MOD_COMMON "" BYTE_ORDER MSB_LAST ALIGNMENT_BYTE 1 /end MOD_COMMON
    /begin RECORD_LAYOUT RL_UWORD FNC_VALUES 1 UWORD ROW_DIR DIRECT /end RECORD_LAYOUT
    /begin RECORD_LAYOUT RL_HDR_SBYTE
      IDENTIFICATION 1 ULONG
      FNC_VALUES 2 SBYTE ROW_DIR DIRECT
    /end RECORD_LAYOUT
    /begin RECORD_LAYOUT RL_FLOAT FNC_VALUES 1 FLOAT32_IEEE ROW_DIR DIRECT /end RECORD_LAYOUT
    /begin COMPU_METHOD CM_LIN "" LINEAR "%6.2" "rpm" COEFFS_LINEAR 0.25 100 /end COMPU_METHOD
    /begin COMPU_METHOD CM_RAT "" RAT_FUNC "%6.2" "degC" COEFFS 0 1 40 0 0 1 /end COMPU_METHOD
    /begin COMPU_METHOD CM_VERB "" TAB_VERB "%6.2" "" COMPU_TAB_REF VT_ONOFF /end COMPU_METHOD
    /begin COMPU_VTAB VT_ONOFF "" TAB_VERB 2 0 "off" 1 "on" /end COMPU_VTAB
    /begin CHARACTERISTIC IDLE_SPEED "idle speed" VALUE 0x1000 RL_UWORD 0 CM_LIN 0 10000
      FORMAT "%6.1"
    /end CHARACTERISTIC
    /begin CHARACTERISTIC TEMP_OFFSET "" VALUE 0x1010 RL_HDR_SBYTE 0 CM_RAT -50 50 /end CHARACTERISTIC
    /begin CHARACTERISTIC GAIN "" VALUE 0x2000 RL_FLOAT 0 NO_COMPU_METHOD 0 10
      BYTE_ORDER MSB_FIRST
    /end CHARACTERISTIC
    /begin CHARACTERISTIC SWITCH "" VALUE 0x1000 RL_UWORD 0 CM_VERB 0 1 /end CHARACTERISTIC
    /begin CHARACTERISTIC MAP1 "" MAP 0x3000 RL_UWORD 0 NO_COMPU_METHOD 0 10 /end CHARACTERISTIC
    /begin CHARACTERISTIC NO_LAYOUT "" VALUE 0x1000 MISSING_RL 0 NO_COMPU_METHOD 0 1 /end CHARACTERISTIC
    /begin CHARACTERISTIC UNMAPPED "" VALUE 0x5000 RL_UWORD 0 NO_COMPU_METHOD 0 1 /end CHARACTERISTIC
    /begin MEASUREMENT ENGINE_SPEED "" UWORD CM_LIN 1 100 0 8000 ECU_ADDRESS 0x20001000 /end MEASUREMENT
    /begin BLOB FLASH_ID "" 0x4000 16 /end BLOB
    /begin UNIT U_RPM "" "rpm" DERIVED /end UNIT
    /begin FUNCTION IDLE "" /begin DEF_CHARACTERISTIC IDLE_SPEED /end DEF_CHARACTERISTIC /end FUNCTION
    /begin GROUP G_ENGINE "" ROOT /begin REF_CHARACTERISTIC IDLE_SPEED GAIN /end REF_CHARACTERISTIC /end GROUP
    /begin IF_DATA XCP /begin DAQ STATIC 0x10 /end DAQ /end IF_DATA
  /end MODULE
/end PROJECT
"#;

    fn engine_memory() -> MemoryImage {
        let mut image = MemoryImage::new();
        image.add_segment(0x1000, vec![0x10, 0x27]);
        image.add_segment(0x1010, vec![0x01, 0x02, 0x03, 0x04, 0xEC]);
        image.add_segment(0x2000, 2.5f32.to_be_bytes().to_vec());
        image.add_segment(0x3000, vec![0; 32]);
        image
    }

    #[test]
    fn load_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("engine.a2l");
        std::fs::write(&path, ENGINE_A2L).unwrap();

        let (a2l_file, log_msgs) = load(&path, &ParseOptions::default()).unwrap();
        assert!(log_msgs.is_empty());
        assert_eq!(a2l_file.asap2_version.as_ref().unwrap().upgrade_no, Some(71));
        assert_eq!(a2l_file.project.name, "demo");
        let header = a2l_file.project.header.as_ref().unwrap();
        assert_eq!(header.project_no.as_deref(), Some("P42"));

        let module = &a2l_file.project.module[0];
        assert_eq!(module.name, "engine");
        assert_eq!(module.characteristic.len(), 7);
        assert_eq!(module.record_layout.len(), 3);
        assert_eq!(module.compu_method.len(), 3);
        assert!(module.group["G_ENGINE"].root);
        assert_eq!(module.if_data["XCP"].line, 32);
        assert_eq!(module.characteristic["IDLE_SPEED"].line, 16);

        let missing = load(dir.path().join("missing.a2l"), &ParseOptions::default());
        assert!(matches!(missing, Err(A2lError::FileOpenError { .. })));
    }

    #[test]
    fn load_utf16_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("utf16.a2l");
        let mut data = vec![0xFF, 0xFE];
        for unit in ENGINE_A2L.encode_utf16() {
            data.extend_from_slice(&unit.to_le_bytes());
        }
        std::fs::write(&path, data).unwrap();

        let (a2l_file, _) = load(&path, &ParseOptions::default()).unwrap();
        assert_eq!(a2l_file.project.module[0].characteristic.len(), 7);
    }

    #[test]
    fn sequential_and_sharded_key_sets() {
        fn keys<T: A2lObjectName>(map: &ItemMap<T>) -> Vec<String> {
            let mut keys: Vec<String> = map.keys().cloned().collect();
            keys.sort();
            keys
        }

        let (sequential, _) = load_from_string(ENGINE_A2L, &ParseOptions::default()).unwrap();
        for shards in [2, 4, 16] {
            let options = ParseOptions::default()
                .with_shards(shards)
                .with_channel_capacity(1);
            let (sharded, log_msgs) = load_from_string(ENGINE_A2L, &options).unwrap();
            assert!(log_msgs.is_empty());
            let seq = &sequential.project.module[0];
            let par = &sharded.project.module[0];
            assert_eq!(keys(&seq.characteristic), keys(&par.characteristic));
            assert_eq!(keys(&seq.record_layout), keys(&par.record_layout));
            assert_eq!(keys(&seq.compu_method), keys(&par.compu_method));
            assert_eq!(keys(&seq.compu_vtab), keys(&par.compu_vtab));
            assert_eq!(keys(&seq.measurement), keys(&par.measurement));
            assert_eq!(keys(&seq.blob), keys(&par.blob));
            assert_eq!(keys(&seq.unit), keys(&par.unit));
            assert_eq!(keys(&seq.function), keys(&par.function));
            assert_eq!(keys(&seq.group), keys(&par.group));
            assert_eq!(keys(&seq.if_data), keys(&par.if_data));
            assert_eq!(seq.mod_common, par.mod_common);
            assert_eq!(sharded.project.header, sequential.project.header);
        }
    }

    #[test]
    fn characteristic_positional_attributes() {
        let text = r#"/begin CHARACTERISTIC C1 "descr" VALUE 0x1000 LAYOUT1 0.0 CONV -10.0 10.0
        /end CHARACTERISTIC"#;
        let c1 = parse_block::<Characteristic>(text, &ParseOptions::default()).unwrap();
        assert_eq!(c1.name, "C1");
        assert_eq!(c1.long_identifier.as_deref(), Some("descr"));
        assert_eq!(c1.characteristic_type, Some(CharacteristicType::Value));
        assert_eq!(c1.address.as_deref(), Some("0x1000"));
        assert_eq!(c1.deposit.as_deref(), Some("LAYOUT1"));
        assert_eq!(c1.max_diff, Some(0.0));
        assert_eq!(c1.conversion.as_deref(), Some("CONV"));
        assert_eq!(c1.lower_limit, Some(-10.0));
        assert_eq!(c1.upper_limit, Some(10.0));

        // the positional values in declaration order give back the literals of the input
        let literals = [
            c1.name.clone(),
            format!("\"{}\"", c1.long_identifier.as_deref().unwrap()),
            c1.characteristic_type.unwrap().as_a2l().to_string(),
            c1.address.clone().unwrap(),
            c1.deposit.clone().unwrap(),
            format!("{:.1}", c1.max_diff.unwrap()),
            c1.conversion.clone().unwrap(),
            format!("{:.1}", c1.lower_limit.unwrap()),
            format!("{:.1}", c1.upper_limit.unwrap()),
        ];
        assert_eq!(
            literals.join(" "),
            r#"C1 "descr" VALUE 0x1000 LAYOUT1 0.0 CONV -10.0 10.0"#
        );
    }

    #[test]
    fn missing_end_is_an_error() {
        let text = r#"/begin CHARACTERISTIC C1 "descr" VALUE 0x1000 LAYOUT1 0.0 CONV -10.0 10.0"#;
        let partial = parse_block::<Characteristic>(text, &ParseOptions::default()).unwrap_err();
        assert!(matches!(
            partial.error,
            A2lError::ParserError {
                parser_error: ParserError::UnexpectedEndOfInput { .. }
            }
        ));
        assert_eq!(partial.record.upper_limit, Some(10.0));

        let file = ENGINE_A2L.replace("/end GROUP", "");
        let result = load_from_string(&file, &ParseOptions::default());
        assert!(matches!(
            result,
            Err(A2lError::ParserError {
                parser_error: ParserError::UnexpectedKeyword { .. }
            })
        ));
        let truncated = &ENGINE_A2L[..ENGINE_A2L.find("/end MODULE").unwrap()];
        let result = load_from_string(truncated, &ParseOptions::default());
        assert!(matches!(
            result,
            Err(A2lError::ParserError {
                parser_error: ParserError::UnexpectedEndOfInput { .. }
            })
        ));
    }

    #[test]
    fn offsets_follow_positions() {
        let text = r#"/begin RECORD_LAYOUT RL
            OFFSET_X 1 UBYTE
            OFFSET_Y 2 UWORD
        /end RECORD_LAYOUT"#;
        let layout = parse_block::<RecordLayout>(text, &ParseOptions::default()).unwrap();
        let resolved = layout.resolve_absolute_positions().unwrap();
        assert_eq!(resolved.get(LayoutField::OffsetX).unwrap().offset, 0);
        assert_eq!(resolved.get(LayoutField::OffsetY).unwrap().offset, 1);
    }

    #[test]
    fn shared_position_is_rejected() {
        let text = r#"/begin RECORD_LAYOUT RL
            OFFSET_X 1 UBYTE
            OFFSET_Y 2 UWORD
            OFFSET_Z 1 ULONG
        /end RECORD_LAYOUT"#;
        let layout = parse_block::<RecordLayout>(text, &ParseOptions::default()).unwrap();
        for err in [
            layout.resolve_relative_positions().unwrap_err(),
            layout.resolve_absolute_positions().unwrap_err(),
        ] {
            let LayoutError::DuplicatePosition {
                layout,
                position,
                first,
                second,
            } = err;
            assert_eq!(layout, "RL");
            assert_eq!(position, 1);
            assert_eq!(first, LayoutField::OffsetX);
            assert_eq!(second, LayoutField::OffsetZ);
        }
    }

    #[test]
    fn absolute_positions_are_monotonic() {
        let text = r#"/begin RECORD_LAYOUT BIG
            FNC_VALUES 9 FLOAT64_IEEE COLUMN_DIR DIRECT
            AXIS_PTS_X 3 SWORD INDEX_INCR DIRECT
            AXIS_PTS_Y 7 FLOAT32_IEEE INDEX_INCR DIRECT
            NO_AXIS_PTS_X 2 UBYTE
            NO_AXIS_PTS_Y 6 UWORD
            SRC_ADDR_X 1 ULONG
            SRC_ADDR_Y 5 A_UINT64
            RESERVED 4 LONG
            IDENTIFICATION 8 SBYTE
            OFFSET_X 10 UBYTE
        /end RECORD_LAYOUT"#;
        let layout = parse_block::<RecordLayout>(text, &ParseOptions::default()).unwrap();
        let resolved = layout.resolve_absolute_positions().unwrap();
        assert_eq!(resolved.fields.len(), 10);
        for pair in resolved.fields.windows(2) {
            assert!(pair[0].position < pair[1].position);
            assert!(pair[0].offset + pair[0].width <= pair[1].offset);
        }
        assert_eq!(resolved.get(LayoutField::FncValues).unwrap().offset, 4 + 1 + 2 + 4 + 8 + 2 + 4 + 1);
        assert_eq!(resolved.size(), 35);
    }

    #[test]
    fn missing_datatype_leaves_cursor() {
        let text = "/begin RECORD_LAYOUT RL SHIFT_OP_X 1 UWORD /end RECORD_LAYOUT";
        let layout = parse_block::<RecordLayout>(text, &ParseOptions::default()).unwrap();
        let memory = [0x34u8, 0x12, 0, 0];
        let mut data = CalibrationData::new(&memory[..], &layout, Endianness::Little, 0);
        let err = data.dist_op_x().unwrap_err();
        assert!(matches!(
            err,
            CalibrationError::MissingDatatype {
                field: LayoutField::DistOpX,
                ..
            }
        ));
        assert_eq!(data.cursor(), 0);
        assert_eq!(data.shift_op_x().unwrap(), 0x1234);
        assert_eq!(data.cursor(), 2);
    }

    #[test]
    fn read_characteristics() {
        let (a2l_file, _) = load_from_string(ENGINE_A2L, &ParseOptions::default()).unwrap();
        let module = &a2l_file.project.module[0];
        let memory = engine_memory();

        assert_eq!(
            module.read_characteristic_raw("IDLE_SPEED", &memory).unwrap(),
            RawValue::Int(10000)
        );
        assert_eq!(
            module.read_characteristic_physical("IDLE_SPEED", &memory).unwrap(),
            2600.0
        );
        // the identification is skipped, the value is a signed byte
        assert_eq!(
            module.read_characteristic_raw("TEMP_OFFSET", &memory).unwrap(),
            RawValue::Int(-20)
        );
        assert_eq!(
            module.read_characteristic_physical("TEMP_OFFSET", &memory).unwrap(),
            -60.0
        );
        // big endian float from the characteristic's own byte order
        assert_eq!(
            module.read_characteristic_physical("GAIN", &memory).unwrap(),
            2.5
        );
    }

    #[test]
    fn read_characteristic_errors() {
        let (a2l_file, _) = load_from_string(ENGINE_A2L, &ParseOptions::default()).unwrap();
        let module = &a2l_file.project.module[0];
        let memory = engine_memory();

        assert!(matches!(
            module.read_characteristic_raw("NOT_THERE", &memory),
            Err(CalibrationError::UnknownCharacteristic { .. })
        ));
        assert!(matches!(
            module.read_characteristic_raw("MAP1", &memory),
            Err(CalibrationError::UnsupportedCharacteristicType {
                char_type: CharacteristicType::Map,
                ..
            })
        ));
        assert!(matches!(
            module.read_characteristic_raw("NO_LAYOUT", &memory),
            Err(CalibrationError::UnknownRecordLayout { .. })
        ));
        assert!(matches!(
            module.read_characteristic_raw("UNMAPPED", &memory),
            Err(CalibrationError::AddressNotMapped { address: 0x5000, len: 2 })
        ));
        assert!(matches!(
            module.read_characteristic_physical("SWITCH", &memory),
            Err(CalibrationError::UnsupportedConversion { .. })
        ));
    }

    #[test]
    fn byte_order_defaults() {
        let text = r#"
            /begin RECORD_LAYOUT RL FNC_VALUES 1 UWORD ROW_DIR DIRECT /end RECORD_LAYOUT
            /begin CHARACTERISTIC C "" VALUE 0 RL 0 NO_COMPU_METHOD 0 1 /end CHARACTERISTIC
        "#;
        let memory = [0x12u8, 0x34];
        let (module, _) = load_fragment(text, &ParseOptions::default()).unwrap();
        assert_eq!(
            module.read_characteristic_raw("C", &memory[..]).unwrap(),
            RawValue::Int(0x3412)
        );

        let with_mod_common = format!(
            "{text} /begin MOD_COMMON \"\" BYTE_ORDER MSB_FIRST /end MOD_COMMON"
        );
        let (module, _) = load_fragment(&with_mod_common, &ParseOptions::default()).unwrap();
        assert_eq!(
            module.read_characteristic_raw("C", &memory[..]).unwrap(),
            RawValue::Int(0x1234)
        );
    }

    #[test]
    fn duplicate_names_are_warnings() {
        let file = ENGINE_A2L.replace(
            "/begin UNIT U_RPM",
            "/begin UNIT U_RPM \"\" \"old\" DERIVED /end UNIT\n    /begin UNIT U_RPM",
        );
        for options in [
            ParseOptions::default(),
            ParseOptions::default().with_shards(3),
        ] {
            let (a2l_file, log_msgs) = load_from_string(&file, &options).unwrap();
            assert_eq!(a2l_file.project.module[0].unit.len(), 1);
            assert_eq!(log_msgs.len(), 1);
            assert!(log_msgs[0].to_string().contains("U_RPM"));
        }
    }
}
