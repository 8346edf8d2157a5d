//! Parsing of MODULE blocks
//!
//! A module is parsed either sequentially by the generic block parser, or in shards: the token
//! range of the module body is split at top-level block boundaries and every shard is parsed by
//! a task on a rayon thread pool. Parsed items are sent over one bounded channel per item kind;
//! each channel is drained by a single collector thread which owns the map for its kind.

use std::ops::Range;
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::thread::{Scope, ScopedJoinHandle};

use tracing::{debug, trace, warn};

use crate::itemlist::ItemMap;
use crate::parser::{
    A2lBlock, BlockForm, Grammar, ParseContext, ParserError, ParserState, SubItem, lit_string,
    slot,
};
use crate::specification::{
    A2lObjectName, A2ml, AxisPts, Blob, Characteristic, CompuMethod, CompuTab, CompuVtab,
    CompuVtabRange, Frame, Function, Group, IfData, Instance, Measurement, ModCommon, ModPar,
    RecordLayout, Transformer, TypedefAxis, TypedefBlob, TypedefCharacteristic, TypedefMeasurement,
    TypedefStructure, Unit, UserRights, VariantCoding,
};
use crate::tokenizer::{TokenKind, TokenStream};
use crate::{A2lError, ParseOptions};

macro_rules! module_items {
    (
        named { $($ntag:literal => $nfield:ident : $ntype:ident),+ $(,)? }
        single { $($stag:literal => $sfield:ident : $stype:ident),+ $(,)? }
    ) => {
        /// The content of a MODULE block
        ///
        /// Named items are kept in one map per kind; the names are unique within each kind.
        #[derive(Debug, Default, Clone, PartialEq)]
        pub struct Module {
            pub name: String,
            pub long_identifier: Option<String>,
            $(pub $nfield: ItemMap<$ntype>,)+
            $(pub $sfield: Option<$stype>,)+
            pub line: u32,
        }

        /// a single top-level item of a module
        #[derive(Debug)]
        pub(crate) enum ModuleItem {
            $($ntype($ntype),)+
            $($stype($stype),)+
        }

        impl ModuleItem {
            /// parse the item whose `/begin` has just been consumed.
            /// Returns None if the tag does not belong to a module item.
            pub(crate) fn parse(
                parser: &mut ParserState<'_>,
                context: &ParseContext,
            ) -> Option<Result<Self, ParserError>> {
                let result = match context.element.as_str() {
                    $($ntag => parser.parse_nested::<$ntype>(context).map(Self::$ntype),)+
                    $($stag => parser.parse_nested::<$stype>(context).map(Self::$stype),)+
                    _ => return None,
                };
                Some(result)
            }
        }

        const MODULE_SUB_ITEMS: &[SubItem<Module>] = &[
            $(SubItem {
                tag: $ntag,
                is_block: true,
                parse: parse_module_item,
            },)+
            $(SubItem {
                tag: $stag,
                is_block: true,
                parse: parse_module_item,
            },)+
        ];

        impl Module {
            /// store a parsed item. Returns a warning if it replaced an item with the same name
            pub(crate) fn store_item(&mut self, item: ModuleItem) -> Option<A2lError> {
                match item {
                    $(ModuleItem::$ntype(item) => insert_named(&mut self.$nfield, item, $ntag),)+
                    $(ModuleItem::$stype(item) => {
                        self.$sfield = Some(item);
                        None
                    })+
                }
            }
        }

        #[derive(Clone)]
        struct ItemSenders {
            $($nfield: SyncSender<$ntype>,)+
            $($sfield: SyncSender<$stype>,)+
        }

        struct ItemReceivers {
            $($nfield: Receiver<$ntype>,)+
            $($sfield: Receiver<$stype>,)+
        }

        struct Collectors<'scope> {
            $($nfield: ScopedJoinHandle<'scope, (ItemMap<$ntype>, Vec<A2lError>)>,)+
            $($sfield: ScopedJoinHandle<'scope, Option<$stype>>,)+
        }

        fn item_channels(capacity: usize) -> (ItemSenders, ItemReceivers) {
            $(let $nfield = sync_channel(capacity);)+
            $(let $sfield = sync_channel(capacity);)+
            (
                ItemSenders {
                    $($nfield: $nfield.0,)+
                    $($sfield: $sfield.0,)+
                },
                ItemReceivers {
                    $($nfield: $nfield.1,)+
                    $($sfield: $sfield.1,)+
                },
            )
        }

        impl ItemSenders {
            /// send an item to the collector of its kind. Fails if the collector is gone.
            fn send(&self, item: ModuleItem) -> bool {
                match item {
                    $(ModuleItem::$ntype(item) => self.$nfield.send(item).is_ok(),)+
                    $(ModuleItem::$stype(item) => self.$sfield.send(item).is_ok(),)+
                }
            }
        }

        impl ItemReceivers {
            fn spawn_collectors<'scope>(
                self,
                scope: &'scope Scope<'scope, '_>,
            ) -> Collectors<'scope> {
                let ItemReceivers {
                    $($nfield,)+
                    $($sfield,)+
                } = self;
                Collectors {
                    $($nfield: scope.spawn(move || collect_named($nfield, $ntag)),)+
                    // singletons: the last one wins
                    $($sfield: scope.spawn(move || $sfield.into_iter().last()),)+
                }
            }
        }

        impl Collectors<'_> {
            fn join_into(self, module: &mut Module, warnings: &mut Vec<A2lError>) {
                $(
                    let (items, mut collisions) = join_collector(self.$nfield);
                    module.$nfield = items;
                    warnings.append(&mut collisions);
                )+
                $(
                    if let Some(item) = join_collector(self.$sfield) {
                        module.$sfield = Some(item);
                    }
                )+
            }
        }
    };
}

module_items! {
    named {
        "AXIS_PTS" => axis_pts: AxisPts,
        "BLOB" => blob: Blob,
        "CHARACTERISTIC" => characteristic: Characteristic,
        "COMPU_METHOD" => compu_method: CompuMethod,
        "COMPU_TAB" => compu_tab: CompuTab,
        "COMPU_VTAB" => compu_vtab: CompuVtab,
        "COMPU_VTAB_RANGE" => compu_vtab_range: CompuVtabRange,
        "FUNCTION" => function: Function,
        "GROUP" => group: Group,
        "IF_DATA" => if_data: IfData,
        "INSTANCE" => instance: Instance,
        "MEASUREMENT" => measurement: Measurement,
        "RECORD_LAYOUT" => record_layout: RecordLayout,
        "TRANSFORMER" => transformer: Transformer,
        "TYPEDEF_AXIS" => typedef_axis: TypedefAxis,
        "TYPEDEF_BLOB" => typedef_blob: TypedefBlob,
        "TYPEDEF_CHARACTERISTIC" => typedef_characteristic: TypedefCharacteristic,
        "TYPEDEF_MEASUREMENT" => typedef_measurement: TypedefMeasurement,
        "TYPEDEF_STRUCTURE" => typedef_structure: TypedefStructure,
        "UNIT" => unit: Unit,
        "USER_RIGHTS" => user_rights: UserRights,
    }
    single {
        "A2ML" => a2ml: A2ml,
        "FRAME" => frame: Frame,
        "MOD_COMMON" => mod_common: ModCommon,
        "MOD_PAR" => mod_par: ModPar,
        "VARIANT_CODING" => variant_coding: VariantCoding,
    }
}

impl A2lBlock for Module {
    const GRAMMAR: Grammar<Self> = Grammar {
        tag: "MODULE",
        form: BlockForm::Block,
        positional: &[
            slot!(name "Name"),
            slot!("LongIdentifier", long_identifier, lit_string),
        ],
        sub_items: MODULE_SUB_ITEMS,
    };

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }
}

// the entry of every module item in the sequential grammar
fn parse_module_item(
    module: &mut Module,
    parser: &mut ParserState<'_>,
    context: &ParseContext,
) -> Result<(), ParserError> {
    if let Some(item) = ModuleItem::parse(parser, context) {
        if let Some(warning) = module.store_item(item?) {
            parser.log_msgs.push(warning);
        }
    }
    Ok(())
}

/// insert an item into its map. A duplicate name replaces the earlier item and is reported
fn insert_named<T: A2lObjectName>(
    map: &mut ItemMap<T>,
    item: T,
    blockname: &str,
) -> Option<A2lError> {
    let line_2 = item.get_line();
    let replaced = map.insert(item)?;
    let item_name = replaced.get_name().to_string();
    let line_1 = replaced.get_line();
    warn!(
        blockname,
        name = %item_name,
        line_1,
        line_2,
        "duplicate name; the later definition replaces the earlier one"
    );
    Some(A2lError::NameCollisionError {
        item_name,
        blockname: blockname.to_string(),
        line_1,
        line_2,
    })
}

fn collect_named<T: A2lObjectName>(
    receiver: Receiver<T>,
    blockname: &str,
) -> (ItemMap<T>, Vec<A2lError>) {
    let mut items = ItemMap::new();
    let mut collisions = Vec::new();
    for item in receiver {
        if let Some(warning) = insert_named(&mut items, item, blockname) {
            collisions.push(warning);
        }
    }
    (items, collisions)
}

fn join_collector<T>(handle: ScopedJoinHandle<'_, T>) -> T {
    match handle.join() {
        Ok(value) => value,
        Err(payload) => std::panic::resume_unwind(payload),
    }
}

/// Parse a MODULE block whose `/begin MODULE` has already been consumed.
///
/// The module is always returned, together with the result of parsing it. After an error
/// it contains everything that was parsed successfully.
pub(crate) fn parse_module(
    parser: &mut ParserState<'_>,
    context: &ParseContext,
) -> (Module, Result<(), ParserError>) {
    let mut module = Module::default();
    module.set_line(context.line);
    let shards = parser.options().shards;
    let result = if shards <= 1 {
        parser.parse_into(&mut module, context)
    } else {
        parse_module_sharded(parser, &mut module, context, shards)
    };
    (module, result)
}

/// the token range of a module body
#[derive(Debug, PartialEq)]
struct ModuleBody {
    start: usize,
    /// index of the `/end MODULE` token
    end: usize,
    /// indices of the `/begin` tokens of the top-level blocks
    block_starts: Vec<usize>,
}

struct ShardReport {
    shard: usize,
    result: Result<(), ParserError>,
    warnings: Vec<A2lError>,
}

fn parse_module_sharded(
    parser: &mut ParserState<'_>,
    module: &mut Module,
    context: &ParseContext,
    shards: usize,
) -> Result<(), ParserError> {
    // name and long identifier are parsed here, the shards only see the body
    let positional = Module::GRAMMAR.positional;
    while parser.current_token().is_literal() && module.long_identifier.is_none() {
        let token = parser.get_token(context)?;
        parser.assign_literal(module, positional, context, &token)?;
    }

    let stream = parser.stream();
    let options = parser.options();
    let Some(body) = scan_module_body(stream, parser.pos()) else {
        return Err(ParserError::no_terminator(parser, context));
    };
    let ranges = plan_shards(&body, shards);
    debug!(
        module = %module.name,
        shards = ranges.len(),
        tokens = body.end - body.start,
        "parsing module in shards"
    );

    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(shards)
        .thread_name(|idx| format!("a2l-shard-{idx}"))
        .build()
    {
        Ok(pool) => pool,
        Err(error) => {
            warn!(%error, "failed to start the shard pool, parsing the module sequentially");
            parser.set_pos(body.start);
            return parser.parse_into(module, context);
        }
    };

    let (senders, receivers) = item_channels(options.channel_capacity);
    let (report_tx, report_rx) = sync_channel::<ShardReport>(ranges.len());
    let mut collisions = Vec::new();
    std::thread::scope(|scope| {
        let collectors = receivers.spawn_collectors(scope);
        pool.scope(|pool_scope| {
            for (shard, range) in ranges.iter().cloned().enumerate() {
                let senders = senders.clone();
                let report_tx = report_tx.clone();
                pool_scope.spawn(move |_| {
                    trace!(shard, start = range.start, end = range.end, "parsing shard");
                    let (result, warnings) = parse_shard(stream, range, options, context, &senders);
                    // the report channel has room for every shard
                    let _ = report_tx.send(ShardReport {
                        shard,
                        result,
                        warnings,
                    });
                });
            }
        });
        // all shards are done: closing the channels ends the collectors
        drop(senders);
        collectors.join_into(module, &mut collisions);
    });
    drop(report_tx);

    let mut reports: Vec<ShardReport> = report_rx.into_iter().collect();
    reports.sort_by_key(|report| report.shard);
    let mut first_error = None;
    for report in reports {
        parser.log_msgs.extend(report.warnings);
        if let Err(parser_error) = report.result {
            if first_error.is_none() {
                first_error = Some(parser_error);
            } else {
                parser.log_msgs.push(A2lError::ParserError { parser_error });
            }
        }
    }
    parser.log_msgs.extend(collisions);

    parser.set_pos(body.end + 1);
    parser.last_token_position = stream.token(body.end).line;
    match first_error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

// find the /end MODULE and the top-level blocks before it.
// The /begin of a module item always starts a new top-level block, so a block whose /end is
// missing can not hide the end of the module. IF_DATA also occurs inside of most items, so it
// only starts a top-level block at depth 0.
fn scan_module_body(stream: &TokenStream<'_>, start: usize) -> Option<ModuleBody> {
    let mut depth = 0usize;
    let mut block_starts = Vec::new();
    for idx in start..stream.len() {
        let token = stream.token(idx);
        match token.kind {
            TokenKind::Begin => {
                if depth == 0 || (token.text != "IF_DATA" && is_module_item(token.text)) {
                    block_starts.push(idx);
                    depth = 0;
                }
                depth += 1;
            }
            TokenKind::End if token.text == "MODULE" => {
                return Some(ModuleBody {
                    start,
                    end: idx,
                    block_starts,
                });
            }
            TokenKind::End if depth == 0 => return None,
            TokenKind::End => depth -= 1,
            _ => {}
        }
    }
    None
}

fn is_module_item(tag: &str) -> bool {
    MODULE_SUB_ITEMS.iter().any(|item| item.tag == tag)
}

// split the body into contiguous shards of roughly equal size. Every shard boundary is moved
// forward to the next top-level block start, so that no block is split between shards
fn plan_shards(body: &ModuleBody, shards: usize) -> Vec<Range<usize>> {
    let shard_size = ((body.end - body.start) / shards).max(1);
    let mut bounds = Vec::with_capacity(shards + 1);
    bounds.push(body.start);
    for idx in 1..shards {
        let target = body.start + idx * shard_size;
        let pos = body.block_starts.partition_point(|&start| start < target);
        bounds.push(body.block_starts.get(pos).copied().unwrap_or(body.end));
    }
    bounds.push(body.end);
    bounds
        .windows(2)
        .filter(|bound| bound[0] < bound[1])
        .map(|bound| bound[0]..bound[1])
        .collect()
}

fn parse_shard(
    stream: &TokenStream<'_>,
    range: Range<usize>,
    options: &ParseOptions,
    context: &ParseContext,
    senders: &ItemSenders,
) -> (Result<(), ParserError>, Vec<A2lError>) {
    let mut warnings = Vec::new();
    let result = {
        let mut parser = ParserState::new(stream, range.start, &mut warnings, options);
        parse_items(&mut parser, range.end, context, |_, item| senders.send(item))
    };
    (result, warnings)
}

// parse every top-level block that starts before `max` and pass the items to `store`.
// Stops early if `store` returns false
fn parse_items(
    parser: &mut ParserState<'_>,
    max: usize,
    context: &ParseContext,
    mut store: impl FnMut(&mut ParserState<'_>, ModuleItem) -> bool,
) -> Result<(), ParserError> {
    while parser.pos() < max {
        let token = parser.get_token(context)?;
        match token.kind {
            TokenKind::Begin => {
                let item_context = ParseContext::from_token(token.text, &token);
                match ModuleItem::parse(parser, &item_context) {
                    Some(item) => {
                        if !store(parser, item?) {
                            break;
                        }
                    }
                    None => parser.handle_unknown_block(context, &token)?,
                }
            }
            TokenKind::End | TokenKind::Keyword => {
                return Err(ParserError::unexpected_keyword(parser, context, &token));
            }
            _ => {
                let err = ParserError::unexpected_literal(parser, context, &token);
                parser.error_or_log(err)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;
    use crate::{A2lError, ParseOptions, load_from_string, load_partial_from_string};

    fn module_text(count: usize) -> String {
        let mut text = String::from(
            "ASAP2_VERSION 1 71\n/begin PROJECT p \"\"\n/begin MODULE m \"module\"\n",
        );
        text.push_str("/begin MOD_COMMON \"\" BYTE_ORDER MSB_LAST /end MOD_COMMON\n");
        for idx in 0..count {
            text.push_str(&format!(
                "/begin CHARACTERISTIC C{idx} \"\" VALUE 0x{:x} RL_{} 0 NO_COMPU_METHOD 0 255\n\
                 /begin IF_DATA XCP /begin SEGMENT {idx} /end SEGMENT /end IF_DATA\n\
                 /end CHARACTERISTIC\n",
                0x1000 + idx,
                idx % 3
            ));
            text.push_str(&format!(
                "/begin MEASUREMENT M{idx} \"\" UBYTE NO_COMPU_METHOD 0 0 0 255 /end MEASUREMENT\n"
            ));
            if idx % 5 == 0 {
                text.push_str(&format!(
                    "/begin RECORD_LAYOUT RL_{idx} FNC_VALUES 1 UBYTE ROW_DIR DIRECT /end RECORD_LAYOUT\n"
                ));
            }
        }
        text.push_str("/end MODULE\n/end PROJECT\n");
        text
    }

    fn sorted_keys<T: A2lObjectName>(map: &ItemMap<T>) -> Vec<String> {
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        keys
    }

    #[test]
    fn sequential_and_sharded_agree() {
        let text = module_text(200);
        let (sequential, log_seq) = load_from_string(&text, &ParseOptions::default()).unwrap();
        for shards in [2, 3, 8] {
            let options = ParseOptions::default().with_shards(shards);
            let (sharded, log_par) = load_from_string(&text, &options).unwrap();
            let seq_module = &sequential.project.module[0];
            let par_module = &sharded.project.module[0];
            assert_eq!(par_module.name, "m");
            assert_eq!(par_module.long_identifier.as_deref(), Some("module"));
            assert_eq!(
                sorted_keys(&seq_module.characteristic),
                sorted_keys(&par_module.characteristic)
            );
            assert_eq!(
                sorted_keys(&seq_module.measurement),
                sorted_keys(&par_module.measurement)
            );
            assert_eq!(
                sorted_keys(&seq_module.record_layout),
                sorted_keys(&par_module.record_layout)
            );
            assert_eq!(seq_module.mod_common, par_module.mod_common);
            assert_eq!(par_module.characteristic.len(), 200);
            assert_eq!(
                par_module.characteristic["C17"],
                seq_module.characteristic["C17"]
            );
            assert_eq!(log_seq.len(), log_par.len());
        }
    }

    #[test]
    fn parsing_continues_after_the_module() {
        let text = r#"ASAP2_VERSION 1 71
        /begin PROJECT p ""
            /begin MODULE m1 "" /begin UNIT U1 "" "x" DERIVED /end UNIT /end MODULE
            /begin MODULE m2 "" /begin UNIT U2 "" "y" DERIVED /end UNIT /end MODULE
        /end PROJECT"#;
        let options = ParseOptions::default().with_shards(4);
        let (a2l_file, _) = load_from_string(text, &options).unwrap();
        assert_eq!(a2l_file.project.module.len(), 2);
        assert!(a2l_file.project.module[0].unit.contains_key("U1"));
        assert!(a2l_file.project.module[1].unit.contains_key("U2"));
    }

    #[test]
    fn duplicate_names_are_reported() {
        let text = r#"ASAP2_VERSION 1 71
        /begin PROJECT p ""
            /begin MODULE m ""
                /begin UNIT U1 "" "first" DERIVED /end UNIT
                /begin UNIT U1 "" "second" DERIVED /end UNIT
            /end MODULE
        /end PROJECT"#;
        for shards in [1, 2] {
            let options = ParseOptions::default().with_shards(shards);
            let (a2l_file, log_msgs) = load_from_string(text, &options).unwrap();
            let module = &a2l_file.project.module[0];
            assert_eq!(module.unit.len(), 1);
            assert_eq!(log_msgs.len(), 1);
            assert!(matches!(
                &log_msgs[0],
                A2lError::NameCollisionError { item_name, blockname, .. }
                    if item_name == "U1" && blockname == "UNIT"
            ));
        }
        // the sequential parser keeps the later definition
        let (a2l_file, _) = load_from_string(text, &ParseOptions::default()).unwrap();
        let unit = &a2l_file.project.module[0].unit["U1"];
        assert_eq!(unit.display.as_deref(), Some("second"));
        assert_eq!(unit.line, 5);
    }

    #[test]
    fn sharded_missing_module_end() {
        let text = r#"ASAP2_VERSION 1 71
        /begin PROJECT p ""
            /begin MODULE m ""
                /begin UNIT U1 "" "x" DERIVED /end UNIT
        /end PROJECT"#;
        let options = ParseOptions::default().with_shards(2);
        let partial = load_partial_from_string(text, &options);
        assert!(matches!(
            partial.error,
            Some(A2lError::ParserError {
                parser_error: ParserError::NoTerminator { .. }
            })
        ));
        assert_eq!(partial.a2l_file.project.module.len(), 1);
        assert_eq!(partial.a2l_file.project.module[0].name, "m");
    }

    #[test]
    fn shard_error_keeps_other_items() {
        let mut text = module_text(40);
        // a broken measurement near the end of the module
        text = text.replace(
            "/begin MEASUREMENT M39 \"\" UBYTE",
            "/begin MEASUREMENT M39 \"\" NOT_A_TYPE",
        );
        let options = ParseOptions::default().with_shards(4);
        let partial = load_partial_from_string(&text, &options);
        assert!(matches!(
            partial.error,
            Some(A2lError::ParserError {
                parser_error: ParserError::MalformedLiteral { .. }
            })
        ));
        let module = &partial.a2l_file.project.module[0];
        assert!(module.characteristic.contains_key("C0"));
        assert!(module.measurement.contains_key("M0"));
        assert!(!module.measurement.contains_key("M39"));
    }

    #[test]
    fn unknown_blocks_in_shards() {
        let text = r#"ASAP2_VERSION 1 71
        /begin PROJECT p ""
            /begin MODULE m ""
                /begin VENDOR_BLOCK 1 2 /begin INNER /end INNER /end VENDOR_BLOCK
                /begin UNIT U1 "" "x" DERIVED /end UNIT
            /end MODULE
        /end PROJECT"#;
        let options = ParseOptions::default().with_shards(2);
        let (a2l_file, log_msgs) = load_from_string(text, &options).unwrap();
        assert!(a2l_file.project.module[0].unit.contains_key("U1"));
        assert!(matches!(
            &log_msgs[0],
            A2lError::ParserError {
                parser_error: ParserError::UnknownSubBlock { .. }
            }
        ));

        let strict = options.with_strict(true);
        assert!(load_from_string(text, &strict).is_err());
    }

    #[test]
    fn shard_plan_snaps_to_blocks() {
        let body = ModuleBody {
            start: 10,
            end: 110,
            block_starts: vec![10, 30, 55, 80, 100],
        };
        assert_eq!(plan_shards(&body, 4), vec![10..55, 55..80, 80..100, 100..110]);
        assert_eq!(
            plan_shards(&body, 8),
            vec![10..30, 30..55, 55..80, 80..100, 100..110]
        );
        assert_eq!(plan_shards(&body, 1), vec![10..110]);

        let empty = ModuleBody {
            start: 5,
            end: 5,
            block_starts: vec![],
        };
        assert!(plan_shards(&empty, 4).is_empty());
    }

    #[test]
    fn module_body_scan() {
        let stream = tokenize(
            "test",
            "m \"\" /begin UNIT u \"\" \"\" DERIVED /end UNIT /begin A /begin B /end B /end A /end MODULE",
        )
        .unwrap();
        let body = scan_module_body(&stream, 2).unwrap();
        assert_eq!(body.block_starts, vec![2, 8]);
        assert_eq!(body.end, stream.len() - 1);

        let stream = tokenize("test", "/begin UNIT u /end UNIT /end PROJECT").unwrap();
        assert!(scan_module_body(&stream, 0).is_none());
    }

    #[test]
    fn module_body_scan_unterminated_block() {
        // the first UNIT has no /end; the next UNIT still starts a top-level block
        let stream = tokenize(
            "test",
            "/begin UNIT a \"\" \"\" DERIVED /begin UNIT b \"\" \"\" DERIVED /end UNIT \
             /begin CHARACTERISTIC c /begin IF_DATA XCP /end IF_DATA /end CHARACTERISTIC \
             /end MODULE /end PROJECT",
        )
        .unwrap();
        let body = scan_module_body(&stream, 0).unwrap();
        assert_eq!(body.block_starts, vec![0, 5, 11]);
        assert_eq!(body.end, stream.len() - 2);
    }

    fn unterminated_unit_text() -> String {
        let mut text = String::from("ASAP2_VERSION 1 71\n/begin PROJECT p \"\"\n/begin MODULE m \"\"\n");
        for idx in 0..4 {
            text.push_str(&format!("/begin UNIT U{idx} \"\" \"x\" DERIVED /end UNIT\n"));
        }
        text.push_str("/begin UNIT BROKEN \"\" \"q\" DERIVED\n/end MODULE\n/end PROJECT\n");
        text
    }

    #[test]
    fn unterminated_block_in_module() {
        let text = unterminated_unit_text();
        for shards in [1, 2, 3] {
            let options = ParseOptions::default().with_shards(shards);
            let partial = load_partial_from_string(&text, &options);
            assert!(matches!(
                partial.error,
                Some(A2lError::ParserError {
                    parser_error: ParserError::UnexpectedKeyword { ref keyword, .. }
                }) if keyword == "/end MODULE"
            ));
            let module = &partial.a2l_file.project.module[0];
            assert_eq!(module.unit.len(), 4);
            assert!(!module.unit.contains_key("BROKEN"));
        }
    }

    #[test]
    fn unterminated_block_in_one_shard() {
        let mut text = module_text(40);
        // M10 is missing its /end; the following blocks are swallowed as unknown sub-blocks
        // until /end MODULE is reached
        text = text.replace(
            "/begin MEASUREMENT M10 \"\" UBYTE NO_COMPU_METHOD 0 0 0 255 /end MEASUREMENT",
            "/begin MEASUREMENT M10 \"\" UBYTE NO_COMPU_METHOD 0 0 0 255",
        );
        let options = ParseOptions::default().with_shards(4);
        let partial = load_partial_from_string(&text, &options);
        let Some(A2lError::ParserError { parser_error }) = &partial.error else {
            panic!("expected a parser error, got {:?}", partial.error);
        };
        assert!(!matches!(parser_error, ParserError::NoTerminator { .. }));
        assert!(matches!(parser_error, ParserError::UnexpectedKeyword { .. }));

        let module = &partial.a2l_file.project.module[0];
        assert_eq!(module.name, "m");
        assert!(module.mod_common.is_some());
        assert!(module.characteristic.contains_key("C0"));
        assert!(module.measurement.contains_key("M9"));
        assert!(!module.measurement.contains_key("M10"));
        // the items after the broken block belong to the other shards
        assert!(module.characteristic.contains_key("C39"));
        assert!(module.measurement.contains_key("M39"));
    }
}
