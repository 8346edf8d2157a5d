//! a2lcal reads a2l files and decodes calibration values from ECU memory images.
//!
//! Every record kind of the a2l format is described by a declarative grammar table which is
//! interpreted by one generic block parser. A MODULE can be parsed sequentially, or split into
//! shards which are parsed in parallel on a thread pool.
//!
//! The parsed RECORD_LAYOUTs can be resolved to byte offsets, which allows calibration values
//! to be read from a memory image and converted to physical values.

mod assembler;
mod calibration;
mod conversion;
mod itemlist;
mod layout;
mod loader;
mod module;
mod parser;
mod specification;
mod tokenizer;

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use parser::{BlockForm, ParserState};

// re-export for the crate user
pub use assembler::Module;
pub use calibration::{
    ByteSource, CalibrationData, CalibrationError, Endianness, MemoryImage, RawValue,
};
pub use itemlist::ItemMap;
pub use layout::{LayoutError, LayoutField, PositionedField, ResolvedField, ResolvedLayout};
pub use module::{ModuleCompuTab, ModuleObject};
pub use parser::{A2lBlock, A2lEnum, ParseContext, ParserError, PartialRecord};
pub use specification::*;
pub use tokenizer::TokenizerError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum A2lError {
    /// `FileOpenError`: An `IoError` that occurred while loading a file
    #[error("Failed to load {filename}: {ioerror}")]
    FileOpenError {
        filename: PathBuf,
        ioerror: std::io::Error,
    },

    /// `FileReadError`: An `IoError` that occurred while reading from a file
    #[error("Could not read from {filename}: {ioerror}")]
    FileReadError {
        filename: PathBuf,
        ioerror: std::io::Error,
    },

    /// `EmptyFileError`: No tokens found in the file
    #[error("File \"{filename}\" contains no a2l data")]
    EmptyFileError { filename: PathBuf },

    /// `TokenizerError`: Failed to tokenize the input
    #[error("Tokenizer error: {tokenizer_error}")]
    TokenizerError { tokenizer_error: TokenizerError },

    /// `ParserError`: Invalid data, the file could not be parsed
    #[error("Parser error: {parser_error}")]
    ParserError { parser_error: ParserError },

    /// `NameCollisionError`: two blocks use the same name; the later one replaced the earlier one
    #[error(
        "Name collision: {blockname} blocks on line {line_1} and {line_2} both use the name \"{item_name}\""
    )]
    NameCollisionError {
        item_name: String,
        blockname: String,
        line_1: u32,
        line_2: u32,
    },
}

/// Options for loading a2l data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// most warnings become errors
    pub strict: bool,
    /// number of shards per MODULE; 1 selects sequential parsing
    pub shards: usize,
    /// capacity of the channel of each item kind in sharded parsing
    pub channel_capacity: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            strict: false,
            shards: 1,
            channel_capacity: 256,
        }
    }
}

impl ParseOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// one shard per available cpu
    #[must_use]
    pub fn sharded_auto() -> Self {
        let shards = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
        Self::default().with_shards(shards)
    }

    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    #[must_use]
    pub fn with_shards(mut self, shards: usize) -> Self {
        self.shards = shards.max(1);
        self
    }

    #[must_use]
    pub fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity;
        self
    }
}

/// The result of loading a2l data without giving up on the first error
#[derive(Debug)]
pub struct PartialLoad {
    /// everything that was parsed successfully
    pub a2l_file: A2lFile,
    pub log_msgs: Vec<A2lError>,
    /// the first error, if any
    pub error: Option<A2lError>,
}

/**
Load an a2l file

The returned `Vec<A2lError>` contains all warnings generated during parsing.

# Example
```
# use a2lcal::{A2lError, ParseOptions};
match a2lcal::load("example.a2l", &ParseOptions::default()) {
    Ok((a2l_file, log_messages)) => {/* do something with it*/},
    Err(error_message) => println!("{error_message}")
}
```

# Errors
An `A2lError` provides details information if loading the file fails.
 */
pub fn load<P: AsRef<Path>>(
    path: P,
    options: &ParseOptions,
) -> Result<(A2lFile, Vec<A2lError>), A2lError> {
    let pathref = path.as_ref();
    let filedata = loader::load(pathref)?;
    load_impl(pathref, &filedata, options)
}

/**
load a2l data stored in a string

# Example
```rust
# use a2lcal::{A2lError, ParseOptions};
# fn main() -> Result<(), A2lError> {
let text = r#"
ASAP2_VERSION 1 71
/begin PROJECT new_project ""
  /begin MODULE new_module ""
  /end MODULE
/end PROJECT
"#;
let (a2l, _log_msgs) = a2lcal::load_from_string(&text, &ParseOptions::default())?;
assert_eq!(a2l.project.module[0].name, "new_module");
# Ok(())
# }
```

# Errors
An `A2lError` provides details information if loading the data fails.
 */
pub fn load_from_string(
    a2ldata: &str,
    options: &ParseOptions,
) -> Result<(A2lFile, Vec<A2lError>), A2lError> {
    load_impl(Path::new(""), a2ldata, options)
}

/// Load a2l data stored in a string, keeping everything that was parsed before an error.
///
/// When a sharded MODULE fails, the other shards still complete; their items are contained in
/// the returned `A2lFile`.
pub fn load_partial_from_string(a2ldata: &str, options: &ParseOptions) -> PartialLoad {
    load_partial_impl(Path::new(""), a2ldata, options)
}

fn load_impl(
    path: &Path,
    filedata: &str,
    options: &ParseOptions,
) -> Result<(A2lFile, Vec<A2lError>), A2lError> {
    let partial = load_partial_impl(path, filedata, options);
    match partial.error {
        Some(error) => Err(error),
        None => Ok((partial.a2l_file, partial.log_msgs)),
    }
}

fn load_partial_impl(path: &Path, filedata: &str, options: &ParseOptions) -> PartialLoad {
    let filename = path.display().to_string();
    debug!(
        file = %filename,
        strict = options.strict,
        shards = options.shards,
        "loading a2l data"
    );
    let mut a2l_file = A2lFile::default();
    let mut log_msgs = Vec::<A2lError>::new();

    let error = match tokenizer::tokenize(&filename, filedata) {
        Err(tokenizer_error) => Some(A2lError::TokenizerError { tokenizer_error }),
        Ok(stream) if stream.is_empty() => Some(A2lError::EmptyFileError {
            filename: path.to_path_buf(),
        }),
        Ok(stream) => {
            let mut parser = ParserState::new(&stream, 0, &mut log_msgs, options);
            parser
                .parse_file(&mut a2l_file)
                .err()
                .map(|parser_error| A2lError::ParserError { parser_error })
        }
    };

    debug!(
        file = %filename,
        modules = a2l_file.project.module.len(),
        warnings = log_msgs.len(),
        failed = error.is_some(),
        "finished loading a2l data"
    );
    PartialLoad {
        a2l_file,
        log_msgs,
        error,
    }
}

/// load an a2l fragment
///
/// An a2l fragment is just the bare content of a module, without the enclosing PROJECT and MODULE.
///
/// # Errors
///
/// If parsing fails, the `A2lError` will give details about the problem.
pub fn load_fragment(
    a2ldata: &str,
    options: &ParseOptions,
) -> Result<(Module, Vec<A2lError>), A2lError> {
    let fixed_a2ldata = format!(r#"fragment "" {a2ldata} /end MODULE"#);
    let stream = tokenizer::tokenize("(fragment)", &fixed_a2ldata)
        .map_err(|tokenizer_error| A2lError::TokenizerError { tokenizer_error })?;
    let context = ParseContext {
        element: "MODULE".to_string(),
        line: stream.token(0).line,
    };
    let mut log_msgs = Vec::<A2lError>::new();
    let (module, result) = {
        let mut parser = ParserState::new(&stream, 0, &mut log_msgs, options);
        assembler::parse_module(&mut parser, &context)
    };
    result.map_err(|parser_error| A2lError::ParserError { parser_error })?;
    Ok((module, log_msgs))
}

/// Parse the text of a single record, e.g. one `/begin CHARACTERISTIC ... /end CHARACTERISTIC`.
///
/// # Errors
///
/// On failure the record is returned together with the error; it contains everything that
/// was parsed before the error occurred.
pub fn parse_block<T: A2lBlock>(text: &str, options: &ParseOptions) -> Result<T, PartialRecord<T>> {
    let mut record = T::default();
    let stream = match tokenizer::tokenize("(block)", text) {
        Ok(stream) => stream,
        Err(tokenizer_error) => {
            return Err(PartialRecord {
                record,
                error: A2lError::TokenizerError { tokenizer_error },
            });
        }
    };
    let mut log_msgs = Vec::<A2lError>::new();
    let result = {
        let mut parser = ParserState::new(&stream, 0, &mut log_msgs, options);
        parse_single_block(&mut parser, &mut record)
    };
    match result {
        Ok(()) => Ok(record),
        Err(parser_error) => Err(PartialRecord {
            record,
            error: A2lError::ParserError { parser_error },
        }),
    }
}

fn parse_single_block<T: A2lBlock>(
    parser: &mut ParserState<'_>,
    record: &mut T,
) -> Result<(), ParserError> {
    let root = ParseContext {
        element: T::GRAMMAR.tag.to_string(),
        line: parser.current_token().line,
    };
    if T::GRAMMAR.form == BlockForm::File {
        return parser.parse_into(record, &root);
    }

    // the opening token may carry any tag that shares the grammar, e.g. the list blocks
    let first = parser.get_token(&root)?;
    let context = ParseContext::from_token(first.text, &first);
    record.set_line(first.line);
    parser.parse_into(record, &context)?;

    let trailing = parser.current_token();
    if trailing.kind != tokenizer::TokenKind::Empty {
        let token = parser.get_token(&context)?;
        return Err(if token.is_literal() {
            ParserError::unexpected_literal(parser, &context, &token)
        } else {
            ParserError::unexpected_keyword(parser, &context, &token)
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_empty_file() {
        let result = load_from_string("  /* only a comment */ ", &ParseOptions::default());
        assert!(matches!(result, Err(A2lError::EmptyFileError { .. })));
    }

    #[test]
    fn load_tokenizer_error() {
        let result = load_from_string(r#"ASAP2_VERSION 1 71 "unclosed"#, &ParseOptions::default());
        assert!(matches!(result, Err(A2lError::TokenizerError { .. })));
    }

    #[test]
    fn missing_version() {
        let text = r#"/begin PROJECT p "" /begin MODULE m "" /end MODULE /end PROJECT"#;
        let (a2l_file, log_msgs) = load_from_string(text, &ParseOptions::default()).unwrap();
        assert_eq!(a2l_file.project.name, "p");
        assert!(a2l_file.asap2_version.is_none());
        assert!(matches!(
            &log_msgs[0],
            A2lError::ParserError {
                parser_error: ParserError::MissingVersionInfo
            }
        ));

        let strict = ParseOptions::default().with_strict(true);
        assert!(load_from_string(text, &strict).is_err());
    }

    #[test]
    fn partial_load() {
        let text = r#"ASAP2_VERSION 1 71
        /begin PROJECT p ""
            /begin MODULE m ""
                /begin UNIT U1 "" "x" DERIVED /end UNIT
                /begin UNIT U2 "" "y" DERIVED
            /end MODULE
        /end PROJECT"#;
        let partial = load_partial_from_string(text, &ParseOptions::default());
        assert!(matches!(
            partial.error,
            Some(A2lError::ParserError {
                parser_error: ParserError::UnexpectedKeyword { .. }
            })
        ));
        let module = &partial.a2l_file.project.module[0];
        assert!(module.unit.contains_key("U1"));
        assert!(!module.unit.contains_key("U2"));
        assert_eq!(partial.a2l_file.asap2_version.unwrap().version_no, Some(1));
    }

    #[test]
    fn fragment() {
        let text = r#"
            /begin MOD_COMMON "" BYTE_ORDER MSB_FIRST /end MOD_COMMON
            /begin UNIT U1 "" "x" DERIVED /end UNIT
        "#;
        for options in [ParseOptions::default(), ParseOptions::default().with_shards(2)] {
            let (module, log_msgs) = load_fragment(text, &options).unwrap();
            assert!(log_msgs.is_empty());
            assert_eq!(module.name, "fragment");
            assert_eq!(module.unit["U1"].line, 3);
            assert_eq!(
                module.mod_common.as_ref().unwrap().byte_order,
                Some(ByteOrderEnum::MsbFirst)
            );
        }
    }

    #[test]
    fn single_block() {
        let options = ParseOptions::default();
        let unit = parse_block::<Unit>(r#"/begin UNIT U1 "" "x" DERIVED /end UNIT"#, &options);
        assert_eq!(unit.unwrap().name, "U1");

        let trailing = parse_block::<Unit>(
            r#"/begin UNIT U1 "" "x" DERIVED /end UNIT extra"#,
            &options,
        );
        assert!(matches!(
            trailing,
            Err(PartialRecord {
                error: A2lError::ParserError {
                    parser_error: ParserError::UnexpectedLiteral { .. }
                },
                ..
            })
        ));

        let list = parse_block::<NameList>("/begin SUB_GROUP G1 G2 /end SUB_GROUP", &options);
        assert_eq!(list.unwrap().names, vec!["G1", "G2"]);

        let empty = parse_block::<Unit>("", &options).unwrap_err();
        assert!(matches!(
            empty.error,
            A2lError::ParserError {
                parser_error: ParserError::UnexpectedEndOfInput { .. }
            }
        ));
    }

    #[test]
    fn options() {
        let options = ParseOptions::new()
            .with_strict(true)
            .with_shards(0)
            .with_channel_capacity(8);
        assert!(options.strict);
        assert_eq!(options.shards, 1);
        assert_eq!(options.channel_capacity, 8);
        assert!(ParseOptions::sharded_auto().shards >= 1);
    }
}
