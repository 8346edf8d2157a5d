use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TokenizerError {
    #[error("{filename}:{line}: Input text \"{tokentext}...\" was not recognized as an a2l token")]
    InvalidA2lToken {
        filename: String,
        line: u32,
        tokentext: String,
    },

    #[error("{filename}:{line}: Invalid numerical constant \"{tokentext}\"")]
    InvalidNumericalConstant {
        filename: String,
        line: u32,
        tokentext: String,
    },

    #[error("{filename}:{line}: Block comment was not closed before the end of input was reached")]
    UnclosedComment { filename: String, line: u32 },

    #[error("{filename}:{line}: String was not closed before the end of input was reached")]
    UnclosedString { filename: String, line: u32 },

    #[error("{filename}:{line}: There is no whitespace separating the input tokens")]
    MissingWhitespace { filename: String, line: u32 },

    #[error("{filename}:{line}: /{directive} is not followed by a block tag")]
    MissingBlockTag {
        filename: String,
        line: u32,
        directive: &'static str,
    },
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum A2lTokenType {
    Identifier,
    Keyword,
    Begin,
    End,
    String,
    Number,
    Text,
}

/// A token as stored in the `TokenStream`.
///
/// For `Begin` and `End` the byte range covers the block tag, so that `/begin CHARACTERISTIC` is a single token.
#[derive(Debug, Clone)]
pub(crate) struct A2lToken {
    pub(crate) ttype: A2lTokenType,
    pub(crate) startpos: usize,
    pub(crate) endpos: usize,
    pub(crate) line: u32,
}

/// The classification of a token as seen through a `TokenCursor`
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum TokenKind {
    Begin,
    End,
    Keyword,
    Identifier,
    String,
    Number,
    Text,
    /// returned for every read past the end of the input
    Empty,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) struct Token<'a> {
    pub(crate) kind: TokenKind,
    pub(crate) text: &'a str,
    pub(crate) line: u32,
}

/// An immutable, index-addressable token sequence over the text of one file.
///
/// Any number of `TokenCursor`s can read the same stream concurrently.
#[derive(Debug)]
pub(crate) struct TokenStream<'a> {
    tokens: Vec<A2lToken>,
    text: &'a str,
    filename: String,
}

#[derive(Debug, Clone)]
pub(crate) struct TokenCursor<'a> {
    stream: &'a TokenStream<'a>,
    pos: usize,
}

impl Token<'_> {
    pub(crate) fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Identifier | TokenKind::String | TokenKind::Number | TokenKind::Text
        )
    }
}

impl<'a> TokenStream<'a> {
    pub(crate) fn len(&self) -> usize {
        self.tokens.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub(crate) fn filename(&self) -> &str {
        &self.filename
    }

    /// get the token at `index`, or the `Empty` sentinel if the index is past the end of the input
    pub(crate) fn token(&self, index: usize) -> Token<'a> {
        match self.tokens.get(index) {
            Some(tok) => Token {
                kind: match tok.ttype {
                    A2lTokenType::Identifier => TokenKind::Identifier,
                    A2lTokenType::Keyword => TokenKind::Keyword,
                    A2lTokenType::Begin => TokenKind::Begin,
                    A2lTokenType::End => TokenKind::End,
                    A2lTokenType::String => TokenKind::String,
                    A2lTokenType::Number => TokenKind::Number,
                    A2lTokenType::Text => TokenKind::Text,
                },
                text: &self.text[tok.startpos..tok.endpos],
                line: tok.line,
            },
            None => Token {
                kind: TokenKind::Empty,
                text: "",
                line: self.tokens.last().map_or(1, |tok| tok.line),
            },
        }
    }
}

// it pretends to be an Iter, but it isn't: reading past the end keeps returning the Empty token
impl<'a> TokenCursor<'a> {
    pub(crate) fn new(stream: &'a TokenStream<'a>, start: usize) -> Self {
        Self { stream, pos: start }
    }

    /// return the token at the cursor and advance
    pub(crate) fn next(&mut self) -> Token<'a> {
        let token = self.stream.token(self.pos);
        if self.pos < self.stream.len() {
            self.pos += 1;
        }
        token
    }

    /// return the token at the cursor without advancing
    pub(crate) fn current(&self) -> Token<'a> {
        self.stream.token(self.pos)
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub(crate) fn stream(&self) -> &'a TokenStream<'a> {
        self.stream
    }
}

// tokenize()
// Convert the text of an a2l file to tokens.
// During tokenization the text is treated as ASCII, even though it is actually UTF-8. It is
// possible to do this because characters outside of basic ASCII can actually only occur in
// strings and comments. UTF-8 in strings is directly copied to the output, while comments are discarded.
// Every token carries its source line number, so that error messages can give accurate location info
pub(crate) fn tokenize<'a>(
    filename: &str,
    filetext: &'a str,
) -> Result<TokenStream<'a>, TokenizerError> {
    let filebytes = filetext.as_bytes();
    let datalen = filebytes.len();

    let mut tokens: Vec<A2lToken> = Vec::with_capacity(datalen / 20);
    let mut bytepos = 0;
    let mut separated = true;
    let mut line = 1;

    while bytepos < datalen {
        let startpos = bytepos;

        if filebytes[bytepos].is_ascii_whitespace() {
            // skip whitespace
            separated = true;
            while bytepos < datalen && filebytes[bytepos].is_ascii_whitespace() {
                bytepos += 1;
            }
            line += count_newlines(&filebytes[startpos..bytepos]);
            continue;
        } else if filebytes[bytepos] == b'/' && bytepos + 1 < datalen {
            bytepos += 1;
            if filebytes[bytepos] == b'*' {
                // block comment
                separated = true;
                bytepos = skip_block_comment(filebytes, bytepos + 1).map_err(|()| {
                    TokenizerError::UnclosedComment {
                        filename: filename.to_owned(),
                        line,
                    }
                })?;
                line += count_newlines(&filebytes[startpos..bytepos]);
            } else if filebytes[bytepos] == b'/' {
                // line comment
                separated = true;
                while bytepos < datalen && filebytes[bytepos] != b'\n' {
                    bytepos += 1;
                }
            } else if filebytes[bytepos..].starts_with(b"begin") {
                separator_check(separated, filename, line)?;
                let tag_line = line;
                let (tagstart, tagend) =
                    read_block_tag(filebytes, bytepos + 5, &mut line, filename, "begin")?;
                tokens.push(A2lToken {
                    ttype: A2lTokenType::Begin,
                    startpos: tagstart,
                    endpos: tagend,
                    line: tag_line,
                });
                bytepos = tagend;
                separated = false;

                if &filetext[tagstart..tagend] == "A2ML" {
                    let (new_bytepos, new_line) = handle_a2ml(filetext, bytepos, line, &mut tokens);
                    if bytepos != new_bytepos {
                        separated = true;
                    }
                    bytepos = new_bytepos;
                    line = new_line;
                }
            } else if filebytes[bytepos..].starts_with(b"end") {
                separator_check(separated, filename, line)?;
                let tag_line = line;
                let (tagstart, tagend) =
                    read_block_tag(filebytes, bytepos + 3, &mut line, filename, "end")?;
                tokens.push(A2lToken {
                    ttype: A2lTokenType::End,
                    startpos: tagstart,
                    endpos: tagend,
                    line: tag_line,
                });
                bytepos = tagend;
                separated = false;
            } else {
                return Err(invalid_token(filename, line, filebytes, startpos));
            }
        } else if filebytes[bytepos] == b'"' {
            // a string
            separator_check(separated, filename, line)?;
            bytepos = find_string_end(filebytes, bytepos + 1).map_err(|()| {
                TokenizerError::UnclosedString {
                    filename: filename.to_owned(),
                    line,
                }
            })?;
            tokens.push(A2lToken {
                ttype: A2lTokenType::String,
                startpos,
                endpos: bytepos,
                line,
            });
            line += count_newlines(&filebytes[startpos..bytepos]);
            separated = false;
        } else if !(filebytes[bytepos]).is_ascii_digit() && is_identchar(filebytes[bytepos]) {
            // an identifier or a keyword
            separator_check(separated, filename, line)?;
            while bytepos < datalen && is_identchar(filebytes[bytepos]) {
                bytepos += 1;
            }
            let ttype = if is_keyword(&filetext[startpos..bytepos]) {
                A2lTokenType::Keyword
            } else {
                A2lTokenType::Identifier
            };
            tokens.push(A2lToken {
                ttype,
                startpos,
                endpos: bytepos,
                line,
            });
            separated = false;
        } else if filebytes[bytepos] == b'-' || is_numchar(filebytes[bytepos]) {
            // a number, in any format (integer, floating point or hexadecimal)
            separator_check(separated, filename, line)?;
            bytepos += 1;
            while bytepos < datalen && is_numchar(filebytes[bytepos]) {
                bytepos += 1;
            }
            if bytepos == datalen || !is_identchar(filebytes[bytepos]) {
                let number = &filebytes[startpos..bytepos];
                if number == b"-" || number == b"0x" || number == b"0X" {
                    return Err(TokenizerError::InvalidNumericalConstant {
                        filename: filename.to_owned(),
                        line,
                        tokentext: String::from_utf8_lossy(number).into(),
                    });
                }
                tokens.push(A2lToken {
                    ttype: A2lTokenType::Number,
                    startpos,
                    endpos: bytepos,
                    line,
                });
            } else {
                // an identifier that starts with a number is not standard compliant, but it occurs in real files
                while bytepos < datalen && is_identchar(filebytes[bytepos]) {
                    bytepos += 1;
                }
                tokens.push(A2lToken {
                    ttype: A2lTokenType::Identifier,
                    startpos,
                    endpos: bytepos,
                    line,
                });
            }
            separated = false;
        } else {
            return Err(invalid_token(filename, line, filebytes, startpos));
        }
    }

    Ok(TokenStream {
        tokens,
        text: filetext,
        filename: filename.to_owned(),
    })
}

fn invalid_token(filename: &str, line: u32, filebytes: &[u8], startpos: usize) -> TokenizerError {
    let endpos = (startpos + 10).min(filebytes.len());
    TokenizerError::InvalidA2lToken {
        filename: filename.to_owned(),
        line,
        tokentext: String::from_utf8_lossy(&filebytes[startpos..endpos]).into(),
    }
}

// read_block_tag
// /begin and /end must be followed by whitespace and the tag of the block
fn read_block_tag(
    filebytes: &[u8],
    mut bytepos: usize,
    line: &mut u32,
    filename: &str,
    directive: &'static str,
) -> Result<(usize, usize), TokenizerError> {
    let datalen = filebytes.len();
    let wsstart = bytepos;
    while bytepos < datalen && filebytes[bytepos].is_ascii_whitespace() {
        bytepos += 1;
    }
    *line += count_newlines(&filebytes[wsstart..bytepos]);

    let tagstart = bytepos;
    while bytepos < datalen && is_identchar(filebytes[bytepos]) {
        bytepos += 1;
    }
    if wsstart == tagstart || tagstart == bytepos {
        return Err(TokenizerError::MissingBlockTag {
            filename: filename.to_owned(),
            line: *line,
            directive,
        });
    }
    Ok((tagstart, bytepos))
}

// skip_block_comment
// finds the first byte position after the end of a block comment
fn skip_block_comment(filebytes: &[u8], mut bytepos: usize) -> Result<usize, ()> {
    let datalen = filebytes.len();

    bytepos += 1;
    while bytepos < datalen && !(filebytes[bytepos - 1] == b'*' && filebytes[bytepos] == b'/') {
        bytepos += 1;
    }

    if bytepos >= datalen {
        return Err(());
    }

    // currently filebytes[bytepos] == b'/', but bytepos should be set to the first character after the block comment
    bytepos += 1;

    Ok(bytepos)
}

// find_string_end
// finds the end of a string
fn find_string_end(filebytes: &[u8], mut bytepos: usize) -> Result<usize, ()> {
    let datalen = filebytes.len();
    let mut end_found = false;
    let mut prev_quote = false;
    let mut prev_bkslash = false;

    while bytepos < datalen && !end_found {
        if filebytes[bytepos] == b'"' {
            // if either prev_quote or prev_bkslash is set, then this quote is escaped
            // otherwise it's the start of a new double quote escape sequence or the end of the string
            prev_quote = !(prev_quote || prev_bkslash);
            prev_bkslash = false;
        } else {
            if prev_quote {
                // the previous char was a quote, so the end has been found
                end_found = true;
            } else if filebytes[bytepos] == b'\\' {
                // a second '\' completes a \\ escape
                prev_bkslash = !prev_bkslash;
            } else {
                prev_bkslash = false;
            }
            prev_quote = false;
        }
        bytepos += 1;
    }
    // either the closing quote was the last character of the input (ok), or the string was not closed
    if bytepos == datalen && !end_found {
        if prev_quote {
            bytepos += 1;
        } else {
            return Err(());
        }
    }
    bytepos -= 1;

    Ok(bytepos)
}

// handle_a2ml()
// the data inside the A2ML block can't be tokenized according to the rules for A2L, because it is a completely different format
// handle_a2ml finds the end of the A2ML block and stores its content as a single Text token
fn handle_a2ml(
    filetext: &str,
    startpos: usize,
    line: u32,
    tokens: &mut Vec<A2lToken>,
) -> (usize, u32) {
    let filebytes = filetext.as_bytes();
    let datalen = filebytes.len();
    let mut bytepos = startpos;

    while bytepos < datalen {
        if filebytes[bytepos..].starts_with(b"//") {
            while bytepos < datalen && filebytes[bytepos] != b'\n' {
                bytepos += 1;
            }
        } else if filebytes[bytepos..].starts_with(b"/*") {
            bytepos += 2;
            while bytepos + 1 < datalen
                && !(filebytes[bytepos] == b'*' && filebytes[bytepos + 1] == b'/')
            {
                bytepos += 1;
            }
            bytepos = (bytepos + 2).min(datalen);
        } else if filebytes[bytepos..].starts_with(b"/end") {
            break;
        } else if filebytes[bytepos] == b'"' {
            // A2ML tags are quoted and may contain anything
            bytepos = find_string_end(filebytes, bytepos + 1).unwrap_or(datalen);
        } else {
            bytepos += 1;
        }
    }

    let mut bodystart = startpos;
    while bodystart < bytepos && filebytes[bodystart].is_ascii_whitespace() {
        bodystart += 1;
    }
    let mut bodyend = bytepos;
    while bodyend > bodystart && filebytes[bodyend - 1].is_ascii_whitespace() {
        bodyend -= 1;
    }

    if bodyend > bodystart {
        tokens.push(A2lToken {
            ttype: A2lTokenType::Text,
            startpos: bodystart,
            endpos: bodyend,
            line: line + count_newlines(&filebytes[startpos..bodystart]),
        });
    }

    (bytepos, line + count_newlines(&filebytes[startpos..bytepos]))
}

// separator_check
// generate an error message if there is no whitespace (or a block comment) separating two tokens
fn separator_check(separated: bool, filename: &str, line: u32) -> Result<(), TokenizerError> {
    if !separated {
        return Err(TokenizerError::MissingWhitespace {
            filename: filename.to_owned(),
            line,
        });
    }
    Ok(())
}

// count_newlines()
// count the number of newlines in a comment or string. This is needed to keep the line count accurate
fn count_newlines(text: &[u8]) -> u32 {
    text.iter().map(|c| u32::from(*c == b'\n')).sum()
}

// is_identchar()
// is this char allowed in an identifier
pub(crate) fn is_identchar(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'.' || c == b'[' || c == b']' || c == b'_'
}

// is_numchar()
// in addition to decimal format, numbers can also be written as hex, or as floats with exponents
// this expands the set of allowable characters beyond is_ascii_hexdigit()
fn is_numchar(c: u8) -> bool {
    c.is_ascii_hexdigit() || c == b'x' || c == b'X' || c == b'.' || c == b'+' || c == b'-'
}

/// is_keyword()
///
/// Structural keywords may never be used where a literal is expected.
/// RESERVED is deliberately absent: it doubles as a MEMORY_SEGMENT program type.
pub(crate) fn is_keyword(text: &str) -> bool {
    matches!(
        text,
        "A2ML"
            | "A2ML_VERSION"
            | "ADDR_EPK"
            | "ADDRESS_TYPE"
            | "ALIGNMENT_BYTE"
            | "ALIGNMENT_FLOAT16_IEEE"
            | "ALIGNMENT_FLOAT32_IEEE"
            | "ALIGNMENT_FLOAT64_IEEE"
            | "ALIGNMENT_INT64"
            | "ALIGNMENT_LONG"
            | "ALIGNMENT_WORD"
            | "ANNOTATION"
            | "ANNOTATION_LABEL"
            | "ANNOTATION_ORIGIN"
            | "ANNOTATION_TEXT"
            | "ARRAY_SIZE"
            | "ASAP2_VERSION"
            | "AXIS_DESCR"
            | "AXIS_PTS"
            | "AXIS_PTS_REF"
            | "AXIS_PTS_X"
            | "AXIS_PTS_Y"
            | "AXIS_PTS_Z"
            | "AXIS_PTS_4"
            | "AXIS_PTS_5"
            | "AXIS_RESCALE_X"
            | "AXIS_RESCALE_Y"
            | "AXIS_RESCALE_Z"
            | "AXIS_RESCALE_4"
            | "AXIS_RESCALE_5"
            | "BIT_MASK"
            | "BLOB"
            | "BYTE_ORDER"
            | "CALIBRATION_ACCESS"
            | "CHARACTERISTIC"
            | "COEFFS"
            | "COEFFS_LINEAR"
            | "COMPARISON_QUANTITY"
            | "COMPU_METHOD"
            | "COMPU_TAB"
            | "COMPU_TAB_REF"
            | "COMPU_VTAB"
            | "COMPU_VTAB_RANGE"
            | "CONSISTENT_EXCHANGE"
            | "CPU_TYPE"
            | "CURVE_AXIS_REF"
            | "CUSTOMER"
            | "CUSTOMER_NO"
            | "DATA_SIZE"
            | "DEFAULT_VALUE"
            | "DEFAULT_VALUE_NUMERIC"
            | "DEF_CHARACTERISTIC"
            | "DEPENDENT_CHARACTERISTIC"
            | "DEPOSIT"
            | "DISCRETE"
            | "DISPLAY_IDENTIFIER"
            | "DIST_OP_X"
            | "DIST_OP_Y"
            | "DIST_OP_Z"
            | "DIST_OP_4"
            | "DIST_OP_5"
            | "ECU"
            | "ECU_ADDRESS"
            | "ECU_ADDRESS_EXTENSION"
            | "ECU_CALIBRATION_OFFSET"
            | "ENCODING"
            | "EPK"
            | "ERROR_MASK"
            | "EXTENDED_LIMITS"
            | "FIX_AXIS_PAR"
            | "FIX_AXIS_PAR_DIST"
            | "FIX_AXIS_PAR_LIST"
            | "FIX_NO_AXIS_PTS_X"
            | "FIX_NO_AXIS_PTS_Y"
            | "FIX_NO_AXIS_PTS_Z"
            | "FIX_NO_AXIS_PTS_4"
            | "FIX_NO_AXIS_PTS_5"
            | "FNC_VALUES"
            | "FORMAT"
            | "FORMULA"
            | "FORMULA_INV"
            | "FRAME"
            | "FRAME_MEASUREMENT"
            | "FUNCTION"
            | "FUNCTION_LIST"
            | "FUNCTION_VERSION"
            | "GROUP"
            | "GUARD_RAILS"
            | "HEADER"
            | "IDENTIFICATION"
            | "IF_DATA"
            | "IN_MEASUREMENT"
            | "INSTANCE"
            | "LAYOUT"
            | "LOC_MEASUREMENT"
            | "MAP_LIST"
            | "MATRIX_DIM"
            | "MAX_GRAD"
            | "MAX_REFRESH"
            | "MEASUREMENT"
            | "MEMORY_SEGMENT"
            | "MOD_COMMON"
            | "MOD_PAR"
            | "MODEL_LINK"
            | "MODULE"
            | "MONOTONY"
            | "NO_AXIS_PTS_X"
            | "NO_AXIS_PTS_Y"
            | "NO_AXIS_PTS_Z"
            | "NO_AXIS_PTS_4"
            | "NO_AXIS_PTS_5"
            | "NO_OF_INTERFACES"
            | "NO_RESCALE_X"
            | "NO_RESCALE_Y"
            | "NO_RESCALE_Z"
            | "NO_RESCALE_4"
            | "NO_RESCALE_5"
            | "NUMBER"
            | "OFFSET_X"
            | "OFFSET_Y"
            | "OFFSET_Z"
            | "OFFSET_4"
            | "OFFSET_5"
            | "OUT_MEASUREMENT"
            | "PHONE_NO"
            | "PHYS_UNIT"
            | "PROJECT"
            | "PROJECT_NO"
            | "READ_ONLY"
            | "READ_WRITE"
            | "RECORD_LAYOUT"
            | "REF_CHARACTERISTIC"
            | "REF_GROUP"
            | "REF_MEASUREMENT"
            | "REF_MEMORY_SEGMENT"
            | "REF_UNIT"
            | "RIP_ADDR_W"
            | "RIP_ADDR_X"
            | "RIP_ADDR_Y"
            | "RIP_ADDR_Z"
            | "RIP_ADDR_4"
            | "RIP_ADDR_5"
            | "ROOT"
            | "S_REC_LAYOUT"
            | "SHIFT_OP_X"
            | "SHIFT_OP_Y"
            | "SHIFT_OP_Z"
            | "SHIFT_OP_4"
            | "SHIFT_OP_5"
            | "SI_EXPONENTS"
            | "SRC_ADDR_X"
            | "SRC_ADDR_Y"
            | "SRC_ADDR_Z"
            | "SRC_ADDR_4"
            | "SRC_ADDR_5"
            | "STATIC_ADDRESS_OFFSETS"
            | "STATIC_RECORD_LAYOUT"
            | "STATUS_STRING_REF"
            | "STEP_SIZE"
            | "STRUCTURE_COMPONENT"
            | "SUB_FUNCTION"
            | "SUB_GROUP"
            | "SUPPLIER"
            | "SYMBOL_LINK"
            | "SYMBOL_TYPE_LINK"
            | "SYSTEM_CONSTANT"
            | "TRANSFORMER"
            | "TRANSFORMER_IN_OBJECTS"
            | "TRANSFORMER_OUT_OBJECTS"
            | "TYPEDEF_AXIS"
            | "TYPEDEF_BLOB"
            | "TYPEDEF_CHARACTERISTIC"
            | "TYPEDEF_MEASUREMENT"
            | "TYPEDEF_STRUCTURE"
            | "UNIT"
            | "UNIT_CONVERSION"
            | "USER"
            | "USER_RIGHTS"
            | "VAR_ADDRESS"
            | "VAR_CHARACTERISTIC"
            | "VAR_CRITERION"
            | "VAR_FORBIDDEN_COMB"
            | "VAR_MEASUREMENT"
            | "VAR_NAMING"
            | "VAR_SELECTION_CHARACTERISTIC"
            | "VAR_SEPARATOR"
            | "VARIANT_CODING"
            | "VERSION"
            | "VIRTUAL"
            | "VIRTUAL_CHARACTERISTIC"
    )
}

/*************************************************************************************************/
