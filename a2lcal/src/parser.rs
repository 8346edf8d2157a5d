use num_traits::Num;
use thiserror::Error;

use crate::tokenizer::{Token, TokenCursor, TokenKind, TokenStream, is_keyword};
use crate::{A2lError, ParseOptions};

pub(crate) struct ParserState<'a> {
    cursor: TokenCursor<'a>,
    pub(crate) log_msgs: &'a mut Vec<A2lError>,
    options: &'a ParseOptions,
    pub(crate) last_token_position: u32,
}

/// describes the current parser context, giving the name of the current element and the line where it starts
#[derive(Debug, Clone)]
pub struct ParseContext {
    pub element: String,
    pub line: u32,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParserError {
    #[error("{filename}:{error_line}: encountered end of input while not done parsing block {block} starting on line {block_line}")]
    UnexpectedEndOfInput {
        filename: String,
        error_line: u32,
        block: String,
        block_line: u32,
    },

    #[error("{filename}:{error_line}: unexpected keyword {keyword} inside block {block} starting on line {block_line}")]
    UnexpectedKeyword {
        filename: String,
        error_line: u32,
        keyword: String,
        block: String,
        block_line: u32,
    },

    #[error("{filename}:{error_line}: \"{text}\" is not valid for {slot} in block {block} starting on line {block_line}: expected {expected}")]
    MalformedLiteral {
        filename: String,
        error_line: u32,
        text: String,
        slot: &'static str,
        expected: &'static str,
        block: String,
        block_line: u32,
    },

    #[error("{filename}:{error_line}: unexpected additional literal \"{text}\" in block {block} starting on line {block_line}")]
    UnexpectedLiteral {
        filename: String,
        error_line: u32,
        text: String,
        block: String,
        block_line: u32,
    },

    #[error("{filename}:{error_line}: Unknown sub-block {tag} found inside block {block} starting on line {block_line}")]
    UnknownSubBlock {
        filename: String,
        error_line: u32,
        tag: String,
        block: String,
        block_line: u32,
    },

    #[error("{filename}:{error_line}: the end of block {block} starting on line {block_line} was not found")]
    NoTerminator {
        filename: String,
        error_line: u32,
        block: String,
        block_line: u32,
    },

    /// `MissingVersionInfo`: no version information in the file
    #[error("File is not recognized as an a2l file. Mandatory version information is missing.")]
    MissingVersionInfo,
}

/// The shape of a record kind in the token stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockForm {
    /// enclosed in `/begin TAG` ... `/end TAG`
    Block,
    /// a keyword followed by a fixed number of literals
    Keyword,
    /// the whole input; ends with the token stream
    File,
    /// a block whose content is not interpreted, only balanced
    Opaque,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotKind {
    Required,
    Optional,
    Repeated,
}

/// the expected form of a literal that could not be converted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BadLiteral(pub(crate) &'static str);

/// One positional attribute of a record kind
pub(crate) struct Slot<T> {
    pub(crate) name: &'static str,
    pub(crate) kind: SlotKind,
    pub(crate) is_set: fn(&T) -> bool,
    pub(crate) assign: fn(&mut T, &Token<'_>) -> Result<(), BadLiteral>,
}

/// A recognized sub-block or sub-keyword of a record kind
pub(crate) struct SubItem<T> {
    pub(crate) tag: &'static str,
    pub(crate) is_block: bool,
    pub(crate) parse: fn(&mut T, &mut ParserState<'_>, &ParseContext) -> Result<(), ParserError>,
}

/// The declarative grammar of one record kind.
///
/// The positional slots are filled in declaration order; the sub-items are dispatched by tag.
pub struct Grammar<T: 'static> {
    pub(crate) tag: &'static str,
    pub(crate) form: BlockForm,
    pub(crate) positional: &'static [Slot<T>],
    pub(crate) sub_items: &'static [SubItem<T>],
}

/// A record kind that can be parsed by the generic block parser
pub trait A2lBlock: Default + 'static {
    const GRAMMAR: Grammar<Self>;

    fn set_line(&mut self, _line: u32) {}
}

/// A record that could only be parsed partially
///
/// The record contains everything that was parsed before the error occurred.
#[derive(Debug)]
pub struct PartialRecord<T> {
    pub record: T,
    pub error: A2lError,
}

impl<'a> ParserState<'a> {
    pub(crate) fn new(
        stream: &'a TokenStream<'a>,
        start: usize,
        log_msgs: &'a mut Vec<A2lError>,
        options: &'a ParseOptions,
    ) -> Self {
        Self {
            cursor: TokenCursor::new(stream, start),
            log_msgs,
            options,
            last_token_position: stream.token(start).line,
        }
    }

    pub(crate) fn parse_file(&mut self, a2l_file: &mut crate::A2lFile) -> Result<(), ParserError> {
        let first = self.current_token();
        let context = ParseContext {
            element: "A2L_FILE".to_string(),
            line: first.line,
        };

        // Starting with 1.60, the ASAP2_VERSION element is mandatory. For compatibility with
        // old files, a missing version is only an error if strict parsing is requested
        if first.kind != TokenKind::Keyword || first.text != "ASAP2_VERSION" {
            self.error_or_log(ParserError::MissingVersionInfo)?;
        }

        self.parse_into(a2l_file, &context)
    }

    // get_token
    // get one token from the cursor. Reaching the end of the input inside a block is an error
    pub(crate) fn get_token(&mut self, context: &ParseContext) -> Result<Token<'a>, ParserError> {
        let token = self.cursor.next();
        if token.kind == TokenKind::Empty {
            Err(ParserError::unexpected_eof(self, context))
        } else {
            self.last_token_position = token.line;
            Ok(token)
        }
    }

    pub(crate) fn current_token(&self) -> Token<'a> {
        self.cursor.current()
    }

    pub(crate) fn pos(&self) -> usize {
        self.cursor.pos()
    }

    pub(crate) fn set_pos(&mut self, pos: usize) {
        self.cursor.set_pos(pos);
    }

    pub(crate) fn stream(&self) -> &'a TokenStream<'a> {
        self.cursor.stream()
    }

    pub(crate) fn options(&self) -> &'a ParseOptions {
        self.options
    }

    pub(crate) fn log_warning(&mut self, parse_error: ParserError) {
        self.log_msgs.push(A2lError::ParserError {
            parser_error: parse_error,
        });
    }

    pub(crate) fn error_or_log(&mut self, err: ParserError) -> Result<(), ParserError> {
        if self.options.strict {
            Err(err)
        } else {
            self.log_warning(err);
            Ok(())
        }
    }

    /// parse a record of kind U whose opening token has already been consumed
    pub(crate) fn parse_nested<U: A2lBlock>(
        &mut self,
        context: &ParseContext,
    ) -> Result<U, ParserError> {
        let mut record = U::default();
        record.set_line(context.line);
        self.parse_into(&mut record, context)?;
        Ok(record)
    }

    /// parse the single literal following a keyword, e.g. `BYTE_ORDER MSB_LAST`
    pub(crate) fn parse_value<V>(
        &mut self,
        context: &ParseContext,
        conv: impl Fn(&Token<'_>) -> Result<V, BadLiteral>,
    ) -> Result<V, ParserError> {
        let token = self.get_token(context)?;
        if !token.is_literal() {
            return Err(ParserError::unexpected_keyword(self, context, &token));
        }
        conv(&token).map_err(|BadLiteral(expected)| {
            ParserError::malformed_literal(self, context, &token, "value", expected)
        })
    }

    /// The generic block parser.
    ///
    /// Called immediately after the opening token of the record has been consumed. Fills the
    /// record according to `T::GRAMMAR` until the record is complete or an error occurs. On error
    /// the record keeps everything that was assigned before.
    pub(crate) fn parse_into<T: A2lBlock>(
        &mut self,
        record: &mut T,
        context: &ParseContext,
    ) -> Result<(), ParserError> {
        let positional = T::GRAMMAR.positional;
        let sub_items = T::GRAMMAR.sub_items;
        match T::GRAMMAR.form {
            BlockForm::Block => {
                self.parse_block_body(record, positional, sub_items, context, false)
            }
            BlockForm::File => self.parse_block_body(record, positional, sub_items, context, true),
            BlockForm::Keyword => self.parse_keyword_body(record, positional, context),
            BlockForm::Opaque => self.parse_opaque_body(record, positional, context),
        }
    }

    fn parse_block_body<T>(
        &mut self,
        record: &mut T,
        positional: &'static [Slot<T>],
        sub_items: &'static [SubItem<T>],
        context: &ParseContext,
        is_file: bool,
    ) -> Result<(), ParserError> {
        loop {
            if is_file && self.current_token().kind == TokenKind::Empty {
                return Ok(());
            }
            let token = self.get_token(context)?;

            match token.kind {
                TokenKind::Begin => {
                    if let Some(item) = sub_items
                        .iter()
                        .find(|item| item.is_block && item.tag == token.text)
                    {
                        let newcontext = ParseContext::from_token(item.tag, &token);
                        (item.parse)(record, self, &newcontext)?;
                    } else {
                        self.handle_unknown_block(context, &token)?;
                    }
                }
                TokenKind::End => {
                    if !is_file && token.text == context.element {
                        return Ok(());
                    }
                    return Err(ParserError::unexpected_keyword(self, context, &token));
                }
                TokenKind::Keyword | TokenKind::Identifier => {
                    if let Some(item) = sub_items
                        .iter()
                        .find(|item| !item.is_block && item.tag == token.text)
                    {
                        let newcontext = ParseContext::from_token(item.tag, &token);
                        (item.parse)(record, self, &newcontext)?;
                    } else if token.kind == TokenKind::Keyword {
                        return Err(ParserError::unexpected_keyword(self, context, &token));
                    } else {
                        self.assign_literal(record, positional, context, &token)?;
                    }
                }
                _ => self.assign_literal(record, positional, context, &token)?,
            }
        }
    }

    // keyword records have no end marker. They end once all slots are filled, or when a
    // non-literal follows and the remaining slots are optional
    fn parse_keyword_body<T>(
        &mut self,
        record: &mut T,
        positional: &'static [Slot<T>],
        context: &ParseContext,
    ) -> Result<(), ParserError> {
        while let Some(slot) = next_free_slot(record, positional) {
            if slot.kind != SlotKind::Required && !self.current_token().is_literal() {
                break;
            }
            let token = self.get_token(context)?;
            if !token.is_literal() {
                return Err(ParserError::unexpected_keyword(self, context, &token));
            }
            self.assign_literal(record, positional, context, &token)?;
        }
        Ok(())
    }

    // the content of an opaque block is kept as text; nested blocks are only balanced
    fn parse_opaque_body<T>(
        &mut self,
        record: &mut T,
        positional: &'static [Slot<T>],
        context: &ParseContext,
    ) -> Result<(), ParserError> {
        let mut depth = 0usize;
        loop {
            let token = self.get_token(context)?;
            let marker = match token.kind {
                TokenKind::Begin => {
                    depth += 1;
                    format!("/begin {}", token.text)
                }
                TokenKind::End if depth == 0 => {
                    if token.text == context.element {
                        return Ok(());
                    }
                    return Err(ParserError::unexpected_keyword(self, context, &token));
                }
                TokenKind::End => {
                    depth -= 1;
                    format!("/end {}", token.text)
                }
                _ => {
                    self.assign_literal(record, positional, context, &token)?;
                    continue;
                }
            };
            let marker_token = Token {
                kind: TokenKind::Text,
                text: &marker,
                line: token.line,
            };
            self.assign_literal(record, positional, context, &marker_token)?;
        }
    }

    /// assign a literal to the first positional slot that is not yet set
    pub(crate) fn assign_literal<T>(
        &mut self,
        record: &mut T,
        positional: &'static [Slot<T>],
        context: &ParseContext,
        token: &Token<'_>,
    ) -> Result<(), ParserError> {
        match next_free_slot(record, positional) {
            Some(slot) => (slot.assign)(record, token).map_err(|BadLiteral(expected)| {
                ParserError::malformed_literal(self, context, token, slot.name, expected)
            }),
            None => {
                let err = ParserError::unexpected_literal(self, context, token);
                self.error_or_log(err)
            }
        }
    }

    // a /begin with a tag that the current block does not know.
    // Blocks of other known kinds are never allowed, anything else is skipped
    pub(crate) fn handle_unknown_block(
        &mut self,
        context: &ParseContext,
        token: &Token<'_>,
    ) -> Result<(), ParserError> {
        if is_keyword(token.text) {
            return Err(ParserError::unexpected_keyword(self, context, token));
        }
        let err = ParserError::unknown_sub_block(self, context, token);
        self.error_or_log(err)?;

        let skipcontext = ParseContext::from_token(token.text, token);
        let mut depth = 0usize;
        loop {
            let tok = self.get_token(&skipcontext)?;
            match tok.kind {
                TokenKind::Begin => depth += 1,
                TokenKind::End if depth == 0 => return Ok(()),
                TokenKind::End => depth -= 1,
                _ => {}
            }
        }
    }
}

fn next_free_slot<'s, T>(record: &T, positional: &'s [Slot<T>]) -> Option<&'s Slot<T>> {
    positional
        .iter()
        .find(|slot| slot.kind == SlotKind::Repeated || !(slot.is_set)(record))
}

impl ParseContext {
    pub(crate) fn from_token(element: &str, token: &Token<'_>) -> Self {
        ParseContext {
            element: element.to_owned(),
            line: token.line,
        }
    }
}

impl ParserError {
    pub(crate) fn unexpected_eof(parser: &ParserState, context: &ParseContext) -> Self {
        Self::UnexpectedEndOfInput {
            filename: parser.stream().filename().to_owned(),
            error_line: parser.last_token_position,
            block: context.element.clone(),
            block_line: context.line,
        }
    }

    pub(crate) fn unexpected_keyword(
        parser: &ParserState,
        context: &ParseContext,
        token: &Token<'_>,
    ) -> Self {
        let keyword = match token.kind {
            TokenKind::Begin => format!("/begin {}", token.text),
            TokenKind::End => format!("/end {}", token.text),
            _ => token.text.to_owned(),
        };
        Self::UnexpectedKeyword {
            filename: parser.stream().filename().to_owned(),
            error_line: token.line,
            keyword,
            block: context.element.clone(),
            block_line: context.line,
        }
    }

    pub(crate) fn malformed_literal(
        parser: &ParserState,
        context: &ParseContext,
        token: &Token<'_>,
        slot: &'static str,
        expected: &'static str,
    ) -> Self {
        Self::MalformedLiteral {
            filename: parser.stream().filename().to_owned(),
            error_line: token.line,
            text: token.text.to_owned(),
            slot,
            expected,
            block: context.element.clone(),
            block_line: context.line,
        }
    }

    pub(crate) fn unexpected_literal(
        parser: &ParserState,
        context: &ParseContext,
        token: &Token<'_>,
    ) -> Self {
        Self::UnexpectedLiteral {
            filename: parser.stream().filename().to_owned(),
            error_line: token.line,
            text: token.text.to_owned(),
            block: context.element.clone(),
            block_line: context.line,
        }
    }

    pub(crate) fn unknown_sub_block(
        parser: &ParserState,
        context: &ParseContext,
        token: &Token<'_>,
    ) -> Self {
        Self::UnknownSubBlock {
            filename: parser.stream().filename().to_owned(),
            error_line: token.line,
            tag: token.text.to_owned(),
            block: context.element.clone(),
            block_line: context.line,
        }
    }

    pub(crate) fn no_terminator(parser: &ParserState, context: &ParseContext) -> Self {
        Self::NoTerminator {
            filename: parser.stream().filename().to_owned(),
            error_line: parser.last_token_position,
            block: context.element.clone(),
            block_line: context.line,
        }
    }
}

/// Keyword-valued enumerations of the a2l format
pub trait A2lEnum: Sized {
    fn from_a2l(text: &str) -> Option<Self>;

    fn as_a2l(&self) -> &'static str;
}

pub(crate) fn lit_ident(token: &Token<'_>) -> Result<String, BadLiteral> {
    match token.kind {
        TokenKind::Identifier | TokenKind::Keyword => Ok(token.text.to_owned()),
        _ => Err(BadLiteral("an identifier")),
    }
}

pub(crate) fn lit_string(token: &Token<'_>) -> Result<String, BadLiteral> {
    match token.kind {
        TokenKind::String => Ok(unescape_string(&token.text[1..token.text.len() - 1])),
        TokenKind::Identifier | TokenKind::Text => Ok(token.text.to_owned()),
        _ => Err(BadLiteral("a string")),
    }
}

/// the token text, unmodified
pub(crate) fn lit_raw(token: &Token<'_>) -> Result<String, BadLiteral> {
    Ok(token.text.to_owned())
}

pub(crate) fn lit_float(token: &Token<'_>) -> Result<f64, BadLiteral> {
    const EXPECTED: &str = "a floating point number";
    if token.kind != TokenKind::Number {
        return Err(BadLiteral(EXPECTED));
    }
    let text = token.text;
    if let Some(hexval) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u64::from_str_radix(hexval, 16)
            .map(|val| val as f64)
            .map_err(|_| BadLiteral(EXPECTED))
    } else {
        text.parse::<f64>().map_err(|_| BadLiteral(EXPECTED))
    }
}

// integers are either decimal or hex with a 0x prefix
pub(crate) fn lit_int<T: Num>(token: &Token<'_>) -> Result<T, BadLiteral> {
    const EXPECTED: &str = "an integer";
    if token.kind != TokenKind::Number {
        return Err(BadLiteral(EXPECTED));
    }
    let text = token.text;
    let result = if let Some(hexval) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))
    {
        T::from_str_radix(hexval, 16)
    } else {
        T::from_str_radix(text, 10)
    };
    result.map_err(|_| BadLiteral(EXPECTED))
}

pub(crate) fn lit_enum<E: A2lEnum>(token: &Token<'_>) -> Result<E, BadLiteral> {
    match token.kind {
        TokenKind::Identifier | TokenKind::Keyword => {
            E::from_a2l(token.text).ok_or(BadLiteral("a valid enum value"))
        }
        _ => Err(BadLiteral("an enum value")),
    }
}

fn unescape_string(text: &str) -> String {
    /* first check if any unescaping is needed at all */
    if text.chars().any(|c| c == '\\' || c == '"') {
        let input_chars: Vec<char> = text.chars().collect();
        let mut output_chars = Vec::<char>::new();

        let mut idx = 1;
        while idx < input_chars.len() {
            if (input_chars[idx - 1] == '\\' || input_chars[idx - 1] == '"')
                && input_chars[idx] == '"'
            {
                output_chars.push('"');
                idx += 1;
            } else if input_chars[idx - 1] == '\\' && input_chars[idx] == '\'' {
                output_chars.push('\'');
                idx += 1;
            } else if input_chars[idx - 1] == '\\' && input_chars[idx] == '\\' {
                output_chars.push('\\');
                idx += 1;
            } else if input_chars[idx - 1] == '\\' && input_chars[idx] == 'n' {
                output_chars.push('\n');
                idx += 1;
            } else if input_chars[idx - 1] == '\\' && input_chars[idx] == 'r' {
                output_chars.push('\r');
                idx += 1;
            } else if input_chars[idx - 1] == '\\' && input_chars[idx] == 't' {
                output_chars.push('\t');
                idx += 1;
            } else {
                output_chars.push(input_chars[idx - 1]);
            }

            idx += 1;
        }
        if idx == input_chars.len() {
            output_chars.push(input_chars[idx - 1]);
        }

        output_chars.iter().collect()
    } else {
        text.to_owned()
    }
}

/// build a positional `Slot` for the record type `Self`
macro_rules! slot {
    (name $label:literal) => {
        $crate::parser::Slot {
            name: $label,
            kind: $crate::parser::SlotKind::Required,
            is_set: |rec: &Self| !rec.name.is_empty(),
            assign: |rec: &mut Self,
                     token: &$crate::tokenizer::Token<'_>|
             -> Result<(), $crate::parser::BadLiteral> {
                rec.name = $crate::parser::lit_ident(token)?;
                Ok(())
            },
        }
    };
    ($label:literal, $field:ident, $conv:path) => {
        $crate::parser::Slot {
            name: $label,
            kind: $crate::parser::SlotKind::Required,
            is_set: |rec: &Self| rec.$field.is_some(),
            assign: |rec: &mut Self,
                     token: &$crate::tokenizer::Token<'_>|
             -> Result<(), $crate::parser::BadLiteral> {
                rec.$field = Some($conv(token)?);
                Ok(())
            },
        }
    };
    (optional $label:literal, $field:ident, $conv:path) => {
        $crate::parser::Slot {
            name: $label,
            kind: $crate::parser::SlotKind::Optional,
            is_set: |rec: &Self| rec.$field.is_some(),
            assign: |rec: &mut Self,
                     token: &$crate::tokenizer::Token<'_>|
             -> Result<(), $crate::parser::BadLiteral> {
                rec.$field = Some($conv(token)?);
                Ok(())
            },
        }
    };
    (repeated $label:literal, $field:ident, $conv:path) => {
        $crate::parser::Slot {
            name: $label,
            kind: $crate::parser::SlotKind::Repeated,
            is_set: |_: &Self| false,
            assign: |rec: &mut Self,
                     token: &$crate::tokenizer::Token<'_>|
             -> Result<(), $crate::parser::BadLiteral> {
                rec.$field.push($conv(token)?);
                Ok(())
            },
        }
    };
}
pub(crate) use slot;

/// build a `SubItem` for the record type `Self`
macro_rules! item {
    (block $tag:literal => push $field:ident) => {
        $crate::parser::SubItem {
            tag: $tag,
            is_block: true,
            parse: |rec: &mut Self,
                    parser: &mut $crate::parser::ParserState<'_>,
                    context: &$crate::parser::ParseContext|
             -> Result<(), $crate::parser::ParserError> {
                rec.$field.push(parser.parse_nested(context)?);
                Ok(())
            },
        }
    };
    (block $tag:literal => $field:ident) => {
        $crate::parser::SubItem {
            tag: $tag,
            is_block: true,
            parse: |rec: &mut Self,
                    parser: &mut $crate::parser::ParserState<'_>,
                    context: &$crate::parser::ParseContext|
             -> Result<(), $crate::parser::ParserError> {
                rec.$field = Some(parser.parse_nested(context)?);
                Ok(())
            },
        }
    };
    (keyword $tag:literal => push $field:ident) => {
        $crate::parser::SubItem {
            tag: $tag,
            is_block: false,
            parse: |rec: &mut Self,
                    parser: &mut $crate::parser::ParserState<'_>,
                    context: &$crate::parser::ParseContext|
             -> Result<(), $crate::parser::ParserError> {
                rec.$field.push(parser.parse_nested(context)?);
                Ok(())
            },
        }
    };
    (keyword $tag:literal => $field:ident) => {
        $crate::parser::SubItem {
            tag: $tag,
            is_block: false,
            parse: |rec: &mut Self,
                    parser: &mut $crate::parser::ParserState<'_>,
                    context: &$crate::parser::ParseContext|
             -> Result<(), $crate::parser::ParserError> {
                rec.$field = Some(parser.parse_nested(context)?);
                Ok(())
            },
        }
    };
    (value $tag:literal => push $field:ident, $conv:path) => {
        $crate::parser::SubItem {
            tag: $tag,
            is_block: false,
            parse: |rec: &mut Self,
                    parser: &mut $crate::parser::ParserState<'_>,
                    context: &$crate::parser::ParseContext|
             -> Result<(), $crate::parser::ParserError> {
                rec.$field.push(parser.parse_value(context, $conv)?);
                Ok(())
            },
        }
    };
    (value $tag:literal => $field:ident, $conv:path) => {
        $crate::parser::SubItem {
            tag: $tag,
            is_block: false,
            parse: |rec: &mut Self,
                    parser: &mut $crate::parser::ParserState<'_>,
                    context: &$crate::parser::ParseContext|
             -> Result<(), $crate::parser::ParserError> {
                rec.$field = Some(parser.parse_value(context, $conv)?);
                Ok(())
            },
        }
    };
    (flag $tag:literal => $field:ident) => {
        $crate::parser::SubItem {
            tag: $tag,
            is_block: false,
            parse: |rec: &mut Self,
                    _parser: &mut $crate::parser::ParserState<'_>,
                    _context: &$crate::parser::ParseContext|
             -> Result<(), $crate::parser::ParserError> {
                rec.$field = true;
                Ok(())
            },
        }
    };
}
pub(crate) use item;
