//! Recursive-descent parser for the collector configuration language
//!
//! Grammar: a `CIRC = {` preamble, any number of keyword-introduced sections
//! (each at most once, in any order), a closing `}`, then end of input.
//! Every violation is a `ConfigSyntax` error; a file that cannot be read is
//! `ConfigMissing`. The result is built in fresh stores and returned
//! all-or-nothing, so a caller never observes a partially populated policy
//! table.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::{CollectorConfig, PolicyTable};
use crate::error::{CollectorError, Result};
use crate::lexer::{Lexer, Token};
use crate::record::FunctionId;

const SECTION_FILE_NAME: &str = "internal_data_filename";
const SECTION_STORAGE_SIZE: &str = "internal_storage_size";
const SECTION_DIRECT_OUTPUT: &str = "internal_direct_output";
const SECTION_FILTER: &str = "runtime_filter";
const SECTION_SAMPLING: &str = "sampling";

const KEY_FUNC: &str = "func";
const KEY_SAMPLE: &str = "sample";

/// Which sections have been parsed already; a second occurrence of any is a
/// syntax error.
#[derive(Debug, Default)]
struct SectionsSeen {
    file_name: bool,
    storage_size: bool,
    direct_output: bool,
    filter: bool,
    sampling: bool,
}

/// Configuration parser, consumed by a single parse
pub struct ConfigParser<'a> {
    lexer: Lexer<'a>,
    seen: SectionsSeen,
    config: CollectorConfig,
    policies: PolicyTable,
}

impl<'a> ConfigParser<'a> {
    /// Read and parse the configuration file at `path`.
    pub fn parse_file(path: &Path) -> Result<(CollectorConfig, PolicyTable)> {
        let contents = fs::read_to_string(path).map_err(|_| CollectorError::ConfigMissing {
            path: path.to_path_buf(),
        })?;
        Self::parse_str(&contents)
    }

    /// Parse configuration text into fresh stores.
    pub fn parse_str(input: &str) -> Result<(CollectorConfig, PolicyTable)> {
        let mut parser = ConfigParser {
            lexer: Lexer::new(input),
            seen: SectionsSeen::default(),
            config: CollectorConfig::default(),
            policies: PolicyTable::default(),
        };
        parser.parse()?;
        debug!(
            policies = parser.policies.len(),
            direct = parser.config.use_direct_output,
            "configuration parsed"
        );
        Ok((parser.config, parser.policies))
    }

    fn parse(&mut self) -> Result<()> {
        self.parse_preamble()?;
        loop {
            match self.lexer.next_token()? {
                Token::CurlyClose => break,
                Token::Text(keyword) => self.parse_section(&keyword)?,
                // Separator between sections; the grammar tolerates both
                // comma- and newline-separated styles.
                Token::Comma => {}
                other => return Err(mismatch("section keyword or '}'", &other)),
            }
        }
        // Nothing may follow the closing brace.
        match self.lexer.next_token()? {
            Token::End => Ok(()),
            other => Err(mismatch("end of input", &other)),
        }
    }

    /// The mandatory `CIRC = {` opening sequence.
    fn parse_preamble(&mut self) -> Result<()> {
        self.expect(&Token::Magic)?;
        self.expect(&Token::Equals)?;
        self.expect(&Token::CurlyOpen)
    }

    fn parse_section(&mut self, keyword: &str) -> Result<()> {
        match keyword {
            SECTION_FILE_NAME => {
                check_once(self.seen.file_name, keyword)?;
                self.seen.file_name = true;
                self.parse_file_name()
            }
            SECTION_STORAGE_SIZE => {
                check_once(self.seen.storage_size, keyword)?;
                self.seen.storage_size = true;
                self.parse_storage_size()
            }
            SECTION_DIRECT_OUTPUT => {
                check_once(self.seen.direct_output, keyword)?;
                self.seen.direct_output = true;
                self.parse_direct_output()
            }
            SECTION_FILTER => {
                check_once(self.seen.filter, keyword)?;
                self.seen.filter = true;
                self.parse_filter()
            }
            SECTION_SAMPLING => {
                check_once(self.seen.sampling, keyword)?;
                self.seen.sampling = true;
                self.parse_sampling()
            }
            other => Err(CollectorError::ConfigSyntax(format!(
                "unknown configuration section {other:?}"
            ))),
        }
    }

    /// `"internal_data_filename" : "<path>"`
    fn parse_file_name(&mut self) -> Result<()> {
        self.expect(&Token::Colon)?;
        let name = self.expect_text()?;
        self.config.trace_file_name = name.into();
        Ok(())
    }

    /// `"internal_storage_size" : <decimal>`
    fn parse_storage_size(&mut self) -> Result<()> {
        self.expect(&Token::Colon)?;
        let digits = self.expect_number()?;
        self.config.buffer_init_capacity = digits.parse().map_err(|_| {
            CollectorError::ConfigSyntax(format!("storage size {digits:?} out of range"))
        })?;
        Ok(())
    }

    /// `"internal_direct_output" : true|false`
    fn parse_direct_output(&mut self) -> Result<()> {
        self.expect(&Token::Colon)?;
        self.config.use_direct_output = self.expect_bool()?;
        Ok(())
    }

    /// `"runtime_filter" : [ <decimal>, ... ]`, possibly empty. Filter
    /// entries overwrite any earlier policy for the same identity.
    fn parse_filter(&mut self) -> Result<()> {
        self.expect(&Token::Colon)?;
        self.expect(&Token::SquareOpen)?;
        loop {
            match self.lexer.next_token()? {
                Token::SquareClose => return Ok(()),
                Token::Number(digits) => self.policies.add_filter(function_id(&digits)?),
                Token::Comma => {}
                other => return Err(mismatch("function identity or ']'", &other)),
            }
        }
    }

    /// `"sampling" : [ { "func" : <decimal>, "sample" : <decimal> }, ... ]`.
    /// Sampling entries never displace an earlier policy, and a ratio of 0
    /// or 1 creates no entry at all.
    fn parse_sampling(&mut self) -> Result<()> {
        self.expect(&Token::Colon)?;
        self.expect(&Token::SquareOpen)?;
        loop {
            match self.lexer.next_token()? {
                Token::SquareClose => return Ok(()),
                Token::CurlyOpen => self.parse_sampling_entry()?,
                Token::Comma => {}
                other => return Err(mismatch("sampling entry or ']'", &other)),
            }
        }
    }

    fn parse_sampling_entry(&mut self) -> Result<()> {
        self.expect_keyword(KEY_FUNC)?;
        self.expect(&Token::Colon)?;
        let function = function_id(&self.expect_number()?)?;
        self.expect(&Token::Comma)?;
        self.expect_keyword(KEY_SAMPLE)?;
        self.expect(&Token::Colon)?;
        let digits = self.expect_number()?;
        let ratio: u64 = digits.parse().map_err(|_| {
            CollectorError::ConfigSyntax(format!("sample ratio {digits:?} out of range"))
        })?;
        self.expect(&Token::CurlyClose)?;
        self.policies.add_sample(function, ratio);
        Ok(())
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        let token = self.lexer.next_token()?;
        if &token == expected {
            Ok(())
        } else {
            Err(mismatch(expected.describe(), &token))
        }
    }

    /// Quoted text whose value must match a literal keyword.
    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        let text = self.expect_text()?;
        if text == keyword {
            Ok(())
        } else {
            Err(CollectorError::ConfigSyntax(format!(
                "expected {keyword:?}, found {text:?}"
            )))
        }
    }

    fn expect_text(&mut self) -> Result<String> {
        match self.lexer.next_token()? {
            Token::Text(value) => Ok(value),
            other => Err(mismatch("quoted text", &other)),
        }
    }

    fn expect_number(&mut self) -> Result<String> {
        match self.lexer.next_token()? {
            Token::Number(digits) => Ok(digits),
            other => Err(mismatch("number", &other)),
        }
    }

    fn expect_bool(&mut self) -> Result<bool> {
        match self.lexer.next_token()? {
            Token::Bool(value) => Ok(value),
            other => Err(mismatch("boolean", &other)),
        }
    }
}

fn check_once(seen: bool, keyword: &str) -> Result<()> {
    if seen {
        Err(CollectorError::ConfigSyntax(format!(
            "duplicate configuration section {keyword:?}"
        )))
    } else {
        Ok(())
    }
}

fn mismatch(expected: &str, found: &Token) -> CollectorError {
    CollectorError::ConfigSyntax(format!("expected {expected}, found {}", found.describe()))
}

/// Decimal function identity from the configuration text.
fn function_id(digits: &str) -> Result<FunctionId> {
    digits.parse::<u64>().map(FunctionId).map_err(|_| {
        CollectorError::ConfigSyntax(format!("function identity {digits:?} out of range"))
    })
}
