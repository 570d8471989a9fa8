//! Recursive-descent parser for instruction strings.

use super::ast::*;
use super::lexer::{parse_number, Lexer, Token, TokenKind};
use crate::error::{CyclerError, Result};
use crate::step::{Event, Termination};
use crate::units::{to_seconds, Unit};

/// Parser for one instruction string.
pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    /// Tokenize `source` and prepare to parse it.
    pub fn new(source: &'a str) -> Result<Self> {
        let tokens = Lexer::new(source).tokenize()?;
        Ok(Self {
            source,
            tokens,
            pos: 0,
        })
    }

    /// Parse the instruction.
    pub fn parse(&mut self) -> Result<ParsedInstruction> {
        let period = self.split_period_override()?;

        let verb_token = self.current().clone();
        let verb = match verb_token.kind {
            TokenKind::Word => Verb::from_word(&verb_token.text),
            _ => None,
        }
        .ok_or_else(|| CyclerError::unknown_instruction(self.source))?;
        self.advance();

        let operation = match verb {
            Verb::Run => self.parse_run()?,
            Verb::Rest => self.parse_rest()?,
            _ => self.parse_constant(verb)?,
        };

        if self.current().kind != TokenKind::Eof {
            return Err(self.error(format!("unexpected '{}'", self.current().text)));
        }

        Ok(ParsedInstruction { operation, period })
    }

    /// Parse a standalone time span such as `20 seconds`, in seconds.
    pub fn parse_time_span(&mut self) -> Result<f64> {
        let seconds = self.parse_duration()?;
        if self.current().kind != TokenKind::Eof {
            return Err(self.error(format!("unexpected '{}'", self.current().text)));
        }
        Ok(seconds)
    }

    fn current(&self) -> &Token {
        // The token list always ends with Eof and `advance` never moves past it
        &self.tokens[self.pos]
    }

    fn peek(&self) -> &Token {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn error(&self, message: impl Into<String>) -> CyclerError {
        CyclerError::invalid_instruction(self.source, message)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.current().is_keyword(keyword)
    }

    fn contains_keyword(&self, keyword: &str) -> bool {
        self.tokens[self.pos..].iter().any(|t| t.is_keyword(keyword))
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.at_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "expected '{}', found '{}'",
                keyword,
                self.current().text
            )))
        }
    }

    /// Strip a trailing `(<n> <time unit> period)` and return its length in seconds.
    fn split_period_override(&mut self) -> Result<Option<f64>> {
        let Some(open) = self
            .tokens
            .iter()
            .position(|t| t.kind == TokenKind::OpenParen)
        else {
            return Ok(None);
        };

        let group = &self.tokens[open..];
        let well_formed = group.len() == 6
            && group[1].kind == TokenKind::Number
            && group[2].kind == TokenKind::Word
            && group[3].is_keyword("period")
            && group[4].kind == TokenKind::CloseParen;
        if !well_formed {
            return Err(self.error("period must be written as '(<number> <time unit> period)'"));
        }

        let value = parse_number(&group[1].text)
            .ok_or_else(|| self.error(format!("invalid number '{}'", group[1].text)))?;
        let seconds = to_seconds(value, &group[2].text)?;
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(self.error("period must be a positive finite time"));
        }

        let eof = self.tokens[self.tokens.len() - 1].clone();
        self.tokens.truncate(open);
        self.tokens.push(eof);
        Ok(Some(seconds))
    }

    /// `Discharge|Charge|Hold at <quantity> <termination>`
    fn parse_constant(&mut self, verb: Verb) -> Result<Operation> {
        if !self.contains_keyword("for") && !self.contains_keyword("until") {
            return Err(CyclerError::MissingTermination {
                instruction: self.source.to_string(),
            });
        }
        if !self.at_keyword("at") || self.peek().is_keyword("at") {
            return Err(CyclerError::unknown_instruction(self.source));
        }
        self.advance();

        let quantity = self.parse_quantity()?;
        let termination = self.parse_termination()?;
        Ok(Operation::Constant {
            verb,
            quantity: Quantity {
                value: verb.signed(quantity.value),
                unit: quantity.unit,
            },
            termination,
        })
    }

    /// `Rest for <duration>`
    fn parse_rest(&mut self) -> Result<Operation> {
        if self.at_keyword("at") {
            return Err(self.error("rest steps take no operating value"));
        }
        if !self.at_keyword("for") {
            return Err(self.error("rest steps need a fixed duration, e.g. 'Rest for 10 minutes'"));
        }
        self.advance();
        let seconds = self.parse_duration()?;
        Ok(Operation::Rest { seconds })
    }

    /// `Run <name> [for <duration>]`
    fn parse_run(&mut self) -> Result<Operation> {
        if self.at_keyword("at") {
            return Err(CyclerError::unknown_instruction(self.source));
        }
        let name = match self.current().kind {
            TokenKind::Word => self.current().text.clone(),
            _ => return Err(self.error("expected a drive cycle name after 'Run'")),
        };
        self.advance();

        let seconds = if self.at_keyword("for") {
            self.advance();
            Some(self.parse_duration()?)
        } else if self.at_keyword("until") {
            return Err(self.error("drive cycle steps cannot end on a condition"));
        } else {
            None
        };
        Ok(Operation::Drive { name, seconds })
    }

    /// `for <duration> [or until <quantity>]` or `until <quantity>`
    fn parse_termination(&mut self) -> Result<Termination> {
        if self.at_keyword("for") {
            self.advance();
            let seconds = self.parse_duration()?;
            if self.at_keyword("or") {
                self.advance();
                self.expect_keyword("until")?;
                let event = self.parse_event()?;
                return Ok(Termination::DurationOrEvent { seconds, event });
            }
            Ok(Termination::Duration { seconds })
        } else if self.at_keyword("until") {
            self.advance();
            let event = self.parse_event()?;
            Ok(Termination::Event { event })
        } else {
            Err(self.error(format!(
                "expected 'for' or 'until', found '{}'",
                self.current().text
            )))
        }
    }

    fn parse_number(&mut self) -> Result<f64> {
        let token = self.current().clone();
        if token.kind != TokenKind::Number {
            return Err(self.error(format!("expected a number, found '{}'", token.text)));
        }
        let value = parse_number(&token.text)
            .ok_or_else(|| self.error(format!("invalid number '{}'", token.text)))?;
        self.advance();
        Ok(value)
    }

    /// `<number> <time unit>`, converted to seconds.
    fn parse_duration(&mut self) -> Result<f64> {
        let value = self.parse_number()?;
        let unit = self.current().clone();
        if unit.kind != TokenKind::Word {
            return Err(CyclerError::UnknownTimeUnit { unit: unit.text });
        }
        self.advance();

        let seconds = to_seconds(value, &unit.text)?;
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(self.error("duration must be a positive finite time"));
        }
        Ok(seconds)
    }

    /// `<number> <unit>` or the C-rate fraction `C/<n>`.
    fn parse_quantity(&mut self) -> Result<Quantity> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Number => {
                let value = self.parse_number()?;
                let unit = self.current().clone();
                let (unit, divisor) = match unit.kind {
                    TokenKind::Word => Unit::from_token(&unit.text),
                    _ => None,
                }
                .ok_or(CyclerError::UnknownUnit { unit: unit.text })?;
                self.advance();
                Ok(Quantity {
                    value: value / divisor,
                    unit,
                })
            }
            TokenKind::Word if token.text == "C" && self.peek().kind == TokenKind::Slash => {
                self.advance();
                self.advance();
                let divisor = self.parse_number()?;
                if divisor == 0.0 {
                    return Err(self.error("C-rate divisor must be non-zero"));
                }
                Ok(Quantity {
                    value: 1.0 / divisor,
                    unit: Unit::CRate,
                })
            }
            _ => Err(self.error(format!("expected a value, found '{}'", token.text))),
        }
    }

    fn parse_event(&mut self) -> Result<Event> {
        let quantity = self.parse_quantity()?;
        if !quantity.unit.is_event_unit() {
            return Err(CyclerError::UnknownEventUnit {
                unit: quantity.unit.to_string(),
            });
        }
        Ok(Event::new(quantity.value, quantity.unit))
    }
}
