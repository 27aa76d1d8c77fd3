//! Recursive-descent parser for productions.
//!
//! Each `sp {...}` block is parsed independently. A malformed block yields a
//! [`SyntaxError`] and parsing resumes at the next `sp {`, so one bad
//! production never hides the rest of the corpus. Top-level text that is
//! not a production (residual loader commands) is skipped.

use super::ast::*;
use super::lexer::{Span, Token, TokenKind, tokenize};
use crate::error::{SyntaxError, SyntaxResult};

/// Productions and per-production errors from one source text.
#[derive(Debug, Default)]
pub struct ParseOutput {
    pub productions: Vec<Production>,
    pub errors: Vec<SyntaxError>,
}

/// Parse every production in `src`. `origin` names the source in reports.
pub fn parse_productions(src: &str, origin: &str) -> ParseOutput {
    let tokens = tokenize(src);
    let mut parser = Parser {
        src,
        origin,
        tokens: &tokens,
        pos: 0,
        production: "<top level>".to_string(),
    };
    let mut out = ParseOutput::default();

    while parser.pos < tokens.len() {
        if !parser.at_production_start() {
            parser.pos += 1;
            continue;
        }
        let start = parser.pos;
        match parser.production() {
            Ok(p) => out.productions.push(p),
            Err(e) => {
                tracing::debug!(production = %parser.production, error = %e.message, "skipping malformed production");
                out.errors.push(e);
                parser.pos = start + 2;
                parser.recover();
            }
        }
    }
    out
}

struct Parser<'a> {
    src: &'a str,
    origin: &'a str,
    tokens: &'a [Token],
    pos: usize,
    /// Name of the production being parsed, for error reports.
    production: String,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn peek_at(&self, offset: usize) -> Option<&'a TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn at_production_start(&self) -> bool {
        matches!(self.peek(), Some(TokenKind::Symbol(s)) if s == "sp")
            && matches!(self.peek_at(1), Some(TokenKind::LBrace))
    }

    /// Skip forward to the next `sp {`.
    fn recover(&mut self) {
        while self.pos < self.tokens.len() && !self.at_production_start() {
            self.pos += 1;
        }
    }

    fn current_span(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some(t) => t.span,
            None => Span {
                start: self.src.len(),
                end: self.src.len(),
            },
        }
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        let message = match self.peek() {
            Some(TokenKind::Invalid(text)) => format!("invalid input {text:?}"),
            None => format!("{} (unexpected end of input)", message.into()),
            Some(_) => message.into(),
        };
        SyntaxError::new(
            self.production.clone(),
            message,
            self.origin,
            self.src,
            self.current_span().range(),
        )
    }

    fn bump(&mut self) -> Option<&'a TokenKind> {
        let t = self.tokens.get(self.pos).map(|t| &t.kind);
        self.pos += 1;
        t
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> SyntaxResult<()> {
        if self.peek() == Some(&kind) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    // -----------------------------------------------------------------------
    // Production
    // -----------------------------------------------------------------------

    fn production(&mut self) -> SyntaxResult<Production> {
        self.production = "<top level>".to_string();
        self.pos += 2; // `sp {`

        let name = match self.peek() {
            Some(TokenKind::Symbol(s)) => s.clone(),
            _ => return Err(self.error("expected production name")),
        };
        self.production = name.clone();
        self.pos += 1;

        // documentation and `:o-support`-style flags do not affect the model
        if let Some(TokenKind::Doc(_)) = self.peek() {
            self.pos += 1;
        }
        while let Some(TokenKind::Symbol(s)) = self.peek() {
            if !s.starts_with(':') {
                return Err(self.error("expected `:flag` or a condition"));
            }
            self.pos += 1;
        }

        let mut conditions = Vec::new();
        while self.peek() != Some(&TokenKind::Arrow) {
            self.condition_into(&mut conditions)?;
        }
        if conditions.is_empty() {
            return Err(self.error("production has no conditions"));
        }
        self.expect(TokenKind::Arrow, "`-->`")?;

        let mut actions = Vec::new();
        while self.peek() != Some(&TokenKind::RBrace) {
            actions.push(self.action()?);
        }
        self.expect(TokenKind::RBrace, "`}`")?;

        Ok(Production {
            name,
            conditions,
            actions,
        })
    }

    // -----------------------------------------------------------------------
    // Conditions
    // -----------------------------------------------------------------------

    fn condition_into(&mut self, out: &mut Vec<Condition>) -> SyntaxResult<()> {
        match (self.peek(), self.peek_at(1)) {
            (Some(TokenKind::LParen), _) => {
                self.pos += 1;
                out.push(Condition::Positive(self.id_conditions()?));
            }
            (Some(TokenKind::Minus), Some(TokenKind::LParen)) => {
                self.pos += 2;
                out.push(Condition::Negated(self.id_conditions()?));
            }
            (Some(TokenKind::Minus), Some(TokenKind::LBrace)) => {
                self.pos += 2;
                let mut inner = Vec::new();
                while self.peek() != Some(&TokenKind::RBrace) {
                    self.condition_into(&mut inner)?;
                }
                self.pos += 1;
                out.push(Condition::NegatedConjunction(inner));
            }
            (Some(TokenKind::LBrace), _) => {
                // a positive conjunctive block adds nothing over its members
                self.pos += 1;
                while self.peek() != Some(&TokenKind::RBrace) {
                    self.condition_into(out)?;
                }
                self.pos += 1;
            }
            _ => return Err(self.error("expected a condition")),
        }
        Ok(())
    }

    /// Parses the inside of `( ... )`, consuming the closing paren.
    fn id_conditions(&mut self) -> SyntaxResult<IdConditions> {
        if matches!(self.peek(), Some(TokenKind::Symbol(s)) if s == "state" || s == "impasse") {
            self.pos += 1;
        }
        let id = self.test()?;

        let mut attrs = Vec::new();
        while self.peek() != Some(&TokenKind::RParen) {
            attrs.push(self.attr_value_test()?);
        }
        self.pos += 1;

        Ok(IdConditions { id, attrs })
    }

    fn attr_value_test(&mut self) -> SyntaxResult<AttrValueTest> {
        let negated = if self.peek() == Some(&TokenKind::Minus) {
            self.pos += 1;
            true
        } else {
            false
        };
        self.expect(TokenKind::Caret, "`^attribute`")?;
        let path = self.attr_path()?;

        let mut values = Vec::new();
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(TokenKind::Caret | TokenKind::RParen), _) => break,
                (Some(TokenKind::Minus), Some(TokenKind::Caret)) => break,
                // acceptable-preference test on an operator value
                (Some(TokenKind::Plus), _) => self.pos += 1,
                (None, _) => return Err(self.error("unterminated condition")),
                _ => values.push(self.test()?),
            }
        }

        Ok(AttrValueTest {
            negated,
            path,
            values,
        })
    }

    fn attr_path(&mut self) -> SyntaxResult<Vec<String>> {
        let mut path = vec![self.attr_element()?];
        while self.peek() == Some(&TokenKind::Dot) {
            self.pos += 1;
            path.push(self.attr_element()?);
        }
        Ok(path)
    }

    fn attr_element(&mut self) -> SyntaxResult<String> {
        let elem = match self.peek() {
            Some(TokenKind::Symbol(s)) => s.clone(),
            Some(TokenKind::Int(i)) => i.to_string(),
            Some(TokenKind::Variable(v)) => format!("<{v}>"),
            _ => return Err(self.error("expected attribute name")),
        };
        self.pos += 1;
        Ok(elem)
    }

    fn test(&mut self) -> SyntaxResult<Test> {
        if self.peek() == Some(&TokenKind::LBrace) {
            self.pos += 1;
            let mut tests = Vec::new();
            while self.peek() != Some(&TokenKind::RBrace) {
                if self.peek().is_none() {
                    return Err(self.error("unterminated conjunctive test"));
                }
                tests.push(self.simple_test()?);
            }
            self.pos += 1;
            return Ok(Test::Conjunction(tests));
        }
        self.simple_test()
    }

    fn simple_test(&mut self) -> SyntaxResult<Test> {
        let relation = match self.peek() {
            Some(TokenKind::DisjunctionOpen) => {
                self.pos += 1;
                let mut constants = Vec::new();
                while self.peek() != Some(&TokenKind::DisjunctionClose) {
                    match self.operand()? {
                        Operand::Constant(c) => constants.push(c),
                        Operand::Variable(_) => {
                            self.pos -= 1;
                            return Err(self.error("disjunctions may only contain constants"));
                        }
                    }
                }
                self.pos += 1;
                return Ok(Test::Disjunction(constants));
            }
            Some(TokenKind::Equal) => {
                self.pos += 1;
                return Ok(Test::Equal(self.operand()?));
            }
            Some(TokenKind::NotEqual) => Relation::NotEqual,
            Some(TokenKind::Less) => Relation::Less,
            Some(TokenKind::LessEqual) => Relation::LessEqual,
            Some(TokenKind::Greater) => Relation::Greater,
            Some(TokenKind::GreaterEqual) => Relation::GreaterEqual,
            Some(TokenKind::SameType) => Relation::SameType,
            _ => return Ok(Test::Equal(self.operand()?)),
        };
        self.pos += 1;
        Ok(Test::Relational(relation, self.operand()?))
    }

    fn operand(&mut self) -> SyntaxResult<Operand> {
        let op = match self.peek() {
            Some(TokenKind::Variable(v)) => Operand::Variable(v.clone()),
            _ => match self.constant() {
                Some(c) => Operand::Constant(c),
                None => return Err(self.error("expected a variable or constant")),
            },
        };
        self.pos += 1;
        Ok(op)
    }

    /// The constant at the cursor, without consuming it.
    fn constant(&self) -> Option<Constant> {
        match self.peek()? {
            TokenKind::Int(i) => Some(Constant::Int(*i)),
            TokenKind::Float(x) => Some(Constant::Float(*x)),
            TokenKind::Symbol(s) => Some(Constant::Symbol(s.clone())),
            TokenKind::Quoted(s) => Some(Constant::Quoted(s.clone())),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    fn action(&mut self) -> SyntaxResult<Action> {
        self.expect(TokenKind::LParen, "`(` to start an action")?;
        if let Some(TokenKind::Variable(id)) = self.peek() {
            let id = id.clone();
            self.pos += 1;
            let mut attrs = Vec::new();
            while self.peek() != Some(&TokenKind::RParen) {
                attrs.push(self.attr_value_make()?);
            }
            self.pos += 1;
            return Ok(Action::Make { id, attrs });
        }
        Ok(Action::Call(self.func_call_body()?))
    }

    /// Parses `name args... )` after the opening paren.
    fn func_call_body(&mut self) -> SyntaxResult<FuncCall> {
        let name = match self.bump() {
            Some(TokenKind::Symbol(s)) => s.clone(),
            Some(TokenKind::Plus) => "+".to_string(),
            Some(TokenKind::Minus) => "-".to_string(),
            _ => {
                self.pos -= 1;
                return Err(self.error("expected a function name"));
            }
        };
        let mut args = Vec::new();
        while self.peek() != Some(&TokenKind::RParen) {
            if self.peek().is_none() {
                return Err(self.error("unterminated function call"));
            }
            args.push(self.rhs_value()?);
        }
        self.pos += 1;
        Ok(FuncCall { name, args })
    }

    fn attr_value_make(&mut self) -> SyntaxResult<AttrValueMake> {
        self.expect(TokenKind::Caret, "`^attribute`")?;
        let path = self.attr_path()?;
        let mut values = Vec::new();
        while !matches!(self.peek(), Some(TokenKind::Caret | TokenKind::RParen)) {
            if self.peek().is_none() {
                return Err(self.error("unterminated action"));
            }
            let value = self.rhs_value()?;
            let preferences = self.preferences();
            values.push(ValueMake { value, preferences });
        }
        Ok(AttrValueMake { path, values })
    }

    fn is_value_start(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                TokenKind::Variable(_)
                    | TokenKind::Int(_)
                    | TokenKind::Float(_)
                    | TokenKind::Symbol(_)
                    | TokenKind::Quoted(_)
                    | TokenKind::LParen
            )
        )
    }

    fn rhs_value(&mut self) -> SyntaxResult<RhsValue> {
        if self.peek() == Some(&TokenKind::LParen) {
            self.pos += 1;
            return Ok(RhsValue::Call(self.func_call_body()?));
        }
        Ok(match self.operand()? {
            Operand::Variable(v) => RhsValue::Variable(v),
            Operand::Constant(c) => RhsValue::Constant(c),
        })
    }

    fn preferences(&mut self) -> Vec<Preference> {
        let mut prefs = Vec::new();
        loop {
            let pref = match (self.peek(), self.peek_at(1)) {
                (Some(TokenKind::Plus), _) => Preference::Acceptable,
                (Some(TokenKind::Minus), Some(TokenKind::Caret)) => break,
                (Some(TokenKind::Minus), _) => Preference::Reject,
                (Some(TokenKind::Bang), _) => Preference::Require,
                (Some(TokenKind::Tilde), _) => Preference::Prohibit,
                (Some(TokenKind::At), _) => Preference::Reconsider,
                (Some(TokenKind::Amp), _) => Preference::Parallel,
                (Some(TokenKind::Greater | TokenKind::Less | TokenKind::Equal), _) => {
                    let kind = self.bump().cloned();
                    let referent = if self.is_value_start() {
                        self.rhs_value().ok()
                    } else {
                        None
                    };
                    prefs.push(match (kind, referent) {
                        (Some(TokenKind::Greater), None) => Preference::Best,
                        (Some(TokenKind::Greater), r) => Preference::Better(r),
                        (Some(TokenKind::Less), None) => Preference::Worst,
                        (Some(TokenKind::Less), r) => Preference::Worse(r),
                        (_, r) => Preference::Indifferent(r),
                    });
                    continue;
                }
                _ => break,
            };
            self.pos += 1;
            prefs.push(pref);
        }
        prefs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(src: &str) -> Production {
        let out = parse_productions(src, "test.soar");
        assert!(out.errors.is_empty(), "unexpected errors: {:?}", out.errors);
        assert_eq!(out.productions.len(), 1);
        out.productions.into_iter().next().unwrap()
    }

    #[test]
    fn parses_full_production() {
        let p = parse_one(
            r#"sp {propose*scan
                 "Scan the display"
                 :o-support
                 (state <s> ^action-state 3 ^io.input-link <il> -^blocked)
                 (<il> ^mode << 1 2 >> ^count { <c> > 3 })
                 -(<s> ^done yes)
               -->
                 (<s> ^operator <o> + =)
                 (<o> ^name scan)
                 (<s> ^count (+ <c> 1) ^old value -)
                 (write |scanning| (crlf))
               }"#,
        );
        assert_eq!(p.name, "propose*scan");
        assert_eq!(p.conditions.len(), 3);

        let Condition::Positive(first) = &p.conditions[0] else {
            panic!("expected positive condition");
        };
        assert_eq!(first.id, Test::Equal(Operand::Variable("s".into())));
        assert_eq!(first.attrs[1].path, vec!["io", "input-link"]);
        assert!(first.attrs[2].negated);
        assert!(first.attrs[2].values.is_empty());

        let Condition::Positive(second) = &p.conditions[1] else {
            panic!("expected positive condition");
        };
        assert_eq!(
            second.attrs[0].values,
            vec![Test::Disjunction(vec![Constant::Int(1), Constant::Int(2)])]
        );
        assert!(matches!(second.attrs[1].values[0], Test::Conjunction(_)));
        assert!(matches!(p.conditions[2], Condition::Negated(_)));

        assert_eq!(p.actions.len(), 4);
        let Action::Make { attrs, .. } = &p.actions[0] else {
            panic!("expected make action");
        };
        assert_eq!(
            attrs[0].values[0].preferences,
            vec![Preference::Acceptable, Preference::Indifferent(None)]
        );
        let Action::Make { attrs, .. } = &p.actions[2] else {
            panic!("expected make action");
        };
        assert!(matches!(&attrs[0].values[0].value, RhsValue::Call(c) if c.increment_of() == Some("c")));
        assert_eq!(attrs[1].values[0].preferences, vec![Preference::Reject]);
        assert!(matches!(&p.actions[3], Action::Call(c) if c.name == "write"));
    }

    #[test]
    fn negated_conjunction_and_numeric_indifference() {
        let p = parse_one(
            "sp {apply*x (state <s> ^operator <o>) -{ (<s> ^a 1) (<s> ^b 2) } --> (<s> ^operator <o> = 0.3)}",
        );
        let Condition::NegatedConjunction(inner) = &p.conditions[1] else {
            panic!("expected negated conjunction");
        };
        assert_eq!(inner.len(), 2);
        let Action::Make { attrs, .. } = &p.actions[0] else {
            panic!("expected make action");
        };
        assert_eq!(
            attrs[0].values[0].preferences,
            vec![Preference::Indifferent(Some(RhsValue::Constant(Constant::Float(0.3))))]
        );
    }

    #[test]
    fn malformed_production_recovers_at_next() {
        let src = "sp {bad (state <s> ^a 1) (<s> ^b ] }\n\
                   sp {good (state <s> ^a 1) --> (<s> ^b 2)}";
        let out = parse_productions(src, "test.soar");
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].production, "bad");
        assert_eq!(out.productions.len(), 1);
        assert_eq!(out.productions[0].name, "good");
    }

    #[test]
    fn top_level_commands_are_skipped() {
        let src = "source other.soar\nwatch 5\nsp {r (state <s> ^x 1) --> (<s> ^y 2)}";
        let out = parse_productions(src, "test.soar");
        assert!(out.errors.is_empty());
        assert_eq!(out.productions.len(), 1);
    }

    #[test]
    fn missing_arrow_is_reported_at_end() {
        let out = parse_productions("sp {r (state <s> ^x 1)", "test.soar");
        assert_eq!(out.errors.len(), 1);
        assert!(out.productions.is_empty());
    }
}
