//! Tokenizer for flattened production text.
//!
//! Produces a flat token stream with byte spans. Characters that cannot
//! start any token (and unterminated quotes) become [`TokenKind::Invalid`]
//! tokens instead of aborting, so the parser can report them against the
//! enclosing production and resume at the next one.

/// Byte-level source span for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn range(self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LBrace,
    RBrace,
    LParen,
    RParen,
    Caret,
    Dot,
    Minus,
    Plus,
    Arrow,
    /// `<<`
    DisjunctionOpen,
    /// `>>`
    DisjunctionClose,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    /// `<=>`
    SameType,
    Equal,
    Bang,
    Tilde,
    At,
    Amp,
    /// `<name>`, stored without the brackets.
    Variable(String),
    Int(i64),
    Float(f64),
    Symbol(String),
    /// `|text|`, stored without the bars.
    Quoted(String),
    /// `"text"`, stored without the quotes.
    Doc(String),
    /// An unrecognised character or unterminated literal.
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

fn is_symbol_start(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '*' | ':' | '/' | '$' | '%' | '?')
}

fn is_symbol_char(c: char) -> bool {
    is_symbol_start(c) || c == '-'
}

fn is_variable_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '*')
}

/// Tokenize production text.
pub fn tokenize(input: &str) -> Vec<Token> {
    Lexer::new(input).run()
}

struct Lexer<'a> {
    src: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().collect(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).map(|&(_, c)| c)
    }

    fn offset_of(&self, idx: usize) -> usize {
        self.chars.get(idx).map_or(self.src.len(), |&(o, _)| o)
    }

    fn push(&mut self, kind: TokenKind, len: usize) {
        let start = self.offset_of(self.pos);
        self.pos += len;
        let end = self.offset_of(self.pos);
        self.tokens.push(Token {
            kind,
            span: Span { start, end },
        });
    }

    fn run(mut self) -> Vec<Token> {
        while let Some(c) = self.peek_at(0) {
            match c {
                c if c.is_whitespace() || c == ',' => self.pos += 1,
                '#' => {
                    while let Some(c) = self.peek_at(0) {
                        if c == '\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                '{' => self.push(TokenKind::LBrace, 1),
                '}' => self.push(TokenKind::RBrace, 1),
                '(' => self.push(TokenKind::LParen, 1),
                ')' => self.push(TokenKind::RParen, 1),
                '^' => self.push(TokenKind::Caret, 1),
                '.' => self.push(TokenKind::Dot, 1),
                '+' => self.push(TokenKind::Plus, 1),
                '=' => self.push(TokenKind::Equal, 1),
                '!' => self.push(TokenKind::Bang, 1),
                '~' => self.push(TokenKind::Tilde, 1),
                '@' => self.push(TokenKind::At, 1),
                '&' => self.push(TokenKind::Amp, 1),
                '|' => self.delimited('|'),
                '"' => self.delimited('"'),
                '<' => self.less(),
                '>' => match self.peek_at(1) {
                    Some('>') => self.push(TokenKind::DisjunctionClose, 2),
                    Some('=') => self.push(TokenKind::GreaterEqual, 2),
                    _ => self.push(TokenKind::Greater, 1),
                },
                '-' => match (self.peek_at(1), self.peek_at(2)) {
                    (Some('-'), Some('>')) => self.push(TokenKind::Arrow, 3),
                    (Some(d), _) if d.is_ascii_digit() => self.word(),
                    _ => self.push(TokenKind::Minus, 1),
                },
                c if is_symbol_start(c) => self.word(),
                other => self.push(TokenKind::Invalid(other.to_string()), 1),
            }
        }
        self.tokens
    }

    fn less(&mut self) {
        match (self.peek_at(1), self.peek_at(2)) {
            (Some('<'), _) => self.push(TokenKind::DisjunctionOpen, 2),
            (Some('>'), _) => self.push(TokenKind::NotEqual, 2),
            (Some('='), Some('>')) => self.push(TokenKind::SameType, 3),
            (Some('='), _) => self.push(TokenKind::LessEqual, 2),
            (Some(c), _) if is_variable_char(c) => {
                let mut len = 1;
                while self.peek_at(len).is_some_and(is_variable_char) {
                    len += 1;
                }
                if self.peek_at(len) == Some('>') {
                    let name: String = self.chars[self.pos + 1..self.pos + len]
                        .iter()
                        .map(|&(_, c)| c)
                        .collect();
                    self.push(TokenKind::Variable(name), len + 1);
                } else {
                    self.push(TokenKind::Less, 1);
                }
            }
            _ => self.push(TokenKind::Less, 1),
        }
    }

    fn delimited(&mut self, delim: char) {
        let mut len = 1;
        loop {
            match self.peek_at(len) {
                Some(c) if c == delim => break,
                // `\|` and `\"` escape the delimiter
                Some('\\') if self.peek_at(len + 1) == Some(delim) => len += 2,
                Some(_) => len += 1,
                None => {
                    let text: String = self.chars[self.pos..].iter().map(|&(_, c)| c).collect();
                    self.push(TokenKind::Invalid(text), len);
                    return;
                }
            }
        }
        let text: String = self.chars[self.pos + 1..self.pos + len]
            .iter()
            .map(|&(_, c)| c)
            .collect();
        let text = text.replace(&format!("\\{delim}"), &delim.to_string());
        let kind = if delim == '|' {
            TokenKind::Quoted(text)
        } else {
            TokenKind::Doc(text)
        };
        self.push(kind, len + 1);
    }

    /// A run of symbol characters, classified as integer, real or symbol.
    fn word(&mut self) {
        let mut len = 1;
        let mut numeric_prefix = self.peek_at(0).is_some_and(|c| c.is_ascii_digit() || c == '-');
        let mut seen_dot = false;
        loop {
            match self.peek_at(len) {
                Some('.')
                    if numeric_prefix
                        && !seen_dot
                        && self.peek_at(len + 1).is_some_and(|c| c.is_ascii_digit()) =>
                {
                    seen_dot = true;
                    len += 1;
                }
                Some(c) if is_symbol_char(c) => {
                    numeric_prefix &= c.is_ascii_digit();
                    len += 1;
                }
                _ => break,
            }
        }
        let text: String = self.chars[self.pos..self.pos + len]
            .iter()
            .map(|&(_, c)| c)
            .collect();
        self.push(classify(&text), len);
    }
}

fn classify(text: &str) -> TokenKind {
    if let Ok(i) = text.parse::<i64>() {
        return TokenKind::Int(i);
    }
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.contains('.') && digits.chars().all(|c| c.is_ascii_digit() || c == '.') {
        if let Ok(x) = text.parse::<f64>() {
            return TokenKind::Float(x);
        }
    }
    TokenKind::Symbol(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tokenize_production_skeleton() {
        let k = kinds("sp {propose*wait (state <s> ^io <io>) --> (<s> ^operator <o> +)}");
        assert_eq!(k[0], TokenKind::Symbol("sp".into()));
        assert_eq!(k[1], TokenKind::LBrace);
        assert_eq!(k[2], TokenKind::Symbol("propose*wait".into()));
        assert_eq!(k[4], TokenKind::Symbol("state".into()));
        assert_eq!(k[5], TokenKind::Variable("s".into()));
        assert!(k.contains(&TokenKind::Arrow));
        assert!(k.contains(&TokenKind::Plus));
        assert_eq!(k.last(), Some(&TokenKind::RBrace));
    }

    #[test]
    fn angle_brackets_disambiguate() {
        assert_eq!(
            kinds("<< a b >> <> <= < 3 >= > <=> <x-1>"),
            vec![
                TokenKind::DisjunctionOpen,
                TokenKind::Symbol("a".into()),
                TokenKind::Symbol("b".into()),
                TokenKind::DisjunctionClose,
                TokenKind::NotEqual,
                TokenKind::LessEqual,
                TokenKind::Less,
                TokenKind::Int(3),
                TokenKind::GreaterEqual,
                TokenKind::Greater,
                TokenKind::SameType,
                TokenKind::Variable("x-1".into()),
            ]
        );
    }

    #[test]
    fn numbers_and_hyphenated_symbols() {
        assert_eq!(
            kinds("-3 0.25 -0.5 time-counter 1st -^a"),
            vec![
                TokenKind::Int(-3),
                TokenKind::Float(0.25),
                TokenKind::Float(-0.5),
                TokenKind::Symbol("time-counter".into()),
                TokenKind::Symbol("1st".into()),
                TokenKind::Minus,
                TokenKind::Caret,
                TokenKind::Symbol("a".into()),
            ]
        );
    }

    #[test]
    fn dotted_path_is_not_a_float() {
        assert_eq!(
            kinds("^io.input-link"),
            vec![
                TokenKind::Caret,
                TokenKind::Symbol("io".into()),
                TokenKind::Dot,
                TokenKind::Symbol("input-link".into()),
            ]
        );
    }

    #[test]
    fn quoted_doc_and_comments() {
        let k = kinds("# comment\n\"doc text\" |hello world| :o-support");
        assert_eq!(
            k,
            vec![
                TokenKind::Doc("doc text".into()),
                TokenKind::Quoted("hello world".into()),
                TokenKind::Symbol(":o-support".into()),
            ]
        );
    }

    #[test]
    fn unterminated_quote_is_invalid() {
        let toks = tokenize("(write |oops");
        assert!(matches!(toks.last().map(|t| &t.kind), Some(TokenKind::Invalid(_))));
        assert_eq!(toks.last().map(|t| t.span.end), Some(12));
    }

    #[test]
    fn spans_are_byte_offsets() {
        let toks = tokenize("sp {a}");
        assert_eq!(toks[2].span, Span { start: 4, end: 5 });
    }
}
