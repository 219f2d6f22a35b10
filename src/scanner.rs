use std::str;
use std::str::FromStr;

use crate::interner::Symbol;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    And,
    Bang,
    BangEqual,
    Class,
    Comma,
    Dot,
    Else,
    Eof,
    Equal,
    EqualEqual,
    False,
    For,
    Fun,
    Greater,
    GreaterEqual,
    Identifier,
    If,
    LeftBrace,
    LeftParen,
    Less,
    LessEqual,
    Minus,
    Nil,
    Number,
    Or,
    Plus,
    Print,
    Return,
    RightBrace,
    RightParen,
    Semicolon,
    Slash,
    Star,
    String,
    Super,
    This,
    True,
    Var,
    While,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: Symbol,
    pub literal: Option<TokenLiteral>,
    pub line: u64,
}

#[derive(Debug, Clone, Copy)]
pub enum TokenLiteral {
    Number(f64),
    String(Symbol),
}

/// Turns source bytes into a token stream terminated by an EOF token. Scan
/// errors go to the diagnostics sink and scanning carries on, so one pass
/// surfaces as many problems as possible.
pub struct Scanner<'a> {
    source: &'a [u8],
    session: &'a Session,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: u64,
}

impl<'a> Scanner<'a> {
    pub fn new(session: &'a Session, source: &'a [u8]) -> Scanner<'a> {
        Scanner {
            source,
            session,
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
        }
    }

    pub fn scan_tokens(mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }

        self.tokens.push(Token {
            kind: TokenKind::Eof,
            lexeme: self.session.interner.intern(""),
            literal: None,
            line: self.line,
        });

        self.tokens
    }

    fn scan_token(&mut self) {
        let c = self.advance();
        match c {
            b'(' => self.add_token(TokenKind::LeftParen),
            b')' => self.add_token(TokenKind::RightParen),
            b'{' => self.add_token(TokenKind::LeftBrace),
            b'}' => self.add_token(TokenKind::RightBrace),
            b',' => self.add_token(TokenKind::Comma),
            b'.' => self.add_token(TokenKind::Dot),
            b'-' => self.add_token(TokenKind::Minus),
            b'+' => self.add_token(TokenKind::Plus),
            b';' => self.add_token(TokenKind::Semicolon),
            b'*' => self.add_token(TokenKind::Star),
            b'!' => {
                let kind = if self.advance_if(b'=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                };
                self.add_token(kind);
            }
            b'=' => {
                let kind = if self.advance_if(b'=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                };
                self.add_token(kind);
            }
            b'<' => {
                let kind = if self.advance_if(b'=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                };
                self.add_token(kind);
            }
            b'>' => {
                let kind = if self.advance_if(b'=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                };
                self.add_token(kind);
            }
            b'/' => {
                if self.advance_if(b'/') {
                    // Line comment, runs to the end of the line.
                    while self.peek() != b'\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenKind::Slash);
                }
            }
            b' ' | b'\r' | b'\t' => {}
            b'\n' => self.line += 1,
            b'"' => self.string(),
            _ => {
                if is_digit(c) {
                    self.number();
                } else if is_alpha(c) {
                    self.identifier();
                } else {
                    self.session.error(self.line, "Unexpected character.");
                }
            }
        }
    }

    fn identifier(&mut self) {
        while is_alpha_numeric(self.peek()) {
            self.advance();
        }

        let text = &self.source[self.start..self.current];
        let kind = match text {
            b"and" => TokenKind::And,
            b"class" => TokenKind::Class,
            b"else" => TokenKind::Else,
            b"false" => TokenKind::False,
            b"for" => TokenKind::For,
            b"fun" => TokenKind::Fun,
            b"if" => TokenKind::If,
            b"nil" => TokenKind::Nil,
            b"or" => TokenKind::Or,
            b"print" => TokenKind::Print,
            b"return" => TokenKind::Return,
            b"super" => TokenKind::Super,
            b"this" => TokenKind::This,
            b"true" => TokenKind::True,
            b"var" => TokenKind::Var,
            b"while" => TokenKind::While,
            _ => TokenKind::Identifier,
        };

        self.add_token(kind);
    }

    fn number(&mut self) {
        while is_digit(self.peek()) {
            self.advance();
        }

        // A fractional part needs at least one digit after the dot.
        if self.peek() == b'.' && is_digit(self.peek_next()) {
            self.advance();

            while is_digit(self.peek()) {
                self.advance();
            }
        }

        let text = str::from_utf8(&self.source[self.start..self.current])
            .expect("digits are valid utf-8");
        let value = f64::from_str(text).expect("scanned number literal");
        self.add_token_with_literal(TokenKind::Number, TokenLiteral::Number(value));
    }

    fn string(&mut self) {
        while self.peek() != b'"' && !self.is_at_end() {
            if self.peek() == b'\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            self.session.error(self.line, "Unterminated string.");
            return;
        }

        // The closing quote.
        self.advance();

        let value = &self.source[(self.start + 1)..(self.current - 1)];
        let symbol = self
            .session
            .interner
            .intern(str::from_utf8(value).expect("source is valid utf-8"));
        self.add_token_with_literal(TokenKind::String, TokenLiteral::String(symbol));
    }

    fn advance(&mut self) -> u8 {
        let c = self.source[self.current];
        self.current += 1;
        c
    }

    fn advance_if(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.peek() != expected {
            false
        } else {
            self.current += 1;
            true
        }
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.source[self.current]
        }
    }

    fn peek_next(&self) -> u8 {
        if self.current + 1 >= self.source.len() {
            0
        } else {
            self.source[self.current + 1]
        }
    }

    fn add_token(&mut self, kind: TokenKind) {
        let lexeme = str::from_utf8(&self.source[self.start..self.current])
            .expect("source is valid utf-8");
        self.tokens.push(Token {
            kind,
            lexeme: self.session.interner.intern(lexeme),
            literal: None,
            line: self.line,
        });
    }

    fn add_token_with_literal(&mut self, kind: TokenKind, literal: TokenLiteral) {
        self.add_token(kind);
        self.tokens
            .last_mut()
            .expect("token just pushed")
            .literal = Some(literal);
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

fn is_alpha(c: u8) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_uppercase() || c == b'_'
}

fn is_digit(c: u8) -> bool {
    c.is_ascii_digit()
}

fn is_alpha_numeric(c: u8) -> bool {
    is_alpha(c) || is_digit(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(session: &Session, source: &str) -> Vec<Token> {
        Scanner::new(session, source.as_bytes()).scan_tokens()
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|token| token.kind).collect()
    }

    #[test]
    fn scans_declarations_and_operators() {
        use TokenKind::*;

        let session = Session::new();
        let tokens = scan(&session, "var answer = 6 * 7; if (answer >= 42) print answer;");
        assert_eq!(
            kinds(&tokens),
            vec![
                Var, Identifier, Equal, Number, Star, Number, Semicolon, If, LeftParen,
                Identifier, GreaterEqual, Number, RightParen, Print, Identifier, Semicolon, Eof,
            ]
        );
        assert!(!session.diagnostics.had_error());
    }

    #[test]
    fn reserved_words_are_not_identifiers() {
        use TokenKind::*;

        let session = Session::new();
        let tokens = scan(&session, "and class else false for fun if nil or super this true while");
        assert_eq!(
            kinds(&tokens),
            vec![And, Class, Else, False, For, Fun, If, Nil, Or, Super, This, True, While, Eof]
        );
    }

    #[test]
    fn number_literals_keep_their_value() {
        let session = Session::new();
        let tokens = scan(&session, "12.5 7");
        match (tokens[0].literal, tokens[1].literal) {
            (Some(TokenLiteral::Number(a)), Some(TokenLiteral::Number(b))) => {
                assert_eq!(a, 12.5);
                assert_eq!(b, 7.0);
            }
            other => panic!("expected two number literals, got {:?}", other),
        }
    }

    #[test]
    fn string_literal_spans_lines_and_advances_the_counter() {
        let session = Session::new();
        let tokens = scan(&session, "\"one\ntwo\" x");
        match tokens[0].literal {
            Some(TokenLiteral::String(symbol)) => {
                assert_eq!(session.interner.resolve(symbol), "one\ntwo");
            }
            other => panic!("expected a string literal, got {:?}", other),
        }
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn unterminated_string_reports_and_yields_no_token() {
        let session = Session::new();
        let tokens = scan(&session, "\"abc");
        assert_eq!(kinds(&tokens), vec![TokenKind::Eof]);
        assert!(session.diagnostics.had_error());
        assert!(session.diagnostics.reports()[0].contains("Unterminated string."));
    }

    #[test]
    fn unexpected_character_does_not_stop_the_scan() {
        let session = Session::new();
        let tokens = scan(&session, "@ 1");
        assert_eq!(kinds(&tokens), vec![TokenKind::Number, TokenKind::Eof]);
        assert!(session.diagnostics.reports()[0].contains("Unexpected character."));
    }

    #[test]
    fn rescanning_the_lexemes_reproduces_the_token_stream() {
        let session = Session::new();
        let tokens = scan(
            &session,
            "var a = 1; fun f(x) { return x * 2.5; } print \"ok\" + a;",
        );

        let restored = tokens[..tokens.len() - 1]
            .iter()
            .map(|token| session.interner.resolve(token.lexeme))
            .collect::<Vec<_>>()
            .join(" ");
        let rescanned = scan(&session, &restored);

        assert_eq!(kinds(&tokens), kinds(&rescanned));
        let lexemes =
            |tokens: &[Token]| tokens.iter().map(|token| token.lexeme).collect::<Vec<_>>();
        assert_eq!(lexemes(&tokens), lexemes(&rescanned));
    }

    #[test]
    fn comments_and_whitespace_produce_no_tokens() {
        let session = Session::new();
        let tokens = scan(&session, "// nothing here\n1 // trailing\n");
        assert_eq!(kinds(&tokens), vec![TokenKind::Number, TokenKind::Eof]);
        assert_eq!(tokens[0].line, 2);
    }
}
