use std::rc::Rc;

use crate::errors::CodePosition;
use crate::token::{Token, TokenKind};

pub trait TokenSource {
    fn scan_token(&mut self) -> Token;
}

/// Hand-written character scanner. Holds no lookahead of its own; the
/// parser keeps the `previous`/`current` pair and drives `scan_token` one
/// token at a time.
pub struct Scanner {
    line: usize,
    code: Rc<Vec<char>>,
    start_idx: usize,
    current_idx: usize,
}

impl Scanner {
    pub fn new(code: Rc<Vec<char>>) -> Self {
        Self {
            line: 1,
            code,
            start_idx: 0,
            current_idx: 0,
        }
    }

    fn is_at_end(&self) -> bool {
        self.current_idx >= self.code.len()
    }

    fn peek_char(&self) -> Option<char> {
        self.code.get(self.current_idx).copied()
    }

    fn peek_next_char(&self) -> Option<char> {
        self.code.get(self.current_idx + 1).copied()
    }

    fn advance_char(&mut self) -> Option<char> {
        let ch = self.peek_char();
        if ch.is_some() {
            self.current_idx += 1;
        }
        ch
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek_char() != Some(expected) {
            return false;
        }
        self.current_idx += 1;
        true
    }

    fn current_lexeme(&self) -> String {
        self.code[self.start_idx..self.current_idx].iter().collect()
    }

    fn skip_whitespace(&mut self) {
        loop {
            match self.peek_char() {
                Some(' ') | Some('\r') | Some('\t') => {
                    self.current_idx += 1;
                }
                Some('\n') => {
                    self.line += 1;
                    self.current_idx += 1;
                }
                Some('/') if self.peek_next_char() == Some('/') => {
                    self.skip_comment_line();
                }
                _ => break,
            }
        }
    }

    fn skip_comment_line(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == '\n' {
                break;
            }
            self.current_idx += 1;
        }
    }

    fn code_position(&self) -> CodePosition {
        CodePosition {
            line: self.line,
            absolute_index: self.start_idx,
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token {
            kind,
            lexeme: self.current_lexeme(),
            position: self.code_position(),
        }
    }

    fn make_error_token(&self, message: &str) -> Token {
        Token {
            kind: TokenKind::Error,
            lexeme: message.to_string(),
            position: self.code_position(),
        }
    }

    fn advance_string_token(&mut self) -> Token {
        while let Some(ch) = self.peek_char() {
            if ch == '"' {
                break;
            }
            if ch == '\n' {
                self.line += 1;
            }
            self.current_idx += 1;
        }
        if self.is_at_end() {
            return self.make_error_token("Unterminated string");
        }
        self.current_idx += 1; // closing quote
        self.make_token(TokenKind::String)
    }

    fn advance_number_token(&mut self) -> Token {
        while self.peek_char().is_some_and(is_digit) {
            self.current_idx += 1;
        }
        if self.peek_char() == Some('.') && self.peek_next_char().is_some_and(is_digit) {
            self.current_idx += 1;
            while self.peek_char().is_some_and(is_digit) {
                self.current_idx += 1;
            }
        }
        self.make_token(TokenKind::Number)
    }

    fn advance_identifier(&mut self) -> Token {
        while self.peek_char().is_some_and(is_alphanumeric) {
            self.current_idx += 1;
        }
        let lexeme = self.current_lexeme();
        let kind = keyword_kind(&lexeme).unwrap_or(TokenKind::Identifier);
        self.make_token(kind)
    }
}

impl TokenSource for Scanner {
    fn scan_token(&mut self) -> Token {
        self.skip_whitespace();
        self.start_idx = self.current_idx;

        let Some(ch) = self.advance_char() else {
            return self.make_token(TokenKind::Eof);
        };

        if is_alphabetic(ch) {
            return self.advance_identifier();
        }
        if is_digit(ch) {
            return self.advance_number_token();
        }

        match ch {
            '(' => self.make_token(TokenKind::LeftParen),
            ')' => self.make_token(TokenKind::RightParen),
            '{' => self.make_token(TokenKind::LeftBrace),
            '}' => self.make_token(TokenKind::RightBrace),
            ',' => self.make_token(TokenKind::Comma),
            '.' => self.make_token(TokenKind::Dot),
            '-' => self.make_token(TokenKind::Minus),
            '+' => self.make_token(TokenKind::Plus),
            ';' => self.make_token(TokenKind::Semicolon),
            '%' => self.make_token(TokenKind::Percent),
            '/' => self.make_token(TokenKind::Slash),
            '*' => {
                let kind = if self.match_char('*') {
                    TokenKind::StarStar
                } else {
                    TokenKind::Star
                };
                self.make_token(kind)
            }
            '!' => {
                let kind = if self.match_char('=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                };
                self.make_token(kind)
            }
            '=' => {
                let kind = if self.match_char('=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                };
                self.make_token(kind)
            }
            '<' => {
                let kind = if self.match_char('=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                };
                self.make_token(kind)
            }
            '>' => {
                let kind = if self.match_char('=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                };
                self.make_token(kind)
            }
            ':' => {
                let kind = if self.match_char('=') {
                    TokenKind::ColonEqual
                } else {
                    TokenKind::Colon
                };
                self.make_token(kind)
            }
            '"' => self.advance_string_token(),
            _ => self.make_error_token("Unexpected character"),
        }
    }
}

fn is_digit(ch: char) -> bool {
    ch.is_ascii_digit()
}

fn is_alphabetic(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_alphanumeric(ch: char) -> bool {
    is_alphabetic(ch) || is_digit(ch)
}

fn keyword_kind(lexeme: &str) -> Option<TokenKind> {
    Some(match lexeme {
        "and" => TokenKind::And,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "else" => TokenKind::Else,
        "false" => TokenKind::False,
        "for" => TokenKind::For,
        "func" => TokenKind::Func,
        "have" => TokenKind::Have,
        "if" => TokenKind::If,
        "info" => TokenKind::Info,
        "nil" => TokenKind::Nil,
        "or" => TokenKind::Or,
        "return" => TokenKind::Return,
        "true" => TokenKind::True,
        "using" => TokenKind::Using,
        "while" => TokenKind::While,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(src: &str) -> Vec<TokenKind> {
        let code: Rc<Vec<char>> = Rc::new(src.chars().collect());
        let mut scanner = Scanner::new(code);
        let mut kinds = Vec::new();
        loop {
            let token = scanner.scan_token();
            let done = token.kind == TokenKind::Eof;
            kinds.push(token.kind);
            if done {
                break;
            }
        }
        kinds
    }

    #[test]
    fn single_char_tokens() {
        assert_eq!(
            scan_all("(){},.-+;%/*"),
            vec![
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
                TokenKind::Comma,
                TokenKind::Dot,
                TokenKind::Minus,
                TokenKind::Plus,
                TokenKind::Semicolon,
                TokenKind::Percent,
                TokenKind::Slash,
                TokenKind::Star,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn double_char_tokens() {
        assert_eq!(
            scan_all("!= == <= >= := **"),
            vec![
                TokenKind::BangEqual,
                TokenKind::EqualEqual,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::ColonEqual,
                TokenKind::StarStar,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn skips_whitespace_and_comments() {
        assert_eq!(
            scan_all("  // a comment\n  + // trailing\n"),
            vec![TokenKind::Plus, TokenKind::Eof]
        );
    }

    #[test]
    fn string_literal() {
        let code: Rc<Vec<char>> = Rc::new("\"hello\"".chars().collect());
        let mut scanner = Scanner::new(code);
        let token = scanner.scan_token();
        assert_eq!(token.kind, TokenKind::String);
        assert_eq!(token.lexeme, "\"hello\"");
    }

    #[test]
    fn unterminated_string_is_error() {
        let code: Rc<Vec<char>> = Rc::new("\"hello".chars().collect());
        let mut scanner = Scanner::new(code);
        assert_eq!(scanner.scan_token().kind, TokenKind::Error);
    }

    #[test]
    fn number_literals() {
        let code: Rc<Vec<char>> = Rc::new("123 4.5".chars().collect());
        let mut scanner = Scanner::new(code);
        let a = scanner.scan_token();
        assert_eq!(a.kind, TokenKind::Number);
        assert_eq!(a.lexeme, "123");
        let b = scanner.scan_token();
        assert_eq!(b.kind, TokenKind::Number);
        assert_eq!(b.lexeme, "4.5");
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            scan_all("func have info using if else while for break continue return and or true false nil x"),
            vec![
                TokenKind::Func,
                TokenKind::Have,
                TokenKind::Info,
                TokenKind::Using,
                TokenKind::If,
                TokenKind::Else,
                TokenKind::While,
                TokenKind::For,
                TokenKind::Break,
                TokenKind::Continue,
                TokenKind::Return,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::True,
                TokenKind::False,
                TokenKind::Nil,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn line_tracking_across_newlines() {
        let code: Rc<Vec<char>> = Rc::new("a\nb\nc".chars().collect());
        let mut scanner = Scanner::new(code);
        assert_eq!(scanner.scan_token().position.line, 1);
        assert_eq!(scanner.scan_token().position.line, 2);
        assert_eq!(scanner.scan_token().position.line, 3);
    }
}
