//! Hand-rolled lexer.
//!
//! Lex errors never abort: a diagnostic is recorded and scanning
//! continues, so a stray character does not hide later problems.

use crate::diagnostic::{Category, Diagnostic};
use crate::source::{FileName, Span};
use crate::syntax::token::{Token, TokenKind};

/// Lex a source string into tokens.
///
/// The token stream always ends with a single [`TokenKind::Eof`] token.
pub fn lex(file: FileName, source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut lexer = Lexer {
        file,
        bytes: source.as_bytes(),
        pos: 0,
        tokens: Vec::new(),
        diagnostics: Vec::new(),
    };
    lexer.run();
    (lexer.tokens, lexer.diagnostics)
}

struct Lexer<'src> {
    file: FileName,
    bytes: &'src [u8],
    pos: usize,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

impl Lexer<'_> {
    fn run(&mut self) {
        loop {
            self.skip_trivia();
            let start = self.pos;
            let Some(b) = self.peek() else {
                self.push(TokenKind::Eof, start);
                break;
            };

            match b {
                b'{' => self.single(TokenKind::LBrace),
                b'}' => self.single(TokenKind::RBrace),
                b'(' => self.single(TokenKind::LParen),
                b')' => self.single(TokenKind::RParen),
                b'<' => self.single(TokenKind::Lt),
                b'>' => self.single(TokenKind::Gt),
                b',' => self.single(TokenKind::Comma),
                b';' => self.single(TokenKind::Semi),
                b':' => self.single(TokenKind::Colon),
                b'.' => self.single(TokenKind::Dot),
                b'&' => self.single(TokenKind::Amp),
                b'|' => self.single(TokenKind::Pipe),
                b'=' => {
                    self.bump();
                    if self.peek() == Some(b'>') {
                        self.bump();
                        self.push(TokenKind::FatArrow, start);
                    } else {
                        self.push(TokenKind::Eq, start);
                    }
                }
                b'-' => {
                    self.bump();
                    if self.peek() == Some(b'>') {
                        self.bump();
                        self.push(TokenKind::ThinArrow, start);
                    } else {
                        self.error(start, "stray `-`; did you mean `->`?");
                    }
                }
                b'"' => self.string(start),
                b'0'..=b'9' => self.number(start),
                b'A'..=b'Z' | b'a'..=b'z' | b'_' => self.ident(start),
                _ => {
                    // Skip a full UTF-8 character, not just one byte.
                    let ch_len = utf8_len(b);
                    self.pos = (self.pos + ch_len).min(self.bytes.len());
                    let text = String::from_utf8_lossy(&self.bytes[start..self.pos]);
                    self.error(start, format!("unexpected character `{text}`"));
                }
            }
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n') => {
                    self.bump();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn string(&mut self, start: usize) {
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    self.error(start, "unterminated string literal");
                    break;
                }
                Some(b'"') => {
                    self.bump();
                    break;
                }
                Some(b'\\') => {
                    self.bump();
                    match self.peek() {
                        Some(b'n') => {
                            value.push('\n');
                            self.bump();
                        }
                        Some(b't') => {
                            value.push('\t');
                            self.bump();
                        }
                        Some(b'\\') => {
                            value.push('\\');
                            self.bump();
                        }
                        Some(b'"') => {
                            value.push('"');
                            self.bump();
                        }
                        _ => {
                            self.error(self.pos.saturating_sub(1), "unknown escape sequence");
                            self.bump();
                        }
                    }
                }
                Some(b) => {
                    let len = utf8_len(b);
                    let end = (self.pos + len).min(self.bytes.len());
                    value.push_str(&String::from_utf8_lossy(&self.bytes[self.pos..end]));
                    self.pos = end;
                }
            }
        }
        self.push(TokenKind::Str(value), start);
    }

    fn number(&mut self, start: usize) {
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.bump();
        }
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            self.bump();
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.bump();
            }
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos])
            .unwrap_or_default()
            .to_owned();
        self.push(TokenKind::Num(text), start);
    }

    fn ident(&mut self, start: usize) {
        while matches!(
            self.peek(),
            Some(b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_')
        ) {
            self.bump();
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or_default();
        let kind = match text {
            "import" => TokenKind::Import,
            "from" => TokenKind::From,
            "export" => TokenKind::Export,
            "interface" => TokenKind::Interface,
            "const" => TokenKind::Const,
            "let" => TokenKind::Let,
            "fn" => TokenKind::Fn,
            _ => TokenKind::Ident(text.to_owned()),
        };
        self.push(kind, start);
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.pos;
        self.bump();
        self.push(kind, start);
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            span: self.span(start),
        });
    }

    fn error(&mut self, start: usize, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::error(Category::Syntax, self.span(start), message));
    }

    fn span(&self, start: usize) -> Span {
        Span::new(self.file.clone(), start as u32, self.pos as u32)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn bump(&mut self) {
        self.pos = (self.pos + 1).min(self.bytes.len());
    }
}

/// Length in bytes of the UTF-8 character starting with `first`.
fn utf8_len(first: u8) -> usize {
    match first {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        _ => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, diags) = lex(FileName::from("t.decl"), source);
        assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_lex_punctuation_and_arrows() {
        assert_eq!(
            kinds("( ) -> => = & |"),
            vec![
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::ThinArrow,
                TokenKind::FatArrow,
                TokenKind::Eq,
                TokenKind::Amp,
                TokenKind::Pipe,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_keywords_and_idents() {
        assert_eq!(
            kinds("import data from interface_"),
            vec![
                TokenKind::Import,
                TokenKind::Ident("data".into()),
                TokenKind::From,
                TokenKind::Ident("interface_".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_string_with_escapes() {
        assert_eq!(
            kinds(r#""e:user.login" "a\"b""#),
            vec![
                TokenKind::Str("e:user.login".into()),
                TokenKind::Str("a\"b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_numbers() {
        assert_eq!(
            kinds("1 42.5"),
            vec![
                TokenKind::Num("1".into()),
                TokenKind::Num("42.5".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_comments_skipped() {
        assert_eq!(
            kinds("let // trailing words\nx"),
            vec![TokenKind::Let, TokenKind::Ident("x".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_lex_unterminated_string_reports() {
        let (tokens, diags) = lex(FileName::from("t.decl"), "\"oops");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("unterminated"));
        // Still produces the partial token plus Eof.
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_lex_unexpected_character_reports_and_continues() {
        let (tokens, diags) = lex(FileName::from("t.decl"), "x # y");
        assert_eq!(diags.len(), 1);
        assert_eq!(tokens.len(), 3); // x, y, Eof
    }

    #[test]
    fn test_lex_spans_are_byte_offsets() {
        let (tokens, _) = lex(FileName::from("t.decl"), "ab cd");
        assert_eq!(tokens[0].span.start, 0);
        assert_eq!(tokens[0].span.end, 2);
        assert_eq!(tokens[1].span.start, 3);
        assert_eq!(tokens[1].span.end, 5);
    }
}
