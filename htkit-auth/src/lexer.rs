//! Challenge lexer.
//!
//! A single-pass tokenizer over the `WWW-Authenticate` grammar of RFC 2617:
//!
//! ```text
//! challenge   := scheme SP+ param (COMMA SP* param)*
//! scheme      := "Basic" | "Digest" | other-token
//! param       := name "=" (token | quoted-string)
//! ```
//!
//! The lexer emits a flat stream of typed items. Quoted values are emitted
//! with their surrounding quotes; it is up to the consumer to unquote them.
//! Challenges with an unrecognized scheme are skipped without emitting
//! anything. Lexing stops at the first error; the error item carries the
//! byte position where the grammar could not be satisfied.

use std::borrow::Cow;

/// Separators per RFC 2616.
const SEPARATORS: &str = "()<>@,;:\\\"/[]?={} \t";

/// Whitespace per RFC 2616.
const WHITESPACE: &str = " \r\n\t";

/// Check if a character is an RFC 2616 separator.
fn is_separator(c: char) -> bool {
    SEPARATORS.contains(c)
}

/// Check if a character is RFC 2616 whitespace.
fn is_whitespace(c: char) -> bool {
    WHITESPACE.contains(c)
}

/// Check if a character is an RFC 2616 control character.
fn is_ctl(c: char) -> bool {
    c <= '\x1f' || c == '\x7f'
}

/// Check if a character may appear in an RFC 2616 token.
fn is_token_char(c: char) -> bool {
    !is_separator(c) && !is_whitespace(c) && !is_ctl(c)
}

/// Type of a lexer item.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ItemKind {
    Basic,
    Digest,
    Realm,
    Domain,
    Nonce,
    Opaque,
    Stale,
    Algorithm,
    Qop,
    AuthParam,
    Eof,
    Error,
}

/// A single lexer item.
#[derive(Debug, Clone)]
pub struct Item<'a> {
    pub kind: ItemKind,
    pub pos: usize,
    pub value: Cow<'a, str>,
}

/// Tokenize a given header value.
///
/// The returned items always end with either an `Eof` item or an `Error`
/// item; in the latter case the items before it form a valid prefix.
pub fn lex(input: &str) -> Vec<Item<'_>> {
    let mut lexer = Lexer::new(input);

    lexer.run();

    lexer.items
}

/// Lexer over a single header value.
struct Lexer<'a> {
    input: &'a str,
    start: usize,
    pos: usize,
    items: Vec<Item<'a>>,
    failed: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer.
    const fn new(input: &'a str) -> Self {
        Self {
            input,
            start: 0,
            pos: 0,
            items: Vec::new(),
            failed: false,
        }
    }

    /// Run the lexer to completion.
    fn run(&mut self) {
        self.lex_header();

        if !self.failed {
            self.items.push(Item {
                kind: ItemKind::Eof,
                pos: self.pos,
                value: Cow::Borrowed(""),
            });
        }
    }

    /// Lex the whole header value.
    fn lex_header(&mut self) {
        if self.accept_whitespace_run() {
            self.skip();
        }

        if !self.accept_token_run() {
            self.fail(format!(
                "expected a token character, got {}",
                self.describe_peek()
            ));
            return;
        }

        // The pending token holds a challenge scheme on every iteration. The
        // parameter sub-lexers leave the next scheme token pending when they
        // run into the start of another challenge.
        while !self.failed {
            match self.pending().to_ascii_lowercase().as_str() {
                "basic" => {
                    self.emit(ItemKind::Basic);

                    if self.accept_whitespace_run() {
                        self.skip();
                    } else {
                        self.fail(format!(
                            "expected whitespace after 'Basic', got {}",
                            self.describe_peek()
                        ));
                        return;
                    }

                    self.lex_basic_params();
                }
                "digest" => {
                    self.emit(ItemKind::Digest);

                    if self.accept_whitespace_run() {
                        self.skip();
                    } else {
                        self.fail(format!(
                            "expected whitespace after 'Digest', got {}",
                            self.describe_peek()
                        ));
                        return;
                    }

                    self.lex_digest_params();
                }
                _ => self.skip_challenge(),
            }

            if self.peek().is_none() {
                return;
            }
        }
    }

    /// Lex the parameters of a Basic challenge.
    ///
    /// Expects to be positioned at the start of the first parameter.
    fn lex_basic_params(&mut self) {
        loop {
            if !self.accept_token_run() {
                self.fail(format!(
                    "expected a token character, got {}",
                    self.describe_peek()
                ));
                return;
            }

            match self.pending() {
                "realm" => self.lex_quoted_value(ItemKind::Realm, "realm"),
                _ => match self.peek() {
                    Some(',') | None => return,
                    Some(c) if is_whitespace(c) => return,
                    _ => self.lex_ignored_param(),
                },
            }

            if self.failed || !self.advance_param() {
                return;
            }
        }
    }

    /// Lex the parameters of a Digest challenge.
    ///
    /// Expects to be positioned at the start of the first parameter.
    fn lex_digest_params(&mut self) {
        loop {
            if !self.accept_token_run() {
                self.fail(format!(
                    "expected a token character, got {}",
                    self.describe_peek()
                ));
                return;
            }

            match self.pending().to_ascii_lowercase().as_str() {
                "realm" => self.lex_quoted_value(ItemKind::Realm, "realm"),
                "domain" => self.lex_quoted_value(ItemKind::Domain, "domain"),
                "nonce" => self.lex_quoted_value(ItemKind::Nonce, "nonce"),
                "opaque" => self.lex_quoted_value(ItemKind::Opaque, "opaque"),
                "stale" => self.lex_bool_value(ItemKind::Stale, "stale"),
                "algorithm" => self.lex_token_value(ItemKind::Algorithm, "algorithm"),
                "qop" => self.lex_quoted_value(ItemKind::Qop, "qop"),
                _ => match self.peek() {
                    Some(',') | None => return,
                    Some(c) if is_whitespace(c) => return,
                    _ => self.lex_ignored_param(),
                },
            }

            if self.failed || !self.advance_param() {
                return;
            }
        }
    }

    /// Skip over a challenge with an unrecognized scheme.
    ///
    /// Expects the scheme token to be pending. Nothing is emitted; on return
    /// the pending token is either empty (end of input) or holds the scheme
    /// of the next challenge.
    fn skip_challenge(&mut self) {
        if self.accept_whitespace_run() {
            self.skip();
        } else {
            // The scheme token is directly followed by a list separator or
            // the end of input. Drop it together with any separators and
            // position the lexer at the next challenge.
            self.skip();

            while matches!(self.peek(), Some(c) if c == ',' || is_whitespace(c)) {
                self.advance();
            }

            self.skip();

            if !self.accept_token_run() && self.peek().is_some() {
                self.fail(format!(
                    "expected a token character, got {}",
                    self.describe_peek()
                ));
            }

            return;
        }

        loop {
            if !self.accept_token_run() {
                // positioned at a separator or the end of input; let the
                // main loop decide
                return;
            }

            match self.peek() {
                Some('=') => {
                    self.advance();
                    self.skip();

                    if self.peek() == Some('"') {
                        self.lex_quoted(ItemKind::AuthParam, false, "auth-param");
                    } else if self.accept_token_run() {
                        self.skip();
                    } else {
                        self.fail(format!(
                            "expected a token character, got {}",
                            self.describe_peek()
                        ));
                    }
                }
                Some(c) if is_whitespace(c) => return,
                _ => {
                    self.fail(format!(
                        "expected either whitespace or '=', got {}",
                        self.describe_peek()
                    ));
                    return;
                }
            }

            if self.failed || !self.advance_param() {
                return;
            }
        }
    }

    /// Lex the quoted-string value of `<name>=<value>`.
    ///
    /// Expects the parameter name to be pending and the `=` sign to follow.
    fn lex_quoted_value(&mut self, kind: ItemKind, name: &str) {
        if !self.accept_char('=') {
            self.fail(format!(
                "expected '=' after '{name}', got {}",
                self.describe_peek()
            ));
            return;
        }

        self.skip();

        self.lex_quoted(kind, true, name);
    }

    /// Lex the token value of `<name>=<value>`.
    fn lex_token_value(&mut self, kind: ItemKind, name: &str) {
        if !self.accept_char('=') {
            self.fail(format!(
                "expected '=' after '{name}', got {}",
                self.describe_peek()
            ));
            return;
        }

        self.skip();

        if !self.accept_token_run() {
            self.fail(format!(
                "expected a token character, got {}",
                self.describe_peek()
            ));
            return;
        }

        self.emit(kind);
    }

    /// Lex the boolean value of `<name>=<value>`.
    ///
    /// The value must be `true` or `false` (case-insensitive).
    fn lex_bool_value(&mut self, kind: ItemKind, name: &str) {
        if !self.accept_char('=') {
            self.fail(format!(
                "expected '=' after '{name}', got {}",
                self.describe_peek()
            ));
            return;
        }

        self.skip();

        if !self.accept_token_run() {
            self.fail(format!(
                "expected a token character, got {}",
                self.describe_peek()
            ));
            return;
        }

        let value = self.pending();

        if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
            self.emit(kind);
        } else {
            self.fail(format!("expected 'true' or 'false', got {value:?}"));
        }
    }

    /// Lex past an unrecognized `<name>=<value>` parameter, emitting the
    /// value as an auth-param item.
    ///
    /// Expects the parameter name to be pending.
    fn lex_ignored_param(&mut self) {
        let name = self.pending().to_string();

        self.skip();

        if !self.accept_char('=') {
            self.fail(format!(
                "expected '=' after '{name}', got {}",
                self.describe_peek()
            ));
            return;
        }

        self.skip();

        if self.peek() == Some('"') {
            self.lex_quoted(ItemKind::AuthParam, true, "auth-param");
        } else if self.accept_token_run() {
            self.emit(ItemKind::AuthParam);
        } else {
            self.fail(format!(
                "expected a token character, got {}",
                self.describe_peek()
            ));
        }
    }

    /// Lex a quoted string, including the surrounding quotes.
    ///
    /// Backslash escapes are honored when scanning for the closing quote but
    /// the escape sequences are left in the emitted value.
    fn lex_quoted(&mut self, kind: ItemKind, emit: bool, name: &str) {
        if self.peek() != Some('"') {
            self.fail(format!(
                "expected a quoted string after '{name}=', got {}",
                self.describe_peek()
            ));
            return;
        }

        self.advance();

        loop {
            match self.peek() {
                Some('\\') => {
                    self.advance();

                    if self.peek().is_none() {
                        self.fail("end of input within an escape sequence".to_string());
                        return;
                    }

                    self.advance();
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some(_) => self.advance(),
                None => {
                    self.fail("unterminated quoted string".to_string());
                    return;
                }
            }
        }

        if emit {
            self.emit(kind);
        } else {
            self.skip();
        }
    }

    /// Advance to the start of the next parameter.
    ///
    /// Returns `true` if another parameter (or challenge scheme) may follow,
    /// `false` on end of input or error.
    fn advance_param(&mut self) -> bool {
        if self.peek().is_none() {
            return false;
        }

        self.accept_whitespace_run();

        if self.peek() != Some(',') {
            self.fail(format!("expected comma, got {}", self.describe_peek()));
            return false;
        }

        self.advance();
        self.accept_whitespace_run();
        self.skip();

        true
    }

    /// Get the character at the current position.
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    /// Advance the current position by one character.
    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    /// Accept a single given character.
    fn accept_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Accept a run of token characters.
    ///
    /// Returns `true` if at least one character was accepted.
    fn accept_token_run(&mut self) -> bool {
        let start = self.pos;

        while matches!(self.peek(), Some(c) if is_token_char(c)) {
            self.advance();
        }

        self.pos > start
    }

    /// Accept a run of whitespace characters.
    ///
    /// Returns `true` if at least one character was accepted.
    fn accept_whitespace_run(&mut self) -> bool {
        let start = self.pos;

        while matches!(self.peek(), Some(c) if is_whitespace(c)) {
            self.advance();
        }

        self.pos > start
    }

    /// Get the pending (not yet emitted or skipped) input.
    fn pending(&self) -> &'a str {
        &self.input[self.start..self.pos]
    }

    /// Discard the pending input.
    fn skip(&mut self) {
        self.start = self.pos;
    }

    /// Emit the pending input as an item of a given kind.
    fn emit(&mut self, kind: ItemKind) {
        self.items.push(Item {
            kind,
            pos: self.start,
            value: Cow::Borrowed(self.pending()),
        });

        self.start = self.pos;
    }

    /// Emit an error item at the current position and stop the lexer.
    fn fail(&mut self, msg: String) {
        self.items.push(Item {
            kind: ItemKind::Error,
            pos: self.pos,
            value: Cow::Owned(msg),
        });

        self.failed = true;
    }

    /// Describe the character at the current position for error messages.
    fn describe_peek(&self) -> String {
        match self.peek() {
            Some(c) => format!("{c:?}"),
            None => "end of input".to_string(),
        }
    }
}
