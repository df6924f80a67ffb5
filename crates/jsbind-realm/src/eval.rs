//! Expression evaluator backing the global `eval`.
//!
//! Supported: literals (numbers, strings with escapes, booleans, `null`,
//! `undefined`, `NaN`, `Infinity`), array and object literals, parentheses,
//! unary `-`/`+`/`!`, global identifiers, member access, calls and `new`.
//! Statements are not; a single trailing `;` is tolerated.

use jsbind_core::{Engine, EngineResult, JsValue, PropertyKey};
use tracing::trace;

use crate::heap::array_index;
use crate::realm::Realm;

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(char),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => jsbind_core::number_to_string(*n),
            Token::Str(_) => "string".to_string(),
            Token::Ident(name) => name.clone(),
            Token::Punct(c) => c.to_string(),
        }
    }
}

pub(crate) fn evaluate(realm: &Realm, source: &str) -> EngineResult<JsValue> {
    trace!(len = source.len(), "eval");
    let tokens = Lexer::new(source)
        .tokenize()
        .map_err(|message| realm.create_error("SyntaxError", &message))?;
    let mut parser = Parser {
        realm,
        tokens,
        pos: 0,
    };
    if parser.peek().is_none() {
        return Ok(JsValue::Undefined);
    }
    let value = parser.expression()?;
    parser.eat(';');
    match parser.peek() {
        None => Ok(value),
        Some(token) => Err(parser.unexpected(token)),
    }
}

// ============================================================================
// Lexer
// ============================================================================

struct Lexer<'s> {
    chars: std::iter::Peekable<std::str::Chars<'s>>,
}

impl<'s> Lexer<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            chars: source.chars().peekable(),
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();
        while let Some(&c) = self.chars.peek() {
            match c {
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                '/' => {
                    self.chars.next();
                    self.comment()?;
                }
                '0'..='9' => tokens.push(Token::Number(self.number()?)),
                '.' => {
                    self.chars.next();
                    if self.chars.peek().is_some_and(char::is_ascii_digit) {
                        let digits = self.digits();
                        tokens.push(Token::Number(parse_decimal(&format!("0.{digits}"))?));
                    } else {
                        tokens.push(Token::Punct('.'));
                    }
                }
                '"' | '\'' => {
                    self.chars.next();
                    tokens.push(Token::Str(self.string(c)?));
                }
                c if is_ident_start(c) => tokens.push(Token::Ident(self.ident())),
                '(' | ')' | '[' | ']' | '{' | '}' | ',' | ':' | ';' | '-' | '+' | '!' => {
                    self.chars.next();
                    tokens.push(Token::Punct(c));
                }
                other => return Err(format!("Invalid or unexpected token '{other}'")),
            }
        }
        Ok(tokens)
    }

    fn comment(&mut self) -> Result<(), String> {
        match self.chars.next() {
            Some('/') => {
                for c in self.chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
                Ok(())
            }
            Some('*') => {
                let mut star = false;
                for c in self.chars.by_ref() {
                    if star && c == '/' {
                        return Ok(());
                    }
                    star = c == '*';
                }
                Err("Invalid or unexpected token".to_string())
            }
            _ => Err("Invalid regular expression: missing /".to_string()),
        }
    }

    fn digits(&mut self) -> String {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            text.push(c);
            self.chars.next();
        }
        text
    }

    fn number(&mut self) -> Result<f64, String> {
        let mut text = self.digits();
        if text == "0"
            && let Some(&x) = self.chars.peek()
            && (x == 'x' || x == 'X')
        {
            self.chars.next();
            let mut hex = String::new();
            while let Some(&c) = self.chars.peek() {
                if !c.is_ascii_hexdigit() {
                    break;
                }
                hex.push(c);
                self.chars.next();
            }
            return u64::from_str_radix(&hex, 16)
                .map(|n| n as f64)
                .map_err(|_| "Invalid or unexpected token".to_string());
        }
        if self.chars.peek() == Some(&'.') {
            self.chars.next();
            text.push('.');
            text.push_str(&self.digits());
        }
        if let Some(&e) = self.chars.peek()
            && (e == 'e' || e == 'E')
        {
            self.chars.next();
            text.push('e');
            if let Some(&sign) = self.chars.peek()
                && (sign == '+' || sign == '-')
            {
                self.chars.next();
                text.push(sign);
            }
            let exponent = self.digits();
            if exponent.is_empty() {
                return Err("Invalid or unexpected token".to_string());
            }
            text.push_str(&exponent);
        }
        if self.chars.peek().is_some_and(|&c| is_ident_start(c)) {
            return Err("Invalid or unexpected token".to_string());
        }
        parse_decimal(&text)
    }

    fn string(&mut self, quote: char) -> Result<String, String> {
        let mut text = String::new();
        let mut pending_high: Option<u32> = None;
        loop {
            let c = self
                .chars
                .next()
                .ok_or_else(|| "Invalid or unexpected token".to_string())?;
            if c == quote {
                break;
            }
            if c == '\n' {
                return Err("Invalid or unexpected token".to_string());
            }
            if c != '\\' {
                flush_surrogate(&mut text, &mut pending_high);
                text.push(c);
                continue;
            }
            let escape = self
                .chars
                .next()
                .ok_or_else(|| "Invalid or unexpected token".to_string())?;
            let unit = match escape {
                'u' => self.unicode_escape()?,
                'x' => self.hex_digits(2)?,
                other => {
                    flush_surrogate(&mut text, &mut pending_high);
                    match other {
                        'n' => text.push('\n'),
                        'r' => text.push('\r'),
                        't' => text.push('\t'),
                        'b' => text.push('\u{8}'),
                        'f' => text.push('\u{c}'),
                        'v' => text.push('\u{b}'),
                        '0' => text.push('\0'),
                        '\n' => {}
                        literal => text.push(literal),
                    }
                    continue;
                }
            };
            push_code_unit(&mut text, &mut pending_high, unit);
        }
        flush_surrogate(&mut text, &mut pending_high);
        Ok(text)
    }

    fn unicode_escape(&mut self) -> Result<u32, String> {
        if self.chars.peek() != Some(&'{') {
            return self.hex_digits(4);
        }
        self.chars.next();
        let mut value = 0u32;
        let mut seen = false;
        loop {
            match self.chars.next() {
                Some('}') if seen => return Ok(value),
                Some(c) if c.is_ascii_hexdigit() => {
                    value = value * 16 + c.to_digit(16).unwrap_or(0);
                    if value > 0x10FFFF {
                        return Err("Undefined Unicode code-point".to_string());
                    }
                    seen = true;
                }
                _ => return Err("Invalid Unicode escape sequence".to_string()),
            }
        }
    }

    fn hex_digits(&mut self, count: usize) -> Result<u32, String> {
        let mut value = 0u32;
        for _ in 0..count {
            let digit = self
                .chars
                .next()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| "Invalid hexadecimal escape sequence".to_string())?;
            value = value * 16 + digit;
        }
        Ok(value)
    }

    fn ident(&mut self) -> String {
        let mut name = String::new();
        while let Some(&c) = self.chars.peek() {
            if !(is_ident_start(c) || c.is_ascii_digit()) {
                break;
            }
            name.push(c);
            self.chars.next();
        }
        name
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn parse_decimal(text: &str) -> Result<f64, String> {
    text.parse()
        .map_err(|_| format!("Invalid number literal {text}"))
}

/// Append a UTF-16 code unit, pairing surrogates. Lone surrogates become
/// U+FFFD since they have no string representation on this side.
fn push_code_unit(text: &mut String, pending_high: &mut Option<u32>, unit: u32) {
    match unit {
        0xD800..=0xDBFF => {
            flush_surrogate(text, pending_high);
            *pending_high = Some(unit);
        }
        0xDC00..=0xDFFF => match pending_high.take() {
            Some(high) => {
                let code = 0x10000 + ((high - 0xD800) << 10) + (unit - 0xDC00);
                text.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            None => text.push(char::REPLACEMENT_CHARACTER),
        },
        code => {
            flush_surrogate(text, pending_high);
            text.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
        }
    }
}

fn flush_surrogate(text: &mut String, pending_high: &mut Option<u32>) {
    if pending_high.take().is_some() {
        text.push(char::REPLACEMENT_CHARACTER);
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Recursive-descent parser that evaluates as it goes.
struct Parser<'r> {
    realm: &'r Realm,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, punct: char) -> bool {
        if self.peek() == Some(&Token::Punct(punct)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: char) -> EngineResult<()> {
        match self.next() {
            Some(Token::Punct(c)) if c == punct => Ok(()),
            Some(token) => Err(self.unexpected(&token)),
            None => Err(self.syntax_error("Unexpected end of input")),
        }
    }

    fn syntax_error(&self, message: &str) -> JsValue {
        self.realm.create_error("SyntaxError", message)
    }

    fn unexpected(&self, token: &Token) -> JsValue {
        self.syntax_error(&format!("Unexpected token '{}'", token.describe()))
    }

    fn expression(&mut self) -> EngineResult<JsValue> {
        self.unary()
    }

    fn unary(&mut self) -> EngineResult<JsValue> {
        if self.eat('-') {
            let operand = self.unary()?;
            return Ok(JsValue::Number(-self.realm.to_number(&operand)));
        }
        if self.eat('+') {
            let operand = self.unary()?;
            return Ok(JsValue::Number(self.realm.to_number(&operand)));
        }
        if self.eat('!') {
            let operand = self.unary()?;
            return Ok(JsValue::Bool(!operand.is_truthy()));
        }
        if self.peek() == Some(&Token::Ident("new".to_string())) {
            self.pos += 1;
            let constructed = self.construct()?;
            return self.postfix(constructed, true);
        }
        let primary = self.primary()?;
        self.postfix(primary, true)
    }

    /// `new Callee(args)`: the callee is a member chain without calls.
    fn construct(&mut self) -> EngineResult<JsValue> {
        let callee = if self.peek() == Some(&Token::Ident("new".to_string())) {
            self.pos += 1;
            self.construct()?
        } else {
            let primary = self.primary()?;
            self.postfix(primary, false)?
        };
        let args = if self.eat('(') {
            self.list(')')?
        } else {
            Vec::new()
        };
        self.realm.construct(&callee, &args)
    }

    fn postfix(&mut self, mut value: JsValue, calls: bool) -> EngineResult<JsValue> {
        let mut receiver = JsValue::Undefined;
        loop {
            if self.eat('.') {
                let name = match self.next() {
                    Some(Token::Ident(name)) => name,
                    Some(token) => return Err(self.unexpected(&token)),
                    None => return Err(self.syntax_error("Unexpected end of input")),
                };
                receiver = value;
                value = self.realm.get(&receiver, PropertyKey::Name(&name))?;
            } else if self.eat('[') {
                let key = self.expression()?;
                self.expect(']')?;
                receiver = value;
                value = self.member(&receiver, &key)?;
            } else if calls && self.eat('(') {
                let args = self.list(')')?;
                value = self.realm.call(&value, &receiver, &args)?;
                receiver = JsValue::Undefined;
            } else {
                return Ok(value);
            }
        }
    }

    fn member(&self, target: &JsValue, key: &JsValue) -> EngineResult<JsValue> {
        let name = self.realm.to_display(key);
        match array_index(&name).and_then(|i| u32::try_from(i).ok()) {
            Some(index) => self.realm.get(target, PropertyKey::Index(index)),
            None => self.realm.get(target, PropertyKey::Name(&name)),
        }
    }

    /// Comma-separated expressions up to `close`, allowing a trailing comma.
    fn list(&mut self, close: char) -> EngineResult<Vec<JsValue>> {
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.expression()?);
            if !self.eat(',') {
                self.expect(close)?;
                return Ok(items);
            }
        }
    }

    fn primary(&mut self) -> EngineResult<JsValue> {
        let Some(token) = self.next() else {
            return Err(self.syntax_error("Unexpected end of input"));
        };
        match token {
            Token::Number(n) => Ok(JsValue::Number(n)),
            Token::Str(s) => Ok(JsValue::from(s)),
            Token::Ident(name) => self.identifier(&name),
            Token::Punct('(') => {
                let value = self.expression()?;
                self.expect(')')?;
                Ok(value)
            }
            Token::Punct('[') => {
                let items = self.list(']')?;
                Ok(self.realm.create_array(items))
            }
            Token::Punct('{') => self.object_literal(),
            other => Err(self.unexpected(&other)),
        }
    }

    fn identifier(&self, name: &str) -> EngineResult<JsValue> {
        match name {
            "true" => Ok(JsValue::Bool(true)),
            "false" => Ok(JsValue::Bool(false)),
            "null" => Ok(JsValue::Null),
            "undefined" => Ok(JsValue::Undefined),
            "NaN" => Ok(JsValue::Number(f64::NAN)),
            "Infinity" => Ok(JsValue::Number(f64::INFINITY)),
            _ => {
                let global = self.realm.intrinsics().global;
                self.realm
                    .lookup(global, PropertyKey::Name(name))
                    .ok_or_else(|| {
                        self.realm
                            .create_error("ReferenceError", &format!("{name} is not defined"))
                    })
            }
        }
    }

    fn object_literal(&mut self) -> EngineResult<JsValue> {
        let object = self.realm.create_object();
        loop {
            if self.eat('}') {
                return Ok(object);
            }
            let key = match self.next() {
                Some(Token::Ident(name)) | Some(Token::Str(name)) => name,
                Some(Token::Number(n)) => jsbind_core::number_to_string(n),
                Some(token) => return Err(self.unexpected(&token)),
                None => return Err(self.syntax_error("Unexpected end of input")),
            };
            self.expect(':')?;
            let value = self.expression()?;
            self.realm.set(&object, PropertyKey::Name(&key), value)?;
            if !self.eat(',') {
                self.expect('}')?;
                return Ok(object);
            }
        }
    }
}
