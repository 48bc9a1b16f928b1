//! Tokenizer for transcript statements
//!
//! Newlines are plain whitespace: continuation lines are joined to their
//! statement before lexing. `#` starts a comment running to end of line.

use super::value::Raised;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    True,
    False,
    None,
    And,
    Or,
    Not,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Assign,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Eof,
}

pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            tokens: Vec::new(),
        }
    }

    /// Tokenize the whole statement. The result always ends with `Token::Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, Raised> {
        while let Some(&c) = self.chars.peek() {
            match c {
                ' ' | '\t' | '\r' | '\n' => {
                    self.chars.next();
                }
                '#' => {
                    while self.chars.next_if(|&c| c != '\n').is_some() {}
                }
                '0'..='9' => self.number()?,
                '\'' | '"' => self.string(c)?,
                c if c.is_alphabetic() || c == '_' => self.word(),
                _ => self.operator(c)?,
            }
        }
        self.tokens.push(Token::Eof);
        Ok(self.tokens)
    }

    fn number(&mut self) -> Result<(), Raised> {
        let mut text = String::new();
        let mut is_float = false;

        while let Some(&c) = self.chars.peek() {
            match c {
                '0'..='9' => text.push(c),
                '_' => {}
                '.' if !is_float => {
                    is_float = true;
                    text.push(c);
                }
                'e' | 'E' => {
                    is_float = true;
                    text.push(c);
                    self.chars.next();
                    if let Some(sign) = self.chars.next_if(|&c| c == '+' || c == '-') {
                        text.push(sign);
                    }
                    continue;
                }
                _ => break,
            }
            self.chars.next();
        }

        let token = if is_float {
            text.parse::<f64>()
                .map(Token::Float)
                .map_err(|_| Raised::syntax_error(format!("invalid decimal literal '{text}'")))?
        } else {
            text.parse::<i64>()
                .map(Token::Int)
                .map_err(|_| Raised::new("OverflowError", format!("integer literal too large: {text}")))?
        };
        self.tokens.push(token);
        Ok(())
    }

    fn string(&mut self, quote: char) -> Result<(), Raised> {
        self.chars.next();
        let mut text = String::new();

        loop {
            match self.chars.next() {
                None | Some('\n') => {
                    return Err(Raised::syntax_error("unterminated string literal"));
                }
                Some(c) if c == quote => break,
                Some('\\') => match self.chars.next() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some(other) => text.push(other),
                    None => return Err(Raised::syntax_error("unterminated string literal")),
                },
                Some(c) => text.push(c),
            }
        }

        self.tokens.push(Token::Str(text));
        Ok(())
    }

    fn word(&mut self) {
        let mut text = String::new();
        while let Some(c) = self.chars.next_if(|&c| c.is_alphanumeric() || c == '_') {
            text.push(c);
        }

        let token = match text.as_str() {
            "True" => Token::True,
            "False" => Token::False,
            "None" => Token::None,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            _ => Token::Ident(text),
        };
        self.tokens.push(token);
    }

    fn operator(&mut self, c: char) -> Result<(), Raised> {
        self.chars.next();
        let token = match c {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '%' => Token::Percent,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            ',' => Token::Comma,
            '*' => self.pair('*', Token::StarStar, Token::Star),
            '/' => self.pair('/', Token::SlashSlash, Token::Slash),
            '=' => self.pair('=', Token::EqEq, Token::Assign),
            '<' => self.pair('=', Token::Le, Token::Lt),
            '>' => self.pair('=', Token::Ge, Token::Gt),
            '!' if self.chars.next_if_eq(&'=').is_some() => Token::NotEq,
            other => {
                return Err(Raised::syntax_error(format!(
                    "invalid character '{other}'"
                )))
            }
        };
        self.tokens.push(token);
        Ok(())
    }

    fn pair(&mut self, next: char, double: Token, single: Token) -> Token {
        if self.chars.next_if_eq(&next).is_some() {
            double
        } else {
            single
        }
    }
}
