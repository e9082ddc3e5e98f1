use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Clone, PartialEq, Debug)]
pub enum Token {
    ListStart,
    ListEnd,
    VectorStart,
    Quote,
    Backtick,
    Comma,
    CommaAt,
    Dot,
    Boolean(bool),
    Character(char),
    Number(f64),
    Identifier(String),
    Str(String),
}

#[derive(Clone, PartialEq, Debug)]
pub struct SyntaxError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Syntax error line {} column {}: {}",
            self.line, self.column, self.message
        )
    }
}

macro_rules! syntax_error {
    ($lexer:expr, $($arg:tt)*) => {
        return Err(SyntaxError {
            message: format!($($arg)*),
            line: $lexer.line,
            column: $lexer.column,
        })
    };
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, SyntaxError> {
    Lexer::new(input).run()
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: u32,
    column: u32,
    tokens: Vec<Token>,
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

fn is_delimiter(c: char) -> bool {
    is_whitespace(c) || matches!(c, '"' | '(' | ')' | ';')
}

fn is_special_initial(c: char) -> bool {
    matches!(
        c,
        '!' | '$' | '%' | '&' | '*' | '/' | ':' | '<' | '=' | '>' | '?' | '^' | '_' | '~'
    )
}

fn is_initial(c: char) -> bool {
    c.is_ascii_alphabetic() || is_special_initial(c)
}

fn is_special_subsequent(c: char) -> bool {
    matches!(c, '+' | '-' | '.' | '@')
}

fn is_subsequent(c: char) -> bool {
    is_initial(c) || c.is_ascii_digit() || is_special_subsequent(c)
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Lexer<'a> {
        Lexer {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next();
        match c {
            Some('\n') => {
                self.line += 1;
                self.column = 1;
            }
            Some(_) => self.column += 1,
            None => {}
        }
        c
    }

    fn run(mut self) -> Result<Vec<Token>, SyntaxError> {
        while let Some(c) = self.peek() {
            match c {
                _ if is_whitespace(c) => {
                    self.advance();
                }
                ';' => self.skip_comment(),
                '(' => self.push_simple(Token::ListStart),
                ')' => self.push_simple(Token::ListEnd),
                '\'' => self.push_simple(Token::Quote),
                '`' => self.push_simple(Token::Backtick),
                '.' => self.push_simple(Token::Dot),
                ',' => {
                    self.advance();
                    if self.peek() == Some('@') {
                        self.advance();
                        self.tokens.push(Token::CommaAt);
                    } else {
                        self.tokens.push(Token::Comma);
                    }
                }
                '#' => self.read_hash()?,
                '"' => self.read_string()?,
                _ if c.is_ascii_digit() => self.read_number()?,
                _ => self.read_identifier()?,
            }
        }
        Ok(self.tokens)
    }

    fn push_simple(&mut self, token: Token) {
        self.advance();
        self.tokens.push(token);
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.advance() {
            if c == '\n' {
                break;
            }
        }
    }

    fn read_hash(&mut self) -> Result<(), SyntaxError> {
        self.advance();
        match self.advance() {
            Some('t') => self.tokens.push(Token::Boolean(true)),
            Some('f') => self.tokens.push(Token::Boolean(false)),
            Some('(') => self.tokens.push(Token::VectorStart),
            Some('\\') => return self.read_character(),
            _ => syntax_error!(self, "malformed identifier after #"),
        }
        Ok(())
    }

    /// The character after `#\` is taken literally even when it is a
    /// delimiter; longer spellings must be one of the named characters.
    fn read_character(&mut self) -> Result<(), SyntaxError> {
        let first = match self.advance() {
            Some(c) => c,
            None => syntax_error!(self, "unexpected end of input in character literal"),
        };
        let mut name = String::new();
        name.push(first);
        while let Some(c) = self.peek() {
            if is_delimiter(c) {
                break;
            }
            name.push(c);
            self.advance();
        }
        let c = match name.as_str() {
            "space" => ' ',
            "newline" => '\n',
            _ if name.chars().count() == 1 => first,
            _ => syntax_error!(self, "bad character literal #\\{}", name),
        };
        self.tokens.push(Token::Character(c));
        Ok(())
    }

    fn read_string(&mut self) -> Result<(), SyntaxError> {
        self.advance();
        let mut string = String::new();
        loop {
            match self.advance() {
                Some('"') => break,
                Some('\\') => match self.advance() {
                    Some(c @ ('"' | '\\')) => string.push(c),
                    _ => syntax_error!(self, "malformed string"),
                },
                Some(c) if !c.is_control() => string.push(c),
                Some(_) => syntax_error!(self, "unexpected character in string"),
                None => syntax_error!(self, "unterminated string"),
            }
        }
        self.tokens.push(Token::Str(string));
        Ok(())
    }

    /// Non-negative decimal integers, accumulated as a double.
    fn read_number(&mut self) -> Result<(), SyntaxError> {
        let mut value = 0.0;
        while let Some(c) = self.peek() {
            if let Some(digit) = c.to_digit(10) {
                value = value * 10.0 + f64::from(digit);
                self.advance();
            } else if is_delimiter(c) {
                break;
            } else {
                syntax_error!(self, "malformed number");
            }
        }
        self.tokens.push(Token::Number(value));
        Ok(())
    }

    fn read_identifier(&mut self) -> Result<(), SyntaxError> {
        let first = match self.advance() {
            Some(c) => c,
            None => syntax_error!(self, "malformed identifier"),
        };
        if is_initial(first) {
            let mut name = String::new();
            name.push(first);
            while let Some(c) = self.peek() {
                if is_delimiter(c) {
                    break;
                }
                if !is_subsequent(c) {
                    syntax_error!(self, "malformed identifier");
                }
                name.push(c);
                self.advance();
            }
            self.tokens.push(Token::Identifier(name));
        } else if first == '+' || first == '-' {
            // peculiar identifiers stand alone
            match self.peek() {
                Some(c) if !is_delimiter(c) => syntax_error!(self, "malformed identifier"),
                _ => self.tokens.push(Token::Identifier(first.to_string())),
            }
        } else {
            syntax_error!(self, "malformed identifier");
        }
        Ok(())
    }
}
