use std::collections::VecDeque;
use std::io::BufRead;
use std::rc::Rc;

use crate::error::{ScmError, ScmResult};
use crate::number::Num;
use crate::symbol::{sym, SymbolTable};
use crate::value::Value;

/// One lexical token. Whitespace splits outside strings; comments run from
/// `;` to end of line; `'` expands to `(quote ...)` at parse time.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    Quote,
    Dot,
    Str(String),
    Atom(String),
}

/// Split source text into a token queue. The only tokenisation failure is an
/// unterminated string, reported as incomplete input so callers can read
/// more lines.
pub fn split_tokens(text: &str) -> ScmResult<VecDeque<Token>> {
    let mut tokens = VecDeque::new();
    let mut it = text.char_indices().peekable();

    while let Some((i, c)) = it.next() {
        match c {
            c if c.is_whitespace() => {}
            ';' => {
                for (_, c) in it.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '(' => tokens.push_back(Token::LParen),
            ')' => tokens.push_back(Token::RParen),
            '\'' => tokens.push_back(Token::Quote),
            '"' => {
                // The quote is a toggle; no escape processing.
                let start = i + 1;
                let mut end = None;
                for (j, c) in it.by_ref() {
                    if c == '"' {
                        end = Some(j);
                        break;
                    }
                }
                match end {
                    Some(j) => tokens.push_back(Token::Str(text[start..j].to_string())),
                    None => return Err(ScmError::Incomplete),
                }
            }
            _ => {
                let start = i;
                let mut end = i + c.len_utf8();
                while let Some(&(j, c2)) = it.peek() {
                    if c2.is_whitespace() || matches!(c2, '(' | ')' | '\'' | ';' | '"') {
                        break;
                    }
                    it.next();
                    end = j + c2.len_utf8();
                }
                let word = &text[start..end];
                if word == "." {
                    tokens.push_back(Token::Dot);
                } else {
                    tokens.push_back(Token::Atom(word.to_string()));
                }
            }
        }
    }
    Ok(tokens)
}

/// Consume one expression from the token queue. Running out of tokens
/// mid-expression yields `Incomplete`; note that a failed parse may leave
/// the queue partially consumed, so retrying callers work on a clone.
pub fn read_from_tokens(
    tokens: &mut VecDeque<Token>,
    symbols: &mut SymbolTable,
) -> ScmResult<Value> {
    match tokens.pop_front() {
        None => Err(ScmError::Incomplete),
        Some(Token::LParen) => read_list(tokens, symbols),
        Some(Token::RParen) => Err(ScmError::Parse("unexpected ')'".into())),
        Some(Token::Dot) => Err(ScmError::Parse("unexpected '.'".into())),
        Some(Token::Quote) => {
            let quoted = read_from_tokens(tokens, symbols)?;
            Ok(Value::list(&[Value::Sym(sym::QUOTE), quoted]))
        }
        Some(Token::Str(s)) => Ok(Value::Str(Rc::from(s.as_str()))),
        Some(Token::Atom(a)) => Ok(parse_atom(&a, symbols)),
    }
}

/// Read list elements after an opening paren, handling the dotted tail.
fn read_list(tokens: &mut VecDeque<Token>, symbols: &mut SymbolTable) -> ScmResult<Value> {
    let mut elems = Vec::new();
    let mut tail = Value::Nil;
    loop {
        match tokens.front() {
            None => return Err(ScmError::Incomplete),
            Some(Token::RParen) => {
                tokens.pop_front();
                break;
            }
            Some(Token::Dot) => {
                tokens.pop_front();
                if elems.is_empty() {
                    return Err(ScmError::Parse("unexpected '.'".into()));
                }
                tail = read_from_tokens(tokens, symbols)?;
                match tokens.pop_front() {
                    Some(Token::RParen) => break,
                    None => return Err(ScmError::Incomplete),
                    Some(_) => {
                        return Err(ScmError::Parse("expected ')' after dotted tail".into()))
                    }
                }
            }
            Some(_) => elems.push(read_from_tokens(tokens, symbols)?),
        }
    }
    let mut out = tail;
    for elem in elems.into_iter().rev() {
        out = Value::cons(elem, out);
    }
    Ok(out)
}

fn parse_atom(word: &str, symbols: &mut SymbolTable) -> Value {
    match word {
        "#t" => Value::Bool(true),
        "#f" => Value::Bool(false),
        _ => match Num::parse(word) {
            Some(n) => Value::Num(n),
            None => Value::Sym(symbols.intern(word)),
        },
    }
}

/// Parse every expression in a source text, in order. Used by the file
/// loader and tests.
pub fn read_all(text: &str, symbols: &mut SymbolTable) -> ScmResult<Vec<Value>> {
    let mut tokens = split_tokens(text)?;
    let mut out = Vec::new();
    while !tokens.is_empty() {
        out.push(read_from_tokens(&mut tokens, symbols)?);
    }
    Ok(out)
}

/// Line-buffered token queue over stdin, backing the `read` intrinsic.
/// Reads lines until a whole expression is available; yields the EOF object
/// once the stream ends with nothing pending.
pub struct StdinSource {
    tokens: VecDeque<Token>,
    eof: bool,
}

impl StdinSource {
    pub fn new() -> StdinSource {
        StdinSource {
            tokens: VecDeque::new(),
            eof: false,
        }
    }

    pub fn read_value(&mut self, symbols: &mut SymbolTable) -> ScmResult<Value> {
        loop {
            if !self.tokens.is_empty() {
                let mut probe = self.tokens.clone();
                match read_from_tokens(&mut probe, symbols) {
                    Ok(v) => {
                        self.tokens = probe;
                        return Ok(v);
                    }
                    Err(ScmError::Incomplete) => {}
                    Err(e) => {
                        self.tokens.clear();
                        return Err(e);
                    }
                }
            }
            if self.eof {
                if self.tokens.is_empty() {
                    return Ok(Value::Eof);
                }
                return Err(ScmError::Incomplete);
            }
            let mut line = String::new();
            match std::io::stdin().lock().read_line(&mut line) {
                Ok(0) => self.eof = true,
                Ok(_) => self.tokens.append(&mut split_tokens(&line)?),
                Err(e) => return Err(ScmError::Io(e.to_string())),
            }
        }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        StdinSource::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::stringify;
    use crate::env::Env;

    fn parse_one(text: &str, symbols: &mut SymbolTable) -> ScmResult<Value> {
        let mut tokens = split_tokens(text)?;
        read_from_tokens(&mut tokens, symbols)
    }

    fn roundtrip(text: &str) -> String {
        let mut symbols = SymbolTable::new();
        let globals = Env::new_global();
        let v = parse_one(text, &mut symbols).unwrap();
        stringify(&v, true, &symbols, &globals)
    }

    #[test]
    fn tokenises_parens_and_atoms() {
        let tokens = split_tokens("(+ 1 2)").unwrap();
        assert_eq!(
            Vec::from(tokens),
            vec![
                Token::LParen,
                Token::Atom("+".into()),
                Token::Atom("1".into()),
                Token::Atom("2".into()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn comments_run_to_end_of_line() {
        let tokens = split_tokens("1 ; ignored (\n2").unwrap();
        assert_eq!(
            Vec::from(tokens),
            vec![Token::Atom("1".into()), Token::Atom("2".into())]
        );
    }

    #[test]
    fn strings_may_contain_spaces_and_delimiters() {
        let tokens = split_tokens("\"a (b) ; c\"").unwrap();
        assert_eq!(Vec::from(tokens), vec![Token::Str("a (b) ; c".into())]);
        assert!(matches!(split_tokens("\"open"), Err(ScmError::Incomplete)));
    }

    #[test]
    fn booleans_numbers_and_symbols() {
        let mut symbols = SymbolTable::new();
        assert_eq!(parse_one("#t", &mut symbols).unwrap(), Value::Bool(true));
        assert_eq!(parse_one("#f", &mut symbols).unwrap(), Value::Bool(false));
        assert_eq!(
            parse_one("42", &mut symbols).unwrap(),
            Value::Num(Num::Int(42))
        );
        assert_eq!(
            parse_one("1.5", &mut symbols).unwrap(),
            Value::Num(Num::Float(1.5))
        );
        let plus = parse_one("+", &mut symbols).unwrap();
        assert_eq!(plus, Value::Sym(sym::PLUS));
    }

    #[test]
    fn quote_expands() {
        assert_eq!(roundtrip("'a"), "(quote a)");
        assert_eq!(roundtrip("'(1 2)"), "(quote (1 2))");
    }

    #[test]
    fn dotted_pairs() {
        assert_eq!(roundtrip("(a . b)"), "(a . b)");
        assert_eq!(roundtrip("(a b . c)"), "(a b . c)");
        let mut symbols = SymbolTable::new();
        assert!(matches!(
            parse_one("(a . b c)", &mut symbols),
            Err(ScmError::Parse(_))
        ));
        assert!(matches!(
            parse_one("(. a)", &mut symbols),
            Err(ScmError::Parse(_))
        ));
    }

    #[test]
    fn unbalanced_input_is_incomplete_not_malformed() {
        let mut symbols = SymbolTable::new();
        assert!(matches!(
            parse_one("(a (b", &mut symbols),
            Err(ScmError::Incomplete)
        ));
        assert!(matches!(
            parse_one(")", &mut symbols),
            Err(ScmError::Parse(_))
        ));
    }

    #[test]
    fn stringified_data_reads_back_structurally() {
        let mut symbols = SymbolTable::new();
        let globals = Env::new_global();
        for text in ["(1 2 3)", "(a (b . c) \"s\" #t 2.5)", "()", "(quote x)"] {
            let v = parse_one(text, &mut symbols).unwrap();
            let printed = stringify(&v, true, &symbols, &globals);
            let back = parse_one(&printed, &mut symbols).unwrap();
            assert_eq!(v, back, "round-trip failed for {}", text);
        }
    }

    #[test]
    fn read_all_returns_every_expression() {
        let mut symbols = SymbolTable::new();
        let exprs = read_all("1 2 (list 3)", &mut symbols).unwrap();
        assert_eq!(exprs.len(), 3);
    }
}
