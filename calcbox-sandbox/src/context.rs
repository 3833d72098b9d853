//! Execution context: caller data plus helpers, rendered as one program
//!
//! The program is self-contained source text. Data crosses the isolation
//! boundary as JSON literals, so the interpreter never touches host memory.

use crate::error::SandboxError;
use crate::helpers;
use serde_json::{Map, Value};

/// Name of the in-isolate encoder function
pub(crate) const ENCODER_NAME: &str = "__calcboxEncode";

/// Installs the encoder that turns the completion value into JSON text.
///
/// Non-finite numbers become the strings `"NaN"`, `"Infinity"` and
/// `"-Infinity"`; bigints become decimal strings; `undefined` becomes `null`.
/// The encoder closes over the builtins it needs and is bound to a frozen
/// global, so a snippet reassigning `JSON.stringify` or the encoder itself
/// cannot change how its result is encoded.
const RESULT_ENCODER: &str = r#"Object.defineProperty(globalThis, '__calcboxEncode', {
  value: (function (stringify, isFinite, toText) {
    function replacer(key, v) {
      if (typeof v === 'number' && !isFinite(v)) return toText(v);
      if (typeof v === 'bigint') return toText(v);
      return v;
    }
    return function (value) {
      const text = stringify(value, replacer);
      return text === undefined ? 'null' : text;
    };
  })(JSON.stringify, Number.isFinite, String),
  writable: false,
  configurable: false,
});"#;

/// Removes bindings the embedding leaves on the global object
const HOST_GUARD: &str = "delete globalThis.Deno;\ndelete globalThis.__bootstrap;";

const RESERVED_WORDS: &[&str] = &[
    "arguments", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "enum", "eval", "export", "extends", "false", "finally",
    "for", "function", "if", "implements", "import", "in", "instanceof", "interface", "let", "new",
    "null", "package", "private", "protected", "public", "return", "static", "super", "switch",
    "this", "throw", "true", "try", "typeof", "undefined", "var", "void", "while", "with", "yield",
    "Infinity", "NaN",
];

/// Data fields and helpers visible to one snippet
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// `(name, json literal)` pairs in payload order
    bindings: Vec<(String, String)>,
}

impl ExecutionContext {
    /// Build a context from a payload, rejecting field names that would shadow
    /// helpers, collide with internals, or not bind as a `const`.
    pub fn build(data: &Map<String, Value>) -> Result<Self, SandboxError> {
        let mut errors = Vec::new();
        let mut bindings = Vec::with_capacity(data.len());

        for (name, value) in data {
            if helpers::is_helper_name(name) {
                errors.push(format!(
                    "Reserved name: data field '{name}' collides with a helper function"
                ));
                continue;
            }
            if name == ENCODER_NAME {
                errors.push(format!(
                    "Reserved name: data field '{name}' is used internally"
                ));
                continue;
            }
            if !is_identifier(name) || RESERVED_WORDS.contains(&name.as_str()) {
                errors.push(format!(
                    "Invalid data field name: '{name}' is not a JavaScript identifier"
                ));
                continue;
            }
            let literal = serde_json::to_string(value)
                .map_err(|e| SandboxError::Internal(format!("serialize field '{name}': {e}")))?;
            bindings.push((name.clone(), literal));
        }

        if !errors.is_empty() {
            return Err(SandboxError::Validation(errors));
        }
        Ok(Self { bindings })
    }

    /// Compose the full program for `snippet`.
    ///
    /// The completion value of the program is the snippet's result.
    pub fn render(&self, snippet: &str) -> String {
        let mut program = String::with_capacity(snippet.len() + 2048);
        program.push_str(HOST_GUARD);
        program.push('\n');
        program.push_str(&helpers::prelude());
        program.push('\n');
        program.push_str(RESULT_ENCODER);
        program.push('\n');
        for (name, literal) in &self.bindings {
            program.push_str("const ");
            program.push_str(name);
            program.push_str(" = ");
            program.push_str(literal);
            program.push_str(";\n");
        }
        // Resets the completion value so a snippet without a result yields undefined
        program.push_str("void 0;\n");
        if has_top_level_return(snippet) {
            program.push_str("(function () {\n");
            program.push_str(snippet);
            program.push_str("\n})();");
        } else {
            program.push_str(snippet);
        }
        program
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// What an open `{` belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Brace {
    /// Body of a function, arrow, or method
    Function,
    /// Statement block or object literal
    Block,
    /// `${` inside a template literal
    Interpolation,
}

/// The last significant token seen by the scanner
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Start,
    Word(String),
    Punct(char),
    Arrow,
    /// `)` closing a parameter list (`true`) or any other group (`false`)
    CloseParen(bool),
    /// String, template, or regex literal
    Literal,
}

/// Keywords whose parenthesised clause is followed by a statement block
const CLAUSE_KEYWORDS: &[&str] = &["if", "for", "while", "switch", "catch", "with"];

/// Keywords after which a `/` starts a regex literal rather than a division
const OPERAND_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

impl Token {
    fn expects_operand(&self) -> bool {
        match self {
            Token::Start | Token::Arrow => true,
            Token::Punct(c) => *c != ']',
            Token::Word(word) => OPERAND_KEYWORDS.contains(&word.as_str()),
            Token::CloseParen(_) | Token::Literal => false,
        }
    }
}

enum TemplateEnd {
    /// Index just past the closing backtick
    Closed(usize),
    /// Index just past a `${`
    Interpolation(usize),
}

/// Whether `code` has a `return` statement outside every function body.
///
/// Statement blocks do not count: a `return` inside a top-level `if`, `try`,
/// or loop still returns from the snippet. Strings, template literals,
/// comments, and regex literals are skipped.
pub(crate) fn has_top_level_return(code: &str) -> bool {
    let chars: Vec<char> = code.chars().collect();
    let mut braces: Vec<Brace> = Vec::new();
    // One entry per open `(`: whether it starts a parameter list
    let mut parens: Vec<bool> = Vec::new();
    let mut last = Token::Start;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if is_ident_char(c) {
            let start = i;
            while i < chars.len() && is_ident_char(chars[i]) {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            if word == "return"
                && last != Token::Punct('.')
                && !is_property_key(&chars, i)
                && !braces.contains(&Brace::Function)
            {
                return true;
            }
            last = Token::Word(word);
            continue;
        }

        match c {
            '/' if next == Some('/') => {
                i = skip_line_comment(&chars, i);
                continue;
            }
            '/' if next == Some('*') => {
                i = skip_block_comment(&chars, i);
                continue;
            }
            '/' if last.expects_operand() => {
                i = skip_regex(&chars, i);
                last = Token::Literal;
                continue;
            }
            '\'' | '"' => {
                i = skip_string(&chars, i, c);
                last = Token::Literal;
                continue;
            }
            '`' => {
                i = enter_template(&chars, i + 1, &mut braces, &mut last);
                continue;
            }
            '=' if next == Some('>') => {
                last = Token::Arrow;
                i += 2;
                continue;
            }
            '(' => {
                let parameters = match &last {
                    Token::Word(word) => !CLAUSE_KEYWORDS.contains(&word.as_str()),
                    _ => false,
                };
                parens.push(parameters);
                last = Token::Punct('(');
            }
            ')' => last = Token::CloseParen(parens.pop().unwrap_or(false)),
            '{' => {
                let kind = match last {
                    Token::Arrow | Token::CloseParen(true) => Brace::Function,
                    _ => Brace::Block,
                };
                braces.push(kind);
                last = Token::Punct('{');
            }
            '}' => {
                if braces.pop() == Some(Brace::Interpolation) {
                    i = enter_template(&chars, i + 1, &mut braces, &mut last);
                    continue;
                }
                last = Token::Punct('}');
            }
            _ => last = Token::Punct(c),
        }
        i += 1;
    }
    false
}

/// Whether the word ending at `end` is followed by `:`, as in `{ return: 1 }`
fn is_property_key(chars: &[char], end: usize) -> bool {
    chars[end..]
        .iter()
        .find(|c| !c.is_whitespace())
        .is_some_and(|&c| c == ':')
}

/// Scan template text from `from`, either to its end or into an interpolation.
fn enter_template(
    chars: &[char],
    from: usize,
    braces: &mut Vec<Brace>,
    last: &mut Token,
) -> usize {
    match scan_template(chars, from) {
        TemplateEnd::Closed(end) => {
            *last = Token::Literal;
            end
        }
        TemplateEnd::Interpolation(after) => {
            braces.push(Brace::Interpolation);
            *last = Token::Punct('{');
            after
        }
    }
}

fn scan_template(chars: &[char], mut i: usize) -> TemplateEnd {
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '`' => return TemplateEnd::Closed(i + 1),
            '$' if chars.get(i + 1) == Some(&'{') => return TemplateEnd::Interpolation(i + 2),
            _ => {}
        }
        i += 1;
    }
    TemplateEnd::Closed(chars.len())
}

fn skip_string(chars: &[char], open: usize, quote: char) -> usize {
    let mut i = open + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            c if c == quote => return i + 1,
            _ => {}
        }
        i += 1;
    }
    chars.len()
}

fn skip_line_comment(chars: &[char], open: usize) -> usize {
    chars[open..]
        .iter()
        .position(|&c| c == '\n')
        .map_or(chars.len(), |offset| open + offset)
}

fn skip_block_comment(chars: &[char], open: usize) -> usize {
    let mut i = open + 2;
    while i + 1 < chars.len() {
        if chars[i] == '*' && chars[i + 1] == '/' {
            return i + 2;
        }
        i += 1;
    }
    chars.len()
}

/// Skip a regex literal body; `/` inside a character class does not close it.
fn skip_regex(chars: &[char], open: usize) -> usize {
    let mut in_class = false;
    let mut i = open + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '\n' => return i,
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => return i + 1,
            _ => {}
        }
        i += 1;
    }
    chars.len()
}
