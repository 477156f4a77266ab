//! Quote-aware decomposition of shell strings into simple commands.

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::syntax::validate_syntax;
use crate::security::SecurityError;

static ASSIGNMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*\+?=").expect("valid regex"));

/// Variables whose inline override changes which program runs or what it loads.
const LOADER_VARIABLES: &[&str] = &[
    "PATH",
    "LD_PRELOAD",
    "LD_LIBRARY_PATH",
    "LD_AUDIT",
    "DYLD_INSERT_LIBRARIES",
    "DYLD_LIBRARY_PATH",
    "BASH_ENV",
    "ENV",
    "IFS",
];

/// Reserved words that open or close compound commands when unquoted in command position.
const RESERVED_WORDS: &[&str] = &[
    "if", "then", "elif", "else", "fi", "for", "select", "while", "until", "do", "done",
    "case", "esac", "function", "{", "}", "!", "[[", "]]", "time", "coproc",
];

/// Shell operator joining two simple commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
    #[serde(rename = ";")]
    Semi,
    #[serde(rename = "|")]
    Pipe,
    #[serde(rename = "&")]
    Background,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Semi => ";",
            Operator::Pipe => "|",
            Operator::Background => "&",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pipeline stage: an executable and its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleCommand {
    pub command: String,
    pub args: Vec<String>,
    /// Executable and arguments after quote removal, joined by single spaces.
    pub raw_text: String,
    /// Set when the command or an argument contains `$` or backtick expansion.
    #[serde(default)]
    pub has_expansion: bool,
}

impl SimpleCommand {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        let command = command.into();
        let raw_text = std::iter::once(command.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            command,
            args,
            raw_text,
            has_expansion: false,
        }
    }
}

/// Ordered simple commands and the operators between them.
///
/// `operators[i]` joins `commands[i]` and `commands[i + 1]`. Subshell groups are
/// flattened in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexCommand {
    pub commands: Vec<SimpleCommand>,
    pub operators: Vec<Operator>,
}

impl ComplexCommand {
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SimpleCommand> {
        self.commands.iter()
    }

    fn append(&mut self, operator: Option<Operator>, mut other: ComplexCommand) {
        if let Some(op) = operator {
            self.operators.push(op);
        }
        self.commands.append(&mut other.commands);
        self.operators.append(&mut other.operators);
    }
}

/// Split a shell string into its simple commands.
///
/// Fails on anything the scanner cannot account for with certainty; callers must
/// treat a failure as "no match".
pub fn decompose(raw: &str) -> Result<ComplexCommand, SecurityError> {
    let tokens = Lexer::new(raw).tokenize()?;
    let mut parser = TokenParser {
        tokens,
        pos: 0,
        source: raw,
    };
    let complex = parser.parse_list(0)?;
    if complex.is_empty() {
        return Err(SecurityError::EmptySegment {
            operator: String::new(),
        });
    }
    validate_syntax(raw)?;
    Ok(complex)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Word {
    text: String,
    raw: String,
    has_expansion: bool,
    has_substitution: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(Word),
    Op(Operator),
    Redirect(String),
    Open,
    Close,
}

struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    tokens: Vec<Token>,
    word: Option<Word>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            tokens: Vec::new(),
            word: None,
        }
    }

    fn word(&mut self) -> &mut Word {
        self.word.get_or_insert_with(|| Word {
            text: String::new(),
            raw: String::new(),
            has_expansion: false,
            has_substitution: false,
        })
    }

    fn finish_word(&mut self) {
        if let Some(word) = self.word.take() {
            self.tokens.push(Token::Word(word));
        }
    }

    fn push(&mut self, token: Token) {
        self.finish_word();
        self.tokens.push(token);
    }

    fn peek_is(&mut self, c: char) -> bool {
        self.chars.peek().map(|(_, next)| *next) == Some(c)
    }

    fn unterminated(&self) -> SecurityError {
        SecurityError::UnterminatedQuote(self.source.to_string())
    }

    fn tokenize(mut self) -> Result<Vec<Token>, SecurityError> {
        while let Some((_, c)) = self.chars.next() {
            match c {
                ' ' | '\t' | '\r' => self.finish_word(),
                '\n' => self.push(Token::Op(Operator::Semi)),
                '#' if self.word.is_none() => {
                    while let Some((_, next)) = self.chars.peek() {
                        if *next == '\n' {
                            break;
                        }
                        self.chars.next();
                    }
                }
                '\'' => self.single_quoted()?,
                '"' => self.double_quoted()?,
                '\\' => match self.chars.next() {
                    Some((_, '\n')) => {}
                    Some((_, escaped)) => {
                        let word = self.word();
                        word.text.push(escaped);
                        word.raw.push('\\');
                        word.raw.push(escaped);
                    }
                    None => return Err(self.unterminated()),
                },
                '$' => self.dollar()?,
                '`' => self.backtick()?,
                '&' => {
                    if self.peek_is('&') {
                        self.chars.next();
                        self.push(Token::Op(Operator::And));
                    } else if self.peek_is('>') {
                        self.chars.next();
                        let op = if self.peek_is('>') {
                            self.chars.next();
                            "&>>"
                        } else {
                            "&>"
                        };
                        self.push(Token::Redirect(op.to_string()));
                    } else {
                        self.push(Token::Op(Operator::Background));
                    }
                }
                '|' => {
                    if self.peek_is('|') {
                        self.chars.next();
                        self.push(Token::Op(Operator::Or));
                    } else {
                        if self.peek_is('&') {
                            self.chars.next();
                        }
                        self.push(Token::Op(Operator::Pipe));
                    }
                }
                ';' => {
                    if self.peek_is(';') || self.peek_is('&') {
                        return Err(SecurityError::Unsupported("case terminator".into()));
                    }
                    self.push(Token::Op(Operator::Semi));
                }
                '(' => {
                    if self.word.is_some() {
                        return Err(SecurityError::Unsupported(format!(
                            "'(' inside a word: {}",
                            self.source
                        )));
                    }
                    self.push(Token::Open);
                }
                ')' => self.push(Token::Close),
                '<' | '>' => {
                    if self.word.is_none() && self.peek_is('(') {
                        self.chars.next();
                        let body = self.substitution(')')?;
                        let word = self.word();
                        word.text.push(c);
                        word.text.push('(');
                        word.text.push_str(&body);
                        word.text.push(')');
                        word.raw = word.text.clone();
                        word.has_expansion = true;
                        word.has_substitution = true;
                    } else {
                        self.redirect(c)?;
                    }
                }
                other => {
                    let word = self.word();
                    word.text.push(other);
                    word.raw.push(other);
                }
            }
        }
        self.finish_word();
        Ok(self.tokens)
    }

    fn single_quoted(&mut self) -> Result<(), SecurityError> {
        let mut text = String::new();
        loop {
            match self.chars.next() {
                Some((_, '\'')) => break,
                Some((_, c)) => text.push(c),
                None => return Err(self.unterminated()),
            }
        }
        let word = self.word();
        word.raw.push('\'');
        word.raw.push_str(&text);
        word.raw.push('\'');
        word.text.push_str(&text);
        Ok(())
    }

    fn double_quoted(&mut self) -> Result<(), SecurityError> {
        self.word().raw.push('"');
        loop {
            match self.chars.next() {
                Some((_, '"')) => break,
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, escaped @ ('$' | '`' | '"' | '\\'))) => {
                        let word = self.word();
                        word.text.push(escaped);
                        word.raw.push('\\');
                        word.raw.push(escaped);
                    }
                    Some((_, '\n')) => {}
                    Some((_, other)) => {
                        let word = self.word();
                        word.text.push('\\');
                        word.text.push(other);
                        word.raw.push('\\');
                        word.raw.push(other);
                    }
                    None => return Err(self.unterminated()),
                },
                Some((_, '$')) => self.dollar()?,
                Some((_, '`')) => self.backtick()?,
                Some((_, c)) => {
                    let word = self.word();
                    word.text.push(c);
                    word.raw.push(c);
                }
                None => return Err(self.unterminated()),
            }
        }
        self.word().raw.push('"');
        Ok(())
    }

    fn dollar(&mut self) -> Result<(), SecurityError> {
        if self.peek_is('(') {
            self.chars.next();
            let body = self.substitution(')')?;
            let text = format!("$({})", body);
            let word = self.word();
            word.text.push_str(&text);
            word.raw.push_str(&text);
            word.has_substitution = true;
        } else if self.peek_is('{') {
            self.chars.next();
            let mut text = String::from("${");
            loop {
                match self.chars.next() {
                    Some((_, '}')) => break,
                    Some((_, c)) => text.push(c),
                    None => return Err(self.unterminated()),
                }
            }
            text.push('}');
            let word = self.word();
            word.text.push_str(&text);
            word.raw.push_str(&text);
        } else {
            let word = self.word();
            word.text.push('$');
            word.raw.push('$');
        }
        self.word().has_expansion = true;
        Ok(())
    }

    fn backtick(&mut self) -> Result<(), SecurityError> {
        let mut text = String::from("`");
        loop {
            match self.chars.next() {
                Some((_, '`')) => break,
                Some((_, '\\')) => {
                    text.push('\\');
                    match self.chars.next() {
                        Some((_, c)) => text.push(c),
                        None => return Err(self.unterminated()),
                    }
                }
                Some((_, c)) => text.push(c),
                None => return Err(self.unterminated()),
            }
        }
        text.push('`');
        let word = self.word();
        word.text.push_str(&text);
        word.raw.push_str(&text);
        word.has_expansion = true;
        word.has_substitution = true;
        Ok(())
    }

    /// Read the body of `$(...)`, `<(...)` or `>(...)` up to its balanced closer.
    fn substitution(&mut self, closer: char) -> Result<String, SecurityError> {
        let mut body = String::new();
        let mut depth = 1usize;
        let mut quote: Option<char> = None;
        loop {
            let Some((_, c)) = self.chars.next() else {
                return Err(match quote {
                    Some(_) => self.unterminated(),
                    None => SecurityError::UnbalancedGroup(self.source.to_string()),
                });
            };
            match (quote, c) {
                (Some(q), _) if c == q => quote = None,
                (Some('"'), '\\') | (None, '\\') => {
                    body.push(c);
                    if let Some((_, escaped)) = self.chars.next() {
                        body.push(escaped);
                    }
                    continue;
                }
                (Some(_), _) => {}
                (None, '\'' | '"' | '`') => quote = Some(c),
                (None, '(') => depth += 1,
                (None, _) if c == closer => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            body.push(c);
        }
        Ok(body)
    }

    fn redirect(&mut self, first: char) -> Result<(), SecurityError> {
        // A bare fd number directly before the operator belongs to the redirection.
        let fd_prefix = self
            .word
            .as_ref()
            .is_some_and(|w| !w.raw.is_empty() && w.raw.chars().all(|c| c.is_ascii_digit()));
        if fd_prefix {
            self.word = None;
        }

        let mut op = String::from(first);
        if first == '<' && self.peek_is('<') {
            self.chars.next();
            if self.peek_is('<') {
                self.chars.next();
                op.push_str("<<");
            } else {
                return Err(SecurityError::Unsupported("heredoc".into()));
            }
        } else if first == '>' && self.peek_is('>') {
            self.chars.next();
            op.push('>');
        } else if self.peek_is('&') || self.peek_is('|') || (first == '<' && self.peek_is('>')) {
            if let Some((_, c)) = self.chars.next() {
                op.push(c);
            }
        }
        self.push(Token::Redirect(op));
        Ok(())
    }
}

struct TokenParser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    source: &'a str,
}

impl TokenParser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn unbalanced(&self) -> SecurityError {
        SecurityError::UnbalancedGroup(self.source.to_string())
    }

    fn parse_list(&mut self, depth: usize) -> Result<ComplexCommand, SecurityError> {
        let mut result = ComplexCommand::default();
        let mut pending: Option<Operator> = None;

        loop {
            let segment = match self.peek() {
                Some(Token::Open) => {
                    self.next();
                    let inner = self.parse_list(depth + 1)?;
                    if inner.is_empty() {
                        return Err(SecurityError::EmptySegment {
                            operator: "(".into(),
                        });
                    }
                    match self.next() {
                        Some(Token::Close) => {}
                        _ => return Err(self.unbalanced()),
                    }
                    self.trailing_redirects()?;
                    inner
                }
                Some(Token::Word(_)) | Some(Token::Redirect(_)) => {
                    let command = self.simple_command()?;
                    ComplexCommand {
                        commands: vec![command],
                        operators: Vec::new(),
                    }
                }
                Some(Token::Op(op)) => {
                    return Err(SecurityError::EmptySegment {
                        operator: op.to_string(),
                    });
                }
                Some(Token::Close) | None => {
                    // Only a command-less list or a trailing `;`/`&` may end here.
                    return match pending {
                        Some(op @ (Operator::And | Operator::Or | Operator::Pipe)) => {
                            Err(SecurityError::EmptySegment {
                                operator: op.to_string(),
                            })
                        }
                        _ => self.end_list(depth, result),
                    };
                }
            };

            let joiner = if result.is_empty() { None } else { pending };
            result.append(joiner, segment);

            match self.peek() {
                Some(Token::Op(op)) => {
                    pending = Some(*op);
                    self.next();
                }
                Some(Token::Close) | None => return self.end_list(depth, result),
                Some(Token::Open) | Some(Token::Word(_)) | Some(Token::Redirect(_)) => {
                    return Err(SecurityError::Unsupported(format!(
                        "unexpected token after group: {}",
                        self.source
                    )));
                }
            }
        }
    }

    fn end_list(
        &mut self,
        depth: usize,
        result: ComplexCommand,
    ) -> Result<ComplexCommand, SecurityError> {
        match self.peek() {
            Some(Token::Close) if depth == 0 => Err(self.unbalanced()),
            None if depth > 0 => Err(self.unbalanced()),
            _ => Ok(result),
        }
    }

    fn trailing_redirects(&mut self) -> Result<(), SecurityError> {
        while let Some(Token::Redirect(op)) = self.peek().cloned() {
            self.next();
            self.redirect_target(&op)?;
        }
        Ok(())
    }

    fn redirect_target(&mut self, op: &str) -> Result<(), SecurityError> {
        match self.next() {
            Some(Token::Word(target)) => {
                if target.has_substitution {
                    return Err(SecurityError::Unsupported(format!(
                        "command substitution in redirection target: {}",
                        target.raw
                    )));
                }
                Ok(())
            }
            _ => Err(SecurityError::DanglingRedirect(op.to_string())),
        }
    }

    fn simple_command(&mut self) -> Result<SimpleCommand, SecurityError> {
        let mut words: Vec<Word> = Vec::new();

        loop {
            match self.peek().cloned() {
                Some(Token::Word(word)) => {
                    self.next();
                    if words.is_empty() && ASSIGNMENT_RE.is_match(&word.raw) {
                        Self::check_assignment(&word)?;
                        continue;
                    }
                    words.push(word);
                }
                Some(Token::Redirect(op)) => {
                    self.next();
                    self.redirect_target(&op)?;
                }
                Some(Token::Open) => {
                    return Err(SecurityError::Unsupported(format!(
                        "'(' after command words: {}",
                        self.source
                    )));
                }
                Some(Token::Op(_)) | Some(Token::Close) | None => break,
            }
        }

        let mut words = words.into_iter();
        let Some(first) = words.next() else {
            return Err(SecurityError::Unsupported(format!(
                "segment without a command: {}",
                self.source
            )));
        };

        if RESERVED_WORDS.contains(&first.raw.as_str()) {
            return Err(SecurityError::Unsupported(format!(
                "compound command '{}': {}",
                first.raw, self.source
            )));
        }

        let mut has_expansion = first.has_expansion;
        let args: Vec<String> = words
            .map(|w| {
                has_expansion |= w.has_expansion;
                w.text
            })
            .collect();

        let mut command = SimpleCommand::new(first.text, args);
        command.has_expansion = has_expansion;
        Ok(command)
    }

    fn check_assignment(word: &Word) -> Result<(), SecurityError> {
        let name = word
            .raw
            .split(['=', '+'])
            .next()
            .unwrap_or_default();
        if LOADER_VARIABLES.contains(&name) || name.starts_with("DYLD_") {
            return Err(SecurityError::Unsupported(format!(
                "inline override of {}",
                name
            )));
        }
        if word.has_substitution {
            return Err(SecurityError::Unsupported(format!(
                "command substitution in assignment: {}",
                word.raw
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(raw: &str) -> Vec<String> {
        decompose(raw)
            .unwrap()
            .commands
            .into_iter()
            .map(|c| c.raw_text)
            .collect()
    }

    #[test]
    fn test_single_command() {
        let complex = decompose("ls -la src").unwrap();
        assert_eq!(complex.len(), 1);
        assert_eq!(complex.commands[0].command, "ls");
        assert_eq!(complex.commands[0].args, vec!["-la", "src"]);
        assert_eq!(complex.commands[0].raw_text, "ls -la src");
        assert!(complex.operators.is_empty());
    }

    #[test]
    fn test_operators_split() {
        let complex = decompose("git add . && git commit -m wip || echo failed; ls | wc -l").unwrap();
        assert_eq!(
            complex.iter().map(|c| c.command.as_str()).collect::<Vec<_>>(),
            vec!["git", "git", "echo", "ls", "wc"]
        );
        assert_eq!(
            complex.operators,
            vec![Operator::And, Operator::Or, Operator::Semi, Operator::Pipe]
        );
    }

    #[test]
    fn test_quoted_operator_is_literal() {
        let complex = decompose(r#"echo "a && b""#).unwrap();
        assert_eq!(complex.len(), 1);
        assert_eq!(complex.commands[0].command, "echo");
        assert_eq!(complex.commands[0].args, vec!["a && b"]);

        let complex = decompose("echo 'x | y; z'").unwrap();
        assert_eq!(complex.len(), 1);
    }

    #[test]
    fn test_escaped_operator_is_literal() {
        let complex = decompose(r"echo a \&\& b").unwrap();
        assert_eq!(complex.len(), 1);
        assert_eq!(complex.commands[0].raw_text, "echo a && b");
    }

    #[test]
    fn test_env_assignments_stripped() {
        let complex = decompose("VAR=1 OTHER='x y' ls").unwrap();
        assert_eq!(complex.commands[0].raw_text, "ls");
        assert!(complex.commands[0].args.is_empty());
    }

    #[test]
    fn test_compound_commands_rejected() {
        for command in [
            "if true; then ls; fi",
            "for f in a b; do ls; done",
            "while true; do pwd; done",
            "{ ls; }",
            "! ls",
            "ls && time make",
        ] {
            assert!(
                matches!(decompose(command), Err(SecurityError::Unsupported(_))),
                "{command}"
            );
        }
        assert_eq!(names("'if' x"), vec!["if x"]);
        assert_eq!(names("echo if then fi"), vec!["echo if then fi"]);
    }

    #[test]
    fn test_loader_variable_override_rejected() {
        assert!(decompose("PATH=/tmp/evil ls").is_err());
        assert!(decompose("LD_PRELOAD=x.so ls").is_err());
    }

    #[test]
    fn test_redirections_stripped() {
        assert_eq!(names("cargo test > out.log 2>&1"), vec!["cargo test"]);
        assert_eq!(names("cat < input.txt"), vec!["cat"]);
        assert_eq!(names("echo hi>>log.txt"), vec!["echo hi"]);
        assert_eq!(names("make &> build.log"), vec!["make"]);
    }

    #[test]
    fn test_subshell_recursion() {
        let complex = decompose("(cd src && ls) | wc -l").unwrap();
        assert_eq!(
            complex.iter().map(|c| c.raw_text.as_str()).collect::<Vec<_>>(),
            vec!["cd src", "ls", "wc -l"]
        );
        assert_eq!(complex.operators, vec![Operator::And, Operator::Pipe]);
    }

    #[test]
    fn test_nested_subshells() {
        let complex = decompose("( (pwd); ls) && pwd").unwrap();
        assert_eq!(complex.len(), 3);
        assert_eq!(complex.operators.len(), 2);
    }

    #[test]
    fn test_background_and_trailing_separator() {
        let complex = decompose("sleep 1 & ls;").unwrap();
        assert_eq!(complex.len(), 2);
        assert_eq!(complex.operators, vec![Operator::Background]);
    }

    #[test]
    fn test_unterminated_quote_fails() {
        let err = decompose("echo \"unterminated").unwrap_err();
        assert!(err.is_parse_failure());
        assert!(decompose("echo 'oops").is_err());
    }

    #[test]
    fn test_unbalanced_group_fails() {
        assert!(matches!(
            decompose("(ls && pwd"),
            Err(SecurityError::UnbalancedGroup(_))
        ));
        assert!(matches!(
            decompose("ls)"),
            Err(SecurityError::UnbalancedGroup(_))
        ));
    }

    #[test]
    fn test_dangling_operator_fails() {
        assert!(decompose("ls &&").is_err());
        assert!(decompose("&& ls").is_err());
        assert!(decompose("ls | | wc").is_err());
        assert!(decompose("").is_err());
    }

    #[test]
    fn test_command_substitution_kept_in_word() {
        let complex = decompose("echo $(git rev-parse HEAD && date)").unwrap();
        assert_eq!(complex.len(), 1);
        assert!(complex.commands[0].has_expansion);
        assert_eq!(
            complex.commands[0].raw_text,
            "echo $(git rev-parse HEAD && date)"
        );
    }

    #[test]
    fn test_hidden_substitution_rejected() {
        assert!(decompose("X=$(rm -rf ~) ls").is_err());
        assert!(decompose("ls > $(echo /etc/passwd)").is_err());
    }

    #[test]
    fn test_heredoc_rejected() {
        assert!(decompose("cat <<EOF\nhi\nEOF").is_err());
    }

    #[test]
    fn test_variable_marks_expansion() {
        let complex = decompose("cd $HOME").unwrap();
        assert!(complex.commands[0].has_expansion);
        let complex = decompose("cd '$HOME'").unwrap();
        assert!(!complex.commands[0].has_expansion);
    }
}
