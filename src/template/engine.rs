//! Template interpreter
//!
//! Supported syntax:
//!
//! ```text
//! {{ name }}              variable from the context
//! {{ pluralize prefix }}  helper applied to a variable
//! {{ quote "key" }}       helper applied to a string literal
//! {% if flag %} ... {% else %} ... {% endif %}
//! {% if not flag %} ... {% endif %}
//! {# comment #}
//! ```
//!
//! A newline directly after a `{% %}` tag or a comment is dropped, as is
//! indentation in front of one, so block tags can sit on their own lines.

use super::TemplateContext;
use crate::error::TemplateError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Text(String),
    Expr { body: String, line: usize },
    Tag { body: String, line: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Arg {
    Variable(String),
    Literal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Text(String),
    Var {
        name: String,
    },
    Call {
        helper: String,
        arg: Arg,
        line: usize,
    },
    If {
        flag: String,
        negate: bool,
        then_branch: Vec<Node>,
        else_branch: Vec<Node>,
    },
}

/// A compiled template
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(name: &str, source: &str) -> Result<Self, TemplateError> {
        let tokens = tokenize(name, source)?;
        let nodes = Parser::new(name).parse(tokens)?;
        Ok(Self {
            name: name.to_string(),
            nodes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn render(&self, ctx: &TemplateContext<'_>) -> Result<String, TemplateError> {
        let mut out = String::new();
        self.render_nodes(&self.nodes, ctx, &mut out)?;
        Ok(out)
    }

    fn render_nodes(
        &self,
        nodes: &[Node],
        ctx: &TemplateContext<'_>,
        out: &mut String,
    ) -> Result<(), TemplateError> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Var { name } => out.push_str(&self.lookup(ctx, name)?),
                Node::Call { helper, arg, line } => {
                    let value = match arg {
                        Arg::Variable(name) => self.lookup(ctx, name)?,
                        Arg::Literal(value) => value.clone(),
                    };
                    let rendered = ctx.helper(helper, &value).ok_or_else(|| TemplateError::Syntax {
                        template: self.name.clone(),
                        line: *line,
                        message: format!("unknown helper '{}'", helper),
                    })?;
                    out.push_str(&rendered);
                }
                Node::If {
                    flag,
                    negate,
                    then_branch,
                    else_branch,
                } => {
                    let value = ctx.flag(flag).ok_or_else(|| TemplateError::UnknownFlag {
                        template: self.name.clone(),
                        name: flag.clone(),
                    })?;
                    let branch = if value != *negate { then_branch } else { else_branch };
                    self.render_nodes(branch, ctx, out)?;
                }
            }
        }
        Ok(())
    }

    fn lookup(&self, ctx: &TemplateContext<'_>, name: &str) -> Result<String, TemplateError> {
        ctx.variable(name).ok_or_else(|| TemplateError::UnknownVariable {
            template: self.name.clone(),
            name: name.to_string(),
        })
    }
}

fn tokenize(name: &str, source: &str) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut rest = source;
    let mut line = 1;
    let mut trim_newline = false;

    loop {
        let next = ["{{", "{%", "{#"]
            .iter()
            .filter_map(|open| rest.find(open).map(|i| (i, *open)))
            .min_by_key(|(i, _)| *i);

        let Some((start, open)) = next else {
            push_text(&mut tokens, rest, trim_newline, false);
            break;
        };

        let is_block = open != "{{";
        push_text(&mut tokens, &rest[..start], trim_newline, is_block);
        line += rest[..start].matches('\n').count();

        let close = match open {
            "{{" => "}}",
            "{%" => "%}",
            _ => "#}",
        };
        let after = &rest[start + 2..];
        let end = after.find(close).ok_or_else(|| TemplateError::Syntax {
            template: name.to_string(),
            line,
            message: format!("unclosed `{}`", open),
        })?;
        let body = after[..end].trim().to_string();

        match open {
            "{{" => tokens.push(Token::Expr { body, line }),
            "{%" => tokens.push(Token::Tag { body, line }),
            _ => {}
        }

        line += after[..end].matches('\n').count();
        trim_newline = is_block;
        rest = &after[end + close.len()..];
    }

    Ok(tokens)
}

fn push_text(tokens: &mut Vec<Token>, text: &str, trim_leading_newline: bool, before_block: bool) {
    let mut text = text;
    if trim_leading_newline {
        text = text
            .strip_prefix("\r\n")
            .or_else(|| text.strip_prefix('\n'))
            .unwrap_or(text);
    }
    if before_block {
        // drop indentation in front of a block tag
        let line_start = text.rfind('\n').map(|i| i + 1).unwrap_or(0);
        if text[line_start..].chars().all(|c| c == ' ' || c == '\t') {
            text = &text[..line_start];
        }
    }
    if !text.is_empty() {
        tokens.push(Token::Text(text.to_string()));
    }
}

fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

struct Frame {
    flag: String,
    negate: bool,
    line: usize,
    then_branch: Vec<Node>,
    else_branch: Option<Vec<Node>>,
}

struct Parser<'a> {
    name: &'a str,
    root: Vec<Node>,
    stack: Vec<Frame>,
}

impl<'a> Parser<'a> {
    fn new(name: &'a str) -> Self {
        Self {
            name,
            root: Vec::new(),
            stack: Vec::new(),
        }
    }

    fn error(&self, line: usize, message: impl Into<String>) -> TemplateError {
        TemplateError::Syntax {
            template: self.name.to_string(),
            line,
            message: message.into(),
        }
    }

    fn current(&mut self) -> &mut Vec<Node> {
        match self.stack.last_mut() {
            Some(Frame {
                else_branch: Some(nodes),
                ..
            }) => nodes,
            Some(frame) => &mut frame.then_branch,
            None => &mut self.root,
        }
    }

    fn parse(mut self, tokens: Vec<Token>) -> Result<Vec<Node>, TemplateError> {
        for token in tokens {
            match token {
                Token::Text(text) => self.current().push(Node::Text(text)),
                Token::Expr { body, line } => {
                    let node = self.parse_expr(&body, line)?;
                    self.current().push(node);
                }
                Token::Tag { body, line } => self.parse_tag(&body, line)?,
            }
        }

        if let Some(frame) = self.stack.last() {
            return Err(self.error(frame.line, format!("`if {}` is never closed", frame.flag)));
        }
        Ok(self.root)
    }

    fn parse_expr(&self, body: &str, line: usize) -> Result<Node, TemplateError> {
        let words: Vec<&str> = body.split_whitespace().collect();
        match words.as_slice() {
            [name] if is_identifier(name) => Ok(Node::Var {
                name: name.to_string(),
            }),
            [helper, arg] if is_identifier(helper) => {
                let arg = if let Some(literal) = arg.strip_prefix('"').and_then(|a| a.strip_suffix('"')) {
                    Arg::Literal(literal.to_string())
                } else if is_identifier(arg) {
                    Arg::Variable(arg.to_string())
                } else {
                    return Err(self.error(line, format!("invalid argument `{}`", arg)));
                };
                Ok(Node::Call {
                    helper: helper.to_string(),
                    arg,
                    line,
                })
            }
            _ => Err(self.error(line, format!("invalid expression `{{{{ {} }}}}`", body))),
        }
    }

    fn parse_tag(&mut self, body: &str, line: usize) -> Result<(), TemplateError> {
        let words: Vec<&str> = body.split_whitespace().collect();
        match words.as_slice() {
            ["if", flag] if is_identifier(flag) => self.open_if(flag, false, line),
            ["if", "not", flag] if is_identifier(flag) => self.open_if(flag, true, line),
            ["else"] => match self.stack.last().map(|frame| frame.else_branch.is_some()) {
                Some(false) => {
                    if let Some(frame) = self.stack.last_mut() {
                        frame.else_branch = Some(Vec::new());
                    }
                    Ok(())
                }
                Some(true) => Err(self.error(line, "duplicate `else`")),
                None => Err(self.error(line, "`else` outside of `if`")),
            },
            ["endif"] => {
                let frame = self
                    .stack
                    .pop()
                    .ok_or_else(|| self.error(line, "`endif` without `if`"))?;
                let node = Node::If {
                    flag: frame.flag,
                    negate: frame.negate,
                    then_branch: frame.then_branch,
                    else_branch: frame.else_branch.unwrap_or_default(),
                };
                self.current().push(node);
                Ok(())
            }
            _ => Err(self.error(line, format!("invalid tag `{{% {} %}}`", body))),
        }
    }

    fn open_if(&mut self, flag: &str, negate: bool, line: usize) -> Result<(), TemplateError> {
        self.stack.push(Frame {
            flag: flag.to_string(),
            negate,
            line,
            then_branch: Vec::new(),
            else_branch: None,
        });
        Ok(())
    }
}
