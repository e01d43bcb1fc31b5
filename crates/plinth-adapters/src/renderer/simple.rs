//! Minimal handlebars-style renderer over the context data tree.
//!
//! Supported syntax:
//!
//! - `{{a.b.c}}`: dot-path lookup. Strings are inserted verbatim, `null` and
//!   missing values render as the empty string, anything else as compact JSON.
//! - `{{#if a.b}}…{{else}}…{{/if}}`: blocks nest; the branch is chosen by the
//!   shared truthiness rule.
//!
//! Unterminated tags, unbalanced blocks and any other `{{#helper}}` are
//! rendering errors.

use plinth_core::{
    application::{ApplicationError, ports::TemplateEvaluator},
    domain::{ExecutionContext, is_truthy_opt},
    error::PlinthResult,
};
use serde_json::Value;
use tracing::trace;

/// Renderer with variable substitution and `#if` blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleRenderer;

impl SimpleRenderer {
    /// Create a new simple renderer.
    pub fn new() -> Self {
        Self
    }
}

impl TemplateEvaluator for SimpleRenderer {
    fn render(&self, template: &str, ctx: &ExecutionContext) -> PlinthResult<String> {
        if !template.contains("{{") {
            return Ok(template.to_string());
        }

        let nodes = parse(template).map_err(|reason| ApplicationError::RenderingFailed {
            reason: format!("{reason} in '{template}'"),
        })?;

        let mut out = String::with_capacity(template.len());
        write_nodes(&nodes, ctx, &mut out);
        Ok(out)
    }
}

// ============================================================================
// Tokens
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Text(&'a str),
    Var(&'a str),
    If(&'a str),
    Else,
    EndIf,
}

fn tokenize(template: &str) -> Result<Vec<Token<'_>>, String> {
    let mut tokens = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        if start > 0 {
            tokens.push(Token::Text(&rest[..start]));
        }
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or_else(|| {
            format!(
                "unterminated tag at offset {}",
                template.len() - rest.len() + start
            )
        })?;
        tokens.push(classify(after[..end].trim())?);
        rest = &after[end + 2..];
    }

    if !rest.is_empty() {
        tokens.push(Token::Text(rest));
    }
    Ok(tokens)
}

fn classify(tag: &str) -> Result<Token<'_>, String> {
    if let Some(helper) = tag.strip_prefix('#') {
        let (name, arg) = match helper.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (helper, ""),
        };
        return match name {
            "if" if !arg.is_empty() => Ok(Token::If(arg)),
            "if" => Err("'{{#if}}' needs a path".into()),
            other => Err(format!("unsupported helper '#{other}'")),
        };
    }
    if let Some(name) = tag.strip_prefix('/') {
        return match name.trim() {
            "if" => Ok(Token::EndIf),
            other => Err(format!("unexpected closing tag '/{other}'")),
        };
    }
    match tag {
        "else" => Ok(Token::Else),
        "" => Err("empty tag".into()),
        path => Ok(Token::Var(path)),
    }
}

// ============================================================================
// Tree
// ============================================================================

#[derive(Debug)]
enum Node<'a> {
    Text(&'a str),
    Var(&'a str),
    If {
        path: &'a str,
        then: Vec<Node<'a>>,
        otherwise: Vec<Node<'a>>,
    },
}

fn parse(template: &str) -> Result<Vec<Node<'_>>, String> {
    let tokens = tokenize(template)?;
    let mut pos = 0;
    match block(&tokens, &mut pos, 0)? {
        (nodes, None) => Ok(nodes),
        (_, Some(Token::Else)) => Err("'{{else}}' outside an '{{#if}}' block".into()),
        (_, Some(_)) => Err("'{{/if}}' without a matching '{{#if}}'".into()),
    }
}

/// Parse until the end of input or an `else`/`/if` token, which is returned.
fn block<'a>(
    tokens: &[Token<'a>],
    pos: &mut usize,
    depth: usize,
) -> Result<(Vec<Node<'a>>, Option<Token<'a>>), String> {
    let mut nodes = Vec::new();

    while let Some(&token) = tokens.get(*pos) {
        *pos += 1;
        match token {
            Token::Text(t) => nodes.push(Node::Text(t)),
            Token::Var(p) => nodes.push(Node::Var(p)),
            Token::If(path) => {
                let (then, end) = block(tokens, pos, depth + 1)?;
                let otherwise = match end {
                    Some(Token::EndIf) => Vec::new(),
                    Some(Token::Else) => match block(tokens, pos, depth + 1)? {
                        (otherwise, Some(Token::EndIf)) => otherwise,
                        (_, Some(Token::Else)) => {
                            return Err(format!("second '{{{{else}}}}' in '{{{{#if {path}}}}}'"));
                        }
                        _ => return Err(format!("unclosed '{{{{#if {path}}}}}'")),
                    },
                    _ => return Err(format!("unclosed '{{{{#if {path}}}}}'")),
                };
                nodes.push(Node::If {
                    path,
                    then,
                    otherwise,
                });
            }
            // The caller decides whether a terminator is legal at this depth.
            Token::Else | Token::EndIf => return Ok((nodes, Some(token))),
        }
    }

    Ok((nodes, None))
}

fn write_nodes(nodes: &[Node<'_>], ctx: &ExecutionContext, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Var(path) => match ctx.lookup(path) {
                Some(Value::String(s)) => out.push_str(s),
                Some(Value::Null) => {}
                Some(other) => out.push_str(&other.to_string()),
                None => trace!(path, "Template variable missing; rendering empty"),
            },
            Node::If {
                path,
                then,
                otherwise,
            } => {
                let branch = if is_truthy_opt(ctx.lookup(path)) {
                    then
                } else {
                    otherwise
                };
                write_nodes(branch, ctx, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use plinth_core::domain::{ModuleInfo, ProjectMetadata};
    use serde_json::json;

    use super::*;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(
            ProjectMetadata::single_app("shop", "/srv/shop"),
            ModuleInfo::new("auth", "core")
                .with_parameter("provider", json!("github"))
                .with_parameter("port", json!(0))
                .with_parameter("roles", json!(["admin", "user"]))
                .with_parameter("social", json!(false)),
        )
    }

    fn render(template: &str) -> PlinthResult<String> {
        SimpleRenderer::new().render(template, &ctx())
    }

    #[test]
    fn substitutes_values_by_type() {
        assert_eq!(
            render("{{ module.id }}/{{module.parameters.provider}}").unwrap(),
            "auth/github"
        );
        assert_eq!(render("port={{module.parameters.port}}").unwrap(), "port=0");
        assert_eq!(
            render("{{module.parameters.roles}}").unwrap(),
            r#"["admin","user"]"#
        );
        assert_eq!(render("[{{module.parameters.nope}}]").unwrap(), "[]");
    }

    #[test]
    fn nested_if_else_blocks() {
        let t = "{{#if module.parameters.social}}social{{else}}{{#if module.parameters.port}}port{{/if}}-local{{/if}}";
        assert_eq!(render(t).unwrap(), "port-local");
    }

    #[test]
    fn zero_is_truthy_in_if() {
        assert_eq!(render("{{#if module.parameters.port}}yes{{/if}}").unwrap(), "yes");
    }

    #[test]
    fn malformed_templates_fail() {
        for bad in [
            "{{module.id",
            "{{#if module.id}}open",
            "{{/if}}",
            "{{else}}",
            "{{#each module.parameters.roles}}{{this}}{{/each}}",
            "{{#if a}}x{{else}}y{{else}}z{{/if}}",
            "{{}}",
        ] {
            let err = render(bad).unwrap_err();
            assert!(err.to_string().contains("rendering failed"), "{bad}: {err}");
        }
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(render("no tags here").unwrap(), "no tags here");
    }
}
