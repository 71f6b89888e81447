#![forbid(unsafe_code)]

//! XPath evaluation contract and the small built-in evaluator.
//!
//! The built-in evaluator understands only the boolean expressions that
//! XML-DSig filter transforms use in practice:
//! - `not(ancestor-or-self::p:Name)` and `ancestor-or-self::p:Name`
//! - the `here()`-based enveloped-signature expression
//! - `self::text()`, `self::comment()`, `self::node()`, `true()`, `false()`
//!
//! Anything else is an evaluation error. Plug in a full engine through
//! [`XPathEvaluator`] when more is needed.

use ekeby_core::Error;
use roxmltree::Node;

/// Boolean XPath evaluation for filter transforms.
pub trait XPathEvaluator: Send + Sync {
    /// Evaluate `expr` with `context` as the context node.
    ///
    /// `here` is the node bound to the `here()` function and `ns_context`
    /// is the element whose in-scope namespaces resolve prefixes.
    fn evaluate(
        &self,
        context: Node<'_, '_>,
        here: Node<'_, '_>,
        expr: &str,
        ns_context: Node<'_, '_>,
    ) -> Result<bool, Error>;
}

/// Evaluator for the fixed set of expressions listed in the module docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicXPathEvaluator;

impl XPathEvaluator for BasicXPathEvaluator {
    fn evaluate(
        &self,
        context: Node<'_, '_>,
        here: Node<'_, '_>,
        expr: &str,
        ns_context: Node<'_, '_>,
    ) -> Result<bool, Error> {
        let compact: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
        let parsed = parse_expr(&compact)?;
        eval(&parsed, context, here, ns_context)
    }
}

// ── Expression model ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
struct NameTest<'e> {
    prefix: Option<&'e str>,
    local: &'e str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Expr<'e> {
    Const(bool),
    Not(Box<Expr<'e>>),
    SelfText,
    SelfComment,
    SelfNode,
    AncestorOrSelf(NameTest<'e>),
    /// `count(ancestor-or-self::A | here()/ancestor::B[1]) > count(ancestor-or-self::A)`
    OutsideHereAncestor {
        own: NameTest<'e>,
        here_ancestor: NameTest<'e>,
    },
}

fn unsupported(expr: &str) -> Error {
    Error::XPath(format!("unsupported expression: {expr}"))
}

fn parse_name_test(s: &str) -> Option<NameTest<'_>> {
    let valid = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
    };
    match s.split_once(':') {
        Some((prefix, local)) if valid(prefix) && valid(local) => Some(NameTest {
            prefix: Some(prefix),
            local,
        }),
        None if valid(s) => Some(NameTest {
            prefix: None,
            local: s,
        }),
        _ => None,
    }
}

fn parse_expr(s: &str) -> Result<Expr<'_>, Error> {
    match s {
        "true()" => return Ok(Expr::Const(true)),
        "false()" => return Ok(Expr::Const(false)),
        "self::text()" => return Ok(Expr::SelfText),
        "self::comment()" => return Ok(Expr::SelfComment),
        "self::node()" => return Ok(Expr::SelfNode),
        _ => {}
    }

    if let Some(inner) = s.strip_prefix("not(").and_then(|r| r.strip_suffix(')')) {
        return Ok(Expr::Not(Box::new(parse_expr(inner)?)));
    }

    if let Some(name) = s.strip_prefix("ancestor-or-self::") {
        return parse_name_test(name)
            .map(Expr::AncestorOrSelf)
            .ok_or_else(|| unsupported(s));
    }

    if let Some((left, right)) = s.split_once('>') {
        return parse_enveloped(left, right).ok_or_else(|| unsupported(s));
    }

    Err(unsupported(s))
}

fn parse_enveloped<'e>(left: &'e str, right: &'e str) -> Option<Expr<'e>> {
    let union = left.strip_prefix("count(")?.strip_suffix(')')?;
    let (own, here_part) = union.split_once('|')?;
    let own = parse_name_test(own.strip_prefix("ancestor-or-self::")?)?;
    let here_ancestor = here_part
        .strip_prefix("here()/ancestor::")?
        .strip_suffix("[1]")?;
    let here_ancestor = parse_name_test(here_ancestor)?;

    let counted = right
        .strip_prefix("count(ancestor-or-self::")?
        .strip_suffix(')')?;
    if parse_name_test(counted)? != own {
        return None;
    }
    Some(Expr::OutsideHereAncestor { own, here_ancestor })
}

// ── Evaluation ───────────────────────────────────────────────────────

struct ResolvedName<'e> {
    namespace: Option<String>,
    local: &'e str,
}

impl ResolvedName<'_> {
    fn matches(&self, node: Node<'_, '_>) -> bool {
        node.is_element()
            && node.tag_name().name() == self.local
            && node.tag_name().namespace() == self.namespace.as_deref()
    }
}

fn resolve<'e>(test: &NameTest<'e>, ns_context: Node<'_, '_>) -> Result<ResolvedName<'e>, Error> {
    let namespace = match test.prefix {
        None => None,
        Some(prefix) => Some(
            ns_context
                .lookup_namespace_uri(Some(prefix))
                .ok_or_else(|| Error::XPath(format!("undeclared namespace prefix: {prefix}")))?
                .to_owned(),
        ),
    };
    Ok(ResolvedName {
        namespace,
        local: test.local,
    })
}

fn eval(
    expr: &Expr<'_>,
    context: Node<'_, '_>,
    here: Node<'_, '_>,
    ns_context: Node<'_, '_>,
) -> Result<bool, Error> {
    match expr {
        Expr::Const(value) => Ok(*value),
        Expr::Not(inner) => Ok(!eval(inner, context, here, ns_context)?),
        Expr::SelfText => Ok(context.is_text()),
        Expr::SelfComment => Ok(context.is_comment()),
        Expr::SelfNode => Ok(true),
        Expr::AncestorOrSelf(test) => {
            let name = resolve(test, ns_context)?;
            Ok(context.ancestors().any(|a| name.matches(a)))
        }
        Expr::OutsideHereAncestor { own, here_ancestor } => {
            let own = resolve(own, ns_context)?;
            let target = resolve(here_ancestor, ns_context)?;
            let Some(boundary) = here.ancestors().skip(1).find(|a| target.matches(*a)) else {
                return Ok(false);
            };
            if !own.matches(boundary) {
                return Ok(true);
            }
            let same_document = std::ptr::eq(boundary.document(), context.document());
            let inside = same_document && context.ancestors().any(|a| a.id() == boundary.id());
            Ok(!inside)
        }
    }
}

// ── XPointer ─────────────────────────────────────────────────────────

/// The bare-name XPointer forms accepted in reference URIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XPointer<'u> {
    /// `#xpointer(/)`: the whole document.
    Root,
    /// `#xpointer(id('ID'))` or `#xpointer(id("ID"))`.
    Id(&'u str),
}

impl<'u> XPointer<'u> {
    /// Recognize an XPointer URI. Only the exact literal forms are accepted;
    /// quotes must match and no escaping is interpreted.
    pub fn parse(uri: &'u str) -> Option<Self> {
        if uri == "#xpointer(/)" {
            return Some(Self::Root);
        }
        let quoted = uri.strip_prefix("#xpointer(id(")?.strip_suffix("))")?;
        for quote in ['\'', '"'] {
            if quoted.len() >= 2 && quoted.starts_with(quote) && quoted.ends_with(quote) {
                return Some(Self::Id(&quoted[1..quoted.len() - 1]));
            }
        }
        None
    }
}

/// Strip the `#` from a same-document bare-name reference.
pub fn parse_same_document_ref(uri: &str) -> Option<&str> {
    uri.strip_prefix('#')
}
