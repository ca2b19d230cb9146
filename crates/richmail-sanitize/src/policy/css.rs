//! CSS policy: property allow-list, value rewriting, and declaration and
//! stylesheet parsing on the `cssparser` tokenizer.
//!
//! Values are judged in tokenized form, so escapes (`f\ixed`, `\66ixed`)
//! and comments cannot disguise what a browser will read.

use std::sync::LazyLock;

use cssparser::{Delimiter, ParseError, Parser, ParserInput, ToCss, Token};
use regex::Regex;

use super::url::{UrlContext, UrlPolicy};

#[allow(clippy::expect_used)]
fn constant_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("constant regex pattern")
}

/// Layout, typography, color and box-model properties.
///
/// `visibility` and `opacity` must never be added here: together with
/// positioning they produce invisible click targets.
static ALLOWED_PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    constant_regex(concat!(
        r"(?i)^(?:",
        r"color|background(?:-(?:color|image|repeat|position|size|attachment))?",
        r"|font(?:-(?:family|size|style|weight|variant|stretch))?",
        r"|text-(?:align|decoration|indent|transform|shadow)",
        r"|line-height|letter-spacing|word-spacing|white-space|word-break|word-wrap|overflow-wrap",
        r"|vertical-align|direction|unicode-bidi",
        r"|margin(?:-(?:top|right|bottom|left))?",
        r"|padding(?:-(?:top|right|bottom|left))?",
        r"|border(?:-(?:top|right|bottom|left))?(?:-(?:width|style|color))?",
        r"|border-(?:collapse|spacing|radius|(?:top|bottom)-(?:left|right)-radius)",
        r"|(?:min-|max-)?(?:width|height)",
        r"|display|float|clear|box-sizing",
        r"|list-style(?:-(?:type|position|image))?",
        r"|table-layout|caption-side|empty-cells",
        r"|position|top|right|bottom|left",
        r"|overflow(?:-[xy])?",
        r")$"
    ))
});

static POSITION_FIXED: LazyLock<Regex> =
    LazyLock::new(|| constant_regex(r"(?i)^\s*fixed\b"));

static BEHAVIOR_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    constant_regex(r"(?i)expression\s*\(|javascript:|vbscript:|-moz-binding|behavior\s*:")
});

/// A single `property: value` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Lowercase property name.
    pub property: String,
    /// Raw value text.
    pub value: String,
}

impl Declaration {
    /// Creates a declaration.
    #[must_use]
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into().to_ascii_lowercase(),
            value: value.into(),
        }
    }
}

/// A qualified rule from a stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    /// Selector list text, e.g. `p, #intro > a`.
    pub selectors: String,
    /// Declarations in source order.
    pub declarations: Vec<Declaration>,
}

/// Returns `true` if the property is on the allow-list.
#[must_use]
pub fn is_allowed_css_property(property: &str) -> bool {
    ALLOWED_PROPERTY.is_match(property.trim())
}

/// Rewrites a CSS value so it is safe to keep.
///
/// The value is re-serialized from its tokens, which resolves escapes and
/// drops comments. `position: fixed` becomes `position: absolute`, and
/// every `url(...)` inside the value is passed through the URL policy.
/// Returns `None` for values that smuggle script (`expression()`,
/// `javascript:` and friends) or do not tokenize cleanly.
#[must_use]
pub fn sanitize_css_property_value(value: &str, key: &str, urls: &UrlPolicy) -> Option<String> {
    let plain = normalize_value(value, None)?;
    if BEHAVIOR_VALUE.is_match(&plain) {
        tracing::trace!(value = %plain, "rejected css value");
        return None;
    }

    let mut value = normalize_value(value, Some(urls))?;
    if key.trim().eq_ignore_ascii_case("position") && POSITION_FIXED.is_match(&value) {
        value = POSITION_FIXED.replace(&value, "absolute").into_owned();
    }
    Some(value)
}

fn normalize_value(value: &str, urls: Option<&UrlPolicy>) -> Option<String> {
    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);
    let mut writer = TokenWriter::new(urls);
    writer.write_all(&mut parser);
    if writer.malformed {
        return None;
    }
    let out = writer.finish();
    (!out.is_empty()).then_some(out)
}

/// Re-serializes a token stream with whitespace and comments collapsed.
struct TokenWriter<'a> {
    urls: Option<&'a UrlPolicy>,
    out: String,
    malformed: bool,
}

impl<'a> TokenWriter<'a> {
    const fn new(urls: Option<&'a UrlPolicy>) -> Self {
        Self {
            urls,
            out: String::new(),
            malformed: false,
        }
    }

    fn finish(self) -> String {
        self.out.trim().to_string()
    }

    fn write_all(&mut self, input: &mut Parser<'_, '_>) {
        while let Ok(token) = input.next_including_whitespace_and_comments() {
            let token = token.clone();
            self.write(&token, input);
        }
    }

    fn write<'i>(&mut self, token: &Token<'i>, input: &mut Parser<'i, '_>) {
        match token {
            Token::WhiteSpace(_) | Token::Comment(_) => self.space(),
            Token::BadUrl(_)
            | Token::BadString(_)
            | Token::CloseParenthesis
            | Token::CloseSquareBracket
            | Token::CloseCurlyBracket => self.malformed = true,
            Token::UnquotedUrl(url) => self.url(url),
            Token::Function(name) if name.eq_ignore_ascii_case("url") => {
                let url = input.parse_nested_block(|input| {
                    let url = input.expect_string()?.clone();
                    input.expect_exhausted()?;
                    Ok::<_, ParseError<'i, ()>>(url)
                });
                match url {
                    Ok(url) => self.url(&url),
                    Err(_) => self.malformed = true,
                }
            }
            Token::Function(_)
            | Token::ParenthesisBlock
            | Token::SquareBracketBlock
            | Token::CurlyBracketBlock => {
                self.out.push_str(&token.to_css_string());
                let _ = input.parse_nested_block(|input| {
                    self.write_all(input);
                    Ok::<_, ParseError<'i, ()>>(())
                });
                self.out.push(closing(token));
            }
            _ => self.out.push_str(&token.to_css_string()),
        }
    }

    fn space(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with(' ') {
            self.out.push(' ');
        }
    }

    fn url(&mut self, raw: &str) {
        let target = match self.urls {
            Some(urls) => urls.sanitize(raw, None, UrlContext::remote()),
            None => raw.to_string(),
        };
        self.out.push_str("url(");
        let _ = cssparser::serialize_string(&target, &mut self.out);
        self.out.push(')');
    }
}

const fn closing(token: &Token<'_>) -> char {
    match token {
        Token::SquareBracketBlock => ']',
        Token::CurlyBracketBlock => '}',
        _ => ')',
    }
}

/// Consumes every remaining token of the current block or delimited run.
pub(crate) fn skip_rest<'i>(input: &mut Parser<'i, '_>) -> Result<(), ParseError<'i, ()>> {
    while input.next().is_ok() {}
    Ok(())
}

/// Parses a declaration list such as the contents of a `style` attribute.
///
/// Property names are unescaped and lowercased; values keep their source
/// text and are only normalized when sanitized.
#[must_use]
pub fn parse_declarations(text: &str) -> Vec<Declaration> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    declaration_list(&mut parser)
}

fn declaration_list(input: &mut Parser<'_, '_>) -> Vec<Declaration> {
    let mut declarations = Vec::new();
    loop {
        let token = match input.next() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        let name = match token {
            Token::Ident(name) => name,
            Token::Semicolon => continue,
            _ => {
                let _ = input.parse_until_after(Delimiter::Semicolon, skip_rest);
                continue;
            }
        };
        if input.expect_colon().is_err() {
            let _ = input.parse_until_after(Delimiter::Semicolon, skip_rest);
            continue;
        }
        let start = input.position();
        let _ = input.parse_until_before(Delimiter::Semicolon, skip_rest);
        let value = input.slice_from(start).trim();
        if !value.is_empty() {
            declarations.push(Declaration::new(&*name, value));
        }
    }
    declarations
}

/// Keeps only allow-listed declarations, with sanitized values.
#[must_use]
pub fn filter_declarations(declarations: Vec<Declaration>, urls: &UrlPolicy) -> Vec<Declaration> {
    declarations
        .into_iter()
        .filter(|d| is_allowed_css_property(&d.property))
        .filter_map(|d| {
            let value = sanitize_css_property_value(&d.value, &d.property, urls)?;
            Some(Declaration {
                property: d.property,
                value,
            })
        })
        .collect()
}

/// Serializes declarations as `prop: value;` pairs separated by spaces.
#[must_use]
pub fn serialize_declarations(declarations: &[Declaration]) -> String {
    declarations
        .iter()
        .map(|d| format!("{}: {};", d.property, d.value))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sanitizes the text of a `style` attribute.
///
/// Returns `None` when no declaration survives.
#[must_use]
pub fn sanitize_style_attribute(style: &str, urls: &UrlPolicy) -> Option<String> {
    let kept = filter_declarations(parse_declarations(style), urls);
    if kept.is_empty() {
        None
    } else {
        Some(serialize_declarations(&kept))
    }
}

/// Parses the qualified rules of a stylesheet.
///
/// At-rules (`@media`, `@import`, `@font-face`, ...) are skipped entirely;
/// they cannot be expressed as inline styles. HTML comment delimiters are
/// ignored and an unterminated final block is closed at the end of input,
/// as browsers do.
#[must_use]
pub fn parse_stylesheet(css: &str) -> Vec<StyleRule> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut rules = Vec::new();

    loop {
        let token = match parser.next() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::CDO | Token::CDC | Token::CurlyBracketBlock => {}
            Token::AtKeyword(name) => {
                tracing::trace!(rule = &*name, "skipping at-rule");
                let _ = parser.parse_until_after(
                    Delimiter::Semicolon | Delimiter::CurlyBracketBlock,
                    skip_rest,
                );
            }
            first => {
                let mut prelude = TokenWriter::new(None);
                prelude.write(&first, &mut parser);
                let _ = parser.parse_until_before(Delimiter::CurlyBracketBlock, |input| {
                    prelude.write_all(input);
                    Ok::<_, ParseError<'_, ()>>(())
                });
                if !matches!(parser.next(), Ok(Token::CurlyBracketBlock)) {
                    break;
                }
                let declarations = parser
                    .parse_nested_block(|input| Ok::<_, ParseError<'_, ()>>(declaration_list(input)))
                    .unwrap_or_default();
                if prelude.malformed {
                    continue;
                }
                let selectors = prelude.finish();
                if selectors.is_empty() {
                    continue;
                }
                tracing::trace!(selectors = %selectors, "parsed style rule");
                rules.push(StyleRule {
                    selectors,
                    declarations,
                });
            }
        }
    }

    rules
}
