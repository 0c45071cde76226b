use crate::error::SelectorError;

/// Attribute test inside `[...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrMatch {
    Present,
    Equals(String),
    Prefix(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrSelector {
    pub name: String,
    pub test: AttrMatch,
}

/// One compound selector such as `a.external[href^="http"]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Compound {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttrSelector>,
}

/// Comma separated list of compounds. Combinators are not supported; the
/// pages only ever select by tag, id, class and attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    pub compounds: Vec<Compound>,
}

/// What a selector needs to know about an element.
pub trait Matchable {
    fn tag(&self) -> &str;
    fn has_class(&self, class: &str) -> bool;
    fn attr(&self, name: &str) -> Option<&str>;
}

impl SelectorList {
    pub fn parse(raw: &str) -> Result<Self, SelectorError> {
        let compounds = raw
            .split(',')
            .map(|part| parse_compound(part.trim()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { compounds })
    }

    pub fn matches<M: Matchable + ?Sized>(&self, el: &M) -> bool {
        self.compounds.iter().any(|c| c.matches(el))
    }
}

impl Compound {
    pub fn matches<M: Matchable + ?Sized>(&self, el: &M) -> bool {
        if let Some(tag) = &self.tag {
            if !tag.eq_ignore_ascii_case(el.tag()) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if el.attr("id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| el.has_class(c)) {
            return false;
        }
        self.attrs.iter().all(|a| match (&a.test, el.attr(&a.name)) {
            (_, None) => false,
            (AttrMatch::Present, Some(_)) => true,
            (AttrMatch::Equals(v), Some(actual)) => actual == v,
            (AttrMatch::Prefix(p), Some(actual)) => actual.starts_with(p.as_str()),
        })
    }
}

fn parse_compound(raw: &str) -> Result<Compound, SelectorError> {
    if raw.is_empty() {
        return Err(SelectorError::Empty);
    }
    if raw.chars().any(|c| c.is_whitespace() || matches!(c, '>' | '+' | '~' | ':')) {
        return Err(SelectorError::Unsupported(raw.to_string()));
    }

    let mut compound = Compound::default();
    let mut rest = raw;

    let tag_end = rest.find(['.', '#', '[']).unwrap_or(rest.len());
    if tag_end > 0 {
        let tag = &rest[..tag_end];
        if tag != "*" {
            compound.tag = Some(tag.to_ascii_lowercase());
        }
        rest = &rest[tag_end..];
    }

    while let Some(first) = rest.chars().next() {
        match first {
            '.' | '#' => {
                let body = &rest[1..];
                let end = body.find(['.', '#', '[']).unwrap_or(body.len());
                let name = &body[..end];
                if name.is_empty() {
                    return Err(SelectorError::Unsupported(raw.to_string()));
                }
                if first == '.' {
                    compound.classes.push(name.to_string());
                } else {
                    compound.id = Some(name.to_string());
                }
                rest = &body[end..];
            }
            '[' => {
                let close = rest
                    .find(']')
                    .ok_or_else(|| SelectorError::Unsupported(raw.to_string()))?;
                compound.attrs.push(parse_attr(&rest[1..close], raw)?);
                rest = &rest[close + 1..];
            }
            _ => return Err(SelectorError::Unsupported(raw.to_string())),
        }
    }

    Ok(compound)
}

fn parse_attr(body: &str, raw: &str) -> Result<AttrSelector, SelectorError> {
    let unsupported = || SelectorError::Unsupported(raw.to_string());
    let (name, test) = if let Some((name, value)) = body.split_once("^=") {
        (name, AttrMatch::Prefix(unquote(value).ok_or_else(unsupported)?))
    } else if let Some((name, value)) = body.split_once('=') {
        (name, AttrMatch::Equals(unquote(value).ok_or_else(unsupported)?))
    } else {
        (body, AttrMatch::Present)
    };
    if name.is_empty() {
        return Err(unsupported());
    }
    Ok(AttrSelector {
        name: name.to_string(),
        test,
    })
}

fn unquote(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    match bytes {
        [q, .., last] if (*q == b'"' || *q == b'\'') && last == q && bytes.len() >= 2 => {
            Some(value[1..value.len() - 1].to_string())
        }
        [] => None,
        _ => Some(value.to_string()),
    }
}
