//! Values template parsing
//!
//! A values template describes how one record maps onto one parenthesized SQL
//! tuple, for example `{name}, {age}::int` or `%s, %s::jsonb`. Parsing runs an
//! ordered list of grammar rules over the pattern; the first rule that finds at
//! least one placeholder wins and fixes the template mode:
//!
//! 1. `{field}` placeholders (named)
//! 2. `%(field)s` placeholders (named)
//! 3. `%s` placeholders (positional)
//!
//! Every placeholder may carry a `::type` cast which is kept verbatim in the
//! rendered tuple. Markers of a lower-priority rule are not detected once a
//! higher-priority rule has matched, so `{a}, %s` is a one-field named template.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use vbatch_core::{Result, VbatchError};

/// `::type`, `::double precision`, `::numeric(10, 2)`, `::int[]`, `::public.mood`
const CAST: &str =
    r"::\s*[A-Za-z_][\w.]*(?:\s+[A-Za-z_]\w*)*(?:\s*\(\s*\d+(?:\s*,\s*\d+)?\s*\))?(?:\[\])*";

static REDUNDANT_PARENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\)(?:\s*\))+").expect("valid regex"));

static BRACE_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\{{(?P<name>\w+)\}}(?P<cast>{CAST})?")).expect("valid regex")
});

static PERCENT_NAMED_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"%\((?P<name>\w+)\)s(?P<cast>{CAST})?")).expect("valid regex")
});

static POSITIONAL_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"%s(?P<cast>{CAST})?")).expect("valid regex"));

/// How record fields are bound to template slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateMode {
    /// Slots are filled by position
    Positional,
    /// Slots are filled by field name
    Named,
}

/// One slot of a parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternElement {
    /// Field name (named mode only)
    pub name: Option<String>,
    /// Type cast suffix including the leading `::`
    pub cast: Option<String>,
}

impl PatternElement {
    /// The cast suffix, or an empty string
    pub fn cast_suffix(&self) -> &str {
        self.cast.as_deref().unwrap_or("")
    }
}

struct GrammarRule {
    name: &'static str,
    mode: TemplateMode,
    regex: &'static LazyLock<Regex>,
}

/// Grammar rules in precedence order
static GRAMMAR: [GrammarRule; 3] = [
    GrammarRule {
        name: "brace",
        mode: TemplateMode::Named,
        regex: &BRACE_PLACEHOLDER,
    },
    GrammarRule {
        name: "percent-named",
        mode: TemplateMode::Named,
        regex: &PERCENT_NAMED_PLACEHOLDER,
    },
    GrammarRule {
        name: "positional",
        mode: TemplateMode::Positional,
        regex: &POSITIONAL_PLACEHOLDER,
    },
];

impl GrammarRule {
    fn find_all(&self, pattern: &str) -> Option<Vec<PatternElement>> {
        let elements: Vec<PatternElement> = self
            .regex
            .captures_iter(pattern)
            .map(|caps| PatternElement {
                name: caps.name("name").map(|m| m.as_str().to_string()),
                cast: caps.name("cast").map(|m| normalize_cast(m.as_str())),
            })
            .collect();

        (!elements.is_empty()).then_some(elements)
    }
}

fn normalize_cast(raw: &str) -> String {
    format!("::{}", raw.trim_start_matches("::").trim())
}

/// A parsed, immutable values template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuesTemplate {
    elements: Vec<PatternElement>,
    mode: TemplateMode,
}

impl ValuesTemplate {
    /// Parse a template pattern.
    ///
    /// An empty or whitespace-only pattern is rejected immediately. A pattern
    /// without any recognizable placeholder parses into an invalid template;
    /// use [`ValuesTemplate::ensure_valid`] before rendering with it.
    pub fn parse(pattern: &str) -> Result<Self> {
        if pattern.trim().is_empty() {
            return Err(VbatchError::Template("template cannot be empty".into()));
        }

        let prepared = REDUNDANT_PARENS.replace_all(pattern, ")");

        for rule in &GRAMMAR {
            if let Some(elements) = rule.find_all(&prepared) {
                tracing::trace!(
                    rule = rule.name,
                    slots = elements.len(),
                    "values template parsed"
                );
                return Ok(Self {
                    elements,
                    mode: rule.mode,
                });
            }
        }

        tracing::trace!(pattern = %pattern, "no placeholder found in values template");
        Ok(Self {
            elements: Vec::new(),
            mode: TemplateMode::Positional,
        })
    }

    /// Whether at least one placeholder was found
    pub fn is_valid(&self) -> bool {
        !self.elements.is_empty()
    }

    /// Fail with a template error unless the template is valid
    pub fn ensure_valid(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(VbatchError::Template(
                "wrong template format: no `{field}`, `%(field)s` or `%s` placeholder found"
                    .into(),
            ))
        }
    }

    pub fn mode(&self) -> TemplateMode {
        self.mode
    }

    pub fn is_named(&self) -> bool {
        self.mode == TemplateMode::Named
    }

    /// Template slots in order
    pub fn elements(&self) -> &[PatternElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The normalized, parenthesized form of the template.
    ///
    /// Named templates render as `({a}, {b}::int)`, positional ones as
    /// `({}, {}::int)`. Returns `None` for an invalid template.
    pub fn canonical(&self) -> Option<String> {
        if !self.is_valid() {
            return None;
        }

        let slots: Vec<String> = self
            .elements
            .iter()
            .map(|element| match (&self.mode, &element.name) {
                (TemplateMode::Named, Some(name)) => {
                    format!("{{{}}}{}", name, element.cast_suffix())
                }
                _ => format!("{{}}{}", element.cast_suffix()),
            })
            .collect();

        Some(format!("({})", slots.join(", ")))
    }
}

impl fmt::Display for ValuesTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.canonical() {
            Some(canonical) => f.write_str(&canonical),
            None => f.write_str("<invalid template>"),
        }
    }
}

impl FromStr for ValuesTemplate {
    type Err = VbatchError;

    fn from_str(pattern: &str) -> Result<Self> {
        let template = Self::parse(pattern)?;
        template.ensure_valid()?;
        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn names(template: &ValuesTemplate) -> Vec<Option<&str>> {
        template
            .elements()
            .iter()
            .map(|e| e.name.as_deref())
            .collect()
    }

    #[rstest]
    #[case::brace("{name}, {age}::int", "({name}, {age}::int)")]
    #[case::brace_wrapped("({name}, {age})", "({name}, {age})")]
    #[case::percent_named("%(name)s, %(age)s::int", "({name}, {age}::int)")]
    #[case::positional("%s, %s", "({}, {})")]
    #[case::positional_casts("%s::uuid, %s::jsonb", "({}::uuid, {}::jsonb)")]
    #[case::cast_in_middle("{a}::int, {b}", "({a}::int, {b})")]
    #[case::multi_word_cast("{a}::double precision", "({a}::double precision)")]
    #[case::cast_with_modifier("{a}::numeric(10, 2), {b}", "({a}::numeric(10, 2), {b})")]
    #[case::array_cast("{tags}::text[]", "({tags}::text[])")]
    #[case::schema_cast("{mood}::public.mood", "({mood}::public.mood)")]
    fn test_canonical_form(#[case] pattern: &str, #[case] expected: &str) {
        let template = ValuesTemplate::parse(pattern).expect("parse");
        assert_eq!(template.canonical().as_deref(), Some(expected));
    }

    #[test]
    fn test_named_mode() {
        let template = ValuesTemplate::parse("{name}, {age}::int").expect("parse");
        assert_eq!(template.mode(), TemplateMode::Named);
        assert_eq!(names(&template), vec![Some("name"), Some("age")]);
        assert_eq!(template.elements()[1].cast.as_deref(), Some("::int"));
    }

    #[test]
    fn test_positional_mode() {
        let template = ValuesTemplate::parse("(%s, %s::int)").expect("parse");
        assert_eq!(template.mode(), TemplateMode::Positional);
        assert_eq!(names(&template), vec![None, None]);
    }

    #[rstest]
    #[case("{a}, {b}::int")]
    #[case("%(a)s::jsonb, %(b)s")]
    #[case("(({a}, {b}::timestamp with time zone))")]
    fn test_named_canonical_is_a_fixed_point(#[case] pattern: &str) {
        let first = ValuesTemplate::parse(pattern).expect("parse");
        let canonical = first.canonical().expect("valid");
        let second = ValuesTemplate::parse(&canonical).expect("reparse");
        assert_eq!(second.canonical(), Some(canonical));
        assert_eq!(second, first);
    }

    #[test]
    fn test_redundant_closing_parens_collapse() {
        let template = ValuesTemplate::parse("(({a}, {b}) )").expect("parse");
        assert_eq!(template.len(), 2);
        assert_eq!(template.canonical().as_deref(), Some("({a}, {b})"));
    }

    #[test]
    fn test_brace_rule_takes_precedence() {
        let template = ValuesTemplate::parse("{a}, %(b)s, %s").expect("parse");
        assert_eq!(template.mode(), TemplateMode::Named);
        assert_eq!(names(&template), vec![Some("a")]);
    }

    #[test]
    fn test_percent_named_takes_precedence_over_positional() {
        let template = ValuesTemplate::parse("%(a)s, %s").expect("parse");
        assert_eq!(names(&template), vec![Some("a")]);
    }

    #[rstest]
    #[case::empty("")]
    #[case::spaces("   ")]
    #[case::newline("\n\t")]
    fn test_blank_pattern_is_rejected(#[case] pattern: &str) {
        let result = ValuesTemplate::parse(pattern);
        assert!(matches!(result, Err(VbatchError::Template(_))));
    }

    #[test]
    fn test_pattern_without_placeholders_is_invalid() {
        let template = ValuesTemplate::parse("(1, 2, 3)").expect("parse");
        assert!(!template.is_valid());
        assert!(template.canonical().is_none());
        assert!(matches!(
            template.ensure_valid(),
            Err(VbatchError::Template(_))
        ));
        assert_eq!(template.to_string(), "<invalid template>");
    }

    #[test]
    fn test_from_str_requires_valid_template() {
        assert!("{a}".parse::<ValuesTemplate>().is_ok());
        assert!("no slots".parse::<ValuesTemplate>().is_err());
    }
}
