//! Batch composition
//!
//! Turns a base query with a single `VALUES (%s)` site plus one page of records
//! into a complete SQL statement, e.g.
//!
//! ```text
//! INSERT INTO t (a, b) VALUES (%s) RETURNING id
//! INSERT INTO t (a, b) VALUES (1, 'x'),(2, 'y') RETURNING id
//! ```

use std::sync::LazyLock;

use regex::Regex;
use vbatch_core::{LiteralDialect, Result, Value, VbatchError};

use crate::record::{Record, adapt};
use crate::template::{PatternElement, TemplateMode, ValuesTemplate};

static VALUES_SITE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bvalues\s*\(\s*%s\s*\)").expect("valid regex"));

const VALUES_KEYWORD_LEN: usize = "values".len();

/// The location of the values site inside a base query
#[derive(Debug, Clone, Copy)]
pub struct ValuesSite<'q> {
    head: &'q str,
    tail: &'q str,
}

impl<'q> ValuesSite<'q> {
    /// Find the single `VALUES (%s)` placeholder in `query`.
    ///
    /// The keyword is matched case-insensitively and whitespace inside the
    /// parentheses is ignored. A query without a site, or with more than one,
    /// is rejected.
    pub fn locate(query: &'q str) -> Result<Self> {
        let sites: Vec<_> = VALUES_SITE.find_iter(query).collect();

        match sites.as_slice() {
            [site] => {
                let keyword_end = site.start() + VALUES_KEYWORD_LEN;
                Ok(Self {
                    head: &query[..keyword_end],
                    tail: &query[site.end()..],
                })
            }
            [] => Err(VbatchError::Composition(
                "query has no `VALUES (%s)` placeholder".into(),
            )),
            many => Err(VbatchError::Composition(format!(
                "query has {} `VALUES (%s)` placeholders, expected exactly one",
                many.len()
            ))),
        }
    }

    /// Insert a rendered tuple list at the site
    pub fn splice(&self, tuples: &str) -> String {
        let mut sql = String::with_capacity(self.head.len() + tuples.len() + self.tail.len() + 1);
        sql.push_str(self.head);
        sql.push(' ');
        sql.push_str(tuples);
        sql.push_str(self.tail);
        sql
    }
}

/// Render one record as a parenthesized tuple.
///
/// `row_index` is the record's position in the whole input and only appears in
/// error messages. The record must already be adapted.
pub fn render_record(
    template: &ValuesTemplate,
    record: &Record,
    row_index: usize,
    literals: &dyn LiteralDialect,
) -> Result<String> {
    let elements = template.elements();
    let mut slots = Vec::with_capacity(elements.len());

    match (template.mode(), record) {
        (TemplateMode::Named, Record::Named(fields)) => {
            for element in elements {
                let name = element.name.as_deref().unwrap_or_default();
                let value = fields.get(name).ok_or_else(|| {
                    VbatchError::Composition(format!(
                        "row {} has no field `{}` required by template {}",
                        row_index, name, template
                    ))
                })?;
                slots.push(render_slot(element, value, literals)?);
            }
        }
        (TemplateMode::Positional, Record::Positional(values)) => {
            if values.len() != elements.len() {
                return Err(VbatchError::Composition(format!(
                    "row {} has {} values but template {} has {} placeholders",
                    row_index,
                    values.len(),
                    template,
                    elements.len()
                )));
            }
            for (element, value) in elements.iter().zip(values) {
                slots.push(render_slot(element, value, literals)?);
            }
        }
        (mode, record) => {
            let expected = match mode {
                TemplateMode::Named => "named",
                TemplateMode::Positional => "positional",
            };
            return Err(VbatchError::Composition(format!(
                "row {} is {} but template {} expects {} rows",
                row_index,
                record.kind(),
                template,
                expected
            )));
        }
    }

    Ok(format!("({})", slots.join(", ")))
}

fn render_slot(
    element: &PatternElement,
    value: &Value,
    literals: &dyn LiteralDialect,
) -> Result<String> {
    let literal = literals.render(value)?;
    Ok(format!("{}{}", literal, element.cast_suffix()))
}

/// Compose the full statement for one page of records.
///
/// Records are adapted, rendered in order and joined with `,`.
/// `first_row` is the input position of the page's first record.
pub fn compose_page(
    site: &ValuesSite<'_>,
    template: &ValuesTemplate,
    page: &[Record],
    first_row: usize,
    literals: &dyn LiteralDialect,
) -> Result<String> {
    let tuples = page
        .iter()
        .enumerate()
        .map(|(offset, record)| {
            render_record(template, &adapt(record), first_row + offset, literals)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(site.splice(&tuples.join(",")))
}
