//! Bulk `VALUES` statements
//!
//! Build and run multi-row `INSERT ... VALUES (...), (...)` statements from a
//! per-row template:
//!
//! - [`ValuesTemplate`] - parses `{field}`, `%(field)s` and `%s` row templates
//! - [`adapt`] - tags nested mappings so drivers encode them as JSON
//! - [`compose_page`] - renders one page of records into a full statement
//! - [`execute_values`] - runs every page inside one transaction
//!
//! ```ignore
//! let rows = vec![
//!     Record::named([("name", Value::from("Ann")), ("age", Value::from(30i64))]),
//! ];
//! execute_values(
//!     conn.as_ref(),
//!     "INSERT INTO people (name, age) VALUES (%s)",
//!     &rows,
//!     "{name}, {age}::int",
//!     &ExecuteOptions::new().with_page_size(500),
//! )
//! .await?;
//! ```

mod compose;
mod execute;
mod record;
mod template;

pub use compose::{ValuesSite, compose_page, render_record};
pub use execute::{ExecuteOptions, execute_values};
pub use record::{Record, adapt};
pub use template::{PatternElement, TemplateMode, ValuesTemplate};
