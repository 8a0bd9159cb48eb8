//! Query report generation.
//!
//! Renders one-shot query results as JSON or Markdown.

pub mod generator;

pub use generator::{generate_json_report, generate_markdown_report, write_output};
