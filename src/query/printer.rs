//! 结果打印

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::core::error::DBError;
use crate::query::executor::ResultSet;

/// 缺失值的显示
pub const NULL_TEXT: &str = "NULL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrintFormat {
    #[default]
    Plain,
    Markdown,
}

impl fmt::Display for PrintFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrintFormat::Plain => write!(f, "plain"),
            PrintFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for PrintFormat {
    type Err = DBError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "plain" => Ok(PrintFormat::Plain),
            "markdown" | "md" => Ok(PrintFormat::Markdown),
            _ => Err(DBError::config(format!("unknown print format '{}'", name))),
        }
    }
}

pub fn format_results(results: &ResultSet, format: PrintFormat) -> String {
    let mut builder = Builder::default();
    builder.push_record(results.header.iter().cloned());
    for row in &results.rows {
        builder.push_record(row.iter().map(|value| match value {
            Some(value) => value.to_string(),
            None => NULL_TEXT.to_string(),
        }));
    }
    let mut table = builder.build();
    match format {
        PrintFormat::Plain => table.with(Style::psql()),
        PrintFormat::Markdown => table.with(Style::markdown()),
    };
    table.to_string()
}
