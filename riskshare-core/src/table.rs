//! Row extraction from a host risk-assessment table
//!
//! A host table is anything implementing [`RowSource`]: ordered header names
//! plus body rows of cells. Extraction keeps visible rows only, drops the
//! editor-only columns and flattens every cell to its display text.

use crate::control::Control;
use crate::imaging::ImageRef;
use crate::projection::Projection;
use crate::risk::RiskCategory;
use anyhow::{Context, Result};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Editor-only columns never written to a report
pub const EXCLUDED_COLUMNS: &[&str] = &["AI", "Delete"];

/// Column whose value is the row image
pub const PICTURE_COLUMN: &str = "Picture";

/// Image id -> display file name, supplied by the caller
pub type ImageNameMap = HashMap<String, String>;

/// A single table cell as the host renders it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Select {
        #[serde(default, rename = "selectedText", alias = "selected_text")]
        selected_text: Option<String>,
        #[serde(rename = "selectValue", alias = "select_value")]
        value: String,
    },
    Input {
        #[serde(rename = "inputValue", alias = "input_value")]
        value: String,
    },
    Number(serde_json::Number),
    Bool(bool),
    Empty(()),
    /// Any other shape; displays as empty
    Unreadable(serde_json::Value),
}

impl Cell {
    /// Text a reader would see in the cell
    pub fn display_value(&self) -> String {
        match self {
            Cell::Text(text) => text.trim().to_string(),
            Cell::Select {
                selected_text,
                value,
            } => selected_text
                .as_deref()
                .filter(|t| !t.is_empty())
                .unwrap_or(value)
                .to_string(),
            Cell::Input { value } => value.clone(),
            Cell::Number(n) => n.to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Empty(()) | Cell::Unreadable(_) => String::new(),
        }
    }
}

/// One body row of the host table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRow {
    pub cells: Vec<Cell>,
    pub deleted: bool,
    pub image_id: Option<String>,
    pub image: Option<ImageRef>,
    pub controls: Vec<Control>,
}

/// Abstract host table
pub trait RowSource {
    /// Header texts in column order, including editor-only columns
    fn column_names(&self) -> &[String];
    /// Body rows in display order, including deleted ones
    fn rows(&self) -> &[SourceRow];
}

/// Flattened row ready for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct RowRecord {
    /// 1-based position among visible rows
    pub index: usize,
    /// Column name -> display value, in header order
    pub values: Vec<(String, String)>,
    pub image_url: Option<String>,
    pub image_name: Option<String>,
    pub controls: Vec<Control>,
    pub category: RiskCategory,
    pub projection: Option<Projection>,
}

impl RowRecord {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Overwrite an existing column value; absent columns are left absent
    pub fn set(&mut self, column: &str, value: String) {
        if let Some(slot) = self.values.iter_mut().find(|(name, _)| name == column) {
            slot.1 = value;
        }
    }
}

/// Column values as a JSON object, kept apart from the record's own keys
struct ColumnValues<'a>(&'a [(String, String)]);

impl Serialize for ColumnValues<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (column, value) in self.0 {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

impl Serialize for RowRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("index", &self.index)?;
        if let Some(url) = &self.image_url {
            map.serialize_entry("imageUrl", url)?;
        }
        if let Some(name) = &self.image_name {
            map.serialize_entry("imageName", name)?;
        }
        map.serialize_entry("values", &ColumnValues(&self.values))?;
        if !self.controls.is_empty() {
            map.serialize_entry("controls", &self.controls)?;
        }
        if let Some(projection) = &self.projection {
            map.serialize_entry("projection", projection)?;
        }
        map.end()
    }
}

/// Header names that survive into the report
pub fn report_headers(source: &dyn RowSource) -> Vec<String> {
    source
        .column_names()
        .iter()
        .map(|h| h.trim().to_string())
        .filter(|h| !EXCLUDED_COLUMNS.contains(&h.as_str()))
        .collect()
}

/// Rows that are not flagged deleted, in display order
pub fn visible_rows(source: &dyn RowSource) -> Vec<&SourceRow> {
    source.rows().iter().filter(|r| !r.deleted).collect()
}

/// Build records for visible rows.
///
/// `image_urls[i]` is the normalized image for `rows[i]`.
pub fn extract_records(
    source: &dyn RowSource,
    rows: &[&SourceRow],
    image_urls: &[Option<String>],
    image_names: &ImageNameMap,
) -> Vec<RowRecord> {
    let headers: Vec<String> = source
        .column_names()
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    rows.iter()
        .enumerate()
        .map(|(idx, row)| {
            let position = idx + 1;
            let (image_url, image_name) = if row.image.is_some() {
                let name = row
                    .image_id
                    .as_ref()
                    .and_then(|id| image_names.get(id))
                    .cloned()
                    .unwrap_or_else(|| format!("image_{}.jpg", position));
                (image_urls.get(idx).cloned().flatten(), Some(name))
            } else {
                (None, None)
            };

            let values = headers
                .iter()
                .enumerate()
                .filter(|(_, header)| !EXCLUDED_COLUMNS.contains(&header.as_str()))
                .filter_map(|(i, header)| {
                    let cell = row.cells.get(i)?;
                    let value = if header == PICTURE_COLUMN {
                        image_url.clone().unwrap_or_default()
                    } else {
                        cell.display_value()
                    };
                    Some((header.clone(), value))
                })
                .collect();

            RowRecord {
                index: position,
                values,
                image_url,
                image_name,
                controls: row.controls.clone(),
                category: RiskCategory::Unknown,
                projection: None,
            }
        })
        .collect()
}

/// Table exported as JSON:
///
/// ```json
/// { "headers": ["Steps", "Picture", "Risk Category"],
///   "rows": [{ "cells": ["Lift box", "", "High"], "image": "photos/1.jpg",
///              "imageId": "img-1", "controls": ["Engineer"] }] }
/// ```
#[derive(Debug, Clone, Default)]
pub struct JsonTableSource {
    headers: Vec<String>,
    rows: Vec<SourceRow>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonTable {
    #[serde(default)]
    headers: Vec<String>,
    #[serde(default)]
    rows: Vec<JsonRow>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonRow {
    #[serde(default)]
    cells: Option<Vec<Cell>>,
    #[serde(default)]
    deleted: Option<bool>,
    #[serde(default)]
    image_id: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    controls: Option<Vec<Control>>,
}

impl JsonTableSource {
    pub fn new(headers: Vec<String>, rows: Vec<SourceRow>) -> Self {
        JsonTableSource { headers, rows }
    }

    /// Parse a table export; relative image paths resolve against `base_dir`
    pub fn from_json(json: &str, base_dir: Option<&Path>) -> Result<Self> {
        let table: JsonTable = serde_json::from_str(json).context("failed to parse table JSON")?;
        let rows = table
            .rows
            .into_iter()
            .map(|row| SourceRow {
                cells: row.cells.unwrap_or_default(),
                deleted: row.deleted.unwrap_or(false),
                image_id: row.image_id,
                image: row
                    .image
                    .as_deref()
                    .and_then(|r| ImageRef::from_reference(r, base_dir)),
                controls: row.controls.unwrap_or_default(),
            })
            .collect();
        Ok(JsonTableSource {
            headers: table.headers.iter().map(|h| h.trim().to_string()).collect(),
            rows,
        })
    }

    /// Load a table export from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read table file: {}", path.display()))?;
        let base_dir: Option<PathBuf> = path.parent().map(Path::to_path_buf);
        Self::from_json(&content, base_dir.as_deref())
            .with_context(|| format!("invalid table in: {}", path.display()))
    }
}

impl RowSource for JsonTableSource {
    fn column_names(&self) -> &[String] {
        &self.headers
    }

    fn rows(&self) -> &[SourceRow] {
        &self.rows
    }
}

/// Load an image name map (`{"img-1": "forklift.jpg"}`) from disk
pub fn load_image_names(path: &Path) -> Result<ImageNameMap> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read image name map: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse image name map: {}", path.display()))
}
