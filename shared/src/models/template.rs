//! Custom ticket template model
//!
//! Templates are designed in the POS back office and travel inside the job.
//! Each block is rendered in order by the bridge.

use serde::{Deserialize, Serialize};

/// Horizontal alignment of a block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// One template block, discriminated by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TemplateBlock {
    /// Free text
    Text {
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        align: BlockAlign,
        #[serde(default)]
        bold: bool,
    },
    /// Separator line
    Line {},
    /// Print time
    Datetime {
        #[serde(default)]
        align: BlockAlign,
        /// `DD/MM/YYYY HH:mm` or absent for the default format
        #[serde(default)]
        format: Option<String>,
    },
    /// Item table
    Table {
        #[serde(default)]
        columns: Vec<String>,
    },
    /// Ticket total
    Total {
        #[serde(default)]
        label: Option<String>,
    },
    /// Block types this bridge does not know; skipped when rendering
    #[serde(other)]
    Unknown,
}

/// Named list of blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketTemplate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub blocks: Vec<TemplateBlock>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_blocks() {
        let t: TicketTemplate = serde_json::from_str(
            r#"{
                "name": "Barra",
                "blocks": [
                    {"type": "text", "value": "BAR PEPE", "align": "center", "bold": true},
                    {"type": "line"},
                    {"type": "datetime", "format": "DD/MM/YYYY HH:mm"},
                    {"type": "table", "columns": ["Cant", "Producto", "Precio", "Total"]},
                    {"type": "total", "label": "A pagar"},
                    {"type": "qr", "value": "https://example.com"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(t.name.as_deref(), Some("Barra"));
        assert_eq!(t.blocks.len(), 6);
        assert_eq!(
            t.blocks[0],
            TemplateBlock::Text {
                value: Some("BAR PEPE".to_string()),
                align: BlockAlign::Center,
                bold: true,
            }
        );
        assert_eq!(t.blocks[1], TemplateBlock::Line {});
        assert_eq!(t.blocks[5], TemplateBlock::Unknown);
    }
}
