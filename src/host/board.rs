//! Board description files
//!
//! A board is a JSON document naming the copper layers (top first), the
//! router configuration and every item on the board. Items without a host
//! reference get one assigned on load.

use crate::item::{HostRef, Item};
use crate::router::RouterConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardDescription {
    /// Host layer names; the router layer index is the position in this list
    pub layers: Vec<String>,
    #[serde(default)]
    pub config: RouterConfig,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl BoardDescription {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut board: BoardDescription = serde_json::from_str(json).context("Failed to parse board description")?;
        anyhow::ensure!(!board.layers.is_empty(), "board description declares no copper layers");
        let layer_count = board.layers.len() as i32;
        for (i, item) in board.items.iter().enumerate() {
            anyhow::ensure!(
                item.layers.start() >= 0 && item.layers.end() < layer_count,
                "item {i} uses layers {}..{} but the board has {layer_count}",
                item.layers.start(),
                item.layers.end()
            );
        }
        board.assign_host_refs();
        Ok(board)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).with_context(|| format!("Failed to read board {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("Invalid board {}", path.display()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self).context("Failed to serialize board")?;
        fs::write(path, text).with_context(|| format!("Failed to write board {}", path.display()))
    }

    fn assign_host_refs(&mut self) {
        let mut next = self.items.iter().filter_map(|i| i.host).map(|h| h.0 + 1).max().unwrap_or(1);
        for item in &mut self.items {
            if item.host.is_none() {
                item.host = Some(HostRef(next));
                next += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOARD: &str = r#"{
        "layers": ["F.Cu", "B.Cu"],
        "items": [
            { "net": 1, "layers": { "start": 0, "end": 0 }, "host": 7,
              "data": { "Segment": { "seg": { "a": { "x": 0, "y": 0 }, "b": { "x": 1000000, "y": 0 } }, "width": 200000 } } },
            { "net": 1, "layers": { "start": 0, "end": 1 },
              "data": { "Via": { "pos": { "x": 1000000, "y": 0 }, "diameters": [600000], "drill": 300000 } } }
        ]
    }"#;

    #[test]
    fn test_missing_host_refs_are_assigned() {
        let board = BoardDescription::from_json_str(BOARD).unwrap();
        assert_eq!(board.items.len(), 2);
        assert_eq!(board.items[0].host, Some(HostRef(7)));
        assert_eq!(board.items[1].host, Some(HostRef(8)));
    }

    #[test]
    fn test_items_must_fit_the_stackup() {
        let bad = BOARD.replace(r#""layers": ["F.Cu", "B.Cu"]"#, r#""layers": ["F.Cu"]"#);
        assert!(BoardDescription::from_json_str(&bad).is_err());
        assert!(BoardDescription::from_json_str(r#"{ "layers": [] }"#).is_err());
    }
}
