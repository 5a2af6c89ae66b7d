//! Upgrade of persisted scorecards into the hole-indexed format.
//!
//! Older builds stored a round's scores as a flat `{playerId: strokes}` map
//! with no hole dimension. No version tag was ever written, so the format is
//! recognized by shape alone: a top-level object none of whose values is an
//! object (or array) is the legacy form.
//!
//! Any future format change should carry an explicit version tag instead of
//! adding another shape to sniff.

use crate::{error::Result, Error, HoleNumber, HoleScoreMap, PlayerScores, Strokes};
use serde_json::{Map, Value};

/// Shape of a persisted scorecard blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredFormat {
    /// `{playerId: strokes}` written by older builds
    LegacyFlat,
    /// `{hole: {playerId: strokes}}`, the current format
    HoleIndexed,
}

/// Result of reading a persisted scorecard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upgrade {
    /// Scores in the current format
    pub scores: HoleScoreMap,
    /// Format the blob was stored in
    pub format: StoredFormat,
    /// Entries that were dropped because they could not be read
    pub discarded: Vec<String>,
}

impl Upgrade {
    /// Whether the upgraded scores must be written back under the same key.
    ///
    /// Only legacy blobs are rewritten; a current-format load never writes.
    pub fn needs_rewrite(&self) -> bool {
        self.format == StoredFormat::LegacyFlat
    }
}

enum Leaf {
    Strokes(Strokes),
    Unset,
    Invalid,
}

fn is_nested(value: &Value) -> bool {
    value.is_object() || value.is_array()
}

/// Detect the format of a parsed scorecard blob.
///
/// An empty object is an empty hole-indexed map.
pub fn detect_format(value: &Value) -> Result<StoredFormat> {
    let object = value
        .as_object()
        .ok_or_else(|| Error::InvalidScorecard(format!("expected an object, got {}", kind(value))))?;

    if object.is_empty() || object.values().any(is_nested) {
        Ok(StoredFormat::HoleIndexed)
    } else {
        Ok(StoredFormat::LegacyFlat)
    }
}

/// Parse a persisted blob and upgrade it to the hole-indexed format.
///
/// Legacy scores are attributed to `active_hole`, the hole on screen when
/// the blob is loaded.
pub fn upgrade(raw: &str, active_hole: HoleNumber) -> Result<Upgrade> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| Error::InvalidScorecard(e.to_string()))?;
    upgrade_value(value, active_hole)
}

/// Upgrade an already parsed blob.
pub fn upgrade_value(value: Value, active_hole: HoleNumber) -> Result<Upgrade> {
    let format = detect_format(&value)?;
    let Value::Object(object) = value else {
        return Err(Error::InvalidScorecard("expected an object".into()));
    };

    let mut discarded = Vec::new();
    let mut scores = HoleScoreMap::new();

    match format {
        StoredFormat::LegacyFlat => {
            let players = read_players(&object, &mut discarded, active_hole);
            if !players.is_empty() {
                scores.insert_hole(active_hole, players);
            }
        }
        StoredFormat::HoleIndexed => {
            for (key, value) in &object {
                let Some(hole) = parse_hole(key) else {
                    discarded.push(format!("hole key {key:?}"));
                    continue;
                };
                let Value::Object(players) = value else {
                    discarded.push(format!("hole {hole}: {}", kind(value)));
                    continue;
                };
                let players = read_players(players, &mut discarded, hole);
                if !players.is_empty() {
                    scores.insert_hole(hole, players);
                }
            }
        }
    }

    Ok(Upgrade {
        scores,
        format,
        discarded,
    })
}

fn read_players(
    object: &Map<String, Value>,
    discarded: &mut Vec<String>,
    hole: HoleNumber,
) -> PlayerScores {
    let mut players = PlayerScores::new();
    for (player_id, value) in object {
        match read_leaf(value) {
            Leaf::Strokes(strokes) => {
                players.insert(player_id.clone(), strokes);
            }
            Leaf::Unset => {}
            Leaf::Invalid => discarded.push(format!("hole {hole}, player {player_id}: {value}")),
        }
    }
    players
}

fn read_leaf(value: &Value) -> Leaf {
    match value {
        Value::Null => Leaf::Unset,
        Value::Number(n) => n
            .as_u64()
            .filter(|strokes| *strokes > 0)
            .and_then(|strokes| Strokes::try_from(strokes).ok())
            .map_or(Leaf::Invalid, Leaf::Strokes),
        _ => Leaf::Invalid,
    }
}

fn parse_hole(key: &str) -> Option<HoleNumber> {
    key.parse::<HoleNumber>().ok().filter(|hole| *hole > 0)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
