//! Read-only views over a single creature record returned by the API.
//!
//! [`Pokemon`] owns the decoded JSON and validates the top-level shape once at
//! construction. [`StatView`] and [`ImageView`] borrow from it, so nothing is
//! copied out of the record until a caller asks for a value.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, Result};

/// The six base stats every creature carries.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum StatName {
    Hp,
    Attack,
    Defense,
    SpecialAttack,
    SpecialDefense,
    Speed,
}

impl StatName {
    pub const ALL: [StatName; 6] = [
        StatName::Hp,
        StatName::Attack,
        StatName::Defense,
        StatName::SpecialAttack,
        StatName::SpecialDefense,
        StatName::Speed,
    ];

    /// Index the API conventionally emits this stat at.
    pub fn position(self) -> usize {
        match self {
            StatName::Hp => 0,
            StatName::Attack => 1,
            StatName::Defense => 2,
            StatName::SpecialAttack => 3,
            StatName::SpecialDefense => 4,
            StatName::Speed => 5,
        }
    }

    /// Short label used by the terminal stat bars.
    pub fn abbrev(self) -> &'static str {
        match self {
            StatName::Hp => "HP",
            StatName::Attack => "ATK",
            StatName::Defense => "DEF",
            StatName::SpecialAttack => "SpA",
            StatName::SpecialDefense => "SpD",
            StatName::Speed => "SPD",
        }
    }
}

/// A creature record as returned by `GET /pokemon/{id}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Pokemon {
    record: Value,
}

impl Pokemon {
    /// Wrap a decoded response, checking that `name`, `sprites` and `stats` are
    /// present and have the expected JSON types.
    pub fn from_value(record: Value) -> Result<Self> {
        let obj = record.as_object().ok_or(ApiError::MalformedField {
            field: "record",
            expected: "an object",
        })?;

        match obj.get("name") {
            None => return Err(ApiError::MissingField("name")),
            Some(Value::String(name)) if !name.is_empty() => {}
            Some(Value::String(_)) => {
                return Err(ApiError::MalformedField {
                    field: "name",
                    expected: "a non-empty string",
                })
            }
            Some(_) => {
                return Err(ApiError::MalformedField {
                    field: "name",
                    expected: "a string",
                })
            }
        }

        match obj.get("sprites") {
            None => return Err(ApiError::MissingField("sprites")),
            Some(Value::Object(sprites)) => match sprites.get("front_default") {
                None | Some(Value::Null) | Some(Value::String(_)) => {}
                Some(_) => {
                    return Err(ApiError::MalformedField {
                        field: "sprites.front_default",
                        expected: "a string or null",
                    })
                }
            },
            Some(_) => {
                return Err(ApiError::MalformedField {
                    field: "sprites",
                    expected: "an object",
                })
            }
        }

        match obj.get("stats") {
            None => return Err(ApiError::MissingField("stats")),
            Some(Value::Array(_)) => {}
            Some(_) => {
                return Err(ApiError::MalformedField {
                    field: "stats",
                    expected: "an array",
                })
            }
        }

        Ok(Self { record })
    }

    pub fn name(&self) -> &str {
        self.record["name"].as_str().unwrap_or_default()
    }

    /// National dex number, when the record carries one.
    pub fn id(&self) -> Option<u32> {
        self.record
            .get("id")
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
    }

    /// Type names in slot order. Entries without a name are skipped.
    pub fn types(&self) -> Vec<&str> {
        self.record
            .get("types")
            .and_then(|t| t.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|it| {
                        it.get("type")
                            .and_then(|ty| ty.get("name"))
                            .and_then(|n| n.as_str())
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn stats(&self) -> StatView<'_> {
        StatView {
            entries: self
                .record
                .get("stats")
                .and_then(|s| s.as_array())
                .map(Vec::as_slice)
                .unwrap_or(&[]),
        }
    }

    pub fn images(&self) -> ImageView<'_> {
        ImageView {
            sprites: &self.record["sprites"],
        }
    }

    /// All six stats at once. Fails on the first stat that cannot be read.
    pub fn stats_snapshot(&self) -> Result<StatSnapshot> {
        let view = self.stats();
        Ok(StatSnapshot {
            hp: view.value_of(StatName::Hp)?,
            attack: view.value_of(StatName::Attack)?,
            defense: view.value_of(StatName::Defense)?,
            special_attack: view.value_of(StatName::SpecialAttack)?,
            special_defense: view.value_of(StatName::SpecialDefense)?,
            speed: view.value_of(StatName::Speed)?,
        })
    }
}

/// Borrowed view over the `stats` array of a record.
#[derive(Debug, Clone, Copy)]
pub struct StatView<'a> {
    entries: &'a [Value],
}

impl<'a> StatView<'a> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Base value of `name`.
    ///
    /// Entries are matched on `stat.name`. Position is only used when no entry
    /// in the list carries a name at all; in that case the conventional API
    /// order from [`StatName::position`] is assumed.
    pub fn value_of(&self, name: StatName) -> Result<u32> {
        let has_names = self.entries.iter().any(|e| entry_name(e).is_some());
        let entry = if has_names {
            self.entries
                .iter()
                .find(|e| entry_name(e) == Some(name.as_ref()))
                .ok_or(ApiError::StatNotFound(name))?
        } else {
            self.entries.get(name.position()).ok_or_else(|| {
                ApiError::MalformedStats(format!(
                    "expected at least {} entries for `{}`, found {}",
                    name.position() + 1,
                    name,
                    self.entries.len()
                ))
            })?
        };
        base_stat(entry, name)
    }
}

fn entry_name(entry: &Value) -> Option<&str> {
    entry
        .get("stat")
        .and_then(|st| st.get("name"))
        .and_then(|n| n.as_str())
}

fn base_stat(entry: &Value, name: StatName) -> Result<u32> {
    let raw = entry
        .get("base_stat")
        .ok_or_else(|| ApiError::MalformedStats(format!("entry for `{}` has no base_stat", name)))?;
    raw.as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| {
            ApiError::MalformedStats(format!(
                "base_stat for `{}` is not a non-negative integer: {}",
                name, raw
            ))
        })
}

/// Borrowed view over the `sprites` mapping of a record.
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a> {
    sprites: &'a Value,
}

impl<'a> ImageView<'a> {
    /// URL of the default front sprite. `None` when upstream has no image.
    pub fn front_default(&self) -> Option<&'a str> {
        self.sprites.get("front_default").and_then(|u| u.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StatSnapshot {
    pub hp: u32,
    pub attack: u32,
    pub defense: u32,
    pub special_attack: u32,
    pub special_defense: u32,
    pub speed: u32,
}

impl StatSnapshot {
    pub fn get(&self, name: StatName) -> u32 {
        match name {
            StatName::Hp => self.hp,
            StatName::Attack => self.attack,
            StatName::Defense => self.defense,
            StatName::SpecialAttack => self.special_attack,
            StatName::SpecialDefense => self.special_defense,
            StatName::Speed => self.speed,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (StatName, u32)> + '_ {
        StatName::ALL.into_iter().map(move |n| (n, self.get(n)))
    }
}
