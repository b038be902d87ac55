use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// One of the three daily meal slots.
///
/// Declaration order is the display order within a day, so `Ord` sorts
/// breakfast before lunch before dinner.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MealKind {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealKind {
    /// Every meal kind, in the order the generator fills a day.
    pub const ALL: [MealKind; 3] = [Self::Breakfast, Self::Lunch, Self::Dinner];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
        }
    }
}

impl fmt::Display for MealKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealKind {
    type Err = MealKindParseError;

    /// Case-insensitive, so `Dinner` from a URL parses too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "breakfast" => Ok(Self::Breakfast),
            "lunch" => Ok(Self::Lunch),
            "dinner" => Ok(Self::Dinner),
            _ => Err(MealKindParseError(s.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`MealKind`] string.
#[derive(Debug, Clone)]
pub struct MealKindParseError(pub String);

impl fmt::Display for MealKindParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid meal kind: {:?} (expected breakfast, lunch, or dinner)",
            self.0
        )
    }
}

impl std::error::Error for MealKindParseError {}

// ---------------------------------------------------------------------------

/// The set of meal kinds a food may be served at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MealKindSet(BTreeSet<MealKind>);

impl MealKindSet {
    pub fn contains(&self, kind: MealKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = MealKind> + '_ {
        self.0.iter().copied()
    }

    /// Text values as stored in the `allowed_meal_kinds` column.
    pub fn to_db_values(&self) -> Vec<String> {
        self.iter().map(|k| k.as_str().to_owned()).collect()
    }
}

impl FromIterator<MealKind> for MealKindSet {
    fn from_iter<I: IntoIterator<Item = MealKind>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[MealKind; N]> for MealKindSet {
    fn from(kinds: [MealKind; N]) -> Self {
        kinds.into_iter().collect()
    }
}

impl fmt::Display for MealKindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(MealKind::as_str).collect();
        f.write_str(&names.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A grocery item foods are built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A dish in the catalog, with the meal kinds it may be planned for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Food {
    pub id: Uuid,
    pub name: String,
    pub allowed_meal_kinds: MealKindSet,
    pub ingredient_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Food {
    /// Whether this food may be planned for `kind`.
    pub fn allows(&self, kind: MealKind) -> bool {
        self.allowed_meal_kinds.contains(kind)
    }
}

impl<'r> FromRow<'r, PgRow> for Food {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let raw_kinds: Vec<String> = row.try_get("allowed_meal_kinds")?;
        let allowed_meal_kinds = raw_kinds
            .iter()
            .map(|k| k.parse::<MealKind>())
            .collect::<Result<MealKindSet, _>>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "allowed_meal_kinds".to_owned(),
                source: Box::new(e),
            })?;

        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            allowed_meal_kinds,
            ingredient_ids: row.try_get("ingredient_ids")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// A generated week: one row per ISO (year, week), owning 21 slots.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WeekPlan {
    pub id: Uuid,
    pub year: i32,
    pub week_number: i32,
    pub created_at: DateTime<Utc>,
    /// Loaded separately; ordered by day then meal kind.
    #[sqlx(skip)]
    pub slots: Vec<MealSlot>,
}

impl WeekPlan {
    /// The slot at (`day`, `kind`), if present.
    pub fn slot(&self, day: i32, kind: MealKind) -> Option<&MealSlot> {
        self.slots
            .iter()
            .find(|s| s.day_of_week == day && s.meal_kind == kind)
    }
}

/// One (day, meal kind) cell of a [`WeekPlan`].
///
/// `food_name` is joined from `foods` when the slot is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MealSlot {
    pub id: Uuid,
    pub plan_id: Uuid,
    /// 1 = Monday ... 7 = Sunday.
    pub day_of_week: i32,
    pub meal_kind: MealKind,
    pub food_id: Uuid,
    pub food_name: String,
    pub base_food_id: Option<Uuid>,
    pub manual_food_id: Option<Uuid>,
    pub is_leftover: bool,
    pub leftover_source_id: Option<Uuid>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
