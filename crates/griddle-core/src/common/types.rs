//! # Wire Types
//!
//! The values exchanged between producers and the kitchen.
//!
//! ## Inbound
//!
//! - [`Ingredient`] - a closed set of three kinds, each with its own quantity
//!   field. The JSON discriminator is the `"ingredient"` key.
//!
//! ## Outbound
//!
//! - [`StatusEvent`] - either an acknowledgement echoing the received
//!   [`Ingredient`] or a notification that one portion has finished cooking.
//!   The JSON discriminator is the `"status"` key.
//!
//! Every type here is immutable once constructed and serializes to the exact
//! shapes documented in the crate README.

use core::fmt;
use serde::{Deserialize, Serialize};

/// JSON key carrying the ingredient kind on inbound messages.
pub const INGREDIENT_TAG: &str = "ingredient";

/// A delivery of eggs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eggs {
    #[serde(default)]
    pub count: u64,
}

/// A delivery of flour, in grams.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flour {
    #[serde(default)]
    pub grams: u64,
}

/// A delivery of milk, in litres.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Milk {
    #[serde(default)]
    pub litres: f64,
}

/// The discriminator of an [`Ingredient`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IngredientKind {
    Eggs,
    Flour,
    Milk,
}

impl IngredientKind {
    /// Every known kind, in wire order.
    pub const ALL: [Self; 3] = [Self::Eggs, Self::Flour, Self::Milk];

    /// The discriminator string used on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eggs => "eggs",
            Self::Flour => "flour",
            Self::Milk => "milk",
        }
    }

    /// Resolves a wire discriminator, returning `None` for anything outside
    /// the closed set.
    pub fn from_wire(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }
}

impl fmt::Display for IngredientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single ingredient event.
///
/// Serializes with its own `"ingredient"` discriminator so that it can be
/// echoed verbatim inside an `ingredient-received` acknowledgement.
///
/// Deserialization is intentionally not derived: inbound payloads go through
/// [`crate::codec::interpret`], which reports unknown kinds and malformed
/// fields as distinct errors.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "ingredient", rename_all = "lowercase")]
pub enum Ingredient {
    Eggs(Eggs),
    Flour(Flour),
    Milk(Milk),
}

impl Ingredient {
    pub const fn eggs(count: u64) -> Self {
        Self::Eggs(Eggs { count })
    }

    pub const fn flour(grams: u64) -> Self {
        Self::Flour(Flour { grams })
    }

    pub const fn milk(litres: f64) -> Self {
        Self::Milk(Milk { litres })
    }

    pub const fn kind(&self) -> IngredientKind {
        match self {
            Self::Eggs(_) => IngredientKind::Eggs,
            Self::Flour(_) => IngredientKind::Flour,
            Self::Milk(_) => IngredientKind::Milk,
        }
    }
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eggs(Eggs { count }) => write!(f, "{count} eggs"),
            Self::Flour(Flour { grams }) => write!(f, "{grams}g flour"),
            Self::Milk(Milk { litres }) => write!(f, "{litres}L milk"),
        }
    }
}

/// An outbound notification written back onto the producer's connection.
///
/// Events carry no sequence number; their order on the wire is their emission
/// order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "status")]
pub enum StatusEvent {
    /// Emitted once for every accepted ingredient, before any portion it
    /// completes is reported ready.
    #[serde(rename = "ingredient-received")]
    IngredientReceived { ingredient: Ingredient },

    /// Emitted by a fryer when one portion has finished cooking.
    #[serde(rename = "pancake-ready")]
    PortionReady,
}

impl StatusEvent {
    pub const fn received(ingredient: Ingredient) -> Self {
        Self::IngredientReceived { ingredient }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ingredient_serializes_with_discriminator() {
        assert_eq!(
            serde_json::to_value(Ingredient::eggs(4)).unwrap(),
            json!({"ingredient": "eggs", "count": 4})
        );
        assert_eq!(
            serde_json::to_value(Ingredient::flour(450)).unwrap(),
            json!({"ingredient": "flour", "grams": 450})
        );
        assert_eq!(
            serde_json::to_value(Ingredient::milk(1.5)).unwrap(),
            json!({"ingredient": "milk", "litres": 1.5})
        );
    }

    #[test]
    fn status_events_match_wire_shapes() {
        assert_eq!(
            serde_json::to_value(StatusEvent::PortionReady).unwrap(),
            json!({"status": "pancake-ready"})
        );
        assert_eq!(
            serde_json::to_value(StatusEvent::received(Ingredient::milk(0.35))).unwrap(),
            json!({
                "status": "ingredient-received",
                "ingredient": {"ingredient": "milk", "litres": 0.35}
            })
        );
    }

    #[test]
    fn kind_lookup_is_closed() {
        for kind in IngredientKind::ALL {
            assert_eq!(IngredientKind::from_wire(kind.as_str()), Some(kind));
        }
        assert_eq!(IngredientKind::from_wire("butter"), None);
        assert_eq!(IngredientKind::from_wire("Eggs"), None);
        assert_eq!(Ingredient::flour(1).kind(), IngredientKind::Flour);
    }
}
