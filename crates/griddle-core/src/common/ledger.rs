//! Ingredient ledger and portioning.
//!
//! A [`Ledger`] owns the running [`Stock`] of one session. Ingredients are
//! applied in arrival order and, after each one, the caller asks the ledger to
//! [`extract_portions`](Ledger::extract_portions): as many whole portions as
//! the stock allows are removed at once and reported as a [`PortionBatch`].
//!
//! The ledger has no interior mutability. Atomicity of apply-then-extract is
//! obtained by ownership: exactly one task holds the `&mut Ledger`.
//!
//! ## Precision
//!
//! Milk is accumulated and compared as an IEEE double with no epsilon, so
//! long runs of fractional deliveries can drift. The residual left after
//! paying for a batch is clamped at zero so the stock never reads negative.

use crate::types::{Eggs, Flour, Ingredient, Milk};

/// The fixed per-portion cost of every ingredient.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Recipe {
    pub eggs: u64,
    pub flour_grams: u64,
    pub milk_litres: f64,
}

/// Cost of one pancake: 2 eggs, 250g flour, 0.35L milk.
pub const PORTION_RECIPE: Recipe = Recipe {
    eggs: 2,
    flour_grams: 250,
    milk_litres: 0.35,
};

impl Default for Recipe {
    fn default() -> Self {
        PORTION_RECIPE
    }
}

/// Ingredients currently on hand. Every field is non-negative.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Stock {
    pub eggs: u64,
    pub flour: u64,
    pub milk: f64,
}

/// A non-empty number of whole portions removed from the stock in one go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortionBatch {
    count: u64,
}

impl PortionBatch {
    /// Number of portions in the batch, always at least one.
    pub const fn count(&self) -> u64 {
        self.count
    }
}

impl Recipe {
    /// Whether every ingredient has a positive cost. A recipe with a free
    /// ingredient never yields portions.
    pub fn is_priced(&self) -> bool {
        self.eggs > 0 && self.flour_grams > 0 && self.milk_litres > 0.0
    }

    /// Computes the portions extractable from `stock`.
    ///
    /// Returns the stock after paying for them and the batch, or the
    /// unchanged stock and `None` when not even one portion fits.
    pub fn extract(&self, stock: Stock) -> (Stock, Option<PortionBatch>) {
        if !self.is_priced() {
            return (stock, None);
        }

        let by_ratio = (stock.flour as f64 / self.flour_grams as f64)
            .min(stock.milk / self.milk_litres)
            .min(stock.eggs as f64 / self.eggs as f64)
            .floor();

        // Float-to-int casts saturate (NaN becomes 0). The integer bounds keep
        // the cost exact for counts beyond f64's 53-bit mantissa.
        let portions = (by_ratio as u64)
            .min(stock.eggs / self.eggs)
            .min(stock.flour / self.flour_grams);

        if portions == 0 {
            return (stock, None);
        }

        let remaining = Stock {
            eggs: stock.eggs - self.eggs * portions,
            flour: stock.flour - self.flour_grams * portions,
            milk: (stock.milk - self.milk_litres * portions as f64).max(0.0),
        };

        (remaining, Some(PortionBatch { count: portions }))
    }
}

/// The running ingredient totals for one session.
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    stock: Stock,
}

impl Ledger {
    /// An empty ledger using [`PORTION_RECIPE`].
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn stock(&self) -> Stock {
        self.stock
    }

    /// Adds the ingredient's quantity to the matching field.
    pub fn apply(&mut self, ingredient: &Ingredient) {
        match *ingredient {
            Ingredient::Eggs(Eggs { count }) => {
                self.stock.eggs = self.stock.eggs.saturating_add(count);
            }
            Ingredient::Flour(Flour { grams }) => {
                self.stock.flour = self.stock.flour.saturating_add(grams);
            }
            Ingredient::Milk(Milk { litres }) => {
                self.stock.milk += litres;
            }
        }
    }

    /// Removes as many whole portions as the stock allows.
    pub fn extract_portions(&mut self) -> Option<PortionBatch> {
        let (stock, batch) = PORTION_RECIPE.extract(self.stock);
        self.stock = stock;
        batch
    }
}
