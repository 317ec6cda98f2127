//! Batch meal planner: a session-scoped selection of meal templates.
//!
//! The selection lives only as long as the planner is open; it is not
//! persisted against the Profile. Committing a plan ledgers one
//! `meal_plan` decision and empties the selection.

use crate::{
    error::{LensError, LensResult},
    profile::{Decision, DecisionKind, PurchaseCategory},
    types::{MealId, Timestamp},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MealTemplate {
    pub id:          MealId,
    pub name:        String,
    pub description: String,
    pub servings:    u32,
    pub total_cost:  f64,
    pub ingredients: Vec<String>,
    pub category:    String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct MealPlan {
    selected: Vec<MealTemplate>,
}

impl MealPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> &[MealTemplate] {
        &self.selected
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn contains(&self, meal_id: &str) -> bool {
        self.selected.iter().any(|m| m.id == meal_id)
    }

    /// Add the meal, or remove it if already selected. Returns true when
    /// the meal is selected afterwards.
    pub fn toggle(&mut self, meal: &MealTemplate) -> bool {
        if self.contains(&meal.id) {
            self.selected.retain(|m| m.id != meal.id);
            false
        } else {
            self.selected.push(meal.clone());
            true
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn total_cost(&self) -> f64 {
        self.selected.iter().map(|m| m.total_cost).sum()
    }

    pub fn total_servings(&self) -> u32 {
        self.selected.iter().map(|m| m.servings).sum()
    }

    /// 0.0 for an empty plan.
    pub fn cost_per_serving(&self) -> f64 {
        match self.total_servings() {
            0 => 0.0,
            servings => self.total_cost() / servings as f64,
        }
    }

    /// Every ingredient once, in first-seen order.
    pub fn shopping_list(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.selected
            .iter()
            .flat_map(|m| m.ingredients.iter())
            .filter(|ing| seen.insert(ing.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Savings against buying every serving at `takeaway_cost_per_serving`.
    pub fn estimated_savings(&self, takeaway_cost_per_serving: f64) -> f64 {
        let takeaway = self.total_servings() as f64 * takeaway_cost_per_serving;
        (takeaway - self.total_cost()).max(0.0)
    }

    /// The ledger entry for committing this plan.
    pub fn to_decision(&self, takeaway_cost_per_serving: f64, date: Timestamp) -> LensResult<Decision> {
        if self.is_empty() {
            return Err(LensError::EmptyMealPlan);
        }
        let label = self
            .selected
            .iter()
            .map(|m| m.name.as_str())
            .collect::<Vec<_>>()
            .join(" + ");
        Decision::new(
            &format!("Meal plan: {label}"),
            PurchaseCategory::Meals,
            self.estimated_savings(takeaway_cost_per_serving),
            DecisionKind::MealPlan,
            Some(self.total_cost()),
            date,
        )
    }
}
