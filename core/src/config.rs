use crate::{
    error::{LensError, LensResult},
    meal_plan::MealTemplate,
    progression::Lesson,
    types::StorageKey,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Free-tier ceilings. Each gates one feature; they share no counter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuotaConfig {
    /// Projections are refused once actions_count reaches this.
    pub free_projection_limit: u32,
    /// Maximum meals selected at once in the planner.
    pub free_meal_plan_items:  u32,
}

#[derive(Debug, Clone, Deserialize)]
struct EngineFile {
    storage_key: StorageKey,
    #[serde(default)]
    entitlement_user_id: Option<String>,
    advisory_timeout_ms: u64,
    entitlement_timeout_ms: u64,
    quotas: QuotaConfig,
    takeaway_cost_per_serving: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct LessonsFile {
    lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, Deserialize)]
struct MealsFile {
    meals: Vec<MealTemplate>,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub storage_key:               StorageKey,
    pub entitlement_user_id:       Option<String>,
    pub advisory_timeout:          Duration,
    pub entitlement_timeout:       Duration,
    pub quotas:                    QuotaConfig,
    /// Comparison price of one bought-in serving, used to value meal plans.
    pub takeaway_cost_per_serving: f64,
    /// Ordered lesson catalog. Ids are unique.
    pub lessons:                   Vec<Lesson>,
    pub meals:                     Vec<MealTemplate>,
}

impl EngineConfig {
    /// Load from the data/ directory.
    /// In tests, use EngineConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let engine_path = format!("{data_dir}/engine.json");
        let engine_content = std::fs::read_to_string(&engine_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {engine_path}: {e}"))?;
        let engine: EngineFile = serde_json::from_str(&engine_content)?;

        let lessons_path = format!("{data_dir}/lessons.json");
        let lessons_content = std::fs::read_to_string(&lessons_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {lessons_path}: {e}"))?;
        let lessons_file: LessonsFile = serde_json::from_str(&lessons_content)?;

        let meals_path = format!("{data_dir}/meals.json");
        let meals_content = std::fs::read_to_string(&meals_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {meals_path}: {e}"))?;
        let meals_file: MealsFile = serde_json::from_str(&meals_content)?;

        let config = Self {
            storage_key: engine.storage_key,
            entitlement_user_id: engine.entitlement_user_id,
            advisory_timeout: Duration::from_millis(engine.advisory_timeout_ms),
            entitlement_timeout: Duration::from_millis(engine.entitlement_timeout_ms),
            quotas: engine.quotas,
            takeaway_cost_per_serving: engine.takeaway_cost_per_serving,
            lessons: lessons_file.lessons,
            meals: meals_file.meals,
        };
        config.validate()?;
        log::info!(
            "config: loaded {} lessons and {} meals from {data_dir}",
            config.lessons.len(),
            config.meals.len()
        );
        Ok(config)
    }

    pub fn validate(&self) -> LensResult<()> {
        if self.storage_key.trim().is_empty() {
            return Err(LensError::Config("storage_key must not be empty".into()));
        }
        if self.advisory_timeout.is_zero() || self.entitlement_timeout.is_zero() {
            return Err(LensError::Config("oracle timeouts must be positive".into()));
        }
        if !self.takeaway_cost_per_serving.is_finite() || self.takeaway_cost_per_serving < 0.0 {
            return Err(LensError::Config(format!(
                "takeaway_cost_per_serving={} out of range",
                self.takeaway_cost_per_serving
            )));
        }
        if self.lessons.is_empty() {
            return Err(LensError::Config("lesson catalog is empty".into()));
        }

        let mut lesson_ids = HashSet::new();
        for lesson in &self.lessons {
            if !lesson_ids.insert(lesson.id.as_str()) {
                return Err(LensError::Config(format!("duplicate lesson id '{}'", lesson.id)));
            }
        }

        let mut meal_ids = HashSet::new();
        for meal in &self.meals {
            if !meal_ids.insert(meal.id.as_str()) {
                return Err(LensError::Config(format!("duplicate meal id '{}'", meal.id)));
            }
            if meal.servings == 0 || !meal.total_cost.is_finite() || meal.total_cost <= 0.0 {
                return Err(LensError::Config(format!(
                    "meal '{}' needs positive servings and cost",
                    meal.id
                )));
            }
        }
        Ok(())
    }

    pub fn lesson(&self, lesson_id: &str) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.id == lesson_id)
    }

    pub fn meal(&self, meal_id: &str) -> Option<&MealTemplate> {
        self.meals.iter().find(|m| m.id == meal_id)
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        let lesson = |id: &str, title: &str, requirement: u32| Lesson {
            id: id.into(),
            title: title.into(),
            duration: "60s".into(),
            requirement,
            content: format!("{title} in one minute."),
        };
        let meal = |id: &str, name: &str, servings: u32, total_cost: f64, ingredients: &[&str]| {
            MealTemplate {
                id: id.into(),
                name: name.into(),
                description: String::new(),
                servings,
                total_cost,
                ingredients: ingredients.iter().map(|i| i.to_string()).collect(),
                category: "Dinner".into(),
            }
        };

        Self {
            storage_key: "nestegg_test".into(),
            entitlement_user_id: None,
            advisory_timeout: Duration::from_millis(200),
            entitlement_timeout: Duration::from_millis(200),
            quotas: QuotaConfig {
                free_projection_limit: 5,
                free_meal_plan_items: 1,
            },
            takeaway_cost_per_serving: 10.0,
            lessons: vec![
                lesson("etf-intro", "What is an ETF?", 0),
                lesson("compounding", "Time > Timing", 3),
                lesson("risk-reward", "Risk vs. Reward", 5),
                lesson("first-50", "Your First $50", 8),
            ],
            meals: vec![
                meal("stew", "Slow Cooker Beef Stew", 6, 24.50,
                     &["Beef Chuck", "Carrots", "Potatoes", "Onion"]),
                meal("pasta", "Veggie Pasta Bake", 8, 18.00,
                     &["Penne", "Zucchini", "Spinach", "Onion"]),
                meal("dhal", "Lentil Dhal", 6, 12.00,
                     &["Red Lentils", "Coconut Milk", "Rice", "Spinach"]),
            ],
        }
    }
}
