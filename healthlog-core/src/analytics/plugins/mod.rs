//! Built-in analyzers
//!
//! Each analyzer lives in its own subdirectory.
//!
//! ## Built-in Analyzers
//!
//! - [`sleep_mood`]: correlates sleep duration with mood
//! - [`exercise_mood`]: mood on exercise days vs rest days
//! - [`hydration`]: water intake against the daily goal
//! - [`nutrition`]: day-to-day calorie swings
//! - [`general`]: fallback that always answers
//!
//! ## Creating Custom Analyzers
//!
//! 1. Create a new module implementing [`Analyzer`](super::Analyzer)
//! 2. Register it with [`InsightEngine::register`](super::InsightEngine::register)
//!
//! Or use [`create_default_engine`] to get an engine with all built-ins.

pub mod exercise_mood;
pub mod general;
pub mod hydration;
pub mod nutrition;
pub mod sleep_mood;

use super::InsightEngine;

/// Create an engine with all built-in analyzers registered.
///
/// ```rust,ignore
/// use healthlog_core::analytics::create_default_engine;
///
/// let engine = create_default_engine();
/// println!("Registered analyzers: {:?}", engine.analyzer_names());
/// ```
pub fn create_default_engine() -> InsightEngine {
    let mut engine = InsightEngine::new();
    engine.register(Box::new(sleep_mood::SleepMoodAnalyzer::new()));
    engine.register(Box::new(exercise_mood::ExerciseMoodAnalyzer::new()));
    engine.register(Box::new(hydration::HydrationAnalyzer::new()));
    engine.register(Box::new(nutrition::NutritionAnalyzer::new()));
    engine.set_fallback(Box::new(general::GeneralAnalyzer::new()));
    engine
}
