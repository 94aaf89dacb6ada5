//! Simulated food recommendation lookup

use super::{location_from, Tool, ToolOutput};
use async_trait::async_trait;
use rand::Rng;
use serde_json::{json, Value};
use std::time::Duration;

/// Canned food recommendations with simulated API latency
pub struct FoodTool;

#[async_trait]
impl Tool for FoodTool {
    fn name(&self) -> &str {
        "getFood"
    }

    fn description(&self) -> String {
        "Get food recommendations for a location".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "City name, e.g. Beijing"
                }
            },
            "required": ["location"]
        })
    }

    async fn run(&self, input: Value) -> ToolOutput {
        let Some(location) = location_from(&input) else {
            return ToolOutput::error("missing required field: location");
        };
        let location = location.to_string();

        let jitter = rand::thread_rng().gen_range(0..500);
        tokio::time::sleep(Duration::from_millis(2000 + jitter)).await;

        ToolOutput::success(format!(
            "{location} is known for roast duck, douzhi and zhajiang noodles"
        ))
    }
}
