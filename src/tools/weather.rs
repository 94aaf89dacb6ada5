//! Simulated weather lookup

use super::{location_from, Tool, ToolOutput};
use async_trait::async_trait;
use rand::Rng;
use serde_json::{json, Value};
use std::time::Duration;

/// Canned weather report with simulated API latency
pub struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "getWeather"
    }

    fn description(&self) -> String {
        "Get the current weather for a location".to_string()
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
            "{location}: sunny, 22\u{b0}C to 32\u{b0}C, light northeast breeze"
        ))
    }
}
