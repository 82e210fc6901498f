use bytes::Bytes;
use serde_json::{json, Map, Value};
use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::extract::extract_object;
use super::repo_types::{Location, NewAnalysis};
use crate::gemini::{GenerativeModel, InlineImage, ModelError};
use crate::images::services::image_to_base64;
use crate::state::AppState;

const FOOD_ANALYSIS_PROMPT: &str = r#"
Analyze this food image and provide detailed nutritional information in the following JSON format ONLY.
Do not include any other text before or after the JSON:

{
    "food_name": "Name of the food item",
    "category": "Food category (e.g., Fruit, Vegetable, Grain, Protein, Dairy, etc.)",
    "calories_per_100g": "Estimated calories per 100 grams (number only)",
    "nutritional_info": {
        "protein": "Protein content in grams per 100g (number only)",
        "carbohydrates": "Carbohydrate content in grams per 100g (number only)",
        "fat": "Fat content in grams per 100g (number only)",
        "fiber": "Fiber content in grams per 100g (number only)",
        "sugar": "Sugar content in grams per 100g (number only)",
        "sodium": "Sodium content in mg per 100g (number only)"
    },
    "vitamins_minerals": {
        "vitamin_c": "Vitamin C content with units",
        "vitamin_a": "Vitamin A content with units",
        "iron": "Iron content with units",
        "calcium": "Calcium content with units",
        "potassium": "Potassium content with units"
    },
    "health_benefits": ["List of 3-5 key health benefits"],
    "allergens": ["List of potential allergens if any"],
    "storage_tips": "Brief storage recommendation",
    "preparation_suggestions": ["List of 2-3 preparation methods"],
    "serving_size": "Standard serving size",
    "glycemic_index": "Low/Medium/High",
    "dietary_restrictions": ["Applicable dietary categories like Vegan, Vegetarian, Gluten-free, etc."]
}

Provide accurate nutritional information. If you cannot identify the food clearly, set food_name to "Unidentified food item".
"#;

fn nearby_places_prompt(food_name: &str, loc: Location) -> String {
    format!(
        r#"
Based on the food item "{food_name}" and the location coordinates (latitude: {lat}, longitude: {lon}),
suggest 4-5 nearby places (shops, restaurants, hotels, cafes, or markets) where this food item is commonly available.

Provide ONLY a JSON response in this exact format:
{{
    "nearby_places": [
        {{
            "name": "Place name",
            "type": "Restaurant/Cafe/Shop/Hotel/Market",
            "description": "Brief description of what they offer",
            "distance": "Approximate distance estimate"
        }}
    ]
}}

Make educated suggestions based on common establishments that typically serve or sell this type of food.
If this is a common food item, suggest generic types of places (e.g., "Local Grocery Stores", "Italian Restaurants", etc.).
"#,
        lat = loc.latitude,
        lon = loc.longitude,
    )
}

/// What came back from asking the model about an image.
#[derive(Debug)]
pub enum FoodAnalysis {
    Recognized(Map<String, Value>),
    Unparsable { raw_response: String },
    Failed(ModelError),
}

impl FoodAnalysis {
    /// The `food_data` to store and return; fallbacks keep the usual shape.
    pub fn into_food_data(self) -> Map<String, Value> {
        match self {
            FoodAnalysis::Recognized(map) => map,
            FoodAnalysis::Unparsable { raw_response } => parsing_fallback(raw_response),
            FoodAnalysis::Failed(err) => failure_fallback(&err),
        }
    }
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn parsing_fallback(raw_response: String) -> Map<String, Value> {
    into_map(json!({
        "food_name": "Unable to identify food item",
        "category": "Unknown",
        "calories_per_100g": "N/A",
        "nutritional_info": {
            "protein": "N/A",
            "carbohydrates": "N/A",
            "fat": "N/A",
            "fiber": "N/A",
            "sugar": "N/A",
            "sodium": "N/A"
        },
        "vitamins_minerals": {
            "vitamin_c": "N/A",
            "vitamin_a": "N/A",
            "iron": "N/A",
            "calcium": "N/A",
            "potassium": "N/A"
        },
        "health_benefits": ["Analysis could not be completed"],
        "allergens": [],
        "storage_tips": "Store according to food type",
        "preparation_suggestions": ["Cook as desired"],
        "serving_size": "N/A",
        "glycemic_index": "N/A",
        "dietary_restrictions": [],
        "raw_response": raw_response,
        "parsing_error": true
    }))
}

fn failure_fallback(err: &ModelError) -> Map<String, Value> {
    into_map(json!({
        "error": format!("Failed to analyze food: {err}"),
        "food_name": "Analysis Failed",
        "category": "Unknown",
        "calories_per_100g": "N/A",
        "nutritional_info": {
            "protein": "N/A",
            "carbohydrates": "N/A",
            "fat": "N/A",
            "fiber": "N/A",
            "sugar": "N/A",
            "sodium": "N/A"
        },
        "vitamins_minerals": {},
        "health_benefits": [],
        "allergens": [],
        "storage_tips": "N/A",
        "preparation_suggestions": [],
        "serving_size": "N/A",
        "glycemic_index": "N/A",
        "dietary_restrictions": []
    }))
}

pub async fn analyze_food(model: &dyn GenerativeModel, image: InlineImage<'_>) -> FoodAnalysis {
    match model.generate(FOOD_ANALYSIS_PROMPT, Some(image)).await {
        Ok(text) => match extract_object(&text) {
            Some(map) => FoodAnalysis::Recognized(map),
            None => {
                warn!("food analysis reply had no usable JSON");
                FoodAnalysis::Unparsable { raw_response: text }
            }
        },
        Err(e) => {
            error!(error = %e, "food analysis failed");
            FoodAnalysis::Failed(e)
        }
    }
}

pub async fn suggest_nearby_places(
    model: &dyn GenerativeModel,
    food_name: &str,
    loc: Location,
) -> Vec<Value> {
    let text = match model.generate(&nearby_places_prompt(food_name, loc), None).await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "nearby places lookup failed");
            return Vec::new();
        }
    };

    match extract_object(&text).and_then(|mut m| m.remove("nearby_places")) {
        Some(Value::Array(places)) => places,
        _ => vec![json!({
            "name": format!("Local {food_name} Vendors"),
            "type": "Market/Shop",
            "description": format!("Check nearby markets and grocery stores for {food_name}"),
            "distance": "Nearby"
        })],
    }
}

pub struct UploadItem {
    pub original_filename: String,
    pub mime_type: &'static str,
    pub body: Bytes,
    pub location: Option<Location>,
    pub user_session: Option<String>,
}

pub struct UploadResult {
    pub food_data: Map<String, Value>,
    pub image_base64: String,
    pub mime_type: &'static str,
    pub analysis_id: Option<Uuid>,
}

/// Analyse, enrich with nearby places, persist. Never fails: model and store
/// problems are folded into the returned `food_data`.
pub async fn process_upload(st: &AppState, item: UploadItem) -> UploadResult {
    let image_base64 = image_to_base64(&item.body);
    let mime_type = item.mime_type;

    info!(filename = %item.original_filename, bytes = item.body.len(), "analyzing image");
    let analysis = analyze_food(
        st.model.as_ref(),
        InlineImage {
            mime_type,
            data_base64: &image_base64,
        },
    )
    .await;
    let mut food_data = analysis.into_food_data();

    let mut nearby_places = Vec::new();
    if let Some(loc) = item.location {
        let food_name = food_data
            .get("food_name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(str::to_owned);
        if let Some(name) = food_name {
            info!(food_name = %name, "looking up nearby places");
            nearby_places = suggest_nearby_places(st.model.as_ref(), &name, loc).await;
        }
    }
    food_data.insert("nearby_places".into(), Value::Array(nearby_places));

    let new = NewAnalysis {
        timestamp: OffsetDateTime::now_utc(),
        original_filename: item.original_filename,
        image_base64: image_base64.clone(),
        food_data: Value::Object(food_data.clone()),
        user_session: item.user_session,
        location_data: item.location,
    };
    let analysis_id = match st.store.insert(new).await {
        Ok(id) => {
            info!(%id, "analysis saved");
            food_data.insert("analysis_id".into(), Value::String(id.to_string()));
            Some(id)
        }
        Err(e) => {
            error!(error = %e, "saving analysis failed");
            None
        }
    };

    UploadResult {
        food_data,
        image_base64,
        mime_type,
        analysis_id,
    }
}
