//! Horoscope tools
//!
//! Three fixed-answer tools the model can call: today's horoscope for a sign,
//! a lucky item for a sign, and the sign for a birthday. The answers are
//! placeholders; only the argument handling is real.

use crate::error::Result;
use crate::tools::{required_str, Tool, ToolExecutor};
use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};

/// Name of the horoscope tool
pub const GET_HOROSCOPE: &str = "get_horoscope";
/// Name of the lucky item tool
pub const GET_LUCKY_ITEM: &str = "get_lucky_item";
/// Name of the zodiac sign tool
pub const GET_ZODIAC_SIGN: &str = "get_zodiac_sign";

/// Answer of `get_zodiac_sign` for a birthday that is not `YYYY-MM-DD`
pub const INVALID_DATE_MESSAGE: &str = "不正な日付形式です。YYYY-MM-DD形式で入力してください。";

const SIGN_DESCRIPTION: &str = "牡牛座や水瓶座などの占星術のサイン";

/// All horoscope tools, ready to register
pub fn all_tools() -> Vec<Arc<dyn ToolExecutor>> {
    vec![
        Arc::new(HoroscopeTool),
        Arc::new(LuckyItemTool),
        Arc::new(ZodiacSignTool),
    ]
}

/// Today's horoscope for a sign
pub fn horoscope_for(sign: &str) -> String {
    format!(
        "{}: 来週の火曜日にあなたは赤ちゃんのカワウソと友達になるでしょう。",
        sign
    )
}

/// Today's lucky item for a sign
pub fn lucky_item_for(sign: &str) -> String {
    format!("{}の今日のラッキーアイテムは「水色のハンカチ」です。", sign)
}

/// Zodiac sign for a `YYYY-MM-DD` birthday
///
/// Only the shape of the date is checked; every well-formed date answers
/// 水瓶座.
///
/// # Examples
///
/// ```
/// use horoscope_agent::tools::horoscope::{zodiac_sign_for, INVALID_DATE_MESSAGE};
///
/// assert_eq!(zodiac_sign_for("1990-01-25"), "水瓶座");
/// assert_eq!(zodiac_sign_for("1990/01/25"), INVALID_DATE_MESSAGE);
/// ```
pub fn zodiac_sign_for(birthday: &str) -> &'static str {
    if date_pattern().is_match(birthday) {
        "水瓶座"
    } else {
        INVALID_DATE_MESSAGE
    }
}

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("Invalid date pattern"))
}

/// `get_horoscope(sign)`
pub struct HoroscopeTool;

#[async_trait]
impl ToolExecutor for HoroscopeTool {
    fn tool_definition(&self) -> Tool {
        Tool::new(
            GET_HOROSCOPE,
            "占星術のサインの今日の運勢を取得します。",
            json!({
                "type": "object",
                "properties": {
                    "sign": {
                        "type": "string",
                        "description": SIGN_DESCRIPTION,
                    }
                },
                "required": ["sign"],
            }),
        )
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let sign = required_str(&args, "sign", GET_HOROSCOPE)?;
        Ok(Value::String(horoscope_for(sign)))
    }
}

/// `get_lucky_item(sign, fortune)`
///
/// `fortune` is required by the schema but does not change the answer.
pub struct LuckyItemTool;

#[async_trait]
impl ToolExecutor for LuckyItemTool {
    fn tool_definition(&self) -> Tool {
        Tool::new(
            GET_LUCKY_ITEM,
            "星座や運勢から今日のラッキーアイテムを取得します。",
            json!({
                "type": "object",
                "properties": {
                    "sign": {
                        "type": "string",
                        "description": SIGN_DESCRIPTION,
                    },
                    "fortune": {
                        "type": "string",
                        "description": "星座に関連する運勢の内容",
                    }
                },
                "required": ["sign", "fortune"],
            }),
        )
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let sign = required_str(&args, "sign", GET_LUCKY_ITEM)?;
        required_str(&args, "fortune", GET_LUCKY_ITEM)?;
        Ok(Value::String(lucky_item_for(sign)))
    }
}

/// `get_zodiac_sign(birthday)`
pub struct ZodiacSignTool;

#[async_trait]
impl ToolExecutor for ZodiacSignTool {
    fn tool_definition(&self) -> Tool {
        Tool::new(
            GET_ZODIAC_SIGN,
            "誕生日から星座を判定します。",
            json!({
                "type": "object",
                "properties": {
                    "birthday": {
                        "type": "string",
                        "description": "YYYY-MM-DD形式の誕生日",
                    }
                },
                "required": ["birthday"],
            }),
        )
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let birthday = required_str(&args, "birthday", GET_ZODIAC_SIGN)?;
        Ok(Value::String(zodiac_sign_for(birthday).to_string()))
    }
}
