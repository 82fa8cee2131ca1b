use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::discount::EconomicAttributes;

/// `message` value of a successful site API response.
pub const SUCCESS: &str = "SUCCESS";

/// Envelope wrapping every site API response.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Payload of a successful response; `None` for any other message.
    pub fn into_success(self) -> Option<Value> {
        (self.message == SUCCESS).then_some(self.data)
    }
}

/// `data` of a search response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    /// Raw results, deserialized one by one so a bad record only costs itself.
    /// `null` means no results.
    #[serde(default)]
    pub data: Option<Vec<Value>>,
    #[serde(default)]
    pub total_pages: Option<Value>,
}

/// Attributes of one torrent as reported by its detail endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TorrentAttributes {
    pub economics: EconomicAttributes,
    pub seeders: u32,
}

/// A member role (user class) of the site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SysRole {
    pub id: i64,
    pub name_chs: String,
    pub name_cht: String,
    pub name_eng: String,
    pub image: String,
    pub color: String,
    pub read_access: i64,
    pub class_up: i64,
    pub register_week: i64,
    pub downloaded: i64,
    pub share_rate: i64,
    pub share_rate_limit: i64,
    pub sort_point: i64,
}

impl SysRole {
    /// Build a role from one `sysRoleList` entry. Numeric fields may arrive as
    /// strings or floats and are truncated to integers; missing ones are 0.
    pub fn from_json(value: &Value) -> Self {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let int = |key: &str| value.get(key).map(lenient_int).unwrap_or(0);

        Self {
            id: int("id"),
            name_chs: text("nameChs"),
            name_cht: text("nameCht"),
            name_eng: text("nameEng"),
            image: text("image"),
            color: text("color"),
            read_access: int("readAccess"),
            class_up: int("classUp"),
            register_week: int("registerWeek"),
            downloaded: int("downloaded"),
            share_rate: int("shareRate"),
            share_rate_limit: int("shareRateLimit"),
            sort_point: int("sortPoint"),
        }
    }
}

/// Integer from a JSON number or numeric string, truncating fractions.
pub(crate) fn lenient_int(value: &Value) -> i64 {
    let int = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
        }
        _ => None,
    };
    int.unwrap_or(0)
}

fn truncate(f: f64) -> Option<i64> {
    f.is_finite().then(|| f.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_success() {
        let env: Envelope =
            serde_json::from_value(json!({"message": "SUCCESS", "data": 1})).unwrap();
        assert_eq!(env.into_success(), Some(json!(1)));

        let env: Envelope = serde_json::from_value(json!({"message": "key invalid"})).unwrap();
        assert_eq!(env.into_success(), None);
    }

    #[test]
    fn test_search_page_defaults() {
        let page: SearchPage = serde_json::from_value(json!({})).unwrap();
        assert!(page.data.is_none());
        assert!(page.total_pages.is_none());

        let page: SearchPage = serde_json::from_value(json!({"data": null})).unwrap();
        assert!(page.data.is_none());
    }

    #[test]
    fn test_lenient_int_keeps_large_integers() {
        let big = 9_007_199_254_740_993_i64;
        assert_eq!(lenient_int(&json!(big)), big);
        assert_eq!(lenient_int(&json!(big.to_string())), big);
        assert_eq!(lenient_int(&json!(-3)), -3);
        assert_eq!(lenient_int(&json!(" 7.9 ")), 7);
        assert_eq!(lenient_int(&json!(null)), 0);
    }

    #[test]
    fn test_sys_role_from_json() {
        let role = SysRole::from_json(&json!({
            "id": "5",
            "nameChs": "精英",
            "nameEng": "Elite User",
            "classUp": "25.0",
            "shareRate": 2.55,
            "downloaded": "1099511627776",
            "registerWeek": "bad"
        }));
        assert_eq!(role.id, 5);
        assert_eq!(role.name_eng, "Elite User");
        assert_eq!(role.name_cht, "");
        assert_eq!(role.class_up, 25);
        assert_eq!(role.share_rate, 2);
        assert_eq!(role.downloaded, 1_099_511_627_776);
        assert_eq!(role.register_week, 0);
    }
}
