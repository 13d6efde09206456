use serde::{
    de::{self, DeserializeOwned},
    Deserialize, Serialize,
};
use serde_json::{Map, Value};

use crate::domain::RecordId;

/// Query parameters of `GET /{collection}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageQuery {
    pub limit: u32,
    pub skip: u32,
}

/// One server page of a collection, decoded from `{ <collection>: [...], total, skip, limit }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub total: u32,
    pub skip: u32,
    pub limit: u32,
}

#[derive(Deserialize)]
struct PageCounters {
    #[serde(default)]
    total: u32,
    #[serde(default)]
    skip: u32,
    #[serde(default)]
    limit: u32,
}

pub fn decode_page<T: DeserializeOwned>(
    collection: &str,
    body: Value,
) -> Result<Page<T>, serde_json::Error> {
    let Value::Object(mut object) = body else {
        return Err(de::Error::custom("page body must be a JSON object"));
    };
    let items = object.remove(collection).ok_or_else(|| {
        <serde_json::Error as de::Error>::custom(format!("missing `{collection}` array"))
    })?;
    let records: Vec<T> = serde_json::from_value(items)?;
    let counters: PageCounters = serde_json::from_value(Value::Object(object))?;
    Ok(Page {
        records,
        total: counters.total,
        skip: counters.skip,
        limit: counters.limit,
    })
}

pub fn encode_page<T: Serialize>(
    collection: &str,
    page: &Page<T>,
) -> Result<Value, serde_json::Error> {
    let mut object = Map::new();
    object.insert(collection.to_string(), serde_json::to_value(&page.records)?);
    object.insert("total".into(), Value::from(page.total));
    object.insert("skip".into(), Value::from(page.skip));
    object.insert("limit".into(), Value::from(page.limit));
    Ok(Value::Object(object))
}

/// Identifier carried by a create/update response, if the backend populated one.
pub fn response_id(body: &Value) -> Option<RecordId> {
    body.get("id").and_then(Value::as_i64).map(RecordId)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginSession {
    pub id: i64,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Todo;
    use serde_json::json;

    #[test]
    fn decodes_page_keyed_by_collection() {
        let body = json!({
            "todos": [{ "id": 1, "todo": "water plants", "completed": false, "userId": 3 }],
            "total": 254,
            "skip": 0,
            "limit": 1
        });
        let page: Page<Todo> = decode_page("todos", body).expect("page");
        assert_eq!(page.total, 254);
        assert_eq!(page.limit, 1);
        assert_eq!(page.records[0].id, RecordId(1));
        assert_eq!(page.records[0].user_id, 3);
    }

    #[test]
    fn page_without_collection_key_is_rejected() {
        let body = json!({ "posts": [], "total": 0, "skip": 0, "limit": 10 });
        assert!(decode_page::<Todo>("todos", body).is_err());
    }

    #[test]
    fn response_id_is_optional() {
        assert_eq!(response_id(&json!({ "id": 42 })), Some(RecordId(42)));
        assert_eq!(response_id(&json!({ "title": "x" })), None);
    }
}
