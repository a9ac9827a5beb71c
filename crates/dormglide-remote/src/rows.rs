//! Row codecs between the remote tables (snake_case) and the domain records
//! (camelCase).
//!
//! There is exactly one decode and one encode function per entity. Decoding
//! accepts the camelCase spelling of every column as an alias, and ids stored
//! as integers, but anything else that does not fit is a [`DecodeError`].

use chrono::{DateTime, Utc};
use dormglide_shared::{Condition, Conversation, Message, NewProduct, Product, ProductPatch};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::backend::NewMessage;

/// A response row that does not match the expected shape.
#[derive(Error, Debug)]
#[error("Could not decode {entity} row: {source}")]
pub struct DecodeError {
    pub entity: &'static str,
    #[source]
    pub source: serde_json::Error,
}

fn decode<T: for<'de> Deserialize<'de>>(entity: &'static str, value: Value) -> Result<T, DecodeError> {
    serde_json::from_value(value).map_err(|source| DecodeError { entity, source })
}

/// Accept ids stored as text or as integers.
fn id_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
    }
    Ok(match Id::deserialize(d)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
    })
}

fn opt_id_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    struct Wrap(#[serde(deserialize_with = "id_string")] String);
    Ok(Option::<Wrap>::deserialize(d)?.map(|w| w.0))
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductRow {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    pub price: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(default, alias = "contactInfo", deserialize_with = "null_as_default")]
    pub contact_info: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,
    #[serde(alias = "sellerId", deserialize_with = "id_string")]
    pub seller_id: String,
    #[serde(default, alias = "sellerName", deserialize_with = "null_as_default")]
    pub seller_name: String,
    #[serde(default, alias = "sellerEmail", deserialize_with = "null_as_default")]
    pub seller_email: String,
    #[serde(default, alias = "sellerCampus", deserialize_with = "null_as_default")]
    pub seller_campus: String,
    #[serde(default, alias = "isDemo", deserialize_with = "null_as_default")]
    pub is_demo: bool,
    #[serde(alias = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub views: u64,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            title: row.title,
            description: row.description,
            price: row.price,
            category: row.category,
            condition: row.condition,
            location: row.location,
            contact_info: row.contact_info,
            images: row.images,
            seller_id: row.seller_id,
            seller_name: row.seller_name,
            seller_email: row.seller_email,
            seller_campus: row.seller_campus,
            is_demo: row.is_demo,
            created_at: row.created_at,
            views: row.views,
        }
    }
}

impl From<Product> for ProductRow {
    fn from(p: Product) -> Self {
        ProductRow {
            id: p.id,
            title: p.title,
            description: p.description,
            price: p.price,
            category: p.category,
            condition: p.condition,
            location: p.location,
            contact_info: p.contact_info,
            images: p.images,
            seller_id: p.seller_id,
            seller_name: p.seller_name,
            seller_email: p.seller_email,
            seller_campus: p.seller_campus,
            is_demo: p.is_demo,
            created_at: p.created_at,
            views: p.views,
        }
    }
}

pub fn decode_product(value: Value) -> Result<Product, DecodeError> {
    decode::<ProductRow>("product", value).map(Product::from)
}

pub fn decode_products(value: Value) -> Result<Vec<Product>, DecodeError> {
    decode::<Vec<ProductRow>>("product", value).map(|rows| rows.into_iter().map(Product::from).collect())
}

/// Insert payload for a new listing. The id and timestamp are assigned by
/// the caller; `views` starts at zero.
pub fn encode_new_product(draft: &NewProduct, id: String, created_at: DateTime<Utc>) -> Value {
    let row = ProductRow::from(draft.clone().into_product(id, created_at));
    serde_json::to_value(row).unwrap_or(Value::Null)
}

#[derive(Debug, Default, Serialize)]
struct ProductPatchRow<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    condition: Option<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    contact_info: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    views: Option<u64>,
}

/// Update payload containing only the columns the patch sets.
pub fn encode_product_patch(patch: &ProductPatch) -> Value {
    let row = ProductPatchRow {
        title: patch.title.as_deref(),
        description: patch.description.as_deref(),
        price: patch.price,
        category: patch.category.as_deref(),
        condition: patch.condition,
        location: patch.location.as_deref(),
        contact_info: patch.contact_info.as_deref().map(str::trim),
        images: patch.images.as_deref(),
        views: patch.views,
    };
    serde_json::to_value(row).unwrap_or(Value::Null)
}

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct ConversationRow {
    #[serde(deserialize_with = "id_string")]
    id: String,
    #[serde(default, alias = "productId", deserialize_with = "opt_id_string")]
    product_id: Option<String>,
    #[serde(alias = "participantA", deserialize_with = "id_string")]
    participant_a: String,
    #[serde(alias = "participantB", deserialize_with = "id_string")]
    participant_b: String,
    #[serde(default, alias = "lastMessage")]
    last_message: Option<String>,
    #[serde(default, alias = "lastMessageAt")]
    last_message_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updatedAt")]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "createdAt")]
    created_at: Option<DateTime<Utc>>,
}

impl From<ConversationRow> for Conversation {
    fn from(row: ConversationRow) -> Self {
        let created_at = row
            .created_at
            .or(row.updated_at)
            .or(row.last_message_at)
            .unwrap_or_else(Utc::now);
        Conversation {
            id: row.id,
            product_id: row.product_id,
            participant_a: row.participant_a,
            participant_b: row.participant_b,
            last_message: row.last_message,
            last_message_at: row.last_message_at.or(row.updated_at),
            created_at,
        }
    }
}

pub fn decode_conversation(value: Value) -> Result<Conversation, DecodeError> {
    decode::<ConversationRow>("conversation", value).map(Conversation::from)
}

pub fn decode_conversations(value: Value) -> Result<Vec<Conversation>, DecodeError> {
    decode::<Vec<ConversationRow>>("conversation", value)
        .map(|rows| rows.into_iter().map(Conversation::from).collect())
}

/// Insert payload for a conversation between an already sorted pair.
pub fn encode_new_conversation(pair: &(String, String), product_id: Option<&str>) -> Value {
    json!({
        "participant_a": pair.0,
        "participant_b": pair.1,
        "product_id": product_id,
        "last_message": null,
        "last_message_at": Utc::now(),
    })
}

pub fn encode_conversation_touch(last_message: &str, at: DateTime<Utc>) -> Value {
    json!({
        "last_message": last_message,
        "last_message_at": at,
    })
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct MessageRow {
    #[serde(deserialize_with = "id_string")]
    id: String,
    #[serde(alias = "conversationId", deserialize_with = "id_string")]
    conversation_id: String,
    #[serde(alias = "senderId", deserialize_with = "id_string")]
    sender_id: String,
    #[serde(alias = "receiverId", deserialize_with = "id_string")]
    receiver_id: String,
    #[serde(alias = "message")]
    body: String,
    #[serde(default, alias = "productId", deserialize_with = "opt_id_string")]
    product_id: Option<String>,
    #[serde(alias = "createdAt", alias = "timestamp")]
    created_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            conversation_id: row.conversation_id,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            body: row.body,
            product_id: row.product_id,
            created_at: row.created_at,
        }
    }
}

pub fn decode_message(value: Value) -> Result<Message, DecodeError> {
    decode::<MessageRow>("message", value).map(Message::from)
}

pub fn decode_messages(value: Value) -> Result<Vec<Message>, DecodeError> {
    decode::<Vec<MessageRow>>("message", value).map(|rows| rows.into_iter().map(Message::from).collect())
}

pub fn encode_new_message(msg: &NewMessage) -> Value {
    json!({
        "conversation_id": msg.conversation_id,
        "sender_id": msg.sender_id,
        "receiver_id": msg.receiver_id,
        "product_id": msg.product_id,
        "body": msg.body,
        "created_at": msg.created_at,
    })
}
