//! Wire types for the pet-store backend API.
//!
//! Field names match the backend's JSON exactly. Display fields the backend
//! may omit (`image_url`, `description`) default to the empty string rather
//! than failing deserialization.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pawmart_core::{
    CampaignId, CampaignStatus, CartLineId, CategoryId, ConversationId, ConversationStatus, Email,
    MessageId, OrderId, OrderStatus, PaymentStatus, ProductId, UserId,
};

// =============================================================================
// Catalog
// =============================================================================

/// A catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<CategoryId>,
    #[serde(default)]
    pub stock: Option<u32>,
}

/// A product category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

// =============================================================================
// Cart
// =============================================================================

/// A cart line as reported by the backend.
///
/// The `id` is the backend's line id, only valid once the line is persisted
/// server-side; it is never written to the local durable slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteCartLine {
    pub id: CartLineId,
    pub product_id: ProductId,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub description: String,
}

/// A cart line sent to the backend's add and merge endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCartLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: u32,
    pub image_url: String,
    pub description: String,
}

/// The backend cart envelope.
///
/// A response without an `items` field deserializes to the empty list:
/// malformed shape is treated as absence of data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartPayload {
    #[serde(default)]
    pub items: Vec<RemoteCartLine>,
}

/// Request body for the merge endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MergeRequest {
    pub items: Vec<NewCartLine>,
}

/// Request body for the quantity update endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct QuantityUpdate {
    pub quantity: u32,
}

// =============================================================================
// Auth & profile
// =============================================================================

/// Login request body.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Signup request body.
#[derive(Debug, Serialize)]
pub struct SignupRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub name: &'a str,
}

/// Successful login response: a bearer token plus the user's profile.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

/// A user profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: Email,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
}

/// Partial profile update; `None` fields are left unchanged by the backend.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

// =============================================================================
// Orders & checkout
// =============================================================================

/// An order as reported by the order history endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub total: Decimal,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

/// One line of an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_name: String,
    pub quantity: u32,
    pub price: Decimal,
}

/// Checkout request sent to the mocked payment flow.
///
/// Card details are accepted and discarded by the mock gateway; nothing is
/// charged.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRequest {
    pub card_name: String,
    pub card_number: String,
    pub expiry: String,
    pub cvv: String,
    pub delivery_address: String,
}

/// Confirmation returned by the mocked checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub status: PaymentStatus,
    #[serde(default)]
    pub message: String,
}

// =============================================================================
// Sales (staff)
// =============================================================================

/// Aggregate sales figures from the dashboard endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SalesStats {
    pub total_revenue: Decimal,
    pub total_orders: u64,
    pub active_campaigns: u64,
    #[serde(default)]
    pub revenue_chart: Vec<RevenuePoint>,
    #[serde(default)]
    pub top_products: Vec<TopProduct>,
}

/// One day of revenue on the dashboard chart.
#[derive(Debug, Clone, Deserialize)]
pub struct RevenuePoint {
    pub date: NaiveDate,
    pub revenue: Decimal,
}

/// A best-selling product on the dashboard.
#[derive(Debug, Clone, Deserialize)]
pub struct TopProduct {
    pub product_name: String,
    pub total_quantity: u64,
    pub total_revenue: Decimal,
}

/// A discount campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Percent off, 1 to 100.
    pub discount_percentage: u8,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: CampaignStatus,
    #[serde(default)]
    pub products: Vec<ProductId>,
}

/// Request body for the product price endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PriceUpdate {
    pub price: Decimal,
}

// =============================================================================
// Delivery (staff)
// =============================================================================

/// A delivery as reported by the tracking endpoints.
///
/// Keyed by the backend's string delivery id (`DEL-001` style), not a numeric
/// order id. `delivery_date` is set by the backend once the delivery is
/// marked delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub delivery_id: String,
    #[serde(default)]
    pub customer_name: String,
    pub status: OrderStatus,
    pub total_price: Decimal,
    #[serde(default)]
    pub delivery_address: String,
    pub order_date: NaiveDate,
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
}

/// The delivery list envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryListPayload {
    #[serde(default)]
    pub orders: Vec<Delivery>,
    #[serde(default)]
    pub count: u64,
}

/// Aggregate delivery figures from the tracking dashboard endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryStats {
    pub total_orders: u64,
    pub processing_orders: u64,
    pub in_transit_orders: u64,
    pub delivered_orders: u64,
    pub today_orders: u64,
    pub pending_deliveries: u64,
    pub delivered_revenue: Decimal,
    #[serde(default)]
    pub avg_delivery_days: Option<f64>,
}

/// Request body for the delivery status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryStatusUpdate {
    pub status: OrderStatus,
}

// =============================================================================
// Support
// =============================================================================

/// A support conversation, with its message transcript when fetched by id.
#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub status: ConversationStatus,
    #[serde(default)]
    pub priority: ConversationPriority,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// Priority assigned to a support conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl std::fmt::Display for ConversationPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Urgent => write!(f, "urgent"),
        }
    }
}

/// One message in a support conversation transcript.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub is_from_agent: bool,
    #[serde(default)]
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_payload_parses_items() {
        let json = r#"{"items": [{
            "id": 7,
            "product_id": 3,
            "product_name": "Chew Toy",
            "price": "12.50",
            "quantity": 2
        }]}"#;

        let payload: CartPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.items.len(), 1);
        let line = payload.items.first().unwrap();
        assert_eq!(line.id, CartLineId::new(7));
        assert_eq!(line.product_id, ProductId::new(3));
        assert_eq!(line.quantity, 2);
        // Omitted display fields default to empty
        assert!(line.image_url.is_empty());
        assert!(line.description.is_empty());
    }

    #[test]
    fn test_cart_payload_missing_items_is_empty() {
        let payload: CartPayload = serde_json::from_str("{}").unwrap();
        assert!(payload.items.is_empty());

        let payload: CartPayload = serde_json::from_str(r#"{"detail": "oops"}"#).unwrap();
        assert!(payload.items.is_empty());
    }

    #[test]
    fn test_product_optional_fields_default() {
        let json = r#"{"id": 1, "name": "Dog Bed", "price": "45.00"}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert!(product.image_url.is_empty());
        assert!(product.category.is_none());
        assert!(product.stock.is_none());
    }

    #[test]
    fn test_delivery_list_parses_status_and_dates() {
        let json = r#"{"orders": [{
            "delivery_id": "DEL-001",
            "customer_name": "John Doe",
            "status": "in-transit",
            "total_price": "179.98",
            "order_date": "2024-01-15",
            "delivery_date": null
        }], "count": 1}"#;

        let payload: DeliveryListPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.count, 1);
        let delivery = payload.orders.first().unwrap();
        assert_eq!(delivery.delivery_id, "DEL-001");
        assert_eq!(delivery.status, OrderStatus::InTransit);
        assert!(delivery.delivery_date.is_none());
    }

    #[test]
    fn test_sales_stats_chart_defaults_to_empty() {
        let json = r#"{"total_revenue": "1234.50", "total_orders": 10, "active_campaigns": 2}"#;
        let stats: SalesStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.total_orders, 10);
        assert!(stats.revenue_chart.is_empty());
        assert!(stats.top_products.is_empty());
    }

    #[test]
    fn test_conversation_parses_transcript() {
        let json = r#"{
            "id": 5,
            "status": "active",
            "priority": "high",
            "created_at": "2024-01-15T10:00:00Z",
            "messages": [{
                "id": 1,
                "is_from_agent": false,
                "content": "Where is my order?",
                "created_at": "2024-01-15T10:00:05Z"
            }]
        }"#;

        let conversation: Conversation = serde_json::from_str(json).unwrap();
        assert_eq!(conversation.status, ConversationStatus::Active);
        assert_eq!(conversation.priority, ConversationPriority::High);
        assert_eq!(conversation.messages.len(), 1);
        assert!(!conversation.messages.first().unwrap().is_from_agent);
    }

    #[test]
    fn test_profile_update_skips_none_fields() {
        let update = ProfileUpdate {
            address: Some("12 Bark Lane".to_string()),
            ..ProfileUpdate::default()
        };
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"{"address":"12 Bark Lane"}"#);
    }
}
