//! Customer record model persisted by both tiers.
//!
//! The wire format is camelCase JSON. Optional fields are omitted when absent
//! so that absence survives a round trip through either tier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker appended to a text field when the heavy payload was dropped.
pub const PAYLOAD_DROPPED_MARKER: &str = "[IMAGE_NOT_SAVED_DUE_TO_STORAGE_LIMIT]";

/// Customer gender as captured by the order form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "男")]
    Male,
    #[serde(rename = "女")]
    Female,
    #[serde(rename = "其他")]
    Other,
}

/// One structured wish entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

/// Four pillars of the birth chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bazi {
    pub year: String,
    pub month: String,
    pub day: String,
    pub time: String,
}

/// Element balance in percent (0-100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiveElements {
    pub gold: f64,
    pub wood: f64,
    pub water: f64,
    pub fire: f64,
    pub earth: f64,
}

/// Analysis attached to a record after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrystalAnalysis {
    pub zodiac_sign: String,
    pub element: String,
    pub bazi: Bazi,
    pub five_elements: FiveElements,
    pub lucky_element: String,
    pub suggested_crystals: Vec<String>,
    pub reasoning: String,
    pub visual_description: String,
    pub color_palette: Vec<String>,
}

/// A purchased line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub name: String,
    pub quantity: u32,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Delivery and payment details; their presence completes an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingDetails {
    pub real_name: String,
    pub phone: String,
    pub store_code: String,
    pub store_name: String,
    pub social_id: String,
    pub wrist_size: String,
    pub purification_bag_qty: u32,
    pub preferred_colors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<CartItem>>,
    pub total_quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<f64>,
    pub total_price: f64,
}

/// The sole persisted entity, keyed by `id` in both tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRecord {
    /// Caller-generated identifier; never changes.
    pub id: String,
    pub name: String,
    pub birth_date: String,
    pub birth_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_time_unsure: Option<bool>,
    pub gender: Gender,
    #[serde(default)]
    pub wishes: Vec<WishItem>,
    /// Creation time in epoch milliseconds; never changes.
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<CrystalAnalysis>,
    /// Encoded image. The only field the store may drop under pressure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_details: Option<ShippingDetails>,
    /// Free-text wish carried by records created before `wishes` existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wish: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_standard_product: Option<bool>,
    /// Operator-facing note; carries the drop marker when there is no analysis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_note: Option<String>,
}

impl CustomerRecord {
    /// Create a bare record with empty profile fields.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        gender: Gender,
        created_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            birth_date: String::new(),
            birth_time: String::new(),
            is_time_unsure: None,
            gender,
            wishes: Vec::new(),
            created_at,
            analysis: None,
            generated_image_url: None,
            shipping_details: None,
            wish: None,
            is_standard_product: None,
            storage_note: None,
        }
    }

    /// Whether shipping details have been attached.
    pub fn is_completed(&self) -> bool {
        self.shipping_details.is_some()
    }

    pub fn has_heavy_payload(&self) -> bool {
        self.generated_image_url.is_some()
    }

    /// Drop the heavy payload and mark the record so operators can see why.
    ///
    /// The marker goes into `analysis.visual_description` when an analysis is
    /// attached, otherwise into `storage_note`.
    pub fn without_heavy_payload(mut self) -> Self {
        self.drop_heavy_payload();
        self
    }

    /// In-place form of [`CustomerRecord::without_heavy_payload`].
    pub fn drop_heavy_payload(&mut self) {
        self.generated_image_url = None;
        match self.analysis.as_mut() {
            Some(analysis) => append_marker(&mut analysis.visual_description),
            None => append_marker(self.storage_note.get_or_insert_with(String::new)),
        }
    }

    /// Whether this copy lost its heavy payload to the degradation strategy.
    pub fn is_degraded(&self) -> bool {
        let in_analysis = self
            .analysis
            .as_ref()
            .is_some_and(|analysis| analysis.visual_description.contains(PAYLOAD_DROPPED_MARKER));
        let in_note = self
            .storage_note
            .as_deref()
            .is_some_and(|note| note.contains(PAYLOAD_DROPPED_MARKER));
        self.generated_image_url.is_none() && (in_analysis || in_note)
    }

    /// Creation time as a UTC timestamp, if representable.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.created_at)
    }
}

fn append_marker(text: &mut String) {
    if text.contains(PAYLOAD_DROPPED_MARKER) {
        return;
    }
    if !text.is_empty() {
        text.push(' ');
    }
    text.push_str(PAYLOAD_DROPPED_MARKER);
}
