use fwp_crm_store::{
    Bazi, CrystalAnalysis, CustomerRecord, FiveElements, Gender, MemoryBlobStore,
    SecondaryStore, ShippingDetails, WishItem,
};
use std::sync::Arc;

/// Record with a filled profile and analysis but no image.
pub fn sample_record(id: &str, created_at: i64) -> CustomerRecord {
    let mut record = CustomerRecord::new(id, format!("customer {id}"), Gender::Female, created_at);
    record.birth_date = "1992-06-15".to_string();
    record.birth_time = "07:45".to_string();
    record.wishes = vec![WishItem {
        kind: "love".to_string(),
        description: "meet someone kind".to_string(),
    }];
    record.analysis = Some(CrystalAnalysis {
        zodiac_sign: "Gemini".to_string(),
        element: "wood".to_string(),
        bazi: Bazi {
            year: "壬申".to_string(),
            month: "丙午".to_string(),
            day: "庚子".to_string(),
            time: "庚辰".to_string(),
        },
        five_elements: FiveElements {
            gold: 20.0,
            wood: 30.0,
            water: 10.0,
            fire: 25.0,
            earth: 15.0,
        },
        lucky_element: "water".to_string(),
        suggested_crystals: vec!["moonstone".to_string(), "aquamarine".to_string()],
        reasoning: "water balances a strong fire pillar".to_string(),
        visual_description: "pale blue beads with silver spacers".to_string(),
        color_palette: vec!["#b3d9ff".to_string(), "#c0c0c0".to_string()],
    });
    record
}

/// [`sample_record`] carrying an encoded image of `image_len` bytes.
pub fn record_with_image(id: &str, created_at: i64, image_len: usize) -> CustomerRecord {
    let mut record = sample_record(id, created_at);
    let prefix = "data:image/png;base64,";
    record.generated_image_url = Some(format!(
        "{prefix}{}",
        "A".repeat(image_len.saturating_sub(prefix.len()))
    ));
    record
}

pub fn sample_shipping() -> ShippingDetails {
    ShippingDetails {
        real_name: "Lin Mei".to_string(),
        phone: "0912345678".to_string(),
        store_code: "123456".to_string(),
        store_name: "Xinyi Store".to_string(),
        social_id: "@linmei".to_string(),
        wrist_size: "15".to_string(),
        purification_bag_qty: 1,
        preferred_colors: vec!["blue".to_string()],
        items: None,
        total_quantity: 1,
        coupon_code: None,
        discount_amount: None,
        total_price: 1880.0,
    }
}

/// Secondary tier over an in-memory blob store with the given quota.
pub fn memory_secondary(quota: usize) -> (SecondaryStore, Arc<MemoryBlobStore>) {
    let backend = Arc::new(MemoryBlobStore::new(quota));
    (SecondaryStore::new(backend.clone()), backend)
}
