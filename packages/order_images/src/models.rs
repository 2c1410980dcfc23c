use serde::Deserialize;

/// A single delivery record as exported by the order scraper
#[derive(Deserialize, Debug, Clone)]
pub struct Order {
    /// Delivery timestamp, kept as text and only used to name the photo file
    #[serde(rename = "dateTime")]
    pub date_time: String,
    /// Optional URL of the photo taken at delivery
    #[serde(rename = "deliveryPhotoUrl", alias = "delivery_photo_url", default)]
    pub delivery_photo_url: Option<String>,
    /// Product lines of this order
    #[serde(default)]
    pub items: Vec<Item>,
}

/// Product line within an order
#[derive(Deserialize, Debug, Clone)]
pub struct Item {
    /// Human-readable product name
    #[serde(default)]
    pub name: Option<String>,
    /// Optional URL of the product thumbnail
    #[serde(rename = "thumbnailUrl", alias = "thumbnail_url", alias = "thumbail_url", default)]
    pub thumbnail_url: Option<String>,
}

impl Order {
    /// Delivery photo URL, treating blank strings as absent
    pub fn delivery_photo(&self) -> Option<&str> {
        present(self.delivery_photo_url.as_deref())
    }
}

impl Item {
    /// Thumbnail URL, treating blank strings as absent
    pub fn thumbnail(&self) -> Option<&str> {
        present(self.thumbnail_url.as_deref())
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_camel_case_order() {
        let json = r#"{
            "dateTime": "2024-01-30 18:23",
            "url": "https://www.instacart.ca/store/orders/1",
            "total": "$42.10",
            "deliveryPhotoUrl": "https://cdn.example.com/photo.jpg",
            "items": [
                {"name": "Milk", "quantity": "1", "unitPrice": "$4.99", "thumbnailUrl": "https://cdn.example.com/t/milk.png"},
                {"name": "Bread", "thumbnailUrl": null}
            ]
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();

        assert_eq!(order.date_time, "2024-01-30 18:23");
        assert_eq!(order.delivery_photo(), Some("https://cdn.example.com/photo.jpg"));
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[0].name.as_deref(), Some("Milk"));
        assert_eq!(order.items[0].thumbnail(), Some("https://cdn.example.com/t/milk.png"));
        assert!(order.items[1].thumbnail().is_none());
    }

    #[test]
    fn test_deserialize_scraper_output_keys() {
        let json = r#"{
            "dateTime": "2024-01-30 18:23",
            "url": "https://www.instacart.ca/store/orders/1",
            "delivery_photo_url": "https://cdn.example.com/orderdeliveryphoto/1.jpg",
            "items": [
                {"name": "Milk", "unitPrice": "4.99", "unitDescription": "2 L", "quantity": "1",
                 "thumbail_url": "https://cdn.example.com/t/milk.png"}
            ]
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();

        assert_eq!(
            order.delivery_photo(),
            Some("https://cdn.example.com/orderdeliveryphoto/1.jpg")
        );
        assert_eq!(order.items[0].thumbnail(), Some("https://cdn.example.com/t/milk.png"));
    }

    #[test]
    fn test_missing_optional_fields() {
        let order: Order = serde_json::from_str(r#"{"dateTime": "2024-01-01 10:00"}"#).unwrap();

        assert!(order.delivery_photo().is_none());
        assert!(order.items.is_empty());
    }

    #[test]
    fn test_blank_url_is_absent() {
        let order: Order =
            serde_json::from_str(r#"{"dateTime": "x", "deliveryPhotoUrl": "  ", "items": [{"thumbnailUrl": ""}]}"#)
                .unwrap();

        assert!(order.delivery_photo().is_none());
        assert!(order.items[0].thumbnail().is_none());
    }
}
