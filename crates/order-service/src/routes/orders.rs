//! Order creation endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use broker::Producer;
use common::Money;
use events::{LineItem, OrderCreated};
use serde::Deserialize;

use crate::error::{ApiError, ValidationError};
use crate::intake::{NewOrder, OrderIntake};

// -- Request types --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer_id: Option<String>,
    pub items: Option<Vec<LineItemRequest>>,
    pub total_amount: Option<Money>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRequest {
    pub product_id: String,
    pub name: String,
    #[serde(alias = "unitPrice")]
    pub price: Money,
    pub quantity: u32,
    pub subtotal: Option<Money>,
}

impl CreateOrderRequest {
    /// Checks required fields and builds the order to place.
    pub fn validate(self) -> Result<NewOrder, ValidationError> {
        let customer_id = self
            .customer_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(ValidationError::MissingCustomerId)?;

        let items = self
            .items
            .filter(|items| !items.is_empty())
            .ok_or(ValidationError::MissingItems)?;

        let total_amount = self
            .total_amount
            .filter(|total| !total.is_zero())
            .ok_or(ValidationError::MissingTotal)?;

        let items = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                if item.quantity == 0 {
                    return Err(ValidationError::InvalidQuantity { index });
                }
                match item.subtotal {
                    Some(subtotal) => Ok(LineItem::with_subtotal(
                        item.product_id,
                        item.name,
                        item.price,
                        item.quantity,
                        subtotal,
                    )),
                    None => LineItem::new(item.product_id, item.name, item.price, item.quantity)
                        .ok_or(ValidationError::SubtotalOverflow { index }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(NewOrder {
            customer_id,
            items,
            total_amount,
        })
    }
}

// -- Handlers --

/// POST /api/orders: accept an order and request its payment.
#[tracing::instrument(skip(intake, body))]
pub async fn create<P: Producer>(
    State(intake): State<Arc<OrderIntake<P>>>,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderCreated>), ApiError> {
    if !intake.is_ready().await {
        return Err(ApiError::Unavailable);
    }

    let Json(request) = body?;
    let order = request.validate()?;
    let order = intake.place(order).await?;

    Ok((StatusCode::ACCEPTED, Json(order)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: serde_json::Value) -> CreateOrderRequest {
        serde_json::from_value(json).unwrap()
    }

    fn widget_order() -> serde_json::Value {
        serde_json::json!({
            "customerId": "c1",
            "items": [{
                "productId": "p1",
                "name": "Widget",
                "price": 10,
                "quantity": 2,
                "subtotal": 20
            }],
            "totalAmount": 20
        })
    }

    #[test]
    fn test_valid_request() {
        let order = request(widget_order()).validate().unwrap();
        assert_eq!(order.customer_id, "c1");
        assert_eq!(order.total_amount, Money::from_major(20));
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].unit_price, Money::from_major(10));
        assert_eq!(order.items[0].subtotal, Money::from_major(20));
    }

    #[test]
    fn test_subtotal_defaults_to_price_times_quantity() {
        let mut json = widget_order();
        json["items"][0]
            .as_object_mut()
            .unwrap()
            .remove("subtotal");
        json["items"][0]["quantity"] = 3.into();

        let order = request(json).validate().unwrap();
        assert_eq!(order.items[0].subtotal, Money::from_major(30));
    }

    #[test]
    fn test_unit_price_alias() {
        let mut json = widget_order();
        let item = json["items"][0].as_object_mut().unwrap();
        let price = item.remove("price").unwrap();
        item.insert("unitPrice".to_string(), price);

        assert!(request(json).validate().is_ok());
    }

    #[test]
    fn test_missing_fields() {
        let mut json = widget_order();
        json.as_object_mut().unwrap().remove("customerId");
        assert_eq!(
            request(json).validate().unwrap_err(),
            ValidationError::MissingCustomerId
        );

        let mut json = widget_order();
        json["customerId"] = "  ".into();
        assert_eq!(
            request(json).validate().unwrap_err(),
            ValidationError::MissingCustomerId
        );

        let mut json = widget_order();
        json["items"] = serde_json::json!([]);
        assert_eq!(
            request(json).validate().unwrap_err(),
            ValidationError::MissingItems
        );

        let mut json = widget_order();
        json.as_object_mut().unwrap().remove("totalAmount");
        assert_eq!(
            request(json).validate().unwrap_err(),
            ValidationError::MissingTotal
        );

        let mut json = widget_order();
        json["totalAmount"] = 0.into();
        assert_eq!(
            request(json).validate().unwrap_err(),
            ValidationError::MissingTotal
        );
    }

    #[test]
    fn test_overflowing_subtotal_is_rejected() {
        let mut json = widget_order();
        let item = json["items"][0].as_object_mut().unwrap();
        item.remove("subtotal");
        item.insert("price".to_string(), 10_000_000_000_i64.into());
        item.insert("quantity".to_string(), 4_000_000_000_u32.into());

        assert_eq!(
            request(json).validate().unwrap_err(),
            ValidationError::SubtotalOverflow { index: 0 }
        );
    }

    #[test]
    fn test_supplied_subtotal_skips_multiplication() {
        let mut json = widget_order();
        json["items"][0]["price"] = 10_000_000_000_i64.into();
        json["items"][0]["quantity"] = 4_000_000_000_u32.into();
        json["items"][0]["subtotal"] = 20.into();

        let order = request(json).validate().unwrap();
        assert_eq!(order.items[0].subtotal, Money::from_major(20));
    }

    #[test]
    fn test_zero_quantity() {
        let mut json = widget_order();
        json["items"][0]["quantity"] = 0.into();
        assert_eq!(
            request(json).validate().unwrap_err(),
            ValidationError::InvalidQuantity { index: 0 }
        );
    }

    #[test]
    fn test_items_must_be_an_array() {
        let mut json = widget_order();
        json["items"] = "Widget".into();
        assert!(serde_json::from_value::<CreateOrderRequest>(json).is_err());
    }
}
