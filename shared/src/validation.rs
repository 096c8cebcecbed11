//! Validation utilities for the Crop Ledger platform
//!
//! Requests are checked here before any stock is read or allocated. String
//! length limits are declared on the request types with `validator`; the
//! decimal and identity rules live in the functions below.

use rust_decimal::Decimal;
use validator::Validate;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    CreateLotAdjustmentRequest, CreateLotExpenseRequest, CreateLotTestRequest,
    CreatePaymentRequest, CreatePriceQuoteRequest, CreatePurchaseLotRequest,
    CreateSaleExpenseRequest, CreateSaleRequest,
};
use crate::types::{EntityId, DECIMAL_SCALE};

// ============================================================================
// Field Rules
// ============================================================================

/// Value must fit in the stored scale. Trailing zeros do not count.
pub fn validate_scale(field: &str, value: Decimal) -> LedgerResult<()> {
    if value.normalize().scale() > DECIMAL_SCALE {
        return Err(LedgerError::validation(
            field,
            format!("{} cannot have more than {} decimal places", field, DECIMAL_SCALE),
        ));
    }
    Ok(())
}

/// Value must be strictly greater than zero and fit the stored scale
pub fn validate_positive(field: &str, value: Decimal) -> LedgerResult<()> {
    if value <= Decimal::ZERO {
        return Err(LedgerError::validation(field, format!("{} must be positive", field)));
    }
    validate_scale(field, value)
}

/// Value must be zero or greater and fit the stored scale
pub fn validate_non_negative(field: &str, value: Decimal) -> LedgerResult<()> {
    if value < Decimal::ZERO {
        return Err(LedgerError::validation(field, format!("{} cannot be negative", field)));
    }
    validate_scale(field, value)
}

/// Reference ids are database identities and always positive
pub fn validate_reference(field: &str, id: EntityId) -> LedgerResult<()> {
    if id <= 0 {
        return Err(LedgerError::validation(field, format!("{} must reference an existing record", field)));
    }
    Ok(())
}

/// Text must contain something other than whitespace
pub fn validate_required_text(field: &str, value: &str) -> LedgerResult<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::validation(field, format!("{} is required", field)));
    }
    Ok(())
}

/// Run the declarative `validator` rules and report the first failing field
pub fn validate_request<T: Validate>(request: &T) -> LedgerResult<()> {
    let errors = match request.validate() {
        Ok(()) => return Ok(()),
        Err(errors) => errors,
    };

    let field_errors = errors.field_errors();
    let first = field_errors.into_iter().min_by_key(|(field, _)| *field);

    match first.and_then(|(field, errs)| errs.first().map(|e| (field, e))) {
        Some((field, error)) => {
            let message = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("{} failed the {} rule", field, error.code));
            Err(LedgerError::validation(field, message))
        }
        None => Err(LedgerError::validation("request", errors.to_string())),
    }
}

// ============================================================================
// Purchase Lot Requests
// ============================================================================

pub fn validate_create_purchase(request: &CreatePurchaseLotRequest) -> LedgerResult<()> {
    validate_request(request)?;
    validate_reference("crop_id", request.crop_id)?;
    validate_reference("farmer_id", request.farmer_id)?;
    validate_reference("warehouse_id", request.warehouse_id)?;
    validate_reference("unit_of_measure_id", request.unit_of_measure_id)?;
    validate_positive("quantity", request.quantity)?;
    validate_non_negative("buy_price_per_uom", request.buy_price_per_uom)?;
    validate_non_negative("other_charges", request.other_charges)
}

pub fn validate_lot_expense(request: &CreateLotExpenseRequest) -> LedgerResult<()> {
    validate_request(request)?;
    validate_required_text("description", &request.description)?;
    validate_positive("amount", request.amount)
}

pub fn validate_lot_test(request: &CreateLotTestRequest) -> LedgerResult<()> {
    validate_request(request)?;
    validate_required_text("test_name", &request.test_name)
}

pub fn validate_lot_adjustment(request: &CreateLotAdjustmentRequest) -> LedgerResult<()> {
    validate_request(request)?;
    if request.qty_delta.is_zero() {
        return Err(LedgerError::validation("qty_delta", "Adjustment quantity cannot be zero"));
    }
    validate_scale("qty_delta", request.qty_delta)?;
    validate_required_text("reason", &request.reason)
}

// ============================================================================
// Sale Requests
// ============================================================================

pub fn validate_create_sale(request: &CreateSaleRequest) -> LedgerResult<()> {
    validate_request(request)?;
    validate_reference("crop_id", request.crop_id)?;
    validate_reference("trader_id", request.trader_id)?;
    validate_positive("quantity", request.quantity)?;
    validate_positive("sell_price_per_uom", request.sell_price_per_uom)
}

pub fn validate_profit_preview(crop_id: EntityId, qty: Decimal, sell_price: Decimal) -> LedgerResult<()> {
    validate_reference("crop_id", crop_id)?;
    validate_positive("qty", qty)?;
    validate_positive("sell_price", sell_price)
}

pub fn validate_sale_expense(request: &CreateSaleExpenseRequest) -> LedgerResult<()> {
    validate_request(request)?;
    validate_required_text("description", &request.description)?;
    validate_positive("amount", request.amount)
}

pub fn validate_payment(request: &CreatePaymentRequest) -> LedgerResult<()> {
    validate_request(request)?;
    validate_positive("amount", request.amount)
}

// ============================================================================
// Price Quotes
// ============================================================================

pub fn validate_price_quote(request: &CreatePriceQuoteRequest) -> LedgerResult<()> {
    validate_request(request)?;
    validate_reference("crop_id", request.crop_id)?;
    validate_reference("trader_id", request.trader_id)?;
    validate_positive("price_per_uom", request.price_per_uom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn purchase() -> CreatePurchaseLotRequest {
        CreatePurchaseLotRequest {
            crop_id: 1,
            farmer_id: 2,
            warehouse_id: 3,
            unit_of_measure_id: 4,
            quantity: dec("100"),
            buy_price_per_uom: dec("12.5"),
            other_charges: Decimal::ZERO,
            purchase_date: today(),
            notes: None,
        }
    }

    fn sale() -> CreateSaleRequest {
        CreateSaleRequest {
            crop_id: 1,
            trader_id: 9,
            quantity: dec("15"),
            sell_price_per_uom: dec("20"),
            sale_date: today(),
            notes: Some("Truck 4".into()),
        }
    }

    fn field_of(result: LedgerResult<()>) -> String {
        match result {
            Err(LedgerError::Validation { field, .. }) => field,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_create_purchase_valid() {
        assert!(validate_create_purchase(&purchase()).is_ok());
    }

    #[test]
    fn test_validate_create_purchase_zero_buy_price_allowed() {
        let mut req = purchase();
        req.buy_price_per_uom = Decimal::ZERO;
        assert!(validate_create_purchase(&req).is_ok());
    }

    #[test]
    fn test_validate_create_purchase_invalid() {
        let mut req = purchase();
        req.quantity = Decimal::ZERO;
        assert_eq!(field_of(validate_create_purchase(&req)), "quantity");

        let mut req = purchase();
        req.other_charges = dec("-1");
        assert_eq!(field_of(validate_create_purchase(&req)), "other_charges");

        let mut req = purchase();
        req.farmer_id = 0;
        assert_eq!(field_of(validate_create_purchase(&req)), "farmer_id");
    }

    #[test]
    fn test_validate_lot_expense() {
        let mut req = CreateLotExpenseRequest {
            description: "Fumigation".into(),
            amount: dec("250"),
            expense_date: today(),
        };
        assert!(validate_lot_expense(&req).is_ok());

        req.amount = Decimal::ZERO;
        assert_eq!(field_of(validate_lot_expense(&req)), "amount");

        req.amount = dec("1");
        req.description = "   ".into();
        assert_eq!(field_of(validate_lot_expense(&req)), "description");

        req.description = "x".repeat(201);
        assert_eq!(field_of(validate_lot_expense(&req)), "description");
    }

    #[test]
    fn test_validate_lot_test_name_required() {
        let req = CreateLotTestRequest {
            test_name: String::new(),
            result: Some("12% moisture".into()),
            notes: None,
            test_date: today(),
        };
        assert_eq!(field_of(validate_lot_test(&req)), "test_name");
    }

    #[test]
    fn test_validate_lot_adjustment() {
        let mut req = CreateLotAdjustmentRequest {
            qty_delta: dec("-2.5"),
            reason: "Rodent damage".into(),
            adjustment_date: today(),
        };
        assert!(validate_lot_adjustment(&req).is_ok());

        req.qty_delta = Decimal::ZERO;
        assert_eq!(field_of(validate_lot_adjustment(&req)), "qty_delta");

        req.qty_delta = dec("3");
        req.reason = String::new();
        assert_eq!(field_of(validate_lot_adjustment(&req)), "reason");
    }

    #[test]
    fn test_validate_create_sale() {
        assert!(validate_create_sale(&sale()).is_ok());

        let mut req = sale();
        req.sell_price_per_uom = Decimal::ZERO;
        assert_eq!(field_of(validate_create_sale(&req)), "sell_price_per_uom");

        let mut req = sale();
        req.quantity = dec("-5");
        assert_eq!(field_of(validate_create_sale(&req)), "quantity");
    }

    #[test]
    fn test_validate_scale_limits_decimal_places() {
        assert!(validate_scale("quantity", dec("10.0001")).is_ok());
        // Trailing zeros are not significant
        assert!(validate_scale("quantity", dec("10.000100")).is_ok());
        assert_eq!(field_of(validate_scale("quantity", dec("10.00004"))), "quantity");
    }

    /// A quantity that would round to zero in storage is rejected up front
    #[test]
    fn test_validate_create_sale_rejects_excess_scale() {
        let mut req = sale();
        req.quantity = dec("0.00001");
        assert_eq!(field_of(validate_create_sale(&req)), "quantity");

        let mut req = sale();
        req.quantity = dec("10.00004");
        assert_eq!(field_of(validate_create_sale(&req)), "quantity");

        let mut req = purchase();
        req.buy_price_per_uom = dec("12.34567");
        assert_eq!(field_of(validate_create_purchase(&req)), "buy_price_per_uom");

        let req = CreateLotAdjustmentRequest {
            qty_delta: dec("-0.00005"),
            reason: "Recount".into(),
            adjustment_date: today(),
        };
        assert_eq!(field_of(validate_lot_adjustment(&req)), "qty_delta");
    }

    #[test]
    fn test_validate_profit_preview() {
        assert!(validate_profit_preview(1, dec("10"), dec("20")).is_ok());
        assert_eq!(field_of(validate_profit_preview(1, Decimal::ZERO, dec("20"))), "qty");
        assert_eq!(field_of(validate_profit_preview(1, dec("10"), Decimal::ZERO)), "sell_price");
    }

    #[test]
    fn test_validate_payment_method_length() {
        let mut req = CreatePaymentRequest {
            amount: dec("300"),
            payment_date: today(),
            payment_method: Some("Bank transfer".into()),
            reference_number: None,
            notes: None,
        };
        assert!(validate_payment(&req).is_ok());

        req.payment_method = Some("x".repeat(51));
        assert_eq!(field_of(validate_payment(&req)), "payment_method");
    }

    #[test]
    fn test_validate_price_quote() {
        let mut req = CreatePriceQuoteRequest {
            crop_id: 1,
            trader_id: 9,
            price_per_uom: dec("2150.50"),
            quote_date: today(),
            notes: None,
        };
        assert!(validate_price_quote(&req).is_ok());

        req.price_per_uom = Decimal::ZERO;
        assert_eq!(field_of(validate_price_quote(&req)), "price_per_uom");

        req.price_per_uom = dec("10");
        req.trader_id = 0;
        assert_eq!(field_of(validate_price_quote(&req)), "trader_id");

        req.trader_id = 9;
        req.notes = Some("x".repeat(1001));
        assert_eq!(field_of(validate_price_quote(&req)), "notes");
    }
}
