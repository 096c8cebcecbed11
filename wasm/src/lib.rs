//! WebAssembly module for the Crop Ledger platform
//!
//! Provides client-side computation for:
//! - Lot unit cost
//! - FIFO allocation and profit previews over lots already on the client
//! - Break-even cost
//!
//! Decimal values cross the boundary as strings so no precision is lost to
//! JavaScript numbers.

use std::str::FromStr;

use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;

use shared::{
    break_even, eligible_lots, profit_preview, simulate, sort_fifo, unit_cost_from_parts,
    validate_positive, AllocationPlan, EligibleLot,
};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::log_1(&JsValue::from_str("Crop Ledger WASM module loaded"));
}

// Helpers report errors as plain strings; only the exported functions turn
// them into `JsValue`, which cannot be built off a wasm target.
type CalcResult<T> = Result<T, String>;

fn to_js(message: String) -> JsValue {
    JsValue::from_str(&message)
}

fn parse_decimal(field: &str, value: &str) -> CalcResult<Decimal> {
    Decimal::from_str(value.trim()).map_err(|e| format!("Invalid {}: {}", field, e))
}

/// Parse a sale quantity or price and apply the same rules the server does
fn parse_positive(field: &str, value: &str) -> CalcResult<Decimal> {
    let value = parse_decimal(field, value)?;
    validate_positive(field, value).map_err(|e| e.to_string())?;
    Ok(value)
}

fn parse_lots(lots_json: &str) -> CalcResult<Vec<LotDetail>> {
    serde_json::from_str(lots_json).map_err(|e| format!("Invalid lots JSON: {}", e))
}

fn to_json<T: serde::Serialize>(value: &T) -> CalcResult<String> {
    serde_json::to_string(value).map_err(|e| e.to_string())
}

fn plan_fifo_allocation(lots_json: &str, quantity: &str) -> CalcResult<AllocationPlan> {
    let quantity = parse_positive("quantity", quantity)?;
    let mut lots: Vec<EligibleLot> =
        serde_json::from_str(lots_json).map_err(|e| format!("Invalid lots JSON: {}", e))?;
    sort_fifo(&mut lots);

    Ok(simulate(&lots, quantity))
}

fn plan_sale_profit(
    lots_json: &str,
    crop_id: i64,
    crop_name: &str,
    quantity: &str,
    sell_price: &str,
) -> CalcResult<ProfitPreview> {
    let quantity = parse_positive("quantity", quantity)?;
    let sell_price = parse_positive("sell_price", sell_price)?;

    let lots = parse_lots(lots_json)?;
    let eligible = eligible_lots(&lots, crop_id).map_err(|e| e.to_string())?;

    let plan = simulate(&eligible, quantity);
    Ok(profit_preview(crop_id, crop_name, &plan, sell_price))
}

fn unit_cost_of(
    buy_price_per_uom: &str,
    other_charges: &str,
    total_expenses: &str,
    quantity: &str,
) -> CalcResult<Decimal> {
    unit_cost_from_parts(
        parse_decimal("buy_price_per_uom", buy_price_per_uom)?,
        parse_decimal("other_charges", other_charges)?,
        parse_decimal("total_expenses", total_expenses)?,
        parse_decimal("quantity", quantity)?,
    )
    .ok_or_else(|| "Quantity must not be zero".to_string())
}

/// Unit cost of a lot: buy price plus ancillary costs over the recorded quantity
#[wasm_bindgen]
pub fn calculate_unit_cost(
    buy_price_per_uom: &str,
    other_charges: &str,
    total_expenses: &str,
    quantity: &str,
) -> Result<String, JsValue> {
    unit_cost_of(buy_price_per_uom, other_charges, total_expenses, quantity)
        .map(|cost| cost.to_string())
        .map_err(to_js)
}

/// Split `quantity` across eligible lots oldest first.
///
/// `lots_json` is an array of eligible lots in any order. Returns the
/// allocation plan as JSON, including any shortfall.
#[wasm_bindgen]
pub fn preview_fifo_allocation(lots_json: &str, quantity: &str) -> Result<String, JsValue> {
    plan_fifo_allocation(lots_json, quantity)
        .and_then(|plan| to_json(&plan))
        .map_err(to_js)
}

/// Profit preview for selling `quantity` of a crop at `sell_price`, from
/// fully loaded lot details
#[wasm_bindgen]
pub fn preview_sale_profit(
    lots_json: &str,
    crop_id: i64,
    crop_name: &str,
    quantity: &str,
    sell_price: &str,
) -> Result<String, JsValue> {
    plan_sale_profit(lots_json, crop_id, crop_name, quantity, sell_price)
        .and_then(|preview| to_json(&preview))
        .map_err(to_js)
}

/// Weighted-average cost of a crop's open stock
#[wasm_bindgen]
pub fn calculate_break_even(lots_json: &str, crop_id: i64, crop_name: &str) -> Result<String, JsValue> {
    parse_lots(lots_json)
        .and_then(|lots| break_even(&lots, crop_id, crop_name).map_err(|e| e.to_string()))
        .and_then(|be| to_json(&be))
        .map_err(to_js)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lot_json(id: i64, date: &str, available: &str, cost: &str) -> String {
        format!(
            r#"{{"lot_id":{},"lot_number":"LOT-{}","purchase_date":"{}","available_qty":"{}","unit_cost":"{}"}}"#,
            id, id, date, available, cost
        )
    }

    #[test]
    fn test_calculate_unit_cost() {
        let cost = calculate_unit_cost("10", "50", "150", "100").unwrap();
        assert_eq!(Decimal::from_str(&cost).unwrap(), Decimal::from(12));
    }

    #[test]
    fn test_preview_fifo_allocation_sorts_lots() {
        let lots = format!(
            "[{},{}]",
            lot_json(2, "2024-01-02", "10", "9"),
            lot_json(1, "2024-01-01", "10", "8")
        );

        let plan: AllocationPlan =
            serde_json::from_str(&preview_fifo_allocation(&lots, "15").unwrap()).unwrap();

        assert_eq!(plan.allocations.len(), 2);
        assert_eq!(plan.allocations[0].lot_id, 1);
        assert_eq!(plan.estimated_cost, Decimal::from(125));
        assert_eq!(plan.shortfall_qty, Decimal::ZERO);
    }

    #[test]
    fn test_preview_fifo_allocation_reports_shortfall() {
        let lots = format!("[{}]", lot_json(1, "2024-01-01", "10", "8"));

        let plan: AllocationPlan =
            serde_json::from_str(&preview_fifo_allocation(&lots, "12").unwrap()).unwrap();

        assert_eq!(plan.shortfall_qty, Decimal::from(2));
    }

    #[test]
    fn test_preview_fifo_allocation_rejects_non_positive_quantity() {
        let lots = format!("[{}]", lot_json(1, "2024-01-01", "10", "8"));

        assert!(plan_fifo_allocation(&lots, "0").is_err());
        assert!(plan_fifo_allocation(&lots, "-3").is_err());
        assert!(plan_fifo_allocation(&lots, "0.00001").is_err());
        assert!(plan_fifo_allocation(&lots, "4").is_ok());
    }

    fn lot_details_json() -> String {
        let lot = |id: i64, quantity: i64, price: i64| {
            LotDetail::new(
                PurchaseLot {
                    id,
                    lot_number: format!("LOT-{}", id),
                    crop_id: 1,
                    farmer_id: 1,
                    warehouse_id: 1,
                    unit_of_measure_id: 1,
                    quantity: Decimal::from(quantity),
                    buy_price_per_uom: Decimal::from(price),
                    other_charges: Decimal::ZERO,
                    purchase_date: chrono::NaiveDate::from_ymd_opt(2024, 1, id as u32).unwrap(),
                    notes: None,
                    is_closed: false,
                    created_at: chrono::Utc::now(),
                },
                "Wheat",
                "Ravi",
            )
        };
        serde_json::to_string(&vec![lot(1, 100, 10), lot(2, 50, 16)]).unwrap()
    }

    #[test]
    fn test_preview_sale_profit() {
        let json = preview_sale_profit(&lot_details_json(), 1, "Wheat", "120", "20").unwrap();
        let preview: ProfitPreview = serde_json::from_str(&json).unwrap();

        // 100 @ 10 + 20 @ 16
        assert_eq!(preview.estimated_cost, Decimal::from(1320));
        assert_eq!(preview.estimated_profit, Decimal::from(1080));
    }

    #[test]
    fn test_preview_sale_profit_rejects_non_positive_input() {
        let err = plan_sale_profit(&lot_details_json(), 1, "Wheat", "0", "20").unwrap_err();
        assert!(err.contains("quantity must be positive"));
        assert!(plan_sale_profit(&lot_details_json(), 1, "Wheat", "10", "-1").is_err());
    }

    #[test]
    fn test_calculate_break_even() {
        let json = calculate_break_even(&lot_details_json(), 1, "Wheat").unwrap();
        let be: BreakEven = serde_json::from_str(&json).unwrap();
        assert_eq!(be.weighted_avg_cost_per_uom, Decimal::from(12));
    }
}
