use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptItem {
    pub name: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub sku: Option<String>,
}

/// Store location: either a bare name or an object with a `name` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Location {
    Name(String),
    Detailed { name: String },
}

impl Location {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Detailed { name } => name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CardDetails {
    #[serde(default)]
    pub card_brand: Option<String>,
    #[serde(default)]
    pub card_last4: Option<String>,
    #[serde(default)]
    pub auth_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptData {
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default)]
    pub items: Vec<ReceiptItem>,
    #[serde(default)]
    pub subtotal: f64,
    #[serde(default)]
    pub tax: f64,
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub tip: f64,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub payment_type: String,
    #[serde(default)]
    pub refund_amount: f64,
    #[serde(default)]
    pub discount_amount: f64,
    #[serde(default)]
    pub discount_percentage: f64,
    #[serde(default)]
    pub promo_amount: f64,
    #[serde(default)]
    pub cash_given: f64,
    #[serde(default)]
    pub change_due: f64,
    #[serde(default)]
    pub copies: i32,
    #[serde(default, rename = "type")]
    pub receipt_type: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub terminal_id: Option<String>,
    #[serde(default)]
    pub card_details: Option<CardDetails>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub account_balance_before: f64,
    #[serde(default)]
    pub account_balance_after: f64,
    #[serde(default)]
    pub settlement_amount: f64,
    #[serde(default)]
    pub is_settlement: bool,
    #[serde(default)]
    pub has_combined_transaction: bool,
    #[serde(default)]
    pub skip_tax_calculation: bool,
    #[serde(default)]
    pub has_no_tax: bool,
}

pub const NO_SALE_TYPE: &str = "noSale";

const GST_RATE: f64 = 0.05;
const PST_RATE: f64 = 0.07;

impl ReceiptData {
    pub fn is_no_sale(&self) -> bool {
        self.receipt_type.as_deref() == Some(NO_SALE_TYPE)
    }

    pub fn show_tax_breakdown(&self) -> bool {
        !self.is_settlement && !self.skip_tax_calculation && !self.has_no_tax
    }

    fn location_name(&self) -> Option<&str> {
        self.location
            .as_ref()
            .map(Location::name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

fn esc(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn money(value: f64) -> String {
    format!("${value:.2}")
}

fn qty(value: f64) -> String {
    if (value.round() - value).abs() < f64::EPSILON {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// Capitalize the first letter of each word, like a payment-type label.
fn title(input: &str) -> String {
    input
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn line(body: &mut String, label: &str, value: &str) {
    body.push_str(&format!(
        "<div class=\"line\"><span>{}</span><span>{}</span></div>",
        esc(label),
        esc(value)
    ));
}

fn html_shell(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8"/>
<title>{}</title>
<style>
body {{ font-family: 'Courier New', monospace; font-size: 12px; width: 80mm; margin: 0; padding: 10px; }}
.header {{ text-align: center; margin-bottom: 10px; }}
.line {{ display: flex; justify-content: space-between; gap: 8px; }}
.item {{ margin-bottom: 5px; }}
.divider {{ border-top: 1px dashed #000; margin: 10px 0; }}
.total {{ font-weight: bold; margin-top: 10px; }}
.indent {{ margin-left: 10px; }}
.footer {{ text-align: center; margin-top: 20px; }}
.bold {{ font-weight: bold; }}
</style>
</head>
<body>{}</body>
</html>"#,
        esc(title),
        body
    )
}

/// Render a receipt as a self-contained HTML page.
///
/// `now` fills the no-sale timestamp when the request carries none.
pub fn render_html(receipt: &ReceiptData, now: &str) -> String {
    if receipt.is_no_sale() {
        let mut body = String::from("<div class=\"header bold\"><div style=\"font-size: 16px;\">NO SALE</div>");
        let stamp = non_empty(receipt.timestamp.as_deref()).unwrap_or(now);
        body.push_str(&format!("<div>{}</div>", esc(stamp)));
        if let Some(location) = receipt.location_name() {
            body.push_str(&format!("<div>{}</div>", esc(location)));
        }
        body.push_str("</div>");
        return html_shell("No Sale", &body);
    }

    let mut body = String::from("<div class=\"header\">");
    if let Some(location) = receipt.location_name() {
        body.push_str(&format!("<div class=\"bold\">{}</div>", esc(location)));
    }
    if let Some(customer) = non_empty(receipt.customer_name.as_deref()) {
        body.push_str(&format!("<div>Customer: {}</div>", esc(customer)));
    }
    body.push_str(&format!("<div>{}</div></div>", esc(&receipt.date)));

    body.push_str(&format!(
        "<div>Transaction ID: {}</div><div>Payment: {}</div>",
        esc(&receipt.transaction_id),
        esc(&title(&receipt.payment_type))
    ));

    body.push_str("<div class=\"bold\" style=\"margin-top: 10px;\">ITEMS</div><div class=\"divider\"></div>");
    for item in &receipt.items {
        body.push_str(&format!("<div class=\"item\"><div>{}</div>", esc(&item.name)));
        line(
            &mut body,
            &format!("{} x {}", qty(item.quantity), money(item.price)),
            &money(item.quantity * item.price),
        );
        if let Some(sku) = non_empty(item.sku.as_deref()) {
            body.push_str(&format!("<div>SKU: {}</div>", esc(sku)));
        }
        body.push_str("</div>");
    }
    body.push_str("<div class=\"divider\"></div>");

    line(&mut body, "Subtotal:", &money(receipt.subtotal));
    if receipt.discount_percentage > 0.0 && receipt.discount_amount > 0.0 {
        line(
            &mut body,
            &format!("Discount ({:.0}%):", receipt.discount_percentage),
            &format!("-{}", money(receipt.discount_amount)),
        );
    }
    if receipt.promo_amount > 0.0 {
        line(
            &mut body,
            "Promo Discount:",
            &format!("-{}", money(receipt.promo_amount)),
        );
    }
    line(&mut body, "Tax:", &money(receipt.tax));
    if receipt.show_tax_breakdown() {
        body.push_str("<div class=\"indent\">");
        line(&mut body, "GST (5%):", &money(receipt.subtotal * GST_RATE));
        line(&mut body, "PST (7%):", &money(receipt.subtotal * PST_RATE));
        body.push_str("</div>");
    }
    if receipt.tip > 0.0 {
        line(&mut body, "Tip:", &money(receipt.tip));
    }
    if receipt.settlement_amount > 0.0 {
        line(
            &mut body,
            "Account Settlement:",
            &money(receipt.settlement_amount),
        );
    }
    if receipt.refund_amount > 0.0 {
        line(
            &mut body,
            "Refund:",
            &format!("-{}", money(receipt.refund_amount)),
        );
    }
    body.push_str(&format!(
        "<div class=\"line total\"><span>TOTAL:</span><span>{}</span></div>",
        money(receipt.total)
    ));

    if receipt.payment_type == "cash" && receipt.cash_given > 0.0 {
        line(&mut body, "Cash:", &money(receipt.cash_given));
        line(&mut body, "Change:", &money(receipt.change_due));
    }

    body.push_str("<div class=\"divider\"></div><div><div class=\"bold\">Payment Details</div>");
    line(&mut body, "Payment Method:", &title(&receipt.payment_type));
    if receipt.payment_type.contains("credit") || receipt.payment_type.contains("debit") {
        let card = receipt.card_details.clone().unwrap_or_default();
        let mut label = non_empty(card.card_brand.as_deref())
            .map(title)
            .unwrap_or_else(|| "Card".to_string());
        if let Some(last4) = non_empty(card.card_last4.as_deref()) {
            label.push_str(&format!(" **** {last4}"));
        }
        line(&mut body, "Card:", &label);
        if let Some(auth) = non_empty(card.auth_code.as_deref()) {
            line(&mut body, "Auth Code:", auth);
        }
        if let Some(terminal) = non_empty(receipt.terminal_id.as_deref()) {
            line(&mut body, "Terminal ID:", terminal);
        }
    }
    body.push_str("</div>");

    if let Some(account) = non_empty(receipt.account_id.as_deref()) {
        body.push_str("<div style=\"margin-top: 10px;\"><div class=\"bold\">Account Information</div>");
        line(&mut body, "Account ID:", account);
        if receipt.is_settlement || receipt.has_combined_transaction {
            line(
                &mut body,
                "Previous Balance:",
                &money(receipt.account_balance_before),
            );
            line(&mut body, "New Balance:", &money(receipt.account_balance_after));
        }
        body.push_str("</div>");
    }

    body.push_str("<div class=\"footer\"><div>Thank you for your purchase!</div>");
    if let Some(location) = receipt.location_name() {
        body.push_str(&format!("<div>Visit us again at {}</div>", esc(location)));
    }
    body.push_str("</div>");

    html_shell(&format!("Receipt {}", receipt.transaction_id), &body)
}
