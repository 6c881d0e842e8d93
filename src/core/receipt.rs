//! Receipt layouts
//! Turns sale data into ESC/POS bytes using the encoder.

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::core::escpos::{format_currency, truncate_text, Align, EscPosEncoder, CHARS_PER_LINE};

/// Room left for the title once the quantity and price columns are placed
const ITEM_TITLE_WIDTH: usize = CHARS_PER_LINE - 12;

/// One sold line on a receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub title: String,
    pub quantity: u32,
    pub unit_price: f64,
    /// Offer discount applied to this line, in percent
    #[serde(default)]
    pub discount_percentage: Option<f64>,
}

impl LineItem {
    pub fn line_total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }

    /// Discount amount for this line, zero when no offer applies
    pub fn discount(&self) -> f64 {
        match self.discount_percentage {
            Some(pct) if pct > 0.0 => self.line_total() * pct / 100.0,
            _ => 0.0,
        }
    }
}

/// A sale as printed on paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaleReceipt {
    /// First centered line, printed bold
    pub header: String,
    pub subheader: Option<String>,
    pub invoice_number: Option<String>,
    /// Already formatted, see [`format_receipt_date`]
    pub date: String,
    pub items: Vec<LineItem>,
    /// Discount on top of the per-item offers
    pub extra_discount: f64,
    /// Marks a copy printed from sales history
    pub reprint: bool,
    /// Centered lines after the total
    pub footer: Vec<String>,
}

impl Default for SaleReceipt {
    fn default() -> Self {
        Self {
            header: "YSS Pondy".to_string(),
            subheader: None,
            invoice_number: None,
            date: String::new(),
            items: Vec::new(),
            extra_discount: 0.0,
            reprint: false,
            footer: vec!["Thank you!".to_string()],
        }
    }
}

impl SaleReceipt {
    pub fn subtotal(&self) -> f64 {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Offer discounts plus the extra discount
    pub fn total_discount(&self) -> f64 {
        self.items.iter().map(LineItem::discount).sum::<f64>() + self.extra_discount.max(0.0)
    }

    pub fn total(&self) -> f64 {
        (self.subtotal() - self.total_discount()).max(0.0)
    }

    /// Encode the receipt, ending with a full cut
    pub fn render(&self) -> Vec<u8> {
        let mut encoder = EscPosEncoder::new();
        encoder
            .init()
            .align(Align::Center)
            .bold(true)
            .line(&self.header)
            .bold(false);

        if let Some(subheader) = &self.subheader {
            encoder.line(subheader);
        }
        if let Some(invoice) = &self.invoice_number {
            encoder.line(&format!("Invoice #{invoice}"));
        }
        if self.reprint {
            encoder.line("(REPRINT)");
        }

        encoder
            .line("")
            .align(Align::Left)
            .line(&self.date)
            .separator('=');

        for item in &self.items {
            let name = truncate_text(&item.title, ITEM_TITLE_WIDTH);
            let price = format_currency(item.line_total());
            encoder.left_right(&format!("{name} x{}", item.quantity), &price);

            let discount = item.discount();
            if let (true, Some(pct)) = (discount > 0.0, item.discount_percentage) {
                encoder.left_right(
                    &format!("  {}% off", format_percentage(pct)),
                    &format!("-{}", format_currency(discount)),
                );
            }
        }

        encoder
            .separator('-')
            .left_right("Subtotal:", &format_currency(self.subtotal()));

        let discount = self.total_discount();
        if discount > 0.0 {
            encoder.left_right("Discount:", &format!("-{}", format_currency(discount)));
        }

        encoder
            .separator('=')
            .bold(true)
            .left_right("TOTAL:", &format_currency(self.total()))
            .bold(false)
            .line("")
            .align(Align::Center);

        for line in &self.footer {
            encoder.line(line);
        }

        encoder.feed(3).cut().encode()
    }
}

/// Short page proving the link and the paper path work
pub fn test_page(shop: &str, timestamp: &str) -> Vec<u8> {
    EscPosEncoder::new()
        .init()
        .align(Align::Center)
        .bold(true)
        .line(shop)
        .bold(false)
        .line("Test Print")
        .separator('=')
        .align(Align::Left)
        .line("")
        .line("Printer is working!")
        .line(timestamp)
        .separator('-')
        .align(Align::Center)
        .line("Jai Guru")
        .feed(3)
        .cut()
        .encode()
}

/// Date line as printed on receipts, e.g. `05 Mar 2025, 02:30 PM`
pub fn format_receipt_date<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format("%d %b %Y, %I:%M %p").to_string()
}

/// `10` for whole percentages, `12.5` otherwise
fn format_percentage(pct: f64) -> String {
    if pct.fract() == 0.0 {
        format!("{pct:.0}")
    } else {
        pct.to_string()
    }
}
