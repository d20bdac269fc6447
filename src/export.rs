//! CSV export of list views.

use std::path::Path;

use crate::api::resources::{Order, OrderItem};

pub const ORDER_HEADERS: [&str; 5] = ["User", "Items", "Total", "Status", "Created"];

fn escape(value: &str) -> String {
    if value.contains(['"', ',', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render a header row and data rows. Lines are joined with `\n`, with no trailing newline.
pub fn to_csv<R, C>(headers: &[&str], rows: R) -> String
where
    R: IntoIterator,
    R::Item: IntoIterator<Item = C>,
    C: AsRef<str>,
{
    let header = headers.iter().map(|h| escape(h)).collect::<Vec<_>>().join(",");
    let body = rows.into_iter().map(|row| {
        row.into_iter()
            .map(|cell| escape(cell.as_ref()))
            .collect::<Vec<_>>()
            .join(",")
    });
    std::iter::once(header)
        .chain(body)
        .collect::<Vec<_>>()
        .join("\n")
}

fn item_line(item: &OrderItem) -> String {
    let unit = item
        .unit_label
        .as_deref()
        .filter(|u| !u.is_empty())
        .map(|u| format!(" ({u})"))
        .unwrap_or_default();
    format!("{}{unit} x{} @ {}", item.title(), item.quantity, item.price)
}

/// One row per order, with times in UTC.
pub fn order_rows(orders: &[Order]) -> Vec<[String; 5]> {
    orders
        .iter()
        .map(|order| {
            [
                order.customer().to_string(),
                order
                    .items
                    .iter()
                    .map(item_line)
                    .collect::<Vec<_>>()
                    .join(" | "),
                order.total_price.to_string(),
                order.status.to_string(),
                order
                    .created_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default(),
            ]
        })
        .collect()
}

pub fn orders_csv(orders: &[Order]) -> String {
    to_csv(&ORDER_HEADERS, order_rows(orders))
}

pub async fn write_csv(path: impl AsRef<Path>, contents: &str) -> std::io::Result<()> {
    let path = path.as_ref();
    tokio::fs::write(path, contents).await?;
    tracing::info!(path = %path.display(), bytes = contents.len(), "Wrote CSV export");
    Ok(())
}
