use anyhow::{bail, Context};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sakkat_admin::{
    api::resources::{
        categories::ListCategoriesParams, coupons::ListCouponsParams, OrderStatus, OrdersQuery,
    },
    config::Config,
    export, AppState,
};

const USAGE: &str = "\
Usage: sakkat-admin <command> [args]

Commands:
  analytics                        Dashboard totals
  orders [status]                  Most recent orders, optionally filtered by status
  orders-csv <file>                Export the most recent orders to a CSV file
  set-order-status <id> <status>   Change an order's status
  categories                       List categories
  add-category <name>              Create a category
  coupons                          List coupons
  audit-logs [page]                Show a page of the audit log
  delivery                         Show delivery settings
  homepage-videos                  List homepage videos
  help                             Show this message

Environment:
  ADMIN_API_BASE_URL, ADMIN_EMAIL, ADMIN_PASSWORD, REQUEST_TIMEOUT_SECS, LOG_FORMAT, RUST_LOG";

const ORDER_PAGE_SIZE: u32 = 20;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        println!("{USAGE}");
        return Ok(());
    };
    if matches!(command, "help" | "-h" | "--help") {
        println!("{USAGE}");
        return Ok(());
    }

    info!(version = env!("CARGO_PKG_VERSION"), command, "sakkat-admin starting");

    // Load configuration
    let config = Config::load()?;
    info!(base_url = %config.api.base_url, "Loaded configuration");

    let state = AppState::new(config)?;

    if let Err(e) = run(&state, command, &args[1..]).await {
        tracing::debug!(error = ?e, "Command failed");
        eprintln!("{e}");
        std::process::exit(1);
    }
    Ok(())
}

async fn sign_in(state: &AppState) -> anyhow::Result<()> {
    let credentials = state
        .config
        .credentials
        .as_ref()
        .context("ADMIN_EMAIL and ADMIN_PASSWORD must be set")?;
    let login = state
        .client
        .auth()
        .login(&credentials.email, &credentials.password)
        .await?;
    let who = login
        .user
        .as_ref()
        .map(|u| u.email.clone())
        .unwrap_or_else(|| credentials.email.clone());
    info!(admin = %who, "Signed in");
    Ok(())
}

async fn run(state: &AppState, command: &str, args: &[String]) -> anyhow::Result<()> {
    let client = &state.client;
    let cancel = CancellationToken::new();
    let arg = |i: usize| args.get(i).map(String::as_str);

    // Reject unknown commands before touching the network
    const KNOWN: [&str; 10] = [
        "analytics",
        "orders",
        "orders-csv",
        "set-order-status",
        "categories",
        "add-category",
        "coupons",
        "audit-logs",
        "delivery",
        "homepage-videos",
    ];
    if !KNOWN.contains(&command) {
        bail!("unknown command '{command}'\n\n{USAGE}");
    }

    sign_in(state).await?;

    match command {
        "analytics" => {
            let totals = client.analytics().get(&cancel).await?;
            println!("Users:    {}", totals.total_users);
            println!("Orders:   {}", totals.total_orders);
            println!("Products: {}", totals.total_products);
            println!("Sales:    Rs {:.2}", totals.total_sales);
        }
        "orders" => {
            let status = arg(0).map(str::parse::<OrderStatus>).transpose()?;
            let query = recent_orders(status);
            let page = client.orders().list(&query, &cancel).await?;
            for order in &page.data {
                println!(
                    "{}  {:<10} Rs {:>9.2}  {}",
                    order.id,
                    order.status,
                    order.total_price,
                    order.customer()
                );
            }
            println!("page {} of {} ({} total)", page.page, page.total_pages, page.total);
        }
        "orders-csv" => {
            let path = arg(0).context("usage: orders-csv <file>")?;
            let page = client.orders().list(&recent_orders(None), &cancel).await?;
            export::write_csv(path, &export::orders_csv(&page.data))
                .await
                .with_context(|| format!("failed to write {path}"))?;
            println!("Exported {} orders to {path}", page.data.len());
        }
        "set-order-status" => {
            let (Some(id), Some(status)) = (arg(0), arg(1)) else {
                bail!("usage: set-order-status <id> <status>");
            };
            let status: OrderStatus = status.parse()?;
            client.orders().update_status(id, status).await?;
            println!("Status updated");
        }
        "categories" => {
            let page = client
                .categories()
                .list(&ListCategoriesParams::default(), &cancel)
                .await?;
            for category in &page.data {
                println!("{}  {}", category.id, category.name);
            }
        }
        "add-category" => {
            let name = args.join(" ");
            let category = client.categories().create(&name).await?;
            println!("Created category {} ({})", category.name, category.id);
        }
        "coupons" => {
            let page = client
                .coupons()
                .list(&ListCouponsParams::default(), &cancel)
                .await?;
            for coupon in &page.data {
                println!(
                    "{:<14} {:?} {:<8} {}",
                    coupon.code,
                    coupon.kind,
                    coupon.value,
                    if coupon.active { "active" } else { "inactive" }
                );
            }
        }
        "audit-logs" => {
            let page_no = arg(0)
                .map(str::parse::<u32>)
                .transpose()
                .context("page must be a number")?;
            let page = client
                .audit_logs()
                .list(page_no, Some(ORDER_PAGE_SIZE), &cancel)
                .await?;
            for log in &page.data {
                let when = log
                    .created_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!(
                    "{when:<16}  {:<24} {:<28} {}",
                    log.actor_label(),
                    log.action,
                    log.resource.as_deref().unwrap_or("")
                );
            }
            println!("page {} of {}", page.page, page.total_pages);
        }
        "delivery" => {
            let settings = client.delivery().get(&cancel).await?;
            println!("Enabled:            {}", settings.enabled);
            println!("Min order subtotal: Rs {}", settings.min_order_subtotal);
            if let Some(fee) = settings.delivery_fee {
                println!("Delivery fee:       Rs {fee}");
            }
            if let Some(threshold) = settings.free_delivery_threshold {
                println!("Free delivery from: Rs {threshold}");
            }
            for city in &settings.cities {
                println!(
                    "  {}: base Rs {}, Rs {}/kg",
                    city.name, city.base_price, city.price_per_kg
                );
            }
        }
        "homepage-videos" => {
            let page = client.homepage_videos().list(&cancel).await?;
            for video in &page.data {
                println!(
                    "{:>3}  {}  {}  {}",
                    video.display_order,
                    video.id,
                    if video.active { "active  " } else { "inactive" },
                    video.title.as_deref().unwrap_or(&video.video_url)
                );
            }
        }
        other => bail!("unknown command '{other}'"),
    }
    Ok(())
}

fn recent_orders(status: Option<OrderStatus>) -> OrdersQuery {
    OrdersQuery {
        status,
        page: Some(1),
        limit: Some(ORDER_PAGE_SIZE),
        sort: Some("-createdAt".to_string()),
        ..Default::default()
    }
}
