use nearstore_core::{AppConfig, Candidate};
use nearstore_db::QueryLogRow;

/// Print the configured candidate stores in file order.
///
/// # Errors
///
/// Returns an error if the stores file cannot be loaded or is invalid.
pub(crate) fn run_stores(config: &AppConfig) -> anyhow::Result<()> {
    let stores = nearstore_core::load_stores(&config.stores_path)?.stores;
    print!("{}", format_stores(&stores));
    Ok(())
}

/// Print the most recent query-log entries, newest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_log(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let rows = nearstore_db::list_query_log(pool, limit).await?;

    if rows.is_empty() {
        println!("query log is empty; run `nearest` first");
        return Ok(());
    }

    print!("{}", format_log(&rows));
    Ok(())
}

fn format_stores(stores: &[Candidate]) -> String {
    let width = stores
        .iter()
        .map(|s| s.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("NAME".len())
        + 2;

    let mut out = format!("{:<width$}ADDRESS\n", "NAME");
    for store in stores {
        out.push_str(&format!("{:<width$}{}\n", store.name, store.address));
    }
    out
}

fn format_log(rows: &[QueryLogRow]) -> String {
    let mut out = format!("{:<27}{:<26}{:<40}MESSAGE\n", "LOGGED AT", "STATUS", "QUERY");
    for row in rows {
        let query = if row.query.chars().count() > 37 {
            format!("{}...", row.query.chars().take(37).collect::<String>())
        } else {
            row.query.clone()
        };
        out.push_str(&format!(
            "{:<27}{:<26}{:<40}{}\n",
            row.local_logged_at().format("%Y-%m-%d %H:%M:%S %:z"),
            row.status,
            query,
            row.message
        ));
    }
    out
}
