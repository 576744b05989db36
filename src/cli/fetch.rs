//! Fetch command implementation

use crate::cli::output::{format_fetch_json, format_fetch_table, FetchSummary};
use crate::cli::serve::{build_cache, load_config};
use crate::cli::FetchArgs;
use crate::dashboard::DashboardHandle;
use crate::range::resolve_selection;

/// Run one fetch cycle for the selected range and render the summary.
///
/// A failed cycle is an error unless it still produced data to show.
pub async fn handle_fetch(args: &FetchArgs) -> Result<String, Box<dyn std::error::Error>> {
    let config = load_config(&args.config)?;
    config.validate()?;

    let cache = build_cache(&config)?;
    let range = resolve_selection(
        args.start.as_deref(),
        args.end.as_deref(),
        args.preset.as_deref(),
        cache.zone(),
        cache.now(),
    )?;

    let view = DashboardHandle::mount(cache, range).await;
    let data = view.data();

    if let Some(error) = &data.error {
        if data.last_fetch.is_none() {
            return Err(format!("fetch failed: {}", error).into());
        }
    }

    let summary = FetchSummary::from(&data);
    if args.json {
        Ok(format_fetch_json(&summary)?)
    } else {
        Ok(format_fetch_table(&summary))
    }
}
