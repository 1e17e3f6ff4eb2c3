//! `fetch` command implementation

use crate::cli::args::FetchArgs;
use crate::config::ReportConfig;
use crate::error::Result as ReportResult;
use crate::pipeline::ReportService;
use crate::query::{split_list, DateRange, QueryParams};
use anyhow::Result;
use tracing::debug;

/// Turn `fetch` arguments into a query
pub fn build_query(args: &FetchArgs, default_project_id: i64) -> ReportResult<QueryParams> {
    let project_id = args.project_id.unwrap_or(default_project_id);
    let mut builder = QueryParams::builder(project_id, args.experiment_id)
        .normalization(args.normalization.clone())
        .no_cache(args.no_cache);

    if let Some(dates) = &args.dates {
        builder = builder.date_range(DateRange::parse(dates)?);
    }
    if let Some(metrics) = &args.metrics {
        builder = builder.metrics(split_list(metrics));
    }
    if let Some(control) = &args.control {
        builder = builder.control(control.trim());
    }
    if let Some(treatments) = &args.treatments {
        builder = builder.treatments(split_list(treatments));
    }
    if let Some(regions) = &args.regions {
        builder = builder.regions(split_list(regions));
    }
    if let Some(dims) = &args.dims {
        builder = builder.dims(split_list(dims));
    }

    Ok(builder.build())
}

/// Execute the fetch command
pub async fn run_fetch_command(args: FetchArgs, config: &ReportConfig) -> Result<()> {
    let params = build_query(&args, config.default_project_id)?;
    debug!("Fetching experiment {} with {:?}", params.experiment_id(), params);

    let service = ReportService::from_config(config)?;
    let use_cache = config.cache.enabled && !args.no_cache;
    let report = service.fetch(&params, use_cache).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report.to_compact_json()?)?);
    } else {
        println!("{}", report.formatted_text);
        if let Some(reason) = &report.fallback_reason {
            eprintln!("\nNote: live data unavailable ({reason}); showing synthetic data");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn args(experiment_id: i64) -> FetchArgs {
        FetchArgs {
            experiment_id,
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_apply() {
        let params = build_query(&args(1001), 27).unwrap();
        assert_eq!(params.project_id(), 27);
        assert_eq!(params.dates().len(), 1);
        assert!(!params.metrics().is_empty());
    }

    #[test]
    fn test_lists_are_split() {
        let fetch = FetchArgs {
            project_id: Some(3),
            metrics: Some("gmv, ctr,".into()),
            treatments: Some("b,c".into()),
            regions: Some("SG".into()),
            control: Some(" a ".into()),
            ..args(5)
        };
        let params = build_query(&fetch, 27).unwrap();

        assert_eq!(params.project_id(), 3);
        assert_eq!(params.metrics(), ["gmv", "ctr"]);
        assert_eq!(params.treatments(), ["b", "c"]);
        assert_eq!(params.regions(), ["SG"]);
        assert_eq!(params.control(), "a");
    }

    #[test]
    fn test_bad_dates_are_argument_errors() {
        let fetch = FetchArgs {
            dates: Some("2024-02-01".into()),
            ..args(1)
        };
        let err = build_query(&fetch, 27).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(err.exit_code(), 2);
    }
}
