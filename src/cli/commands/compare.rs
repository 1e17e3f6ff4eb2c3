//! `compare` command implementation

use crate::cli::args::CompareArgs;
use crate::config::ReportConfig;
use crate::error::{Error, Result as ReportResult};
use crate::pipeline::ReportService;
use crate::query::{split_list, DateRange, QueryParams};
use anyhow::Result;
use serde_json::json;

/// Parse the comma separated experiment id list
pub fn parse_experiment_ids(value: &str) -> ReportResult<Vec<i64>> {
    let ids = split_list(value)
        .iter()
        .map(|id| {
            id.parse::<i64>()
                .map_err(|_| Error::InvalidArgument(format!("invalid experiment id `{id}`")))
        })
        .collect::<ReportResult<Vec<_>>>()?;

    if ids.len() < 2 {
        return Err(Error::InvalidArgument(
            "at least two experiment ids are required".to_string(),
        ));
    }
    Ok(ids)
}

/// Query shared by every compared experiment
pub fn build_template(args: &CompareArgs, default_project_id: i64) -> ReportResult<QueryParams> {
    let project_id = args.project_id.unwrap_or(default_project_id);
    let mut builder = QueryParams::builder(project_id, 0);

    if let Some(dates) = &args.dates {
        builder = builder.date_range(DateRange::parse(dates)?);
    }
    if let Some(metrics) = &args.metrics {
        builder = builder.metrics(split_list(metrics));
    }
    if let Some(regions) = &args.regions {
        builder = builder.regions(split_list(regions));
    }
    Ok(builder.build())
}

/// Execute the compare command
pub async fn run_compare_command(args: CompareArgs, config: &ReportConfig) -> Result<()> {
    let experiment_ids = parse_experiment_ids(&args.experiment_ids)?;
    let template = build_template(&args, config.default_project_id)?;
    let metrics = args.metrics.as_deref().map(split_list).unwrap_or_default();

    let service = ReportService::from_config(config)?;
    let comparison = service
        .compare(&experiment_ids, &template, &metrics, args.sort_by.as_deref())
        .await?;

    if args.json {
        let value = json!({
            "experiment_ids": comparison.experiment_ids,
            "comparison": {
                "comparison_table": comparison.table,
                "experiment_count": comparison.experiment_count,
                "synthetic": comparison.synthetic,
                "ranking": comparison.ranking,
            },
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", comparison.formatted_text);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_experiment_ids() {
        assert_eq!(parse_experiment_ids("1, 2,3").unwrap(), vec![1, 2, 3]);
        assert!(matches!(
            parse_experiment_ids("1"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_experiment_ids("1,x"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_template_uses_default_project() {
        let args = CompareArgs {
            experiment_ids: "1,2".into(),
            regions: Some("SG,MY".into()),
            ..Default::default()
        };
        let template = build_template(&args, 42).unwrap();
        assert_eq!(template.project_id(), 42);
        assert_eq!(template.regions(), ["SG", "MY"]);
    }
}
